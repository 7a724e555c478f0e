use chrono::{NaiveDate, Utc};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Rotated generations kept on disk by default.
pub const DEFAULT_RETAINED_FILES: usize = 30;

/// Append-only writer that starts a new file generation at each UTC
/// midnight boundary.
///
/// The active file keeps its plain name (`app.log`); at the first write
/// of a new day it is renamed to `app.log.<YYYY-MM-DD>` (the day it
/// covers) and a fresh file is opened. Generations beyond `max_files`
/// are pruned oldest-first. The internal mutex makes this a process-wide
/// single-writer handle: lines from concurrent callers never interleave.
pub struct RollingFileWriter {
    dir: PathBuf,
    file_name: String,
    max_files: usize,
    state: Mutex<State>,
}

struct State {
    file: File,
    day: NaiveDate,
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

impl RollingFileWriter {
    /// Open (or create) `<dir>/<file_name>` for appending.
    ///
    /// Creates `dir` if missing. An unwritable directory is an error the
    /// caller should treat as fatal.
    pub fn new(dir: impl Into<PathBuf>, file_name: impl Into<String>, max_files: usize) -> io::Result<Self> {
        let dir = dir.into();
        let file_name = file_name.into();
        fs::create_dir_all(&dir)?;
        let file = open_append(&dir.join(&file_name))?;
        Ok(RollingFileWriter {
            dir,
            file_name,
            max_files,
            state: Mutex::new(State {
                file,
                day: Utc::now().date_naive(),
            }),
        })
    }

    /// Append one line, rotating first if the UTC day changed since the
    /// previous write.
    pub fn write_line(&self, line: &str) -> io::Result<()> {
        self.write_line_on(Utc::now().date_naive(), line)
    }

    fn write_line_on(&self, day: NaiveDate, line: &str) -> io::Result<()> {
        // A poisoned lock only means some writer panicked mid-write;
        // the file handle is still usable.
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if day != state.day {
            self.rotate(&mut state, day)?;
        }
        state.file.write_all(line.as_bytes())?;
        state.file.write_all(b"\n")?;
        Ok(())
    }

    fn rotate(&self, state: &mut State, day: NaiveDate) -> io::Result<()> {
        state.file.flush()?;
        let active = self.dir.join(&self.file_name);
        let rotated = self
            .dir
            .join(format!("{}.{}", self.file_name, state.day.format("%Y-%m-%d")));
        fs::rename(&active, &rotated)?;
        state.file = open_append(&active)?;
        state.day = day;
        self.prune()
    }

    fn prune(&self) -> io::Result<()> {
        let prefix = format!("{}.", self.file_name);
        let mut generations: Vec<String> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| name.starts_with(&prefix))
            .collect();
        // ISO date suffixes sort chronologically as plain strings.
        generations.sort();
        while generations.len() > self.max_files {
            let oldest = generations.remove(0);
            fs::remove_file(self.dir.join(oldest))?;
        }
        Ok(())
    }
}
