//! Logging setup
//!
//! Console output plus a log file per day under `log.log_dir`, named
//! `<file_name>.<YYYY-MM-DD>.log`. Only the newest `backup_count` old files
//! are kept.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use parking_lot::Mutex;
use tracing::debug;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{ConfigError, LogConfig};

/// `2025-01-31 13:45:00` in local time
struct LocalTime;

impl FormatTime for LocalTime {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", Local::now().format("%Y-%m-%d %H:%M:%S"))
    }
}

/// Build the filter: `RUST_LOG` wins, then `-v` flags, then the configured level
pub fn create_env_filter(level: &str, verbosity: u8) -> Result<EnvFilter, ConfigError> {
    if std::env::var("RUST_LOG").is_ok() {
        return Ok(EnvFilter::from_default_env());
    }

    let directive = match verbosity {
        0 => level.to_string(),
        1 => "oxidefetch=debug,info".to_string(),
        // -vv: include russh for SSH troubleshooting
        _ => "oxidefetch=trace,russh=debug,russh_sftp=debug,info".to_string(),
    };

    EnvFilter::try_new(&directive)
        .map_err(|e| ConfigError::Invalid(format!("log level {:?}: {}", directive, e)))
}

/// Install the global subscriber. Call once, at process start.
///
/// Returns the path of today's log file.
pub fn init_logging(config: &LogConfig, verbosity: u8) -> Result<PathBuf, ConfigError> {
    let filter = create_env_filter(&config.level, verbosity)?;

    let daily = DailyFile::open(&config.log_dir, &config.file_name, config.backup_count)
        .map_err(|source| ConfigError::Io {
            path: config.log_dir.clone(),
            source,
        })?;
    let log_file = daily.current_path();

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_timer(LocalTime)
                .with_writer(io::stderr),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_timer(LocalTime)
                .with_ansi(false)
                .with_writer(daily),
        )
        .try_init()
        .map_err(|e| ConfigError::Logging(e.to_string()))?;

    debug!("Logging to {}", log_file.display());
    Ok(log_file)
}

struct DailyState {
    date: NaiveDate,
    file: File,
}

/// Append-only log file that switches to a new file when the date changes
pub struct DailyFile {
    dir: PathBuf,
    name: String,
    backup_count: usize,
    state: Mutex<DailyState>,
}

impl DailyFile {
    pub fn open(dir: &Path, name: &str, backup_count: usize) -> io::Result<Self> {
        Self::open_at(dir, name, backup_count, Local::now().date_naive())
    }

    fn open_at(dir: &Path, name: &str, backup_count: usize, date: NaiveDate) -> io::Result<Self> {
        fs::create_dir_all(dir)?;

        let daily = Self {
            dir: dir.to_path_buf(),
            name: name.to_string(),
            backup_count,
            state: Mutex::new(DailyState {
                date,
                file: open_append(&file_path(dir, name, date))?,
            }),
        };
        daily.prune()?;
        Ok(daily)
    }

    pub fn current_path(&self) -> PathBuf {
        file_path(&self.dir, &self.name, self.state.lock().date)
    }

    fn write_at(&self, today: NaiveDate, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.state.lock();
        if state.date != today {
            state.file = open_append(&file_path(&self.dir, &self.name, today))?;
            state.date = today;
            drop(state);
            self.prune()?;
            state = self.state.lock();
        }
        state.file.write(buf)
    }

    /// Remove all but the newest `backup_count` files besides today's
    fn prune(&self) -> io::Result<()> {
        let current = self.current_path();
        let prefix = format!("{}.", self.name);

        let mut old: Vec<PathBuf> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| *path != current)
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.starts_with(&prefix) && n.ends_with(".log"))
                    .unwrap_or(false)
            })
            .collect();

        // Dates are zero-padded, so name order is date order
        old.sort();
        let excess = old.len().saturating_sub(self.backup_count);
        for path in old.into_iter().take(excess) {
            fs::remove_file(&path)?;
        }
        Ok(())
    }
}

fn file_path(dir: &Path, name: &str, date: NaiveDate) -> PathBuf {
    dir.join(format!("{}.{}.log", name, date.format("%Y-%m-%d")))
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

pub struct DailyFileWriter<'a> {
    daily: &'a DailyFile,
}

impl Write for DailyFileWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.daily.write_at(Local::now().date_naive(), buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.daily.state.lock().file.flush()
    }
}

impl<'a> MakeWriter<'a> for DailyFile {
    type Writer = DailyFileWriter<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        DailyFileWriter { daily: self }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, day).unwrap()
    }

    fn log_files(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_rolls_over_on_date_change() {
        let dir = tempdir().unwrap();
        let daily = DailyFile::open_at(dir.path(), "fetch", 7, date(1)).unwrap();

        daily.write_at(date(1), b"first\n").unwrap();
        daily.write_at(date(2), b"second\n").unwrap();

        assert_eq!(
            fs::read_to_string(dir.path().join("fetch.2025-03-01.log")).unwrap(),
            "first\n"
        );
        assert_eq!(
            fs::read_to_string(dir.path().join("fetch.2025-03-02.log")).unwrap(),
            "second\n"
        );
        assert_eq!(daily.current_path(), dir.path().join("fetch.2025-03-02.log"));
    }

    #[test]
    fn test_keeps_only_backup_count_old_files() {
        let dir = tempdir().unwrap();
        for day in 1..=5 {
            fs::write(dir.path().join(format!("fetch.2025-03-0{}.log", day)), "x").unwrap();
        }
        fs::write(dir.path().join("unrelated.txt"), "keep").unwrap();

        let _daily = DailyFile::open_at(dir.path(), "fetch", 2, date(6)).unwrap();

        assert_eq!(
            log_files(dir.path()),
            vec![
                "fetch.2025-03-04.log",
                "fetch.2025-03-05.log",
                "fetch.2025-03-06.log",
                "unrelated.txt",
            ]
        );
    }

    #[test]
    fn test_creates_log_dir() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("logs").join("fetch");
        let daily = DailyFile::open_at(&nested, "fetch", 7, date(1)).unwrap();
        daily.make_writer().write_all(b"hello\n").unwrap();
        assert!(nested.is_dir());
    }

    #[test]
    fn test_verbosity_filter() {
        assert!(create_env_filter("warn", 0).is_ok());
        assert!(create_env_filter("info", 2).is_ok());
    }
}
