//! Process-wide structured logger, adapted from the teacher's file-rotating
//! `log::Log` implementation, plus a sampling-aware wrapper for hot-path call sites.

mod sampler;

pub use sampler::{SampleMode, Sampler};

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use chrono::Local;
use log::{Level, LevelFilter, Metadata, Record, SetLoggerError};
use parking_lot::Mutex;

struct HostLogger {
    debug_file: Mutex<Option<File>>,
    error_file: Mutex<Option<File>>,
}

impl log::Log for HostLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        let line = format!(
            "[{}] {} [{}:{}] {}\n",
            timestamp,
            record.level(),
            record.file().unwrap_or("unknown"),
            record.line().unwrap_or(0),
            record.args()
        );
        print!("{}", line);

        if matches!(record.level(), Level::Error | Level::Warn) {
            if let Some(file) = self.error_file.lock().as_mut() {
                let _ = file.write_all(line.as_bytes());
            }
        }
        if let Some(file) = self.debug_file.lock().as_mut() {
            let _ = file.write_all(line.as_bytes());
        }
    }

    fn flush(&self) {
        if let Some(file) = self.debug_file.lock().as_mut() {
            let _ = file.flush();
        }
        if let Some(file) = self.error_file.lock().as_mut() {
            let _ = file.flush();
        }
    }
}

/// Install the process-wide logger. `level` parses as an env_logger-style level name.
pub fn init(app_name: &str, level: &str) -> Result<(), SetLoggerError> {
    let log_dir = log_directory(app_name).unwrap_or_else(|_| PathBuf::from("."));
    let debug_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("debug.log"))
        .ok();
    let error_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("error.log"))
        .ok();

    log::set_boxed_logger(Box::new(HostLogger {
        debug_file: Mutex::new(debug_file),
        error_file: Mutex::new(error_file),
    }))?;

    log::set_max_level(level.parse::<LevelFilter>().unwrap_or(LevelFilter::Info));
    Ok(())
}

fn log_directory(app_name: &str) -> std::io::Result<PathBuf> {
    let mut dir = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
    dir.push(app_name);
    dir.push("logs");
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Rotate a log file once it exceeds `max_size_mb`, keeping a single `.old` backup.
pub fn rotate_logs(app_name: &str, max_size_mb: u64) -> std::io::Result<()> {
    let dir = log_directory(app_name)?;
    for name in ["debug.log", "error.log"] {
        rotate_one(dir.join(name), max_size_mb)?;
    }
    Ok(())
}

fn rotate_one(path: PathBuf, max_size_mb: u64) -> std::io::Result<()> {
    if !path.exists() {
        return Ok(());
    }
    let size_mb = fs::metadata(&path)?.len() / (1024 * 1024);
    if size_mb <= max_size_mb {
        return Ok(());
    }
    let backup = path.with_extension("log.old");
    if backup.exists() {
        fs::remove_file(&backup)?;
    }
    fs::rename(&path, &backup)?;
    File::create(&path)?;
    Ok(())
}
</content>
