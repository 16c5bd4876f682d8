//! # Logging Setup
//!
//! `env_logger` backend for the `log` facade. Lines look like
//! `[20260115-14:03:07.412] [imgpack] [INFO] message`.
//!
//! With a log file configured, output goes to a size-capped file that is
//! rotated to `<file>.1`, `<file>.2`, … once it would grow past `max_size`.
//! The file is only created when the first line is written.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use env_logger::{Builder, Target};
use log::LevelFilter;

use crate::common::config::LogConfig;

/// Initialize the global logger from `config`.
///
/// `RUST_LOG`, when set, overrides the configured level.
pub fn init_logger(config: &LogConfig, name: &str) -> Result<()> {
    let level = LevelFilter::from_str(&config.level)
        .with_context(|| format!("invalid log level {:?}", config.level))?;

    let name = name.to_string();
    let mut builder = Builder::new();
    builder
        .format(move |buf, record| {
            writeln!(
                buf,
                "[{}] [{}] [{}] {}",
                chrono::Local::now().format("%Y%m%d-%H:%M:%S%.3f"),
                name,
                record.level(),
                record.args()
            )
        })
        .filter_level(level)
        .parse_default_env();

    if let Some(path) = &config.file {
        let file = RotatingFile::new(path, config.max_size, config.max_files);
        builder.target(Target::Pipe(Box::new(file)));
    }

    builder.try_init().context("logger already initialized")?;
    Ok(())
}

/// Append-only log file with size-based rotation.
pub struct RotatingFile {
    path: PathBuf,
    max_size: u64,
    max_files: usize,
    file: Option<File>,
    size: u64,
}

impl RotatingFile {
    pub fn new(path: impl Into<PathBuf>, max_size: u64, max_files: usize) -> Self {
        Self {
            path: path.into(),
            max_size,
            max_files,
            file: None,
            size: 0,
        }
    }

    fn backup(&self, index: usize) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(format!(".{index}"));
        PathBuf::from(name)
    }

    fn open(&mut self) -> io::Result<&mut File> {
        let file = match self.file.take() {
            Some(file) => file,
            None => {
                if let Some(parent) = self.path.parent() {
                    fs::create_dir_all(parent)?;
                }
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&self.path)?;
                self.size = file.metadata()?.len();
                file
            }
        };
        Ok(self.file.insert(file))
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file = None;
        if self.max_files == 0 {
            fs::remove_file(&self.path)?;
        } else {
            for index in (1..self.max_files).rev() {
                let from = self.backup(index);
                if from.exists() {
                    fs::rename(&from, self.backup(index + 1))?;
                }
            }
            fs::rename(&self.path, self.backup(1))?;
        }
        self.size = 0;
        Ok(())
    }
}

impl Write for RotatingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.open()?;
        if self.size > 0 && self.size + buf.len() as u64 > self.max_size {
            self.rotate()?;
        }
        let n = self.open()?.write(buf)?;
        self.size += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}
