use chrono::Local;
use env_logger::{Builder, Env, Target};
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S %z";

pub const DEFAULT_LOG_MAX_BYTES: u64 = 1_000_000;
pub const DEFAULT_LOG_BACKUP_COUNT: u32 = 5;

/// Size-based rotation of the log file. Rotation is off when either value
/// is 0, the file then only grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rotation {
    pub max_bytes: u64,
    pub backup_count: u32,
}

impl Default for Rotation {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_LOG_MAX_BYTES,
            backup_count: DEFAULT_LOG_BACKUP_COUNT,
        }
    }
}

impl Rotation {
    fn enabled(&self) -> bool {
        self.max_bytes > 0 && self.backup_count > 0
    }
}

/// Append-only log file that rolls over to `<name>.1` .. `<name>.N` before a
/// write would push it past `max_bytes`. The oldest backup is overwritten.
pub struct RotatingFile {
    path: PathBuf,
    file: File,
    current_size: u64,
    rotation: Rotation,
}

impl RotatingFile {
    pub fn open(path: &Path, rotation: Rotation) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let current_size = file.metadata()?.len();
        Ok(Self {
            path: path.to_path_buf(),
            file,
            current_size,
            rotation,
        })
    }

    /// `linky.log` -> `linky.log.<index>`
    pub fn backup_path(&self, index: u32) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(format!(".{}", index));
        PathBuf::from(name)
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;
        for i in (1..self.rotation.backup_count).rev() {
            let old_path = self.backup_path(i);
            if old_path.exists() {
                fs::rename(&old_path, self.backup_path(i + 1))?;
            }
        }
        if self.path.exists() {
            fs::rename(&self.path, self.backup_path(1))?;
        }

        self.file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        self.current_size = 0;
        Ok(())
    }
}

impl Write for RotatingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.rotation.enabled()
            && self.current_size > 0
            && self.current_size + buf.len() as u64 > self.rotation.max_bytes
        {
            self.rotate()?;
        }
        let written = self.file.write(buf)?;
        self.current_size += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

/// Initializes the global logger. `RUST_LOG` wins over `default_level`; with a
/// `log_file` output goes there, rotated per `rotation`, instead of stderr.
pub fn init_logging(
    default_level: &str,
    log_file: Option<&Path>,
    rotation: Rotation,
) -> io::Result<()> {
    let mut builder = Builder::from_env(Env::default().default_filter_or(default_level));
    builder.format(|buf, record| {
        writeln!(
            buf,
            "[{}][{}][{}] {}",
            Local::now().format(TIMESTAMP_FORMAT),
            short_module(record.module_path().unwrap_or("linky_monitor")),
            record.level(),
            record.args()
        )
    });

    if let Some(path) = log_file {
        let file = RotatingFile::open(path, rotation)?;
        builder.target(Target::Pipe(Box::new(file)));
    }

    // A second init (tests, embedding) keeps the first logger.
    let _ = builder.try_init();
    Ok(())
}

/// Last path segment of a module path, `linky_monitor::db` -> `db`.
fn short_module(module_path: &str) -> &str {
    module_path.rsplit("::").next().unwrap_or(module_path)
}
