use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::error::{DeviceError, Result};

/// File name that selects wildcard enumeration instead of a fixed node.
pub const WILDCARD_NAME: &str = "jsX";

/// Enumerates and opens input devices for a
/// [`DeviceMultiplexer`](crate::DeviceMultiplexer).
pub trait DeviceBackend {
    /// An open device. Reads must not block; no data is `WouldBlock`.
    type Device: Read;

    /// Current candidate device paths, sorted.
    fn enumerate(&self) -> Result<Vec<PathBuf>>;

    /// Open one device node for non-blocking reads.
    fn open(&self, path: &Path) -> std::io::Result<Self::Device>;
}

/// Which device nodes to watch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DevicePattern {
    /// Every entry of `dir` whose name starts with `prefix`.
    Wildcard { dir: PathBuf, prefix: String },
    /// A single path, watched whether or not it currently exists.
    Fixed(PathBuf),
}

impl DevicePattern {
    /// Interpret a configured device path.
    ///
    /// `/dev/input/jsX` (any directory, file name `jsX`) watches every `js*`
    /// node in that directory; anything else is a fixed path.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if path.file_name().is_some_and(|name| name == WILDCARD_NAME) {
            let dir = path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."));
            return Self::Wildcard {
                dir,
                prefix: "js".to_string(),
            };
        }
        Self::Fixed(path)
    }
}

impl Default for DevicePattern {
    fn default() -> Self {
        Self::from_path("/dev/input/jsX")
    }
}

/// Linux joystick nodes opened with `O_NONBLOCK`.
#[derive(Debug, Clone, Default)]
pub struct JoystickBackend {
    pattern: DevicePattern,
}

impl JoystickBackend {
    pub fn new(pattern: DevicePattern) -> Self {
        Self { pattern }
    }

    pub fn pattern(&self) -> &DevicePattern {
        &self.pattern
    }
}

impl DeviceBackend for JoystickBackend {
    type Device = File;

    fn enumerate(&self) -> Result<Vec<PathBuf>> {
        match &self.pattern {
            DevicePattern::Fixed(path) => Ok(vec![path.clone()]),
            DevicePattern::Wildcard { dir, prefix } => {
                let entries = std::fs::read_dir(dir).map_err(|source| DeviceError::Enumerate {
                    path: dir.clone(),
                    source,
                })?;
                let mut paths: Vec<PathBuf> = entries
                    .filter_map(|entry| entry.ok())
                    .filter(|entry| entry.file_name().to_string_lossy().starts_with(prefix.as_str()))
                    .map(|entry| entry.path())
                    .collect();
                paths.sort();
                Ok(paths)
            }
        }
    }

    fn open(&self, path: &Path) -> std::io::Result<File> {
        let mut options = std::fs::OpenOptions::new();
        options.read(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.custom_flags(libc::O_NONBLOCK);
        }
        options.open(path)
    }
}
