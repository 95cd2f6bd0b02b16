//! Base directory resolution and `config.toml` settings.
//!
//! Everything the loader keeps on disk lives under one base directory:
//!
//! ```text
//! <base>/config.toml
//! <base>/profiles/<name>.json
//! <base>/schemas/<name>.json
//! ```
//!
//! The base directory is `$QBASE_LOADER_HOME` when set, otherwise the platform data directory
//! (for example `~/.local/share/qbase-loader` on Linux).

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::{LoaderError, LoaderResult};
use crate::processing::DEFAULT_BATCH_SIZE;
use crate::transport::{UploadMode, UploadOptions, DEFAULT_BASE_URL};

/// Environment variable overriding the base directory.
pub const HOME_ENV: &str = "QBASE_LOADER_HOME";

const APP_QUALIFIER: &str = "com";
const APP_ORG: &str = "qbase";
const APP_NAME: &str = "qbase-loader";
const CONFIG_FILENAME: &str = "config.toml";

/// Resolve the base directory (not created).
pub fn base_dir() -> LoaderResult<PathBuf> {
    if let Some(dir) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    ProjectDirs::from(APP_QUALIFIER, APP_ORG, APP_NAME)
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| {
            LoaderError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("cannot determine a data directory; set {HOME_ENV}"),
            ))
        })
}

/// How `upload` sends batches, as written in `config.toml`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeSetting {
    #[default]
    Sequential,
    Concurrent,
}

/// `[api]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub base_url: String,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

/// `[upload]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadSettings {
    /// Records per request.
    pub max_batch: usize,
    pub mode: ModeSetting,
    /// Concurrent requests when `mode = "concurrent"`.
    pub max_in_flight: usize,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            max_batch: DEFAULT_BATCH_SIZE,
            mode: ModeSetting::Sequential,
            max_in_flight: 4,
        }
    }
}

/// Contents of `config.toml`. Every key is optional.
///
/// ```toml
/// [api]
/// base_url = "https://api.quickbase.com"
///
/// [upload]
/// max_batch = 20000
/// mode = "concurrent"
/// max_in_flight = 4
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api: ApiSettings,
    pub upload: UploadSettings,
}

impl Settings {
    /// Load `<base>/config.toml`; a missing file yields defaults, a malformed one is an error.
    pub fn load(base: &Path) -> LoaderResult<Self> {
        let path = base.join(CONFIG_FILENAME);
        match fs::read_to_string(&path) {
            Ok(content) => {
                let settings = Self::from_toml(&content)?;
                tracing::debug!(path = %path.display(), "loaded settings");
                Ok(settings)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no settings file, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Parse settings from TOML text.
    pub fn from_toml(content: &str) -> LoaderResult<Self> {
        let settings: Settings = toml::from_str(content)?;
        if settings.upload.max_batch == 0 {
            return Err(LoaderError::InvalidBatchSize(0));
        }
        Ok(settings)
    }

    /// Upload options described by these settings (no observer attached).
    pub fn upload_options(&self) -> UploadOptions {
        let mode = match self.upload.mode {
            ModeSetting::Sequential => UploadMode::Sequential,
            ModeSetting::Concurrent => UploadMode::Concurrent {
                max_in_flight: self.upload.max_in_flight.max(1),
            },
        };
        UploadOptions {
            batch_size: self.upload.max_batch,
            mode,
            ..UploadOptions::default()
        }
    }
}
