//! Named connection profiles stored as `<base>/profiles/<name>.json`.
//!
//! A profile file holds the three request headers verbatim:
//!
//! ```json
//! {
//!     "QB-Realm-Hostname": "demo.quickbase.com",
//!     "User-Agent": "reporting",
//!     "Authorization": "QB-USER-TOKEN b12345_abc_0_abcdefghijklmnopqrstuv"
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{LoaderError, LoaderResult};
use crate::transport::Credentials;

const HOST_SUFFIX: &str = ".quickbase.com";
const HOST_PATTERN: &str = r"^[\w\-]+\.quickbase\.com$";
const TOKEN_PATTERN: &str = r"^QB-(USER|TEMP)-TOKEN \w{6}_\w{2,5}_\w_\w{20,30}$";

/// Stored headers of one profile. Any of them may be missing until the profile is complete.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(rename = "QB-Realm-Hostname", default, skip_serializing_if = "Option::is_none")]
    pub realm_hostname: Option<String>,
    #[serde(rename = "User-Agent", default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(rename = "Authorization", default, skip_serializing_if = "Option::is_none")]
    pub authorization: Option<String>,
    /// Keys that are not one of the three headers; their presence makes the profile invalid.
    #[serde(flatten)]
    pub unknown: BTreeMap<String, serde_json::Value>,
}

impl Profile {
    /// Check that the profile can authorize requests: exactly the three headers, a
    /// `<realm>.quickbase.com` hostname and a well-formed user or temporary token.
    ///
    /// A valid profile is not guaranteed to be accepted by the API.
    pub fn validate(&self, name: &str) -> LoaderResult<()> {
        let invalid = |what: &str| LoaderError::Profile {
            message: format!("profile '{name}' {what}"),
        };

        if !self.unknown.is_empty() {
            let keys: Vec<&str> = self.unknown.keys().map(String::as_str).collect();
            return Err(invalid(&format!("has unexpected keys: {}", keys.join(", "))));
        }

        let host = non_empty(&self.realm_hostname).ok_or_else(|| invalid("has no hostname"))?;
        if !compile(HOST_PATTERN)?.is_match(host) {
            return Err(invalid("has an invalid hostname"));
        }

        non_empty(&self.user_agent).ok_or_else(|| invalid("has no user agent"))?;

        let auth = non_empty(&self.authorization).ok_or_else(|| invalid("has no api token"))?;
        if !compile(TOKEN_PATTERN)?.is_match(auth) {
            return Err(invalid("has an invalid api token"));
        }
        Ok(())
    }

    /// Validated request credentials.
    pub fn credentials(&self, name: &str) -> LoaderResult<Credentials> {
        self.validate(name)?;
        Ok(Credentials {
            realm_hostname: self.realm_hostname.clone().unwrap_or_default(),
            user_agent: self.user_agent.clone().unwrap_or_default(),
            authorization: self.authorization.clone().unwrap_or_default(),
        })
    }

    fn merge(mut self, newer: Profile) -> Self {
        for (slot, value) in [
            (&mut self.realm_hostname, newer.realm_hostname),
            (&mut self.user_agent, newer.user_agent),
            (&mut self.authorization, newer.authorization),
        ] {
            if let Some(v) = value.filter(|v| !v.is_empty()) {
                *slot = Some(v);
            }
        }
        self
    }
}

fn non_empty(v: &Option<String>) -> Option<&str> {
    v.as_deref().filter(|s| !s.is_empty())
}

fn compile(pattern: &str) -> LoaderResult<Regex> {
    Regex::new(pattern).map_err(|e| LoaderError::Profile {
        message: format!("bad validation pattern: {e}"),
    })
}

/// Values for [`ProfileStore::set`]. Unset values keep what the profile already has.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    /// Realm name (`demo`) or full hostname (`demo.quickbase.com`).
    pub host: Option<String>,
    /// User agent; defaults to the profile name when unset.
    pub user: Option<String>,
    /// Bare API token, without the `QB-USER-TOKEN` prefix.
    pub token: Option<String>,
    /// The token is a temporary token (`QB-TEMP-TOKEN`).
    pub temp_token: bool,
}

impl ProfileUpdate {
    fn into_profile(self, name: &str) -> Profile {
        let prefix = if self.temp_token {
            "QB-TEMP-TOKEN "
        } else {
            "QB-USER-TOKEN "
        };
        Profile {
            realm_hostname: self.host.filter(|h| !h.is_empty()).map(|h| {
                if h.ends_with(HOST_SUFFIX) {
                    h
                } else {
                    format!("{h}{HOST_SUFFIX}")
                }
            }),
            user_agent: Some(self.user.filter(|u| !u.is_empty()).unwrap_or_else(|| name.to_string())),
            authorization: self.token.filter(|t| !t.is_empty()).map(|t| format!("{prefix}{t}")),
            unknown: BTreeMap::new(),
        }
    }
}

/// Directory of profile files.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    dir: PathBuf,
}

impl ProfileStore {
    /// Store under `<base>/profiles`.
    pub fn new(base: &Path) -> Self {
        Self {
            dir: base.join("profiles"),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create or update `name`, merging non-empty new values over the stored ones.
    pub fn set(&self, name: &str, update: ProfileUpdate) -> LoaderResult<Profile> {
        let path = self.path(name)?;
        let current = self.get(name)?.unwrap_or_default();
        let merged = current.merge(update.into_profile(name));

        fs::create_dir_all(&self.dir)?;
        fs::write(&path, serde_json::to_string_pretty(&merged)?)?;
        tracing::info!(profile = name, path = %path.display(), "profile saved");
        Ok(merged)
    }

    /// Read `name`, or `None` when it does not exist.
    pub fn get(&self, name: &str) -> LoaderResult<Option<Profile>> {
        let path = self.path(name)?;
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Read `name` and turn it into request credentials.
    pub fn credentials(&self, name: &str) -> LoaderResult<Credentials> {
        self.get(name)?
            .ok_or_else(|| LoaderError::Profile {
                message: format!("profile '{name}' does not exist"),
            })?
            .credentials(name)
    }

    /// Names of all stored profiles, sorted.
    pub fn list(&self) -> LoaderResult<Vec<String>> {
        list_json_stems(&self.dir)
    }

    /// Remove `name`. Returns whether a profile was removed.
    pub fn delete(&self, name: &str) -> LoaderResult<bool> {
        remove_if_exists(&self.path(name)?)
    }

    fn path(&self, name: &str) -> LoaderResult<PathBuf> {
        check_name(name).map_err(|message| LoaderError::Profile { message })?;
        Ok(self.dir.join(format!("{name}.json")))
    }
}

/// Names usable as file stems: non-empty, no path separators, not `.`/`..`.
pub(crate) fn check_name(name: &str) -> Result<(), String> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(format!("'{name}' is not a valid name"));
    }
    Ok(())
}

pub(crate) fn list_json_stems(dir: &Path) -> LoaderResult<Vec<String>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let mut names = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "json") {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}

pub(crate) fn remove_if_exists(path: &Path) -> LoaderResult<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}
