// crates/core/src/auth/store.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

use super::Credential;
use crate::error::AuthError;

/// Default location of the persisted credential.
pub const DEFAULT_TOKEN_PATH: &str = "config/token.json";

/// Single-file credential persistence. Concurrent runs are not coordinated;
/// the last writer wins.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// `SCHED_ASSIST_TOKEN_PATH`, falling back to `config/token.json`.
    pub fn from_env() -> Self {
        let path = std::env::var("SCHED_ASSIST_TOKEN_PATH")
            .unwrap_or_else(|_| DEFAULT_TOKEN_PATH.to_string());
        Self::new(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing or unreadable file counts as "no credential".
    pub fn load(&self) -> Option<Credential> {
        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "cannot read token file");
                return None;
            }
        };

        match serde_json::from_str(&data) {
            Ok(credential) => Some(credential),
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "ignoring corrupt token file");
                None
            }
        }
    }

    pub fn save(&self, credential: &Credential) -> Result<(), AuthError> {
        let persist_err = |source| AuthError::Persist {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(persist_err)?;
            }
        }

        let json = serde_json::to_string_pretty(credential)
            .map_err(|e| persist_err(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
        fs::write(&self.path, json).map_err(persist_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn save_creates_parent_dirs_and_load_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("nested/config/token.json"));
        let credential = Credential::new(
            "tok",
            Some("ref".into()),
            Some(Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()),
            vec!["scope-a".into()],
        );

        store.save(&credential).unwrap();

        assert_eq!(store.load(), Some(credential));
    }

    #[test]
    fn persisted_format_names_all_fields() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token.json"));
        let credential = Credential::new(
            "tok",
            Some("ref".into()),
            Some(Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()),
            vec!["scope-a".into()],
        );
        store.save(&credential).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(raw["token"], "tok");
        assert_eq!(raw["refresh_token"], "ref");
        assert_eq!(raw["scopes"][0], "scope-a");
        assert!(raw["expiry"].as_str().unwrap().starts_with("2030-01-01T00:00:00"));
    }

    #[test]
    fn missing_and_corrupt_files_load_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token.json"));
        assert_eq!(store.load(), None);

        fs::write(store.path(), "{ not json").unwrap();
        assert_eq!(store.load(), None);
    }

    #[test]
    fn last_writer_wins() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token.json"));
        store.save(&Credential::new("first", None, None, vec![])).unwrap();
        store.save(&Credential::new("second", None, None, vec![])).unwrap();
        assert_eq!(store.load().unwrap().access_token(), "second");
    }
}
