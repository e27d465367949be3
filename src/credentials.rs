//! # Credential Store
//!
//! The only thing DiffLens persists: a single API key. Its absence gates the
//! analysis call.
//!
//! Lookup order for the key file directory:
//! 1. `$DIFFLENS_HOME`
//! 2. `$XDG_CONFIG_HOME/difflens`
//! 3. `$HOME/.config/difflens`
//!
//! `GEMINI_API_KEY` in the environment takes precedence over the stored value.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;

use crate::error::{LensError, LensResult};

pub const API_KEY_ENV: &str = "GEMINI_API_KEY";
const KEY_FILE: &str = "api_key";
const MIN_KEY_LEN: usize = 10;

/// Get/set/clear for one credential string.
pub trait CredentialStore {
    fn get(&self) -> LensResult<Option<String>>;
    fn set(&self, key: &str) -> LensResult<()>;
    fn clear(&self) -> LensResult<()>;
}

/// Trim and sanity-check a key before storing it.
pub fn validate_api_key(raw: &str) -> LensResult<String> {
    let key = raw.trim();
    if key.len() < MIN_KEY_LEN {
        return Err(LensError::validation(
            "api_key",
            format!("must be at least {} characters", MIN_KEY_LEN),
            format!("{} characters", key.len()),
        ));
    }
    if key.chars().any(char::is_whitespace) {
        return Err(LensError::validation(
            "api_key",
            "must not contain whitespace",
            "<redacted>",
        ));
    }
    Ok(key.to_string())
}

/// Environment override first, then the store.
pub fn resolve_api_key(store: &dyn CredentialStore) -> LensResult<Option<String>> {
    if let Ok(key) = std::env::var(API_KEY_ENV) {
        let key = key.trim();
        if !key.is_empty() {
            debug!(source = API_KEY_ENV, "using API key from environment");
            return Ok(Some(key.to_string()));
        }
    }
    store.get()
}

/// Key kept in a private file under the user's config directory.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the default location.
    pub fn default_location() -> LensResult<Self> {
        let dir = if let Some(home) = env_path("DIFFLENS_HOME") {
            home
        } else if let Some(xdg) = env_path("XDG_CONFIG_HOME") {
            xdg.join("difflens")
        } else if let Some(home) = env_path("HOME") {
            home.join(".config").join("difflens")
        } else {
            return Err(LensError::config(
                "credential_path",
                "",
                "set DIFFLENS_HOME or HOME to locate the key file",
            ));
        };
        Ok(Self::new(dir.join(KEY_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self) -> LensResult<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => {
                let key = contents.trim();
                Ok((!key.is_empty()).then(|| key.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(LensError::io_at("read_credential", &self.path, e)),
        }
    }

    fn set(&self, key: &str) -> LensResult<()> {
        let key = validate_api_key(key)?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| LensError::io_at("create_credential_dir", parent, e))?;
        }

        let mut options = std::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options
            .open(&self.path)
            .map_err(|e| LensError::io_at("write_credential", &self.path, e))?;

        // mode() only applies to new files; tighten an existing one before writing
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))
                .map_err(|e| LensError::io_at("protect_credential", &self.path, e))?;
        }
        file.write_all(key.as_bytes())
            .map_err(|e| LensError::io_at("write_credential", &self.path, e))?;

        debug!(path = %self.path.display(), "stored API key");
        Ok(())
    }

    fn clear(&self) -> LensResult<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(LensError::io_at("remove_credential", &self.path, e)),
        }
    }
}

/// Process-local store, for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    key: Mutex<Option<String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> LensResult<std::sync::MutexGuard<'_, Option<String>>> {
        self.key
            .lock()
            .map_err(|_| LensError::state("poisoned", "access_credential", "credential lock poisoned"))
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self) -> LensResult<Option<String>> {
        Ok(self.slot()?.clone())
    }

    fn set(&self, key: &str) -> LensResult<()> {
        let key = validate_api_key(key)?;
        *self.slot()? = Some(key);
        Ok(())
    }

    fn clear(&self) -> LensResult<()> {
        *self.slot()? = None;
        Ok(())
    }
}

fn env_path(var: &str) -> Option<PathBuf> {
    std::env::var_os(var)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}
