//! Session-scoped credential storage.
//!
//! Credentials live only as long as the user's session: either the login
//! session (files under the runtime directory, which the OS wipes at logout)
//! or, when no runtime directory exists, the running process. Nothing here
//! validates what gets stored; the lookup client and the remote service do
//! that.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use directories::ProjectDirs;

use crate::error::SessionError;
use crate::models::AiMode;

/// Raw string storage keyed by credential kind.
pub trait SessionStorage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// Storage that lives exactly as long as the value itself.
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.lock().ok()?;
        entries.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), value.to_string());
        }
    }

    fn remove(&self, key: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(key);
        }
    }
}

/// Storage for contexts without any session at all. Reads return `None`,
/// writes are dropped.
#[derive(Debug, Default, Clone, Copy)]
pub struct DetachedStorage;

impl SessionStorage for DetachedStorage {
    fn get(&self, _key: &str) -> Option<String> {
        None
    }

    fn set(&self, _key: &str, _value: &str) {}

    fn remove(&self, _key: &str) {}
}

/// One file per key beneath the per-user runtime directory.
pub struct RuntimeDirStorage {
    dir: PathBuf,
}

impl RuntimeDirStorage {
    /// Use the platform runtime directory for this application, if the
    /// platform has one.
    pub fn for_current_user() -> Option<Self> {
        let dirs = ProjectDirs::from("", "", "copyright-desk")?;
        dirs.runtime_dir().map(|dir| Self::at(dir.to_path_buf()))
    }

    pub fn at(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }

    fn write(&self, key: &str, value: &str) -> Result<(), SessionError> {
        let io = |source| SessionError::Io {
            key: key.to_string(),
            source,
        };
        fs::create_dir_all(&self.dir).map_err(io)?;
        let path = self.path_for(key);
        fs::write(&path, value).map_err(io)?;
        restrict_to_owner(&path).map_err(io)
    }
}

#[cfg(unix)]
fn restrict_to_owner(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_to_owner(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

impl SessionStorage for RuntimeDirStorage {
    fn get(&self, key: &str) -> Option<String> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(value) => Some(value),
            Err(err) if err.kind() == IoErrorKind::NotFound => None,
            Err(err) => {
                tracing::warn!(key, error = %err, "failed to read session value");
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) {
        if let Err(err) = self.write(key, value) {
            tracing::warn!(error = %err, "failed to store session value");
        }
    }

    fn remove(&self, key: &str) {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => {}
            Err(err) if err.kind() == IoErrorKind::NotFound => {}
            Err(err) => tracing::warn!(key, error = %err, "failed to remove session value"),
        }
    }
}

/// The credential kinds kept in session storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialKey {
    ApiKey,
    AuthHeader,
    UserName,
    DisplayName,
    AiMode,
}

impl CredentialKey {
    pub fn storage_key(self) -> &'static str {
        match self {
            CredentialKey::ApiKey => "api-key",
            CredentialKey::AuthHeader => "auth-header",
            CredentialKey::UserName => "user-name",
            CredentialKey::DisplayName => "display-name",
            CredentialKey::AiMode => "ai-mode",
        }
    }
}

/// Typed access to the session credentials. Cheap to clone; clones share the
/// same storage.
#[derive(Clone)]
pub struct SessionCredentials {
    storage: Arc<dyn SessionStorage>,
}

impl SessionCredentials {
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Self { storage }
    }

    /// Credentials backed by fresh in-memory storage.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    pub fn get(&self, key: CredentialKey) -> Option<String> {
        self.storage.get(key.storage_key())
    }

    pub fn set(&self, key: CredentialKey, value: &str) {
        self.storage.set(key.storage_key(), value);
    }

    pub fn remove(&self, key: CredentialKey) {
        self.storage.remove(key.storage_key());
    }

    pub fn api_key(&self) -> Option<String> {
        self.get(CredentialKey::ApiKey)
    }

    pub fn set_api_key(&self, api_key: &str) {
        self.set(CredentialKey::ApiKey, api_key);
    }

    pub fn remove_api_key(&self) {
        self.remove(CredentialKey::ApiKey);
    }

    /// The stored API key, unless it is blank.
    pub fn usable_api_key(&self) -> Option<String> {
        self.api_key().filter(|key| !key.trim().is_empty())
    }

    pub fn has_api_key(&self) -> bool {
        self.usable_api_key().is_some()
    }

    pub fn auth_header(&self) -> Option<String> {
        self.get(CredentialKey::AuthHeader)
    }

    pub fn set_auth_header(&self, header: &str) {
        self.set(CredentialKey::AuthHeader, header);
    }

    pub fn remove_auth_header(&self) {
        self.remove(CredentialKey::AuthHeader);
    }

    pub fn user_name(&self) -> Option<String> {
        self.get(CredentialKey::UserName)
    }

    pub fn set_user_name(&self, name: &str) {
        self.set(CredentialKey::UserName, name);
    }

    pub fn remove_user_name(&self) {
        self.remove(CredentialKey::UserName);
    }

    pub fn display_name(&self) -> Option<String> {
        self.get(CredentialKey::DisplayName)
    }

    pub fn set_display_name(&self, name: &str) {
        self.set(CredentialKey::DisplayName, name);
    }

    pub fn remove_display_name(&self) {
        self.remove(CredentialKey::DisplayName);
    }

    /// Stored AI mode, falling back to the default when nothing (or an
    /// unknown value) is stored.
    pub fn ai_mode(&self) -> AiMode {
        self.get(CredentialKey::AiMode)
            .and_then(|value| value.parse().ok())
            .unwrap_or_default()
    }

    pub fn set_ai_mode(&self, mode: AiMode) {
        self.set(CredentialKey::AiMode, mode.value());
    }

    pub fn remove_ai_mode(&self) {
        self.remove(CredentialKey::AiMode);
    }

    /// Whether someone has signed in during this session.
    pub fn is_signed_in(&self) -> bool {
        self.auth_header().is_some()
    }

    /// Forget the signed-in identity. The API key and AI mode are settings,
    /// not identity, and stay untouched.
    pub fn sign_out(&self) {
        self.remove_auth_header();
        self.remove_user_name();
        self.remove_display_name();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_storage_get_set_remove() {
        let credentials = SessionCredentials::in_memory();
        assert_eq!(credentials.api_key(), None);
        assert!(!credentials.has_api_key());

        credentials.set_api_key("secret");
        assert_eq!(credentials.api_key().as_deref(), Some("secret"));
        assert!(credentials.has_api_key());

        credentials.remove_api_key();
        assert_eq!(credentials.api_key(), None);
    }

    #[test]
    fn empty_api_key_does_not_count() {
        let credentials = SessionCredentials::in_memory();
        credentials.set_api_key("");
        assert!(!credentials.has_api_key());

        credentials.set_api_key("   ");
        assert!(!credentials.has_api_key());
        assert_eq!(credentials.usable_api_key(), None);
        assert_eq!(credentials.api_key().as_deref(), Some("   "));
    }

    #[test]
    fn clones_share_storage() {
        let credentials = SessionCredentials::in_memory();
        let clone = credentials.clone();
        clone.set_display_name("Kim");
        assert_eq!(credentials.display_name().as_deref(), Some("Kim"));
    }

    #[test]
    fn ai_mode_defaults_and_ignores_garbage() {
        let credentials = SessionCredentials::in_memory();
        assert_eq!(credentials.ai_mode(), AiMode::OpenAi);

        credentials.set_ai_mode(AiMode::Gemini);
        assert_eq!(credentials.ai_mode(), AiMode::Gemini);

        credentials.set(CredentialKey::AiMode, "quantum");
        assert_eq!(credentials.ai_mode(), AiMode::OpenAi);

        credentials.set_ai_mode(AiMode::Local);
        credentials.remove_ai_mode();
        assert_eq!(credentials.ai_mode(), AiMode::OpenAi);
    }

    #[test]
    fn sign_out_keeps_settings() {
        let credentials = SessionCredentials::in_memory();
        credentials.set_api_key("k");
        credentials.set_ai_mode(AiMode::Local);
        credentials.set_auth_header("Basic abc");
        credentials.set_user_name("kim");
        credentials.set_display_name("Kim");
        assert!(credentials.is_signed_in());

        credentials.sign_out();
        assert!(!credentials.is_signed_in());
        assert_eq!(credentials.user_name(), None);
        assert_eq!(credentials.display_name(), None);
        assert_eq!(credentials.api_key().as_deref(), Some("k"));
        assert_eq!(credentials.ai_mode(), AiMode::Local);
    }

    #[test]
    fn detached_storage_never_returns_values() {
        let credentials = SessionCredentials::new(Arc::new(DetachedStorage));
        credentials.set_api_key("secret");
        credentials.set_user_name("kim");
        assert_eq!(credentials.api_key(), None);
        assert_eq!(credentials.user_name(), None);
        assert_eq!(credentials.ai_mode(), AiMode::OpenAi);
        credentials.remove_api_key();
    }

    #[test]
    fn runtime_dir_storage_uses_one_file_per_key() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = RuntimeDirStorage::at(dir.path().join("session"));
        let credentials = SessionCredentials::new(Arc::new(RuntimeDirStorage::at(
            storage.dir().to_path_buf(),
        )));

        credentials.set_api_key("from-file");
        assert_eq!(storage.get("api-key").as_deref(), Some("from-file"));
        assert!(dir.path().join("session").join("api-key").exists());

        credentials.remove_api_key();
        assert_eq!(credentials.api_key(), None);
        credentials.remove_api_key();
    }
}
