//! File-backed bearer token store.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use secrecy::SecretString;

use crate::error::TokenError;

/// A bearer token read from the store.
#[derive(Debug, Clone)]
pub struct Credential {
    /// The token. Exposed only to build `Authorization` headers.
    pub token: SecretString,

    /// User the token was stored for.
    pub issued_to: String,
}

/// File-backed cache of bearer tokens under one credential directory.
///
/// One token file per user, named deterministically so every process
/// sharing the directory reads and writes the same path. There is no
/// in-memory caching: every read hits the filesystem, because a sibling
/// process may have refreshed the token after this process started.
#[derive(Debug, Clone)]
pub struct TokenStore {
    credential_dir: PathBuf,
}

impl TokenStore {
    /// Creates a store rooted at `credential_dir`.
    #[must_use]
    pub fn new(credential_dir: impl Into<PathBuf>) -> Self {
        Self {
            credential_dir: credential_dir.into(),
        }
    }

    /// Path of `user`'s token file.
    #[must_use]
    pub fn token_path(&self, user: &str) -> PathBuf {
        self.credential_dir
            .join(format!("token_{}.txt", sanitize_user(user)))
    }

    /// Path of `user`'s refresh lock marker.
    #[must_use]
    pub fn lock_path(&self, user: &str) -> PathBuf {
        self.credential_dir
            .join(format!("token_refresh_{}.lock", sanitize_user(user)))
    }

    /// Reads `user`'s token, stripping any trailing newline.
    ///
    /// Returns `Ok(None)` when the file is absent or empty. That is the
    /// expected state for a first-time user or while a refresh is writing,
    /// not an error; callers proceed and let the server's 401 drive a
    /// refresh.
    ///
    /// # Errors
    ///
    /// Returns an error when the file exists but cannot be read.
    pub fn read(&self, user: &str) -> Result<Option<Credential>, TokenError> {
        let path = self.token_path(user);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(error) => {
                return Err(TokenError::Read {
                    path,
                    source: error,
                });
            },
        };
        let token = raw.trim_end_matches(['\r', '\n']);
        if token.is_empty() {
            return Ok(None);
        }
        Ok(Some(Credential {
            token: SecretString::from(token.to_string()),
            issued_to: user.to_string(),
        }))
    }

    /// Atomically replaces `user`'s token file.
    ///
    /// Writes through a temp file in the same directory, syncs, then
    /// renames over the final path. Concurrent readers observe either the
    /// old token or the new one, never a torn write.
    ///
    /// # Errors
    ///
    /// Returns an error when the credential directory cannot be created or
    /// the write fails.
    pub fn write(&self, user: &str, token: &str) -> Result<(), TokenError> {
        let path = self.token_path(user);
        self.ensure_credential_dir(&path)?;
        atomic_write(&self.credential_dir, &path, token.as_bytes())
    }

    /// Creates an empty token file when none exists.
    ///
    /// A first-time user then starts from the absent-token state without
    /// any special casing: `read` returns `Ok(None)` and the first 401
    /// triggers a refresh.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be created.
    pub fn ensure_exists(&self, user: &str) -> Result<(), TokenError> {
        let path = self.token_path(user);
        self.ensure_credential_dir(&path)?;
        match fs::OpenOptions::new().create_new(true).write(true).open(&path) {
            Ok(_) => Ok(()),
            Err(error) if error.kind() == std::io::ErrorKind::AlreadyExists => Ok(()),
            Err(error) => Err(TokenError::Write {
                path,
                source: error,
            }),
        }
    }

    fn ensure_credential_dir(&self, token_path: &Path) -> Result<(), TokenError> {
        fs::create_dir_all(&self.credential_dir).map_err(|error| TokenError::Write {
            path: token_path.to_path_buf(),
            source: error,
        })
    }
}

/// Replaces path-hostile characters in a user name with `_`.
///
/// Typical service-account names pass through unchanged, so the on-disk
/// layout stays `token_<user>.txt`.
fn sanitize_user(user: &str) -> String {
    user.chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
                ch
            } else {
                '_'
            }
        })
        .collect()
}

/// Write bytes to a file atomically via `NamedTempFile` + fsync + persist.
fn atomic_write(dir: &Path, final_path: &Path, bytes: &[u8]) -> Result<(), TokenError> {
    let write_error = |source: std::io::Error| TokenError::Write {
        path: final_path.to_path_buf(),
        source,
    };

    let mut temp = tempfile::NamedTempFile::new_in(dir).map_err(write_error)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = fs::Permissions::from_mode(0o600);
        temp.as_file().set_permissions(perms).map_err(write_error)?;
    }

    temp.as_file_mut().write_all(bytes).map_err(write_error)?;
    temp.as_file().sync_all().map_err(write_error)?;
    temp.persist(final_path).map_err(|error| TokenError::Write {
        path: final_path.to_path_buf(),
        source: error.error,
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn test_read_absent_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path());
        assert!(store.read("svc_arwo").unwrap().is_none());
    }

    #[test]
    fn test_read_empty_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path());
        store.ensure_exists("svc_arwo").unwrap();
        assert!(store.token_path("svc_arwo").exists());
        assert!(store.read("svc_arwo").unwrap().is_none());
    }

    #[test]
    fn test_write_then_read_round_trips_without_newline() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path());
        store.write("svc_arwo", "tok-12345").unwrap();
        let credential = store.read("svc_arwo").unwrap().unwrap();
        assert_eq!(credential.token.expose_secret(), "tok-12345");
        assert_eq!(credential.issued_to, "svc_arwo");
    }

    #[test]
    fn test_read_strips_trailing_newlines() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path());
        fs::write(store.token_path("svc_arwo"), "tok-12345\r\n\n").unwrap();
        let credential = store.read("svc_arwo").unwrap().unwrap();
        assert_eq!(credential.token.expose_secret(), "tok-12345");
    }

    #[test]
    fn test_write_replaces_previous_token() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path());
        store.write("svc_arwo", "old").unwrap();
        store.write("svc_arwo", "new").unwrap();
        let credential = store.read("svc_arwo").unwrap().unwrap();
        assert_eq!(credential.token.expose_secret(), "new");
    }

    #[test]
    fn test_ensure_exists_does_not_clobber_existing_token() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path());
        store.write("svc_arwo", "tok").unwrap();
        store.ensure_exists("svc_arwo").unwrap();
        let credential = store.read("svc_arwo").unwrap().unwrap();
        assert_eq!(credential.token.expose_secret(), "tok");
    }

    #[test]
    fn test_paths_are_deterministic_and_per_user() {
        let store = TokenStore::new("/var/lib/arwo");
        assert_eq!(
            store.token_path("svc_arwo"),
            PathBuf::from("/var/lib/arwo/token_svc_arwo.txt")
        );
        assert_eq!(
            store.lock_path("svc_arwo"),
            PathBuf::from("/var/lib/arwo/token_refresh_svc_arwo.lock")
        );
        assert_ne!(store.token_path("alice"), store.token_path("bob"));
    }

    #[test]
    fn test_hostile_user_name_is_sanitized() {
        let store = TokenStore::new("/var/lib/arwo");
        let path = store.token_path("../etc/passwd");
        assert_eq!(path, PathBuf::from("/var/lib/arwo/token____etc_passwd.txt"));
    }
}
