use std::fs::{self, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::PathBuf;
use std::sync::Mutex;

/// Key the session token is stored under.
pub const TOKEN_KEY: &str = "token";

/// Where a client keeps its session token between requests and restarts.
pub trait TokenStore {
    fn get(&self) -> io::Result<Option<String>>;
    fn set(&self, token: &str) -> io::Result<()>;
    fn remove(&self) -> io::Result<()>;
}

/// Keeps the token in a file named [`TOKEN_KEY`] under a directory.
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            path: dir.into().join(TOKEN_KEY),
        }
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self) -> io::Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(token) => Ok(Some(token.trim().to_string()).filter(|t| !t.is_empty())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn set(&self, token: &str) -> io::Result<()> {
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);

        // only the owner may read the token
        #[cfg(unix)]
        {
            use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

            options.mode(0o600);
            if self.path.exists() {
                fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))?;
            }
        }

        let mut file = options.open(&self.path)?;
        file.write_all(token.as_bytes())
    }

    fn remove(&self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

#[derive(Default)]
pub struct MemoryTokenStore(Mutex<Option<String>>);

impl MemoryTokenStore {
    fn slot(&self) -> io::Result<std::sync::MutexGuard<'_, Option<String>>> {
        self.0
            .lock()
            .map_err(|_| io::Error::new(ErrorKind::Other, "token store poisoned"))
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> io::Result<Option<String>> {
        Ok(self.slot()?.clone())
    }

    fn set(&self, token: &str) -> io::Result<()> {
        *self.slot()? = Some(token.into());
        Ok(())
    }

    fn remove(&self) -> io::Result<()> {
        *self.slot()? = None;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn file_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path());

        assert_eq!(store.get().unwrap(), None);
        store.remove().unwrap();

        store.set("abc").unwrap();
        assert_eq!(store.get().unwrap().as_deref(), Some("abc"));
        assert!(dir.path().join(TOKEN_KEY).exists());

        // survives a fresh handle, like a page reload
        let reopened = FileTokenStore::new(dir.path());
        assert_eq!(reopened.get().unwrap().as_deref(), Some("abc"));

        store.remove().unwrap();
        assert_eq!(reopened.get().unwrap(), None);
    }

    #[cfg(unix)]
    #[test]
    fn file_store_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(TOKEN_KEY);

        fs::write(&path, "old").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        let store = FileTokenStore::new(dir.path());
        store.set("abc").unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(store.get().unwrap().as_deref(), Some("abc"));

        store.remove().unwrap();
        let fresh = FileTokenStore::new(dir.path());
        fresh.set("def").unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn memory_store() {
        let store = MemoryTokenStore::default();

        store.set("abc").unwrap();
        assert_eq!(store.get().unwrap().as_deref(), Some("abc"));
        store.remove().unwrap();
        assert_eq!(store.get().unwrap(), None);
    }
}
