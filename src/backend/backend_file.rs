use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use log::{error, info};

use crate::backend::{CreateError, FindError};
use crate::memo::{Memo, MemoId};
use crate::time::MemoDate;
use crate::user::User;

/// One JSON document per user, memos embedded in insertion order.
pub struct Backend {
    root: PathBuf,
    // one writer per user document at a time
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

pub async fn init(data_dir: &Path) {
    let users = data_dir.join("users");

    match fs::create_dir_all(&users) {
        Ok(()) => info!("Using {}", users.display()),
        Err(e) => panic!("couldn't create {}: {e}", users.display()),
    }
}

impl Backend {
    pub async fn new(data_dir: &Path) -> Self {
        init(data_dir).await;

        Self {
            root: data_dir.to_path_buf(),
            locks: Default::default(),
        }
    }
}

fn internal(what: &str, e: impl std::fmt::Debug) -> String {
    let msg = format!("{what}: {e:?}");
    error!("{msg}");
    msg
}

impl Backend {
    fn user_path(&self, login: &str) -> PathBuf {
        // logins are arbitrary text, keep them out of the path
        let mut p = self.root.join("users");
        p.push(format!("{}.json", sha256::digest(login)));
        p
    }

    fn read_user(&self, login: &str) -> Result<User, FindError> {
        let path = self.user_path(login);
        let file = File::open(&path).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                return FindError::NotFound;
            }
            FindError::Internal(internal(&format!("open {path:?}"), e))
        })?;

        serde_json::from_reader(BufReader::new(file))
            .map_err(|e| FindError::Internal(internal(&format!("parse {path:?}"), e)))
    }

    fn user_lock(&self, login: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(login.into()).or_default())
    }

    /// Readers see either the old or the new document, never a partial one.
    fn write_user(&self, user: &User) -> Result<(), std::io::Error> {
        let path = self.user_path(&user.login);
        let tmp = path.with_extension("json.tmp");

        let mut file = File::create(&tmp)?;
        serde_json::to_writer(&mut file, user)?;
        file.flush()?;
        file.sync_all()?;

        fs::rename(&tmp, &path)
    }

    async fn modify_user<R>(
        &self,
        login: &str,
        f: impl FnOnce(&mut User) -> Result<R, FindError>,
    ) -> Result<R, FindError> {
        let lock = self.user_lock(login);
        let _guard = lock.lock().await;

        let mut user = self.read_user(login)?;
        let r = f(&mut user)?;

        self.write_user(&user)
            .map_err(|e| FindError::Internal(internal(&format!("write \"{login}\""), e)))?;

        Ok(r)
    }
}

impl Backend {
    pub async fn find_user(&self, login: &str) -> Result<User, FindError> {
        self.read_user(login)
    }

    pub async fn create_user(&self, login: &str, name: &str, pwd: &str) -> Result<(), CreateError> {
        let user = User {
            login: login.into(),
            name: name.into(),
            pwd: pwd.into(),
            memos: vec![],
        };

        let lock = self.user_lock(login);
        let _guard = lock.lock().await;

        if self.user_path(login).exists() {
            return Err(CreateError::Exists);
        }

        self.write_user(&user)
            .map_err(|e| CreateError::Internal(internal(&format!("create \"{login}\""), e)))
    }

    pub async fn memos(&self, login: &str) -> Result<Vec<Memo>, FindError> {
        self.read_user(login).map(|user| user.memos)
    }

    pub async fn add_memo(&self, login: &str, memo: &Memo) -> Result<(), FindError> {
        self.modify_user(login, |user| {
            user.memos.push(memo.clone());
            Ok(())
        })
        .await
    }

    pub async fn update_memo(
        &self,
        login: &str,
        id: MemoId,
        content: &str,
        date: MemoDate,
    ) -> Result<User, FindError> {
        self.modify_user(login, |user| {
            let memo = user
                .memos
                .iter_mut()
                .find(|memo| memo.id == id)
                .ok_or(FindError::MemoNotFound)?;

            memo.content = content.into();
            memo.date = date;
            Ok(user.clone())
        })
        .await
    }

    pub async fn delete_memo(&self, login: &str, id: MemoId) -> Result<User, FindError> {
        self.modify_user(login, |user| {
            let index = user
                .memos
                .iter()
                .position(|memo| memo.id == id)
                .ok_or(FindError::MemoNotFound)?;

            user.memos.remove(index);
            Ok(user.clone())
        })
        .await
    }
}

#[cfg(test)]
pub mod test {
    use super::*;

    use tempfile::TempDir;

    pub type Guard = TempDir;

    pub async fn create_db() -> (Backend, Guard) {
        let dir = tempfile::tempdir().unwrap();
        let backend = Backend::new(dir.path()).await;
        (backend, dir)
    }

    #[tokio::test]
    async fn create_refuses_overwrite() {
        let (backend, _dir) = create_db().await;

        backend.create_user("a@x.com", "Al", "h").await.unwrap();
        let again = backend.create_user("a@x.com", "Bob", "h2").await;
        assert!(matches!(again, Err(CreateError::Exists)));

        let user = backend.find_user("a@x.com").await.unwrap();
        assert_eq!(user.name, "Al");
    }

    #[tokio::test]
    async fn logins_with_path_characters() {
        let (backend, dir) = create_db().await;

        backend.create_user("../../etc", "E", "h").await.unwrap();
        assert_eq!(backend.find_user("../../etc").await.unwrap().name, "E");

        let entries = fs::read_dir(dir.path().join("users")).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[tokio::test]
    async fn unknown_user() {
        let (backend, _dir) = create_db().await;

        assert!(matches!(
            backend.find_user("nobody").await,
            Err(FindError::NotFound)
        ));
        assert!(matches!(
            backend.delete_memo("nobody", MemoId::new()).await,
            Err(FindError::NotFound)
        ));
    }

    #[tokio::test]
    async fn missing_memo_is_not_a_missing_user() {
        let (backend, _dir) = create_db().await;
        backend.create_user("a", "A", "h").await.unwrap();

        assert!(matches!(
            backend.delete_memo("a", MemoId::new()).await,
            Err(FindError::MemoNotFound)
        ));
        assert!(matches!(
            backend
                .update_memo("a", MemoId::new(), "x", MemoDate::now())
                .await,
            Err(FindError::MemoNotFound)
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_writers_and_readers() {
        let (backend, _dir) = create_db().await;
        let backend = Arc::new(backend);
        backend.create_user("a", "A", "h").await.unwrap();

        let mut tasks = vec![];
        for i in 0..40 {
            let backend = Arc::clone(&backend);
            tasks.push(tokio::spawn(async move {
                let memo = Memo {
                    id: MemoId::new(),
                    content: format!("memo {i}"),
                    date: MemoDate::now(),
                };
                backend.add_memo("a", &memo).await?;
                backend.memos("a").await.map(|_| ())
            }));
        }

        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(backend.memos("a").await.unwrap().len(), 40);
    }
}
