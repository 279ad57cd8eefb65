use std::path::{Path, PathBuf};

use sqlx::{migrate::MigrateDatabase, query, query_as, FromRow, Pool, Sqlite, SqlitePool};
use time::OffsetDateTime;

use log::{error, info};

use crate::backend::{CreateError, FindError};
use crate::memo::{Memo, MemoId};
use crate::time::MemoDate;
use crate::user::User;

pub struct Backend(pub Pool<Sqlite>);

fn into_sql(path: &Path) -> PathBuf {
    path.join("memos.sql")
}

pub async fn init(data_dir: &Path) {
    let final_path = format!(
        "sqlite://{}",
        into_sql(data_dir).to_str().expect("non utf-8 data")
    );
    match Sqlite::create_database(&final_path).await {
        Ok(()) => {
            info!("Using {}", &final_path);
        }
        Err(e) => {
            let sqlx::Error::Database(db_err) = e else {
                panic!("error creating database: {e}");
            };

            panic!("sql db error: {db_err:?}");
        }
    }
}

impl Backend {
    pub async fn new(data_dir: &Path) -> Self {
        let db_pathbuf = into_sql(data_dir);
        let db_path = db_pathbuf.to_str().expect("non utf-8 data");
        let pool = match SqlitePool::connect(db_path).await {
            Ok(pool) => pool,
            Err(_err) => {
                init(data_dir).await;
                SqlitePool::connect(db_path).await.expect("db connection")
            }
        };

        Self::migrate(pool).await
    }

    pub async fn migrate(pool: Pool<Sqlite>) -> Self {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("migration");

        Self(pool)
    }
}

#[derive(FromRow)]
struct UserRow {
    login: String,
    name: String,
    pwd: String,
}

#[derive(FromRow)]
struct MemoRow {
    id: String,
    content: String,
    date: OffsetDateTime,
}

impl TryFrom<MemoRow> for Memo {
    type Error = FindError;

    fn try_from(row: MemoRow) -> Result<Self, Self::Error> {
        let id = row.id.parse().map_err(|e| {
            FindError::Internal(internal(&format!("stored memo id {:?}", row.id), e))
        })?;

        Ok(Memo {
            id,
            content: row.content,
            date: row.date.into(),
        })
    }
}

fn internal(what: &str, e: impl std::fmt::Debug) -> String {
    let msg = format!("{what}: {e:?}");
    error!("{msg}");
    msg
}

fn find_error(what: &str, e: sqlx::Error) -> FindError {
    if matches!(e, sqlx::Error::RowNotFound) {
        FindError::NotFound
    } else {
        FindError::Internal(internal(what, e))
    }
}

impl Backend {
    pub async fn find_user(&self, login: &str) -> Result<User, FindError> {
        let row = query_as::<_, UserRow>(
            "
            SELECT login, name, pwd
            FROM users
            WHERE login = ?
            ",
        )
        .bind(login)
        .fetch_one(&self.0)
        .await
        .map_err(|e| find_error(&format!("find user \"{login}\""), e))?;

        let memos = self.memos(login).await?;

        Ok(User {
            login: row.login,
            name: row.name,
            pwd: row.pwd,
            memos,
        })
    }

    pub async fn create_user(&self, login: &str, name: &str, pwd: &str) -> Result<(), CreateError> {
        query(
            "
            INSERT INTO users (login, name, pwd)
            VALUES (?, ?, ?)
            ",
        )
        .bind(login)
        .bind(name)
        .bind(pwd)
        .execute(&self.0)
        .await
        .map(|_| ())
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.message().contains("UNIQUE") => {
                CreateError::Exists
            }
            e => CreateError::Internal(internal(&format!("create user \"{login}\""), e)),
        })
    }

    pub async fn memos(&self, login: &str) -> Result<Vec<Memo>, FindError> {
        self.user_exists(login).await?;

        query_as::<_, MemoRow>(
            "
            SELECT id, content, date
            FROM memos
            WHERE owner_login = ?
            ORDER BY seq
            ",
        )
        .bind(login)
        .fetch_all(&self.0)
        .await
        .map_err(|e| find_error(&format!("memos for \"{login}\""), e))?
        .into_iter()
        .map(TryInto::try_into)
        .collect()
    }

    async fn user_exists(&self, login: &str) -> Result<(), FindError> {
        query("SELECT login FROM users WHERE login = ?")
            .bind(login)
            .fetch_one(&self.0)
            .await
            .map(|_| ())
            .map_err(|e| find_error(&format!("find user \"{login}\""), e))
    }

    pub async fn add_memo(&self, login: &str, memo: &Memo) -> Result<(), FindError> {
        self.user_exists(login).await?;

        let date: OffsetDateTime = memo.date.into();
        query(
            "
            INSERT INTO memos (id, owner_login, content, date)
            VALUES (?, ?, ?, ?)
            ",
        )
        .bind(memo.id.to_string())
        .bind(login)
        .bind(&memo.content)
        .bind(date)
        .execute(&self.0)
        .await
        .map(|_| ())
        .map_err(|e| FindError::Internal(internal(&format!("add memo for \"{login}\""), e)))
    }

    pub async fn update_memo(
        &self,
        login: &str,
        id: MemoId,
        content: &str,
        date: MemoDate,
    ) -> Result<User, FindError> {
        self.user_exists(login).await?;

        let date: OffsetDateTime = date.into();
        let result = query(
            "
            UPDATE memos
            SET content = ?, date = ?
            WHERE id = ? AND owner_login = ?
            ",
        )
        .bind(content)
        .bind(date)
        .bind(id.to_string())
        .bind(login)
        .execute(&self.0)
        .await
        .map_err(|e| FindError::Internal(internal(&format!("update memo {id}"), e)))?;

        if result.rows_affected() == 0 {
            return Err(FindError::MemoNotFound);
        }

        self.find_user(login).await
    }

    pub async fn delete_memo(&self, login: &str, id: MemoId) -> Result<User, FindError> {
        self.user_exists(login).await?;

        let result = query(
            "
            DELETE FROM memos
            WHERE id = ? AND owner_login = ?
            ",
        )
        .bind(id.to_string())
        .bind(login)
        .execute(&self.0)
        .await
        .map_err(|e| FindError::Internal(internal(&format!("delete memo {id}"), e)))?;

        if result.rows_affected() == 0 {
            return Err(FindError::MemoNotFound);
        }

        self.find_user(login).await
    }
}

#[cfg(test)]
pub mod test {
    use super::*;

    pub type Guard = ();

    pub async fn create_db() -> (Backend, Guard) {
        let url = "sqlite::memory:";

        // a single connection, otherwise each gets its own in-memory db
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect(url)
            .await
            .unwrap();

        (Backend::migrate(pool).await, ())
    }

    #[tokio::test]
    async fn create_refuses_duplicate_login() {
        let (backend, ()) = create_db().await;

        backend.create_user("a@x.com", "Al", "h").await.unwrap();
        let again = backend.create_user("a@x.com", "Bob", "h2").await;
        assert!(matches!(again, Err(CreateError::Exists)));
    }

    #[tokio::test]
    async fn memos_stay_with_their_owner() {
        let (backend, ()) = create_db().await;
        backend.create_user("a", "A", "h").await.unwrap();
        backend.create_user("b", "B", "h").await.unwrap();

        let memo = Memo {
            id: MemoId::new(),
            content: "mine".into(),
            date: MemoDate::now(),
        };
        backend.add_memo("a", &memo).await.unwrap();

        assert!(matches!(
            backend.delete_memo("b", memo.id).await,
            Err(FindError::MemoNotFound)
        ));
        assert_eq!(backend.memos("a").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unknown_user() {
        let (backend, ()) = create_db().await;

        assert!(matches!(
            backend.memos("nobody").await,
            Err(FindError::NotFound)
        ));
        assert!(matches!(
            backend.delete_memo("nobody", MemoId::new()).await,
            Err(FindError::NotFound)
        ));
        assert!(matches!(
            backend
                .update_memo("nobody", MemoId::new(), "x", MemoDate::now())
                .await,
            Err(FindError::NotFound)
        ));
    }
}
