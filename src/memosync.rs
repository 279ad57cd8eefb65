use std::{result, sync::Arc};

use log::{debug, error, info, trace};
use warp::http;

use crate::args::Config;
use crate::auth::{AuthError, Bearer, PwHash, SessionIssuer};
use crate::backend::{Backend, CreateError, FindError};
use crate::memo::{Memo, MemoBody, MemoId, QueryMemos};
use crate::time::MemoDate;
use crate::user::{Login, LoginSuccess, Profile, Register};

pub struct MemoSync {
    backend: Backend,
    issuer: SessionIssuer,
}

/// A request that carried a valid token, scoped to the token's login.
pub struct MemoSyncAuthed {
    sync: Arc<MemoSync>,
    login: String,
    name: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    BadRequest(&'static str),
    Unauthorized(AuthError),
    NotFound(&'static str),
    Conflict,
    Internal(String),
}

pub type Result<T> = result::Result<T, Error>;

impl Error {
    pub fn message(&self) -> &str {
        match self {
            Self::BadRequest(msg) | Self::NotFound(msg) => msg,
            Self::Unauthorized(e) => e.message(),
            Self::Conflict => "login already exists",
            Self::Internal(msg) => msg,
        }
    }
}

impl From<Error> for http::StatusCode {
    fn from(e: Error) -> Self {
        match e {
            Error::Internal(_) => http::StatusCode::INTERNAL_SERVER_ERROR,
            Error::Unauthorized(_) => http::StatusCode::UNAUTHORIZED,
            Error::NotFound(_) => http::StatusCode::NOT_FOUND,
            // the login form reports a taken login like any other bad input
            Error::BadRequest(_) | Error::Conflict => http::StatusCode::BAD_REQUEST,
        }
    }
}

impl warp::reject::Reject for Error {}

pub const NO_USER: &str = "no user found";
pub const NO_MEMO: &str = "memo not found";

fn find_error(e: FindError) -> Error {
    match e {
        FindError::NotFound => Error::NotFound(NO_USER),
        FindError::MemoNotFound => Error::NotFound(NO_MEMO),
        FindError::Internal(msg) => Error::Internal(msg),
    }
}

/// Treats absent and empty fields alike.
fn required(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

impl MemoSync {
    pub fn new(backend: Backend, config: &Config) -> Self {
        Self {
            backend,
            issuer: SessionIssuer::new(&config.secret),
        }
    }

    pub fn issuer(&self) -> &SessionIssuer {
        &self.issuer
    }

    pub async fn register(&self, body: Register) -> Result<()> {
        let (Some(login), Some(name), Some(pwd), Some(pwd2)) = (
            required(&body.login),
            required(&body.name),
            required(&body.pwd),
            required(&body.pwd2),
        ) else {
            return Err(Error::BadRequest("all fields are required"));
        };

        if pwd != pwd2 {
            return Err(Error::BadRequest("passwords dont match"));
        }

        match self.backend.find_user(login).await {
            Ok(_) => {
                info!("{login} register: login taken");
                return Err(Error::Conflict);
            }
            Err(FindError::NotFound) => {}
            Err(e) => return Err(find_error(e)),
        }

        let pwhash = PwHash::new(pwd)
            .map_err(|()| Error::Internal("couldn't hash password".into()))?;
        self.backend
            .create_user(login, name, pwhash.as_str())
            .await
            .map_err(|e| match e {
                CreateError::Exists => {
                    info!("{login} register: lost race for login");
                    Error::Conflict
                }
                CreateError::Internal(msg) => Error::Internal(msg),
            })?;

        info!("{login} registered");
        Ok(())
    }

    pub async fn login(&self, body: Login) -> Result<LoginSuccess> {
        let (Some(login), Some(pwd)) = (required(&body.login), required(&body.pwd)) else {
            return Err(Error::BadRequest("all fields are required"));
        };

        let user = self.backend.find_user(login).await.map_err(|e| {
            if matches!(e, FindError::NotFound) {
                error!("rejecting non-existant user {login}");
            }
            find_error(e)
        })?;

        if !PwHash::from(user.pwd).verify(pwd) {
            error!("wrong password for user {login}");
            return Err(Error::BadRequest("incorrect password"));
        }

        let token = self.issuer.issue(login, &user.name).map_err(|()| {
            Error::Internal("couldn't sign token".into())
        })?;

        info!("{login} login: token issued");
        Ok(LoginSuccess {
            message: "login success".into(),
            name: user.name,
            token,
        })
    }

    pub fn logout(&self) {
        // tokens live until they expire, there's nothing to revoke
        debug!("logout");
    }

    pub fn authenticate(self: &Arc<Self>, header: Option<&str>) -> Result<MemoSyncAuthed> {
        let claims = Bearer::from_header(header)
            .and_then(|bearer| self.issuer.verify(bearer.token()))
            .map_err(|e| {
                info!("auth failed: {e}");
                Error::Unauthorized(e)
            })?;

        trace!("authenticated {}", claims.login);
        Ok(MemoSyncAuthed {
            sync: Arc::clone(self),
            login: claims.login,
            name: claims.name,
        })
    }
}

fn memo_fields(body: &MemoBody) -> Result<(&str, MemoDate)> {
    let (Some(content), Some(date)) = (required(&body.content), required(&body.date)) else {
        return Err(Error::BadRequest("date and content are required"));
    };

    let date = date.parse().map_err(|e| {
        debug!("unparseable memo date {date:?}: {e}");
        Error::BadRequest("invalid date")
    })?;

    Ok((content, date))
}

impl MemoSyncAuthed {
    pub fn login(&self) -> &str {
        &self.login
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn create(&self, body: MemoBody) -> Result<Memo> {
        let login = &self.login;
        let (content, date) = memo_fields(&body)?;

        let memo = Memo {
            id: MemoId::new(),
            content: content.into(),
            date,
        };

        self.sync
            .backend
            .add_memo(login, &memo)
            .await
            .map_err(find_error)?;

        info!("{login} created memo {}", memo.id);
        Ok(memo)
    }

    pub async fn list(&self, query: QueryMemos) -> Result<Vec<Memo>> {
        let login = &self.login;
        trace!("{login} listing memos, nbr={:?}", query.nbr);

        let mut memos = self
            .sync
            .backend
            .memos(login)
            .await
            .map_err(find_error)?;

        if let Some(nbr) = query.nbr {
            memos.truncate(nbr);
        }

        info!("{login}, {} memos", memos.len());
        Ok(memos)
    }

    pub async fn update(&self, id: MemoId, body: MemoBody) -> Result<Profile> {
        let login = &self.login;
        let (content, date) = memo_fields(&body)?;

        let user = self
            .sync
            .backend
            .update_memo(login, id, content, date)
            .await
            .map_err(|e| {
                if matches!(e, FindError::MemoNotFound) {
                    info!("{login} has no memo {id} to update");
                }
                find_error(e)
            })?;

        info!("{login} updated memo {id}");
        Ok(user.into())
    }

    pub async fn delete(&self, id: MemoId) -> Result<Profile> {
        let login = &self.login;

        let user = self
            .sync
            .backend
            .delete_memo(login, id)
            .await
            .map_err(|e| {
                if matches!(e, FindError::MemoNotFound) {
                    info!("{login} has no memo {id} to delete");
                }
                find_error(e)
            })?;

        info!("{login} deleted memo {id}");
        Ok(user.into())
    }
}
