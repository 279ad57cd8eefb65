use serde::{Deserialize, Serialize};

use crate::memo::Memo;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct User {
    pub login: String,
    pub name: String,
    pub pwd: String,
    #[serde(default)]
    pub memos: Vec<Memo>,
}

/// A user as shown to its owner: everything but the password digest.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Profile {
    pub login: String,
    pub name: String,
    pub memos: Vec<Memo>,
}

impl From<User> for Profile {
    fn from(user: User) -> Self {
        let User {
            login, name, memos, ..
        } = user;

        Self { login, name, memos }
    }
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Register {
    pub login: Option<String>,
    pub name: Option<String>,
    pub pwd: Option<String>,
    pub pwd2: Option<String>,
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Login {
    pub login: Option<String>,
    pub pwd: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct LoginSuccess {
    pub message: String,
    pub name: String,
    pub token: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Message {
    pub message: String,
}

impl Message {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
