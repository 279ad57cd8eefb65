//! Client side of memosync: the HTTP calls a front end makes, where it keeps
//! its session token, and the navigation logic between its views.

use std::{fmt, io, result};

use reqwest::StatusCode;

pub mod api;
pub mod token;
pub mod view;

pub use api::Client;
pub use token::{FileTokenStore, MemoryTokenStore, TokenStore};
pub use view::{View, ViewController, ViewUpdate};

#[derive(Debug)]
pub enum Error {
    /// The request never produced a response.
    Http(reqwest::Error),
    /// The server answered with a failure status and this message.
    Status(StatusCode, String),
    /// No token stored, log in first.
    MissingToken,
    Token(io::Error),
}

pub type Result<T> = result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(e) => write!(fmt, "request failed: {e}"),
            Self::Status(status, message) => write!(fmt, "{message} ({status})"),
            Self::MissingToken => write!(fmt, "not logged in"),
            Self::Token(e) => write!(fmt, "couldn't access stored token: {e}"),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e)
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Self::Token(e)
    }
}
