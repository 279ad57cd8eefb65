pub mod args;
pub mod auth;
pub mod backend;
pub mod client;
pub mod memo;
pub mod memosync;
pub mod routes;
pub mod time;
pub mod user;

pub use crate::time::{MemoDate, Timestamp};
