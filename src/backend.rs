#[derive(Debug)]
pub enum FindError {
    /// No such user.
    NotFound,
    /// The user exists but has no memo with that id.
    MemoNotFound,
    Internal(String),
}

#[derive(Debug)]
pub enum CreateError {
    Exists,
    Internal(String),
}

#[cfg(feature = "backend-sql")]
mod backend_sql;
#[cfg(feature = "backend-sql")]
pub use backend_sql::*;

#[cfg(not(feature = "backend-sql"))]
mod backend_file;
#[cfg(not(feature = "backend-sql"))]
pub use backend_file::*;
