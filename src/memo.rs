use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::time::MemoDate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemoId(Uuid);

impl MemoId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl FromStr for MemoId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::try_parse(s).map(Self)
    }
}

impl fmt::Display for MemoId {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memo {
    pub id: MemoId,
    pub content: String,
    pub date: MemoDate,
}

/// Body of a memo create or update, as sent by clients.
///
/// Both fields are optional on the wire so that a missing field turns into
/// a 400 with a message rather than a body deserialisation failure.
#[serde_with::skip_serializing_none]
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct MemoBody {
    pub content: Option<String>,
    pub date: Option<String>,
}

impl MemoBody {
    pub fn new(content: &str, date: MemoDate) -> Self {
        Self {
            content: Some(content.into()),
            date: Some(date.to_string()),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct QueryMemos {
    pub nbr: Option<usize>,
}
