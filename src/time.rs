use std::fmt;
use std::str::FromStr;

use log::error;
use serde::{Deserialize, Serialize};
use ::time::{format_description::well_known::Rfc3339, OffsetDateTime};

/// Whole seconds since the unix epoch, as carried in token claims.
#[derive(Debug, Clone, Copy, PartialOrd, Ord, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    pub fn now() -> Result<Self, ()> {
        use std::time::SystemTime;

        SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|duration| Self(duration.as_secs()))
            .map_err(|e| {
                error!("couldn't get time: {e:?}");
            })
    }

    pub fn from_secs(secs: u64) -> Self {
        Self(secs)
    }

    pub fn secs(self) -> u64 {
        self.0
    }

    pub fn plus_secs(self, secs: u64) -> Self {
        Self(self.0.saturating_add(secs))
    }

    pub fn minus_secs(self, secs: u64) -> Self {
        Self(self.0.saturating_sub(secs))
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self(0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == 0 {
            return write!(fmt, "<epoch>");
        }

        let formatted = i64::try_from(self.0)
            .ok()
            .and_then(|secs| OffsetDateTime::from_unix_timestamp(secs).ok())
            .and_then(|when| when.format(&Rfc3339).ok());

        match formatted {
            Some(s) => write!(fmt, "{}", s),
            None => write!(fmt, "{}", self.0),
        }
    }
}

/// The client supplied date of a memo, exchanged as RFC 3339 text
/// (what a browser's `JSON.stringify(new Date())` produces).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemoDate(#[serde(with = "time::serde::rfc3339")] OffsetDateTime);

impl MemoDate {
    pub fn now() -> Self {
        Self(OffsetDateTime::now_utc())
    }
}

impl From<OffsetDateTime> for MemoDate {
    fn from(dt: OffsetDateTime) -> Self {
        Self(dt)
    }
}

impl From<MemoDate> for OffsetDateTime {
    fn from(date: MemoDate) -> Self {
        date.0
    }
}

impl FromStr for MemoDate {
    type Err = ::time::error::Parse;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OffsetDateTime::parse(s, &Rfc3339).map(Self)
    }
}

impl fmt::Display for MemoDate {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.format(&Rfc3339) {
            Ok(s) => write!(fmt, "{}", s),
            Err(_) => write!(fmt, "{}", self.0),
        }
    }
}
