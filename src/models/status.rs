//! Moderation status of a product listing.
//!
//! A freshly submitted product is `Pending` until a moderator publishes or
//! declines it. The moderation contract has no path out of `Published` or
//! `Declined` back to `Pending`; the setter still accepts all three values,
//! which is what the existing admin surface relies on.
use std::fmt;
use std::str::FromStr;

use failure::Error as FailureError;

use rusqlite;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationStatus {
    Pending,
    Published,
    Declined,
}

impl ModerationStatus {
    pub fn as_str(&self) -> &'static str {
        match *self {
            ModerationStatus::Pending => "pending",
            ModerationStatus::Published => "published",
            ModerationStatus::Declined => "declined",
        }
    }
}

impl fmt::Display for ModerationStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ModerationStatus {
    type Err = FailureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ModerationStatus::Pending),
            "published" => Ok(ModerationStatus::Published),
            "declined" => Ok(ModerationStatus::Declined),
            other => Err(format_err!(
                "Status must be one of pending, published, declined, got: {}",
                other
            )),
        }
    }
}

impl ToSql for ModerationStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for ModerationStatus {
    fn column_result(value: ValueRef) -> FromSqlResult<Self> {
        let raw = String::column_result(value)?;
        raw.parse::<ModerationStatus>()
            .map_err(|e| FromSqlError::Other(Box::new(e.compat())))
    }
}
