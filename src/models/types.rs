//! Typed identifiers for the persisted entities.
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use rusqlite;
use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, ValueRef};

macro_rules! newtype_id {
    ($name:ident) => {
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub i32);

        impl $name {
            pub fn new(id: i32) -> Self {
                $name(id)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse::<i32>().map($name)
            }
        }

        impl From<i32> for $name {
            fn from(id: i32) -> Self {
                $name(id)
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput> {
                Ok(ToSqlOutput::from(self.0))
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef) -> FromSqlResult<Self> {
                i32::column_result(value).map($name)
            }
        }
    };
}

newtype_id!(UserId);
newtype_id!(ProductId);
newtype_id!(CommentId);
newtype_id!(ReportId);
newtype_id!(RatingId);
newtype_id!(CouponId);

/// Coupon code, stored and compared uppercase.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CouponCode(pub String);

impl CouponCode {
    /// Canonical form used for storage and lookups.
    pub fn canonicalize(&self) -> CouponCode {
        CouponCode(self.0.to_uppercase())
    }
}

impl fmt::Display for CouponCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for CouponCode {
    fn from(code: String) -> Self {
        CouponCode(code)
    }
}

impl<'a> From<&'a str> for CouponCode {
    fn from(code: &'a str) -> Self {
        CouponCode(code.to_string())
    }
}

impl ToSql for CouponCode {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput> {
        Ok(ToSqlOutput::from(self.0.clone()))
    }
}

impl FromSql for CouponCode {
    fn column_result(value: ValueRef) -> FromSqlResult<Self> {
        String::column_result(value).map(CouponCode)
    }
}
