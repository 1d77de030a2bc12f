//! Model coupons
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use failure::Error as FailureError;

use rusqlite;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};

use validator::Validate;

use models::validation_rules::*;
use models::{CouponCode, CouponId};

/// DB representation of a coupon.
///
/// `used_count` starts at zero and only moves through the guarded increment
/// on redemption, so it never exceeds `usage_limit` when a limit is set.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Coupon {
    pub id: CouponId,
    pub code: CouponCode,
    pub discount: DiscountType,
    pub value: i32,
    pub expired_at: DateTime<Utc>,
    pub usage_limit: Option<i32>,
    pub used_count: i32,
    pub created_at: DateTime<Utc>,
}

/// Payload for creating a coupon.
#[derive(Serialize, Deserialize, Clone, Validate, Debug)]
pub struct NewCoupon {
    #[validate(custom = "validate_coupon_code")]
    pub code: CouponCode,
    pub discount: DiscountType,
    #[validate(range(min = "1", max = "1000000"))]
    pub value: i32,
    pub expired_at: DateTime<Utc>,
    #[validate(range(min = "1", max = "1000000"))]
    pub usage_limit: Option<i32>,
}

/// Kind of discount a coupon applies at checkout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    Percentage,
    Fixed,
}

impl DiscountType {
    pub fn as_str(&self) -> &'static str {
        match *self {
            DiscountType::Percentage => "percentage",
            DiscountType::Fixed => "fixed",
        }
    }
}

impl fmt::Display for DiscountType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DiscountType {
    type Err = FailureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "percentage" => Ok(DiscountType::Percentage),
            "fixed" => Ok(DiscountType::Fixed),
            other => Err(format_err!("Discount type must be percentage or fixed, got: {}", other)),
        }
    }
}

impl ToSql for DiscountType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for DiscountType {
    fn column_result(value: ValueRef) -> FromSqlResult<Self> {
        let raw = String::column_result(value)?;
        raw.parse::<DiscountType>().map_err(|e| FromSqlError::Other(Box::new(e.compat())))
    }
}

/// Result of checking a coupon against expiry and usage limit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CouponValidate {
    Valid,
    HasExpired,
    LimitReached,
}
