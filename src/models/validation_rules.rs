use std::borrow::Cow;
use std::collections::HashMap;

use regex::Regex;
use validator::ValidationError;

use models::CouponCode;

pub fn validate_coupon_code(code: &CouponCode) -> Result<(), ValidationError> {
    lazy_static! {
        static ref COUPON_CODE_RE: Regex = Regex::new(r"^(?i)[a-z0-9][a-z0-9_-]{2,31}$").unwrap();
    }

    if COUPON_CODE_RE.is_match(&code.0) {
        Ok(())
    } else {
        Err(ValidationError {
            code: Cow::from("code"),
            message: Some(Cow::from("Coupon code must be 3-32 letters, digits, '-' or '_'")),
            params: HashMap::new(),
        })
    }
}
