//! Repos is a module responsible for interacting with the sqlite db
#[macro_use]
pub mod acl;
pub mod comments;
pub mod coupons;
pub mod products;
pub mod ratings;
pub mod repo_factory;
pub mod reports;
pub mod types;
pub mod users;

pub use self::acl::*;
pub use self::comments::*;
pub use self::coupons::*;
pub use self::products::*;
pub use self::ratings::*;
pub use self::repo_factory::*;
pub use self::reports::*;
pub use self::types::*;
pub use self::users::*;

use failure::Error as FailureError;
use failure::Fail;

use errors::Error;
use rusqlite;

/// Maps a unique-index violation to `Error::Conflict`; the unique indexes
/// are what give report, rating and coupon-code inserts their
/// insert-if-absent semantics.
pub fn map_constraint_violation(e: rusqlite::Error) -> FailureError {
    let conflict = match e {
        rusqlite::Error::SqliteFailure(ref f, _) => f.code == rusqlite::ErrorCode::ConstraintViolation,
        _ => false,
    };
    if conflict {
        e.context(Error::Conflict).into()
    } else {
        e.into()
    }
}
