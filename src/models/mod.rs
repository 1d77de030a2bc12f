//! Models contains all structures that are used in different
//! modules of the app

pub mod authorization;
pub mod comment;
pub mod coupon;
pub mod product;
pub mod rating;
pub mod report;
pub mod status;
pub mod types;
pub mod user;
pub mod user_role;
pub mod validation_rules;

pub use self::authorization::*;
pub use self::comment::*;
pub use self::coupon::*;
pub use self::product::*;
pub use self::rating::*;
pub use self::report::*;
pub use self::status::*;
pub use self::types::*;
pub use self::user::*;
pub use self::user_role::*;
pub use self::validation_rules::*;
