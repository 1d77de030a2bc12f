//! Caller-visible failure taxonomy.
//!
//! Every service failure carries one of these variants somewhere in its
//! `failure` context chain; the dispatch boundary downcasts the chain to map
//! a failure to a transport status and a human-readable message.
use validator::ValidationErrors;

#[derive(Debug, Fail)]
pub enum Error {
    #[fail(display = "Not found")]
    NotFound,
    #[fail(display = "Parse error")]
    Parse,
    #[fail(display = "Validation error: {}", _0)]
    Validate(ValidationErrors),
    #[fail(display = "Server is refusing to fullfil the request")]
    Forbidden,
    #[fail(display = "Duplicate entry violates a unique constraint")]
    Conflict,
    #[fail(display = "Coupon has expired")]
    Expired,
    #[fail(display = "Coupon usage limit reached")]
    LimitReached,
    #[fail(display = "Connection to the store failed")]
    Connection,
}
