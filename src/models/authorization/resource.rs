//! Enum for resources available in ACLs
use std::fmt;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Resource {
    Users,
    Products,
    Votes,
    Comments,
    Reports,
    Ratings,
    Coupons,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Resource::Users => write!(f, "users"),
            Resource::Products => write!(f, "products"),
            Resource::Votes => write!(f, "votes"),
            Resource::Comments => write!(f, "comments"),
            Resource::Reports => write!(f, "reports"),
            Resource::Ratings => write!(f, "ratings"),
            Resource::Coupons => write!(f, "coupons"),
        }
    }
}
