//! Model ratings
use chrono::{DateTime, Utc};

use validator::Validate;

use models::{ProductId, RatingId};

/// DB representation of a rating. Immutable once created; at most one per
/// (product, user) pair. The displayed average is always recomputed from the
/// live set and never stored on the product.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Rating {
    pub id: RatingId,
    pub product_id: ProductId,
    pub user_email: String,
    pub score: i32,
    pub created_at: DateTime<Utc>,
}

/// Payload for rating a product.
#[derive(Serialize, Deserialize, Clone, Validate, Debug)]
pub struct NewRating {
    #[validate(email)]
    pub user_email: String,
    #[validate(range(min = "1", max = "5"))]
    pub score: i32,
}

/// Rating plus the recomputed mean, returned as one unit.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RatingSummary {
    pub rating: Rating,
    pub average: f64,
}
