//! Model comments
use chrono::{DateTime, Utc};

use validator::Validate;

use models::{CommentId, ProductId};

/// DB representation of a product comment. Comments are append-only: there
/// is no edit or delete surface.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Comment {
    pub id: CommentId,
    pub product_id: ProductId,
    pub user_email: String,
    pub user_name: Option<String>,
    pub user_photo: Option<String>,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Payload for creating a comment.
#[derive(Serialize, Deserialize, Clone, Validate, Debug)]
pub struct NewComment {
    #[validate(email)]
    pub user_email: String,
    pub user_name: Option<String>,
    pub user_photo: Option<String>,
    #[validate(length(min = "1", max = "2000"))]
    pub text: String,
}
