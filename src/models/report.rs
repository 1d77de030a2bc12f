//! Model reports
use chrono::{DateTime, Utc};

use models::{ModerationStatus, Product, ProductId, ReportId};

/// DB representation of a product report. Presence of a row is the toggle
/// state: at most one active report exists per (product, user) pair and
/// deleting it is the un-report action.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Report {
    pub id: ReportId,
    pub product_id: ProductId,
    pub user_email: String,
    pub user_name: Option<String>,
    pub user_photo: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Reporter identity attached to a report toggle.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ReporterMeta {
    pub user_email: String,
    pub user_name: Option<String>,
    pub user_photo: Option<String>,
}

/// Result of a report toggle.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct ReportToggle {
    pub reported: bool,
}

/// Summary fields of a reported product, used for moderation triage.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ReportedProduct {
    pub id: ProductId,
    pub name: String,
    pub image: Option<String>,
    pub owner_name: Option<String>,
    pub owner_email: String,
    pub tags: Vec<String>,
    pub status: ModerationStatus,
    pub created_at: DateTime<Utc>,
}

impl From<Product> for ReportedProduct {
    fn from(product: Product) -> Self {
        ReportedProduct {
            id: product.id,
            name: product.name,
            image: product.image,
            owner_name: product.owner_name,
            owner_email: product.owner_email,
            tags: product.tags,
            status: product.status,
            created_at: product.created_at,
        }
    }
}

/// All reports filed against one product, newest first, with the product's
/// identifying fields.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ProductReports {
    pub product_id: ProductId,
    pub product_name: String,
    pub product_image: Option<String>,
    pub reports: Vec<Report>,
}
