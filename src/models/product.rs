//! Model products
use std::fmt;

use chrono::{DateTime, Utc};

use validator::Validate;

use models::{ModerationStatus, ProductId};

/// DB representation of a product listing.
///
/// `up_votes` and `down_votes` hold the emails of the voters and are kept
/// disjoint per user by the vote toggle. `is_reported` is latched to `true`
/// by the first report and is intentionally never reset when reports are
/// withdrawn.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub image: Option<String>,
    pub description: String,
    pub tags: Vec<String>,
    pub external_link: Option<String>,
    pub owner_email: String,
    pub owner_name: Option<String>,
    pub status: ModerationStatus,
    pub up_votes: Vec<String>,
    pub down_votes: Vec<String>,
    pub is_reported: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for creating a product. Status is not part of the draft: every
/// submission enters moderation as `pending`.
#[derive(Serialize, Deserialize, Clone, Validate, Debug)]
pub struct NewProduct {
    #[validate(length(min = "1", max = "120"))]
    pub name: String,
    pub image: Option<String>,
    #[validate(length(max = "4000"))]
    pub description: String,
    pub tags: Vec<String>,
    pub external_link: Option<String>,
    #[validate(email)]
    pub owner_email: String,
    pub owner_name: Option<String>,
}

/// Payload for updating product content. Status, votes and report state are
/// never touched by content updates.
#[derive(Serialize, Deserialize, Clone, Validate, Debug)]
pub struct UpdateProduct {
    #[validate(length(min = "1", max = "120"))]
    pub name: String,
    pub image: Option<String>,
    #[validate(length(max = "4000"))]
    pub description: String,
    pub tags: Vec<String>,
    pub external_link: Option<String>,
}

/// One page of published products plus the total count of matches.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ProductsPage {
    pub total: i64,
    pub products: Vec<Product>,
}

/// Direction of a product vote.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteDirection {
    Up,
    Down,
}

impl fmt::Display for VoteDirection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            VoteDirection::Up => write!(f, "up"),
            VoteDirection::Down => write!(f, "down"),
        }
    }
}

/// Updated vote sets returned to the caller after a toggle.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct VoteSummary {
    pub up_votes: Vec<String>,
    pub down_votes: Vec<String>,
}

/// Whether a user may create another product.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Entitlement {
    Allowed,
    FreeTierLimitReached,
}

impl fmt::Display for Entitlement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Entitlement::Allowed => write!(f, "allowed"),
            Entitlement::FreeTierLimitReached => write!(f, "free-tier limit reached"),
        }
    }
}

/// Toggles a user's vote on the two vote sets.
///
/// Voting the direction the user already holds removes the vote; voting the
/// other direction moves the email between the sets. The returned sets stay
/// disjoint for every user.
pub fn toggle_vote(
    up_votes: Vec<String>,
    down_votes: Vec<String>,
    user_email: &str,
    direction: VoteDirection,
) -> (Vec<String>, Vec<String>) {
    let mut up_votes = up_votes;
    let mut down_votes = down_votes;

    match direction {
        VoteDirection::Up => {
            if up_votes.iter().any(|e| e == user_email) {
                up_votes.retain(|e| e != user_email);
            } else {
                up_votes.push(user_email.to_string());
                down_votes.retain(|e| e != user_email);
            }
        }
        VoteDirection::Down => {
            if down_votes.iter().any(|e| e == user_email) {
                down_votes.retain(|e| e != user_email);
            } else {
                down_votes.push(user_email.to_string());
                up_votes.retain(|e| e != user_email);
            }
        }
    }

    (up_votes, down_votes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emails(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|e| e.to_string()).collect()
    }

    #[test]
    fn test_vote_adds_to_empty_set() {
        let (up, down) = toggle_vote(vec![], vec![], "a@example.com", VoteDirection::Up);
        assert_eq!(up, emails(&["a@example.com"]));
        assert!(down.is_empty());
    }

    #[test]
    fn test_same_direction_twice_toggles_off() {
        let (up, down) = toggle_vote(vec![], vec![], "a@example.com", VoteDirection::Down);
        let (up, down) = toggle_vote(up, down, "a@example.com", VoteDirection::Down);
        assert!(up.is_empty());
        assert!(down.is_empty());
    }

    #[test]
    fn test_opposite_direction_moves_the_vote() {
        let (up, down) = toggle_vote(vec![], vec![], "a@example.com", VoteDirection::Up);
        let (up, down) = toggle_vote(up, down, "a@example.com", VoteDirection::Down);
        assert!(up.is_empty());
        assert_eq!(down, emails(&["a@example.com"]));
    }

    #[test]
    fn test_sets_stay_disjoint_for_many_voters() {
        let mut up = emails(&["a@example.com", "b@example.com"]);
        let mut down = emails(&["c@example.com"]);

        for (email, direction) in &[
            ("a@example.com", VoteDirection::Down),
            ("c@example.com", VoteDirection::Up),
            ("b@example.com", VoteDirection::Up),
            ("d@example.com", VoteDirection::Down),
        ] {
            let (new_up, new_down) = toggle_vote(up, down, email, *direction);
            up = new_up;
            down = new_down;
            for e in &up {
                assert!(!down.contains(e), "{} present in both vote sets", e);
            }
        }

        assert_eq!(up, emails(&["c@example.com"]));
        assert_eq!(down, emails(&["a@example.com", "d@example.com"]));
    }

    #[test]
    fn test_other_voters_are_untouched() {
        let (up, down) = toggle_vote(
            emails(&["a@example.com", "b@example.com"]),
            emails(&["c@example.com"]),
            "b@example.com",
            VoteDirection::Down,
        );
        assert_eq!(up, emails(&["a@example.com"]));
        assert_eq!(down, emails(&["c@example.com", "b@example.com"]));
    }
}
