//! Ratings repo, presents insert-once operations with db for product ratings
use chrono::Utc;

use failure::Error as FailureError;

use rusqlite::{Connection, OptionalExtension, Row};

use repos::acl;
use repos::acl::{Acl, CheckScope};
use repos::map_constraint_violation;
use repos::types::RepoResult;

use models::authorization::*;
use models::{NewRating, ProductId, Rating, UserId};

const RATING_COLUMNS: &'static str = "id, product_id, user_email, score, created_at";

/// Ratings repository. A rating is immutable and unique per (product, user);
/// the average is always computed from the live rows.
pub struct RatingsRepoImpl<'a> {
    pub db_conn: &'a Connection,
    pub acl: Box<Acl<Resource, Action, Scope, FailureError, Rating>>,
}

pub trait RatingsRepo {
    /// Rating of a user for a product, if any
    fn find_by_product_and_user(&self, product_id: ProductId, user_email: String) -> RepoResult<Option<Rating>>;

    /// Creates new rating; the unique index rejects a second rating for the
    /// same (product, user) pair
    fn create(&self, product_id: ProductId, payload: NewRating) -> RepoResult<Rating>;

    /// Arithmetic mean of all ratings of a product, 0 when there are none
    fn average(&self, product_id: ProductId) -> RepoResult<f64>;
}

impl<'a> RatingsRepoImpl<'a> {
    pub fn new(db_conn: &'a Connection, acl: Box<Acl<Resource, Action, Scope, FailureError, Rating>>) -> Self {
        Self { db_conn, acl }
    }
}

impl<'a> RatingsRepo for RatingsRepoImpl<'a> {
    /// Rating of a user for a product, if any
    fn find_by_product_and_user(&self, product_id_arg: ProductId, user_email_arg: String) -> RepoResult<Option<Rating>> {
        debug!("Find rating for product {} by user {}.", product_id_arg, user_email_arg);
        let query = format!(
            "SELECT {} FROM ratings WHERE product_id = ?1 AND user_email = ?2",
            RATING_COLUMNS
        );
        self.db_conn
            .query_row(&query, params![product_id_arg, user_email_arg], row_to_rating)
            .optional()
            .map_err(FailureError::from)
            .and_then(|rating: Option<Rating>| {
                if let Some(ref rating) = rating {
                    acl::check(&*self.acl, Resource::Ratings, Action::Read, self, Some(rating))?;
                }
                Ok(rating)
            })
            .map_err(|e: FailureError| {
                e.context(format!(
                    "Find rating for product {} by user {} error occurred",
                    product_id_arg, user_email_arg
                ))
                .into()
            })
    }

    /// Creates new rating
    fn create(&self, product_id_arg: ProductId, payload: NewRating) -> RepoResult<Rating> {
        debug!("Create new rating for product {} {:?}.", product_id_arg, payload);
        acl::check(&*self.acl, Resource::Ratings, Action::Create, self, None)
            .and_then(|_| {
                self.db_conn
                    .execute(
                        "INSERT INTO ratings (product_id, user_email, score, created_at) VALUES (?1, ?2, ?3, ?4)",
                        params![product_id_arg, payload.user_email, payload.score, Utc::now()],
                    )
                    .map_err(map_constraint_violation)
            })
            .and_then(|_| {
                let query = format!("SELECT {} FROM ratings WHERE id = ?1", RATING_COLUMNS);
                self.db_conn
                    .query_row(&query, params![self.db_conn.last_insert_rowid()], row_to_rating)
                    .map_err(From::from)
            })
            .map_err(|e: FailureError| {
                e.context(format!("Create new rating for product {} error occurred", product_id_arg))
                    .into()
            })
    }

    /// Arithmetic mean of all ratings of a product, 0 when there are none
    fn average(&self, product_id_arg: ProductId) -> RepoResult<f64> {
        debug!("Average rating for product {}.", product_id_arg);
        acl::check(&*self.acl, Resource::Ratings, Action::Read, self, None)
            .and_then(|_| {
                self.db_conn
                    .query_row(
                        "SELECT AVG(score) FROM ratings WHERE product_id = ?1",
                        params![product_id_arg],
                        |row| row.get::<_, Option<f64>>(0),
                    )
                    .map(|average| average.unwrap_or(0.0))
                    .map_err(FailureError::from)
            })
            .map_err(|e: FailureError| {
                e.context(format!("Average rating for product {} error occurred", product_id_arg))
                    .into()
            })
    }
}

impl<'a> CheckScope<Scope, Rating> for RatingsRepoImpl<'a> {
    fn is_in_scope(&self, user_id: UserId, scope: &Scope, obj: Option<&Rating>) -> bool {
        match *scope {
            Scope::All => true,
            Scope::Owned => {
                if let Some(rating) = obj {
                    self.db_conn
                        .query_row("SELECT email FROM users WHERE id = ?1", params![user_id], |row| {
                            row.get::<_, String>(0)
                        })
                        .map(|email| email == rating.user_email)
                        .unwrap_or(false)
                } else {
                    false
                }
            }
        }
    }
}

fn row_to_rating(row: &Row) -> ::rusqlite::Result<Rating> {
    Ok(Rating {
        id: row.get(0)?,
        product_id: row.get(1)?,
        user_email: row.get(2)?,
        score: row.get(3)?,
        created_at: row.get(4)?,
    })
}
