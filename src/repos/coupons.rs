//! Coupons repo, presents CRUD operations with db for coupons
use chrono::Utc;

use failure::Error as FailureError;

use rusqlite::{Connection, OptionalExtension, Row};

use repos::acl;
use repos::acl::{Acl, CheckScope};
use repos::map_constraint_violation;
use repos::types::RepoResult;

use errors::Error;
use models::authorization::*;
use models::{Coupon, CouponCode, CouponId, NewCoupon, UserId};

const COUPON_COLUMNS: &'static str = "id, code, discount, value, expired_at, usage_limit, used_count, created_at";

/// Coupons repository, responsible for handling coupons
pub struct CouponsRepoImpl<'a> {
    pub db_conn: &'a Connection,
    pub acl: Box<Acl<Resource, Action, Scope, FailureError, Coupon>>,
}

pub trait CouponsRepo {
    /// Creates new coupon with zero `used_count`; duplicate codes are a
    /// conflict
    fn create(&self, payload: NewCoupon) -> RepoResult<Coupon>;

    /// List all coupons, newest first
    fn list(&self) -> RepoResult<Vec<Coupon>>;

    /// Get coupon by code
    fn get_by_code(&self, code_arg: CouponCode) -> RepoResult<Option<Coupon>>;

    /// Guarded atomic increment of `used_count`. Returns false when the
    /// usage limit left no slot, so two concurrent redemptions cannot both
    /// take the last one.
    fn increment_used(&self, code_arg: CouponCode) -> RepoResult<bool>;

    /// Delete coupon
    fn delete(&self, coupon_id: CouponId) -> RepoResult<Coupon>;
}

impl<'a> CouponsRepoImpl<'a> {
    pub fn new(db_conn: &'a Connection, acl: Box<Acl<Resource, Action, Scope, FailureError, Coupon>>) -> Self {
        Self { db_conn, acl }
    }

    fn fetch(&self, coupon_id: CouponId) -> RepoResult<Coupon> {
        let query = format!("SELECT {} FROM coupons WHERE id = ?1", COUPON_COLUMNS);
        self.db_conn
            .query_row(&query, params![coupon_id], row_to_coupon)
            .map_err(From::from)
    }
}

impl<'a> CouponsRepo for CouponsRepoImpl<'a> {
    /// Creates new coupon
    fn create(&self, payload: NewCoupon) -> RepoResult<Coupon> {
        debug!("Create new coupon {:?}.", payload);
        let code = payload.code.canonicalize();
        acl::check(&*self.acl, Resource::Coupons, Action::Create, self, None)
            .and_then(|_| {
                self.db_conn
                    .execute(
                        "INSERT INTO coupons (code, discount, value, expired_at, usage_limit, used_count, created_at)
                         VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)",
                        params![
                            code,
                            payload.discount,
                            payload.value,
                            payload.expired_at,
                            payload.usage_limit,
                            Utc::now()
                        ],
                    )
                    .map_err(map_constraint_violation)
            })
            .and_then(|_| self.fetch(CouponId(self.db_conn.last_insert_rowid() as i32)))
            .map_err(|e: FailureError| e.context(format!("Create new coupon {:?} error occurred", payload)).into())
    }

    /// List all coupons, newest first
    fn list(&self) -> RepoResult<Vec<Coupon>> {
        debug!("Find all coupons.");
        let query = format!("SELECT {} FROM coupons ORDER BY created_at DESC", COUPON_COLUMNS);
        self.db_conn
            .prepare(&query)
            .and_then(|mut stmt| stmt.query_map([], row_to_coupon)?.collect::<Result<Vec<Coupon>, _>>())
            .map_err(FailureError::from)
            .and_then(|coupons| {
                for coupon in &coupons {
                    acl::check(&*self.acl, Resource::Coupons, Action::Read, self, Some(coupon))?;
                }
                Ok(coupons)
            })
            .map_err(|e: FailureError| e.context("List all coupons").into())
    }

    /// Get coupon by code
    fn get_by_code(&self, code_arg: CouponCode) -> RepoResult<Option<Coupon>> {
        debug!("Find in coupon with code {}.", code_arg);
        let code = code_arg.canonicalize();
        let query = format!("SELECT {} FROM coupons WHERE code = ?1", COUPON_COLUMNS);
        self.db_conn
            .query_row(&query, params![code], row_to_coupon)
            .optional()
            .map_err(FailureError::from)
            .and_then(|coupon: Option<Coupon>| {
                if let Some(ref coupon) = coupon {
                    acl::check(&*self.acl, Resource::Coupons, Action::Read, self, Some(coupon))?;
                }
                Ok(coupon)
            })
            .map_err(|e: FailureError| e.context(format!("Find coupon by code: {} error occurred", code_arg)).into())
    }

    /// Guarded atomic increment of `used_count`
    fn increment_used(&self, code_arg: CouponCode) -> RepoResult<bool> {
        debug!("Increment used count of coupon {}.", code_arg);
        let code = code_arg.canonicalize();
        acl::check(&*self.acl, Resource::Coupons, Action::Update, self, None)
            .and_then(|_| {
                self.db_conn
                    .execute(
                        "UPDATE coupons SET used_count = used_count + 1
                         WHERE code = ?1 AND (usage_limit IS NULL OR used_count < usage_limit)",
                        params![code],
                    )
                    .map_err(FailureError::from)
            })
            .map(|updated| updated > 0)
            .map_err(|e: FailureError| {
                e.context(format!("Increment used count of coupon {} error occurred", code_arg))
                    .into()
            })
    }

    /// Delete coupon
    fn delete(&self, coupon_id_arg: CouponId) -> RepoResult<Coupon> {
        debug!("Delete coupon with id {:?}.", coupon_id_arg);
        acl::check(&*self.acl, Resource::Coupons, Action::Delete, self, None)
            .and_then(|_| {
                self.db_conn
                    .query_row(
                        &format!("SELECT {} FROM coupons WHERE id = ?1", COUPON_COLUMNS),
                        params![coupon_id_arg],
                        row_to_coupon,
                    )
                    .optional()
                    .map_err(FailureError::from)
            })
            .and_then(|coupon| match coupon {
                Some(coupon) => Ok(coupon),
                None => Err(format_err!("No coupon with id {}", coupon_id_arg).context(Error::NotFound).into()),
            })
            .and_then(|coupon| {
                self.db_conn
                    .execute("DELETE FROM coupons WHERE id = ?1", params![coupon_id_arg])
                    .map_err(FailureError::from)
                    .map(|_| coupon)
            })
            .map_err(|e: FailureError| e.context(format!("Delete coupon: {:?} error occurred", coupon_id_arg)).into())
    }
}

impl<'a> CheckScope<Scope, Coupon> for CouponsRepoImpl<'a> {
    fn is_in_scope(&self, _user_id: UserId, scope: &Scope, _obj: Option<&Coupon>) -> bool {
        match *scope {
            Scope::All => true,
            Scope::Owned => false,
        }
    }
}

fn row_to_coupon(row: &Row) -> ::rusqlite::Result<Coupon> {
    Ok(Coupon {
        id: row.get(0)?,
        code: row.get(1)?,
        discount: row.get(2)?,
        value: row.get(3)?,
        expired_at: row.get(4)?,
        usage_limit: row.get(5)?,
        used_count: row.get(6)?,
        created_at: row.get(7)?,
    })
}
