//! Coupons Services, presents CRUD operations with coupons plus the
//! verify/redeem pair used by checkout.
use chrono::{DateTime, Utc};

use futures::future;
use futures::future::IntoFuture;

use failure::Error as FailureError;

use rusqlite::{Transaction, TransactionBehavior};

use uuid::prelude::*;

use validator::Validate;

use errors::Error;
use models::{Coupon, CouponCode, CouponId, CouponValidate, NewCoupon};
use repos::ReposFactory;
use services::types::ServiceFuture;
use services::Service;

/// Length of generated coupon codes.
pub const GENERATE_CODE_LENGTH: usize = 12;

pub trait CouponsService {
    /// Creates new coupon
    fn create_coupon(&self, payload: NewCoupon) -> ServiceFuture<Coupon>;
    /// Returns all coupons, newest first
    fn list_coupons(&self) -> ServiceFuture<Vec<Coupon>>;
    /// Returns the coupon when it exists, is not expired and has usage left
    fn verify_coupon(&self, code_arg: CouponCode) -> ServiceFuture<Coupon>;
    /// Re-runs the verify checks and consumes one use of the coupon
    fn redeem_coupon(&self, code_arg: CouponCode) -> ServiceFuture<Coupon>;
    /// Deletes coupon
    fn delete_coupon(&self, coupon_id: CouponId) -> ServiceFuture<Coupon>;
    /// Generate coupon code
    fn generate_coupon_code(&self) -> ServiceFuture<String>;
}

impl<F: ReposFactory> CouponsService for Service<F> {
    /// Creates new coupon
    fn create_coupon(&self, payload: NewCoupon) -> ServiceFuture<Coupon> {
        let user_id = self.dynamic_context.user_id;
        let repo_factory = self.static_context.repo_factory.clone();

        if let Err(e) = payload.validate() {
            return Box::new(future::err(
                format_err!("Validation of NewCoupon failed")
                    .context(Error::Validate(e))
                    .into(),
            ));
        }

        self.spawn_on_pool(move |conn| {
            let coupons_repo = repo_factory.create_coupons_repo(&*conn, user_id);
            coupons_repo
                .create(payload)
                .map_err(|e| e.context("Service Coupons, create_coupon endpoint error occurred.").into())
        })
    }

    /// Returns all coupons, newest first
    fn list_coupons(&self) -> ServiceFuture<Vec<Coupon>> {
        let user_id = self.dynamic_context.user_id;
        let repo_factory = self.static_context.repo_factory.clone();

        self.spawn_on_pool(move |conn| {
            let coupons_repo = repo_factory.create_coupons_repo(&*conn, user_id);
            coupons_repo
                .list()
                .map_err(|e| e.context("Service Coupons, list_coupons endpoint error occurred.").into())
        })
    }

    /// Returns the coupon when it exists, is not expired and has usage left
    fn verify_coupon(&self, code_arg: CouponCode) -> ServiceFuture<Coupon> {
        let user_id = self.dynamic_context.user_id;
        let repo_factory = self.static_context.repo_factory.clone();

        self.spawn_on_pool(move |conn| {
            {
                let coupons_repo = repo_factory.create_coupons_repo(&*conn, user_id);
                let coupon = coupons_repo.get_by_code(code_arg.clone())?;
                let coupon = match coupon {
                    Some(coupon) => coupon,
                    None => {
                        return Err(format_err!("No coupon with code {}", code_arg)
                            .context(Error::NotFound)
                            .into())
                    }
                };
                coupon_checked(coupon, Utc::now())
            }
            .map_err(|e: FailureError| e.context("Service Coupons, verify_coupon endpoint error occurred.").into())
        })
    }

    /// Re-runs the verify checks and consumes one use of the coupon. The
    /// increment is guarded, so the last slot can be taken only once.
    fn redeem_coupon(&self, code_arg: CouponCode) -> ServiceFuture<Coupon> {
        let repo_factory = self.static_context.repo_factory.clone();

        self.spawn_on_pool(move |conn| {
            {
                let coupons_repo = repo_factory.create_coupons_repo_with_sys_acl(&*conn);

                let tx = Transaction::new_unchecked(&*conn, TransactionBehavior::Immediate)?;
                let coupon = coupons_repo.get_by_code(code_arg.clone())?;
                let coupon = match coupon {
                    Some(coupon) => coupon,
                    None => {
                        return Err(format_err!("No coupon with code {}", code_arg)
                            .context(Error::NotFound)
                            .into())
                    }
                };
                coupon_checked(coupon, Utc::now())?;

                let updated = coupons_repo.increment_used(code_arg.clone())?;
                if !updated {
                    return Err(format_err!("Coupon {} has no uses left", code_arg)
                        .context(Error::LimitReached)
                        .into());
                }
                let coupon = coupons_repo.get_by_code(code_arg.clone())?;
                let coupon = match coupon {
                    Some(coupon) => coupon,
                    None => {
                        return Err(format_err!("No coupon with code {}", code_arg)
                            .context(Error::NotFound)
                            .into())
                    }
                };
                tx.commit()?;
                Ok(coupon)
            }
            .map_err(|e: FailureError| e.context("Service Coupons, redeem_coupon endpoint error occurred.").into())
        })
    }

    /// Deletes coupon
    fn delete_coupon(&self, coupon_id_arg: CouponId) -> ServiceFuture<Coupon> {
        let user_id = self.dynamic_context.user_id;
        let repo_factory = self.static_context.repo_factory.clone();

        self.spawn_on_pool(move |conn| {
            let coupons_repo = repo_factory.create_coupons_repo(&*conn, user_id);
            coupons_repo
                .delete(coupon_id_arg)
                .map_err(|e| e.context("Service Coupons, delete_coupon endpoint error occurred.").into())
        })
    }

    /// Generate coupon code
    fn generate_coupon_code(&self) -> ServiceFuture<String> {
        let new_uuid = Uuid::new_v4().simple().to_string().to_uppercase();
        let result = Ok(new_uuid.chars().take(GENERATE_CODE_LENGTH).collect::<String>());

        Box::new(result.into_future())
    }
}

/// Pure coupon check used by both verify and redeem.
pub fn validate_coupon(coupon: &Coupon, now: DateTime<Utc>) -> CouponValidate {
    if coupon.expired_at < now {
        return CouponValidate::HasExpired;
    }

    if let Some(usage_limit) = coupon.usage_limit {
        if coupon.used_count >= usage_limit {
            return CouponValidate::LimitReached;
        }
    }

    CouponValidate::Valid
}

fn coupon_checked(coupon: Coupon, now: DateTime<Utc>) -> Result<Coupon, FailureError> {
    match validate_coupon(&coupon, now) {
        CouponValidate::Valid => Ok(coupon),
        CouponValidate::HasExpired => Err(format_err!("Coupon {} has expired", coupon.code)
            .context(Error::Expired)
            .into()),
        CouponValidate::LimitReached => Err(format_err!("Coupon {} usage limit reached", coupon.code)
            .context(Error::LimitReached)
            .into()),
    }
}

#[cfg(test)]
pub mod tests {
    use chrono::{Duration, Utc};
    use futures::Future;

    use errors::Error;
    use models::*;
    use repos::repo_factory::tests::*;
    use services::coupons::{validate_coupon, GENERATE_CODE_LENGTH};
    use services::*;

    fn create_new_coupon(code: &str) -> NewCoupon {
        NewCoupon {
            code: CouponCode(code.to_string()),
            discount: DiscountType::Percentage,
            value: 10,
            expired_at: Utc::now() + Duration::days(30),
            usage_limit: Some(5),
        }
    }

    #[test]
    fn test_create_coupon() {
        let service = create_service(Some(MOCK_ADMIN_ID), Some(MOCK_ADMIN_EMAIL.to_string()));
        let coupon = service.create_coupon(create_new_coupon("welcome10")).wait().unwrap();
        assert_eq!(coupon.code, CouponCode("WELCOME10".to_string()));
        assert_eq!(coupon.used_count, 0);
    }

    #[test]
    fn test_create_coupon_rejects_bad_code() {
        let service = create_service(Some(MOCK_ADMIN_ID), Some(MOCK_ADMIN_EMAIL.to_string()));
        let err = service.create_coupon(create_new_coupon("a b")).wait().unwrap_err();
        assert!(error_is(&err, |e| match *e {
            Error::Validate(_) => true,
            _ => false,
        }));
    }

    #[test]
    fn test_verify_coupon_valid() {
        let service = create_service(Some(MOCK_USER_ID), Some(MOCK_USER_EMAIL.to_string()));
        let coupon = service.verify_coupon(CouponCode::from(MOCK_COUPON_CODE)).wait().unwrap();
        assert_eq!(coupon.code, CouponCode::from(MOCK_COUPON_CODE));
    }

    #[test]
    fn test_verify_coupon_unknown() {
        let service = create_service(Some(MOCK_USER_ID), Some(MOCK_USER_EMAIL.to_string()));
        let err = service.verify_coupon(CouponCode::from("NOPE")).wait().unwrap_err();
        assert!(error_is(&err, |e| match *e {
            Error::NotFound => true,
            _ => false,
        }));
    }

    #[test]
    fn test_verify_coupon_expired() {
        let service = create_service(Some(MOCK_USER_ID), Some(MOCK_USER_EMAIL.to_string()));
        let err = service
            .verify_coupon(CouponCode::from(MOCK_EXPIRED_COUPON_CODE))
            .wait()
            .unwrap_err();
        assert!(error_is(&err, |e| match *e {
            Error::Expired => true,
            _ => false,
        }));
    }

    #[test]
    fn test_verify_coupon_limit_reached() {
        let service = create_service(Some(MOCK_USER_ID), Some(MOCK_USER_EMAIL.to_string()));
        let err = service
            .verify_coupon(CouponCode::from(MOCK_EXHAUSTED_COUPON_CODE))
            .wait()
            .unwrap_err();
        assert!(error_is(&err, |e| match *e {
            Error::LimitReached => true,
            _ => false,
        }));
    }

    #[test]
    fn test_redeem_coupon_at_limit_never_increments() {
        let service = create_service(Some(MOCK_USER_ID), Some(MOCK_USER_EMAIL.to_string()));
        let err = service
            .redeem_coupon(CouponCode::from(MOCK_EXHAUSTED_COUPON_CODE))
            .wait()
            .unwrap_err();
        assert!(error_is(&err, |e| match *e {
            Error::LimitReached => true,
            _ => false,
        }));
    }

    #[test]
    fn test_delete_coupon() {
        let service = create_service(Some(MOCK_ADMIN_ID), Some(MOCK_ADMIN_EMAIL.to_string()));
        let coupon = service.delete_coupon(MOCK_COUPON_ID).wait().unwrap();
        assert_eq!(coupon.id, MOCK_COUPON_ID);
    }

    #[test]
    fn test_generate_coupon_code() {
        let service = create_service(Some(MOCK_ADMIN_ID), Some(MOCK_ADMIN_EMAIL.to_string()));
        let code = service.generate_coupon_code().wait().unwrap();
        assert_eq!(code.len(), GENERATE_CODE_LENGTH);
        assert_eq!(code, code.to_uppercase());
    }

    #[test]
    fn test_validate_coupon_unlimited_usage() {
        let coupon = mock_coupon("FREEBIE", None, 1000, false);
        assert_eq!(validate_coupon(&coupon, Utc::now()), CouponValidate::Valid);
    }

    #[test]
    fn test_validate_coupon_expired() {
        let coupon = mock_coupon("OLD", Some(5), 0, true);
        assert_eq!(validate_coupon(&coupon, Utc::now()), CouponValidate::HasExpired);
    }

    #[test]
    fn test_validate_coupon_at_limit() {
        let coupon = mock_coupon("USED", Some(1), 1, false);
        assert_eq!(validate_coupon(&coupon, Utc::now()), CouponValidate::LimitReached);
    }

    #[test]
    fn test_validate_coupon_with_slots_left() {
        let coupon = mock_coupon("FRESH", Some(2), 1, false);
        assert_eq!(validate_coupon(&coupon, Utc::now()), CouponValidate::Valid);
    }
}
