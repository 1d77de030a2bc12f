//! Checkout Services, presents the payment-success confirmation: flips the
//! user to verified and redeems the supplied coupon.
use chrono::Utc;

use futures::future;

use failure::Error as FailureError;

use validator::Validate;

use errors::Error;
use models::{ConfirmPayment, CouponValidate, User};
use repos::ReposFactory;
use services::coupons::validate_coupon;
use services::types::ServiceFuture;
use services::Service;

pub trait CheckoutService {
    /// Handles the payment-success signal: marks the user verified
    /// (idempotent) and, when a coupon code is supplied, verifies and
    /// redeems it
    fn confirm_payment(&self, payload: ConfirmPayment) -> ServiceFuture<User>;
}

impl<F: ReposFactory> CheckoutService for Service<F> {
    /// Handles the payment-success signal
    fn confirm_payment(&self, payload: ConfirmPayment) -> ServiceFuture<User> {
        let user_id = self.dynamic_context.user_id;
        let repo_factory = self.static_context.repo_factory.clone();

        if let Err(e) = payload.validate() {
            return Box::new(future::err(
                format_err!("Validation of ConfirmPayment failed")
                    .context(Error::Validate(e))
                    .into(),
            ));
        }

        self.spawn_on_pool(move |conn| {
            {
                let users_repo = repo_factory.create_users_repo(&*conn, user_id);
                let coupons_repo = repo_factory.create_coupons_repo_with_sys_acl(&*conn);

                // The verification flip commits on its own. A coupon failure
                // below fails the whole call, but the flip is not rolled
                // back; re-running the confirmation is safe for the
                // verification step only.
                let user = users_repo.set_verified(payload.email.clone())?;

                if let Some(code) = payload.coupon_code {
                    let coupon = coupons_repo.get_by_code(code.clone())?;
                    let coupon = match coupon {
                        Some(coupon) => coupon,
                        None => {
                            return Err(format_err!("No coupon with code {}", code)
                                .context(Error::NotFound)
                                .into())
                        }
                    };
                    match validate_coupon(&coupon, Utc::now()) {
                        CouponValidate::Valid => (),
                        CouponValidate::HasExpired => {
                            return Err(format_err!("Coupon {} has expired", code).context(Error::Expired).into())
                        }
                        CouponValidate::LimitReached => {
                            return Err(format_err!("Coupon {} usage limit reached", code)
                                .context(Error::LimitReached)
                                .into())
                        }
                    }
                    let updated = coupons_repo.increment_used(code.clone())?;
                    if !updated {
                        return Err(format_err!("Coupon {} has no uses left", code)
                            .context(Error::LimitReached)
                            .into());
                    }
                }

                Ok(user)
            }
            .map_err(|e: FailureError| e.context("Service Checkout, confirm_payment endpoint error occurred.").into())
        })
    }
}
