//! Ratings Services, presents the at-most-once rating insert and the mean
//! recomputation as one unit.
use futures::future;

use failure::Error as FailureError;

use rusqlite::{Transaction, TransactionBehavior};

use validator::Validate;

use errors::Error;
use models::{NewRating, ProductId, RatingSummary};
use repos::ReposFactory;
use services::types::ServiceFuture;
use services::Service;

pub trait RatingsService {
    /// Records a rating for (product, user) and returns it with the
    /// recomputed mean; a second rating for the pair is a conflict
    fn rate_product(&self, product_id: ProductId, payload: NewRating) -> ServiceFuture<RatingSummary>;
    /// Arithmetic mean of all ratings of a product, 0 when there are none
    fn average_rating(&self, product_id: ProductId) -> ServiceFuture<f64>;
}

impl<F: ReposFactory> RatingsService for Service<F> {
    /// Records a rating and returns it with the recomputed mean
    fn rate_product(&self, product_id_arg: ProductId, payload: NewRating) -> ServiceFuture<RatingSummary> {
        let user_id = self.dynamic_context.user_id;
        let repo_factory = self.static_context.repo_factory.clone();

        if let Err(e) = payload.validate() {
            return Box::new(future::err(
                format_err!("Validation of NewRating failed")
                    .context(Error::Validate(e))
                    .into(),
            ));
        }

        self.spawn_on_pool(move |conn| {
            {
                let ratings_repo = repo_factory.create_ratings_repo(&*conn, user_id);

                let tx = Transaction::new_unchecked(&*conn, TransactionBehavior::Immediate)?;
                let existing = ratings_repo.find_by_product_and_user(product_id_arg, payload.user_email.clone())?;
                if existing.is_some() {
                    return Err(format_err!(
                        "User {} already rated product {}",
                        payload.user_email,
                        product_id_arg
                    )
                    .context(Error::Conflict)
                    .into());
                }
                let rating = ratings_repo.create(product_id_arg, payload)?;
                let average = ratings_repo.average(product_id_arg)?;
                tx.commit()?;
                Ok(RatingSummary { rating, average })
            }
            .map_err(|e: FailureError| e.context("Service Ratings, rate_product endpoint error occurred.").into())
        })
    }

    /// Arithmetic mean of all ratings of a product
    fn average_rating(&self, product_id_arg: ProductId) -> ServiceFuture<f64> {
        let user_id = self.dynamic_context.user_id;
        let repo_factory = self.static_context.repo_factory.clone();

        self.spawn_on_pool(move |conn| {
            let ratings_repo = repo_factory.create_ratings_repo(&*conn, user_id);
            ratings_repo
                .average(product_id_arg)
                .map_err(|e| e.context("Service Ratings, average_rating endpoint error occurred.").into())
        })
    }
}
