//! Engagement Services, presents the vote and report toggles and the
//! moderation triage views built on top of them.
use futures::future;

use failure::Error as FailureError;

use rusqlite::{Transaction, TransactionBehavior};

use errors::Error;
use models::{
    toggle_vote, ProductId, ProductReports, ReportToggle, ReportedProduct, ReporterMeta, VoteDirection, VoteSummary,
};
use repos::ReposFactory;
use services::types::ServiceFuture;
use services::Service;

pub trait EngagementService {
    /// Toggles the caller's vote on a product and returns the updated sets
    fn vote_product(&self, product_id: ProductId, direction: VoteDirection) -> ServiceFuture<VoteSummary>;
    /// Toggles the caller's report on a product
    fn toggle_report(&self, product_id: ProductId, reporter: ReporterMeta) -> ServiceFuture<ReportToggle>;
    /// Reported products with their summary fields, most recently reported
    /// first
    fn list_reported_products(&self) -> ServiceFuture<Vec<ReportedProduct>>;
    /// All reports of one product, newest first
    fn list_product_reports(&self, product_id: ProductId) -> ServiceFuture<ProductReports>;
}

impl<F: ReposFactory> EngagementService for Service<F> {
    /// Toggles the caller's vote on a product and returns the updated sets
    fn vote_product(&self, product_id_arg: ProductId, direction: VoteDirection) -> ServiceFuture<VoteSummary> {
        let user_id = self.dynamic_context.user_id;
        let repo_factory = self.static_context.repo_factory.clone();

        let identity = match self.identity_email() {
            Ok(email) => email,
            Err(e) => return Box::new(future::err(e)),
        };

        self.spawn_on_pool(move |conn| {
            {
                let products_repo = repo_factory.create_products_repo(&*conn, user_id);

                let tx = Transaction::new_unchecked(&*conn, TransactionBehavior::Immediate)?;
                let product = products_repo.find(product_id_arg)?;
                let product = match product {
                    Some(product) => product,
                    None => {
                        return Err(format_err!("No product with id {}", product_id_arg)
                            .context(Error::NotFound)
                            .into())
                    }
                };
                let (up_votes, down_votes) = toggle_vote(product.up_votes, product.down_votes, &identity, direction);
                let product = products_repo.update_votes(product_id_arg, up_votes, down_votes)?;
                tx.commit()?;
                Ok(VoteSummary {
                    up_votes: product.up_votes,
                    down_votes: product.down_votes,
                })
            }
            .map_err(|e: FailureError| e.context("Service Engagement, vote_product endpoint error occurred.").into())
        })
    }

    /// Toggles the caller's report on a product. The product's reported flag
    /// is latched by the first report and stays set when the last report is
    /// withdrawn.
    fn toggle_report(&self, product_id_arg: ProductId, reporter: ReporterMeta) -> ServiceFuture<ReportToggle> {
        let user_id = self.dynamic_context.user_id;
        let repo_factory = self.static_context.repo_factory.clone();

        let identity = match self.identity_email() {
            Ok(email) => email,
            Err(e) => return Box::new(future::err(e)),
        };
        if identity != reporter.user_email {
            return Box::new(future::err(
                format_err!("Reporter {} does not match the authenticated identity", reporter.user_email)
                    .context(Error::Forbidden)
                    .into(),
            ));
        }

        self.spawn_on_pool(move |conn| {
            {
                let products_repo = repo_factory.create_products_repo(&*conn, user_id);
                let reports_repo = repo_factory.create_reports_repo(&*conn, user_id);

                let tx = Transaction::new_unchecked(&*conn, TransactionBehavior::Immediate)?;
                let product = products_repo.find(product_id_arg)?;
                if product.is_none() {
                    return Err(format_err!("No product with id {}", product_id_arg)
                        .context(Error::NotFound)
                        .into());
                }

                let existing = reports_repo.find_by_product_and_user(product_id_arg, reporter.user_email.clone())?;
                let toggle = match existing {
                    Some(report) => {
                        reports_repo.delete(report.id)?;
                        ReportToggle { reported: false }
                    }
                    None => {
                        reports_repo.create(product_id_arg, reporter)?;
                        products_repo.set_reported(product_id_arg)?;
                        ReportToggle { reported: true }
                    }
                };
                tx.commit()?;
                Ok(toggle)
            }
            .map_err(|e: FailureError| e.context("Service Engagement, toggle_report endpoint error occurred.").into())
        })
    }

    /// Reported products with their summary fields
    fn list_reported_products(&self) -> ServiceFuture<Vec<ReportedProduct>> {
        let user_id = self.dynamic_context.user_id;
        let repo_factory = self.static_context.repo_factory.clone();

        self.spawn_on_pool(move |conn| {
            {
                let reports_repo = repo_factory.create_reports_repo(&*conn, user_id);
                let products_repo = repo_factory.create_products_repo(&*conn, user_id);

                let product_ids = reports_repo.reported_product_ids()?;
                let products = products_repo.find_many(product_ids)?;
                Ok(products.into_iter().map(ReportedProduct::from).collect())
            }
            .map_err(|e: FailureError| {
                e.context("Service Engagement, list_reported_products endpoint error occurred.")
                    .into()
            })
        })
    }

    /// All reports of one product, newest first
    fn list_product_reports(&self, product_id_arg: ProductId) -> ServiceFuture<ProductReports> {
        let user_id = self.dynamic_context.user_id;
        let repo_factory = self.static_context.repo_factory.clone();

        self.spawn_on_pool(move |conn| {
            {
                let products_repo = repo_factory.create_products_repo(&*conn, user_id);
                let reports_repo = repo_factory.create_reports_repo(&*conn, user_id);

                let product = products_repo.find(product_id_arg)?;
                let product = match product {
                    Some(product) => product,
                    None => {
                        return Err(format_err!("No product with id {}", product_id_arg)
                            .context(Error::NotFound)
                            .into())
                    }
                };
                let reports = reports_repo.list_for_product(product_id_arg)?;
                Ok(ProductReports {
                    product_id: product.id,
                    product_name: product.name,
                    product_image: product.image,
                    reports,
                })
            }
            .map_err(|e: FailureError| {
                e.context("Service Engagement, list_product_reports endpoint error occurred.")
                    .into()
            })
        })
    }
}
