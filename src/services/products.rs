//! Products Services, presents the product lifecycle: submission under the
//! free-tier entitlement, moderation status transitions and the listing
//! views.
use futures::future;

use failure::Error as FailureError;

use rusqlite::{Transaction, TransactionBehavior};

use validator::Validate;

use errors::Error;
use models::{Entitlement, ModerationStatus, NewProduct, Product, ProductId, ProductsPage, UpdateProduct, User};
use repos::ReposFactory;
use services::types::ServiceFuture;
use services::Service;

pub trait ProductsService {
    /// Submits a new product; subject to the entitlement check, enters
    /// moderation as `pending`
    fn create_product(&self, payload: NewProduct) -> ServiceFuture<Product>;
    /// Returns product by id
    fn get_product(&self, product_id: ProductId) -> ServiceFuture<Product>;
    /// Parses and applies a moderation status
    fn set_moderation_status(&self, product_id: ProductId, status_arg: String) -> ServiceFuture<Product>;
    /// Overwrites the content fields of a product
    fn update_product(&self, product_id: ProductId, payload: UpdateProduct) -> ServiceFuture<Product>;
    /// Deletes a product
    fn delete_product(&self, product_id: ProductId) -> ServiceFuture<()>;
    /// Page of published products with the total count of matches
    fn list_published(&self, page: i64, limit: i64, search_tag: Option<String>) -> ServiceFuture<ProductsPage>;
    /// Products awaiting moderation, newest first
    fn list_pending(&self) -> ServiceFuture<Vec<Product>>;
    /// Products of the authenticated owner, newest first
    fn list_by_owner(&self, email_arg: String) -> ServiceFuture<Vec<Product>>;
}

impl<F: ReposFactory> ProductsService for Service<F> {
    /// Submits a new product
    fn create_product(&self, payload: NewProduct) -> ServiceFuture<Product> {
        let user_id = self.dynamic_context.user_id;
        let repo_factory = self.static_context.repo_factory.clone();

        if let Err(e) = payload.validate() {
            return Box::new(future::err(
                format_err!("Validation of NewProduct failed")
                    .context(Error::Validate(e))
                    .into(),
            ));
        }

        let identity = match self.identity_email() {
            Ok(email) => email,
            Err(e) => return Box::new(future::err(e)),
        };
        if identity != payload.owner_email {
            return Box::new(future::err(
                format_err!("Product owner {} does not match the authenticated identity", payload.owner_email)
                    .context(Error::Forbidden)
                    .into(),
            ));
        }

        self.spawn_on_pool(move |conn| {
            {
                let users_repo = repo_factory.create_users_repo_with_sys_acl(&*conn);
                let products_repo = repo_factory.create_products_repo(&*conn, user_id);

                // The count check and the insert share one immediate
                // transaction, so two concurrent submissions cannot both
                // pass the free-tier gate.
                let tx = Transaction::new_unchecked(&*conn, TransactionBehavior::Immediate)?;
                let user = users_repo.find_by_email(payload.owner_email.clone())?;
                let user = match user {
                    Some(user) => user,
                    None => {
                        return Err(format_err!("No user with email {}", payload.owner_email)
                            .context(Error::NotFound)
                            .into())
                    }
                };
                let owned_products = products_repo.count_by_owner(payload.owner_email.clone())?;
                match check_entitlement(&user, owned_products) {
                    Entitlement::Allowed => (),
                    denied => return Err(format_err!("{}", denied).context(Error::Forbidden).into()),
                }
                let product = products_repo.create(payload)?;
                tx.commit()?;
                Ok(product)
            }
            .map_err(|e: FailureError| e.context("Service Products, create_product endpoint error occurred.").into())
        })
    }

    /// Returns product by id
    fn get_product(&self, product_id_arg: ProductId) -> ServiceFuture<Product> {
        let user_id = self.dynamic_context.user_id;
        let repo_factory = self.static_context.repo_factory.clone();

        self.spawn_on_pool(move |conn| {
            let products_repo = repo_factory.create_products_repo(&*conn, user_id);
            products_repo
                .find(product_id_arg)
                .and_then(|product| match product {
                    Some(product) => Ok(product),
                    None => Err(format_err!("No product with id {}", product_id_arg)
                        .context(Error::NotFound)
                        .into()),
                })
                .map_err(|e| e.context("Service Products, get_product endpoint error occurred.").into())
        })
    }

    /// Parses and applies a moderation status
    fn set_moderation_status(&self, product_id_arg: ProductId, status_arg: String) -> ServiceFuture<Product> {
        let user_id = self.dynamic_context.user_id;
        let repo_factory = self.static_context.repo_factory.clone();

        let status = match status_arg.parse::<ModerationStatus>() {
            Ok(status) => status,
            Err(e) => {
                return Box::new(future::err(
                    e.context(Error::Validate(
                        validation_errors!({"status": ["status" => "Status must be one of pending, published, declined"]}),
                    ))
                    .into(),
                ))
            }
        };

        self.spawn_on_pool(move |conn| {
            let products_repo = repo_factory.create_products_repo(&*conn, user_id);
            products_repo
                .set_status(product_id_arg, status)
                .map_err(|e| e.context("Service Products, set_moderation_status endpoint error occurred.").into())
        })
    }

    /// Overwrites the content fields of a product
    fn update_product(&self, product_id_arg: ProductId, payload: UpdateProduct) -> ServiceFuture<Product> {
        let user_id = self.dynamic_context.user_id;
        let repo_factory = self.static_context.repo_factory.clone();

        if let Err(e) = payload.validate() {
            return Box::new(future::err(
                format_err!("Validation of UpdateProduct failed")
                    .context(Error::Validate(e))
                    .into(),
            ));
        }

        self.spawn_on_pool(move |conn| {
            let products_repo = repo_factory.create_products_repo(&*conn, user_id);
            products_repo
                .update(product_id_arg, payload)
                .map_err(|e| e.context("Service Products, update_product endpoint error occurred.").into())
        })
    }

    /// Deletes a product. Comments, ratings and reports referencing it are
    /// left in place.
    fn delete_product(&self, product_id_arg: ProductId) -> ServiceFuture<()> {
        let user_id = self.dynamic_context.user_id;
        let repo_factory = self.static_context.repo_factory.clone();

        self.spawn_on_pool(move |conn| {
            let products_repo = repo_factory.create_products_repo(&*conn, user_id);
            products_repo
                .delete(product_id_arg)
                .map_err(|e| e.context("Service Products, delete_product endpoint error occurred.").into())
        })
    }

    /// Page of published products with the total count of matches. Pages are
    /// 1-based and come in natural id order.
    fn list_published(&self, page: i64, limit: i64, search_tag: Option<String>) -> ServiceFuture<ProductsPage> {
        let user_id = self.dynamic_context.user_id;
        let repo_factory = self.static_context.repo_factory.clone();
        let page = if page < 1 { 1 } else { page };
        let skip = (page - 1) * limit;

        self.spawn_on_pool(move |conn| {
            {
                let products_repo = repo_factory.create_products_repo(&*conn, user_id);
                let total = products_repo.count_published(search_tag.clone())?;
                let products = products_repo.list_published(skip, limit, search_tag)?;
                Ok(ProductsPage { total, products })
            }
            .map_err(|e: FailureError| e.context("Service Products, list_published endpoint error occurred.").into())
        })
    }

    /// Products awaiting moderation, newest first
    fn list_pending(&self) -> ServiceFuture<Vec<Product>> {
        let user_id = self.dynamic_context.user_id;
        let repo_factory = self.static_context.repo_factory.clone();

        self.spawn_on_pool(move |conn| {
            let products_repo = repo_factory.create_products_repo(&*conn, user_id);
            products_repo
                .list_pending()
                .map_err(|e| e.context("Service Products, list_pending endpoint error occurred.").into())
        })
    }

    /// Products of the authenticated owner, newest first
    fn list_by_owner(&self, email_arg: String) -> ServiceFuture<Vec<Product>> {
        let user_id = self.dynamic_context.user_id;
        let repo_factory = self.static_context.repo_factory.clone();

        let identity = match self.identity_email() {
            Ok(email) => email,
            Err(e) => return Box::new(future::err(e)),
        };
        if identity != email_arg {
            return Box::new(future::err(
                format_err!("Email {} does not match the authenticated identity", email_arg)
                    .context(Error::Forbidden)
                    .into(),
            ));
        }

        self.spawn_on_pool(move |conn| {
            let products_repo = repo_factory.create_products_repo(&*conn, user_id);
            products_repo
                .list_by_owner(email_arg)
                .map_err(|e| e.context("Service Products, list_by_owner endpoint error occurred.").into())
        })
    }
}

/// Verified users may always create products; unverified users only their
/// first one. The caller reads the product count at call time.
pub fn check_entitlement(user: &User, owned_products: i64) -> Entitlement {
    if user.is_verified {
        return Entitlement::Allowed;
    }

    if owned_products == 0 {
        Entitlement::Allowed
    } else {
        Entitlement::FreeTierLimitReached
    }
}
