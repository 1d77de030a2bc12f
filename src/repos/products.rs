//! Products repo, presents CRUD operations with db for product listings
use chrono::Utc;

use failure::Error as FailureError;

use rusqlite::types::ToSql;
use rusqlite::{Connection, OptionalExtension, Row};

use serde_json;

use repos::acl;
use repos::acl::{Acl, CheckScope};
use repos::types::{json_column, RepoResult};

use errors::Error;
use models::authorization::*;
use models::{ModerationStatus, NewProduct, Product, ProductId, UpdateProduct, UserId};

const PRODUCT_COLUMNS: &'static str =
    "id, name, image, description, tags, external_link, owner_email, owner_name, status, up_votes, down_votes, is_reported, created_at, updated_at";

/// Products repository, responsible for handling product listings
pub struct ProductsRepoImpl<'a> {
    pub db_conn: &'a Connection,
    pub acl: Box<Acl<Resource, Action, Scope, FailureError, Product>>,
}

pub trait ProductsRepo {
    /// Find specific product by id
    fn find(&self, product_id: ProductId) -> RepoResult<Option<Product>>;

    /// Creates new product in `pending` status
    fn create(&self, payload: NewProduct) -> RepoResult<Product>;

    /// Overwrites the content fields of a product; status, votes and report
    /// state are untouched
    fn update(&self, product_id: ProductId, payload: UpdateProduct) -> RepoResult<Product>;

    /// Sets the moderation status of a product
    fn set_status(&self, product_id: ProductId, status: ModerationStatus) -> RepoResult<Product>;

    /// Deletes the product; dependent comments, ratings and reports stay in
    /// place
    fn delete(&self, product_id: ProductId) -> RepoResult<()>;

    /// Number of products owned by the user, read at call time
    fn count_by_owner(&self, owner_email: String) -> RepoResult<i64>;

    /// Number of published products whose tags match `search_tag`
    fn count_published(&self, search_tag: Option<String>) -> RepoResult<i64>;

    /// Page of published products in natural id order
    fn list_published(&self, skip: i64, count: i64, search_tag: Option<String>) -> RepoResult<Vec<Product>>;

    /// Products awaiting moderation, newest first
    fn list_pending(&self) -> RepoResult<Vec<Product>>;

    /// Products of one owner, newest first
    fn list_by_owner(&self, owner_email: String) -> RepoResult<Vec<Product>>;

    /// Products with the given ids
    fn find_many(&self, ids: Vec<ProductId>) -> RepoResult<Vec<Product>>;

    /// Replaces the vote sets of a product
    fn update_votes(&self, product_id: ProductId, up_votes: Vec<String>, down_votes: Vec<String>) -> RepoResult<Product>;

    /// Latches the reported flag of a product
    fn set_reported(&self, product_id: ProductId) -> RepoResult<()>;
}

impl<'a> ProductsRepoImpl<'a> {
    pub fn new(db_conn: &'a Connection, acl: Box<Acl<Resource, Action, Scope, FailureError, Product>>) -> Self {
        Self { db_conn, acl }
    }

    fn fetch(&self, product_id: ProductId) -> RepoResult<Product> {
        let query = format!("SELECT {} FROM products WHERE id = ?1", PRODUCT_COLUMNS);
        self.db_conn
            .query_row(&query, params![product_id], row_to_product)
            .map_err(From::from)
    }

    fn existing(&self, product_id: ProductId) -> RepoResult<Product> {
        let query = format!("SELECT {} FROM products WHERE id = ?1", PRODUCT_COLUMNS);
        self.db_conn
            .query_row(&query, params![product_id], row_to_product)
            .optional()
            .map_err(FailureError::from)
            .and_then(|product| match product {
                Some(product) => Ok(product),
                None => Err(format_err!("No product with id {}", product_id).context(Error::NotFound).into()),
            })
    }

    fn select_products(&self, query: &str, params: &[&ToSql]) -> RepoResult<Vec<Product>> {
        let mut stmt = self.db_conn.prepare(query)?;
        let products = stmt
            .query_map(params, row_to_product)?
            .collect::<Result<Vec<Product>, _>>()?;
        Ok(products)
    }
}

impl<'a> ProductsRepo for ProductsRepoImpl<'a> {
    /// Find specific product by id
    fn find(&self, product_id_arg: ProductId) -> RepoResult<Option<Product>> {
        debug!("Find in products with id {}.", product_id_arg);
        let query = format!("SELECT {} FROM products WHERE id = ?1", PRODUCT_COLUMNS);
        self.db_conn
            .query_row(&query, params![product_id_arg], row_to_product)
            .optional()
            .map_err(FailureError::from)
            .and_then(|product: Option<Product>| {
                if let Some(ref product) = product {
                    acl::check(&*self.acl, Resource::Products, Action::Read, self, Some(product))?;
                }
                Ok(product)
            })
            .map_err(|e: FailureError| e.context(format!("Find product by id: {} error occurred", product_id_arg)).into())
    }

    /// Creates new product in `pending` status
    fn create(&self, payload: NewProduct) -> RepoResult<Product> {
        debug!("Create new product {:?}.", payload);
        let now = Utc::now();
        let tags = serde_json::to_string(&payload.tags)?;
        self.db_conn
            .execute(
                "INSERT INTO products (name, image, description, tags, external_link, owner_email, owner_name, status, up_votes, down_votes, is_reported, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, '[]', '[]', 0, ?9, ?9)",
                params![
                    payload.name,
                    payload.image,
                    payload.description,
                    tags,
                    payload.external_link,
                    payload.owner_email,
                    payload.owner_name,
                    ModerationStatus::Pending,
                    now
                ],
            )
            .map_err(FailureError::from)
            .and_then(|_| self.fetch(ProductId(self.db_conn.last_insert_rowid() as i32)))
            .and_then(|product| {
                acl::check(&*self.acl, Resource::Products, Action::Create, self, Some(&product))?;
                Ok(product)
            })
            .map_err(|e: FailureError| e.context(format!("Create new product {:?} error occurred", payload)).into())
    }

    /// Overwrites the content fields of a product
    fn update(&self, product_id_arg: ProductId, payload: UpdateProduct) -> RepoResult<Product> {
        debug!("Updating product with id {} and payload {:?}.", product_id_arg, payload);
        self.existing(product_id_arg)
            .and_then(|product| {
                acl::check(&*self.acl, Resource::Products, Action::Update, self, Some(&product))?;
                let tags = serde_json::to_string(&payload.tags)?;
                self.db_conn
                    .execute(
                        "UPDATE products SET name = ?1, image = ?2, description = ?3, tags = ?4, external_link = ?5, updated_at = ?6 WHERE id = ?7",
                        params![
                            payload.name,
                            payload.image,
                            payload.description,
                            tags,
                            payload.external_link,
                            Utc::now(),
                            product_id_arg
                        ],
                    )
                    .map_err(FailureError::from)
                    .and_then(|_| self.fetch(product_id_arg))
            })
            .map_err(|e: FailureError| {
                e.context(format!(
                    "Updates specific product: id: {}, payload: {:?}, error occurred",
                    product_id_arg, payload
                ))
                .into()
            })
    }

    /// Sets the moderation status of a product
    fn set_status(&self, product_id_arg: ProductId, status_arg: ModerationStatus) -> RepoResult<Product> {
        debug!("Set status {} for product {}.", status_arg, product_id_arg);
        self.existing(product_id_arg)
            .and_then(|product| {
                acl::check(&*self.acl, Resource::Products, Action::Moderate, self, Some(&product))?;
                self.db_conn
                    .execute(
                        "UPDATE products SET status = ?1 WHERE id = ?2",
                        params![status_arg, product_id_arg],
                    )
                    .map_err(FailureError::from)
                    .and_then(|_| self.fetch(product_id_arg))
            })
            .map_err(|e: FailureError| {
                e.context(format!(
                    "Set status {} for product {} error occurred",
                    status_arg, product_id_arg
                ))
                .into()
            })
    }

    /// Deletes the product
    fn delete(&self, product_id_arg: ProductId) -> RepoResult<()> {
        debug!("Delete product with id {}.", product_id_arg);
        self.existing(product_id_arg)
            .and_then(|product| {
                acl::check(&*self.acl, Resource::Products, Action::Delete, self, Some(&product))?;
                self.db_conn
                    .execute("DELETE FROM products WHERE id = ?1", params![product_id_arg])
                    .map_err(FailureError::from)
                    .map(|_| ())
            })
            .map_err(|e: FailureError| e.context(format!("Delete product {} error occurred", product_id_arg)).into())
    }

    /// Number of products owned by the user, read at call time
    fn count_by_owner(&self, owner_email_arg: String) -> RepoResult<i64> {
        debug!("Count products of owner {}.", owner_email_arg);
        acl::check(&*self.acl, Resource::Products, Action::Read, self, None)
            .and_then(|_| {
                self.db_conn
                    .query_row(
                        "SELECT COUNT(*) FROM products WHERE owner_email = ?1",
                        params![owner_email_arg],
                        |row| row.get(0),
                    )
                    .map_err(FailureError::from)
            })
            .map_err(|e: FailureError| {
                e.context(format!("Count products of owner {} error occurred", owner_email_arg))
                    .into()
            })
    }

    /// Number of published products whose tags match `search_tag`
    fn count_published(&self, search_tag: Option<String>) -> RepoResult<i64> {
        debug!("Count published products with search tag {:?}.", search_tag);
        acl::check(&*self.acl, Resource::Products, Action::Read, self, None)
            .and_then(|_| {
                self.db_conn
                    .query_row(
                        "SELECT COUNT(*) FROM products WHERE status = 'published' AND tags LIKE '%' || ?1 || '%'",
                        params![search_tag.unwrap_or_default()],
                        |row| row.get(0),
                    )
                    .map_err(FailureError::from)
            })
            .map_err(|e: FailureError| e.context("Count published products error occurred").into())
    }

    /// Page of published products in natural id order
    fn list_published(&self, skip: i64, count: i64, search_tag: Option<String>) -> RepoResult<Vec<Product>> {
        debug!(
            "List published products, skip {}, count {}, search tag {:?}.",
            skip, count, search_tag
        );
        let query = format!(
            "SELECT {} FROM products WHERE status = 'published' AND tags LIKE '%' || ?1 || '%' ORDER BY id LIMIT ?2 OFFSET ?3",
            PRODUCT_COLUMNS
        );
        let pattern = search_tag.unwrap_or_default();
        self.select_products(&query, &[&pattern as &ToSql, &count, &skip])
            .and_then(|products| {
                for product in &products {
                    acl::check(&*self.acl, Resource::Products, Action::Read, self, Some(product))?;
                }
                Ok(products)
            })
            .map_err(|e: FailureError| e.context("List published products error occurred").into())
    }

    /// Products awaiting moderation, newest first
    fn list_pending(&self) -> RepoResult<Vec<Product>> {
        debug!("List pending products.");
        acl::check(&*self.acl, Resource::Products, Action::Moderate, self, None)
            .and_then(|_| {
                let query = format!(
                    "SELECT {} FROM products WHERE status = 'pending' ORDER BY created_at DESC",
                    PRODUCT_COLUMNS
                );
                self.select_products(&query, &[])
            })
            .map_err(|e: FailureError| e.context("List pending products error occurred").into())
    }

    /// Products of one owner, newest first
    fn list_by_owner(&self, owner_email_arg: String) -> RepoResult<Vec<Product>> {
        debug!("List products of owner {}.", owner_email_arg);
        let query = format!(
            "SELECT {} FROM products WHERE owner_email = ?1 ORDER BY created_at DESC",
            PRODUCT_COLUMNS
        );
        self.select_products(&query, &[&owner_email_arg as &ToSql])
            .and_then(|products| {
                for product in &products {
                    acl::check(&*self.acl, Resource::Products, Action::Read, self, Some(product))?;
                }
                Ok(products)
            })
            .map_err(|e: FailureError| {
                e.context(format!("List products of owner {} error occurred", owner_email_arg))
                    .into()
            })
    }

    /// Products with the given ids
    fn find_many(&self, ids: Vec<ProductId>) -> RepoResult<Vec<Product>> {
        debug!("Find products with ids {:?}.", ids);
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let id_list = ids.iter().map(|id| id.to_string()).collect::<Vec<String>>().join(", ");
        let query = format!("SELECT {} FROM products WHERE id IN ({}) ORDER BY id", PRODUCT_COLUMNS, id_list);
        self.select_products(&query, &[])
            .and_then(|products| {
                for product in &products {
                    acl::check(&*self.acl, Resource::Products, Action::Read, self, Some(product))?;
                }
                Ok(products)
            })
            .map_err(|e: FailureError| e.context(format!("Find products with ids {:?} error occurred", ids)).into())
    }

    /// Replaces the vote sets of a product
    fn update_votes(&self, product_id_arg: ProductId, up_votes: Vec<String>, down_votes: Vec<String>) -> RepoResult<Product> {
        debug!("Update votes of product {}.", product_id_arg);
        self.existing(product_id_arg)
            .and_then(|product| {
                acl::check(&*self.acl, Resource::Votes, Action::Update, self, Some(&product))?;
                let up = serde_json::to_string(&up_votes)?;
                let down = serde_json::to_string(&down_votes)?;
                self.db_conn
                    .execute(
                        "UPDATE products SET up_votes = ?1, down_votes = ?2 WHERE id = ?3",
                        params![up, down, product_id_arg],
                    )
                    .map_err(FailureError::from)
                    .and_then(|_| self.fetch(product_id_arg))
            })
            .map_err(|e: FailureError| e.context(format!("Update votes of product {} error occurred", product_id_arg)).into())
    }

    /// Latches the reported flag of a product. The flag is never reset when
    /// reports are withdrawn.
    fn set_reported(&self, product_id_arg: ProductId) -> RepoResult<()> {
        debug!("Set reported flag of product {}.", product_id_arg);
        acl::check(&*self.acl, Resource::Reports, Action::Create, self, None)
            .and_then(|_| {
                self.db_conn
                    .execute("UPDATE products SET is_reported = 1 WHERE id = ?1", params![product_id_arg])
                    .map_err(FailureError::from)
                    .map(|_| ())
            })
            .map_err(|e: FailureError| {
                e.context(format!("Set reported flag of product {} error occurred", product_id_arg))
                    .into()
            })
    }
}

impl<'a> CheckScope<Scope, Product> for ProductsRepoImpl<'a> {
    fn is_in_scope(&self, user_id: UserId, scope: &Scope, obj: Option<&Product>) -> bool {
        match *scope {
            Scope::All => true,
            Scope::Owned => {
                if let Some(product) = obj {
                    self.db_conn
                        .query_row("SELECT email FROM users WHERE id = ?1", params![user_id], |row| {
                            row.get::<_, String>(0)
                        })
                        .map(|email| email == product.owner_email)
                        .unwrap_or(false)
                } else {
                    false
                }
            }
        }
    }
}

fn row_to_product(row: &Row) -> ::rusqlite::Result<Product> {
    Ok(Product {
        id: row.get(0)?,
        name: row.get(1)?,
        image: row.get(2)?,
        description: row.get(3)?,
        tags: json_column(row, 4)?,
        external_link: row.get(5)?,
        owner_email: row.get(6)?,
        owner_name: row.get(7)?,
        status: row.get(8)?,
        up_votes: json_column(row, 9)?,
        down_votes: json_column(row, 10)?,
        is_reported: row.get(11)?,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
    })
}
