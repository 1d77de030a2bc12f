//! Comments repo, presents append-only operations with db for product comments
use chrono::Utc;

use failure::Error as FailureError;

use rusqlite::{Connection, Row};

use repos::acl;
use repos::acl::{Acl, CheckScope};
use repos::types::RepoResult;

use models::authorization::*;
use models::{Comment, NewComment, ProductId, UserId};

const COMMENT_COLUMNS: &'static str = "id, product_id, user_email, user_name, user_photo, text, created_at";

/// Comments repository. Comments are append-only: no update or delete.
pub struct CommentsRepoImpl<'a> {
    pub db_conn: &'a Connection,
    pub acl: Box<Acl<Resource, Action, Scope, FailureError, Comment>>,
}

pub trait CommentsRepo {
    /// Creates new comment
    fn create(&self, product_id: ProductId, payload: NewComment) -> RepoResult<Comment>;

    /// All comments of a product, newest first
    fn list_for_product(&self, product_id: ProductId) -> RepoResult<Vec<Comment>>;
}

impl<'a> CommentsRepoImpl<'a> {
    pub fn new(db_conn: &'a Connection, acl: Box<Acl<Resource, Action, Scope, FailureError, Comment>>) -> Self {
        Self { db_conn, acl }
    }
}

impl<'a> CommentsRepo for CommentsRepoImpl<'a> {
    /// Creates new comment
    fn create(&self, product_id_arg: ProductId, payload: NewComment) -> RepoResult<Comment> {
        debug!("Create new comment for product {} {:?}.", product_id_arg, payload);
        acl::check(&*self.acl, Resource::Comments, Action::Create, self, None)
            .and_then(|_| {
                self.db_conn
                    .execute(
                        "INSERT INTO comments (product_id, user_email, user_name, user_photo, text, created_at)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                        params![
                            product_id_arg,
                            payload.user_email,
                            payload.user_name,
                            payload.user_photo,
                            payload.text,
                            Utc::now()
                        ],
                    )
                    .map_err(FailureError::from)
            })
            .and_then(|_| {
                let query = format!("SELECT {} FROM comments WHERE id = ?1", COMMENT_COLUMNS);
                self.db_conn
                    .query_row(&query, params![self.db_conn.last_insert_rowid()], row_to_comment)
                    .map_err(From::from)
            })
            .map_err(|e: FailureError| {
                e.context(format!("Create new comment for product {} error occurred", product_id_arg))
                    .into()
            })
    }

    /// All comments of a product, newest first
    fn list_for_product(&self, product_id_arg: ProductId) -> RepoResult<Vec<Comment>> {
        debug!("List comments for product {}.", product_id_arg);
        let query = format!(
            "SELECT {} FROM comments WHERE product_id = ?1 ORDER BY created_at DESC",
            COMMENT_COLUMNS
        );
        let result = self
            .db_conn
            .prepare(&query)
            .and_then(|mut stmt| {
                stmt.query_map(params![product_id_arg], row_to_comment)?
                    .collect::<Result<Vec<Comment>, _>>()
            })
            .map_err(FailureError::from);

        result
            .and_then(|comments| {
                for comment in &comments {
                    acl::check(&*self.acl, Resource::Comments, Action::Read, self, Some(comment))?;
                }
                Ok(comments)
            })
            .map_err(|e: FailureError| {
                e.context(format!("List comments for product {} error occurred", product_id_arg))
                    .into()
            })
    }
}

impl<'a> CheckScope<Scope, Comment> for CommentsRepoImpl<'a> {
    fn is_in_scope(&self, user_id: UserId, scope: &Scope, obj: Option<&Comment>) -> bool {
        match *scope {
            Scope::All => true,
            Scope::Owned => {
                if let Some(comment) = obj {
                    self.db_conn
                        .query_row("SELECT email FROM users WHERE id = ?1", params![user_id], |row| {
                            row.get::<_, String>(0)
                        })
                        .map(|email| email == comment.user_email)
                        .unwrap_or(false)
                } else {
                    false
                }
            }
        }
    }
}

fn row_to_comment(row: &Row) -> ::rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        product_id: row.get(1)?,
        user_email: row.get(2)?,
        user_name: row.get(3)?,
        user_photo: row.get(4)?,
        text: row.get(5)?,
        created_at: row.get(6)?,
    })
}
