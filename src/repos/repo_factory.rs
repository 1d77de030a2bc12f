//! Repo factory is the store-handle abstraction injected into the service
//! layer: one method per entity collection, each repo constructed over the
//! caller's connection with an ACL for the caller's roles.
use failure::Error as FailureError;

use rusqlite::Connection;

use models::*;
use repos::acl::{Acl, ApplicationAcl, SystemACL, UnauthorizedAcl};
use repos::*;

pub trait ReposFactory: Clone + Send + 'static {
    fn create_users_repo<'a>(&self, db_conn: &'a Connection, user_id: Option<UserId>) -> Box<UsersRepo + 'a>;
    fn create_users_repo_with_sys_acl<'a>(&self, db_conn: &'a Connection) -> Box<UsersRepo + 'a>;
    fn create_products_repo<'a>(&self, db_conn: &'a Connection, user_id: Option<UserId>) -> Box<ProductsRepo + 'a>;
    fn create_comments_repo<'a>(&self, db_conn: &'a Connection, user_id: Option<UserId>) -> Box<CommentsRepo + 'a>;
    fn create_reports_repo<'a>(&self, db_conn: &'a Connection, user_id: Option<UserId>) -> Box<ReportsRepo + 'a>;
    fn create_ratings_repo<'a>(&self, db_conn: &'a Connection, user_id: Option<UserId>) -> Box<RatingsRepo + 'a>;
    fn create_coupons_repo<'a>(&self, db_conn: &'a Connection, user_id: Option<UserId>) -> Box<CouponsRepo + 'a>;
    fn create_coupons_repo_with_sys_acl<'a>(&self, db_conn: &'a Connection) -> Box<CouponsRepo + 'a>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ReposFactoryImpl;

impl ReposFactoryImpl {
    pub fn get_roles(&self, id: UserId, db_conn: &Connection) -> Vec<UserRole> {
        UsersRepoImpl::new(
            db_conn,
            Box::new(SystemACL::default()) as Box<Acl<Resource, Action, Scope, FailureError, User>>,
        )
        .find(id)
        .ok()
        .and_then(|user| user)
        .map(|user| vec![user.role])
        .unwrap_or_default()
    }

    fn get_acl<'a, T>(&self, db_conn: &'a Connection, user_id: Option<UserId>) -> Box<Acl<Resource, Action, Scope, FailureError, T>> {
        user_id.map_or(
            Box::new(UnauthorizedAcl::default()) as Box<Acl<Resource, Action, Scope, FailureError, T>>,
            |id| {
                let roles = self.get_roles(id, db_conn);
                Box::new(ApplicationAcl::new(roles, id)) as Box<Acl<Resource, Action, Scope, FailureError, T>>
            },
        )
    }
}

impl ReposFactory for ReposFactoryImpl {
    fn create_users_repo<'a>(&self, db_conn: &'a Connection, user_id: Option<UserId>) -> Box<UsersRepo + 'a> {
        let acl = self.get_acl(db_conn, user_id);
        Box::new(UsersRepoImpl::new(db_conn, acl)) as Box<UsersRepo>
    }
    fn create_users_repo_with_sys_acl<'a>(&self, db_conn: &'a Connection) -> Box<UsersRepo + 'a> {
        Box::new(UsersRepoImpl::new(
            db_conn,
            Box::new(SystemACL::default()) as Box<Acl<Resource, Action, Scope, FailureError, User>>,
        )) as Box<UsersRepo>
    }
    fn create_products_repo<'a>(&self, db_conn: &'a Connection, user_id: Option<UserId>) -> Box<ProductsRepo + 'a> {
        let acl = self.get_acl(db_conn, user_id);
        Box::new(ProductsRepoImpl::new(db_conn, acl)) as Box<ProductsRepo>
    }
    fn create_comments_repo<'a>(&self, db_conn: &'a Connection, user_id: Option<UserId>) -> Box<CommentsRepo + 'a> {
        let acl = self.get_acl(db_conn, user_id);
        Box::new(CommentsRepoImpl::new(db_conn, acl)) as Box<CommentsRepo>
    }
    fn create_reports_repo<'a>(&self, db_conn: &'a Connection, user_id: Option<UserId>) -> Box<ReportsRepo + 'a> {
        let acl = self.get_acl(db_conn, user_id);
        Box::new(ReportsRepoImpl::new(db_conn, acl)) as Box<ReportsRepo>
    }
    fn create_ratings_repo<'a>(&self, db_conn: &'a Connection, user_id: Option<UserId>) -> Box<RatingsRepo + 'a> {
        let acl = self.get_acl(db_conn, user_id);
        Box::new(RatingsRepoImpl::new(db_conn, acl)) as Box<RatingsRepo>
    }
    fn create_coupons_repo<'a>(&self, db_conn: &'a Connection, user_id: Option<UserId>) -> Box<CouponsRepo + 'a> {
        let acl = self.get_acl(db_conn, user_id);
        Box::new(CouponsRepoImpl::new(db_conn, acl)) as Box<CouponsRepo>
    }
    fn create_coupons_repo_with_sys_acl<'a>(&self, db_conn: &'a Connection) -> Box<CouponsRepo + 'a> {
        Box::new(CouponsRepoImpl::new(
            db_conn,
            Box::new(SystemACL::default()) as Box<Acl<Resource, Action, Scope, FailureError, Coupon>>,
        )) as Box<CouponsRepo>
    }
}
