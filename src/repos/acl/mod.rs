//! Repos is a module responsible for interacting with access control lists
//! Authorization module contains authorization logic for the repo layer app

#[macro_use]
pub mod macros;

use std::collections::HashMap;
use std::rc::Rc;

use errors::Error;
use failure::Error as FailureError;

use models::authorization::*;
use models::{UserId, UserRole};

/// Access control layer for repos. It tells if a user can do an action on a
/// resource or not.
pub trait Acl<Resource, Action, Scope, E, T> {
    /// Tells if a user can do `action` on `resource`; `scope_checker` tells
    /// whether a concrete object lies in a scope for the user.
    fn allows(
        &self,
        resource: Resource,
        action: Action,
        scope_checker: &CheckScope<Scope, T>,
        obj: Option<&T>,
    ) -> Result<bool, E>;
}

/// `CheckScope` checks whether a resource is in the scope of the user.
pub trait CheckScope<Scope, T> {
    fn is_in_scope(&self, user_id: UserId, scope: &Scope, obj: Option<&T>) -> bool;
}

/// `SystemACL` allows all manipulations with resources. Used by the
/// bootstrap paths that act on behalf of the system itself.
#[derive(Clone, Debug, Default)]
pub struct SystemACL;

impl<T> Acl<Resource, Action, Scope, FailureError, T> for SystemACL {
    fn allows(
        &self,
        _resource: Resource,
        _action: Action,
        _scope_checker: &CheckScope<Scope, T>,
        _obj: Option<&T>,
    ) -> Result<bool, FailureError> {
        Ok(true)
    }
}

pub fn check<T>(
    acl: &Acl<Resource, Action, Scope, FailureError, T>,
    resource: Resource,
    action: Action,
    scope_checker: &CheckScope<Scope, T>,
    obj: Option<&T>,
) -> Result<(), FailureError> {
    acl.allows(resource, action, scope_checker, obj).and_then(|allowed| {
        if allowed {
            Ok(())
        } else {
            Err(format_err!("Denied request to do {:?} on {:?}", action, resource)
                .context(Error::Forbidden)
                .into())
        }
    })
}

/// ApplicationAcl contains main logic for manipulation with resources
#[derive(Clone)]
pub struct ApplicationAcl {
    acls: Rc<HashMap<UserRole, Vec<Permission>>>,
    roles: Vec<UserRole>,
    user_id: UserId,
}

impl ApplicationAcl {
    pub fn new(roles: Vec<UserRole>, user_id: UserId) -> Self {
        let mut hash = ::std::collections::HashMap::new();
        hash.insert(
            UserRole::Admin,
            vec![
                permission!(Resource::Users),
                permission!(Resource::Products),
                permission!(Resource::Votes),
                permission!(Resource::Comments),
                permission!(Resource::Reports),
                permission!(Resource::Ratings),
                permission!(Resource::Coupons),
            ],
        );
        hash.insert(
            UserRole::Moderator,
            vec![
                permission!(Resource::Products, Action::Read),
                permission!(Resource::Products, Action::Moderate),
                permission!(Resource::Comments, Action::Read),
                permission!(Resource::Reports, Action::Read),
                permission!(Resource::Ratings, Action::Read),
            ],
        );
        hash.insert(
            UserRole::User,
            vec![
                permission!(Resource::Users, Action::Read, Scope::Owned),
                permission!(Resource::Users, Action::Update, Scope::Owned),
                permission!(Resource::Users, Action::Delete, Scope::Owned),
                permission!(Resource::Products, Action::Read),
                permission!(Resource::Products, Action::Create, Scope::Owned),
                permission!(Resource::Products, Action::Update, Scope::Owned),
                permission!(Resource::Products, Action::Delete, Scope::Owned),
                permission!(Resource::Votes, Action::Update),
                permission!(Resource::Comments, Action::Read),
                permission!(Resource::Comments, Action::Create),
                permission!(Resource::Reports, Action::Create),
                permission!(Resource::Reports, Action::Read, Scope::Owned),
                permission!(Resource::Reports, Action::Delete, Scope::Owned),
                permission!(Resource::Ratings, Action::Read),
                permission!(Resource::Ratings, Action::Create),
                permission!(Resource::Coupons, Action::Read),
            ],
        );

        ApplicationAcl {
            acls: Rc::new(hash),
            roles,
            user_id,
        }
    }
}

impl<T> Acl<Resource, Action, Scope, FailureError, T> for ApplicationAcl {
    fn allows(
        &self,
        resource: Resource,
        action: Action,
        scope_checker: &CheckScope<Scope, T>,
        obj: Option<&T>,
    ) -> Result<bool, FailureError> {
        let empty: Vec<Permission> = Vec::new();
        let user_id = &self.user_id;
        let hashed_acls = self.acls.clone();
        let acls = self
            .roles
            .iter()
            .flat_map(|role| hashed_acls.get(role).unwrap_or(&empty))
            .filter(|permission| {
                (permission.resource == resource) && ((permission.action == action) || (permission.action == Action::All))
            })
            .filter(|permission| scope_checker.is_in_scope(*user_id, &permission.scope, obj));

        if acls.count() > 0 {
            Ok(true)
        } else {
            error!("Denied request from user {} to do {} on {}.", user_id, action, resource);
            Ok(false)
        }
    }
}

/// UnauthorizedAcl covers requests that carry no identity: the public
/// catalog surfaces stay readable, everything else is denied.
#[derive(Clone, Default)]
pub struct UnauthorizedAcl;

impl<T> Acl<Resource, Action, Scope, FailureError, T> for UnauthorizedAcl {
    fn allows(
        &self,
        resource: Resource,
        action: Action,
        _scope_checker: &CheckScope<Scope, T>,
        _obj: Option<&T>,
    ) -> Result<bool, FailureError> {
        if action == Action::Read {
            match resource {
                Resource::Products | Resource::Comments | Resource::Ratings | Resource::Coupons => Ok(true),
                _ => Ok(false),
            }
        } else {
            error!("Denied unauthorized request to do {} on {}.", action, resource);
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use models::*;
    use repos::acl::{Acl, ApplicationAcl, CheckScope, SystemACL, UnauthorizedAcl};

    fn create_product(owner_email: &str) -> Product {
        Product {
            id: ProductId(1),
            name: "Widget".to_string(),
            image: None,
            description: "A widget".to_string(),
            tags: vec!["tools".to_string()],
            external_link: None,
            owner_email: owner_email.to_string(),
            owner_name: None,
            status: ModerationStatus::Pending,
            up_votes: vec![],
            down_votes: vec![],
            is_reported: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[derive(Default)]
    struct ScopeChecker;

    impl CheckScope<Scope, Product> for ScopeChecker {
        fn is_in_scope(&self, user_id: UserId, scope: &Scope, obj: Option<&Product>) -> bool {
            match *scope {
                Scope::All => true,
                Scope::Owned => {
                    if let Some(product) = obj {
                        // user 1 owns owner@example.com in these tests
                        user_id == UserId(1) && product.owner_email == "owner@example.com"
                    } else {
                        false
                    }
                }
            }
        }
    }

    #[test]
    fn test_admin_can_do_everything_on_products() {
        let acl = ApplicationAcl::new(vec![UserRole::Admin], UserId(42));
        let s = ScopeChecker::default();
        let resource = create_product("owner@example.com");

        assert!(acl.allows(Resource::Products, Action::All, &s, Some(&resource)).unwrap());
        assert!(acl.allows(Resource::Products, Action::Moderate, &s, Some(&resource)).unwrap());
        assert!(acl.allows(Resource::Products, Action::Delete, &s, Some(&resource)).unwrap());
    }

    #[test]
    fn test_user_owns_own_products_only() {
        let acl = ApplicationAcl::new(vec![UserRole::User], UserId(1));
        let s = ScopeChecker::default();
        let own = create_product("owner@example.com");
        let foreign = create_product("other@example.com");

        assert!(acl.allows(Resource::Products, Action::Read, &s, Some(&foreign)).unwrap());
        assert!(acl.allows(Resource::Products, Action::Update, &s, Some(&own)).unwrap());
        assert!(!acl.allows(Resource::Products, Action::Update, &s, Some(&foreign)).unwrap());
        assert!(!acl.allows(Resource::Products, Action::Moderate, &s, Some(&own)).unwrap());
    }

    #[test]
    fn test_moderator_moderates_but_does_not_mutate() {
        let acl = ApplicationAcl::new(vec![UserRole::Moderator], UserId(7));
        let s = ScopeChecker::default();
        let resource = create_product("owner@example.com");

        assert!(acl.allows(Resource::Products, Action::Moderate, &s, Some(&resource)).unwrap());
        assert!(acl.allows(Resource::Products, Action::Read, &s, Some(&resource)).unwrap());
        assert!(!acl.allows(Resource::Products, Action::Update, &s, Some(&resource)).unwrap());
        assert!(!acl.allows(Resource::Products, Action::Delete, &s, Some(&resource)).unwrap());
    }

    #[test]
    fn test_plain_user_cannot_manage_coupons() {
        let user_acl = ApplicationAcl::new(vec![UserRole::User], UserId(1));
        let admin_acl = ApplicationAcl::new(vec![UserRole::Admin], UserId(2));
        let s = ScopeChecker::default();

        assert!(!user_acl.allows(Resource::Coupons, Action::Create, &s, None::<&Product>).unwrap());
        assert!(user_acl.allows(Resource::Coupons, Action::Read, &s, None::<&Product>).unwrap());
        assert!(admin_acl.allows(Resource::Coupons, Action::Create, &s, None::<&Product>).unwrap());
        assert!(admin_acl.allows(Resource::Coupons, Action::Delete, &s, None::<&Product>).unwrap());
    }

    #[test]
    fn test_unauthorized_is_read_only() {
        let acl = UnauthorizedAcl::default();
        let s = ScopeChecker::default();
        let resource = create_product("owner@example.com");

        assert!(acl.allows(Resource::Products, Action::Read, &s, Some(&resource)).unwrap());
        assert!(!acl.allows(Resource::Products, Action::Create, &s, Some(&resource)).unwrap());
        assert!(!acl.allows(Resource::Reports, Action::Read, &s, None::<&Product>).unwrap());
        assert!(!acl.allows(Resource::Users, Action::Read, &s, None::<&Product>).unwrap());
    }

    #[test]
    fn test_system_acl_allows_everything() {
        let acl = SystemACL::default();
        let s = ScopeChecker::default();

        assert!(acl.allows(Resource::Users, Action::Create, &s, None::<&Product>).unwrap());
        assert!(acl.allows(Resource::Coupons, Action::Update, &s, None::<&Product>).unwrap());
    }
}
