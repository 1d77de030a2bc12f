//! Users Services, presents CRUD operations with users and their settings
use futures::future;

use validator::Validate;

use errors::Error;
use models::{NewUser, UpdateUserSettings, User, UserRole, UserSettingsView};
use repos::ReposFactory;
use services::types::ServiceFuture;
use services::Service;

pub trait UsersService {
    /// Idempotent upsert-by-email, ran on first sign-in
    fn register_user(&self, payload: NewUser) -> ServiceFuture<User>;
    /// Returns user by email; the identity must match
    fn get_user(&self, email_arg: String) -> ServiceFuture<User>;
    /// Find users whose email contains `term`
    fn find_users(&self, term: Option<String>) -> ServiceFuture<Vec<User>>;
    /// Sets the role of a user
    fn update_role(&self, email_arg: String, role_arg: UserRole) -> ServiceFuture<User>;
    /// Returns settings of a user; the identity must match
    fn get_settings(&self, email_arg: String) -> ServiceFuture<UserSettingsView>;
    /// Updates settings of a user; the identity must match
    fn update_settings(&self, email_arg: String, payload: UpdateUserSettings) -> ServiceFuture<User>;
    /// Deletes the account; the identity must match
    fn delete_account(&self, email_arg: String) -> ServiceFuture<()>;
}

impl<F: ReposFactory> UsersService for Service<F> {
    /// Idempotent upsert-by-email, ran on first sign-in
    fn register_user(&self, payload: NewUser) -> ServiceFuture<User> {
        let repo_factory = self.static_context.repo_factory.clone();

        if let Err(e) = payload.validate() {
            return Box::new(future::err(
                format_err!("Validation of NewUser failed")
                    .context(Error::Validate(e))
                    .into(),
            ));
        }

        self.spawn_on_pool(move |conn| {
            let users_repo = repo_factory.create_users_repo_with_sys_acl(&*conn);
            users_repo
                .find_by_email(payload.email.clone())
                .and_then(|user| match user {
                    Some(user) => Ok(user),
                    None => users_repo.create(payload),
                })
                .map_err(|e| e.context("Service Users, register_user endpoint error occurred.").into())
        })
    }

    /// Returns user by email; the identity must match
    fn get_user(&self, email_arg: String) -> ServiceFuture<User> {
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
            let users_repo = repo_factory.create_users_repo(&*conn, user_id);
            users_repo
                .find_by_email(email_arg.clone())
                .and_then(|user| match user {
                    Some(user) => Ok(user),
                    None => Err(format_err!("No user with email {}", email_arg).context(Error::NotFound).into()),
                })
                .map_err(|e| e.context("Service Users, get_user endpoint error occurred.").into())
        })
    }

    /// Find users whose email contains `term`
    fn find_users(&self, term: Option<String>) -> ServiceFuture<Vec<User>> {
        let user_id = self.dynamic_context.user_id;
        let repo_factory = self.static_context.repo_factory.clone();

        self.spawn_on_pool(move |conn| {
            let users_repo = repo_factory.create_users_repo(&*conn, user_id);
            users_repo
                .find_by_email_term(term)
                .map_err(|e| e.context("Service Users, find_users endpoint error occurred.").into())
        })
    }

    /// Sets the role of a user
    fn update_role(&self, email_arg: String, role_arg: UserRole) -> ServiceFuture<User> {
        let user_id = self.dynamic_context.user_id;
        let repo_factory = self.static_context.repo_factory.clone();

        self.spawn_on_pool(move |conn| {
            let users_repo = repo_factory.create_users_repo(&*conn, user_id);
            users_repo
                .update_role(email_arg, role_arg)
                .map_err(|e| e.context("Service Users, update_role endpoint error occurred.").into())
        })
    }

    /// Returns settings of a user; the identity must match
    fn get_settings(&self, email_arg: String) -> ServiceFuture<UserSettingsView> {
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
            let users_repo = repo_factory.create_users_repo(&*conn, user_id);
            users_repo
                .find_by_email(email_arg.clone())
                .and_then(|user| match user {
                    Some(user) => Ok(UserSettingsView::from(user)),
                    None => Err(format_err!("No user with email {}", email_arg).context(Error::NotFound).into()),
                })
                .map_err(|e| e.context("Service Users, get_settings endpoint error occurred.").into())
        })
    }

    /// Updates settings of a user; the identity must match
    fn update_settings(&self, email_arg: String, payload: UpdateUserSettings) -> ServiceFuture<User> {
        let user_id = self.dynamic_context.user_id;
        let repo_factory = self.static_context.repo_factory.clone();

        if let Err(e) = payload.validate() {
            return Box::new(future::err(
                format_err!("Validation of UpdateUserSettings failed")
                    .context(Error::Validate(e))
                    .into(),
            ));
        }

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
            let users_repo = repo_factory.create_users_repo(&*conn, user_id);
            users_repo
                .update_settings(email_arg, payload)
                .map_err(|e| e.context("Service Users, update_settings endpoint error occurred.").into())
        })
    }

    /// Deletes the account; the identity must match
    fn delete_account(&self, email_arg: String) -> ServiceFuture<()> {
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
            let users_repo = repo_factory.create_users_repo(&*conn, user_id);
            users_repo
                .delete_by_email(email_arg)
                .map_err(|e| e.context("Service Users, delete_account endpoint error occurred.").into())
        })
    }
}
