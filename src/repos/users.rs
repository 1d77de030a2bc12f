//! Users repo, presents CRUD operations with db for users
use chrono::Utc;

use failure::Error as FailureError;

use rusqlite::{Connection, OptionalExtension, Row};

use repos::acl;
use repos::acl::{Acl, CheckScope};
use repos::map_constraint_violation;
use repos::types::RepoResult;

use errors::Error;
use models::authorization::*;
use models::{NewUser, UpdateUserSettings, User, UserId, UserRole, UserSettings};

const USER_COLUMNS: &'static str = "id, email, name, photo, role, is_verified, theme, notifications, privacy, created_at, updated_at";

/// Users repository, responsible for handling users
pub struct UsersRepoImpl<'a> {
    pub db_conn: &'a Connection,
    pub acl: Box<Acl<Resource, Action, Scope, FailureError, User>>,
}

pub trait UsersRepo {
    /// Find specific user by id
    fn find(&self, user_id: UserId) -> RepoResult<Option<User>>;

    /// Find specific user by email
    fn find_by_email(&self, email_arg: String) -> RepoResult<Option<User>>;

    /// Find users whose email contains `term`; all users when `term` is None
    fn find_by_email_term(&self, term: Option<String>) -> RepoResult<Vec<User>>;

    /// Creates new user with defaults (unverified, `user` role)
    fn create(&self, payload: NewUser) -> RepoResult<User>;

    /// Updates the role of a user
    fn update_role(&self, email_arg: String, role_arg: UserRole) -> RepoResult<User>;

    /// Updates settings and display name of a user
    fn update_settings(&self, email_arg: String, payload: UpdateUserSettings) -> RepoResult<User>;

    /// Marks a user as verified; idempotent
    fn set_verified(&self, email_arg: String) -> RepoResult<User>;

    /// Deletes user account
    fn delete_by_email(&self, email_arg: String) -> RepoResult<()>;
}

impl<'a> UsersRepoImpl<'a> {
    pub fn new(db_conn: &'a Connection, acl: Box<Acl<Resource, Action, Scope, FailureError, User>>) -> Self {
        Self { db_conn, acl }
    }

    fn fetch_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let query = format!("SELECT {} FROM users WHERE email = ?1", USER_COLUMNS);
        self.db_conn
            .query_row(&query, params![email], row_to_user)
            .optional()
            .map_err(From::from)
    }

    fn fetch(&self, user_id: UserId) -> RepoResult<User> {
        let query = format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS);
        self.db_conn.query_row(&query, params![user_id], row_to_user).map_err(From::from)
    }

    fn existing_by_email(&self, email: &str) -> RepoResult<User> {
        self.fetch_by_email(email).and_then(|user| match user {
            Some(user) => Ok(user),
            None => Err(format_err!("No user with email {}", email).context(Error::NotFound).into()),
        })
    }
}

impl<'a> UsersRepo for UsersRepoImpl<'a> {
    /// Find specific user by id
    fn find(&self, user_id_arg: UserId) -> RepoResult<Option<User>> {
        debug!("Find in users with id {}.", user_id_arg);
        let query = format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS);
        self.db_conn
            .query_row(&query, params![user_id_arg], row_to_user)
            .optional()
            .map_err(From::from)
            .and_then(|user: Option<User>| {
                if let Some(ref user) = user {
                    acl::check(&*self.acl, Resource::Users, Action::Read, self, Some(user))?;
                }
                Ok(user)
            })
            .map_err(|e: FailureError| e.context(format!("Find user by id: {} error occurred", user_id_arg)).into())
    }

    /// Find specific user by email
    fn find_by_email(&self, email_arg: String) -> RepoResult<Option<User>> {
        debug!("Find in users with email {}.", email_arg);
        self.fetch_by_email(&email_arg)
            .and_then(|user: Option<User>| {
                if let Some(ref user) = user {
                    acl::check(&*self.acl, Resource::Users, Action::Read, self, Some(user))?;
                }
                Ok(user)
            })
            .map_err(|e: FailureError| e.context(format!("Find user by email: {} error occurred", email_arg)).into())
    }

    /// Find users whose email contains `term`; all users when `term` is None
    fn find_by_email_term(&self, term: Option<String>) -> RepoResult<Vec<User>> {
        debug!("Find users by email term {:?}.", term);
        let query = format!(
            "SELECT {} FROM users WHERE email LIKE '%' || ?1 || '%' ORDER BY id",
            USER_COLUMNS
        );
        let pattern = term.unwrap_or_default();

        let mut stmt = self.db_conn.prepare(&query)?;
        let users = stmt
            .query_map(params![pattern], row_to_user)?
            .collect::<Result<Vec<User>, _>>()?;

        for user in &users {
            acl::check(&*self.acl, Resource::Users, Action::Read, self, Some(user))?;
        }

        Ok(users)
    }

    /// Creates new user with defaults (unverified, `user` role)
    fn create(&self, payload: NewUser) -> RepoResult<User> {
        debug!("Create new user {:?}.", payload);
        let now = Utc::now();
        let settings = UserSettings::default();
        self.db_conn
            .execute(
                "INSERT INTO users (email, name, photo, role, is_verified, theme, notifications, privacy, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, 0, ?5, ?6, ?7, ?8, ?8)",
                params![
                    payload.email,
                    payload.name,
                    payload.photo,
                    UserRole::User,
                    settings.theme,
                    settings.notifications,
                    settings.privacy,
                    now
                ],
            )
            .map_err(map_constraint_violation)
            .and_then(|_| self.fetch(UserId(self.db_conn.last_insert_rowid() as i32)))
            .and_then(|user| {
                acl::check(&*self.acl, Resource::Users, Action::Create, self, Some(&user))?;
                Ok(user)
            })
            .map_err(|e: FailureError| e.context(format!("Create new user {:?} error occurred", payload)).into())
    }

    /// Updates the role of a user
    fn update_role(&self, email_arg: String, role_arg: UserRole) -> RepoResult<User> {
        debug!("Set role {} for user {}.", role_arg, email_arg);
        self.existing_by_email(&email_arg)
            .and_then(|user| {
                acl::check(&*self.acl, Resource::Users, Action::Moderate, self, Some(&user))?;
                self.db_conn
                    .execute(
                        "UPDATE users SET role = ?1, updated_at = ?2 WHERE id = ?3",
                        params![role_arg, Utc::now(), user.id],
                    )
                    .map_err(From::from)
                    .and_then(|_| self.fetch(user.id))
            })
            .map_err(|e: FailureError| {
                e.context(format!("Set role {} for user {} error occurred", role_arg, email_arg))
                    .into()
            })
    }

    /// Updates settings and display name of a user
    fn update_settings(&self, email_arg: String, payload: UpdateUserSettings) -> RepoResult<User> {
        debug!("Updating settings for user {} with payload {:?}.", email_arg, payload);
        self.existing_by_email(&email_arg)
            .and_then(|user| {
                acl::check(&*self.acl, Resource::Users, Action::Update, self, Some(&user))?;
                self.db_conn
                    .execute(
                        "UPDATE users SET name = ?1, theme = ?2, notifications = ?3, privacy = ?4, updated_at = ?5 WHERE id = ?6",
                        params![
                            payload.name,
                            payload.theme,
                            payload.notifications,
                            payload.privacy,
                            Utc::now(),
                            user.id
                        ],
                    )
                    .map_err(From::from)
                    .and_then(|_| self.fetch(user.id))
            })
            .map_err(|e: FailureError| {
                e.context(format!("Updating settings for user {} error occurred", email_arg))
                    .into()
            })
    }

    /// Marks a user as verified; idempotent
    fn set_verified(&self, email_arg: String) -> RepoResult<User> {
        debug!("Set user {} verified.", email_arg);
        self.existing_by_email(&email_arg)
            .and_then(|user| {
                acl::check(&*self.acl, Resource::Users, Action::Update, self, Some(&user))?;
                self.db_conn
                    .execute(
                        "UPDATE users SET is_verified = 1, updated_at = ?1 WHERE id = ?2",
                        params![Utc::now(), user.id],
                    )
                    .map_err(From::from)
                    .and_then(|_| self.fetch(user.id))
            })
            .map_err(|e: FailureError| e.context(format!("Set user {} verified error occurred", email_arg)).into())
    }

    /// Deletes user account
    fn delete_by_email(&self, email_arg: String) -> RepoResult<()> {
        debug!("Delete user {}.", email_arg);
        self.existing_by_email(&email_arg)
            .and_then(|user| {
                acl::check(&*self.acl, Resource::Users, Action::Delete, self, Some(&user))?;
                self.db_conn
                    .execute("DELETE FROM users WHERE id = ?1", params![user.id])
                    .map_err(From::from)
                    .map(|_| ())
            })
            .map_err(|e: FailureError| e.context(format!("Delete user {} error occurred", email_arg)).into())
    }
}

impl<'a> CheckScope<Scope, User> for UsersRepoImpl<'a> {
    fn is_in_scope(&self, user_id: UserId, scope: &Scope, obj: Option<&User>) -> bool {
        match *scope {
            Scope::All => true,
            Scope::Owned => {
                if let Some(user) = obj {
                    user.id == user_id
                } else {
                    false
                }
            }
        }
    }
}

fn row_to_user(row: &Row) -> ::rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        name: row.get(2)?,
        photo: row.get(3)?,
        role: row.get(4)?,
        is_verified: row.get(5)?,
        settings: UserSettings {
            theme: row.get(6)?,
            notifications: row.get(7)?,
            privacy: row.get(8)?,
        },
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}
