//! Reports repo, presents toggle and triage operations with db for product reports
use chrono::Utc;

use failure::Error as FailureError;

use rusqlite::{Connection, OptionalExtension, Row};

use repos::acl;
use repos::acl::{Acl, CheckScope};
use repos::map_constraint_violation;
use repos::types::RepoResult;

use errors::Error;
use models::authorization::*;
use models::{ProductId, Report, ReportId, ReporterMeta, UserId};

const REPORT_COLUMNS: &'static str = "id, product_id, user_email, user_name, user_photo, created_at";

/// Reports repository. One active report per (product, user) pair; the row's
/// presence is the toggle state.
pub struct ReportsRepoImpl<'a> {
    pub db_conn: &'a Connection,
    pub acl: Box<Acl<Resource, Action, Scope, FailureError, Report>>,
}

pub trait ReportsRepo {
    /// Active report of a user for a product, if any
    fn find_by_product_and_user(&self, product_id: ProductId, user_email: String) -> RepoResult<Option<Report>>;

    /// Creates new report
    fn create(&self, product_id: ProductId, reporter: ReporterMeta) -> RepoResult<Report>;

    /// Deletes a report (the un-report half of the toggle)
    fn delete(&self, report_id: ReportId) -> RepoResult<()>;

    /// All reports of a product, newest first
    fn list_for_product(&self, product_id: ProductId) -> RepoResult<Vec<Report>>;

    /// Distinct reported product ids, most recently reported first
    fn reported_product_ids(&self) -> RepoResult<Vec<ProductId>>;
}

impl<'a> ReportsRepoImpl<'a> {
    pub fn new(db_conn: &'a Connection, acl: Box<Acl<Resource, Action, Scope, FailureError, Report>>) -> Self {
        Self { db_conn, acl }
    }
}

impl<'a> ReportsRepo for ReportsRepoImpl<'a> {
    /// Active report of a user for a product, if any
    fn find_by_product_and_user(&self, product_id_arg: ProductId, user_email_arg: String) -> RepoResult<Option<Report>> {
        debug!("Find report for product {} by user {}.", product_id_arg, user_email_arg);
        let query = format!(
            "SELECT {} FROM reports WHERE product_id = ?1 AND user_email = ?2",
            REPORT_COLUMNS
        );
        self.db_conn
            .query_row(&query, params![product_id_arg, user_email_arg], row_to_report)
            .optional()
            .map_err(FailureError::from)
            .and_then(|report: Option<Report>| {
                if let Some(ref report) = report {
                    acl::check(&*self.acl, Resource::Reports, Action::Read, self, Some(report))?;
                }
                Ok(report)
            })
            .map_err(|e: FailureError| {
                e.context(format!(
                    "Find report for product {} by user {} error occurred",
                    product_id_arg, user_email_arg
                ))
                .into()
            })
    }

    /// Creates new report
    fn create(&self, product_id_arg: ProductId, reporter: ReporterMeta) -> RepoResult<Report> {
        debug!("Create new report for product {} {:?}.", product_id_arg, reporter);
        acl::check(&*self.acl, Resource::Reports, Action::Create, self, None)
            .and_then(|_| {
                self.db_conn
                    .execute(
                        "INSERT INTO reports (product_id, user_email, user_name, user_photo, created_at)
                         VALUES (?1, ?2, ?3, ?4, ?5)",
                        params![
                            product_id_arg,
                            reporter.user_email,
                            reporter.user_name,
                            reporter.user_photo,
                            Utc::now()
                        ],
                    )
                    .map_err(map_constraint_violation)
            })
            .and_then(|_| {
                let query = format!("SELECT {} FROM reports WHERE id = ?1", REPORT_COLUMNS);
                self.db_conn
                    .query_row(&query, params![self.db_conn.last_insert_rowid()], row_to_report)
                    .map_err(From::from)
            })
            .map_err(|e: FailureError| {
                e.context(format!("Create new report for product {} error occurred", product_id_arg))
                    .into()
            })
    }

    /// Deletes a report (the un-report half of the toggle)
    fn delete(&self, report_id_arg: ReportId) -> RepoResult<()> {
        debug!("Delete report {}.", report_id_arg);
        let query = format!("SELECT {} FROM reports WHERE id = ?1", REPORT_COLUMNS);
        self.db_conn
            .query_row(&query, params![report_id_arg], row_to_report)
            .optional()
            .map_err(FailureError::from)
            .and_then(|report| match report {
                Some(report) => Ok(report),
                None => Err(format_err!("No report with id {}", report_id_arg).context(Error::NotFound).into()),
            })
            .and_then(|report| {
                acl::check(&*self.acl, Resource::Reports, Action::Delete, self, Some(&report))?;
                self.db_conn
                    .execute("DELETE FROM reports WHERE id = ?1", params![report_id_arg])
                    .map_err(FailureError::from)
                    .map(|_| ())
            })
            .map_err(|e: FailureError| e.context(format!("Delete report {} error occurred", report_id_arg)).into())
    }

    /// All reports of a product, newest first
    fn list_for_product(&self, product_id_arg: ProductId) -> RepoResult<Vec<Report>> {
        debug!("List reports for product {}.", product_id_arg);
        let query = format!(
            "SELECT {} FROM reports WHERE product_id = ?1 ORDER BY created_at DESC",
            REPORT_COLUMNS
        );
        self.db_conn
            .prepare(&query)
            .and_then(|mut stmt| {
                stmt.query_map(params![product_id_arg], row_to_report)?
                    .collect::<Result<Vec<Report>, _>>()
            })
            .map_err(FailureError::from)
            .and_then(|reports| {
                for report in &reports {
                    acl::check(&*self.acl, Resource::Reports, Action::Read, self, Some(report))?;
                }
                Ok(reports)
            })
            .map_err(|e: FailureError| {
                e.context(format!("List reports for product {} error occurred", product_id_arg))
                    .into()
            })
    }

    /// Distinct reported product ids, most recently reported first
    fn reported_product_ids(&self) -> RepoResult<Vec<ProductId>> {
        debug!("List reported product ids.");
        acl::check(&*self.acl, Resource::Reports, Action::Read, self, None)
            .and_then(|_| {
                self.db_conn
                    .prepare("SELECT product_id FROM reports GROUP BY product_id ORDER BY MAX(created_at) DESC")
                    .and_then(|mut stmt| {
                        stmt.query_map([], |row| row.get(0))?.collect::<Result<Vec<ProductId>, _>>()
                    })
                    .map_err(FailureError::from)
            })
            .map_err(|e: FailureError| e.context("List reported product ids error occurred").into())
    }
}

impl<'a> CheckScope<Scope, Report> for ReportsRepoImpl<'a> {
    fn is_in_scope(&self, user_id: UserId, scope: &Scope, obj: Option<&Report>) -> bool {
        match *scope {
            Scope::All => true,
            Scope::Owned => {
                if let Some(report) = obj {
                    self.db_conn
                        .query_row("SELECT email FROM users WHERE id = ?1", params![user_id], |row| {
                            row.get::<_, String>(0)
                        })
                        .map(|email| email == report.user_email)
                        .unwrap_or(false)
                } else {
                    false
                }
            }
        }
    }
}

fn row_to_report(row: &Row) -> ::rusqlite::Result<Report> {
    Ok(Report {
        id: row.get(0)?,
        product_id: row.get(1)?,
        user_email: row.get(2)?,
        user_name: row.get(3)?,
        user_photo: row.get(4)?,
        created_at: row.get(5)?,
    })
}
