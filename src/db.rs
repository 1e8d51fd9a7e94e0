//! Database maintenance procedures for the eva application database.
//!
//! One-shot operator tools: open a single connection, run fixed queries,
//! print a report to stdout, close the connection. The schema is owned by
//! the backend application; these procedures only read it, except for the
//! one-time URL prefix rewrite in [`fix`].
//!
//! ## Modules
//!
//! - [`urls`] — URL classification helpers shared by the checks
//! - [`report`] — read-only inspection reports
//! - [`fix`] — the `/uploads/` → absolute-URL prefix rewrite

pub mod fix;
pub mod report;
pub mod urls;

use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::Connection;

use crate::Result;

/// Connection parameters, defaulting to the development literals the
/// original scripts were written against.
#[derive(Debug, Clone)]
pub struct ConnectParams {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl Default for ConnectParams {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 5432,
            user: "postgres".into(),
            password: "password".into(),
            database: "eva_db".into(),
        }
    }
}

impl ConnectParams {
    fn options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.database)
    }

    /// Open the single connection used by one procedure.
    pub async fn connect(&self) -> Result<PgConnection> {
        Ok(PgConnection::connect_with(&self.options()).await?)
    }
}
