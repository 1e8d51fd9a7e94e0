//! One-time URL prefix rewrite.
//!
//! Prefixes the base URL onto every `"avatarUrl"`/`"mediaUrl"` value still
//! matching the `/uploads/%` filter, committing both updates in one
//! transaction, then re-queries `LIKE 'http%'` counts to report the
//! post-condition. Re-running is a no-op: prefixed values no longer match
//! the filter.

use sqlx::postgres::PgConnection;
use sqlx::Connection;

use crate::db::urls;
use crate::Result;

/// Base URL applied by default — the development origin the original
/// migration targeted. Production runs pass the public origin instead.
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// Post-condition report for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixReport {
    pub girls_updated: u64,
    pub conversations_updated: u64,
    pub girls_with_http: i64,
    pub conversations_with_http: i64,
}

/// Run both updates in one transaction, then report.
pub async fn fix_urls(conn: &mut PgConnection, base_url: &str) -> Result<FixReport> {
    let mut tx = conn.begin().await?;

    let girls = sqlx::query(
        r#"UPDATE girls SET "avatarUrl" = $1 || "avatarUrl" WHERE "avatarUrl" LIKE $2"#,
    )
    .bind(base_url)
    .bind(urls::LOCAL_UPLOAD_PATTERN)
    .execute(&mut *tx)
    .await?;

    let conversations = sqlx::query(
        r#"UPDATE conversations SET "mediaUrl" = $1 || "mediaUrl" WHERE "mediaUrl" LIKE $2"#,
    )
    .bind(base_url)
    .bind(urls::LOCAL_UPLOAD_PATTERN)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    let girls_with_http: i64 =
        sqlx::query_scalar(r#"SELECT COUNT(*) FROM girls WHERE "avatarUrl" LIKE $1"#)
            .bind(urls::HTTP_PATTERN)
            .fetch_one(&mut *conn)
            .await?;
    let conversations_with_http: i64 =
        sqlx::query_scalar(r#"SELECT COUNT(*) FROM conversations WHERE "mediaUrl" LIKE $1"#)
            .bind(urls::HTTP_PATTERN)
            .fetch_one(&mut *conn)
            .await?;

    Ok(FixReport {
        girls_updated: girls.rows_affected(),
        conversations_updated: conversations.rows_affected(),
        girls_with_http,
        conversations_with_http,
    })
}

/// Print the report in the original script's shape.
pub fn print_report(report: &FixReport) {
    println!("Updated {} girls avatar URLs", report.girls_updated);
    println!(
        "Updated {} conversations media URLs",
        report.conversations_updated
    );
    println!("Girls with HTTP URLs: {}", report.girls_with_http);
    println!(
        "Conversations with HTTP URLs: {}",
        report.conversations_with_http
    );
    println!("Database URLs updated successfully!");
}
