//! Read-only inspection reports.
//!
//! Each function is one original script: a handful of fixed queries and a
//! stdout report. Enum-typed columns (`role`, `type`, `"subscriptionType"`)
//! are cast to text in the SELECT list so they decode as strings; the
//! queries are otherwise the original literals.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgConnection;
use uuid::Uuid;

use crate::db::urls;
use crate::Result;

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    #[sqlx(rename = "firstName")]
    first_name: Option<String>,
    #[sqlx(rename = "lastName")]
    last_name: Option<String>,
    balance: Decimal,
    #[sqlx(rename = "subscriptionType")]
    subscription_type: String,
    #[sqlx(rename = "isActive")]
    is_active: bool,
}

#[derive(Debug, sqlx::FromRow)]
struct GirlRow {
    id: Uuid,
    #[sqlx(rename = "userId")]
    user_id: String,
    name: String,
    appearance: Option<String>,
    personality: Option<String>,
    #[sqlx(rename = "avatarUrl")]
    avatar_url: Option<String>,
    #[sqlx(rename = "isActive")]
    is_active: bool,
}

#[derive(Debug, sqlx::FromRow)]
struct ConversationRow {
    id: Uuid,
    #[sqlx(rename = "userId")]
    user_id: String,
    #[sqlx(rename = "girlId")]
    girl_id: String,
    role: String,
    content: Option<String>,
    #[sqlx(rename = "mediaUrl")]
    media_url: Option<String>,
    #[sqlx(rename = "mediaType")]
    media_type: Option<String>,
    #[sqlx(rename = "createdAt")]
    #[allow(dead_code)]
    created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: Uuid,
    #[sqlx(rename = "userId")]
    user_id: String,
    #[sqlx(rename = "type")]
    kind: String,
    amount: Decimal,
    description: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
struct UrlRow {
    id: Uuid,
    name: Option<String>,
    url: Option<String>,
}

/// Truncate long text to a preview, the way the original dump did.
fn preview(text: &str, limit: usize) -> String {
    if text.chars().count() > limit {
        let cut: String = text.chars().take(limit).collect();
        format!("{cut}...")
    } else {
        text.to_string()
    }
}

fn display(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("")
}

/// Full dump: users, girls, recent conversations, recent transactions.
pub async fn show(conn: &mut PgConnection) -> Result<()> {
    println!("=== USERS ===");
    let users: Vec<UserRow> = sqlx::query_as(
        r#"SELECT id, email, "firstName", "lastName", balance,
                  "subscriptionType"::text AS "subscriptionType", "isActive"
           FROM users"#,
    )
    .fetch_all(&mut *conn)
    .await?;
    for user in &users {
        println!(
            "ID: {}, Email: {}, Name: {} {}, Balance: {}, Subscription: {}, Active: {}",
            user.id,
            user.email,
            display(&user.first_name),
            display(&user.last_name),
            user.balance,
            user.subscription_type,
            user.is_active
        );
    }

    println!("\n=== GIRLS ===");
    let girls: Vec<GirlRow> = sqlx::query_as(
        r#"SELECT id, "userId", name, appearance, personality, "avatarUrl", "isActive"
           FROM girls"#,
    )
    .fetch_all(&mut *conn)
    .await?;
    for girl in &girls {
        println!(
            "ID: {}, UserID: {}, Name: {}, Avatar: {}, Active: {}",
            girl.id,
            girl.user_id,
            girl.name,
            display(&girl.avatar_url),
            girl.is_active
        );
        println!("  Appearance: {}", preview(display(&girl.appearance), 100));
        println!("  Personality: {}", preview(display(&girl.personality), 100));
        println!();
    }

    println!("=== CONVERSATIONS (Last 10) ===");
    let conversations: Vec<ConversationRow> = sqlx::query_as(
        r#"SELECT id, "userId", "girlId", role::text AS role, content,
                  "mediaUrl", "mediaType", "createdAt"
           FROM conversations ORDER BY "createdAt" DESC LIMIT 10"#,
    )
    .fetch_all(&mut *conn)
    .await?;
    for conv in &conversations {
        println!(
            "ID: {}, User: {}, Girl: {}, Role: {}",
            conv.id, conv.user_id, conv.girl_id, conv.role
        );
        println!("  Content: {}", preview(display(&conv.content), 100));
        println!(
            "  Media: {}, Type: {}",
            display(&conv.media_url),
            display(&conv.media_type)
        );
        println!();
    }

    println!("=== TRANSACTIONS (Last 10) ===");
    let transactions: Vec<TransactionRow> = sqlx::query_as(
        r#"SELECT id, "userId", type::text AS type, amount, description
           FROM transactions ORDER BY "createdAt" DESC LIMIT 10"#,
    )
    .fetch_all(&mut *conn)
    .await?;
    for tran in &transactions {
        println!(
            "ID: {}, User: {}, Type: {}, Amount: {}, Desc: {}",
            tran.id,
            tran.user_id,
            tran.kind,
            tran.amount,
            display(&tran.description)
        );
    }

    Ok(())
}

/// Girls with a non-empty avatar URL.
pub async fn avatars(conn: &mut PgConnection) -> Result<()> {
    println!("=== GIRLS AVATAR URLs ===");
    let rows: Vec<UrlRow> = sqlx::query_as(
        r#"SELECT id, name, "avatarUrl" AS url FROM girls
           WHERE "avatarUrl" IS NOT NULL AND "avatarUrl" != ''"#,
    )
    .fetch_all(&mut *conn)
    .await?;
    for row in &rows {
        println!("ID: {}, Name: {}", row.id, display(&row.name));
        println!("  Avatar URL: {}", display(&row.url));
        println!();
    }
    Ok(())
}

/// First few avatar and media URLs, for a quick look at the data.
pub async fn check_urls(conn: &mut PgConnection) -> Result<()> {
    let girls: Vec<Option<String>> =
        sqlx::query_scalar(r#"SELECT "avatarUrl" FROM girls LIMIT 5"#)
            .fetch_all(&mut *conn)
            .await?;
    println!("Girls avatar URLs:");
    for url in &girls {
        println!("  {}", display(url));
    }

    let conversations: Vec<Option<String>> =
        sqlx::query_scalar(r#"SELECT "mediaUrl" FROM conversations LIMIT 5"#)
            .fetch_all(&mut *conn)
            .await?;
    println!("\nConversations media URLs:");
    for url in &conversations {
        println!("  {}", display(url));
    }
    Ok(())
}

/// Up to ten girls with avatar URLs set.
pub async fn check_girls(conn: &mut PgConnection) -> Result<()> {
    let rows: Vec<UrlRow> = sqlx::query_as(
        r#"SELECT id, name, "avatarUrl" AS url FROM girls
           WHERE "avatarUrl" IS NOT NULL AND "avatarUrl" != '' LIMIT 10"#,
    )
    .fetch_all(&mut *conn)
    .await?;
    println!("Girls with avatar URLs:");
    for row in &rows {
        println!("ID: {}, Name: {}", row.id, display(&row.name));
        println!("  URL: {}", display(&row.url));
        println!();
    }
    Ok(())
}

/// Girls whose avatar still points at a relative upload path.
pub async fn check_local(conn: &mut PgConnection) -> Result<()> {
    let rows: Vec<UrlRow> = sqlx::query_as(
        r#"SELECT id, name, "avatarUrl" AS url FROM girls WHERE "avatarUrl" LIKE $1"#,
    )
    .bind(urls::LOCAL_UPLOAD_PATTERN)
    .fetch_all(&mut *conn)
    .await?;
    println!("Girls with local URLs: {}", rows.len());
    for row in &rows {
        println!("  {}: {} -> {}", row.id, display(&row.name), display(&row.url));
    }
    Ok(())
}

/// Conversations whose media still points at a relative upload path.
pub async fn check_conv_local(conn: &mut PgConnection) -> Result<()> {
    let rows: Vec<(Uuid, Option<String>)> = sqlx::query_as(
        r#"SELECT id, "mediaUrl" FROM conversations WHERE "mediaUrl" LIKE $1"#,
    )
    .bind(urls::LOCAL_UPLOAD_PATTERN)
    .fetch_all(&mut *conn)
    .await?;
    println!("Conversations with local URLs: {}", rows.len());
    for (id, url) in &rows {
        println!("  {} -> {}", id, display(url));
    }
    Ok(())
}

/// Girls whose avatar URL matches the missing-colon typo, and only that.
pub async fn check_malformed(conn: &mut PgConnection) -> Result<()> {
    let rows: Vec<UrlRow> = sqlx::query_as(
        r#"SELECT id, name, "avatarUrl" AS url FROM girls WHERE "avatarUrl" LIKE $1"#,
    )
    .bind(urls::MISSING_COLON_PATTERN)
    .fetch_all(&mut *conn)
    .await?;
    println!("Girls with malformed URLs (missing colon): {}", rows.len());
    for row in &rows {
        println!("  {}: {} -> {}", row.id, display(&row.name), display(&row.url));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_truncates_long_text() {
        let long = "x".repeat(150);
        let out = preview(&long, 100);
        assert_eq!(out.chars().count(), 103);
        assert!(out.ends_with("..."));
    }

    #[test]
    fn test_preview_leaves_short_text() {
        assert_eq!(preview("short", 100), "short");
        assert_eq!(preview("", 100), "");
    }

    #[test]
    fn test_preview_counts_chars_not_bytes() {
        let cyrillic = "д".repeat(100);
        assert_eq!(preview(&cyrillic, 100), cyrillic);
    }
}
