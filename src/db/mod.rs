//! Database module for SQLite persistence.
//!
//! The notification engine only owns the topic, group and notification tables.
//! Owner and document tables are shared with the rest of the fleet backend and
//! are created here so the service can run standalone.

mod repository;

pub use repository::*;

use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

use crate::models::DOCUMENT_EXPIRY_TOPIC;

/// Initialize the database connection pool, run migrations and seed the topic catalog.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool, sqlx::Error> {
    // Ensure the parent directory exists
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;
    seed_topics(&pool).await?;

    Ok(pool)
}

/// Run database migrations.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // Tenants and document owners
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS companies (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            deleted_at TEXT
        );

        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            company_id TEXT NOT NULL,
            email TEXT,
            first_name TEXT,
            last_name TEXT,
            is_staff INTEGER NOT NULL DEFAULT 0,
            deleted_at TEXT
        );

        CREATE TABLE IF NOT EXISTS drivers (
            id TEXT PRIMARY KEY,
            company_id TEXT NOT NULL,
            first_name TEXT NOT NULL,
            last_name TEXT,
            deleted_at TEXT
        );

        CREATE TABLE IF NOT EXISTS vehicles (
            id TEXT PRIMARY KEY,
            company_id TEXT NOT NULL,
            registration_number TEXT NOT NULL,
            deleted_at TEXT
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Documents, one table per owner class
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS vehicle_documents (
            id TEXT PRIMARY KEY,
            vehicle_id TEXT NOT NULL,
            title TEXT NOT NULL,
            document_type_slug TEXT,
            expiry_date TEXT,
            deleted_at TEXT
        );

        CREATE TABLE IF NOT EXISTS driver_documents (
            id TEXT PRIMARY KEY,
            driver_id TEXT NOT NULL,
            title TEXT NOT NULL,
            document_type_slug TEXT,
            expiry_date TEXT,
            deleted_at TEXT
        );

        CREATE TABLE IF NOT EXISTS user_documents (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            title TEXT NOT NULL,
            document_type_slug TEXT,
            expiry_date TEXT,
            deleted_at TEXT
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Notification catalog and subscriptions
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS notification_topics (
            id TEXT PRIMARY KEY,
            slug TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            description TEXT,
            default_channels TEXT NOT NULL DEFAULT '[]',
            created_at TEXT NOT NULL,
            deleted_at TEXT
        );

        CREATE TABLE IF NOT EXISTS notification_groups (
            id TEXT PRIMARY KEY,
            company_id TEXT NOT NULL,
            name TEXT NOT NULL,
            description TEXT,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS group_members (
            group_id TEXT NOT NULL REFERENCES notification_groups(id) ON DELETE CASCADE,
            user_id TEXT NOT NULL,
            PRIMARY KEY (group_id, user_id)
        );

        CREATE TABLE IF NOT EXISTS topic_subscriptions (
            group_id TEXT NOT NULL REFERENCES notification_groups(id) ON DELETE CASCADE,
            topic_id TEXT NOT NULL REFERENCES notification_topics(id),
            PRIMARY KEY (group_id, topic_id)
        );

        CREATE TABLE IF NOT EXISTS notifications (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            actor_type TEXT NOT NULL,
            type TEXT NOT NULL,
            title TEXT NOT NULL,
            message TEXT NOT NULL,
            link TEXT,
            is_read INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS sessions (
            token TEXT PRIMARY KEY,
            principal_type TEXT NOT NULL CHECK (principal_type IN ('user', 'driver')),
            principal_id TEXT NOT NULL,
            expires_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes for common queries
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_vehicle_documents_expiry ON vehicle_documents(expiry_date);
        CREATE INDEX IF NOT EXISTS idx_driver_documents_expiry ON driver_documents(expiry_date);
        CREATE INDEX IF NOT EXISTS idx_user_documents_expiry ON user_documents(expiry_date);
        CREATE INDEX IF NOT EXISTS idx_notification_groups_company ON notification_groups(company_id);
        CREATE INDEX IF NOT EXISTS idx_group_members_user ON group_members(user_id);
        CREATE INDEX IF NOT EXISTS idx_notifications_user ON notifications(user_id, created_at);
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Insert catalog topics the engine depends on. Existing rows, including
/// soft-deleted ones, are left untouched.
async fn seed_topics(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let now = Utc::now().to_rfc3339();
    sqlx::query(
        "INSERT OR IGNORE INTO notification_topics (id, slug, name, description, default_channels, created_at) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(DOCUMENT_EXPIRY_TOPIC)
    .bind("Document expiry")
    .bind("Reminders for vehicle, driver and user documents that are about to expire or have expired")
    .bind(r#"["in_app","email"]"#)
    .bind(&now)
    .execute(pool)
    .await?;

    Ok(())
}
