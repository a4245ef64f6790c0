//! Database module for SQLite persistence.
//!
//! SQLite is the source of truth for all application data.

mod repository;

pub use repository::*;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

/// Initialize the database connection pool and run migrations.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool, sqlx::Error> {
    // Ensure the parent directory exists
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    // Run embedded migrations
    run_migrations(&pool).await?;

    Ok(pool)
}

/// Run database migrations.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS families (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            street_address TEXT,
            city TEXT,
            state TEXT,
            zip TEXT,
            primary_phone TEXT,
            notes TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            deleted_at TEXT
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS persons (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            family_id INTEGER REFERENCES families(id),
            bsa_member_id TEXT,
            person_type TEXT NOT NULL,
            prefix TEXT,
            first_name TEXT NOT NULL,
            middle_name TEXT,
            last_name TEXT NOT NULL,
            suffix TEXT,
            nickname TEXT,
            gender TEXT,
            date_of_birth TEXT,
            age INTEGER,
            email TEXT,
            phone TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            deleted_at TEXT
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS scouts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            person_id INTEGER NOT NULL REFERENCES persons(id),
            grade TEXT,
            rank TEXT,
            den TEXT,
            registration_expiration_date TEXT,
            registration_status TEXT,
            ypt_status TEXT,
            program TEXT DEFAULT 'Cub Scouting',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS adult_leaders (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            person_id INTEGER NOT NULL REFERENCES persons(id),
            positions TEXT,
            ypt_status TEXT,
            ypt_completion_date TEXT,
            ypt_expiration_date TEXT,
            registration_expiration_date TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS user_permissions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            wordpress_user_id INTEGER NOT NULL,
            person_id INTEGER REFERENCES persons(id),
            role TEXT NOT NULL,
            granted_by INTEGER REFERENCES user_permissions(id),
            granted_at TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sync_logs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            sync_type TEXT NOT NULL,
            status TEXT NOT NULL,
            started_at TEXT NOT NULL,
            completed_at TEXT,
            records_processed INTEGER NOT NULL DEFAULT 0,
            records_created INTEGER NOT NULL DEFAULT 0,
            records_updated INTEGER NOT NULL DEFAULT 0,
            records_skipped INTEGER NOT NULL DEFAULT 0,
            errors TEXT,
            triggered_by INTEGER,
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS audit_logs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER,
            entity_type TEXT NOT NULL,
            entity_id INTEGER NOT NULL,
            action TEXT NOT NULL,
            changes TEXT,
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            setting_key TEXT NOT NULL,
            setting_value TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Indexes for common queries. raw_sql runs every statement in the
    // batch; a prepared query would stop after the first.
    sqlx::raw_sql(
        r#"
        CREATE INDEX IF NOT EXISTS idx_families_name ON families(name);
        CREATE INDEX IF NOT EXISTS idx_families_deleted_at ON families(deleted_at);
        CREATE INDEX IF NOT EXISTS idx_families_city_state ON families(city, state);
        CREATE INDEX IF NOT EXISTS idx_persons_family_id ON persons(family_id);
        CREATE INDEX IF NOT EXISTS idx_persons_name ON persons(last_name, first_name);
        CREATE INDEX IF NOT EXISTS idx_persons_type ON persons(person_type);
        CREATE INDEX IF NOT EXISTS idx_persons_deleted_at ON persons(deleted_at);
        CREATE INDEX IF NOT EXISTS idx_scouts_person_id ON scouts(person_id);
        CREATE INDEX IF NOT EXISTS idx_scouts_expiration ON scouts(registration_expiration_date);
        CREATE INDEX IF NOT EXISTS idx_scouts_den ON scouts(den);
        CREATE INDEX IF NOT EXISTS idx_scouts_rank ON scouts(rank);
        CREATE INDEX IF NOT EXISTS idx_leaders_person_id ON adult_leaders(person_id);
        CREATE INDEX IF NOT EXISTS idx_leaders_ypt_expiration ON adult_leaders(ypt_expiration_date);
        CREATE INDEX IF NOT EXISTS idx_permissions_role ON user_permissions(role);
        CREATE INDEX IF NOT EXISTS idx_sync_logs_type ON sync_logs(sync_type);
        CREATE INDEX IF NOT EXISTS idx_audit_logs_created_at ON audit_logs(created_at);
        "#,
    )
    .execute(pool)
    .await?;

    // Uniqueness invariants: bsa_member_id and email are unique across
    // non-deleted persons; wordpress_user_id and setting_key are unique.
    sqlx::raw_sql(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS uniq_persons_bsa_member_id
            ON persons(bsa_member_id)
            WHERE bsa_member_id IS NOT NULL AND deleted_at IS NULL;
        CREATE UNIQUE INDEX IF NOT EXISTS uniq_persons_email
            ON persons(email)
            WHERE email IS NOT NULL AND deleted_at IS NULL;
        CREATE UNIQUE INDEX IF NOT EXISTS uniq_permissions_wordpress_user
            ON user_permissions(wordpress_user_id);
        CREATE UNIQUE INDEX IF NOT EXISTS uniq_settings_key
            ON settings(setting_key);
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
