pub mod categories;
pub mod models;
pub mod profiles;
pub mod recommendations;
pub mod social;
pub mod users;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use std::path::Path;

use crate::config::PoolProfile;
use crate::state::DbPool;

const MIGRATIONS: &[(&str, &str)] = &[(
    "001_initial",
    include_str!("../../migrations/001_initial.sql"),
)];

/// Pragmas applied to every pooled connection; foreign keys are per-connection in SQLite.
const CONNECTION_PRAGMAS: &str = "
    PRAGMA foreign_keys = ON;
    PRAGMA busy_timeout = 5000;
    PRAGMA synchronous = NORMAL;
";

pub fn create_pool(db_path: &Path, profile: &PoolProfile) -> anyhow::Result<DbPool> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let manager = SqliteConnectionManager::file(db_path)
        .with_init(|conn| conn.execute_batch(CONNECTION_PRAGMAS));
    let pool = Pool::builder()
        .max_size(profile.max_size)
        .min_idle(profile.min_idle)
        .idle_timeout(profile.idle_timeout)
        .max_lifetime(profile.max_lifetime)
        .test_on_check_out(profile.test_on_check_out)
        .build(manager)?;

    // WAL is persistent in the database file, so once is enough
    let conn = pool.get()?;
    conn.execute_batch("PRAGMA journal_mode = WAL;")?;

    tracing::debug!(
        "Database pool ready: max_size={} min_idle={:?}",
        profile.max_size,
        profile.min_idle
    );
    Ok(pool)
}

pub fn run_migrations(pool: &DbPool) -> anyhow::Result<()> {
    let conn = pool.get()?;

    // Create migrations tracking table
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            name TEXT PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    for (name, sql) in MIGRATIONS {
        let already_applied: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM schema_version WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )?;

        if !already_applied {
            tracing::info!("Applying migration: {}", name);
            conn.execute_batch(sql)?;
            conn.execute(
                "INSERT INTO schema_version (name) VALUES (?1)",
                params![name],
            )?;
        }
    }

    tracing::info!("Database migrations complete");
    Ok(())
}

pub const SEED_ADMIN_USERNAME: &str = "admin";
pub const SEED_ADMIN_EMAIL: &str = "admin@cur8tr.com";
pub const SEED_ADMIN_PASSWORD: &str = "admin123";

/// Create the verified `admin` account when it does not exist yet.
/// Returns true when a user was created.
pub fn seed_admin(pool: &DbPool, bcrypt_cost: u32) -> anyhow::Result<bool> {
    let conn = pool.get()?;
    if users::find_by_username(&conn, SEED_ADMIN_USERNAME)?.is_some() {
        tracing::debug!("Admin user already exists");
        return Ok(false);
    }

    let password_hash = crate::auth::password::hash(SEED_ADMIN_PASSWORD, bcrypt_cost)?;
    let id = users::create(
        &conn,
        &users::NewUser {
            username: SEED_ADMIN_USERNAME,
            email: SEED_ADMIN_EMAIL,
            password_hash: &password_hash,
            is_admin: true,
            is_verified: true,
        },
    )?;
    tracing::warn!(
        "Seeded admin user {} (id {}); change its password",
        SEED_ADMIN_USERNAME,
        id
    );
    Ok(true)
}

/// Single-connection in-memory database with the schema applied.
#[cfg(test)]
pub fn test_pool() -> DbPool {
    let manager = SqliteConnectionManager::memory()
        .with_init(|conn| conn.execute_batch(CONNECTION_PRAGMAS));
    let pool = Pool::builder().max_size(1).build(manager).unwrap();
    run_migrations(&pool).unwrap();
    pool
}
