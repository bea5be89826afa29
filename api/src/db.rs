use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;

use crate::{error::AppError, DbPool};

pub fn connect(database_url: &str) -> Result<DbPool, AppError> {
    let manager = SqliteConnectionManager::file(database_url).with_init(init_connection);
    Ok(r2d2::Pool::new(manager)?)
}

/// Per-connection setup; SQLite only enforces foreign keys when asked to.
pub fn init_connection(conn: &mut Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")
}

pub fn run_migrations(pool: &DbPool) -> Result<(), AppError> {
    let conn = pool.get()?;
    migrate(&conn)?;
    Ok(())
}

pub fn migrate(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            email           TEXT UNIQUE NOT NULL,
            username        TEXT UNIQUE NOT NULL,
            first_name      TEXT NOT NULL DEFAULT '',
            last_name       TEXT NOT NULL DEFAULT '',
            hashed_password TEXT NOT NULL,
            is_active       INTEGER NOT NULL DEFAULT 0,
            is_staff        INTEGER NOT NULL DEFAULT 0,
            created_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS notices (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            title       TEXT NOT NULL,
            content     TEXT NOT NULL,
            views       INTEGER NOT NULL DEFAULT 0,
            owner_id    INTEGER NOT NULL REFERENCES users(id),
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_notices_owner ON notices(owner_id);

        CREATE TABLE IF NOT EXISTS comments (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            notice_id   INTEGER NOT NULL REFERENCES notices(id) ON DELETE CASCADE,
            owner_id    INTEGER NOT NULL REFERENCES users(id),
            text        TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_comments_notice ON comments(notice_id);

        CREATE TABLE IF NOT EXISTS notice_like (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            notice_id   INTEGER NOT NULL REFERENCES notices(id) ON DELETE CASCADE,
            owner_id    INTEGER NOT NULL REFERENCES users(id),
            is_like     INTEGER NOT NULL DEFAULT 0,
            is_hate     INTEGER NOT NULL DEFAULT 0,
            UNIQUE(owner_id, notice_id)
        );
        CREATE INDEX IF NOT EXISTS idx_notice_like_notice ON notice_like(notice_id);

        CREATE TABLE IF NOT EXISTS notice_files (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            notice_id    INTEGER NOT NULL REFERENCES notices(id) ON DELETE CASCADE,
            path         TEXT NOT NULL,
            name         TEXT NOT NULL,
            size         INTEGER NOT NULL,
            content_type TEXT NOT NULL,
            download_cnt INTEGER NOT NULL DEFAULT 0,
            created_at   TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_notice_files_notice ON notice_files(notice_id);
        ",
    )
}

/// Runs blocking database work on the blocking pool with a pooled connection.
pub async fn run<T, F>(pool: &DbPool, f: F) -> Result<T, AppError>
where
    T: Send + 'static,
    F: FnOnce(&Connection) -> Result<T, AppError> + Send + 'static,
{
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || {
        let conn = pool.get()?;
        f(&*conn)
    })
    .await?
}

#[cfg(test)]
pub fn test_connection() -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    init_connection(&mut conn).unwrap();
    migrate(&conn).unwrap();
    conn
}
