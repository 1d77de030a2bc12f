//! Database schema bootstrap.
//!
//! The store keeps one table per entity collection. Vote sets and tags are
//! JSON-encoded text columns; unique indexes give the insert-if-absent
//! behavior the report and rating toggles rely on.
use rusqlite;
use rusqlite::Connection;

const SCHEMA: &'static str = "
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    email TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL DEFAULT '',
    photo TEXT,
    role TEXT NOT NULL DEFAULT 'user',
    is_verified INTEGER NOT NULL DEFAULT 0,
    theme TEXT NOT NULL DEFAULT 'light',
    notifications INTEGER NOT NULL DEFAULT 1,
    privacy TEXT NOT NULL DEFAULT 'public',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS products (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    image TEXT,
    description TEXT NOT NULL DEFAULT '',
    tags TEXT NOT NULL DEFAULT '[]',
    external_link TEXT,
    owner_email TEXT NOT NULL,
    owner_name TEXT,
    status TEXT NOT NULL DEFAULT 'pending',
    up_votes TEXT NOT NULL DEFAULT '[]',
    down_votes TEXT NOT NULL DEFAULT '[]',
    is_reported INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS products_owner_email_idx ON products (owner_email);
CREATE INDEX IF NOT EXISTS products_status_idx ON products (status);

CREATE TABLE IF NOT EXISTS comments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    product_id INTEGER NOT NULL,
    user_email TEXT NOT NULL,
    user_name TEXT,
    user_photo TEXT,
    text TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS comments_product_id_idx ON comments (product_id);

CREATE TABLE IF NOT EXISTS reports (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    product_id INTEGER NOT NULL,
    user_email TEXT NOT NULL,
    user_name TEXT,
    user_photo TEXT,
    created_at TEXT NOT NULL,
    UNIQUE (product_id, user_email)
);

CREATE TABLE IF NOT EXISTS ratings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    product_id INTEGER NOT NULL,
    user_email TEXT NOT NULL,
    score INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    UNIQUE (product_id, user_email)
);

CREATE TABLE IF NOT EXISTS coupons (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    code TEXT NOT NULL UNIQUE,
    discount TEXT NOT NULL,
    value INTEGER NOT NULL,
    expired_at TEXT NOT NULL,
    usage_limit INTEGER,
    used_count INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);
";

/// Creates all tables and indexes if they do not exist yet. Ran once at
/// process start against a fresh pool connection.
pub fn init(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA)
}
