//! Ordered key/value access over the `kv` table.
//!
//! Keys are ordered byte-wise within a bucket, so a prefix scan returns
//! entries in key order.

use crate::error::PoetResult;
use rusqlite::{Connection, OptionalExtension, params};

/// Create the bucket if it does not exist yet.
pub fn ensure_bucket(conn: &Connection, bucket: &str) -> PoetResult<()> {
    conn.execute(
        "INSERT OR IGNORE INTO buckets (name, created_at) VALUES (?1, ?2)",
        params![bucket, super::now().timestamp_millis()],
    )?;
    Ok(())
}

pub fn bucket_exists(conn: &Connection, bucket: &str) -> PoetResult<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM buckets WHERE name = ?1",
            params![bucket],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

pub fn get(conn: &Connection, bucket: &str, key: &str) -> PoetResult<Option<Vec<u8>>> {
    let value = conn
        .query_row(
            "SELECT value FROM kv WHERE bucket = ?1 AND key = ?2",
            params![bucket, key],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value)
}

pub fn contains(conn: &Connection, bucket: &str, key: &str) -> PoetResult<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM kv WHERE bucket = ?1 AND key = ?2",
            params![bucket, key],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Insert or overwrite.
pub fn put(conn: &Connection, bucket: &str, key: &str, value: &[u8]) -> PoetResult<()> {
    conn.execute(
        "INSERT INTO kv (bucket, key, value) VALUES (?1, ?2, ?3)
         ON CONFLICT(bucket, key) DO UPDATE SET value = excluded.value",
        params![bucket, key, value],
    )?;
    Ok(())
}

/// Remove a key. Returns whether it existed.
pub fn delete(conn: &Connection, bucket: &str, key: &str) -> PoetResult<bool> {
    let removed = conn.execute(
        "DELETE FROM kv WHERE bucket = ?1 AND key = ?2",
        params![bucket, key],
    )?;
    Ok(removed > 0)
}

/// All entries whose key starts with `prefix`, in key order.
pub fn scan_prefix(
    conn: &Connection,
    bucket: &str,
    prefix: &str,
) -> PoetResult<Vec<(String, Vec<u8>)>> {
    let mut stmt = conn.prepare(
        "SELECT key, value FROM kv
         WHERE bucket = ?1 AND substr(key, 1, length(?2)) = ?2
         ORDER BY key",
    )?;
    let entries = stmt
        .query_map(params![bucket, prefix], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(entries)
}

/// Keys starting with `prefix`, in key order.
pub fn keys_with_prefix(conn: &Connection, bucket: &str, prefix: &str) -> PoetResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT key FROM kv
         WHERE bucket = ?1 AND substr(key, 1, length(?2)) = ?2
         ORDER BY key",
    )?;
    let keys = stmt
        .query_map(params![bucket, prefix], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(keys)
}
