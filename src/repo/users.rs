//! Users, authentication checks and the audit trail.
//!
//! Password hashing is the caller's concern; this layer stores and
//! compares opaque hash strings so the hashing scheme can change
//! without a schema migration.

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::column_enum;
use crate::models::{LogEntry, User, UserRole};

const COLUMNS: &str = "id, username, password_hash, person_id, role, is_active, created_at";

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub person_id: Option<i64>,
    pub role: UserRole,
}

fn map_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
        person_id: row.get(3)?,
        role: column_enum(row, 4)?,
        is_active: row.get(5)?,
        created_at: row.get(6)?,
    })
}

pub fn create_user(conn: &Connection, new: &NewUser) -> Result<i64> {
    conn.execute(
        "INSERT INTO users (username, password_hash, person_id, role) VALUES (?1, ?2, ?3, ?4)",
        params![new.username, new.password_hash, new.person_id, new.role.as_str()],
    )
    .with_context(|| format!("creating user {} (duplicate username?)", new.username))?;
    Ok(conn.last_insert_rowid())
}

/// Returns the user when the username exists, is active, and the hash
/// matches; `None` otherwise. The caller cannot tell which check
/// failed.
pub fn authenticate(conn: &Connection, username: &str, password_hash: &str) -> Result<Option<User>> {
    let sql = format!("SELECT {COLUMNS} FROM users WHERE username = ?1");
    let user = conn.query_row(&sql, [username], map_user).optional()?;
    Ok(user.filter(|u| u.is_active && u.password_hash == password_hash))
}

pub fn get_user(conn: &Connection, id: i64) -> Result<Option<User>> {
    let sql = format!("SELECT {COLUMNS} FROM users WHERE id = ?1");
    Ok(conn.query_row(&sql, [id], map_user).optional()?)
}

pub fn set_role(conn: &Connection, id: i64, role: UserRole) -> Result<()> {
    let changed = conn.execute(
        "UPDATE users SET role = ?1 WHERE id = ?2",
        params![role.as_str(), id],
    )?;
    anyhow::ensure!(changed == 1, "user {} not found", id);
    Ok(())
}

pub fn deactivate_user(conn: &Connection, id: i64) -> Result<()> {
    let changed = conn.execute("UPDATE users SET is_active = 0 WHERE id = ?1", [id])?;
    anyhow::ensure!(changed == 1, "user {} not found", id);
    Ok(())
}

/// Append one audit row. Never updated or deleted afterwards.
pub fn log_action(
    conn: &Connection,
    user_id: Option<i64>,
    action: &str,
    table_name: Option<&str>,
    record_id: Option<i64>,
) -> Result<()> {
    conn.execute(
        "INSERT INTO logs (user_id, action, table_name, record_id) VALUES (?1, ?2, ?3, ?4)",
        params![user_id, action, table_name, record_id],
    )?;
    Ok(())
}

pub fn recent_logs(conn: &Connection, limit: i64) -> Result<Vec<LogEntry>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, action, table_name, record_id, created_at
         FROM logs ORDER BY id DESC LIMIT ?1",
    )?;
    let rows = stmt.query_map([limit], |row| {
        Ok(LogEntry {
            id: row.get(0)?,
            user_id: row.get(1)?,
            action: row.get(2)?,
            table_name: row.get(3)?,
            record_id: row.get(4)?,
            created_at: row.get(5)?,
        })
    })?;
    let mut out = Vec::new();
    for entry in rows {
        out.push(entry?);
    }
    Ok(out)
}
