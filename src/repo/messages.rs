//! SMS queue and templates.
//!
//! Messages are queued here and picked up by whatever gateway the shop
//! wires in; this module only tracks the lifecycle. Templates use
//! `{placeholder}` markers substituted at queue time.

use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::column_enum;
use crate::models::Message;

const COLUMNS: &str = "id, customer_id, mobile, body, status, sent_at, created_at";

fn map_message(row: &Row<'_>) -> rusqlite::Result<Message> {
    Ok(Message {
        id: row.get(0)?,
        customer_id: row.get(1)?,
        mobile: row.get(2)?,
        body: row.get(3)?,
        status: column_enum(row, 4)?,
        sent_at: row.get(5)?,
        created_at: row.get(6)?,
    })
}

pub fn queue_message(
    conn: &Connection,
    customer_id: Option<i64>,
    mobile: &str,
    body: &str,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO messages (customer_id, mobile, body) VALUES (?1, ?2, ?3)",
        params![customer_id, mobile, body],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn save_template(conn: &Connection, name: &str, body: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO sms_templates (name, body) VALUES (?1, ?2)
         ON CONFLICT(name) DO UPDATE SET body = excluded.body",
        params![name, body],
    )?;
    Ok(())
}

/// Render a stored template with `{key}` substitutions and queue it.
pub fn queue_from_template(
    conn: &Connection,
    template: &str,
    customer_id: Option<i64>,
    mobile: &str,
    values: &[(&str, &str)],
) -> Result<i64> {
    let body: String = conn
        .query_row(
            "SELECT body FROM sms_templates WHERE name = ?1",
            [template],
            |row| row.get(0),
        )
        .optional()?
        .ok_or_else(|| anyhow::anyhow!("sms template {} not found", template))?;
    let mut rendered = body;
    for (key, value) in values {
        rendered = rendered.replace(&format!("{{{}}}", key), value);
    }
    queue_message(conn, customer_id, mobile, &rendered)
}

pub fn mark_sent(conn: &Connection, id: i64) -> Result<()> {
    let changed = conn.execute(
        "UPDATE messages SET status = 'sent', sent_at = datetime('now') WHERE id = ?1",
        [id],
    )?;
    anyhow::ensure!(changed == 1, "message {} not found", id);
    Ok(())
}

pub fn mark_failed(conn: &Connection, id: i64) -> Result<()> {
    let changed = conn.execute("UPDATE messages SET status = 'failed' WHERE id = ?1", [id])?;
    anyhow::ensure!(changed == 1, "message {} not found", id);
    Ok(())
}

pub fn pending_messages(conn: &Connection) -> Result<Vec<Message>> {
    let sql = format!("SELECT {COLUMNS} FROM messages WHERE status = 'pending' ORDER BY id");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], map_message)?;
    let mut out = Vec::new();
    for m in rows {
        out.push(m?);
    }
    Ok(out)
}

pub fn messages_for_customer(conn: &Connection, customer_id: i64) -> Result<Vec<Message>> {
    let sql = format!("SELECT {COLUMNS} FROM messages WHERE customer_id = ?1 ORDER BY id DESC");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([customer_id], map_message)?;
    let mut out = Vec::new();
    for m in rows {
        out.push(m?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[test]
    fn test_queue_and_lifecycle() {
        let conn = db::open_in_memory().unwrap();
        let id = queue_message(&conn, None, "09121234567", "دستگاه شما آماده است").unwrap();
        assert_eq!(pending_messages(&conn).unwrap().len(), 1);

        mark_sent(&conn, id).unwrap();
        assert!(pending_messages(&conn).unwrap().is_empty());
        let failed = queue_message(&conn, None, "09121234567", "x").unwrap();
        mark_failed(&conn, failed).unwrap();
        assert!(pending_messages(&conn).unwrap().is_empty());
    }

    #[test]
    fn test_template_rendering() {
        let conn = db::open_in_memory().unwrap();
        save_template(
            &conn,
            "ready",
            "مشتری گرامی {name}، دستگاه شما با شماره پذیرش {number} آماده تحویل است.",
        )
        .unwrap();
        let id = queue_from_template(
            &conn,
            "ready",
            None,
            "09121234567",
            &[("name", "رضا کریمی"), ("number", "REC-14030101-001")],
        )
        .unwrap();
        let pending = pending_messages(&conn).unwrap();
        assert_eq!(pending[0].id, id);
        assert_eq!(
            pending[0].body,
            "مشتری گرامی رضا کریمی، دستگاه شما با شماره پذیرش REC-14030101-001 آماده تحویل است."
        );
    }

    #[test]
    fn test_template_upsert_replaces_body() {
        let conn = db::open_in_memory().unwrap();
        save_template(&conn, "ready", "v1").unwrap();
        save_template(&conn, "ready", "v2").unwrap();
        let id = queue_from_template(&conn, "ready", None, "0912", &[]).unwrap();
        assert_eq!(pending_messages(&conn).unwrap()[0].id, id);
        assert_eq!(pending_messages(&conn).unwrap()[0].body, "v2");
    }

    #[test]
    fn test_missing_template_is_an_error() {
        let conn = db::open_in_memory().unwrap();
        assert!(queue_from_template(&conn, "nope", None, "0912", &[]).is_err());
    }
}
