//! Editable (category, value) lists: device types, brands, part
//! categories and the like. Unlike the status enums these grow at
//! runtime.

use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use crate::models::LookupValue;

pub fn add_value(conn: &Connection, category: &str, value: &str) -> Result<i64> {
    conn.execute(
        "INSERT INTO lookup_values (category, value) VALUES (?1, ?2)",
        params![category, value],
    )
    .with_context(|| format!("adding {:?} to {} (already present?)", value, category))?;
    Ok(conn.last_insert_rowid())
}

pub fn list_category(conn: &Connection, category: &str) -> Result<Vec<LookupValue>> {
    let mut stmt = conn.prepare(
        "SELECT id, category, value, created_at FROM lookup_values
         WHERE category = ?1 ORDER BY value",
    )?;
    let rows = stmt.query_map([category], |row| {
        Ok(LookupValue {
            id: row.get(0)?,
            category: row.get(1)?,
            value: row.get(2)?,
            created_at: row.get(3)?,
        })
    })?;
    let mut out = Vec::new();
    for v in rows {
        out.push(v?);
    }
    Ok(out)
}

pub fn remove_value(conn: &Connection, category: &str, value: &str) -> Result<()> {
    let changed = conn.execute(
        "DELETE FROM lookup_values WHERE category = ?1 AND value = ?2",
        params![category, value],
    )?;
    anyhow::ensure!(changed == 1, "{:?} not found in {}", value, category);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[test]
    fn test_add_list_remove() {
        let conn = db::open_in_memory().unwrap();
        add_value(&conn, "brand", "Snowa").unwrap();
        add_value(&conn, "brand", "Bosch").unwrap();
        add_value(&conn, "device_type", "یخچال").unwrap();

        let brands = list_category(&conn, "brand").unwrap();
        assert_eq!(brands.len(), 2);
        assert_eq!(brands[0].value, "Bosch"); // sorted

        remove_value(&conn, "brand", "Snowa").unwrap();
        assert_eq!(list_category(&conn, "brand").unwrap().len(), 1);
        assert!(remove_value(&conn, "brand", "Snowa").is_err());
    }

    #[test]
    fn test_duplicate_in_same_category_rejected() {
        let conn = db::open_in_memory().unwrap();
        add_value(&conn, "brand", "Snowa").unwrap();
        assert!(add_value(&conn, "brand", "Snowa").is_err());
        // Same value in another category is allowed.
        add_value(&conn, "part_category", "Snowa").unwrap();
    }
}
