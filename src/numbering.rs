//! Sequential business-key generation
//!
//! Reception and invoice numbers follow `{PREFIX}-{YYYYMMDD}-{NNN}` where
//! the date part is the current Jalali date in compact form and the
//! suffix restarts at 001 each day. The scan runs inside the caller's
//! insert transaction so two concurrent inserts cannot mint the same
//! number.

use anyhow::Result;
use rusqlite::Connection;

use crate::jalali::JalaliDate;

/// Next number for today, e.g. `REC-14030101-004`.
pub fn next_number(conn: &Connection, prefix: &str, table: &str, column: &str) -> Result<String> {
    next_number_for(conn, prefix, table, column, JalaliDate::today())
}

/// Same as [`next_number`] with an explicit date, for tests and imports.
pub fn next_number_for(
    conn: &Connection,
    prefix: &str,
    table: &str,
    column: &str,
    date: JalaliDate,
) -> Result<String> {
    let stem = format!(
        "{}-{:04}{:02}{:02}-",
        prefix, date.year, date.month, date.day
    );
    // `table` and `column` are always crate-internal literals, never user
    // input, so formatting them into the SQL is safe.
    let sql = format!(
        "SELECT {col} FROM {table} WHERE {col} LIKE ?1",
        col = column,
        table = table
    );
    let mut stmt = conn.prepare(&sql)?;
    let pattern = format!("{stem}%");
    let mut max_suffix: u32 = 0;
    let rows = stmt.query_map([&pattern], |row| row.get::<_, String>(0))?;
    for number in rows.flatten() {
        if let Some(tail) = number.strip_prefix(&stem) {
            if let Ok(n) = tail.parse::<u32>() {
                max_suffix = max_suffix.max(n);
            }
        }
    }
    Ok(format!("{}{:03}", stem, max_suffix + 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[test]
    fn test_first_number_of_the_day() {
        let conn = db::open_in_memory().unwrap();
        let date = JalaliDate::new(1403, 1, 1).unwrap();
        let number = next_number_for(&conn, "REC", "receptions", "reception_number", date).unwrap();
        assert_eq!(number, "REC-14030101-001");
    }

    #[test]
    fn test_suffix_increments_past_existing_rows() {
        let conn = db::open_in_memory().unwrap();
        conn.execute(
            "INSERT INTO persons (person_type, first_name, last_name) VALUES ('customer', 'a', 'b')",
            [],
        )
        .unwrap();
        conn.execute("INSERT INTO devices (device_type) VALUES ('tv')", [])
            .unwrap();
        for n in [1, 2, 7] {
            conn.execute(
                "INSERT INTO receptions (reception_number, customer_id, device_id, reception_date)
                 VALUES (?1, 1, 1, '2024-03-20')",
                [format!("REC-14030101-{:03}", n)],
            )
            .unwrap();
        }
        let date = JalaliDate::new(1403, 1, 1).unwrap();
        let number = next_number_for(&conn, "REC", "receptions", "reception_number", date).unwrap();
        // Gaps are not reused; the max suffix wins.
        assert_eq!(number, "REC-14030101-008");
    }

    #[test]
    fn test_sequence_restarts_each_day() {
        let conn = db::open_in_memory().unwrap();
        conn.execute(
            "INSERT INTO persons (person_type, first_name, last_name) VALUES ('customer', 'a', 'b')",
            [],
        )
        .unwrap();
        conn.execute("INSERT INTO devices (device_type) VALUES ('tv')", [])
            .unwrap();
        conn.execute(
            "INSERT INTO receptions (reception_number, customer_id, device_id, reception_date)
             VALUES ('REC-14030101-005', 1, 1, '2024-03-20')",
            [],
        )
        .unwrap();
        let next_day = JalaliDate::new(1403, 1, 2).unwrap();
        let number =
            next_number_for(&conn, "REC", "receptions", "reception_number", next_day).unwrap();
        assert_eq!(number, "REC-14030102-001");
    }

    #[test]
    fn test_invoice_prefix() {
        let conn = db::open_in_memory().unwrap();
        let date = JalaliDate::new(1403, 5, 15).unwrap();
        let number = next_number_for(&conn, "INV", "invoices", "invoice_number", date).unwrap();
        assert_eq!(number, "INV-14030515-001");
    }
}
