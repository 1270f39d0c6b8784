//! Persons: customers, suppliers, technicians, partners, employees.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::column_enum;
use crate::models::{Person, PersonType};

const COLUMNS: &str = "id, person_type, first_name, last_name, full_name, mobile, phone, \
                       address, national_id, economic_code, registration_date, is_active, created_at";

#[derive(Debug, Clone)]
pub struct NewPerson {
    pub person_type: PersonType,
    pub first_name: String,
    pub last_name: String,
    pub mobile: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub national_id: Option<String>,
    pub economic_code: Option<String>,
    pub registration_date: Option<NaiveDate>,
}

fn map_person(row: &Row<'_>) -> rusqlite::Result<Person> {
    Ok(Person {
        id: row.get(0)?,
        person_type: column_enum(row, 1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        full_name: row.get(4)?,
        mobile: row.get(5)?,
        phone: row.get(6)?,
        address: row.get(7)?,
        national_id: row.get(8)?,
        economic_code: row.get(9)?,
        registration_date: row.get(10)?,
        is_active: row.get(11)?,
        created_at: row.get(12)?,
    })
}

pub fn create_person(conn: &Connection, new: &NewPerson) -> Result<i64> {
    conn.execute(
        "INSERT INTO persons (person_type, first_name, last_name, mobile, phone, address,
                              national_id, economic_code, registration_date)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            new.person_type.as_str(),
            new.first_name,
            new.last_name,
            new.mobile,
            new.phone,
            new.address,
            new.national_id,
            new.economic_code,
            new.registration_date,
        ],
    )
    .with_context(|| {
        format!(
            "inserting person {} {} (duplicate mobile?)",
            new.first_name, new.last_name
        )
    })?;
    Ok(conn.last_insert_rowid())
}

pub fn get_person(conn: &Connection, id: i64) -> Result<Option<Person>> {
    let sql = format!("SELECT {COLUMNS} FROM persons WHERE id = ?1");
    Ok(conn
        .query_row(&sql, [id], map_person)
        .optional()?)
}

pub fn find_by_mobile(conn: &Connection, mobile: &str) -> Result<Option<Person>> {
    let sql = format!("SELECT {COLUMNS} FROM persons WHERE mobile = ?1");
    Ok(conn.query_row(&sql, [mobile], map_person).optional()?)
}

/// Active persons, optionally limited to one type.
pub fn list_persons(conn: &Connection, person_type: Option<PersonType>) -> Result<Vec<Person>> {
    let mut out = Vec::new();
    match person_type {
        Some(t) => {
            let sql = format!(
                "SELECT {COLUMNS} FROM persons WHERE is_active = 1 AND person_type = ?1
                 ORDER BY last_name, first_name"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([t.as_str()], map_person)?;
            for p in rows {
                out.push(p?);
            }
        }
        None => {
            let sql = format!(
                "SELECT {COLUMNS} FROM persons WHERE is_active = 1 ORDER BY last_name, first_name"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([], map_person)?;
            for p in rows {
                out.push(p?);
            }
        }
    }
    Ok(out)
}

/// Substring search over the generated full name and the mobile number.
pub fn search_persons(conn: &Connection, query: &str) -> Result<Vec<Person>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM persons
         WHERE full_name LIKE ?1 OR mobile LIKE ?1
         ORDER BY last_name, first_name"
    );
    let mut stmt = conn.prepare(&sql)?;
    let pattern = format!("%{}%", query);
    let rows = stmt.query_map([&pattern], map_person)?;
    let mut out = Vec::new();
    for p in rows {
        out.push(p?);
    }
    Ok(out)
}

pub fn update_person(conn: &Connection, id: i64, new: &NewPerson) -> Result<()> {
    let changed = conn.execute(
        "UPDATE persons SET person_type = ?1, first_name = ?2, last_name = ?3, mobile = ?4,
                            phone = ?5, address = ?6, national_id = ?7, economic_code = ?8,
                            registration_date = ?9
         WHERE id = ?10",
        params![
            new.person_type.as_str(),
            new.first_name,
            new.last_name,
            new.mobile,
            new.phone,
            new.address,
            new.national_id,
            new.economic_code,
            new.registration_date,
            id,
        ],
    )?;
    anyhow::ensure!(changed == 1, "person {} not found", id);
    Ok(())
}

/// Soft delete; the row and its history stay in place.
pub fn deactivate_person(conn: &Connection, id: i64) -> Result<()> {
    let changed = conn.execute("UPDATE persons SET is_active = 0 WHERE id = ?1", [id])?;
    anyhow::ensure!(changed == 1, "person {} not found", id);
    Ok(())
}

/// Hard delete. Receptions of this person go with it via ON DELETE
/// CASCADE, so the reception count is logged before the row disappears.
pub fn delete_person(conn: &Connection, id: i64) -> Result<()> {
    let receptions: i64 = conn.query_row(
        "SELECT COUNT(*) FROM receptions WHERE customer_id = ?1",
        [id],
        |row| row.get(0),
    )?;
    if receptions > 0 {
        log::warn!(
            "Deleting person {} cascades away {} reception(s)",
            id,
            receptions
        );
    }
    let changed = conn.execute("DELETE FROM persons WHERE id = ?1", [id])?;
    anyhow::ensure!(changed == 1, "person {} not found", id);
    Ok(())
}
