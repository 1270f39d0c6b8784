//! Part and service-fee catalogs. Definitions only; stock levels live
//! in the warehouse tables.

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::models::{Part, ServiceFee};

const PART_COLUMNS: &str = "id, part_code, name, category, unit, description, created_at";
const FEE_COLUMNS: &str = "id, service_code, name, category, base_fee, description, created_at";

#[derive(Debug, Clone)]
pub struct NewPart {
    pub part_code: String,
    pub name: String,
    pub category: Option<String>,
    pub unit: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewServiceFee {
    pub service_code: String,
    pub name: String,
    pub category: Option<String>,
    pub base_fee: f64,
    pub description: Option<String>,
}

fn map_part(row: &Row<'_>) -> rusqlite::Result<Part> {
    Ok(Part {
        id: row.get(0)?,
        part_code: row.get(1)?,
        name: row.get(2)?,
        category: row.get(3)?,
        unit: row.get(4)?,
        description: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn map_fee(row: &Row<'_>) -> rusqlite::Result<ServiceFee> {
    Ok(ServiceFee {
        id: row.get(0)?,
        service_code: row.get(1)?,
        name: row.get(2)?,
        category: row.get(3)?,
        base_fee: row.get(4)?,
        description: row.get(5)?,
        created_at: row.get(6)?,
    })
}

pub fn create_part(conn: &Connection, new: &NewPart) -> Result<i64> {
    conn.execute(
        "INSERT INTO parts (part_code, name, category, unit, description)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![new.part_code, new.name, new.category, new.unit, new.description],
    )
    .with_context(|| format!("inserting part {} (duplicate code?)", new.part_code))?;
    Ok(conn.last_insert_rowid())
}

pub fn get_part(conn: &Connection, id: i64) -> Result<Option<Part>> {
    let sql = format!("SELECT {PART_COLUMNS} FROM parts WHERE id = ?1");
    Ok(conn.query_row(&sql, [id], map_part).optional()?)
}

pub fn find_part_by_code(conn: &Connection, code: &str) -> Result<Option<Part>> {
    let sql = format!("SELECT {PART_COLUMNS} FROM parts WHERE part_code = ?1");
    Ok(conn.query_row(&sql, [code], map_part).optional()?)
}

pub fn search_parts(conn: &Connection, query: &str) -> Result<Vec<Part>> {
    let sql = format!(
        "SELECT {PART_COLUMNS} FROM parts WHERE name LIKE ?1 OR part_code LIKE ?1 ORDER BY name"
    );
    let mut stmt = conn.prepare(&sql)?;
    let pattern = format!("%{}%", query);
    let rows = stmt.query_map([&pattern], map_part)?;
    let mut out = Vec::new();
    for p in rows {
        out.push(p?);
    }
    Ok(out)
}

pub fn create_service_fee(conn: &Connection, new: &NewServiceFee) -> Result<i64> {
    conn.execute(
        "INSERT INTO service_fees (service_code, name, category, base_fee, description)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            new.service_code,
            new.name,
            new.category,
            new.base_fee,
            new.description
        ],
    )
    .with_context(|| format!("inserting service fee {} (duplicate code?)", new.service_code))?;
    Ok(conn.last_insert_rowid())
}

pub fn get_service_fee(conn: &Connection, id: i64) -> Result<Option<ServiceFee>> {
    let sql = format!("SELECT {FEE_COLUMNS} FROM service_fees WHERE id = ?1");
    Ok(conn.query_row(&sql, [id], map_fee).optional()?)
}

pub fn list_service_fees(conn: &Connection, category: Option<&str>) -> Result<Vec<ServiceFee>> {
    let mut out = Vec::new();
    match category {
        Some(cat) => {
            let sql =
                format!("SELECT {FEE_COLUMNS} FROM service_fees WHERE category = ?1 ORDER BY name");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([cat], map_fee)?;
            for f in rows {
                out.push(f?);
            }
        }
        None => {
            let sql = format!("SELECT {FEE_COLUMNS} FROM service_fees ORDER BY name");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([], map_fee)?;
            for f in rows {
                out.push(f?);
            }
        }
    }
    Ok(out)
}

pub fn update_base_fee(conn: &Connection, id: i64, base_fee: f64) -> Result<()> {
    let changed = conn.execute(
        "UPDATE service_fees SET base_fee = ?1 WHERE id = ?2",
        params![base_fee, id],
    )?;
    anyhow::ensure!(changed == 1, "service fee {} not found", id);
    Ok(())
}
