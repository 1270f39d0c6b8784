//! Repair jobs attached to a reception.
//!
//! `total_cost` is denormalized as labor + parts + outsourced and is
//! recomputed inside the same transaction as whatever changed one of
//! the components. The consumed-part detail lives both here (a JSON
//! snapshot in `used_parts`) and in the inventory ledger.

use anyhow::Result;
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use serde::{Deserialize, Serialize};

use super::column_enum;
use crate::models::{Repair, RepairStatus, RepairType};

const COLUMNS: &str = "id, reception_id, repair_date, technician_id, repair_type, outsourced_to, \
                       outsourced_cost, labor_cost, parts_cost, total_cost, used_parts, \
                       start_time, end_time, status, created_at";

#[derive(Debug, Clone)]
pub struct NewRepair {
    pub reception_id: i64,
    pub repair_date: NaiveDate,
    pub technician_id: Option<i64>,
    pub repair_type: RepairType,
    pub outsourced_to: Option<i64>,
    pub outsourced_cost: f64,
    pub labor_cost: f64,
    pub start_time: Option<String>,
}

/// One entry of the `used_parts` JSON snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UsedPart {
    pub warehouse: String,
    pub stock_id: i64,
    pub item_id: i64,
    pub quantity: i64,
    pub unit_price: f64,
}

fn map_repair(row: &Row<'_>) -> rusqlite::Result<Repair> {
    Ok(Repair {
        id: row.get(0)?,
        reception_id: row.get(1)?,
        repair_date: row.get(2)?,
        technician_id: row.get(3)?,
        repair_type: column_enum(row, 4)?,
        outsourced_to: row.get(5)?,
        outsourced_cost: row.get(6)?,
        labor_cost: row.get(7)?,
        parts_cost: row.get(8)?,
        total_cost: row.get(9)?,
        used_parts: row.get(10)?,
        start_time: row.get(11)?,
        end_time: row.get(12)?,
        status: column_enum(row, 13)?,
        created_at: row.get(14)?,
    })
}

/// Open a repair and move its reception to `in_repair` atomically.
pub fn create_repair(conn: &mut Connection, new: &NewRepair) -> Result<i64> {
    anyhow::ensure!(
        new.repair_type != RepairType::Outsourced || new.outsourced_to.is_some(),
        "outsourced repair needs a receiving workshop"
    );
    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO repairs (reception_id, repair_date, technician_id, repair_type,
                              outsourced_to, outsourced_cost, labor_cost, total_cost, start_time)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            new.reception_id,
            new.repair_date,
            new.technician_id,
            new.repair_type.as_str(),
            new.outsourced_to,
            new.outsourced_cost,
            new.labor_cost,
            new.labor_cost + new.outsourced_cost,
            new.start_time,
        ],
    )?;
    let id = tx.last_insert_rowid();
    tx.execute(
        "UPDATE receptions SET status = 'in_repair', updated_at = datetime('now') WHERE id = ?1",
        [new.reception_id],
    )?;
    tx.commit()?;
    Ok(id)
}

pub fn get_repair(conn: &Connection, id: i64) -> Result<Option<Repair>> {
    let sql = format!("SELECT {COLUMNS} FROM repairs WHERE id = ?1");
    Ok(conn.query_row(&sql, [id], map_repair).optional()?)
}

pub fn list_for_reception(conn: &Connection, reception_id: i64) -> Result<Vec<Repair>> {
    let sql = format!("SELECT {COLUMNS} FROM repairs WHERE reception_id = ?1 ORDER BY id");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([reception_id], map_repair)?;
    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

pub fn update_status(conn: &Connection, id: i64, status: RepairStatus) -> Result<()> {
    let changed = conn.execute(
        "UPDATE repairs SET status = ?1 WHERE id = ?2",
        params![status.as_str(), id],
    )?;
    anyhow::ensure!(changed == 1, "repair {} not found", id);
    Ok(())
}

/// Adjust labor cost and keep the denormalized total in step.
pub fn set_labor_cost(conn: &Connection, id: i64, labor_cost: f64) -> Result<()> {
    let changed = conn.execute(
        "UPDATE repairs SET labor_cost = ?1,
                            total_cost = ?1 + parts_cost + outsourced_cost
         WHERE id = ?2",
        params![labor_cost, id],
    )?;
    anyhow::ensure!(changed == 1, "repair {} not found", id);
    Ok(())
}

/// Close the repair and move the reception to `repaired`, in one
/// transaction. The total is recomputed from the cost columns so a
/// stale in-memory value cannot be written back.
pub fn complete_repair(conn: &mut Connection, id: i64, end_time: Option<String>) -> Result<Repair> {
    let tx = conn.transaction()?;
    let changed = tx.execute(
        "UPDATE repairs SET status = 'done', end_time = ?1,
                            total_cost = labor_cost + parts_cost + outsourced_cost
         WHERE id = ?2",
        params![end_time, id],
    )?;
    anyhow::ensure!(changed == 1, "repair {} not found", id);
    tx.execute(
        "UPDATE receptions SET status = 'repaired', updated_at = datetime('now')
         WHERE id = (SELECT reception_id FROM repairs WHERE id = ?1)",
        [id],
    )?;
    let sql = format!("SELECT {COLUMNS} FROM repairs WHERE id = ?1");
    let repair = tx.query_row(&sql, [id], map_repair)?;
    tx.commit()?;
    log::info!(
        "Repair {} completed, total {}",
        repair.id,
        repair.total_cost
    );
    Ok(repair)
}

/// Record a consumed part on the repair row: bump `parts_cost`, refresh
/// the total and append to the `used_parts` JSON snapshot. Called from
/// the inventory transaction, never on its own.
pub(crate) fn record_part_use(tx: &Transaction<'_>, repair_id: i64, used: &UsedPart) -> Result<()> {
    let snapshot: Option<String> = tx
        .query_row("SELECT used_parts FROM repairs WHERE id = ?1", [repair_id], |row| {
            row.get(0)
        })
        .optional()?
        .ok_or_else(|| anyhow::anyhow!("repair {} not found", repair_id))?;
    let mut parts: Vec<UsedPart> = match snapshot.as_deref() {
        Some(raw) => serde_json::from_str(raw)?,
        None => Vec::new(),
    };
    parts.push(used.clone());
    let cost = used.unit_price * used.quantity as f64;
    tx.execute(
        "UPDATE repairs SET parts_cost = parts_cost + ?1,
                            total_cost = labor_cost + parts_cost + ?1 + outsourced_cost,
                            used_parts = ?2
         WHERE id = ?3",
        params![cost, serde_json::to_string(&parts)?, repair_id],
    )?;
    Ok(())
}
