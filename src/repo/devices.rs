//! Devices brought in for repair or held as appliance stock.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::column_enum;
use crate::models::{Device, WarrantyStatus};

const COLUMNS: &str = "id, device_type, brand, model, serial_number, production_year, \
                       purchase_date, warranty_status, warranty_end_date, created_at";

#[derive(Debug, Clone)]
pub struct NewDevice {
    pub device_type: String,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub production_year: Option<i32>,
    pub purchase_date: Option<NaiveDate>,
    pub warranty_status: WarrantyStatus,
    pub warranty_end_date: Option<NaiveDate>,
}

fn map_device(row: &Row<'_>) -> rusqlite::Result<Device> {
    Ok(Device {
        id: row.get(0)?,
        device_type: row.get(1)?,
        brand: row.get(2)?,
        model: row.get(3)?,
        serial_number: row.get(4)?,
        production_year: row.get(5)?,
        purchase_date: row.get(6)?,
        warranty_status: column_enum(row, 7)?,
        warranty_end_date: row.get(8)?,
        created_at: row.get(9)?,
    })
}

pub fn create_device(conn: &Connection, new: &NewDevice) -> Result<i64> {
    conn.execute(
        "INSERT INTO devices (device_type, brand, model, serial_number, production_year,
                              purchase_date, warranty_status, warranty_end_date)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            new.device_type,
            new.brand,
            new.model,
            new.serial_number,
            new.production_year,
            new.purchase_date,
            new.warranty_status.as_str(),
            new.warranty_end_date,
        ],
    )
    .with_context(|| format!("inserting device (duplicate serial {:?}?)", new.serial_number))?;
    Ok(conn.last_insert_rowid())
}

pub fn get_device(conn: &Connection, id: i64) -> Result<Option<Device>> {
    let sql = format!("SELECT {COLUMNS} FROM devices WHERE id = ?1");
    Ok(conn.query_row(&sql, [id], map_device).optional()?)
}

pub fn find_by_serial(conn: &Connection, serial: &str) -> Result<Option<Device>> {
    let sql = format!("SELECT {COLUMNS} FROM devices WHERE serial_number = ?1");
    Ok(conn.query_row(&sql, [serial], map_device).optional()?)
}

pub fn list_devices(conn: &Connection) -> Result<Vec<Device>> {
    let sql = format!("SELECT {COLUMNS} FROM devices ORDER BY id");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], map_device)?;
    let mut out = Vec::new();
    for d in rows {
        out.push(d?);
    }
    Ok(out)
}

pub fn update_warranty(
    conn: &Connection,
    id: i64,
    status: WarrantyStatus,
    end_date: Option<NaiveDate>,
) -> Result<()> {
    let changed = conn.execute(
        "UPDATE devices SET warranty_status = ?1, warranty_end_date = ?2 WHERE id = ?3",
        params![status.as_str(), end_date, id],
    )?;
    anyhow::ensure!(changed == 1, "device {} not found", id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn sample(serial: Option<&str>) -> NewDevice {
        NewDevice {
            device_type: "یخچال".into(),
            brand: Some("Snowa".into()),
            model: Some("SR-D240".into()),
            serial_number: serial.map(String::from),
            production_year: Some(1400),
            purchase_date: None,
            warranty_status: WarrantyStatus::None,
            warranty_end_date: None,
        }
    }

    #[test]
    fn test_create_and_find_by_serial() {
        let conn = db::open_in_memory().unwrap();
        let id = create_device(&conn, &sample(Some("SN-001"))).unwrap();
        let device = find_by_serial(&conn, "SN-001").unwrap().unwrap();
        assert_eq!(device.id, id);
        assert_eq!(device.device_type, "یخچال");
    }

    #[test]
    fn test_duplicate_serial_rejected() {
        let conn = db::open_in_memory().unwrap();
        create_device(&conn, &sample(Some("SN-001"))).unwrap();
        assert!(create_device(&conn, &sample(Some("SN-001"))).is_err());
        // NULL serials do not collide.
        create_device(&conn, &sample(None)).unwrap();
        create_device(&conn, &sample(None)).unwrap();
    }

    #[test]
    fn test_update_warranty() {
        let conn = db::open_in_memory().unwrap();
        let id = create_device(&conn, &sample(Some("SN-002"))).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 3, 20);
        update_warranty(&conn, id, WarrantyStatus::Active, end).unwrap();
        let device = get_device(&conn, id).unwrap().unwrap();
        assert_eq!(device.warranty_status, WarrantyStatus::Active);
        assert_eq!(device.warranty_end_date, end);
    }
}
