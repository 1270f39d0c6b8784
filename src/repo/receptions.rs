//! Device reception: the entry point of every repair job.
//!
//! Reception numbers are minted inside the insert transaction, so the
//! daily sequence cannot skip or collide even under concurrent writers.

use anyhow::Result;
use chrono::{Local, NaiveDate};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::column_enum;
use crate::models::{Priority, Reception, ReceptionStatus};
use crate::numbering;

const COLUMNS: &str = "id, reception_number, customer_id, device_id, reception_date, \
                       reception_time, problem_description, estimated_cost, priority, status, \
                       created_at, updated_at";

#[derive(Debug, Clone)]
pub struct NewReception {
    pub customer_id: i64,
    pub device_id: i64,
    pub reception_date: NaiveDate,
    pub reception_time: Option<String>,
    pub problem_description: Option<String>,
    pub estimated_cost: Option<f64>,
    pub priority: Priority,
}

fn map_reception(row: &Row<'_>) -> rusqlite::Result<Reception> {
    Ok(Reception {
        id: row.get(0)?,
        reception_number: row.get(1)?,
        customer_id: row.get(2)?,
        device_id: row.get(3)?,
        reception_date: row.get(4)?,
        reception_time: row.get(5)?,
        problem_description: row.get(6)?,
        estimated_cost: row.get(7)?,
        priority: column_enum(row, 8)?,
        status: column_enum(row, 9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

/// Insert a reception and mint its `REC-YYYYMMDD-NNN` number in one
/// transaction. Returns the new row id and the assigned number.
pub fn create_reception(conn: &mut Connection, new: &NewReception) -> Result<(i64, String)> {
    let tx = conn.transaction()?;
    let number = numbering::next_number(&tx, "REC", "receptions", "reception_number")?;
    tx.execute(
        "INSERT INTO receptions (reception_number, customer_id, device_id, reception_date,
                                 reception_time, problem_description, estimated_cost, priority)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            number,
            new.customer_id,
            new.device_id,
            new.reception_date,
            new.reception_time,
            new.problem_description,
            new.estimated_cost,
            new.priority.as_str(),
        ],
    )?;
    let id = tx.last_insert_rowid();
    tx.commit()?;
    log::info!("Reception {} registered for customer {}", number, new.customer_id);
    Ok((id, number))
}

pub fn get_reception(conn: &Connection, id: i64) -> Result<Option<Reception>> {
    let sql = format!("SELECT {COLUMNS} FROM receptions WHERE id = ?1");
    Ok(conn.query_row(&sql, [id], map_reception).optional()?)
}

pub fn find_by_number(conn: &Connection, number: &str) -> Result<Option<Reception>> {
    let sql = format!("SELECT {COLUMNS} FROM receptions WHERE reception_number = ?1");
    Ok(conn.query_row(&sql, [number], map_reception).optional()?)
}

pub fn update_status(conn: &Connection, id: i64, status: ReceptionStatus) -> Result<()> {
    let changed = conn.execute(
        "UPDATE receptions SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), Local::now().naive_local(), id],
    )?;
    anyhow::ensure!(changed == 1, "reception {} not found", id);
    Ok(())
}

pub fn list_by_status(conn: &Connection, status: ReceptionStatus) -> Result<Vec<Reception>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM receptions WHERE status = ?1 ORDER BY reception_date DESC, id DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([status.as_str()], map_reception)?;
    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

pub fn list_for_customer(conn: &Connection, customer_id: i64) -> Result<Vec<Reception>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM receptions WHERE customer_id = ?1 ORDER BY reception_date DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([customer_id], map_reception)?;
    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

/// Receptions within a Gregorian date range, inclusive on both ends.
pub fn list_between(conn: &Connection, from: NaiveDate, to: NaiveDate) -> Result<Vec<Reception>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM receptions WHERE reception_date BETWEEN ?1 AND ?2
         ORDER BY reception_date, id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![from, to], map_reception)?;
    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::PersonType;
    use crate::repo::{devices, persons};

    fn seed(conn: &Connection) -> (i64, i64) {
        let customer = persons::create_person(
            conn,
            &persons::NewPerson {
                person_type: PersonType::Customer,
                first_name: "رضا".into(),
                last_name: "کریمی".into(),
                mobile: Some("09121112233".into()),
                phone: None,
                address: None,
                national_id: None,
                economic_code: None,
                registration_date: None,
            },
        )
        .unwrap();
        let device = devices::create_device(
            conn,
            &devices::NewDevice {
                device_type: "لباسشویی".into(),
                brand: Some("Bosch".into()),
                model: None,
                serial_number: None,
                production_year: None,
                purchase_date: None,
                warranty_status: crate::models::WarrantyStatus::None,
                warranty_end_date: None,
            },
        )
        .unwrap();
        (customer, device)
    }

    fn sample(customer_id: i64, device_id: i64) -> NewReception {
        NewReception {
            customer_id,
            device_id,
            reception_date: NaiveDate::from_ymd_opt(2024, 3, 20).unwrap(),
            reception_time: Some("10:30".into()),
            problem_description: Some("آبگیری نمی‌کند".into()),
            estimated_cost: Some(1_500_000.0),
            priority: Priority::Normal,
        }
    }

    #[test]
    fn test_create_assigns_sequential_numbers() {
        let mut conn = db::open_in_memory().unwrap();
        let (c, d) = seed(&conn);
        let (_, n1) = create_reception(&mut conn, &sample(c, d)).unwrap();
        let (_, n2) = create_reception(&mut conn, &sample(c, d)).unwrap();
        assert!(n1.starts_with("REC-"));
        assert!(n1.ends_with("-001"));
        assert!(n2.ends_with("-002"));
        assert_eq!(&n1[..n1.len() - 3], &n2[..n2.len() - 3]);
    }

    #[test]
    fn test_new_reception_starts_waiting() {
        let mut conn = db::open_in_memory().unwrap();
        let (c, d) = seed(&conn);
        let (id, _) = create_reception(&mut conn, &sample(c, d)).unwrap();
        let reception = get_reception(&conn, id).unwrap().unwrap();
        assert_eq!(reception.status, ReceptionStatus::Waiting);
        assert!(reception.updated_at.is_none());
    }

    #[test]
    fn test_status_update_touches_updated_at() {
        let mut conn = db::open_in_memory().unwrap();
        let (c, d) = seed(&conn);
        let (id, _) = create_reception(&mut conn, &sample(c, d)).unwrap();
        update_status(&conn, id, ReceptionStatus::InRepair).unwrap();
        let reception = get_reception(&conn, id).unwrap().unwrap();
        assert_eq!(reception.status, ReceptionStatus::InRepair);
        assert!(reception.updated_at.is_some());
    }

    #[test]
    fn test_list_by_status_and_customer() {
        let mut conn = db::open_in_memory().unwrap();
        let (c, d) = seed(&conn);
        let (id, _) = create_reception(&mut conn, &sample(c, d)).unwrap();
        create_reception(&mut conn, &sample(c, d)).unwrap();
        update_status(&conn, id, ReceptionStatus::Delivered).unwrap();

        assert_eq!(list_by_status(&conn, ReceptionStatus::Waiting).unwrap().len(), 1);
        assert_eq!(list_by_status(&conn, ReceptionStatus::Delivered).unwrap().len(), 1);
        assert_eq!(list_for_customer(&conn, c).unwrap().len(), 2);
    }

    #[test]
    fn test_find_by_number() {
        let mut conn = db::open_in_memory().unwrap();
        let (c, d) = seed(&conn);
        let (id, number) = create_reception(&mut conn, &sample(c, d)).unwrap();
        let found = find_by_number(&conn, &number).unwrap().unwrap();
        assert_eq!(found.id, id);
    }

    #[test]
    fn test_list_between_is_inclusive() {
        let mut conn = db::open_in_memory().unwrap();
        let (c, d) = seed(&conn);
        create_reception(&mut conn, &sample(c, d)).unwrap();
        let from = NaiveDate::from_ymd_opt(2024, 3, 20).unwrap();
        let to = NaiveDate::from_ymd_opt(2024, 3, 20).unwrap();
        assert_eq!(list_between(&conn, from, to).unwrap().len(), 1);
    }
}
