//! Partners and the derived profit-share ledger.

use anyhow::Result;
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::column_enum;
use crate::models::{AccountingTxnType, Partner, PartnerShare};

const COLUMNS: &str = "id, person_id, capital, profit_percentage, joined_date, is_active, created_at";

#[derive(Debug, Clone)]
pub struct NewPartner {
    pub person_id: i64,
    pub capital: f64,
    pub profit_percentage: f64,
    pub joined_date: Option<NaiveDate>,
}

fn map_partner(row: &Row<'_>) -> rusqlite::Result<Partner> {
    Ok(Partner {
        id: row.get(0)?,
        person_id: row.get(1)?,
        capital: row.get(2)?,
        profit_percentage: row.get(3)?,
        joined_date: row.get(4)?,
        is_active: row.get(5)?,
        created_at: row.get(6)?,
    })
}

pub fn create_partner(conn: &Connection, new: &NewPartner) -> Result<i64> {
    anyhow::ensure!(
        (0.0..=100.0).contains(&new.profit_percentage),
        "profit percentage must be between 0 and 100"
    );
    conn.execute(
        "INSERT INTO partners (person_id, capital, profit_percentage, joined_date)
         VALUES (?1, ?2, ?3, ?4)",
        params![new.person_id, new.capital, new.profit_percentage, new.joined_date],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_partner(conn: &Connection, id: i64) -> Result<Option<Partner>> {
    let sql = format!("SELECT {COLUMNS} FROM partners WHERE id = ?1");
    Ok(conn.query_row(&sql, [id], map_partner).optional()?)
}

pub fn list_active(conn: &Connection) -> Result<Vec<Partner>> {
    let sql = format!("SELECT {COLUMNS} FROM partners WHERE is_active = 1 ORDER BY id");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], map_partner)?;
    let mut out = Vec::new();
    for p in rows {
        out.push(p?);
    }
    Ok(out)
}

/// Split an income transaction across the active partners by their
/// profit percentage and append one share row each. Expenses and
/// transfers do not distribute. Returns the inserted shares.
pub fn distribute_shares(conn: &mut Connection, transaction_id: i64) -> Result<Vec<PartnerShare>> {
    let tx = conn.transaction()?;
    let (txn_type_raw, amount): (String, f64) = tx
        .query_row(
            "SELECT txn_type, amount FROM accounting_transactions WHERE id = ?1",
            [transaction_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?
        .ok_or_else(|| anyhow::anyhow!("transaction {} not found", transaction_id))?;
    let txn_type: AccountingTxnType = txn_type_raw
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;
    anyhow::ensure!(
        txn_type == AccountingTxnType::Income,
        "only income transactions distribute shares"
    );

    let already: i64 = tx.query_row(
        "SELECT COUNT(*) FROM partner_shares WHERE transaction_id = ?1",
        [transaction_id],
        |row| row.get(0),
    )?;
    anyhow::ensure!(
        already == 0,
        "transaction {} was already distributed",
        transaction_id
    );

    let partners: Vec<(i64, f64)> = {
        let mut stmt = tx.prepare(
            "SELECT id, profit_percentage FROM partners WHERE is_active = 1 ORDER BY id",
        )?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        let mut out = Vec::new();
        for p in rows {
            out.push(p?);
        }
        out
    };

    let mut shares = Vec::new();
    for (partner_id, percentage) in partners {
        let share_amount = amount * percentage / 100.0;
        tx.execute(
            "INSERT INTO partner_shares
                 (partner_id, transaction_id, transaction_type, share_percentage, share_amount)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                partner_id,
                transaction_id,
                txn_type.as_str(),
                percentage,
                share_amount
            ],
        )?;
        let id = tx.last_insert_rowid();
        shares.push(tx.query_row(
            "SELECT id, partner_id, transaction_id, transaction_type, share_percentage,
                    share_amount, created_at
             FROM partner_shares WHERE id = ?1",
            [id],
            |row| {
                Ok(PartnerShare {
                    id: row.get(0)?,
                    partner_id: row.get(1)?,
                    transaction_id: row.get(2)?,
                    transaction_type: column_enum(row, 3)?,
                    share_percentage: row.get(4)?,
                    share_amount: row.get(5)?,
                    created_at: row.get(6)?,
                })
            },
        )?);
    }
    tx.commit()?;
    Ok(shares)
}

/// Accumulated share of one partner over all distributions.
pub fn partner_total(conn: &Connection, partner_id: i64) -> Result<f64> {
    Ok(conn.query_row(
        "SELECT COALESCE(SUM(share_amount), 0) FROM partner_shares WHERE partner_id = ?1",
        [partner_id],
        |row| row.get(0),
    )?)
}
