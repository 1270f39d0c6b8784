//! Accounts, money movements and checks.
//!
//! Account balances are denormalized running totals, changed only
//! together with the transaction insert, inside one transaction. An
//! income credits `to_account`, an expense debits `from_account`, a
//! transfer does both.

use anyhow::Result;
use chrono::{Duration, NaiveDate};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::column_enum;
use crate::models::{Account, AccountingTransaction, AccountingTxnType, Check, CheckStatus};

const ACCOUNT_COLUMNS: &str =
    "id, account_number, name, bank_name, current_balance, is_active, created_at";
const TXN_COLUMNS: &str = "id, txn_type, from_account, to_account, amount, txn_date, \
                           description, related_invoice, created_at";
const CHECK_COLUMNS: &str = "id, check_number, account_id, person_id, amount, issue_date, \
                             due_date, status, description, created_at";

#[derive(Debug, Clone)]
pub struct NewAccount {
    pub account_number: String,
    pub name: String,
    pub bank_name: Option<String>,
    pub opening_balance: f64,
}

#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub txn_type: AccountingTxnType,
    pub from_account: Option<i64>,
    pub to_account: Option<i64>,
    pub amount: f64,
    pub txn_date: NaiveDate,
    pub description: Option<String>,
    pub related_invoice: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct NewCheck {
    pub check_number: String,
    pub account_id: Option<i64>,
    pub person_id: Option<i64>,
    pub amount: f64,
    pub issue_date: Option<NaiveDate>,
    pub due_date: NaiveDate,
    pub description: Option<String>,
}

fn map_account(row: &Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        id: row.get(0)?,
        account_number: row.get(1)?,
        name: row.get(2)?,
        bank_name: row.get(3)?,
        current_balance: row.get(4)?,
        is_active: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn map_txn(row: &Row<'_>) -> rusqlite::Result<AccountingTransaction> {
    Ok(AccountingTransaction {
        id: row.get(0)?,
        txn_type: column_enum(row, 1)?,
        from_account: row.get(2)?,
        to_account: row.get(3)?,
        amount: row.get(4)?,
        txn_date: row.get(5)?,
        description: row.get(6)?,
        related_invoice: row.get(7)?,
        created_at: row.get(8)?,
    })
}

fn map_check(row: &Row<'_>) -> rusqlite::Result<Check> {
    Ok(Check {
        id: row.get(0)?,
        check_number: row.get(1)?,
        account_id: row.get(2)?,
        person_id: row.get(3)?,
        amount: row.get(4)?,
        issue_date: row.get(5)?,
        due_date: row.get(6)?,
        status: column_enum(row, 7)?,
        description: row.get(8)?,
        created_at: row.get(9)?,
    })
}

pub fn create_account(conn: &Connection, new: &NewAccount) -> Result<i64> {
    conn.execute(
        "INSERT INTO accounts (account_number, name, bank_name, current_balance)
         VALUES (?1, ?2, ?3, ?4)",
        params![new.account_number, new.name, new.bank_name, new.opening_balance],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_account(conn: &Connection, id: i64) -> Result<Option<Account>> {
    let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?1");
    Ok(conn.query_row(&sql, [id], map_account).optional()?)
}

pub fn list_accounts(conn: &Connection) -> Result<Vec<Account>> {
    let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE is_active = 1 ORDER BY name");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], map_account)?;
    let mut out = Vec::new();
    for a in rows {
        out.push(a?);
    }
    Ok(out)
}

/// Insert the transaction and move the balances it names, atomically.
pub fn record_transaction(conn: &mut Connection, new: &NewTransaction) -> Result<i64> {
    anyhow::ensure!(new.amount > 0.0, "transaction amount must be positive");
    match new.txn_type {
        AccountingTxnType::Income => {
            anyhow::ensure!(new.to_account.is_some(), "income needs a receiving account")
        }
        AccountingTxnType::Expense => {
            anyhow::ensure!(new.from_account.is_some(), "expense needs a source account")
        }
        AccountingTxnType::Transfer => anyhow::ensure!(
            new.from_account.is_some() && new.to_account.is_some(),
            "transfer needs both accounts"
        ),
    }

    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO accounting_transactions
             (txn_type, from_account, to_account, amount, txn_date, description, related_invoice)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            new.txn_type.as_str(),
            new.from_account,
            new.to_account,
            new.amount,
            new.txn_date,
            new.description,
            new.related_invoice,
        ],
    )?;
    let id = tx.last_insert_rowid();
    if let Some(from) = new.from_account {
        let changed = tx.execute(
            "UPDATE accounts SET current_balance = current_balance - ?1 WHERE id = ?2",
            params![new.amount, from],
        )?;
        anyhow::ensure!(changed == 1, "account {} not found", from);
    }
    if let Some(to) = new.to_account {
        let changed = tx.execute(
            "UPDATE accounts SET current_balance = current_balance + ?1 WHERE id = ?2",
            params![new.amount, to],
        )?;
        anyhow::ensure!(changed == 1, "account {} not found", to);
    }
    tx.commit()?;
    Ok(id)
}

pub fn get_transaction(conn: &Connection, id: i64) -> Result<Option<AccountingTransaction>> {
    let sql = format!("SELECT {TXN_COLUMNS} FROM accounting_transactions WHERE id = ?1");
    Ok(conn.query_row(&sql, [id], map_txn).optional()?)
}

/// Transactions in a Gregorian date range, inclusive.
pub fn transactions_between(
    conn: &Connection,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<AccountingTransaction>> {
    let sql = format!(
        "SELECT {TXN_COLUMNS} FROM accounting_transactions
         WHERE txn_date BETWEEN ?1 AND ?2 ORDER BY txn_date, id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![from, to], map_txn)?;
    let mut out = Vec::new();
    for t in rows {
        out.push(t?);
    }
    Ok(out)
}

/// Income minus expense over a range; transfers cancel out and are
/// skipped.
pub fn profit_between(conn: &Connection, from: NaiveDate, to: NaiveDate) -> Result<f64> {
    let income: f64 = conn.query_row(
        "SELECT COALESCE(SUM(amount), 0) FROM accounting_transactions
         WHERE txn_type = 'income' AND txn_date BETWEEN ?1 AND ?2",
        params![from, to],
        |row| row.get(0),
    )?;
    let expense: f64 = conn.query_row(
        "SELECT COALESCE(SUM(amount), 0) FROM accounting_transactions
         WHERE txn_type = 'expense' AND txn_date BETWEEN ?1 AND ?2",
        params![from, to],
        |row| row.get(0),
    )?;
    Ok(income - expense)
}

pub fn register_check(conn: &Connection, new: &NewCheck) -> Result<i64> {
    conn.execute(
        "INSERT INTO checks (check_number, account_id, person_id, amount, issue_date,
                             due_date, description)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            new.check_number,
            new.account_id,
            new.person_id,
            new.amount,
            new.issue_date,
            new.due_date,
            new.description,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn update_check_status(conn: &Connection, id: i64, status: CheckStatus) -> Result<()> {
    let changed = conn.execute(
        "UPDATE checks SET status = ?1 WHERE id = ?2",
        params![status.as_str(), id],
    )?;
    anyhow::ensure!(changed == 1, "check {} not found", id);
    Ok(())
}

/// Uncollected checks due within `days` of `today`, soonest first.
/// Overdue checks are included.
pub fn checks_due_within(conn: &Connection, today: NaiveDate, days: i64) -> Result<Vec<Check>> {
    let horizon = today + Duration::days(days);
    let sql = format!(
        "SELECT {CHECK_COLUMNS} FROM checks
         WHERE status = 'uncollected' AND due_date <= ?1
         ORDER BY due_date, id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([horizon], map_check)?;
    let mut out = Vec::new();
    for c in rows {
        out.push(c?);
    }
    Ok(out)
}
