//! Invoices and their line items.
//!
//! The header totals are computed from the items at creation time and
//! the payment columns are only ever changed through [`record_payment`],
//! which keeps `paid + remaining = total` and the payment status in
//! agreement inside one transaction.

use anyhow::Result;
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::column_enum;
use crate::models::{Invoice, InvoiceItem, InvoiceType, ItemType, PaymentStatus};
use crate::numbering;

const COLUMNS: &str = "id, invoice_number, invoice_type, customer_id, reception_id, invoice_date, \
                       subtotal, discount, tax, total, paid, remaining, payment_status, \
                       created_at, updated_at";

#[derive(Debug, Clone)]
pub struct NewInvoice {
    pub invoice_type: InvoiceType,
    pub customer_id: Option<i64>,
    pub reception_id: Option<i64>,
    pub invoice_date: NaiveDate,
    pub discount: f64,
    pub tax: f64,
}

#[derive(Debug, Clone)]
pub struct NewInvoiceItem {
    pub item_type: ItemType,
    pub item_id: Option<i64>,
    pub description: Option<String>,
    pub quantity: i64,
    pub unit_price: f64,
    pub partner_percentage: f64,
}

fn map_invoice(row: &Row<'_>) -> rusqlite::Result<Invoice> {
    Ok(Invoice {
        id: row.get(0)?,
        invoice_number: row.get(1)?,
        invoice_type: column_enum(row, 2)?,
        customer_id: row.get(3)?,
        reception_id: row.get(4)?,
        invoice_date: row.get(5)?,
        subtotal: row.get(6)?,
        discount: row.get(7)?,
        tax: row.get(8)?,
        total: row.get(9)?,
        paid: row.get(10)?,
        remaining: row.get(11)?,
        payment_status: column_enum(row, 12)?,
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
    })
}

/// Create the invoice with its items in one transaction; the number is
/// minted inside, `INV-YYYYMMDD-NNN`. Returns the id and number.
pub fn create_invoice(
    conn: &mut Connection,
    new: &NewInvoice,
    items: &[NewInvoiceItem],
) -> Result<(i64, String)> {
    anyhow::ensure!(!items.is_empty(), "an invoice needs at least one item");
    let subtotal: f64 = items
        .iter()
        .map(|item| item.unit_price * item.quantity as f64)
        .sum();
    let total = subtotal - new.discount + new.tax;

    let tx = conn.transaction()?;
    let number = numbering::next_number(&tx, "INV", "invoices", "invoice_number")?;
    tx.execute(
        "INSERT INTO invoices (invoice_number, invoice_type, customer_id, reception_id,
                               invoice_date, subtotal, discount, tax, total, remaining)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
        params![
            number,
            new.invoice_type.as_str(),
            new.customer_id,
            new.reception_id,
            new.invoice_date,
            subtotal,
            new.discount,
            new.tax,
            total,
        ],
    )?;
    let id = tx.last_insert_rowid();
    for item in items {
        tx.execute(
            "INSERT INTO invoice_items (invoice_id, item_type, item_id, description, quantity,
                                        unit_price, total_price, partner_percentage)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                id,
                item.item_type.as_str(),
                item.item_id,
                item.description,
                item.quantity,
                item.unit_price,
                item.unit_price * item.quantity as f64,
                item.partner_percentage,
            ],
        )?;
    }
    tx.commit()?;
    log::info!("Invoice {} issued, total {}", number, total);
    Ok((id, number))
}

pub fn get_invoice(conn: &Connection, id: i64) -> Result<Option<Invoice>> {
    let sql = format!("SELECT {COLUMNS} FROM invoices WHERE id = ?1");
    Ok(conn.query_row(&sql, [id], map_invoice).optional()?)
}

pub fn find_by_number(conn: &Connection, number: &str) -> Result<Option<Invoice>> {
    let sql = format!("SELECT {COLUMNS} FROM invoices WHERE invoice_number = ?1");
    Ok(conn.query_row(&sql, [number], map_invoice).optional()?)
}

pub fn invoice_items(conn: &Connection, invoice_id: i64) -> Result<Vec<InvoiceItem>> {
    let mut stmt = conn.prepare(
        "SELECT id, invoice_id, item_type, item_id, description, quantity, unit_price,
                total_price, partner_percentage
         FROM invoice_items WHERE invoice_id = ?1 ORDER BY id",
    )?;
    let rows = stmt.query_map([invoice_id], |row| {
        Ok(InvoiceItem {
            id: row.get(0)?,
            invoice_id: row.get(1)?,
            item_type: column_enum(row, 2)?,
            item_id: row.get(3)?,
            description: row.get(4)?,
            quantity: row.get(5)?,
            unit_price: row.get(6)?,
            total_price: row.get(7)?,
            partner_percentage: row.get(8)?,
        })
    })?;
    let mut out = Vec::new();
    for item in rows {
        out.push(item?);
    }
    Ok(out)
}

/// Register a payment and move the status to `partial` or `paid`.
/// Overpayment is rejected before anything is written.
pub fn record_payment(conn: &mut Connection, invoice_id: i64, amount: f64) -> Result<Invoice> {
    anyhow::ensure!(amount > 0.0, "payment amount must be positive");
    let tx = conn.transaction()?;
    let sql = format!("SELECT {COLUMNS} FROM invoices WHERE id = ?1");
    let invoice = tx
        .query_row(&sql, [invoice_id], map_invoice)
        .optional()?
        .ok_or_else(|| anyhow::anyhow!("invoice {} not found", invoice_id))?;
    anyhow::ensure!(
        invoice.payment_status != PaymentStatus::Cancelled,
        "invoice {} is cancelled",
        invoice.invoice_number
    );
    anyhow::ensure!(
        amount <= invoice.remaining + 1e-6,
        "payment {} exceeds remaining {} on invoice {}",
        amount,
        invoice.remaining,
        invoice.invoice_number
    );

    let paid = invoice.paid + amount;
    let remaining = invoice.total - paid;
    let status = if remaining <= 1e-6 {
        PaymentStatus::Paid
    } else {
        PaymentStatus::Partial
    };
    tx.execute(
        "UPDATE invoices SET paid = ?1, remaining = ?2, payment_status = ?3,
                             updated_at = datetime('now')
         WHERE id = ?4",
        params![paid, remaining.max(0.0), status.as_str(), invoice_id],
    )?;
    let updated = tx.query_row(&sql, [invoice_id], map_invoice)?;
    tx.commit()?;
    Ok(updated)
}

pub fn cancel_invoice(conn: &Connection, id: i64) -> Result<()> {
    let changed = conn.execute(
        "UPDATE invoices SET payment_status = 'cancelled', updated_at = datetime('now')
         WHERE id = ?1",
        [id],
    )?;
    anyhow::ensure!(changed == 1, "invoice {} not found", id);
    Ok(())
}

/// Invoices still carrying a balance, oldest first.
pub fn list_outstanding(conn: &Connection) -> Result<Vec<Invoice>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM invoices
         WHERE payment_status IN ('unpaid', 'partial')
         ORDER BY invoice_date, id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], map_invoice)?;
    let mut out = Vec::new();
    for invoice in rows {
        out.push(invoice?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn sample_items() -> Vec<NewInvoiceItem> {
        vec![
            NewInvoiceItem {
                item_type: ItemType::Labor,
                item_id: None,
                description: Some("اجرت تعمیر".into()),
                quantity: 1,
                unit_price: 500_000.0,
                partner_percentage: 0.0,
            },
            NewInvoiceItem {
                item_type: ItemType::Part,
                item_id: None,
                description: Some("پمپ تخلیه".into()),
                quantity: 2,
                unit_price: 120_000.0,
                partner_percentage: 0.0,
            },
        ]
    }

    fn sample_invoice() -> NewInvoice {
        NewInvoice {
            invoice_type: InvoiceType::Repair,
            customer_id: None,
            reception_id: None,
            invoice_date: NaiveDate::from_ymd_opt(2024, 3, 25).unwrap(),
            discount: 40_000.0,
            tax: 0.0,
        }
    }

    #[test]
    fn test_create_computes_totals_from_items() {
        let mut conn = db::open_in_memory().unwrap();
        let (id, number) = create_invoice(&mut conn, &sample_invoice(), &sample_items()).unwrap();
        assert!(number.starts_with("INV-"));

        let invoice = get_invoice(&conn, id).unwrap().unwrap();
        assert_eq!(invoice.subtotal, 740_000.0);
        assert_eq!(invoice.total, 700_000.0);
        assert_eq!(invoice.remaining, 700_000.0);
        assert_eq!(invoice.paid, 0.0);
        assert_eq!(invoice.payment_status, PaymentStatus::Unpaid);
        assert_eq!(invoice_items(&conn, id).unwrap().len(), 2);
    }

    #[test]
    fn test_empty_invoice_rejected() {
        let mut conn = db::open_in_memory().unwrap();
        assert!(create_invoice(&mut conn, &sample_invoice(), &[]).is_err());
    }

    #[test]
    fn test_partial_then_full_payment() {
        let mut conn = db::open_in_memory().unwrap();
        let (id, _) = create_invoice(&mut conn, &sample_invoice(), &sample_items()).unwrap();

        let invoice = record_payment(&mut conn, id, 300_000.0).unwrap();
        assert_eq!(invoice.payment_status, PaymentStatus::Partial);
        assert_eq!(invoice.paid, 300_000.0);
        assert_eq!(invoice.remaining, 400_000.0);

        let invoice = record_payment(&mut conn, id, 400_000.0).unwrap();
        assert_eq!(invoice.payment_status, PaymentStatus::Paid);
        assert_eq!(invoice.remaining, 0.0);
    }

    #[test]
    fn test_overpayment_rejected() {
        let mut conn = db::open_in_memory().unwrap();
        let (id, _) = create_invoice(&mut conn, &sample_invoice(), &sample_items()).unwrap();
        assert!(record_payment(&mut conn, id, 800_000.0).is_err());
        // Nothing was written.
        let invoice = get_invoice(&conn, id).unwrap().unwrap();
        assert_eq!(invoice.paid, 0.0);
        assert_eq!(invoice.payment_status, PaymentStatus::Unpaid);
    }

    #[test]
    fn test_payment_on_cancelled_invoice_rejected() {
        let mut conn = db::open_in_memory().unwrap();
        let (id, _) = create_invoice(&mut conn, &sample_invoice(), &sample_items()).unwrap();
        cancel_invoice(&conn, id).unwrap();
        assert!(record_payment(&mut conn, id, 100_000.0).is_err());
    }

    #[test]
    fn test_outstanding_excludes_paid_and_cancelled() {
        let mut conn = db::open_in_memory().unwrap();
        let (paid_id, _) = create_invoice(&mut conn, &sample_invoice(), &sample_items()).unwrap();
        let (cancelled_id, _) =
            create_invoice(&mut conn, &sample_invoice(), &sample_items()).unwrap();
        create_invoice(&mut conn, &sample_invoice(), &sample_items()).unwrap();

        record_payment(&mut conn, paid_id, 700_000.0).unwrap();
        cancel_invoice(&conn, cancelled_id).unwrap();

        assert_eq!(list_outstanding(&conn).unwrap().len(), 1);
    }
}
