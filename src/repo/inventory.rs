//! The four warehouses and the append-only movement ledger.
//!
//! Every stock change runs as one transaction that touches the stock
//! row, appends a ledger entry, and (for repair use) updates the repair
//! cost columns. A failure anywhere rolls all of it back. Quantities
//! may go negative; that is logged loudly instead of rejected, since
//! the paper trail in the shop is often ahead of the data entry.

use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};

use super::column_enum;
use super::repairs::{self, UsedPart};
use crate::models::{InventoryTransaction, InventoryTxnType, WarehouseItem, WarehouseType};

fn table(warehouse: WarehouseType) -> &'static str {
    match warehouse {
        WarehouseType::NewParts => "new_parts_warehouse",
        WarehouseType::UsedParts => "used_parts_warehouse",
        WarehouseType::NewAppliances => "new_appliances_warehouse",
        WarehouseType::UsedAppliances => "used_appliances_warehouse",
    }
}

/// Uniform projection over the four slightly different table shapes.
fn select_columns(warehouse: WarehouseType) -> &'static str {
    match warehouse {
        WarehouseType::NewParts | WarehouseType::NewAppliances => {
            "id, item_id, quantity, purchase_price, sale_price, status, \
             supplier_id, batch_number, NULL, NULL, created_at"
        }
        WarehouseType::UsedParts => {
            "id, item_id, quantity, purchase_price, sale_price, status, \
             NULL, NULL, source_device, source_customer, created_at"
        }
        WarehouseType::UsedAppliances => {
            "id, item_id, quantity, purchase_price, sale_price, status, \
             NULL, NULL, NULL, source_customer, created_at"
        }
    }
}

fn map_item(warehouse: WarehouseType) -> impl Fn(&Row<'_>) -> rusqlite::Result<WarehouseItem> {
    move |row| {
        Ok(WarehouseItem {
            id: row.get(0)?,
            warehouse,
            item_id: row.get(1)?,
            quantity: row.get(2)?,
            purchase_price: row.get(3)?,
            sale_price: row.get(4)?,
            status: column_enum(row, 5)?,
            supplier_id: row.get(6)?,
            batch_number: row.get(7)?,
            source_device: row.get(8)?,
            source_customer: row.get(9)?,
            created_at: row.get(10)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewStock {
    pub warehouse: WarehouseType,
    pub item_id: i64,
    pub quantity: i64,
    pub purchase_price: f64,
    pub sale_price: f64,
    pub supplier_id: Option<i64>,
    pub batch_number: Option<String>,
    pub source_device: Option<i64>,
    pub source_customer: Option<i64>,
}

fn log_movement(
    tx: &Transaction<'_>,
    txn_type: InventoryTxnType,
    warehouse: WarehouseType,
    item_id: i64,
    quantity: i64,
    unit_price: f64,
    related_reception: Option<i64>,
    note: Option<&str>,
) -> Result<()> {
    tx.execute(
        "INSERT INTO inventory_transactions
             (txn_type, warehouse_type, item_id, quantity, unit_price, total_price,
              related_reception, note)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            txn_type.as_str(),
            warehouse.as_str(),
            item_id,
            quantity,
            unit_price,
            unit_price * quantity as f64,
            related_reception,
            note,
        ],
    )?;
    Ok(())
}

/// Register purchased or received stock and its `purchase` ledger row.
pub fn add_stock(conn: &mut Connection, new: &NewStock) -> Result<i64> {
    let tx = conn.transaction()?;
    let sql = match new.warehouse {
        WarehouseType::NewParts | WarehouseType::NewAppliances => format!(
            "INSERT INTO {} (item_id, quantity, purchase_price, sale_price, supplier_id, batch_number)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            table(new.warehouse)
        ),
        WarehouseType::UsedParts => format!(
            "INSERT INTO {} (item_id, quantity, purchase_price, sale_price, source_device, source_customer)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            table(new.warehouse)
        ),
        WarehouseType::UsedAppliances => format!(
            "INSERT INTO {} (item_id, quantity, purchase_price, sale_price, source_customer)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            table(new.warehouse)
        ),
    };
    match new.warehouse {
        WarehouseType::NewParts | WarehouseType::NewAppliances => tx.execute(
            &sql,
            params![
                new.item_id,
                new.quantity,
                new.purchase_price,
                new.sale_price,
                new.supplier_id,
                new.batch_number,
            ],
        )?,
        WarehouseType::UsedParts => tx.execute(
            &sql,
            params![
                new.item_id,
                new.quantity,
                new.purchase_price,
                new.sale_price,
                new.source_device,
                new.source_customer,
            ],
        )?,
        WarehouseType::UsedAppliances => tx.execute(
            &sql,
            params![
                new.item_id,
                new.quantity,
                new.purchase_price,
                new.sale_price,
                new.source_customer,
            ],
        )?,
    };
    let id = tx.last_insert_rowid();
    log_movement(
        &tx,
        InventoryTxnType::Purchase,
        new.warehouse,
        new.item_id,
        new.quantity,
        new.purchase_price,
        None,
        None,
    )?;
    tx.commit()?;
    Ok(id)
}

pub fn get_stock(
    conn: &Connection,
    warehouse: WarehouseType,
    stock_id: i64,
) -> Result<Option<WarehouseItem>> {
    let sql = format!(
        "SELECT {} FROM {} WHERE id = ?1",
        select_columns(warehouse),
        table(warehouse)
    );
    Ok(conn
        .query_row(&sql, [stock_id], map_item(warehouse))
        .optional()?)
}

pub fn list_stock(conn: &Connection, warehouse: WarehouseType) -> Result<Vec<WarehouseItem>> {
    let sql = format!(
        "SELECT {} FROM {} ORDER BY id",
        select_columns(warehouse),
        table(warehouse)
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], map_item(warehouse))?;
    let mut out = Vec::new();
    for item in rows {
        out.push(item?);
    }
    Ok(out)
}

/// Available rows at or below `threshold` units, for the reorder list.
pub fn low_stock(
    conn: &Connection,
    warehouse: WarehouseType,
    threshold: i64,
) -> Result<Vec<WarehouseItem>> {
    let sql = format!(
        "SELECT {} FROM {} WHERE status = 'available' AND quantity <= ?1 ORDER BY quantity",
        select_columns(warehouse),
        table(warehouse)
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([threshold], map_item(warehouse))?;
    let mut out = Vec::new();
    for item in rows {
        out.push(item?);
    }
    Ok(out)
}

fn decrement(
    tx: &Transaction<'_>,
    warehouse: WarehouseType,
    stock_id: i64,
    quantity: i64,
) -> Result<WarehouseItem> {
    let sql = format!(
        "SELECT {} FROM {} WHERE id = ?1",
        select_columns(warehouse),
        table(warehouse)
    );
    let item = tx
        .query_row(&sql, [stock_id], map_item(warehouse))
        .optional()?
        .ok_or_else(|| anyhow::anyhow!("stock row {} not found in {}", stock_id, table(warehouse)))?;
    let remaining = item.quantity - quantity;
    if remaining < 0 {
        log::warn!(
            "Stock row {} in {} went negative ({} - {} = {})",
            stock_id,
            table(warehouse),
            item.quantity,
            quantity,
            remaining
        );
    }
    tx.execute(
        &format!(
            "UPDATE {} SET quantity = quantity - ?1 WHERE id = ?2",
            table(warehouse)
        ),
        params![quantity, stock_id],
    )?;
    Ok(item)
}

/// Consume stock for a repair: decrement the row, append a `repair_use`
/// ledger entry tied to the reception, and fold the cost into the
/// repair. One transaction end to end.
pub fn consume_for_repair(
    conn: &mut Connection,
    warehouse: WarehouseType,
    stock_id: i64,
    quantity: i64,
    repair_id: i64,
    reception_id: i64,
) -> Result<()> {
    anyhow::ensure!(quantity > 0, "consumed quantity must be positive");
    let tx = conn.transaction()?;
    let item = decrement(&tx, warehouse, stock_id, quantity)?;
    log_movement(
        &tx,
        InventoryTxnType::RepairUse,
        warehouse,
        item.item_id,
        quantity,
        item.sale_price,
        Some(reception_id),
        None,
    )?;
    repairs::record_part_use(
        &tx,
        repair_id,
        &UsedPart {
            warehouse: warehouse.as_str().to_string(),
            stock_id,
            item_id: item.item_id,
            quantity,
            unit_price: item.sale_price,
        },
    )?;
    tx.commit()?;
    Ok(())
}

/// Direct sale out of a warehouse. When the row is emptied it is marked
/// `sold` so it drops out of availability queries.
pub fn sell_stock(
    conn: &mut Connection,
    warehouse: WarehouseType,
    stock_id: i64,
    quantity: i64,
    unit_price: f64,
) -> Result<()> {
    anyhow::ensure!(quantity > 0, "sold quantity must be positive");
    let tx = conn.transaction()?;
    let item = decrement(&tx, warehouse, stock_id, quantity)?;
    tx.execute(
        &format!(
            "UPDATE {} SET status = 'sold' WHERE id = ?1 AND quantity <= 0",
            table(warehouse)
        ),
        [stock_id],
    )?;
    log_movement(
        &tx,
        InventoryTxnType::Sale,
        warehouse,
        item.item_id,
        quantity,
        unit_price,
        None,
        None,
    )?;
    tx.commit()?;
    Ok(())
}

/// Manual correction after a physical count. `delta` may be negative.
pub fn adjust_stock(
    conn: &mut Connection,
    warehouse: WarehouseType,
    stock_id: i64,
    delta: i64,
    note: &str,
) -> Result<()> {
    let tx = conn.transaction()?;
    let item = decrement(&tx, warehouse, stock_id, -delta)?;
    log_movement(
        &tx,
        InventoryTxnType::Adjustment,
        warehouse,
        item.item_id,
        delta,
        item.purchase_price,
        None,
        Some(note),
    )?;
    tx.commit()?;
    Ok(())
}

/// Write off a whole stock row.
pub fn scrap_stock(
    conn: &mut Connection,
    warehouse: WarehouseType,
    stock_id: i64,
    note: &str,
) -> Result<()> {
    let tx = conn.transaction()?;
    let item = decrement(&tx, warehouse, stock_id, 0)?;
    tx.execute(
        &format!(
            "UPDATE {} SET status = 'scrapped', quantity = 0 WHERE id = ?1",
            table(warehouse)
        ),
        [stock_id],
    )?;
    log_movement(
        &tx,
        InventoryTxnType::Scrap,
        warehouse,
        item.item_id,
        item.quantity,
        item.purchase_price,
        None,
        Some(note),
    )?;
    tx.commit()?;
    Ok(())
}

/// Movement history for one item in one warehouse, newest first.
pub fn movements(
    conn: &Connection,
    warehouse: WarehouseType,
    item_id: i64,
) -> Result<Vec<InventoryTransaction>> {
    let mut stmt = conn.prepare(
        "SELECT id, txn_type, warehouse_type, item_id, quantity, unit_price, total_price,
                related_reception, note, created_at
         FROM inventory_transactions
         WHERE warehouse_type = ?1 AND item_id = ?2
         ORDER BY id DESC",
    )?;
    let rows = stmt.query_map(params![warehouse.as_str(), item_id], |row| {
        Ok(InventoryTransaction {
            id: row.get(0)?,
            txn_type: column_enum(row, 1)?,
            warehouse: column_enum(row, 2)?,
            item_id: row.get(3)?,
            quantity: row.get(4)?,
            unit_price: row.get(5)?,
            total_price: row.get(6)?,
            related_reception: row.get(7)?,
            note: row.get(8)?,
            created_at: row.get(9)?,
        })
    })?;
    let mut out = Vec::new();
    for t in rows {
        out.push(t?);
    }
    Ok(out)
}
