//! Database layer
//!
//! Opens the SQLite file, applies the full schema batch and the
//! column/table migrations, and offers file-copy backup/restore. Date
//! columns always store Gregorian `YYYY-MM-DD`; the Jalali rendering
//! happens in the calendar layer on the way in and out.
//!
//! Connections are handed to callers explicitly — repositories take a
//! `&Connection` (or `&mut` for transactional operations) instead of
//! reaching for a global handle.

use anyhow::{Context, Result};
use chrono::Local;
use rusqlite::Connection;
use std::path::{Path, PathBuf};

/// Default on-disk location; the parent directory is auto-created.
pub const DEFAULT_DB_PATH: &str = "data/repair_shop.db";

/// Open (or create) the database at `path` and bring the schema up to date.
pub fn open_database(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating database directory {}", parent.display()))?;
        }
    }
    let conn = Connection::open(path)
        .with_context(|| format!("opening database {}", path.display()))?;
    initialize(&conn)?;
    Ok(conn)
}

/// In-memory database with the full schema, for tests.
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    initialize(&conn)?;
    Ok(conn)
}

fn initialize(conn: &Connection) -> Result<()> {
    // Foreign keys are per-connection in SQLite and the cascade rules
    // depend on them.
    conn.execute_batch(
        "PRAGMA foreign_keys = ON; PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;",
    )?;
    conn.execute_batch(SCHEMA)?;
    run_migrations(conn)?;
    Ok(())
}

const SCHEMA: &str = r#"
-- =============================================================================
-- People and devices
-- =============================================================================

CREATE TABLE IF NOT EXISTS persons (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    person_type TEXT NOT NULL CHECK(person_type IN ('customer', 'supplier', 'technician', 'partner', 'employee')),
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    full_name TEXT GENERATED ALWAYS AS (first_name || ' ' || last_name),
    mobile TEXT UNIQUE,
    phone TEXT,
    address TEXT,
    national_id TEXT,
    economic_code TEXT,
    registration_date TEXT,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS devices (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    device_type TEXT NOT NULL,
    brand TEXT,
    model TEXT,
    serial_number TEXT UNIQUE,
    production_year INTEGER,
    purchase_date TEXT,
    warranty_status TEXT NOT NULL DEFAULT 'none' CHECK(warranty_status IN ('active', 'expired', 'none')),
    warranty_end_date TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- =============================================================================
-- Reception and repair
-- =============================================================================

-- Deleting a customer or device cascades through its receptions; the
-- reception history goes with them.
CREATE TABLE IF NOT EXISTS receptions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    reception_number TEXT UNIQUE NOT NULL,
    customer_id INTEGER NOT NULL,
    device_id INTEGER NOT NULL,
    reception_date TEXT NOT NULL,
    reception_time TEXT,
    problem_description TEXT,
    estimated_cost REAL,
    priority TEXT NOT NULL DEFAULT 'normal' CHECK(priority IN ('normal', 'urgent', 'very_urgent')),
    status TEXT NOT NULL DEFAULT 'waiting' CHECK(status IN ('waiting', 'in_repair', 'repaired', 'delivered', 'cancelled')),
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT,
    FOREIGN KEY (customer_id) REFERENCES persons(id) ON DELETE CASCADE,
    FOREIGN KEY (device_id) REFERENCES devices(id) ON DELETE CASCADE
);

-- total_cost is denormalized (labor + parts + outsourced), maintained by
-- the repository; no DB constraint enforces the sum.
CREATE TABLE IF NOT EXISTS repairs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    reception_id INTEGER NOT NULL,
    repair_date TEXT NOT NULL,
    technician_id INTEGER,
    repair_type TEXT NOT NULL DEFAULT 'internal' CHECK(repair_type IN ('internal', 'outsourced')),
    outsourced_to INTEGER,
    outsourced_cost REAL NOT NULL DEFAULT 0,
    labor_cost REAL NOT NULL DEFAULT 0,
    parts_cost REAL NOT NULL DEFAULT 0,
    total_cost REAL NOT NULL DEFAULT 0,
    used_parts TEXT,
    start_time TEXT,
    end_time TEXT,
    status TEXT NOT NULL DEFAULT 'started' CHECK(status IN ('started', 'in_progress', 'done', 'stopped')),
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    FOREIGN KEY (reception_id) REFERENCES receptions(id) ON DELETE CASCADE,
    FOREIGN KEY (technician_id) REFERENCES persons(id),
    FOREIGN KEY (outsourced_to) REFERENCES persons(id)
);

-- =============================================================================
-- Catalog: parts and service fees (no quantities here)
-- =============================================================================

CREATE TABLE IF NOT EXISTS parts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    part_code TEXT UNIQUE NOT NULL,
    name TEXT NOT NULL,
    category TEXT,
    unit TEXT,
    description TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS service_fees (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    service_code TEXT UNIQUE NOT NULL,
    name TEXT NOT NULL,
    category TEXT,
    base_fee REAL NOT NULL DEFAULT 0,
    description TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- =============================================================================
-- The four warehouses
-- =============================================================================

CREATE TABLE IF NOT EXISTS new_parts_warehouse (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    item_id INTEGER NOT NULL,
    quantity INTEGER NOT NULL DEFAULT 0,
    purchase_price REAL NOT NULL DEFAULT 0,
    sale_price REAL NOT NULL DEFAULT 0,
    status TEXT NOT NULL DEFAULT 'available' CHECK(status IN ('available', 'reserved', 'sold', 'expired', 'scrapped')),
    supplier_id INTEGER,
    batch_number TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    FOREIGN KEY (item_id) REFERENCES parts(id) ON DELETE CASCADE,
    FOREIGN KEY (supplier_id) REFERENCES persons(id)
);

CREATE TABLE IF NOT EXISTS used_parts_warehouse (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    item_id INTEGER NOT NULL,
    quantity INTEGER NOT NULL DEFAULT 0,
    purchase_price REAL NOT NULL DEFAULT 0,
    sale_price REAL NOT NULL DEFAULT 0,
    status TEXT NOT NULL DEFAULT 'available' CHECK(status IN ('available', 'sold', 'scrapped')),
    source_device INTEGER,
    source_customer INTEGER,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    FOREIGN KEY (item_id) REFERENCES parts(id) ON DELETE CASCADE,
    FOREIGN KEY (source_device) REFERENCES devices(id),
    FOREIGN KEY (source_customer) REFERENCES persons(id)
);

CREATE TABLE IF NOT EXISTS new_appliances_warehouse (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    item_id INTEGER NOT NULL,
    quantity INTEGER NOT NULL DEFAULT 0,
    purchase_price REAL NOT NULL DEFAULT 0,
    sale_price REAL NOT NULL DEFAULT 0,
    status TEXT NOT NULL DEFAULT 'available' CHECK(status IN ('available', 'reserved', 'sold', 'scrapped')),
    supplier_id INTEGER,
    batch_number TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    FOREIGN KEY (item_id) REFERENCES devices(id) ON DELETE CASCADE,
    FOREIGN KEY (supplier_id) REFERENCES persons(id)
);

CREATE TABLE IF NOT EXISTS used_appliances_warehouse (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    item_id INTEGER NOT NULL,
    quantity INTEGER NOT NULL DEFAULT 0,
    purchase_price REAL NOT NULL DEFAULT 0,
    sale_price REAL NOT NULL DEFAULT 0,
    status TEXT NOT NULL DEFAULT 'available' CHECK(status IN ('available', 'sold', 'scrapped')),
    source_customer INTEGER,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    FOREIGN KEY (item_id) REFERENCES devices(id) ON DELETE CASCADE,
    FOREIGN KEY (source_customer) REFERENCES persons(id)
);

-- Append-only ledger of every stock movement.
CREATE TABLE IF NOT EXISTS inventory_transactions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    txn_type TEXT NOT NULL CHECK(txn_type IN ('purchase', 'sale', 'repair_use', 'return', 'adjustment', 'scrap', 'transfer')),
    warehouse_type TEXT NOT NULL CHECK(warehouse_type IN ('new_parts', 'used_parts', 'new_appliances', 'used_appliances')),
    item_id INTEGER NOT NULL,
    quantity INTEGER NOT NULL,
    unit_price REAL NOT NULL DEFAULT 0,
    total_price REAL NOT NULL DEFAULT 0,
    related_reception INTEGER,
    note TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    FOREIGN KEY (related_reception) REFERENCES receptions(id)
);

-- =============================================================================
-- Invoicing
-- =============================================================================

CREATE TABLE IF NOT EXISTS invoices (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    invoice_number TEXT UNIQUE NOT NULL,
    invoice_type TEXT NOT NULL CHECK(invoice_type IN ('repair', 'sale', 'purchase')),
    customer_id INTEGER,
    reception_id INTEGER,
    invoice_date TEXT NOT NULL,
    subtotal REAL NOT NULL DEFAULT 0,
    discount REAL NOT NULL DEFAULT 0,
    tax REAL NOT NULL DEFAULT 0,
    total REAL NOT NULL DEFAULT 0,
    paid REAL NOT NULL DEFAULT 0,
    remaining REAL NOT NULL DEFAULT 0,
    payment_status TEXT NOT NULL DEFAULT 'unpaid' CHECK(payment_status IN ('unpaid', 'partial', 'paid', 'cancelled')),
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT,
    FOREIGN KEY (customer_id) REFERENCES persons(id),
    FOREIGN KEY (reception_id) REFERENCES receptions(id)
);

CREATE TABLE IF NOT EXISTS invoice_items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    invoice_id INTEGER NOT NULL,
    item_type TEXT NOT NULL CHECK(item_type IN ('part', 'service', 'device', 'labor')),
    item_id INTEGER,
    description TEXT,
    quantity INTEGER NOT NULL DEFAULT 1,
    unit_price REAL NOT NULL DEFAULT 0,
    total_price REAL NOT NULL DEFAULT 0,
    partner_percentage REAL NOT NULL DEFAULT 0,
    FOREIGN KEY (invoice_id) REFERENCES invoices(id) ON DELETE CASCADE
);

-- =============================================================================
-- Partners and profit sharing
-- =============================================================================

CREATE TABLE IF NOT EXISTS partners (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    person_id INTEGER NOT NULL,
    capital REAL NOT NULL DEFAULT 0,
    profit_percentage REAL NOT NULL DEFAULT 0,
    joined_date TEXT,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    FOREIGN KEY (person_id) REFERENCES persons(id)
);

-- =============================================================================
-- Accounting
-- =============================================================================

CREATE TABLE IF NOT EXISTS accounts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    account_number TEXT UNIQUE NOT NULL,
    name TEXT NOT NULL,
    bank_name TEXT,
    current_balance REAL NOT NULL DEFAULT 0,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS accounting_transactions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    txn_type TEXT NOT NULL CHECK(txn_type IN ('income', 'expense', 'transfer')),
    from_account INTEGER,
    to_account INTEGER,
    amount REAL NOT NULL,
    txn_date TEXT NOT NULL,
    description TEXT,
    related_invoice INTEGER,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    FOREIGN KEY (from_account) REFERENCES accounts(id),
    FOREIGN KEY (to_account) REFERENCES accounts(id),
    FOREIGN KEY (related_invoice) REFERENCES invoices(id)
);

-- Derived distribution ledger; rows are never mutated after insert.
CREATE TABLE IF NOT EXISTS partner_shares (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    partner_id INTEGER NOT NULL,
    transaction_id INTEGER NOT NULL,
    transaction_type TEXT NOT NULL CHECK(transaction_type IN ('income', 'expense', 'transfer')),
    share_percentage REAL NOT NULL,
    share_amount REAL NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    FOREIGN KEY (partner_id) REFERENCES partners(id),
    FOREIGN KEY (transaction_id) REFERENCES accounting_transactions(id)
);

CREATE TABLE IF NOT EXISTS checks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    check_number TEXT NOT NULL,
    account_id INTEGER,
    person_id INTEGER,
    amount REAL NOT NULL,
    issue_date TEXT,
    due_date TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'uncollected' CHECK(status IN ('uncollected', 'collected', 'bounced', 'passed', 'blocked')),
    description TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    FOREIGN KEY (account_id) REFERENCES accounts(id),
    FOREIGN KEY (person_id) REFERENCES persons(id)
);

-- =============================================================================
-- Messaging, lookups, users, audit
-- =============================================================================

CREATE TABLE IF NOT EXISTS messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    customer_id INTEGER,
    mobile TEXT NOT NULL,
    body TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending' CHECK(status IN ('pending', 'sent', 'failed')),
    sent_at TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    FOREIGN KEY (customer_id) REFERENCES persons(id)
);

CREATE TABLE IF NOT EXISTS sms_templates (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT UNIQUE NOT NULL,
    body TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS lookup_values (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    category TEXT NOT NULL,
    value TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE(category, value)
);

CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT UNIQUE NOT NULL,
    password_hash TEXT NOT NULL,
    person_id INTEGER,
    role TEXT NOT NULL DEFAULT 'operator' CHECK(role IN ('admin', 'manager', 'operator')),
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    FOREIGN KEY (person_id) REFERENCES persons(id)
);

-- Append-only audit trail.
CREATE TABLE IF NOT EXISTS logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER,
    action TEXT NOT NULL,
    table_name TEXT,
    record_id INTEGER,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    FOREIGN KEY (user_id) REFERENCES users(id)
);

CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

-- =============================================================================
-- Indices
-- =============================================================================

CREATE INDEX IF NOT EXISTS idx_receptions_customer ON receptions(customer_id);
CREATE INDEX IF NOT EXISTS idx_receptions_status ON receptions(status);
CREATE INDEX IF NOT EXISTS idx_receptions_date ON receptions(reception_date);
CREATE INDEX IF NOT EXISTS idx_repairs_reception ON repairs(reception_id);
CREATE INDEX IF NOT EXISTS idx_repairs_status ON repairs(status);
CREATE INDEX IF NOT EXISTS idx_persons_type ON persons(person_type);
CREATE INDEX IF NOT EXISTS idx_invoices_customer ON invoices(customer_id);
CREATE INDEX IF NOT EXISTS idx_invoices_status ON invoices(payment_status);
CREATE INDEX IF NOT EXISTS idx_invoices_date ON invoices(invoice_date);
CREATE INDEX IF NOT EXISTS idx_acct_txn_date ON accounting_transactions(txn_date);
CREATE INDEX IF NOT EXISTS idx_checks_due ON checks(due_date);
CREATE INDEX IF NOT EXISTS idx_checks_status ON checks(status);
CREATE INDEX IF NOT EXISTS idx_messages_customer ON messages(customer_id);
CREATE INDEX IF NOT EXISTS idx_inventory_txn_item ON inventory_transactions(warehouse_type, item_id);
"#;

/// Migrations for databases created before a column or table existed.
fn run_migrations(conn: &Connection) -> Result<()> {
    if !column_exists(conn, "persons", "economic_code") {
        conn.execute("ALTER TABLE persons ADD COLUMN economic_code TEXT", [])?;
        log::info!("Migration: Added economic_code column to persons");
    }

    if !column_exists(conn, "invoices", "updated_at") {
        conn.execute("ALTER TABLE invoices ADD COLUMN updated_at TEXT", [])?;
        log::info!("Migration: Added updated_at column to invoices");
    }

    if !table_exists(conn, "sms_templates") {
        conn.execute_batch(
            "CREATE TABLE sms_templates (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT UNIQUE NOT NULL,
                body TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );",
        )?;
        log::info!("Migration: Created sms_templates table");
    }

    Ok(())
}

pub fn column_exists(conn: &Connection, table: &str, column: &str) -> bool {
    let sql = format!("PRAGMA table_info({})", table);
    if let Ok(mut stmt) = conn.prepare(&sql) {
        if let Ok(rows) = stmt.query_map([], |row| row.get::<_, String>(1)) {
            for name in rows.flatten() {
                if name == column {
                    return true;
                }
            }
        }
    }
    false
}

pub fn table_exists(conn: &Connection, table: &str) -> bool {
    conn.query_row(
        "SELECT name FROM sqlite_master WHERE type='table' AND name=?1",
        [table],
        |_| Ok(()),
    )
    .is_ok()
}

/// Copy the database file into `backup_dir` under a timestamped name.
/// Returns the path of the backup file.
pub fn backup_database(db_path: &Path, backup_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(backup_dir)
        .with_context(|| format!("creating backup directory {}", backup_dir.display()))?;
    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    let target = backup_dir.join(format!("backup_repair_shop_{stamp}.db"));
    std::fs::copy(db_path, &target)
        .with_context(|| format!("copying {} to {}", db_path.display(), target.display()))?;
    log::info!("Backup written to {}", target.display());
    Ok(target)
}

/// Replace the database file with a backup copy.
pub fn restore_database(backup_path: &Path, db_path: &Path) -> Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::copy(backup_path, db_path).with_context(|| {
        format!(
            "restoring {} from {}",
            db_path.display(),
            backup_path.display()
        )
    })?;
    log::info!("Database restored from {}", backup_path.display());
    Ok(())
}

/// Read one key from the settings table.
pub fn get_setting(conn: &Connection, key: &str) -> Result<Option<String>> {
    use rusqlite::OptionalExtension;
    Ok(conn
        .query_row("SELECT value FROM settings WHERE key = ?1", [key], |row| {
            row.get(0)
        })
        .optional()?)
}

/// Upsert one key in the settings table.
pub fn set_setting(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO settings (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        [key, value],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_initializes() {
        let conn = open_in_memory().unwrap();
        assert!(table_exists(&conn, "persons"));
        assert!(table_exists(&conn, "used_appliances_warehouse"));
        assert!(table_exists(&conn, "partner_shares"));
        assert!(column_exists(&conn, "persons", "economic_code"));
        // Initialization is idempotent.
        initialize(&conn).unwrap();
    }

    #[test]
    fn test_settings_roundtrip_and_upsert() {
        let conn = open_in_memory().unwrap();
        assert!(get_setting(&conn, "shop_name").unwrap().is_none());
        set_setting(&conn, "shop_name", "تعمیرگاه مرکزی").unwrap();
        assert_eq!(
            get_setting(&conn, "shop_name").unwrap().as_deref(),
            Some("تعمیرگاه مرکزی")
        );
        set_setting(&conn, "shop_name", "تعمیرگاه نو").unwrap();
        assert_eq!(
            get_setting(&conn, "shop_name").unwrap().as_deref(),
            Some("تعمیرگاه نو")
        );
    }

    #[test]
    fn test_full_name_is_generated() {
        let conn = open_in_memory().unwrap();
        conn.execute(
            "INSERT INTO persons (person_type, first_name, last_name) VALUES ('customer', 'علی', 'رضایی')",
            [],
        )
        .unwrap();
        let full: String = conn
            .query_row("SELECT full_name FROM persons WHERE id = 1", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(full, "علی رضایی");
    }

    #[test]
    fn test_duplicate_mobile_rejected() {
        let conn = open_in_memory().unwrap();
        conn.execute(
            "INSERT INTO persons (person_type, first_name, last_name, mobile) VALUES ('customer', 'a', 'b', '09120000000')",
            [],
        )
        .unwrap();
        let result = conn.execute(
            "INSERT INTO persons (person_type, first_name, last_name, mobile) VALUES ('customer', 'c', 'd', '09120000000')",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_orphan_reception_rejected() {
        let conn = open_in_memory().unwrap();
        let result = conn.execute(
            "INSERT INTO receptions (reception_number, customer_id, device_id, reception_date)
             VALUES ('REC-1', 999, 999, '2024-03-20')",
            [],
        );
        assert!(result.is_err(), "FK violation must be rejected");
    }

    #[test]
    fn test_person_delete_cascades_to_receptions() {
        let conn = open_in_memory().unwrap();
        conn.execute(
            "INSERT INTO persons (person_type, first_name, last_name) VALUES ('customer', 'a', 'b')",
            [],
        )
        .unwrap();
        conn.execute("INSERT INTO devices (device_type) VALUES ('refrigerator')", [])
            .unwrap();
        conn.execute(
            "INSERT INTO receptions (reception_number, customer_id, device_id, reception_date)
             VALUES ('REC-1', 1, 1, '2024-03-20')",
            [],
        )
        .unwrap();

        conn.execute("DELETE FROM persons WHERE id = 1", []).unwrap();
        // The cascade silently removes the reception history.
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM receptions", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_status_check_constraint() {
        let conn = open_in_memory().unwrap();
        conn.execute(
            "INSERT INTO persons (person_type, first_name, last_name) VALUES ('customer', 'a', 'b')",
            [],
        )
        .unwrap();
        conn.execute("INSERT INTO devices (device_type) VALUES ('washer')", [])
            .unwrap();
        let result = conn.execute(
            "INSERT INTO receptions (reception_number, customer_id, device_id, reception_date, status)
             VALUES ('REC-1', 1, 1, '2024-03-20', 'lost')",
            [],
        );
        assert!(result.is_err(), "value outside the CHECK set must fail");
    }

    #[test]
    fn test_lookup_unique_per_category() {
        let conn = open_in_memory().unwrap();
        conn.execute(
            "INSERT INTO lookup_values (category, value) VALUES ('brand', 'Samsung')",
            [],
        )
        .unwrap();
        // Same value in a different category is fine.
        conn.execute(
            "INSERT INTO lookup_values (category, value) VALUES ('device_type', 'Samsung')",
            [],
        )
        .unwrap();
        let result = conn.execute(
            "INSERT INTO lookup_values (category, value) VALUES ('brand', 'Samsung')",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_backup_and_restore_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("repair_shop.db");
        {
            let conn = open_database(&db_path).unwrap();
            conn.execute(
                "INSERT INTO persons (person_type, first_name, last_name) VALUES ('customer', 'a', 'b')",
                [],
            )
            .unwrap();
            conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);").unwrap();
        }

        let backup_dir = dir.path().join("backups");
        let backup = backup_database(&db_path, &backup_dir).unwrap();
        let name = backup.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("backup_repair_shop_"));
        assert!(name.ends_with(".db"));

        std::fs::remove_file(&db_path).unwrap();
        restore_database(&backup, &db_path).unwrap();
        let conn = open_database(&db_path).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM persons", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_open_database_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("data").join("repair_shop.db");
        let conn = open_database(&nested).unwrap();
        conn.execute_batch("SELECT 1;").unwrap();
        assert!(nested.exists());
    }
}
