//! Copy the shop database into a timestamped backup file.
//!
//! Run with: cargo run --bin backup_db [db_path] [backup_dir]

use anyhow::Result;
use std::path::PathBuf;

use repairshop_core::db;

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let db_path = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(db::DEFAULT_DB_PATH));
    let backup_dir = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("backups"));

    anyhow::ensure!(
        db_path.exists(),
        "database not found at {}",
        db_path.display()
    );

    let target = db::backup_database(&db_path, &backup_dir)?;
    println!("Backup written to {}", target.display());
    Ok(())
}
