//! Create (or upgrade) the shop database and seed the default lookups.
//!
//! Run with: cargo run --bin init_db [path]

use anyhow::Result;
use std::path::PathBuf;

use repairshop_core::db;
use repairshop_core::repo::lookups;

fn main() -> Result<()> {
    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(db::DEFAULT_DB_PATH));

    println!("Initializing database at {}", path.display());
    let conn = db::open_database(&path)?;

    // Seed the editable lists a fresh install expects. Already-present
    // values are left alone.
    let seeds: &[(&str, &[&str])] = &[
        (
            "device_type",
            &["یخچال", "لباسشویی", "ظرفشویی", "کولر گازی", "تلویزیون", "جاروبرقی"],
        ),
        ("brand", &["Snowa", "Bosch", "LG", "Samsung", "Emersun", "Pars"]),
        ("part_category", &["موتور", "برد", "پمپ", "سنسور", "کمپرسور"]),
    ];
    let mut seeded = 0;
    for (category, values) in seeds {
        for value in *values {
            if lookups::add_value(&conn, category, value).is_ok() {
                seeded += 1;
            }
        }
    }

    // Default financial-year start (Farvardin 1), kept if already set.
    if db::get_setting(&conn, "financial_year_start")?.is_none() {
        db::set_setting(&conn, "financial_year_start", "1/1")?;
    }

    println!("Schema is up to date, {} lookup value(s) seeded.", seeded);
    Ok(())
}
