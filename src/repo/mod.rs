//! Repositories
//!
//! One module per aggregate. Every function takes the connection
//! explicitly; multi-statement writes take `&mut Connection` and run
//! inside a single transaction so a failure leaves no partial state.
//! Reads use positional column lists that match the mapper indexes.

use rusqlite::Row;
use std::str::FromStr;

pub mod accounting;
pub mod catalog;
pub mod devices;
pub mod inventory;
pub mod invoices;
pub mod lookups;
pub mod messages;
pub mod partners;
pub mod persons;
pub mod receptions;
pub mod repairs;
pub mod users;

/// Read a CHECK-constrained status column into its closed enum.
pub(crate) fn column_enum<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = String>,
{
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e: String| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, e.into())
    })
}
