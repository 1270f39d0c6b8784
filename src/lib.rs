//! Back office for a home-appliance repair shop: Jalali calendar
//! handling, a SQLite schema for the whole workshop (receptions,
//! repairs, four warehouses, invoicing, accounting) and transactional
//! repositories over it.
//!
//! The storage format is always Gregorian `YYYY-MM-DD`; everything the
//! user sees is Jalali. The [`dates`] module is the boundary between
//! the two.

pub mod dates;
pub mod db;
pub mod jalali;
pub mod models;
pub mod numbering;
pub mod repo;
