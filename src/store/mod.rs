//! Persistent record store: file records, settings, audit and access logs.

pub mod records;
pub mod sqlite;
