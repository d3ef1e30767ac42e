//! CSV tables for the psy toolkit
//!
//! A [`Table`] keeps its columns in file order and its rows as ordered
//! column/value maps, so a file can be loaded, extended with result columns
//! and written back without losing anything the caller did not touch.

#![warn(missing_docs)]

pub mod error;
pub mod fields;
pub mod table;
pub mod text;

pub use error::{TableError, TableResult};
pub use fields::{parse_row_id, random_field, read_field, read_fields};
pub use table::{Row, Table};
pub use text::{clean_text, TextCache};
