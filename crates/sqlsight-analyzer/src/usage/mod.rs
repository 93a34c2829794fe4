//! Table and column usage
//!
//! Resolves table aliases and records, per table, which columns a statement
//! touches and in which clause.

pub mod alias;
pub mod columns;

pub use alias::{AliasMap, simple_name};
pub use columns::{TableKey, TableUsage, TableUsages, extract};
