//! Generic table query builder.
//!
//! A [`TableSet`] binds a row shape to a table; [`TableSet::query`] starts a
//! [`TableQuery`] on an execution chain. Clause methods return new values and
//! terminal operations render and execute once.

mod builder;
mod dml;
mod merge_tree;
mod render;
mod select;
mod table;

pub use builder::TableQuery;
pub use merge_tree::MergeTreeSet;
pub use table::{TableOptions, TableRow, TableSet, default_table_name};
