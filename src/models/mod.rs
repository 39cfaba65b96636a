//! Value, row and statement types shared by contexts and table queries.

pub mod page;
pub mod row;
pub mod statement;
pub mod value;

pub use page::PageList;
pub use row::{Row, from_row, to_columns};
pub use statement::Statement;
pub use value::Value;
