//! Row decoding: turning selected columns back into entities and scalars

mod row;

pub use row::{DynamicItem, DynamicRow, FromRow, RowReader, Slot};
