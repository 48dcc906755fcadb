mod btree;
mod cursor;
mod layout;
mod pager;
mod row;
pub mod table;

pub use row::{Row, EMAIL_MAX_LEN, ROW_SIZE, USERNAME_MAX_LEN};
pub use table::Table;
