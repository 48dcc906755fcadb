//! The engine's single fixed-schema table: open/close lifecycle, insert,
//! full scan, and the `.btree` debug dump.
//!
//! Grounded on the teacher's `storage::table::Table` (`insert_row`,
//! `select_rows`, `build_btree`) and its `create_table`/`load_table`
//! open-or-create shape, replumbed onto this crate's raw-page-format
//! pager instead of the teacher's `bincode`-framed tablespace format.

use std::path::Path;

use tracing::info;

use crate::errors::Error;

use super::btree;
use super::layout::Node;
use super::pager::Pager;
use super::row::Row;

pub struct Table {
    pub(crate) pager: Pager,
    pub(crate) root_page_num: u32,
}

impl Table {
    /// Opens `path`, creating it if absent. A brand-new file gets page 0
    /// initialized as an empty leaf root (spec.md §4.1: the root always
    /// lives at page 0).
    pub fn open(path: impl AsRef<Path>) -> Result<Table, Error> {
        let mut pager = Pager::open(path)?;

        if pager.num_pages() == 0 {
            let mut root = Node::new(pager.get_page(0)?);
            root.initialize_leaf();
            root.set_is_root(true);
        }

        info!("table opened");
        Ok(Table {
            pager,
            root_page_num: 0,
        })
    }

    /// Inserts `row`. Fails with `UserError::DuplicateKey` if `row.id`
    /// already exists (spec.md §4.2 invariant 2).
    pub fn insert(&mut self, row: Row) -> Result<(), Error> {
        btree::insert(self, row)
    }

    /// Returns every row in ascending key order (spec.md §4.5).
    pub fn select_all(&mut self) -> Result<Vec<Row>, Error> {
        let mut rows = Vec::new();
        let mut cursor = btree::start(self)?;
        while !cursor.end_of_table {
            rows.push(cursor.value(self)?);
            cursor.advance(self)?;
        }
        Ok(rows)
    }

    /// Renders the tree structure for the `.btree` meta command.
    pub fn debug_tree(&mut self) -> Result<String, Error> {
        btree::debug_tree(&mut self.pager, self.root_page_num, 0)
    }

    /// Flushes every loaded page and closes the underlying file
    /// (spec.md §4.3: unconditional flush-on-close, no dirty bit).
    pub fn close(mut self) -> Result<(), Error> {
        self.pager.close()?;
        info!("table closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn fresh_file_opens_with_an_empty_leaf_root() {
        let f = NamedTempFile::new().unwrap();
        let mut table = Table::open(f.path()).unwrap();
        assert_eq!(table.select_all().unwrap(), Vec::new());
    }

    #[test]
    fn persists_rows_across_reopen() {
        let f = NamedTempFile::new().unwrap();
        {
            let mut table = Table::open(f.path()).unwrap();
            table.insert(Row::new(1, "alice", "alice@example.com")).unwrap();
            table.insert(Row::new(2, "bob", "bob@example.com")).unwrap();
            table.close().unwrap();
        }

        let mut table = Table::open(f.path()).unwrap();
        let rows = table.select_all().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].username, "alice");
        assert_eq!(rows[1].username, "bob");
    }

    #[test]
    fn debug_tree_reports_a_single_leaf_for_a_small_table() {
        let f = NamedTempFile::new().unwrap();
        let mut table = Table::open(f.path()).unwrap();
        table.insert(Row::new(1, "a", "a@x")).unwrap();
        let tree = table.debug_tree().unwrap();
        assert!(tree.contains("leaf (size 1)"));
    }
}
