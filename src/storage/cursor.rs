//! A position within the table's leaf chain: a page number, a cell index
//! within that page, and whether the cursor has run past the last row.
//!
//! Grounded on the teacher's `storage::cursor::Cursor`, with `advance`
//! extended to jump across leaf pages via `next_leaf` — the teacher's
//! version only ever walks cells within a single page and never chains
//! leaves (spec.md §3 invariant 5 requires the chain for an ordered
//! full-table scan).

use crate::errors::Error;

use super::layout::Node;
use super::row::Row;
use super::{row, table::Table};

#[derive(Debug, Clone, Copy)]
pub struct Cursor {
    pub page_num: u32,
    pub cell_num: u32,
    pub end_of_table: bool,
}

impl Cursor {
    /// Decodes the row the cursor currently points at.
    pub fn value(&self, table: &mut Table) -> Result<Row, Error> {
        let node = Node::new(table.pager.get_page(self.page_num)?);
        Ok(row::decode(node.leaf_value(self.cell_num)))
    }

    /// Moves to the next cell, following `next_leaf` once the current
    /// page is exhausted. Sets `end_of_table` once the last leaf (the
    /// one whose `next_leaf` is 0) has been fully consumed.
    pub fn advance(&mut self, table: &mut Table) -> Result<(), Error> {
        let node = Node::new(table.pager.get_page(self.page_num)?);
        let num_cells = node.num_cells();
        let next_leaf = node.next_leaf();

        self.cell_num += 1;
        if self.cell_num >= num_cells {
            if next_leaf == 0 {
                self.end_of_table = true;
            } else {
                self.page_num = next_leaf;
                self.cell_num = 0;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::btree;
    use tempfile::NamedTempFile;

    #[test]
    fn advance_walks_every_row_in_key_order() {
        let f = NamedTempFile::new().unwrap();
        let mut table = Table::open(f.path()).unwrap();
        for id in [5u32, 1, 3, 2, 4] {
            btree::insert(&mut table, Row::new(id, "u", "e@x")).unwrap();
        }

        let mut cursor = btree::start(&mut table).unwrap();
        let mut seen = Vec::new();
        while !cursor.end_of_table {
            seen.push(cursor.value(&mut table).unwrap().id);
            cursor.advance(&mut table).unwrap();
        }
        assert_eq!(seen, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn empty_table_starts_at_end_of_table() {
        let f = NamedTempFile::new().unwrap();
        let mut table = Table::open(f.path()).unwrap();
        let cursor = btree::start(&mut table).unwrap();
        assert!(cursor.end_of_table);
    }
}
