//! File-backed, fixed-slot page cache.
//!
//! A `Pager` exclusively owns the file descriptor and a fixed array of up
//! to [`TABLE_MAX_PAGES`] page slots. `get_page` is read-through: a cache
//! miss either reads the page from disk or zero-initializes it in RAM, and
//! every loaded page is flushed back to disk at [`Pager::close`]. There is
//! no per-page dirty flag — the whole cache is flushed unconditionally,
//! which is correct only because the engine is single-threaded and
//! non-transactional (spec.md §4.3).

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use heapless::Vec as HVec;
use tracing::{debug, trace};

use crate::errors::Error;
use crate::fatal;

use super::layout::{Page, PAGE_SIZE, TABLE_MAX_PAGES};

pub struct Pager {
    file: File,
    /// `slots[n]` is `Some(page)` once page `n` has been loaded into RAM.
    slots: HVec<Option<Box<Page>>, TABLE_MAX_PAGES>,
    /// Number of pages the pager knows about (on disk or freshly allocated).
    /// New pages are always appended at `num_pages`; there is no recycling.
    num_pages: u32,
}

impl Pager {
    /// Opens (creating if absent) the database file at `path`.
    ///
    /// Fails fatally if the file length is not a whole multiple of
    /// [`PAGE_SIZE`] (spec.md §3 invariant 1).
    pub fn open(path: impl AsRef<Path>) -> Result<Pager, Error> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;

        let file_length = file.seek(SeekFrom::End(0))?;
        if file_length % PAGE_SIZE as u64 != 0 {
            return Err(Error::Corrupt(format!(
                "file length {file_length} is not a multiple of the {PAGE_SIZE}-byte page size"
            )));
        }
        let num_pages = (file_length / PAGE_SIZE as u64) as u32;

        let mut slots = HVec::new();
        slots.resize(TABLE_MAX_PAGES, None).ok();

        debug!(num_pages, "opened pager");
        Ok(Pager {
            file,
            slots,
            num_pages,
        })
    }

    pub fn num_pages(&self) -> u32 {
        self.num_pages
    }

    /// Returns the next page number `get_unused_page_num` would hand out.
    /// There is no free list; deletions are not supported (spec.md §9).
    pub fn unused_page_num(&self) -> u32 {
        self.num_pages
    }

    /// Returns a mutable reference to page `n`, loading it from disk (or
    /// zero-initializing it) on a cache miss.
    pub fn get_page(&mut self, n: u32) -> Result<&mut Page, Error> {
        if n as usize >= TABLE_MAX_PAGES {
            fatal!("page number {n} exceeds TABLE_MAX_PAGES ({TABLE_MAX_PAGES})");
        }

        if self.slots[n as usize].is_none() {
            let mut buf = Box::new([0u8; PAGE_SIZE]);
            if n < self.num_pages {
                self.file.seek(SeekFrom::Start(n as u64 * PAGE_SIZE as u64))?;
                // A short read at EOF leaves the remainder of `buf` zeroed,
                // matching spec.md §4.3's "EOF short reads permitted".
                let mut read_so_far = 0;
                loop {
                    let n_read = self.file.read(&mut buf[read_so_far..])?;
                    if n_read == 0 {
                        break;
                    }
                    read_so_far += n_read;
                }
                trace!(page = n, bytes = read_so_far, "read page from disk");
            }
            self.slots[n as usize] = Some(buf);
            if n >= self.num_pages {
                self.num_pages = n + 1;
            }
        }

        Ok(self.slots[n as usize].as_mut().unwrap())
    }

    /// Writes page `n`'s cached buffer back to disk.
    pub fn flush(&mut self, n: u32) -> Result<(), Error> {
        let Some(buf) = self.slots[n as usize].as_ref() else {
            fatal!("attempted to flush a null page {n}");
        };
        self.file.seek(SeekFrom::Start(n as u64 * PAGE_SIZE as u64))?;
        self.file.write_all(buf.as_ref())?;
        Ok(())
    }

    /// Flushes every loaded page and drops the cache. Per spec.md §9,
    /// this is a single pass over `[0, num_pages)` — the source's second,
    /// no-op pass over the rest of the slot array is not reproduced.
    pub fn close(&mut self) -> Result<(), Error> {
        for n in 0..self.num_pages {
            if self.slots[n as usize].is_some() {
                self.flush(n)?;
                self.slots[n as usize] = None;
            }
        }
        self.file.flush()?;
        debug!(num_pages = self.num_pages, "closed pager");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn fresh_file_has_zero_pages() {
        let f = NamedTempFile::new().unwrap();
        let pager = Pager::open(f.path()).unwrap();
        assert_eq!(pager.num_pages(), 0);
    }

    #[test]
    fn get_page_zero_initializes_and_grows_num_pages() {
        let f = NamedTempFile::new().unwrap();
        let mut pager = Pager::open(f.path()).unwrap();
        let page = pager.get_page(0).unwrap();
        assert_eq!(page.iter().all(|&b| b == 0), true);
        assert_eq!(pager.num_pages(), 1);
    }

    #[test]
    fn flush_then_reopen_round_trips_bytes() {
        let f = NamedTempFile::new().unwrap();
        {
            let mut pager = Pager::open(f.path()).unwrap();
            let page = pager.get_page(0).unwrap();
            page[10] = 0xAB;
            pager.close().unwrap();
        }

        let mut pager = Pager::open(f.path()).unwrap();
        assert_eq!(pager.num_pages(), 1);
        let page = pager.get_page(0).unwrap();
        assert_eq!(page[10], 0xAB);
    }

    #[test]
    fn rejects_file_length_not_a_page_multiple() {
        use std::io::Write as _;
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(&[0u8; 100]).unwrap();
        f.flush().unwrap();
        match Pager::open(f.path()) {
            Err(Error::Corrupt(_)) => {}
            other => panic!("expected Error::Corrupt, got {other:?}"),
        }
    }

    #[test]
    fn file_length_is_page_aligned_after_close() {
        let f = NamedTempFile::new().unwrap();
        let mut pager = Pager::open(f.path()).unwrap();
        pager.get_page(0).unwrap();
        pager.get_page(2).unwrap();
        pager.close().unwrap();

        let len = std::fs::metadata(f.path()).unwrap().len();
        assert_eq!(len % PAGE_SIZE as u64, 0);
        assert_eq!(len, 3 * PAGE_SIZE as u64);
    }
}
