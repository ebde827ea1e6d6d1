use std::cell::Cell;
use std::ops::Range;

/// A fixed-length, zero-initialized buffer of bytes.
///
/// Cells are individually mutable through a shared reference, which lets several register views
/// observe and modify the same bytes at once. The store is single-threaded: it is neither `Sync`
/// nor meant to be.
pub struct BackingStore {
    cells: Box<[Cell<u8>]>,
}

impl BackingStore {
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self {
            cells: (0..len).map(|_| Cell::new(0)).collect(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Copy the bytes in `range`
    ///
    /// # Panics
    ///
    /// Panics if the range is out of bounds.
    #[must_use]
    pub fn load(&self, range: Range<usize>) -> Vec<u8> {
        self.cells[range].iter().map(Cell::get).collect()
    }

    /// Write `bytes` starting at `offset`
    ///
    /// # Panics
    ///
    /// Panics if the bytes do not fit in the store.
    pub fn store(&self, offset: usize, bytes: &[u8]) {
        let cells = &self.cells[offset..offset + bytes.len()];
        for (cell, &byte) in cells.iter().zip(bytes) {
            cell.set(byte);
        }
    }

    /// Reset the bytes in `range` to zero
    ///
    /// # Panics
    ///
    /// Panics if the range is out of bounds.
    pub fn zero(&self, range: Range<usize>) {
        for cell in &self.cells[range] {
            cell.set(0);
        }
    }
}

impl std::fmt::Debug for BackingStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.cells.iter().map(Cell::get))
            .finish()
    }
}

impl Clone for BackingStore {
    fn clone(&self) -> Self {
        Self {
            cells: self.cells.iter().map(|c| Cell::new(c.get())).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_initialized_test() {
        let store = BackingStore::new(4);
        assert_eq!(store.len(), 4);
        assert_eq!(store.load(0..4), vec![0, 0, 0, 0]);
    }

    #[test]
    fn store_load_test() {
        let store = BackingStore::new(4);
        store.store(1, &[0xAB, 0xCD]);
        assert_eq!(store.load(0..4), vec![0, 0xAB, 0xCD, 0]);
        assert_eq!(store.load(2..3), vec![0xCD]);

        store.zero(1..2);
        assert_eq!(store.load(0..4), vec![0, 0, 0xCD, 0]);
    }

    #[test]
    fn clone_is_detached_test() {
        let store = BackingStore::new(2);
        let copy = store.clone();
        store.store(0, &[1, 2]);
        assert_eq!(copy.load(0..2), vec![0, 0]);
    }
}
