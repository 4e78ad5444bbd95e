//! Auxiliary per-cell status lanes used by 4002-style RAM.

/// Number of status characters attached to each addressable cell.
pub const STATUS_CHARACTERS: usize = 4;

/// Status storage indexed by `[cell offset][status index]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusStore {
    cells: Vec<[u8; STATUS_CHARACTERS]>,
}

impl StatusStore {
    /// Allocates zeroed status lanes for `cells` cells.
    #[must_use]
    pub fn new(cells: usize) -> Self {
        Self {
            cells: vec![[0; STATUS_CHARACTERS]; cells],
        }
    }

    /// Number of cells carrying status lanes.
    #[must_use]
    pub fn cells(&self) -> usize {
        self.cells.len()
    }

    /// Reads one lane, or `None` when either index is out of range.
    #[must_use]
    pub fn get(&self, offset: usize, index: u8) -> Option<u8> {
        self.cells
            .get(offset)
            .and_then(|lanes| lanes.get(usize::from(index)))
            .copied()
    }

    /// Writes one lane. Returns false when either index is out of range.
    pub fn set(&mut self, offset: usize, index: u8, value: u8) -> bool {
        match self
            .cells
            .get_mut(offset)
            .and_then(|lanes| lanes.get_mut(usize::from(index)))
        {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }
}
