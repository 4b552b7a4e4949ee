use kb_page_core::EditorConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridSize {
    pub rows: usize,
    pub cols: usize,
}

/// Hover grid used to pick the size of a new table. Hovering cell `(r, c)`
/// selects an `(r + 1) x (c + 1)` table; the highlighted cells always form
/// the rectangle anchored at the top-left cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableGridPicker {
    max_rows: usize,
    max_cols: usize,
    pending: Option<GridSize>,
}

impl Default for TableGridPicker {
    fn default() -> Self {
        Self::from_config(&EditorConfig::default())
    }
}

impl TableGridPicker {
    pub fn new(max_rows: usize, max_cols: usize) -> Self {
        Self {
            max_rows: max_rows.max(1),
            max_cols: max_cols.max(1),
            pending: None,
        }
    }

    pub fn from_config(config: &EditorConfig) -> Self {
        Self::new(config.table_grid_rows, config.table_grid_cols)
    }

    pub fn max_rows(&self) -> usize {
        self.max_rows
    }

    pub fn max_cols(&self) -> usize {
        self.max_cols
    }

    /// Cells outside the grid clamp to its last row or column.
    pub fn hover(&mut self, row: usize, col: usize) -> GridSize {
        let size = GridSize {
            rows: row.min(self.max_rows - 1) + 1,
            cols: col.min(self.max_cols - 1) + 1,
        };
        self.pending = Some(size);
        size
    }

    pub fn leave(&mut self) {
        self.pending = None;
    }

    pub fn pending(&self) -> Option<GridSize> {
        self.pending
    }

    pub fn is_highlighted(&self, row: usize, col: usize) -> bool {
        self.pending
            .is_some_and(|size| row < size.rows && col < size.cols)
    }

    /// Highlighted cells in row-major order.
    pub fn highlighted_cells(&self) -> Vec<(usize, usize)> {
        let Some(size) = self.pending else {
            return Vec::new();
        };
        (0..size.rows)
            .flat_map(|row| (0..size.cols).map(move |col| (row, col)))
            .collect()
    }

    /// Takes the pending size, leaving the picker cleared.
    pub fn commit(&mut self) -> Option<GridSize> {
        self.pending.take()
    }
}
