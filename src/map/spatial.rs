use std::collections::HashMap;

/// Uniform grid over the map plane for point → feature lookups.
///
/// Each feature's bounding box is indexed into every cell it overlaps, so
/// a query never misses a feature but may return ones that don't contain
/// the point; callers confirm with an exact containment test.
pub struct FeatureGrid {
    cells: HashMap<(i32, i32), Vec<usize>>,
    cell_size: f64,
}

impl FeatureGrid {
    /// Build from `(min_x, min_y, max_x, max_y)` boxes; feature index is
    /// the box's position in the iterator. Non-finite boxes are not indexed.
    pub fn build(bboxes: impl Iterator<Item = (f64, f64, f64, f64)>, cell_size: f64) -> Self {
        let mut grid = Self {
            cells: HashMap::new(),
            cell_size,
        };
        for (idx, (min_x, min_y, max_x, max_y)) in bboxes.enumerate() {
            if ![min_x, min_y, max_x, max_y].iter().all(|v| v.is_finite()) {
                continue;
            }
            let min_cell = grid.to_cell(min_x, min_y);
            let max_cell = grid.to_cell(max_x, max_y);
            for y in min_cell.1..=max_cell.1 {
                for x in min_cell.0..=max_cell.0 {
                    grid.cells.entry((x, y)).or_default().push(idx);
                }
            }
        }
        grid
    }

    #[inline(always)]
    fn to_cell(&self, x: f64, y: f64) -> (i32, i32) {
        ((x / self.cell_size).floor() as i32, (y / self.cell_size).floor() as i32)
    }

    /// Features whose bounding box may cover (x, y)
    pub fn candidates(&self, x: f64, y: f64) -> &[usize] {
        if !x.is_finite() || !y.is_finite() {
            return &[];
        }
        self.cells.get(&self.to_cell(x, y)).map(Vec::as_slice).unwrap_or(&[])
    }
}
