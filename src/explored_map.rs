// Explored Region Map - Visited-space bitmap
// Coarse grid over world space; a set cell means systems may no longer spawn there

use crate::vector::{Vector2, WorldRect};

/// World units covered by one map cell
pub const DEFAULT_CELL_SIZE: f64 = 100.0;

/// World units added along an edge whenever the map has to grow
pub const DEFAULT_GROWTH_STEP: f64 = 1000.0;

/// Storage limit. Growth past it restarts the map around the requested area.
pub const MAX_MAP_CELLS: usize = 1 << 24;

/// Cell coordinates past this are not representable without saturating
const MAX_CELL_COORDINATE: f64 = 1e15;

#[derive(Debug, Clone)]
pub struct ExploredRegionMap {
    cell_size: f64,
    growth_cells: i64,
    /// Cell coordinates of the top-left cell
    origin_col: i64,
    origin_row: i64,
    cols: usize,
    rows: usize,
    cells: Vec<bool>,
}

impl ExploredRegionMap {
    /// Empty map covering at least `bounds`. Bounds past the cell budget get a
    /// single-cell map at their origin; callers check `can_cover` first.
    pub fn new(bounds: WorldRect, cell_size: f64, growth_step: f64) -> Self {
        let cell_size = if cell_size > 0.0 { cell_size } else { DEFAULT_CELL_SIZE };
        let growth_cells = ((growth_step / cell_size).ceil() as i64).max(1);

        let (origin_col, origin_row) = cell_coords(cell_size, bounds.x, bounds.y);
        let (cols, rows) = span(cell_size, &bounds)
            .filter(|&(cols, rows)| fits_budget(cols, rows))
            .unwrap_or((1, 1));

        Self {
            cell_size,
            growth_cells,
            origin_col,
            origin_row,
            cols,
            rows,
            cells: vec![false; cols * rows],
        }
    }

    /// Whether a map of exactly `rect` stays within `MAX_MAP_CELLS`
    pub fn can_cover(&self, rect: &WorldRect) -> bool {
        span(self.cell_size, rect)
            .map(|(cols, rows)| fits_budget(cols, rows))
            .unwrap_or(false)
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// World rectangle currently backed by storage
    pub fn bounds(&self) -> WorldRect {
        WorldRect::new(
            self.origin_col as f64 * self.cell_size,
            self.origin_row as f64 * self.cell_size,
            self.cols as f64 * self.cell_size,
            self.rows as f64 * self.cell_size,
        )
    }

    pub fn explored_cells(&self) -> usize {
        self.cells.iter().filter(|&&c| c).count()
    }

    /// Points outside the tracked bounds have never been explored
    pub fn is_explored(&self, point: &Vector2) -> bool {
        let (col, row) = cell_coords(self.cell_size, point.x, point.y);
        self.index(col, row).map(|i| self.cells[i]).unwrap_or(false)
    }

    /// Mark every cell touched by `rect` as explored, growing the map first if needed
    pub fn mark_explored(&mut self, rect: &WorldRect) {
        self.ensure_covers(rect);

        let (min_col, min_row) = cell_coords(self.cell_size, rect.x, rect.y);
        let (max_col, max_row) = last_cell_coords(self.cell_size, rect);
        let (end_col, end_row) = self.last_stored();
        for row in min_row.max(self.origin_row)..=max_row.min(end_row) {
            for col in min_col.max(self.origin_col)..=max_col.min(end_col) {
                if let Some(i) = self.index(col, row) {
                    self.cells[i] = true;
                }
            }
        }
    }

    /// Extend the map in growth-step increments along every edge `rect` exceeds,
    /// copying the recorded cells into the relocated storage. When the grown map
    /// would pass `MAX_MAP_CELLS` it restarts around `rect`, forgetting old cells.
    pub fn ensure_covers(&mut self, rect: &WorldRect) {
        let (grow_left, grow_up, new_cols, new_rows) = match self.growth_for(rect) {
            Growth::Covered => return,
            Growth::OverBudget => {
                self.restart_around(rect);
                return;
            }
            Growth::Grow {
                left,
                up,
                cols,
                rows,
            } => (left, up, cols, rows),
        };

        let mut cells = vec![false; new_cols * new_rows];
        for row in 0..self.rows {
            let src = row * self.cols;
            let dst = (row + grow_up) * new_cols + grow_left;
            cells[dst..dst + self.cols].copy_from_slice(&self.cells[src..src + self.cols]);
        }

        log::debug!(
            "explored map grown from {}x{} to {}x{} cells",
            self.cols,
            self.rows,
            new_cols,
            new_rows
        );

        self.origin_col -= grow_left as i64;
        self.origin_row -= grow_up as i64;
        self.cols = new_cols;
        self.rows = new_rows;
        self.cells = cells;
    }

    fn growth_for(&self, rect: &WorldRect) -> Growth {
        self.try_growth_for(rect).unwrap_or(Growth::OverBudget)
    }

    /// `None` when the grown size overflows
    fn try_growth_for(&self, rect: &WorldRect) -> Option<Growth> {
        if !in_range(self.cell_size, rect) {
            return None;
        }
        let (min_col, min_row) = cell_coords(self.cell_size, rect.x, rect.y);
        let (max_col, max_row) = last_cell_coords(self.cell_size, rect);
        let (end_col, end_row) = self.last_stored();

        let grow_left = self.steps_needed(self.origin_col.checked_sub(min_col)?)?;
        let grow_up = self.steps_needed(self.origin_row.checked_sub(min_row)?)?;
        let grow_right = self.steps_needed(max_col.checked_sub(end_col)?)?;
        let grow_down = self.steps_needed(max_row.checked_sub(end_row)?)?;

        if [grow_left, grow_up, grow_right, grow_down].iter().all(|&g| g == 0) {
            return Some(Growth::Covered);
        }

        let cols = usize::try_from(grow_left.checked_add(grow_right)?)
            .ok()?
            .checked_add(self.cols)?;
        let rows = usize::try_from(grow_up.checked_add(grow_down)?)
            .ok()?
            .checked_add(self.rows)?;
        if !fits_budget(cols, rows) {
            return Some(Growth::OverBudget);
        }
        Some(Growth::Grow {
            left: usize::try_from(grow_left).ok()?,
            up: usize::try_from(grow_up).ok()?,
            cols,
            rows,
        })
    }

    fn restart_around(&mut self, rect: &WorldRect) {
        if !self.can_cover(rect) {
            log::warn!("explored map cannot cover {:?}; left unchanged", rect);
            return;
        }
        log::warn!(
            "explored map over {} cells; restarting around ({:.0}, {:.0})",
            MAX_MAP_CELLS,
            rect.x,
            rect.y
        );
        let growth_step = self.growth_cells as f64 * self.cell_size;
        *self = Self::new(*rect, self.cell_size, growth_step);
    }

    /// Cells to add for an overshoot of `missing` cells, rounded up to whole growth
    /// steps. `None` on overflow.
    fn steps_needed(&self, missing: i64) -> Option<i64> {
        if missing <= 0 {
            return Some(0);
        }
        let steps = missing.checked_add(self.growth_cells - 1)? / self.growth_cells;
        steps.checked_mul(self.growth_cells)
    }

    fn last_stored(&self) -> (i64, i64) {
        (
            self.origin_col.saturating_add(self.cols as i64 - 1),
            self.origin_row.saturating_add(self.rows as i64 - 1),
        )
    }

    fn index(&self, col: i64, row: i64) -> Option<usize> {
        let c = col - self.origin_col;
        let r = row - self.origin_row;
        if c < 0 || r < 0 || c >= self.cols as i64 || r >= self.rows as i64 {
            return None;
        }
        Some(r as usize * self.cols + c as usize)
    }
}

enum Growth {
    Covered,
    /// New storage size and how far the origin moves
    Grow {
        left: usize,
        up: usize,
        cols: usize,
        rows: usize,
    },
    OverBudget,
}

fn fits_budget(cols: usize, rows: usize) -> bool {
    cols.checked_mul(rows)
        .map(|cells| cells <= MAX_MAP_CELLS)
        .unwrap_or(false)
}

/// Columns and rows touched by `rect`, `None` when the span overflows
fn span(cell_size: f64, rect: &WorldRect) -> Option<(usize, usize)> {
    if !in_range(cell_size, rect) {
        return None;
    }
    let (min_col, min_row) = cell_coords(cell_size, rect.x, rect.y);
    let (max_col, max_row) = last_cell_coords(cell_size, rect);
    let cols = max_col.checked_sub(min_col)?.checked_add(1)?;
    let rows = max_row.checked_sub(min_row)?.checked_add(1)?;
    Some((usize::try_from(cols).ok()?, usize::try_from(rows).ok()?))
}

fn in_range(cell_size: f64, rect: &WorldRect) -> bool {
    [rect.x, rect.y, rect.right(), rect.bottom()]
        .iter()
        .all(|v| (v / cell_size).is_finite() && (v / cell_size).abs() <= MAX_CELL_COORDINATE)
}

fn cell_coords(cell_size: f64, x: f64, y: f64) -> (i64, i64) {
    ((x / cell_size).floor() as i64, (y / cell_size).floor() as i64)
}

/// Last cell touched by a half-open rectangle
fn last_cell_coords(cell_size: f64, rect: &WorldRect) -> (i64, i64) {
    let col = ((rect.right() / cell_size).ceil() as i64)
        .saturating_sub(1)
        .max((rect.x / cell_size).floor() as i64);
    let row = ((rect.bottom() / cell_size).ceil() as i64)
        .saturating_sub(1)
        .max((rect.y / cell_size).floor() as i64);
    (col, row)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn map() -> ExploredRegionMap {
        ExploredRegionMap::new(WorldRect::new(0.0, 0.0, 1000.0, 1000.0), 100.0, 1000.0)
    }

    #[test]
    fn test_new_map_is_unexplored() {
        let m = map();
        assert_eq!(m.bounds(), WorldRect::new(0.0, 0.0, 1000.0, 1000.0));
        assert_eq!(m.explored_cells(), 0);
        assert!(!m.is_explored(&Vector2::new(500.0, 500.0)));
        assert!(!m.is_explored(&Vector2::new(-5000.0, 500.0)));
    }

    #[test]
    fn test_mark_and_query() {
        let mut m = map();
        m.mark_explored(&WorldRect::new(100.0, 100.0, 200.0, 100.0));

        assert!(m.is_explored(&Vector2::new(150.0, 150.0)));
        assert!(m.is_explored(&Vector2::new(299.0, 199.0)));
        assert!(!m.is_explored(&Vector2::new(300.0, 150.0)));
        assert!(!m.is_explored(&Vector2::new(150.0, 200.0)));
        assert_eq!(m.explored_cells(), 2);
    }

    #[test]
    fn test_growth_preserves_recorded_cells() {
        let mut m = map();
        m.mark_explored(&WorldRect::new(0.0, 0.0, 100.0, 100.0));
        m.mark_explored(&WorldRect::new(900.0, 900.0, 100.0, 100.0));

        // Past the left and bottom edges
        m.mark_explored(&WorldRect::new(-250.0, 1100.0, 100.0, 100.0));

        let bounds = m.bounds();
        assert_eq!(bounds.x, -1000.0);
        assert_eq!(bounds.y, 0.0);
        assert_eq!(bounds.width, 2000.0);
        assert_eq!(bounds.height, 2000.0);

        assert!(m.is_explored(&Vector2::new(50.0, 50.0)));
        assert!(m.is_explored(&Vector2::new(950.0, 950.0)));
        assert!(m.is_explored(&Vector2::new(-200.0, 1150.0)));
        assert!(!m.is_explored(&Vector2::new(-500.0, 500.0)));
    }

    #[test]
    fn test_growth_in_step_increments() {
        let mut m = map();
        // 1 cell past the right edge still adds a whole step
        m.ensure_covers(&WorldRect::new(950.0, 0.0, 100.0, 10.0));
        assert_eq!(m.bounds().width, 2000.0);

        // Already covered, nothing changes
        m.ensure_covers(&WorldRect::new(0.0, 0.0, 2000.0, 1000.0));
        assert_eq!(m.bounds(), WorldRect::new(0.0, 0.0, 2000.0, 1000.0));

        // Far away: several steps at once
        m.ensure_covers(&WorldRect::new(0.0, -3500.0, 10.0, 10.0));
        assert_eq!(m.bounds().y, -4000.0);
        assert_eq!(m.bounds().height, 5000.0);
    }

    #[test]
    fn test_growth_past_budget_restarts_map() {
        let mut m = map();
        m.mark_explored(&WorldRect::new(0.0, 0.0, 100.0, 100.0));

        let far = WorldRect::new(1e8, 1e8, 500.0, 500.0);
        assert!(m.can_cover(&far));
        m.mark_explored(&far);

        assert!(m.bounds().contains(&Vector2::new(1e8 + 250.0, 1e8 + 250.0)));
        assert!(m.is_explored(&Vector2::new(1e8 + 10.0, 1e8 + 10.0)));
        // Old cells are forgotten, storage stays small
        assert!(!m.is_explored(&Vector2::new(50.0, 50.0)));
        assert_eq!(m.explored_cells(), 25);
    }

    #[test]
    fn test_rect_beyond_budget_leaves_map_unchanged() {
        let mut m = map();
        let huge = WorldRect::new(0.0, 0.0, 1e9, 1e9);
        assert!(!m.can_cover(&huge));
        assert!(!m.can_cover(&WorldRect::new(f64::INFINITY, 0.0, 10.0, 10.0)));

        m.ensure_covers(&huge);
        m.mark_explored(&WorldRect::new(1e300, -1e300, 10.0, 10.0));
        assert_eq!(m.bounds(), WorldRect::new(0.0, 0.0, 1000.0, 1000.0));
        assert_eq!(m.explored_cells(), 0);
    }
}
