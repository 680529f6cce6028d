//! Offset hex-grid geometry: the axial-to-world forward mapping and the
//! nearest-cell pick.

use glam::Vec2;

/// World-space distance between hexagon columns.
pub const COLUMN_SPACING: f32 = 1.5;
/// World-space distance between hexagon rows.
pub const ROW_SPACING: f32 = 0.433;
/// Horizontal shift applied to odd rows.
pub const ODD_ROW_OFFSET: f32 = 0.75;

/// Axial coordinates of a cell, origin-centered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxialHex {
    pub col: i32,
    pub row: i32,
}

impl AxialHex {
    pub const fn new(col: i32, row: i32) -> Self {
        Self { col, row }
    }
}

/// World-space center of a cell. Odd rows (by absolute value) are shifted
/// right by half a column.
pub fn cell_center(cell: AxialHex) -> Vec2 {
    let mut x = COLUMN_SPACING * cell.col as f32;
    if cell.row.abs() % 2 == 1 {
        x += ODD_ROW_OFFSET;
    }
    Vec2::new(x, ROW_SPACING * cell.row as f32)
}

/// The cell whose center is nearest to a world-space point.
///
/// The point's row band picks a 2x2 candidate window; candidates are
/// evaluated in a fixed order with a strict less-than against the running
/// minimum, so an exact tie resolves to the earliest candidate.
pub fn nearest_cell(point: Vec2) -> AxialHex {
    let iy = (point.y / ROW_SPACING).floor() as i32;
    let corrected_x = if iy.abs() % 2 == 1 {
        point.x - ODD_ROW_OFFSET
    } else {
        point.x
    };
    let ix = (corrected_x / COLUMN_SPACING).floor() as i32;

    let candidates = [
        AxialHex::new(ix, iy),
        AxialHex::new(ix + 1, iy),
        AxialHex::new(ix, iy + 1),
        AxialHex::new(ix + 1, iy + 1),
    ];

    let mut best = candidates[0];
    let mut best_d = f32::INFINITY;
    for candidate in candidates {
        let d = cell_center(candidate).distance_squared(point);
        if d < best_d {
            best = candidate;
            best_d = d;
        }
    }
    best
}

/// Linear storage index of a cell in a `size * size` origin-centered field:
/// `(col + size/2) * size + (row + size/2)`.
///
/// `None` when the cell lies outside the field.
pub fn linear_index(cell: AxialHex, size: usize) -> Option<usize> {
    let half = (size / 2) as i32;
    let major = cell.col + half;
    let minor = cell.row + half;
    if major < 0 || major >= size as i32 || minor < 0 || minor >= size as i32 {
        return None;
    }
    Some(major as usize * size + minor as usize)
}

/// Decomposes a linear index back into the 2D storage coordinates
/// (`index / size`, `index % size`).
pub fn storage_coords(index: usize, size: usize) -> (usize, usize) {
    (index / size, index % size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_resolves_to_origin_cell() {
        assert_eq!(nearest_cell(Vec2::ZERO), AxialHex::new(0, 0));
    }

    #[test]
    fn points_near_a_center_resolve_to_that_cell() {
        for cell in [
            AxialHex::new(0, 0),
            AxialHex::new(2, 1),
            AxialHex::new(-1, 3),
            AxialHex::new(1, -2),
            AxialHex::new(-3, -3),
        ] {
            let p = cell_center(cell) + Vec2::new(0.05, -0.04);
            assert_eq!(nearest_cell(p), cell, "around {cell:?}");
        }
    }

    #[test]
    fn exact_ties_resolve_to_the_first_candidate() {
        // Midpoint between (0,0) and (1,0): both centers are 0.75 away.
        let midpoint = Vec2::new(COLUMN_SPACING / 2.0, 0.0);
        assert_eq!(nearest_cell(midpoint), AxialHex::new(0, 0));
    }

    #[test]
    fn odd_rows_are_offset() {
        assert_eq!(
            cell_center(AxialHex::new(0, 1)),
            Vec2::new(ODD_ROW_OFFSET, ROW_SPACING)
        );
        // Row parity is taken on the absolute value.
        assert_eq!(
            cell_center(AxialHex::new(0, -1)),
            Vec2::new(ODD_ROW_OFFSET, -ROW_SPACING)
        );
        assert_eq!(cell_center(AxialHex::new(2, 0)), Vec2::new(3.0, 0.0));
    }

    #[test]
    fn linear_index_is_bounds_checked() {
        assert_eq!(linear_index(AxialHex::new(0, 0), 4), Some(2 * 4 + 2));
        assert_eq!(linear_index(AxialHex::new(-2, -2), 4), Some(0));
        assert_eq!(linear_index(AxialHex::new(1, 1), 4), Some(3 * 4 + 3));
        assert_eq!(linear_index(AxialHex::new(2, 0), 4), None);
        assert_eq!(linear_index(AxialHex::new(0, -3), 4), None);
    }

    #[test]
    fn storage_coords_invert_linear_index() {
        let size = 6;
        let idx = linear_index(AxialHex::new(1, -2), size).unwrap();
        let (major, minor) = storage_coords(idx, size);
        assert_eq!((major, minor), (4, 1));
        assert_eq!(major * size + minor, idx);
    }
}
