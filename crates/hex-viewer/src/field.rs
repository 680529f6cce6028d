//! The simulated field: cells, the grid payload, and the source contract.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One hexagonal cell, owned by the field source; read-only here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HexCell {
    /// Axial column, origin-centered.
    #[serde(default)]
    pub col: i32,
    /// Axial row, origin-centered.
    #[serde(default)]
    pub row: i32,
    pub population: f32,
    pub population_delta: f32,
}

/// A square field of `size * size` cells centered at the origin.
///
/// `cells` is indexed `[col_offset][row_offset]` with offsets in
/// `0..size` (axial coordinate plus `size / 2`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldGrid {
    pub size: usize,
    pub cells: Vec<Vec<HexCell>>,
}

impl FieldGrid {
    /// Parses a field payload, the JSON shape the field service serves.
    pub fn from_json(payload: &str) -> Result<Self, FieldError> {
        let grid: FieldGrid = serde_json::from_str(payload)?;
        grid.validate()?;
        Ok(grid)
    }

    pub fn cell_count(&self) -> usize {
        self.size * self.size
    }

    /// Checks the payload against its declared size.
    pub fn validate(&self) -> Result<(), FieldError> {
        if self.cells.len() != self.size {
            return Err(FieldError::Shape(format!(
                "expected {} columns, got {}",
                self.size,
                self.cells.len()
            )));
        }
        for (i, column) in self.cells.iter().enumerate() {
            if column.len() != self.size {
                return Err(FieldError::Shape(format!(
                    "column {} has {} cells, expected {}",
                    i,
                    column.len(),
                    self.size
                )));
            }
        }
        Ok(())
    }
}

/// Timing summary returned by an advance request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvanceStats {
    pub steps_run: u32,
    /// Total simulation time, milliseconds.
    pub total_time: f64,
    /// Average per-step time, milliseconds.
    pub average_time: f64,
}

/// Failures surfaced by a field source. The engine keeps rendering the last
/// successfully fetched state when one of these comes back.
#[derive(Debug, Error)]
pub enum FieldError {
    #[error("field fetch failed: {0}")]
    Fetch(String),

    #[error("field advance failed: {0}")]
    Advance(String),

    #[error("malformed field payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("field payload is inconsistent: {0}")]
    Shape(String),
}

/// The external field data source.
///
/// Requests are synchronous here; a caller wanting the original
/// issue-await-refresh shape serializes on the returned `Result`, which is
/// delivered exactly once per request. There is no cancellation.
pub trait FieldSource {
    /// The current field state.
    fn fetch_field(&mut self) -> Result<FieldGrid, FieldError>;

    /// Runs `steps` simulation steps (source-defined default when `None`).
    /// A successful advance is always followed by a `fetch_field` by the
    /// engine.
    fn advance_field(&mut self, steps: Option<u32>) -> Result<AdvanceStats, FieldError>;
}
