//! Hex-grid population field viewer.
//!
//! Renders a square field of hexagonal cells as a single instanced draw
//! through [`gridgl`], with per-cell color and scale derived from
//! population data, and resolves camera picks back to cells.

pub mod engine;
pub mod field;
pub mod hexgrid;
pub mod source;

pub use engine::{cell_color, cell_scale, hex_program_spec, FieldEngine, PickResult, HEX_SHADERS};
pub use field::{AdvanceStats, FieldError, FieldGrid, FieldSource, HexCell};
pub use hexgrid::AxialHex;
pub use source::LocalFieldSource;
