//! A local, in-process field source: a seeded synthetic population
//! simulation standing in for the remote field service.

use crate::field::{AdvanceStats, FieldError, FieldGrid, FieldSource, HexCell};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Instant;

const DEFAULT_STEPS: u32 = 1;

/// Synthetic field simulation. Deterministic for a given seed.
pub struct LocalFieldSource {
    size: usize,
    cells: Vec<Vec<HexCell>>,
    rng: StdRng,
}

impl LocalFieldSource {
    pub fn new(size: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let half = size as i32 / 2;
        let cells = (0..size)
            .map(|major| {
                (0..size)
                    .map(|minor| HexCell {
                        col: major as i32 - half,
                        row: minor as i32 - half,
                        population: rng.gen_range(0.0..1500.0),
                        population_delta: 0.0,
                    })
                    .collect()
            })
            .collect();

        Self { size, cells, rng }
    }

    /// One simulation step: every cell's population drifts by a random
    /// relative delta, which is also what the cell reports as its
    /// `population_delta`.
    fn step(&mut self) {
        for column in &mut self.cells {
            for cell in column {
                let delta = self.rng.gen_range(-0.1..0.1f32);
                cell.population = (cell.population * (1.0 + delta)).max(0.0);
                cell.population_delta = delta;
            }
        }
    }
}

impl FieldSource for LocalFieldSource {
    fn fetch_field(&mut self) -> Result<FieldGrid, FieldError> {
        let grid = FieldGrid {
            size: self.size,
            cells: self.cells.clone(),
        };
        grid.validate()?;
        Ok(grid)
    }

    fn advance_field(&mut self, steps: Option<u32>) -> Result<AdvanceStats, FieldError> {
        let steps_run = steps.unwrap_or(DEFAULT_STEPS).max(1);
        let started = Instant::now();
        for _ in 0..steps_run {
            self.step();
        }
        let total_time = started.elapsed().as_secs_f64() * 1000.0;

        Ok(AdvanceStats {
            steps_run,
            total_time,
            average_time: total_time / steps_run as f64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_reproduces_the_field() {
        let mut a = LocalFieldSource::new(8, 42);
        let mut b = LocalFieldSource::new(8, 42);
        a.advance_field(Some(3)).unwrap();
        b.advance_field(Some(3)).unwrap();
        assert_eq!(
            a.fetch_field().unwrap().cells,
            b.fetch_field().unwrap().cells
        );
    }

    #[test]
    fn fetched_grid_is_well_shaped() {
        let mut source = LocalFieldSource::new(6, 7);
        let grid = source.fetch_field().unwrap();
        assert_eq!(grid.size, 6);
        assert!(grid.validate().is_ok());
        assert_eq!(grid.cells[0][0].col, -3);
        assert_eq!(grid.cells[5][5].row, 2);
    }

    #[test]
    fn advance_reports_requested_steps() {
        let mut source = LocalFieldSource::new(4, 1);
        let stats = source.advance_field(Some(5)).unwrap();
        assert_eq!(stats.steps_run, 5);
        assert!(stats.total_time >= 0.0);

        // None falls back to the source default.
        let stats = source.advance_field(None).unwrap();
        assert_eq!(stats.steps_run, 1);
    }

    #[test]
    fn populations_never_go_negative() {
        let mut source = LocalFieldSource::new(4, 99);
        source.advance_field(Some(50)).unwrap();
        let grid = source.fetch_field().unwrap();
        assert!(grid
            .cells
            .iter()
            .flatten()
            .all(|c| c.population >= 0.0));
    }
}
