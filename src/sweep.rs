//! The box-counting loop: count the occupied cells, halve the grid, and
//! repeat, recording one `Measurement` per resolution.

use backend::Backend;
use config::SweepConfig;
use error::Result;
use grid::OccupancyGrid;

/// One row of the output table.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Measurement {
    /// Viewport width the grid was computed for (`S`).
    pub scale: f64,
    /// Iterations of the map per cell (`k`).
    pub iterations: u32,
    /// Grid edge length at this level (`B`).
    pub resolution: usize,
    /// Boxes per unit length, `resolution / scale` (`r`).
    pub boxes_per_unit: f64,
    /// Occupied boxes (`N`).
    pub count: usize,
}

impl Measurement {
    /// A measurement of a grid of `resolution` made under `config`.
    pub fn new(config: &SweepConfig, resolution: usize, count: usize) -> Measurement {
        Measurement {
            scale: config.scale,
            iterations: config.iterations,
            resolution,
            boxes_per_unit: config.boxes_per_unit(resolution),
            count,
        }
    }

    /// `log10(r)`.
    pub fn log_r(&self) -> f64 {
        self.boxes_per_unit.log10()
    }

    /// `log10(N)`; negative infinity for an empty grid.
    pub fn log_n(&self) -> f64 {
        (self.count as f64).log10()
    }
}

/// Counts `grid` once without coarsening it.
pub fn single(grid: &OccupancyGrid, config: &SweepConfig, threads: usize) -> Result<Measurement> {
    let count = grid.count(threads)?;
    Ok(Measurement::new(config, grid.resolution(), count))
}

/// Runs all `config.levels` levels starting from `grid`, handing each
/// measurement to `record` as soon as it exists.  The grid is not halved
/// after the last level.
pub fn box_count<B, F>(
    backend: &mut B,
    grid: OccupancyGrid,
    config: &SweepConfig,
    threads: usize,
    mut record: F,
) -> Result<Vec<Measurement>>
where
    B: Backend + ?Sized,
    F: FnMut(&Measurement) -> Result<()>,
{
    let mut measurements = Vec::with_capacity(config.levels);
    let mut grid = grid;
    for level in 0..config.levels {
        let measurement = single(&grid, config, threads)?;
        debug!(
            "level {}: {} of {} boxes occupied",
            level,
            measurement.count,
            grid.resolution() * grid.resolution()
        );
        record(&measurement)?;
        measurements.push(measurement);

        if level + 1 < config.levels {
            info!(
                "Scaledown from {} to {}",
                grid.resolution(),
                grid.resolution() / 2
            );
            grid = backend.scaledown(&grid)?;
        }
    }
    Ok(measurements)
}
