//! Parameters of one box-counting sweep.
//!
//! The defaults reproduce the classic run: a 16384x16384 grid (2^10
//! pixels per tile edge, 16 pseudo tiles across), a viewport six units
//! wide centred on the origin, 1000 iterations of the map per cell, and
//! ten halvings of the grid.

use num::Complex;

use error::{Error, Result};

/// Base two logarithm of the tile edge.
pub const LOG2_RESOLUTION: u32 = 10;

/// Number of tiles along each edge of the full grid.
pub const PSEUDO_TILES: usize = 16;

/// Edge length of the full-resolution grid.
pub const DEFAULT_RESOLUTION: usize = (1 << LOG2_RESOLUTION) * PSEUDO_TILES;

/// Number of resolutions that are counted.
pub const DEFAULT_LEVELS: usize = LOG2_RESOLUTION as usize;

/// Width of the viewport in map units.
pub const DEFAULT_SCALE: f64 = 6.0;

/// Iterations of the map per cell.
pub const DEFAULT_ITERATIONS: u32 = 1000;

/// Everything the kernel and the box-counting loop need to know.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SweepConfig {
    /// Edge length of the full-resolution grid.
    pub resolution: usize,
    /// How many resolutions to count, starting at `resolution` and
    /// halving each time.
    pub levels: usize,
    /// Iterations of the map per cell.
    pub iterations: u32,
    /// Width of the viewport in map units.
    pub scale: f64,
    /// Centre of the viewport.
    pub center: Complex<f64>,
}

impl Default for SweepConfig {
    fn default() -> SweepConfig {
        SweepConfig {
            resolution: DEFAULT_RESOLUTION,
            levels: DEFAULT_LEVELS,
            iterations: DEFAULT_ITERATIONS,
            scale: DEFAULT_SCALE,
            center: Complex::new(0.0, 0.0),
        }
    }
}

impl SweepConfig {
    /// Checks that every counted level is an exact halving of the one
    /// before it, and that the values fit the kernel's argument types.
    pub fn validate(&self) -> Result<()> {
        if self.resolution == 0 {
            return Err(Error::Config("resolution must be positive".to_string()));
        }
        if self.resolution > i32::MAX as usize {
            return Err(Error::Config(format!(
                "resolution {} does not fit a kernel int",
                self.resolution
            )));
        }
        if self.resolution.checked_mul(self.resolution).is_none() {
            return Err(Error::Config(format!(
                "a grid of resolution {} does not fit in memory",
                self.resolution
            )));
        }
        if self.levels == 0 {
            return Err(Error::Config("at least one level must be counted".to_string()));
        }
        if self.levels > max_levels(self.resolution) {
            return Err(Error::Config(format!(
                "resolution {} cannot be halved {} times",
                self.resolution,
                self.levels - 1
            )));
        }
        if self.iterations == 0 || self.iterations > i32::MAX as u32 {
            return Err(Error::Config(format!(
                "iteration count {} is out of range",
                self.iterations
            )));
        }
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(Error::Config(format!("scale {} must be positive", self.scale)));
        }
        if !self.center.re.is_finite() || !self.center.im.is_finite() {
            return Err(Error::Config("viewport centre must be finite".to_string()));
        }
        Ok(())
    }

    /// The resolutions that get counted, finest first.
    pub fn resolutions(&self) -> Vec<usize> {
        (0..self.levels).map(|level| self.resolution >> level).collect()
    }

    /// Boxes per unit length at the given resolution.
    pub fn boxes_per_unit(&self, resolution: usize) -> f64 {
        resolution as f64 / self.scale
    }
}

/// The number of levels a grid of this resolution supports: one for the
/// grid itself plus one for each exact halving.
pub fn max_levels(resolution: usize) -> usize {
    if resolution == 0 {
        0
    } else {
        resolution.trailing_zeros() as usize + 1
    }
}
