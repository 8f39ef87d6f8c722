#![deny(missing_docs)]
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Schlieren box-counting
//!
//! A Schlieren set is the set of points of the plane where an iterated
//! map neither clearly escapes nor clearly settles.  An external OpenCL
//! kernel decides that for every cell of a square grid, writing a 1 into
//! each cell that belongs to the set.
//!
//! The box-counting dimension of the set is estimated by counting the
//! occupied cells, halving the grid (a coarse cell is occupied when any
//! of the four cells under it is), and counting again.  If `N` boxes of
//! side `1/r` are needed to cover the set, then `log N` grows like
//! `D log r`, and the slope `D` of that line is the dimension.
//!
//! This crate holds the host side of that: device selection, kernel
//! launch, the counting loop, the CSV table of `(r, N)` pairs, and the
//! least-squares fit.  The kernel itself is supplied at run time.

extern crate crossbeam;
#[macro_use]
extern crate failure;
extern crate image;
extern crate itertools;
#[macro_use]
extern crate log;
extern crate num;
#[cfg(feature = "opencl")]
extern crate ocl;

#[cfg(test)]
extern crate rand;
#[cfg(test)]
extern crate tempfile;

pub mod backend;
pub mod config;
pub mod error;
pub mod fit;
pub mod grid;
#[cfg(feature = "opencl")]
pub mod opencl;
pub mod report;
pub mod select;
pub mod sweep;

pub use backend::{Backend, HostScaledown, ImageBackend};
pub use config::SweepConfig;
pub use error::{Error, Result};
pub use fit::{fit_dimension, Fit};
pub use grid::OccupancyGrid;
pub use report::{CsvMode, CsvSink};
pub use sweep::Measurement;
