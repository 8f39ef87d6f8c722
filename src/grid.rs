//! The occupancy grid: a square, row-major array of one-byte cells, each
//! either `OCCUPIED` or not.  Counting and halving run on scoped host
//! threads, each owning a band of rows.

use crossbeam;
use crossbeam::thread::ScopedJoinHandle;
use image;
use image::pnm::PNMEncoder;
use image::pnm::{PNMSubtype, SampleEncoding};
use image::ColorType;
use itertools::iproduct;
use std::fs::File;
use std::path::Path;

use error::{Error, Result};

/// Value of a cell the kernel marked as part of the set.
pub const OCCUPIED: u8 = 1;

/// Value of every other cell.
pub const EMPTY: u8 = 0;

/// A `resolution` by `resolution` grid of occupancy flags.
#[derive(Clone, Debug, PartialEq)]
pub struct OccupancyGrid {
    resolution: usize,
    cells: Vec<u8>,
}

/// Rows per band when splitting `rows` rows over `threads` workers.
fn rows_per_band(rows: usize, threads: usize) -> usize {
    let threads = threads.max(1);
    ((rows + threads - 1) / threads).max(1)
}

impl OccupancyGrid {
    /// An empty grid.
    pub fn new(resolution: usize) -> OccupancyGrid {
        OccupancyGrid {
            resolution,
            cells: vec![EMPTY; resolution * resolution],
        }
    }

    /// Wraps a buffer read back from the device.
    pub fn from_cells(resolution: usize, cells: Vec<u8>) -> Result<OccupancyGrid> {
        let expected = resolution * resolution;
        if cells.len() != expected {
            return Err(Error::GridSize {
                resolution,
                expected,
                actual: cells.len(),
            });
        }
        Ok(OccupancyGrid { resolution, cells })
    }

    /// Builds a grid by asking `occupied(row, column)` for every cell.
    pub fn from_fn<F>(resolution: usize, mut occupied: F) -> OccupancyGrid
    where
        F: FnMut(usize, usize) -> bool,
    {
        let cells = iproduct!(0..resolution, 0..resolution)
            .map(|(row, column)| if occupied(row, column) { OCCUPIED } else { EMPTY })
            .collect();
        OccupancyGrid { resolution, cells }
    }

    /// Edge length of the grid.
    pub fn resolution(&self) -> usize {
        self.resolution
    }

    /// The raw cells, row-major.
    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    /// Whether the cell at `row`, `column` is occupied.  Out-of-range
    /// coordinates are not.
    pub fn is_occupied(&self, row: usize, column: usize) -> bool {
        row < self.resolution
            && column < self.resolution
            && self.cells[row * self.resolution + column] == OCCUPIED
    }

    /// Marks a cell as occupied.
    ///
    /// # Panics
    ///
    /// Panics if `row` or `column` is not below the resolution.
    pub fn set(&mut self, row: usize, column: usize) {
        assert!(row < self.resolution && column < self.resolution);
        self.cells[row * self.resolution + column] = OCCUPIED;
    }

    /// Number of occupied cells.  Each worker counts its own band of rows.
    pub fn count(&self, threads: usize) -> Result<usize> {
        let band = rows_per_band(self.resolution, threads) * self.resolution.max(1);
        crossbeam::scope(|spawner| {
            let handles: Vec<ScopedJoinHandle<usize>> = self
                .cells
                .chunks(band)
                .map(|cells| {
                    spawner.spawn(move |_| cells.iter().filter(|&&cell| cell == OCCUPIED).count())
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join())
                .sum::<::std::thread::Result<usize>>()
        })
        .and_then(|counted| counted)
        .map_err(|_| Error::Worker)
    }

    /// Halves the resolution.  A coarse cell is occupied when any of the
    /// four fine cells it covers is.
    pub fn scaledown(&self, threads: usize) -> Result<OccupancyGrid> {
        let fine = self.resolution;
        if fine < 2 || fine % 2 != 0 {
            return Err(Error::OddResolution(fine));
        }
        let coarse = fine / 2;
        let mut cells = vec![EMPTY; coarse * coarse];
        let rows = rows_per_band(coarse, threads);
        let source = &self.cells;

        crossbeam::scope(|spawner| {
            for (band_index, band) in cells.chunks_mut(rows * coarse).enumerate() {
                spawner.spawn(move |_| {
                    let first_row = band_index * rows;
                    for (offset, cell) in band.iter_mut().enumerate() {
                        let row = first_row + offset / coarse;
                        let column = offset % coarse;
                        let top = 2 * row * fine + 2 * column;
                        let bottom = top + fine;
                        if source[top] == OCCUPIED
                            || source[top + 1] == OCCUPIED
                            || source[bottom] == OCCUPIED
                            || source[bottom + 1] == OCCUPIED
                        {
                            *cell = OCCUPIED;
                        }
                    }
                });
            }
        })
        .map_err(|_| Error::Worker)?;

        Ok(OccupancyGrid {
            resolution: coarse,
            cells,
        })
    }

    /// A text picture of the grid: `#` for occupied cells, a blank for
    /// the rest, every cell followed by a space.
    pub fn render_ascii(&self) -> String {
        let mut out = String::with_capacity(self.cells.len() * 2 + self.resolution);
        for row in self.cells.chunks(self.resolution.max(1)) {
            for &cell in row {
                out.push(if cell == OCCUPIED { '#' } else { ' ' });
                out.push(' ');
            }
            out.push('\n');
        }
        out
    }

    /// Writes the grid as a binary 8-bit PGM, occupied cells white.
    pub fn write_pgm<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let output = File::create(path)?;
        let mut encoder =
            PNMEncoder::new(output).with_subtype(PNMSubtype::Graymap(SampleEncoding::Binary));
        let pixels: Vec<u8> = self
            .cells
            .iter()
            .map(|&cell| if cell == OCCUPIED { 255 } else { 0 })
            .collect();
        encoder.encode(
            &pixels[..],
            self.resolution as u32,
            self.resolution as u32,
            ColorType::Gray(8),
        )?;
        Ok(())
    }

    /// Loads a grid from any square image.  Pixels brighter than half
    /// intensity are occupied.
    pub fn read_image<P: AsRef<Path>>(path: P) -> Result<OccupancyGrid> {
        let luma = image::open(path)?.to_luma();
        let (width, height) = luma.dimensions();
        if width != height {
            return Err(Error::NotSquare { width, height });
        }
        let cells = luma
            .into_raw()
            .into_iter()
            .map(|value| if value > 127 { OCCUPIED } else { EMPTY })
            .collect();
        OccupancyGrid::from_cells(width as usize, cells)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand::rngs::StdRng;
    use tempfile::tempdir;

    #[test]
    fn from_cells_checks_length() {
        assert!(OccupancyGrid::from_cells(4, vec![0; 16]).is_ok());
        match OccupancyGrid::from_cells(4, vec![0; 15]) {
            Err(Error::GridSize { expected, actual, .. }) => {
                assert_eq!(expected, 16);
                assert_eq!(actual, 15);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn count_ignores_values_other_than_one() {
        let grid = OccupancyGrid::from_cells(2, vec![1, 2, 255, 1]).unwrap();
        assert_eq!(grid.count(1).unwrap(), 2);
    }

    #[test]
    fn count_is_independent_of_thread_count() {
        let mut rng = StdRng::seed_from_u64(7);
        let cells: Vec<u8> = (0..37 * 37).map(|_| if rng.gen::<bool>() { 1 } else { 0 }).collect();
        let grid = OccupancyGrid::from_cells(37, cells.clone()).unwrap();
        let expected = cells.iter().filter(|&&c| c == OCCUPIED).count();
        for threads in 0..10 {
            assert_eq!(grid.count(threads).unwrap(), expected);
        }
    }

    #[test]
    fn scaledown_ors_two_by_two_blocks() {
        let mut grid = OccupancyGrid::new(4);
        grid.set(0, 1);
        grid.set(3, 3);
        let half = grid.scaledown(1).unwrap();
        assert_eq!(half.resolution(), 2);
        assert_eq!(half.cells(), &[1, 0, 0, 1]);
        let quarter = half.scaledown(3).unwrap();
        assert_eq!(quarter.cells(), &[1]);
    }

    #[test]
    fn scaledown_matches_across_thread_counts() {
        let mut rng = StdRng::seed_from_u64(11);
        let grid = OccupancyGrid::from_fn(64, |_, _| rng.gen::<f64>() < 0.05);
        let single = grid.scaledown(1).unwrap();
        for threads in 2..9 {
            assert_eq!(grid.scaledown(threads).unwrap(), single);
        }
        for row in 0..32 {
            for column in 0..32 {
                let any = grid.is_occupied(2 * row, 2 * column)
                    || grid.is_occupied(2 * row + 1, 2 * column)
                    || grid.is_occupied(2 * row, 2 * column + 1)
                    || grid.is_occupied(2 * row + 1, 2 * column + 1);
                assert_eq!(single.is_occupied(row, column), any);
            }
        }
    }

    #[test]
    #[should_panic]
    fn set_outside_the_grid_panics() {
        OccupancyGrid::new(4).set(4, 0);
    }

    #[test]
    fn scaledown_rejects_odd_grids() {
        assert!(OccupancyGrid::new(3).scaledown(1).is_err());
        assert!(OccupancyGrid::new(1).scaledown(1).is_err());
    }

    #[test]
    fn renders_hashes() {
        let grid = OccupancyGrid::from_fn(2, |row, column| row == column);
        assert_eq!(grid.render_ascii(), "#   \n  # \n");
    }

    #[test]
    fn pgm_survives_a_trip_to_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("grid.pgm");
        let grid = OccupancyGrid::from_fn(8, |row, column| (row + column) % 3 == 0);
        grid.write_pgm(&path).unwrap();
        assert_eq!(OccupancyGrid::read_image(&path).unwrap(), grid);
    }

    fn write_gray(path: &Path, width: u32, height: u32, pixels: &[u8]) {
        let output = File::create(path).unwrap();
        PNMEncoder::new(output)
            .with_subtype(PNMSubtype::Graymap(SampleEncoding::Binary))
            .encode(pixels, width, height, ColorType::Gray(8))
            .unwrap();
    }

    #[test]
    fn read_image_rejects_non_square_images() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wide.pgm");
        write_gray(&path, 4, 3, &[0; 12]);
        match OccupancyGrid::read_image(&path) {
            Err(Error::NotSquare { width, height }) => {
                assert_eq!(width, 4);
                assert_eq!(height, 3);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn read_image_splits_at_half_intensity() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gray.pgm");
        write_gray(&path, 2, 2, &[0, 127, 128, 255]);
        let grid = OccupancyGrid::read_image(&path).unwrap();
        assert_eq!(grid.cells(), &[EMPTY, EMPTY, OCCUPIED, OCCUPIED]);
    }
}
