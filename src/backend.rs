//! Where grids come from and how they get coarsened.

use std::path::Path;

use config::SweepConfig;
use error::{Error, Result};
use grid::OccupancyGrid;

/// Something that can produce the full-resolution occupancy grid for a
/// sweep, and halve a grid.
pub trait Backend {
    /// Short human-readable description, for logs.
    fn name(&self) -> String;

    /// Produces the grid at `config.resolution`.
    fn fill(&mut self, config: &SweepConfig) -> Result<OccupancyGrid>;

    /// Halves a grid's resolution.
    fn scaledown(&mut self, grid: &OccupancyGrid) -> Result<OccupancyGrid>;
}

impl<B: Backend + ?Sized> Backend for Box<B> {
    fn name(&self) -> String {
        (**self).name()
    }

    fn fill(&mut self, config: &SweepConfig) -> Result<OccupancyGrid> {
        (**self).fill(config)
    }

    fn scaledown(&mut self, grid: &OccupancyGrid) -> Result<OccupancyGrid> {
        (**self).scaledown(grid)
    }
}

/// Serves a grid that was computed earlier and saved as an image.
pub struct ImageBackend {
    source: String,
    grid: OccupancyGrid,
    threads: usize,
}

impl ImageBackend {
    /// Loads the image at `path`.
    pub fn open<P: AsRef<Path>>(path: P, threads: usize) -> Result<ImageBackend> {
        let source = path.as_ref().display().to_string();
        let grid = OccupancyGrid::read_image(path)?;
        Ok(ImageBackend::new(source, grid, threads))
    }

    /// Wraps a grid already in memory.
    pub fn new(source: String, grid: OccupancyGrid, threads: usize) -> ImageBackend {
        ImageBackend {
            source,
            grid,
            threads,
        }
    }

    /// Edge length of the loaded grid.
    pub fn resolution(&self) -> usize {
        self.grid.resolution()
    }
}

impl Backend for ImageBackend {
    fn name(&self) -> String {
        format!("image {}", self.source)
    }

    fn fill(&mut self, config: &SweepConfig) -> Result<OccupancyGrid> {
        if config.resolution != self.grid.resolution() {
            return Err(Error::Config(format!(
                "{} has resolution {}, but {} was requested",
                self.source,
                self.grid.resolution(),
                config.resolution
            )));
        }
        Ok(self.grid.clone())
    }

    fn scaledown(&mut self, grid: &OccupancyGrid) -> Result<OccupancyGrid> {
        grid.scaledown(self.threads)
    }
}

/// Uses another backend's grid but halves it on the host.
pub struct HostScaledown<B> {
    inner: B,
    threads: usize,
}

impl<B: Backend> HostScaledown<B> {
    /// Wraps `inner`.
    pub fn new(inner: B, threads: usize) -> HostScaledown<B> {
        HostScaledown { inner, threads }
    }
}

impl<B: Backend> Backend for HostScaledown<B> {
    fn name(&self) -> String {
        format!("{} (host scaledown)", self.inner.name())
    }

    fn fill(&mut self, config: &SweepConfig) -> Result<OccupancyGrid> {
        self.inner.fill(config)
    }

    fn scaledown(&mut self, grid: &OccupancyGrid) -> Result<OccupancyGrid> {
        grid.scaledown(self.threads)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Refuses;

    impl Backend for Refuses {
        fn name(&self) -> String {
            "refuses".to_string()
        }

        fn fill(&mut self, config: &SweepConfig) -> Result<OccupancyGrid> {
            Ok(OccupancyGrid::new(config.resolution))
        }

        fn scaledown(&mut self, _grid: &OccupancyGrid) -> Result<OccupancyGrid> {
            Err(Error::Unsupported("no scaledown here".to_string()))
        }
    }

    #[test]
    fn image_backend_checks_resolution() {
        let mut backend = ImageBackend::new("mem".to_string(), OccupancyGrid::new(8), 1);
        let config = SweepConfig {
            resolution: 8,
            levels: 4,
            ..SweepConfig::default()
        };
        assert_eq!(backend.fill(&config).unwrap().resolution(), 8);
        let config = SweepConfig {
            resolution: 16,
            ..config
        };
        assert!(backend.fill(&config).is_err());
    }

    #[test]
    fn host_scaledown_replaces_the_inner_one() {
        let grid = OccupancyGrid::from_fn(4, |row, _| row == 0);
        assert!(Refuses.scaledown(&grid).is_err());
        let mut backend = HostScaledown::new(Refuses, 2);
        assert_eq!(backend.scaledown(&grid).unwrap().cells(), &[1, 1, 0, 0]);
        assert_eq!(backend.name(), "refuses (host scaledown)");
    }

    #[test]
    fn boxed_backends_delegate() {
        let mut backend: Box<dyn Backend> =
            Box::new(ImageBackend::new("mem".to_string(), OccupancyGrid::new(2), 1));
        assert_eq!(backend.name(), "image mem");
        let grid = OccupancyGrid::from_fn(2, |_, _| true);
        assert_eq!(backend.scaledown(&grid).unwrap().cells(), &[1]);
    }
}
