//! The error type shared by the library and both binaries.

use image::ImageError;
use std::io;

/// Everything that can go wrong between reading the kernel source and
/// writing the last CSV row.
#[derive(Debug, Fail)]
pub enum Error {
    /// A file could not be read or written.
    #[fail(display = "I/O error: {}", _0)]
    Io(#[cause] io::Error),

    /// The kernel source file could not be read.
    #[fail(display = "could not read kernel source {}: {}", path, cause)]
    KernelSource {
        /// Path that was tried.
        path: String,
        /// Underlying failure.
        #[cause]
        cause: io::Error,
    },

    /// A grid image could not be decoded or encoded.
    #[fail(display = "image error: {}", _0)]
    Image(#[cause] ImageError),

    /// The OpenCL runtime reported an error.
    #[fail(display = "OpenCL error: {}", _0)]
    Ocl(String),

    /// The kernel program failed to compile.  Carries the build log.
    #[fail(display = "error building kernel program: {}", _0)]
    Build(String),

    /// No OpenCL platform is installed.
    #[fail(display = "no OpenCL platform found")]
    NoPlatform,

    /// The platform has no GPU devices.
    #[fail(display = "no GPU devices found")]
    NoDevice,

    /// The requested or typed device index is not usable.
    #[fail(display = "wrong device choice: {}", _0)]
    BadDeviceChoice(String),

    /// A cell buffer does not hold `resolution * resolution` cells.
    #[fail(
        display = "grid of resolution {} needs {} cells, got {}",
        resolution, expected, actual
    )]
    GridSize {
        /// Edge length of the grid.
        resolution: usize,
        /// `resolution * resolution`.
        expected: usize,
        /// Cells actually supplied.
        actual: usize,
    },

    /// A grid image is not square.
    #[fail(display = "grid image must be square, got {}x{}", width, height)]
    NotSquare {
        /// Image width in pixels.
        width: u32,
        /// Image height in pixels.
        height: u32,
    },

    /// A grid cannot be halved any further.
    #[fail(display = "cannot scale down a grid of odd resolution {}", _0)]
    OddResolution(usize),

    /// The sweep parameters are inconsistent.
    #[fail(display = "invalid configuration: {}", _0)]
    Config(String),

    /// A CSV row could not be parsed.
    #[fail(display = "malformed CSV at line {}: {}", line, reason)]
    Csv {
        /// One-based line number.
        line: usize,
        /// What was wrong with it.
        reason: String,
    },

    /// A host worker thread panicked.
    #[fail(display = "a host worker thread panicked")]
    Worker,

    /// The requested operation was compiled out.
    #[fail(display = "unsupported: {}", _0)]
    Unsupported(String),
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<ImageError> for Error {
    fn from(err: ImageError) -> Error {
        Error::Image(err)
    }
}

/// Shorthand used throughout the crate.
pub type Result<T> = ::std::result::Result<T, Error>;
