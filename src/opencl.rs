//! The OpenCL backend.  Compiles the external kernel source for one GPU
//! and runs its two kernels:
//!
//! ```text
//! __kernel void schlieren(__global uchar* out, double scale, long res,
//!                         int iter, double vx, double vy);
//! __kernel void scaledown(__global uchar* old, __global uchar* new, int oldres);
//! ```
//!
//! `schlieren` runs over `res * res` work items and `scaledown` over
//! `(oldres / 2)^2`.  Every dispatch is followed by a blocking finish.

use ocl::enums::{DeviceInfo, DeviceInfoResult};
use ocl::flags::{DeviceType, MemFlags};
use ocl::{Buffer, Context, Device, Kernel, Platform, Program, Queue};
use std::fmt::Display;

use backend::Backend;
use config::SweepConfig;
use error::{Error, Result};
use grid::OccupancyGrid;
use select::DeviceSummary;

const SCHLIEREN_KERNEL: &str = "schlieren";
const SCALEDOWN_KERNEL: &str = "scaledown";

fn ocl_error<E: Display>(err: E) -> Error {
    Error::Ocl(err.to_string())
}

/// The default platform and its GPUs.  `OCL_DEFAULT_PLATFORM_IDX` picks
/// a platform other than the first.
pub fn gpu_devices() -> Result<(Platform, Vec<Device>)> {
    if Platform::list().is_empty() {
        return Err(Error::NoPlatform);
    }
    let platform = Platform::new(::ocl::core::default_platform().map_err(ocl_error)?);
    info!("OpenCL version: {}", platform.version().map_err(ocl_error)?);
    let devices = Device::list(platform, Some(DeviceType::GPU)).map_err(ocl_error)?;
    if devices.is_empty() {
        return Err(Error::NoDevice);
    }
    Ok((platform, devices))
}

fn info(device: &Device, what: DeviceInfo) -> Result<DeviceInfoResult> {
    device.info(what).map_err(ocl_error)
}

fn unexpected(what: DeviceInfo, got: &DeviceInfoResult) -> Error {
    Error::Ocl(format!("unexpected answer to {:?}: {:?}", what, got))
}

fn info_u32(device: &Device, what: DeviceInfo) -> Result<u32> {
    match info(device, what)? {
        DeviceInfoResult::MaxComputeUnits(v) | DeviceInfoResult::MaxClockFrequency(v) => Ok(v),
        other => Err(unexpected(what, &other)),
    }
}

fn info_u64(device: &Device, what: DeviceInfo) -> Result<u64> {
    match info(device, what)? {
        DeviceInfoResult::GlobalMemSize(v)
        | DeviceInfoResult::MaxMemAllocSize(v)
        | DeviceInfoResult::LocalMemSize(v) => Ok(v),
        other => Err(unexpected(what, &other)),
    }
}

/// Collects what is printed about a device.
pub fn summarize(index: usize, device: &Device) -> Result<DeviceSummary> {
    let kind = match info(device, DeviceInfo::Type)? {
        DeviceInfoResult::Type(t) => format!("{:?}", t),
        other => return Err(unexpected(DeviceInfo::Type, &other)),
    };
    let available = match info(device, DeviceInfo::Available)? {
        DeviceInfoResult::Available(a) => a,
        other => return Err(unexpected(DeviceInfo::Available, &other)),
    };
    Ok(DeviceSummary {
        index,
        name: device.name().map_err(ocl_error)?,
        kind,
        vendor: device.vendor().map_err(ocl_error)?,
        compute_units: info_u32(device, DeviceInfo::MaxComputeUnits)?,
        global_memory: info_u64(device, DeviceInfo::GlobalMemSize)?,
        max_clock: info_u32(device, DeviceInfo::MaxClockFrequency)?,
        max_allocation: info_u64(device, DeviceInfo::MaxMemAllocSize)?,
        local_memory: info_u64(device, DeviceInfo::LocalMemSize)?,
        available,
    })
}

/// A compiled kernel program with its context and queue.
pub struct OpenClBackend {
    device: Device,
    program: Program,
    queue: Queue,
}

impl OpenClBackend {
    /// Builds `source` for `device`.  A compile failure comes back as
    /// `Error::Build` carrying the build log.
    pub fn new(platform: Platform, device: Device, source: &str) -> Result<OpenClBackend> {
        let context = Context::builder()
            .platform(platform)
            .devices(device)
            .build()
            .map_err(ocl_error)?;
        let program = Program::builder()
            .devices(device)
            .src(source)
            .build(&context)
            .map_err(|err| Error::Build(err.to_string()))?;
        let queue = Queue::new(&context, device, None).map_err(ocl_error)?;
        Ok(OpenClBackend {
            device,
            program,
            queue,
        })
    }

    fn buffer(&self, len: usize) -> Result<Buffer<u8>> {
        Buffer::<u8>::builder()
            .queue(self.queue.clone())
            .flags(MemFlags::new().read_write())
            .len(len)
            .build()
            .map_err(ocl_error)
    }
}

impl Backend for OpenClBackend {
    fn name(&self) -> String {
        match self.device.name() {
            Ok(name) => format!("OpenCL {}", name),
            Err(_) => "OpenCL".to_string(),
        }
    }

    fn fill(&mut self, config: &SweepConfig) -> Result<OccupancyGrid> {
        let res = config.resolution;
        let cells = res * res;
        let out = self.buffer(cells)?;

        let kernel = Kernel::builder()
            .program(&self.program)
            .name(SCHLIEREN_KERNEL)
            .queue(self.queue.clone())
            .global_work_size(cells)
            .arg(&out)
            .arg(config.scale)
            .arg(res as i64)
            .arg(config.iterations as i32)
            .arg(config.center.re)
            .arg(config.center.im)
            .build()
            .map_err(ocl_error)?;

        debug!("enqueueing {} over {} work items", SCHLIEREN_KERNEL, cells);
        unsafe {
            kernel.enq().map_err(ocl_error)?;
        }
        self.queue.finish().map_err(ocl_error)?;

        let mut host = vec![0u8; cells];
        out.read(&mut host).enq().map_err(ocl_error)?;
        OccupancyGrid::from_cells(res, host)
    }

    fn scaledown(&mut self, grid: &OccupancyGrid) -> Result<OccupancyGrid> {
        let old_res = grid.resolution();
        if old_res < 2 || old_res % 2 != 0 {
            return Err(Error::OddResolution(old_res));
        }
        let new_res = old_res / 2;
        let old = self.buffer(old_res * old_res)?;
        let new = self.buffer(new_res * new_res)?;

        let kernel = Kernel::builder()
            .program(&self.program)
            .name(SCALEDOWN_KERNEL)
            .queue(self.queue.clone())
            .global_work_size(new_res * new_res)
            .arg(&old)
            .arg(&new)
            .arg(old_res as i32)
            .build()
            .map_err(ocl_error)?;

        old.write(grid.cells()).enq().map_err(ocl_error)?;
        debug!("enqueueing {} over {} work items", SCALEDOWN_KERNEL, new_res * new_res);
        unsafe {
            kernel.enq().map_err(ocl_error)?;
        }
        self.queue.finish().map_err(ocl_error)?;

        let mut host = vec![0u8; new_res * new_res];
        new.read(&mut host).enq().map_err(ocl_error)?;
        OccupancyGrid::from_cells(new_res, host)
    }
}
