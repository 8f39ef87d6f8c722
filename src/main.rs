extern crate clap;
extern crate env_logger;
#[macro_use]
extern crate log;
extern crate num;
extern crate num_cpus;
extern crate schlieren;

use clap::{App, Arg, ArgMatches};
use num::Complex;
use std::fs;
use std::str::FromStr;

use schlieren::backend::{Backend, HostScaledown, ImageBackend};
use schlieren::config::{self, SweepConfig};
use schlieren::fit::fit_dimension;
use schlieren::report::{CsvMode, CsvSink};
use schlieren::{sweep, Error, OccupancyGrid, Result};

fn parse_pair<T>(s: &str, separator: char) -> Option<(T, T)>
where
    T: FromStr,
{
    match s.find(separator) {
        None => None,
        Some(index) => match (T::from_str(&s[..index]), T::from_str(&s[index + 1..])) {
            (Ok(l), Ok(r)) => Some((l, r)),
            _ => None,
        },
    }
}

fn parse_complex(s: &str) -> Option<Complex<f64>> {
    match parse_pair(s, ',') {
        Some((re, im)) => Some(Complex { re, im }),
        None => None,
    }
}

fn validate_pair<T: FromStr>(s: &str, separator: char, err: &str) -> std::result::Result<(), String> {
    match parse_pair::<T>(s, separator) {
        Some(_) => Ok(()),
        None => Err(err.to_string()),
    }
}

fn validate_range<T: FromStr + PartialOrd>(
    s: &str,
    low: T,
    high: T,
    isnotanumber_err: &str,
    isnotinrange_err: &str,
) -> std::result::Result<(), String> {
    match T::from_str(s) {
        Ok(i) => {
            if i >= low && i <= high {
                Ok(())
            } else {
                Err(isnotinrange_err.to_string())
            }
        }
        Err(_) => Err(isnotanumber_err.to_string()),
    }
}

const KERNEL: &str = "kernel";
const RESOLUTION: &str = "resolution";
const LEVELS: &str = "levels";
const ITERATIONS: &str = "iterations";
const SCALE: &str = "scale";
const CENTER: &str = "center";
const DEVICE: &str = "device";
const OUTPUT: &str = "output";
const OVERWRITE: &str = "overwrite";
const SINGLE: &str = "single";
const IMAGE: &str = "image";
const INPUT: &str = "input";
const HOST_SCALEDOWN: &str = "host-scaledown";
const PRINT: &str = "print";
const THREADS: &str = "threads";
const LIST_DEVICES: &str = "list-devices";

fn args<'a>() -> ArgMatches<'a> {
    let max_threads = num_cpus::get();

    App::new("schlieren")
        .version("0.1.0")
        .about("Box-counting dimension of a Schlieren set computed by an OpenCL kernel")
        .arg(
            Arg::with_name(KERNEL)
                .long(KERNEL)
                .short("k")
                .takes_value(true)
                .default_value("kernel.cl")
                .help("OpenCL source defining the schlieren and scaledown kernels"),
        )
        .arg(
            Arg::with_name(RESOLUTION)
                .long(RESOLUTION)
                .short("r")
                .takes_value(true)
                .default_value("16384")
                .validator(|s| {
                    validate_range(
                        &s,
                        1usize,
                        i32::max_value() as usize,
                        "Could not parse resolution",
                        "Resolution must be positive",
                    )
                })
                .help("Edge length of the full-resolution grid"),
        )
        .arg(
            Arg::with_name(LEVELS)
                .long(LEVELS)
                .short("l")
                .takes_value(true)
                .default_value("10")
                .validator(|s| {
                    validate_range(
                        &s,
                        1usize,
                        64,
                        "Could not parse level count",
                        "Level count must be between 1 and 64",
                    )
                })
                .help("Number of resolutions to count, halving each time"),
        )
        .arg(
            Arg::with_name(ITERATIONS)
                .long(ITERATIONS)
                .short("i")
                .takes_value(true)
                .default_value("1000")
                .validator(|s| {
                    validate_range(
                        &s,
                        1u32,
                        i32::max_value() as u32,
                        "Could not parse iteration count",
                        "Iteration count must be positive",
                    )
                })
                .help("Iterations of the map per cell"),
        )
        .arg(
            Arg::with_name(SCALE)
                .long(SCALE)
                .short("s")
                .takes_value(true)
                .default_value("6.0")
                .validator(|s| {
                    validate_range(
                        &s,
                        ::std::f64::MIN_POSITIVE,
                        ::std::f64::MAX,
                        "Could not parse scale",
                        "Scale must be positive",
                    )
                })
                .help("Width of the viewport"),
        )
        .arg(
            Arg::with_name(CENTER)
                .long(CENTER)
                .short("c")
                .takes_value(true)
                .default_value("0.0,0.0")
                .allow_hyphen_values(true)
                .validator(|s| validate_pair::<f64>(&s, ',', "Could not parse viewport centre"))
                .help("Centre of the viewport as x,y"),
        )
        .arg(
            Arg::with_name(DEVICE)
                .long(DEVICE)
                .short("d")
                .takes_value(true)
                .validator(|s| {
                    validate_range(
                        &s,
                        0usize,
                        usize::max_value(),
                        "Could not parse device index",
                        "Device index out of range",
                    )
                })
                .help("GPU to use; asked for interactively when omitted and several exist"),
        )
        .arg(
            Arg::with_name(OUTPUT)
                .long(OUTPUT)
                .short("o")
                .takes_value(true)
                .default_value("dim.csv")
                .help("CSV file the measurements are written to"),
        )
        .arg(
            Arg::with_name(OVERWRITE)
                .long(OVERWRITE)
                .help("Start the CSV file over instead of appending"),
        )
        .arg(
            Arg::with_name(SINGLE)
                .long(SINGLE)
                .help("Count the full-resolution grid only"),
        )
        .arg(
            Arg::with_name(IMAGE)
                .long(IMAGE)
                .takes_value(true)
                .help("Also save the full-resolution grid as a PGM image"),
        )
        .arg(
            Arg::with_name(INPUT)
                .long(INPUT)
                .takes_value(true)
                .conflicts_with(DEVICE)
                .help("Count a grid image saved earlier instead of running the kernel"),
        )
        .arg(
            Arg::with_name(HOST_SCALEDOWN)
                .long(HOST_SCALEDOWN)
                .help("Halve grids on the host instead of with the scaledown kernel"),
        )
        .arg(
            Arg::with_name(PRINT)
                .long(PRINT)
                .help("Print the full-resolution grid as text"),
        )
        .arg(
            Arg::with_name(THREADS)
                .long(THREADS)
                .short("t")
                .takes_value(true)
                .default_value("1")
                .validator(move |s| {
                    validate_range(
                        &s,
                        1,
                        max_threads,
                        "Could not parse thread count",
                        &format!("Thread count must be between 1 and {}", max_threads),
                    )
                })
                .help("Host threads used for counting and host scaledown"),
        )
        .arg(
            Arg::with_name(LIST_DEVICES)
                .long(LIST_DEVICES)
                .help("List the GPUs and exit"),
        )
        .get_matches()
}

/// Values clap has already validated.
fn value<T: FromStr>(matches: &ArgMatches, name: &str) -> Result<T> {
    matches
        .value_of(name)
        .and_then(|s| T::from_str(s).ok())
        .ok_or_else(|| Error::Config(format!("missing or unparsable --{}", name)))
}

fn sweep_config(matches: &ArgMatches) -> Result<SweepConfig> {
    let center = matches
        .value_of(CENTER)
        .and_then(parse_complex)
        .ok_or_else(|| Error::Config("missing or unparsable --center".to_string()))?;
    Ok(SweepConfig {
        resolution: value(matches, RESOLUTION)?,
        levels: value(matches, LEVELS)?,
        iterations: value(matches, ITERATIONS)?,
        scale: value(matches, SCALE)?,
        center,
    })
}

fn read_kernel_source(path: &str) -> Result<String> {
    fs::read_to_string(path).map_err(|cause| Error::KernelSource {
        path: path.to_string(),
        cause,
    })
}

#[cfg(feature = "opencl")]
fn list_devices() -> Result<()> {
    use schlieren::opencl;

    let (_, devices) = opencl::gpu_devices()?;
    for (index, device) in devices.iter().enumerate() {
        println!("{}", opencl::summarize(index, device)?);
    }
    Ok(())
}

#[cfg(not(feature = "opencl"))]
fn list_devices() -> Result<()> {
    Err(Error::Unsupported(
        "built without the `opencl` feature".to_string(),
    ))
}

#[cfg(feature = "opencl")]
fn gpu_backend(matches: &ArgMatches) -> Result<Box<dyn Backend>> {
    use schlieren::opencl::{self, OpenClBackend};
    use schlieren::select;
    use std::io;

    let source = read_kernel_source(matches.value_of(KERNEL).unwrap_or("kernel.cl"))?;
    let (platform, mut devices) = opencl::gpu_devices()?;
    for (index, device) in devices.iter().enumerate() {
        println!("{}", opencl::summarize(index, device)?);
    }

    let requested = match matches.value_of(DEVICE) {
        Some(_) => Some(value(matches, DEVICE)?),
        None => None,
    };
    let choice = select::choose_device(devices.len(), requested, || {
        let stdin = io::stdin();
        let stdout = io::stdout();
        let choice = select::read_choice(stdin.lock(), stdout.lock());
        choice
    })?;

    let device = devices.swap_remove(choice);
    let backend = OpenClBackend::new(platform, device, &source)?;
    info!("Inited OpenCL successfully!");
    Ok(Box::new(backend))
}

#[cfg(not(feature = "opencl"))]
fn gpu_backend(matches: &ArgMatches) -> Result<Box<dyn Backend>> {
    read_kernel_source(matches.value_of(KERNEL).unwrap_or("kernel.cl"))?;
    Err(Error::Unsupported(
        "built without the `opencl` feature; rebuild with `--features opencl` or pass --input"
            .to_string(),
    ))
}

fn run(matches: &ArgMatches) -> Result<()> {
    if matches.is_present(LIST_DEVICES) {
        return list_devices();
    }

    let threads: usize = value(matches, THREADS)?;
    let mut config = sweep_config(matches)?;

    let mut backend: Box<dyn Backend> = match matches.value_of(INPUT) {
        Some(path) => {
            let image = ImageBackend::open(path, threads)?;
            if matches.occurrences_of(RESOLUTION) == 0 {
                config.resolution = image.resolution();
            }
            if matches.occurrences_of(LEVELS) == 0 {
                config.levels = config.levels.min(config::max_levels(config.resolution));
            }
            Box::new(image)
        }
        None => {
            config.validate()?;
            gpu_backend(matches)?
        }
    };
    config.validate()?;

    if matches.is_present(HOST_SCALEDOWN) {
        backend = Box::new(HostScaledown::new(backend, threads));
    }
    info!("Using {}", backend.name());

    let mode = if matches.is_present(OVERWRITE) {
        CsvMode::Overwrite
    } else {
        CsvMode::Append
    };
    let mut sink = CsvSink::open(value::<String>(matches, OUTPUT)?, mode)?;

    info!("Calculating null sets...");
    let grid: OccupancyGrid = backend.fill(&config)?;
    info!("Finished!");

    if let Some(path) = matches.value_of(IMAGE) {
        grid.write_pgm(path)?;
        info!("Wrote grid image {}", path);
    }
    if matches.is_present(PRINT) {
        print!("{}", grid.render_ascii());
    }

    let measurements = if matches.is_present(SINGLE) {
        let measurement = sweep::single(&grid, &config, threads)?;
        sink.write(&measurement)?;
        vec![measurement]
    } else {
        sweep::box_count(&mut backend, grid, &config, threads, |m| sink.write(m))?
    };

    for m in &measurements {
        println!("B={} r={} N={}", m.resolution, m.boxes_per_unit, m.count);
    }
    if let Some(fit) = fit_dimension(&measurements) {
        println!(
            "Estimated dimension: {:.5} (R2={:.5}, n={})",
            fit.slope, fit.r_squared, fit.points
        );
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let matches = args();
    if let Err(e) = run(&matches) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
