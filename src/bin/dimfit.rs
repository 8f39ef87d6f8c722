extern crate clap;
extern crate env_logger;
#[macro_use]
extern crate log;
extern crate schlieren;

use clap::{App, Arg, ArgMatches};
use std::fs::File;
use std::io::BufReader;

use schlieren::fit::{fit_dimension, group_runs};
use schlieren::report::read_measurements;
use schlieren::Result;

const FILES: &str = "files";

fn args<'a>() -> ArgMatches<'a> {
    App::new("dimfit")
        .version("0.1.0")
        .about("Fits box-counting dimensions to tables written by schlieren")
        .arg(
            Arg::with_name(FILES)
                .required(true)
                .multiple(true)
                .help("CSV files to fit"),
        )
        .get_matches()
}

fn fit_file(path: &str) -> Result<()> {
    let measurements = read_measurements(BufReader::new(File::open(path)?))?;
    debug!("{}: {} rows", path, measurements.len());
    let runs = group_runs(&measurements);
    if runs.is_empty() {
        warn!("{} holds no measurements", path);
    }
    for run in runs {
        let (scale, iterations) = (run[0].scale, run[0].iterations);
        match fit_dimension(&run) {
            Some(fit) => println!(
                "{}: S={} k={} D={:.5} R2={:.5} n={}",
                path, scale, iterations, fit.slope, fit.r_squared, fit.points
            ),
            None => println!(
                "{}: S={} k={} not enough distinct levels to fit",
                path, scale, iterations
            ),
        }
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let matches = args();
    let mut failed = false;
    for path in matches.values_of(FILES).into_iter().flatten() {
        if let Err(e) = fit_file(path) {
            eprintln!("error: {}: {}", path, e);
            failed = true;
        }
    }
    if failed {
        std::process::exit(1);
    }
}
