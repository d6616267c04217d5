mod args;

use clap::Parser;
use colored::*;
use dangerous_bend::output::write_findings;
use dangerous_bend::reader::process_pbf;
use dangerous_bend::BendDetector;
use log::{info, warn};
use memmap2::Mmap;

use std::fs::File;
use std::io::{self, BufWriter, Write};

type Error = Box<dyn std::error::Error>;

fn run(args: args::Args) -> Result<(), Error> {
    let settings = args.settings()?;
    let config = settings.to_config()?;
    let format = args.output_format();
    info!(
        "Looking for bends below {} degrees within {} m",
        settings.angle_threshold, settings.distance_threshold
    );

    let input = settings
        .input_file
        .as_ref()
        .ok_or("no input file given on the command line or in the config file")?;
    let input_file = File::open(input)?;
    let input_data = unsafe { Mmap::map(&input_file)? };

    let mut detector = BendDetector::new(config);
    let stats = process_pbf(&input_data, &mut detector, !args.no_progress)?;
    info!(
        "{} of {} ways checked, {} dangerous bend(s) found.",
        detector.num_admitted_ways(),
        detector.num_admitted_ways() + detector.num_rejected_ways(),
        detector.findings().len()
    );

    match &settings.output_file {
        Some(path) => {
            let mut out = BufWriter::new(File::create(path)?);
            write_findings(detector.findings(), format, &mut out)?;
            out.flush()?;
            info!("Results written to: {}", path.display());
        }
        None => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            write_findings(detector.findings(), format, &mut out)?;
            out.flush()?;
        }
    }

    eprintln!("{stats}");
    if stats.num_skipped_blocks > 0 {
        warn!(
            "{} block(s) of the input could not be read, results are incomplete.",
            stats.num_skipped_blocks
        );
    }
    Ok(())
}

fn main() {
    let args = args::Args::parse();
    let level = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_module_path(false)
        .format_timestamp_nanos()
        .init();

    if let Err(e) = run(args) {
        eprintln!("{}: {}", "Error".red(), e);
        std::process::exit(1);
    }
}
