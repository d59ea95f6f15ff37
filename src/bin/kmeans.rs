/**
 * MMDS
 * Copyright (C) 2018 Sebastian Schelter
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program. If not, see <http://www.gnu.org/licenses/>.
 */

extern crate getopts;
extern crate mmds;
extern crate num_cpus;
#[macro_use]
extern crate tracing;

use std::env;
use std::io::Write;

use getopts::{Matches, Options};

use mmds::{cli, config, io, utils};
use mmds::config::KMeansConfig;
use mmds::error::{MiningError, Phase, Result};
use mmds::io::Separator;
use mmds::kmeans::{CentroidFile, CostLog, KMeans};
use mmds::mapreduce::PooledHarness;

fn main() {

    let args: Vec<String> = env::args().collect();
    let program = args[0].clone();

    let mut opts = Options::new();
    opts.optopt("i", "inputfile", "Input file name (required). One point per line, coordinates \
        separated by whitespace.", "PATH");
    opts.optopt("k", "centroids", "File with the initial centroids, one per line (required). It \
        is replaced by the updated centroids after every iteration, the previous version is kept \
        with the suffix '.old'.", "PATH");
    opts.optopt("l", "cost-log", "File the cost of every iteration is appended to (optional, \
        defaults to cost.txt). An existing log is removed first.", "PATH");
    opts.optopt("o", "outputfile", "Output file for the assignments of the last iteration \
        (optional, output will be written to stdout by default).", "PATH");
    opts.optopt("n", "iterations", "Number of iterations (optional, defaults to 20).", "NUMBER");
    opts.optopt("t", "threads", "Number of worker threads (optional, defaults to the number of \
        CPUs).", "NUMBER");
    opts.optopt("c", "config", "JSON file with settings, flags given on the command line take \
        precedence (optional).", "PATH");
    opts.optflag("v", "verbose", "Log debug output");
    opts.optflag("q", "quiet", "Only log warnings");
    opts.optflag("h", "help", "Print this help menu");

    let matches = match opts.parse(&args[1..]) {
        Ok(matches) => matches,
        Err(failure) => {
            let hint = failure.to_string();
            cli::print_usage_and_exit(&program, opts, Some(&hint))
        },
    };

    if matches.opt_present("h") {
        cli::print_usage_and_exit(&program, opts, None);
    }

    if !matches.opt_present("i") || !matches.opt_present("k") {
        cli::print_usage_and_exit(
            &program,
            opts,
            Some("Please specify an inputfile via --inputfile and centroids via --centroids."),
        );
    }

    utils::install_logger(matches.opt_present("v"), matches.opt_present("q"));

    cli::exit_on_failure(cluster(&matches));
}

fn cluster(matches: &Matches) -> Result<()> {

    let mut settings: KMeansConfig = match matches.opt_str("config") {
        Some(path) => config::load_json(&path)?,
        None => KMeansConfig::default(),
    };

    cli::override_with(matches, "iterations", &mut settings.max_iterations)?;

    let mut num_threads = num_cpus::get();
    cli::override_with(matches, "threads", &mut num_threads)?;

    let input_path = matches.opt_str("inputfile")
        .ok_or_else(|| MiningError::invalid_parameter("inputfile", "missing"))?;
    let centroid_path = matches.opt_str("centroids")
        .ok_or_else(|| MiningError::invalid_parameter("centroids", "missing"))?;
    let cost_path = matches.opt_str("cost-log").unwrap_or_else(|| String::from("cost.txt"));
    let output_path = matches.opt_str("outputfile");

    info!("Reading points from {}", input_path);
    let points = io::read_vectors(&input_path, Separator::Whitespace, Phase::Assign)?;
    info!("Found {} points", points.len());

    let harness = PooledHarness::new(num_threads);
    let mut centroid_file = CentroidFile::new(&centroid_path);
    let cost_log = CostLog::new(&cost_path);

    let outcome = KMeans::new(settings)
        .run_persisted(&harness, &points, &mut centroid_file, &cost_log)?;

    let mut out = io::output(output_path.as_ref().map(|path| path.as_str()))
        .map_err(|failure| MiningError::io(Phase::Persist, "output", failure))?;

    for assignment in outcome.assignments.iter() {
        writeln!(out, "{}", assignment)
            .map_err(|failure| MiningError::io(Phase::Persist, "output", failure))?;
    }

    out.flush().map_err(|failure| MiningError::io(Phase::Persist, "output", failure))
}
