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

use mmds::{cli, config, friends, io, utils};
use mmds::config::FriendsConfig;
use mmds::error::{MiningError, Phase, Result};
use mmds::mapreduce::PooledHarness;

fn main() {

    let args: Vec<String> = env::args().collect();
    let program = args[0].clone();

    let mut opts = Options::new();
    opts.optopt("i", "inputfile", "Input file name (required). Every line holds a user id, a tab \
        and the comma separated ids of the user's friends.", "PATH");
    opts.optopt("o", "outputfile", "Output file name (optional, output will be written to stdout \
        by default).", "PATH");
    opts.optopt("n", "num-recommendations", "Number of recommendations per user (optional, \
        defaults to 10).", "NUMBER");
    opts.optopt("t", "threads", "Number of worker threads (optional, defaults to the number of \
        CPUs).", "NUMBER");
    opts.optflag("", "json", "Write one JSON document per user instead of tab separated lines.");
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

    if !matches.opt_present("i") {
        cli::print_usage_and_exit(
            &program,
            opts,
            Some("Please specify an inputfile via --inputfile."),
        );
    }

    utils::install_logger(matches.opt_present("v"), matches.opt_present("q"));

    cli::exit_on_failure(recommend_friends(&matches));
}

fn recommend_friends(matches: &Matches) -> Result<()> {

    let mut settings: FriendsConfig = match matches.opt_str("config") {
        Some(path) => config::load_json(&path)?,
        None => FriendsConfig::default(),
    };

    cli::override_with(matches, "num-recommendations", &mut settings.max_recommendations)?;

    let mut num_threads = num_cpus::get();
    cli::override_with(matches, "threads", &mut num_threads)?;

    let input_path = matches.opt_str("inputfile")
        .ok_or_else(|| MiningError::invalid_parameter("inputfile", "missing"))?;
    let output_path = matches.opt_str("outputfile");

    info!("Reading adjacency lists from {}", input_path);
    let adjacency_lists = friends::read_adjacency_lists(&input_path)?;
    info!("Found {} users with adjacency lists", adjacency_lists.len());

    let harness = PooledHarness::new(num_threads);
    let recommendations = friends::recommend(&harness, &adjacency_lists, &settings)?;

    let mut out = io::output(output_path.as_ref().map(|path| path.as_str()))
        .map_err(|failure| MiningError::io(Phase::FriendsReduce, "output", failure))?;

    if matches.opt_present("json") {
        io::write_json_lines(recommendations.iter(), &mut out, Phase::FriendsReduce)?;
    } else {
        for recommendation in recommendations.iter() {
            writeln!(out, "{}", recommendation)
                .map_err(|failure| MiningError::io(Phase::FriendsReduce, "output", failure))?;
        }
    }

    out.flush().map_err(|failure| MiningError::io(Phase::FriendsReduce, "output", failure))
}
