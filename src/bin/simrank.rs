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
#[macro_use]
extern crate tracing;

use std::env;
use std::io::Write;

use getopts::{Matches, Options};

use mmds::{cli, config, graph, io, simrank, utils};
use mmds::config::SimRankConfig;
use mmds::error::{MiningError, Phase, Result};
use mmds::graph::Numbering;
use mmds::simrank::Bipartite;

fn main() {

    let args: Vec<String> = env::args().collect();
    let program = args[0].clone();

    let mut opts = Options::new();
    opts.optopt("i", "inputfile", "Input file name (required). One edge of a bipartite graph per \
        line, the id of the left node and the id of the right node, both starting at 0.", "PATH");
    opts.optopt("o", "outputfile", "Output file name (optional, output will be written to stdout \
        by default).", "PATH");
    opts.optopt("n", "iterations", "Number of iterations (optional, defaults to 3).", "NUMBER");
    opts.optopt("d", "decay", "Decay of neighbour similarity (optional, defaults to 0.8).",
        "FLOAT");
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

    cli::exit_on_failure(compare_nodes(&matches));
}

fn compare_nodes(matches: &Matches) -> Result<()> {

    let mut settings: SimRankConfig = match matches.opt_str("config") {
        Some(path) => config::load_json(&path)?,
        None => SimRankConfig::default(),
    };

    cli::override_with(matches, "iterations", &mut settings.iterations)?;
    cli::override_with(matches, "decay", &mut settings.decay)?;

    let input_path = matches.opt_str("inputfile")
        .ok_or_else(|| MiningError::invalid_parameter("inputfile", "missing"))?;
    let output_path = matches.opt_str("outputfile");

    let graph = Bipartite::from_edges(&graph::read_edges(&input_path, Numbering::ZeroBased)?);
    info!("Found {} left and {} right nodes", graph.num_left(), graph.num_right());

    let iterations = simrank::simrank(&graph, &settings)?;

    let mut out = io::output(output_path.as_ref().map(|path| path.as_str()))
        .map_err(|failure| MiningError::io(Phase::Similarity, "output", failure))?;

    for (iteration, similarities) in iterations.iter().enumerate() {
        write!(out, "Iteration: {}\n{}", iteration + 1, similarities)
            .map_err(|failure| MiningError::io(Phase::Similarity, "output", failure))?;
    }

    out.flush().map_err(|failure| MiningError::io(Phase::Similarity, "output", failure))
}
