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

use mmds::{cli, config, densest, graph, io, utils};
use mmds::config::DensestConfig;
use mmds::error::{MiningError, Phase, Result};
use mmds::graph::{Graph, Numbering};

fn main() {

    let args: Vec<String> = env::args().collect();
    let program = args[0].clone();

    let mut opts = Options::new();
    opts.optopt("i", "inputfile", "Input file name (required). One undirected edge per line, two \
        node ids separated by whitespace, starting at 0.", "PATH");
    opts.optopt("o", "outputfile", "Output file name (optional, output will be written to stdout \
        by default).", "PATH");
    opts.optopt("e", "epsilon", "Removal slack, nodes with a degree of at most 2 (1 + epsilon) \
        times the density are removed (optional, defaults to 0.05).", "FLOAT");
    opts.optopt("n", "num-nodes", "Number of nodes (optional, defaults to the largest id in the \
        input plus one).", "NUMBER");
    opts.optflag("", "rounds", "Also print the size, edges and density after every round.");
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

    cli::exit_on_failure(find_densest(&matches));
}

fn find_densest(matches: &Matches) -> Result<()> {

    let mut settings: DensestConfig = match matches.opt_str("config") {
        Some(path) => config::load_json(&path)?,
        None => DensestConfig::default(),
    };

    cli::override_with(matches, "epsilon", &mut settings.epsilon)?;

    if matches.opt_present("num-nodes") {
        let mut num_nodes: usize = 0;
        cli::override_with(matches, "num-nodes", &mut num_nodes)?;
        settings.num_nodes = Some(num_nodes);
    }

    let input_path = matches.opt_str("inputfile")
        .ok_or_else(|| MiningError::invalid_parameter("inputfile", "missing"))?;
    let output_path = matches.opt_str("outputfile");

    info!("Reading edges from {}", input_path);
    let edges = graph::read_edges(&input_path, Numbering::ZeroBased)?;
    let num_nodes = settings.num_nodes.unwrap_or_else(|| graph::num_nodes(&edges));
    let graph = Graph::undirected(&edges, num_nodes)?;

    let densest = densest::peel(&graph, settings.epsilon)?;

    let mut lines: Vec<String> = Vec::new();

    if matches.opt_present("rounds") {
        lines.extend(densest.rounds.iter().map(|round| round.to_string()));
    }

    lines.push(format!("Iterations: {} | |S~|: {} | |E(S~)|: {} | rho(S~): {:.4}",
        densest.iterations(), densest.nodes.len(), densest.edges, densest.density));
    lines.push(densest.nodes.iter().map(|node| node.to_string()).collect::<Vec<String>>().join(" "));

    let mut out = io::output(output_path.as_ref().map(|path| path.as_str()))
        .map_err(|failure| MiningError::io(Phase::Peel, "output", failure))?;

    for line in lines {
        writeln!(out, "{}", line).map_err(|failure| MiningError::io(Phase::Peel, "output", failure))?;
    }

    out.flush().map_err(|failure| MiningError::io(Phase::Peel, "output", failure))
}
