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

use mmds::{cli, config, io, pagerank, utils};
use mmds::config::PageRankConfig;
use mmds::error::{MiningError, Phase, Result};
use mmds::pagerank::PageRank;

fn main() {

    let args: Vec<String> = env::args().collect();
    let program = args[0].clone();

    let mut opts = Options::new();
    opts.optopt("i", "inputfile", "Input file name (required). One link per line, the ids of the \
        source and the target page separated by whitespace, starting at 1.", "PATH");
    opts.optopt("o", "outputfile", "Output file name (optional, output will be written to stdout \
        by default).", "PATH");
    opts.optopt("n", "iterations", "Number of power iterations (optional, defaults to 40).",
        "NUMBER");
    opts.optopt("b", "teleport", "Teleport probability (optional, defaults to 0.2).", "FLOAT");
    opts.optopt("p", "num-pages", "Number of pages (optional, defaults to the largest id in the \
        input).", "NUMBER");
    opts.optopt("", "seed", "Seed for the random walks (optional).", "NUMBER");
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

    cli::exit_on_failure(rank_pages(&matches));
}

fn rank_pages(matches: &Matches) -> Result<()> {

    let mut settings: PageRankConfig = match matches.opt_str("config") {
        Some(path) => config::load_json(&path)?,
        None => PageRankConfig::default(),
    };

    cli::override_with(matches, "iterations", &mut settings.iterations)?;
    cli::override_with(matches, "teleport", &mut settings.teleport_probability)?;
    cli::override_with(matches, "seed", &mut settings.seed)?;

    if matches.opt_present("num-pages") {
        let mut num_pages: usize = 0;
        cli::override_with(matches, "num-pages", &mut num_pages)?;
        settings.num_pages = Some(num_pages);
    }

    let input_path = matches.opt_str("inputfile")
        .ok_or_else(|| MiningError::invalid_parameter("inputfile", "missing"))?;
    let output_path = matches.opt_str("outputfile");

    info!("Reading links from {}", input_path);
    let graph = pagerank::read_graph(&input_path, settings.num_pages)?;
    info!("Found {} pages and {} links", graph.num_nodes(), graph.num_edges());

    let outcome = PageRank::new(settings).run(&graph)?;

    let mut out = io::output(output_path.as_ref().map(|path| path.as_str()))
        .map_err(|failure| MiningError::io(Phase::Walks, "output", failure))?;

    let mut lines: Vec<String> = outcome.ranked_pages().iter().map(|page| page.to_string()).collect();
    lines.extend(outcome.errors.iter().map(|error| error.to_string()));

    for line in lines {
        writeln!(out, "{}", line).map_err(|failure| MiningError::io(Phase::Walks, "output", failure))?;
    }

    out.flush().map_err(|failure| MiningError::io(Phase::Walks, "output", failure))
}
