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

use mmds::{apriori, cli, config, io, utils};
use mmds::apriori::TransactionFile;
use mmds::config::{AprioriConfig, TripleGate};
use mmds::error::{MiningError, Phase, Result};

fn main() {

    let args: Vec<String> = env::args().collect();
    let program = args[0].clone();

    let mut opts = Options::new();
    opts.optopt("i", "inputfile", "Input file name (required). Every line is a basket of items \
        separated by whitespace.", "PATH");
    opts.optopt("o", "outputfile", "Output file name (optional, output will be written to stdout \
        by default).", "PATH");
    opts.optopt("m", "mode", "Which rules to mine: 'pairs', 'triples' or 'both' (optional, \
        defaults to both).", "MODE");
    opts.optopt("s", "min-support", "Itemsets must occur more often than this to be frequent \
        (optional, defaults to 100).", "NUMBER");
    opts.optopt("n", "num-rules", "Number of rules to print per mode (optional, defaults to \
        20).", "NUMBER");
    opts.optflag("", "all-pairs", "Only count triples whose three sub-pairs are all frequent.");
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

    cli::exit_on_failure(mine_rules(&matches));
}

fn mine_rules(matches: &Matches) -> Result<()> {

    let mut settings: AprioriConfig = match matches.opt_str("config") {
        Some(path) => config::load_json(&path)?,
        None => AprioriConfig::default(),
    };

    cli::override_with(matches, "min-support", &mut settings.min_support)?;
    cli::override_with(matches, "num-rules", &mut settings.items_to_print)?;

    if matches.opt_present("all-pairs") {
        settings.triple_gate = TripleGate::AllPairsFrequent;
    }

    let mode = matches.opt_str("mode").unwrap_or_else(|| String::from("both"));
    let (mine_pairs, mine_triples) = match mode.as_str() {
        "pairs" => (true, false),
        "triples" => (false, true),
        "both" => (true, true),
        other => return Err(MiningError::invalid_parameter("mode", format!("unknown mode '{}'", other))),
    };

    let input_path = matches.opt_str("inputfile")
        .ok_or_else(|| MiningError::invalid_parameter("inputfile", "missing"))?;
    let output_path = matches.opt_str("outputfile");

    let source = TransactionFile::new(input_path.as_str());

    let mut out = io::output(output_path.as_ref().map(|path| path.as_str()))
        .map_err(|failure| MiningError::io(Phase::Rules, "output", failure))?;

    if mine_pairs {
        info!("Mining rules x => y from {} (min support {})", input_path, settings.min_support);
        apriori::pairs(&source, &settings)?.write_to(&mut out)?;
    }

    if mine_triples {
        info!("Mining rules (x,y) => z from {} (min support {})", input_path, settings.min_support);
        apriori::triples(&source, &settings)?.write_to(&mut out)?;
    }

    out.flush().map_err(|failure| MiningError::io(Phase::Rules, "output", failure))
}
