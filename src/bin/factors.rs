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

use mmds::{cli, config, factors, io, utils};
use mmds::config::FactorsConfig;
use mmds::error::{MiningError, Phase, Result};
use mmds::factors::Factorizer;

fn main() {

    let args: Vec<String> = env::args().collect();
    let program = args[0].clone();

    let mut opts = Options::new();
    opts.optopt("i", "inputfile", "Training ratings (required). One rating per line: user id, item \
        id and rating separated by whitespace, ids start at 1.", "PATH");
    opts.optopt("t", "testfile", "Held-out ratings in the same format (optional).", "PATH");
    opts.optflag("", "sweep", "Train one model per number of factors from 1 to 10 and lambda 0 or \
        0.2, and report the training and test error, which needs --testfile.");
    opts.optopt("o", "outputfile", "Output file name (optional, output will be written to stdout \
        by default).", "PATH");
    opts.optopt("k", "factors", "Number of latent factors (optional, defaults to 20).", "NUMBER");
    opts.optopt("l", "lambda", "Regularization weight (optional, defaults to 0.2).", "FLOAT");
    opts.optopt("", "eta", "Learning rate (optional, defaults to 0.03).", "FLOAT");
    opts.optopt("n", "iterations", "Passes over the ratings (optional, defaults to 40).", "NUMBER");
    opts.optopt("", "seed", "Seed for the initial factors (optional).", "NUMBER");
    opts.optopt("c", "config", "JSON file with settings, flags given on the command line take \
        precedence (optional).", "PATH");
    opts.optflag("v", "verbose", "Log debug output, including the error after every pass");
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
            Some("Please specify training ratings via --inputfile."),
        );
    }

    if matches.opt_present("sweep") && !matches.opt_present("t") {
        cli::print_usage_and_exit(
            &program,
            opts,
            Some("The sweep needs held-out ratings via --testfile."),
        );
    }

    utils::install_logger(matches.opt_present("v"), matches.opt_present("q"));

    cli::exit_on_failure(factorize(&matches));
}

fn factorize(matches: &Matches) -> Result<()> {

    let mut settings: FactorsConfig = match matches.opt_str("config") {
        Some(path) => config::load_json(&path)?,
        None => FactorsConfig::default(),
    };

    cli::override_with(matches, "factors", &mut settings.k)?;
    cli::override_with(matches, "lambda", &mut settings.lambda)?;
    cli::override_with(matches, "eta", &mut settings.eta)?;
    cli::override_with(matches, "iterations", &mut settings.iterations)?;
    cli::override_with(matches, "seed", &mut settings.seed)?;

    let input_path = matches.opt_str("inputfile")
        .ok_or_else(|| MiningError::invalid_parameter("inputfile", "missing"))?;
    let output_path = matches.opt_str("outputfile");

    info!("Reading ratings from {}", input_path);
    let train = factors::read_ratings(&input_path)?;
    info!("Found {} ratings", train.len());

    let test = match matches.opt_str("testfile") {
        Some(path) => Some(factors::read_ratings(&path)?),
        None => None,
    };

    let mut lines: Vec<String> = Vec::new();

    match test {
        Some(ref test) if matches.opt_present("sweep") => {
            let results = factors::sweep(&train, test, &settings, &factors::SWEEP_RANKS,
                &factors::SWEEP_LAMBDAS)?;
            lines.extend(results.iter().map(|result| result.to_string()));
        },
        _ => {
            let report = Factorizer::new(settings).fit(&train)?;
            lines.extend(report.errors.iter().map(|error| error.to_string()));

            if let Some(ref test) = test {
                lines.push(format!("Ete: {:.4}", report.factors.squared_error(test)?));
            }
        },
    }

    let mut out = io::output(output_path.as_ref().map(|path| path.as_str()))
        .map_err(|failure| MiningError::io(Phase::Factorize, "output", failure))?;

    for line in lines {
        writeln!(out, "{}", line)
            .map_err(|failure| MiningError::io(Phase::Factorize, "output", failure))?;
    }

    out.flush().map_err(|failure| MiningError::io(Phase::Factorize, "output", failure))
}
