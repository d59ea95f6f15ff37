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

use mmds::{cli, config, io, svm, utils};
use mmds::error::{MiningError, Phase, Result};
use mmds::svm::{Dataset, SvmParameters, Trainer};

fn main() {

    let args: Vec<String> = env::args().collect();
    let program = args[0].clone();

    let mut opts = Options::new();
    opts.optopt("f", "features", "Training features (required). One example per line, values \
        separated by commas.", "PATH");
    opts.optopt("l", "labels", "Training labels (required), -1 or +1, one per line or all on a \
        single line separated by commas.", "PATH");
    opts.optopt("", "test-features", "Held-out features to evaluate the model on (optional).",
        "PATH");
    opts.optopt("", "test-labels", "Held-out labels to evaluate the model on (optional).", "PATH");
    opts.optopt("m", "mode", "Gradient descent variant: 'batch', 'sgd' or 'mini-batch' (optional, \
        defaults to mini-batch).", "MODE");
    opts.optflag("", "sweep", "Train one stochastic model per value of C and report the error on \
        the held-out data, which is required then.");
    opts.optopt("", "eta", "Learning rate (optional, overrides the preset of the mode).", "FLOAT");
    opts.optopt("", "eps", "Convergence threshold for the relative objective change in percent \
        (optional, overrides the preset of the mode).", "FLOAT");
    opts.optopt("C", "regularization", "Weight of the hinge loss (optional, defaults to 100).",
        "NUMBER");
    opts.optopt("b", "batch-size", "Examples per step in mini-batch mode (optional).", "NUMBER");
    opts.optopt("", "max-iterations", "Stop after this many steps even without convergence \
        (optional, defaults to 100000).", "NUMBER");
    opts.optopt("", "seed", "Seed for shuffling the examples (optional).", "NUMBER");
    opts.optopt("o", "outputfile", "Output file name (optional, output will be written to stdout \
        by default).", "PATH");
    opts.optopt("c", "config", "JSON file with parameters overriding the preset of the mode, flags \
        given on the command line take precedence (optional).", "PATH");
    opts.optflag("v", "verbose", "Log debug output, including one line per step");
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

    if !matches.opt_present("f") || !matches.opt_present("l") {
        cli::print_usage_and_exit(
            &program,
            opts,
            Some("Please specify training data via --features and --labels."),
        );
    }

    if matches.opt_present("test-features") != matches.opt_present("test-labels") {
        cli::print_usage_and_exit(
            &program,
            opts,
            Some("Held-out data needs both --test-features and --test-labels."),
        );
    }

    if matches.opt_present("sweep") && !matches.opt_present("test-features") {
        cli::print_usage_and_exit(
            &program,
            opts,
            Some("The regularization sweep needs held-out data via --test-features and \
                --test-labels."),
        );
    }

    utils::install_logger(matches.opt_present("v"), matches.opt_present("q"));

    cli::exit_on_failure(train(&matches));
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Mode {
    Batch,
    Stochastic,
    MiniBatch,
}

fn parameters(matches: &Matches, mode: Mode) -> Result<SvmParameters> {

    let preset = match mode {
        Mode::Batch => SvmParameters::batch(),
        Mode::Stochastic => SvmParameters::sgd(),
        Mode::MiniBatch => SvmParameters::mini_batch(),
    };

    let mut parameters = match matches.opt_str("config") {
        Some(path) => config::load_json_onto(&path, preset)?,
        None => preset,
    };

    cli::override_with(matches, "eta", &mut parameters.eta)?;
    cli::override_with(matches, "eps", &mut parameters.eps)?;
    cli::override_with(matches, "regularization", &mut parameters.c)?;
    cli::override_with(matches, "batch-size", &mut parameters.batch_size)?;
    cli::override_with(matches, "max-iterations", &mut parameters.max_iterations)?;
    cli::override_with(matches, "seed", &mut parameters.seed)?;

    if mode == Mode::Stochastic {
        parameters.batch_size = 1;
    }

    Ok(parameters)
}

fn train(matches: &Matches) -> Result<()> {

    let sweep = matches.opt_present("sweep");

    // The sweep trains stochastic models, so it starts from the SGD preset.
    let default_mode = if sweep { "sgd" } else { "mini-batch" };
    let mode = match matches.opt_str("mode").as_ref().map(|mode| mode.as_str()).unwrap_or(default_mode) {
        "batch" => Mode::Batch,
        "sgd" => Mode::Stochastic,
        "mini-batch" => Mode::MiniBatch,
        other => return Err(MiningError::invalid_parameter("mode", format!("unknown mode '{}'", other))),
    };

    let parameters = parameters(matches, mode)?;

    let features_path = matches.opt_str("features")
        .ok_or_else(|| MiningError::invalid_parameter("features", "missing"))?;
    let labels_path = matches.opt_str("labels")
        .ok_or_else(|| MiningError::invalid_parameter("labels", "missing"))?;

    info!("Reading training data from {} and {}", features_path, labels_path);
    let train = Dataset::from_files(&features_path, &labels_path)?;
    info!("Found {} examples with {} features", train.len(), train.dimensions());

    let test = match (matches.opt_str("test-features"), matches.opt_str("test-labels")) {
        (Some(features_path), Some(labels_path)) => {
            info!("Reading held-out data from {} and {}", features_path, labels_path);
            Some(Dataset::from_files(&features_path, &labels_path)?)
        },
        _ => None,
    };

    let output_path = matches.opt_str("outputfile");
    let mut out = io::output(output_path.as_ref().map(|path| path.as_str()))
        .map_err(|failure| MiningError::io(Phase::Train, "output", failure))?;

    let mut lines: Vec<String> = Vec::new();

    match test {
        Some(ref test) if sweep => {
            let results = svm::regularization_sweep(&train, test, &parameters, &svm::SWEEP_C_VALUES)?;
            for result in results.iter() {
                lines.push(result.to_string());
            }
        },
        _ => {
            let trainer = Trainer::new(parameters);
            let report = match mode {
                Mode::Batch => trainer.batch_gradient_descent(&train)?,
                Mode::Stochastic | Mode::MiniBatch => trainer.mini_batch_gradient_descent(&train)?,
            };

            lines.push(format!("w: {}", utils::format_vector(&report.model.weights)));
            lines.push(format!("b: {}", utils::format_float(report.model.bias)));
            lines.push(format!("Steps: {} | Converged: {}", report.iterations, report.converged));
            lines.push(format!("Training error: {:.4}", svm::classification_error(&report.model, &train)));

            if let Some(ref test) = test {
                lines.push(format!("Test error: {:.4}", svm::classification_error(&report.model, test)));
            }
        },
    }

    for line in lines {
        writeln!(out, "{}", line).map_err(|failure| MiningError::io(Phase::Train, "output", failure))?;
    }

    out.flush().map_err(|failure| MiningError::io(Phase::Train, "output", failure))
}
