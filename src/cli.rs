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

use std::fmt::Display;
use std::process;
use std::str::FromStr;

use getopts::{Matches, Options};

use error::{MiningError, Result};

/// Prints the usage, preceded by `hint` if given. Exits with 1 after a hint and with 0 otherwise.
pub fn print_usage_and_exit(
    program: &str,
    opts: Options,
    hint: Option<&str>
) -> ! {

    if let Some(hint) = hint {
        eprintln!("\n{}\n", hint);
    }

    let brief = format!("Usage: {} [options]", program);
    eprint!("{}", opts.usage(&brief));

    process::exit(if hint.is_some() { 1 } else { 0 });
}

/// Replaces `target` with the value of the option `name`, if it was given.
pub fn override_with<T>(matches: &Matches, name: &'static str, target: &mut T) -> Result<()>
    where T: FromStr, T::Err: Display {

    match matches.opt_get::<T>(name) {
        Ok(Some(value)) => *target = value,
        Ok(None) => {},
        Err(failure) => return Err(MiningError::invalid_parameter(name, failure.to_string())),
    }

    Ok(())
}

/// Prints a failure of the program as a single line and exits with 1.
pub fn exit_on_failure(result: Result<()>) {
    if let Err(failure) = result {
        eprintln!("{}", failure);
        process::exit(1);
    }
}
