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

use std;
use std::io;
use std::io::prelude::*;
use std::io::{BufReader, stdout};
use std::fs::File;
use std::path::Path;

use csv;
use serde::Serialize;
use serde_json;

use error::{MiningError, Phase, Result};
use types::Vector;

/// How the fields of a numeric record line are separated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Separator {
    Whitespace,
    Comma,
}

pub fn open(path: &str, phase: Phase) -> Result<BufReader<File>> {
    let file = File::open(&Path::new(path)).map_err(|err| MiningError::io(phase, path, err))?;
    Ok(BufReader::new(file))
}

/// Iterates over the lines of a reader, numbered from one. I/O failures are attributed to `phase`.
pub struct NumberedLines<R> {
    lines: io::Lines<R>,
    line_number: usize,
    phase: Phase,
}

impl<R: BufRead> Iterator for NumberedLines<R> {
    type Item = Result<(usize, String)>;

    fn next(&mut self) -> Option<Self::Item> {
        self.lines.next().map(|result| {
            self.line_number += 1;
            result
                .map(|line| (self.line_number, line))
                .map_err(|err| MiningError::io(self.phase, format!("line {}", self.line_number), err))
        })
    }
}

pub fn numbered_lines<R: BufRead>(reader: R, phase: Phase) -> NumberedLines<R> {
    NumberedLines { lines: reader.lines(), line_number: 0, phase }
}

/// Whitespace tokenization, runs of whitespace count as a single separator and an empty line
/// yields no tokens.
pub fn tokens(line: &str) -> std::str::SplitWhitespace {
    line.split_whitespace()
}

pub fn parse_floats(line: &str, separator: Separator, phase: Phase, line_number: usize)
    -> Result<Vector> {

    let fields: Vec<&str> = match separator {
        Separator::Whitespace => line.split_whitespace().collect(),
        Separator::Comma => line.split(',').map(|field| field.trim()).collect(),
    };

    fields.into_iter()
        .map(|field| parse_float(field, phase, line_number))
        .collect()
}

/// Parses a single finite float, `inf` and `NaN` are rejected.
pub fn parse_float(field: &str, phase: Phase, line_number: usize) -> Result<f64> {

    let value = field.parse::<f64>().map_err(|err| {
        MiningError::malformed(phase, line_number, format!("'{}' is not a float: {}", field, err))
    })?;

    if !value.is_finite() {
        return Err(MiningError::malformed(phase, line_number,
            format!("'{}' is not a finite float", field)));
    }

    Ok(value)
}

/// Reads one vector per non-blank line and checks that all vectors share the same dimension.
pub fn vectors_from<R: BufRead>(reader: R, separator: Separator, phase: Phase)
    -> Result<Vec<Vector>> {

    let mut vectors: Vec<Vector> = Vec::new();

    for record in numbered_lines(reader, phase) {
        let (line_number, line) = record?;

        if line.trim().is_empty() {
            continue;
        }

        let vector = parse_floats(&line, separator, phase, line_number)?;

        if let Some(first) = vectors.first() {
            if first.len() != vector.len() {
                return Err(MiningError::malformed(phase, line_number, format!(
                    "expected {} values, found {}", first.len(), vector.len())));
            }
        }

        vectors.push(vector);
    }

    Ok(vectors)
}

pub fn read_vectors(path: &str, separator: Separator, phase: Phase) -> Result<Vec<Vector>> {
    vectors_from(open(path, phase)?, separator, phase)
}

/// Reads a tab separated input file. We expect NO headers; the number of fields may vary per line.
pub fn tab_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(b'\t')
        .flexible(true)
        .from_reader(reader)
}

/// Reads a comma separated file of floats. We expect NO headers and rows of equal length.
pub fn csv_matrix_from<R: Read>(reader: R, phase: Phase) -> Result<Vec<Vector>> {

    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rows: Vec<Vector> = Vec::new();

    for result in csv_reader.records() {
        let record = result.map_err(|err| csv_to_mining_error(err, phase))?;
        let line = record.position().map(|position| position.line() as usize).unwrap_or(0);

        let row = record.iter()
            .map(|field| parse_float(field, phase, line))
            .collect::<Result<Vector>>()?;

        rows.push(row);
    }

    Ok(rows)
}

pub fn read_csv_matrix(path: &str, phase: Phase) -> Result<Vec<Vector>> {
    let file = File::open(&Path::new(path)).map_err(|err| MiningError::io(phase, path, err))?;
    csv_matrix_from(file, phase)
}

/// Malformed records keep their line number, everything else stays a plain csv error.
pub fn csv_to_mining_error(err: csv::Error, phase: Phase) -> MiningError {
    let line = err.position().map(|position| position.line() as usize);

    match (line, err.kind()) {
        (Some(line), &csv::ErrorKind::Deserialize { .. }) |
        (Some(line), &csv::ErrorKind::UnequalLengths { .. }) => {
            MiningError::malformed(phase, line, err.to_string())
        },
        _ => MiningError::Csv(err),
    }
}

/// Writes to the file at `path` if one is given, otherwise to stdout.
pub fn output(path: Option<&str>) -> io::Result<Box<dyn Write>> {
    let out: Box<dyn Write> = match path {
        Some(path) => Box::new(io::BufWriter::new(File::create(&Path::new(path))?)),
        _ => Box::new(stdout())
    };

    Ok(out)
}

/// One JSON document per line.
pub fn write_json_lines<T, I, W>(items: I, out: &mut W, phase: Phase) -> Result<()>
    where T: Serialize, I: IntoIterator<Item=T>, W: Write + ?Sized {

    for item in items {
        let as_json = serde_json::to_string(&item)?;
        writeln!(out, "{}", as_json).map_err(|err| MiningError::io(phase, "output", err))?;
    }

    Ok(())
}
