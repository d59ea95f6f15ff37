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

use std::fmt;
use std::io;

use csv;
use serde_json;
use thiserror::Error;

pub type Result<T> = ::std::result::Result<T, MiningError>;

/// The pipeline stage in which a failure happened, used to prefix every diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    CountItems,
    CountPairs,
    CountTriples,
    Rules,
    FriendsMap,
    FriendsReduce,
    Assign,
    Update,
    Persist,
    Load,
    Train,
    Edges,
    Ranks,
    Walks,
    Ratings,
    Factorize,
    Similarity,
    Peel,
    Config,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match *self {
            Phase::CountItems => "fim/count-items",
            Phase::CountPairs => "fim/count-pairs",
            Phase::CountTriples => "fim/count-triples",
            Phase::Rules => "fim/rules",
            Phase::FriendsMap => "foaf/map",
            Phase::FriendsReduce => "foaf/reduce",
            Phase::Assign => "kmeans/assign",
            Phase::Update => "kmeans/update",
            Phase::Persist => "kmeans/persist",
            Phase::Load => "svm/load",
            Phase::Train => "svm/train",
            Phase::Edges => "graph/edges",
            Phase::Ranks => "pagerank/power-iteration",
            Phase::Walks => "pagerank/monte-carlo",
            Phase::Ratings => "factors/ratings",
            Phase::Factorize => "factors/sgd",
            Phase::Similarity => "simrank/iterate",
            Phase::Peel => "densest/peel",
            Phase::Config => "config",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum MiningError {
    /// A record could not be parsed into the expected tokens or floats.
    #[error("{phase}: line {line}: malformed record: {reason}")]
    MalformedRecord {
        phase: Phase,
        line: usize,
        reason: String,
    },

    /// The data contradicts an invariant the algorithm relies on.
    #[error("{phase}: invariant violated: {detail}")]
    InvariantViolation { phase: Phase, detail: String },

    #[error("{phase}: cannot access {path}: {source}")]
    Io {
        phase: Phase,
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl MiningError {
    pub fn malformed<S: Into<String>>(phase: Phase, line: usize, reason: S) -> Self {
        MiningError::MalformedRecord { phase, line, reason: reason.into() }
    }

    pub fn invariant<S: Into<String>>(phase: Phase, detail: S) -> Self {
        MiningError::InvariantViolation { phase, detail: detail.into() }
    }

    pub fn io<S: Into<String>>(phase: Phase, path: S, source: io::Error) -> Self {
        MiningError::Io { phase, path: path.into(), source }
    }

    pub fn invalid_parameter<S: Into<String>>(name: &'static str, reason: S) -> Self {
        MiningError::InvalidParameter { name, reason: reason.into() }
    }
}
