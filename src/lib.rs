extern crate csv;
extern crate fnv;
extern crate getopts;
extern crate num_cpus;
extern crate rand;
extern crate scoped_pool;
extern crate serde;
#[macro_use]
extern crate serde_derive;
extern crate serde_json;
extern crate thiserror;
#[macro_use]
extern crate tracing;
extern crate tracing_subscriber;

#[cfg(test)]
extern crate tempfile;

pub mod types;
pub mod utils;
pub mod error;
pub mod io;
pub mod config;
pub mod mapreduce;
pub mod cli;

pub mod itemsets;
pub mod rules;
pub mod apriori;
pub mod friends;
pub mod kmeans;
pub mod svm;
pub mod graph;
pub mod pagerank;
pub mod factors;
pub mod simrank;
pub mod densest;

mod usage_tests;

pub use error::{MiningError, Phase, Result};
pub use mapreduce::{Harness, LocalHarness, PooledHarness};
pub use utils::Interrupt;
