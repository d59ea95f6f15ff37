use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::io::stderr;
use std::time::Duration;

use tracing::Level;
use tracing_subscriber;

use types::Vector;

pub fn to_millis(duration: Duration) -> u64 {
    (duration.as_secs() * 1_000) + (duration.subsec_nanos() / 1_000_000) as u64
}

pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Squared euclidean distance, we never take the square root.
pub fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let diff = x - y;
            diff * diff
        })
        .sum()
}

/// Componentwise mean of a non-empty collection of vectors of equal dimension.
pub fn mean<'a, I>(vectors: I, dimensions: usize) -> Option<Vector>
    where I: IntoIterator<Item=&'a Vector> {

    let mut sums = vec![0.0; dimensions];
    let mut count = 0_usize;

    for vector in vectors {
        for (sum, value) in sums.iter_mut().zip(vector.iter()) {
            *sum += *value;
        }
        count += 1;
    }

    if count == 0 {
        return None;
    }

    for sum in sums.iter_mut() {
        *sum /= count as f64;
    }

    Some(sums)
}

/// Shortest representation which parses back to the same value, always with a decimal point.
pub fn format_float(value: f64) -> String {
    let formatted = format!("{}", value);
    if value.is_finite() && !formatted.contains('.') {
        formatted + ".0"
    } else {
        formatted
    }
}

pub fn format_vector(vector: &[f64]) -> String {
    vector.iter()
        .map(|value| format_float(*value))
        .collect::<Vec<String>>()
        .join(" ")
}

/// Diagnostics go to stderr at INFO, DEBUG when `verbose` and WARN when `quiet`.
pub fn install_logger(verbose: bool, quiet: bool) {
    let level = if verbose {
        Level::DEBUG
    } else if quiet {
        Level::WARN
    } else {
        Level::INFO
    };

    // Fails only if a subscriber is already installed, which is fine.
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(stderr)
        .try_init();
}

/// Cooperative cancellation, checked by the iterative algorithms once per iteration.
#[derive(Clone, Debug, Default)]
pub struct Interrupt {
    flag: Arc<AtomicBool>,
}

impl Interrupt {

    pub fn new() -> Self {
        Interrupt::default()
    }

    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
