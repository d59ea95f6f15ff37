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
use std::io::Read;
use std::time::Instant;

use rand::{Rng, SeedableRng, XorShiftRng};

use error::{MiningError, Phase, Result};
use io;
use types::Vector;
use utils;
use utils::Interrupt;

pub const SWEEP_C_VALUES: [u32; 8] = [1, 10, 50, 100, 200, 300, 400, 500];

/// Labelled training or test examples, labels are -1 or +1.
#[derive(Clone, Debug, PartialEq)]
pub struct Dataset {
    features: Vec<Vector>,
    labels: Vec<f64>,
}

impl Dataset {

    pub fn new(features: Vec<Vector>, labels: Vec<f64>) -> Result<Self> {

        let dimensions = match features.first() {
            Some(example) => example.len(),
            None => return Err(MiningError::invalid_parameter("dataset", "no examples given")),
        };

        if features.len() != labels.len() {
            return Err(MiningError::invariant(Phase::Load, format!(
                "{} examples but {} labels", features.len(), labels.len())));
        }

        for (index, example) in features.iter().enumerate() {
            if example.len() != dimensions {
                return Err(MiningError::malformed(Phase::Load, index + 1, format!(
                    "expected {} features, found {}", dimensions, example.len())));
            }
        }

        for (index, label) in labels.iter().enumerate() {
            if *label != 1.0 && *label != -1.0 {
                return Err(MiningError::malformed(Phase::Load, index + 1, format!(
                    "label {} is neither -1 nor +1", label)));
            }
        }

        Ok(Dataset { features, labels })
    }

    /// Features as comma separated rows, labels either one per line or all on a single line.
    pub fn from_readers<F: Read, L: Read>(features: F, labels: L) -> Result<Self> {
        let features = io::csv_matrix_from(features, Phase::Load)?;
        let labels = flatten_labels(io::csv_matrix_from(labels, Phase::Load)?)?;
        Dataset::new(features, labels)
    }

    pub fn from_files(features_path: &str, labels_path: &str) -> Result<Self> {
        let features = io::read_csv_matrix(features_path, Phase::Load)?;
        let labels = flatten_labels(io::read_csv_matrix(labels_path, Phase::Load)?)?;
        Dataset::new(features, labels)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn dimensions(&self) -> usize {
        self.features.first().map(|example| example.len()).unwrap_or(0)
    }

    pub fn features(&self) -> &[Vector] {
        &self.features
    }

    pub fn labels(&self) -> &[f64] {
        &self.labels
    }
}

fn flatten_labels(rows: Vec<Vector>) -> Result<Vec<f64>> {

    if rows.len() == 1 {
        return Ok(rows.into_iter().flat_map(|row| row.into_iter()).collect());
    }

    rows.into_iter()
        .enumerate()
        .map(|(index, row)| {
            if row.len() == 1 {
                Ok(row[0])
            } else {
                Err(MiningError::malformed(Phase::Load, index + 1, format!(
                    "expected a single label, found {} values", row.len())))
            }
        })
        .collect()
}

/// The separating hyperplane `w·x + b = 0`.
#[derive(Clone, Debug, PartialEq)]
pub struct Model {
    pub weights: Vector,
    pub bias: f64,
}

impl Model {

    pub fn zeros(dimensions: usize) -> Self {
        Model { weights: vec![0.0; dimensions], bias: 0.0 }
    }

    /// `y (w·x + b)`, at least one for correctly classified points outside the margin.
    pub fn margin(&self, example: &[f64], label: f64) -> f64 {
        label * (utils::dot(&self.weights, example) + self.bias)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SvmParameters {
    /// Examples per gradient step, 1 gives plain SGD. Ignored by full batch descent.
    pub batch_size: usize,
    /// Learning rate.
    pub eta: f64,
    /// Stop once the (smoothed) relative objective change in percent drops below this value.
    pub eps: f64,
    /// Weight of the hinge loss against the regularizer.
    pub c: u32,
    /// Safety cap, the last iterate is returned when it is hit.
    pub max_iterations: usize,
    /// Seeds the permutation of the training examples.
    pub seed: u32,
}

impl SvmParameters {

    pub fn batch() -> Self {
        SvmParameters { batch_size: 1, eta: 3e-7, eps: 0.25, ..SvmParameters::mini_batch() }
    }

    pub fn sgd() -> Self {
        SvmParameters { batch_size: 1, eta: 1e-4, eps: 1e-3, ..SvmParameters::mini_batch() }
    }

    pub fn mini_batch() -> Self {
        SvmParameters {
            batch_size: 20,
            eta: 1e-5,
            eps: 1e-2,
            c: 100,
            max_iterations: 100_000,
            seed: 42,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(MiningError::invalid_parameter("batch_size", "must be at least 1"));
        }
        if !(self.eta > 0.0) || !self.eta.is_finite() {
            return Err(MiningError::invalid_parameter("eta", format!("{} is not a positive rate", self.eta)));
        }
        if self.max_iterations == 0 {
            return Err(MiningError::invalid_parameter("max_iterations", "must be at least 1"));
        }
        Ok(())
    }
}

impl Default for SvmParameters {
    fn default() -> Self {
        SvmParameters::mini_batch()
    }
}

/// `max(0, 1 - y (w·x + b))`
pub fn hinge(model: &Model, example: &[f64], label: f64) -> f64 {
    let loss = 1.0 - model.margin(example, label);
    if loss > 0.0 { loss } else { 0.0 }
}

/// `½‖w‖² + C Σ hinge` over the whole dataset.
pub fn objective(model: &Model, dataset: &Dataset, c: u32) -> f64 {
    let regularizer = 0.5 * utils::dot(&model.weights, &model.weights);

    let loss: f64 = dataset.features.iter()
        .zip(dataset.labels.iter())
        .map(|(example, label)| hinge(model, example, *label))
        .sum();

    regularizer + c as f64 * loss
}

/// Subgradient of the objective with respect to `w`, restricted to the examples in `batch`.
pub fn weight_gradient(model: &Model, dataset: &Dataset, batch: &[usize], c: u32) -> Vector {

    let mut violations = vec![0.0; model.weights.len()];

    for &index in batch {
        let example = &dataset.features[index];
        let label = dataset.labels[index];

        if model.margin(example, label) < 1.0 {
            for (sum, value) in violations.iter_mut().zip(example.iter()) {
                *sum += -label * value;
            }
        }
    }

    model.weights.iter()
        .zip(violations.iter())
        .map(|(weight, sum)| weight + c as f64 * sum)
        .collect()
}

pub fn bias_gradient(model: &Model, dataset: &Dataset, batch: &[usize], c: u32) -> f64 {

    let violations: f64 = batch.iter()
        .filter(|&&index| model.margin(&dataset.features[index], dataset.labels[index]) < 1.0)
        .map(|&index| -dataset.labels[index])
        .sum();

    c as f64 * violations
}

/// Relative change of the objective in percent, zero when the previous value was zero.
pub fn relative_change(previous: f64, current: f64) -> f64 {
    if previous == 0.0 {
        0.0
    } else {
        (previous - current).abs() * 100.0 / previous
    }
}

/// Fraction of examples on the wrong side of the hyperplane, points exactly on it count as correct.
pub fn classification_error(model: &Model, dataset: &Dataset) -> f64 {
    let errors = dataset.features.iter()
        .zip(dataset.labels.iter())
        .filter(|&(example, label)| model.margin(example, *label) < 0.0)
        .count();

    errors as f64 / dataset.len() as f64
}

/// Diagnostics of a single gradient step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepRecord {
    pub k: usize,
    pub objective: f64,
    pub delta: f64,
    pub ini: usize,
    pub end: usize,
    pub bias: f64,
    pub squared_norm: f64,
}

impl fmt::Display for StepRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "K: {} | FK: {:.4} | Delta: {:.4} | ini: {} | end: {} | b: {:.4} | |w|^2: {:.4}",
            self.k, self.objective, self.delta, self.ini, self.end, self.bias, self.squared_norm)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TrainingReport {
    pub model: Model,
    pub iterations: usize,
    pub converged: bool,
    pub trace: Vec<StepRecord>,
}

pub struct Trainer {
    parameters: SvmParameters,
    interrupt: Interrupt,
}

impl Trainer {

    pub fn new(parameters: SvmParameters) -> Self {
        Trainer { parameters, interrupt: Interrupt::new() }
    }

    /// Stops after the current step once the interrupt is triggered.
    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    pub fn parameters(&self) -> &SvmParameters {
        &self.parameters
    }

    /// Every step looks at all examples in their original order, the raw relative change is
    /// compared against `eps`.
    pub fn batch_gradient_descent(&self, dataset: &Dataset) -> Result<TrainingReport> {
        self.parameters.validate()?;

        let order: Vec<usize> = (0..dataset.len()).collect();
        self.descend(dataset, &order, dataset.len(), false)
    }

    /// Steps over consecutive windows of `batch_size` examples of a seeded permutation, cycling
    /// through the windows. The relative change is smoothed before it is compared against `eps`.
    pub fn mini_batch_gradient_descent(&self, dataset: &Dataset) -> Result<TrainingReport> {
        self.parameters.validate()?;

        let mut order: Vec<usize> = (0..dataset.len()).collect();
        let mut rng = XorShiftRng::from_seed(
            [self.parameters.seed, 0x2f6b_1c3d, 0x8e1d_99a7, 0x5bd1_e995]);
        rng.shuffle(&mut order);

        self.descend(dataset, &order, self.parameters.batch_size, true)
    }

    fn descend(&self, dataset: &Dataset, order: &[usize], batch_size: usize, smoothed: bool)
        -> Result<TrainingReport> {

        let parameters = &self.parameters;
        let num_examples = dataset.len();
        let num_batches = (num_examples + batch_size - 1) / batch_size;

        let start = Instant::now();

        let mut model = Model::zeros(dataset.dimensions());
        let mut previous_objective = objective(&model, dataset, parameters.c);
        let mut previous_delta = 0.0;

        let mut trace: Vec<StepRecord> = Vec::new();
        let mut converged = false;
        let mut batch_index = 0;

        while trace.len() < parameters.max_iterations {

            if self.interrupt.is_triggered() {
                warn!("Interrupted after {} steps", trace.len());
                break;
            }

            let ini = batch_index * batch_size;
            let end = ::std::cmp::min(num_examples, (batch_index + 1) * batch_size);
            let batch = &order[ini..end];

            let weights: Vector = model.weights.iter()
                .zip(weight_gradient(&model, dataset, batch, parameters.c).iter())
                .map(|(weight, gradient)| weight - parameters.eta * gradient)
                .collect();
            model.weights = weights;

            model.bias -= parameters.eta * bias_gradient(&model, dataset, batch, parameters.c);

            batch_index = (batch_index + 1) % num_batches;

            let current_objective = objective(&model, dataset, parameters.c);
            if !current_objective.is_finite() {
                return Err(MiningError::invariant(Phase::Train, format!(
                    "objective diverged at step {}, eta {} is too large", trace.len(), parameters.eta)));
            }

            let change = relative_change(previous_objective, current_objective);
            let delta = if smoothed { 0.5 * previous_delta + 0.5 * change } else { change };

            let record = StepRecord {
                k: trace.len(),
                objective: current_objective,
                delta,
                ini,
                end,
                bias: model.bias,
                squared_norm: utils::dot(&model.weights, &model.weights),
            };
            debug!("{}", record);
            trace.push(record);

            previous_objective = current_objective;
            previous_delta = delta;

            if delta < parameters.eps {
                converged = true;
                break;
            }
        }

        if !converged {
            warn!("Stopped after {} steps without reaching eps {}", trace.len(), parameters.eps);
        }

        info!("{} ms training time, {} steps", utils::to_millis(start.elapsed()), trace.len());

        Ok(TrainingReport { model, iterations: trace.len(), converged, trace })
    }
}

/// Test error for a single value of `C`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SweepResult {
    pub c: u32,
    pub error: f64,
}

impl fmt::Display for SweepResult {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "C: {} | Perc. Error: {:.2}", self.c, self.error)
    }
}

/// Trains one stochastic (batch size 1) model per value of `C` on `train` and evaluates it on
/// `test`. All other settings come from `base`.
pub fn regularization_sweep(
    train: &Dataset,
    test: &Dataset,
    base: &SvmParameters,
    c_values: &[u32],
) -> Result<Vec<SweepResult>> {

    if train.dimensions() != test.dimensions() {
        return Err(MiningError::invariant(Phase::Load, format!(
            "training data has {} features, test data {}", train.dimensions(), test.dimensions())));
    }

    c_values.iter()
        .map(|&c| {
            let parameters = SvmParameters { batch_size: 1, c, ..base.clone() };
            let report = Trainer::new(parameters).mini_batch_gradient_descent(train)?;
            let result = SweepResult { c, error: classification_error(&report.model, test) };
            info!("{}", result);
            Ok(result)
        })
        .collect()
}
