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

use std::cmp;
use std::fmt;
use std::io::BufRead;
use std::time::Instant;

use rand::{Rng, SeedableRng, XorShiftRng};

use config::FactorsConfig;
use error::{MiningError, Phase, Result};
use io;
use types::Vector;
use utils;
use utils::Interrupt;

pub const SWEEP_RANKS: [usize; 10] = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10];
pub const SWEEP_LAMBDAS: [f64; 2] = [0.0, 0.2];

/// A rating of an item by a user, both as zero-based indexes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rating {
    pub user: usize,
    pub item: usize,
    pub value: f64,
}

fn parse_index(token: &str, what: &str, line: usize) -> Result<usize> {
    match token.parse::<usize>() {
        Ok(id) if id > 0 => Ok(id - 1),
        Ok(_) => Err(MiningError::malformed(Phase::Ratings, line, format!("{} ids start at 1", what))),
        Err(err) => Err(MiningError::malformed(Phase::Ratings, line,
            format!("'{}' is not a {} id: {}", token, what, err))),
    }
}

/// Reads `user item rating` lines, ids start at 1.
pub fn ratings_from<R: BufRead>(reader: R) -> Result<Vec<Rating>> {

    let mut ratings = Vec::new();

    for record in io::numbered_lines(reader, Phase::Ratings) {
        let (line_number, line) = record?;
        let tokens: Vec<&str> = io::tokens(&line).collect();

        match tokens.len() {
            0 => continue,
            3 => ratings.push(Rating {
                user: parse_index(tokens[0], "user", line_number)?,
                item: parse_index(tokens[1], "item", line_number)?,
                value: io::parse_float(tokens[2], Phase::Ratings, line_number)?,
            }),
            found => return Err(MiningError::malformed(Phase::Ratings, line_number,
                format!("expected user, item and rating, found {} fields", found))),
        }
    }

    Ok(ratings)
}

pub fn read_ratings(path: &str) -> Result<Vec<Rating>> {
    ratings_from(io::open(path, Phase::Ratings)?)
}

/// Number of users and items, taken from the largest ids that were rated.
pub fn dimensions(ratings: &[Rating]) -> (usize, usize) {
    ratings.iter().fold((0, 0), |(users, items), rating| {
        (cmp::max(users, rating.user + 1), cmp::max(items, rating.item + 1))
    })
}

/// Latent factors of every user (`P`) and every item (`Q`), a rating is predicted as `q . p`.
#[derive(Clone, Debug, PartialEq)]
pub struct Factors {
    pub users: Vec<Vector>,
    pub items: Vec<Vector>,
}

impl Factors {

    /// Every entry is drawn uniformly from `[0, sqrt(5 / k))`.
    pub fn random<R: Rng>(num_users: usize, num_items: usize, k: usize, rng: &mut R) -> Self {
        let max_value = (5.0 / k as f64).sqrt();

        let mut draw = |count: usize| -> Vec<Vector> {
            (0..count)
                .map(|_| (0..k).map(|_| max_value * rng.next_f64()).collect())
                .collect()
        };

        let users = draw(num_users);
        let items = draw(num_items);

        Factors { users, items }
    }

    pub fn predict(&self, user: usize, item: usize) -> f64 {
        utils::dot(&self.items[item], &self.users[user])
    }

    fn check_coverage(&self, ratings: &[Rating]) -> Result<()> {
        for rating in ratings.iter() {
            if rating.user >= self.users.len() || rating.item >= self.items.len() {
                return Err(MiningError::invariant(Phase::Factorize, format!(
                    "user {} or item {} has no factors, there are {} users and {} items",
                    rating.user + 1, rating.item + 1, self.users.len(), self.items.len())));
            }
        }

        Ok(())
    }

    /// Sum of squared prediction errors.
    pub fn squared_error(&self, ratings: &[Rating]) -> Result<f64> {
        self.check_coverage(ratings)?;

        Ok(ratings.iter()
            .map(|rating| {
                let error = rating.value - self.predict(rating.user, rating.item);
                error * error
            })
            .sum())
    }

    /// Squared error plus `lambda` times the squared norms of all user and item factors.
    pub fn regularized_error(&self, ratings: &[Rating], lambda: f64) -> Result<f64> {
        let norms: f64 = self.users.iter()
            .chain(self.items.iter())
            .map(|factors| utils::dot(factors, factors))
            .sum();

        Ok(self.squared_error(ratings)? + lambda * norms)
    }
}

/// One pass over the ratings in their order. Each step updates the user and the item factors
/// from their values before the step.
pub fn sgd_epoch(factors: &mut Factors, ratings: &[Rating], eta: f64, lambda: f64) -> Result<()> {
    factors.check_coverage(ratings)?;

    for rating in ratings.iter() {
        let error = rating.value - factors.predict(rating.user, rating.item);

        let (user_factors, item_factors): (Vector, Vector) = factors.users[rating.user].iter()
            .zip(factors.items[rating.item].iter())
            .map(|(p, q)| (p + eta * (error * q - lambda * p), q + eta * (error * p - lambda * q)))
            .unzip();

        factors.users[rating.user] = user_factors;
        factors.items[rating.item] = item_factors;
    }

    Ok(())
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IterationError {
    pub k: usize,
    pub iteration: usize,
    pub error: f64,
}

impl fmt::Display for IterationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "K: {} | Iteration: {} | Error: {:.4}", self.k, self.iteration, self.error)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FactorizationReport {
    pub factors: Factors,
    /// Regularized error after every pass.
    pub errors: Vec<IterationError>,
}

pub struct Factorizer {
    config: FactorsConfig,
    interrupt: Interrupt,
}

impl Factorizer {

    pub fn new(config: FactorsConfig) -> Self {
        Factorizer { config, interrupt: Interrupt::new() }
    }

    /// Stops after the current pass once the interrupt is triggered.
    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    pub fn config(&self) -> &FactorsConfig {
        &self.config
    }

    fn validate(&self) -> Result<()> {
        let config = &self.config;

        if config.k == 0 {
            return Err(MiningError::invalid_parameter("k", "at least one factor is needed"));
        }
        if !(config.eta > 0.0 && config.eta.is_finite()) {
            return Err(MiningError::invalid_parameter("eta", format!("{} is not positive", config.eta)));
        }
        if !(config.lambda >= 0.0 && config.lambda.is_finite()) {
            return Err(MiningError::invalid_parameter("lambda",
                format!("{} is not a finite non-negative weight", config.lambda)));
        }

        Ok(())
    }

    /// Sizes the factors after the largest ids in `ratings`.
    pub fn fit(&self, ratings: &[Rating]) -> Result<FactorizationReport> {
        self.validate()?;

        if ratings.is_empty() {
            return Err(MiningError::invalid_parameter("ratings", "no ratings given"));
        }

        let config = &self.config;
        let start = Instant::now();

        let mut rng = XorShiftRng::from_seed([config.seed, 0x9e37_79b9, 0x85eb_ca6b, 0xc2b2_ae35]);
        let (num_users, num_items) = dimensions(ratings);
        let mut factors = Factors::random(num_users, num_items, config.k, &mut rng);

        let mut errors: Vec<IterationError> = Vec::with_capacity(config.iterations);

        for iteration in 0..config.iterations {

            if self.interrupt.is_triggered() {
                warn!("Interrupted after {} passes", iteration);
                break;
            }

            sgd_epoch(&mut factors, ratings, config.eta, config.lambda)?;

            let error = factors.regularized_error(ratings, config.lambda)?;
            if !error.is_finite() {
                return Err(MiningError::invariant(Phase::Factorize, format!(
                    "error diverged in pass {}, eta {} is too large", iteration, config.eta)));
            }

            let record = IterationError { k: config.k, iteration, error };
            debug!("{}", record);
            errors.push(record);
        }

        info!("{} ms for {} passes over {} ratings with k = {}", utils::to_millis(start.elapsed()),
            errors.len(), ratings.len(), config.k);

        Ok(FactorizationReport { factors, errors })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Split {
    Training,
    Test,
}

/// Unregularized squared error of a model trained with `k` factors and weight `lambda`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SweepResult {
    pub split: Split,
    pub k: usize,
    pub lambda: f64,
    pub error: f64,
}

impl fmt::Display for SweepResult {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let label = match self.split {
            Split::Training => "Etr",
            Split::Test => "Ete",
        };
        write!(f, "{}: {}|{}|{:.4}", label, self.k, utils::format_float(self.lambda), self.error)
    }
}

/// Trains one model per combination of `ranks` and `lambdas`, the other settings come from `base`.
pub fn sweep(
    train: &[Rating],
    test: &[Rating],
    base: &FactorsConfig,
    ranks: &[usize],
    lambdas: &[f64],
) -> Result<Vec<SweepResult>> {

    let mut results = Vec::with_capacity(ranks.len() * lambdas.len() * 2);

    for k in ranks.iter() {
        for lambda in lambdas.iter() {
            let config = FactorsConfig { k: *k, lambda: *lambda, ..base.clone() };
            let report = Factorizer::new(config).fit(train)?;

            let training = SweepResult {
                split: Split::Training,
                k: *k,
                lambda: *lambda,
                error: report.factors.squared_error(train)?,
            };
            let test = SweepResult { split: Split::Test, error: report.factors.squared_error(test)?, ..training };

            info!("{} {}", training, test);
            results.push(training);
            results.push(test);
        }
    }

    Ok(results)
}

#[cfg(test)]
mod tests {

    use rand::{SeedableRng, XorShiftRng};

    use config::FactorsConfig;
    use error::{MiningError, Phase};
    use factors;
    use factors::{Factorizer, Factors, Rating, Split};

    fn close_enough_to(value: f64, expected: f64) -> bool {
        (value - expected).abs() < 1e-9
    }

    fn ratings() -> Vec<Rating> {
        factors::ratings_from("1 1 5\n1 2 3\n2 1 4\n2 3 1\n3 2 2\n3 3 5\n4 1 3\n".as_bytes())
            .unwrap()
    }

    #[test]
    fn parsing() {
        let ratings = factors::ratings_from("1 1 5\n\n2 3 4.5\n".as_bytes()).unwrap();

        assert_eq!(ratings, vec![
            Rating { user: 0, item: 0, value: 5.0 },
            Rating { user: 1, item: 2, value: 4.5 },
        ]);
        assert_eq!(factors::dimensions(&ratings), (2, 3));

        for input in &["1 1 5\n1 1\n", "1 1 5\n0 1 3\n", "1 1 5\n1 x 3\n", "1 1 5\n1 1 inf\n"] {
            match factors::ratings_from(input.as_bytes()) {
                Err(MiningError::MalformedRecord { phase, line, .. }) => {
                    assert_eq!(phase, Phase::Ratings);
                    assert_eq!(line, 2);
                },
                other => panic!("unexpected result {:?} for {:?}", other, input),
            }
        }
    }

    #[test]
    fn random_factors_are_bounded() {
        let mut rng = XorShiftRng::from_seed([1, 2, 3, 4]);
        let factors = Factors::random(5, 7, 4, &mut rng);

        assert_eq!(factors.users.len(), 5);
        assert_eq!(factors.items.len(), 7);

        let max_value = (5.0f64 / 4.0).sqrt();
        for value in factors.users.iter().chain(factors.items.iter()).flat_map(|f| f.iter()) {
            assert!(*value >= 0.0 && *value < max_value);
        }
    }

    #[test]
    fn one_step_uses_the_old_factors() {
        let mut factors = Factors { users: vec![vec![1.0]], items: vec![vec![2.0]] };
        let ratings = vec![Rating { user: 0, item: 0, value: 5.0 }];

        assert!(close_enough_to(factors.regularized_error(&ratings, 0.5).unwrap(), 11.5));

        factors::sgd_epoch(&mut factors, &ratings, 0.1, 0.5).unwrap();

        assert!(close_enough_to(factors.users[0][0], 1.55));
        assert!(close_enough_to(factors.items[0][0], 2.2));
    }

    #[test]
    fn ratings_without_factors_are_rejected() {
        let factors = Factors { users: vec![vec![1.0]], items: vec![vec![2.0]] };
        let ratings = vec![Rating { user: 0, item: 1, value: 5.0 }];

        match factors.squared_error(&ratings) {
            Err(MiningError::InvariantViolation { phase, .. }) => assert_eq!(phase, Phase::Factorize),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn training_lowers_the_error() {
        let config = FactorsConfig { k: 2, lambda: 0.0, ..FactorsConfig::default() };
        let report = Factorizer::new(config.clone()).fit(&ratings()).unwrap();

        assert_eq!(report.errors.len(), 40);
        assert!(report.errors[39].error < report.errors[0].error);
        assert_eq!(report.factors.users.len(), 4);
        assert_eq!(report.factors.items.len(), 3);

        let again = Factorizer::new(config).fit(&ratings()).unwrap();
        assert_eq!(report, again);
    }

    #[test]
    fn diverging_training_is_an_error() {
        let config = FactorsConfig { k: 2, eta: 10.0, ..FactorsConfig::default() };

        match Factorizer::new(config).fit(&ratings()) {
            Err(MiningError::InvariantViolation { phase, .. }) => assert_eq!(phase, Phase::Factorize),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn invalid_settings() {
        let ratings = ratings();

        assert!(Factorizer::new(FactorsConfig { k: 0, ..FactorsConfig::default() }).fit(&ratings).is_err());
        assert!(Factorizer::new(FactorsConfig { eta: 0.0, ..FactorsConfig::default() }).fit(&ratings).is_err());
        assert!(Factorizer::new(FactorsConfig { lambda: -1.0, ..FactorsConfig::default() }).fit(&ratings).is_err());
        assert!(Factorizer::new(FactorsConfig::default()).fit(&[]).is_err());
    }

    #[test]
    fn sweep_reports_training_and_test_error() {
        let train = ratings();
        let test = factors::ratings_from("1 3 4\n4 2 2\n".as_bytes()).unwrap();
        let base = FactorsConfig { iterations: 5, ..FactorsConfig::default() };

        let results = factors::sweep(&train, &test, &base, &[1, 2], &factors::SWEEP_LAMBDAS).unwrap();

        assert_eq!(results.len(), 8);
        assert_eq!(results[0].split, Split::Training);
        assert_eq!(results[1].split, Split::Test);
        assert!(results[0].to_string().starts_with("Etr: 1|0.0|"));
        assert!(results[3].to_string().starts_with("Ete: 1|0.2|"));

        let unknown_user = factors::ratings_from("9 1 4\n".as_bytes()).unwrap();
        assert!(factors::sweep(&train, &unknown_user, &base, &[1], &[0.0]).is_err());
    }
}
