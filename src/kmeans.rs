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
use std::fs;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use config::KMeansConfig;
use error::{MiningError, Phase, Result};
use io;
use io::Separator;
use mapreduce::{Harness, MapContext};
use types::Vector;
use utils;
use utils::Interrupt;

/// Index and squared distance of the closest centroid, ties go to the centroid listed first.
pub fn nearest_centroid(point: &[f64], centroids: &[Vector]) -> Option<(usize, f64)> {

    let mut nearest: Option<(usize, f64)> = None;

    for (index, centroid) in centroids.iter().enumerate() {
        let distance = utils::squared_distance(centroid, point);

        let closer = match nearest {
            Some((_, best)) => distance < best,
            None => true,
        };

        if closer {
            nearest = Some((index, distance));
        }
    }

    nearest
}

/// The points assigned to one centroid during an iteration.
#[derive(Clone, Debug, PartialEq)]
pub struct Cluster {
    pub index: usize,
    pub mean: Vector,
    pub members: Vec<Vector>,
}

/// Result of one assign + update round.
#[derive(Clone, Debug, PartialEq)]
pub struct LloydStep {
    pub cost: f64,
    pub centroids: Vec<Vector>,
    pub clusters: Vec<Cluster>,
}

/// One Lloyd iteration: assign every point to its nearest centroid (map) and move every centroid
/// to the mean of its points (reduce). Centroids without points keep their position.
pub fn lloyd_step<H: Harness>(harness: &H, points: &[Vector], centroids: &[Vector])
    -> Result<LloydStep> {

    let dimensions = check_dimensions(points, centroids)?;

    let assigned = harness.run_map(points, Phase::Assign,
        |point: &Vector, context: &mut MapContext<usize, Vector, f64>| {
            let (index, distance) = nearest_centroid(point, centroids)
                .ok_or_else(|| MiningError::invalid_parameter("centroids", "no centroids given"))?;

            *context.accumulator() += distance;
            context.emit(index, point.clone());
            Ok(())
        })?;

    let cost = assigned.accumulator;

    let clusters = harness.shuffle_reduce(assigned.emissions, Phase::Update,
        |index: &usize, members: &[Vector]| {
            let mean = utils::mean(members.iter(), dimensions)
                .ok_or_else(|| MiningError::invariant(Phase::Update,
                    format!("centroid {} received an empty group", index)))?;

            Ok(Cluster { index: *index, mean, members: members.to_vec() })
        })?;

    let mut next_centroids: Vec<Vector> = centroids.to_vec();
    let mut updated = vec![false; centroids.len()];

    for cluster in clusters.iter() {
        next_centroids[cluster.index] = cluster.mean.clone();
        updated[cluster.index] = true;
    }

    for (index, was_updated) in updated.iter().enumerate() {
        if !was_updated {
            warn!("Centroid {} received no points, keeping its previous position", index);
        }
    }

    Ok(LloydStep { cost, centroids: next_centroids, clusters })
}

fn check_dimensions(points: &[Vector], centroids: &[Vector]) -> Result<usize> {

    let dimensions = match centroids.first() {
        Some(centroid) => centroid.len(),
        None => return Err(MiningError::invalid_parameter("centroids", "at least one centroid is required")),
    };

    if let Some(centroid) = centroids.iter().find(|centroid| centroid.len() != dimensions) {
        return Err(MiningError::invariant(Phase::Assign, format!(
            "centroids of different dimensions {} and {}", dimensions, centroid.len())));
    }

    if let Some(point) = points.iter().find(|point| point.len() != dimensions) {
        return Err(MiningError::invariant(Phase::Assign, format!(
            "point of dimension {} for centroids of dimension {}", point.len(), dimensions)));
    }

    Ok(dimensions)
}

/// One line of the cost log.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IterationCost {
    pub iteration: usize,
    pub cost: f64,
}

impl fmt::Display for IterationCost {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Iteration: {} Cost: {}", self.iteration, utils::format_float(self.cost))
    }
}

/// A point together with the centroid it was assigned to in the last iteration.
#[derive(Clone, Debug, PartialEq)]
pub struct Assignment {
    pub centroid: Vector,
    pub point: Vector,
}

impl fmt::Display for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}\t{}", utils::format_vector(&self.centroid), utils::format_vector(&self.point))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct KMeansOutcome {
    pub centroids: Vec<Vector>,
    pub cost_log: Vec<IterationCost>,
    pub assignments: Vec<Assignment>,
}

/// Where the centroids live between iterations.
pub trait CentroidStore {
    fn load(&self) -> Result<Vec<Vector>>;
    fn replace(&mut self, centroids: &[Vector]) -> Result<()>;
}

impl CentroidStore for Vec<Vector> {

    fn load(&self) -> Result<Vec<Vector>> {
        Ok(self.clone())
    }

    fn replace(&mut self, centroids: &[Vector]) -> Result<()> {
        *self = centroids.to_vec();
        Ok(())
    }
}

/// Centroids persisted in a text file, one vector per line. Replacing the centroids moves the
/// previous file to a `.old` backup first.
pub struct CentroidFile {
    path: PathBuf,
}

impl CentroidFile {

    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        CentroidFile { path: path.as_ref().to_path_buf() }
    }

    pub fn backup_path(&self) -> PathBuf {
        let mut backup = self.path.clone().into_os_string();
        backup.push(".old");
        PathBuf::from(backup)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

impl CentroidStore for CentroidFile {

    fn load(&self) -> Result<Vec<Vector>> {
        let file = File::open(&self.path)
            .map_err(|err| MiningError::io(Phase::Persist, self.describe(), err))?;
        io::vectors_from(::std::io::BufReader::new(file), Separator::Whitespace, Phase::Persist)
    }

    fn replace(&mut self, centroids: &[Vector]) -> Result<()> {

        let backup = self.backup_path();

        if backup.exists() {
            fs::remove_file(&backup)
                .map_err(|err| MiningError::io(Phase::Persist, backup.display().to_string(), err))?;
        }

        if self.path.exists() {
            fs::rename(&self.path, &backup)
                .map_err(|err| MiningError::io(Phase::Persist, self.describe(), err))?;
        }

        let file = File::create(&self.path)
            .map_err(|err| MiningError::io(Phase::Persist, self.describe(), err))?;
        let mut out = BufWriter::new(file);

        for centroid in centroids {
            writeln!(out, "{}", utils::format_vector(centroid))
                .map_err(|err| MiningError::io(Phase::Persist, self.describe(), err))?;
        }

        out.flush().map_err(|err| MiningError::io(Phase::Persist, self.describe(), err))
    }
}

/// Append-only log with one cost line per iteration.
pub struct CostLog {
    path: PathBuf,
}

impl CostLog {

    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        CostLog { path: path.as_ref().to_path_buf() }
    }

    /// Removes the log of a previous run.
    pub fn reset(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)
                .map_err(|err| MiningError::io(Phase::Persist, self.path.display().to_string(), err))?;
        }
        Ok(())
    }

    pub fn append(&self, cost: &IterationCost) -> Result<()> {
        let describe = || self.path.display().to_string();

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|err| MiningError::io(Phase::Persist, describe(), err))?;

        writeln!(file, "{}", cost).map_err(|err| MiningError::io(Phase::Persist, describe(), err))
    }
}

/// Lloyd's algorithm for a fixed number of iterations.
pub struct KMeans {
    config: KMeansConfig,
    interrupt: Interrupt,
}

impl KMeans {

    pub fn new(config: KMeansConfig) -> Self {
        KMeans { config, interrupt: Interrupt::new() }
    }

    /// Stops after the current iteration once the interrupt is triggered.
    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// Refines `initial_centroids` in memory.
    pub fn run<H: Harness>(&self, harness: &H, points: &[Vector], initial_centroids: &[Vector])
        -> Result<KMeansOutcome> {

        let mut store: Vec<Vector> = initial_centroids.to_vec();
        self.run_with_store(harness, points, &mut store, |_| Ok(()))
    }

    /// Reads and replaces the centroids in `centroid_file` every iteration and appends the costs
    /// to `cost_log`, which is reset first.
    pub fn run_persisted<H: Harness>(
        &self,
        harness: &H,
        points: &[Vector],
        centroid_file: &mut CentroidFile,
        cost_log: &CostLog,
    ) -> Result<KMeansOutcome> {

        cost_log.reset()?;
        self.run_with_store(harness, points, centroid_file, |cost| cost_log.append(cost))
    }

    pub fn run_with_store<H, S, F>(
        &self,
        harness: &H,
        points: &[Vector],
        store: &mut S,
        mut on_iteration: F,
    ) -> Result<KMeansOutcome>
        where H: Harness, S: CentroidStore, F: FnMut(&IterationCost) -> Result<()> {

        let mut cost_log: Vec<IterationCost> = Vec::with_capacity(self.config.max_iterations);
        let mut assignments: Vec<Assignment> = Vec::new();

        for iteration in 0..self.config.max_iterations {

            if self.interrupt.is_triggered() {
                warn!("Interrupted before iteration {}", iteration);
                break;
            }

            let start = Instant::now();
            let centroids = store.load()?;
            let step = lloyd_step(harness, points, &centroids)?;

            let cost = IterationCost { iteration, cost: step.cost };
            info!("{} ({}ms)", cost, utils::to_millis(start.elapsed()));

            on_iteration(&cost)?;
            cost_log.push(cost);

            store.replace(&step.centroids)?;

            assignments = step.clusters.into_iter()
                .flat_map(|cluster| {
                    let centroid = centroids[cluster.index].clone();
                    cluster.members.into_iter()
                        .map(move |point| Assignment { centroid: centroid.clone(), point })
                })
                .collect();
        }

        Ok(KMeansOutcome { centroids: store.load()?, cost_log, assignments })
    }
}
