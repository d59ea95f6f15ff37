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

use config::SimRankConfig;
use error::{MiningError, Result};
use graph::Edge;

/// A bipartite graph whose edges lead from the nodes on the left to the nodes on the right.
#[derive(Clone, Debug, PartialEq)]
pub struct Bipartite {
    out_links: Vec<Vec<usize>>,
    in_links: Vec<Vec<usize>>,
}

impl Bipartite {

    /// Sources are left nodes and targets are right nodes, each side numbered on its own.
    pub fn from_edges(edges: &[Edge]) -> Self {

        let (num_left, num_right) = edges.iter().fold((0, 0), |(left, right), edge| {
            (cmp::max(left, edge.source + 1), cmp::max(right, edge.target + 1))
        });

        let mut out_links: Vec<Vec<usize>> = vec![Vec::new(); num_left];
        let mut in_links: Vec<Vec<usize>> = vec![Vec::new(); num_right];

        for edge in edges.iter() {
            out_links[edge.source].push(edge.target);
            in_links[edge.target].push(edge.source);
        }

        for links in out_links.iter_mut().chain(in_links.iter_mut()) {
            links.sort();
            links.dedup();
        }

        Bipartite { out_links, in_links }
    }

    pub fn num_left(&self) -> usize {
        self.out_links.len()
    }

    pub fn num_right(&self) -> usize {
        self.in_links.len()
    }
}

pub type Matrix = Vec<Vec<f64>>;

fn identity(size: usize) -> Matrix {
    (0..size)
        .map(|row| (0..size).map(|column| if row == column { 1.0 } else { 0.0 }).collect())
        .collect()
}

/// Pairwise similarities of the left nodes and of the right nodes. Both matrices are symmetric
/// with a unit diagonal.
#[derive(Clone, Debug, PartialEq)]
pub struct Similarities {
    pub left: Matrix,
    pub right: Matrix,
}

impl Similarities {
    pub fn identity(graph: &Bipartite) -> Self {
        Similarities { left: identity(graph.num_left()), right: identity(graph.num_right()) }
    }
}

// s(i, j) = decay / (|N(i)| |N(j)|) * sum of s'(a, b) over the neighbours a of i and b of j
fn similarities(neighbours: &[Vec<usize>], other_side: &Matrix, decay: f64) -> Matrix {

    let size = neighbours.len();
    let mut matrix = identity(size);

    for i in 0..size {
        for j in (i + 1)..size {
            let (of_i, of_j) = (&neighbours[i], &neighbours[j]);
            if of_i.is_empty() || of_j.is_empty() {
                continue;
            }

            let sum: f64 = of_i.iter()
                .flat_map(|a| of_j.iter().map(move |b| other_side[*a][*b]))
                .sum();

            let similarity = decay / (of_i.len() * of_j.len()) as f64 * sum;
            matrix[i][j] = similarity;
            matrix[j][i] = similarity;
        }
    }

    matrix
}

/// Left nodes are similar if they link to similar right nodes, right nodes are similar if they
/// are linked from similar left nodes. Both sides are computed from `previous`.
pub fn step(graph: &Bipartite, previous: &Similarities, decay: f64) -> Similarities {
    Similarities {
        left: similarities(&graph.out_links, &previous.right, decay),
        right: similarities(&graph.in_links, &previous.left, decay),
    }
}

/// The similarities after every iteration, starting from the identity.
pub fn simrank(graph: &Bipartite, config: &SimRankConfig) -> Result<Vec<Similarities>> {

    if !(config.decay > 0.0 && config.decay <= 1.0) {
        return Err(MiningError::invalid_parameter("decay", format!("{} is not in (0, 1]", config.decay)));
    }

    let mut iterations: Vec<Similarities> = Vec::with_capacity(config.iterations);
    let mut current = Similarities::identity(graph);

    for iteration in 0..config.iterations {
        current = step(graph, &current, config.decay);
        debug!("Iteration {} done", iteration + 1);
        iterations.push(current.clone());
    }

    Ok(iterations)
}

fn write_matrix(f: &mut fmt::Formatter, matrix: &Matrix) -> fmt::Result {
    for row in matrix.iter() {
        let values: Vec<String> = row.iter().map(|value| format!("{:.3}", value)).collect();
        writeln!(f, "{}", values.join(" "))?;
    }
    Ok(())
}

impl fmt::Display for Similarities {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Sa:")?;
        write_matrix(f, &self.left)?;
        writeln!(f, "Sb:")?;
        write_matrix(f, &self.right)
    }
}

#[cfg(test)]
mod tests {

    use config::SimRankConfig;
    use graph::Edge;
    use simrank;
    use simrank::Bipartite;

    fn close_enough_to(value: f64, expected: f64) -> bool {
        (value - expected).abs() < 1e-9
    }

    fn complete(num_left: usize, num_right: usize) -> Bipartite {
        let mut edges = Vec::new();
        for source in 0..num_left {
            for target in 0..num_right {
                edges.push(Edge { source, target });
            }
        }
        Bipartite::from_edges(&edges)
    }

    #[test]
    fn complete_two_by_two() {
        let iterations = simrank::simrank(&complete(2, 2), &SimRankConfig::default()).unwrap();
        assert_eq!(iterations.len(), 3);

        for (similarities, expected) in iterations.iter().zip([0.4, 0.56, 0.624].iter()) {
            for matrix in [&similarities.left, &similarities.right].iter() {
                assert!(close_enough_to(matrix[0][0], 1.0));
                assert!(close_enough_to(matrix[1][1], 1.0));
                assert!(close_enough_to(matrix[0][1], *expected));
                assert!(close_enough_to(matrix[1][0], *expected));
            }
        }

        assert_eq!(iterations[0].to_string(), "Sa:\n1.000 0.400\n0.400 1.000\nSb:\n1.000 0.400\n0.400 1.000\n");
    }

    #[test]
    fn common_neighbour() {
        let iterations = simrank::simrank(&complete(2, 1), &SimRankConfig::default()).unwrap();
        let last = iterations.last().unwrap();

        assert!(close_enough_to(last.left[0][1], 0.8));
        assert_eq!(last.right, vec![vec![1.0]]);
    }

    #[test]
    fn nodes_without_neighbours_are_only_similar_to_themselves() {
        let graph = Bipartite::from_edges(&[Edge { source: 0, target: 0 }, Edge { source: 2, target: 0 }]);
        let last = simrank::simrank(&graph, &SimRankConfig::default()).unwrap().pop().unwrap();

        assert_eq!(graph.num_left(), 3);
        assert_eq!(last.left[0][1], 0.0);
        assert_eq!(last.left[1][1], 1.0);
        assert!(close_enough_to(last.left[0][2], 0.8));
    }

    #[test]
    fn decay_must_be_a_probability() {
        let config = SimRankConfig { decay: 1.2, ..SimRankConfig::default() };
        assert!(simrank::simrank(&complete(2, 2), &config).is_err());
    }
}
