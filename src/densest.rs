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

use error::{MiningError, Phase, Result};
use graph::Graph;

/// Half the summed degrees of a node set divided by its size, zero for the empty set.
pub fn density(edges: usize, nodes: usize) -> f64 {
    if nodes == 0 {
        0.0
    } else {
        edges as f64 / nodes as f64
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PeelRound {
    pub iteration: usize,
    pub nodes: usize,
    pub edges: usize,
    pub density: f64,
}

impl fmt::Display for PeelRound {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Iteration: {} | |S|: {} | |E(S)|: {} | rho(S): {:.4}",
            self.iteration, self.nodes, self.edges, self.density)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DensestSubgraph {
    /// Sorted node indexes of the densest set seen.
    pub nodes: Vec<usize>,
    pub edges: usize,
    pub density: f64,
    /// The remaining set after every round of removals.
    pub rounds: Vec<PeelRound>,
}

impl DensestSubgraph {
    pub fn iterations(&self) -> usize {
        self.rounds.len()
    }
}

/// Starts from all nodes of an undirected graph and removes, in every round, each node whose
/// degree inside the remaining set is at most `2 (1 + epsilon)` times its density, until no node
/// is left. Returns the densest set seen along the way.
pub fn peel(graph: &Graph, epsilon: f64) -> Result<DensestSubgraph> {

    if !(epsilon >= 0.0 && epsilon.is_finite()) {
        return Err(MiningError::invalid_parameter("epsilon",
            format!("{} is not a finite non-negative number", epsilon)));
    }

    let num_nodes = graph.num_nodes();
    let mut members = vec![true; num_nodes];
    let mut degrees: Vec<usize> = (0..num_nodes).map(|node| graph.out_links(node).len()).collect();

    let mut size = num_nodes;
    let mut edges = degrees.iter().sum::<usize>() / 2;
    let mut current = density(edges, size);

    let mut best = DensestSubgraph {
        nodes: (0..num_nodes).collect(),
        edges,
        density: current,
        rounds: Vec::new(),
    };

    let mut rounds: Vec<PeelRound> = Vec::new();

    while size > 0 {
        let limit = 2.0 * (1.0 + epsilon) * current;

        let removed: Vec<usize> = (0..num_nodes)
            .filter(|node| members[*node] && degrees[*node] as f64 <= limit)
            .collect();

        if removed.is_empty() {
            return Err(MiningError::invariant(Phase::Peel, format!(
                "no node of {} has a degree of at most {}", size, limit)));
        }

        for node in removed.iter() {
            members[*node] = false;
        }

        for node in removed.iter() {
            degrees[*node] = 0;
            for neighbour in graph.out_links(*node).iter() {
                if members[*neighbour] {
                    degrees[*neighbour] -= 1;
                }
            }
        }

        size -= removed.len();
        edges = degrees.iter().sum::<usize>() / 2;
        current = density(edges, size);

        let round = PeelRound { iteration: rounds.len(), nodes: size, edges, density: current };
        debug!("{}", round);
        rounds.push(round);

        if current > best.density {
            best.nodes = (0..num_nodes).filter(|node| members[*node]).collect();
            best.edges = edges;
            best.density = current;
        }
    }

    info!("Densest set has {} nodes and density {:.4}, found in {} rounds", best.nodes.len(),
        best.density, rounds.len());

    best.rounds = rounds;
    Ok(best)
}

#[cfg(test)]
mod tests {

    use densest;
    use graph;
    use graph::{Graph, Numbering};

    fn undirected(input: &str, num_nodes: usize) -> Graph {
        let edges = graph::edges_from(input.as_bytes(), Numbering::ZeroBased).unwrap();
        Graph::undirected(&edges, num_nodes).unwrap()
    }

    #[test]
    fn clique_with_a_tail() {
        let graph = undirected("0 1\n0 2\n0 3\n1 2\n1 3\n2 3\n4 0\n", 6);
        let densest = densest::peel(&graph, 0.05).unwrap();

        assert_eq!(densest.nodes, vec![0, 1, 2, 3]);
        assert_eq!(densest.edges, 6);
        assert_eq!(densest.density, 1.5);
        assert_eq!(densest.iterations(), 2);

        assert_eq!(densest.rounds[0].nodes, 4);
        assert_eq!(densest.rounds[1].nodes, 0);
        assert_eq!(densest.rounds[0].to_string(), "Iteration: 0 | |S|: 4 | |E(S)|: 6 | rho(S): 1.5000");
    }

    #[test]
    fn the_whole_graph_can_be_densest() {
        let graph = undirected("0 1\n1 2\n2 0\n", 3);
        let densest = densest::peel(&graph, 0.0).unwrap();

        assert_eq!(densest.nodes, vec![0, 1, 2]);
        assert_eq!(densest.density, 1.0);
    }

    #[test]
    fn empty_graphs_and_invalid_epsilon() {
        let empty = densest::peel(&undirected("", 0), 0.05).unwrap();
        assert!(empty.nodes.is_empty());
        assert_eq!(empty.iterations(), 0);

        assert!(densest::peel(&undirected("0 1\n", 2), -0.5).is_err());
    }
}
