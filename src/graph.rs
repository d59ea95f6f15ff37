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

use std::io::BufRead;

use error::{MiningError, Phase, Result};
use io;

/// Whether node ids in an edge file start at 0 or at 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Numbering {
    ZeroBased,
    OneBased,
}

/// A directed edge between zero-based node indexes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Edge {
    pub source: usize,
    pub target: usize,
}

fn parse_node(token: &str, numbering: Numbering, line: usize) -> Result<usize> {
    let id = token.parse::<usize>().map_err(|err| {
        MiningError::malformed(Phase::Edges, line, format!("'{}' is not a node id: {}", token, err))
    })?;

    match numbering {
        Numbering::ZeroBased => Ok(id),
        Numbering::OneBased if id > 0 => Ok(id - 1),
        Numbering::OneBased => Err(MiningError::malformed(Phase::Edges, line,
            "node ids start at 1")),
    }
}

/// Reads one `source target` pair per non-blank line.
pub fn edges_from<R: BufRead>(reader: R, numbering: Numbering) -> Result<Vec<Edge>> {

    let mut edges = Vec::new();

    for record in io::numbered_lines(reader, Phase::Edges) {
        let (line_number, line) = record?;
        let tokens: Vec<&str> = io::tokens(&line).collect();

        match tokens.len() {
            0 => continue,
            2 => edges.push(Edge {
                source: parse_node(tokens[0], numbering, line_number)?,
                target: parse_node(tokens[1], numbering, line_number)?,
            }),
            found => return Err(MiningError::malformed(Phase::Edges, line_number,
                format!("expected 2 node ids, found {}", found))),
        }
    }

    Ok(edges)
}

pub fn read_edges(path: &str, numbering: Numbering) -> Result<Vec<Edge>> {
    edges_from(io::open(path, Phase::Edges)?, numbering)
}

/// One more than the largest node index mentioned by any edge.
pub fn num_nodes(edges: &[Edge]) -> usize {
    edges.iter()
        .map(|edge| ::std::cmp::max(edge.source, edge.target) + 1)
        .max()
        .unwrap_or(0)
}

/// Adjacency lists of a graph with nodes `0..num_nodes`. Duplicate edges collapse and every list
/// is sorted.
#[derive(Clone, Debug, PartialEq)]
pub struct Graph {
    out_links: Vec<Vec<usize>>,
    in_links: Vec<Vec<usize>>,
}

impl Graph {

    pub fn directed(edges: &[Edge], num_nodes: usize) -> Result<Self> {

        let mut out_links: Vec<Vec<usize>> = vec![Vec::new(); num_nodes];
        let mut in_links: Vec<Vec<usize>> = vec![Vec::new(); num_nodes];

        for edge in edges.iter() {
            if edge.source >= num_nodes || edge.target >= num_nodes {
                return Err(MiningError::invariant(Phase::Edges, format!(
                    "edge {} -> {} leaves a graph of {} nodes", edge.source, edge.target, num_nodes)));
            }

            out_links[edge.source].push(edge.target);
            in_links[edge.target].push(edge.source);
        }

        Ok(Graph { out_links: sorted_and_unique(out_links), in_links: sorted_and_unique(in_links) })
    }

    /// Every edge is followed in both directions, self loops are dropped.
    pub fn undirected(edges: &[Edge], num_nodes: usize) -> Result<Self> {

        let mut both_ways = Vec::with_capacity(edges.len() * 2);

        for edge in edges.iter().filter(|edge| edge.source != edge.target) {
            both_ways.push(*edge);
            both_ways.push(Edge { source: edge.target, target: edge.source });
        }

        Graph::directed(&both_ways, num_nodes)
    }

    pub fn num_nodes(&self) -> usize {
        self.out_links.len()
    }

    pub fn num_edges(&self) -> usize {
        self.out_links.iter().map(|links| links.len()).sum()
    }

    pub fn out_links(&self, node: usize) -> &[usize] {
        &self.out_links[node]
    }

    pub fn in_links(&self, node: usize) -> &[usize] {
        &self.in_links[node]
    }
}

fn sorted_and_unique(mut lists: Vec<Vec<usize>>) -> Vec<Vec<usize>> {
    for list in lists.iter_mut() {
        list.sort();
        list.dedup();
    }
    lists
}

#[cfg(test)]
mod tests {

    use error::{MiningError, Phase};
    use graph;
    use graph::{Edge, Graph, Numbering};

    #[test]
    fn one_based_ids_are_shifted() {
        let edges = graph::edges_from("1 2\n\n2 3\n3 1\n".as_bytes(), Numbering::OneBased).unwrap();

        assert_eq!(edges, vec![
            Edge { source: 0, target: 1 },
            Edge { source: 1, target: 2 },
            Edge { source: 2, target: 0 },
        ]);
        assert_eq!(graph::num_nodes(&edges), 3);
    }

    #[test]
    fn malformed_edges_report_their_line() {
        for input in &["1 2\n0 1\n", "1 2\n3\n", "1 2\n1 x\n", "1 2\n1 2 3\n"] {
            match graph::edges_from(input.as_bytes(), Numbering::OneBased) {
                Err(MiningError::MalformedRecord { phase, line, .. }) => {
                    assert_eq!(phase, Phase::Edges);
                    assert_eq!(line, 2);
                },
                other => panic!("unexpected result {:?} for {:?}", other, input),
            }
        }
    }

    #[test]
    fn duplicate_edges_collapse() {
        let edges = graph::edges_from("0 1\n0 1\n0 2\n2 0\n".as_bytes(), Numbering::ZeroBased)
            .unwrap();
        let graph = Graph::directed(&edges, 4).unwrap();

        assert_eq!(graph.num_nodes(), 4);
        assert_eq!(graph.num_edges(), 3);
        assert_eq!(graph.out_links(0), &[1, 2]);
        assert_eq!(graph.in_links(0), &[2]);
        assert!(graph.out_links(3).is_empty());

        assert!(Graph::directed(&edges, 2).is_err());
    }

    #[test]
    fn undirected_graphs_drop_self_loops() {
        let edges = vec![
            Edge { source: 0, target: 1 },
            Edge { source: 1, target: 0 },
            Edge { source: 2, target: 2 },
        ];
        let graph = Graph::undirected(&edges, 3).unwrap();

        assert_eq!(graph.out_links(0), &[1]);
        assert_eq!(graph.out_links(1), &[0]);
        assert!(graph.out_links(2).is_empty());
        assert_eq!(graph.num_edges(), 2);
    }
}
