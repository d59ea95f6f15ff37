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

use std::cmp::Ordering;
use std::fmt;
use std::time::Instant;

use rand::{Rng, SeedableRng, XorShiftRng};

use config::PageRankConfig;
use error::{MiningError, Phase, Result};
use graph;
use graph::{Graph, Numbering};
use utils;
use utils::Interrupt;

/// Reads `source target` lines with page ids starting at 1. Without `num_pages`, the largest id
/// mentioned determines the size of the graph.
pub fn read_graph(path: &str, num_pages: Option<usize>) -> Result<Graph> {
    let edges = graph::read_edges(path, Numbering::OneBased)?;
    let num_pages = num_pages.unwrap_or_else(|| graph::num_nodes(&edges));
    Graph::directed(&edges, num_pages)
}

fn check_teleport_probability(teleport_probability: f64) -> Result<()> {
    if teleport_probability > 0.0 && teleport_probability <= 1.0 {
        Ok(())
    } else {
        Err(MiningError::invalid_parameter("teleport_probability",
            format!("{} is not in (0, 1]", teleport_probability)))
    }
}

/// Iterates `R = beta / n + (1 - beta) M R` from the uniform distribution, where `M` follows every
/// out-link of a page with equal probability. Rank reaching a page without out-links is lost.
pub fn power_iteration(graph: &Graph, iterations: usize, teleport_probability: f64)
    -> Result<Vec<f64>> {

    check_teleport_probability(teleport_probability)?;

    let num_pages = graph.num_nodes();
    if num_pages == 0 {
        return Err(MiningError::invariant(Phase::Ranks, "the graph has no pages"));
    }

    let uniform = 1.0 / num_pages as f64;
    let mut ranks = vec![uniform; num_pages];

    for iteration in 0..iterations {
        let mut next = vec![teleport_probability * uniform; num_pages];

        for (page, rank) in ranks.iter().enumerate() {
            let links = graph.out_links(page);
            if links.is_empty() {
                continue;
            }

            let share = (1.0 - teleport_probability) * rank / links.len() as f64;
            for target in links.iter() {
                next[*target] += share;
            }
        }

        debug!("Iteration {}: total rank {:.6}", iteration, next.iter().sum::<f64>());
        ranks = next;
    }

    Ok(ranks)
}

/// Starts `walks_per_page` random walks from every page. A walk visits its start, then follows a
/// uniformly chosen out-link until it teleports, which happens with `teleport_probability` before
/// every step and always at a page without out-links. Visit counts are scaled by
/// `beta / (n * walks_per_page)`.
pub fn monte_carlo<R: Rng>(
    graph: &Graph,
    walks_per_page: usize,
    teleport_probability: f64,
    rng: &mut R,
) -> Result<Vec<f64>> {

    check_teleport_probability(teleport_probability)?;

    if walks_per_page == 0 {
        return Err(MiningError::invalid_parameter("walks_per_node", "at least one walk is needed"));
    }

    let num_pages = graph.num_nodes();
    if num_pages == 0 {
        return Err(MiningError::invariant(Phase::Walks, "the graph has no pages"));
    }

    let mut visits = vec![0u64; num_pages];

    for start in 0..num_pages {
        for _ in 0..walks_per_page {
            let mut page = start;
            visits[page] += 1;

            loop {
                let links = graph.out_links(page);
                if links.is_empty() || rng.next_f64() < teleport_probability {
                    break;
                }

                page = links[rng.gen_range(0, links.len())];
                visits[page] += 1;
            }
        }
    }

    let scale = teleport_probability / (num_pages * walks_per_page) as f64;
    Ok(visits.into_iter().map(|count| count as f64 * scale).collect())
}

/// Page indexes by descending score, ties go to the lower index.
pub fn top_pages(scores: &[f64], k: usize) -> Vec<usize> {
    let mut pages: Vec<usize> = (0..scores.len()).collect();

    pages.sort_by(|a, b| {
        scores[*b].partial_cmp(&scores[*a])
            .unwrap_or(Ordering::Equal)
            .then(a.cmp(b))
    });

    pages.truncate(k);
    pages
}

/// Absolute error of an estimate on the `k` pages it ranks highest.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TopKError {
    pub walks_per_page: usize,
    pub k: usize,
    pub mean: f64,
    pub total: f64,
}

impl fmt::Display for TopKError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "R: {} | K: {:03} | Error/K: {:.6} | Error: {:.6}",
            self.walks_per_page, self.k, self.mean, self.total)
    }
}

/// `k` larger than the graph is capped at the number of pages.
pub fn top_k_error(exact: &[f64], estimate: &[f64], k: usize, walks_per_page: usize)
    -> Result<TopKError> {

    if exact.len() != estimate.len() {
        return Err(MiningError::invariant(Phase::Walks, format!(
            "{} exact ranks but {} estimates", exact.len(), estimate.len())));
    }

    if k == 0 {
        return Err(MiningError::invalid_parameter("top_k", "lists must hold at least one page"));
    }

    let top = top_pages(estimate, k);
    let total: f64 = top.iter()
        .map(|page| (exact[*page] - estimate[*page]).abs())
        .sum();

    let k = top.len();
    Ok(TopKError { walks_per_page, k, mean: total / k as f64, total })
}

#[derive(Clone, Debug, PartialEq)]
pub struct Estimate {
    pub walks_per_page: usize,
    pub ranks: Vec<f64>,
    pub millis: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PageRankOutcome {
    pub ranks: Vec<f64>,
    pub estimates: Vec<Estimate>,
    pub errors: Vec<TopKError>,
}

/// One rank line per page, ids start at 1 as in the input.
pub struct RankedPage {
    pub page: usize,
    pub rank: f64,
}

impl fmt::Display for RankedPage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}\t{:.6}", self.page + 1, self.rank)
    }
}

impl PageRankOutcome {
    pub fn ranked_pages(&self) -> Vec<RankedPage> {
        self.ranks.iter()
            .enumerate()
            .map(|(page, rank)| RankedPage { page, rank: *rank })
            .collect()
    }
}

/// Power iteration followed by one Monte Carlo estimate per entry of `walks_per_node`, each
/// compared to the power iteration ranks on every top list size.
pub struct PageRank {
    config: PageRankConfig,
    interrupt: Interrupt,
}

impl PageRank {

    pub fn new(config: PageRankConfig) -> Self {
        PageRank { config, interrupt: Interrupt::new() }
    }

    /// Skips the remaining estimates once the interrupt is triggered.
    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    pub fn run(&self, graph: &Graph) -> Result<PageRankOutcome> {

        let config = &self.config;

        let start = Instant::now();
        let ranks = power_iteration(graph, config.iterations, config.teleport_probability)?;
        info!("{} ms for {} power iterations over {} pages", utils::to_millis(start.elapsed()),
            config.iterations, graph.num_nodes());

        let mut rng = XorShiftRng::from_seed([config.seed, 0x7a3c_51e9, 0x1b87_3593, 0xcc9e_2d51]);

        let mut estimates = Vec::with_capacity(config.walks_per_node.len());
        let mut errors = Vec::new();

        for walks_per_page in config.walks_per_node.iter() {

            if self.interrupt.is_triggered() {
                warn!("Interrupted after {} estimates", estimates.len());
                break;
            }

            let start = Instant::now();
            let estimate = monte_carlo(graph, *walks_per_page, config.teleport_probability, &mut rng)?;
            let millis = utils::to_millis(start.elapsed());
            info!("R: {} | Execution time: {} ms", walks_per_page, millis);

            for k in config.top_k.iter() {
                errors.push(top_k_error(&ranks, &estimate, *k, *walks_per_page)?);
            }

            estimates.push(Estimate { walks_per_page: *walks_per_page, ranks: estimate, millis });
        }

        Ok(PageRankOutcome { ranks, estimates, errors })
    }
}
