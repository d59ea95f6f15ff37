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

use std::io::Write;
use std::time::Instant;

use fnv::FnvHashMap;

use config::{AprioriConfig, TripleGate};
use error::{MiningError, Phase, Result};
use io;
use itemsets::{CanonicalPair, CanonicalTriple, ItemDictionary};
use rules;
use rules::DirectedRule;
use types;
use types::{ItemId, PairSupports, TripleSupports};
use utils;

/// Transactions which can be read several times, once per counting pass.
pub trait TransactionSource {
    fn scan<F>(&self, phase: Phase, visit: F) -> Result<()>
        where F: FnMut(usize, &str) -> Result<()>;
}

/// One transaction per line, items separated by whitespace.
pub struct TransactionFile {
    path: String,
}

impl TransactionFile {
    pub fn new<S: Into<String>>(path: S) -> Self {
        TransactionFile { path: path.into() }
    }
}

impl TransactionSource for TransactionFile {
    fn scan<F>(&self, phase: Phase, mut visit: F) -> Result<()>
        where F: FnMut(usize, &str) -> Result<()> {

        let reader = io::open(&self.path, phase)?;
        for record in io::numbered_lines(reader, phase) {
            let (line_number, line) = record?;
            visit(line_number, &line)?;
        }

        Ok(())
    }
}

impl<S: AsRef<str>> TransactionSource for [S] {
    fn scan<F>(&self, _phase: Phase, mut visit: F) -> Result<()>
        where F: FnMut(usize, &str) -> Result<()> {

        for (index, line) in self.iter().enumerate() {
            visit(index + 1, line.as_ref())?;
        }

        Ok(())
    }
}

impl<S: AsRef<str>> TransactionSource for Vec<S> {
    fn scan<F>(&self, phase: Phase, visit: F) -> Result<()>
        where F: FnMut(usize, &str) -> Result<()> {
        self.as_slice().scan(phase, visit)
    }
}

/// Pass 1: counts every token occurrence. The dictionary keeps all tokens, frequency is decided
/// later against the minimum support.
pub fn count_items<T: TransactionSource + ?Sized>(source: &T) -> Result<ItemDictionary> {

    let mut counts: FnvHashMap<String, u32> =
        FnvHashMap::with_capacity_and_hasher(1000, Default::default());

    source.scan(Phase::CountItems, |_, line| {
        for token in io::tokens(line) {
            if let Some(count) = counts.get_mut(token) {
                *count += 1;
                continue;
            }
            counts.insert(token.to_string(), 1);
        }
        Ok(())
    })?;

    Ok(ItemDictionary::from_counts(counts))
}

/// Pass 2: support of all pairs of frequent items which occur together in a line. Only frequent
/// pairs are retained.
pub fn count_pairs<T: TransactionSource + ?Sized>(
    source: &T,
    dictionary: &ItemDictionary,
    min_support: u32,
) -> Result<PairSupports> {

    let mut supports = types::new_pair_supports(1000);

    source.scan(Phase::CountPairs, |_, line| {
        let items: Vec<ItemId> = dictionary.distinct_items(io::tokens(line))
            .into_iter()
            .filter(|item| dictionary.is_frequent(*item, min_support))
            .collect();

        for i in 0..items.len() {
            for j in (i + 1)..items.len() {
                if let Some(pair) = CanonicalPair::new(items[i], items[j]) {
                    *supports.entry(pair).or_insert(0) += 1;
                }
            }
        }
        Ok(())
    })?;

    supports.retain(|_, support| *support > min_support);

    Ok(supports)
}

fn passes_gate(triple: &CanonicalTriple, frequent_pairs: &PairSupports, gate: TripleGate) -> bool {
    let pairs = triple.pairs();
    match gate {
        TripleGate::AnyPairFrequent => pairs.iter().any(|pair| frequent_pairs.contains_key(pair)),
        TripleGate::AllPairsFrequent => pairs.iter().all(|pair| frequent_pairs.contains_key(pair)),
    }
}

/// Pass 3: support of candidate triples, a triple is a candidate if it passes the `gate`. Only
/// frequent triples are retained.
pub fn count_triples<T: TransactionSource + ?Sized>(
    source: &T,
    dictionary: &ItemDictionary,
    frequent_pairs: &PairSupports,
    gate: TripleGate,
    min_support: u32,
) -> Result<TripleSupports> {

    let mut supports = types::new_triple_supports(1000);

    source.scan(Phase::CountTriples, |line_number, line| {
        let items = dictionary.distinct_items(io::tokens(line));

        for i in 0..items.len() {
            for j in (i + 1)..items.len() {
                for k in (j + 1)..items.len() {
                    let triple = CanonicalTriple::new(items[i], items[j], items[k])
                        .ok_or_else(|| MiningError::invariant(Phase::CountTriples, format!(
                            "line {}: repeated item in deduplicated transaction", line_number)))?;

                    if passes_gate(&triple, frequent_pairs, gate) {
                        *supports.entry(triple).or_insert(0) += 1;
                    }
                }
            }
        }
        Ok(())
    })?;

    supports.retain(|_, support| *support > min_support);

    Ok(supports)
}

/// The best association rules of a run, together with the dictionary to name their items.
pub struct MinedRules {
    pub dictionary: ItemDictionary,
    pub rules: Vec<DirectedRule>,
}

impl MinedRules {

    pub fn lines(&self) -> Vec<String> {
        self.rules.iter()
            .map(|rule| rule.named(&self.dictionary).to_string())
            .collect()
    }

    pub fn write_to<W: Write + ?Sized>(&self, out: &mut W) -> Result<()> {
        for line in self.lines() {
            writeln!(out, "{}", line).map_err(|err| MiningError::io(Phase::Rules, "output", err))?;
        }
        Ok(())
    }
}

fn frequent_items_and_pairs<T: TransactionSource + ?Sized>(
    source: &T,
    config: &AprioriConfig,
) -> Result<(ItemDictionary, PairSupports)> {

    let start = Instant::now();
    let dictionary = count_items(source)?;
    info!("Found {} frequent items among {} distinct items ({}ms)",
        dictionary.num_frequent(config.min_support),
        dictionary.num_items(),
        utils::to_millis(start.elapsed()));

    let start = Instant::now();
    let frequent_pairs = count_pairs(source, &dictionary, config.min_support)?;
    info!("Found {} frequent pairs ({}ms)",
        frequent_pairs.len(), utils::to_millis(start.elapsed()));

    Ok((dictionary, frequent_pairs))
}

/// A-Priori over pairs: the top rules `x => y`.
pub fn pairs<T: TransactionSource + ?Sized>(source: &T, config: &AprioriConfig)
    -> Result<MinedRules> {

    let (dictionary, frequent_pairs) = frequent_items_and_pairs(source, config)?;

    let generated = rules::pair_rules(&frequent_pairs, &dictionary)?;
    info!("Generated {} pair rules", generated.len());

    let rules = rules::top_rules(generated, config.items_to_print);

    Ok(MinedRules { dictionary, rules })
}

/// A-Priori over triples: the top rules `(x,y) => z`.
pub fn triples<T: TransactionSource + ?Sized>(source: &T, config: &AprioriConfig)
    -> Result<MinedRules> {

    let (dictionary, frequent_pairs) = frequent_items_and_pairs(source, config)?;

    let start = Instant::now();
    let frequent_triples = count_triples(
        source,
        &dictionary,
        &frequent_pairs,
        config.triple_gate,
        config.min_support,
    )?;
    info!("Found {} frequent triples ({}ms)",
        frequent_triples.len(), utils::to_millis(start.elapsed()));

    let generated = rules::triple_rules(&frequent_triples, &frequent_pairs)?;
    info!("Generated {} triple rules", generated.len());

    let rules = rules::top_rules(generated, config.items_to_print);

    Ok(MinedRules { dictionary, rules })
}
