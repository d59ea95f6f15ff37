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
use std::collections::BinaryHeap;
use std::fmt;

use error::{MiningError, Phase, Result};
use itemsets::{CanonicalPair, ItemDictionary};
use types::{ItemId, PairSupports, TripleSupports};
use utils;

/// Left hand side of an association rule. Pair rules have a single item, triple rules a sorted
/// couple of items.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Antecedent {
    Single(ItemId),
    Couple(ItemId, ItemId),
}

/// A directional association rule `antecedent => consequent`, unlike the canonical itemsets the
/// direction matters here.
#[derive(Clone, Debug, PartialEq)]
pub struct DirectedRule {
    pub antecedent: Antecedent,
    pub consequent: ItemId,
    pub support: u32,
    pub confidence: f64,
}

fn confidence(support: u32, antecedent_support: u32, rule: fmt::Arguments) -> Result<f64> {
    if antecedent_support == 0 {
        return Err(MiningError::invariant(Phase::Rules,
            format!("antecedent of rule {} has zero support", rule)));
    }

    Ok(support as f64 / antecedent_support as f64)
}

/// Both directions of every frequent pair, confidence is support(pair) / count(antecedent).
pub fn pair_rules(frequent_pairs: &PairSupports, dictionary: &ItemDictionary)
    -> Result<Vec<DirectedRule>> {

    let mut rules = Vec::with_capacity(2 * frequent_pairs.len());

    for (pair, support) in frequent_pairs.iter() {
        let directions = [(pair.first(), pair.second()), (pair.second(), pair.first())];

        for &(antecedent, consequent) in directions.iter() {
            let antecedent_support = dictionary.count(antecedent);
            let confidence = confidence(*support, antecedent_support,
                format_args!("{} => {}", antecedent, consequent))?;

            rules.push(DirectedRule {
                antecedent: Antecedent::Single(antecedent),
                consequent,
                support: *support,
                confidence,
            });
        }
    }

    Ok(rules)
}

/// Three rules per frequent triple, one per consequent. The confidence divides by the support of
/// the antecedent pair, which must be among the frequent pairs.
pub fn triple_rules(frequent_triples: &TripleSupports, frequent_pairs: &PairSupports)
    -> Result<Vec<DirectedRule>> {

    let mut rules = Vec::with_capacity(3 * frequent_triples.len());

    for (triple, support) in frequent_triples.iter() {
        let [a, b, c] = triple.items();

        for &(x, y, z) in [(a, b, c), (b, c, a), (a, c, b)].iter() {

            let anchor = CanonicalPair::new(x, y)
                .and_then(|pair| frequent_pairs.get(&pair))
                .ok_or_else(|| MiningError::invariant(Phase::Rules, format!(
                    "antecedent pair ({},{}) of a frequent triple is not frequent", x, y)))?;

            let confidence = confidence(*support, *anchor,
                format_args!("({},{}) => {}", x, y, z))?;

            rules.push(DirectedRule {
                antecedent: Antecedent::Couple(x, y),
                consequent: z,
                support: *support,
                confidence,
            });
        }
    }

    Ok(rules)
}

/// Orders rules from best to worst: confidence descending, then antecedent and consequent
/// ascending. NaN confidences compare as equal.
pub fn compare_rules(a: &DirectedRule, b: &DirectedRule) -> Ordering {
    b.confidence.partial_cmp(&a.confidence)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.antecedent.cmp(&b.antecedent))
        .then_with(|| a.consequent.cmp(&b.consequent))
}

/// Wrapper to keep the `n` best rules in a max-heap whose top is the worst rule kept so far.
struct RankedRule(DirectedRule);

impl PartialEq for RankedRule {
    fn eq(&self, other: &Self) -> bool {
        compare_rules(&self.0, &other.0) == Ordering::Equal
    }
}

impl Eq for RankedRule {}

impl Ord for RankedRule {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_rules(&self.0, &other.0)
    }
}

impl PartialOrd for RankedRule {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

pub fn top_rules(rules: Vec<DirectedRule>, n: usize) -> Vec<DirectedRule> {

    if n == 0 {
        return Vec::new();
    }

    let mut heap: BinaryHeap<RankedRule> = BinaryHeap::with_capacity(n);

    for rule in rules {
        let ranked = RankedRule(rule);

        if heap.len() < n {
            heap.push(ranked);
        } else {
            if let Some(mut top) = heap.peek_mut() {
                if ranked < *top {
                    *top = ranked;
                }
            }
        }
    }

    heap.into_sorted_vec()
        .into_iter()
        .map(|ranked| ranked.0)
        .collect()
}

/// Renders a rule with the item names, e.g. `(A,B) => C | confidence: 0.5`.
pub struct NamedRule<'a> {
    rule: &'a DirectedRule,
    dictionary: &'a ItemDictionary,
}

impl DirectedRule {
    pub fn named<'a>(&'a self, dictionary: &'a ItemDictionary) -> NamedRule<'a> {
        NamedRule { rule: self, dictionary }
    }
}

impl<'a> fmt::Display for NamedRule<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let names = self.dictionary;
        match self.rule.antecedent {
            Antecedent::Single(x) => write!(f, "{}", names.item_name(x))?,
            Antecedent::Couple(x, y) => {
                write!(f, "({},{})", names.item_name(x), names.item_name(y))?
            },
        }

        write!(f, " => {} | confidence: {}",
            names.item_name(self.rule.consequent),
            utils::format_float(self.rule.confidence))
    }
}

#[cfg(test)]
mod tests {

    use fnv::FnvHashMap;

    use itemsets::{CanonicalPair, CanonicalTriple, ItemDictionary};
    use rules;
    use rules::{Antecedent, DirectedRule};
    use types;

    fn dictionary() -> ItemDictionary {
        let mut counts: FnvHashMap<String, u32> = FnvHashMap::default();
        counts.insert("A".to_string(), 4);
        counts.insert("B".to_string(), 2);
        counts.insert("C".to_string(), 3);
        ItemDictionary::from_counts(counts)
    }

    fn rule(antecedent: Antecedent, consequent: u32, confidence: f64) -> DirectedRule {
        DirectedRule { antecedent, consequent, support: 1, confidence }
    }

    #[test]
    fn pair_rules_in_both_directions() {
        let dictionary = dictionary();
        let mut pairs = types::new_pair_supports(1);
        pairs.insert(CanonicalPair::new(0, 1).unwrap(), 2);

        let mut generated = rules::pair_rules(&pairs, &dictionary).unwrap();
        generated.sort_by(rules::compare_rules);

        assert_eq!(generated.len(), 2);
        assert_eq!(generated[0].antecedent, Antecedent::Single(1));
        assert_eq!(generated[0].confidence, 1.0);
        assert_eq!(generated[1].antecedent, Antecedent::Single(0));
        assert_eq!(generated[1].confidence, 0.5);
    }

    #[test]
    fn triple_rules_divide_by_antecedent_pair() {
        let mut pairs = types::new_pair_supports(3);
        pairs.insert(CanonicalPair::new(0, 1).unwrap(), 4);
        pairs.insert(CanonicalPair::new(1, 2).unwrap(), 2);
        pairs.insert(CanonicalPair::new(0, 2).unwrap(), 3);

        let mut triples = types::new_triple_supports(1);
        triples.insert(CanonicalTriple::new(2, 0, 1).unwrap(), 2);

        let mut generated = rules::triple_rules(&triples, &pairs).unwrap();
        generated.sort_by(rules::compare_rules);

        assert_eq!(generated.len(), 3);
        assert_eq!(generated[0].antecedent, Antecedent::Couple(1, 2));
        assert_eq!(generated[0].consequent, 0);
        assert_eq!(generated[0].confidence, 1.0);
        assert_eq!(generated[2].antecedent, Antecedent::Couple(0, 1));
        assert_eq!(generated[2].confidence, 0.5);
    }

    #[test]
    fn missing_anchor_pair_is_an_invariant_violation() {
        let pairs = types::new_pair_supports(0);
        let mut triples = types::new_triple_supports(1);
        triples.insert(CanonicalTriple::new(0, 1, 2).unwrap(), 5);

        assert!(rules::triple_rules(&triples, &pairs).is_err());
    }

    #[test]
    fn zero_antecedent_support_is_an_invariant_violation() {
        let mut counts: FnvHashMap<String, u32> = FnvHashMap::default();
        counts.insert("A".to_string(), 0);
        counts.insert("B".to_string(), 3);
        let dictionary = ItemDictionary::from_counts(counts);

        let mut pairs = types::new_pair_supports(1);
        pairs.insert(CanonicalPair::new(0, 1).unwrap(), 1);

        assert!(rules::pair_rules(&pairs, &dictionary).is_err());
    }

    #[test]
    fn topk_orders_by_confidence_then_names() {
        let generated = vec![
            rule(Antecedent::Single(2), 0, 0.5),
            rule(Antecedent::Single(1), 2, 1.0),
            rule(Antecedent::Single(0), 2, 0.75),
            rule(Antecedent::Single(0), 1, 1.0),
            rule(Antecedent::Single(1), 0, 1.0),
        ];

        let top = rules::top_rules(generated, 3);

        assert_eq!(top.len(), 3);
        assert_eq!((top[0].antecedent, top[0].consequent), (Antecedent::Single(0), 1));
        assert_eq!((top[1].antecedent, top[1].consequent), (Antecedent::Single(1), 0));
        assert_eq!((top[2].antecedent, top[2].consequent), (Antecedent::Single(1), 2));

        assert!(rules::top_rules(Vec::new(), 3).is_empty());
        assert!(rules::top_rules(vec![rule(Antecedent::Single(0), 1, 1.0)], 0).is_empty());
    }

    #[test]
    fn rendering() {
        let dictionary = dictionary();

        let pair_rule = rule(Antecedent::Single(0), 1, 1.0);
        assert_eq!(pair_rule.named(&dictionary).to_string(), "A => B | confidence: 1.0");

        let triple_rule = rule(Antecedent::Couple(0, 1), 2, 0.5);
        assert_eq!(triple_rule.named(&dictionary).to_string(), "(A,B) => C | confidence: 0.5");
    }
}
