//! Property-based tests using proptest.
//!
//! These tests verify the invariants the mining algorithms rely on.

extern crate mmds;
#[macro_use]
extern crate proptest;

use proptest::prelude::*;

use mmds::{apriori, friends, io, svm, utils};
use mmds::config::{FriendsConfig, KMeansConfig, TripleGate};
use mmds::error::Phase;
use mmds::friends::Adjacency;
use mmds::io::Separator;
use mmds::itemsets::{CanonicalPair, CanonicalTriple};
use mmds::kmeans::KMeans;
use mmds::mapreduce::{LocalHarness, PooledHarness};
use mmds::svm::{Dataset, Model};

const ITEM_NAMES: [&str; 6] = ["bread", "butter", "cheese", "jam", "milk", "tea"];

// Baskets over a small alphabet, so that itemsets actually repeat
fn baskets_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(prop::collection::vec(0usize..6, 0..6), 1..30).prop_map(|baskets| {
        baskets.into_iter()
            .map(|items| {
                items.into_iter()
                    .map(|item| ITEM_NAMES[item])
                    .collect::<Vec<&str>>()
                    .join(" ")
            })
            .collect()
    })
}

fn adjacency_strategy() -> impl Strategy<Value = Vec<Adjacency>> {
    prop::collection::vec((0u64..15, prop::collection::vec(0u64..15, 0..6)), 0..20)
        .prop_map(|lists| {
            lists.into_iter()
                .map(|(user, friends)| Adjacency { user, friends })
                .collect()
        })
}

fn points_strategy(dimensions: usize) -> impl Strategy<Value = Vec<Vec<f64>>> {
    prop::collection::vec(prop::collection::vec(-100.0f64..100.0, dimensions), 1..40)
}

fn dataset_strategy() -> impl Strategy<Value = Dataset> {
    prop::collection::vec((prop::collection::vec(-10.0f64..10.0, 3), any::<bool>()), 1..20)
        .prop_map(|examples| {
            let (features, signs): (Vec<Vec<f64>>, Vec<bool>) = examples.into_iter().unzip();
            let labels = signs.into_iter().map(|sign| if sign { 1.0 } else { -1.0 }).collect();
            Dataset::new(features, labels).unwrap()
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn pairs_ignore_order(a in 0u32..50, b in 0u32..50) {
        prop_assume!(a != b);
        prop_assert_eq!(CanonicalPair::new(a, b), CanonicalPair::new(b, a));

        let pair = CanonicalPair::new(a, b).unwrap();
        prop_assert!(pair.first() < pair.second());
    }

    #[test]
    fn triples_ignore_order(a in 0u32..50, b in 0u32..50, c in 0u32..50) {
        prop_assume!(a != b && b != c && a != c);

        let triple = CanonicalTriple::new(a, b, c);
        prop_assert!(triple.is_some());
        prop_assert_eq!(triple, CanonicalTriple::new(a, c, b));
        prop_assert_eq!(triple, CanonicalTriple::new(b, a, c));
        prop_assert_eq!(triple, CanonicalTriple::new(b, c, a));
        prop_assert_eq!(triple, CanonicalTriple::new(c, a, b));
        prop_assert_eq!(triple, CanonicalTriple::new(c, b, a));
    }

    #[test]
    fn supports_are_monotone(baskets in baskets_strategy()) {
        let dictionary = apriori::count_items(&baskets).unwrap();
        let pairs = apriori::count_pairs(&baskets, &dictionary, 0).unwrap();
        let triples = apriori::count_triples(
            &baskets, &dictionary, &pairs, TripleGate::AnyPairFrequent, 0).unwrap();

        for (pair, support) in pairs.iter() {
            prop_assert!(*support <= dictionary.count(pair.first()));
            prop_assert!(*support <= dictionary.count(pair.second()));
        }

        for (triple, support) in triples.iter() {
            for pair in triple.pairs().iter() {
                let pair_support = pairs.get(pair).cloned().unwrap_or(0);
                prop_assert!(*support <= pair_support);
            }
        }
    }

    #[test]
    fn mining_is_deterministic(baskets in baskets_strategy()) {
        let config = mmds::config::AprioriConfig { min_support: 1, ..Default::default() };

        let first = apriori::triples(&baskets, &config).unwrap().lines();
        let second = apriori::triples(&baskets, &config).unwrap().lines();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn friends_are_never_recommended(adjacency_lists in adjacency_strategy()) {
        let config = FriendsConfig::default();
        let recommendations =
            friends::recommend(&LocalHarness::with_shuffled_groups(3), &adjacency_lists, &config)
                .unwrap();

        for recommendation in recommendations.iter() {
            prop_assert!(recommendation.recommended.len() <= config.max_recommendations);
            prop_assert!(!recommendation.recommended.contains(&recommendation.user));

            for adjacency in adjacency_lists.iter().filter(|a| a.user == recommendation.user) {
                for friend in adjacency.friends.iter() {
                    prop_assert!(!recommendation.recommended.contains(friend));
                }
            }
        }

        let pooled = friends::recommend(&PooledHarness::new(3), &adjacency_lists, &config)
            .unwrap();
        prop_assert_eq!(recommendations, pooled);
    }

    #[test]
    fn centroids_keep_their_number_and_cost_shrinks(
        points in points_strategy(2),
        k in 1usize..5,
    ) {
        let initial: Vec<Vec<f64>> = points.iter().cycle().take(k).cloned().collect();

        let outcome = KMeans::new(KMeansConfig { max_iterations: 4 })
            .run(&LocalHarness::new(), &points, &initial)
            .unwrap();

        prop_assert_eq!(outcome.centroids.len(), k);
        prop_assert_eq!(outcome.assignments.len(), points.len());

        for cost in outcome.cost_log.iter() {
            prop_assert!(cost.cost.is_finite() && cost.cost >= 0.0);
        }

        for window in outcome.cost_log.windows(2) {
            prop_assert!(window[1].cost <= window[0].cost + 1e-6 * (1.0 + window[0].cost));
        }
    }

    #[test]
    fn objective_is_never_negative(
        dataset in dataset_strategy(),
        weights in prop::collection::vec(-5.0f64..5.0, 3),
        bias in -5.0f64..5.0,
        c in 0u32..200,
    ) {
        let model = Model { weights, bias };
        let objective = svm::objective(&model, &dataset, c);
        prop_assert!(objective >= 0.0);

        let outside_margin = dataset.features().iter()
            .zip(dataset.labels().iter())
            .all(|(example, label)| model.margin(example, *label) >= 1.0);

        if outside_margin {
            let regularizer = 0.5 * utils::dot(&model.weights, &model.weights);
            prop_assert!((objective - regularizer).abs() < 1e-9);
        }
    }

    #[test]
    fn vectors_survive_formatting(vector in prop::collection::vec(-1e6f64..1e6, 0..8)) {
        let formatted = utils::format_vector(&vector);
        let parsed = io::parse_floats(&formatted, Separator::Whitespace, Phase::Assign, 1).unwrap();
        prop_assert_eq!(parsed, vector);
    }
}
