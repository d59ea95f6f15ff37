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

#[cfg(test)]
mod tests {

    use apriori;
    use config::{AprioriConfig, FactorsConfig, FriendsConfig, KMeansConfig, PageRankConfig};
    use factors;
    use factors::Factorizer;
    use friends;
    use graph;
    use graph::{Graph, Numbering};
    use kmeans::KMeans;
    use mapreduce::PooledHarness;
    use pagerank::PageRank;
    use svm;
    use svm::{Dataset, SvmParameters, Trainer};

    #[test]
    fn programmatic_usage_of_apriori() {

        /* Every line is a browsing session, every token an item viewed in that session. Sources
           are scanned several times, once per counting pass, so they must be re-readable. */
        let sessions = vec![
            "apple dog pony",
            "apple pony",
            "apple pony bike",
            "dog pony",
        ];

        /* Itemsets have to be seen strictly more often than `min_support` times. */
        let config = AprioriConfig { min_support: 1, ..AprioriConfig::default() };

        let mined = apriori::pairs(&sessions, &config).unwrap();

        for line in mined.lines() {
            println!("{}", line);
        }

        assert_eq!(mined.lines()[0], "apple => pony | confidence: 1.0");

        /* The same source can be mined for rules with two items on the left hand side. */
        let mined = apriori::triples(&sessions, &config).unwrap();
        assert!(mined.rules.is_empty() || mined.lines()[0].starts_with('('));
    }

    #[test]
    fn programmatic_usage_of_friend_recommendations() {

        /* Adjacency lists as in the input files, a user id followed by a tab and the comma
           separated ids of their friends. */
        let adjacency_lists = friends::adjacency_lists_from(
            "1\t2,3\n2\t1,4\n3\t1,4\n4\t2,3\n".as_bytes()).unwrap();

        /* The map and reduce phases run on a thread pool, the output is ordered by user. */
        let harness = PooledHarness::new(2);
        let recommendations =
            friends::recommend(&harness, &adjacency_lists, &FriendsConfig::default()).unwrap();

        for recommendation in recommendations.iter() {
            println!("{}", recommendation);
        }

        assert_eq!(recommendations[0].to_string(), "1\t4");
        assert_eq!(recommendations[1].to_string(), "2\t3");
    }

    #[test]
    fn programmatic_usage_of_kmeans() {

        let points = vec![vec![0.0, 0.0], vec![0.0, 1.0], vec![5.0, 5.0], vec![6.0, 5.0]];
        let initial_centroids = vec![vec![0.0, 0.0], vec![1.0, 1.0]];

        let harness = PooledHarness::new(2);
        let outcome = KMeans::new(KMeansConfig { max_iterations: 5 })
            .run(&harness, &points, &initial_centroids)
            .unwrap();

        /* One cost line per iteration, followed by the assignments of the last iteration. */
        for cost in outcome.cost_log.iter() {
            println!("{}", cost);
        }
        for assignment in outcome.assignments.iter() {
            println!("{}", assignment);
        }

        assert_eq!(outcome.centroids, vec![vec![0.0, 0.5], vec![5.5, 5.0]]);
        assert_eq!(outcome.assignments.len(), points.len());
    }

    #[test]
    fn programmatic_usage_of_svm() {

        let train = Dataset::from_readers(
            "2,1\n1,2\n-2,-1\n-1,-2\n".as_bytes(),
            "1\n1\n-1\n-1\n".as_bytes(),
        ).unwrap();

        /* Presets exist for full batch, stochastic and mini-batch descent. */
        let parameters = SvmParameters { eta: 0.001, c: 1, max_iterations: 2000, ..SvmParameters::sgd() };
        let report = Trainer::new(parameters).mini_batch_gradient_descent(&train).unwrap();

        println!("{} steps, converged: {}", report.iterations, report.converged);
        println!("Training error: {}", svm::classification_error(&report.model, &train));

        assert_eq!(svm::classification_error(&report.model, &train), 0.0);
    }

    #[test]
    fn programmatic_usage_of_pagerank() {

        /* Links point from the first page to the second, page ids start at 1. */
        let edges = graph::edges_from("1 2\n1 3\n2 3\n3 1\n".as_bytes(), Numbering::OneBased)
            .unwrap();
        let graph = Graph::directed(&edges, graph::num_nodes(&edges)).unwrap();

        /* One Monte Carlo estimate per number of walks, compared on the top two pages. */
        let config = PageRankConfig {
            walks_per_node: vec![10, 100],
            top_k: vec![2],
            ..PageRankConfig::default()
        };
        let outcome = PageRank::new(config).run(&graph).unwrap();

        for page in outcome.ranked_pages() {
            println!("{}", page);
        }
        for error in outcome.errors.iter() {
            println!("{}", error);
        }

        assert_eq!(outcome.errors.len(), 2);
        assert!(outcome.ranks[2] > outcome.ranks[1]);
    }

    #[test]
    fn programmatic_usage_of_latent_factors() {

        /* Ratings of items by users, both numbered from 1. */
        let ratings = factors::ratings_from("1 1 5\n1 2 1\n2 1 4\n2 2 2\n".as_bytes()).unwrap();

        let config = FactorsConfig { k: 2, iterations: 20, ..FactorsConfig::default() };
        let report = Factorizer::new(config).fit(&ratings).unwrap();

        /* The regularized error after every pass over the ratings. */
        for error in report.errors.iter() {
            println!("{}", error);
        }

        println!("Predicted rating of item 2 by user 1: {:.2}", report.factors.predict(0, 1));
        assert_eq!(report.errors.len(), 20);
    }
}
