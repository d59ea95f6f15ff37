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
use std::io::Read;

use csv::StringRecord;
use fnv::FnvHashMap;

use config::FriendsConfig;
use error::{MiningError, Phase, Result};
use io;
use mapreduce::{Harness, MapContext};
use types::UserId;

/// A user and the users they are already connected to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Adjacency {
    pub user: UserId,
    pub friends: Vec<UserId>,
}

fn parse_user_id(field: &str, line: usize) -> Result<UserId> {
    field.trim().parse::<UserId>().map_err(|err| {
        MiningError::malformed(Phase::FriendsMap, line, format!("'{}' is not a user id: {}", field, err))
    })
}

impl Adjacency {

    /// Parses `userId <TAB> id1,id2,...`, the list of friends may be missing or empty.
    pub fn from_record(record: &StringRecord, line: usize) -> Result<Self> {

        if record.len() > 2 {
            return Err(MiningError::malformed(Phase::FriendsMap, line,
                format!("expected at most 2 tab separated fields, found {}", record.len())));
        }

        let user = match record.get(0) {
            Some(field) => parse_user_id(field, line)?,
            None => return Err(MiningError::malformed(Phase::FriendsMap, line, "missing user id")),
        };

        let mut friends: Vec<UserId> = Vec::new();

        if let Some(field) = record.get(1) {
            // Trailing empty ids are dropped, empty ids in between are malformed.
            let ids = field.trim().trim_end_matches(|c: char| c == ',' || c.is_whitespace());
            if !ids.is_empty() {
                for friend in ids.split(',') {
                    friends.push(parse_user_id(friend, line)?);
                }
            }
        }

        Ok(Adjacency { user, friends })
    }
}

pub fn adjacency_lists_from<R: Read>(reader: R) -> Result<Vec<Adjacency>> {

    let mut tab_reader = io::tab_reader(reader);
    let mut adjacency_lists = Vec::new();

    for result in tab_reader.records() {
        let record = result.map_err(|err| io::csv_to_mining_error(err, Phase::FriendsMap))?;
        let line = record.position().map(|position| position.line() as usize).unwrap_or(0);
        adjacency_lists.push(Adjacency::from_record(&record, line)?);
    }

    Ok(adjacency_lists)
}

pub fn read_adjacency_lists(path: &str) -> Result<Vec<Adjacency>> {
    adjacency_lists_from(io::open(path, Phase::FriendsMap)?)
}

/// Map output: `other` is a candidate for the keyed user, unless they are already connected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Emission {
    pub other: UserId,
    pub already_connected: bool,
}

/// Map function. Marks every existing connection of the user and proposes every pair of the
/// user's friends to each other.
pub fn emit_candidates(adjacency: &Adjacency, context: &mut MapContext<UserId, Emission, ()>) {

    let mut friends = adjacency.friends.clone();
    friends.sort();
    friends.dedup();

    for friend in friends.iter() {
        context.emit(adjacency.user, Emission { other: *friend, already_connected: true });
    }

    for i in 0..friends.len() {
        for j in (i + 1)..friends.len() {
            context.emit(friends[i], Emission { other: friends[j], already_connected: false });
            context.emit(friends[j], Emission { other: friends[i], already_connected: false });
        }
    }
}

/// Per candidate state in the reducer. `Connected` absorbs everything, so the result does not
/// depend on the order in which emissions arrive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tally {
    Connected,
    Mutual(u32),
}

impl Tally {

    pub fn observe(self, already_connected: bool) -> Tally {
        match (self, already_connected) {
            (Tally::Connected, _) | (_, true) => Tally::Connected,
            (Tally::Mutual(count), false) => Tally::Mutual(count + 1),
        }
    }
}

pub fn tally(user: UserId, emissions: &[Emission]) -> FnvHashMap<UserId, Tally> {

    let mut tallies: FnvHashMap<UserId, Tally> =
        FnvHashMap::with_capacity_and_hasher(emissions.len(), Default::default());

    for emission in emissions {
        if emission.other == user {
            continue;
        }
        let entry = tallies.entry(emission.other).or_insert(Tally::Mutual(0));
        *entry = entry.observe(emission.already_connected);
    }

    tallies
}

#[derive(PartialEq, Eq, Debug)]
struct CountedCandidate {
    user: UserId,
    count: u32,
}

/// Better candidates compare as smaller: more mutual friends first, then smaller ids.
impl Ord for CountedCandidate {
    fn cmp(&self, other: &Self) -> Ordering {
        other.count.cmp(&self.count).then_with(|| self.user.cmp(&other.user))
    }
}

impl PartialOrd for CountedCandidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

/// The best `num_to_recommend` unconnected candidates.
pub fn rank(tallies: &FnvHashMap<UserId, Tally>, num_to_recommend: usize) -> Vec<UserId> {

    if num_to_recommend == 0 {
        return Vec::new();
    }

    let mut heap = BinaryHeap::with_capacity(num_to_recommend);

    for (user, tally) in tallies.iter() {
        let count = match *tally {
            Tally::Mutual(count) if count > 0 => count,
            _ => continue,
        };

        let candidate = CountedCandidate { user: *user, count };

        if heap.len() < num_to_recommend {
            heap.push(candidate);
        } else {
            if let Some(mut top) = heap.peek_mut() {
                if candidate < *top {
                    *top = candidate;
                }
            }
        }
    }

    heap.into_sorted_vec()
        .into_iter()
        .map(|candidate| candidate.user)
        .collect()
}

/// Struct used for the output of the reducer. Field names will be used in JSON.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Recommendations {
    pub user: UserId,
    pub recommended: Vec<UserId>,
}

impl fmt::Display for Recommendations {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let ids: Vec<String> = self.recommended.iter().map(|id| id.to_string()).collect();
        write!(f, "{}\t{}", self.user, ids.join(","))
    }
}

/// People you may know: for every user receiving emissions, the users sharing the most friends
/// with them which they are not yet connected to.
pub fn recommend<H: Harness>(
    harness: &H,
    adjacency_lists: &[Adjacency],
    config: &FriendsConfig,
) -> Result<Vec<Recommendations>> {

    let mapped = harness.run_map(adjacency_lists, Phase::FriendsMap,
        |adjacency: &Adjacency, context: &mut MapContext<UserId, Emission, ()>| {
            emit_candidates(adjacency, context);
            Ok(())
        })?;

    info!("{} emissions for {} adjacency lists", mapped.emissions.len(), adjacency_lists.len());

    let num_to_recommend = config.max_recommendations;

    harness.shuffle_reduce(mapped.emissions, Phase::FriendsReduce,
        |user: &UserId, emissions: &[Emission]| {
            let tallies = tally(*user, emissions);
            Ok(Recommendations { user: *user, recommended: rank(&tallies, num_to_recommend) })
        })
}

#[cfg(test)]
mod tests {

    use config::FriendsConfig;
    use error::Phase;
    use friends;
    use friends::{Adjacency, Emission, Tally};
    use mapreduce::{Harness, LocalHarness, MapContext, PooledHarness};

    fn network() -> Vec<Adjacency> {
        friends::adjacency_lists_from("1\t2,3\n2\t1,3\n3\t1,2,4\n4\t3\n".as_bytes()).unwrap()
    }

    #[test]
    fn parsing() {
        let lists = friends::adjacency_lists_from("7\t8,9\n10\n11\t\n".as_bytes()).unwrap();
        assert_eq!(lists, vec![
            Adjacency { user: 7, friends: vec![8, 9] },
            Adjacency { user: 10, friends: vec![] },
            Adjacency { user: 11, friends: vec![] },
        ]);

        assert!(friends::adjacency_lists_from("7\t8,x\n".as_bytes()).is_err());
        assert!(friends::adjacency_lists_from("7\t8,,9\n".as_bytes()).is_err());
        assert!(friends::adjacency_lists_from("seven\t8\n".as_bytes()).is_err());
    }

    #[test]
    fn trailing_commas_are_ignored() {
        let lists = friends::adjacency_lists_from("1\t2,3,\n4\t5,,\n6\t,\n".as_bytes()).unwrap();
        assert_eq!(lists, vec![
            Adjacency { user: 1, friends: vec![2, 3] },
            Adjacency { user: 4, friends: vec![5] },
            Adjacency { user: 6, friends: vec![] },
        ]);
    }

    #[test]
    fn map_emits_connections_and_candidates() {
        let harness = LocalHarness::new();
        let lists = vec![Adjacency { user: 1, friends: vec![3, 2] }];

        let output = harness.run_map(&lists, Phase::FriendsMap,
            |adjacency: &Adjacency, context: &mut MapContext<u64, Emission, ()>| {
                friends::emit_candidates(adjacency, context);
                Ok(())
            }).unwrap();

        assert_eq!(output.emissions, vec![
            (1, Emission { other: 2, already_connected: true }),
            (1, Emission { other: 3, already_connected: true }),
            (2, Emission { other: 3, already_connected: false }),
            (3, Emission { other: 2, already_connected: false }),
        ]);
    }

    #[test]
    fn connected_is_sticky() {
        let mutual = Tally::Mutual(0).observe(false).observe(false);
        assert_eq!(mutual, Tally::Mutual(2));
        assert_eq!(mutual.observe(true), Tally::Connected);
        assert_eq!(Tally::Connected.observe(false), Tally::Connected);

        let emissions = vec![
            Emission { other: 5, already_connected: false },
            Emission { other: 5, already_connected: true },
            Emission { other: 5, already_connected: false },
            Emission { other: 6, already_connected: false },
        ];
        let tallies = friends::tally(1, &emissions);
        assert_eq!(friends::rank(&tallies, 10), vec![6]);
    }

    #[test]
    fn ranking_by_count_then_id() {
        let emissions = vec![
            Emission { other: 9, already_connected: false },
            Emission { other: 4, already_connected: false },
            Emission { other: 4, already_connected: false },
            Emission { other: 7, already_connected: false },
            Emission { other: 8, already_connected: false },
            Emission { other: 8, already_connected: false },
        ];
        let tallies = friends::tally(1, &emissions);

        assert_eq!(friends::rank(&tallies, 10), vec![4, 8, 7, 9]);
        assert_eq!(friends::rank(&tallies, 3), vec![4, 8, 7]);
        assert!(friends::rank(&tallies, 0).is_empty());
    }

    #[test]
    fn people_you_may_know() {
        let recommendations = friends::recommend(
            &LocalHarness::new(), &network(), &FriendsConfig::default()).unwrap();

        let lines: Vec<String> = recommendations.iter().map(|r| r.to_string()).collect();
        assert_eq!(lines, vec!["1\t4", "2\t4", "3\t", "4\t1,2"]);
    }

    #[test]
    fn independent_of_arrival_order() {
        let expected = friends::recommend(
            &LocalHarness::new(), &network(), &FriendsConfig::default()).unwrap();

        for seed in 1..10 {
            let shuffled = friends::recommend(&LocalHarness::with_shuffled_groups(seed),
                &network(), &FriendsConfig::default()).unwrap();
            assert_eq!(shuffled, expected);
        }

        let pooled = friends::recommend(
            &PooledHarness::new(3), &network(), &FriendsConfig::default()).unwrap();
        assert_eq!(pooled, expected);
    }

    #[test]
    fn at_most_ten_recommendations() {
        let hub = Adjacency { user: 0, friends: (1..20).collect() };
        let recommendations = friends::recommend(
            &LocalHarness::new(), &[hub], &FriendsConfig::default()).unwrap();

        assert_eq!(recommendations.len(), 20);
        assert_eq!(recommendations[0].user, 0);
        assert!(recommendations[0].recommended.is_empty());
        assert_eq!(recommendations[1].user, 1);
        assert_eq!(recommendations[1].recommended, vec![2, 3, 4, 5, 6, 7, 8, 9, 10, 11]);
    }
}
