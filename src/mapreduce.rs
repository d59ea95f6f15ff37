//! A minimal shuffle-by-key substrate. Map functions see one record at a time and may only keep an
//! additive accumulator between records, reduce functions see all values of a key in no
//! particular order.

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

use std::hash::Hash;
use std::sync::Mutex;

use fnv::FnvHashMap;
use num_cpus;
use rand::{Rng, SeedableRng, XorShiftRng};
use scoped_pool::Pool;

use error::{MiningError, Phase, Result};

/// Accumulators local to a map worker, merged after all workers finished.
pub trait Combine {
    fn combine(&mut self, other: Self);
}

impl Combine for () {
    fn combine(&mut self, _other: ()) {}
}

impl Combine for f64 {
    fn combine(&mut self, other: f64) {
        *self += other;
    }
}

impl Combine for u64 {
    fn combine(&mut self, other: u64) {
        *self += other;
    }
}

/// Handed to the map function for every record.
pub struct MapContext<K, V, A> {
    emissions: Vec<(K, V)>,
    accumulator: A,
}

impl<K, V, A: Default> MapContext<K, V, A> {

    fn new() -> Self {
        MapContext { emissions: Vec::new(), accumulator: A::default() }
    }

    pub fn emit(&mut self, key: K, value: V) {
        self.emissions.push((key, value));
    }

    pub fn accumulator(&mut self) -> &mut A {
        &mut self.accumulator
    }

    fn into_output(self) -> MapOutput<K, V, A> {
        MapOutput { emissions: self.emissions, accumulator: self.accumulator }
    }
}

pub struct MapOutput<K, V, A> {
    pub emissions: Vec<(K, V)>,
    pub accumulator: A,
}

pub trait Harness {

    /// Applies `map_fn` to every record, collecting all emissions and the combined accumulator.
    fn run_map<R, K, V, A, F>(&self, records: &[R], phase: Phase, map_fn: F)
        -> Result<MapOutput<K, V, A>>
        where R: Sync, K: Send, V: Send, A: Combine + Default + Send,
              F: Fn(&R, &mut MapContext<K, V, A>) -> Result<()> + Sync;

    /// Groups the emissions by key and applies `reduce_fn` once per key. Results are ordered by
    /// key.
    fn shuffle_reduce<K, V, O, F>(&self, emissions: Vec<(K, V)>, phase: Phase, reduce_fn: F)
        -> Result<Vec<O>>
        where K: Hash + Ord + Send + Sync, V: Send + Sync, O: Send,
              F: Fn(&K, &[V]) -> Result<O> + Sync;
}

fn map_chunk<R, K, V, A, F>(records: &[R], map_fn: &F) -> Result<MapOutput<K, V, A>>
    where A: Default, F: Fn(&R, &mut MapContext<K, V, A>) -> Result<()> {

    let mut context = MapContext::new();
    for record in records {
        map_fn(record, &mut context)?;
    }

    Ok(context.into_output())
}

fn group_by_key<K: Hash + Ord, V>(emissions: Vec<(K, V)>) -> Vec<(K, Vec<V>)> {

    let mut groups: FnvHashMap<K, Vec<V>> = FnvHashMap::default();

    for (key, value) in emissions {
        groups.entry(key).or_insert_with(Vec::new).push(value);
    }

    let mut groups: Vec<(K, Vec<V>)> = groups.into_iter().collect();
    groups.sort_by(|a, b| a.0.cmp(&b.0));
    groups
}

/// Runs everything on the calling thread. Optionally permutes the values within each key group
/// to surface reducers which depend on the arrival order.
#[derive(Clone, Debug, Default)]
pub struct LocalHarness {
    shuffle_seed: Option<u32>,
}

impl LocalHarness {

    pub fn new() -> Self {
        LocalHarness::default()
    }

    pub fn with_shuffled_groups(seed: u32) -> Self {
        LocalHarness { shuffle_seed: Some(seed) }
    }
}

impl Harness for LocalHarness {

    fn run_map<R, K, V, A, F>(&self, records: &[R], _phase: Phase, map_fn: F)
        -> Result<MapOutput<K, V, A>>
        where R: Sync, K: Send, V: Send, A: Combine + Default + Send,
              F: Fn(&R, &mut MapContext<K, V, A>) -> Result<()> + Sync {

        map_chunk(records, &map_fn)
    }

    fn shuffle_reduce<K, V, O, F>(&self, emissions: Vec<(K, V)>, _phase: Phase, reduce_fn: F)
        -> Result<Vec<O>>
        where K: Hash + Ord + Send + Sync, V: Send + Sync, O: Send,
              F: Fn(&K, &[V]) -> Result<O> + Sync {

        let mut groups = group_by_key(emissions);

        if let Some(seed) = self.shuffle_seed {
            let mut rng = XorShiftRng::from_seed([seed, 0x193a_6754, 0xa8a7_d469, 0x9783_0e05]);
            for &mut (_, ref mut values) in groups.iter_mut() {
                rng.shuffle(values);
            }
        }

        groups.iter()
            .map(|&(ref key, ref values)| reduce_fn(key, values))
            .collect()
    }
}

/// Spreads map and reduce work over a scoped thread pool, one contiguous partition per worker.
/// Partitions are merged in order, so results match the `LocalHarness`.
pub struct PooledHarness {
    pool: Pool,
    num_workers: usize,
}

impl PooledHarness {

    pub fn new(num_workers: usize) -> Self {
        let num_workers = if num_workers == 0 { 1 } else { num_workers };
        PooledHarness { pool: Pool::new(num_workers), num_workers }
    }

    /// One worker per CPU.
    pub fn for_all_cpus() -> Self {
        PooledHarness::new(num_cpus::get())
    }

    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    fn partition_size(&self, num_elements: usize) -> usize {
        let size = (num_elements + self.num_workers - 1) / self.num_workers;
        if size == 0 { 1 } else { size }
    }
}

impl Drop for PooledHarness {
    fn drop(&mut self) {
        self.pool.shutdown();
    }
}

fn collect_slots<T>(slots: Vec<Mutex<Option<Result<T>>>>, phase: Phase) -> Result<Vec<T>> {
    slots.into_iter()
        .map(|slot| {
            match slot.into_inner() {
                Ok(Some(result)) => result,
                _ => Err(MiningError::invariant(phase, "a worker did not complete its partition")),
            }
        })
        .collect()
}

impl Harness for PooledHarness {

    fn run_map<R, K, V, A, F>(&self, records: &[R], phase: Phase, map_fn: F)
        -> Result<MapOutput<K, V, A>>
        where R: Sync, K: Send, V: Send, A: Combine + Default + Send,
              F: Fn(&R, &mut MapContext<K, V, A>) -> Result<()> + Sync {

        let partitions: Vec<&[R]> = records.chunks(self.partition_size(records.len())).collect();
        let slots: Vec<Mutex<Option<Result<MapOutput<K, V, A>>>>> =
            partitions.iter().map(|_| Mutex::new(None)).collect();

        self.pool.scoped(|scope| {
            for (partition, slot) in partitions.iter().zip(slots.iter()) {
                let map_fn = &map_fn;

                scope.execute(move || {
                    let result = map_chunk(partition, map_fn);
                    if let Ok(mut slot) = slot.lock() {
                        *slot = Some(result);
                    }
                });
            }
        });

        let mut merged = MapOutput { emissions: Vec::new(), accumulator: A::default() };

        for output in collect_slots(slots, phase)? {
            merged.emissions.extend(output.emissions);
            merged.accumulator.combine(output.accumulator);
        }

        Ok(merged)
    }

    fn shuffle_reduce<K, V, O, F>(&self, emissions: Vec<(K, V)>, phase: Phase, reduce_fn: F)
        -> Result<Vec<O>>
        where K: Hash + Ord + Send + Sync, V: Send + Sync, O: Send,
              F: Fn(&K, &[V]) -> Result<O> + Sync {

        let groups = group_by_key(emissions);

        let partitions: Vec<&[(K, Vec<V>)]> =
            groups.chunks(self.partition_size(groups.len())).collect();
        let slots: Vec<Mutex<Option<Result<Vec<O>>>>> =
            partitions.iter().map(|_| Mutex::new(None)).collect();

        self.pool.scoped(|scope| {
            for (partition, slot) in partitions.iter().zip(slots.iter()) {
                let reduce_fn = &reduce_fn;

                scope.execute(move || {
                    let result: Result<Vec<O>> = partition.iter()
                        .map(|&(ref key, ref values)| reduce_fn(key, values))
                        .collect();

                    if let Ok(mut slot) = slot.lock() {
                        *slot = Some(result);
                    }
                });
            }
        });

        let mut reduced = Vec::with_capacity(groups.len());
        for outputs in collect_slots(slots, phase)? {
            reduced.extend(outputs);
        }

        Ok(reduced)
    }
}
