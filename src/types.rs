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

use fnv::FnvHashMap;

use itemsets::{CanonicalPair, CanonicalTriple};

/// Dense vector of a fixed dimension for the whole program run.
pub type Vector = Vec<f64>;

pub type UserId = u64;

/// Dense identifier of an interned token, see `itemsets::ItemDictionary`.
pub type ItemId = u32;

pub type PairSupports = FnvHashMap<CanonicalPair, u32>;
pub type TripleSupports = FnvHashMap<CanonicalTriple, u32>;

pub fn new_pair_supports(capacity: usize) -> PairSupports {
    FnvHashMap::with_capacity_and_hasher(capacity, Default::default())
}

pub fn new_triple_supports(capacity: usize) -> TripleSupports {
    FnvHashMap::with_capacity_and_hasher(capacity, Default::default())
}
