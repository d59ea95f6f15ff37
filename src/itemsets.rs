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

use types::ItemId;

/// Unordered set of two distinct items, stored sorted so that equality and hashing need no
/// special treatment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CanonicalPair(ItemId, ItemId);

impl CanonicalPair {

    /// Returns `None` if both items are the same.
    pub fn new(a: ItemId, b: ItemId) -> Option<Self> {
        if a < b {
            Some(CanonicalPair(a, b))
        } else if b < a {
            Some(CanonicalPair(b, a))
        } else {
            None
        }
    }

    pub fn first(&self) -> ItemId {
        self.0
    }

    pub fn second(&self) -> ItemId {
        self.1
    }
}

/// Unordered set of three distinct items in sorted order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CanonicalTriple([ItemId; 3]);

impl CanonicalTriple {

    /// Returns `None` unless all three items are distinct.
    pub fn new(a: ItemId, b: ItemId, c: ItemId) -> Option<Self> {
        let mut items = [a, b, c];
        items.sort();

        if items[0] == items[1] || items[1] == items[2] {
            None
        } else {
            Some(CanonicalTriple(items))
        }
    }

    pub fn items(&self) -> [ItemId; 3] {
        self.0
    }

    /// The three sub-pairs: {a,b}, {b,c} and {a,c}.
    pub fn pairs(&self) -> [CanonicalPair; 3] {
        let [a, b, c] = self.0;
        [CanonicalPair(a, b), CanonicalPair(b, c), CanonicalPair(a, c)]
    }
}

/// Maps tokens to dense integer ids and keeps their number of occurrences. Ids are handed out in
/// lexicographic order of the tokens, therefore comparing ids is the same as comparing tokens.
pub struct ItemDictionary {
    item_dict: FnvHashMap<String, ItemId>,
    item_names: Vec<String>,
    item_counts: Vec<u32>,
}

impl ItemDictionary {

    pub fn from_counts(counts: FnvHashMap<String, u32>) -> Self {

        let mut entries: Vec<(String, u32)> = counts.into_iter().collect();
        entries.sort();

        let mut item_dict: FnvHashMap<String, ItemId> =
            FnvHashMap::with_capacity_and_hasher(entries.len(), Default::default());
        let mut item_names: Vec<String> = Vec::with_capacity(entries.len());
        let mut item_counts: Vec<u32> = Vec::with_capacity(entries.len());

        for (item_index, (item, count)) in entries.into_iter().enumerate() {
            item_dict.insert(item.clone(), item_index as ItemId);
            item_names.push(item);
            item_counts.push(count);
        }

        ItemDictionary { item_dict, item_names, item_counts }
    }

    pub fn num_items(&self) -> usize {
        self.item_names.len()
    }

    pub fn item_index(&self, name: &str) -> Option<ItemId> {
        self.item_dict.get(name).cloned()
    }

    pub fn item_name(&self, item_index: ItemId) -> &str {
        &self.item_names[item_index as usize]
    }

    pub fn count(&self, item_index: ItemId) -> u32 {
        self.item_counts[item_index as usize]
    }

    pub fn is_frequent(&self, item_index: ItemId, min_support: u32) -> bool {
        self.count(item_index) > min_support
    }

    pub fn num_frequent(&self, min_support: u32) -> usize {
        self.item_counts.iter().filter(|count| **count > min_support).count()
    }

    /// Ids of the distinct known tokens of a line, sorted.
    pub fn distinct_items<'a, I>(&self, tokens: I) -> Vec<ItemId>
        where I: IntoIterator<Item=&'a str> {

        let mut items: Vec<ItemId> = tokens.into_iter()
            .filter_map(|token| self.item_index(token))
            .collect();

        items.sort();
        items.dedup();
        items
    }
}
