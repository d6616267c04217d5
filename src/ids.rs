use crate::geo::GeoPoint;

use rayon::prelude::*;

/// Maps node ids to their locations
#[derive(Debug)]
pub struct NodeLocations {
    // node id x is stored in the sorted table of x / 2^24, keyed by x % 2^24
    data: Vec<Vec<Entry>>,
    len: usize,
}

#[derive(Debug, Default)]
pub struct NodeLocationsBuilder {
    // stores the same data as NodeLocations, but not yet sorted
    data: Vec<Vec<Entry>>,
    len: usize,
}

// location is kept in fixed point (1e-7 degrees) to fit an entry in 12 bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Entry {
    key: u32,
    lat: i32,
    lon: i32,
}

fn split_id(id: u64) -> (usize, u32) {
    ((id >> 24) as usize, (id % (1_u64 << 24)) as u32)
}

impl NodeLocationsBuilder {
    pub fn new() -> Self {
        Default::default()
    }

    /// Inserts the fixed point location of a node
    pub fn insert(&mut self, id: u64, lat: i32, lon: i32) {
        let (id_set, key) = split_id(id);
        if self.data.len() <= id_set {
            self.data.resize(id_set + 1, Vec::new());
        }
        self.data[id_set].push(Entry { key, lat, lon });
        self.len += 1;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn build(mut self) -> NodeLocations {
        self.data
            .par_iter_mut()
            .for_each(|x| x.par_sort_unstable_by_key(|entry| entry.key));

        NodeLocations {
            data: self.data,
            len: self.len,
        }
    }
}

impl NodeLocations {
    pub fn get(&self, id: u64) -> Option<GeoPoint> {
        let (id_set, key) = split_id(id);
        let entries = self.data.get(id_set)?;
        entries
            .binary_search_by_key(&key, |entry| entry.key)
            .ok()
            .map(|pos| GeoPoint::from_fixed(entries[pos].lat, entries[pos].lon))
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
