//! Ways and nodes as handed to a [`WayConsumer`](crate::WayConsumer).

use crate::geo::GeoPoint;

use std::iter::FromIterator;

/// A node with its resolved location.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Node {
    pub id: i64,
    pub location: GeoPoint,
}

impl Node {
    pub fn new(id: i64, location: GeoPoint) -> Self {
        Self { id, location }
    }
}

/// Tags of an OSM entity. Keys are unique, insertion order is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tags {
    tags: Vec<(String, String)>,
}

impl Tags {
    pub fn new() -> Self {
        Default::default()
    }

    /// Sets the value of `key`, replacing any previous value.
    pub fn insert<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        let key = key.into();
        let value = value.into();
        match self.tags.iter_mut().find(|(k, _)| *k == key) {
            Some((_, v)) => *v = value,
            None => self.tags.push((key, value)),
        }
    }

    /// Returns the value of the tag with the given `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Checks if there is a tag with a given `key` and `value`.
    pub fn has_tag(&self, key: &str, value: &str) -> bool {
        self.get(key) == Some(value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + Clone {
        self.tags.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Tags {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut tags = Tags::new();
        for (k, v) in iter {
            tags.insert(k, v);
        }
        tags
    }
}

/// A way: an ordered path of located nodes together with its tags.
#[derive(Debug, Clone, PartialEq)]
pub struct Way {
    pub id: i64,
    pub nodes: Vec<Node>,
    pub tags: Tags,
}

impl Way {
    pub fn new(id: i64, nodes: Vec<Node>, tags: Tags) -> Self {
        Self { id, nodes, tags }
    }
}
