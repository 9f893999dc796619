//! Insertion-ordered map used for the named tables of the skeleton model.
//!
//! Keys can be looked up by value (hashed) or by position. Inserting or removing anywhere but the
//! end is `O(n)` because the stored positions of the following keys are renumbered.

use crate::Error;
use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

#[derive(Clone, Debug)]
pub struct OrderedMap<K, V> {
    index: HashMap<K, usize>,
    keys: Vec<K>,
    values: Vec<V>,
    version: u64,
}

impl<K, V> Default for OrderedMap<K, V> {
    fn default() -> Self {
        Self {
            index: HashMap::new(),
            keys: Vec::new(),
            values: Vec::new(),
            version: 0,
        }
    }
}

impl<K, V> OrderedMap<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            index: HashMap::with_capacity(capacity),
            keys: Vec::with_capacity(capacity),
            values: Vec::with_capacity(capacity),
            version: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Change counter, bumped by every mutation.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn key_at(&self, index: usize) -> Option<&K> {
        self.keys.get(index)
    }

    pub fn value_at(&self, index: usize) -> Option<&V> {
        self.values.get(index)
    }

    pub fn value_at_mut(&mut self, index: usize) -> Option<&mut V> {
        self.values.get_mut(index)
    }

    pub fn get_index(&self, index: usize) -> Option<(&K, &V)> {
        Some((self.keys.get(index)?, self.values.get(index)?))
    }

    /// Replaces the value stored at `index`, keeping its key.
    pub fn set_value_at(&mut self, index: usize, value: V) -> Result<V, Error> {
        let len = self.len();
        let slot = self
            .values
            .get_mut(index)
            .ok_or(Error::IndexOutOfRange { index, len })?;
        self.version = self.version.wrapping_add(1);
        Ok(std::mem::replace(slot, value))
    }

    pub fn clear(&mut self) {
        self.index.clear();
        self.keys.clear();
        self.values.clear();
        self.version = self.version.wrapping_add(1);
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            keys: self.keys.iter(),
            values: self.values.iter(),
        }
    }

    pub fn keys(&self) -> std::slice::Iter<'_, K> {
        self.keys.iter()
    }

    pub fn values(&self) -> std::slice::Iter<'_, V> {
        self.values.iter()
    }

    pub fn values_mut(&mut self) -> std::slice::IterMut<'_, V> {
        self.values.iter_mut()
    }

    /// Starts a detached walk over the entries.
    ///
    /// Unlike [`OrderedMap::iter`], a cursor does not borrow the map between steps, so the map can
    /// be mutated while a walk is in progress; the next step then reports
    /// [`Error::CollectionModified`].
    pub fn cursor(&self) -> Cursor {
        Cursor {
            position: 0,
            version: self.version,
        }
    }
}

impl<K, V> OrderedMap<K, V>
where
    K: Hash + Eq + Clone,
{
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.index.contains_key(key)
    }

    pub fn index_of<Q>(&self, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.index.get(key).copied()
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let index = *self.index.get(key)?;
        self.values.get(index)
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let index = *self.index.get(key)?;
        self.values.get_mut(index)
    }

    /// Appends a new entry. Fails without modifying the map if the key is already present.
    pub fn add(&mut self, key: K, value: V) -> Result<(), Error> {
        if let Some(&index) = self.index.get(&key) {
            return Err(Error::DuplicateKey { index });
        }
        self.index.insert(key.clone(), self.keys.len());
        self.keys.push(key);
        self.values.push(value);
        self.version = self.version.wrapping_add(1);
        Ok(())
    }

    /// Inserts a new entry at `index` (`0..=len`), shifting the following entries up by one.
    pub fn insert(&mut self, index: usize, key: K, value: V) -> Result<(), Error> {
        let len = self.len();
        if index > len {
            return Err(Error::IndexOutOfRange { index, len });
        }
        if let Some(&existing) = self.index.get(&key) {
            return Err(Error::DuplicateKey { index: existing });
        }
        for later in &self.keys[index..] {
            if let Some(position) = self.index.get_mut(later) {
                *position += 1;
            }
        }
        self.index.insert(key.clone(), index);
        self.keys.insert(index, key);
        self.values.insert(index, value);
        self.version = self.version.wrapping_add(1);
        Ok(())
    }

    /// Upserts by key: replaces the value in place when the key exists, appends otherwise.
    /// Returns the replaced value.
    pub fn set(&mut self, key: K, value: V) -> Option<V> {
        match self.index.get(&key) {
            Some(&index) => {
                self.version = self.version.wrapping_add(1);
                Some(std::mem::replace(&mut self.values[index], value))
            }
            None => {
                self.index.insert(key.clone(), self.keys.len());
                self.keys.push(key);
                self.values.push(value);
                self.version = self.version.wrapping_add(1);
                None
            }
        }
    }

    /// Replaces the whole entry at `index`, possibly under a different key. Returns the old pair.
    pub fn set_at(&mut self, index: usize, key: K, value: V) -> Result<(K, V), Error> {
        let len = self.len();
        if index >= len {
            return Err(Error::IndexOutOfRange { index, len });
        }
        match self.index.get(&key) {
            Some(&existing) if existing != index => {
                return Err(Error::DuplicateKey { index: existing });
            }
            Some(_) => {}
            None => {
                self.index.remove(&self.keys[index]);
                self.index.insert(key.clone(), index);
            }
        }
        let old_key = std::mem::replace(&mut self.keys[index], key);
        let old_value = std::mem::replace(&mut self.values[index], value);
        self.version = self.version.wrapping_add(1);
        Ok((old_key, old_value))
    }

    /// Removes the entry at `index`, shifting the following entries down by one.
    pub fn remove_at(&mut self, index: usize) -> Result<(K, V), Error> {
        let len = self.len();
        if index >= len {
            return Err(Error::IndexOutOfRange { index, len });
        }
        for later in &self.keys[index + 1..] {
            if let Some(position) = self.index.get_mut(later) {
                *position -= 1;
            }
        }
        let key = self.keys.remove(index);
        let value = self.values.remove(index);
        self.index.remove(&key);
        self.version = self.version.wrapping_add(1);
        Ok((key, value))
    }

    /// Removes an entry by key. `None` when the key is not present.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let index = *self.index.get(key)?;
        self.remove_at(index).ok().map(|(_, value)| value)
    }

    /// Builds a map keyed by `key_fn`, failing on the first duplicate key.
    pub fn from_keyed<I, F>(items: I, mut key_fn: F) -> Result<Self, Error>
    where
        I: IntoIterator<Item = V>,
        F: FnMut(&V) -> K,
    {
        let items = items.into_iter();
        let mut map = Self::with_capacity(items.size_hint().0);
        for item in items {
            let key = key_fn(&item);
            map.add(key, item)?;
        }
        Ok(map)
    }
}

impl<K, V> FromIterator<(K, V)> for OrderedMap<K, V>
where
    K: Hash + Eq + Clone,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let mut map = Self::with_capacity(iter.size_hint().0);
        for (key, value) in iter {
            map.set(key, value);
        }
        map
    }
}

impl<'a, K, V> IntoIterator for &'a OrderedMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K, V> IntoIterator for OrderedMap<K, V> {
    type Item = (K, V);
    type IntoIter = std::iter::Zip<std::vec::IntoIter<K>, std::vec::IntoIter<V>>;

    fn into_iter(self) -> Self::IntoIter {
        self.keys.into_iter().zip(self.values)
    }
}

pub struct Iter<'a, K, V> {
    keys: std::slice::Iter<'a, K>,
    values: std::slice::Iter<'a, V>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        Some((self.keys.next()?, self.values.next()?))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.keys.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for Iter<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        Some((self.keys.next_back()?, self.values.next_back()?))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

/// Position in a detached walk started by [`OrderedMap::cursor`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Cursor {
    position: usize,
    version: u64,
}

impl Cursor {
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn next<'a, K, V>(
        &mut self,
        map: &'a OrderedMap<K, V>,
    ) -> Result<Option<(&'a K, &'a V)>, Error> {
        if map.version != self.version {
            return Err(Error::CollectionModified);
        }
        let entry = map.get_index(self.position);
        if entry.is_some() {
            self.position += 1;
        }
        Ok(entry)
    }
}

#[cfg(feature = "serde")]
mod serde_impls {
    use super::OrderedMap;
    use serde::de::{Deserialize, Deserializer, Error as _, MapAccess, Visitor};
    use serde::ser::{Serialize, SerializeMap, Serializer};
    use std::fmt;
    use std::hash::Hash;
    use std::marker::PhantomData;

    impl<K, V> Serialize for OrderedMap<K, V>
    where
        K: Serialize,
        V: Serialize,
    {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let mut map = serializer.serialize_map(Some(self.len()))?;
            for (key, value) in self {
                map.serialize_entry(key, value)?;
            }
            map.end()
        }
    }

    struct OrderedMapVisitor<K, V>(PhantomData<(K, V)>);

    impl<'de, K, V> Visitor<'de> for OrderedMapVisitor<K, V>
    where
        K: Deserialize<'de> + Hash + Eq + Clone,
        V: Deserialize<'de>,
    {
        type Value = OrderedMap<K, V>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a map")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
            let mut map = OrderedMap::with_capacity(access.size_hint().unwrap_or(0));
            while let Some((key, value)) = access.next_entry()? {
                map.add(key, value).map_err(A::Error::custom)?;
            }
            Ok(map)
        }
    }

    impl<'de, K, V> Deserialize<'de> for OrderedMap<K, V>
    where
        K: Deserialize<'de> + Hash + Eq + Clone,
        V: Deserialize<'de>,
    {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            deserializer.deserialize_map(OrderedMapVisitor(PhantomData))
        }
    }
}
