//! Generation-counted handle tables.
//!
//! A handle packs a slot index and the slot's generation into one `u64`.
//! Removing an entry bumps the generation, so a stale handle stops
//! resolving instead of aliasing whatever reuses the slot. Generations
//! start at 1, which keeps the raw value 0 free to mean "null".

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Marker types naming what a handle refers to.
pub mod kind {
    /// An open document.
    #[derive(Debug)]
    pub enum Document {}
    /// A loaded page.
    #[derive(Debug)]
    pub enum Page {}
    /// The text layer of a page.
    #[derive(Debug)]
    pub enum TextPage {}
    /// An incremental search session.
    #[derive(Debug)]
    pub enum Search {}
    /// An outline entry owned by a document.
    #[derive(Debug)]
    pub enum Bookmark {}
    /// A link annotation owned by a page.
    #[derive(Debug)]
    pub enum Link {}
}

/// Human-readable name of a handle kind, used in errors and logs.
pub trait HandleKind {
    const NAME: &'static str;
}

impl HandleKind for kind::Document {
    const NAME: &'static str = "document";
}
impl HandleKind for kind::Page {
    const NAME: &'static str = "page";
}
impl HandleKind for kind::TextPage {
    const NAME: &'static str = "text page";
}
impl HandleKind for kind::Search {
    const NAME: &'static str = "search";
}
impl HandleKind for kind::Bookmark {
    const NAME: &'static str = "bookmark";
}
impl HandleKind for kind::Link {
    const NAME: &'static str = "link";
}

/// Opaque, typed identifier of a native resource.
pub struct Handle<K> {
    index: u32,
    generation: u32,
    _kind: PhantomData<fn() -> K>,
}

pub type DocumentHandle = Handle<kind::Document>;
pub type PageHandle = Handle<kind::Page>;
pub type TextPageHandle = Handle<kind::TextPage>;
pub type SearchHandle = Handle<kind::Search>;
pub type BookmarkHandle = Handle<kind::Bookmark>;
pub type LinkHandle = Handle<kind::Link>;

impl<K> Handle<K> {
    fn new(index: u32, generation: u32) -> Self {
        Self {
            index,
            generation,
            _kind: PhantomData,
        }
    }

    /// The value handed across the host boundary.
    pub fn to_raw(self) -> u64 {
        (u64::from(self.generation) << 32) | u64::from(self.index)
    }

    /// Rebuild a handle from a host value. `0` is the null handle.
    pub fn from_raw(raw: u64) -> Option<Self> {
        let generation = (raw >> 32) as u32;
        if generation == 0 {
            return None;
        }
        Some(Self::new(raw as u32, generation))
    }
}

impl<K> Clone for Handle<K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K> Copy for Handle<K> {}

impl<K> PartialEq for Handle<K> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}

impl<K> Eq for Handle<K> {}

impl<K> Hash for Handle<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.to_raw().hash(state);
    }
}

impl<K: HandleKind> fmt::Debug for Handle<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}v{}", K::NAME, self.index, self.generation)
    }
}

enum Slot<T> {
    Occupied { generation: u32, value: T },
    Vacant { generation: u32, next_free: Option<u32> },
}

/// Slot array of live resources with a free list.
pub struct HandleTable<K, T> {
    slots: Vec<Slot<T>>,
    free_head: Option<u32>,
    len: usize,
    _kind: PhantomData<fn() -> K>,
}

impl<K, T> Default for HandleTable<K, T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free_head: None,
            len: 0,
            _kind: PhantomData,
        }
    }
}

impl<K, T> HandleTable<K, T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` and issue a fresh handle for it.
    pub fn insert(&mut self, value: T) -> Handle<K> {
        self.len += 1;
        if let Some(index) = self.free_head {
            let slot = &mut self.slots[index as usize];
            let (generation, next_free) = match slot {
                Slot::Vacant {
                    generation,
                    next_free,
                } => (*generation, *next_free),
                Slot::Occupied { .. } => unreachable!("free list points at an occupied slot"),
            };
            *slot = Slot::Occupied { generation, value };
            self.free_head = next_free;
            return Handle::new(index, generation);
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot::Occupied {
            generation: 1,
            value,
        });
        Handle::new(index, 1)
    }

    pub fn get(&self, handle: Handle<K>) -> Option<&T> {
        match self.slots.get(handle.index as usize)? {
            Slot::Occupied { generation, value } if *generation == handle.generation => Some(value),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, handle: Handle<K>) -> Option<&mut T> {
        match self.slots.get_mut(handle.index as usize)? {
            Slot::Occupied { generation, value } if *generation == handle.generation => Some(value),
            _ => None,
        }
    }

    pub fn contains(&self, handle: Handle<K>) -> bool {
        self.get(handle).is_some()
    }

    /// Take the value out and invalidate `handle`.
    pub fn remove(&mut self, handle: Handle<K>) -> Option<T> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        match slot {
            Slot::Occupied { generation, .. } if *generation == handle.generation => {}
            _ => return None,
        }

        // Skip generation 0 on wrap so raw handles never collide with null.
        let next_generation = handle.generation.wrapping_add(1).max(1);
        let old = std::mem::replace(
            slot,
            Slot::Vacant {
                generation: next_generation,
                next_free: self.free_head,
            },
        );
        self.free_head = Some(handle.index);
        self.len -= 1;
        match old {
            Slot::Occupied { value, .. } => Some(value),
            Slot::Vacant { .. } => None,
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Handles of all live entries, in slot order.
    pub fn handles(&self) -> Vec<Handle<K>> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| match slot {
                Slot::Occupied { generation, .. } => Some(Handle::new(index as u32, *generation)),
                Slot::Vacant { .. } => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Table = HandleTable<kind::Page, &'static str>;

    #[test]
    fn test_insert_and_get() {
        let mut table = Table::new();
        let a = table.insert("a");
        let b = table.insert("b");
        assert_ne!(a, b);
        assert_eq!(table.get(a), Some(&"a"));
        assert_eq!(table.get(b), Some(&"b"));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_stale_handle_after_reuse() {
        let mut table = Table::new();
        let a = table.insert("a");
        assert_eq!(table.remove(a), Some("a"));
        assert_eq!(table.remove(a), None);

        let b = table.insert("b");
        // Same slot, new generation.
        assert_eq!(a.to_raw() as u32, b.to_raw() as u32);
        assert_eq!(table.get(a), None);
        assert_eq!(table.get(b), Some(&"b"));
        assert!(!table.is_empty());
    }

    #[test]
    fn test_raw_round_trip_and_null() {
        let mut table = Table::new();
        let a = table.insert("a");
        let raw = a.to_raw();
        assert_ne!(raw, 0);
        assert_eq!(PageHandle::from_raw(raw), Some(a));
        assert_eq!(PageHandle::from_raw(0), None);
        assert_eq!(format!("{:?}", a), "page#0v1");
    }

    #[test]
    fn test_handles_lists_live_entries() {
        let mut table = Table::new();
        let a = table.insert("a");
        let b = table.insert("b");
        let c = table.insert("c");
        table.remove(b);
        assert_eq!(table.handles(), vec![a, c]);
    }

    #[test]
    fn test_forged_handle_rejected() {
        let mut table = Table::new();
        table.insert("a");
        let forged = PageHandle::from_raw(7u64 << 32).unwrap();
        assert_eq!(table.get(forged), None);
        let out_of_range = PageHandle::from_raw((1u64 << 32) | 99).unwrap();
        assert_eq!(table.get(out_of_range), None);
    }
}
