//! Slot storage addressed by stable integer handles
//!
//! Items keep their handle for their whole lifetime, no matter how many other
//! items are inserted or removed. Freed slots are reused in last-in-first-out
//! order, so a fixed sequence of operations always yields the same handles.
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;

/// A key type that can address an [`Arena`]
pub trait ArenaKey: Copy + Eq {
    fn from_slot(slot: usize) -> Self;
    fn slot(self) -> usize;
}

/// Declare a new handle type for use with [`Arena`]
///
/// # Example
///
/// ```rust
/// # use crosscat_utils::{arena_key, Arena};
/// arena_key!(
///     /// A handle to a widget
///     WidgetId
/// );
///
/// let mut arena: Arena<WidgetId, &str> = Arena::new();
/// let id = arena.insert("sprocket");
/// assert_eq!(arena[id], "sprocket");
/// ```
#[macro_export]
macro_rules! arena_key {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Clone,
            Copy,
            Debug,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize,
        )]
        pub struct $name(pub usize);

        impl $crate::ArenaKey for $name {
            #[inline]
            fn from_slot(slot: usize) -> Self {
                $name(slot)
            }

            #[inline]
            fn slot(self) -> usize {
                self.0
            }
        }
    };
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound(serialize = "T: Serialize", deserialize = "T: Deserialize<'de>"))]
pub struct Arena<K, T> {
    slots: Vec<Option<T>>,
    free: Vec<usize>,
    len: usize,
    #[serde(skip)]
    _key: PhantomData<K>,
}

impl<K: ArenaKey, T> Default for Arena<K, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: ArenaKey, T> Arena<K, T> {
    pub fn new() -> Self {
        Arena {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
            _key: PhantomData,
        }
    }

    /// The number of live items
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Store `item` and return its handle
    pub fn insert(&mut self, item: T) -> K {
        self.len += 1;
        match self.free.pop() {
            Some(slot) => {
                debug_assert!(self.slots[slot].is_none());
                self.slots[slot] = Some(item);
                K::from_slot(slot)
            }
            None => {
                self.slots.push(Some(item));
                K::from_slot(self.slots.len() - 1)
            }
        }
    }

    /// Remove and return the item at `key`.
    ///
    /// # Panics
    /// Panics if `key` does not address a live item
    pub fn remove(&mut self, key: K) -> T {
        let slot = key.slot();
        let item = self
            .slots
            .get_mut(slot)
            .and_then(Option::take)
            .unwrap_or_else(|| panic!("No live item in slot {slot}"));
        self.free.push(slot);
        self.len -= 1;
        item
    }

    #[inline]
    pub fn contains(&self, key: K) -> bool {
        self.get(key).is_some()
    }

    #[inline]
    pub fn get(&self, key: K) -> Option<&T> {
        self.slots.get(key.slot()).and_then(Option::as_ref)
    }

    #[inline]
    pub fn get_mut(&mut self, key: K) -> Option<&mut T> {
        self.slots.get_mut(key.slot()).and_then(Option::as_mut)
    }

    /// Iterate over live items in slot order
    pub fn iter(&self) -> impl Iterator<Item = (K, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(slot, item)| item.as_ref().map(|x| (K::from_slot(slot), x)))
    }

    /// The handles of all live items in slot order
    pub fn keys(&self) -> Vec<K> {
        self.iter().map(|(key, _)| key).collect()
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.slots.iter().filter_map(Option::as_ref)
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.slots.iter_mut().filter_map(Option::as_mut)
    }
}

impl<K: ArenaKey, T> std::ops::Index<K> for Arena<K, T> {
    type Output = T;

    fn index(&self, key: K) -> &T {
        self.get(key)
            .unwrap_or_else(|| panic!("No live item in slot {}", key.slot()))
    }
}

impl<K: ArenaKey, T> std::ops::IndexMut<K> for Arena<K, T> {
    fn index_mut(&mut self, key: K) -> &mut T {
        let slot = key.slot();
        self.get_mut(key)
            .unwrap_or_else(|| panic!("No live item in slot {slot}"))
    }
}
