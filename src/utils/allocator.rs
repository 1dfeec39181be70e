use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::marker::PhantomData;

/// Largest slot index an arena hands out; ids pack the index into 24 bits.
pub const MAX_SLOT_INDEX: u32 = 0x00FF_FFFE;

/// Identifier types that can address a slot in an [`Arena`].
pub trait ArenaId: Copy + Eq {
    fn from_parts(index: u32, generation: u8) -> Self;
    fn index(&self) -> usize;
    fn generation(&self) -> u8;
}

/// Unique identifier with generation tracking to prevent stale references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct GenerationalId {
    pub index: u32,
    pub generation: u8,
}

impl GenerationalId {
    pub fn new(index: u32, generation: u8) -> Self {
        Self { index, generation }
    }
}

impl ArenaId for GenerationalId {
    fn from_parts(index: u32, generation: u8) -> Self {
        Self::new(index, generation)
    }

    fn index(&self) -> usize {
        self.index as usize
    }

    fn generation(&self) -> u8 {
        self.generation
    }
}

/// Generational arena that hands out stable IDs while preventing use-after-free.
///
/// Iteration always walks slots in index order, which keeps every pass over the
/// arena deterministic.
pub struct Arena<T, I: ArenaId = GenerationalId> {
    items: Vec<Option<T>>,
    generations: Vec<u8>,
    free_list: VecDeque<usize>,
    live: usize,
    _id: PhantomData<I>,
}

impl<T, I: ArenaId> Default for Arena<T, I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, I: ArenaId> Arena<T, I> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            generations: Vec::new(),
            free_list: VecDeque::new(),
            live: 0,
            _id: PhantomData,
        }
    }

    /// Inserts an item, returning `None` once the index space is exhausted.
    pub fn insert(&mut self, item: T) -> Option<I> {
        self.insert_with(|_| item)
    }

    /// Inserts an item built from the id it is about to receive.
    pub fn insert_with(&mut self, build: impl FnOnce(I) -> T) -> Option<I> {
        if let Some(index) = self.free_list.pop_front() {
            let id = I::from_parts(index as u32, self.generations[index]);
            self.items[index] = Some(build(id));
            self.live += 1;
            return Some(id);
        }

        let index = self.items.len();
        if index as u32 > MAX_SLOT_INDEX {
            return None;
        }
        let id = I::from_parts(index as u32, 0);
        self.items.push(Some(build(id)));
        self.generations.push(0);
        self.live += 1;
        Some(id)
    }

    pub fn get(&self, id: I) -> Option<&T> {
        if self.is_valid(id) {
            self.items.get(id.index()).and_then(|slot| slot.as_ref())
        } else {
            None
        }
    }

    pub fn get_mut(&mut self, id: I) -> Option<&mut T> {
        if self.is_valid(id) {
            self.items.get_mut(id.index()).and_then(|slot| slot.as_mut())
        } else {
            None
        }
    }

    pub fn get2_mut(&mut self, id_a: I, id_b: I) -> Option<(&mut T, &mut T)> {
        if id_a.index() == id_b.index() {
            return None;
        }

        if !self.is_valid(id_a) || !self.is_valid(id_b) {
            return None;
        }

        let (first, second, flipped) = if id_a.index() < id_b.index() {
            (id_a, id_b, false)
        } else {
            (id_b, id_a, true)
        };

        let second_index = second.index();
        if second_index >= self.items.len() {
            return None;
        }

        let (left, right) = self.items.split_at_mut(second_index);
        let first_slot = left
            .get_mut(first.index())
            .and_then(|slot| slot.as_mut())?;
        let second_slot = right.get_mut(0).and_then(|slot| slot.as_mut())?;

        if flipped {
            Some((second_slot, first_slot))
        } else {
            Some((first_slot, second_slot))
        }
    }

    pub fn remove(&mut self, id: I) -> Option<T> {
        if !self.is_valid(id) {
            return None;
        }
        let slot = self.items.get_mut(id.index())?;
        let item = slot.take()?;
        self.generations[id.index()] = self.generations[id.index()].wrapping_add(1);
        self.free_list.push_back(id.index());
        self.live -= 1;
        Some(item)
    }

    pub fn contains(&self, id: I) -> bool {
        self.get(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (I, &T)> + '_ {
        self.items.iter().enumerate().filter_map(|(index, slot)| {
            slot.as_ref()
                .map(|item| (I::from_parts(index as u32, self.generations[index]), item))
        })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> + '_ {
        self.items.iter_mut().filter_map(|slot| slot.as_mut())
    }

    /// Raw slot access for data-parallel passes; empty slots are `None`.
    pub fn slots_mut(&mut self) -> &mut [Option<T>] {
        &mut self.items
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Drops every item, invalidating all outstanding ids.
    pub fn drain(&mut self) -> Vec<T> {
        let mut drained = Vec::with_capacity(self.live);
        for (index, slot) in self.items.iter_mut().enumerate() {
            if let Some(item) = slot.take() {
                self.generations[index] = self.generations[index].wrapping_add(1);
                self.free_list.push_back(index);
                drained.push(item);
            }
        }
        self.live = 0;
        drained
    }

    fn is_valid(&self, id: I) -> bool {
        self.generations
            .get(id.index())
            .copied()
            .map(|gen| gen == id.generation())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_ids_do_not_resolve_after_reuse() {
        let mut arena: Arena<&str> = Arena::new();
        let first = arena.insert("a").unwrap();
        assert_eq!(arena.remove(first), Some("a"));

        let second = arena.insert("b").unwrap();
        assert_eq!(first.index, second.index);
        assert_ne!(first.generation, second.generation);
        assert!(arena.get(first).is_none());
        assert_eq!(arena.get(second), Some(&"b"));
    }

    #[test]
    fn removing_twice_returns_none() {
        let mut arena: Arena<u32> = Arena::new();
        let id = arena.insert(7).unwrap();
        assert_eq!(arena.remove(id), Some(7));
        assert_eq!(arena.remove(id), None);
        assert!(arena.is_empty());
    }

    #[test]
    fn get2_mut_respects_argument_order() {
        let mut arena: Arena<u32> = Arena::new();
        let a = arena.insert(1).unwrap();
        let b = arena.insert(2).unwrap();
        let (x, y) = arena.get2_mut(b, a).unwrap();
        assert_eq!((*x, *y), (2, 1));
        assert!(arena.get2_mut(a, a).is_none());
    }

    #[test]
    fn iteration_follows_slot_order() {
        let mut arena: Arena<u32> = Arena::new();
        let ids: Vec<_> = (0..4).map(|v| arena.insert(v).unwrap()).collect();
        arena.remove(ids[1]);
        let seen: Vec<u32> = arena.iter().map(|(_, v)| *v).collect();
        assert_eq!(seen, vec![0, 2, 3]);
        assert_eq!(arena.len(), 3);
    }
}
