/// Index into an [`Arena`]. Only valid for the arena that produced it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArenaIndex(u32);

impl ArenaIndex {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Append-only arena. Items are never moved out or removed, so a reference
/// obtained through [`Arena::get`] stays valid for the arena's lifetime.
#[derive(Debug, Clone)]
pub struct Arena<T> {
    items: Vec<T>,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Arena { items: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Arena {
            items: Vec::with_capacity(capacity),
        }
    }

    pub fn alloc(&mut self, v: T) -> ArenaIndex {
        self.items.push(v);
        ArenaIndex((self.items.len() - 1) as u32)
    }

    pub fn get(&self, idx: ArenaIndex) -> Option<&T> {
        self.items.get(idx.index())
    }

    /// Mutable access for the builder that owns the arena. Callers that hand
    /// out shared references must not keep this reachable.
    pub fn get_mut(&mut self, idx: ArenaIndex) -> Option<&mut T> {
        self.items.get_mut(idx.index())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterates items in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = (ArenaIndex, &T)> + '_ {
        self.items
            .iter()
            .enumerate()
            .map(|(i, v)| (ArenaIndex(i as u32), v))
    }
}

impl<T> std::ops::Index<ArenaIndex> for Arena<T> {
    type Output = T;

    /// Panics if `idx` came from a different, smaller arena.
    fn index(&self, idx: ArenaIndex) -> &T {
        &self.items[idx.index()]
    }
}
