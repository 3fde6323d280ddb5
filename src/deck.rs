use serde::Serialize;
use std::fmt;
use std::ops::{Index, IndexMut};

/// One of the two playback decks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum DeckId {
    A,
    B,
}

impl DeckId {
    pub fn other(self) -> DeckId {
        match self {
            DeckId::A => DeckId::B,
            DeckId::B => DeckId::A,
        }
    }

    fn slot(self) -> usize {
        match self {
            DeckId::A => 0,
            DeckId::B => 1,
        }
    }
}

impl fmt::Display for DeckId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeckId::A => write!(f, "A"),
            DeckId::B => write!(f, "B"),
        }
    }
}

/// Fixed two-slot storage indexed by `DeckId`.
#[derive(Clone, Debug, Default)]
pub struct Decks<T>([T; 2]);

impl<T> Index<DeckId> for Decks<T> {
    type Output = T;

    fn index(&self, deck: DeckId) -> &T {
        &self.0[deck.slot()]
    }
}

impl<T> IndexMut<DeckId> for Decks<T> {
    fn index_mut(&mut self, deck: DeckId) -> &mut T {
        &mut self.0[deck.slot()]
    }
}
