//! Router module.

mod trie;

pub use trie::{RouteLookup, TrieRouter};
