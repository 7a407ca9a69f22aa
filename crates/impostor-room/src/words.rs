//! Where secret words come from.
//!
//! The room only needs "give me a word"; [`WordSource`] is that seam.
//! [`WordList`] is the in-memory implementation used by the server,
//! loaded from a `{"words": [...]}` JSON file or the built-in fallback.

use std::path::Path;

use rand::{Rng, RngCore};
use serde::Deserialize;

use crate::WordListError;

/// Supplies the secret word for a new round.
///
/// Called from inside a room's serialized handler, so implementations
/// must answer from memory without blocking.
pub trait WordSource: Send + Sync + 'static {
    /// Picks one word at random.
    fn pick_word(&self, rng: &mut dyn RngCore) -> String;
}

/// A non-empty list of words, picked from uniformly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordList {
    words: Vec<String>,
}

#[derive(Deserialize)]
struct WordFile {
    words: Vec<String>,
}

impl WordList {
    /// Words used when no list file can be loaded.
    pub const FALLBACK: [&'static str; 5] = ["Hund", "Katze", "Auto", "Baum", "Haus"];

    /// Builds a list, trimming entries and dropping blank ones.
    ///
    /// # Errors
    /// [`WordListError::Empty`] if nothing usable is left.
    pub fn new<I, S>(words: I) -> Result<Self, WordListError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words: Vec<String> = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_string())
            .filter(|w| !w.is_empty())
            .collect();
        if words.is_empty() {
            return Err(WordListError::Empty);
        }
        Ok(Self { words })
    }

    /// The built-in list.
    pub fn fallback() -> Self {
        Self {
            words: Self::FALLBACK.iter().map(|w| w.to_string()).collect(),
        }
    }

    /// Parses `{"words": ["...", ...]}`.
    pub fn from_json_str(json: &str) -> Result<Self, WordListError> {
        let file: WordFile = serde_json::from_str(json)?;
        Self::new(file.words)
    }

    /// Reads and parses a word list file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, WordListError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Number of words in the list.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Always `false`: a `WordList` cannot be built empty.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl WordSource for WordList {
    fn pick_word(&self, rng: &mut dyn RngCore) -> String {
        let index = rng.random_range(0..self.words.len());
        self.words[index].clone()
    }
}
