//! Word counts derived from story titles.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Number of words kept after ranking
pub const TOP_WORDS: usize = 25;

/// A word and how often it occurred
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordCount {
    pub word: String,
    pub count: u64,
}

/// Insertion-ordered word counts
///
/// While counting, entries keep the order in which words were first seen.
/// After `top` the entries are ranked by count, descending, and ties keep
/// that first-seen order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<WordCount>", into = "Vec<WordCount>")]
pub struct WordCountMap {
    entries: Vec<WordCount>,
    index: HashMap<String, usize>,
}

impl PartialEq for WordCountMap {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Eq for WordCountMap {}

impl From<Vec<WordCount>> for WordCountMap {
    fn from(entries: Vec<WordCount>) -> Self {
        let mut map = Self {
            entries,
            index: HashMap::new(),
        };
        map.reindex();
        map
    }
}

impl From<WordCountMap> for Vec<WordCount> {
    fn from(map: WordCountMap) -> Self {
        map.entries
    }
}

impl WordCountMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one occurrence of `word`
    pub fn increment(&mut self, word: &str) {
        if let Some(&i) = self.index.get(word) {
            self.entries[i].count += 1;
        } else {
            self.index.insert(word.to_string(), self.entries.len());
            self.entries.push(WordCount {
                word: word.to_string(),
                count: 1,
            });
        }
    }

    /// Rank by count (stable, descending) and keep the first `n`
    pub fn top(mut self, n: usize) -> Self {
        self.entries.sort_by(|a, b| b.count.cmp(&a.count));
        self.entries.truncate(n);
        self.reindex();
        self
    }

    pub fn get(&self, word: &str) -> Option<u64> {
        self.entries
            .iter()
            .find(|e| e.word == word)
            .map(|e| e.count)
    }

    pub fn entries(&self) -> &[WordCount] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn reindex(&mut self) {
        self.index = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.word.clone(), i))
            .collect();
    }
}
