//! `most_frequent_words`: top title words and a chart of them.

use anyhow::Result;
use tracing::debug;

use crate::domain::{ItemTable, MetadataMap, MetadataValue, WordCountMap, TOP_WORDS};
use crate::render::{markdown_image, render_bar_chart};

use super::AssetContext;

/// Words never counted
pub const STOPWORDS: [&str; 11] = [
    "a", "the", "an", "of", "to", "in", "for", "and", "with", "on", "is",
];

/// Characters stripped from both ends of each token
const STRIP_CHARS: &[char] = &[
    '.', ',', '-', '!', '?', ':', ';', '(', ')', '[', ']', '\'', '"',
];

pub const CHART_TITLE: &str = "Top 25 Words in Hacker News Titles";

/// Lowercased, punctuation-trimmed words of `title`, without stopwords
pub fn tokenize(title: &str) -> impl Iterator<Item = String> {
    title
        .to_lowercase()
        .split_whitespace()
        .map(|word| word.trim_matches(STRIP_CHARS))
        .filter(|word| !word.is_empty() && !STOPWORDS.contains(word))
        .map(str::to_string)
        .collect::<Vec<_>>()
        .into_iter()
}

/// Count words across `titles`, in first-seen order
pub fn count_words<'a, I>(titles: I) -> WordCountMap
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts = WordCountMap::new();
    for title in titles {
        for word in tokenize(title) {
            counts.increment(&word);
        }
    }
    counts
}

/// Rank title words of `table` and attach a bar chart of the top 25
///
/// Null titles are skipped, as is a `title` column that is not text.
pub fn most_frequent_words(ctx: &mut AssetContext, table: &ItemTable) -> Result<WordCountMap> {
    let titles = table
        .frame()
        .column("title")
        .ok()
        .and_then(|column| column.str().ok());

    let counts = match titles {
        Some(titles) => count_words(titles.into_iter().flatten()),
        None => WordCountMap::new(),
    };
    debug!(distinct = counts.len(), "Counted title words");

    let top_words = counts.top(TOP_WORDS);

    let bars: Vec<(String, u64)> = top_words
        .entries()
        .iter()
        .map(|e| (e.word.clone(), e.count))
        .collect();
    let png = render_bar_chart(CHART_TITLE, &bars)?;

    let mut metadata = MetadataMap::new();
    metadata.insert("plot", MetadataValue::md(markdown_image(&png)));
    ctx.add_output_metadata(metadata);

    Ok(top_words)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AssetKey;
    use serde_json::json;
    use uuid::Uuid;

    fn counts_of(map: &WordCountMap) -> Vec<(&str, u64)> {
        map.entries()
            .iter()
            .map(|e| (e.word.as_str(), e.count))
            .collect()
    }

    #[test]
    fn test_stopwords_are_excluded() {
        let counts = count_words(["The Cat and the Hat", "A Cat in a Hat"]);
        assert_eq!(counts_of(&counts), vec![("cat", 2), ("hat", 2)]);
    }

    #[test]
    fn test_punctuation_is_stripped() {
        let counts = count_words(["Hello, World!"]);
        assert_eq!(counts_of(&counts), vec![("hello", 1), ("world", 1)]);
    }

    #[test]
    fn test_inner_punctuation_is_kept() {
        let tokens: Vec<String> = tokenize("(Show HN): e-mail isn't \"dead\" -- C++").collect();
        assert_eq!(tokens, vec!["show", "hn", "e-mail", "isn't", "dead", "c++"]);
    }

    #[test]
    fn test_counting_is_deterministic() {
        let titles = ["Rust in production", "Why Rust", "Production Go"];
        assert_eq!(count_words(titles), count_words(titles));
    }

    #[test]
    fn test_top_words_are_bounded_and_sorted() {
        let titles: Vec<String> = (0..40)
            .map(|i| format!("word{} common", i))
            .collect();
        let mut ctx = AssetContext::new(Uuid::new_v4(), AssetKey::MostFrequentWords);
        let records = titles
            .iter()
            .map(|t| json!({"title": t}).as_object().cloned().unwrap())
            .collect();

        let top = most_frequent_words(&mut ctx, &ItemTable::from_records(records).unwrap()).unwrap();

        assert_eq!(top.len(), TOP_WORDS);
        assert_eq!(top.entries()[0].word, "common");
        assert_eq!(top.entries()[1].word, "word0");
        assert!(top.entries().windows(2).all(|w| w[0].count >= w[1].count));
    }

    #[test]
    fn test_missing_titles_are_skipped() {
        let records = vec![
            json!({"id": 1, "title": "Rust"}).as_object().cloned().unwrap(),
            json!({"id": 2}).as_object().cloned().unwrap(),
            json!({"id": 3, "title": null}).as_object().cloned().unwrap(),
        ];
        let mut ctx = AssetContext::new(Uuid::new_v4(), AssetKey::MostFrequentWords);
        let top = most_frequent_words(&mut ctx, &ItemTable::from_records(records).unwrap()).unwrap();
        assert_eq!(counts_of(&top), vec![("rust", 1)]);
    }

    #[test]
    fn test_non_text_title_column_is_skipped() {
        let records = vec![
            json!({"id": 1, "title": 7}).as_object().cloned().unwrap(),
            json!({"id": 2, "title": 8}).as_object().cloned().unwrap(),
        ];
        let mut ctx = AssetContext::new(Uuid::new_v4(), AssetKey::MostFrequentWords);
        let top = most_frequent_words(&mut ctx, &ItemTable::from_records(records).unwrap()).unwrap();
        assert!(top.is_empty());
    }

    #[test]
    fn test_empty_table_yields_empty_map_and_chart() {
        let mut ctx = AssetContext::new(Uuid::new_v4(), AssetKey::MostFrequentWords);
        let top = most_frequent_words(&mut ctx, &ItemTable::default()).unwrap();

        assert!(top.is_empty());
        match ctx.metadata().get("plot") {
            Some(MetadataValue::Markdown(md)) => {
                assert!(md.starts_with("![img](data:image/png;base64,"))
            }
            other => panic!("unexpected plot metadata: {:?}", other),
        }
    }
}
