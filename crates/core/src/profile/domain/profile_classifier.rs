use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::profile::domain::description::is_stopword;
use crate::shared::config::ConfigError;
use crate::shared::constants::UNMATCHED_PROFILE;

/// A profile label and the words that hint at it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub profile: String,
    pub keywords: Vec<String>,
}

/// Normalized bag-of-words classifier.
///
/// Each keyword occurrence in a text is weighted by the inverse of how
/// often the keyword occurs across the whole corpus, so words everybody
/// uses count for little. A category's score is the mean weight over its
/// keywords that occur in the corpus at all.
pub struct ProfileClassifier {
    categories: Vec<(String, Vec<(String, usize)>)>,
}

impl ProfileClassifier {
    /// `corpus` is every word of every known description; stopwords are
    /// ignored. Keywords match case-insensitively.
    pub fn new(categories: &[Category], corpus: &[String]) -> Result<Self, ConfigError> {
        validate_categories(categories)?;
        let frequencies = word_frequencies(corpus);
        let categories = categories
            .iter()
            .map(|c| {
                let keywords = c
                    .keywords
                    .iter()
                    .map(|k| k.to_lowercase())
                    .filter_map(|k| {
                        let occurrences = frequencies.get(k.as_str()).copied().unwrap_or(0);
                        (occurrences > 0).then_some((k, occurrences))
                    })
                    .collect();
                (c.profile.clone(), keywords)
            })
            .collect();
        Ok(Self { categories })
    }

    /// Score per category, in configuration order. Categories whose
    /// keywords never occur in the corpus score zero.
    pub fn scores(&self, words: &[String]) -> Vec<(&str, f64)> {
        let counts = word_frequencies(words);
        self.categories
            .iter()
            .map(|(profile, keywords)| {
                let score = if keywords.is_empty() {
                    0.0
                } else {
                    keywords
                        .iter()
                        .map(|(k, corpus)| {
                            counts.get(k.as_str()).copied().unwrap_or(0) as f64 / *corpus as f64
                        })
                        .sum::<f64>()
                        / keywords.len() as f64
                };
                (profile.as_str(), score)
            })
            .collect()
    }

    /// Best-scoring profile, or [`UNMATCHED_PROFILE`] when nothing scores
    /// above zero. Ties go to the category listed first.
    pub fn classify(&self, words: &[String]) -> &str {
        let mut best: Option<(&str, f64)> = None;
        for (profile, score) in self.scores(words) {
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((profile, score));
            }
        }
        match best {
            Some((profile, score)) if score > 0.0 => profile,
            _ => UNMATCHED_PROFILE,
        }
    }
}

pub fn validate_categories(categories: &[Category]) -> Result<(), ConfigError> {
    if categories.is_empty() {
        return Err(ConfigError::InvalidCategories("no categories".into()));
    }
    for c in categories {
        if c.profile.trim().is_empty() {
            return Err(ConfigError::InvalidCategories("category without a profile name".into()));
        }
        if c.keywords.is_empty() {
            return Err(ConfigError::InvalidCategories(format!(
                "{:?} has no keywords",
                c.profile
            )));
        }
    }
    Ok(())
}

fn word_frequencies(words: &[String]) -> HashMap<&str, usize> {
    let mut counts = HashMap::new();
    for w in words.iter().filter(|w| !is_stopword(w)) {
        *counts.entry(w.as_str()).or_insert(0) += 1;
    }
    counts
}
