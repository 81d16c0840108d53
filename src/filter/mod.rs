use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::index::CategorySelection;
use crate::record::{parse_int_prefix, Kural};

pub const MIN_KURAL_NUMBER: u32 = 1;
pub const MAX_KURAL_NUMBER: u32 = 1330;

/// The active filter inputs for one pass.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    #[serde(default)]
    pub categories: CategorySelection,
    #[serde(default)]
    pub number: Option<u32>,
    #[serde(default)]
    pub search: Option<String>,
    /// When the search term matches no couplet text, retry it against the
    /// explanation and commentaries.
    #[serde(default = "default_search_commentary")]
    pub search_commentary: bool,
}

fn default_search_commentary() -> bool {
    true
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            categories: CategorySelection::default(),
            number: None,
            search: None,
            search_commentary: true,
        }
    }
}

impl FilterCriteria {
    /// The number lookup, when it is inside the corpus range.
    pub fn number_override(&self) -> Option<u32> {
        self.number
            .filter(|n| (MIN_KURAL_NUMBER..=MAX_KURAL_NUMBER).contains(n))
    }

    /// The search term as matched: trimmed and lower-cased, `None` when blank.
    pub fn search_term(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_lowercase())
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty() && self.number_override().is_none() && self.search_term().is_none()
    }
}

/// Which field set produced a search result. A search with no hits has no
/// tier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchTier {
    /// Matched against the couplet text.
    Primary,
    /// No couplet matched; matched against explanation and commentaries.
    Commentary,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilterOutcome<'a> {
    pub matches: Vec<&'a Kural>,
    pub search_tier: Option<SearchTier>,
}

/// Runs one filter pass over the record set.
///
/// A number in range short-circuits everything else. Otherwise the category
/// selections narrow the set and the search term is applied on top: couplet
/// text first, and only when that finds nothing, the explanation and
/// commentaries. Record order is preserved.
pub fn apply<'a>(records: &'a [Kural], criteria: &FilterCriteria) -> FilterOutcome<'a> {
    if let Some(number) = criteria.number_override() {
        let matches = records
            .iter()
            .find(|k| k.number() == number)
            .into_iter()
            .collect();
        return FilterOutcome {
            matches,
            search_tier: None,
        };
    }

    let narrowed: Vec<&Kural> = records
        .iter()
        .filter(|k| criteria.categories.matches(k))
        .collect();

    let Some(term) = criteria.search_term() else {
        return FilterOutcome {
            matches: narrowed,
            search_tier: None,
        };
    };

    let primary: Vec<&Kural> = narrowed
        .iter()
        .copied()
        .filter(|k| k.text_contains(&term))
        .collect();
    if !primary.is_empty() {
        return FilterOutcome {
            matches: primary,
            search_tier: Some(SearchTier::Primary),
        };
    }
    if !criteria.search_commentary {
        return FilterOutcome {
            matches: primary,
            search_tier: None,
        };
    }

    let fallback: Vec<&Kural> = narrowed
        .into_iter()
        .filter(|k| k.commentary_contains(&term))
        .collect();
    let search_tier = if fallback.is_empty() {
        None
    } else {
        Some(SearchTier::Commentary)
    };
    FilterOutcome {
        matches: fallback,
        search_tier,
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum NumberInputError {
    #[error("Please enter a valid Kural number between 1 and 1330.")]
    NotANumber { input: String },

    #[error("Please enter a valid Kural number between 1 and 1330.")]
    OutOfRange { value: i64 },
}

/// Validates the free-form number field. Blank input means "no number";
/// otherwise the leading integer must fall within the corpus range.
pub fn parse_number_input(raw: &str) -> Result<Option<u32>, NumberInputError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let value = parse_int_prefix(trimmed).ok_or_else(|| NumberInputError::NotANumber {
        input: trimmed.to_string(),
    })?;
    if value < MIN_KURAL_NUMBER as i64 || value > MAX_KURAL_NUMBER as i64 {
        return Err(NumberInputError::OutOfRange { value });
    }
    Ok(Some(value as u32))
}
