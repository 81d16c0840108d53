use std::cmp::Ordering;

use feruca::Collator;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::record::Kural;

/// The three nested classification levels, outermost first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Paul,
    Iyal,
    Adikaram,
}

impl Dimension {
    pub const ALL: [Dimension; 3] = [Dimension::Paul, Dimension::Iyal, Dimension::Adikaram];

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "paul" | "pal" => Some(Self::Paul),
            "iyal" => Some(Self::Iyal),
            "adikaram" | "athikaram" | "chapter" => Some(Self::Adikaram),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Paul => "Paul",
            Self::Iyal => "Iyal",
            Self::Adikaram => "Adikaram",
        }
    }

    pub fn value_of(self, kural: &Kural) -> &str {
        match self {
            Self::Paul => kural.paul(),
            Self::Iyal => kural.iyal(),
            Self::Adikaram => kural.adikaram(),
        }
    }

    /// The dimensions this one is nested inside, outermost first.
    pub fn upstream(self) -> &'static [Dimension] {
        match self {
            Self::Paul => &[],
            Self::Iyal => &[Dimension::Paul],
            Self::Adikaram => &[Dimension::Paul, Dimension::Iyal],
        }
    }

    pub fn downstream(self) -> &'static [Dimension] {
        match self {
            Self::Paul => &[Dimension::Iyal, Dimension::Adikaram],
            Self::Iyal => &[Dimension::Adikaram],
            Self::Adikaram => &[],
        }
    }
}

/// The selected value per dimension. Selecting a value resets every
/// dimension nested below it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySelection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    paul: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    iyal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    adikaram: Option<String>,
}

impl CategorySelection {
    pub fn get(&self, dimension: Dimension) -> Option<&str> {
        match dimension {
            Dimension::Paul => self.paul.as_deref(),
            Dimension::Iyal => self.iyal.as_deref(),
            Dimension::Adikaram => self.adikaram.as_deref(),
        }
    }

    fn slot(&mut self, dimension: Dimension) -> &mut Option<String> {
        match dimension {
            Dimension::Paul => &mut self.paul,
            Dimension::Iyal => &mut self.iyal,
            Dimension::Adikaram => &mut self.adikaram,
        }
    }

    /// Sets (or clears, for `None`/blank) one dimension and resets everything
    /// downstream of it to "none selected".
    pub fn select(&mut self, dimension: Dimension, value: Option<&str>) {
        let value = value
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(|v| v.to_string());
        *self.slot(dimension) = value;
        for below in dimension.downstream() {
            *self.slot(*below) = None;
        }
    }

    pub fn with(mut self, dimension: Dimension, value: &str) -> Self {
        self.select(dimension, Some(value));
        self
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_empty(&self) -> bool {
        self.paul.is_none() && self.iyal.is_none() && self.adikaram.is_none()
    }

    fn constrains(&self, dimension: Dimension, kural: &Kural) -> bool {
        match self.get(dimension) {
            Some(selected) => dimension.value_of(kural) == selected,
            None => true,
        }
    }

    pub fn matches(&self, kural: &Kural) -> bool {
        Dimension::ALL.iter().all(|d| self.constrains(*d, kural))
    }

    fn matches_upstream_of(&self, dimension: Dimension, kural: &Kural) -> bool {
        dimension
            .upstream()
            .iter()
            .all(|d| self.constrains(*d, kural))
    }
}

/// Orders labels by the CLDR root collation, the order a locale-aware
/// comparison gives Tamil script. Labels the collator considers equal fall
/// back to code point order so the result is total and stable.
pub fn compare_labels(collator: &mut Collator, a: &str, b: &str) -> Ordering {
    collator.collate(a, b).then_with(|| a.cmp(b))
}

/// Distinct, non-empty values of `dimension` among the kurals that satisfy
/// the upstream selections. The dimension's own selection and anything
/// downstream of it are ignored.
pub fn options_for(
    records: &[Kural],
    dimension: Dimension,
    selection: &CategorySelection,
) -> Vec<String> {
    let mut collator = Collator::default();
    records
        .iter()
        .filter(|k| selection.matches_upstream_of(dimension, k))
        .map(|k| dimension.value_of(k))
        .filter(|v| !v.is_empty())
        .unique()
        .sorted_by(|a, b| compare_labels(&mut collator, a, b))
        .map(|v| v.to_string())
        .collect()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DimensionOptions {
    pub dimension: Dimension,
    pub values: Vec<String>,
    /// Presentation hint: nested levels stay disabled until their parent is
    /// chosen. The values are still computed either way.
    pub enabled: bool,
    pub placeholder: &'static str,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CategoryOptions {
    pub paul: DimensionOptions,
    pub iyal: DimensionOptions,
    pub adikaram: DimensionOptions,
}

impl CategoryOptions {
    pub fn build(records: &[Kural], selection: &CategorySelection) -> Self {
        let has_paul = selection.get(Dimension::Paul).is_some();
        let has_iyal = selection.get(Dimension::Iyal).is_some();
        Self {
            paul: DimensionOptions {
                dimension: Dimension::Paul,
                values: options_for(records, Dimension::Paul, selection),
                enabled: true,
                placeholder: "All Paul",
            },
            iyal: DimensionOptions {
                dimension: Dimension::Iyal,
                values: options_for(records, Dimension::Iyal, selection),
                enabled: has_paul,
                placeholder: if has_paul {
                    "All Iyal"
                } else {
                    "Select Paul first"
                },
            },
            adikaram: DimensionOptions {
                dimension: Dimension::Adikaram,
                values: options_for(records, Dimension::Adikaram, selection),
                enabled: has_iyal,
                placeholder: if has_iyal {
                    "All Adikaram"
                } else {
                    "Select Iyal first"
                },
            },
        }
    }

    pub fn get(&self, dimension: Dimension) -> &DimensionOptions {
        match dimension {
            Dimension::Paul => &self.paul,
            Dimension::Iyal => &self.iyal,
            Dimension::Adikaram => &self.adikaram,
        }
    }
}
