use serde::{Deserialize, Serialize};

use crate::dataset::RawRow;

/// One of the four display sections a kural carries besides its couplet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Explanation,
    Mk,
    Mv,
    Sp,
}

impl Section {
    pub const ALL: [Section; 4] = [Section::Explanation, Section::Mk, Section::Mv, Section::Sp];

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "explanation" | "english" | "en" => Some(Self::Explanation),
            "mk" => Some(Self::Mk),
            "mv" => Some(Self::Mv),
            "sp" => Some(Self::Sp),
            _ => None,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Self::Explanation => "explanation",
            Self::Mk => "mk",
            Self::Mv => "mv",
            Self::Sp => "sp",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Explanation => "Explanation",
            Self::Mk => "Mu. Karunanidhi",
            Self::Mv => "Mu. Varadarajan",
            Self::Sp => "Solomon Pappaiah",
        }
    }
}

// lowercase copies of the searchable fields, built once at load time
#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct SearchText {
    text: String,
    explanation: String,
    mk: String,
    mv: String,
    sp: String,
}

/// A single couplet with its classification and commentaries.
///
/// Values are only built by [`normalize_rows`] / [`Kural::from_row`] and never
/// mutated afterwards, so the lowercase search copies always match the
/// displayed fields.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Kural {
    number: u32,
    text: String,
    paul: String,
    paul_translation: String,
    iyal: String,
    adikaram: String,
    explanation: String,
    mk: String,
    mv: String,
    sp: String,
    #[serde(skip)]
    search: SearchText,
}

impl Kural {
    /// Builds a kural from a raw table row, or `None` when the row has no
    /// positive integer number.
    pub fn from_row(row: &RawRow) -> Option<Self> {
        let number = parse_int_prefix(&row.number)?;
        if number < 1 || number > u32::MAX as i64 {
            return None;
        }

        let text = normalize_text(&row.kural);
        let explanation = normalize_text(&row.explanation);
        let mk = normalize_text(&row.mk);
        let mv = normalize_text(&row.mv);
        let sp = normalize_text(&row.sp);
        let search = SearchText {
            text: text.to_lowercase(),
            explanation: explanation.to_lowercase(),
            mk: mk.to_lowercase(),
            mv: mv.to_lowercase(),
            sp: sp.to_lowercase(),
        };

        Some(Self {
            number: number as u32,
            text,
            paul: normalize_text(&row.paul_name),
            paul_translation: normalize_text(&row.paul_translation),
            iyal: normalize_text(&row.iyal_name),
            adikaram: normalize_text(&row.adikaram_name),
            explanation,
            mk,
            mv,
            sp,
            search,
        })
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn paul(&self) -> &str {
        &self.paul
    }

    pub fn paul_translation(&self) -> &str {
        &self.paul_translation
    }

    pub fn iyal(&self) -> &str {
        &self.iyal
    }

    pub fn adikaram(&self) -> &str {
        &self.adikaram
    }

    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    pub fn mk(&self) -> &str {
        &self.mk
    }

    pub fn mv(&self) -> &str {
        &self.mv
    }

    pub fn sp(&self) -> &str {
        &self.sp
    }

    pub fn section(&self, section: Section) -> &str {
        match section {
            Section::Explanation => &self.explanation,
            Section::Mk => &self.mk,
            Section::Mv => &self.mv,
            Section::Sp => &self.sp,
        }
    }

    /// The couplet split into display lines; runs of blank lines collapse.
    pub fn lines(&self) -> Vec<&str> {
        self.text
            .lines()
            .map(|line| line.trim())
            .filter(|line| !line.is_empty())
            .collect()
    }

    pub(crate) fn text_contains(&self, term_lower: &str) -> bool {
        self.search.text.contains(term_lower)
    }

    pub(crate) fn commentary_contains(&self, term_lower: &str) -> bool {
        self.search.explanation.contains(term_lower)
            || self.search.mk.contains(term_lower)
            || self.search.mv.contains(term_lower)
            || self.search.sp.contains(term_lower)
    }
}

pub fn normalize_text(value: &str) -> String {
    value.trim().to_string()
}

/// Reads a base-10 integer the way `parseInt` does: leading whitespace and an
/// optional sign are skipped, then the longest run of ASCII digits is used.
/// Returns `None` when no digit follows, or the value does not fit in `i64`.
pub fn parse_int_prefix(value: &str) -> Option<i64> {
    let trimmed = value.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let digits: &str = {
        let end = rest
            .bytes()
            .position(|b| !b.is_ascii_digit())
            .unwrap_or(rest.len());
        &rest[..end]
    };
    if digits.is_empty() {
        return None;
    }

    let magnitude = digits.parse::<i64>().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

/// Turns parsed table rows into the immutable record set: rows without a
/// positive number are dropped, fields are trimmed, and the result is sorted
/// by number. When a number repeats, the earliest row in the table is kept.
pub fn normalize_rows(rows: &[RawRow]) -> Vec<Kural> {
    let mut kurals: Vec<Kural> = rows.iter().filter_map(Kural::from_row).collect();
    let dropped = rows.len() - kurals.len();

    kurals.sort_by_key(|k| k.number);
    let before_dedup = kurals.len();
    kurals.dedup_by_key(|k| k.number);
    let duplicates = before_dedup - kurals.len();

    if dropped > 0 {
        tracing::debug!(dropped, "skipped rows without a valid kural number");
    }
    if duplicates > 0 {
        tracing::warn!(duplicates, "dataset repeats kural numbers, keeping first occurrence");
    }
    kurals
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(number: &str, kural: &str) -> RawRow {
        RawRow {
            number: number.to_string(),
            kural: kural.to_string(),
            ..RawRow::default()
        }
    }

    #[test]
    fn parse_int_prefix_follows_parse_int() {
        assert_eq!(parse_int_prefix("42"), Some(42));
        assert_eq!(parse_int_prefix("  7 "), Some(7));
        assert_eq!(parse_int_prefix("12abc"), Some(12));
        assert_eq!(parse_int_prefix("+3"), Some(3));
        assert_eq!(parse_int_prefix("-5"), Some(-5));
        assert_eq!(parse_int_prefix("1.9"), Some(1));
        assert_eq!(parse_int_prefix("abc"), None);
        assert_eq!(parse_int_prefix(""), None);
        assert_eq!(parse_int_prefix("-"), None);
    }

    #[test]
    fn rows_without_positive_number_are_dropped() {
        let rows = vec![
            row("2", "b"),
            row("", "missing"),
            row("zero", "word"),
            row("0", "zero"),
            row("-4", "negative"),
            row("1", "a"),
        ];
        let kurals = normalize_rows(&rows);
        let numbers: Vec<u32> = kurals.iter().map(|k| k.number()).collect();
        assert_eq!(numbers, vec![1, 2]);
    }

    #[test]
    fn first_duplicate_number_wins() {
        let rows = vec![row("5", "first"), row("5", "second"), row("4", "other")];
        let kurals = normalize_rows(&rows);
        assert_eq!(kurals.len(), 2);
        assert_eq!(kurals[1].text(), "first");
    }

    #[test]
    fn fields_are_trimmed_and_lowered_for_search() {
        let raw = RawRow {
            number: " 10 ".to_string(),
            kural: "  Agara Mudhala  ".to_string(),
            paul_name: " அறத்துப்பால் ".to_string(),
            explanation: "  As the letter A is the First ".to_string(),
            ..RawRow::default()
        };
        let kural = Kural::from_row(&raw).unwrap();
        assert_eq!(kural.number(), 10);
        assert_eq!(kural.text(), "Agara Mudhala");
        assert_eq!(kural.paul(), "அறத்துப்பால்");
        assert!(kural.text_contains("agara"));
        assert!(!kural.text_contains("Agara"));
        assert!(kural.commentary_contains("letter a"));
    }

    #[test]
    fn lines_collapse_blank_runs() {
        let kural = Kural::from_row(&row("1", "first line  \n\n   second line")).unwrap();
        assert_eq!(kural.lines(), vec!["first line", "second line"]);
    }

    #[test]
    fn section_parse_accepts_keys() {
        assert_eq!(Section::parse("MK"), Some(Section::Mk));
        assert_eq!(Section::parse("english"), Some(Section::Explanation));
        assert_eq!(Section::parse("xx"), None);
    }
}
