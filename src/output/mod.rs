use serde::Serialize;

use crate::filter::SearchTier;
use crate::pager::Page;
use crate::record::{Kural, Section};
use crate::view::Visibility;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "text" | "txt" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

pub fn infer_format_from_path(path: &str) -> Option<OutputFormat> {
    let lower = path.trim().to_lowercase();
    if lower.ends_with(".json") {
        return Some(OutputFormat::Json);
    }
    if lower.ends_with(".txt") {
        return Some(OutputFormat::Text);
    }
    None
}

/// A kural as written to an output file. Hidden sections are left out.
#[derive(Clone, Debug, Serialize)]
pub struct OutputRecord {
    pub number: u32,
    pub paul: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub paul_translation: String,
    pub iyal: String,
    pub adikaram: String,
    pub lines: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mk: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mv: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sp: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct OutputReport {
    pub summary: String,
    pub page: usize,
    pub total_pages: usize,
    pub total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_tier: Option<SearchTier>,
    pub records: Vec<OutputRecord>,
}

fn visible_section(kural: &Kural, section: Section, visibility: &Visibility) -> Option<String> {
    if visibility.is_visible(section) {
        Some(kural.section(section).to_string())
    } else {
        None
    }
}

pub fn build_records(kurals: &[&Kural], visibility: &Visibility) -> Vec<OutputRecord> {
    kurals
        .iter()
        .map(|k| OutputRecord {
            number: k.number(),
            paul: k.paul().to_string(),
            paul_translation: k.paul_translation().to_string(),
            iyal: k.iyal().to_string(),
            adikaram: k.adikaram().to_string(),
            lines: k.lines().into_iter().map(|l| l.to_string()).collect(),
            explanation: visible_section(k, Section::Explanation, visibility),
            mk: visible_section(k, Section::Mk, visibility),
            mv: visible_section(k, Section::Mv, visibility),
            sp: visible_section(k, Section::Sp, visibility),
        })
        .collect()
}

pub fn build_report(
    page: &Page<'_, &Kural>,
    summary: &str,
    search_tier: Option<SearchTier>,
    visibility: &Visibility,
) -> OutputReport {
    OutputReport {
        summary: summary.to_string(),
        page: page.page,
        total_pages: page.total_pages,
        total: page.total,
        search_tier,
        records: build_records(page.items, visibility),
    }
}

pub fn render_text(report: &OutputReport) -> Vec<u8> {
    let mut out = String::new();
    out.push_str(&report.summary);
    out.push_str(&format!(" (page {}/{})\n", report.page, report.total_pages));
    for r in &report.records {
        out.push('\n');
        out.push_str(&format!("#{} {} / {} / {}\n", r.number, r.paul, r.iyal, r.adikaram));
        if !r.paul_translation.is_empty() {
            out.push_str(&format!("Paul Translation: {}\n", r.paul_translation));
        }
        for line in &r.lines {
            out.push_str("    ");
            out.push_str(line);
            out.push('\n');
        }
        let sections = [
            (Section::Explanation, &r.explanation),
            (Section::Mk, &r.mk),
            (Section::Mv, &r.mv),
            (Section::Sp, &r.sp),
        ];
        for (section, value) in sections {
            if let Some(text) = value.as_deref().filter(|t| !t.is_empty()) {
                out.push_str(&format!("{}: {}\n", section.title(), text));
            }
        }
    }
    out.into_bytes()
}

pub fn render_json(report: &OutputReport) -> Vec<u8> {
    serde_json::to_vec_pretty(report).unwrap_or_else(|_| b"{}\n".to_vec())
}

pub fn render(report: &OutputReport, format: OutputFormat) -> Vec<u8> {
    match format {
        OutputFormat::Text => render_text(report),
        OutputFormat::Json => render_json(report),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::RawRow;
    use crate::pager;

    fn kurals() -> Vec<Kural> {
        let rows: Vec<RawRow> = (1..=3)
            .map(|n| RawRow {
                number: n.to_string(),
                kural: format!("line a {n}\nline b {n}"),
                explanation: format!("explained {n}"),
                mk: format!("mk {n}"),
                paul_name: "அறத்துப்பால்".to_string(),
                ..RawRow::default()
            })
            .collect();
        crate::record::normalize_rows(&rows)
    }

    #[test]
    fn format_from_name_or_extension() {
        assert_eq!(OutputFormat::parse(" JSON "), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::parse("xml"), None);
        assert_eq!(infer_format_from_path("out/page.json"), Some(OutputFormat::Json));
        assert_eq!(infer_format_from_path("page.TXT"), Some(OutputFormat::Text));
        assert_eq!(infer_format_from_path("page"), None);
    }

    #[test]
    fn hidden_sections_are_left_out() {
        let records = kurals();
        let refs: Vec<&Kural> = records.iter().collect();
        let page = pager::paginate(&refs, 1, 2);
        let visibility = Visibility::with_hidden(&[Section::Mk]);
        let report = build_report(&page, "Showing 3 kurals", None, &visibility);

        let json: serde_json::Value = serde_json::from_slice(&render_json(&report)).unwrap();
        assert_eq!(json["total_pages"], 2);
        assert_eq!(json["records"][0]["lines"][1], "line b 1");
        assert_eq!(json["records"][0]["explanation"], "explained 1");
        assert!(json["records"][0].get("mk").is_none());

        let text = String::from_utf8(render_text(&report)).unwrap();
        assert!(text.starts_with("Showing 3 kurals (page 1/2)"));
        assert!(text.contains("Explanation: explained 2"));
        assert!(!text.contains("mk 1"));
    }
}
