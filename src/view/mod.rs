use serde::{Deserialize, Serialize};

use crate::filter::FilterCriteria;
use crate::index::Dimension;
use crate::pager::DEFAULT_PAGE_SIZE;
pub use crate::record::Section;

pub const EMPTY_RESULTS_MESSAGE: &str =
    "No kurals matched your filters. Try adjusting your selections or search term.";
pub const LOAD_FAILED_MESSAGE: &str =
    "Failed to load the Thirukkural collection. Please try again later.";

/// Show/hide flags for the explanation and commentary blocks. These only
/// affect presentation of already computed results.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Visibility {
    pub explanation: bool,
    pub mk: bool,
    pub mv: bool,
    pub sp: bool,
}

impl Default for Visibility {
    fn default() -> Self {
        Self {
            explanation: true,
            mk: true,
            mv: true,
            sp: true,
        }
    }
}

impl Visibility {
    fn flag(&mut self, section: Section) -> &mut bool {
        match section {
            Section::Explanation => &mut self.explanation,
            Section::Mk => &mut self.mk,
            Section::Mv => &mut self.mv,
            Section::Sp => &mut self.sp,
        }
    }

    pub fn is_visible(&self, section: Section) -> bool {
        match section {
            Section::Explanation => self.explanation,
            Section::Mk => self.mk,
            Section::Mv => self.mv,
            Section::Sp => self.sp,
        }
    }

    pub fn set(&mut self, section: Section, visible: bool) {
        *self.flag(section) = visible;
    }

    /// Flips one section and returns its new state.
    pub fn toggle(&mut self, section: Section) -> bool {
        let flag = self.flag(section);
        *flag = !*flag;
        *flag
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn hidden(&self) -> Vec<Section> {
        Section::ALL
            .into_iter()
            .filter(|s| !self.is_visible(*s))
            .collect()
    }

    pub fn with_hidden(sections: &[Section]) -> Self {
        let mut visibility = Self::default();
        for section in sections {
            visibility.set(*section, false);
        }
        visibility
    }
}

/// Page position and display toggles. Nothing here feeds the filter pass.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewState {
    page: usize,
    page_size: usize,
    pub visibility: Visibility,
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl ViewState {
    pub fn new(page_size: usize) -> Self {
        Self {
            page: 1,
            page_size: page_size.max(1),
            visibility: Visibility::default(),
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Changes the page size and goes back to the first page.
    pub fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size.max(1);
        self.page = 1;
    }

    /// Stores an already clamped page number.
    pub(crate) fn set_page(&mut self, page: usize) {
        self.page = page.max(1);
    }

    pub fn reset_page(&mut self) {
        self.page = 1;
    }
}

/// The active filters in display form, e.g. `Paul: அறத்துப்பால்`.
pub fn describe_filters(criteria: &FilterCriteria) -> Vec<String> {
    let mut parts: Vec<String> = Vec::new();
    for dimension in Dimension::ALL {
        if let Some(value) = criteria.categories.get(dimension) {
            parts.push(format!("{}: {}", dimension.label(), value));
        }
    }
    if let Some(number) = criteria.number {
        parts.push(format!("Kural #{number}"));
    }
    if let Some(search) = criteria.search.as_deref().map(|s| s.trim()) {
        if !search.is_empty() {
            parts.push(format!("Search: \"{search}\""));
        }
    }
    parts
}

/// `Showing N kurals`, followed by the active filters joined with ` • `.
pub fn summary(count: usize, criteria: &FilterCriteria) -> String {
    let base = if count == 1 {
        "Showing 1 kural".to_string()
    } else {
        format!("Showing {count} kurals")
    };
    let filters = describe_filters(criteria);
    if filters.is_empty() {
        base
    } else {
        format!("{base} • {}", filters.join(" • "))
    }
}
