//! The single owner of mutable viewer state.
//!
//! A presentation layer holds one [`Session`], feeds user input into its
//! transition methods and renders whatever [`Session::results`] and
//! [`Session::options`] return afterwards. Filtering, option derivation and
//! paging all happen through the pure functions in `filter`, `index` and
//! `pager`.

use serde::Serialize;

use crate::filter::{self, FilterCriteria, NumberInputError, SearchTier};
use crate::index::{CategoryOptions, Dimension};
use crate::pager::{self, Page};
use crate::record::Kural;
use crate::view::{self, Section, ViewState, Visibility};

/// Serializes as a snapshot of the user-facing state; the record set and
/// the cached matches are left out.
#[derive(Clone, Debug, Serialize)]
pub struct Session {
    #[serde(skip)]
    records: Vec<Kural>,
    load_error: Option<String>,
    criteria: FilterCriteria,
    number_input: String,
    #[serde(skip)]
    number_error: Option<NumberInputError>,
    view: ViewState,
    // numbers of the kurals matched by the last filter pass, in record order
    #[serde(skip)]
    matched: Vec<u32>,
    search_tier: Option<SearchTier>,
    #[serde(skip)]
    passes: u64,
}

/// What the results area should show.
#[derive(Debug)]
pub enum ResultsState<'a> {
    /// The dataset could not be loaded; nothing else is available.
    LoadFailed {
        message: &'static str,
        reason: &'a str,
    },
    /// The number field holds something that is not a kural number.
    Invalid { message: String },
    Ready(ResultsView<'a>),
}

#[derive(Debug, Serialize)]
pub struct ResultsView<'a> {
    pub matches: Vec<&'a Kural>,
    pub page: usize,
    pub page_size: usize,
    pub summary: String,
    pub search_tier: Option<SearchTier>,
    pub visibility: Visibility,
}

impl<'a> ResultsView<'a> {
    pub fn page(&self) -> Page<'_, &'a Kural> {
        pager::paginate(&self.matches, self.page, self.page_size)
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// The placeholder to show instead of records, if any.
    pub fn empty_message(&self) -> Option<&'static str> {
        if self.matches.is_empty() {
            Some(view::EMPTY_RESULTS_MESSAGE)
        } else {
            None
        }
    }
}

impl Session {
    /// A session over a loaded record set. The first filter pass runs
    /// immediately with no criteria.
    pub fn loaded(mut records: Vec<Kural>, page_size: usize) -> Self {
        records.sort_by_key(|k| k.number());
        records.dedup_by_key(|k| k.number());
        let mut session = Self {
            records,
            load_error: None,
            criteria: FilterCriteria::default(),
            number_input: String::new(),
            number_error: None,
            view: ViewState::new(page_size),
            matched: Vec::new(),
            search_tier: None,
            passes: 0,
        };
        session.refresh();
        session
    }

    /// A session whose load failed. It holds no records and every query
    /// reports the failure.
    pub fn failed(reason: impl Into<String>, page_size: usize) -> Self {
        let reason = reason.into();
        tracing::error!(%reason, "dataset load failed");
        Self {
            records: Vec::new(),
            load_error: Some(reason),
            criteria: FilterCriteria::default(),
            number_input: String::new(),
            number_error: None,
            view: ViewState::new(page_size),
            matched: Vec::new(),
            search_tier: None,
            passes: 0,
        }
    }

    pub fn records(&self) -> &[Kural] {
        &self.records
    }

    pub fn is_loaded(&self) -> bool {
        self.load_error.is_none()
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn number_input(&self) -> &str {
        &self.number_input
    }

    /// How many filter passes have run; toggles and paging never add one.
    pub fn filter_passes(&self) -> u64 {
        self.passes
    }

    /// Option lists for the current selection. After a failed load every
    /// list is empty and disabled.
    pub fn options(&self) -> CategoryOptions {
        let mut options = CategoryOptions::build(&self.records, &self.criteria.categories);
        if self.load_error.is_some() {
            options.paul.enabled = false;
            options.iyal.enabled = false;
            options.adikaram.enabled = false;
        }
        options
    }

    /// Records the number field's raw text without running a filter pass.
    /// Pair with [`Session::refresh`] once input settles.
    pub fn edit_number_input(&mut self, raw: &str) {
        self.number_input = raw.to_string();
    }

    /// Records the search field's raw text without running a filter pass.
    pub fn edit_search(&mut self, raw: &str) {
        self.criteria.search = if raw.is_empty() {
            None
        } else {
            Some(raw.to_string())
        };
    }

    pub fn set_number_input(&mut self, raw: &str) {
        self.edit_number_input(raw);
        self.refresh();
    }

    pub fn set_search(&mut self, raw: &str) {
        self.edit_search(raw);
        self.refresh();
    }

    pub fn set_search_commentary(&mut self, enabled: bool) {
        self.criteria.search_commentary = enabled;
        self.refresh();
    }

    /// Selects (or clears) a category value. Nested dimensions below it are
    /// reset, since their previous values may no longer exist.
    pub fn select(&mut self, dimension: Dimension, value: Option<&str>) {
        self.criteria.categories.select(dimension, value);
        self.refresh();
    }

    pub fn set_page_size(&mut self, page_size: usize) {
        self.view.set_page_size(page_size);
    }

    fn total_pages(&self) -> usize {
        pager::total_pages(self.matched.len(), self.view.page_size())
    }

    /// Moves to the next page; returns false (and stays put) on the last one.
    pub fn next_page(&mut self) -> bool {
        if !self.is_ready() || self.view.page() >= self.total_pages() {
            return false;
        }
        self.view.set_page(self.view.page() + 1);
        true
    }

    pub fn prev_page(&mut self) -> bool {
        if !self.is_ready() || self.view.page() <= 1 {
            return false;
        }
        self.view.set_page(self.view.page() - 1);
        true
    }

    /// Jumps to a page, clamped into range. Returns the page now shown.
    pub fn goto_page(&mut self, page: usize) -> usize {
        let page = pager::clamp_page(page, self.total_pages());
        self.view.set_page(page);
        page
    }

    pub fn toggle(&mut self, section: Section) -> bool {
        self.view.visibility.toggle(section)
    }

    pub fn set_visibility(&mut self, visibility: Visibility) {
        self.view.visibility = visibility;
    }

    /// Clears every filter, restores all sections and returns to page 1.
    pub fn reset(&mut self) {
        self.criteria.categories.clear();
        self.criteria.search = None;
        self.criteria.number = None;
        self.number_input.clear();
        self.view.visibility.reset();
        self.refresh();
    }

    fn is_ready(&self) -> bool {
        self.load_error.is_none() && self.number_error.is_none()
    }

    /// Runs one filter pass with the current inputs and goes back to page 1.
    pub fn refresh(&mut self) {
        self.view.reset_page();
        if self.load_error.is_some() {
            return;
        }

        match filter::parse_number_input(&self.number_input) {
            Ok(number) => {
                self.criteria.number = number;
                self.number_error = None;
            }
            Err(err) => {
                tracing::debug!(input = %self.number_input, "invalid kural number input");
                self.criteria.number = None;
                self.number_error = Some(err);
                self.matched.clear();
                self.search_tier = None;
                return;
            }
        }

        let outcome = filter::apply(&self.records, &self.criteria);
        self.passes += 1;
        tracing::trace!(
            pass = self.passes,
            matches = outcome.matches.len(),
            tier = ?outcome.search_tier,
            "filter pass"
        );
        self.matched = outcome.matches.iter().map(|k| k.number()).collect();
        self.search_tier = outcome.search_tier;
    }

    pub fn results(&self) -> ResultsState<'_> {
        if let Some(reason) = self.load_error.as_deref() {
            return ResultsState::LoadFailed {
                message: view::LOAD_FAILED_MESSAGE,
                reason,
            };
        }
        if let Some(err) = self.number_error.as_ref() {
            return ResultsState::Invalid {
                message: err.to_string(),
            };
        }

        // records are sorted by number, so each match is a binary search away
        let matches: Vec<&Kural> = self
            .matched
            .iter()
            .filter_map(|n| {
                self.records
                    .binary_search_by_key(n, |k| k.number())
                    .ok()
                    .map(|i| &self.records[i])
            })
            .collect();

        ResultsState::Ready(ResultsView {
            summary: view::summary(matches.len(), &self.criteria),
            matches,
            page: self.view.page(),
            page_size: self.view.page_size(),
            search_tier: self.search_tier,
            visibility: self.view.visibility,
        })
    }
}
