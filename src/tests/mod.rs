use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::cache::AssetCache;
use crate::dataset::{self, AssetOrigin, LoadError, RawRow};
use crate::filter::{self, FilterCriteria, SearchTier};
use crate::index::{CategoryOptions, CategorySelection, Dimension};
use crate::pager;
use crate::record::{self, Kural, Section};
use crate::session::{ResultsState, Session};
use crate::view;

fn paul_for(number: u32) -> &'static str {
    match number {
        1..=380 => "அறத்துப்பால்",
        381..=1080 => "பொருட்பால்",
        _ => "காமத்துப்பால்",
    }
}

fn row(number: u32) -> RawRow {
    let paul = paul_for(number);
    let chapter = (number - 1) / 10 + 1;
    RawRow {
        number: number.to_string(),
        kural: format!("couplet {number} first line\ncouplet {number} second line"),
        explanation: format!("explanation for kural {number}"),
        paul_name: paul.to_string(),
        paul_translation: String::new(),
        iyal_name: format!("{paul} iyal {}", (chapter - 1) / 5 + 1),
        adikaram_name: format!("adikaram {chapter}"),
        mk: format!("mk on {number}"),
        mv: format!("mv on {number}"),
        sp: format!("sp on {number}"),
    }
}

fn corpus() -> Vec<Kural> {
    let rows: Vec<RawRow> = (1..=1330).map(row).collect();
    record::normalize_rows(&rows)
}

fn numbers(matches: &[&Kural]) -> Vec<u32> {
    matches.iter().map(|k| k.number()).collect()
}

fn csv_body(rows: &[RawRow]) -> String {
    let mut out = String::from(
        "Number,kural,explanation,adikaram_name,iyal_name,paul_name,paul_translation,mk,mv,sp\n",
    );
    for r in rows {
        let fields = [
            &r.number,
            &r.kural,
            &r.explanation,
            &r.adikaram_name,
            &r.iyal_name,
            &r.paul_name,
            &r.paul_translation,
            &r.mk,
            &r.mv,
            &r.sp,
        ];
        let quoted: Vec<String> = fields
            .iter()
            .map(|f| format!("\"{}\"", f.replace('"', "\"\"")))
            .collect();
        out.push_str(&quoted.join(","));
        out.push('\n');
    }
    out
}

#[test]
fn number_lookup_ignores_every_other_criterion() {
    let records = corpus();
    let criteria = FilterCriteria {
        categories: CategorySelection::default().with(Dimension::Paul, "காமத்துப்பால்"),
        number: Some(7),
        search: Some("nothing matches this".to_string()),
        search_commentary: true,
    };
    let outcome = filter::apply(&records, &criteria);
    assert_eq!(numbers(&outcome.matches), vec![7]);
    assert_eq!(outcome.search_tier, None);
}

#[test]
fn every_valid_number_yields_at_most_that_record() {
    let records = corpus();
    for n in [1u32, 2, 380, 381, 1080, 1081, 1329, 1330] {
        let criteria = FilterCriteria {
            number: Some(n),
            ..FilterCriteria::default()
        };
        assert_eq!(numbers(&filter::apply(&records, &criteria).matches), vec![n]);
    }
}

#[test]
fn category_narrowing_is_a_subset_chain() {
    let records = corpus();
    let paul = CategorySelection::default().with(Dimension::Paul, "பொருட்பால்");
    let iyal = paul.clone().with(Dimension::Iyal, "பொருட்பால் iyal 8");
    let adikaram = iyal.clone().with(Dimension::Adikaram, "adikaram 40");

    let run = |categories: &CategorySelection| {
        let criteria = FilterCriteria {
            categories: categories.clone(),
            ..FilterCriteria::default()
        };
        numbers(&filter::apply(&records, &criteria).matches)
    };
    let by_paul = run(&paul);
    let by_iyal = run(&iyal);
    let by_adikaram = run(&adikaram);

    assert_eq!(by_paul.len(), 700);
    assert!(!by_iyal.is_empty());
    assert!(by_iyal.iter().all(|n| by_paul.contains(n)));
    assert_eq!(by_adikaram, (391..=400).collect::<Vec<u32>>());
    assert!(by_adikaram.iter().all(|n| by_iyal.contains(n)));
}

#[test]
fn search_falls_back_to_commentary_only_without_primary_hits() {
    let mut rows: Vec<RawRow> = (1..=50).map(row).collect();
    for n in [4usize, 17, 33] {
        rows[n - 1].sp = format!("the monsoon feeds the land ({n})");
    }
    let records = record::normalize_rows(&rows);

    let criteria = FilterCriteria {
        search: Some("Monsoon".to_string()),
        ..FilterCriteria::default()
    };
    let outcome = filter::apply(&records, &criteria);
    assert_eq!(numbers(&outcome.matches), vec![4, 17, 33]);
    assert_eq!(outcome.search_tier, Some(SearchTier::Commentary));

    let primary = FilterCriteria {
        search: Some("couplet 17 first".to_string()),
        ..FilterCriteria::default()
    };
    let outcome = filter::apply(&records, &primary);
    assert_eq!(numbers(&outcome.matches), vec![17]);
    assert_eq!(outcome.search_tier, Some(SearchTier::Primary));

    let disabled = FilterCriteria {
        search_commentary: false,
        ..criteria
    };
    let outcome = filter::apply(&records, &disabled);
    assert!(outcome.matches.is_empty());
    assert_eq!(outcome.search_tier, None);

    let nowhere = FilterCriteria {
        search: Some("drought".to_string()),
        ..FilterCriteria::default()
    };
    let outcome = filter::apply(&records, &nowhere);
    assert!(outcome.matches.is_empty());
    assert_eq!(outcome.search_tier, None);
}

#[test]
fn filtering_is_idempotent() {
    let records = corpus();
    let criteria = FilterCriteria {
        categories: CategorySelection::default().with(Dimension::Paul, "அறத்துப்பால்"),
        search: Some("second line".to_string()),
        ..FilterCriteria::default()
    };
    let first = filter::apply(&records, &criteria);
    let second = filter::apply(&records, &criteria);
    assert_eq!(first, second);
    assert_eq!(first.matches.len(), 380);
}

#[test]
fn full_corpus_windows_into_67_pages() {
    let session = Session::loaded(corpus(), pager::DEFAULT_PAGE_SIZE);
    let ResultsState::Ready(view) = session.results() else {
        panic!("expected results");
    };
    assert_eq!(view.summary, "Showing 1330 kurals");
    let page = view.page();
    assert_eq!(page.total_pages, 67);
    assert_eq!(
        page.items.iter().map(|k| k.number()).collect::<Vec<_>>(),
        (1..=20).collect::<Vec<u32>>()
    );

    let mut all: Vec<u32> = Vec::new();
    for p in 1..=page.total_pages {
        let window = pager::paginate(&view.matches, p, view.page_size);
        all.extend(window.items.iter().map(|k| k.number()));
    }
    assert_eq!(all, (1..=1330).collect::<Vec<u32>>());
}

#[test]
fn out_of_range_number_blocks_results_with_message() {
    let mut session = Session::loaded(corpus(), 20);
    session.set_number_input("1331");
    match session.results() {
        ResultsState::Invalid { message } => {
            assert_eq!(
                message,
                "Please enter a valid Kural number between 1 and 1330."
            );
        }
        other => panic!("expected invalid state, got {other:?}"),
    }
    assert!(!session.next_page());

    session.set_number_input("");
    assert!(matches!(session.results(), ResultsState::Ready(_)));
}

#[test]
fn toggles_and_paging_never_refilter() {
    let mut session = Session::loaded(corpus(), 20);
    let passes = session.filter_passes();

    assert!(!session.toggle(Section::Mk));
    assert!(session.next_page());
    assert!(session.next_page());
    assert!(session.prev_page());
    assert_eq!(session.goto_page(500), 67);
    assert!(!session.next_page());
    assert_eq!(session.filter_passes(), passes);

    let ResultsState::Ready(view) = session.results() else {
        panic!("expected results");
    };
    assert!(!view.visibility.is_visible(Section::Mk));
    assert_eq!(view.page().page, 67);
    assert_eq!(view.page().items.len(), 10);
}

#[test]
fn filter_change_returns_to_first_page() {
    let mut session = Session::loaded(corpus(), 20);
    session.goto_page(10);
    session.select(Dimension::Paul, Some("பொருட்பால்"));
    assert_eq!(session.view().page(), 1);
}

#[test]
fn selecting_paul_clears_nested_choices_and_options_follow() {
    let mut session = Session::loaded(corpus(), 20);
    session.select(Dimension::Paul, Some("அறத்துப்பால்"));
    session.select(Dimension::Iyal, Some("அறத்துப்பால் iyal 1"));
    session.select(Dimension::Adikaram, Some("adikaram 3"));
    assert_eq!(
        session.criteria().categories.get(Dimension::Adikaram),
        Some("adikaram 3")
    );

    session.select(Dimension::Paul, Some("காமத்துப்பால்"));
    assert_eq!(session.criteria().categories.get(Dimension::Iyal), None);
    assert_eq!(session.criteria().categories.get(Dimension::Adikaram), None);

    let options = session.options();
    assert!(options.iyal.enabled);
    assert!(!options.adikaram.enabled);
    assert!(options
        .iyal
        .values
        .iter()
        .all(|v| v.starts_with("காமத்துப்பால்")));
    assert_eq!(options.paul.values.len(), 3);
}

#[test]
fn reset_restores_defaults() {
    let mut session = Session::loaded(corpus(), 20);
    session.select(Dimension::Paul, Some("பொருட்பால்"));
    session.set_search("line");
    session.toggle(Section::Explanation);
    session.reset();

    assert!(session.criteria().is_empty());
    let ResultsState::Ready(view) = session.results() else {
        panic!("expected results");
    };
    assert_eq!(view.matches.len(), 1330);
    assert!(view.visibility.is_visible(Section::Explanation));
}

#[test]
fn session_state_snapshots_as_json() {
    let mut session = Session::loaded(corpus(), 20);
    session.select(Dimension::Paul, Some("பொருட்பால்"));
    session.set_search("line");
    session.toggle(Section::Sp);
    session.next_page();

    let snapshot = serde_json::to_value(&session).unwrap();
    assert_eq!(snapshot["criteria"]["categories"]["paul"], "பொருட்பால்");
    assert_eq!(snapshot["criteria"]["search"], "line");
    assert_eq!(snapshot["view"]["page"], 2);
    assert_eq!(snapshot["view"]["visibility"]["sp"], false);
    assert_eq!(snapshot["search_tier"], "primary");
    assert!(snapshot.get("records").is_none());
}

#[test]
fn empty_match_is_distinct_from_failure() {
    let mut session = Session::loaded(corpus(), 20);
    session.set_search("zzz-not-present");
    let ResultsState::Ready(view) = session.results() else {
        panic!("expected results");
    };
    assert!(view.is_empty());
    assert_eq!(view.empty_message(), Some(view::EMPTY_RESULTS_MESSAGE));
    assert_eq!(view.page().total_pages, 1);
}

#[test]
fn failed_load_reports_static_message_and_no_options() {
    let mut session = Session::failed("connection refused", 20);
    session.select(Dimension::Paul, Some("அறத்துப்பால்"));
    match session.results() {
        ResultsState::LoadFailed { message, reason } => {
            assert_eq!(message, view::LOAD_FAILED_MESSAGE);
            assert_eq!(reason, "connection refused");
        }
        other => panic!("expected load failure, got {other:?}"),
    }
    assert!(session.records().is_empty());
    let options = session.options();
    assert!(options.paul.values.is_empty());
    assert!(!options.paul.enabled);
    assert_eq!(session.filter_passes(), 0);
}

#[test]
fn options_for_empty_selection_list_every_paul() {
    let records = corpus();
    let options = CategoryOptions::build(&records, &CategorySelection::default());
    assert_eq!(options.paul.placeholder, "All Paul");
    assert_eq!(options.iyal.placeholder, "Select Paul first");
    assert_eq!(options.adikaram.placeholder, "Select Iyal first");
    assert_eq!(options.adikaram.values.len(), 133);
}

#[tokio::test]
async fn loads_dataset_over_http() {
    let server = MockServer::start().await;
    let rows: Vec<RawRow> = vec![row(2), row(1), row(3)];
    Mock::given(method("GET"))
        .and(path("/data/thirukkural.csv"))
        .respond_with(ResponseTemplate::new(200).set_body_string(csv_body(&rows)))
        .expect(1)
        .mount(&server)
        .await;

    let location = format!("{}/data/thirukkural.csv", server.uri());
    let (origin, asset) = AssetOrigin::resolve(&location, None).unwrap();
    assert_eq!(asset, "thirukkural.csv");
    let client = dataset::build_client(5).unwrap();
    let source = origin.locate(&asset).unwrap();
    let parsed = dataset::load_rows(&client, &source, b',').await.unwrap();
    let records = record::normalize_rows(&parsed);

    assert_eq!(records.iter().map(|k| k.number()).collect::<Vec<_>>(), vec![1, 2, 3]);
    assert_eq!(
        records[0].lines(),
        vec!["couplet 1 first line", "couplet 1 second line"]
    );
    assert_eq!(records[0].paul(), "அறத்துப்பால்");
}

#[tokio::test]
async fn http_error_statuses_fail_the_load() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing.csv"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/broken.csv"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = dataset::build_client(5).unwrap();
    let origin = AssetOrigin::parse(&server.uri()).unwrap();
    for (asset, expected) in [("missing.csv", 404u16), ("broken.csv", 500u16)] {
        let source = origin.locate(asset).unwrap();
        match dataset::load_rows(&client, &source, b',').await {
            Err(LoadError::Status { status, .. }) => assert_eq!(status, expected),
            other => panic!("expected status error, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn cache_installs_activates_and_serves_offline() {
    let server = MockServer::start().await;
    let body = csv_body(&[row(1), row(2)]);
    Mock::given(method("GET"))
        .and(path("/thirukkural.csv"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("kuralview-v0")).unwrap();
    std::fs::write(dir.path().join("kuralview-v0").join("thirukkural.csv"), "stale").unwrap();

    let client = dataset::build_client(5).unwrap();
    let origin = AssetOrigin::parse(&server.uri()).unwrap();
    let cache = AssetCache::new(dir.path(), "kuralview-v1").unwrap();

    let stored = cache
        .install(&client, &origin, &["thirukkural.csv".to_string()])
        .await
        .unwrap();
    assert_eq!(stored, 1);
    assert_eq!(cache.activate().await.unwrap(), vec!["kuralview-v0".to_string()]);
    assert!(!dir.path().join("kuralview-v0").exists());

    // served from disk: the mock only allows the single install request
    let bytes = cache.fetch(&client, &origin, "thirukkural.csv").await.unwrap();
    assert_eq!(bytes, body.into_bytes());
    let rows = dataset::parse_rows(&bytes, b',').unwrap();
    assert_eq!(rows.len(), 2);
}

#[tokio::test]
async fn cache_miss_fetches_and_keeps_the_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/thirukkural.csv"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Number\n9\n"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let client = dataset::build_client(5).unwrap();
    let origin = AssetOrigin::parse(&server.uri()).unwrap();
    let cache = AssetCache::new(dir.path(), "v1").unwrap();

    let first = cache.fetch(&client, &origin, "thirukkural.csv").await.unwrap();
    let second = cache.fetch(&client, &origin, "thirukkural.csv").await.unwrap();
    assert_eq!(first, second);
    assert_eq!(
        cache.cached("thirukkural.csv").await.unwrap(),
        Some(b"Number\n9\n".to_vec())
    );
}

#[tokio::test]
async fn cache_install_fails_on_unreachable_asset() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone.csv"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let client = dataset::build_client(5).unwrap();
    let origin = AssetOrigin::parse(&server.uri()).unwrap();
    let cache = AssetCache::new(dir.path(), "v1").unwrap();
    let err = cache
        .install(&client, &origin, &["gone.csv".to_string()])
        .await
        .unwrap_err();
    assert!(err.to_string().contains("gone.csv"));
    assert_eq!(cache.cached("gone.csv").await.unwrap(), None);
}

#[tokio::test]
async fn failed_install_leaves_no_partial_version() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/thirukkural.csv"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Number\n1\n"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/icon.png"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let client = dataset::build_client(5).unwrap();
    let origin = AssetOrigin::parse(&server.uri()).unwrap();
    let cache = AssetCache::new(dir.path(), "v1").unwrap();
    let assets = vec!["thirukkural.csv".to_string(), "icon.png".to_string()];

    let err = cache.install(&client, &origin, &assets).await.unwrap_err();
    assert!(err.to_string().contains("icon.png"));
    assert!(!cache.is_installed().await);
    assert_eq!(cache.cached("thirukkural.csv").await.unwrap(), None);
    let leftovers: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert!(leftovers.is_empty(), "unexpected entries: {leftovers:?}");

    // a working version survives a failed reinstall untouched
    cache
        .install(&client, &origin, &["thirukkural.csv".to_string()])
        .await
        .unwrap();
    cache.install(&client, &origin, &assets).await.unwrap_err();
    assert!(cache.is_installed().await);
    assert_eq!(
        cache.cached("thirukkural.csv").await.unwrap(),
        Some(b"Number\n1\n".to_vec())
    );
    assert!(!dir.path().join(".v1.partial").exists());
}

#[tokio::test]
async fn version_bump_installs_and_drops_the_old_version() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/thirukkural.csv"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Number\n7\n"))
        .expect(2)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let client = dataset::build_client(5).unwrap();
    let origin = AssetOrigin::parse(&server.uri()).unwrap();
    let assets = vec!["thirukkural.csv".to_string()];

    let v1 = AssetCache::new(dir.path(), "kuralview-v1").unwrap();
    assert!(v1.ensure_current(&client, &origin, &assets, false).await.unwrap());
    assert!(!v1.ensure_current(&client, &origin, &assets, false).await.unwrap());

    let v2 = AssetCache::new(dir.path(), "kuralview-v2").unwrap();
    assert!(v2.ensure_current(&client, &origin, &assets, false).await.unwrap());
    assert!(!dir.path().join("kuralview-v1").exists());
    assert_eq!(
        v2.cached("thirukkural.csv").await.unwrap(),
        Some(b"Number\n7\n".to_vec())
    );
}
