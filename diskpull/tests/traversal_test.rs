//! End-to-end traversal properties over a scripted surface.

mod common;

use std::sync::Arc;

use common::MockSurface;
use diskpull::{
    DateRange, EngineConfig, Outcome, Pacing, RunReport, Surface, TraversalEngine,
};
use tokio::time::Instant;

fn quiet_config(range: DateRange) -> EngineConfig {
    EngineConfig {
        range,
        pacing: Pacing::immediate(),
        ..EngineConfig::default()
    }
}

async fn run(surface: Arc<MockSurface>, range: DateRange) -> RunReport {
    TraversalEngine::new(surface as Arc<dyn Surface>, quiet_config(range))
        .run()
        .await
}

fn june_2024() -> DateRange {
    DateRange::new("2024-06-01", "2024-06-30").expect("valid range")
}

#[tokio::test]
async fn processes_every_group_exactly_once_until_exhausted() {
    let surface = Arc::new(MockSurface::new(&[
        ("5 June 2024", 300.0),
        ("4 June 2024", 600.0),
        ("3 June 2024", 900.0),
    ]));

    let report = run(surface.clone(), DateRange::disabled()).await;

    assert_eq!(report.outcome, Outcome::Exhausted);
    assert_eq!(report.state.processed, 3);
    assert_eq!(report.state.failed, 0);
    assert_eq!(
        surface.downloads(),
        vec!["5 June 2024", "4 June 2024", "3 June 2024"]
    );

    // At-most-once: no label+position pair reaches selection twice.
    let attempts = surface.select_attempts();
    assert_eq!(attempts.len(), 3);
    let mut labels: Vec<_> = attempts.iter().map(|(label, _)| label.clone()).collect();
    labels.dedup();
    assert_eq!(labels.len(), 3);
}

#[tokio::test]
async fn cursor_is_monotonic_for_the_whole_run() {
    let surface = Arc::new(MockSurface::new(&[
        ("5 June 2024", 300.0),
        ("4 June 2024", 600.0),
        ("3 June 2024", 900.0),
    ]));

    let report = run(surface.clone(), DateRange::disabled()).await;

    let deltas = surface.scroll_deltas();
    assert!(!deltas.is_empty());
    assert!(deltas.iter().all(|delta| *delta >= 0.0));
    let total: f64 = deltas.iter().sum();
    assert_eq!(report.scroll_offset, total);
}

#[tokio::test]
async fn stops_at_the_first_group_before_the_range_without_scrolling_past_it() {
    let surface = Arc::new(MockSurface::new(&[
        ("5 June 2024", 300.0),
        ("1 June 2024", 600.0),
        ("25 May 2024", 900.0),
    ]));

    let report = run(surface.clone(), june_2024()).await;

    assert_eq!(report.outcome, Outcome::RangeStopped);
    assert_eq!(report.state.processed, 2);
    assert_eq!(surface.downloads(), vec!["5 June 2024", "1 June 2024"]);

    // The out-of-range group was never selected and never scrolled past:
    // only the two processed groups produced scroll advances.
    assert!(surface
        .select_attempts()
        .iter()
        .all(|(label, _)| label != "25 May 2024"));
    assert_eq!(surface.scroll_deltas(), vec![250.0, 300.0]);
}

#[tokio::test]
async fn groups_after_the_range_are_skipped_and_counted() {
    let surface = Arc::new(MockSurface::new(&[
        ("1 July 2024", 300.0),
        ("30 June 2024", 600.0),
        ("25 May 2024", 900.0),
    ]));

    let report = run(surface.clone(), june_2024()).await;

    assert_eq!(report.outcome, Outcome::RangeStopped);
    assert_eq!(report.state.skipped, 1);
    assert_eq!(report.state.processed, 1);
    assert_eq!(surface.downloads(), vec!["30 June 2024"]);
}

#[tokio::test]
async fn five_consecutive_empty_rounds_exhaust_the_run() {
    let surface = Arc::new(MockSurface::empty());

    let report = run(surface.clone(), DateRange::disabled()).await;

    assert_eq!(report.outcome, Outcome::Exhausted);
    assert_eq!(report.state.processed, 0);
    assert_eq!(surface.scroll_deltas(), vec![600.0; 5]);
    // Each empty round is pre-check + scan + scroll; nothing ran after the
    // fifth round terminated the loop.
    assert_eq!(surface.calls(), 15);
}

#[tokio::test]
async fn fatal_fault_short_circuits_all_further_surface_calls() {
    // One full iteration takes ten surface calls; the first call of the
    // second iteration hits the dead session.
    let surface = Arc::new(
        MockSurface::new(&[
            ("5 June 2024", 300.0),
            ("4 June 2024", 600.0),
            ("3 June 2024", 900.0),
        ])
        .fail_after(10),
    );

    let report = run(surface.clone(), DateRange::disabled()).await;

    assert!(matches!(report.outcome, Outcome::FatalAbort { .. }));
    // Counters reflect only what completed strictly before the fault.
    assert_eq!(report.state.processed, 1);
    assert_eq!(surface.downloads(), vec!["5 June 2024"]);
    // The failing call was the last surface call of the run.
    assert_eq!(surface.calls(), 11);
}

#[tokio::test]
async fn expired_deadline_aborts_before_any_surface_call() {
    let surface = Arc::new(MockSurface::new(&[("5 June 2024", 300.0)]));
    let config = EngineConfig {
        deadline: Some(Instant::now()),
        ..quiet_config(DateRange::disabled())
    };

    let report = TraversalEngine::new(surface.clone() as Arc<dyn Surface>, config)
        .run()
        .await;

    match &report.outcome {
        Outcome::FatalAbort { reason } => assert!(reason.contains("deadline")),
        other => panic!("expected fatal abort, got {other:?}"),
    }
    assert_eq!(surface.calls(), 0);
}

#[tokio::test]
async fn unparsable_heading_is_processed_and_recorded() {
    let surface = Arc::new(MockSurface::new(&[("Screenshots", 300.0)]));

    let report = run(surface.clone(), june_2024()).await;

    assert_eq!(report.outcome, Outcome::Exhausted);
    assert_eq!(report.state.processed, 1);
    assert_eq!(surface.downloads(), vec!["Screenshots"]);
    assert!(report
        .failures
        .iter()
        .any(|f| f.context == "Screenshots" && f.message.contains("unparsable date label")));
}

#[tokio::test]
async fn missing_download_control_counts_as_failed_but_still_advances() {
    let surface = Arc::new(
        MockSurface::new(&[("5 June 2024", 300.0)]).without_download_control(),
    );

    let report = run(surface.clone(), DateRange::disabled()).await;

    assert_eq!(report.outcome, Outcome::Exhausted);
    assert_eq!(report.state.processed, 0);
    assert_eq!(report.state.failed, 1);
    assert!(surface.downloads().is_empty());
    // Handled regardless: the group was scrolled out of the band.
    assert_eq!(surface.scroll_deltas()[0], 250.0);
    assert!(report
        .failures
        .iter()
        .any(|f| f.message.contains("download control not found")));
}

#[tokio::test]
async fn unconfirmed_selection_counts_as_failed_without_downloading() {
    let surface = Arc::new(
        MockSurface::new(&[("5 June 2024", 300.0)]).without_selection_indicator(),
    );

    let report = run(surface.clone(), DateRange::disabled()).await;

    assert_eq!(report.state.processed, 0);
    assert_eq!(report.state.failed, 1);
    assert!(surface.downloads().is_empty());
    assert!(report
        .failures
        .iter()
        .any(|f| f.message.contains("selection could not be confirmed")));
}

#[tokio::test]
async fn selection_ladder_falls_back_to_the_under_point_probe() {
    let surface = Arc::new(
        MockSurface::new(&[("5 June 2024", 300.0)])
            .without_checkboxes()
            .with_under_point_fallback(),
    );

    let report = run(surface.clone(), DateRange::disabled()).await;

    assert_eq!(report.state.processed, 1);
    assert_eq!(surface.downloads(), vec!["5 June 2024"]);
}

#[tokio::test]
async fn blunt_click_without_a_confirmed_selection_does_not_count() {
    // No checkbox and no under-point probe: the ladder ends in a direct
    // click, which on this surface selects nothing. Verification must
    // catch that and fold it into a failed action.
    let surface = Arc::new(MockSurface::new(&[("5 June 2024", 300.0)]).without_checkboxes());

    let report = run(surface.clone(), DateRange::disabled()).await;

    assert_eq!(report.state.processed, 0);
    assert_eq!(report.state.failed, 1);
    assert!(surface.downloads().is_empty());
}

#[tokio::test]
async fn lingering_selection_is_cleared_by_the_next_pre_check() {
    let surface = Arc::new(
        MockSurface::new(&[("5 June 2024", 300.0), ("4 June 2024", 600.0)])
            .with_sticky_selection(5),
    );

    let report = run(surface.clone(), DateRange::disabled()).await;

    // The first deselect gives up after three attempts; the next
    // iteration's pre-check finishes the job and the walk continues.
    assert_eq!(report.outcome, Outcome::Exhausted);
    assert_eq!(report.state.processed, 2);
    assert_eq!(surface.downloads(), vec!["5 June 2024", "4 June 2024"]);
}
