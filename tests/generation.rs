//! End-to-end session behaviour with scripted collaborators.

#![allow(clippy::panic)]

mod common;

use std::sync::Arc;

use common::{RoutedProvider, StubPolicy, StubRetriever};
use hypogen_rs::agent::{
    AgentConfig, IterationController, PromptSet, RunEvent, RunStop, SessionReport,
};
use hypogen_rs::core::{COLUMNS, HypothesisContext};
use tempfile::TempDir;

fn config(iterations: usize, agent_iterations: usize) -> AgentConfig {
    AgentConfig::builder()
        .api_key("test")
        .iterations(iterations)
        .agent_iterations(agent_iterations)
        .build()
        .unwrap_or_else(|e| panic!("config: {e}"))
}

async fn run_session(
    provider: Arc<RoutedProvider>,
    retriever: Arc<StubRetriever>,
    iterations: usize,
) -> SessionReport {
    let controller = IterationController::with_prompts(
        provider,
        retriever,
        Arc::new(StubPolicy::default()),
        config(iterations, 2),
        PromptSet::defaults(),
    );
    controller
        .run(&HypothesisContext::default(), |_| {})
        .await
}

#[tokio::test]
async fn three_iterations_yield_three_rows_in_order() {
    let provider = Arc::new(RoutedProvider::new(&["ATR", "WEE1", "POLQ"]));
    let retriever = Arc::new(StubRetriever::default());

    let report = run_session(provider, retriever, 3).await;

    assert_eq!(report.stop, RunStop::Completed);
    let names: Vec<_> = report.table.rows().iter().map(|r| r.short_name.as_str()).collect();
    assert_eq!(names, ["ATR", "WEE1", "POLQ"]);
    assert_eq!(report.known_concepts.as_str(), "ATRWEE1POLQ");
}

#[tokio::test]
async fn seeds_carry_earlier_short_names() {
    let provider = Arc::new(RoutedProvider::new(&["ATR", "WEE1", "POLQ"]));
    let retriever = Arc::new(StubRetriever::default());

    run_session(Arc::clone(&provider), retriever, 3).await;

    let seeds = provider.seeds();
    assert_eq!(seeds.len(), 3);
    assert!(seeds[0].ends_with("conceptually): "));
    assert!(seeds[1].ends_with("ATR"));
    assert!(seeds[2].ends_with("ATRWEE1"));
}

#[tokio::test]
async fn completed_row_fills_every_column() {
    let provider = Arc::new(RoutedProvider::new(&["ATR"]));
    let retriever = Arc::new(StubRetriever::default());

    let report = run_session(provider, Arc::clone(&retriever), 1).await;

    let row = &report.table.rows()[0];
    let cells = row.cells();
    assert_eq!(cells.len(), COLUMNS.len());
    assert!(cells.iter().all(|c| !c.is_empty()));
    assert_eq!(row.novelty_score, "7");
    assert_eq!(row.safety_annotation, "No restricted topics.");
    assert_eq!(row.literature_relation, "relates to ATR");

    // relation annotation searches by short name only
    let searches = retriever.searches.lock().map(|s| s.clone()).unwrap_or_default();
    assert_eq!(searches, ["ATR"]);
}

#[tokio::test]
async fn tool_stage_runs_every_query_in_order() {
    let provider = Arc::new(RoutedProvider::new(&["ATR"]));
    let retriever = Arc::new(StubRetriever::default());

    run_session(provider, Arc::clone(&retriever), 1).await;

    // agent_iterations = 2: draft, tools, revise, then terminal
    let questions = retriever.questions.lock().map(|q| q.clone()).unwrap_or_default();
    assert_eq!(questions, ["ATR evidence", "BRCA1 synthetic lethality"]);
}

#[tokio::test]
async fn fault_on_second_iteration_keeps_first_row() {
    let provider = Arc::new(RoutedProvider::new(&["ATR", "WEE1", "POLQ"]).failing_on_draft(2));
    let retriever = Arc::new(StubRetriever::default());

    let controller = IterationController::with_prompts(
        Arc::<RoutedProvider>::clone(&provider),
        retriever,
        Arc::new(StubPolicy::default()),
        config(3, 2),
        PromptSet::defaults(),
    );
    let mut aborted = Vec::new();
    let report = controller
        .run(&HypothesisContext::default(), |event| {
            if let RunEvent::Aborted { iteration, .. } = event {
                aborted.push(iteration);
            }
        })
        .await;

    assert_eq!(report.table.len(), 1);
    assert_eq!(report.table.rows()[0].short_name, "ATR");
    assert_eq!(aborted, [2]);
    assert!(matches!(
        &report.stop,
        RunStop::Aborted { iteration: 2, error } if error.contains("upstream unavailable")
    ));
    // no third draft was attempted
    assert_eq!(provider.seeds().len(), 2);
}

#[tokio::test]
async fn policy_fault_on_second_iteration_keeps_first_row() {
    let provider = Arc::new(RoutedProvider::new(&["ATR", "WEE1", "POLQ"]));
    let retriever = Arc::new(StubRetriever::default());
    let policy = Arc::new(StubPolicy::failing_on(2));

    let controller = IterationController::with_prompts(
        provider,
        Arc::<StubRetriever>::clone(&retriever),
        Arc::<StubPolicy>::clone(&policy),
        config(3, 2),
        PromptSet::defaults(),
    );
    let report = controller.run(&HypothesisContext::default(), |_| {}).await;

    assert_eq!(report.table.len(), 1);
    assert_eq!(report.known_concepts.as_str(), "ATR");
    assert!(matches!(
        &report.stop,
        RunStop::Aborted { iteration: 2, error } if error.contains("moderation service down")
    ));
    assert_eq!(policy.call_count(), 2);
    let searches = retriever.searches.lock().map(|s| s.clone()).unwrap_or_default();
    assert_eq!(searches, ["ATR"]);
}

#[tokio::test]
async fn relation_search_fault_on_second_iteration_keeps_first_row() {
    let provider = Arc::new(RoutedProvider::new(&["ATR", "WEE1", "POLQ"]));
    let retriever = Arc::new(StubRetriever {
        fail_search_on: Some(2),
        ..StubRetriever::default()
    });

    let report = run_session(Arc::clone(&provider), retriever, 3).await;

    assert_eq!(report.table.len(), 1);
    assert_eq!(report.table.rows()[0].short_name, "ATR");
    assert_eq!(report.known_concepts.as_str(), "ATR");
    assert!(matches!(
        &report.stop,
        RunStop::Aborted { iteration: 2, error } if error.contains("'WEE1'")
    ));
    assert_eq!(provider.seeds().len(), 2);
}

#[tokio::test]
async fn csv_export_has_header_and_rows() {
    let provider = Arc::new(RoutedProvider::new(&["ATR", "WEE1"]));
    let retriever = Arc::new(StubRetriever::default());
    let report = run_session(provider, retriever, 2).await;

    let dir = TempDir::new().unwrap_or_else(|e| panic!("tempdir: {e}"));
    let path = dir.path().join("hypotheses.csv");
    report
        .table
        .write_csv_path(&path)
        .unwrap_or_else(|e| panic!("write csv: {e}"));

    let mut reader = csv::Reader::from_path(&path).unwrap_or_else(|e| panic!("read csv: {e}"));
    let headers = reader.headers().unwrap_or_else(|e| panic!("headers: {e}")).clone();
    assert_eq!(headers.iter().collect::<Vec<_>>(), COLUMNS);
    let first_cells: Vec<String> = reader
        .records()
        .map(|r| r.map(|rec| rec[0].to_string()).unwrap_or_default())
        .collect();
    assert_eq!(first_cells, ["ATR", "WEE1"]);
}
