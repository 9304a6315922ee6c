//! Pipeline Integration Tests
//!
//! Runs the three pipelines end to end against the echoing stub generator.

mod common;

use std::time::Duration;

use common::{fact_checker_tag, orchestrator, orchestrator_with, researcher_tag, writer_tag, StubGenerator};
use veritas::agents::AgentError;
use veritas::config::Settings;
use veritas::core::{ComparativeRequest, IterativeRequest, SimpleRequest, WorkflowRequest};
use veritas::domain::{AgentRole, ContentType, StepLog, WorkflowSteps, WorkflowType};
use veritas::{GenerationError, WorkflowError};

#[tokio::test]
async fn test_simple_pipeline_logs_three_steps() {
    let generator = StubGenerator::echo();
    let orchestrator = orchestrator(generator.clone());
    let mut log = StepLog::new();

    let record = orchestrator
        .run_simple(&SimpleRequest::new("T"), &mut log)
        .await
        .unwrap();

    assert_eq!(log.step_names(), vec!["research", "fact_check", "write"]);
    assert_eq!(generator.calls(), 3);
    assert_eq!(record.workflow_type, WorkflowType::Simple);
    assert_eq!(record.workflow_history.as_slice(), log.entries());
    assert!(log.iter().all(|e| e.run_id == record.run_id));
    assert!(record.is_topic_consistent());

    let agents: Vec<AgentRole> = log.iter().map(|e| e.agent).collect();
    assert_eq!(
        agents,
        vec![AgentRole::Researcher, AgentRole::FactChecker, AgentRole::Writer]
    );
}

#[tokio::test]
async fn test_simple_article_carries_every_role() {
    let orchestrator = orchestrator(StubGenerator::echo());
    let mut log = StepLog::new();

    let record = orchestrator
        .run_simple(&SimpleRequest::new("T"), &mut log)
        .await
        .unwrap();

    let article = record.primary_content();
    assert!(article.contains(&researcher_tag()));
    assert!(article.contains(&fact_checker_tag()));
    assert!(article.contains(&writer_tag()));

    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json["workflow_type"], "simple");
    assert_eq!(json["article"]["content_type"], "article");
    assert_eq!(json["article"]["style"], "informative");
    assert_eq!(json["research"]["needs_fact_checking"], true);
}

#[tokio::test]
async fn test_simple_uses_role_temperatures() {
    let generator = StubGenerator::echo();
    let orchestrator = orchestrator(generator.clone());
    let mut log = StepLog::new();

    orchestrator
        .run_simple(&SimpleRequest::new("T"), &mut log)
        .await
        .unwrap();

    let temps: Vec<f32> = generator.requests().iter().map(|r| r.temperature).collect();
    assert_eq!(temps, vec![0.7, 0.3, 0.7]);
}

#[tokio::test]
async fn test_iterative_pipeline_refines_with_report() {
    let generator = StubGenerator::echo();
    let orchestrator = orchestrator(generator.clone());
    let mut log = StepLog::new();

    let record = orchestrator
        .run_iterative(&IterativeRequest::new("Quantum computing"), &mut log)
        .await
        .unwrap();

    assert_eq!(
        log.step_names(),
        vec![
            "initial_research",
            "fact_check",
            "refined_research",
            "final_fact_check",
            "write"
        ]
    );
    assert_eq!(record.workflow_type, WorkflowType::Iterative);

    let WorkflowSteps::Iterative {
        initial_fact_check, ..
    } = &record.steps
    else {
        panic!("expected iterative steps");
    };

    let requests = generator.requests();
    assert_eq!(requests.len(), 5);
    assert!(requests[2].user.contains(initial_fact_check.text()));
    assert!(requests[2]
        .user
        .contains("Previous research was fact-checked. Address these points:\n"));
}

#[tokio::test]
async fn test_comparative_two_perspectives() {
    let orchestrator = orchestrator(StubGenerator::echo());
    let mut log = StepLog::new();

    let record = orchestrator
        .run_comparative(&ComparativeRequest::new("Remote work", ["A", "B"]), &mut log)
        .await
        .unwrap();

    assert_eq!(
        log.step_names(),
        vec![
            "research_perspective_1",
            "research_perspective_2",
            "cross_check",
            "overall_fact_check",
            "write_comparison"
        ]
    );

    let WorkflowSteps::Comparative {
        perspectives,
        research_results,
        cross_check,
        comparison,
        ..
    } = &record.steps
    else {
        panic!("expected comparative steps");
    };
    assert_eq!(perspectives, &vec!["A".to_string(), "B".to_string()]);
    assert_eq!(research_results.labels(), vec!["A", "B"]);
    assert!(cross_check.is_some());
    assert_eq!(comparison.content_type(), Some(ContentType::Comparison));
    assert!(comparison.text().contains("Cross-Check Analysis:"));
}

#[tokio::test]
async fn test_comparative_single_perspective_skips_cross_check() {
    let orchestrator = orchestrator(StubGenerator::echo());
    let mut log = StepLog::new();

    let record = orchestrator
        .run_comparative(&ComparativeRequest::new("Remote work", ["A"]), &mut log)
        .await
        .unwrap();

    assert_eq!(
        log.step_names(),
        vec!["research_perspective_1", "overall_fact_check", "write_comparison"]
    );

    let json = serde_json::to_value(&record).unwrap();
    assert!(json["cross_check"].is_null());
    assert_eq!(json["workflow_type"], "comparative");
}

#[tokio::test]
async fn test_comparative_entry_count() {
    for n in 1..=4usize {
        let labels: Vec<String> = (1..=n).map(|i| format!("view {}", i)).collect();
        let orchestrator = orchestrator(StubGenerator::echo());
        let mut log = StepLog::new();

        let record = orchestrator
            .run_comparative(&ComparativeRequest::new("Topic", labels.clone()), &mut log)
            .await
            .unwrap();

        let expected = n + usize::from(n >= 2) + 2;
        assert_eq!(log.len(), expected, "n = {}", n);
        assert_eq!(record.workflow_history.len(), expected);
    }
}

#[tokio::test]
async fn test_overall_fact_check_sees_combined_findings() {
    let generator = StubGenerator::echo();
    let orchestrator = orchestrator(generator.clone());
    let mut log = StepLog::new();

    let record = orchestrator
        .run_comparative(&ComparativeRequest::new("Topic", ["A", "B"]), &mut log)
        .await
        .unwrap();

    let WorkflowSteps::Comparative {
        research_results, ..
    } = &record.steps
    else {
        panic!("expected comparative steps");
    };

    let expected = format!(
        "A:\n{}\n\n---\n\nB:\n{}",
        research_results.get("A").unwrap(),
        research_results.get("B").unwrap()
    );
    let overall_prompt = &generator.requests()[3].user;
    assert!(overall_prompt.contains(&expected));
    assert!(generator.requests()[0]
        .user
        .contains("Focus on this perspective: A"));
}

#[tokio::test]
async fn test_concurrent_fan_out_keeps_perspective_order() {
    // Perspective 1 finishes last when run concurrently
    let generator = StubGenerator::with_delays(&[
        ("Focus on this perspective: first", Duration::from_millis(150)),
        ("Focus on this perspective: second", Duration::from_millis(10)),
    ]);
    let settings = Settings {
        research_concurrency: 3,
        ..Default::default()
    };
    let orchestrator = orchestrator_with(generator.clone(), settings);
    let mut log = StepLog::new();

    let record = orchestrator
        .run_comparative(
            &ComparativeRequest::new("Topic", ["first", "second", "third"]),
            &mut log,
        )
        .await
        .unwrap();

    assert!(generator.max_in_flight() >= 2);
    assert_eq!(
        &log.step_names()[..3],
        &["research_perspective_1", "research_perspective_2", "research_perspective_3"]
    );

    let WorkflowSteps::Comparative {
        research_results, ..
    } = &record.steps
    else {
        panic!("expected comparative steps");
    };
    assert_eq!(research_results.labels(), vec!["first", "second", "third"]);
    assert!(research_results.get("first").unwrap().contains("perspective: first"));

    for pair in log.entries().windows(2) {
        assert!(pair[0].timestamp <= pair[1].timestamp);
    }
}

#[tokio::test]
async fn test_sequential_fan_out_by_default() {
    let generator = StubGenerator::slow(Duration::from_millis(5));
    let orchestrator = orchestrator(generator.clone());
    let mut log = StepLog::new();

    orchestrator
        .run_comparative(&ComparativeRequest::new("Topic", ["a", "b", "c"]), &mut log)
        .await
        .unwrap();

    assert_eq!(generator.max_in_flight(), 1);
}

#[tokio::test]
async fn test_failure_keeps_earlier_entries() {
    for k in 1..=3usize {
        let generator = StubGenerator::failing_on(k);
        let orchestrator = orchestrator(generator.clone());
        let mut log = StepLog::new();

        let err = orchestrator
            .run_simple(&SimpleRequest::new("T"), &mut log)
            .await
            .unwrap_err();

        assert_eq!(log.len(), k - 1, "failure at step {}", k);
        assert_eq!(generator.calls(), k);
        match err {
            WorkflowError::Step { step, source, .. } => {
                assert_eq!(step, ["research", "fact_check", "write"][k - 1]);
                assert!(matches!(
                    source,
                    AgentError::Generation(GenerationError::Http { status: 500, .. })
                ));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }
}

#[tokio::test]
async fn test_fan_out_failure_stops_run() {
    let generator = StubGenerator::failing_on(2);
    let orchestrator = orchestrator(generator.clone());
    let mut log = StepLog::new();

    let err = orchestrator
        .run_comparative(&ComparativeRequest::new("Topic", ["a", "b", "c"]), &mut log)
        .await
        .unwrap_err();

    assert_eq!(log.step_names(), vec!["research_perspective_1"]);
    assert_eq!(generator.calls(), 2);
    assert!(matches!(err, WorkflowError::Step { ref step, .. } if step == "research_perspective_2"));
}

#[tokio::test]
async fn test_concurrent_fan_out_failure_keeps_perspective_order() {
    // Perspective 3 fails while perspective 1 is still running
    let generator = StubGenerator::failing_on_marker(
        "Focus on this perspective: c",
        &[("Focus on this perspective: a", Duration::from_millis(150))],
    );
    let settings = Settings {
        research_concurrency: 3,
        ..Default::default()
    };
    let orchestrator = orchestrator_with(generator.clone(), settings);
    let mut log = StepLog::new();

    let err = orchestrator
        .run_comparative(
            &ComparativeRequest::new("Topic", ["a", "b", "c", "d"]),
            &mut log,
        )
        .await
        .unwrap_err();

    assert!(generator.max_in_flight() >= 2);
    assert_eq!(
        log.step_names(),
        vec!["research_perspective_1", "research_perspective_2"]
    );
    assert!(matches!(err, WorkflowError::Step { ref step, .. } if step == "research_perspective_3"));
}

#[tokio::test]
async fn test_invalid_input_writes_nothing() {
    let generator = StubGenerator::echo();
    let orchestrator = orchestrator(generator.clone());
    let mut log = StepLog::new();

    let cases = vec![
        WorkflowRequest::from(SimpleRequest::new("   ")),
        WorkflowRequest::from(IterativeRequest::new("")),
        WorkflowRequest::from(ComparativeRequest::new("Topic", Vec::<String>::new())),
        WorkflowRequest::from(ComparativeRequest::new("Topic", ["A", " A"])),
        WorkflowRequest::from(ComparativeRequest::new("Topic", ["A", ""])),
    ];

    for request in cases {
        let result = orchestrator.run(&request, &mut log).await;
        assert!(
            matches!(result, Err(WorkflowError::InvalidInput(_))),
            "{:?}",
            request
        );
    }

    assert!(log.is_empty());
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn test_duplicate_perspective_named_in_error() {
    let orchestrator = orchestrator(StubGenerator::echo());
    let mut log = StepLog::new();

    let err = orchestrator
        .run_comparative(&ComparativeRequest::new("Topic", ["Same", "Other", "Same"]), &mut log)
        .await
        .unwrap_err();

    assert!(err.to_string().contains("Same"));
}

#[tokio::test]
async fn test_summary_appends_to_same_run() {
    let generator = StubGenerator::echo();
    let orchestrator = orchestrator(generator.clone());
    let mut log = StepLog::new();

    let record = orchestrator
        .run_simple(&SimpleRequest::new("T"), &mut log)
        .await
        .unwrap();
    let summary = orchestrator.get_summary(&record, &mut log).await.unwrap();

    assert_eq!(log.len(), 4);
    let last = log.last().unwrap();
    assert_eq!(last.step, "summary");
    assert_eq!(last.run_id, record.run_id);
    assert_eq!(summary.content_type(), Some(ContentType::Summary));

    let prompt = &generator.requests()[3].user;
    assert!(prompt.contains(record.primary_content()));
    assert!(prompt.contains("3 paragraphs or fewer"));

    // The record keeps only the pipeline's own entries
    assert_eq!(record.workflow_history.len(), 3);
}

#[tokio::test]
async fn test_summary_of_iterative_record_uses_article() {
    let generator = StubGenerator::echo();
    let orchestrator = orchestrator(generator.clone());
    let mut log = StepLog::new();

    let record = orchestrator
        .run_iterative(&IterativeRequest::new("T"), &mut log)
        .await
        .unwrap();
    orchestrator.get_summary(&record, &mut log).await.unwrap();

    let WorkflowSteps::Iterative { article, .. } = &record.steps else {
        panic!("expected iterative steps");
    };
    let prompt = &generator.requests()[5].user;
    assert!(prompt.contains(article.text()));
    assert_eq!(log.step_names().last(), Some(&"summary"));
    assert_eq!(log.len(), 6);
}

#[tokio::test]
async fn test_summary_of_comparative_record_uses_comparison() {
    let generator = StubGenerator::echo();
    let orchestrator = orchestrator(generator.clone());
    let mut log = StepLog::new();

    let record = orchestrator
        .run_comparative(&ComparativeRequest::new("T", ["A", "B"]), &mut log)
        .await
        .unwrap();
    orchestrator.get_summary(&record, &mut log).await.unwrap();

    let WorkflowSteps::Comparative { comparison, .. } = &record.steps else {
        panic!("expected comparative steps");
    };
    assert_eq!(comparison.content_type(), Some(ContentType::Comparison));
    let prompt = &generator.requests()[5].user;
    assert!(prompt.contains(comparison.text()));

    let last = log.last().unwrap();
    assert_eq!(last.step, "summary");
    assert_eq!(last.run_id, record.run_id);
}

#[tokio::test]
async fn test_log_accumulates_across_runs() {
    let orchestrator = orchestrator(StubGenerator::echo());
    let mut log = StepLog::new();

    let first = orchestrator
        .run_simple(&SimpleRequest::new("one"), &mut log)
        .await
        .unwrap();
    let second = orchestrator
        .run_comparative(&ComparativeRequest::new("two", ["A"]), &mut log)
        .await
        .unwrap();

    assert_eq!(log.len(), 6);
    assert_ne!(first.run_id, second.run_id);
    assert_eq!(second.workflow_history.len(), 3);
    assert!(second.workflow_history.iter().all(|e| e.run_id == second.run_id));
}
