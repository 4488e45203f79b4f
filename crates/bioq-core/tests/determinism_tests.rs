//! Resolution must be reproducible for identical input, snapshot and context

mod common;

use bioq_core::aggregate::ReplayClient;
use bioq_core::{EngineConfig, QueryError, RawQuery, ResolvedResult};
use proptest::prelude::*;
use std::sync::Arc;

const QUESTIONS: &[&str] = &[
    "find mouse homologs of TP53",
    "what does p53 do",
    "What is the mouse version of BRCA1 gene?",
    "compare TP53 and MDM2",
    "What proteins interact with TP53?",
    "Tell me about the role of BRCA1 in DNA repair",
    "tell me about aspirin",
    "homologs of p53 in rats",
    "Which pathways involve TP53?",
    "is TP53 involved in apoptosis",
];

/// Questions that end in an error before or during aggregation
const FAILING: &[&str] = &[
    "",
    "what is the function of ZZZ9",
    "find differences between TP53 and FOO1",
    "orthologs of BRCA1",
    "Get the DNA sequence of insulin gene",
];

/// Both sides of a `Result`, so two different errors never compare equal
fn render<T: serde::Serialize>(outcome: &Result<T, QueryError>) -> String {
    match outcome {
        Ok(value) => serde_json::to_string(value).unwrap(),
        Err(e) => format!("error {}: {}", e.code(), e),
    }
}

async fn answer_twice(client: impl Fn() -> Arc<ReplayClient>, question: &str) -> (String, String) {
    let raw = RawQuery::new(question);
    let first = common::engine_with(client(), EngineConfig::default()).unwrap();
    let second = common::engine_with(client(), EngineConfig::default()).unwrap();
    let a: Result<ResolvedResult, QueryError> = first.answer(&raw).await;
    let b: Result<ResolvedResult, QueryError> = second.answer(&raw).await;
    (render(&a), render(&b))
}

const HINTS: &[Option<&str>] = &[None, Some("human"), Some("mouse"), Some("NCBITaxon:10116")];

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_plans_are_reproducible(
        question in prop::sample::select(QUESTIONS),
        hint in prop::sample::select(HINTS),
        padding in "[ \t]{0,3}",
    ) {
        let first = common::engine().unwrap();
        let second = common::engine().unwrap();

        let mut raw = RawQuery::new(format!("{padding}{question}{padding}"));
        if let Some(species) = hint {
            raw = raw.with_species(species);
        }

        prop_assert_eq!(render(&first.interpret(&raw)), render(&second.interpret(&raw)));
        prop_assert_eq!(render(&first.plan(&raw)), render(&second.plan(&raw)));
    }
}

#[tokio::test]
async fn test_answers_are_identical_across_engines() {
    for question in QUESTIONS.iter().chain(FAILING) {
        let (a, b) = answer_twice(|| common::recorded_client().unwrap(), question).await;
        assert_eq!(a, b, "answers differ for {question:?}");
    }
}

#[tokio::test]
async fn test_failing_questions_keep_their_error() {
    for question in FAILING {
        let (a, _) = answer_twice(|| common::recorded_client().unwrap(), question).await;
        assert!(a.starts_with("error "), "{question:?} answered: {a}");
    }
}

#[tokio::test]
async fn test_failed_service_answers_are_identical() {
    let timeout = || {
        Arc::new(
            ReplayClient::from_json(
                r#"{"responses": [
                    {"service": "entrez", "operation": "taxonomy_search", "failure": {"kind": "timeout"}}
                ]}"#,
            )
            .unwrap(),
        )
    };
    let (a, b) = answer_twice(timeout, "find mouse homologs of TP53").await;
    assert_eq!(a, b);
    assert!(a.contains(r#""status":"failed""#), "{a}");
}
