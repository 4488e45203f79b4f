//! Benchmark harness over the fixture questions

mod common;

use bioq_core::evaluation::Benchmark;
use bioq_core::IntentKind;

#[test]
fn test_fixture_benchmark() {
    let engine = common::engine().unwrap();
    let benchmark = Benchmark::from_file(common::fixture_path("benchmark_cases.json")).unwrap();
    let report = benchmark.run(&engine);

    assert_eq!(report.cases, 10);
    assert_eq!(report.outcomes.len(), 10);
    assert_eq!(report.by_category["homology"].cases, 2);

    let outcome = |id: &str| report.outcomes.iter().find(|o| o.id == id).unwrap();

    let hm001 = outcome("HM001");
    assert!(hm001.passed(), "{hm001:?}");
    assert_eq!(hm001.descriptors, 2);

    let gf001 = outcome("GF001");
    assert_eq!(gf001.predicted_intent, Some(IntentKind::Annotation));
    assert!(gf001.passed(), "{gf001:?}");

    let sq001 = outcome("SQ001");
    assert!(sq001.intent_correct);
    assert!(sq001.entities_correct);
    assert!(!sq001.resolved);
    assert!(sq001.error.is_some());

    let expected = report.entity_recognition_rate * 0.3
        + report.intent_accuracy * 0.3
        + report.resolved_rate * 0.4;
    assert!((report.overall_score - expected).abs() < 1e-9);
}
