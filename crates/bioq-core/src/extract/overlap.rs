use crate::model::EntitySpan;
use std::cmp::Ordering;

/// Preference order between two competing spans: longer first, then higher
/// confidence, then the smaller start offset, then entity kind, then text
fn preference(a: &EntitySpan, b: &EntitySpan) -> Ordering {
    b.len()
        .cmp(&a.len())
        .then_with(|| b.confidence.total_cmp(&a.confidence))
        .then_with(|| a.start.cmp(&b.start))
        .then_with(|| a.kind.cmp(&b.kind))
        .then_with(|| a.surface.cmp(&b.surface))
}

/// Keep a non-overlapping subset of spans, sorted by start offset
///
/// Spans are accepted greedily in preference order, so the result does not
/// depend on the order recognizers produced them in.
pub fn resolve_overlaps(mut spans: Vec<EntitySpan>) -> Vec<EntitySpan> {
    spans.sort_by(preference);

    let mut kept: Vec<EntitySpan> = Vec::with_capacity(spans.len());
    for span in spans {
        if !kept.iter().any(|k| k.overlaps(&span)) {
            kept.push(span);
        }
    }

    kept.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| preference(a, b)));
    kept
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::model::EntityKind;
    use proptest::prelude::*;

    fn span(start: usize, end: usize, kind: EntityKind, confidence: f64) -> EntitySpan {
        EntitySpan::new(format!("s{}-{}", start, end), start, end, kind, confidence)
    }

    #[test]
    fn test_longer_span_wins() {
        let kept = resolve_overlaps(vec![
            span(0, 3, EntityKind::Protein, 0.99),
            span(0, 17, EntityKind::Gene, 0.6),
        ]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].end, 17);
    }

    #[test]
    fn test_higher_confidence_wins_on_equal_length() {
        let kept = resolve_overlaps(vec![
            span(5, 9, EntityKind::Gene, 0.6),
            span(5, 9, EntityKind::Protein, 0.95),
        ]);
        assert_eq!(kept[0].kind, EntityKind::Protein);
    }

    #[test]
    fn test_kind_order_breaks_exact_ties() {
        let kept = resolve_overlaps(vec![
            span(5, 9, EntityKind::Chemical, 0.9),
            span(5, 9, EntityKind::Gene, 0.9),
        ]);
        assert_eq!(kept[0].kind, EntityKind::Gene);
    }

    #[test]
    fn test_output_sorted_by_start() {
        let kept = resolve_overlaps(vec![
            span(20, 24, EntityKind::Gene, 0.9),
            span(0, 5, EntityKind::Species, 0.8),
            span(10, 14, EntityKind::Gene, 0.9),
        ]);
        let starts: Vec<usize> = kept.iter().map(|s| s.start).collect();
        assert_eq!(starts, vec![0, 10, 20]);
    }

    proptest! {
        #[test]
        fn prop_equal_spans_keep_smaller_start(
            start in 0usize..50,
            shift in 1usize..4,
            len in 4usize..8,
            confidence in 0.0f64..1.0,
        ) {
            let first = span(start, start + len, EntityKind::Gene, confidence);
            let second = span(start + shift, start + shift + len, EntityKind::Gene, confidence);
            prop_assume!(first.overlaps(&second));

            let forward = resolve_overlaps(vec![first.clone(), second.clone()]);
            let backward = resolve_overlaps(vec![second, first]);

            prop_assert_eq!(forward.len(), 1);
            prop_assert_eq!(forward[0].start, start);
            prop_assert_eq!(forward, backward);
        }

        #[test]
        fn prop_result_never_overlaps(
            raw in proptest::collection::vec((0usize..40, 1usize..10, 0.0f64..1.0), 0..12)
        ) {
            let spans: Vec<EntitySpan> = raw
                .into_iter()
                .map(|(start, len, conf)| span(start, start + len, EntityKind::Gene, conf))
                .collect();
            let kept = resolve_overlaps(spans);
            for (i, a) in kept.iter().enumerate() {
                for b in kept.iter().skip(i + 1) {
                    prop_assert!(!a.overlaps(b));
                }
            }
        }
    }
}
