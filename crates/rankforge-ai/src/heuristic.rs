//! Heuristic fallback scorer over stored item metrics.
//!
//! This is a deliberately simpler formula than the extractor's own feature
//! definitions: three bounded proxies over the stored metrics, weighted
//! 0.3 / 0.4 / 0.3. Keep the two scoring surfaces distinct — the extractor
//! defines what a feature *is*, this defines how a fallback *ranks* with
//! whatever metrics an item carries.

use rankforge_core::features::feature;
use rankforge_core::types::Metrics;

const CLARITY_WEIGHT: f32 = 0.3;
const IMPACT_WEIGHT: f32 = 0.4;
const KEYWORD_WEIGHT: f32 = 0.3;

/// Score an item's stored metrics in [0, 1]. Missing metrics read as 0.
pub fn heuristic_score(metrics: &Metrics) -> f32 {
    let clarity_proxy = (0.6 * metrics.get(feature::CLARITY)
        + 0.4 * metrics.get(feature::READABILITY))
    .clamp(0.0, 1.0);
    let impact_proxy = (0.7 * metrics.get(feature::IMPACT)
        + 0.3 * metrics.get(feature::COMPLETENESS))
    .clamp(0.0, 1.0);
    let keyword_proxy = (0.6 * metrics.get(feature::KEYWORD_DENSITY)
        + 0.4 * metrics.get(feature::RELEVANCE))
    .clamp(0.0, 1.0);

    CLARITY_WEIGHT * clarity_proxy + IMPACT_WEIGHT * impact_proxy + KEYWORD_WEIGHT * keyword_proxy
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(pairs: &[(&str, f32)]) -> Metrics {
        let mut m = Metrics::new();
        for (name, value) in pairs {
            m.set(name, *value).unwrap();
        }
        m
    }

    #[test]
    fn empty_metrics_score_zero() {
        assert_eq!(heuristic_score(&Metrics::new()), 0.0);
    }

    #[test]
    fn full_metrics_score_one() {
        let m = metrics(&[
            (feature::CLARITY, 1.0),
            (feature::IMPACT, 1.0),
            (feature::RELEVANCE, 1.0),
            (feature::READABILITY, 1.0),
            (feature::KEYWORD_DENSITY, 1.0),
            (feature::COMPLETENESS, 1.0),
        ]);
        assert!((heuristic_score(&m) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn stronger_metrics_score_higher() {
        let strong = metrics(&[
            (feature::CLARITY, 0.9),
            (feature::IMPACT, 0.85),
            (feature::RELEVANCE, 0.8),
            (feature::COMPLETENESS, 0.8),
        ]);
        let weak = metrics(&[
            (feature::CLARITY, 0.5),
            (feature::IMPACT, 0.4),
            (feature::RELEVANCE, 0.5),
            (feature::COMPLETENESS, 0.4),
        ]);
        assert!(heuristic_score(&strong) > heuristic_score(&weak));
    }

    #[test]
    fn score_stays_in_unit_range() {
        let m = metrics(&[(feature::IMPACT, 1.0), (feature::COMPLETENESS, 1.0)]);
        let score = heuristic_score(&m);
        assert!((0.0..=1.0).contains(&score));
    }
}
