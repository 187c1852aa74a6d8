//! Evidence weighting: recency, journal impact and study-design hierarchy.
//!
//! ```ascii
//! final = base × recency × impact × hierarchy
//!
//! recency   = 1 + 0.1 × max(1, current_year - pub_year)^-0.5
//! impact    = 1 + ln(1 + max(journal_impact, 0))
//! hierarchy = meta-analysis 1.3 | randomized 1.2 | prospective cohort 1.1 | 1.0
//! ```
//!
//! Age is floored at 1: a same-year (or future-dated) publication gets the
//! maximum recency bonus instead of an undefined `0^-0.5`.

use chrono::Datelike;
use serde::Serialize;

use crate::corpus::{CandidateScore, EvidenceFragment};

/// Default recency coefficient.
pub const RECENCY_COEFFICIENT: f64 = 0.1;

/// Study-design hierarchy multipliers, matched case-insensitively.
pub const HIERARCHY_WEIGHTS: &[(&str, f64)] = &[
    ("meta-analysis", 1.3),
    ("randomized", 1.2),
    ("prospective cohort", 1.1),
];

/// Current UTC calendar year.
pub fn current_year() -> i32 {
    chrono::Utc::now().year()
}

/// Recency multiplier for a publication year.
pub fn recency_modifier(pub_year: i32, current_year: i32, coefficient: f64) -> f64 {
    let age = current_year.saturating_sub(pub_year).max(1) as f64;
    1.0 + coefficient * age.powf(-0.5)
}

/// Impact multiplier; negative impact values count as zero.
pub fn impact_modifier(journal_impact: f64) -> f64 {
    1.0 + journal_impact.max(0.0).ln_1p()
}

/// Hierarchy multiplier for a single label, if the label is recognized.
pub fn hierarchy_modifier(label: &str) -> Option<f64> {
    let label = label.trim().to_lowercase();
    HIERARCHY_WEIGHTS
        .iter()
        .find(|(name, _)| *name == label)
        .map(|(_, weight)| *weight)
}

/// Hierarchy multiplier for a fragment: its evidence level first, then its
/// study design, then 1.0.
pub fn fragment_hierarchy(fragment: &EvidenceFragment) -> f64 {
    hierarchy_modifier(&fragment.evidence_level)
        .or_else(|| hierarchy_modifier(&fragment.study_design))
        .unwrap_or(1.0)
}

/// The three multipliers applied to one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeightBreakdown {
    pub recency: f64,
    pub impact: f64,
    pub hierarchy: f64,
}

impl WeightBreakdown {
    /// Product of all multipliers.
    pub fn factor(&self) -> f64 {
        self.recency * self.impact * self.hierarchy
    }
}

/// A candidate after evidence weighting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedCandidate<'a> {
    pub fragment: &'a EvidenceFragment,
    /// Corpus position.
    pub position: usize,
    /// Score coming out of reranking.
    pub base_score: f64,
    /// `base_score × breakdown.factor()`.
    pub score: f64,
    pub breakdown: WeightBreakdown,
}

/// Applies recency, impact and hierarchy multipliers.
#[derive(Debug, Clone, Copy)]
pub struct EvidenceWeighter {
    recency_coefficient: f64,
}

impl Default for EvidenceWeighter {
    fn default() -> Self {
        Self {
            recency_coefficient: RECENCY_COEFFICIENT,
        }
    }
}

impl EvidenceWeighter {
    /// Weighter with the default coefficients.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the recency coefficient.
    pub fn with_recency_coefficient(mut self, coefficient: f64) -> Self {
        self.recency_coefficient = coefficient;
        self
    }

    /// Compute the multipliers for one fragment.
    pub fn breakdown(&self, fragment: &EvidenceFragment, current_year: i32) -> WeightBreakdown {
        WeightBreakdown {
            recency: recency_modifier(fragment.pub_year, current_year, self.recency_coefficient),
            impact: impact_modifier(fragment.journal_impact),
            hierarchy: fragment_hierarchy(fragment),
        }
    }

    /// Weight every candidate and sort by descending final score.
    ///
    /// The sort is stable: equal final scores keep their input order.
    pub fn weight<'a>(
        &self,
        reranked: Vec<CandidateScore<'a>>,
        current_year: i32,
    ) -> Vec<WeightedCandidate<'a>> {
        let mut weighted: Vec<WeightedCandidate<'a>> = reranked
            .into_iter()
            .map(|c| {
                let breakdown = self.breakdown(c.fragment, current_year);
                WeightedCandidate {
                    fragment: c.fragment,
                    position: c.position,
                    base_score: c.score,
                    score: c.score * breakdown.factor(),
                    breakdown,
                }
            })
            .collect();

        weighted.sort_by(|a, b| b.score.total_cmp(&a.score));
        weighted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recency_same_year_is_finite() {
        let r = recency_modifier(2025, 2025, RECENCY_COEFFICIENT);
        assert!(r.is_finite() && r > 0.0);
        assert!((r - 1.1).abs() < 1e-12);
    }

    #[test]
    fn test_recency_future_year_floored() {
        assert!((recency_modifier(2030, 2025, RECENCY_COEFFICIENT) - 1.1).abs() < 1e-12);
    }

    #[test]
    fn test_recency_decays_with_age() {
        let r = recency_modifier(2021, 2025, RECENCY_COEFFICIENT);
        assert!((r - 1.05).abs() < 1e-12);
        assert!(recency_modifier(2000, 2025, RECENCY_COEFFICIENT) < r);
    }

    #[test]
    fn test_impact_modifier() {
        assert_eq!(impact_modifier(0.0), 1.0);
        assert_eq!(impact_modifier(-5.0), 1.0);
        assert!((impact_modifier(std::f64::consts::E - 1.0) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_hierarchy_lookup_case_insensitive() {
        assert_eq!(hierarchy_modifier("Meta-Analysis"), Some(1.3));
        assert_eq!(hierarchy_modifier(" RANDOMIZED "), Some(1.2));
        assert_eq!(hierarchy_modifier("Prospective Cohort"), Some(1.1));
        assert_eq!(hierarchy_modifier("case report"), None);
    }

    #[test]
    fn test_fragment_hierarchy_prefers_evidence_level() {
        let fragment = EvidenceFragment::new("f1", "t", 2020)
            .with_evidence_level("meta-analysis")
            .with_study_design("randomized");
        assert_eq!(fragment_hierarchy(&fragment), 1.3);

        let fragment = EvidenceFragment::new("f2", "t", 2020)
            .with_evidence_level("level II")
            .with_study_design("Randomized");
        assert_eq!(fragment_hierarchy(&fragment), 1.2);

        let fragment = EvidenceFragment::new("f3", "t", 2020).with_study_design("cross-sectional");
        assert_eq!(fragment_hierarchy(&fragment), 1.0);
    }

    #[test]
    fn test_weight_reorders_by_quality() {
        let weak = EvidenceFragment::new("weak", "t", 2000);
        let strong = EvidenceFragment::new("strong", "t", 2024)
            .with_evidence_level("meta-analysis")
            .with_journal_impact(20.0);
        let candidates = vec![
            CandidateScore::new(&weak, 0, 2.0),
            CandidateScore::new(&strong, 1, 1.5),
        ];

        let weighted = EvidenceWeighter::new().weight(candidates, 2025);
        assert_eq!(weighted[0].fragment.fragment_id, "strong");
        assert_eq!(weighted[0].base_score, 1.5);
        let expected = 1.5 * weighted[0].breakdown.factor();
        assert!((weighted[0].score - expected).abs() < 1e-12);
    }

    #[test]
    fn test_weight_is_stable_on_ties() {
        let fragments: Vec<EvidenceFragment> = (0..5)
            .map(|i| EvidenceFragment::new(format!("f{}", i), "t", 2020))
            .collect();
        let candidates = fragments
            .iter()
            .enumerate()
            .map(|(i, f)| CandidateScore::new(f, i, 1.0))
            .collect();

        let weighted = EvidenceWeighter::new().weight(candidates, 2025);
        let order: Vec<usize> = weighted.iter().map(|w| w.position).collect();
        assert_eq!(order, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_weight_empty() {
        assert!(EvidenceWeighter::new().weight(vec![], 2025).is_empty());
    }

    #[test]
    fn test_current_year_is_plausible() {
        assert!(current_year() >= 2024);
    }
}
