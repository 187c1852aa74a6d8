//! Evidence fragment and per-query candidate types.

use serde::{Deserialize, Serialize};

/// An atomic unit of evidence text plus bibliographic and quality metadata.
///
/// Fragments are loaded once at startup and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceFragment {
    /// Identifier, unique within the corpus.
    pub fragment_id: String,
    /// Evidence text body.
    pub text: String,
    /// Digital Object Identifier.
    #[serde(default)]
    pub doi: String,
    /// PubMed identifier.
    #[serde(default)]
    pub pmid: String,
    /// Publication year.
    pub pub_year: i32,
    /// Study design label, e.g. "randomized controlled trial".
    #[serde(default)]
    pub study_design: String,
    /// Evidence hierarchy label, e.g. "meta-analysis".
    #[serde(default)]
    pub evidence_level: String,
    /// Journal impact factor. Expected non-negative.
    #[serde(default)]
    pub journal_impact: f64,
    /// Disease category the fragment bears on.
    #[serde(default)]
    pub disease_category: String,
    /// Modifiable trait the fragment bears on.
    #[serde(default)]
    pub modifiable_trait: String,
}

impl EvidenceFragment {
    /// Create a fragment with only an identifier, text and publication year.
    ///
    /// Remaining metadata starts empty and is filled with the `with_*` builders.
    pub fn new(fragment_id: impl Into<String>, text: impl Into<String>, pub_year: i32) -> Self {
        Self {
            fragment_id: fragment_id.into(),
            text: text.into(),
            doi: String::new(),
            pmid: String::new(),
            pub_year,
            study_design: String::new(),
            evidence_level: String::new(),
            journal_impact: 0.0,
            disease_category: String::new(),
            modifiable_trait: String::new(),
        }
    }

    /// Set the DOI.
    pub fn with_doi(mut self, doi: impl Into<String>) -> Self {
        self.doi = doi.into();
        self
    }

    /// Set the PMID.
    pub fn with_pmid(mut self, pmid: impl Into<String>) -> Self {
        self.pmid = pmid.into();
        self
    }

    /// Set the study design label.
    pub fn with_study_design(mut self, design: impl Into<String>) -> Self {
        self.study_design = design.into();
        self
    }

    /// Set the evidence hierarchy label.
    pub fn with_evidence_level(mut self, level: impl Into<String>) -> Self {
        self.evidence_level = level.into();
        self
    }

    /// Set the journal impact factor.
    pub fn with_journal_impact(mut self, impact: f64) -> Self {
        self.journal_impact = impact;
        self
    }

    /// Set the disease category.
    pub fn with_disease_category(mut self, category: impl Into<String>) -> Self {
        self.disease_category = category.into();
        self
    }

    /// Set the modifiable trait.
    pub fn with_modifiable_trait(mut self, trait_name: impl Into<String>) -> Self {
        self.modifiable_trait = trait_name.into();
        self
    }
}

/// A fragment paired with a score for one query.
///
/// `position` is the fragment's index in corpus order and serves as the
/// deterministic tie-break wherever candidates are ranked.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateScore<'a> {
    /// The scored fragment.
    pub fragment: &'a EvidenceFragment,
    /// Position of the fragment in the corpus.
    pub position: usize,
    /// Relevance score under the active ranking stage.
    pub score: f64,
}

impl<'a> CandidateScore<'a> {
    /// Pair a fragment with its corpus position and score.
    pub fn new(fragment: &'a EvidenceFragment, position: usize, score: f64) -> Self {
        Self {
            fragment,
            position,
            score,
        }
    }

    /// Same candidate with a different score.
    pub fn with_score(self, score: f64) -> Self {
        Self { score, ..self }
    }
}
