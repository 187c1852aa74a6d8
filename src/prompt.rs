//! Structured prompt assembly.
//!
//! The assembled document is consumed by a downstream generator and checked by
//! validators that look for its section markers, so the marker strings are
//! exported and their order is fixed:
//!
//! ```text
//! <system directive>
//! ## Individual Profile
//! ## Causal Modeling Outputs
//! ## Retrieved Evidence (ranked)
//! ## Inquiry Module
//! ## Output Format (three-stage constrained CoT)
//!    1) Evidence-summary  2) Causal-mapping  3) Recommendation-rationale
//! ```

use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt::Write;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::corpus::EvidenceFragment;
use crate::query::ModelOutputs;

/// Directive placed at the top of every prompt.
pub const SYSTEM_INSTRUCTION: &str = "You are a longevity-focused health advisory agent. \
Provide evidence-based, mechanism-aware guidance grounded in retrieved scientific literature. \
Adhere to medical safety: avoid unsupported claims; align with public health guidance.";

/// Section header for the individual's profile.
pub const PROFILE_HEADER: &str = "## Individual Profile";
/// Section header for the causal-modeling outputs.
pub const CAUSAL_OUTPUTS_HEADER: &str = "## Causal Modeling Outputs";
/// Section header for the ranked evidence block.
pub const EVIDENCE_HEADER: &str = "## Retrieved Evidence (ranked)";
/// Section header for follow-up questions.
pub const INQUIRY_HEADER: &str = "## Inquiry Module";
/// Section header for the output contract.
pub const OUTPUT_FORMAT_HEADER: &str = "## Output Format (three-stage constrained CoT)";
/// First reasoning stage.
pub const EVIDENCE_SUMMARY_STAGE: &str = "1) Evidence-summary";
/// Second reasoning stage.
pub const CAUSAL_MAPPING_STAGE: &str = "2) Causal-mapping";
/// Third reasoning stage.
pub const RECOMMENDATION_STAGE: &str = "3) Recommendation-rationale";
/// Inline citation instruction.
pub const CITATION_DIRECTIVE: &str =
    "Include citations inline as [DOI] or [PMID]. Avoid speculation; stay within medical guidance.";

/// Line rendered in place of an empty evidence block.
pub const NO_EVIDENCE_PLACEHOLDER: &str = "- No supporting evidence was retrieved.";

/// At most this many fragments are rendered into a prompt.
pub const MAX_PROMPT_FRAGMENTS: usize = 10;

/// Every section marker in the order it appears.
pub const SECTION_MARKERS: [&str; 8] = [
    PROFILE_HEADER,
    CAUSAL_OUTPUTS_HEADER,
    EVIDENCE_HEADER,
    INQUIRY_HEADER,
    OUTPUT_FORMAT_HEADER,
    EVIDENCE_SUMMARY_STAGE,
    CAUSAL_MAPPING_STAGE,
    RECOMMENDATION_STAGE,
];

/// Demographics and clinical context for one individual.
///
/// Opaque to the engine and rendered verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IndividualProfile(pub Value);

impl IndividualProfile {
    /// Wrap a JSON value.
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Text placed under the profile header: strings as-is, everything
    /// else as compact JSON.
    pub fn render(&self) -> String {
        match &self.0 {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

impl From<Value> for IndividualProfile {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Render the first [`MAX_PROMPT_FRAGMENTS`] fragments, one line each.
pub fn format_fragments<F: Borrow<EvidenceFragment>>(fragments: &[F]) -> String {
    fragments
        .iter()
        .take(MAX_PROMPT_FRAGMENTS)
        .map(|f| {
            let f = f.borrow();
            format!(
                "- {} [{}; {}; IF={:?}; {}; DOI={}]",
                f.text, f.pub_year, f.study_design, f.journal_impact, f.disease_category, f.doi
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn join_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}

fn render_scores(scores: &BTreeMap<String, f64>) -> String {
    if scores.is_empty() {
        return "none".to_string();
    }
    scores
        .iter()
        .map(|(name, score)| format!("{}={:?}", name, score))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Assemble the full generation prompt.
pub fn build_structured_prompt<F: Borrow<EvidenceFragment>>(
    profile: &IndividualProfile,
    outputs: &ModelOutputs,
    fragments: &[F],
) -> String {
    let evidence = if fragments.is_empty() {
        NO_EVIDENCE_PLACEHOLDER.to_string()
    } else {
        format_fragments(fragments)
    };
    let health_potential = outputs
        .health_potential
        .map(|h| format!("{h:?}"))
        .unwrap_or_else(|| "n/a".to_string());

    let mut prompt = String::new();
    // Writing to a String cannot fail.
    let _ = write!(
        prompt,
        "{SYSTEM_INSTRUCTION}\n\n\
         {PROFILE_HEADER}\n{profile}\n\n\
         {CAUSAL_OUTPUTS_HEADER}\n\
         Proteins: {proteins}\n\
         Disease pathways: {diseases}\n\
         Modifiable traits: {traits}\n\
         Health-potential score: {health_potential}\n\
         Disease-mediated scores: {disease_scores}\n\
         Trait-mediated scores: {trait_scores}\n\n\
         {EVIDENCE_HEADER}\n{evidence}\n\n\
         {INQUIRY_HEADER}\n\
         Ask concise questions to clarify modifiable traits, prioritizing: {focus}.\n\n\
         {OUTPUT_FORMAT_HEADER}\n\
         {EVIDENCE_SUMMARY_STAGE}: 3–5 lines synthesizing key findings with evidence levels/citations.\n\
         {CAUSAL_MAPPING_STAGE}: stepwise alignment of individual pathways (proteins → mediators → outcomes) with the evidence.\n\
         {RECOMMENDATION_STAGE}: specific, actionable guidance per disease/trait, each tied to cited evidence and causal path.\n\
         {CITATION_DIRECTIVE}\n",
        profile = profile.render(),
        proteins = join_or_none(&outputs.top_proteins),
        diseases = join_or_none(&outputs.diseases),
        traits = join_or_none(&outputs.modifiable_traits),
        disease_scores = render_scores(&outputs.disease_scores),
        trait_scores = render_scores(&outputs.trait_scores),
        focus = outputs.modifiable_traits.join(", "),
    );
    prompt
}
