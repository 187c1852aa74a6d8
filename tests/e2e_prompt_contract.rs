//! E2E tests for the assembled prompt layout
//!
//! Downstream validators look for fixed section markers in a fixed order;
//! these tests pin that contract through the public API.
//!
//! Run with: cargo test --test e2e_prompt_contract

use longevity_rag::prompt::{
    CITATION_DIRECTIVE, EVIDENCE_HEADER, INQUIRY_HEADER, MAX_PROMPT_FRAGMENTS, SYSTEM_INSTRUCTION,
};
use longevity_rag::{
    build_query_terms, build_structured_prompt, format_fragments, EvidenceFragment,
    IndividualProfile, ModelOutputs,
};
use serde_json::json;

fn fragments(n: usize) -> Vec<EvidenceFragment> {
    (0..n)
        .map(|i| {
            EvidenceFragment::new(format!("f{i}"), format!("Evidence line {i}."), 2015)
                .with_study_design("RCT")
                .with_journal_impact(3.0)
                .with_disease_category("E11")
                .with_doi(format!("10.5/{i}"))
        })
        .collect()
}

fn position(haystack: &str, needle: &str) -> usize {
    haystack
        .find(needle)
        .unwrap_or_else(|| panic!("missing {needle:?}"))
}

#[test]
fn test_markers_appear_in_order() {
    let outputs = ModelOutputs::from_value(&json!({
        "top_proteins": ["GDF15"],
        "diseases": ["E11"],
        "modifiable_traits": ["exercise"]
    }));
    let prompt = build_structured_prompt(
        &IndividualProfile::new(json!({"age": 70})),
        &outputs,
        &fragments(3),
    );

    let ordered = [
        "Individual Profile",
        "Causal Modeling Outputs",
        "Retrieved Evidence",
        "Inquiry Module",
        "Evidence-summary",
        "Causal-mapping",
        "Recommendation-rationale",
    ];
    let positions: Vec<_> = ordered.iter().map(|m| position(&prompt, m)).collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]), "{positions:?}");
    assert!(prompt.starts_with(SYSTEM_INSTRUCTION));
    assert!(prompt.trim_end().ends_with(CITATION_DIRECTIVE));
}

#[test]
fn test_evidence_block_capped() {
    let prompt = build_structured_prompt(
        &IndividualProfile::default(),
        &ModelOutputs::default(),
        &fragments(15),
    );
    let start = position(&prompt, EVIDENCE_HEADER) + EVIDENCE_HEADER.len();
    let end = position(&prompt, INQUIRY_HEADER);
    let block = prompt[start..end].trim();

    assert_eq!(block.lines().count(), MAX_PROMPT_FRAGMENTS);
    assert_eq!(block, format_fragments(&fragments(15)));
}

#[test]
fn test_fragment_metadata_rendered() {
    let rendered = format_fragments(&fragments(1));
    assert_eq!(rendered, "- Evidence line 0. [2015; RCT; IF=3.0; E11; DOI=10.5/0]");
}

#[test]
fn test_query_terms_without_diseases() {
    let outputs = ModelOutputs::from_value(&json!({
        "top_proteins": ["A", "B"],
        "modifiable_traits": ["diet"]
    }));
    assert_eq!(build_query_terms(&outputs), vec!["A", "B", "diet"]);
}

#[test]
fn test_inquiry_lists_traits() {
    let outputs = ModelOutputs::from_value(&json!({
        "modifiable_traits": ["sleep", "alcohol"]
    }));
    let prompt = build_structured_prompt(&IndividualProfile::default(), &outputs, &fragments(0));
    assert!(prompt.contains("prioritizing: sleep, alcohol."));
}
