//! Query construction from upstream causal-modeling output.
//!
//! The upstream model emits an untyped mapping. Every key is optional and a
//! missing key means "nothing to report", never an error.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Causal-modeling outputs for one individual.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelOutputs {
    /// Proteins ranked by causal contribution.
    pub top_proteins: Vec<String>,
    /// Disease codes or names on the causal pathways.
    pub diseases: Vec<String>,
    /// Modifiable traits (diet, exercise, ...).
    pub modifiable_traits: Vec<String>,
    /// Aggregate health-potential score.
    pub health_potential: Option<f64>,
    /// Disease-mediated scores.
    pub disease_scores: BTreeMap<String, f64>,
    /// Trait-mediated scores.
    pub trait_scores: BTreeMap<String, f64>,
}

impl ModelOutputs {
    /// Lenient conversion from an untyped JSON value.
    ///
    /// Missing or mistyped keys become empty collections. List entries may be
    /// strings or numbers (numeric disease codes are stringified); `null`
    /// entries are dropped. Non-numeric score values are skipped.
    pub fn from_value(value: &Value) -> Self {
        Self {
            top_proteins: string_list(value.get("top_proteins")),
            diseases: string_list(value.get("diseases")),
            modifiable_traits: string_list(value.get("modifiable_traits")),
            health_potential: value.get("health_potential").and_then(Value::as_f64),
            disease_scores: score_map(value.get("disease_scores")),
            trait_scores: score_map(value.get("trait_scores")),
        }
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        })
        .collect()
}

fn score_map(value: Option<&Value>) -> BTreeMap<String, f64> {
    let Some(Value::Object(entries)) = value else {
        return BTreeMap::new();
    };
    entries
        .iter()
        .filter_map(|(key, v)| v.as_f64().map(|score| (key.clone(), score)))
        .collect()
}

/// Derive lexical query terms from model outputs.
///
/// Concatenates proteins, diseases and modifiable traits in that order and
/// drops empty entries. Duplicates are kept: a term named twice weighs twice
/// in retrieval.
pub fn build_query_terms(outputs: &ModelOutputs) -> Vec<String> {
    outputs
        .top_proteins
        .iter()
        .chain(&outputs.diseases)
        .chain(&outputs.modifiable_traits)
        .filter(|t| !t.is_empty())
        .cloned()
        .collect()
}
