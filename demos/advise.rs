//! End-to-end advisory example
//!
//! Run with: cargo run --example advise
//! Optional: LONGEVITY_RAG_CONFIG pointing at a TOML config; with the default
//! config the mock generator is used and no network access is needed.
//! Set LONGEVITY_RAG_LOG=debug to see per-stage diagnostics.

use longevity_rag::{
    AdvisoryPipeline, EngineConfig, EvidenceFragment, IndividualProfile, ModelOutputs,
};
use serde_json::json;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn corpus() -> Vec<EvidenceFragment> {
    vec![
        EvidenceFragment::new(
            "pmid-1",
            "Higher diet quality scores were associated with lower coronary heart disease incidence.",
            2022,
        )
        .with_evidence_level("meta-analysis")
        .with_study_design("meta-analysis")
        .with_journal_impact(9.8)
        .with_disease_category("I25")
        .with_modifiable_trait("diet")
        .with_doi("10.1000/diet-chd")
        .with_pmid("1"),
        EvidenceFragment::new(
            "pmid-2",
            "APOE e4 carriers showed greater LDL reduction under a Mediterranean diet.",
            2020,
        )
        .with_study_design("randomized controlled trial")
        .with_evidence_level("randomized")
        .with_journal_impact(6.1)
        .with_disease_category("I25")
        .with_modifiable_trait("diet")
        .with_doi("10.1000/apoe-med"),
        EvidenceFragment::new(
            "pmid-3",
            "Short sleep duration predicted all-cause mortality in older adults.",
            2019,
        )
        .with_study_design("prospective cohort")
        .with_journal_impact(4.2)
        .with_modifiable_trait("sleep")
        .with_doi("10.1000/sleep"),
        EvidenceFragment::new(
            "pmid-4",
            "Smoking cessation after 60 still reduced cardiovascular events.",
            2016,
        )
        .with_study_design("prospective cohort")
        .with_journal_impact(3.0)
        .with_modifiable_trait("smoking")
        .with_doi("10.1000/smoking"),
    ]
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(
            EnvFilter::try_from_env("LONGEVITY_RAG_LOG")
                .unwrap_or_else(|_| EnvFilter::new("longevity_rag=info")),
        )
        .init();

    let config = EngineConfig::load()?;
    let pipeline = AdvisoryPipeline::from_config(&config, corpus())?;

    let profile = IndividualProfile::new(json!({
        "age": 58,
        "sex": "F",
        "smoker": false,
        "bmi": 27.4
    }));
    let outputs = ModelOutputs::from_value(&json!({
        "top_proteins": ["APOE", "IL6"],
        "diseases": ["I25"],
        "modifiable_traits": ["diet", "sleep"],
        "health_potential": 0.71,
        "disease_scores": {"I25": 0.42},
        "trait_scores": {"diet": 0.31, "sleep": 0.12}
    }));

    println!("Longevity RAG - Advisory Example\n");

    let advice = pipeline.advise(&profile, &outputs).await?;

    println!("Selected evidence:");
    for fragment in &advice.prompt.evidence {
        println!("  {} ({}, DOI={})", fragment.fragment_id, fragment.pub_year, fragment.doi);
    }
    println!(
        "\nDiagnostics: {}",
        serde_json::to_string_pretty(&advice.prompt.diagnostics)?
    );
    println!("\nAdvice:\n{}", advice.text);

    Ok(())
}
