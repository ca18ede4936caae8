use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::batch::FeatureFlags;
use crate::engine::EngineClient;
use crate::extract::extract;
use crate::wer::{WerConfig, WerError, WerReport, compute};

/// Result of auditing transcription accuracy against a reference transcript
#[derive(Debug, Clone, Serialize)]
pub struct AuditOutcome {
    /// The transcript the engine produced for the audited audio
    pub hypothesis_transcript: String,
    pub report: WerReport,
}

/// Compare a reference transcript against a hypothesis text
pub fn audit_text(
    reference: &str,
    hypothesis: &str,
    config: &WerConfig,
) -> Result<WerReport, WerError> {
    compute(reference, hypothesis, config)
}

/// Transcribe a remote audio URL and score it against the reference
pub async fn audit_url(
    client: &EngineClient,
    reference: &str,
    audio_url: &str,
    config: &WerConfig,
) -> Result<AuditOutcome> {
    let payload = client
        .transcribe_url(audio_url, &FeatureFlags::transcription_only())
        .await?;
    let hypothesis = extract(&payload.results).transcript;
    info!(
        "Transcribed audit hypothesis from {} ({} chars)",
        audio_url,
        hypothesis.len()
    );

    let report = compute(reference, &hypothesis, config)
        .with_context(|| format!("Failed to score transcript of {audio_url}"))?;
    Ok(AuditOutcome {
        hypothesis_transcript: hypothesis,
        report,
    })
}

/// Transcribe a local audio file and score it against the reference
pub async fn audit_file(
    client: &EngineClient,
    reference: &str,
    path: &Path,
    config: &WerConfig,
) -> Result<AuditOutcome> {
    let payload = client
        .transcribe_file(path, &FeatureFlags::transcription_only())
        .await?;
    let hypothesis = extract(&payload.results).transcript;
    info!(
        "Transcribed audit hypothesis from {:?} ({} chars)",
        path,
        hypothesis.len()
    );

    let report = compute(reference, &hypothesis, config)
        .with_context(|| format!("Failed to score transcript of {path:?}"))?;
    Ok(AuditOutcome {
        hypothesis_transcript: hypothesis,
        report,
    })
}
