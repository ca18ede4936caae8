use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::extract::AudioIntelligence;
use crate::metadata::BatchItemContext;

/// Normalized transcription result: the record persisted per batch item and
/// forwarded to the notification target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionRecord {
    pub batch_id: String,
    pub batch_index: usize,
    pub audio_url: String,
    /// The engine's own identifier for the transcription request
    pub request_id: String,
    pub transcript: String,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment_score: Option<f64>,
    /// `[min, max]` of segment sentiment scores; empty without segments
    #[serde(default)]
    pub extreme_sentiment_scores: Vec<f64>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub intents: Vec<String>,
    /// Diarized segments ordered by start time
    #[serde(default)]
    pub segments: Vec<SpeakerSegment>,
    pub submitted_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    /// Where this record was persisted
    pub output_location: String,
    /// Raw engine results, carried only when the correlator is configured to
    /// pass them through
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_results: Option<serde_json::Value>,
}

/// A contiguous span of speech attributed to one speaker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeakerSegment {
    pub speaker: u32,
    /// Start timestamp in seconds
    pub start: f64,
    /// End timestamp in seconds
    pub end: f64,
    pub text: String,
}

impl TranscriptionRecord {
    /// Combine decoded submission context with extracted intelligence
    pub fn assemble(
        context: &BatchItemContext,
        request_id: &str,
        intelligence: AudioIntelligence,
        completed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            batch_id: context.batch_id.clone(),
            batch_index: context.batch_index,
            audio_url: context.audio_url.clone(),
            request_id: request_id.to_string(),
            transcript: intelligence.transcript,
            confidence: intelligence.confidence,
            summary: intelligence.summary,
            sentiment: intelligence.sentiment,
            sentiment_score: intelligence.sentiment_score,
            extreme_sentiment_scores: intelligence.extreme_sentiment_scores,
            topics: intelligence.topics,
            intents: intelligence.intents,
            segments: intelligence.segments,
            submitted_at: context.submitted_at,
            completed_at,
            output_location: context.output_location(),
            raw_results: None,
        }
    }
}

/// Wire body of the best-effort completion notification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub audio_url: String,
    pub batch_id: String,
    pub batch_index: usize,
    pub request_id: String,
    pub output_file_location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment_score: Option<f64>,
    #[serde(default)]
    pub extreme_sentiment_scores: Vec<f64>,
    #[serde(default)]
    pub intents: Vec<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    pub submitted_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl NotificationPayload {
    pub fn from_record(record: &TranscriptionRecord) -> Self {
        Self {
            audio_url: record.audio_url.clone(),
            batch_id: record.batch_id.clone(),
            batch_index: record.batch_index,
            request_id: record.request_id.clone(),
            output_file_location: record.output_location.clone(),
            summary: record.summary.clone(),
            sentiment: record.sentiment.clone(),
            sentiment_score: record.sentiment_score,
            extreme_sentiment_scores: record.extreme_sentiment_scores.clone(),
            intents: record.intents.clone(),
            topics: record.topics.clone(),
            submitted_at: record.submitted_at,
            completed_at: record.completed_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::DEFAULT_LOCATION_TEMPLATE;

    fn sample_context() -> BatchItemContext {
        BatchItemContext {
            batch_id: "batch-1".to_string(),
            batch_index: 0,
            audio_url: "https://example.com/a.wav".to_string(),
            submitted_at: "2026-08-06T12:00:00Z".parse().unwrap(),
            notification_target: None,
            output_location_template: DEFAULT_LOCATION_TEMPLATE.to_string(),
        }
    }

    #[test]
    fn test_assemble_carries_identity_and_location() {
        let intelligence = AudioIntelligence {
            transcript: "hello".to_string(),
            confidence: 0.9,
            ..AudioIntelligence::default()
        };
        let completed_at = "2026-08-06T12:05:00Z".parse().unwrap();
        let record =
            TranscriptionRecord::assemble(&sample_context(), "req-1", intelligence, completed_at);

        assert_eq!(record.batch_id, "batch-1");
        assert_eq!(record.batch_index, 0);
        assert_eq!(record.request_id, "req-1");
        assert_eq!(record.transcript, "hello");
        assert_eq!(record.output_location, "batch-1/batch-1_url_0.json");
        assert!(record.raw_results.is_none());
    }

    #[test]
    fn test_notification_payload_mirrors_record() {
        let intelligence = AudioIntelligence {
            transcript: "hello".to_string(),
            confidence: 0.9,
            summary: Some("greeting".to_string()),
            topics: vec!["smalltalk".to_string()],
            ..AudioIntelligence::default()
        };
        let completed_at = "2026-08-06T12:05:00Z".parse().unwrap();
        let record =
            TranscriptionRecord::assemble(&sample_context(), "req-1", intelligence, completed_at);
        let body = NotificationPayload::from_record(&record);

        assert_eq!(body.batch_id, record.batch_id);
        assert_eq!(body.output_file_location, record.output_location);
        assert_eq!(body.summary.as_deref(), Some("greeting"));
        assert_eq!(body.topics, vec!["smalltalk".to_string()]);

        // Field names are the notification wire contract
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("output_file_location").is_some());
        assert!(json.get("extreme_sentiment_scores").is_some());
    }
}
