use serde::{Deserialize, Serialize};

/// Raw webhook callback from the transcription engine.
///
/// Only the identity block and the results block are required; every
/// intelligence feature inside `results` is optional, because the engine
/// returns only what the submission asked for.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CallbackPayload {
    pub metadata: CallbackMetadata,
    pub results: CallbackResults,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CallbackMetadata {
    /// The engine's own identifier for this transcription request
    pub request_id: String,
    /// Opaque token attached at submission time, echoed back verbatim.
    /// Absent on synchronous (non-callback) responses.
    #[serde(default)]
    pub extra: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CallbackResults {
    #[serde(default)]
    pub channels: Vec<CallbackChannel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<SummaryBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiments: Option<SentimentBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topics: Option<TopicBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intents: Option<IntentBlock>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CallbackChannel {
    #[serde(default)]
    pub alternatives: Vec<CallbackAlternative>,
}

/// One recognition alternative for a channel
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CallbackAlternative {
    #[serde(default)]
    pub transcript: String,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub words: Vec<CallbackWord>,
}

/// A single recognized word with optional diarization info
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CallbackWord {
    pub word: String,
    /// Start timestamp in seconds
    pub start: f64,
    /// End timestamp in seconds
    pub end: f64,
    #[serde(default)]
    pub confidence: f64,
    /// Numeric speaker identifier, present when diarization was requested
    #[serde(default)]
    pub speaker: Option<u32>,
    #[serde(default)]
    pub punctuated_word: Option<String>,
}

/// v2 summary block: `short` is only meaningful when the engine reports success
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SummaryBlock {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub short: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SentimentBlock {
    #[serde(default)]
    pub segments: Vec<SentimentSegment>,
    /// Engine-provided aggregate over the whole document
    #[serde(default)]
    pub average: Option<SentimentScore>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SentimentSegment {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub start_word: Option<usize>,
    #[serde(default)]
    pub end_word: Option<usize>,
    pub sentiment: String,
    pub sentiment_score: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SentimentScore {
    pub sentiment: String,
    pub sentiment_score: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TopicBlock {
    #[serde(default)]
    pub segments: Vec<TopicSegment>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TopicSegment {
    #[serde(default)]
    pub topics: Vec<TopicEntry>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TopicEntry {
    pub topic: String,
    #[serde(default)]
    pub confidence_score: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IntentBlock {
    #[serde(default)]
    pub segments: Vec<IntentSegment>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IntentSegment {
    #[serde(default)]
    pub intents: Vec<IntentEntry>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IntentEntry {
    pub intent: String,
    #[serde(default)]
    pub confidence_score: f64,
}

impl CallbackResults {
    /// The highest-confidence recognition alternative of the first channel
    pub fn best_alternative(&self) -> Option<&CallbackAlternative> {
        self.channels.first().and_then(|c| {
            c.alternatives.iter().max_by(|a, b| {
                a.confidence
                    .partial_cmp(&b.confidence)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_callback() {
        let json = r#"{
            "metadata": {
                "request_id": "req-123",
                "extra": "v1.abc"
            },
            "results": {
                "channels": [{
                    "alternatives": [{
                        "transcript": "hello world",
                        "confidence": 0.97,
                        "words": [
                            {"word": "hello", "start": 0.5, "end": 0.8, "confidence": 0.95, "speaker": 0},
                            {"word": "world", "start": 0.9, "end": 1.2, "confidence": 0.92, "speaker": 1}
                        ]
                    }]
                }],
                "summary": {"success": true, "short": "A greeting."},
                "sentiments": {
                    "segments": [
                        {"text": "hello world", "sentiment": "positive", "sentiment_score": 0.6}
                    ],
                    "average": {"sentiment": "positive", "sentiment_score": 0.6}
                },
                "topics": {
                    "segments": [{"topics": [{"topic": "greetings", "confidence_score": 0.9}]}]
                },
                "intents": {
                    "segments": [{"intents": [{"intent": "greet", "confidence_score": 0.8}]}]
                }
            }
        }"#;

        let payload: CallbackPayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.metadata.request_id, "req-123");
        assert_eq!(payload.metadata.extra.as_deref(), Some("v1.abc"));

        let alternative = payload.results.best_alternative().unwrap();
        assert_eq!(alternative.transcript, "hello world");
        assert_eq!(alternative.words.len(), 2);
        assert_eq!(alternative.words[0].speaker, Some(0));
    }

    #[test]
    fn test_parse_minimal_callback() {
        let json = r#"{
            "metadata": {"request_id": "req-456"},
            "results": {
                "channels": [{"alternatives": [{"transcript": "just text"}]}]
            }
        }"#;

        let payload: CallbackPayload = serde_json::from_str(json).unwrap();
        assert!(payload.metadata.extra.is_none());
        assert!(payload.results.summary.is_none());
        assert!(payload.results.sentiments.is_none());
        let alternative = payload.results.best_alternative().unwrap();
        assert!(alternative.words.is_empty());
    }

    #[test]
    fn test_best_alternative_picks_highest_confidence() {
        let json = r#"{
            "metadata": {"request_id": "req-789"},
            "results": {
                "channels": [{
                    "alternatives": [
                        {"transcript": "low", "confidence": 0.3},
                        {"transcript": "high", "confidence": 0.9},
                        {"transcript": "mid", "confidence": 0.5}
                    ]
                }]
            }
        }"#;

        let payload: CallbackPayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.results.best_alternative().unwrap().transcript, "high");
    }

    #[test]
    fn test_missing_results_block_is_an_error() {
        let json = r#"{"metadata": {"request_id": "req-000"}}"#;
        assert!(serde_json::from_str::<CallbackPayload>(json).is_err());
    }
}
