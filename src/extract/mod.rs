use std::collections::HashMap;

use tracing::debug;

use crate::models::{CallbackResults, SentimentSegment, SpeakerSegment};

/// Everything the extractor can normalize out of one engine result document.
///
/// Absent features come out empty, never as errors: a payload with no
/// sentiment block still yields its transcript.
#[derive(Debug, Clone, Default)]
pub struct AudioIntelligence {
    pub transcript: String,
    pub confidence: f64,
    pub summary: Option<String>,
    pub sentiment: Option<String>,
    pub sentiment_score: Option<f64>,
    /// `[min, max]` of segment sentiment scores
    pub extreme_sentiment_scores: Vec<f64>,
    pub topics: Vec<String>,
    pub intents: Vec<String>,
    pub segments: Vec<SpeakerSegment>,
}

/// Extract normalized audio intelligence from a raw engine result document.
///
/// Field-by-field permissive: each feature degrades to empty/None when its
/// block is missing, so partial intelligence never discards the transcript.
pub fn extract(results: &CallbackResults) -> AudioIntelligence {
    let (transcript, confidence, segments) = match results.best_alternative() {
        Some(alternative) => (
            alternative.transcript.clone(),
            alternative.confidence,
            diarize_words(alternative),
        ),
        None => {
            debug!("result document has no recognition alternative");
            (String::new(), 0.0, vec![])
        }
    };

    let summary = results
        .summary
        .as_ref()
        .filter(|s| s.success)
        .and_then(|s| s.short.clone())
        .filter(|s| !s.is_empty());

    let (sentiment, sentiment_score, extreme_sentiment_scores) = match &results.sentiments {
        Some(block) => {
            let extremes = extreme_scores(&block.segments);
            match &block.average {
                Some(average) => (
                    Some(average.sentiment.clone()),
                    Some(average.sentiment_score),
                    extremes,
                ),
                None => {
                    let (label, score) = aggregate_segments(&block.segments);
                    (label, score, extremes)
                }
            }
        }
        None => (None, None, vec![]),
    };

    let topics = results
        .topics
        .as_ref()
        .map(|block| {
            block
                .segments
                .iter()
                .flat_map(|s| s.topics.iter().map(|t| t.topic.clone()))
                .collect()
        })
        .unwrap_or_default();

    let intents = results
        .intents
        .as_ref()
        .map(|block| {
            block
                .segments
                .iter()
                .flat_map(|s| s.intents.iter().map(|i| i.intent.clone()))
                .collect()
        })
        .unwrap_or_default();

    AudioIntelligence {
        transcript,
        confidence,
        summary,
        sentiment,
        sentiment_score,
        extreme_sentiment_scores,
        topics,
        intents,
        segments,
    }
}

/// Group consecutive words by speaker into ordered segments
fn diarize_words(alternative: &crate::models::CallbackAlternative) -> Vec<SpeakerSegment> {
    let mut segments: Vec<SpeakerSegment> = Vec::new();

    for word in &alternative.words {
        let speaker = word.speaker.unwrap_or(0);
        match segments.last_mut() {
            Some(segment) if segment.speaker == speaker => {
                segment.end = word.end;
                segment.text.push(' ');
                segment.text.push_str(&word.word);
            }
            _ => segments.push(SpeakerSegment {
                speaker,
                start: word.start,
                end: word.end,
                text: word.word.clone(),
            }),
        }
    }

    segments.sort_by(|a, b| {
        a.start
            .partial_cmp(&b.start)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    segments
}

/// Majority sentiment label across segments, ties broken toward "neutral";
/// score is the mean of segment scores
fn aggregate_segments(segments: &[SentimentSegment]) -> (Option<String>, Option<f64>) {
    if segments.is_empty() {
        return (None, None);
    }

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for segment in segments {
        *counts.entry(segment.sentiment.as_str()).or_default() += 1;
    }
    let top_count = counts.values().copied().max().unwrap_or(0);
    let mut leaders: Vec<&str> = counts
        .iter()
        .filter(|&(_, &count)| count == top_count)
        .map(|(&label, _)| label)
        .collect();
    leaders.sort_unstable();

    let label = if leaders.len() == 1 {
        leaders[0].to_string()
    } else {
        "neutral".to_string()
    };

    let mean = segments.iter().map(|s| s.sentiment_score).sum::<f64>() / segments.len() as f64;

    (Some(label), Some(mean))
}

/// `[min, max]` of segment sentiment scores, empty when there are no segments
fn extreme_scores(segments: &[SentimentSegment]) -> Vec<f64> {
    if segments.is_empty() {
        return vec![];
    }
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for segment in segments {
        min = min.min(segment.sentiment_score);
        max = max.max(segment.sentiment_score);
    }
    vec![min, max]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CallbackPayload;

    fn results_from(json: &str) -> CallbackResults {
        let payload: CallbackPayload = serde_json::from_str(json).unwrap();
        payload.results
    }

    fn full_payload() -> CallbackResults {
        results_from(
            r#"{
            "metadata": {"request_id": "req-1", "extra": "v1.x"},
            "results": {
                "channels": [{
                    "alternatives": [{
                        "transcript": "hello world how are you",
                        "confidence": 0.97,
                        "words": [
                            {"word": "hello", "start": 0.5, "end": 0.8, "speaker": 0},
                            {"word": "world", "start": 0.9, "end": 1.2, "speaker": 0},
                            {"word": "how", "start": 1.5, "end": 1.7, "speaker": 1},
                            {"word": "are", "start": 1.8, "end": 2.0, "speaker": 1},
                            {"word": "you", "start": 2.1, "end": 2.3, "speaker": 1}
                        ]
                    }]
                }],
                "summary": {"success": true, "short": "A greeting."},
                "sentiments": {
                    "segments": [
                        {"sentiment": "positive", "sentiment_score": 0.6},
                        {"sentiment": "neutral", "sentiment_score": 0.1},
                        {"sentiment": "positive", "sentiment_score": 0.8}
                    ]
                },
                "topics": {
                    "segments": [
                        {"topics": [{"topic": "greetings", "confidence_score": 0.9}]},
                        {"topics": [{"topic": "wellbeing", "confidence_score": 0.7}]}
                    ]
                },
                "intents": {
                    "segments": [{"intents": [{"intent": "greet", "confidence_score": 0.8}]}]
                }
            }
        }"#,
        )
    }

    #[test]
    fn test_extract_full_document() {
        let intelligence = extract(&full_payload());

        assert_eq!(intelligence.transcript, "hello world how are you");
        assert_eq!(intelligence.confidence, 0.97);
        assert_eq!(intelligence.summary.as_deref(), Some("A greeting."));
        assert_eq!(intelligence.topics, vec!["greetings", "wellbeing"]);
        assert_eq!(intelligence.intents, vec!["greet"]);

        // No engine aggregate: majority label and mean score
        assert_eq!(intelligence.sentiment.as_deref(), Some("positive"));
        let score = intelligence.sentiment_score.unwrap();
        assert!((score - 0.5).abs() < 1e-9);
        assert_eq!(intelligence.extreme_sentiment_scores, vec![0.1, 0.8]);

        // Two speakers, consecutive grouping, ordered by start
        assert_eq!(intelligence.segments.len(), 2);
        assert_eq!(intelligence.segments[0].speaker, 0);
        assert_eq!(intelligence.segments[0].text, "hello world");
        assert_eq!(intelligence.segments[1].speaker, 1);
        assert_eq!(intelligence.segments[1].text, "how are you");
        assert_eq!(intelligence.segments[1].start, 1.5);
        assert_eq!(intelligence.segments[1].end, 2.3);
    }

    #[test]
    fn test_engine_aggregate_wins_over_majority() {
        let results = results_from(
            r#"{
            "metadata": {"request_id": "req-2"},
            "results": {
                "channels": [{"alternatives": [{"transcript": "t"}]}],
                "sentiments": {
                    "segments": [
                        {"sentiment": "negative", "sentiment_score": -0.5},
                        {"sentiment": "negative", "sentiment_score": -0.4}
                    ],
                    "average": {"sentiment": "neutral", "sentiment_score": -0.1}
                }
            }
        }"#,
        );
        let intelligence = extract(&results);
        assert_eq!(intelligence.sentiment.as_deref(), Some("neutral"));
        assert_eq!(intelligence.sentiment_score, Some(-0.1));
        assert_eq!(intelligence.extreme_sentiment_scores, vec![-0.5, -0.4]);
    }

    #[test]
    fn test_majority_tie_breaks_to_neutral() {
        let results = results_from(
            r#"{
            "metadata": {"request_id": "req-3"},
            "results": {
                "channels": [{"alternatives": [{"transcript": "t"}]}],
                "sentiments": {
                    "segments": [
                        {"sentiment": "positive", "sentiment_score": 0.5},
                        {"sentiment": "negative", "sentiment_score": -0.5}
                    ]
                }
            }
        }"#,
        );
        let intelligence = extract(&results);
        assert_eq!(intelligence.sentiment.as_deref(), Some("neutral"));
        assert_eq!(intelligence.sentiment_score, Some(0.0));
    }

    #[test]
    fn test_missing_diarization_yields_empty_segments() {
        let results = results_from(
            r#"{
            "metadata": {"request_id": "req-4"},
            "results": {
                "channels": [{
                    "alternatives": [{"transcript": "still here", "confidence": 0.9}]
                }],
                "summary": {"success": true, "short": "Short."}
            }
        }"#,
        );
        let intelligence = extract(&results);
        assert!(intelligence.segments.is_empty());
        assert_eq!(intelligence.transcript, "still here");
        assert_eq!(intelligence.summary.as_deref(), Some("Short."));
    }

    #[test]
    fn test_unsuccessful_summary_is_dropped() {
        let results = results_from(
            r#"{
            "metadata": {"request_id": "req-5"},
            "results": {
                "channels": [{"alternatives": [{"transcript": "t"}]}],
                "summary": {"success": false, "short": "Do not trust this."}
            }
        }"#,
        );
        assert!(extract(&results).summary.is_none());
    }

    #[test]
    fn test_words_without_speakers_form_one_segment() {
        let results = results_from(
            r#"{
            "metadata": {"request_id": "req-6"},
            "results": {
                "channels": [{
                    "alternatives": [{
                        "transcript": "a b",
                        "words": [
                            {"word": "a", "start": 0.0, "end": 0.2},
                            {"word": "b", "start": 0.3, "end": 0.5}
                        ]
                    }]
                }]
            }
        }"#,
        );
        let intelligence = extract(&results);
        assert_eq!(intelligence.segments.len(), 1);
        assert_eq!(intelligence.segments[0].speaker, 0);
        assert_eq!(intelligence.segments[0].text, "a b");
    }

    #[test]
    fn test_empty_results_degrade_to_empty_intelligence() {
        let results = results_from(
            r#"{"metadata": {"request_id": "req-7"}, "results": {}}"#,
        );
        let intelligence = extract(&results);
        assert!(intelligence.transcript.is_empty());
        assert!(intelligence.summary.is_none());
        assert!(intelligence.sentiment.is_none());
        assert!(intelligence.topics.is_empty());
        assert!(intelligence.intents.is_empty());
        assert!(intelligence.segments.is_empty());
    }
}
