use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::metadata::{
    BatchItemContext, DEFAULT_LOCATION_TEMPLATE, EncodeError, encode_context,
};

/// Models of the nova-3 family take keyterms; everything else takes keyword boosts
pub const NOVA_3_MODELS: &[&str] = &["nova-3", "nova-3-general", "nova-3-medical"];

/// A vocabulary term with its recognition boost weight
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordBoost {
    pub term: String,
    pub boost: i32,
}

impl KeywordBoost {
    /// Engine wire form, `term:boost`
    pub fn as_param(&self) -> String {
        format!("{}:{}", self.term, self.boost)
    }
}

impl std::str::FromStr for KeywordBoost {
    type Err = String;

    /// Parse `term` or `term:boost` (boost defaults to 1)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.rsplit_once(':') {
            Some((term, boost)) => {
                let boost: i32 = boost
                    .parse()
                    .map_err(|_| format!("invalid boost in {s:?}"))?;
                if term.is_empty() {
                    return Err(format!("empty term in {s:?}"));
                }
                Ok(Self {
                    term: term.to_string(),
                    boost,
                })
            }
            None if s.is_empty() => Err("empty keyword".to_string()),
            None => Ok(Self {
                term: s.to_string(),
                boost: 1,
            }),
        }
    }
}

/// Engine options and feature toggles for one submission
#[derive(Debug, Clone)]
pub struct FeatureFlags {
    pub model: String,
    pub language: String,
    pub smart_format: bool,
    pub punctuate: bool,
    /// Summary version tag (e.g. "v2"); `None` disables summarization
    pub summarize: Option<String>,
    pub sentiment: bool,
    pub topics: bool,
    pub intents: bool,
    pub diarize: bool,
    pub keywords: Vec<KeywordBoost>,
    pub keyterms: Vec<String>,
    pub search_terms: Vec<String>,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            model: "nova-3".to_string(),
            language: "en-US".to_string(),
            smart_format: true,
            punctuate: true,
            summarize: Some("v2".to_string()),
            sentiment: true,
            topics: true,
            intents: true,
            diarize: true,
            keywords: vec![],
            keyterms: vec![],
            search_terms: vec![],
        }
    }
}

impl FeatureFlags {
    /// A bare transcription pass: no intelligence features, no diarization.
    /// Used by the audit paths, which only need a hypothesis transcript.
    pub fn transcription_only() -> Self {
        Self {
            summarize: None,
            sentiment: false,
            topics: false,
            intents: false,
            diarize: false,
            ..Self::default()
        }
    }

    /// Flatten into engine query parameters
    pub fn query_params(&self) -> Vec<(String, String)> {
        let mut params = vec![
            ("model".to_string(), self.model.clone()),
            ("language".to_string(), self.language.clone()),
            ("smart_format".to_string(), self.smart_format.to_string()),
            ("punctuate".to_string(), self.punctuate.to_string()),
        ];
        if let Some(version) = &self.summarize {
            params.push(("summarize".to_string(), version.clone()));
        }
        if self.sentiment {
            params.push(("sentiment".to_string(), "true".to_string()));
        }
        if self.topics {
            params.push(("topics".to_string(), "true".to_string()));
        }
        if self.intents {
            params.push(("intents".to_string(), "true".to_string()));
        }
        if self.diarize {
            params.push(("diarize".to_string(), "true".to_string()));
        }
        for keyterm in &self.keyterms {
            params.push(("keyterm".to_string(), keyterm.clone()));
        }
        for keyword in &self.keywords {
            params.push(("keywords".to_string(), keyword.as_param()));
        }
        for term in &self.search_terms {
            params.push(("search".to_string(), term.clone()));
        }
        params
    }
}

/// One fully-formed request destined for the transcription engine
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub audio_url: String,
    /// Where the engine should POST its callback
    pub callback_url: String,
    /// Opaque context token the engine echoes back in the callback
    pub metadata_token: String,
    pub features: FeatureFlags,
}

impl OutboundRequest {
    /// Full engine query string: feature params plus callback and metadata
    pub fn query_params(&self) -> Vec<(String, String)> {
        let mut params = self.features.query_params();
        params.push(("callback".to_string(), self.callback_url.clone()));
        params.push(("extra".to_string(), self.metadata_token.clone()));
        params
    }
}

/// Malformed caller input, surfaced synchronously
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("at least one audio URL is required")]
    EmptyBatch,
    #[error("invalid audio URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("context for {url:?} does not fit the callback metadata channel: {source}")]
    ContextTooLarge {
        url: String,
        #[source]
        source: EncodeError,
    },
}

/// Plan one batch submission: a fresh batch id, one outbound request per URL.
///
/// Every request returned already carries a token that decodes back to its
/// context. The nova-3 model family takes keyterms only and other models
/// keyword boosts only; the inapplicable list is dropped here.
pub fn plan(
    audio_urls: &[String],
    features: &FeatureFlags,
    callback_url: &str,
    notification_target: Option<&str>,
    output_location_template: Option<&str>,
) -> Result<Vec<OutboundRequest>, ValidationError> {
    if audio_urls.is_empty() {
        return Err(ValidationError::EmptyBatch);
    }
    for url in audio_urls {
        if let Err(e) = reqwest::Url::parse(url) {
            return Err(ValidationError::InvalidUrl {
                url: url.clone(),
                reason: e.to_string(),
            });
        }
    }

    let mut features = features.clone();
    if NOVA_3_MODELS.contains(&features.model.as_str()) {
        if !features.keywords.is_empty() {
            debug!("Dropping keyword boosts for nova-3 model {}", features.model);
            features.keywords.clear();
        }
    } else if !features.keyterms.is_empty() {
        debug!("Dropping keyterms for non-nova-3 model {}", features.model);
        features.keyterms.clear();
    }

    let batch_id = Uuid::new_v4().to_string();
    let submitted_at = Utc::now();
    let template = output_location_template.unwrap_or(DEFAULT_LOCATION_TEMPLATE);

    let mut requests = Vec::with_capacity(audio_urls.len());
    for (batch_index, audio_url) in audio_urls.iter().enumerate() {
        let context = BatchItemContext {
            batch_id: batch_id.clone(),
            batch_index,
            audio_url: audio_url.clone(),
            submitted_at,
            notification_target: notification_target.map(str::to_string),
            output_location_template: template.to_string(),
        };
        let metadata_token =
            encode_context(&context).map_err(|source| ValidationError::ContextTooLarge {
                url: audio_url.clone(),
                source,
            })?;
        requests.push(OutboundRequest {
            audio_url: audio_url.clone(),
            callback_url: callback_url.to_string(),
            metadata_token,
            features: features.clone(),
        });
    }

    Ok(requests)
}
