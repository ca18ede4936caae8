use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::batch::{FeatureFlags, KeywordBoost};

/// Global vocabulary merged into every submission: keyword boosts for
/// classic models, plain keyterms for the nova-3 family.
///
/// The production deployment backs this with a shared key-value store; the
/// crate ships an in-memory implementation and a JSON-file one for the CLI.
#[async_trait]
pub trait VocabStore: Send + Sync {
    async fn add_keyword(&self, term: &str, boost: i32) -> Result<(), VocabError>;
    async fn remove_keyword(&self, term: &str) -> Result<(), VocabError>;
    async fn keywords(&self) -> Result<Vec<KeywordBoost>, VocabError>;

    async fn add_keyterm(&self, term: &str) -> Result<(), VocabError>;
    async fn remove_keyterm(&self, term: &str) -> Result<(), VocabError>;
    async fn keyterms(&self) -> Result<Vec<String>, VocabError>;
}

#[derive(Debug, thiserror::Error)]
pub enum VocabError {
    #[error("failed to access vocabulary file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("vocabulary file {path:?} is not valid: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Merge the store's global vocabulary into a submission's features, global
/// terms first, then the request's own. Store failures degrade to the
/// request-only vocabulary.
pub async fn apply_global_vocab(features: &mut FeatureFlags, store: &dyn VocabStore) {
    match store.keyterms().await {
        Ok(mut global) => {
            info!("Merging {} global keyterms", global.len());
            global.extend(features.keyterms.drain(..));
            features.keyterms = global;
        }
        Err(e) => warn!("Could not load global keyterms: {}", e),
    }
    match store.keywords().await {
        Ok(mut global) => {
            info!("Merging {} global keywords", global.len());
            global.extend(features.keywords.drain(..));
            features.keywords = global;
        }
        Err(e) => warn!("Could not load global keywords: {}", e),
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct VocabData {
    #[serde(default)]
    keywords: BTreeMap<String, i32>,
    #[serde(default)]
    keyterms: BTreeSet<String>,
}

impl VocabData {
    fn keyword_list(&self) -> Vec<KeywordBoost> {
        self.keywords
            .iter()
            .map(|(term, &boost)| KeywordBoost {
                term: term.clone(),
                boost,
            })
            .collect()
    }
}

/// In-memory vocabulary, mainly for tests
#[derive(Default)]
pub struct MemoryVocabStore {
    data: Mutex<VocabData>,
}

impl MemoryVocabStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VocabStore for MemoryVocabStore {
    async fn add_keyword(&self, term: &str, boost: i32) -> Result<(), VocabError> {
        self.data.lock().unwrap().keywords.insert(term.to_string(), boost);
        Ok(())
    }

    async fn remove_keyword(&self, term: &str) -> Result<(), VocabError> {
        self.data.lock().unwrap().keywords.remove(term);
        Ok(())
    }

    async fn keywords(&self) -> Result<Vec<KeywordBoost>, VocabError> {
        Ok(self.data.lock().unwrap().keyword_list())
    }

    async fn add_keyterm(&self, term: &str) -> Result<(), VocabError> {
        self.data.lock().unwrap().keyterms.insert(term.to_string());
        Ok(())
    }

    async fn remove_keyterm(&self, term: &str) -> Result<(), VocabError> {
        self.data.lock().unwrap().keyterms.remove(term);
        Ok(())
    }

    async fn keyterms(&self) -> Result<Vec<String>, VocabError> {
        Ok(self.data.lock().unwrap().keyterms.iter().cloned().collect())
    }
}

/// JSON-file-backed vocabulary. Reads the file on every operation so
/// concurrent CLI invocations see each other's writes; a missing file is an
/// empty vocabulary.
pub struct FileVocabStore {
    path: PathBuf,
}

impl FileVocabStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn load(&self) -> Result<VocabData, VocabError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(VocabData::default());
            }
            Err(source) => {
                return Err(VocabError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        serde_json::from_slice(&bytes).map_err(|source| VocabError::Malformed {
            path: self.path.clone(),
            source,
        })
    }

    async fn save(&self, data: &VocabData) -> Result<(), VocabError> {
        let json = serde_json::to_vec_pretty(data).map_err(|source| VocabError::Malformed {
            path: self.path.clone(),
            source,
        })?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|source| VocabError::Io {
                path: self.path.clone(),
                source,
            })
    }
}

#[async_trait]
impl VocabStore for FileVocabStore {
    async fn add_keyword(&self, term: &str, boost: i32) -> Result<(), VocabError> {
        let mut data = self.load().await?;
        data.keywords.insert(term.to_string(), boost);
        self.save(&data).await
    }

    async fn remove_keyword(&self, term: &str) -> Result<(), VocabError> {
        let mut data = self.load().await?;
        data.keywords.remove(term);
        self.save(&data).await
    }

    async fn keywords(&self) -> Result<Vec<KeywordBoost>, VocabError> {
        Ok(self.load().await?.keyword_list())
    }

    async fn add_keyterm(&self, term: &str) -> Result<(), VocabError> {
        let mut data = self.load().await?;
        data.keyterms.insert(term.to_string());
        self.save(&data).await
    }

    async fn remove_keyterm(&self, term: &str) -> Result<(), VocabError> {
        let mut data = self.load().await?;
        data.keyterms.remove(term);
        self.save(&data).await
    }

    async fn keyterms(&self) -> Result<Vec<String>, VocabError> {
        Ok(self.load().await?.keyterms.iter().cloned().collect())
    }
}
