pub mod audit;
pub mod batch;
pub mod engine;
pub mod extract;
pub mod metadata;
pub mod models;
pub mod notify;
pub mod storage;
pub mod vocab;
pub mod webhook;
pub mod wer;

pub use audit::{audit_file, audit_text, audit_url, AuditOutcome};
pub use batch::{plan, FeatureFlags, KeywordBoost, OutboundRequest, ValidationError};
pub use engine::{EngineClient, EngineConfig, SubmitReceipt};
pub use extract::{extract, AudioIntelligence};
pub use metadata::{
    decode_context, encode_context, BatchItemContext, DecodeError, DEFAULT_LOCATION_TEMPLATE,
};
pub use models::{
    CallbackPayload, NotificationPayload, SpeakerSegment, TranscriptionRecord,
};
pub use notify::{HttpNotifier, Notifier};
pub use storage::{LocalDirStore, MemoryStore, ResultStore, StorageError};
pub use vocab::{apply_global_vocab, FileVocabStore, MemoryVocabStore, VocabStore};
pub use webhook::{Correlator, HandlingOutcome, WebhookError};
pub use wer::{compute, NormalizeOptions, WerConfig, WerError, WerReport};
