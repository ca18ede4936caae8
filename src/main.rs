use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use batchscribe::{
    apply_global_vocab, audit_file, audit_text, audit_url, decode_context, plan, AuditOutcome,
    Correlator, EngineClient, EngineConfig, FeatureFlags, FileVocabStore, HandlingOutcome,
    HttpNotifier, KeywordBoost, LocalDirStore, NormalizeOptions, WerConfig, WerReport,
};

#[derive(Parser)]
#[command(name = "batchscribe")]
#[command(author, version, about = "Batch transcription relay and WER auditing", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a batch of audio URLs for asynchronous transcription
    Submit {
        /// Audio URLs to transcribe
        #[arg(required = true)]
        urls: Vec<String>,

        /// Where the engine should POST its callbacks
        #[arg(long)]
        callback_url: String,

        /// Engine model
        #[arg(long, default_value = "nova-3")]
        model: String,

        /// Language code
        #[arg(long, default_value = "en-US")]
        language: String,

        /// Disable summarization
        #[arg(long)]
        no_summarize: bool,

        /// Disable sentiment analysis
        #[arg(long)]
        no_sentiment: bool,

        /// Disable topic detection
        #[arg(long)]
        no_topics: bool,

        /// Disable intent detection
        #[arg(long)]
        no_intents: bool,

        /// Disable speaker diarization
        #[arg(long)]
        no_diarize: bool,

        /// Keyword boost, `term` or `term:boost` (repeatable)
        #[arg(long = "keyword")]
        keywords: Vec<KeywordBoost>,

        /// Keyterm for nova-3 models (repeatable)
        #[arg(long = "keyterm")]
        keyterms: Vec<String>,

        /// Search term forwarded to the engine (repeatable)
        #[arg(long = "search-term")]
        search_terms: Vec<String>,

        /// URL to notify when each item completes
        #[arg(long)]
        notify: Option<String>,

        /// Result location template, with {batch_id} and {index} placeholders
        #[arg(long)]
        output_template: Option<String>,

        /// Vocabulary file with global keywords/keyterms to merge in
        #[arg(long)]
        vocab_file: Option<PathBuf>,
    },

    /// Run a saved callback body through the webhook correlator
    Replay {
        /// File containing the raw callback JSON
        #[arg(short, long)]
        input: PathBuf,

        /// Directory to persist normalized results under
        #[arg(short, long, default_value = "results")]
        output_dir: PathBuf,

        /// Embed the raw engine results in the persisted record
        #[arg(long)]
        raw: bool,
    },

    /// Score a hypothesis text against a reference transcript
    AuditText {
        #[arg(long)]
        reference: Option<String>,

        /// Read the reference transcript from a file instead
        #[arg(long)]
        reference_file: Option<PathBuf>,

        #[arg(long)]
        hypothesis: String,

        #[command(flatten)]
        normalize: NormalizeArgs,
    },

    /// Transcribe an audio URL and score it against a reference transcript
    AuditUrl {
        #[arg(long)]
        reference: Option<String>,

        #[arg(long)]
        reference_file: Option<PathBuf>,

        /// Audio URL to transcribe as the hypothesis
        #[arg(long)]
        url: String,

        #[command(flatten)]
        normalize: NormalizeArgs,
    },

    /// Transcribe a local audio file and score it against a reference transcript
    AuditFile {
        #[arg(long)]
        reference: Option<String>,

        #[arg(long)]
        reference_file: Option<PathBuf>,

        /// Audio file to transcribe as the hypothesis
        #[arg(long)]
        file: PathBuf,

        #[command(flatten)]
        normalize: NormalizeArgs,
    },

    /// Manage the global keyword/keyterm vocabulary
    Vocab {
        /// Vocabulary file
        #[arg(long, default_value = "vocab.json")]
        store: PathBuf,

        #[command(subcommand)]
        action: VocabAction,
    },
}

#[derive(Subcommand)]
enum VocabAction {
    /// Add a keyword boost
    AddKeyword {
        term: String,
        #[arg(long, default_value = "1")]
        boost: i32,
    },
    /// Remove a keyword boost
    RemoveKeyword { term: String },
    /// Add a keyterm
    AddKeyterm { term: String },
    /// Remove a keyterm
    RemoveKeyterm { term: String },
    /// List the stored vocabulary
    List,
}

#[derive(Debug, clap::Args)]
struct NormalizeArgs {
    /// Keep letter case when comparing
    #[arg(long)]
    keep_case: bool,

    /// Keep punctuation when comparing
    #[arg(long)]
    keep_punctuation: bool,

    /// Refuse inputs longer than this many words
    #[arg(long, default_value = "20000")]
    max_words: usize,
}

impl NormalizeArgs {
    fn to_config(&self) -> WerConfig {
        WerConfig {
            normalize: NormalizeOptions {
                lowercase: !self.keep_case,
                strip_punctuation: !self.keep_punctuation,
                collapse_whitespace: true,
            },
            max_tokens: self.max_words,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Commands::Submit {
            urls,
            callback_url,
            model,
            language,
            no_summarize,
            no_sentiment,
            no_topics,
            no_intents,
            no_diarize,
            keywords,
            keyterms,
            search_terms,
            notify,
            output_template,
            vocab_file,
        } => {
            let features = FeatureFlags {
                model,
                language,
                summarize: (!no_summarize).then(|| "v2".to_string()),
                sentiment: !no_sentiment,
                topics: !no_topics,
                intents: !no_intents,
                diarize: !no_diarize,
                keywords,
                keyterms,
                search_terms,
                ..FeatureFlags::default()
            };
            submit_batch(
                urls,
                features,
                callback_url,
                notify,
                output_template,
                vocab_file,
            )
            .await
        }
        Commands::Replay {
            input,
            output_dir,
            raw,
        } => replay_callback(input, output_dir, raw).await,
        Commands::AuditText {
            reference,
            reference_file,
            hypothesis,
            normalize,
        } => {
            let reference = resolve_reference(reference, reference_file)?;
            let report = audit_text(&reference, &hypothesis, &normalize.to_config())?;
            print_report(&report);
            Ok(())
        }
        Commands::AuditUrl {
            reference,
            reference_file,
            url,
            normalize,
        } => {
            let reference = resolve_reference(reference, reference_file)?;
            let client = EngineClient::new(EngineConfig::from_env()?);
            let outcome = audit_url(&client, &reference, &url, &normalize.to_config()).await?;
            print_audit_outcome(&outcome);
            Ok(())
        }
        Commands::AuditFile {
            reference,
            reference_file,
            file,
            normalize,
        } => {
            let reference = resolve_reference(reference, reference_file)?;
            let client = EngineClient::new(EngineConfig::from_env()?);
            let outcome = audit_file(&client, &reference, &file, &normalize.to_config()).await?;
            print_audit_outcome(&outcome);
            Ok(())
        }
        Commands::Vocab { store, action } => manage_vocab(store, action).await,
    }
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

async fn submit_batch(
    urls: Vec<String>,
    mut features: FeatureFlags,
    callback_url: String,
    notify: Option<String>,
    output_template: Option<String>,
    vocab_file: Option<PathBuf>,
) -> Result<()> {
    if let Some(path) = vocab_file {
        let store = FileVocabStore::new(path);
        apply_global_vocab(&mut features, &store).await;
    }

    let requests = plan(
        &urls,
        &features,
        &callback_url,
        notify.as_deref(),
        output_template.as_deref(),
    )?;

    let batch_id = decode_context(&requests[0].metadata_token)
        .context("Planner produced an undecodable token")?
        .batch_id;
    info!("Submitting batch {} with {} items", batch_id, requests.len());

    let client = EngineClient::new(EngineConfig::from_env()?);
    let mut success_count = 0;
    let mut error_count = 0;

    for (index, request) in requests.iter().enumerate() {
        match client.submit(request).await {
            Ok(receipt) => {
                info!(
                    "Item {} accepted (request_id {}): {}",
                    index, receipt.request_id, request.audio_url
                );
                success_count += 1;
            }
            Err(e) => {
                // One item failing never aborts its siblings
                warn!(
                    "Item {} submission failed for {}: {}",
                    index, request.audio_url, e
                );
                error_count += 1;
            }
        }
    }

    println!("Batch {batch_id}: {success_count} submitted, {error_count} failed");
    Ok(())
}

async fn replay_callback(input: PathBuf, output_dir: PathBuf, raw: bool) -> Result<()> {
    let body = std::fs::read_to_string(&input)
        .with_context(|| format!("Failed to read callback file: {input:?}"))?;

    let store = Arc::new(LocalDirStore::new(output_dir));
    let notifier = Arc::new(HttpNotifier::default());
    let mut correlator = Correlator::new(store, notifier);
    if raw {
        correlator = correlator.with_raw_results();
    }

    match correlator.handle(&body).await? {
        HandlingOutcome::Completed {
            request_id,
            location,
            notified,
        } => {
            println!("Persisted result for request {request_id} at {location}");
            match notified {
                Some(true) => println!("Notification delivered"),
                Some(false) => println!("Notification failed (result is persisted regardless)"),
                None => {}
            }
        }
        HandlingOutcome::Orphaned { request_id } => {
            println!("Request {request_id} had unreadable metadata; result not persisted");
        }
    }
    Ok(())
}

fn resolve_reference(text: Option<String>, file: Option<PathBuf>) -> Result<String> {
    match (text, file) {
        (Some(text), None) => Ok(text),
        (None, Some(path)) => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read reference file: {path:?}")),
        (Some(_), Some(_)) => {
            anyhow::bail!("Pass either --reference or --reference-file, not both")
        }
        (None, None) => anyhow::bail!("A reference transcript is required"),
    }
}

fn print_report(report: &WerReport) {
    println!("WER: {:.4}", report.wer);
    println!(
        "Reference words: {}, hypothesis words: {}",
        report.reference_word_count, report.hypothesis_word_count
    );
    println!(
        "Substitutions: {}, insertions: {}, deletions: {}",
        report.substitutions, report.insertions, report.deletions
    );
}

fn print_audit_outcome(outcome: &AuditOutcome) {
    println!("Hypothesis transcript:");
    println!("{}", outcome.hypothesis_transcript);
    println!();
    print_report(&outcome.report);
}

async fn manage_vocab(store_path: PathBuf, action: VocabAction) -> Result<()> {
    use batchscribe::VocabStore;

    let store = FileVocabStore::new(store_path);
    match action {
        VocabAction::AddKeyword { term, boost } => {
            store.add_keyword(&term, boost).await?;
            println!("Added keyword {term}:{boost}");
        }
        VocabAction::RemoveKeyword { term } => {
            store.remove_keyword(&term).await?;
            println!("Removed keyword {term}");
        }
        VocabAction::AddKeyterm { term } => {
            store.add_keyterm(&term).await?;
            println!("Added keyterm {term}");
        }
        VocabAction::RemoveKeyterm { term } => {
            store.remove_keyterm(&term).await?;
            println!("Removed keyterm {term}");
        }
        VocabAction::List => {
            let keywords = store.keywords().await?;
            let keyterms = store.keyterms().await?;
            println!("Keywords ({}):", keywords.len());
            for keyword in keywords {
                println!("  {}", keyword.as_param());
            }
            println!("Keyterms ({}):", keyterms.len());
            for keyterm in keyterms {
                println!("  {keyterm}");
            }
        }
    }
    Ok(())
}
