mod alignment;

pub use alignment::{AlignOp, OpKind};

use serde::Serialize;

/// Text normalization applied identically to both texts before tokenization
#[derive(Debug, Clone)]
pub struct NormalizeOptions {
    pub lowercase: bool,
    pub strip_punctuation: bool,
    pub collapse_whitespace: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            lowercase: true,
            strip_punctuation: true,
            collapse_whitespace: true,
        }
    }
}

/// Configuration for a WER computation
#[derive(Debug, Clone)]
pub struct WerConfig {
    pub normalize: NormalizeOptions,
    /// Upper bound on either token sequence; the DP table is O(R*H)
    pub max_tokens: usize,
}

impl Default for WerConfig {
    fn default() -> Self {
        Self {
            normalize: NormalizeOptions::default(),
            max_tokens: 20_000,
        }
    }
}

/// Result of comparing a reference transcript against a hypothesis
#[derive(Debug, Clone, Serialize)]
pub struct WerReport {
    pub reference_word_count: usize,
    pub hypothesis_word_count: usize,
    pub substitutions: usize,
    pub insertions: usize,
    pub deletions: usize,
    /// `(S + I + D) / reference_word_count`; insertions can push this past 1.0
    pub wer: f64,
    /// The full aligned operation sequence, in reference order
    pub ops: Vec<AlignOp>,
}

#[derive(Debug, thiserror::Error)]
pub enum WerError {
    /// Empty reference with a non-empty hypothesis: the rate has no
    /// denominator, so it is reported as a condition rather than a number
    #[error("reference is empty but hypothesis has {hypothesis_word_count} words")]
    NoReference { hypothesis_word_count: usize },
    #[error("input of {word_count} words exceeds the maximum of {max}")]
    InputTooLarge { word_count: usize, max: usize },
}

/// Compute word error rate between a reference and a hypothesis text.
///
/// Both texts are normalized per `config.normalize`, tokenized on whitespace,
/// and aligned by minimum edit distance. Two empty texts score 0; an empty
/// reference against a non-empty hypothesis is [`WerError::NoReference`].
pub fn compute(reference: &str, hypothesis: &str, config: &WerConfig) -> Result<WerReport, WerError> {
    let reference_tokens = alignment::tokenize(reference, &config.normalize);
    let hypothesis_tokens = alignment::tokenize(hypothesis, &config.normalize);

    for tokens in [&reference_tokens, &hypothesis_tokens] {
        if tokens.len() > config.max_tokens {
            return Err(WerError::InputTooLarge {
                word_count: tokens.len(),
                max: config.max_tokens,
            });
        }
    }

    if reference_tokens.is_empty() {
        if hypothesis_tokens.is_empty() {
            return Ok(WerReport {
                reference_word_count: 0,
                hypothesis_word_count: 0,
                substitutions: 0,
                insertions: 0,
                deletions: 0,
                wer: 0.0,
                ops: vec![],
            });
        }
        return Err(WerError::NoReference {
            hypothesis_word_count: hypothesis_tokens.len(),
        });
    }

    let ops = alignment::align(&reference_tokens, &hypothesis_tokens);

    let mut substitutions = 0;
    let mut insertions = 0;
    let mut deletions = 0;
    for op in &ops {
        match op.kind {
            OpKind::Match => {}
            OpKind::Substitute => substitutions += 1,
            OpKind::Insert => insertions += 1,
            OpKind::Delete => deletions += 1,
        }
    }

    let wer = (substitutions + insertions + deletions) as f64 / reference_tokens.len() as f64;

    Ok(WerReport {
        reference_word_count: reference_tokens.len(),
        hypothesis_word_count: hypothesis_tokens.len(),
        substitutions,
        insertions,
        deletions,
        wer,
        ops,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_texts_score_zero() {
        let report = compute("the quick brown fox", "the quick brown fox", &WerConfig::default())
            .unwrap();
        assert_eq!(report.wer, 0.0);
        assert_eq!(report.substitutions, 0);
        assert_eq!(report.insertions, 0);
        assert_eq!(report.deletions, 0);
        assert_eq!(report.reference_word_count, 4);
    }

    #[test]
    fn test_normalization_hides_case_and_punctuation() {
        let report = compute("The cat sat.", "the cat sat", &WerConfig::default()).unwrap();
        assert_eq!(report.wer, 0.0);
    }

    #[test]
    fn test_empty_hypothesis_is_all_deletions() {
        let report = compute("one two three", "", &WerConfig::default()).unwrap();
        assert_eq!(report.wer, 1.0);
        assert_eq!(report.deletions, 3);
        assert_eq!(report.substitutions, 0);
        assert_eq!(report.insertions, 0);
    }

    #[test]
    fn test_empty_reference_is_a_distinct_condition() {
        let err = compute("", "hello there", &WerConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            WerError::NoReference {
                hypothesis_word_count: 2
            }
        ));
    }

    #[test]
    fn test_both_empty_scores_zero() {
        let report = compute("", "", &WerConfig::default()).unwrap();
        assert_eq!(report.wer, 0.0);
        assert_eq!(report.reference_word_count, 0);
        assert!(report.ops.is_empty());
    }

    #[test]
    fn test_cat_sat_example() {
        let report = compute(
            "the cat sat on the mat",
            "the cat sit on mat",
            &WerConfig::default(),
        )
        .unwrap();
        assert_eq!(report.reference_word_count, 6);
        assert_eq!(report.hypothesis_word_count, 5);
        assert_eq!(report.substitutions, 1);
        assert_eq!(report.deletions, 1);
        assert_eq!(report.insertions, 0);
        assert!((report.wer - 2.0 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_insertions_can_push_wer_past_one() {
        let report = compute("hi", "hello there general kenobi", &WerConfig::default()).unwrap();
        assert!(report.wer > 1.0);
        assert_eq!(
            report.substitutions + report.insertions + report.deletions,
            4
        );
    }

    #[test]
    fn test_counts_respect_reference_bound() {
        let report = compute(
            "a b c d e",
            "a x c y z q r",
            &WerConfig::default(),
        )
        .unwrap();
        assert!(report.substitutions + report.deletions <= report.reference_word_count);
    }

    #[test]
    fn test_oversized_input_is_rejected() {
        let config = WerConfig {
            max_tokens: 4,
            ..WerConfig::default()
        };
        let err = compute("a b c d e", "a b", &config).unwrap_err();
        assert!(matches!(
            err,
            WerError::InputTooLarge {
                word_count: 5,
                max: 4
            }
        ));
    }
}
