use serde::Serialize;

use super::NormalizeOptions;

/// Error classification for one aligned position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OpKind {
    Match,
    Substitute,
    Delete,
    Insert,
}

/// One step in the aligned edit sequence between reference and hypothesis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignOp {
    pub kind: OpKind,
    /// Reference token consumed by this step (absent for insertions)
    pub reference: Option<String>,
    /// Hypothesis token consumed by this step (absent for deletions)
    pub hypothesis: Option<String>,
}

/// Normalize and split a text into word tokens
pub(crate) fn tokenize(text: &str, options: &NormalizeOptions) -> Vec<String> {
    let mut text = text.to_string();
    if options.lowercase {
        text = text.to_lowercase();
    }
    if options.strip_punctuation {
        text.retain(|c| !c.is_ascii_punctuation());
    }
    if options.collapse_whitespace {
        text.split_whitespace().map(str::to_string).collect()
    } else {
        text.trim()
            .split(' ')
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Align two token sequences by minimum edit distance.
///
/// Classic Levenshtein DP with unit costs: `dist[i][j]` is the minimum number
/// of operations turning the first `i` reference tokens into the first `j`
/// hypothesis tokens. The backtrack prefers match/substitution over deletion
/// over insertion among equal-cost moves, so the alignment is deterministic.
pub(crate) fn align(reference: &[String], hypothesis: &[String]) -> Vec<AlignOp> {
    let r = reference.len();
    let h = hypothesis.len();

    let mut dist = vec![vec![0u32; h + 1]; r + 1];
    for (i, row) in dist.iter_mut().enumerate() {
        row[0] = i as u32;
    }
    for j in 0..=h {
        dist[0][j] = j as u32;
    }
    for i in 1..=r {
        for j in 1..=h {
            dist[i][j] = if reference[i - 1] == hypothesis[j - 1] {
                dist[i - 1][j - 1]
            } else {
                1 + dist[i - 1][j - 1]
                    .min(dist[i - 1][j])
                    .min(dist[i][j - 1])
            };
        }
    }

    let mut ops = Vec::with_capacity(r.max(h));
    let (mut i, mut j) = (r, h);
    while i > 0 || j > 0 {
        if i > 0 && j > 0 {
            let matched = reference[i - 1] == hypothesis[j - 1];
            let diag_cost = dist[i - 1][j - 1] + if matched { 0 } else { 1 };
            if dist[i][j] == diag_cost {
                ops.push(AlignOp {
                    kind: if matched { OpKind::Match } else { OpKind::Substitute },
                    reference: Some(reference[i - 1].clone()),
                    hypothesis: Some(hypothesis[j - 1].clone()),
                });
                i -= 1;
                j -= 1;
                continue;
            }
        }
        if i > 0 && dist[i][j] == dist[i - 1][j] + 1 {
            ops.push(AlignOp {
                kind: OpKind::Delete,
                reference: Some(reference[i - 1].clone()),
                hypothesis: None,
            });
            i -= 1;
            continue;
        }
        ops.push(AlignOp {
            kind: OpKind::Insert,
            reference: None,
            hypothesis: Some(hypothesis[j - 1].clone()),
        });
        j -= 1;
    }

    ops.reverse();
    ops
}
