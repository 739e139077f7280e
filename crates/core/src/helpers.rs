//! Helper functions for token-level text processing.

use regex::Regex;
use std::sync::LazyLock;

use crate::corpus::SpanAnnotation;
use crate::{Tokenizer, UNK_TOKEN};

static NON_WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\W+").unwrap());

/// Lowercasing word/punctuation splitter used for the simulated corpora.
///
/// Runs of non-word characters are kept as tokens of their own after
/// trimming, so `"i'm here."` becomes `["i", "'", "m", "here", "."]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimTokenizer;

impl Tokenizer for SimTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        let lower = text.to_lowercase();
        let mut tokens = Vec::new();
        let mut last = 0;
        for m in NON_WORD_RE.find_iter(&lower) {
            push_trimmed(&mut tokens, &lower[last..m.start()]);
            push_trimmed(&mut tokens, m.as_str());
            last = m.end();
        }
        push_trimmed(&mut tokens, &lower[last..]);
        tokens
    }
}

fn push_trimmed(tokens: &mut Vec<String>, piece: &str) {
    let piece = piece.trim();
    if !piece.is_empty() {
        tokens.push(piece.to_string());
    }
}

/// Join the tokens covered by a span with single spaces.
pub fn span_text(tokens: &[String], span: &SpanAnnotation) -> String {
    tokens[span.start..span.exclusive_end].join(" ")
}

/// Return a copy of `tokens` with every annotated span overwritten by `[UNK]`.
///
/// Spans are expected to be validated against `tokens` already; out-of-range
/// ends are clamped.
pub fn delexicalize(tokens: &[String], spans: &[SpanAnnotation]) -> Vec<String> {
    let mut delex = tokens.to_vec();
    for span in spans {
        let end = span.exclusive_end.min(delex.len());
        for token in delex.iter_mut().take(end).skip(span.start) {
            *token = UNK_TOKEN.to_string();
        }
    }
    delex
}
