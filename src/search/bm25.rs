//! Simplified BM25 lexical scoring.
//!
//! This variant deliberately omits the inverse-document-frequency term:
//! only term-frequency saturation (`k1`) and document-length normalization
//! (`b`) apply. The fusion weights and the `/10.0` normalization constant
//! downstream were tuned against this variant's score range, so adding IDF
//! would silently change ranking semantics. Keep it as is.

use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

pub const DEFAULT_K1: f64 = 1.5;
pub const DEFAULT_B: f64 = 0.75;

/// Raw scores are mapped into [0, 1] for fusion by dividing by this constant
/// and clamping.
const NORMALIZATION_DIVISOR: f64 = 10.0;

fn word_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\w+").expect("valid token pattern"))
}

/// Lowercase and split into maximal runs of word characters (letters,
/// digits, underscore). Bag-of-words: order carries no meaning downstream.
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    word_pattern()
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Score a document against query tokens. Tokens absent from the document
/// contribute zero. `avg_doc_length` is the mean token count over the whole
/// corpus; a non-positive value (empty corpus) scores zero rather than
/// dividing by zero.
pub fn bm25_score(
    query_tokens: &[String],
    doc_tokens: &[String],
    avg_doc_length: f64,
    k1: f64,
    b: f64,
) -> f64 {
    if avg_doc_length <= 0.0 {
        return 0.0;
    }

    let doc_length = doc_tokens.len() as f64;
    let mut term_freq: HashMap<&str, f64> = HashMap::new();
    for token in doc_tokens {
        *term_freq.entry(token.as_str()).or_insert(0.0) += 1.0;
    }

    let mut score = 0.0;
    for token in query_tokens {
        if let Some(&tf) = term_freq.get(token.as_str()) {
            let numerator = tf * (k1 + 1.0);
            let denominator = tf + k1 * (1.0 - b + b * (doc_length / avg_doc_length));
            score += numerator / denominator;
        }
    }

    score
}

/// Map a raw BM25 score into [0, 1] for fusion. A score of exactly 0 stays 0.
pub fn normalize_bm25(raw: f64) -> f64 {
    if raw > 0.0 {
        (raw / NORMALIZATION_DIVISOR).min(1.0)
    } else {
        0.0
    }
}
