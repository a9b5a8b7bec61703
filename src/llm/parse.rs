//! Tolerant parsing of predictor responses.
//!
//! Predictors are asked for a JSON object with a `pick` field, but model
//! output is routinely wrapped in prose or code fences, truncated, or
//! missing the field. Parsing runs in stages and always yields a pick:
//!
//! 1. JSON: the outermost `{..}` slice parsed with `serde_json`.
//! 2. Field scan: a `"pick"` key followed by a quoted value.
//! 3. Bare token: the whole reply is one pick token such as `T` or `X`.
//! 4. Keyword scan: the earliest whole-word `TAI` / `XIU` / `SKIP` / `NOBET`.
//! 5. Default: `NoBet`.

use serde_json::Value;
use tracing::debug;

use crate::types::Prediction;

/// Which stage produced the pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStage {
    Json,
    FieldScan,
    Token,
    Keyword,
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedPick {
    pub prediction: Prediction,
    pub stage: ParseStage,
}

impl ParsedPick {
    fn new(prediction: Prediction, stage: ParseStage) -> Self {
        Self { prediction, stage }
    }
}

const KEYWORDS: [(&str, Prediction); 4] = [
    ("TAI", Prediction::PickA),
    ("XIU", Prediction::PickB),
    ("SKIP", Prediction::NoBet),
    ("NOBET", Prediction::NoBet),
];

/// Parse a raw predictor response. Never fails.
pub fn parse_pick(text: &str) -> ParsedPick {
    let parsed = if let Some(p) = pick_from_json(text) {
        ParsedPick::new(p, ParseStage::Json)
    } else if let Some(p) = pick_from_field_scan(text) {
        ParsedPick::new(p, ParseStage::FieldScan)
    } else if let Some(p) = pick_from_token(text) {
        ParsedPick::new(p, ParseStage::Token)
    } else if let Some(p) = pick_from_keywords(text) {
        ParsedPick::new(p, ParseStage::Keyword)
    } else {
        ParsedPick::new(Prediction::NoBet, ParseStage::Default)
    };

    debug!(stage = ?parsed.stage, prediction = %parsed.prediction, "Predictor response parsed");
    parsed
}

/// Slice from the first `{` to the last `}`, if both exist in that order.
fn outer_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn pick_from_json(text: &str) -> Option<Prediction> {
    let value: Value = serde_json::from_str(outer_object(text)?).ok()?;
    let pick = value
        .as_object()?
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("pick"))
        .map(|(_, v)| v)?;
    pick.as_str().map(Prediction::from_token)
}

fn pick_from_field_scan(text: &str) -> Option<Prediction> {
    let lower = text.to_ascii_lowercase();
    let key = lower.find("\"pick\"")?;
    let rest = &text[key + "\"pick\"".len()..];
    let colon = rest.find(':')?;
    let after = rest[colon + 1..].trim_start();
    let value = after.strip_prefix('"')?;
    let close = value.find('"')?;
    Some(Prediction::from_token(&value[..close]))
}

/// A reply that is nothing but a pick token, optionally quoted.
fn pick_from_token(text: &str) -> Option<Prediction> {
    let token = text
        .trim()
        .trim_matches(|c: char| matches!(c, '"' | '\'' | '`' | '.'))
        .trim();
    match token.to_ascii_uppercase().as_str() {
        "S" | "SKIP" | "NOBET" | "NO_BET" => Some(Prediction::NoBet),
        _ => Some(Prediction::from_token(token)).filter(|p| p.is_bet()),
    }
}

fn pick_from_keywords(text: &str) -> Option<Prediction> {
    let upper = text.to_ascii_uppercase();
    KEYWORDS
        .iter()
        .filter_map(|&(word, pred)| find_word(&upper, word).map(|pos| (pos, pred)))
        .min_by_key(|&(pos, _)| pos)
        .map(|(_, pred)| pred)
}

/// Byte offset of `word` in `haystack` where it is not part of a longer word.
fn find_word(haystack: &str, word: &str) -> Option<usize> {
    let bytes = haystack.as_bytes();
    haystack.match_indices(word).map(|(i, _)| i).find(|&i| {
        let before_ok = i == 0 || !bytes[i - 1].is_ascii_alphanumeric();
        let end = i + word.len();
        let after_ok = end >= bytes.len() || !bytes[end].is_ascii_alphanumeric();
        before_ok && after_ok
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
