//! Deserializers for contest configuration fields that are written either as
//! JSON numbers or as strings (`"4"`, `""`, `"max"`, `"unlimited"`).

use crate::tabulator::Votes;
use serde::de::{self, Deserializer};
use serde::Deserialize;

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(serde_json::Number),
    String(String),
}

impl NumberOrString {
    fn text(&self) -> String {
        match self {
            NumberOrString::Number(n) => n.to_string(),
            NumberOrString::String(s) => s.trim().to_string(),
        }
    }
}

fn parse_text<T: std::str::FromStr, E: de::Error>(text: &str, what: &str) -> Result<T, E> {
    text.parse()
        .map_err(|_| E::custom(format!("expected {}, found {:?}", what, text)))
}

pub fn u32_from_any<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = NumberOrString::deserialize(deserializer)?;
    parse_text(&raw.text(), "a non-negative integer")
}

pub fn opt_u64_from_any<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<NumberOrString> = Option::deserialize(deserializer)?;
    match raw.map(|r| r.text()) {
        None => Ok(None),
        Some(text) if text.is_empty() => Ok(None),
        Some(text) => parse_text(&text, "a non-negative integer").map(Some),
    }
}

pub fn opt_usize_from_any<'de, D>(deserializer: D) -> Result<Option<usize>, D::Error>
where
    D: Deserializer<'de>,
{
    opt_u64_from_any(deserializer).map(|v| v.map(|n| n as usize))
}

pub fn opt_votes_from_any<'de, D>(deserializer: D) -> Result<Option<Votes>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<NumberOrString> = Option::deserialize(deserializer)?;
    match raw.map(|r| r.text()) {
        None => Ok(None),
        Some(text) if text.is_empty() => Ok(None),
        Some(text) => parse_text(&text, "a decimal number").map(Some),
    }
}

/// `maxRankingsAllowed`: an integer, or `"max"` for no limit.
pub fn rankings_limit<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    limit_from_any(deserializer, "max")
}

/// `maxSkippedRanksAllowed`: an integer, or `"unlimited"`.
pub fn skipped_ranks_limit<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    limit_from_any(deserializer, "unlimited")
}

fn limit_from_any<'de, D>(deserializer: D, keyword: &str) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let text = NumberOrString::deserialize(deserializer)?.text();
    if text.eq_ignore_ascii_case(keyword) {
        Ok(None)
    } else {
        parse_text(&text, &format!("an integer or {:?}", keyword)).map(Some)
    }
}
