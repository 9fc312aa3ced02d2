// src/ingest/extract.rs
//! Extraction cascade: an ordered list of parser functions per payload segment.
//!
//! A rule either does not recognize a segment (`None`) or recognizes it and
//! returns its items (`Some`, possibly empty). For each segment the first rule
//! that yields at least one item wins; lower-priority rules never contribute
//! to that segment. No I/O, no recency judgement.

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::ingest::types::Item;

/// Per-call context handed to every rule.
#[derive(Debug, Clone, Copy)]
pub struct ExtractCtx<'a> {
    /// Item label, e.g. `news` or `x:@DeItaone`.
    pub source: &'a str,
    pub now: DateTime<Utc>,
}

pub type Rule = fn(&str, &ExtractCtx<'_>) -> Option<Vec<Item>>;
pub type Segmenter = fn(&str) -> Vec<&str>;

#[derive(Debug, PartialEq)]
pub enum Extraction {
    /// At least one rule understood the payload (items may be empty).
    Recognized(Vec<Item>),
    Unrecognized,
}

impl Extraction {
    pub fn into_items(self) -> Vec<Item> {
        match self {
            Extraction::Recognized(items) => items,
            Extraction::Unrecognized => Vec::new(),
        }
    }
}

#[derive(Clone, Copy)]
pub struct Extractor {
    pub name: &'static str,
    /// Highest priority first.
    pub rules: &'static [Rule],
    /// Splits the payload into independently extracted segments; whole payload when `None`.
    pub segmenter: Option<Segmenter>,
    /// When a rule recognizes a segment but finds nothing, stop instead of
    /// trying the lower-priority rules.
    pub zero_is_authoritative: bool,
}

impl std::fmt::Debug for Extractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extractor")
            .field("name", &self.name)
            .field("rules", &self.rules.len())
            .field("zero_is_authoritative", &self.zero_is_authoritative)
            .finish()
    }
}

impl Extractor {
    pub fn run(&self, payload: &str, ctx: &ExtractCtx<'_>) -> Extraction {
        let segments = match self.segmenter {
            Some(split) => split(payload),
            None => vec![payload],
        };

        let mut recognized = false;
        let mut out = Vec::new();
        for seg in segments {
            if let Extraction::Recognized(items) = self.first_match(seg, ctx) {
                recognized = true;
                out.extend(items);
            }
        }

        if recognized {
            Extraction::Recognized(out)
        } else {
            Extraction::Unrecognized
        }
    }

    /// Convenience for callers that do not care whether the payload was understood.
    pub fn extract(&self, payload: &str, ctx: &ExtractCtx<'_>) -> Vec<Item> {
        self.run(payload, ctx).into_items()
    }

    fn first_match(&self, segment: &str, ctx: &ExtractCtx<'_>) -> Extraction {
        let mut recognized = false;
        for rule in self.rules {
            match rule(segment, ctx) {
                Some(items) if !items.is_empty() => return Extraction::Recognized(items),
                Some(_) if self.zero_is_authoritative => return Extraction::Recognized(Vec::new()),
                Some(_) => recognized = true,
                None => {}
            }
        }
        if recognized {
            Extraction::Recognized(Vec::new())
        } else {
            Extraction::Unrecognized
        }
    }
}

// ---- helpers shared by provider rules --------------------------------------

/// All non-overlapping matches of capture group 1.
pub fn capture_all<'a>(re: &Regex, payload: &'a str) -> Vec<&'a str> {
    re.captures_iter(payload)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect()
}

/// Capture group 1 of the first match.
pub fn capture_first<'a>(re: &Regex, payload: &'a str) -> Option<&'a str> {
    re.captures(payload)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Drops `<![CDATA[ ... ]]>` wrappers so serde/XML readers see plain text.
pub fn strip_cdata(s: &str) -> String {
    s.replace("<![CDATA[", "").replace("]]>", "")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::Timestamp;
    use chrono::TimeZone;

    fn ctx() -> ExtractCtx<'static> {
        ExtractCtx {
            source: "test",
            now: Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap(),
        }
    }

    fn structured(seg: &str, ctx: &ExtractCtx<'_>) -> Option<Vec<Item>> {
        let body = seg.strip_prefix("json:")?;
        if body.starts_with('!') {
            return Some(Vec::new());
        }
        Some(
            body.split(';')
                .filter_map(|t| Item::new(ctx.source, t, Timestamp::Unknown))
                .collect(),
        )
    }

    fn heuristic(seg: &str, ctx: &ExtractCtx<'_>) -> Option<Vec<Item>> {
        let items: Vec<Item> = seg
            .split('|')
            .filter(|t| t.contains("text"))
            .filter_map(|t| Item::new(ctx.source, t, Timestamp::Unknown))
            .collect();
        if items.is_empty() {
            None
        } else {
            Some(items)
        }
    }

    fn by_line(payload: &str) -> Vec<&str> {
        payload.lines().collect()
    }

    const RULES: &[Rule] = &[structured, heuristic];

    fn extractor(zero_is_authoritative: bool) -> Extractor {
        Extractor {
            name: "test",
            rules: RULES,
            segmenter: Some(by_line),
            zero_is_authoritative,
        }
    }

    #[test]
    fn higher_priority_rule_wins_per_segment() {
        // Line 1 matches both rules; only the structured rule may contribute.
        let payload = "json:a text;b text\nplain text|other text";
        let items = extractor(false).extract(payload, &ctx());
        let texts: Vec<_> = items.iter().map(|i| i.text.as_str()).collect();
        assert_eq!(texts, vec!["a text", "b text", "plain text", "other text"]);
    }

    #[test]
    fn recognized_zero_falls_through_unless_authoritative() {
        let payload = "json:!|some text";
        let fall = extractor(false).run(payload, &ctx());
        assert_eq!(fall.into_items().len(), 1);

        let stop = extractor(true).run(payload, &ctx());
        assert_eq!(stop, Extraction::Recognized(vec![]));
    }

    #[test]
    fn unmatched_payload_is_unrecognized_and_empty() {
        let ex = extractor(false);
        assert_eq!(ex.run("<<garbage>>", &ctx()), Extraction::Unrecognized);
        assert!(ex.extract("", &ctx()).is_empty());
    }
}
