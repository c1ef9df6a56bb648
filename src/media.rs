//! Media-range matching for `Accept` and `Content-Type` headers (RFC 9110 §8.3, §12.5.1).
//!
//! Media types are case-insensitive; parameters other than `q` are ignored.
//! Only first-match acceptability is answered here. There is no quality-ranked
//! selection between candidates: callers ask "is this one format acceptable?"
//! and get a yes or no.
//!
//! ```rust
//! use conneg::media::{accepts, CBOR};
//!
//! assert!(accepts("application/json, application/cbor;q=0.5", CBOR, true));
//! assert!(!accepts("*/*", CBOR, true));
//! assert!(accepts("*/*", CBOR, false));
//! assert!(!accepts("application/cbor;q=0", CBOR, false));
//! ```

/// `application/json`
pub const JSON: &str = "application/json";
/// `application/cbor`
pub const CBOR: &str = "application/cbor";
/// `application/problem+json` (RFC 9457)
pub const PROBLEM_JSON: &str = "application/problem+json";
/// `application/problem+cbor`
pub const PROBLEM_CBOR: &str = "application/problem+cbor";
/// `application/schema+json`
pub const SCHEMA_JSON: &str = "application/schema+json";

/// Request body media types the transcoder accepts, in sorted order.
pub const ALLOWED_CONTENT_TYPES: [&str; 2] = [CBOR, JSON];

/// One parsed media range, e.g. `application/*;q=0.5`.
///
/// `type_` and `subtype` are always lowercase.
#[derive(Clone, Debug, PartialEq)]
pub struct MediaType {
    pub type_: String,
    pub subtype: String,
    pub q: f32,
}

impl MediaType {
    /// Parses one `Accept` segment. Returns `None` for blank or malformed
    /// ranges (no `/`).
    pub fn parse(segment: &str) -> Option<Self> {
        let segment = segment.trim();
        if segment.is_empty() {
            return None;
        }
        let mut parts = segment.split(';');
        let range = normalize(parts.next().unwrap_or_default());
        let (type_, subtype) = range.split_once('/')?;
        Some(Self {
            type_: type_.to_owned(),
            subtype: subtype.to_owned(),
            q: qvalue(parts),
        })
    }

    /// `q=0` marks a range as explicitly unacceptable.
    pub fn is_acceptable(&self) -> bool {
        self.q != 0.0
    }

    fn matches(&self, target_type: &str, target_subtype: &str, explicit_only: bool) -> bool {
        if self.type_ == target_type && self.subtype == target_subtype {
            return true;
        }
        if explicit_only {
            return false;
        }
        if self.type_ == "*" && self.subtype == "*" {
            return true;
        }
        self.subtype == "*" && self.type_ == target_type
    }
}

/// Lowercases, strips parameters after `;`, and trims whitespace.
///
/// `"Application/JSON; charset=utf-8"` becomes `"application/json"`.
pub fn normalize(raw: &str) -> String {
    raw.split(';').next().unwrap_or_default().trim().to_ascii_lowercase()
}

/// Reads the quality value from a range's parameters.
///
/// Missing or unparsable `q=` values count as `1.0`.
pub fn qvalue<'a>(params: impl IntoIterator<Item = &'a str>) -> f32 {
    for param in params {
        let param = param.trim();
        let Some((name, value)) = param.split_once('=') else { continue };
        if name.eq_ignore_ascii_case("q") {
            return value.trim().parse().unwrap_or(1.0);
        }
    }
    1.0
}

/// Answers "is `target` acceptable to this `Accept` header?".
///
/// Segments with `q=0` and malformed ranges are skipped. With
/// `explicit_only`, `*/*` and `type/*` never match, so a format is only
/// chosen when the client names it. An empty header accepts nothing.
pub fn accepts(header: &str, target: &str, explicit_only: bool) -> bool {
    if header.is_empty() {
        return false;
    }
    let target = normalize(target);
    let (target_type, target_subtype) = target.split_once('/').unwrap_or((target.as_str(), ""));

    header
        .split(',')
        .filter_map(MediaType::parse)
        .filter(MediaType::is_acceptable)
        .any(|range| range.matches(target_type, target_subtype, explicit_only))
}

/// Exact media-type comparison after normalization; parameters ignored.
pub fn content_type_matches(a: &str, b: &str) -> bool {
    normalize(a) == normalize(b)
}

/// Whether `content_type` is one of [`ALLOWED_CONTENT_TYPES`].
pub fn is_allowed_content_type(content_type: &str) -> bool {
    let normalized = normalize(content_type);
    ALLOWED_CONTENT_TYPES.contains(&normalized.as_str())
}

/// Whether the client explicitly asked for a CBOR problem document.
///
/// Both `application/cbor` and `application/problem+cbor` count, mirroring
/// how `application/json` and `application/problem+json` relate.
pub fn wants_problem_cbor(accept: &str) -> bool {
    accepts(accept, CBOR, true) || accepts(accept, PROBLEM_CBOR, true)
}
