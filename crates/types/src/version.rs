//! npm-style version ranges
//!
//! Manifests express dependency constraints in npm range syntax, which
//! differs from Cargo's in a few places that matter here: a bare version
//! is an exact match, comparators are separated by whitespace, `||`
//! separates alternatives and `A - B` is an inclusive range. Each
//! alternative is normalized into a `semver::VersionReq` so matching
//! follows the usual caret/tilde/prerelease rules.
//!
//! - `1.2.3`, `=1.2.3`, `v1.2.3` - exact
//! - `^1.2.0`, `~1.2.0` - caret / tilde
//! - `>=1.2.0 <2.0.0` - comparator set
//! - `1.2.0 - 1.4.x` - hyphen range
//! - `1.x`, `1.2.*`, `*`, `""`, `latest` - wildcards
//! - `^1.0.0 || ^2.0.0` - alternatives

use semver::{Version, VersionReq};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use wsb_errors::VersionError;

/// A parsed version range as written in a manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    raw: String,
    kind: RangeKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum RangeKind {
    /// Any of the requirements must match
    Semver(Vec<VersionReq>),
    /// `file:`, `git+`, URLs, dist-tags: never satisfied by a local package
    NonSemver,
}

impl VersionRange {
    /// Parse a range, failing on anything that is not npm range syntax
    ///
    /// # Errors
    ///
    /// Returns `VersionError::InvalidRange` if any alternative cannot be
    /// normalized into a semver requirement.
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let raw = input.trim();
        let mut reqs = Vec::new();
        for alternative in raw.split("||") {
            reqs.push(parse_alternative(alternative.trim()).ok_or_else(|| {
                VersionError::InvalidRange {
                    input: raw.to_string(),
                }
            })?);
        }
        Ok(Self {
            raw: raw.to_string(),
            kind: RangeKind::Semver(reqs),
        })
    }

    /// Parse a range as found in a manifest; unparsable specifiers become
    /// ranges that match no local version
    #[must_use]
    pub fn lenient(input: &str) -> Self {
        Self::parse(input).unwrap_or_else(|_| Self {
            raw: input.trim().to_string(),
            kind: RangeKind::NonSemver,
        })
    }

    /// Check if a version satisfies this range
    #[must_use]
    pub fn satisfies(&self, version: &Version) -> bool {
        match &self.kind {
            RangeKind::Semver(reqs) => reqs.iter().any(|req| req.matches(version)),
            RangeKind::NonSemver => false,
        }
    }

    /// Whether the range is something other than a semver range
    #[must_use]
    pub fn is_non_semver(&self) -> bool {
        matches!(self.kind, RangeKind::NonSemver)
    }

    /// The range exactly as written
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl FromStr for VersionRange {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.raw.is_empty() {
            write!(f, "*")
        } else {
            write!(f, "{}", self.raw)
        }
    }
}

impl Serialize for VersionRange {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for VersionRange {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::lenient(&raw))
    }
}

const OPERATORS: [&str; 8] = ["~>", ">=", "<=", ">", "<", "=", "^", "~"];

/// One comparator set (whitespace separated, implicitly AND-ed)
fn parse_alternative(input: &str) -> Option<VersionReq> {
    if input.is_empty() || input == "latest" {
        return Some(VersionReq::STAR);
    }
    if input.contains(':') || input.contains('/') {
        return None;
    }

    let tokens: Vec<&str> = input.split_whitespace().collect();
    let mut comparators = Vec::new();

    if tokens.len() == 3 && tokens[1] == "-" {
        if let Some(lower) = comparator(">=", tokens[0])? {
            comparators.push(lower);
        }
        if let Some(upper) = comparator("<=", tokens[2])? {
            comparators.push(upper);
        }
    } else {
        let mut pending_op: Option<&str> = None;
        for token in tokens {
            let (op, rest) = split_operator(token);
            let op = match (pending_op.take(), op) {
                (Some(_), Some(_)) => return None,
                (Some(op), None) | (None, Some(op)) => op,
                (None, None) => "=",
            };
            if rest.is_empty() {
                pending_op = Some(op);
                continue;
            }
            if let Some(c) = comparator(op, rest)? {
                comparators.push(c);
            }
        }
        if pending_op.is_some() {
            return None;
        }
    }

    if comparators.is_empty() {
        return Some(VersionReq::STAR);
    }
    VersionReq::parse(&comparators.join(", ")).ok()
}

fn split_operator(token: &str) -> (Option<&'static str>, &str) {
    for op in OPERATORS {
        if let Some(rest) = token.strip_prefix(op) {
            let op = if op == "~>" { "~" } else { op };
            return (Some(op), rest);
        }
    }
    (None, token)
}

/// Render one comparator for `VersionReq`, or `None` when it matches anything.
///
/// Partial versions keep only their defined prefix so semver's partial
/// comparator rules apply: `=1` is `1.x.x`, `<=1.2` is `<1.3.0`.
#[allow(clippy::option_option)]
fn comparator(op: &str, version: &str) -> Option<Option<String>> {
    let version = version.trim_start_matches('=').trim_start_matches('v');
    let partial = Partial::parse(version)?;
    let prefix = partial.prefix();
    if prefix.is_empty() {
        return Some(None);
    }
    Some(Some(format!("{op}{prefix}")))
}

#[derive(Debug, Default)]
struct Partial {
    parts: Vec<u64>,
    pre: Option<String>,
}

impl Partial {
    fn parse(input: &str) -> Option<Self> {
        let (core, pre) = match input.find(['-', '+']) {
            Some(idx) => {
                let tail = &input[idx..];
                let pre = tail
                    .strip_prefix('-')
                    .map(|p| p.split('+').next().unwrap_or_default().to_string());
                (&input[..idx], pre)
            }
            None => (input, None),
        };

        let mut partial = Partial::default();
        let mut wildcard = false;
        for (i, part) in core.split('.').enumerate() {
            if i > 2 {
                return None;
            }
            match part {
                "x" | "X" | "*" => wildcard = true,
                digits if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) => {
                    if wildcard {
                        // 1.x.3 reads as 1.x
                        continue;
                    }
                    partial.parts.push(digits.parse().ok()?);
                }
                _ => return None,
            }
        }
        if partial.parts.len() == 3 {
            partial.pre = pre.filter(|p| !p.is_empty());
        }
        Some(partial)
    }

    fn prefix(&self) -> String {
        let core = self
            .parts
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(".");
        match &self.pre {
            Some(pre) => format!("{core}-{pre}"),
            None => core,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    fn sat(range: &str, version: &str) -> bool {
        VersionRange::parse(range).unwrap().satisfies(&v(version))
    }

    #[test]
    fn test_exact() {
        assert!(sat("1.2.0", "1.2.0"));
        assert!(!sat("1.2.0", "1.2.1"));
        assert!(sat("=1.2.0", "1.2.0"));
        assert!(sat("v1.2.0", "1.2.0"));
    }

    #[test]
    fn test_caret_and_tilde() {
        assert!(sat("^1.0.0", "1.2.0"));
        assert!(!sat("^1.0.0", "0.9.0"));
        assert!(!sat("^1.0.0", "2.0.0"));
        assert!(sat("~1.2.0", "1.2.9"));
        assert!(!sat("~1.2.0", "1.3.0"));
        assert!(sat("^0.2.3", "0.2.5"));
        assert!(!sat("^0.2.3", "0.3.0"));
    }

    #[test]
    fn test_comparator_sets() {
        assert!(sat(">=1.0.0 <2.0.0", "1.9.9"));
        assert!(!sat(">=1.0.0 <2.0.0", "2.0.0"));
        assert!(sat(">= 1.0.0", "1.0.0"));
        assert!(sat(">1.x", "2.0.0"));
        assert!(!sat(">1.x", "1.9.0"));
    }

    #[test]
    fn test_hyphen_and_wildcards() {
        assert!(sat("1.0.0 - 2.0.0", "2.0.0"));
        assert!(!sat("1.0.0 - 2.0.0", "2.0.1"));
        assert!(sat("1.0.0 - 2.1", "2.1.7"));
        assert!(sat("1.x", "1.8.0"));
        assert!(!sat("1.x", "2.0.0"));
        assert!(sat("1.2.*", "1.2.4"));
        assert!(sat("*", "0.0.1"));
        assert!(sat("", "3.1.4"));
        assert!(sat("latest", "3.1.4"));
    }

    #[test]
    fn test_alternatives() {
        assert!(sat("^1.0.0 || ^3.0.0", "3.2.0"));
        assert!(!sat("^1.0.0 || ^3.0.0", "2.2.0"));
    }

    #[test]
    fn test_prerelease_needs_same_tuple() {
        assert!(sat(">=1.0.0-beta.1", "1.0.0-beta.2"));
        assert!(!sat("^1.0.0", "1.1.0-alpha"));
    }

    #[test]
    fn test_non_semver_never_matches() {
        assert!(VersionRange::parse("file:../lib").is_err());
        let range = VersionRange::lenient("git+https://example.com/lib.git");
        assert!(range.is_non_semver());
        assert!(!range.satisfies(&v("1.0.0")));
        assert!(!VersionRange::lenient("next").satisfies(&v("1.0.0")));
    }

    #[test]
    fn test_display_keeps_raw() {
        assert_eq!(VersionRange::lenient(" ^1.0.0 ").to_string(), "^1.0.0");
        assert_eq!(VersionRange::lenient("").to_string(), "*");
    }

    proptest::proptest! {
        #[test]
        fn prop_exact_matches_only_itself(
            major in 0u64..50, minor in 0u64..50, patch in 0u64..50, bump in 1u64..5
        ) {
            let version = Version::new(major, minor, patch);
            let range = VersionRange::parse(&version.to_string()).unwrap();
            proptest::prop_assert!(range.satisfies(&version));
            proptest::prop_assert!(!range.satisfies(&Version::new(major, minor, patch + bump)));
        }
    }
}
