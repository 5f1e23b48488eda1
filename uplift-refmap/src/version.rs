//! Version parsing and version-range predicates.
//!
//! Supported range grammar:
//! - `*` or empty: any version
//! - `1.2.3`: exactly that version (`1.2 == 1.2.0`)
//! - `1.2.*`: any version with that prefix
//! - `>=1.0, <2.0`: comparator list (`=`, `>`, `>=`, `<`, `<=`), all must hold
//! - `[1.0,2.0)`, `(,3.0]`, `[1.2]`: interval notation
//!
//! An unversioned reference satisfies every range.

use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid version range '{range}': {reason}")]
pub struct VersionRangeError {
    pub range: String,
    pub reason: String,
}

impl VersionRangeError {
    fn new(range: &str, reason: impl Into<String>) -> Self {
        Self {
            range: range.to_string(),
            reason: reason.into(),
        }
    }
}

/// Dotted numeric release with an optional pre-release tag.
#[derive(Debug, Clone)]
pub struct Version {
    release: Vec<u64>,
    pre: Option<String>,
}

impl Version {
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        // Build metadata never participates in ordering.
        let s = s.split('+').next().unwrap_or(s);
        let (release, pre) = match s.split_once('-') {
            Some((r, p)) if !p.is_empty() => (r, Some(p.to_ascii_lowercase())),
            Some(_) => return None,
            None => (s, None),
        };
        if release.is_empty() {
            return None;
        }

        let release = release
            .split('.')
            .map(|seg| seg.parse::<u64>().ok())
            .collect::<Option<Vec<_>>>()?;

        Some(Self { release, pre })
    }

    fn segment(&self, idx: usize) -> u64 {
        self.release.get(idx).copied().unwrap_or(0)
    }

    /// Smallest release above every version sharing this prefix. `None` on overflow.
    fn bump_last(&self) -> Option<Self> {
        let mut release = self.release.clone();
        if let Some(last) = release.last_mut() {
            *last = last.checked_add(1)?;
        }
        Some(Self { release, pre: None })
    }

    /// Parse a declared requirement, accepting Cargo's `^`, `~` and `=` operators.
    ///
    /// The operator is dropped and the base version is what ranges are matched against.
    pub fn parse_declared(s: &str) -> Option<Self> {
        let s = s.trim();
        let s = s
            .strip_prefix('^')
            .or_else(|| s.strip_prefix('~'))
            .or_else(|| s.strip_prefix('='))
            .unwrap_or(s);
        Self::parse(s)
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let width = self.release.len().max(other.release.len());
        for idx in 0..width {
            match self.segment(idx).cmp(&other.segment(idx)) {
                Ordering::Equal => continue,
                non_eq => return non_eq,
            }
        }
        match (&self.pre, &other.pre) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(a), Some(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Eq,
    Gt,
    Ge,
    Lt,
    Le,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Comparator {
    op: Op,
    version: Version,
}

impl Comparator {
    fn new(op: Op, version: Version) -> Self {
        Self { op, version }
    }

    fn holds(&self, v: &Version) -> bool {
        let ord = v.cmp(&self.version);
        match self.op {
            Op::Eq => ord == Ordering::Equal,
            Op::Gt => ord == Ordering::Greater,
            Op::Ge => ord != Ordering::Less,
            Op::Lt => ord == Ordering::Less,
            Op::Le => ord != Ordering::Greater,
        }
    }
}

/// A predicate over versions. An empty comparator set accepts everything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    raw: String,
    comparators: Vec<Comparator>,
}

impl VersionRange {
    pub fn any() -> Self {
        Self {
            raw: "*".to_string(),
            comparators: vec![],
        }
    }

    pub fn parse(s: &str) -> Result<Self, VersionRangeError> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed == "*" {
            return Ok(Self::any());
        }

        let comparators = if trimmed.starts_with('[') || trimmed.starts_with('(') {
            parse_interval(trimmed)?
        } else {
            parse_comparators(trimmed)?
        };

        Ok(Self {
            raw: trimmed.to_string(),
            comparators,
        })
    }

    pub fn is_any(&self) -> bool {
        self.comparators.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// `None` is an unversioned reference and always matches.
    pub fn matches(&self, version: Option<&str>) -> bool {
        let Some(raw) = version else {
            return true;
        };
        if self.is_any() {
            return true;
        }

        // Non-numeric versions (property placeholders, channels) never satisfy a bounded range.
        match Version::parse_declared(raw) {
            Some(v) => self.comparators.iter().all(|c| c.holds(&v)),
            None => false,
        }
    }
}

impl Default for VersionRange {
    fn default() -> Self {
        Self::any()
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn parse_version(range: &str, raw: &str) -> Result<Version, VersionRangeError> {
    Version::parse(raw).ok_or_else(|| VersionRangeError::new(range, format!("bad version '{raw}'")))
}

fn parse_comparators(range: &str) -> Result<Vec<Comparator>, VersionRangeError> {
    let mut out = Vec::new();
    for part in range.split(',') {
        let part = part.trim();
        if part.is_empty() {
            return Err(VersionRangeError::new(range, "empty comparator"));
        }

        let (op, rest) = if let Some(r) = part.strip_prefix(">=") {
            (Op::Ge, r)
        } else if let Some(r) = part.strip_prefix("<=") {
            (Op::Le, r)
        } else if let Some(r) = part.strip_prefix('>') {
            (Op::Gt, r)
        } else if let Some(r) = part.strip_prefix('<') {
            (Op::Lt, r)
        } else if let Some(r) = part.strip_prefix('=') {
            (Op::Eq, r)
        } else {
            (Op::Eq, part)
        };
        let rest = rest.trim();

        if op == Op::Eq
            && let Some(prefix) = rest.strip_suffix(".*")
        {
            let lower = parse_version(range, prefix)?;
            let upper = lower
                .bump_last()
                .ok_or_else(|| VersionRangeError::new(range, "prefix has no upper bound"))?;
            out.push(Comparator::new(Op::Ge, lower));
            out.push(Comparator::new(Op::Lt, upper));
            continue;
        }

        let version = parse_version(range, rest)?;
        out.push(Comparator::new(op, version));
    }
    Ok(out)
}

fn parse_interval(range: &str) -> Result<Vec<Comparator>, VersionRangeError> {
    let lower_inclusive = range.starts_with('[');
    let upper_inclusive = match range.chars().last() {
        Some(']') => true,
        Some(')') => false,
        _ => return Err(VersionRangeError::new(range, "unterminated interval")),
    };
    let inner = &range[1..range.len() - 1];

    let Some((lo, hi)) = inner.split_once(',') else {
        // `[1.2]` pins exactly one version.
        if !(lower_inclusive && upper_inclusive) {
            return Err(VersionRangeError::new(range, "single-version interval must use [ ]"));
        }
        let v = parse_version(range, inner.trim())?;
        return Ok(vec![Comparator::new(Op::Eq, v)]);
    };

    let (lo, hi) = (lo.trim(), hi.trim());
    if lo.is_empty() && hi.is_empty() {
        return Err(VersionRangeError::new(range, "interval has no bounds"));
    }
    if hi.contains(',') {
        return Err(VersionRangeError::new(range, "too many bounds"));
    }

    let mut out = Vec::new();
    if !lo.is_empty() {
        let op = if lower_inclusive { Op::Ge } else { Op::Gt };
        out.push(Comparator::new(op, parse_version(range, lo)?));
    }
    if !hi.is_empty() {
        let op = if upper_inclusive { Op::Le } else { Op::Lt };
        out.push(Comparator::new(op, parse_version(range, hi)?));
    }
    Ok(out)
}
