//! Maven version ranges: parsing, intersection, and version selection.
//!
//! A range is an optional recommended version plus a sorted list of disjoint
//! restrictions. A bare version such as `1.5` is a *soft* requirement: it
//! recommends `1.5` but accepts anything. Bracketed specs such as
//! `[1.0,2.0)` or `(,1.0],[1.2,)` are hard requirements with no
//! recommendation. A *pinned* range carries a recommendation and no
//! restrictions at all; management and mediation produce those.

use std::cmp::Ordering;
use std::fmt;

use thiserror::Error;

use crate::artifact::Artifact;
use crate::version::MavenVersion;

/// One end of a [`Restriction`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bound {
    pub version: MavenVersion,
    pub inclusive: bool,
}

impl Bound {
    fn new(version: MavenVersion, inclusive: bool) -> Self {
        Self { version, inclusive }
    }
}

/// A single interval of acceptable versions. A missing bound is unbounded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Restriction {
    pub lower: Option<Bound>,
    pub upper: Option<Bound>,
}

impl Restriction {
    /// The restriction that accepts every version.
    pub fn everything() -> Self {
        Self {
            lower: None,
            upper: None,
        }
    }

    /// `[version]`: exactly one version.
    pub fn exact(version: MavenVersion) -> Self {
        Self {
            lower: Some(Bound::new(version.clone(), true)),
            upper: Some(Bound::new(version, true)),
        }
    }

    /// Check if a version satisfies this restriction.
    pub fn contains(&self, version: &MavenVersion) -> bool {
        if let Some(ref lower) = self.lower {
            match version.cmp(&lower.version) {
                Ordering::Less => return false,
                Ordering::Equal if !lower.inclusive => return false,
                _ => {}
            }
        }
        if let Some(ref upper) = self.upper {
            match version.cmp(&upper.version) {
                Ordering::Greater => return false,
                Ordering::Equal if !upper.inclusive => return false,
                _ => {}
            }
        }
        true
    }

    /// The overlap of two restrictions, or `None` when they share no version.
    pub fn intersect(&self, other: &Restriction) -> Option<Restriction> {
        let lower = tighter(self.lower.as_ref(), other.lower.as_ref(), Ordering::Greater);
        let upper = tighter(self.upper.as_ref(), other.upper.as_ref(), Ordering::Less);
        let candidate = Restriction { lower, upper };
        (!candidate.is_empty()).then_some(candidate)
    }

    fn is_empty(&self) -> bool {
        match (&self.lower, &self.upper) {
            (Some(lower), Some(upper)) => match lower.version.cmp(&upper.version) {
                Ordering::Greater => true,
                Ordering::Equal => !(lower.inclusive && upper.inclusive),
                Ordering::Less => false,
            },
            _ => false,
        }
    }

    fn is_exact(&self) -> bool {
        matches!(
            (&self.lower, &self.upper),
            (Some(l), Some(u)) if l.inclusive && u.inclusive && l.version == u.version
        )
    }

    /// Ordering by lower bound; unbounded sorts first.
    fn cmp_lower(&self, other: &Restriction) -> Ordering {
        match (&self.lower, &other.lower) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(a), Some(b)) => a
                .version
                .cmp(&b.version)
                .then_with(|| b.inclusive.cmp(&a.inclusive)),
        }
    }

    /// True when every version of `self` lies strictly below every version of `next`.
    fn precedes(&self, next: &Restriction) -> bool {
        match (&self.upper, &next.lower) {
            (Some(upper), Some(lower)) => match upper.version.cmp(&lower.version) {
                Ordering::Less => true,
                Ordering::Equal => !(upper.inclusive && lower.inclusive),
                Ordering::Greater => false,
            },
            _ => false,
        }
    }
}

/// Pick the more restrictive of two bounds. `wanted` is the ordering a
/// tighter version has against the looser one (`Greater` for lower bounds).
fn tighter(a: Option<&Bound>, b: Option<&Bound>, wanted: Ordering) -> Option<Bound> {
    match (a, b) {
        (None, None) => None,
        (Some(x), None) | (None, Some(x)) => Some(x.clone()),
        (Some(x), Some(y)) => {
            let ord = x.version.cmp(&y.version);
            if ord == Ordering::Equal {
                Some(Bound::new(x.version.clone(), x.inclusive && y.inclusive))
            } else if ord == wanted {
                Some(x.clone())
            } else {
                Some(y.clone())
            }
        }
    }
}

impl fmt::Display for Restriction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_exact() {
            if let Some(ref lower) = self.lower {
                return write!(f, "[{}]", lower.version);
            }
        }
        match self.lower {
            Some(ref l) => write!(f, "{}{}", if l.inclusive { '[' } else { '(' }, l.version)?,
            None => f.write_str("(")?,
        }
        f.write_str(",")?;
        match self.upper {
            Some(ref u) => write!(f, "{}{}", u.version, if u.inclusive { ']' } else { ')' }),
            None => f.write_str(")"),
        }
    }
}

/// A version specification that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidVersionSpec {
    #[error("empty version specification")]
    Empty,

    #[error("invalid version range `{spec}`: {reason}")]
    Malformed { spec: String, reason: String },
}

/// Two ranges that share no acceptable version.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("version ranges {left} and {right} have no version in common")]
pub struct Unsatisfiable {
    pub left: String,
    pub right: String,
}

/// A Maven version requirement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionRange {
    recommended: Option<MavenVersion>,
    restrictions: Vec<Restriction>,
}

impl VersionRange {
    /// Parse a Maven version specification.
    ///
    /// Supports soft versions (`1.0`), exact versions (`[1.0]`), intervals
    /// (`[1.0,2.0)`, `(,2.0]`, `[1.0,)`) and comma separated interval sets
    /// (`(,1.0],[1.2,)`).
    pub fn parse(spec: &str) -> Result<Self, InvalidVersionSpec> {
        let s = spec.trim();
        if s.is_empty() {
            return Err(InvalidVersionSpec::Empty);
        }
        let malformed = |reason: &str| InvalidVersionSpec::Malformed {
            spec: s.to_string(),
            reason: reason.to_string(),
        };

        if !s.starts_with(['[', '(']) {
            if s.contains(['[', ']', '(', ')', ',']) {
                return Err(malformed("unbalanced brackets"));
            }
            return Ok(Self::soft(MavenVersion::parse(s)));
        }

        let mut restrictions: Vec<Restriction> = Vec::new();
        let mut rest = s;
        while !rest.is_empty() {
            if !rest.starts_with(['[', '(']) {
                return Err(malformed("expected `[` or `(`"));
            }
            let close = rest
                .find([']', ')'])
                .ok_or_else(|| malformed("missing closing bracket"))?;
            let restriction = parse_restriction(&rest[..=close]).map_err(|r| malformed(&r))?;
            if let Some(previous) = restrictions.last() {
                if !previous.precedes(&restriction) {
                    return Err(malformed("ranges overlap or are out of order"));
                }
            }
            restrictions.push(restriction);

            rest = rest[close + 1..].trim_start();
            if let Some(next) = rest.strip_prefix(',') {
                rest = next.trim_start();
                if rest.is_empty() {
                    return Err(malformed("trailing comma"));
                }
            } else if !rest.is_empty() {
                return Err(malformed("ranges must be separated by `,`"));
            }
        }

        Ok(Self {
            recommended: None,
            restrictions,
        })
    }

    /// A soft requirement: recommends `version` but accepts any version.
    pub fn soft(version: MavenVersion) -> Self {
        Self {
            recommended: Some(version),
            restrictions: vec![Restriction::everything()],
        }
    }

    /// A pinned version with no restrictions left to negotiate.
    pub fn pinned(version: MavenVersion) -> Self {
        Self {
            recommended: Some(version),
            restrictions: Vec::new(),
        }
    }

    pub fn recommended(&self) -> Option<&MavenVersion> {
        self.recommended.as_ref()
    }

    pub fn restrictions(&self) -> &[Restriction] {
        &self.restrictions
    }

    /// True for an actual range: restrictions and no recommended version.
    pub fn has_restrictions(&self) -> bool {
        !self.restrictions.is_empty() && self.recommended.is_none()
    }

    /// True when nothing is left to select from.
    pub fn is_empty(&self) -> bool {
        self.restrictions.is_empty() && self.recommended.is_none()
    }

    /// Check if a version satisfies the range. A pinned range only accepts
    /// its own version.
    pub fn contains(&self, version: &MavenVersion) -> bool {
        if self.restrictions.is_empty() {
            return self.recommended.as_ref() == Some(version);
        }
        self.restrictions.iter().any(|r| r.contains(version))
    }

    /// Intersect two ranges.
    ///
    /// The restrictions of the result are the pairwise intersections of both
    /// sides; a side without restrictions yields a result without
    /// restrictions. The recommended version is the greatest recommendation
    /// still compatible with the result, so the operation is commutative.
    pub fn restrict(&self, other: &VersionRange) -> Result<VersionRange, Unsatisfiable> {
        let unsatisfiable = || Unsatisfiable {
            left: self.to_string(),
            right: other.to_string(),
        };

        if self.restrictions.is_empty() || other.restrictions.is_empty() {
            let compatible = |v: &&MavenVersion, against: &VersionRange| {
                against.restrictions.is_empty() || against.contains(v)
            };
            let recommended = self
                .recommended
                .iter()
                .filter(|v| compatible(v, other))
                .chain(other.recommended.iter().filter(|v| compatible(v, self)))
                .max()
                .cloned();
            return match recommended {
                Some(v) => Ok(Self::pinned(v)),
                None => Err(unsatisfiable()),
            };
        }

        let mut restrictions: Vec<Restriction> = self
            .restrictions
            .iter()
            .flat_map(|a| other.restrictions.iter().filter_map(move |b| a.intersect(b)))
            .collect();
        if restrictions.is_empty() {
            return Err(unsatisfiable());
        }
        restrictions.sort_by(Restriction::cmp_lower);

        let recommended = self
            .recommended
            .iter()
            .chain(other.recommended.iter())
            .filter(|v| restrictions.iter().any(|r| r.contains(v)))
            .max()
            .cloned();

        Ok(Self {
            recommended,
            restrictions,
        })
    }

    /// Re-apply a side's own recommendation after [`restrict`](Self::restrict)
    /// when it still satisfies the restricted range.
    pub fn prefer(mut self, version: Option<&MavenVersion>) -> Self {
        if let Some(v) = version {
            if self.restrictions.is_empty() || self.contains(v) {
                self.recommended = Some(v.clone());
            }
        }
        self
    }

    /// The greatest candidate inside the range. A range without restrictions
    /// answers with its recommended version.
    pub fn match_version(&self, candidates: &[MavenVersion]) -> Option<MavenVersion> {
        if self.restrictions.is_empty() {
            return self.recommended.clone();
        }
        candidates
            .iter()
            .filter(|v| self.restrictions.iter().any(|r| r.contains(v)))
            .max()
            .cloned()
    }

    /// True if the artifact already carries a concrete version the range accepts.
    pub fn is_selected_version_known(&self, artifact: &Artifact) -> bool {
        artifact
            .version()
            .is_some_and(|v| self.contains(&MavenVersion::parse(v)))
    }
}

fn parse_restriction(spec: &str) -> Result<Restriction, String> {
    let lower_inclusive = spec.starts_with('[');
    let upper_inclusive = spec.ends_with(']');
    let inner = spec[1..spec.len() - 1].trim();

    let Some((lower, upper)) = inner.split_once(',') else {
        if inner.is_empty() {
            return Err("missing version".to_string());
        }
        if !(lower_inclusive && upper_inclusive) {
            return Err("a single version must be surrounded by `[]`".to_string());
        }
        return Ok(Restriction::exact(MavenVersion::parse(inner)));
    };
    if upper.contains(',') {
        return Err("an interval has at most two bounds".to_string());
    }

    let bound = |text: &str, inclusive: bool| {
        let text = text.trim();
        (!text.is_empty()).then(|| Bound::new(MavenVersion::parse(text), inclusive))
    };
    let restriction = Restriction {
        lower: bound(lower, lower_inclusive),
        upper: bound(upper, upper_inclusive),
    };
    if restriction.is_empty() {
        return Err("range defies version ordering".to_string());
    }
    Ok(restriction)
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref v) = self.recommended {
            return write!(f, "{v}");
        }
        if self.restrictions.is_empty() {
            return f.write_str("[]");
        }
        for (i, r) in self.restrictions.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{r}")?;
        }
        Ok(())
    }
}
