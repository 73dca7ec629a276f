use crate::config::schema::PatternDef;
use crate::error::KpiError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which capture groups of a pattern carry the year and the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureScheme {
    /// One group: the score.
    Score,
    /// Two groups: a 4-digit year, then the score.
    YearScore,
}

impl CaptureScheme {
    /// Number of explicit capture groups this scheme expects.
    pub fn group_count(self) -> usize {
        match self {
            CaptureScheme::Score => 1,
            CaptureScheme::YearScore => 2,
        }
    }

    fn from_group_count(count: usize) -> Option<CaptureScheme> {
        match count {
            1 => Some(CaptureScheme::Score),
            2 => Some(CaptureScheme::YearScore),
            _ => None,
        }
    }
}

impl fmt::Display for CaptureScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureScheme::Score => write!(f, "score"),
            CaptureScheme::YearScore => write!(f, "year+score"),
        }
    }
}

/// A compiled KPI statement pattern.
#[derive(Debug, Clone)]
pub struct Pattern {
    expression: String,
    scheme: CaptureScheme,
    regex: Regex,
}

impl Pattern {
    /// Compile a pattern, inferring the capture scheme from its group count.
    pub fn new(expression: &str) -> Result<Pattern, KpiError> {
        Self::compile(expression, None)
    }

    /// Compile a pattern with an explicit scheme. The expression must have
    /// exactly the number of groups the scheme expects.
    pub fn with_scheme(expression: &str, scheme: CaptureScheme) -> Result<Pattern, KpiError> {
        Self::compile(expression, Some(scheme))
    }

    fn compile(expression: &str, scheme: Option<CaptureScheme>) -> Result<Pattern, KpiError> {
        let regex = Regex::new(expression).map_err(|e| KpiError::InvalidPattern {
            expression: expression.to_string(),
            reason: e.to_string(),
        })?;

        // captures_len() counts the implicit whole-match group
        let groups = regex.captures_len() - 1;
        let inferred =
            CaptureScheme::from_group_count(groups).ok_or_else(|| KpiError::InvalidPattern {
                expression: expression.to_string(),
                reason: format!("expected 1 or 2 capture groups, found {groups}"),
            })?;

        if let Some(explicit) = scheme {
            if explicit != inferred {
                return Err(KpiError::InvalidPattern {
                    expression: expression.to_string(),
                    reason: format!(
                        "scheme '{explicit}' needs {} capture group(s), found {groups}",
                        explicit.group_count()
                    ),
                });
            }
        }

        Ok(Pattern {
            expression: expression.to_string(),
            scheme: inferred,
            regex,
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn scheme(&self) -> CaptureScheme {
        self.scheme
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.expression == other.expression
    }
}

impl Eq for Pattern {}

/// Ordered, append-only list of patterns.
///
/// Order is match priority: the classifier stops at the first pattern that
/// matches anywhere in the text, so year-bearing and otherwise more specific
/// patterns have to come before the general ones.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<Pattern>,
}

impl PatternSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile configuration entries in order.
    pub fn compile(defs: &[PatternDef]) -> Result<PatternSet, KpiError> {
        let mut set = PatternSet::new();
        for def in defs {
            let pattern = match def.scheme() {
                Some(scheme) => Pattern::with_scheme(def.expression(), scheme)?,
                None => Pattern::new(def.expression())?,
            };
            set.add(pattern);
        }
        Ok(set)
    }

    /// Append a pattern unless one with the same expression is already present.
    /// Returns true if it was inserted.
    pub fn add(&mut self, pattern: Pattern) -> bool {
        if self.patterns.iter().any(|p| p == &pattern) {
            return false;
        }
        self.patterns.push(pattern);
        true
    }

    /// Patterns in priority order.
    pub fn list(&self) -> &[Pattern] {
        &self.patterns
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Positional configuration form of this set.
    pub fn to_defs(&self) -> Vec<PatternDef> {
        self.patterns
            .iter()
            .map(|p| PatternDef::Bare(p.expression.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_inferred_from_groups() {
        let p = Pattern::new(r"(\d{4})年KPI(\d{1,3})分").unwrap();
        assert_eq!(p.scheme(), CaptureScheme::YearScore);

        let p = Pattern::new(r"自评(\d{1,3})分").unwrap();
        assert_eq!(p.scheme(), CaptureScheme::Score);
    }

    #[test]
    fn test_no_groups_rejected() {
        assert!(matches!(
            Pattern::new("KPI自评"),
            Err(KpiError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_three_groups_rejected() {
        assert!(Pattern::new(r"(\d)(\d)(\d)").is_err());
    }

    #[test]
    fn test_malformed_regex_rejected() {
        assert!(Pattern::new(r"自评(\d{1,3}分").is_err());
    }

    #[test]
    fn test_explicit_scheme_must_match_groups() {
        assert!(Pattern::with_scheme(r"自评(\d+)分", CaptureScheme::YearScore).is_err());
        assert!(Pattern::with_scheme(r"自评(\d+)分", CaptureScheme::Score).is_ok());
    }

    #[test]
    fn test_add_keeps_order_and_skips_duplicates() {
        let mut set = PatternSet::new();
        assert!(set.add(Pattern::new(r"a(\d)").unwrap()));
        assert!(set.add(Pattern::new(r"b(\d)").unwrap()));
        assert!(!set.add(Pattern::new(r"a(\d)").unwrap()));
        assert!(set.add(Pattern::new(r"c(\d)").unwrap()));

        let exprs: Vec<&str> = set.list().iter().map(|p| p.expression()).collect();
        assert_eq!(exprs, vec![r"a(\d)", r"b(\d)", r"c(\d)"]);
    }

    #[test]
    fn test_to_defs_preserves_order() {
        let defs = vec![
            PatternDef::Bare(r"z(\d)".into()),
            PatternDef::Bare(r"a(\d)".into()),
        ];
        let set = PatternSet::compile(&defs).unwrap();
        assert_eq!(set.to_defs(), defs);
    }
}
