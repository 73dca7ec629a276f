use crate::classify::outcome::{KpiStatement, Verdict};
use crate::error::KpiError;
use crate::pattern::{CaptureScheme, Pattern, PatternSet};
use regex::Captures;

/// Classifies text blocks against an ordered pattern set.
#[derive(Debug, Clone)]
pub struct Classifier {
    patterns: PatternSet,
}

impl Classifier {
    pub fn new(patterns: PatternSet) -> Self {
        Classifier { patterns }
    }

    /// Look for a KPI statement anywhere in `text`.
    ///
    /// Patterns are tried in order and the first one that matches wins;
    /// the ones after it are never evaluated. Within the winning pattern the
    /// leftmost match is used.
    pub fn classify(&self, text: &str) -> Result<Verdict, KpiError> {
        if text.is_empty() {
            return Ok(Verdict::absent());
        }

        for (index, pattern) in self.patterns.list().iter().enumerate() {
            if let Some(caps) = pattern.regex().captures(text) {
                return extract(index, pattern, &caps).map(Verdict::found);
            }
        }

        Ok(Verdict::absent())
    }
}

fn extract(index: usize, pattern: &Pattern, caps: &Captures<'_>) -> Result<KpiStatement, KpiError> {
    let (year_group, score_group) = match pattern.scheme() {
        CaptureScheme::Score => (None, 1),
        CaptureScheme::YearScore => (Some(1), 2),
    };

    let score = capture_number(pattern, caps, score_group, "score")?;
    let year = year_group
        .map(|group| capture_number(pattern, caps, group, "year"))
        .transpose()?;

    Ok(KpiStatement {
        score,
        year,
        pattern_index: index,
        pattern: pattern.expression().to_string(),
        matched_text: caps
            .get(0)
            .map(|m| m.as_str().to_string())
            .unwrap_or_default(),
    })
}

fn capture_number(
    pattern: &Pattern,
    caps: &Captures<'_>,
    group: usize,
    capture: &'static str,
) -> Result<u32, KpiError> {
    let raw = caps.get(group).map(|m| m.as_str()).unwrap_or_default();
    parse_decimal_digits(raw).ok_or_else(|| KpiError::Extraction {
        pattern: pattern.expression().to_string(),
        capture,
        value: raw.to_string(),
    })
}

/// Parse a base-10 number made of ASCII or full-width digits.
///
/// `\d` is Unicode-aware, so a pattern can capture "８５" from
/// full-width text.
fn parse_decimal_digits(s: &str) -> Option<u32> {
    if s.is_empty() {
        return None;
    }
    s.chars().try_fold(0u32, |acc, c| {
        let digit = match c {
            '0'..='9' => c as u32 - '0' as u32,
            '０'..='９' => c as u32 - '０' as u32,
            _ => return None,
        };
        acc.checked_mul(10)?.checked_add(digit)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::builtin;

    fn default_classifier() -> Classifier {
        Classifier::new(PatternSet::compile(&builtin::defaults().kpi_patterns).unwrap())
    }

    #[test]
    fn test_year_and_score() {
        let v = default_classifier()
            .classify("2024年第四季度KPI考核自评85分")
            .unwrap();
        assert!(v.is_present());
        assert_eq!(v.score(), Some(85));
        assert_eq!(v.year(), Some(2024));
        assert_eq!(
            v.matched_pattern(),
            Some(builtin::defaults().kpi_patterns[0].expression())
        );
        let st = v.statement.unwrap();
        assert_eq!(st.pattern_index, 0);
        assert_eq!(st.matched_text, "2024年第四季度KPI考核自评85分");
    }

    #[test]
    fn test_no_statement() {
        let v = default_classifier()
            .classify("本季度工作总结：无相关内容")
            .unwrap();
        assert_eq!(v, Verdict::absent());
        assert_eq!(v.score(), None);
        assert_eq!(v.year(), None);
        assert_eq!(v.matched_text(), None);
    }

    #[test]
    fn test_score_only_with_spaces() {
        let v = default_classifier().classify("KPI 自评得分 94 分").unwrap();
        assert_eq!(v.score(), Some(94));
        assert_eq!(v.year(), None);
        assert_eq!(v.statement.unwrap().pattern_index, 2);
    }

    #[test]
    fn test_empty_and_whitespace_text() {
        let c = default_classifier();
        assert!(!c.classify("").unwrap().is_present());
        assert!(!c.classify("  \n\t ").unwrap().is_present());
    }

    #[test]
    fn test_match_mid_text() {
        let text = "一、工作完成情况\n二、存在问题\n本人季度KPI考核自评96分，请领导审阅。";
        let v = default_classifier().classify(text).unwrap();
        assert_eq!(v.score(), Some(96));
        assert_eq!(v.matched_text(), Some("季度KPI考核自评96分"));
    }

    #[test]
    fn test_earlier_pattern_wins_even_when_later_in_text() {
        // Score-only statement comes first in the text, year-bearing one last.
        let text = "KPI 自评得分 70 分\n附注\n2023年第二季度KPI考核自评88分";
        let v = default_classifier().classify(text).unwrap();
        assert_eq!(v.score(), Some(88));
        assert_eq!(v.year(), Some(2023));
        assert_eq!(v.statement.unwrap().pattern_index, 0);
    }

    #[test]
    fn test_leftmost_match_within_pattern() {
        let text = "自评得分 60 分；复核后自评得分 75 分";
        let v = default_classifier().classify(text).unwrap();
        assert_eq!(v.score(), Some(60));
    }

    #[test]
    fn test_scores_above_hundred_pass_through() {
        let v = default_classifier().classify("KPI考核自评120分").unwrap();
        assert_eq!(v.score(), Some(120));
    }

    #[test]
    fn test_full_width_digits() {
        let v = default_classifier().classify("自评得分８５分").unwrap();
        assert_eq!(v.score(), Some(85));
    }

    #[test]
    fn test_non_numeric_capture_is_an_error() {
        let mut set = PatternSet::new();
        set.add(Pattern::new(r"自评(\w+)分").unwrap());
        let err = Classifier::new(set).classify("自评优秀分").unwrap_err();
        assert!(matches!(err, KpiError::Extraction { capture: "score", .. }));
    }

    #[test]
    fn test_classify_is_repeatable() {
        let c = default_classifier();
        let text = "2024年第一季度KPI考核自评90分";
        assert_eq!(c.classify(text).unwrap(), c.classify(text).unwrap());
    }

    #[test]
    fn test_parse_decimal_digits() {
        assert_eq!(parse_decimal_digits("085"), Some(85));
        assert_eq!(parse_decimal_digits("１００"), Some(100));
        assert_eq!(parse_decimal_digits(""), None);
        assert_eq!(parse_decimal_digits("8a"), None);
        assert_eq!(parse_decimal_digits("99999999999"), None);
    }
}
