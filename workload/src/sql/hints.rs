//! Inline generator hints: `${name{min:max}}` and `${name!{min:max}}`.
//!
//! A hint narrows the range of an existing param for one statement. The
//! marker is replaced by a plain `${derived}` placeholder that refers to a
//! copy of the param with the new bounds. `!` marks the copy unique, and a
//! single bound is taken as the maximum.

use crate::error::ConfigurationError;
use crate::generation::{GenerationRule, RuleKind};
use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;

static HINT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([^!{}\s]+)(!?)\{([^}]*?)\}\}").expect("hint regex is valid")
});

#[derive(Debug, Clone, PartialEq)]
pub struct InlineHint {
    /// Param the hint refers to
    pub param: String,
    pub unique: bool,
    pub min: Option<String>,
    pub max: String,
    /// Marker position in the statement
    pub span: Range<usize>,
}

impl InlineHint {
    /// Name of the param created for this hint
    pub fn derived_name(&self) -> String {
        let min = self.min.as_deref().unwrap_or("");
        let unique = if self.unique { "u" } else { "" };
        let sanitize = |s: &str| -> String {
            s.chars()
                .map(|c| match c {
                    '-' => 'm',
                    '.' => 'p',
                    c => c,
                })
                .collect()
        };
        format!("{}__{unique}{}_{}", self.param, sanitize(min), sanitize(&self.max))
    }

    fn marker(&self) -> String {
        let bang = if self.unique { "!" } else { "" };
        match &self.min {
            Some(min) => format!("${{{}{bang}{{{min}:{}}}}}", self.param, self.max),
            None => format!("${{{}{bang}{{{}}}}}", self.param, self.max),
        }
    }

    fn invalid(&self, reason: impl Into<String>) -> ConfigurationError {
        ConfigurationError::InvalidHint {
            hint: self.marker(),
            reason: reason.into(),
        }
    }

    fn bound<T: std::str::FromStr>(&self, raw: &str) -> Result<T, ConfigurationError> {
        raw.trim()
            .parse()
            .map_err(|_| self.invalid(format!("`{raw}` is not a valid bound")))
    }

    /// Copy `base` with the hinted bounds applied
    pub fn apply(&self, base: &GenerationRule) -> Result<GenerationRule, ConfigurationError> {
        let mut rule = base.clone();
        rule.unique = base.unique || self.unique;
        rule.kind = match &base.kind {
            RuleKind::IntRange { min, .. } | RuleKind::IntConst(min) => {
                let max: i64 = self.bound(&self.max)?;
                let min = self.min.as_deref().map(|m| self.bound(m)).transpose()?.unwrap_or(*min);
                RuleKind::IntRange { min, max }
            }
            RuleKind::Sequential { min, wrap, .. } => {
                let max: i64 = self.bound(&self.max)?;
                let min = self.min.as_deref().map(|m| self.bound(m)).transpose()?.unwrap_or(*min);
                RuleKind::Sequential { min, max, wrap: *wrap }
            }
            RuleKind::FloatRange { min, .. } | RuleKind::FloatConst(min) => {
                let max: f64 = self.bound(&self.max)?;
                let min = self.min.as_deref().map(|m| self.bound(m)).transpose()?.unwrap_or(*min);
                RuleKind::FloatRange { min, max }
            }
            RuleKind::StringRange {
                min_len, alphabet, ..
            } => {
                let max_len: usize = self.bound(&self.max)?;
                let min_len = self
                    .min
                    .as_deref()
                    .map(|m| self.bound(m))
                    .transpose()?
                    .unwrap_or(*min_len);
                RuleKind::StringRange {
                    min_len,
                    max_len,
                    alphabet: alphabet.clone(),
                }
            }
            RuleKind::StringSequence {
                min_len, alphabet, ..
            } => {
                let max_len: usize = self.bound(&self.max)?;
                let min_len = self
                    .min
                    .as_deref()
                    .map(|m| self.bound(m))
                    .transpose()?
                    .unwrap_or(*min_len);
                RuleKind::StringSequence {
                    min_len,
                    max_len,
                    alphabet: alphabet.clone(),
                }
            }
            other => {
                return Err(self.invalid(format!("ranges do not apply to {} params", other.label())));
            }
        };
        rule.validate(&self.param)
            .map_err(|e| self.invalid(e.to_string()))?;
        Ok(rule)
    }
}

/// Every hint marker in `sql`, in textual order
pub fn extract_inline_hints(sql: &str) -> Result<Vec<InlineHint>, ConfigurationError> {
    HINT.captures_iter(sql)
        .map(|caps| {
            let whole = &caps[0];
            let body = caps[3].trim();
            let (min, max) = match body.split_once(':') {
                Some((min, max)) => (Some(min.trim().to_string()), max.trim().to_string()),
                None => (None, body.to_string()),
            };
            if max.is_empty() {
                return Err(ConfigurationError::InvalidHint {
                    hint: whole.to_string(),
                    reason: "missing upper bound".into(),
                });
            }
            let span = caps.get(0).map(|m| m.range()).unwrap_or_default();
            Ok(InlineHint {
                param: caps[1].to_string(),
                unique: &caps[2] == "!",
                min: min.filter(|m| !m.is_empty()),
                max,
                span,
            })
        })
        .collect()
}

/// Replace every hint marker with `${derived_name}`
pub fn rewrite_hints(sql: &str, hints: &[InlineHint]) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut last = 0;
    for hint in hints {
        out.push_str(&sql[last..hint.span.start]);
        out.push_str("${");
        out.push_str(&hint.derived_name());
        out.push('}');
        last = hint.span.end;
    }
    out.push_str(&sql[last..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_range_and_unique() {
        let hints = extract_inline_hints("SELECT ${w_id{1:10}}, ${c_id!{3000}}").unwrap();
        assert_eq!(hints.len(), 2);
        assert_eq!(hints[0].param, "w_id");
        assert_eq!(hints[0].min.as_deref(), Some("1"));
        assert_eq!(hints[0].max, "10");
        assert!(!hints[0].unique);
        assert_eq!(hints[1].param, "c_id");
        assert_eq!(hints[1].min, None);
        assert_eq!(hints[1].max, "3000");
        assert!(hints[1].unique);
    }

    #[test]
    fn test_plain_placeholders_are_not_hints() {
        assert!(extract_inline_hints("SELECT ${w_id}, :d_id").unwrap().is_empty());
    }

    #[test]
    fn test_missing_bound() {
        assert!(extract_inline_hints("SELECT ${w_id{1:}}").is_err());
    }

    #[test]
    fn test_rewrite() {
        let sql = "SELECT * FROM t WHERE a = ${a{1:5}} AND b = ${b!{-3:3}}";
        let hints = extract_inline_hints(sql).unwrap();
        assert_eq!(
            rewrite_hints(sql, &hints),
            "SELECT * FROM t WHERE a = ${a__1_5} AND b = ${b__um3_3}"
        );
    }

    #[test]
    fn test_apply_keeps_missing_min() {
        let hint = &extract_inline_hints("${qty{20}}").unwrap()[0];
        let rule = hint.apply(&GenerationRule::int_range(5, 100)).unwrap();
        assert_eq!(rule.kind, RuleKind::IntRange { min: 5, max: 20 });
    }

    #[test]
    fn test_apply_to_strings_and_floats() {
        let hint = &extract_inline_hints("${name!{3:8}}").unwrap()[0];
        let rule = hint.apply(&GenerationRule::string(1, 100)).unwrap();
        assert!(rule.unique);
        assert!(matches!(rule.kind, RuleKind::StringRange { min_len: 3, max_len: 8, .. }));

        let hint = &extract_inline_hints("${price{0.5:9.5}}").unwrap()[0];
        let rule = hint.apply(&GenerationRule::float_const(1.0)).unwrap();
        assert_eq!(rule.kind, RuleKind::FloatRange { min: 0.5, max: 9.5 });
    }

    #[test]
    fn test_apply_rejects_bad_bounds() {
        let hint = &extract_inline_hints("${d{a:b}}").unwrap()[0];
        assert!(hint.apply(&GenerationRule::int_range(1, 2)).is_err());

        let hint = &extract_inline_hints("${d{9:1}}").unwrap()[0];
        assert!(hint.apply(&GenerationRule::int_range(1, 2)).is_err());

        let hint = &extract_inline_hints("${d{1:2}}").unwrap()[0];
        assert!(hint.apply(&GenerationRule::now()).is_err());
    }
}
