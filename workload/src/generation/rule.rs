use super::alphabet::Alphabet;
use crate::error::ConfigurationError;
use chrono::{DateTime, Utc};

/// How values for one parameter are produced
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRule {
    pub unique: bool,
    /// Chance in percent that a value is NULL
    pub null_percentage: u8,
    pub kind: RuleKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RuleKind {
    IntRange { min: i64, max: i64 },
    IntConst(i64),
    Sequential { min: i64, max: i64, wrap: bool },
    FloatRange { min: f64, max: f64 },
    FloatConst(f64),
    StringRange {
        min_len: usize,
        max_len: usize,
        alphabet: Option<Alphabet>,
    },
    StringSequence {
        min_len: usize,
        max_len: usize,
        alphabet: Option<Alphabet>,
    },
    StringConst(String),
    DateTimeRange { min: DateTime<Utc>, max: DateTime<Utc> },
    DateTimeConst(DateTime<Utc>),
    DateTimeNow,
}

impl RuleKind {
    /// Short name used in logs and `inspect` output
    pub fn label(&self) -> &'static str {
        match self {
            RuleKind::IntRange { .. } => "int_range",
            RuleKind::IntConst(_) => "int_const",
            RuleKind::Sequential { .. } => "sequential",
            RuleKind::FloatRange { .. } => "float_range",
            RuleKind::FloatConst(_) => "float_const",
            RuleKind::StringRange { .. } => "string_range",
            RuleKind::StringSequence { .. } => "string_sequence",
            RuleKind::StringConst(_) => "string_const",
            RuleKind::DateTimeRange { .. } => "datetime_range",
            RuleKind::DateTimeConst(_) => "datetime_const",
            RuleKind::DateTimeNow => "datetime_now",
        }
    }
}

impl GenerationRule {
    pub fn new(kind: RuleKind) -> Self {
        Self {
            unique: false,
            null_percentage: 0,
            kind,
        }
    }

    pub fn int_range(min: i64, max: i64) -> Self {
        Self::new(RuleKind::IntRange { min, max })
    }

    pub fn int_const(value: i64) -> Self {
        Self::new(RuleKind::IntConst(value))
    }

    /// Cycles `min..=max` in order
    pub fn sequential(min: i64, max: i64) -> Self {
        Self::new(RuleKind::Sequential {
            min,
            max,
            wrap: true,
        })
    }

    pub fn float_range(min: f64, max: f64) -> Self {
        Self::new(RuleKind::FloatRange { min, max })
    }

    pub fn float_const(value: f64) -> Self {
        Self::new(RuleKind::FloatConst(value))
    }

    pub fn string(min_len: usize, max_len: usize) -> Self {
        Self::new(RuleKind::StringRange {
            min_len,
            max_len,
            alphabet: None,
        })
    }

    pub fn string_sequence(min_len: usize, max_len: usize) -> Self {
        Self::new(RuleKind::StringSequence {
            min_len,
            max_len,
            alphabet: None,
        })
    }

    pub fn string_const(value: impl Into<String>) -> Self {
        Self::new(RuleKind::StringConst(value.into()))
    }

    pub fn datetime_range(min: DateTime<Utc>, max: DateTime<Utc>) -> Self {
        Self::new(RuleKind::DateTimeRange { min, max })
    }

    pub fn datetime_const(value: DateTime<Utc>) -> Self {
        Self::new(RuleKind::DateTimeConst(value))
    }

    pub fn now() -> Self {
        Self::new(RuleKind::DateTimeNow)
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn nullable(mut self, percentage: u8) -> Self {
        self.null_percentage = percentage;
        self
    }

    /// Disable wraparound of a sequential rule
    pub fn no_wrap(mut self) -> Self {
        if let RuleKind::Sequential { wrap, .. } = &mut self.kind {
            *wrap = false;
        }
        self
    }

    /// Replace the alphabet of a string rule
    pub fn with_alphabet(mut self, alphabet: Alphabet) -> Self {
        match &mut self.kind {
            RuleKind::StringRange { alphabet: a, .. } | RuleKind::StringSequence { alphabet: a, .. } => {
                *a = Some(alphabet);
            }
            _ => {}
        }
        self
    }

    /// Check bounds before any generator is built from the rule
    pub fn validate(&self, param: &str) -> Result<(), ConfigurationError> {
        let malformed = |what: String| {
            Err(ConfigurationError::malformed(format!(
                "param `{param}`: {what}"
            )))
        };
        if self.null_percentage > 100 {
            return malformed(format!(
                "null percentage {} is above 100",
                self.null_percentage
            ));
        }
        match &self.kind {
            RuleKind::IntRange { min, max } | RuleKind::Sequential { min, max, .. } if min > max => {
                malformed(format!("empty range {min}..={max}"))
            }
            RuleKind::FloatRange { min, max } if !(min <= max) => {
                malformed(format!("empty range {min}..={max}"))
            }
            RuleKind::StringRange {
                min_len, max_len, ..
            }
            | RuleKind::StringSequence {
                min_len, max_len, ..
            } if min_len > max_len => malformed(format!("empty length range {min_len}..={max_len}")),
            RuleKind::DateTimeRange { min, max } if min > max => {
                malformed(format!("empty datetime range {min}..={max}"))
            }
            _ => Ok(()),
        }
    }
}
