//! Value generators.
//!
//! A [`GenerationRule`] describes values; a [`ParamGenerator`] is the stateful
//! object built from it. Generators for several parameters are bundled into a
//! [`GeneratorSet`], which also drives [`GroupGenerator`]s so correlated
//! columns advance together.

pub mod alphabet;
pub mod group;
pub mod int;
pub mod rule;
pub mod set;
pub mod string;

pub use alphabet::Alphabet;
pub use group::GroupGenerator;
pub use int::{RandomIntRange, SequentialInt, UniqueIntRange};
pub use rule::{GenerationRule, RuleKind};
pub use set::{Capacity, GeneratorSet};
pub use string::{RandomString, SequentialString};

use crate::error::GenerationError;
use crate::value::Value;
use chrono::{DateTime, Utc};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::HashSet;

/// Random source owned by every generator
pub type GenRng = ChaCha8Rng;

/// Consecutive collisions tolerated by unique float and datetime draws
const MAX_COLLISIONS: usize = 64;

/// Derive a stable seed for a named generator from a base seed (FNV-1a)
pub fn derive_seed(base: u64, label: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325 ^ base;
    for byte in label.bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    hash
}

/// A domain that can be walked by index, required for group members
#[derive(Debug, Clone, PartialEq)]
pub enum Enumeration {
    Ints { min: i64, size: u64 },
    Constant(Value),
}

impl Enumeration {
    pub fn size(&self) -> u64 {
        match self {
            Enumeration::Ints { size, .. } => *size,
            Enumeration::Constant(_) => 1,
        }
    }

    pub fn value_at(&self, index: u64) -> Value {
        match self {
            Enumeration::Ints { min, .. } => Value::Int((*min as i128 + index as i128) as i64),
            Enumeration::Constant(v) => v.clone(),
        }
    }

    pub fn of(rule: &GenerationRule) -> Option<Self> {
        match &rule.kind {
            RuleKind::IntRange { min, max } | RuleKind::Sequential { min, max, .. } => {
                Some(Enumeration::Ints {
                    min: *min,
                    size: int::range_size(*min, *max),
                })
            }
            RuleKind::IntConst(v) => Some(Enumeration::Constant(Value::Int(*v))),
            RuleKind::FloatConst(v) => Some(Enumeration::Constant(Value::Float(*v))),
            RuleKind::StringConst(v) => Some(Enumeration::Constant(Value::String(v.clone()))),
            RuleKind::DateTimeConst(v) => Some(Enumeration::Constant(Value::DateTime(*v))),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RandomFloat {
    min: f64,
    max: f64,
    seen: Option<HashSet<u64>>,
}

impl RandomFloat {
    pub fn new(min: f64, max: f64, unique: bool) -> Self {
        Self {
            min,
            max,
            seen: unique.then(HashSet::new),
        }
    }

    fn draw(&self, rng: &mut GenRng) -> f64 {
        if self.min == self.max {
            self.min
        } else {
            rng.random_range(self.min..=self.max)
        }
    }

    pub fn next_value(&mut self, name: &str, rng: &mut GenRng) -> Result<f64, GenerationError> {
        let Some(seen) = self.seen.as_ref() else {
            return Ok(self.draw(rng));
        };
        let emitted = seen.len() as u64;
        for _ in 0..MAX_COLLISIONS {
            let value = self.draw(rng);
            if let Some(seen) = self.seen.as_mut() {
                if seen.insert(value.to_bits()) {
                    return Ok(value);
                }
            }
        }
        Err(GenerationError::InsufficientDomain {
            generator: name.to_string(),
            domain: emitted,
        })
    }
}

#[derive(Debug, Clone)]
pub struct RandomDateTime {
    min: i64,
    max: i64,
    seen: Option<HashSet<i64>>,
}

impl RandomDateTime {
    pub fn new(min: DateTime<Utc>, max: DateTime<Utc>, unique: bool) -> Self {
        Self {
            min: min.timestamp(),
            max: max.timestamp(),
            seen: unique.then(HashSet::new),
        }
    }

    pub fn next_value(&mut self, name: &str, rng: &mut GenRng) -> Result<DateTime<Utc>, GenerationError> {
        let to_datetime = |secs: i64| DateTime::<Utc>::from_timestamp(secs, 0).unwrap_or_default();
        let Some(seen) = self.seen.as_mut() else {
            return Ok(to_datetime(rng.random_range(self.min..=self.max)));
        };
        for _ in 0..MAX_COLLISIONS {
            let secs = rng.random_range(self.min..=self.max);
            if seen.insert(secs) {
                return Ok(to_datetime(secs));
            }
        }
        Err(GenerationError::InsufficientDomain {
            generator: name.to_string(),
            domain: seen.len() as u64,
        })
    }
}

/// Constant value; a unique constant can be emitted exactly once
#[derive(Debug, Clone)]
pub struct Constant {
    value: Value,
    unique: bool,
    emitted: bool,
}

/// Concrete generator behind a parameter
#[derive(Debug, Clone)]
pub enum Generator {
    Sequential(SequentialInt),
    Int(RandomIntRange),
    UniqueInt(UniqueIntRange),
    Float(RandomFloat),
    String(RandomString),
    SequentialString(SequentialString),
    DateTime(RandomDateTime),
    Now,
    Constant(Constant),
}

impl Generator {
    pub fn from_rule(name: &str, rule: &GenerationRule) -> Self {
        let constant = |value: Value| {
            Generator::Constant(Constant {
                value,
                unique: rule.unique,
                emitted: false,
            })
        };
        match &rule.kind {
            RuleKind::IntRange { min, max } if rule.unique => {
                Generator::UniqueInt(UniqueIntRange::new(name, *min, *max))
            }
            RuleKind::IntRange { min, max } => Generator::Int(RandomIntRange::new(*min, *max)),
            RuleKind::Sequential { min, max, wrap } => {
                Generator::Sequential(SequentialInt::new(name, *min, *max, *wrap && !rule.unique))
            }
            RuleKind::IntConst(v) => constant(Value::Int(*v)),
            RuleKind::FloatRange { min, max } => {
                Generator::Float(RandomFloat::new(*min, *max, rule.unique))
            }
            RuleKind::FloatConst(v) => constant(Value::Float(*v)),
            RuleKind::StringRange {
                min_len,
                max_len,
                alphabet,
            } => {
                let alphabet = alphabet.clone().unwrap_or_default();
                if rule.unique {
                    Generator::SequentialString(SequentialString::new(name, *min_len, *max_len, alphabet))
                } else {
                    Generator::String(RandomString::new(*min_len, *max_len, alphabet))
                }
            }
            RuleKind::StringSequence {
                min_len,
                max_len,
                alphabet,
            } => Generator::SequentialString(SequentialString::new(
                name,
                *min_len,
                *max_len,
                alphabet.clone().unwrap_or_default(),
            )),
            RuleKind::StringConst(v) => constant(Value::String(v.clone())),
            RuleKind::DateTimeRange { min, max } => {
                Generator::DateTime(RandomDateTime::new(*min, *max, rule.unique))
            }
            RuleKind::DateTimeConst(v) => constant(Value::DateTime(*v)),
            RuleKind::DateTimeNow => Generator::Now,
        }
    }

    /// Upper bound on distinct values when the generator promises uniqueness
    pub fn unique_capacity(&self) -> Option<u64> {
        match self {
            Generator::UniqueInt(g) => Some(g.size()),
            Generator::Sequential(g) if !g.wraps() => Some(g.size()),
            Generator::SequentialString(g) => Some(g.capacity()),
            Generator::Constant(c) if c.unique => Some(1),
            _ => None,
        }
    }

    pub fn next_value(&mut self, name: &str, rng: &mut GenRng) -> Result<Value, GenerationError> {
        match self {
            Generator::Sequential(g) => g.next_value().map(Value::Int),
            Generator::Int(g) => Ok(Value::Int(g.next_value(rng))),
            Generator::UniqueInt(g) => g.next_value(rng).map(Value::Int),
            Generator::Float(g) => g.next_value(name, rng).map(Value::Float),
            Generator::String(g) => Ok(Value::String(g.next_value(rng))),
            Generator::SequentialString(g) => g.next_value(rng).map(Value::String),
            Generator::DateTime(g) => g.next_value(name, rng).map(Value::DateTime),
            Generator::Now => Ok(Value::DateTime(Utc::now())),
            Generator::Constant(c) => {
                if c.unique && c.emitted {
                    return Err(GenerationError::InsufficientDomain {
                        generator: name.to_string(),
                        domain: 1,
                    });
                }
                c.emitted = true;
                Ok(c.value.clone())
            }
        }
    }
}

/// Generator bound to one parameter, with its own seeded random source
#[derive(Debug, Clone)]
pub struct ParamGenerator {
    name: String,
    null_percentage: u8,
    generator: Generator,
    rng: GenRng,
}

impl ParamGenerator {
    pub fn new(name: &str, rule: &GenerationRule, seed: u64) -> Self {
        Self {
            name: name.to_string(),
            null_percentage: rule.null_percentage,
            generator: Generator::from_rule(name, rule),
            rng: GenRng::seed_from_u64(derive_seed(seed, name)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn generator(&self) -> &Generator {
        &self.generator
    }

    pub fn next_value(&mut self) -> Result<Value, GenerationError> {
        if self.null_percentage > 0 && self.rng.random_range(0..100u8) < self.null_percentage {
            return Ok(Value::Null);
        }
        self.generator.next_value(&self.name, &mut self.rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_same_seed_same_values() {
        let rule = GenerationRule::string(4, 12);
        let mut a = ParamGenerator::new("c_first", &rule, 99);
        let mut b = ParamGenerator::new("c_first", &rule, 99);
        for _ in 0..50 {
            assert_eq!(a.next_value().unwrap(), b.next_value().unwrap());
        }
    }

    #[test]
    fn test_names_get_distinct_streams() {
        assert_ne!(derive_seed(1, "a"), derive_seed(1, "b"));
        assert_ne!(derive_seed(1, "a"), derive_seed(2, "a"));
        assert_eq!(derive_seed(5, "w_id"), derive_seed(5, "w_id"));
    }

    #[test]
    fn test_null_percentage() {
        let mut always = ParamGenerator::new("x", &GenerationRule::int_const(1).nullable(100), 0);
        assert!(always.next_value().unwrap().is_null());

        let mut half = ParamGenerator::new("y", &GenerationRule::int_range(1, 5).nullable(50), 0);
        let nulls = (0..1000)
            .filter(|_| half.next_value().unwrap().is_null())
            .count();
        assert!((350..650).contains(&nulls), "nulls = {nulls}");
    }

    #[test]
    fn test_unique_constant_emits_once() {
        let mut generator = ParamGenerator::new("c", &GenerationRule::string_const("x").unique(), 0);
        assert_eq!(generator.next_value().unwrap(), Value::from("x"));
        assert!(matches!(
            generator.next_value(),
            Err(GenerationError::InsufficientDomain { domain: 1, .. })
        ));
    }

    #[test]
    fn test_unique_float_collides_on_point_range() {
        let mut generator = ParamGenerator::new("f", &GenerationRule::float_range(1.5, 1.5).unique(), 0);
        assert_eq!(generator.next_value().unwrap(), Value::Float(1.5));
        assert!(generator.next_value().is_err());
    }

    #[test]
    fn test_datetime_range() {
        let min = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let max = Utc.with_ymd_and_hms(2020, 12, 31, 0, 0, 0).unwrap();
        let mut generator = ParamGenerator::new("d", &GenerationRule::datetime_range(min, max), 3);
        for _ in 0..100 {
            match generator.next_value().unwrap() {
                Value::DateTime(dt) => assert!(dt >= min && dt <= max),
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn test_unique_string_range_is_sequential() {
        let generator = Generator::from_rule("s", &GenerationRule::string(6, 16).unique());
        assert!(matches!(generator, Generator::SequentialString(_)));
    }

    #[test]
    fn test_enumeration() {
        let e = Enumeration::of(&GenerationRule::int_range(3, 6)).unwrap();
        assert_eq!(e.size(), 4);
        assert_eq!(e.value_at(3), Value::Int(6));
        assert_eq!(Enumeration::of(&GenerationRule::float_const(2.0)).unwrap().size(), 1);
        assert!(Enumeration::of(&GenerationRule::string(1, 2)).is_none());
    }
}
