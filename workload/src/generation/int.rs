use super::GenRng;
use crate::error::GenerationError;
use rand::Rng;
use std::collections::HashSet;

/// Number of values in `min..=max`, saturated to `u64::MAX`
pub(crate) fn range_size(min: i64, max: i64) -> u64 {
    let size = (max as i128) - (min as i128) + 1;
    u64::try_from(size).unwrap_or(u64::MAX)
}

/// Walks `min..=max` in order
#[derive(Debug, Clone)]
pub struct SequentialInt {
    name: String,
    min: i64,
    size: u64,
    offset: u64,
    wrap: bool,
    emitted: u64,
}

impl SequentialInt {
    pub fn new(name: impl Into<String>, min: i64, max: i64, wrap: bool) -> Self {
        Self {
            name: name.into(),
            min,
            size: range_size(min, max),
            offset: 0,
            wrap,
            emitted: 0,
        }
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn wraps(&self) -> bool {
        self.wrap
    }

    pub fn next_value(&mut self) -> Result<i64, GenerationError> {
        if self.offset == self.size {
            if !self.wrap {
                return Err(GenerationError::RangeExhausted {
                    generator: self.name.clone(),
                    emitted: self.emitted,
                });
            }
            self.offset = 0;
        }
        let value = (self.min as i128 + self.offset as i128) as i64;
        self.offset += 1;
        self.emitted += 1;
        Ok(value)
    }
}

/// Uniform draw from `min..=max`
#[derive(Debug, Clone)]
pub struct RandomIntRange {
    min: i64,
    max: i64,
}

impl RandomIntRange {
    pub fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }

    pub fn next_value(&mut self, rng: &mut GenRng) -> i64 {
        rng.random_range(self.min..=self.max)
    }
}

/// Rejection attempts before switching to a linear probe
const MAX_REJECTIONS: usize = 32;

/// Uniform draw from `min..=max` that never repeats a value
#[derive(Debug, Clone)]
pub struct UniqueIntRange {
    name: String,
    min: i64,
    max: i64,
    size: u64,
    seen: HashSet<i64>,
}

impl UniqueIntRange {
    pub fn new(name: impl Into<String>, min: i64, max: i64) -> Self {
        Self {
            name: name.into(),
            min,
            max,
            size: range_size(min, max),
            seen: HashSet::new(),
        }
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn emitted(&self) -> usize {
        self.seen.len()
    }

    pub fn next_value(&mut self, rng: &mut GenRng) -> Result<i64, GenerationError> {
        let used = self.seen.len() as u64;
        if used >= self.size {
            return Err(GenerationError::InsufficientDomain {
                generator: self.name.clone(),
                domain: self.size,
            });
        }

        // sparse: rejection sampling converges fast
        if used.saturating_mul(4) < self.size.saturating_mul(3) {
            for _ in 0..MAX_REJECTIONS {
                let candidate = rng.random_range(self.min..=self.max);
                if self.seen.insert(candidate) {
                    return Ok(candidate);
                }
            }
        }

        // dense: probe forward from a random start, at least one slot is free
        let start = rng.random_range(0..self.size);
        for step in 0..self.size {
            let offset = (start as u128 + step as u128) % self.size as u128;
            let candidate = (self.min as i128 + offset as i128) as i64;
            if self.seen.insert(candidate) {
                return Ok(candidate);
            }
        }
        Err(GenerationError::InsufficientDomain {
            generator: self.name.clone(),
            domain: self.size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_sequential_follows_formula() {
        let (min, max) = (3, 7);
        let mut generator = SequentialInt::new("seq", min, max, true);
        let size = (max - min + 1) as u64;
        for n in 1..=23u64 {
            let expected = min + ((n - 1) % size) as i64;
            assert_eq!(generator.next_value().unwrap(), expected);
        }
    }

    #[test]
    fn test_sequential_without_wrap_exhausts() {
        let (min, max) = (-2, 2);
        let mut generator = SequentialInt::new("seq", min, max, false);
        for n in 1..=(max - min + 1) {
            assert_eq!(generator.next_value().unwrap(), min + n - 1);
        }
        // call number max - min + 2
        assert_eq!(
            generator.next_value(),
            Err(GenerationError::RangeExhausted {
                generator: "seq".into(),
                emitted: 5
            })
        );
    }

    #[test]
    fn test_sequential_handles_full_i64_span() {
        let mut generator = SequentialInt::new("wide", i64::MIN, i64::MAX, false);
        assert_eq!(generator.size(), u64::MAX);
        assert_eq!(generator.next_value().unwrap(), i64::MIN);
        assert_eq!(generator.next_value().unwrap(), i64::MIN + 1);
    }

    #[test]
    fn test_unique_never_repeats_and_then_fails() {
        let mut rng = GenRng::seed_from_u64(42);
        let mut generator = UniqueIntRange::new("pk", 10, 109);
        let mut seen = HashSet::new();
        for _ in 0..100 {
            let value = generator.next_value(&mut rng).unwrap();
            assert!((10..=109).contains(&value));
            assert!(seen.insert(value), "duplicate {value}");
        }
        assert_eq!(
            generator.next_value(&mut rng),
            Err(GenerationError::InsufficientDomain {
                generator: "pk".into(),
                domain: 100
            })
        );
    }

    #[test]
    fn test_unique_single_value_domain() {
        let mut rng = GenRng::seed_from_u64(1);
        let mut generator = UniqueIntRange::new("one", 5, 5);
        assert_eq!(generator.next_value(&mut rng).unwrap(), 5);
        assert!(generator.next_value(&mut rng).is_err());
    }

    #[test]
    fn test_random_stays_in_range() {
        let mut rng = GenRng::seed_from_u64(9);
        let mut generator = RandomIntRange::new(-3, 3);
        for _ in 0..500 {
            assert!((-3..=3).contains(&generator.next_value(&mut rng)));
        }
    }
}
