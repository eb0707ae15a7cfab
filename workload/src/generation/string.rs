use super::{alphabet::Alphabet, GenRng};
use crate::error::GenerationError;
use rand::Rng;

/// Random-length string with characters drawn from an alphabet
#[derive(Debug, Clone)]
pub struct RandomString {
    min_len: usize,
    max_len: usize,
    alphabet: Alphabet,
}

impl RandomString {
    pub fn new(min_len: usize, max_len: usize, alphabet: Alphabet) -> Self {
        Self {
            min_len,
            max_len,
            alphabet,
        }
    }

    pub fn next_value(&mut self, rng: &mut GenRng) -> String {
        let len = rng.random_range(self.min_len..=self.max_len);
        (0..len).map(|_| self.alphabet.sample(rng)).collect()
    }
}

/// Distinct values a sequential string aims for before its prefix stops growing
const TARGET_SPAN: u64 = 100_000_000;

/// String whose leading characters encode a monotonic counter.
///
/// The prefix is the counter written in base `alphabet.len()` with a fixed
/// width, using the alphabet's characters in ascending order. Two values never
/// share a prefix and later values sort after earlier ones. The remaining
/// characters up to the drawn length are random filler.
///
/// The width starts at `min_len` and grows until the prefix can encode
/// `TARGET_SPAN` values, but never past `max_len`.
#[derive(Debug, Clone)]
pub struct SequentialString {
    name: String,
    min_len: usize,
    max_len: usize,
    width: usize,
    alphabet: Alphabet,
    counter: u64,
    capacity: u64,
}

impl SequentialString {
    pub fn new(name: impl Into<String>, min_len: usize, max_len: usize, alphabet: Alphabet) -> Self {
        let base = alphabet.len() as u64;
        let span = |width: usize| {
            u32::try_from(width)
                .ok()
                .and_then(|w| base.checked_pow(w))
                .unwrap_or(u64::MAX)
        };
        let mut width = min_len.max(1);
        while width < max_len && span(width) < TARGET_SPAN {
            width += 1;
        }
        let capacity = span(width);
        Self {
            name: name.into(),
            min_len,
            max_len: max_len.max(width),
            width,
            alphabet,
            counter: 0,
            capacity,
        }
    }

    /// Number of distinct prefixes before the counter overflows
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    pub fn next_value(&mut self, rng: &mut GenRng) -> Result<String, GenerationError> {
        if self.counter >= self.capacity {
            return Err(GenerationError::RangeExhausted {
                generator: self.name.clone(),
                emitted: self.counter,
            });
        }
        let len = rng.random_range(self.min_len.max(self.width)..=self.max_len);
        let base = self.alphabet.len() as u64;

        let mut prefix = vec![self.alphabet.char_at(0); self.width];
        let mut rest = self.counter;
        for slot in prefix.iter_mut().rev() {
            *slot = self.alphabet.char_at((rest % base) as usize);
            rest /= base;
        }
        self.counter += 1;

        let mut value: String = prefix.into_iter().collect();
        value.extend((self.width..len).map(|_| self.alphabet.sample(rng)));
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn test_random_length_and_charset() {
        let mut rng = GenRng::seed_from_u64(3);
        let mut generator = RandomString::new(2, 6, Alphabet::en_upper());
        for _ in 0..200 {
            let value = generator.next_value(&mut rng);
            assert!((2..=6).contains(&value.len()));
            assert!(value.chars().all(|c| c.is_ascii_uppercase()));
        }
    }

    #[test]
    fn test_sequential_is_distinct_and_ordered() {
        let mut rng = GenRng::seed_from_u64(3);
        let mut generator = SequentialString::new("c_last", 6, 16, Alphabet::en_lower());
        assert_eq!(generator.capacity(), 26u64.pow(6));
        let mut seen = HashSet::new();
        let mut previous = String::new();
        for _ in 0..2000 {
            let value = generator.next_value(&mut rng).unwrap();
            assert!((6..=16).contains(&value.len()));
            let prefix = value[..6].to_string();
            assert!(prefix > previous, "{prefix} <= {previous}");
            assert!(seen.insert(prefix.clone()));
            previous = prefix;
        }
    }

    #[test]
    fn test_sequential_first_values() {
        let mut rng = GenRng::seed_from_u64(0);
        let mut generator = SequentialString::new("s", 2, 2, Alphabet::num());
        let values: Vec<String> = (0..12).map(|_| generator.next_value(&mut rng).unwrap()).collect();
        assert_eq!(values[0], "00");
        assert_eq!(values[9], "09");
        assert_eq!(values[11], "11");
    }

    #[test]
    fn test_short_min_len_widens_prefix() {
        let mut rng = GenRng::seed_from_u64(5);
        let mut generator = SequentialString::new("code", 1, 20, Alphabet::en_lower());
        assert!(generator.capacity() >= TARGET_SPAN);
        let values: HashSet<String> = (0..500).map(|_| generator.next_value(&mut rng).unwrap()).collect();
        assert_eq!(values.len(), 500);
        assert!(values.iter().all(|v| (6..=20).contains(&v.len())));
    }

    #[test]
    fn test_sequential_overflow() {
        let mut rng = GenRng::seed_from_u64(0);
        let alphabet = Alphabet::new("ab", &[('a', 'b')]).unwrap();
        let mut generator = SequentialString::new("tiny", 2, 2, alphabet);
        assert_eq!(generator.capacity(), 4);
        for expected in ["aa", "ab", "ba", "bb"] {
            assert_eq!(generator.next_value(&mut rng).unwrap(), expected);
        }
        assert!(matches!(
            generator.next_value(&mut rng),
            Err(GenerationError::RangeExhausted { emitted: 4, .. })
        ));
    }
}
