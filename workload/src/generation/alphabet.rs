use crate::error::ConfigurationError;
use rand::Rng;

/// Named character set used by string generators
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alphabet {
    name: String,
    ranges: Vec<(char, char)>,
    chars: Vec<char>,
}

impl Alphabet {
    /// Build an alphabet from inclusive character ranges
    pub fn new(name: impl Into<String>, ranges: &[(char, char)]) -> Result<Self, ConfigurationError> {
        let name = name.into();
        let mut chars = Vec::new();
        for &(lo, hi) in ranges {
            if lo > hi {
                return Err(ConfigurationError::malformed(format!(
                    "alphabet `{name}` has an inverted range {lo:?}..{hi:?}"
                )));
            }
            chars.extend(lo..=hi);
        }
        chars.sort_unstable();
        chars.dedup();
        if chars.is_empty() {
            return Err(ConfigurationError::malformed(format!(
                "alphabet `{name}` is empty"
            )));
        }
        Ok(Self {
            name,
            ranges: ranges.to_vec(),
            chars,
        })
    }

    fn preset(name: &str, ranges: &[(char, char)]) -> Self {
        let mut chars: Vec<char> = ranges.iter().flat_map(|&(lo, hi)| lo..=hi).collect();
        chars.sort_unstable();
        chars.dedup();
        Self {
            name: name.to_string(),
            ranges: ranges.to_vec(),
            chars,
        }
    }

    /// `a-z`, the default for string generators
    pub fn en_lower() -> Self {
        Self::preset("en_lower", &[('a', 'z')])
    }

    pub fn en_upper() -> Self {
        Self::preset("en_upper", &[('A', 'Z')])
    }

    pub fn en() -> Self {
        Self::preset("en", &[('A', 'Z'), ('a', 'z')])
    }

    pub fn num() -> Self {
        Self::preset("num", &[('0', '9')])
    }

    pub fn en_num() -> Self {
        Self::preset("en_num", &[('A', 'Z'), ('a', 'z'), ('0', '9')])
    }

    pub fn en_num_space() -> Self {
        Self::preset("en_num_space", &[('A', 'Z'), ('a', 'z'), ('0', '9'), (' ', ' ')])
    }

    /// Look up a preset by name
    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "en_lower" => Some(Self::en_lower()),
            "en_upper" => Some(Self::en_upper()),
            "en" => Some(Self::en()),
            "num" => Some(Self::num()),
            "en_num" => Some(Self::en_num()),
            "en_num_space" => Some(Self::en_num_space()),
            _ => None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ranges(&self) -> &[(char, char)] {
        &self.ranges
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Characters in ascending order
    pub fn char_at(&self, index: usize) -> char {
        self.chars[index % self.chars.len()]
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> char {
        self.chars[rng.random_range(0..self.chars.len())]
    }
}

impl Default for Alphabet {
    fn default() -> Self {
        Self::en_lower()
    }
}
