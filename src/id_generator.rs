/// Identifier generation for nodes and edges.
///
/// Two strategies: a deterministic base-36 counter ("node_00", "node_01", ...)
/// that is only unique within one process, and ULIDs, which stay unique
/// across independent clients.
use ulid::Ulid;

const CHARS: &[char] = &[
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9',
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J',
    'K', 'L', 'M', 'N', 'O', 'P', 'Q', 'R', 'S', 'T',
    'U', 'V', 'W', 'X', 'Y', 'Z',
];

/// Widest suffix whose namespace still fits in a `u64` counter (36^12 < 2^64)
const MAX_LENGTH: usize = 12;

/// Source of unique identifiers
pub trait IdGenerator {
    fn next(&mut self) -> String;
}

impl<G: IdGenerator + ?Sized> IdGenerator for Box<G> {
    fn next(&mut self) -> String {
        (**self).next()
    }
}

/// Counter-based generator producing short, prefixed base-36 ids.
/// Automatically expands to more digits when the namespace is exhausted.
#[derive(Debug, Clone)]
pub struct SequentialIdGenerator {
    prefix: String,
    /// Current digit count (starts at 2)
    length: usize,
    counter: u64,
    /// Counter value at which the next expansion happens
    max_value: u64,
}

impl SequentialIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self::with_length(prefix, 2)
    }

    pub fn with_length(prefix: impl Into<String>, length: usize) -> Self {
        let length = length.clamp(1, MAX_LENGTH);
        Self {
            prefix: prefix.into(),
            length,
            counter: 0,
            max_value: Self::capacity(length),
        }
    }

    /// A generator whose ids will not collide with `existing_ids`
    pub fn from_existing_ids<'a, I>(prefix: impl Into<String>, existing_ids: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let prefix = prefix.into();
        let suffixes: Vec<&str> = existing_ids
            .into_iter()
            .filter_map(|id| id.strip_prefix(prefix.as_str()))
            // Widening to MAX_LENGTH takes 36^11 ids; wider suffixes never collide in practice
            .filter(|suffix| !suffix.is_empty() && suffix.len() < MAX_LENGTH)
            .collect();

        let Some(max_len) = suffixes.iter().map(|s| s.len()).max() else {
            return Self::new(prefix);
        };

        // Only ids at the longest width can collide with what we produce next
        let max_counter = suffixes
            .iter()
            .filter(|s| s.len() == max_len)
            .filter_map(|s| Self::decode(s))
            .max();

        let mut generator = Self::with_length(prefix, max_len.max(2));
        if max_len >= 2 {
            if let Some(counter) = max_counter {
                generator.counter = counter + 1;
            }
        }
        generator
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Encode a number to a fixed-width base-36 string
    fn encode(&self, mut num: u64) -> String {
        let base = CHARS.len() as u64;
        let mut digits = Vec::with_capacity(self.length);

        for _ in 0..self.length {
            digits.push(CHARS[(num % base) as usize]);
            num /= base;
        }

        digits.reverse();
        digits.into_iter().collect()
    }

    fn decode(suffix: &str) -> Option<u64> {
        let base = CHARS.len() as u64;
        let mut result = 0u64;

        for c in suffix.chars() {
            let digit = CHARS.iter().position(|&ch| ch == c.to_ascii_uppercase())?;
            result = result.checked_mul(base)?.checked_add(digit as u64)?;
        }

        Some(result)
    }

    fn capacity(length: usize) -> u64 {
        (CHARS.len() as u64)
            .checked_pow(length as u32)
            .unwrap_or(u64::MAX)
    }

    fn expand(&mut self) {
        self.length = (self.length + 1).min(MAX_LENGTH);
        self.max_value = Self::capacity(self.length);
        // Longer ids never collide with shorter ones
        self.counter = 0;
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next(&mut self) -> String {
        if self.counter >= self.max_value {
            self.expand();
        }

        let id = format!("{}{}", self.prefix, self.encode(self.counter));
        self.counter += 1;
        id
    }
}

/// Random, sortable ids that are safe to mint on independent clients
#[derive(Debug, Clone, Default)]
pub struct UlidIdGenerator {
    prefix: String,
}

impl UlidIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl IdGenerator for UlidIdGenerator {
    fn next(&mut self) -> String {
        format!("{}{}", self.prefix, Ulid::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_basic_generation() {
        let mut gen = SequentialIdGenerator::new("node_");
        assert_eq!(gen.next(), "node_00");
        assert_eq!(gen.next(), "node_01");
        assert_eq!(gen.next(), "node_02");
    }

    #[test]
    fn test_expansion() {
        let mut gen = SequentialIdGenerator::with_length("", 1);
        for _ in 0..36 {
            assert_eq!(gen.next().len(), 1);
        }
        let id = gen.next();
        assert_eq!(id, "00");
    }

    #[test]
    fn test_from_existing() {
        let existing = ["node_A7", "node_2K", "node_ZZ", "edge_ZZZ", "custom"];

        let mut gen = SequentialIdGenerator::from_existing_ids("node_", existing);
        let next = gen.next();
        assert_eq!(next, "node_000");
        assert!(!existing.contains(&next.as_str()));
    }

    #[test]
    fn test_from_existing_continues_counter() {
        let mut gen = SequentialIdGenerator::from_existing_ids("e", ["e00", "e05", "e03"]);
        assert_eq!(gen.next(), "e06");
    }

    #[test]
    fn test_from_existing_ignores_long_suffixes() {
        let existing = [
            "node_01ARZ3NDEKTSV4RRFFQ69G5FAV",
            "node_build_and_test",
            "node_07",
        ];
        let mut gen = SequentialIdGenerator::from_existing_ids("node_", existing);
        assert_eq!(gen.next(), "node_08");
    }

    #[test]
    fn test_width_is_capped() {
        let mut gen = SequentialIdGenerator::with_length("n", 40);
        assert_eq!(gen.next(), format!("n{}", "0".repeat(MAX_LENGTH)));
    }

    #[test]
    fn test_from_existing_empty() {
        let mut gen = SequentialIdGenerator::from_existing_ids("n", std::iter::empty());
        assert_eq!(gen.next(), "n00");
    }

    #[test]
    fn test_ulid_ids_unique() {
        let mut gen = UlidIdGenerator::new("node_");
        let ids: HashSet<String> = (0..100).map(|_| gen.next()).collect();
        assert_eq!(ids.len(), 100);
        assert!(ids.iter().all(|id| id.starts_with("node_")));
    }

    #[test]
    fn test_boxed_generator() {
        let mut gen: Box<dyn IdGenerator> = Box::new(SequentialIdGenerator::new("x"));
        assert_eq!(gen.next(), "x00");
    }
}
