//! # Identifier Generation
//!
//! Member ids are produced by an [`IdGenerator`] supplied by the caller.
//! Generated ids never influence topology decisions; they are only keys.

use crate::primitives::MAX_ID_ATTEMPTS;
use crate::types::{MemberId, StemmaError};

/// Capability: produce a candidate member id.
///
/// Candidates need not be unique on their own; [`generate_unique`] retries
/// until one is free.
pub trait IdGenerator {
    fn next_id(&mut self) -> MemberId;
}

/// Random block ids of the form `FXXX-MXXX-BXXX-RXXX`.
///
/// Each block is a fixed letter followed by three characters from
/// `A-Z0-9`, drawn from a v4 UUID.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockIdGenerator;

const ALPHABET: &[u8; 36] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const BLOCK_LETTERS: [char; 4] = ['F', 'M', 'B', 'R'];

impl IdGenerator for BlockIdGenerator {
    fn next_id(&mut self) -> MemberId {
        let bytes = uuid::Uuid::new_v4().into_bytes();
        let blocks: Vec<String> = BLOCK_LETTERS
            .iter()
            .enumerate()
            .map(|(i, letter)| {
                let mut block = String::with_capacity(4);
                block.push(*letter);
                for b in &bytes[i * 3..i * 3 + 3] {
                    block.push(char::from(ALPHABET[(*b as usize) % ALPHABET.len()]));
                }
                block
            })
            .collect();
        MemberId::new(blocks.join("-"))
    }
}

/// Deterministic ids: `prefix` followed by a zero-padded counter.
#[derive(Debug, Clone)]
pub struct SequentialIdGenerator {
    prefix: String,
    next: u64,
}

impl SequentialIdGenerator {
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: 1,
        }
    }

    /// Continue counting after the highest `prefix`-numbered id in `taken`.
    #[must_use]
    pub fn resume_after<'a>(mut self, taken: impl IntoIterator<Item = &'a MemberId>) -> Self {
        let highest = taken
            .into_iter()
            .filter_map(|id| id.as_str().strip_prefix(self.prefix.as_str()))
            .filter_map(|digits| digits.parse::<u64>().ok())
            .max();
        if let Some(highest) = highest {
            self.next = self.next.max(highest.saturating_add(1));
        }
        self
    }
}

impl Default for SequentialIdGenerator {
    fn default() -> Self {
        Self::new("M")
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&mut self) -> MemberId {
        let id = MemberId::new(format!("{}{:04}", self.prefix, self.next));
        self.next = self.next.saturating_add(1);
        id
    }
}

/// Draw ids from `generator` until one is not `taken`.
pub fn generate_unique<G, F>(generator: &mut G, taken: F) -> Result<MemberId, StemmaError>
where
    G: IdGenerator + ?Sized,
    F: Fn(&MemberId) -> bool,
{
    for _ in 0..MAX_ID_ATTEMPTS {
        let candidate = generator.next_id();
        if !candidate.is_blank() && !taken(&candidate) {
            return Ok(candidate);
        }
    }
    Err(StemmaError::Internal(format!(
        "could not generate a unique member ID in {} attempts",
        MAX_ID_ATTEMPTS
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_ids_have_four_lettered_blocks() {
        let id = BlockIdGenerator.next_id();
        let blocks: Vec<&str> = id.as_str().split('-').collect();
        assert_eq!(blocks.len(), 4);
        for (block, letter) in blocks.iter().zip(['F', 'M', 'B', 'R']) {
            assert_eq!(block.len(), 4);
            assert!(block.starts_with(letter));
            assert!(block.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        }
    }

    #[test]
    fn sequential_ids_count_up() {
        let mut ids = SequentialIdGenerator::new("T");
        assert_eq!(ids.next_id().as_str(), "T0001");
        assert_eq!(ids.next_id().as_str(), "T0002");
    }

    #[test]
    fn generate_unique_skips_taken_ids() {
        let mut ids = SequentialIdGenerator::new("T");
        let id = generate_unique(&mut ids, |c| c.as_str() == "T0001").expect("id");
        assert_eq!(id.as_str(), "T0002");
    }

    #[test]
    fn resume_skips_past_existing_ids() {
        let existing = [
            MemberId::from("T0007"),
            MemberId::from("T0002"),
            MemberId::from("X0099"),
            MemberId::from("Tabc"),
        ];
        let mut ids = SequentialIdGenerator::new("T").resume_after(&existing);
        assert_eq!(ids.next_id().as_str(), "T0008");

        let mut fresh = SequentialIdGenerator::new("T").resume_after(std::iter::empty());
        assert_eq!(fresh.next_id().as_str(), "T0001");
    }

    #[test]
    fn generate_unique_gives_up() {
        let mut ids = SequentialIdGenerator::new("T");
        assert!(generate_unique(&mut ids, |_| true).is_err());
    }
}
