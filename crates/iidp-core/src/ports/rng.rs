/// Injectable randomness so the composer's interleaving fairness pass is
/// reproducible under test while still behaving randomly in production.
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub trait EngineRng: Send + Sync {
    /// Returns an index in `0..len`. Callers never pass `len == 0`.
    fn choose_index(&mut self, len: usize) -> usize;
}

pub struct StdEngineRng(StdRng);

impl StdEngineRng {
    pub fn seeded(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

impl Default for StdEngineRng {
    fn default() -> Self {
        Self(StdRng::from_entropy())
    }
}

impl EngineRng for StdEngineRng {
    fn choose_index(&mut self, len: usize) -> usize {
        self.0.gen_range(0..len)
    }
}

#[cfg(any(test, feature = "testing"))]
/// Cycles deterministically through a fixed sequence, wrapping at the end;
/// lets tests assert on exactly which candidate the composer picked.
pub struct SequenceRng {
    sequence: Vec<usize>,
    cursor: usize,
}

#[cfg(any(test, feature = "testing"))]
impl SequenceRng {
    pub fn new(sequence: Vec<usize>) -> Self {
        Self { sequence, cursor: 0 }
    }
}

#[cfg(any(test, feature = "testing"))]
impl EngineRng for SequenceRng {
    fn choose_index(&mut self, len: usize) -> usize {
        if self.sequence.is_empty() {
            return 0;
        }
        let raw = self.sequence[self.cursor % self.sequence.len()];
        self.cursor += 1;
        raw % len
    }
}
