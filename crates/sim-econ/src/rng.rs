use rand::RngCore;
use std::collections::VecDeque;

/// Replays a fixed script of raw `u64` draws so every roll can be pinned.
///
/// `HIT` makes any `gen_bool(p > 0)` succeed and picks the first candidate of
/// a uniform choice; `MISS` makes `gen_bool(p < 1)` fail.
///
/// # Panics
///
/// Panics when asked for more draws than were scripted.
#[derive(Clone, Debug, Default)]
pub struct ScriptedRng {
    draws: VecDeque<u64>,
}

impl ScriptedRng {
    pub const HIT: u64 = 0;
    pub const MISS: u64 = u64::MAX;

    pub fn new(draws: impl IntoIterator<Item = u64>) -> Self {
        Self {
            draws: draws.into_iter().collect(),
        }
    }

    /// Draws not consumed yet.
    pub fn remaining(&self) -> usize {
        self.draws.len()
    }
}

impl RngCore for ScriptedRng {
    fn next_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }

    fn next_u64(&mut self) -> u64 {
        match self.draws.pop_front() {
            Some(v) => v,
            None => panic!("scripted rng exhausted"),
        }
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(8) {
            let bytes = self.next_u64().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}
