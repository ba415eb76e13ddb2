//! Deterministic random number generation.
//!
//! RULE: No engine component may call a platform RNG.
//! All randomness (market response, viral rolls, chart movement, growth
//! variance) flows through the `Roll` trait. Production code hands out
//! `EngineRng` streams derived from one master seed; tests can substitute
//! `ScriptedRolls` to pin every draw.
//!
//! Each component gets its own stream, seeded from
//! (master_seed XOR slot * golden-ratio constant), so adding a component
//! never shifts another component's draws.

use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;

/// Source of uniform draws in [0.0, 1.0).
///
/// Formula code only ever asks for unit draws and derives ranges from them,
/// which keeps the roll order documented and scriptable.
pub trait Roll {
    /// Roll a float in [0.0, 1.0).
    fn next_f64(&mut self) -> f64;

    /// Uniform float in [lo, hi).
    fn range_f64(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }

    /// Uniform integer in [lo, hi). Returns `lo` when the range is empty.
    fn range_i64(&mut self, lo: i64, hi: i64) -> i64 {
        if hi <= lo {
            return lo;
        }
        let span = (hi - lo) as f64;
        let offset = (self.next_f64() * span).floor() as i64;
        lo + offset.min(hi - lo - 1)
    }

    /// Bernoulli trial: returns true with probability p.
    fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }
}

/// A named, deterministic RNG for a single engine component.
pub struct EngineRng {
    pub name: &'static str,
    inner: Pcg64Mcg,
}

impl EngineRng {
    /// Create a component RNG from the master seed and a stable slot index.
    /// The index must never change once assigned.
    pub fn new(master_seed: u64, slot_index: u64) -> Self {
        let derived_seed = master_seed ^ (slot_index.wrapping_mul(0x9e37_79b9_7f4a_7c15));
        Self {
            name: "unnamed",
            inner: Pcg64Mcg::seed_from_u64(derived_seed),
        }
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Draw a raw u64 (full range).
    pub fn next_u64(&mut self) -> u64 {
        use rand::RngCore;
        self.inner.next_u64()
    }
}

impl Roll for EngineRng {
    fn next_f64(&mut self) -> f64 {
        let bits = self.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }
}

/// Replays a fixed sequence of unit draws, cycling when exhausted.
///
/// Values are returned as given (1.0 is allowed), so a test can hit the
/// inclusive upper end of a documented range such as market response.
#[derive(Debug, Clone)]
pub struct ScriptedRolls {
    values: Vec<f64>,
    cursor: usize,
}

impl ScriptedRolls {
    pub fn new(values: impl Into<Vec<f64>>) -> Self {
        let values = values.into();
        assert!(!values.is_empty(), "scripted rolls need at least one value");
        Self { values, cursor: 0 }
    }

    /// How many draws have been consumed so far.
    pub fn consumed(&self) -> usize {
        self.cursor
    }
}

impl Roll for ScriptedRolls {
    fn next_f64(&mut self) -> f64 {
        let v = self.values[self.cursor % self.values.len()];
        self.cursor += 1;
        v
    }
}

/// Hands out per-component RNG streams for one engine instance.
pub struct RngBank {
    master_seed: u64,
    draws: [u64; SLOT_COUNT],
}

impl RngBank {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed, draws: [0; SLOT_COUNT] }
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    /// A fresh stream for `slot`. Each call advances the slot's generation
    /// counter so consecutive operations never replay the same draws.
    pub fn for_slot(&mut self, slot: EngineSlot) -> EngineRng {
        let generation = self.draws[slot as usize];
        self.draws[slot as usize] += 1;
        let seed = self.master_seed ^ generation.wrapping_mul(0xbf58_476d_1ce4_e5b9);
        EngineRng::new(seed, slot as u64).with_name(slot.name())
    }
}

const SLOT_COUNT: usize = 4;

/// Stable component slot assignments.
/// NEVER reorder or remove entries — only append (and bump SLOT_COUNT).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u64)]
pub enum EngineSlot {
    Ranking = 0,
    Growth = 1,
    Career = 2,
    Economy = 3,
}

impl EngineSlot {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ranking => "ranking",
            Self::Growth => "growth",
            Self::Career => "career",
            Self::Economy => "economy",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_stream() {
        let mut a = RngBank::new(7);
        let mut b = RngBank::new(7);
        let xs: Vec<f64> = (0..5).map(|_| a.for_slot(EngineSlot::Ranking).next_f64()).collect();
        let ys: Vec<f64> = (0..5).map(|_| b.for_slot(EngineSlot::Ranking).next_f64()).collect();
        assert_eq!(xs, ys);
    }

    #[test]
    fn consecutive_streams_differ() {
        let mut bank = RngBank::new(7);
        let first = bank.for_slot(EngineSlot::Growth).next_u64();
        let second = bank.for_slot(EngineSlot::Growth).next_u64();
        assert_ne!(first, second);
    }

    #[test]
    fn range_i64_stays_half_open() {
        let mut rolls = ScriptedRolls::new([0.0, 0.999_999, 1.0]);
        assert_eq!(rolls.range_i64(10, 30), 10);
        assert_eq!(rolls.range_i64(10, 30), 29);
        assert_eq!(rolls.range_i64(10, 30), 29);
    }
}
