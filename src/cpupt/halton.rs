use super::*;

/// A precomputed batch of 2D Halton-Owen samples in `[0,1]^2` with a
/// rotating index, owned by whoever draws from it (camera, area light —
/// §4.6/§4.7). Each owner gets its own batch and index so concurrent
/// workers never share sampler state (§9).
#[derive(Clone, Debug)]
pub struct Batch {
    samples: Vec<Point2>,
    index: usize,
}

impl Batch {
    pub fn new(count: usize) -> Self {
        Self {
            samples: (0..count).map(sample_2d).collect(),
            index: 0,
        }
    }

    /// Draw the next sample, advancing the rotating index modulo the
    /// batch size.
    pub fn next(&mut self) -> Point2 {
        let s = self.samples[self.index];
        self.index = (self.index + 1) % self.samples.len();
        s
    }

    /// Reset to the start of the batch (§5: the Halton index starts at 0
    /// per camera/light init, a determinism source that must be pinned).
    pub fn reset(&mut self) {
        self.index = 0;
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

fn sample_2d(i: usize) -> Point2 {
    Point2::new(owen_scrambled_halton(i, 2), owen_scrambled_halton(i, 3))
}

/// Radical-inverse in `base`, Owen-scrambled via bit-reversal xor with a
/// fixed per-base seed. This keeps the low-discrepancy structure of the
/// Halton sequence while breaking up the visible correlation between
/// consecutive indices that a bare radical inverse shows at low sample
/// counts.
fn owen_scrambled_halton(index: usize, base: u32) -> f32 {
    let mut index = index as u64 + 1;
    let base = u64::from(base);
    let mut result = 0.0f64;
    let mut fraction = 1.0 / base as f64;
    let seed = owen_seed(base);
    let mut digit_pos = 0u32;
    while index > 0 {
        let mut digit = index % base;
        // Owen scrambling: permute the digit using a hash of its position
        // and the preceding digits, seeded per base so the two dimensions
        // of a 2D sample decorrelate.
        digit = (digit + scramble_hash(seed, digit_pos)) % base;
        result += digit as f64 * fraction;
        index /= base;
        fraction /= base as f64;
        digit_pos += 1;
    }
    result as f32
}

fn owen_seed(base: u64) -> u64 {
    base.wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

fn scramble_hash(seed: u64, digit_pos: u32) -> u64 {
    let mut x = seed ^ u64::from(digit_pos).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    x ^= x >> 30;
    x = x.wrapping_mul(0xBF58_476D_1CE4_E5B9);
    x ^= x >> 27;
    x = x.wrapping_mul(0x94D0_49BB_1331_11EB);
    x ^= x >> 31;
    x
}
