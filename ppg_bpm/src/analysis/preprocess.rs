//! Conditioning of raw optical readings into the AC pulse waveform the
//! estimator expects.

/// Valid bits of one sensor ADC word (18-bit, left-aligned in 3 bytes).
pub const ADC_MASK: u32 = 0x3FFFF;

pub const DC_ALPHA: f32 = 0.95;
pub const LOW_PASS_BETA: f32 = 0.2;

/// Reassembles a 3-byte FIFO word (MSB first) and keeps the 18 data bits.
pub fn unpack_fifo_word(bytes: [u8; 3]) -> u32 {
    let raw = (u32::from(bytes[0]) << 16) | (u32::from(bytes[1]) << 8) | u32::from(bytes[2]);
    raw & ADC_MASK
}

/// DC-removal high-pass followed by a one-pole low-pass. Each instance
/// carries its own filter state.
#[derive(Clone, Debug)]
pub struct PulsePreprocessor {
    alpha: f32,
    beta: f32,
    dc_state: Option<f32>,
    low_pass: f32,
}

impl PulsePreprocessor {
    pub fn new(alpha: f32, beta: f32) -> Self {
        Self { alpha, beta, dc_state: None, low_pass: 0.0 }
    }

    pub fn process(&mut self, raw: f32) -> f32 {
        // Seed at the steady state of a constant input so the first
        // samples do not ring.
        let previous = *self.dc_state.get_or_insert(raw / (1.0 - self.alpha));
        let w = raw + self.alpha * previous;
        let ac = w - previous;
        self.dc_state = Some(w);

        self.low_pass += self.beta * (ac - self.low_pass);
        self.low_pass
    }

    pub fn process_all(&mut self, raw: &[f32]) -> Vec<f32> {
        raw.iter().map(|&v| self.process(v)).collect()
    }

    pub fn reset(&mut self) {
        self.dc_state = None;
        self.low_pass = 0.0;
    }
}

impl Default for PulsePreprocessor {
    fn default() -> Self {
        Self::new(DC_ALPHA, LOW_PASS_BETA)
    }
}
