// SPDX-License-Identifier: MIT OR Apache-2.0
//! Channel strip nodes: gain, pan and the metering tap.

use crate::sink::ChannelHandle;

/// Default parameter ramp time constant in milliseconds
pub const DEFAULT_RAMP_MS: f32 = 10.0;

/// A parameter that approaches its target with a one-pole ramp.
///
/// Mirrors what the backend does with `set_gain(.., ramp_ms)` so meters and
/// previews follow the same curve instead of jumping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RampedParam {
    current: f32,
    target: f32,
    time_constant_ms: f32,
}

impl RampedParam {
    /// Create a parameter resting at `value`
    pub fn new(value: f32, time_constant_ms: f32) -> Self {
        Self {
            current: value,
            target: value,
            time_constant_ms,
        }
    }

    /// Set a new target
    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    /// Jump straight to a value
    pub fn set_immediate(&mut self, value: f32) {
        self.current = value;
        self.target = value;
    }

    /// Advance the ramp by `elapsed_ms`, returning the current value
    pub fn advance(&mut self, elapsed_ms: f32) -> f32 {
        if self.time_constant_ms <= 0.0 {
            self.current = self.target;
            return self.current;
        }
        let coeff = 1.0 - (-elapsed_ms / self.time_constant_ms).exp();
        self.current += (self.target - self.current) * coeff;
        if (self.target - self.current).abs() < 1.0e-5 {
            self.current = self.target;
        }
        self.current
    }

    /// Current value
    pub fn current(&self) -> f32 {
        self.current
    }

    /// Target value
    pub fn target(&self) -> f32 {
        self.target
    }

    /// Ramp time constant
    pub fn time_constant_ms(&self) -> f32 {
        self.time_constant_ms
    }
}

/// Constant-power pan gains `(left, right)` for pan in `[-1, 1]`
pub fn pan_gains(pan: f32) -> (f32, f32) {
    let theta = (pan.clamp(-1.0, 1.0) + 1.0) * std::f32::consts::FRAC_PI_4;
    (theta.cos(), theta.sin())
}

/// Peak/RMS meter fed from the post-gain signal.
///
/// Reads only; it has no effect on the signal that reaches the master bus.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Analyzer {
    /// Current peak level
    pub peak: f32,
    /// Smoothed RMS level
    pub rms: f32,
}

impl Analyzer {
    /// Peak falls by this factor per processed block
    const PEAK_DECAY: f32 = 0.85;
    /// RMS exponential smoothing coefficient per block
    const RMS_SMOOTHING: f32 = 0.3;

    /// Feed a block of mono samples scaled by `gain`
    pub fn process(&mut self, samples: &[f32], gain: f32) {
        if samples.is_empty() {
            return;
        }

        let mut block_peak = 0.0f32;
        let mut sum_sq = 0.0f32;
        for s in samples {
            let v = s * gain;
            block_peak = block_peak.max(v.abs());
            sum_sq += v * v;
        }
        let block_rms = (sum_sq / samples.len() as f32).sqrt();

        self.peak = block_peak.max(self.peak * Self::PEAK_DECAY);
        self.rms += (block_rms - self.rms) * Self::RMS_SMOOTHING;
    }

    /// Overwrite with levels measured elsewhere (e.g. an analysis worker)
    pub fn set_levels(&mut self, peak: f32, rms: f32) {
        self.peak = peak;
        self.rms = rms;
    }

    /// Reset to silence
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Per-track binding: gain node, pan node and analyzer tap feeding master
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelStrip {
    /// Backend channel
    pub handle: ChannelHandle,
    /// Gain node (effective gain after mute/solo)
    pub gain: RampedParam,
    /// Pan node
    pub pan: f32,
    /// Metering tap
    pub analyzer: Analyzer,
    /// Volume last seen on the track
    pub model_volume: f32,
    /// Pan last seen on the track
    pub model_pan: f32,
    /// Live volume (model value unless a live adjustment overrides it)
    pub volume: f32,
    /// Whether the strip is currently silenced by mute or solo
    pub silenced: bool,
}

impl ChannelStrip {
    /// Create a strip for a backend channel
    pub fn new(handle: ChannelHandle, volume: f32, pan: f32, ramp_ms: f32) -> Self {
        Self {
            handle,
            gain: RampedParam::new(volume, ramp_ms),
            pan,
            analyzer: Analyzer::default(),
            model_volume: volume,
            model_pan: pan,
            volume,
            silenced: false,
        }
    }

    /// Gain that should reach the master bus
    pub fn effective_gain(&self) -> f32 {
        if self.silenced {
            0.0
        } else {
            self.volume
        }
    }

    /// Left/right output gains after pan
    pub fn output_gains(&self) -> (f32, f32) {
        let (l, r) = pan_gains(self.pan);
        let g = self.gain.current();
        (l * g, r * g)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ramp_approaches_target() {
        let mut param = RampedParam::new(0.0, 10.0);
        param.set_target(1.0);
        let after_one_tau = param.advance(10.0);
        assert!((after_one_tau - 0.632).abs() < 0.01);
        for _ in 0..20 {
            param.advance(10.0);
        }
        assert_eq!(param.current(), 1.0);
    }

    #[test]
    fn test_zero_ramp_jumps() {
        let mut param = RampedParam::new(0.2, 0.0);
        param.set_target(0.9);
        assert_eq!(param.advance(1.0), 0.9);
    }

    #[test]
    fn test_pan_law_is_constant_power() {
        for pan in [-1.0, -0.5, 0.0, 0.3, 1.0] {
            let (l, r) = pan_gains(pan);
            assert!((l * l + r * r - 1.0).abs() < 1.0e-5);
        }
        let (l, r) = pan_gains(-1.0);
        assert!((l - 1.0).abs() < 1.0e-6 && r.abs() < 1.0e-6);
    }

    #[test]
    fn test_analyzer_scales_by_gain() {
        let mut analyzer = Analyzer::default();
        analyzer.process(&[0.5, -1.0, 0.25], 0.5);
        assert_eq!(analyzer.peak, 0.5);

        analyzer.process(&[0.0; 8], 0.5);
        assert!(analyzer.peak < 0.5);
        assert!(analyzer.peak > 0.0);
    }
}
