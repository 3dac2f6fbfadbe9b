//! Smoothed (ramped) parameter values to avoid clicks on parameter changes.

use std::{fmt::Debug, time::Duration};

use crate::utils::buffer::scale_buffer;

// -------------------------------------------------------------------------------------------------

/// A value which glides towards its target, one step per processed sample.
pub trait SmoothedValue: Debug {
    /// The value of the last ramp step.
    fn current(&self) -> f32;
    fn target(&self) -> f32;

    /// Advance the ramp by one step and return the new value.
    fn next(&mut self) -> f32 {
        if self.need_ramp() {
            self.ramp();
            self.current()
        } else {
            self.target()
        }
    }

    /// False once the target got reached. Non ramping values can be applied blockwise.
    fn need_ramp(&self) -> bool;
    fn ramp(&mut self);

    /// Jump to the given value without ramping.
    fn init(&mut self, value: f32);
    fn set_target(&mut self, target: f32);

    /// Ramp speeds are defined in time, so they need to be recalculated for new sample rates.
    fn set_sample_rate(&mut self, sample_rate: u32);
}

// -------------------------------------------------------------------------------------------------

/// Multiply the buffer with a smoothed gain, ramping it per sample when necessary.
pub fn apply_smoothed_gain(buffer: &mut [f32], gain: &mut impl SmoothedValue) {
    if !gain.need_ramp() {
        scale_buffer(buffer, gain.target());
        return;
    }
    buffer.iter_mut().for_each(|sample| *sample *= gain.next());
}

// -------------------------------------------------------------------------------------------------

/// Exponential smoothed value, approaching its target with an inertial exponential curve.
///
/// The per-sample inertia is derived from a ramp duration: after `duration` the value covered
/// 99% of the distance to its target. Once the remaining distance gets negligible, the value
/// snaps to the target and ramping stops.
#[derive(Debug, Clone)]
pub struct ExponentialSmoothedValue {
    current: f64,
    target: f64,
    inertia: f64,
    duration: Duration,
    sample_rate: u32,
}

impl ExponentialSmoothedValue {
    /// Default ramp duration for formant and volume changes.
    pub const DEFAULT_DURATION: Duration = Duration::from_millis(25);

    const SNAP_EPSILON: f64 = 1e-6;

    pub fn new(value: f32, sample_rate: u32) -> Self {
        Self::with_duration(value, Self::DEFAULT_DURATION, sample_rate)
    }

    pub fn with_duration(value: f32, duration: Duration, sample_rate: u32) -> Self {
        assert!(sample_rate > 0, "Invalid sample rate");
        let inertia = Self::inertia(duration, sample_rate);
        Self {
            current: value as f64,
            target: value as f64,
            inertia,
            duration,
            sample_rate,
        }
    }

    /// The ramp duration.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Stop ramping and jump to the target value.
    pub fn reset(&mut self) {
        self.current = self.target;
    }

    fn inertia(duration: Duration, sample_rate: u32) -> f64 {
        if duration.is_zero() {
            1.0
        } else {
            // reach 99% of the target at the given duration: 0.01 = e^(-duration / t)
            const LN100: f64 = 4.605_170_185_988_092;
            let samples_duration = sample_rate as f64 * duration.as_secs_f64() / LN100;
            (1.0 - (-1.0 / samples_duration).exp()).min(1.0)
        }
    }
}

impl SmoothedValue for ExponentialSmoothedValue {
    #[inline(always)]
    fn current(&self) -> f32 {
        self.current as f32
    }

    #[inline(always)]
    fn target(&self) -> f32 {
        self.target as f32
    }

    #[inline(always)]
    fn need_ramp(&self) -> bool {
        self.current != self.target
    }

    fn ramp(&mut self) {
        self.current += (self.target - self.current) * self.inertia;
        let epsilon = Self::SNAP_EPSILON * self.target.abs().max(1e-3);
        if (self.target - self.current).abs() <= epsilon {
            self.current = self.target;
        }
    }

    fn init(&mut self, value: f32) {
        self.target = value as f64;
        self.current = self.target;
    }

    fn set_target(&mut self, target: f32) {
        self.target = target as f64;
        if self.inertia >= 1.0 {
            self.current = self.target;
        }
    }

    fn set_sample_rate(&mut self, sample_rate: u32) {
        assert!(sample_rate > 0, "Invalid sample rate");
        self.sample_rate = sample_rate;
        self.inertia = Self::inertia(self.duration, sample_rate);
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn targets_and_ramps() {
        let mut value = ExponentialSmoothedValue::new(0.0, 44100);
        assert_eq!(value.duration(), ExponentialSmoothedValue::DEFAULT_DURATION);
        value.set_target(0.0);
        assert!(!value.need_ramp());

        value.set_target(1.0);
        assert!(value.need_ramp());
        let first = value.next();
        assert!(first > 0.0 && first < 1.0);

        value.init(0.5);
        assert!(!value.need_ramp());
        assert_eq!((value.current(), value.target()), (0.5, 0.5));

        let mut unramped = ExponentialSmoothedValue::with_duration(0.0, Duration::ZERO, 44100);
        unramped.set_target(1.0);
        assert!(!unramped.need_ramp());
        assert_eq!(unramped.current(), 1.0);
    }

    #[test]
    fn reaches_target_after_duration() {
        const SAMPLE_RATE: u32 = 48000;
        let mut val = ExponentialSmoothedValue::new(1000.0, SAMPLE_RATE);
        val.set_target(2000.0);
        // 25 ms: 99% of the way
        let ramp_samples = SAMPLE_RATE as usize * 25 / 1000;
        for _ in 0..ramp_samples {
            val.ramp();
        }
        assert!((val.current() - 2000.0).abs() <= 10.0 + 0.1);
        assert!(val.current() < 2000.0);
        // finally snaps to the target
        for _ in 0..SAMPLE_RATE / 5 {
            val.ramp();
        }
        assert!(!val.need_ramp());
        assert_eq!(val.current(), 2000.0);
    }

    #[test]
    fn smoothed_gain() {
        let mut gain = ExponentialSmoothedValue::new(1.0, 44100);
        let mut buffer = vec![1.0; 64];
        apply_smoothed_gain(&mut buffer, &mut gain);
        assert!(buffer.iter().all(|s| *s == 1.0));

        gain.set_target(0.0);
        apply_smoothed_gain(&mut buffer, &mut gain);
        assert!(buffer.windows(2).all(|w| w[1] <= w[0]));
        assert!(buffer[63] > 0.0 && buffer[63] < 1.0);
    }
}
