use std::time::Duration;

use super::{Formant, FormantSet, MAX_FORMANTS};
use crate::{
    utils::{
        dsp::filters::biquad::{BandpassCoefficients, BiquadFilter},
        smoothed::{ExponentialSmoothedValue, SmoothedValue},
    },
    Error,
};

// -------------------------------------------------------------------------------------------------

/// Lowest center frequency a resonator gets tuned to.
const MIN_CENTER_FREQUENCY: f32 = 20.0;
/// Highest center frequency a resonator gets tuned to, relative to the sample rate.
const MAX_CENTER_FREQUENCY_FACTOR: f32 = 0.49;

// -------------------------------------------------------------------------------------------------

/// A single, smoothed bandpass resonator of a [`FormantBank`].
#[derive(Debug, Clone)]
struct FormantResonator {
    frequency: ExponentialSmoothedValue,
    q: ExponentialSmoothedValue,
    gain: ExponentialSmoothedValue,
    coefficients: BandpassCoefficients,
    filter: BiquadFilter,
}

impl FormantResonator {
    fn new(sample_rate: u32, duration: Duration) -> Self {
        let formant = Formant::default();
        let mut resonator = Self {
            frequency: ExponentialSmoothedValue::with_duration(
                formant.frequency,
                duration,
                sample_rate,
            ),
            q: ExponentialSmoothedValue::with_duration(formant.q(), duration, sample_rate),
            gain: ExponentialSmoothedValue::with_duration(formant.gain(), duration, sample_rate),
            coefficients: BandpassCoefficients::default(),
            filter: BiquadFilter::new(),
        };
        resonator.update_coefficients(sample_rate);
        resonator
    }

    fn need_ramp(&self) -> bool {
        self.frequency.need_ramp() || self.q.need_ramp() || self.gain.need_ramp()
    }

    /// Jump to the given formant without ramping and clear the filter state.
    fn init(&mut self, formant: &Formant, sample_rate: u32) {
        self.frequency.init(formant.frequency);
        self.q.init(formant.q());
        self.gain.init(formant.gain());
        self.filter.reset();
        self.update_coefficients(sample_rate);
    }

    /// Ramp towards the given formant.
    fn set_target(&mut self, formant: &Formant) {
        self.frequency.set_target(formant.frequency);
        self.q.set_target(formant.q());
        self.gain.set_target(formant.gain());
    }

    fn set_sample_rate(&mut self, sample_rate: u32) {
        self.frequency.set_sample_rate(sample_rate);
        self.q.set_sample_rate(sample_rate);
        self.gain.set_sample_rate(sample_rate);
        self.frequency.reset();
        self.q.reset();
        self.gain.reset();
        self.filter.reset();
        self.update_coefficients(sample_rate);
    }

    fn update_coefficients(&mut self, sample_rate: u32) {
        let max_center = MAX_CENTER_FREQUENCY_FACTOR * sample_rate as f32;
        let center = self
            .frequency
            .current()
            .clamp(MIN_CENTER_FREQUENCY, max_center.max(MIN_CENTER_FREQUENCY));
        // invalid values keep the previous coefficients
        let _ = self.coefficients.set(sample_rate, center, self.q.current());
    }

    #[inline]
    fn process_sample(&mut self, input: f64, sample_rate: u32) -> f64 {
        let gain = if self.need_ramp() {
            let _ = self.frequency.next();
            let _ = self.q.next();
            self.update_coefficients(sample_rate);
            self.gain.next()
        } else {
            self.gain.target()
        };
        gain as f64 * self.filter.process_sample(&self.coefficients, input)
    }
}

// -------------------------------------------------------------------------------------------------

/// Parallel bank of bandpass resonators, one per formant, each pre-scaled by its gain and
/// summed.
///
/// Formant frequency, quality and gain changes are ramped exponentially. The very first
/// configuration, and formants which become active when the number of formants grows, get
/// applied without ramping. All resonators are preallocated, so reconfiguring the bank never
/// allocates.
#[derive(Debug, Clone)]
pub struct FormantBank {
    sample_rate: u32,
    resonators: [FormantResonator; MAX_FORMANTS],
    formants: Option<FormantSet>,
}

impl FormantBank {
    /// Create a new, not yet configured bank. An unconfigured bank outputs silence.
    pub fn new(sample_rate: u32) -> Self {
        Self::with_ramp_duration(sample_rate, ExponentialSmoothedValue::DEFAULT_DURATION)
    }

    /// Create a new bank with a custom ramp duration for formant changes.
    pub fn with_ramp_duration(sample_rate: u32, duration: Duration) -> Self {
        assert!(sample_rate > 0, "Invalid sample rate");
        Self {
            sample_rate,
            resonators: std::array::from_fn(|_| FormantResonator::new(sample_rate, duration)),
            formants: None,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// The current target formants, if configured.
    pub fn formants(&self) -> Option<&FormantSet> {
        self.formants.as_ref()
    }

    /// Re-initialize all rate dependent state.
    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        assert!(sample_rate > 0, "Invalid sample rate");
        if self.sample_rate != sample_rate {
            self.sample_rate = sample_rate;
            for resonator in &mut self.resonators {
                resonator.set_sample_rate(sample_rate);
            }
        }
    }

    /// Replace all formants, ramping already active resonators to their new targets.
    pub fn set_formants(&mut self, formants: &FormantSet) {
        let active = self.formants.map_or(0, |current| current.len());
        for (index, formant) in formants.iter().enumerate() {
            let resonator = &mut self.resonators[index];
            if index < active {
                resonator.set_target(formant);
            } else {
                resonator.init(formant, self.sample_rate);
            }
        }
        self.formants = Some(*formants);
    }

    /// Update a single formant, ramping towards it. Other formants are not touched.
    pub fn set_formant(&mut self, index: usize, formant: Formant) -> Result<(), Error> {
        let formants = self
            .formants
            .as_mut()
            .ok_or(Error::FormantNotFound(index))?;
        formants.set(index, formant)?;
        self.resonators[index].set_target(&formant);
        Ok(())
    }

    /// Stop all ramps and clear all filter states.
    pub fn reset(&mut self) {
        if let Some(formants) = self.formants {
            for (resonator, formant) in self.resonators.iter_mut().zip(formants.iter()) {
                resonator.init(formant, self.sample_rate);
            }
        }
    }

    /// Filter the given buffer in place.
    pub fn process(&mut self, buffer: &mut [f32]) {
        let active = self.formants.map_or(0, |formants| formants.len());
        let sample_rate = self.sample_rate;
        let resonators = &mut self.resonators[..active];
        for sample in buffer.iter_mut() {
            let input = *sample as f64;
            let mut output = 0.0;
            for resonator in resonators.iter_mut() {
                output += resonator.process_sample(input, sample_rate);
            }
            *sample = output as f32;
        }
    }
}

// -------------------------------------------------------------------------------------------------
