use std::f64;

use crate::Error;

// -------------------------------------------------------------------------------------------------

/// Coefficients of a constant 0 dB peak gain bandpass, as used for formant resonators.
///
/// See [BiquadFilter] for more info about the filter implementation.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct BandpassCoefficients {
    sample_rate: u32,
    center: f32,
    q: f32,
    a1: f64,
    a2: f64,
    a3: f64,
    m1: f64,
}

impl BandpassCoefficients {
    pub fn new(sample_rate: u32, center: f32, q: f32) -> Result<Self, Error> {
        let mut coefficients = BandpassCoefficients::default();
        coefficients.set(sample_rate, center, q)?;
        Ok(coefficients)
    }

    /// Get currently applied sample rate
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// The center frequency of the bandpass in Hz.
    pub fn center(&self) -> f32 {
        self.center
    }

    /// The quality of the bandpass: center frequency / bandwidth.
    pub fn q(&self) -> f32 {
        self.q
    }

    /// Sets and applies a batch of new filter parameters.
    pub fn set(&mut self, sample_rate: u32, center: f32, q: f32) -> Result<(), Error> {
        if self.sample_rate != sample_rate || self.center != center || self.q != q {
            if sample_rate == 0 {
                return Err(Error::InvalidParameter(format!(
                    "Invalid filter sample-rate: must be > 0, but is {sample_rate}"
                )));
            }
            if !(q > 0.0 && q.is_finite()) {
                return Err(Error::InvalidParameter(format!(
                    "Invalid filter Q: must be > 0, but is {q}"
                )));
            }
            if !(center > 0.0 && center < sample_rate as f32 / 2.0) {
                return Err(Error::InvalidParameter(format!(
                    "Invalid filter frequency: must be in range 0..nyquist {n}, but is {center}",
                    n = sample_rate as f32 / 2.0,
                )));
            }
            self.sample_rate = sample_rate;
            self.center = center;
            self.q = q;
            self.apply();
        }
        Ok(())
    }

    fn apply(&mut self) {
        let g = f64::tan(f64::consts::PI * self.center as f64 / self.sample_rate as f64);
        let k = 1.0 / self.q as f64;
        self.a1 = 1.0 / (1.0 + g * (g + k));
        self.a2 = g * self.a1;
        self.a3 = g * self.a2;
        // scale the band output by k for a unity gain peak at the center frequency
        self.m1 = k;
    }
}

// -------------------------------------------------------------------------------------------------

/// State variable biquad filter, designed by Andrew Simper of Cytomic.
/// See <http://cytomic.com/files/dsp/SvfLinearTrapOptimised2.pdf>
///
/// The frequency response of this filter is the same as of BZT filters.
///
/// This filter is stable when modulated at high rates, which allows ramping formant
/// frequencies and bandwidths per sample.
#[derive(Default, Debug, Clone)]
pub struct BiquadFilter {
    ic1eq: f64,
    ic2eq: f64,
}

impl BiquadFilter {
    pub fn new() -> Self {
        Self {
            ic1eq: 0.0,
            ic2eq: 0.0,
        }
    }

    /// Apply the filter on a single sample.
    #[inline]
    pub fn process_sample(&mut self, coefficients: &BandpassCoefficients, input: f64) -> f64 {
        let v0 = input;
        let v3 = v0 - self.ic2eq;
        let v1 = coefficients.a1 * self.ic1eq + coefficients.a2 * v3;
        let v2 = self.ic2eq + coefficients.a2 * self.ic1eq + coefficients.a3 * v3;
        self.ic1eq = 2.0 * v1 - self.ic1eq;
        self.ic2eq = 2.0 * v2 - self.ic2eq;
        coefficients.m1 * v1
    }

    /// Reset state of filter.
    /// Can be used when the audio callback is restarted.
    #[inline]
    pub fn reset(&mut self) {
        self.ic1eq = 0.0;
        self.ic2eq = 0.0;
    }
}

// -------------------------------------------------------------------------------------------------
