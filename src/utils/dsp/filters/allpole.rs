use crate::Error;

// -------------------------------------------------------------------------------------------------

const MAX_ORDER: usize = 16;

// -------------------------------------------------------------------------------------------------

/// Denominator coefficients and numerator gain of an all-pole IIR filter with a fixed maximum
/// order, so coefficient sets can be moved into the real-time thread by value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AllPoleCoefficients {
    a: [f64; MAX_ORDER + 1],
    order: usize,
    gain: f64,
}

impl AllPoleCoefficients {
    /// Maximum supported filter order.
    pub const MAX_ORDER: usize = MAX_ORDER;

    /// Create coefficients from the given monic denominator polynomial `a` (a\[0\] == 1) and a
    /// numerator gain.
    pub fn new(denominator: &[f64], gain: f64) -> Result<Self, Error> {
        if denominator.is_empty() || denominator.len() > Self::MAX_ORDER + 1 {
            return Err(Error::InvalidParameter(format!(
                "Invalid all-pole filter order: must be in range 0..={}, but is {}",
                Self::MAX_ORDER,
                denominator.len() as isize - 1
            )));
        }
        if (denominator[0] - 1.0).abs() > 1e-9 {
            return Err(Error::InvalidParameter(format!(
                "All-pole denominator must be monic, but a[0] is {}",
                denominator[0]
            )));
        }
        if !gain.is_finite() || denominator.iter().any(|c| !c.is_finite()) {
            return Err(Error::InvalidParameter(
                "All-pole coefficients must be finite".to_string(),
            ));
        }
        let mut a = [0.0; Self::MAX_ORDER + 1];
        a[..denominator.len()].copy_from_slice(denominator);
        Ok(Self {
            a,
            order: denominator.len() - 1,
            gain,
        })
    }

    /// A pass-through filter of order 0.
    pub fn identity() -> Self {
        let mut a = [0.0; Self::MAX_ORDER + 1];
        a[0] = 1.0;
        Self {
            a,
            order: 0,
            gain: 1.0,
        }
    }

    /// The filter order: number of poles.
    pub fn order(&self) -> usize {
        self.order
    }

    /// The denominator polynomial, including the leading 1.
    pub fn denominator(&self) -> &[f64] {
        &self.a[..=self.order]
    }

    /// The numerator gain.
    pub fn gain(&self) -> f64 {
        self.gain
    }
}

impl Default for AllPoleCoefficients {
    fn default() -> Self {
        Self::identity()
    }
}

// -------------------------------------------------------------------------------------------------

/// Direct form all-pole filter: `y[n] = g * x[n] - sum(a[k] * y[n - k])`.
#[derive(Debug, Clone)]
pub struct AllPoleFilter {
    history: [f64; MAX_ORDER],
    pos: usize,
}

impl AllPoleFilter {
    pub fn new() -> Self {
        Self {
            history: [0.0; AllPoleCoefficients::MAX_ORDER],
            pos: 0,
        }
    }

    /// Apply the filter on a single sample.
    #[inline]
    pub fn process_sample(&mut self, coefficients: &AllPoleCoefficients, input: f64) -> f64 {
        const LEN: usize = AllPoleCoefficients::MAX_ORDER;
        let mut output = coefficients.gain * input;
        for k in 1..=coefficients.order {
            // history[pos - k] holds y[n - k]
            let y = self.history[(self.pos + LEN - k) % LEN];
            output -= coefficients.a[k] * y;
        }
        self.history[self.pos] = output;
        self.pos = (self.pos + 1) % LEN;
        output
    }

    /// Reset state of filter.
    #[inline]
    pub fn reset(&mut self) {
        self.history = [0.0; AllPoleCoefficients::MAX_ORDER];
        self.pos = 0;
    }
}

impl Default for AllPoleFilter {
    fn default() -> Self {
        Self::new()
    }
}

// -------------------------------------------------------------------------------------------------
