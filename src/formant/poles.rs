//! Pole placement for formants and expansion into all-pole filter coefficients.
//!
//! All calculations use fixed size buffers, so coefficients can be recalculated in the
//! real-time thread whenever formants or the sample rate change.

use std::f64::consts::PI;

use num_complex::{Complex, Complex64};

use super::{Formant, FormantSet, MAX_FORMANTS};
use crate::{utils::dsp::filters::allpole::AllPoleCoefficients, Error};

// -------------------------------------------------------------------------------------------------

/// Maximum number of poles: one conjugate pair per formant.
pub const MAX_POLES: usize = 2 * MAX_FORMANTS;

// -------------------------------------------------------------------------------------------------

/// Place the z-plane pole of a single formant: radius `exp(-π·Bw/fs)`, angle `2π·F/fs`.
pub fn formant_pole(formant: &Formant, sample_rate: u32) -> Complex64 {
    let sample_rate = sample_rate as f64;
    let radius = (-PI * formant.bandwidth as f64 / sample_rate).exp();
    let angle = 2.0 * PI * formant.frequency as f64 / sample_rate;
    Complex::from_polar(radius, angle)
}

// -------------------------------------------------------------------------------------------------

/// Poles of a [`FormantSet`]: the poles of all formants, followed by their complex conjugates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FormantPoles {
    poles: [Complex64; MAX_POLES],
    len: usize,
}

impl FormantPoles {
    pub fn new(formants: &FormantSet, sample_rate: u32) -> Self {
        let count = formants.len();
        let mut poles = [Complex64::new(0.0, 0.0); MAX_POLES];
        for (index, formant) in formants.iter().enumerate() {
            let pole = formant_pole(formant, sample_rate);
            poles[index] = pole;
            poles[count + index] = pole.conj();
        }
        Self {
            poles,
            len: 2 * count,
        }
    }

    pub fn as_slice(&self) -> &[Complex64] {
        &self.poles[..self.len]
    }
}

// -------------------------------------------------------------------------------------------------

/// Expand `(1 - z_0·x)(1 - z_1·x)...` into polynomial coefficients, lowest power first.
/// `polynomial` must have room for `roots.len() + 1` coefficients.
pub fn expand_polynomial(roots: &[Complex64], polynomial: &mut [Complex64]) -> Result<(), Error> {
    if polynomial.len() != roots.len() + 1 {
        return Err(Error::InvalidParameter(format!(
            "Polynomial buffer must have {} entries, but has {}",
            roots.len() + 1,
            polynomial.len()
        )));
    }
    polynomial.fill(Complex64::new(0.0, 0.0));
    polynomial[0] = Complex64::new(1.0, 0.0);
    for (k, root) in roots.iter().enumerate() {
        // update from the back, so lower coefficients are still the previous ones
        for i in (1..=k + 1).rev() {
            let previous = polynomial[i - 1];
            polynomial[i] -= root * previous;
        }
    }
    Ok(())
}

/// Calculate all-pole filter coefficients for the given formants.
///
/// The denominator is the real part of the expanded conjugate pole polynomial. The numerator
/// gain normalizes the response to unity at the first formant's center frequency. Formant
/// gains are not applied.
pub fn all_pole_coefficients(
    formants: &FormantSet,
    sample_rate: u32,
) -> Result<AllPoleCoefficients, Error> {
    if sample_rate == 0 {
        return Err(Error::InvalidParameter(
            "Invalid sample rate: must be > 0".to_string(),
        ));
    }
    let poles = FormantPoles::new(formants, sample_rate);
    let order = poles.as_slice().len();
    let mut polynomial = [Complex64::new(0.0, 0.0); MAX_POLES + 1];
    expand_polynomial(poles.as_slice(), &mut polynomial[..=order])?;
    let mut denominator = [0.0; MAX_POLES + 1];
    for (a, c) in denominator.iter_mut().zip(&polynomial[..=order]) {
        *a = c.re;
    }
    let denominator = &denominator[..=order];
    let gain = match formants.iter().next() {
        Some(first) => response_magnitude(denominator, first.frequency as f64, sample_rate),
        None => 1.0,
    };
    AllPoleCoefficients::new(denominator, gain)
}

/// Magnitude of the polynomial `A(e^(jω))` at the given frequency.
fn response_magnitude(polynomial: &[f64], frequency: f64, sample_rate: u32) -> f64 {
    let omega = 2.0 * PI * frequency / sample_rate as f64;
    polynomial
        .iter()
        .enumerate()
        .fold(Complex64::new(0.0, 0.0), |sum, (k, a)| {
            sum + Complex::from_polar(*a, -omega * k as f64)
        })
        .norm()
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::dsp::filters::allpole::AllPoleFilter;

    #[test]
    fn single_formant_biquad() -> Result<(), Error> {
        let sample_rate = 48000;
        let formants = FormantSet::new(&[Formant::new(500.0, 50.0, 0.0)])?;
        let coefficients = all_pole_coefficients(&formants, sample_rate)?;
        let r = (-PI * 50.0 / 48000.0).exp();
        let phi = 2.0 * PI * 500.0 / 48000.0;
        let expected = [1.0, -2.0 * r * phi.cos(), r * r];
        assert_eq!(coefficients.order(), 2);
        for (a, e) in coefficients.denominator().iter().zip(expected) {
            assert!((a - e).abs() < 1e-12, "{a} != {e}");
        }
        Ok(())
    }

    #[test]
    fn polynomial_expansion() -> Result<(), Error> {
        // (1 - 2x)(1 - 3x) = 1 - 5x + 6x^2
        let roots = [Complex64::new(2.0, 0.0), Complex64::new(3.0, 0.0)];
        let mut polynomial = [Complex64::new(0.0, 0.0); 3];
        expand_polynomial(&roots, &mut polynomial)?;
        assert_eq!(
            polynomial,
            [
                Complex64::new(1.0, 0.0),
                Complex64::new(-5.0, 0.0),
                Complex64::new(6.0, 0.0)
            ]
        );
        let mut polynomial = [Complex64::new(0.0, 0.0); 1];
        expand_polynomial(&[], &mut polynomial)?;
        assert_eq!(polynomial, [Complex64::new(1.0, 0.0)]);
        assert!(expand_polynomial(&roots, &mut polynomial).is_err());
        Ok(())
    }

    #[test]
    fn conjugate_pairs_give_real_polynomial() -> Result<(), Error> {
        let formants = FormantSet::from_arrays(
            &[350.0, 2000.0, 2800.0, 3600.0, 4950.0],
            &[60.0, 100.0, 120.0, 150.0, 200.0],
            &[0.0, -20.0, -15.0, -40.0, -56.0],
        )?;
        let poles = FormantPoles::new(&formants, 44100);
        assert_eq!(poles.as_slice().len(), 10);
        assert_eq!(poles.as_slice()[5], poles.as_slice()[0].conj());
        let mut polynomial = [Complex64::new(0.0, 0.0); 11];
        expand_polynomial(poles.as_slice(), &mut polynomial)?;
        assert!(polynomial.iter().all(|c| c.im.abs() < 1e-9));
        let coefficients = all_pole_coefficients(&formants, 44100)?;
        assert_eq!(coefficients.order(), 10);
        Ok(())
    }

    #[test]
    fn normalized_at_first_formant() -> Result<(), Error> {
        let sample_rate = 48000;
        let formants = FormantSet::new(&[Formant::new(1000.0, 100.0, 0.0)])?;
        let coefficients = all_pole_coefficients(&formants, sample_rate)?;
        let mut filter = AllPoleFilter::new();
        let mut peak = 0.0f64;
        for n in 0..sample_rate as usize {
            let input = (2.0 * PI * 1000.0 * n as f64 / sample_rate as f64).sin();
            let output = filter.process_sample(&coefficients, input);
            if n > sample_rate as usize / 2 {
                peak = peak.max(output.abs());
            }
        }
        assert!((peak - 1.0).abs() < 0.01, "peak was {peak}");
        Ok(())
    }
}
