use std::f64::consts::PI;

use four_cc::FourCC;

use super::{validate_open_quotient, GlottalModel, ShapeError, SourceShape, FREQUENCY};
use crate::parameter::{FloatParameter, SourceParameters};

// -------------------------------------------------------------------------------------------------

/// Liljencrants-Fant glottal flow derivative model, integrated to a flow waveform.
///
/// The open phase is an exponentially growing sinusoid up to the excitation instant `te`
/// (= Oq), followed by an exponential return phase which is solved numerically.
pub struct LiljencrantsFant;

impl LiljencrantsFant {
    pub const OQ: FloatParameter = FloatParameter::new(FourCC(*b"oq  "), "Oq", 0.2..=0.8, 0.6);
    pub const AM: FloatParameter = FloatParameter::new(FourCC(*b"am  "), "am", 0.74..=0.95, 0.77);

    const PARAMETERS: &'static [FloatParameter] = &[FREQUENCY, Self::OQ, Self::AM];
}

impl GlottalModel for LiljencrantsFant {
    fn parameters(&self) -> &'static [FloatParameter] {
        Self::PARAMETERS
    }

    fn prepare(&self, parameters: &SourceParameters) -> Result<SourceShape, ShapeError> {
        let oq = parameters.get(&Self::OQ) as f64;
        let am = parameters.get(&Self::AM) as f64;
        Ok(SourceShape::LiljencrantsFant(LiljencrantsFantShape::solve(
            oq, am,
        )?))
    }
}

// -------------------------------------------------------------------------------------------------

/// Solved LF waveform constants for a single open quotient and asymmetry pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiljencrantsFantShape {
    te: f64,
    mtc: f64,
    a: f64,
    wa: f64,
    e0: f64,
    e1: f64,
    rb: f64,
    exp_mtc_rb: f64,
}

impl LiljencrantsFantShape {
    /// Relative amplitude of the negative peak at the excitation instant.
    const P2: f64 = 0.1;
    /// Fixed number of Newton steps when solving the return phase time constant.
    pub const NEWTON_ITERATIONS: usize = 4;

    /// Solve the waveform constants for the given open quotient `oq` and asymmetry `am`.
    pub fn solve(oq: f64, am: f64) -> Result<Self, ShapeError> {
        let te = validate_open_quotient(oq)?;
        if !(am > 0.0 && am.is_finite()) {
            return Err(ShapeError::Asymmetry(am));
        }
        let p2 = Self::P2;
        let mtc = te - 1.0;
        let wa = PI / (te * am);

        let log_arg = -p2 * (wa * te).sin();
        if !(log_arg > 0.0 && log_arg.is_finite()) {
            return Err(ShapeError::GrowthFactor { oq, am });
        }
        let a = -log_arg.ln() / te;
        let a2_wa2 = a * a + wa * wa;
        let e0 = 1.0 / ((wa * (a * PI / wa).exp() + 1.0) / a2_wa2);

        let int_a = e0 * ((wa / (wa * te).tan() - a) / p2 + wa) / a2_wa2;
        let rb0 = p2 * int_a;
        let mut rb = rb0;
        for _ in 0..Self::NEWTON_ITERATIONS {
            rb = Self::newton_step(rb, mtc, rb0).ok_or(ShapeError::ReturnPhase { oq, am })?;
        }

        let exp_mtc_rb = (mtc / rb).exp();
        let e1 = 1.0 / (p2 * (1.0 - exp_mtc_rb));
        let shape = Self {
            te,
            mtc,
            a,
            wa,
            e0,
            e1,
            rb,
            exp_mtc_rb,
        };
        if [a, e0, e1, rb, exp_mtc_rb].iter().all(|v| v.is_finite()) {
            Ok(shape)
        } else {
            Err(ShapeError::NonFinite { oq, am })
        }
    }

    /// A single Newton step for the return phase time constant `rb`, solving
    /// `rb + mtc * (1 / (1 - exp(mtc / rb)) - 1) = rb0`. Returns `None` when the step leaves
    /// the valid domain.
    fn newton_step(rb: f64, mtc: f64, rb0: f64) -> Option<f64> {
        let kk = 1.0 - (mtc / rb).exp();
        let err = rb + mtc * (1.0 / kk - 1.0) - rb0;
        let q = mtc / rb / kk;
        let derr = 1.0 - (1.0 - kk) * q * q;
        let next = rb - err / derr;
        if next.is_finite() && next > 0.0 {
            Some(next)
        } else {
            None
        }
    }

    /// The solved return phase time constant.
    pub fn return_phase(&self) -> f64 {
        self.rb
    }

    #[inline]
    pub fn sample(&self, t: f64) -> f32 {
        let value = if t < self.te {
            let (a, wa) = (self.a, self.wa);
            self.e0 * ((a * t).exp() * (a * (wa * t).sin() - wa * (wa * t).cos()) + wa)
                / (a * a + wa * wa)
        } else {
            self.e1
                * (self.exp_mtc_rb * (t - 1.0 - self.rb) + ((self.te - t) / self.rb).exp() * self.rb)
        };
        value as f32
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn default_constants() -> Result<(), Error> {
        let shape = LiljencrantsFantShape::solve(0.6, 0.77)?;
        assert!((shape.return_phase() - 0.030_410_045).abs() < 1e-6);
        assert!((shape.a - 4.1958).abs() < 1e-3);
        assert!((shape.e1 - 10.0).abs() < 1e-3);
        Ok(())
    }

    #[test]
    fn return_phase_converges() -> Result<(), Error> {
        for (oq, am) in [(0.6, 0.77), (0.4, 0.8), (0.2, 0.74), (0.8, 0.8)] {
            let shape = LiljencrantsFantShape::solve(oq, am)?;
            let rb0 = LiljencrantsFantShape::P2 * shape.e0 * ((shape.wa / (shape.wa * shape.te).tan()
                - shape.a)
                / LiljencrantsFantShape::P2
                + shape.wa)
                / (shape.a * shape.a + shape.wa * shape.wa);
            let next = LiljencrantsFantShape::newton_step(shape.rb, shape.mtc, rb0)
                .expect("newton step failed");
            assert!(
                (next - shape.rb).abs() < 1e-6,
                "return phase not converged for Oq={oq} am={am}"
            );
        }
        Ok(())
    }

    #[test]
    fn waveform_starts_and_ends_near_zero() -> Result<(), Error> {
        let shape = LiljencrantsFantShape::solve(0.6, 0.77)?;
        assert!(shape.sample(0.0).abs() < 1e-6);
        assert!(shape.sample(1.0 - 1e-9).abs() < 1e-3);
        let peak = (0..1000)
            .map(|k| shape.sample(k as f64 / 1000.0))
            .fold(f32::MIN, f32::max);
        assert!(peak > 1.0 && peak < 1.2, "unexpected peak {peak}");
        Ok(())
    }

    #[test]
    fn continuous_at_excitation_instant() -> Result<(), Error> {
        let shape = LiljencrantsFantShape::solve(0.6, 0.77)?;
        let before = shape.sample(0.6 - 1e-9);
        let after = shape.sample(0.6);
        assert!((before - after).abs() < 1e-3);
        Ok(())
    }

    #[test]
    fn domain_errors() {
        // sin(wa * te) > 0: no real growth factor
        assert!(matches!(
            LiljencrantsFantShape::solve(0.6, 0.4),
            Err(ShapeError::GrowthFactor { .. })
        ));
        assert!(matches!(
            LiljencrantsFantShape::solve(0.0, 0.77),
            Err(ShapeError::OpenQuotient(_))
        ));
        let mut parameters = SourceParameters::from_descriptors(LiljencrantsFant.parameters());
        parameters.set(LiljencrantsFant::AM.id(), 0.4);
        assert!(LiljencrantsFant.shape(&parameters).is_err());
    }
}
