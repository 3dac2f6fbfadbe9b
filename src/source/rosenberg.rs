use std::f64::consts::PI;

use four_cc::FourCC;

use super::{validate_open_quotient, GlottalModel, ShapeError, SourceShape, FREQUENCY};
use crate::parameter::{FloatParameter, SourceParameters};

// -------------------------------------------------------------------------------------------------

/// Rosenberg C glottal flow model: raised cosine opening and quarter cosine closing phase.
pub struct RosenbergC;

impl RosenbergC {
    pub const OQ: FloatParameter = FloatParameter::new(FourCC(*b"oq  "), "Oq", 0.1..=0.8, 0.6);
    pub const AM: FloatParameter = FloatParameter::new(FourCC(*b"am  "), "am", 0.55..=0.9, 0.67);

    const PARAMETERS: &'static [FloatParameter] = &[FREQUENCY, Self::OQ, Self::AM];
}

impl GlottalModel for RosenbergC {
    fn parameters(&self) -> &'static [FloatParameter] {
        Self::PARAMETERS
    }

    fn prepare(&self, parameters: &SourceParameters) -> Result<SourceShape, ShapeError> {
        let oq = validate_open_quotient(parameters.get(&Self::OQ) as f64)?;
        let am = parameters.get(&Self::AM) as f64;
        if !(am > 0.0 && am < 1.0) {
            return Err(ShapeError::Asymmetry(am));
        }
        Ok(SourceShape::RosenbergC(RosenbergCShape {
            tp: oq * am,
            tn: oq * (1.0 - am),
        }))
    }
}

// -------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RosenbergCShape {
    /// Duration of the opening phase.
    tp: f64,
    /// Duration of the closing phase.
    tn: f64,
}

impl RosenbergCShape {
    #[inline]
    pub fn sample(&self, t: f64) -> f32 {
        if t <= self.tp {
            (0.5 * (1.0 - (PI * t / self.tp).cos())) as f32
        } else if t <= self.tp + self.tn {
            (PI / 2.0 * (t - self.tp) / self.tn).cos() as f32
        } else {
            0.0
        }
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    fn shape(oq: f32, am: f32) -> Result<RosenbergCShape, Error> {
        let mut parameters = SourceParameters::from_descriptors(RosenbergC.parameters());
        parameters.set(RosenbergC::OQ.id(), oq);
        parameters.set(RosenbergC::AM.id(), am);
        match RosenbergC.shape(&parameters)? {
            SourceShape::RosenbergC(shape) => Ok(shape),
            other => panic!("unexpected shape {other:?}"),
        }
    }

    #[test]
    fn breakpoints() -> Result<(), Error> {
        let shape = shape(0.6, 0.5)?;
        assert_eq!(shape.sample(0.0), 0.0);
        assert!((shape.sample(0.3) - 1.0).abs() < 1e-6);
        assert!(shape.sample(0.6).abs() < 1e-6);
        assert_eq!(shape.sample(0.61), 0.0);
        Ok(())
    }

    #[test]
    fn continuous_at_breakpoints() -> Result<(), Error> {
        for (oq, am) in [(0.1, 0.55), (0.6, 0.67), (0.8, 0.9)] {
            let shape = shape(oq, am)?;
            for breakpoint in [shape.tp, shape.tp + shape.tn] {
                let before = shape.sample(breakpoint - 1e-9);
                let after = shape.sample(breakpoint + 1e-9);
                assert!(
                    (before - after).abs() < 1e-5,
                    "discontinuity at {breakpoint} for Oq={oq} am={am}"
                );
            }
        }
        Ok(())
    }

    #[test]
    fn invalid_asymmetry() {
        assert!(matches!(
            shape(0.6, 1.0),
            Err(Error::NumericDomainError(_))
        ));
    }
}
