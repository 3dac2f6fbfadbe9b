use four_cc::FourCC;

use super::{validate_open_quotient, GlottalModel, ShapeError, SourceShape, FREQUENCY};
use crate::parameter::{FloatParameter, SourceParameters};

// -------------------------------------------------------------------------------------------------

/// Sawtooth which falls from 1 during the open phase and drops to zero at the open quotient.
pub struct CutoffSawtooth;

impl CutoffSawtooth {
    pub const OQ: FloatParameter = FloatParameter::new(FourCC(*b"oq  "), "Oq", 0.2..=0.8, 0.6);

    const PARAMETERS: &'static [FloatParameter] = &[FREQUENCY, Self::OQ];
}

impl GlottalModel for CutoffSawtooth {
    fn parameters(&self) -> &'static [FloatParameter] {
        Self::PARAMETERS
    }

    fn prepare(&self, parameters: &SourceParameters) -> Result<SourceShape, ShapeError> {
        let oq = validate_open_quotient(parameters.get(&Self::OQ) as f64)?;
        Ok(SourceShape::CutoffSawtooth(CutoffSawtoothShape { oq }))
    }
}

// -------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CutoffSawtoothShape {
    oq: f64,
}

impl CutoffSawtoothShape {
    #[inline]
    pub fn sample(&self, t: f64) -> f32 {
        if t < self.oq {
            (1.0 - t) as f32
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

    #[test]
    fn waveform() -> Result<(), Error> {
        let mut parameters = SourceParameters::from_descriptors(CutoffSawtooth.parameters());
        parameters.set(CutoffSawtooth::OQ.id(), 0.5);
        let shape = CutoffSawtooth.shape(&parameters)?;
        assert_eq!(shape.sample(0.0), 1.0);
        assert_eq!(shape.sample(0.25), 0.75);
        assert_eq!(shape.sample(0.5), 0.0);
        assert_eq!(shape.sample(0.9), 0.0);
        Ok(())
    }

    #[test]
    fn invalid_open_quotient() {
        let mut parameters = SourceParameters::new();
        parameters.set(CutoffSawtooth::OQ.id(), 0.0);
        assert!(matches!(
            CutoffSawtooth.shape(&parameters),
            Err(Error::NumericDomainError(_))
        ));
    }
}
