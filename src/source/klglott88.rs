use four_cc::FourCC;

use super::{validate_open_quotient, GlottalModel, ShapeError, SourceShape, FREQUENCY};
use crate::parameter::{FloatParameter, SourceParameters};

// -------------------------------------------------------------------------------------------------

/// KLGLOTT88 glottal flow model (Klatt & Klatt 1990): a cubic polynomial open phase.
pub struct Klglott88;

impl Klglott88 {
    pub const OQ: FloatParameter = FloatParameter::new(FourCC(*b"oq  "), "Oq", 0.1..=0.8, 0.6);

    const PARAMETERS: &'static [FloatParameter] = &[FREQUENCY, Self::OQ];
}

impl GlottalModel for Klglott88 {
    fn parameters(&self) -> &'static [FloatParameter] {
        Self::PARAMETERS
    }

    fn prepare(&self, parameters: &SourceParameters) -> Result<SourceShape, ShapeError> {
        let oq = validate_open_quotient(parameters.get(&Self::OQ) as f64)?;
        Ok(SourceShape::Klglott88(Klglott88Shape { oq }))
    }
}

// -------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Klglott88Shape {
    oq: f64,
}

impl Klglott88Shape {
    #[inline]
    pub fn sample(&self, t: f64) -> f32 {
        if t <= self.oq {
            let x = t / self.oq;
            (x * x - x * x * x) as f32
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

    fn shape(oq: f32) -> Result<SourceShape, Error> {
        let mut parameters = SourceParameters::from_descriptors(Klglott88.parameters());
        parameters.set(Klglott88::OQ.id(), oq);
        Klglott88.shape(&parameters)
    }

    #[test]
    fn peak_at_two_thirds_of_open_phase() -> Result<(), Error> {
        let oq = 0.6;
        let shape = shape(oq as f32)?;
        let peak_t = 2.0 * oq / 3.0;
        let peak = shape.sample(peak_t);
        assert!((peak - 4.0 / 27.0).abs() < 1e-6);
        assert!(shape.sample(peak_t - 0.01) < peak);
        assert!(shape.sample(peak_t + 0.01) < peak);
        assert_eq!(shape.sample(0.0), 0.0);
        Ok(())
    }

    #[test]
    fn continuous_at_open_quotient() -> Result<(), Error> {
        for oq in [0.1f32, 0.45, 0.8] {
            let shape = shape(oq)?;
            let oq = oq as f64;
            let before = shape.sample(oq - 1e-9);
            let after = shape.sample(oq + 1e-9);
            assert!((before - after).abs() < 1e-6, "discontinuity at Oq={oq}");
        }
        Ok(())
    }
}
