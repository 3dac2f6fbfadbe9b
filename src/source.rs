//! Glottal source waveform models and the oscillator which drives them.

use std::fmt;

use four_cc::FourCC;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use crate::{
    parameter::{FloatParameter, SourceParameters},
    Error,
};

// -------------------------------------------------------------------------------------------------

pub mod cutoff_sawtooth;
pub mod klglott88;
pub mod liljencrants_fant;
pub mod oscillator;
pub mod rosenberg;

use cutoff_sawtooth::{CutoffSawtooth, CutoffSawtoothShape};
use klglott88::{Klglott88, Klglott88Shape};
use liljencrants_fant::{LiljencrantsFant, LiljencrantsFantShape};
use rosenberg::{RosenbergC, RosenbergCShape};

// -------------------------------------------------------------------------------------------------

/// The glottal vibration frequency in Hz. Declared by all source models.
pub const FREQUENCY: FloatParameter =
    FloatParameter::new(FourCC(*b"freq"), "frequency", 70.0..=600.0, 100.0).with_unit("Hz");

// -------------------------------------------------------------------------------------------------

/// Capabilities of a single glottal flow model.
///
/// Models are stateless: they declare their parameters and create a [`SourceShape`] from a
/// parameter snapshot. The shape then maps normalized cycle time to sample amplitudes.
pub trait GlottalModel {
    /// Parameter descriptors of the model, always including [`FREQUENCY`].
    fn parameters(&self) -> &'static [FloatParameter];

    /// Prepare the waveform for the given parameter snapshot. Missing parameter values fall
    /// back to their defaults. Values are **not** clamped here.
    ///
    /// Never allocates, so this can be called from the real-time thread.
    fn prepare(&self, parameters: &SourceParameters) -> Result<SourceShape, ShapeError>;

    /// Like [`Self::prepare`], but with errors converted to [`Error::NumericDomainError`].
    fn shape(&self, parameters: &SourceParameters) -> Result<SourceShape, Error> {
        Ok(self.prepare(parameters)?)
    }

    /// Sample the model at normalized cycle time `t` in range `[0, 1)`.
    fn sample(&self, t: f64, parameters: &SourceParameters) -> Result<f32, Error> {
        Ok(self.shape(parameters)?.sample(t))
    }
}

// -------------------------------------------------------------------------------------------------

/// Available glottal source models.
///
/// Parses and displays with the model names used in presets: `cutoffSawtooth`, `LF`,
/// `rosenbergC` and `KLGLOTT88`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
pub enum SourceModel {
    #[strum(to_string = "cutoffSawtooth", serialize = "CutoffSawtooth")]
    CutoffSawtooth,
    #[strum(to_string = "LF", serialize = "LiljencrantsFant")]
    LiljencrantsFant,
    #[strum(to_string = "rosenbergC", serialize = "RosenbergC")]
    RosenbergC,
    #[default]
    #[strum(to_string = "KLGLOTT88")]
    Klglott88,
}

impl SourceModel {
    /// Look up a model by its name.
    pub fn from_name(name: &str) -> Result<Self, Error> {
        name.parse::<Self>()
            .map_err(|_| Error::SourceModelNotFound(name.to_string()))
    }

    /// Names of all available models.
    pub fn names() -> Vec<String> {
        Self::iter().map(|model| model.to_string()).collect()
    }

    fn model(&self) -> &'static dyn GlottalModel {
        match self {
            Self::CutoffSawtooth => &CutoffSawtooth,
            Self::LiljencrantsFant => &LiljencrantsFant,
            Self::RosenbergC => &RosenbergC,
            Self::Klglott88 => &Klglott88,
        }
    }

    /// Parameter descriptors of the model, always including [`FREQUENCY`].
    pub fn parameters(&self) -> &'static [FloatParameter] {
        self.model().parameters()
    }

    /// Look up a parameter descriptor by its name.
    pub fn parameter(&self, name: &str) -> Option<&'static FloatParameter> {
        self.parameters().iter().find(|p| p.name() == name)
    }

    /// A parameter record with default values for all of the model's parameters.
    pub fn default_parameters(&self) -> SourceParameters {
        SourceParameters::from_descriptors(self.parameters())
    }

    /// Create a parameter record from name keyed values: unknown names are ignored, missing
    /// values use the parameter defaults and all values get clamped into their ranges.
    pub fn parameters_from_values<'a, I>(&self, values: I) -> SourceParameters
    where
        I: IntoIterator<Item = (&'a str, f32)>,
    {
        let mut parameters = self.default_parameters();
        for (name, value) in values {
            match self.parameter(name) {
                Some(descriptor) if value.is_finite() => {
                    parameters.set(descriptor.id(), descriptor.clamp_value(value));
                }
                Some(_) => log::warn!("Ignoring non finite value for parameter '{name}'"),
                None => log::debug!("Ignoring unknown parameter '{name}' for model '{self}'"),
            }
        }
        parameters
    }

    /// Prepare the waveform for the given parameter snapshot without allocating.
    pub fn prepare(&self, parameters: &SourceParameters) -> Result<SourceShape, ShapeError> {
        self.model().prepare(parameters)
    }

    /// Prepare the waveform for the given parameter snapshot.
    pub fn shape(&self, parameters: &SourceParameters) -> Result<SourceShape, Error> {
        self.model().shape(parameters)
    }

    /// Sample the model at normalized cycle time `t` in range `[0, 1)`.
    pub fn sample(&self, t: f64, parameters: &SourceParameters) -> Result<f32, Error> {
        self.model().sample(t, parameters)
    }
}

// -------------------------------------------------------------------------------------------------

/// A glottal waveform, prepared from a model and a parameter snapshot.
///
/// Shapes are `Copy`, never allocate and sample infallibly, so they can be used in the
/// real-time thread. Heavy model setup, such as the LF return phase solve, happens once when
/// creating the shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SourceShape {
    CutoffSawtooth(CutoffSawtoothShape),
    LiljencrantsFant(LiljencrantsFantShape),
    RosenbergC(RosenbergCShape),
    Klglott88(Klglott88Shape),
    /// Outputs silence. Used as fallback when a model failed to set up.
    Silent,
}

impl SourceShape {
    /// Sample the waveform at normalized cycle time `t` in range `[0, 1)`.
    #[inline]
    pub fn sample(&self, t: f64) -> f32 {
        match self {
            Self::CutoffSawtooth(shape) => shape.sample(t),
            Self::LiljencrantsFant(shape) => shape.sample(t),
            Self::RosenbergC(shape) => shape.sample(t),
            Self::Klglott88(shape) => shape.sample(t),
            Self::Silent => 0.0,
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// Reasons why a model failed to prepare its waveform.
///
/// Plain values only: errors get created in the real-time thread, so they must not allocate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShapeError {
    /// The open quotient is not in range `(0, 1]`.
    OpenQuotient(f64),
    /// The asymmetry coefficient is outside of the model's domain.
    Asymmetry(f64),
    /// The LF growth factor has no real solution.
    GrowthFactor { oq: f64, am: f64 },
    /// The LF return phase solve left the valid domain.
    ReturnPhase { oq: f64, am: f64 },
    /// The LF waveform constants are not finite.
    NonFinite { oq: f64, am: f64 },
}

impl fmt::Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenQuotient(oq) => {
                write!(f, "open quotient must be in range (0, 1], but is {oq}")
            }
            Self::Asymmetry(am) => write!(f, "asymmetry coefficient {am} is out of range"),
            Self::GrowthFactor { oq, am } => {
                write!(f, "LF growth factor is undefined for Oq={oq} am={am}")
            }
            Self::ReturnPhase { oq, am } => {
                write!(f, "LF return phase failed to converge for Oq={oq} am={am}")
            }
            Self::NonFinite { oq, am } => {
                write!(f, "LF constants are not finite for Oq={oq} am={am}")
            }
        }
    }
}

/// Validate that an open quotient is usable as a divisor and lies within a cycle.
pub(crate) fn validate_open_quotient(oq: f64) -> Result<f64, ShapeError> {
    if oq > 0.0 && oq <= 1.0 {
        Ok(oq)
    } else {
        Err(ShapeError::OpenQuotient(oq))
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn in_range_parameter_sets(model: SourceModel) -> Vec<SourceParameters> {
        // sweep all non frequency parameters through their ranges in 8 steps each
        let descriptors = model.parameters();
        let swept = descriptors
            .iter()
            .filter(|p| p.id() != FREQUENCY.id())
            .collect::<Vec<_>>();
        let steps = 8;
        let mut sets = Vec::new();
        let combinations = (steps + 1usize).pow(swept.len() as u32);
        for combination in 0..combinations {
            let mut parameters = model.default_parameters();
            let mut rest = combination;
            for descriptor in &swept {
                let step = rest % (steps + 1);
                rest /= steps + 1;
                let value = descriptor.min_value()
                    + (descriptor.max_value() - descriptor.min_value()) * step as f32
                        / steps as f32;
                parameters.set(descriptor.id(), value);
            }
            sets.push(parameters);
        }
        sets
    }

    #[test]
    fn names() -> Result<(), Error> {
        assert_eq!(SourceModel::from_name("KLGLOTT88")?, SourceModel::Klglott88);
        assert_eq!(SourceModel::from_name("LF")?, SourceModel::LiljencrantsFant);
        assert_eq!(
            SourceModel::from_name("LiljencrantsFant")?,
            SourceModel::LiljencrantsFant
        );
        assert_eq!(SourceModel::from_name("rosenbergC")?, SourceModel::RosenbergC);
        assert_eq!(
            SourceModel::from_name("cutoffSawtooth")?,
            SourceModel::CutoffSawtooth
        );
        assert_eq!(SourceModel::LiljencrantsFant.to_string(), "LF");
        assert_eq!(SourceModel::names().len(), 4);
        assert!(matches!(
            SourceModel::from_name("sine"),
            Err(Error::SourceModelNotFound(_))
        ));
        Ok(())
    }

    #[test]
    fn parameter_declarations() {
        for model in SourceModel::iter() {
            let parameters = model.parameters();
            assert!(parameters.len() <= crate::parameter::MAX_SOURCE_PARAMETERS);
            let frequency = model.parameter("frequency").expect("missing frequency");
            assert_eq!(frequency.default_value(), 100.0);
            assert_eq!(*frequency.range(), 70.0..=600.0);
            assert!(model.parameter("Oq").is_some());
        }
        let am = SourceModel::LiljencrantsFant.parameter("am").unwrap();
        assert_eq!((am.min_value(), am.max_value()), (0.74, 0.95));
        let am = SourceModel::RosenbergC.parameter("am").unwrap();
        assert_eq!(am.default_value(), 0.67);
        assert!(SourceModel::Klglott88.parameter("am").is_none());
    }

    #[test]
    fn parameters_from_values() {
        let model = SourceModel::RosenbergC;
        let parameters =
            model.parameters_from_values([("Oq", 0.5), ("am", 2.0), ("unknown", 1.0)]);
        assert_eq!(parameters.get(model.parameter("Oq").unwrap()), 0.5);
        // clamped
        assert_eq!(parameters.get(model.parameter("am").unwrap()), 0.9);
        // missing: default
        assert_eq!(parameters.get(&FREQUENCY), 100.0);
        assert_eq!(parameters.len(), model.parameters().len());
    }

    #[test]
    fn samples_are_finite() -> Result<(), Error> {
        for model in SourceModel::iter() {
            for parameters in in_range_parameter_sets(model) {
                let shape = model.shape(&parameters)?;
                for k in 0..1000 {
                    let t = k as f64 / 1000.0;
                    let sample = shape.sample(t);
                    assert!(
                        sample.is_finite(),
                        "{model} produced {sample} at t={t} with {parameters:?}"
                    );
                }
                // just below the end of the cycle
                assert!(shape.sample(1.0 - f64::EPSILON).is_finite());
            }
        }
        Ok(())
    }

    #[test]
    fn sample_matches_shape() -> Result<(), Error> {
        for model in SourceModel::iter() {
            let parameters = model.default_parameters();
            let shape = model.shape(&parameters)?;
            assert_eq!(model.sample(0.3, &parameters)?, shape.sample(0.3));
        }
        assert_eq!(SourceShape::Silent.sample(0.5), 0.0);
        Ok(())
    }
}
