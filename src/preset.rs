//! Voice presets: glottal frequency, source model settings and formants.

use crate::{
    formant::{FormantSet, MAX_FORMANTS},
    parameter::{FloatParameter, SourceParameters},
    source::{SourceModel, FREQUENCY},
    Error,
};

// -------------------------------------------------------------------------------------------------

/// Source model name and name keyed parameter values of a [`Preset`].
#[derive(Debug, Clone, PartialEq)]
pub struct PresetSource {
    pub name: String,
    pub parameters: Vec<(String, f32)>,
}

/// Formant frequencies, bandwidths and gains of a [`Preset`]. All arrays must have the same
/// length.
#[derive(Debug, Clone, PartialEq)]
pub struct PresetFormants {
    pub frequencies: Vec<f32>,
    pub bandwidths: Vec<f32>,
    pub gains: Vec<f32>,
}

// -------------------------------------------------------------------------------------------------

/// A complete voice setup, as loaded via [`VoiceController::load_preset`](crate::VoiceController::load_preset).
#[derive(Debug, Clone, PartialEq)]
pub struct Preset {
    pub name: String,
    pub frequency: f32,
    pub source: PresetSource,
    pub formants: PresetFormants,
}

impl Preset {
    /// Bright female /e/, rendered with the KLGLOTT88 source model.
    pub fn bright_female_e() -> Self {
        Self {
            name: "Bright female /e/".to_string(),
            frequency: 245.0,
            source: PresetSource {
                name: "KLGLOTT88".to_string(),
                parameters: vec![("Oq".to_string(), 0.8)],
            },
            formants: PresetFormants {
                frequencies: vec![350.0, 2000.0, 2800.0, 3600.0, 4950.0],
                bandwidths: vec![60.0, 100.0, 120.0, 150.0, 200.0],
                gains: vec![0.0, -20.0, -15.0, -40.0, -56.0],
            },
        }
    }

    /// Dark female /õ/, rendered with the KLGLOTT88 source model.
    pub fn dark_female_o() -> Self {
        Self {
            name: "Dark female /õ/".to_string(),
            frequency: 208.0,
            source: PresetSource {
                name: "KLGLOTT88".to_string(),
                parameters: vec![("Oq".to_string(), 0.6)],
            },
            formants: PresetFormants {
                frequencies: vec![478.0, 813.0, 3450.0, 3590.0, 4420.0],
                bandwidths: vec![30.0, 50.0, 130.0, 160.0, 260.0],
                gains: vec![0.0, -15.0, -18.0, -30.0, -60.0],
            },
        }
    }

    /// All built-in presets.
    pub fn builtin() -> Vec<Self> {
        vec![Self::bright_female_e(), Self::dark_female_o()]
    }

    /// Find a built-in preset by its name.
    pub fn builtin_by_name(name: &str) -> Option<Self> {
        Self::builtin()
            .into_iter()
            .find(|preset| preset.name == name)
    }

    /// Check that the preset can be loaded.
    pub fn validate(&self) -> Result<(), Error> {
        self.resolve().map(|_| ())
    }

    /// Validate the preset and convert it into its plain, real-time friendly representation.
    /// Out of range values are clamped into their parameter ranges.
    pub(crate) fn resolve(&self) -> Result<ResolvedPreset, Error> {
        if !self.frequency.is_finite() {
            return Err(Error::InvalidPreset(format!(
                "'{}': frequency must be finite, but is {}",
                self.name, self.frequency
            )));
        }
        let model = SourceModel::from_name(&self.source.name).map_err(|_| {
            Error::InvalidPreset(format!(
                "'{}': unknown source model '{}'",
                self.name, self.source.name
            ))
        })?;
        let mut parameters = model.default_parameters();
        for (name, value) in &self.source.parameters {
            let descriptor = model.parameter(name).ok_or_else(|| {
                Error::InvalidPreset(format!(
                    "'{}': source model '{model}' has no parameter '{name}'",
                    self.name
                ))
            })?;
            if !value.is_finite() {
                return Err(Error::InvalidPreset(format!(
                    "'{}': value of parameter '{name}' must be finite, but is {value}",
                    self.name
                )));
            }
            parameters.set(descriptor.id(), clamp_logged(descriptor, *value));
        }
        parameters.set(FREQUENCY.id(), clamp_logged(&FREQUENCY, self.frequency));

        let formant_count = self.formants.frequencies.len();
        if formant_count == 0 || formant_count > MAX_FORMANTS {
            return Err(Error::InvalidPreset(format!(
                "'{}': number of formants must be in range 1..={MAX_FORMANTS}, but is {formant_count}",
                self.name
            )));
        }
        let formants = FormantSet::from_arrays(
            &self.formants.frequencies,
            &self.formants.bandwidths,
            &self.formants.gains,
        )
        .map_err(|err| match err {
            Error::InvalidParameter(msg) => Error::InvalidPreset(format!("'{}': {msg}", self.name)),
            err => err,
        })?;

        Ok(ResolvedPreset {
            model,
            parameters,
            formants,
        })
    }
}

impl Default for Preset {
    fn default() -> Self {
        Self::bright_female_e()
    }
}

// -------------------------------------------------------------------------------------------------

/// A validated preset with plain values only, passed to the voice in a single message.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ResolvedPreset {
    pub model: SourceModel,
    pub parameters: SourceParameters,
    pub formants: FormantSet,
}

/// Clamp a value into the descriptor's range, logging when clamping happens.
pub(crate) fn clamp_logged(descriptor: &FloatParameter, value: f32) -> f32 {
    let clamped = descriptor.clamp_value(value);
    if clamped != value {
        log::warn!(
            "Value {value} of parameter '{}' is out of range, clamping to {clamped}",
            descriptor.name()
        );
    }
    clamped
}

// -------------------------------------------------------------------------------------------------
