#![doc = include_str!("../README.md")]

// private mods (will be partly re-exported)
mod error;
mod formant;
mod parameter;
mod preset;
mod preview;
mod source;
mod voice;

// public, flat re-exports
pub use error::Error;

pub use parameter::{
    AutomationLane, FloatParameter, ParameterAutomation, SourceParameters, MAX_SOURCE_PARAMETERS,
};

pub use source::{
    oscillator::GlottalOscillator, GlottalModel, ShapeError, SourceModel, SourceShape, FREQUENCY,
};

pub use formant::{
    bank::FormantBank,
    poles::{all_pole_coefficients, expand_polynomial, formant_pole, FormantPoles, MAX_POLES},
    Formant, FormantSet, MAX_FORMANTS,
};

pub use preset::{Preset, PresetFormants, PresetSource};

pub use preview::{
    preview_waveform, preview_waveform_from_values, PreviewPoint, PreviewRequest,
    PreviewResponse, PreviewWorker,
};

pub use voice::{new_voice, FilterRouting, PresetListener, Voice, VoiceController, VoiceOptions};

// public mods
pub mod utils;

pub mod models {
    //! Glottal source model implementations and their parameter descriptors.

    pub use super::source::{
        cutoff_sawtooth::{CutoffSawtooth, CutoffSawtoothShape},
        klglott88::{Klglott88, Klglott88Shape},
        liljencrants_fant::{LiljencrantsFant, LiljencrantsFantShape},
        rosenberg::{RosenbergC, RosenbergCShape},
    };
}
