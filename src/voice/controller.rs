use std::{
    collections::HashMap,
    sync::{atomic::Ordering, Arc},
};

use crossbeam_queue::ArrayQueue;

use super::{FilterRouting, VoiceMessage, VoiceOptions, VoiceSharedState};
use crate::{
    formant::{Formant, FormantSet},
    parameter::SourceParameters,
    preset::{clamp_logged, Preset},
    preview::{preview_waveform, PreviewPoint},
    source::{SourceModel, FREQUENCY},
    Error,
};

// -------------------------------------------------------------------------------------------------

/// Callback which gets invoked after a preset got loaded.
pub type PresetListener = Box<dyn Fn(&Preset) + Send + 'static>;

// -------------------------------------------------------------------------------------------------

/// Control side handle of a [`Voice`](super::Voice).
///
/// Validates all changes, mirrors them into a local control state, which can be queried at
/// any time, and sends them to the voice. Changes are applied by the voice in the next
/// processed audio block. When the voice's message queue is full, changes fail with
/// [`Error::SendError`] and the control state is left unchanged.
pub struct VoiceController {
    message_queue: Arc<ArrayQueue<VoiceMessage>>,
    shared_state: Arc<VoiceSharedState>,
    preset_listeners: Vec<PresetListener>,
    // control state
    playing: bool,
    volume: f32,
    model: SourceModel,
    parameters: SourceParameters,
    // last used parameters of models which got switched away from
    model_parameters: HashMap<SourceModel, SourceParameters>,
    formants: FormantSet,
    filters_enabled: bool,
    routing: FilterRouting,
    breathiness: f32,
}

impl VoiceController {
    pub(crate) fn new(
        options: VoiceOptions,
        message_queue: Arc<ArrayQueue<VoiceMessage>>,
        shared_state: Arc<VoiceSharedState>,
    ) -> Self {
        let model = SourceModel::default();
        Self {
            message_queue,
            shared_state,
            preset_listeners: Vec::new(),
            playing: false,
            volume: options.volume,
            model,
            parameters: model.default_parameters(),
            model_parameters: HashMap::new(),
            formants: FormantSet::default(),
            filters_enabled: true,
            routing: FilterRouting::default(),
            breathiness: options.breathiness,
        }
    }

    /// True when the voice was started and not yet stopped.
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// True while the voice produces sound, including the fade-out after it got stopped.
    pub fn is_sounding(&self) -> bool {
        self.shared_state.sounding.load(Ordering::Relaxed)
    }

    /// Number of real-time faults since the voice got created: glottal cycles which failed to
    /// set up and blocks which contained non finite samples.
    pub fn fault_count(&self) -> usize {
        self.shared_state.faults.load(Ordering::Relaxed)
    }

    /// The sample rate the voice currently runs at.
    pub fn sample_rate(&self) -> u32 {
        self.shared_state.sample_rate.load(Ordering::Relaxed)
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// The glottal frequency in Hz.
    pub fn frequency(&self) -> f32 {
        self.parameters.get(&FREQUENCY)
    }

    pub fn source_model(&self) -> SourceModel {
        self.model
    }

    /// Current source parameter values, including the glottal frequency.
    pub fn source_parameters(&self) -> &SourceParameters {
        &self.parameters
    }

    /// Current value of the source parameter with the given name.
    pub fn source_parameter(&self, name: &str) -> Result<f32, Error> {
        let descriptor = self.model.parameter(name).ok_or_else(|| {
            Error::InvalidParameter(format!(
                "Source model '{}' has no parameter '{name}'",
                self.model
            ))
        })?;
        Ok(self.parameters.get(descriptor))
    }

    pub fn formants(&self) -> &FormantSet {
        &self.formants
    }

    /// False when filtering is bypassed.
    pub fn filters_enabled(&self) -> bool {
        self.filters_enabled
    }

    pub fn filter_routing(&self) -> FilterRouting {
        self.routing
    }

    pub fn breathiness(&self) -> f32 {
        self.breathiness
    }

    /// Start playing, fading in the voice.
    pub fn start(&mut self) -> Result<(), Error> {
        self.send(VoiceMessage::Start)?;
        self.playing = true;
        Ok(())
    }

    /// Stop playing. The voice fades out and then outputs silence.
    pub fn stop(&mut self) -> Result<(), Error> {
        self.send(VoiceMessage::Stop)?;
        self.playing = false;
        Ok(())
    }

    /// Set the output volume. Changes are ramped while playing, else applied on start.
    pub fn set_volume(&mut self, volume: f32) -> Result<(), Error> {
        if !(volume >= 0.0 && volume.is_finite()) {
            return Err(Error::InvalidParameter(format!(
                "Volume must be >= 0, but is {volume}"
            )));
        }
        self.send(VoiceMessage::SetVolume(volume))?;
        self.volume = volume;
        Ok(())
    }

    /// Set the glottal frequency in Hz. Applied at the next glottal cycle.
    pub fn set_frequency(&mut self, frequency: f32) -> Result<(), Error> {
        self.set_source_parameter(FREQUENCY.name(), frequency)
    }

    /// Select a source model by its name. The model restores the parameters it last used, or
    /// starts with default parameters, but keeps the current glottal frequency. Applied at the
    /// next glottal cycle.
    pub fn set_source(&mut self, name: &str) -> Result<(), Error> {
        let model = SourceModel::from_name(name)?;
        let mut parameters = if model == self.model {
            self.parameters
        } else {
            self.model_parameters
                .get(&model)
                .copied()
                .unwrap_or_else(|| model.default_parameters())
        };
        parameters.set(FREQUENCY.id(), self.frequency());
        self.send(VoiceMessage::SetSource(model, parameters))?;
        self.switch_model(model, parameters);
        Ok(())
    }

    fn switch_model(&mut self, model: SourceModel, parameters: SourceParameters) {
        if model != self.model {
            self.model_parameters.insert(self.model, self.parameters);
        }
        self.model = model;
        self.parameters = parameters;
    }

    /// Set a parameter of the current source model by its name. Values are clamped into the
    /// parameter's range. Applied at the next glottal cycle.
    pub fn set_source_parameter(&mut self, name: &str, value: f32) -> Result<(), Error> {
        let descriptor = self.model.parameter(name).ok_or_else(|| {
            Error::InvalidParameter(format!(
                "Source model '{}' has no parameter '{name}'",
                self.model
            ))
        })?;
        if !value.is_finite() {
            return Err(Error::InvalidParameter(format!(
                "Value of parameter '{name}' must be finite, but is {value}"
            )));
        }
        let value = clamp_logged(descriptor, value);
        self.send(VoiceMessage::SetSourceParameter(descriptor.id(), value))?;
        self.parameters.set(descriptor.id(), value);
        Ok(())
    }

    /// Enable or bypass filtering.
    pub fn set_filters_enabled(&mut self, enabled: bool) -> Result<(), Error> {
        self.send(VoiceMessage::SetFiltersEnabled(enabled))?;
        self.filters_enabled = enabled;
        Ok(())
    }

    /// Select how the source gets filtered when filtering is enabled.
    pub fn set_filter_routing(&mut self, routing: FilterRouting) -> Result<(), Error> {
        self.send(VoiceMessage::SetFilterRouting(routing))?;
        self.routing = routing;
        Ok(())
    }

    /// Replace all formants. Changes of already active formants are ramped.
    pub fn set_formants(&mut self, formants: FormantSet) -> Result<(), Error> {
        self.send(VoiceMessage::SetFormants(formants))?;
        self.formants = formants;
        Ok(())
    }

    /// Set the center frequency of a single formant in Hz.
    pub fn set_formant_frequency(&mut self, index: usize, frequency: f32) -> Result<(), Error> {
        let mut formants = self.formants;
        formants.set_frequency(index, frequency)?;
        self.set_formant(index, formants)
    }

    /// Set the bandwidth of a single formant in Hz.
    pub fn set_formant_bandwidth(&mut self, index: usize, bandwidth: f32) -> Result<(), Error> {
        let mut formants = self.formants;
        formants.set_bandwidth(index, bandwidth)?;
        self.set_formant(index, formants)
    }

    /// Set the gain of a single formant in dB.
    pub fn set_formant_gain(&mut self, index: usize, gain_db: f32) -> Result<(), Error> {
        let mut formants = self.formants;
        formants.set_gain_db(index, gain_db)?;
        self.set_formant(index, formants)
    }

    fn set_formant(&mut self, index: usize, formants: FormantSet) -> Result<(), Error> {
        let formant: Formant = *formants.get(index)?;
        self.send(VoiceMessage::SetFormant(index, formant))?;
        self.formants = formants;
        Ok(())
    }

    /// Set the aspiration noise level in range 0.0..=1.0. Values are clamped into the range.
    pub fn set_breathiness(&mut self, breathiness: f32) -> Result<(), Error> {
        if !breathiness.is_finite() {
            return Err(Error::InvalidParameter(format!(
                "Breathiness must be finite, but is {breathiness}"
            )));
        }
        let clamped = breathiness.clamp(0.0, 1.0);
        if clamped != breathiness {
            log::warn!("Breathiness {breathiness} is out of range, clamping to {clamped}");
        }
        self.send(VoiceMessage::SetBreathiness(clamped))?;
        self.breathiness = clamped;
        Ok(())
    }

    /// Load a preset: replaces frequency, source and formants, resets the volume to 1.0,
    /// enables filtering and starts playing. Preset listeners get notified afterwards.
    ///
    /// Invalid presets are rejected with [`Error::InvalidPreset`] before anything changes.
    pub fn load_preset(&mut self, preset: &Preset) -> Result<(), Error> {
        let resolved = preset.resolve()?;
        self.send(VoiceMessage::LoadPreset(resolved))?;
        log::info!("Loaded preset '{}'", preset.name);
        self.switch_model(resolved.model, resolved.parameters);
        self.formants = resolved.formants;
        self.volume = 1.0;
        self.filters_enabled = true;
        self.playing = true;
        for listener in &self.preset_listeners {
            listener(preset);
        }
        Ok(())
    }

    /// Register a callback which gets invoked after each successful preset load.
    pub fn add_preset_listener<F>(&mut self, listener: F)
    where
        F: Fn(&Preset) + Send + 'static,
    {
        self.preset_listeners.push(Box::new(listener));
    }

    /// Sample one cycle of the current source waveform for plotting, normalized to a peak
    /// of 1.
    pub fn preview(&self, sample_count: usize) -> Result<Vec<PreviewPoint>, Error> {
        preview_waveform(self.model, &self.parameters, sample_count)
    }

    fn send(&self, message: VoiceMessage) -> Result<(), Error> {
        self.message_queue
            .push(message)
            .map_err(|_| Error::SendError("voice message queue is full".to_string()))
    }
}

// -------------------------------------------------------------------------------------------------
