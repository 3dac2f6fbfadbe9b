use four_cc::FourCC;

use super::{SourceModel, SourceShape, FREQUENCY};
use crate::parameter::{ParameterAutomation, SourceParameters};

// -------------------------------------------------------------------------------------------------

/// Drives a glottal source model, tracking the phase within the current glottal cycle.
///
/// Parameter, frequency and model changes are collected as *pending* values and only get
/// captured when a glottal cycle completes, so every cycle is rendered with a consistent
/// parameter snapshot. Automated values are clamped into the model's parameter ranges. When a
/// model fails to prepare its waveform for a snapshot, the cycle renders silence and a fault
/// gets counted. Processing never allocates.
#[derive(Debug, Clone)]
pub struct GlottalOscillator {
    sample_rate: u32,
    // current cycle
    model: SourceModel,
    parameters: SourceParameters,
    shape: SourceShape,
    frequency: f64,
    t0: f64,
    n: u32,
    // next cycle
    pending_model: SourceModel,
    pending_parameters: SourceParameters,
    // shape failures since the last call to `take_faults`
    faults: usize,
    // set after logging a failure, cleared by the next successful cycle
    failure_logged: bool,
}

impl GlottalOscillator {
    /// Create a new oscillator with the given model and parameter snapshot, which starts at
    /// the beginning of a new cycle.
    pub fn new(model: SourceModel, parameters: SourceParameters, sample_rate: u32) -> Self {
        assert!(sample_rate > 0, "Invalid sample rate");
        let mut oscillator = Self {
            sample_rate,
            model,
            parameters,
            shape: SourceShape::Silent,
            frequency: FREQUENCY.default_value() as f64,
            t0: sample_rate as f64 / FREQUENCY.default_value() as f64,
            n: 0,
            pending_model: model,
            pending_parameters: parameters,
            faults: 0,
            failure_logged: false,
        };
        oscillator.start_cycle(parameters);
        oscillator
    }

    /// The model of the currently rendered cycle.
    pub fn model(&self) -> SourceModel {
        self.model
    }

    /// The parameter snapshot of the currently rendered cycle.
    pub fn parameters(&self) -> &SourceParameters {
        &self.parameters
    }

    /// The glottal frequency of the currently rendered cycle in Hz.
    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    /// Length of the current cycle in (fractional) samples.
    pub fn cycle_length(&self) -> f64 {
        self.t0
    }

    /// Sample position within the current cycle.
    pub fn position(&self) -> u32 {
        self.n
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Change the sample rate. Restarts the current cycle with the pending parameters.
    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        assert!(sample_rate > 0, "Invalid sample rate");
        if self.sample_rate != sample_rate {
            self.sample_rate = sample_rate;
            self.reset();
        }
    }

    /// Select a new model and parameter snapshot for the next cycle.
    pub fn set_model(&mut self, model: SourceModel, parameters: SourceParameters) {
        self.pending_model = model;
        self.pending_parameters = parameters;
    }

    /// Set a single parameter value for the next cycle. Returns false when the parameter is
    /// not yet part of the snapshot and the snapshot is full.
    pub fn set_parameter(&mut self, id: FourCC, value: f32) -> bool {
        self.pending_parameters.set(id, value)
    }

    /// Set the glottal frequency for the next cycle.
    pub fn set_frequency(&mut self, frequency: f32) -> bool {
        self.set_parameter(FREQUENCY.id(), frequency)
    }

    /// Restart at the beginning of a new cycle with the pending model and parameters.
    pub fn reset(&mut self) {
        self.start_cycle(self.pending_parameters);
    }

    /// Number of cycles which failed to set up since the last call, resetting the counter.
    pub fn take_faults(&mut self) -> usize {
        std::mem::take(&mut self.faults)
    }

    /// Render glottal flow samples into the given buffer, overwriting its content.
    /// Automation values get captured together with the pending values at cycle boundaries.
    pub fn process(&mut self, output: &mut [f32], automation: &ParameterAutomation) {
        let block_len = output.len();
        for (index, sample) in output.iter_mut().enumerate() {
            *sample = self.shape.sample(self.n as f64 / self.t0);
            self.n += 1;
            if self.n as f64 >= self.t0 {
                let mut parameters = self.pending_parameters;
                if !automation.is_empty() {
                    // automation values at the sample which completed the cycle
                    automation.apply(&mut parameters, index, block_len);
                    self.clamp_parameters(&mut parameters);
                }
                self.start_cycle(parameters);
            }
        }
    }

    fn clamp_parameters(&self, parameters: &mut SourceParameters) {
        for descriptor in self.pending_model.parameters() {
            if let Some(value) = parameters.value(descriptor.id()) {
                parameters.set(descriptor.id(), descriptor.clamp_value(value));
            }
        }
    }

    fn start_cycle(&mut self, parameters: SourceParameters) {
        self.n = 0;
        self.model = self.pending_model;
        self.parameters = parameters;
        let frequency = parameters.get(&FREQUENCY) as f64;
        if frequency.is_finite() && frequency > 0.0 {
            self.frequency = frequency;
        }
        self.t0 = (self.sample_rate as f64 / self.frequency).max(1.0);
        self.shape = match self.model.prepare(&parameters) {
            Ok(shape) => {
                self.failure_logged = false;
                shape
            }
            Err(err) => {
                if !self.failure_logged {
                    log::warn!("Glottal source '{}' failed: {err}", self.model);
                    self.failure_logged = true;
                }
                self.faults += 1;
                SourceShape::Silent
            }
        };
    }
}

// -------------------------------------------------------------------------------------------------
