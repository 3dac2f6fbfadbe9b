//! The real-time voice: glottal source, aspiration noise, formant filters and output volume.

use std::{
    sync::{
        atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use crossbeam_queue::ArrayQueue;
use four_cc::FourCC;
use rand::{rngs::SmallRng, Rng, SeedableRng};
use strum::{Display, EnumIter, EnumString};

use crate::{
    formant::{bank::FormantBank, poles::all_pole_coefficients, Formant, FormantSet},
    parameter::{ParameterAutomation, SourceParameters},
    preset::ResolvedPreset,
    source::{oscillator::GlottalOscillator, SourceModel},
    utils::{
        buffer::{clear_buffer, flush_non_finite},
        dsp::filters::allpole::{AllPoleCoefficients, AllPoleFilter},
        smoothed::{apply_smoothed_gain, ExponentialSmoothedValue, SmoothedValue},
    },
    Error,
};

// -------------------------------------------------------------------------------------------------

mod controller;
pub use controller::{PresetListener, VoiceController};

// -------------------------------------------------------------------------------------------------

/// How the glottal source signal gets filtered.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
pub enum FilterRouting {
    /// Parallel bandpass resonators, one per formant, with smoothed parameter changes.
    #[default]
    FormantBank,
    /// A single all-pole filter, built from conjugate formant pole pairs. Formant gains are
    /// ignored and changes are applied without smoothing.
    AllPole,
    /// No filtering: the source signal is passed through.
    Bypass,
}

// -------------------------------------------------------------------------------------------------

/// Options for creating a new voice.
#[derive(Debug, Clone, Copy)]
pub struct VoiceOptions {
    /// By default 44100. The sample rate the voice initially runs at. Changes of the actual
    /// rate in [`Voice::process`] re-initialize the voice's rate dependent state.
    pub sample_rate: u32,

    /// By default 25 ms. Ramp duration for volume and formant changes and the stop fade-out.
    pub ramp_duration: Duration,

    /// By default 64. Max number of pending control messages. Sends fail when the voice
    /// does not consume messages fast enough.
    pub message_queue_size: usize,

    /// By default 1.0. Initial output volume.
    pub volume: f32,

    /// By default 0.0. Initial aspiration noise level in range 0.0..=1.0.
    pub breathiness: f32,

    /// Seed of the aspiration noise generator. Voices with the same seed render the same noise.
    pub noise_seed: u64,
}

impl Default for VoiceOptions {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            ramp_duration: ExponentialSmoothedValue::DEFAULT_DURATION,
            message_queue_size: 64,
            volume: 1.0,
            breathiness: 0.0,
            noise_seed: 0x5eed,
        }
    }
}

impl VoiceOptions {
    pub fn sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn ramp_duration(mut self, duration: Duration) -> Self {
        self.ramp_duration = duration;
        self
    }

    pub fn message_queue_size(mut self, size: usize) -> Self {
        self.message_queue_size = size;
        self
    }

    pub fn volume(mut self, volume: f32) -> Self {
        self.volume = volume;
        self
    }

    pub fn breathiness(mut self, breathiness: f32) -> Self {
        self.breathiness = breathiness;
        self
    }

    pub fn noise_seed(mut self, seed: u64) -> Self {
        self.noise_seed = seed;
        self
    }

    /// Validate all options. Returns Error::InvalidParameter on errors.
    pub fn validate(&self) -> Result<(), Error> {
        if self.sample_rate == 0 {
            return Err(Error::InvalidParameter(format!(
                "voice options 'sample_rate' value is '{}'",
                self.sample_rate
            )));
        }
        if self.message_queue_size == 0 {
            return Err(Error::InvalidParameter(format!(
                "voice options 'message_queue_size' value is '{}'",
                self.message_queue_size
            )));
        }
        if self.volume < 0.0 || !self.volume.is_finite() {
            return Err(Error::InvalidParameter(format!(
                "voice options 'volume' value is '{}'",
                self.volume
            )));
        }
        if !(0.0..=1.0).contains(&self.breathiness) {
            return Err(Error::InvalidParameter(format!(
                "voice options 'breathiness' value is '{}'",
                self.breathiness
            )));
        }
        Ok(())
    }
}

// -------------------------------------------------------------------------------------------------

/// Messages from a [`VoiceController`] to its [`Voice`].
#[derive(Debug, Clone, Copy)]
pub(crate) enum VoiceMessage {
    Start,
    Stop,
    SetVolume(f32),
    SetSource(SourceModel, SourceParameters),
    SetSourceParameter(FourCC, f32),
    SetFiltersEnabled(bool),
    SetFilterRouting(FilterRouting),
    SetFormant(usize, Formant),
    SetFormants(FormantSet),
    SetBreathiness(f32),
    LoadPreset(ResolvedPreset),
}

// -------------------------------------------------------------------------------------------------

/// State shared between a [`Voice`] and its [`VoiceController`].
#[derive(Debug)]
pub(crate) struct VoiceSharedState {
    /// True while the voice produces sound, including the stop fade-out.
    pub sounding: AtomicBool,
    /// Number of faults (failed source cycles or non finite output) since creation.
    pub faults: AtomicUsize,
    /// The sample rate the voice currently runs at.
    pub sample_rate: AtomicU32,
}

// -------------------------------------------------------------------------------------------------

/// Create a new voice and its controller.
///
/// The [`Voice`] is meant to be moved into the audio thread, while the [`VoiceController`]
/// stays on the control side and sends all changes to it via a lock-free message queue.
pub fn new_voice(options: VoiceOptions) -> Result<(VoiceController, Voice), Error> {
    options.validate()?;
    let voice = Voice::new(options);
    let controller = VoiceController::new(
        options,
        Arc::clone(&voice.message_queue),
        Arc::clone(&voice.shared_state),
    );
    Ok((controller, voice))
}

// -------------------------------------------------------------------------------------------------

/// A single, monophonic real-time voice.
///
/// Renders a glottal source through a formant filter bank, a single all-pole filter or no
/// filter at all. All processing happens in [`Voice::process`], which never blocks and does
/// not allocate. Numeric faults are substituted with silence and counted.
pub struct Voice {
    sample_rate: u32,
    message_queue: Arc<ArrayQueue<VoiceMessage>>,
    shared_state: Arc<VoiceSharedState>,
    // source
    model: SourceModel,
    parameters: SourceParameters,
    oscillator: Option<GlottalOscillator>,
    breathiness: f32,
    noise: SmallRng,
    // filters
    filters_enabled: bool,
    routing: FilterRouting,
    formant_bank: FormantBank,
    all_pole_coefficients: AllPoleCoefficients,
    all_pole_filter: AllPoleFilter,
    // output
    volume: ExponentialSmoothedValue,
    volume_target: f32,
    fade: ExponentialSmoothedValue,
    playing: bool,
}

impl Voice {
    fn new(options: VoiceOptions) -> Self {
        let sample_rate = options.sample_rate;
        let model = SourceModel::default();
        let formants = FormantSet::default();
        let mut formant_bank = FormantBank::with_ramp_duration(sample_rate, options.ramp_duration);
        formant_bank.set_formants(&formants);
        let all_pole_coefficients =
            all_pole_coefficients(&formants, sample_rate).unwrap_or_default();
        Self {
            sample_rate,
            message_queue: Arc::new(ArrayQueue::new(options.message_queue_size)),
            shared_state: Arc::new(VoiceSharedState {
                sounding: AtomicBool::new(false),
                faults: AtomicUsize::new(0),
                sample_rate: AtomicU32::new(sample_rate),
            }),
            model,
            parameters: model.default_parameters(),
            oscillator: None,
            breathiness: options.breathiness,
            noise: SmallRng::seed_from_u64(options.noise_seed),
            filters_enabled: true,
            routing: FilterRouting::default(),
            formant_bank,
            all_pole_coefficients,
            all_pole_filter: AllPoleFilter::new(),
            volume: ExponentialSmoothedValue::with_duration(
                options.volume,
                options.ramp_duration,
                sample_rate,
            ),
            volume_target: options.volume,
            fade: ExponentialSmoothedValue::with_duration(0.0, options.ramp_duration, sample_rate),
            playing: false,
        }
    }

    /// The sample rate the voice currently runs at.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// True when the voice is playing or fading out.
    pub fn is_sounding(&self) -> bool {
        self.oscillator.is_some()
    }

    /// Render the next block of mono samples at the given sample rate into `output`.
    /// The whole block gets filled: with silence when the voice is stopped.
    pub fn process(&mut self, output: &mut [f32], sample_rate: u32) {
        self.process_with_automation(output, sample_rate, &ParameterAutomation::NONE);
    }

    /// Render the next block like [`Self::process`], applying the given source parameter
    /// automation at glottal cycle boundaries.
    pub fn process_with_automation(
        &mut self,
        output: &mut [f32],
        sample_rate: u32,
        automation: &ParameterAutomation,
    ) {
        Self::assert_no_alloc(|| self.process_block(output, sample_rate, automation));
    }

    fn process_block(
        &mut self,
        output: &mut [f32],
        sample_rate: u32,
        automation: &ParameterAutomation,
    ) {
        if sample_rate > 0 && sample_rate != self.sample_rate {
            self.set_sample_rate(sample_rate);
        }
        self.process_messages();

        // source
        let Some(oscillator) = self.oscillator.as_mut() else {
            clear_buffer(output);
            return;
        };
        oscillator.process(output, automation);
        let mut faults = oscillator.take_faults();

        // aspiration noise, modulated by the glottal flow
        if self.breathiness > 0.0 {
            for sample in output.iter_mut() {
                let noise = self.noise.random::<f32>() * 2.0 - 1.0;
                *sample += self.breathiness * noise * sample.abs();
            }
        }

        // filters
        match self.effective_routing() {
            FilterRouting::FormantBank => self.formant_bank.process(output),
            FilterRouting::AllPole => {
                for sample in output.iter_mut() {
                    *sample = self
                        .all_pole_filter
                        .process_sample(&self.all_pole_coefficients, *sample as f64)
                        as f32;
                }
            }
            FilterRouting::Bypass => (),
        }

        // volume and stop fade
        apply_smoothed_gain(output, &mut self.volume);
        apply_smoothed_gain(output, &mut self.fade);

        if flush_non_finite(output) > 0 {
            // filter states are most likely broken too
            self.formant_bank.reset();
            self.all_pole_filter.reset();
            faults += 1;
        }
        if faults > 0 {
            self.shared_state.faults.fetch_add(faults, Ordering::Relaxed);
        }

        if !self.playing && !self.fade.need_ramp() {
            log::debug!("Voice faded out");
            self.oscillator = None;
            self.formant_bank.reset();
            self.all_pole_filter.reset();
            self.shared_state.sounding.store(false, Ordering::Relaxed);
        }
    }

    fn effective_routing(&self) -> FilterRouting {
        if self.filters_enabled {
            self.routing
        } else {
            FilterRouting::Bypass
        }
    }

    fn set_sample_rate(&mut self, sample_rate: u32) {
        log::info!(
            "Voice sample rate changed from {} to {sample_rate}",
            self.sample_rate
        );
        self.sample_rate = sample_rate;
        if let Some(oscillator) = self.oscillator.as_mut() {
            oscillator.set_sample_rate(sample_rate);
        }
        self.formant_bank.set_sample_rate(sample_rate);
        self.volume.set_sample_rate(sample_rate);
        self.fade.set_sample_rate(sample_rate);
        self.update_all_pole_coefficients();
        self.shared_state
            .sample_rate
            .store(sample_rate, Ordering::Relaxed);
    }

    fn update_all_pole_coefficients(&mut self) {
        if let Some(formants) = self.formant_bank.formants() {
            match all_pole_coefficients(formants, self.sample_rate) {
                Ok(coefficients) => self.all_pole_coefficients = coefficients,
                Err(err) => log::warn!("Failed to update all-pole filter: {err}"),
            }
        }
        self.all_pole_filter.reset();
    }

    fn start(&mut self) {
        if self.oscillator.is_none() {
            self.oscillator = Some(GlottalOscillator::new(
                self.model,
                self.parameters,
                self.sample_rate,
            ));
            self.volume.init(self.volume_target);
            self.fade.init(0.0);
        }
        self.playing = true;
        self.fade.set_target(1.0);
        self.shared_state.sounding.store(true, Ordering::Relaxed);
    }

    fn stop(&mut self) {
        self.playing = false;
        self.fade.set_target(0.0);
    }

    fn set_source(&mut self, model: SourceModel, parameters: SourceParameters) {
        self.model = model;
        self.parameters = parameters;
        if let Some(oscillator) = self.oscillator.as_mut() {
            oscillator.set_model(model, parameters);
        }
    }

    fn process_messages(&mut self) {
        while let Some(message) = self.message_queue.pop() {
            match message {
                VoiceMessage::Start => self.start(),
                VoiceMessage::Stop => self.stop(),
                VoiceMessage::SetVolume(volume) => {
                    self.volume_target = volume;
                    if self.playing {
                        self.volume.set_target(volume);
                    }
                }
                VoiceMessage::SetSource(model, parameters) => self.set_source(model, parameters),
                VoiceMessage::SetSourceParameter(id, value) => {
                    let stored = self.parameters.set(id, value)
                        && self
                            .oscillator
                            .as_mut()
                            .map_or(true, |oscillator| oscillator.set_parameter(id, value));
                    // the controller only sends parameters which the model declares
                    debug_assert!(stored, "Failed to store source parameter {id:?}");
                }
                VoiceMessage::SetFiltersEnabled(enabled) => self.filters_enabled = enabled,
                VoiceMessage::SetFilterRouting(routing) => {
                    if self.routing != routing {
                        self.routing = routing;
                        self.all_pole_filter.reset();
                    }
                }
                VoiceMessage::SetFormant(index, formant) => {
                    if self.formant_bank.set_formant(index, formant).is_ok() {
                        self.update_all_pole_coefficients();
                    }
                }
                VoiceMessage::SetFormants(formants) => {
                    self.formant_bank.set_formants(&formants);
                    self.update_all_pole_coefficients();
                }
                VoiceMessage::SetBreathiness(breathiness) => self.breathiness = breathiness,
                VoiceMessage::LoadPreset(preset) => {
                    self.set_source(preset.model, preset.parameters);
                    self.formant_bank.set_formants(&preset.formants);
                    self.update_all_pole_coefficients();
                    self.volume_target = 1.0;
                    self.volume.set_target(1.0);
                    self.filters_enabled = true;
                    self.start();
                }
            }
        }
    }

    fn assert_no_alloc<T, F: FnOnce() -> T>(func: F) -> T {
        #[cfg(feature = "assert-allocs")]
        return assert_no_alloc::assert_no_alloc::<T, F>(func);

        #[cfg(not(feature = "assert-allocs"))]
        return func();
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::{
        alloc::{GlobalAlloc, Layout, System},
        cell::Cell,
    };

    use super::*;
    use crate::{parameter::AutomationLane, preset::Preset, utils::buffer::rms};

    const SAMPLE_RATE: u32 = 48000;

    // counts allocations per thread, so tests running in parallel don't interfere
    struct CountingAllocator;

    thread_local! {
        static ALLOCATIONS: Cell<usize> = const { Cell::new(0) };
    }

    unsafe impl GlobalAlloc for CountingAllocator {
        unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
            let _ = ALLOCATIONS.try_with(|count| count.set(count.get() + 1));
            System.alloc(layout)
        }

        unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
            System.dealloc(ptr, layout)
        }
    }

    #[global_allocator]
    static ALLOCATOR: CountingAllocator = CountingAllocator;

    fn allocation_count() -> usize {
        ALLOCATIONS.with(Cell::get)
    }

    fn test_voice() -> Result<(VoiceController, Voice), Error> {
        new_voice(VoiceOptions::default().sample_rate(SAMPLE_RATE))
    }

    #[test]
    fn options() {
        assert!(VoiceOptions::default().validate().is_ok());
        assert!(VoiceOptions::default().sample_rate(0).validate().is_err());
        assert!(VoiceOptions::default().volume(-1.0).validate().is_err());
        assert!(VoiceOptions::default().breathiness(2.0).validate().is_err());
        assert!(VoiceOptions::default()
            .message_queue_size(0)
            .validate()
            .is_err());
        assert!(new_voice(VoiceOptions::default().volume(f32::NAN)).is_err());
    }

    #[test]
    fn silent_until_started() -> Result<(), Error> {
        let (_controller, mut voice) = test_voice()?;
        let mut buffer = vec![1.0; 512];
        voice.process(&mut buffer, SAMPLE_RATE);
        assert!(buffer.iter().all(|s| *s == 0.0));
        assert!(!voice.is_sounding());
        Ok(())
    }

    #[test]
    fn preset_renders_sound() -> Result<(), Error> {
        let (mut controller, mut voice) = test_voice()?;
        controller.load_preset(&Preset::bright_female_e())?;
        let mut buffer = vec![0.0; 512];
        voice.process(&mut buffer, SAMPLE_RATE);
        assert!(buffer.iter().all(|s| s.is_finite()));
        assert!(rms(&buffer) > 0.0);
        assert!(voice.is_sounding());
        assert_eq!(controller.fault_count(), 0);
        Ok(())
    }

    #[test]
    fn bypass_passes_source() -> Result<(), Error> {
        let (mut controller, mut voice) = test_voice()?;
        let (mut reference_controller, mut reference) = new_voice(
            VoiceOptions::default()
                .sample_rate(SAMPLE_RATE)
                .ramp_duration(Duration::ZERO),
        )?;
        reference_controller.set_filter_routing(FilterRouting::Bypass)?;
        reference_controller.start()?;
        controller.set_filters_enabled(false)?;
        controller.start()?;
        let mut buffer = vec![0.0; 4800];
        voice.process(&mut buffer, SAMPLE_RATE);
        let mut reference_buffer = vec![0.0; 4800];
        reference.process(&mut reference_buffer, SAMPLE_RATE);
        // after the fade-in, both render the raw KLGLOTT88 flow
        let oscillator_output = {
            let model = SourceModel::Klglott88;
            let mut oscillator =
                GlottalOscillator::new(model, model.default_parameters(), SAMPLE_RATE);
            let mut output = vec![0.0; 4800];
            oscillator.process(&mut output, &ParameterAutomation::NONE);
            output
        };
        for (a, b) in reference_buffer.iter().zip(&oscillator_output) {
            assert!((a - b).abs() < 1e-6);
        }
        for (a, b) in buffer[2400..].iter().zip(&oscillator_output[2400..]) {
            assert!((a - b).abs() < 1e-3);
        }
        Ok(())
    }

    #[test]
    fn all_pole_routing() -> Result<(), Error> {
        let (mut controller, mut voice) = test_voice()?;
        controller.load_preset(&Preset::dark_female_o())?;
        controller.set_filter_routing(FilterRouting::AllPole)?;
        let mut buffer = vec![0.0; 2048];
        voice.process(&mut buffer, SAMPLE_RATE);
        assert!(buffer.iter().all(|s| s.is_finite()));
        assert!(rms(&buffer) > 0.0);
        assert_eq!(voice.all_pole_coefficients.order(), 10);
        Ok(())
    }

    #[test]
    fn stop_fades_out() -> Result<(), Error> {
        let (mut controller, mut voice) = test_voice()?;
        controller.load_preset(&Preset::bright_female_e())?;
        let mut buffer = vec![0.0; 2400];
        voice.process(&mut buffer, SAMPLE_RATE);
        controller.stop()?;
        voice.process(&mut buffer, SAMPLE_RATE);
        // still fading out
        assert!(rms(&buffer) > 0.0);
        for _ in 0..10 {
            voice.process(&mut buffer, SAMPLE_RATE);
        }
        assert!(!voice.is_sounding());
        voice.process(&mut buffer, SAMPLE_RATE);
        assert!(buffer.iter().all(|s| *s == 0.0));
        assert!(!controller.is_sounding());
        Ok(())
    }

    #[test]
    fn breath_noise() -> Result<(), Error> {
        let (mut controller, mut voice) = test_voice()?;
        controller.set_filters_enabled(false)?;
        controller.set_breathiness(0.5)?;
        controller.start()?;
        let mut noisy = vec![0.0; 4800];
        voice.process(&mut noisy, SAMPLE_RATE);
        let (mut controller, mut voice) = test_voice()?;
        controller.set_filters_enabled(false)?;
        controller.start()?;
        let mut clean = vec![0.0; 4800];
        voice.process(&mut clean, SAMPLE_RATE);
        assert!(noisy.iter().zip(&clean).any(|(a, b)| a != b));
        assert!(noisy.iter().all(|s| s.is_finite()));
        Ok(())
    }

    #[test]
    fn sample_rate_change() -> Result<(), Error> {
        let (mut controller, mut voice) = test_voice()?;
        controller.start()?;
        let mut buffer = vec![0.0; 256];
        voice.process(&mut buffer, 44100);
        assert_eq!(voice.sample_rate(), 44100);
        assert_eq!(controller.sample_rate(), 44100);
        assert!(buffer.iter().all(|s| s.is_finite()));
        Ok(())
    }

    #[test]
    fn failing_source_does_not_allocate() -> Result<(), Error> {
        let (mut controller, mut voice) = test_voice()?;
        controller.set_source("LF")?;
        controller.start()?;
        let mut buffer = vec![0.0; 512];
        voice.process(&mut buffer, SAMPLE_RATE);

        let oq = SourceModel::LiljencrantsFant.parameter("Oq").unwrap();
        let values = [f32::NAN];
        let lanes = [AutomationLane::new(oq.id(), &values)];
        let automation = ParameterAutomation::new(&lanes);
        let allocations = allocation_count();
        for _ in 0..8 {
            voice.process_with_automation(&mut buffer, SAMPLE_RATE, &automation);
        }
        assert_eq!(allocation_count() - allocations, 0);
        assert!(controller.fault_count() >= 4);
        assert!(buffer.iter().all(|s| s.is_finite()));
        Ok(())
    }
}
