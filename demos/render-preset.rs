//! Renders a built-in voice preset into a wav file, gliding the glottal frequency and
//! switching source models along the way.

use std::{error::Error, path::PathBuf};

use arg::{parse_args, Args};

use phonate::{new_voice, FilterRouting, Preset, SourceModel, VoiceOptions};

// -------------------------------------------------------------------------------------------------

#[cfg(all(debug_assertions, feature = "assert-allocs"))]
#[global_allocator]
static A: assert_no_alloc::AllocDisabler = assert_no_alloc::AllocDisabler;

// -------------------------------------------------------------------------------------------------

const DEFAULT_LOG_LEVEL: log::Level = if cfg!(debug_assertions) {
    log::Level::Debug
} else {
    log::Level::Warn
};

const BLOCK_SIZE: usize = 512;

// -------------------------------------------------------------------------------------------------

/// Program arguments of the preset renderer.
#[derive(Args, Debug, Default)]
struct Arguments {
    #[arg(short = "p", long = "preset")]
    /// Name of the built-in preset to render. By default \"Bright female /e/\".
    preset: Option<String>,
    #[arg(short = "o", long = "output")]
    /// Path of the wav file to write. By default \"voice.wav\".
    output_path: Option<PathBuf>,
    #[arg(short = "s", long = "seconds")]
    /// Length of the rendering in seconds. By default 3.
    seconds: Option<f32>,
    #[arg(short = "r", long = "sample-rate")]
    /// Sample rate of the rendering. By default 44100.
    sample_rate: Option<u32>,
    #[arg(short = "l", long = "log-level")]
    /// Set logging level to \"debug\", \"info\", \"warn\" or \"error\".
    /// By default \"debug\" in dev builds and \"warn\" in release builds.
    log_level: Option<log::Level>,
}

// -------------------------------------------------------------------------------------------------

fn main() -> Result<(), Box<dyn Error>> {
    let args = parse_args::<Arguments>();

    simple_logger::SimpleLogger::new()
        .with_level(args.log_level.unwrap_or(DEFAULT_LOG_LEVEL).to_level_filter())
        .init()?;

    let preset_name = args.preset.as_deref().unwrap_or("Bright female /e/");
    let preset = Preset::builtin_by_name(preset_name).ok_or_else(|| {
        let names = Preset::builtin()
            .into_iter()
            .map(|preset| preset.name)
            .collect::<Vec<_>>();
        format!("Unknown preset '{preset_name}'. Available presets are: {names:?}")
    })?;

    let sample_rate = args.sample_rate.unwrap_or(44100);
    let total_samples = (args.seconds.unwrap_or(3.0).max(0.0) * sample_rate as f32) as usize;

    let (mut controller, mut voice) = new_voice(VoiceOptions::default().sample_rate(sample_rate))?;
    controller.add_preset_listener(|preset| println!("Rendering preset '{}'", preset.name));
    controller.load_preset(&preset)?;

    let output_path = args
        .output_path
        .unwrap_or_else(|| PathBuf::from("voice.wav"));
    let mut writer = hound::WavWriter::create(
        &output_path,
        hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        },
    )?;

    let base_frequency = controller.frequency();
    let mut block = [0.0f32; BLOCK_SIZE];
    let mut rendered = 0;
    while rendered < total_samples {
        let progress = rendered as f32 / total_samples as f32;
        // glide up a fifth, then back down
        let glide = 1.0 - (2.0 * progress - 1.0).abs();
        controller.set_frequency(base_frequency * (1.0 + 0.5 * glide))?;
        if progress >= 0.5 && controller.source_model() != SourceModel::LiljencrantsFant {
            controller.set_source("LF")?;
            controller.set_breathiness(0.1)?;
        }
        if progress >= 0.75 && controller.filter_routing() != FilterRouting::AllPole {
            controller.set_filter_routing(FilterRouting::AllPole)?;
        }
        if progress >= 0.9 && controller.is_playing() {
            controller.stop()?;
        }
        let len = BLOCK_SIZE.min(total_samples - rendered);
        voice.process(&mut block[..len], sample_rate);
        for sample in &block[..len] {
            writer.write_sample(*sample)?;
        }
        rendered += len;
    }
    writer.finalize()?;

    if controller.fault_count() > 0 {
        log::warn!("{} numeric faults occurred", controller.fault_count());
    }
    println!("Wrote {rendered} samples to '{}'", output_path.display());
    Ok(())
}
