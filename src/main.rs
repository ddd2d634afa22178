//! Sonogram - Audio Spectrogram Renderer

use anyhow::{bail, Context, Result};
use clap::Parser;
use sonogram::spectrogram::{ColorMap, WindowFunction};
use sonogram::{init_logging, Args, Config, SpectrogramPipeline};
use std::process;

fn main() {
    let args = Args::parse();

    init_logging(args.verbose);

    if let Err(e) = run(args) {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    if args.verbose {
        println!("{}", sonogram::build_info());
        println!();
    }

    if args.list {
        return run_list();
    }

    let Some(input) = args.input.clone() else {
        bail!("No input file given");
    };

    if args.probe {
        let info = sonogram::audio::probe(&input)
            .with_context(|| format!("Cannot read {}", input.display()))?;
        println!("{}: {}", input.display(), info);
        return Ok(());
    }

    let Some(output) = args.output.clone() else {
        bail!("No output image given");
    };

    if !input.exists() {
        bail!("Input file does not exist: {}", input.display());
    }

    let config = Config::from_args_and_config(&args).context("Invalid configuration")?;

    println!("=== Sonogram Spectrogram Renderer ===");
    println!("Input: {}", input.display());
    println!("Output: {}", output.display());
    println!(
        "FFT: {} samples, {} window, {} threads",
        config.spectrogram.fft_samples, config.spectrogram.window, config.threads()
    );
    println!("=====================================\n");

    let pipeline = SpectrogramPipeline::new(config)?;
    let result = pipeline
        .process_file(&input, &output)
        .with_context(|| format!("Failed to render {}", input.display()))?;

    println!("=== Processing Complete ===");
    println!("Audio: {}, {:.2}s", result.audio_info, result.audio_info.duration(result.frame_count));
    println!("Image: {}x{}", result.image_size.0, result.image_size.1);
    println!("Time: {:.2}s", result.processing_time.as_secs_f64());
    if pipeline.config().verbose() {
        println!("Columns: {}", result.column_count);
        println!("Bounds: {}", result.render_info);
        println!("RTF: {:.3}", result.real_time_factor());
    }

    Ok(())
}

fn run_list() -> Result<()> {
    println!("Window functions:");
    for w in WindowFunction::ALL {
        println!("  {}", w);
    }
    println!("Color maps:");
    for c in ColorMap::ALL {
        println!("  {}", c);
    }
    Ok(())
}
