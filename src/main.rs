mod cli;
mod config;
mod error;
mod pipeline;
mod plot;
mod spectrum;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;

use cli::Cli;
use config::Config;
use pipeline::{spawn_psd_loop, spawn_stft_loop, LoopExit, PipelineState};
use plot::{spawn_renderer, Gnuplot, PlotSink, ScriptWriter};
use spectrum::Signal;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    let mut cfg = match config::find_config(cli.config.as_deref()) {
        Some(path) => {
            let cfg = config::load_config(&path)?;
            log::info!("Loaded config from {}", path.display());
            cfg
        }
        None => Config::default(),
    };
    cfg.apply_cli(&cli);

    // 1. Validate everything before any thread starts
    let layout = cfg.frame_layout().context("Invalid frame configuration")?;
    let psd_loop = cfg.psd_loop().context("Invalid PSD loop configuration")?;
    let stft_loop = cfg.stft_loop().context("Invalid STFT loop configuration")?;

    log::info!(
        "Signal: {} samples @ {}Hz; frames: {} x {} samples, hop {}",
        layout.signal_len(),
        cfg.signal.sample_rate,
        layout.frame_count(),
        layout.frame_len(),
        layout.hop()
    );

    // 2. Generate the signal
    let signal = Signal::cosine(
        cfg.signal.length,
        cfg.signal.amplitude,
        cfg.signal.cycles,
        cfg.signal.sample_rate,
    )?;
    let state = Arc::new(PipelineState::new(signal, layout));

    // 3. Start the render thread
    let sink: Box<dyn PlotSink> = if cli.dump {
        Box::new(ScriptWriter::new(std::io::stdout()))
    } else {
        Box::new(Gnuplot::spawn(&cfg.render.gnuplot)?)
    };
    let (plots, renderer) = spawn_renderer(sink, cfg.render.queue)
        .context("Failed to start render thread")?;

    // 4. Start the compute loops
    let stft = spawn_stft_loop(state.clone(), plots.clone(), stft_loop)
        .context("Failed to start STFT loop")?;
    let psd = spawn_psd_loop(state, plots, psd_loop).context("Failed to start PSD loop")?;

    let mut failed = false;
    for (name, handle) in [("STFT", stft), ("PSD", psd)] {
        match handle.join() {
            Ok(Ok(stats)) => {
                if stats.exit == LoopExit::RendererGone {
                    failed = true;
                }
                log::info!("{} loop: {} passes ({:?})", name, stats.passes, stats.exit);
            }
            Ok(Err(err)) => {
                failed = true;
                log::error!("{} loop failed: {}", name, err);
            }
            Err(_) => {
                failed = true;
                log::error!("{} loop panicked", name);
            }
        }
    }

    match renderer.join() {
        Ok(Ok(stats)) => log::info!("Rendered {} of {} plots", stats.drawn, stats.received),
        Ok(Err(err)) => {
            failed = true;
            log::error!("Renderer failed: {}", err);
        }
        Err(_) => {
            failed = true;
            log::error!("Renderer panicked");
        }
    }

    if failed {
        anyhow::bail!("One or more loops stopped abnormally");
    }
    Ok(())
}
