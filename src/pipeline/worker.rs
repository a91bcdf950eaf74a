use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::Sender;

use super::state::PipelineState;
use crate::error::PipelineError;
use crate::plot::Plot;
use crate::spectrum::psd::bin_frequency;
use crate::spectrum::{PsdEstimator, PsdVector, StftAccumulator, StftMatrix};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoopConfig {
    /// Delay between the end of one pass and the start of the next.
    pub interval: Duration,
    /// Stop after this many passes; `None` runs until the renderer goes away.
    pub passes: Option<u64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopExit {
    /// Reached the configured pass limit.
    Completed,
    /// The render thread dropped its receiver.
    RendererGone,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoopStats {
    pub passes: u64,
    pub exit: LoopExit,
}

/// Runs `pass` on a fixed delay, forwarding each plot to the renderer.
fn run_paced(
    name: &str,
    config: LoopConfig,
    plots: &Sender<Plot>,
    mut pass: impl FnMut() -> Result<Plot, PipelineError>,
) -> Result<LoopStats, PipelineError> {
    log::info!("{} loop started (interval {:?}, passes {:?})", name, config.interval, config.passes);

    let mut done = 0u64;
    loop {
        let started = Instant::now();
        let plot = pass()?;
        let generation = plot.generation;

        if plots.send(plot).is_err() {
            log::warn!("{} loop stopping after {} passes: renderer is gone", name, done);
            return Ok(LoopStats {
                passes: done,
                exit: LoopExit::RendererGone,
            });
        }
        done += 1;
        log::debug!("{} pass {} (generation {}) took {:?}", name, done, generation, started.elapsed());

        if config.passes.is_some_and(|limit| done >= limit) {
            log::info!("{} loop finished after {} passes", name, done);
            return Ok(LoopStats {
                passes: done,
                exit: LoopExit::Completed,
            });
        }

        thread::sleep(config.interval);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StftLoopConfig {
    pub pacing: LoopConfig,
    /// Recompute the matrix every pass. The signal never changes, so
    /// without this the loop publishes once and ends.
    pub recompute: bool,
}

/// Accumulates the STFT, publishes it and emits a surface plot of the
/// published matrix.
pub fn run_stft_loop(
    state: Arc<PipelineState>,
    plots: Sender<Plot>,
    config: StftLoopConfig,
) -> Result<LoopStats, PipelineError> {
    let layout = *state.layout();
    let accumulator = StftAccumulator::new(layout)?;
    let mut back = StftMatrix::for_layout(&layout);
    let sample_rate = state.signal().sample_rate();

    let pacing = if config.recompute {
        config.pacing
    } else {
        log::info!("Signal is static; computing the STFT once");
        LoopConfig {
            passes: Some(1),
            ..config.pacing
        }
    };

    run_paced("STFT", pacing, &plots, || {
        accumulator.compute_into(state.signal(), &mut back)?;
        state.publish_stft(&mut back);
        Ok(state.read_stft(|m| {
            log::trace!("Plotting STFT generation {} ({} x {})", m.generation, m.rows(), m.bins());
            Plot::stft(m, &layout, sample_rate)
        }))
    })
}

/// Estimates the PSD of the reference frame, publishes it and emits a line
/// plot of the published vector.
pub fn run_psd_loop(
    state: Arc<PipelineState>,
    plots: Sender<Plot>,
    config: LoopConfig,
) -> Result<LoopStats, PipelineError> {
    let layout = *state.layout();
    let mut estimator = PsdEstimator::new(layout)?;
    let mut back = PsdVector::zeroed(layout.frame_len());
    let sample_rate = state.signal().sample_rate();

    run_paced("PSD", config, &plots, || {
        estimator.estimate_into(state.signal(), &mut back)?;
        state.publish_psd(&mut back);
        Ok(state.read_psd(|p| {
            if let Some(k) = p.peak_bin() {
                log::trace!("PSD peak at bin {} ({:.1}Hz)", k, bin_frequency(k, sample_rate, p.bins()));
            }
            Plot::psd(p, sample_rate)
        }))
    })
}

pub type LoopHandle = JoinHandle<Result<LoopStats, PipelineError>>;

pub fn spawn_stft_loop(
    state: Arc<PipelineState>,
    plots: Sender<Plot>,
    config: StftLoopConfig,
) -> std::io::Result<LoopHandle> {
    thread::Builder::new()
        .name("stft".into())
        .spawn(move || run_stft_loop(state, plots, config))
}

pub fn spawn_psd_loop(
    state: Arc<PipelineState>,
    plots: Sender<Plot>,
    config: LoopConfig,
) -> std::io::Result<LoopHandle> {
    thread::Builder::new()
        .name("psd".into())
        .spawn(move || run_psd_loop(state, plots, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plot::script::{PlotData, PlotKind};
    use crate::spectrum::{FrameLayout, Signal};
    use crossbeam_channel::{bounded, unbounded};

    fn state() -> Arc<PipelineState> {
        let signal = Signal::cosine(1024, 0.5, 1.0, 44100.0).unwrap();
        let layout = FrameLayout::new(1024, 256, 128, None).unwrap();
        Arc::new(PipelineState::new(signal, layout))
    }

    fn pacing(passes: Option<u64>) -> LoopConfig {
        LoopConfig {
            interval: Duration::from_millis(1),
            passes,
        }
    }

    #[test]
    fn psd_loop_runs_the_requested_passes() {
        let state = state();
        let (tx, rx) = unbounded();

        let stats = run_psd_loop(state.clone(), tx, pacing(Some(3))).unwrap();
        assert_eq!(stats, LoopStats { passes: 3, exit: LoopExit::Completed });

        let plots: Vec<Plot> = rx.try_iter().collect();
        assert_eq!(plots.len(), 3);
        assert_eq!(
            plots.iter().map(|p| p.generation).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert!(plots.iter().all(|p| p.kind == PlotKind::Psd));
        match &plots[0].data {
            PlotData::Line(points) => {
                assert_eq!(points.len(), 256);
                assert!(points.iter().all(|&(_, p)| p >= 0.0));
            }
            other => panic!("unexpected plot data {:?}", other),
        }
        state.read_psd(|p| assert_eq!(p.generation, 3));
    }

    #[test]
    fn static_stft_is_computed_once() {
        let state = state();
        let (tx, rx) = unbounded();
        let config = StftLoopConfig {
            pacing: pacing(None),
            recompute: false,
        };

        let stats = run_stft_loop(state.clone(), tx, config).unwrap();
        assert_eq!(stats, LoopStats { passes: 1, exit: LoopExit::Completed });

        let plot = rx.try_recv().unwrap();
        match plot.data {
            PlotData::Surface(scans) => {
                assert_eq!(scans.len(), 7);
                assert!(scans.iter().all(|s| s.len() == 256));
                assert_eq!(scans[6][0].0, 768.0);
            }
            other => panic!("unexpected plot data {:?}", other),
        }
    }

    #[test]
    fn recomputing_stft_republishes_each_pass() {
        let state = state();
        let (tx, rx) = unbounded();
        let config = StftLoopConfig {
            pacing: pacing(Some(2)),
            recompute: true,
        };

        run_stft_loop(state.clone(), tx, config).unwrap();
        assert_eq!(rx.try_iter().count(), 2);
        state.read_stft(|m| assert_eq!(m.generation, 2));
    }

    #[test]
    fn loop_stops_when_renderer_is_gone() {
        let (tx, rx) = bounded(1);
        drop(rx);

        let stats = run_psd_loop(state(), tx, pacing(None)).unwrap();
        assert_eq!(stats, LoopStats { passes: 0, exit: LoopExit::RendererGone });
    }

    #[test]
    fn spawned_loops_share_state() {
        let state = state();
        let (tx, rx) = unbounded();

        let psd = spawn_psd_loop(state.clone(), tx.clone(), pacing(Some(2))).unwrap();
        let stft = spawn_stft_loop(
            state.clone(),
            tx,
            StftLoopConfig {
                pacing: pacing(None),
                recompute: false,
            },
        )
        .unwrap();

        psd.join().unwrap().unwrap();
        stft.join().unwrap().unwrap();

        let kinds: Vec<PlotKind> = rx.try_iter().map(|p| p.kind).collect();
        assert_eq!(kinds.iter().filter(|&&k| k == PlotKind::Psd).count(), 2);
        assert_eq!(kinds.iter().filter(|&&k| k == PlotKind::Stft).count(), 1);
    }
}
