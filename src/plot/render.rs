use std::collections::BTreeMap;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender};

use super::gnuplot::PlotSink;
use super::script::{Plot, PlotKind};
use crate::error::RenderError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Plots received from the compute loops.
    pub received: u64,
    /// Successful redraws.
    pub drawn: u64,
    /// Redraws that failed without killing the sink.
    pub failed: u64,
}

/// Single owner of the plotting collaborator.
///
/// Keeps the newest plot of each kind and redraws all of them whenever one
/// changes, so the STFT and PSD plots share one window without clobbering
/// each other.
pub struct Renderer {
    sink: Box<dyn PlotSink>,
    latest: BTreeMap<PlotKind, Plot>,
    stats: RenderStats,
}

impl Renderer {
    pub fn new(sink: Box<dyn PlotSink>) -> Self {
        Self {
            sink,
            latest: BTreeMap::new(),
            stats: RenderStats::default(),
        }
    }

    /// Draws until every sender is dropped or the sink fails for good.
    pub fn run(mut self, plots: Receiver<Plot>) -> Result<RenderStats, RenderError> {
        while let Ok(plot) = plots.recv() {
            self.accept(plot);
            // Coalesce a backlog into one redraw
            for plot in plots.try_iter() {
                self.accept(plot);
            }

            if let Err(err) = self.redraw() {
                if err.is_fatal() {
                    log::error!("Renderer stopping: {}", err);
                    if let Err(e) = self.sink.finish() {
                        log::debug!("Closing failed sink: {}", e);
                    }
                    return Err(err);
                }
                self.stats.failed += 1;
                log::warn!("Render cycle failed: {}", err);
            }
        }

        log::info!(
            "Renderer finished: {} plots received, {} redraws, {} failed",
            self.stats.received,
            self.stats.drawn,
            self.stats.failed
        );
        self.sink.finish()?;
        Ok(self.stats)
    }

    fn accept(&mut self, plot: Plot) {
        log::trace!("Received {:?} plot, generation {}", plot.kind, plot.generation);
        self.stats.received += 1;
        self.latest.insert(plot.kind, plot);
    }

    fn redraw(&mut self) -> Result<(), RenderError> {
        let plots: Vec<&Plot> = self.latest.values().collect();
        self.sink.draw(&plots)?;
        self.stats.drawn += 1;
        Ok(())
    }
}

/// Starts the render thread. Compute loops send finished plots into the
/// returned channel; a full channel blocks the sender.
pub fn spawn_renderer(
    sink: Box<dyn PlotSink>,
    capacity: usize,
) -> std::io::Result<(Sender<Plot>, JoinHandle<Result<RenderStats, RenderError>>)> {
    let (tx, rx) = bounded(capacity.max(1));
    let handle = thread::Builder::new()
        .name("render".into())
        .spawn(move || Renderer::new(sink).run(rx))?;
    Ok((tx, handle))
}
