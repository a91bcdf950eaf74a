use rayon::prelude::*;
use rustfft::num_complex::Complex;

use super::frame::{slice_frame, FrameLayout};
use super::signal::Signal;
use super::transform::Transformer;
use crate::error::PipelineError;

/// Time-by-frequency matrix, one row of `bins` complex values per frame,
/// stored row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct StftMatrix {
    data: Vec<Complex<f64>>,
    rows: usize,
    bins: usize,
    /// Publication counter, bumped each time a full pass is published.
    pub generation: u64,
}

impl StftMatrix {
    pub fn zeroed(rows: usize, bins: usize) -> Self {
        Self {
            data: vec![Complex::new(0.0, 0.0); rows * bins],
            rows,
            bins,
            generation: 0,
        }
    }

    pub fn for_layout(layout: &FrameLayout) -> Self {
        Self::zeroed(layout.frame_count(), layout.frame_len())
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn bins(&self) -> usize {
        self.bins
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[Complex<f64>]> {
        self.data.chunks_exact(self.bins.max(1)).take(self.rows)
    }

    #[cfg(test)]
    pub fn fill(&mut self, value: Complex<f64>) {
        self.data.fill(value);
    }
}

/// Slices every frame of the signal and transforms it into the matching row.
pub struct StftAccumulator {
    layout: FrameLayout,
    transformer: Transformer,
}

impl StftAccumulator {
    pub fn new(layout: FrameLayout) -> Result<Self, PipelineError> {
        let transformer = Transformer::new(layout.frame_len())?;
        Ok(Self { layout, transformer })
    }

    /// Recomputes every row of `matrix` from `signal`. Rows are independent,
    /// so they are transformed in parallel.
    pub fn compute_into(&self, signal: &Signal, matrix: &mut StftMatrix) -> Result<(), PipelineError> {
        if matrix.rows != self.layout.frame_count() || matrix.bins != self.layout.frame_len() {
            *matrix = StftMatrix::for_layout(&self.layout);
        }

        let samples = signal.samples();
        let frame_len = self.layout.frame_len();
        let hop = self.layout.hop();

        matrix
            .data
            .par_chunks_exact_mut(frame_len)
            .enumerate()
            .try_for_each(|(i, row)| -> Result<(), PipelineError> {
                let frame = slice_frame(samples, frame_len, hop, i)?;
                self.transformer.forward_into(frame, row)?;
                Ok(())
            })
    }

    #[cfg(test)]
    pub fn compute(&self, signal: &Signal) -> Result<StftMatrix, PipelineError> {
        let mut matrix = StftMatrix::for_layout(&self.layout);
        self.compute_into(signal, &mut matrix)?;
        Ok(matrix)
    }
}
