use rustfft::num_complex::Complex;

use super::frame::{slice_frame, FrameLayout};
use super::signal::Signal;
use super::transform::Transformer;
use crate::error::PipelineError;

/// Per-bin power `|X[k]|²` of the reference frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PsdVector {
    pub power: Vec<f64>,
    pub generation: u64,
}

impl PsdVector {
    pub fn zeroed(bins: usize) -> Self {
        Self {
            power: vec![0.0; bins],
            generation: 0,
        }
    }

    pub fn bins(&self) -> usize {
        self.power.len()
    }

    /// Index of the strongest bin in `0..=N/2`, or `None` for an empty vector.
    ///
    /// The signal is real, so bins above N/2 mirror the ones below and are
    /// skipped. Ties go to the lower bin.
    pub fn peak_bin(&self) -> Option<usize> {
        let one_sided = &self.power[..self.power.len().min(self.bins() / 2 + 1)];
        one_sided
            .iter()
            .enumerate()
            .fold(None, |best: Option<(usize, f64)>, (k, &p)| match best {
                Some((_, q)) if p.total_cmp(&q).is_le() => best,
                _ => Some((k, p)),
            })
            .map(|(k, _)| k)
    }
}

/// Overwrites `out` with the squared magnitude of each spectrum value.
pub fn power_into(spectrum: &[Complex<f64>], out: &mut Vec<f64>) {
    out.clear();
    out.extend(spectrum.iter().map(|c| c.norm_sqr()));
}

/// Frequency in Hz of bin `k` for a transform of `size` points.
pub fn bin_frequency(k: usize, sample_rate: f64, size: usize) -> f64 {
    k as f64 * sample_rate / size as f64
}

/// Transforms the first frame of the signal and reduces it to power.
pub struct PsdEstimator {
    layout: FrameLayout,
    transformer: Transformer,
    spectrum: Vec<Complex<f64>>,
}

impl PsdEstimator {
    pub fn new(layout: FrameLayout) -> Result<Self, PipelineError> {
        let transformer = Transformer::new(layout.frame_len())?;
        Ok(Self {
            layout,
            transformer,
            spectrum: vec![Complex::new(0.0, 0.0); layout.frame_len()],
        })
    }

    /// Spectrum of the most recent estimate.
    #[cfg(test)]
    pub fn spectrum(&self) -> &[Complex<f64>] {
        &self.spectrum
    }

    pub fn estimate_into(&mut self, signal: &Signal, out: &mut PsdVector) -> Result<(), PipelineError> {
        let frame = slice_frame(signal.samples(), self.layout.frame_len(), self.layout.hop(), 0)?;
        self.transformer.forward_into(frame, &mut self.spectrum)?;
        power_into(&self.spectrum, &mut out.power);
        Ok(())
    }

    #[cfg(test)]
    pub fn estimate(&mut self, signal: &Signal) -> Result<PsdVector, PipelineError> {
        let mut out = PsdVector::zeroed(self.layout.frame_len());
        self.estimate_into(signal, &mut out)?;
        Ok(out)
    }
}
