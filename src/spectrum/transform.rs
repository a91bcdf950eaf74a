use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use crate::error::TransformError;

/// Forward DFT of a fixed size, planned once.
///
/// The plan is `Send + Sync`, so a `Transformer` can be cloned cheaply and
/// shared across rayon workers.
#[derive(Clone)]
pub struct Transformer {
    size: usize,
    forward: Arc<dyn Fft<f64>>,
}

impl Transformer {
    pub fn new(size: usize) -> Result<Self, TransformError> {
        if size == 0 {
            return Err(TransformError::EmptyFrame);
        }

        let forward = FftPlanner::<f64>::new().plan_fft_forward(size);
        Ok(Self { size, forward })
    }

    fn check_len(&self, len: usize) -> Result<(), TransformError> {
        if len == 0 {
            return Err(TransformError::EmptyFrame);
        }
        if len != self.size {
            return Err(TransformError::LengthMismatch {
                expected: self.size,
                actual: len,
            });
        }
        Ok(())
    }

    /// `out[k] = Σ frame[n] · e^{-2πi·k·n/N}`. `frame` is left untouched.
    pub fn forward_into(
        &self,
        frame: &[Complex<f64>],
        out: &mut [Complex<f64>],
    ) -> Result<(), TransformError> {
        self.check_len(frame.len())?;
        self.check_len(out.len())?;

        out.copy_from_slice(frame);
        self.forward.process(out);
        Ok(())
    }

    #[cfg(test)]
    pub fn forward(&self, frame: &[Complex<f64>]) -> Result<Vec<Complex<f64>>, TransformError> {
        let mut out = vec![Complex::new(0.0, 0.0); frame.len()];
        self.forward_into(frame, &mut out)?;
        Ok(out)
    }

    /// Normalized inverse, so that `inverse(forward(x)) == x`.
    #[cfg(test)]
    pub fn inverse(&self, spectrum: &[Complex<f64>]) -> Result<Vec<Complex<f64>>, TransformError> {
        self.check_len(spectrum.len())?;

        let mut out = spectrum.to_vec();
        FftPlanner::<f64>::new().plan_fft_inverse(self.size).process(&mut out);

        let scale = 1.0 / self.size as f64;
        for x in out.iter_mut() {
            *x *= scale;
        }
        Ok(out)
    }
}

impl std::fmt::Debug for Transformer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transformer").field("size", &self.size).finish()
    }
}
