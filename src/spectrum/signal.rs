use rustfft::num_complex::Complex;

use crate::error::ConfigError;

/// Immutable complex-valued input shared by every analysis loop.
#[derive(Clone, Debug)]
pub struct Signal {
    samples: Vec<Complex<f64>>,
    sample_rate: f64,
}

impl Signal {
    pub fn from_real(samples: &[f64], sample_rate: f64) -> Result<Self, ConfigError> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(ConfigError::InvalidSampleRate(sample_rate));
        }
        Ok(Self {
            samples: samples.iter().map(|&s| Complex::new(s, 0.0)).collect(),
            sample_rate,
        })
    }

    /// `amplitude * cos(2π · cycles · n / len)` for `n in 0..len`.
    ///
    /// With `cycles = 1.0` this is one full period across the whole signal.
    pub fn cosine(len: usize, amplitude: f64, cycles: f64, sample_rate: f64) -> Result<Self, ConfigError> {
        let samples: Vec<f64> = (0..len)
            .map(|n| {
                amplitude * (2.0 * std::f64::consts::PI * cycles * n as f64 / len as f64).cos()
            })
            .collect();

        let signal = Self::from_real(&samples, sample_rate)?;

        log::info!(
            "Generated signal: {} samples, {:.1}Hz, {:.3} cycles, amplitude {:.3}",
            len,
            sample_rate,
            cycles,
            amplitude
        );

        Ok(signal)
    }

    pub fn samples(&self) -> &[Complex<f64>] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }
}
