use std::ops::Range;

use rustfft::num_complex::Complex;

use crate::error::ConfigError;

/// A validated combination of signal length, frame length, hop and frame count.
///
/// Every frame index below `frame_count` is guaranteed to lie inside the
/// signal, so code holding a `FrameLayout` never slices out of bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameLayout {
    signal_len: usize,
    frame_len: usize,
    hop: usize,
    frame_count: usize,
}

impl FrameLayout {
    /// Builds a layout. With `frames = None` the count is derived as
    /// `(signal_len - frame_len) / hop + 1`; an explicit count larger than
    /// that is rejected.
    pub fn new(
        signal_len: usize,
        frame_len: usize,
        hop: usize,
        frames: Option<usize>,
    ) -> Result<Self, ConfigError> {
        if frame_len == 0 {
            return Err(ConfigError::ZeroFrameLength);
        }
        if hop == 0 {
            return Err(ConfigError::ZeroHop);
        }
        if frame_len > signal_len {
            return Err(ConfigError::FrameLongerThanSignal { frame_len, signal_len });
        }

        let max = max_frames(signal_len, frame_len, hop);
        let frame_count = match frames {
            None => max,
            Some(0) => return Err(ConfigError::ZeroFrames),
            Some(requested) if requested > max => {
                return Err(ConfigError::TooManyFrames {
                    requested,
                    max,
                    frame_len,
                    hop,
                    needed: (requested - 1)
                        .saturating_mul(hop)
                        .saturating_add(frame_len),
                    signal_len,
                });
            }
            Some(requested) => requested,
        };

        Ok(Self {
            signal_len,
            frame_len,
            hop,
            frame_count,
        })
    }

    pub fn signal_len(&self) -> usize {
        self.signal_len
    }

    pub fn frame_len(&self) -> usize {
        self.frame_len
    }

    pub fn hop(&self) -> usize {
        self.hop
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// Sample range covered by frame `index`.
    pub fn frame_range(&self, index: usize) -> Range<usize> {
        let start = index * self.hop;
        start..start + self.frame_len
    }

    /// All frames of `signal` in order. The signal must be the one the layout
    /// was built for.
    #[cfg(test)]
    pub fn frames<'a>(
        &'a self,
        signal: &'a [Complex<f64>],
    ) -> impl Iterator<Item = Result<&'a [Complex<f64>], ConfigError>> + 'a {
        (0..self.frame_count).map(move |i| slice_frame(signal, self.frame_len, self.hop, i))
    }
}

pub fn max_frames(signal_len: usize, frame_len: usize, hop: usize) -> usize {
    if frame_len == 0 || hop == 0 || frame_len > signal_len {
        return 0;
    }
    (signal_len - frame_len) / hop + 1
}

/// Returns `signal[index * hop .. index * hop + frame_len]`, or
/// `FrameOutOfBounds` if that range runs past the end of the signal.
pub fn slice_frame(
    signal: &[Complex<f64>],
    frame_len: usize,
    hop: usize,
    index: usize,
) -> Result<&[Complex<f64>], ConfigError> {
    let start = index.checked_mul(hop);
    let end = start.and_then(|s| s.checked_add(frame_len));

    match (start, end) {
        (Some(start), Some(end)) if end <= signal.len() => Ok(&signal[start..end]),
        _ => Err(ConfigError::FrameOutOfBounds {
            index,
            start: start.unwrap_or(usize::MAX),
            end: end.unwrap_or(usize::MAX),
            len: signal.len(),
        }),
    }
}
