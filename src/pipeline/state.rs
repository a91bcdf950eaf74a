use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::spectrum::{FrameLayout, PsdVector, Signal, StftMatrix};

/// Owns the signal and the published spectral products.
///
/// Writers compute into their own back buffer and hand it to
/// [`publish_stft`](Self::publish_stft) / [`publish_psd`](Self::publish_psd),
/// which swap it with the published value under the lock. Readers holding the
/// lock therefore always see one complete pass.
pub struct PipelineState {
    signal: Signal,
    layout: FrameLayout,
    stft: Mutex<StftMatrix>,
    psd: Mutex<PsdVector>,
}

impl PipelineState {
    pub fn new(signal: Signal, layout: FrameLayout) -> Self {
        debug_assert_eq!(signal.len(), layout.signal_len());
        Self {
            stft: Mutex::new(StftMatrix::for_layout(&layout)),
            psd: Mutex::new(PsdVector::zeroed(layout.frame_len())),
            signal,
            layout,
        }
    }

    pub fn signal(&self) -> &Signal {
        &self.signal
    }

    pub fn layout(&self) -> &FrameLayout {
        &self.layout
    }

    /// Swaps `back` in as the published matrix and returns the new
    /// generation. `back` receives the previously published buffer for reuse.
    pub fn publish_stft(&self, back: &mut StftMatrix) -> u64 {
        let mut published = lock(&self.stft);
        back.generation = published.generation + 1;
        std::mem::swap(&mut *published, back);
        published.generation
    }

    pub fn publish_psd(&self, back: &mut PsdVector) -> u64 {
        let mut published = lock(&self.psd);
        back.generation = published.generation + 1;
        std::mem::swap(&mut *published, back);
        published.generation
    }

    /// Runs `f` with exclusive access to the published matrix.
    pub fn read_stft<R>(&self, f: impl FnOnce(&StftMatrix) -> R) -> R {
        f(&lock(&self.stft))
    }

    pub fn read_psd<R>(&self, f: impl FnOnce(&PsdVector) -> R) -> R {
        f(&lock(&self.psd))
    }
}

// The guarded values are only ever replaced by a swap, so a panic elsewhere
// cannot leave them half-written.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustfft::num_complex::Complex;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;

    fn state() -> PipelineState {
        let signal = Signal::cosine(1024, 0.5, 1.0, 44100.0).unwrap();
        let layout = FrameLayout::new(1024, 256, 128, None).unwrap();
        PipelineState::new(signal, layout)
    }

    #[test]
    fn starts_zeroed_and_sized_from_layout() {
        let state = state();
        state.read_stft(|m| {
            assert_eq!((m.rows(), m.bins(), m.generation), (7, 256, 0));
        });
        state.read_psd(|p| assert_eq!((p.bins(), p.generation), (256, 0)));
    }

    #[test]
    fn publish_bumps_generation_and_recycles_buffer() {
        let state = state();
        let mut back = PsdVector {
            power: vec![1.0; 256],
            generation: 0,
        };

        assert_eq!(state.publish_psd(&mut back), 1);
        assert_eq!(back.power, vec![0.0; 256]);

        back.power.fill(2.0);
        assert_eq!(state.publish_psd(&mut back), 2);
        state.read_psd(|p| {
            assert_eq!(p.generation, 2);
            assert!(p.power.iter().all(|&x| x == 2.0));
        });
    }

    #[test]
    fn readers_never_see_a_mixed_matrix() {
        let state = Arc::new(state());
        let done = Arc::new(AtomicBool::new(false));

        let writer = {
            let state = state.clone();
            let done = done.clone();
            thread::spawn(move || {
                let mut back = StftMatrix::zeroed(7, 256);
                for pass in 1..=2000u64 {
                    back.fill(Complex::new(pass as f64, 0.0));
                    state.publish_stft(&mut back);
                }
                done.store(true, Ordering::Release);
            })
        };

        let readers: Vec<_> = (0..3)
            .map(|_| {
                let state = state.clone();
                let done = done.clone();
                thread::spawn(move || {
                    let mut last = 0;
                    while !done.load(Ordering::Acquire) {
                        let (generation, value) = state.read_stft(|m| {
                            let first = m.iter_rows().next().unwrap()[0].re;
                            for row in m.iter_rows() {
                                assert!(row.iter().all(|c| c.re == first), "torn matrix");
                            }
                            (m.generation, first)
                        });
                        assert!(generation >= last);
                        if generation > 0 {
                            assert_eq!(value, generation as f64);
                        }
                        last = generation;
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for r in readers {
            r.join().unwrap();
        }
        state.read_stft(|m| assert_eq!(m.generation, 2000));
    }
}
