//! Frame slicing, DFT, STFT accumulation and PSD estimation.

pub mod frame;
pub mod psd;
pub mod signal;
pub mod stft;
pub mod transform;

pub use frame::FrameLayout;
pub use psd::{PsdEstimator, PsdVector};
pub use signal::Signal;
pub use stft::{StftAccumulator, StftMatrix};
