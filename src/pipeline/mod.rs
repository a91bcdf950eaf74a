pub mod state;
pub mod worker;

pub use state::PipelineState;
pub use worker::{spawn_psd_loop, spawn_stft_loop, LoopConfig, LoopExit, StftLoopConfig};
