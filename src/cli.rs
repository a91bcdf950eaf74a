use clap::Parser;
use std::path::PathBuf;

/// Every tuning option is optional; unset values fall back to the config file,
/// then to built-in defaults.
#[derive(Parser, Debug, Default)]
#[command(name = "stft-psd", about = "Live STFT and PSD plots of a synthetic signal")]
pub struct Cli {
    /// Config file (TOML). Defaults to ./stft-psd.toml or the user config dir.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Number of samples in the generated signal
    #[arg(long)]
    pub signal_length: Option<usize>,

    /// Peak amplitude of the generated cosine
    #[arg(long)]
    pub amplitude: Option<f64>,

    /// Cosine periods across the whole signal
    #[arg(long)]
    pub cycles: Option<f64>,

    /// Sample rate in Hz, used for the frequency axis
    #[arg(long)]
    pub sample_rate: Option<f64>,

    /// Transform size (frame length) in samples
    #[arg(long)]
    pub fft_size: Option<usize>,

    /// Hop between frame starts in samples
    #[arg(long)]
    pub hop_size: Option<usize>,

    /// Number of STFT frames. Derived from the signal when omitted; rejected
    /// if more than fit.
    #[arg(long)]
    pub frames: Option<usize>,

    /// Delay between PSD updates in milliseconds
    #[arg(long)]
    pub psd_interval_ms: Option<u64>,

    /// Delay between STFT updates in milliseconds
    #[arg(long)]
    pub stft_interval_ms: Option<u64>,

    /// Recompute the STFT every pass instead of once
    #[arg(long)]
    pub recompute_stft: bool,

    /// Stop each loop after this many passes (0 = run until killed)
    #[arg(long)]
    pub passes: Option<u64>,

    /// gnuplot executable
    #[arg(long)]
    pub gnuplot: Option<String>,

    /// Write the gnuplot script to stdout instead of starting gnuplot
    #[arg(long)]
    pub dump: bool,
}
