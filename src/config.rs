use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cli::Cli;
use crate::error::ConfigError;
use crate::pipeline::{LoopConfig, StftLoopConfig};
use crate::spectrum::FrameLayout;

const CONFIG_FILE: &str = "stft-psd.toml";

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub signal: SignalConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub render: RenderConfig,
}

#[derive(Debug, Deserialize)]
pub struct SignalConfig {
    #[serde(default = "default_signal_length")]
    pub length: usize,
    #[serde(default = "default_amplitude")]
    pub amplitude: f64,
    #[serde(default = "default_cycles")]
    pub cycles: f64,
    #[serde(default = "default_sample_rate")]
    pub sample_rate: f64,
}

#[derive(Debug, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_fft_size")]
    pub fft_size: usize,
    #[serde(default = "default_hop_size")]
    pub hop_size: usize,
    #[serde(default)]
    pub frames: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct RenderConfig {
    #[serde(default = "default_psd_interval_ms")]
    pub psd_interval_ms: u64,
    #[serde(default = "default_stft_interval_ms")]
    pub stft_interval_ms: u64,
    #[serde(default)]
    pub recompute_stft: bool,
    #[serde(default)]
    pub passes: Option<u64>,
    #[serde(default = "default_gnuplot")]
    pub gnuplot: String,
    #[serde(default = "default_queue")]
    pub queue: usize,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            length: default_signal_length(),
            amplitude: default_amplitude(),
            cycles: default_cycles(),
            sample_rate: default_sample_rate(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            fft_size: default_fft_size(),
            hop_size: default_hop_size(),
            frames: None,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            psd_interval_ms: default_psd_interval_ms(),
            stft_interval_ms: default_stft_interval_ms(),
            recompute_stft: false,
            passes: None,
            gnuplot: default_gnuplot(),
            queue: default_queue(),
        }
    }
}

fn default_signal_length() -> usize { 1024 }
fn default_amplitude() -> f64 { 0.5 }
fn default_cycles() -> f64 { 1.0 }
fn default_sample_rate() -> f64 { 44100.0 }
fn default_fft_size() -> usize { 256 }
fn default_hop_size() -> usize { 128 }
fn default_psd_interval_ms() -> u64 { 100 }
fn default_stft_interval_ms() -> u64 { 500 }
fn default_gnuplot() -> String { "gnuplot".into() }
fn default_queue() -> usize { 4 }

impl Config {
    /// CLI values win over whatever the file set.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(v) = cli.signal_length { self.signal.length = v; }
        if let Some(v) = cli.amplitude { self.signal.amplitude = v; }
        if let Some(v) = cli.cycles { self.signal.cycles = v; }
        if let Some(v) = cli.sample_rate { self.signal.sample_rate = v; }
        if let Some(v) = cli.fft_size { self.analysis.fft_size = v; }
        if let Some(v) = cli.hop_size { self.analysis.hop_size = v; }
        if cli.frames.is_some() { self.analysis.frames = cli.frames; }
        if let Some(v) = cli.psd_interval_ms { self.render.psd_interval_ms = v; }
        if let Some(v) = cli.stft_interval_ms { self.render.stft_interval_ms = v; }
        if cli.recompute_stft { self.render.recompute_stft = true; }
        if cli.passes.is_some() { self.render.passes = cli.passes; }
        if let Some(ref v) = cli.gnuplot { self.render.gnuplot = v.clone(); }
    }

    pub fn frame_layout(&self) -> Result<FrameLayout, ConfigError> {
        FrameLayout::new(
            self.signal.length,
            self.analysis.fft_size,
            self.analysis.hop_size,
            self.analysis.frames,
        )
    }

    fn passes(&self) -> Option<u64> {
        // 0 means unlimited
        self.render.passes.filter(|&p| p > 0)
    }

    pub fn psd_loop(&self) -> Result<LoopConfig, ConfigError> {
        if self.render.psd_interval_ms == 0 {
            return Err(ConfigError::ZeroInterval { name: "PSD" });
        }
        Ok(LoopConfig {
            interval: Duration::from_millis(self.render.psd_interval_ms),
            passes: self.passes(),
        })
    }

    pub fn stft_loop(&self) -> Result<StftLoopConfig, ConfigError> {
        if self.render.recompute_stft && self.render.stft_interval_ms == 0 {
            return Err(ConfigError::ZeroInterval { name: "STFT" });
        }
        Ok(StftLoopConfig {
            pacing: LoopConfig {
                interval: Duration::from_millis(self.render.stft_interval_ms),
                passes: self.passes(),
            },
            recompute: self.render.recompute_stft,
        })
    }
}

/// Explicit path, then `./stft-psd.toml`, then `~/.config/stft-psd/config.toml`,
/// then the platform config dir.
pub fn find_config(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    let local = PathBuf::from(CONFIG_FILE);
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("stft-psd").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("stft-psd").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    parse_config(&content).with_context(|| format!("Failed to parse config: {}", path.display()))
}

fn parse_config(content: &str) -> Result<Config> {
    Ok(toml::from_str(content)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let cfg = parse_config("").unwrap();
        assert_eq!(cfg.signal.length, 1024);
        assert_eq!(cfg.analysis.fft_size, 256);
        assert_eq!(cfg.analysis.hop_size, 128);
        assert_eq!(cfg.analysis.frames, None);
        assert_eq!(cfg.signal.sample_rate, 44100.0);
        assert_eq!(cfg.render.psd_interval_ms, 100);
        assert_eq!(cfg.frame_layout().unwrap().frame_count(), 7);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = parse_config(
            r#"
            [analysis]
            fft_size = 512
            frames = 3

            [render]
            gnuplot = "/usr/local/bin/gnuplot"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.analysis.fft_size, 512);
        assert_eq!(cfg.analysis.hop_size, 128);
        assert_eq!(cfg.analysis.frames, Some(3));
        assert_eq!(cfg.render.gnuplot, "/usr/local/bin/gnuplot");
        assert_eq!(cfg.signal.amplitude, 0.5);
    }

    #[test]
    fn unknown_types_are_rejected() {
        assert!(parse_config("[analysis]\nfft_size = \"big\"").is_err());
    }

    #[test]
    fn cli_overrides_file() {
        let mut cfg = parse_config("[analysis]\nhop_size = 64").unwrap();
        let cli = Cli {
            hop_size: Some(32),
            frames: Some(4),
            recompute_stft: true,
            passes: Some(0),
            ..Default::default()
        };
        cfg.apply_cli(&cli);

        assert_eq!(cfg.analysis.hop_size, 32);
        assert_eq!(cfg.analysis.frames, Some(4));
        assert!(cfg.render.recompute_stft);
        assert_eq!(cfg.stft_loop().unwrap().pacing.passes, None);
    }

    #[test]
    fn mismatched_frame_count_is_a_config_error() {
        let mut cfg = Config::default();
        cfg.analysis.frames = Some(512);
        assert!(matches!(
            cfg.frame_layout(),
            Err(ConfigError::TooManyFrames { max: 7, .. })
        ));
    }

    #[test]
    fn zero_psd_interval_is_rejected() {
        let mut cfg = Config::default();
        cfg.render.psd_interval_ms = 0;
        assert_eq!(cfg.psd_loop(), Err(ConfigError::ZeroInterval { name: "PSD" }));
    }

    #[test]
    fn explicit_config_path_wins_and_is_loaded() {
        let path = std::env::temp_dir().join(format!("stft-psd-{}.toml", std::process::id()));
        std::fs::write(&path, "[analysis]\nfft_size = 64\nhop_size = 32\n").unwrap();

        let found = find_config(Some(&path));
        let cfg = found.as_deref().map(load_config).transpose();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(found.as_deref(), Some(path.as_path()));
        let cfg = cfg.unwrap().unwrap();
        assert_eq!((cfg.analysis.fft_size, cfg.analysis.hop_size), (64, 32));
        assert_eq!(cfg.signal.length, 1024);
    }

    #[test]
    fn missing_explicit_config_is_a_load_error() {
        let path = Path::new("/nonexistent/stft-psd/config.toml");
        assert_eq!(find_config(Some(path)).as_deref(), Some(path));

        let err = load_config(path).unwrap_err();
        assert!(err.to_string().contains("Failed to read config"), "{}", err);
    }
}
