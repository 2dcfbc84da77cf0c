use std::path::{Path, PathBuf};

use abloop_core::PlayerConfig;
use anyhow::Context;
use clap::Parser;

/// Command-line arguments for abloop
#[derive(Parser, Debug)]
#[command(name = "abloop")]
#[command(about = "Terminal audio player with variable speed and A-B looping")]
#[command(version)]
pub struct Cli {
    /// Audio file to open
    pub file: Option<PathBuf>,

    /// TOML file with player settings
    #[arg(short, long, env = "ABLOOP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Initial playback rate
    #[arg(long)]
    pub rate: Option<f64>,

    /// Initial volume (0.0 to 1.0)
    #[arg(long)]
    pub volume: Option<f64>,

    /// Use a silent simulated track of this length instead of an audio device
    #[arg(long, value_name = "SECONDS")]
    pub simulate: Option<f64>,
}

impl Cli {
    /// Config file settings with command-line overrides applied.
    pub fn player_config(&self) -> anyhow::Result<PlayerConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => PlayerConfig::default(),
        };
        if let Some(rate) = self.rate {
            config.default_rate = rate;
        }
        if let Some(volume) = self.volume {
            config.default_volume = volume;
        }
        Ok(config.validated())
    }
}

pub fn load_config(path: &Path) -> anyhow::Result<PlayerConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read config file {}", path.display()))?;
    parse_config(&text).with_context(|| format!("Invalid config file {}", path.display()))
}

pub fn parse_config(text: &str) -> anyhow::Result<PlayerConfig> {
    let config: PlayerConfig = toml::from_str(text)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let config = parse_config("seek_step = 2.5\nmax_rate = 1.5\n").unwrap();
        assert_eq!(config.seek_step, 2.5);
        assert_eq!(config.max_rate, 1.5);
        assert_eq!(config.min_rate, PlayerConfig::default().min_rate);
    }

    #[test]
    fn malformed_config_is_an_error() {
        assert!(parse_config("seek_step = \"fast\"").is_err());
    }

    #[test]
    fn cli_overrides_are_clamped() {
        let cli = Cli::parse_from(["abloop", "--rate", "9", "--volume", "0.4", "song.mp3"]);
        let config = cli.player_config().unwrap();
        assert_eq!(config.default_rate, 2.0);
        assert_eq!(config.default_volume, 0.4);
        assert_eq!(cli.file, Some(PathBuf::from("song.mp3")));
    }
}
