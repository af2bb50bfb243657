//! Runs a two-player map rotation against locally installed engines.
//!
//! The host ("Director") commands the match over team chat; the joiner
//! ("Audience") only watches. Ctrl-C stops the rotation after the current
//! match and shuts both engines down.

mod director;

use std::error::Error;
use std::path::{Path, PathBuf};

use clap::Parser;
use enginelink::prelude::*;
use enginelink::protocol::{AiBuild, Difficulty};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::director::DirectorAgent;

#[derive(Parser)]
#[command(name = "chat-director")]
#[command(about = "Play a map rotation with a chat-directing host")]
struct Cli {
    /// JSON file with `coordinator`, `launch`, and `maps` sections
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Map to play; repeat for a rotation. Overrides the config file
    #[arg(short, long = "map")]
    maps: Vec<String>,

    /// Engine executable (defaults to the one in ExecuteInfo.txt)
    #[arg(short, long)]
    executable: Option<PathBuf>,

    /// Reveal the whole map
    #[arg(long)]
    disable_fog: bool,

    /// Steps between chat orders
    #[arg(long, default_value = "100")]
    interval: u32,
}

/// Contents of the `--config` file.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct DemoConfig {
    coordinator: CoordinatorConfig,
    launch: LaunchConfig,
    maps: Vec<GameMap>,
}

impl DemoConfig {
    fn load(path: &Path) -> Result<Self, Box<dyn Error>> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Applies command-line overrides.
    fn merge(mut self, cli: &Cli) -> Self {
        if !cli.maps.is_empty() {
            self.maps = cli.maps.iter().map(GameMap::installed).collect();
        }
        if cli.executable.is_some() {
            self.launch.executable = cli.executable.clone();
        }
        if cli.disable_fog {
            self.coordinator.disable_fog = true;
        }
        if self.maps.is_empty() {
            self.maps.push(GameMap::installed("StarArena.SC2Map"));
        }
        self
    }
}

fn player(name: &str) -> PlayerSetup {
    PlayerSetup {
        player_type: PlayerType::Participant,
        race: Race::Random,
        player_name: Some(name.to_string()),
        difficulty: Difficulty::Easy,
        ai_build: AiBuild::RandomBuild,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => DemoConfig::load(path)?,
        None => DemoConfig::default(),
    }
    .merge(&cli);

    let (stop, cancel) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, stopping after this match");
            let _ = stop.send(true);
        }
    });

    tracing::info!(maps = config.maps.len(), "starting rotation");
    let coordinator = Coordinator::builder()
        .config(config.coordinator)
        .launch_config(config.launch)
        .build();
    let players = [
        Participant::new(player("Director")).with_handler(DirectorAgent::new(cli.interval)),
        Participant::new(player("Audience")),
    ];

    coordinator
        .run(config.maps, players, cancel)
        .await
        .map_err(EngineLinkError::from)?;
    tracing::info!("rotation finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("chat-director").chain(args.iter().copied()))
    }

    #[test]
    fn test_default_rotation_has_one_map() {
        let config = DemoConfig::default().merge(&cli(&[]));
        assert_eq!(config.maps, vec![GameMap::installed("StarArena.SC2Map")]);
        assert!(config.coordinator.realtime);
    }

    #[test]
    fn test_cli_overrides_config_file() {
        let file: DemoConfig = serde_json::from_str(
            r#"{"maps": [{"name": "FromFile.SC2Map"}], "launch": {"host": "10.0.0.2"}}"#,
        )
        .unwrap();
        let config = file.merge(&cli(&["--map", "A.SC2Map", "--map", "B.SC2Map", "--disable-fog"]));

        let names: Vec<_> = config.maps.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["A.SC2Map", "B.SC2Map"]);
        assert!(config.coordinator.disable_fog);
        assert_eq!(config.launch.host, "10.0.0.2");
        assert_eq!(config.launch.window_width, 1024);
    }
}
