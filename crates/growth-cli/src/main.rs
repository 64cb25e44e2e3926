//! `growth`: command-line client for the Growth plant tracker.
//!
//! # Usage
//!
//! ```
//! growth add "Basil" --species "Ocimum basilicum"
//! growth add-photo <PLANT_ID> ~/photos/basil-day1.jpg
//! growth timelapse <PLANT_ID> --out basil.mp4
//! growth --url http://pi.local:5240 plants
//! ```

mod client;
mod render;

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use client::{ApiClient, ApiConfig, ServerError};
use growth_core::plant::{MIN_TIMELAPSE_PHOTOS, NewPlant, PlantUpdate};
use serde::Deserialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

const DEFAULT_URL: &str = "http://localhost:5240";

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "growth", about = "Track plant growth photos and build time-lapses")]
struct Args {
  /// Path to a TOML config file (url).
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Base URL of the growth server (default: http://localhost:5240).
  #[arg(long, env = "GROWTH_URL")]
  url: Option<String>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// List all plants.
  Plants,
  /// Start tracking a plant.
  Add {
    name:    String,
    #[arg(long)]
    species: Option<String>,
    /// Image shown for the plant in listings.
    #[arg(long)]
    cover:   Option<String>,
  },
  /// Show one plant.
  Show { id: Uuid },
  /// Rename a plant or change its species.
  Edit {
    id:      Uuid,
    #[arg(long)]
    name:    Option<String>,
    #[arg(long)]
    species: Option<String>,
  },
  /// Stop tracking a plant and forget its photos.
  Delete { id: Uuid },
  /// List a plant's photos, oldest first.
  Photos { id: Uuid },
  /// Record a photo already saved on the server's disk.
  AddPhoto {
    id:       Uuid,
    path:     PathBuf,
    /// Capture time (RFC 3339); defaults to now.
    #[arg(long)]
    taken_at: Option<DateTime<Utc>>,
    #[arg(long)]
    notes:    Option<String>,
  },
  /// Build the plant's time-lapse from all of its photos.
  Timelapse {
    id:      Uuid,
    /// Also download the video to this file.
    #[arg(long, value_name = "FILE")]
    out:     Option<PathBuf>,
    /// Print the encoder's output when the build fails.
    #[arg(short, long)]
    verbose: bool,
  },
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
struct ConfigFile {
  #[serde(default)]
  url: String,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy(),
    )
    .init();

  let args = Args::parse();

  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  // CLI flags override config file, which overrides defaults.
  let api_config = ApiConfig {
    base_url: args
      .url
      .or_else(|| (!file_cfg.url.is_empty()).then(|| file_cfg.url.clone()))
      .unwrap_or_else(|| DEFAULT_URL.to_string()),
  };
  tracing::debug!(url = %api_config.base_url, "using server");

  let client = ApiClient::new(api_config)?;
  run(&client, args.command).await
}

async fn run(client: &ApiClient, command: Command) -> Result<()> {
  match command {
    Command::Plants => {
      let plants = client.list_plants().await?;
      print!("{}", render::plant_table(&plants));
    }
    Command::Add { name, species, cover } => {
      let plant = client
        .add_plant(&NewPlant { name, species, cover_path: cover })
        .await?;
      println!("{}", plant.plant_id);
    }
    Command::Show { id } => {
      let details = client.plant(id).await?;
      print!("{}", render::plant_details(&details));
    }
    Command::Edit { id, name, species } => {
      let current = client.plant(id).await?.plant;
      let update = PlantUpdate {
        name:    name.unwrap_or(current.name),
        species: species.or(current.species),
      };
      let plant = client.update_plant(id, &update).await?;
      println!("updated {}", plant.name);
    }
    Command::Delete { id } => {
      client.delete_plant(id).await?;
      println!("deleted {id}");
    }
    Command::Photos { id } => {
      let photos = client.photos(id).await?;
      print!("{}", render::photo_list(&photos));
    }
    Command::AddPhoto { id, path, taken_at, notes } => {
      let path = std::path::absolute(&path)
        .with_context(|| format!("resolving {}", path.display()))?;
      let photo = client
        .add_photo(id, &path.to_string_lossy(), taken_at, notes.as_deref())
        .await?;
      println!("{}", photo.photo_id);
    }
    Command::Timelapse { id, out, verbose } => {
      let built = match client.build_timelapse(id).await {
        Ok(built) => built,
        Err(e) => {
          if let Some(server) = e.downcast_ref::<ServerError>() {
            if server.kind.as_deref() == Some("insufficient_frames") {
              eprintln!("add at least {MIN_TIMELAPSE_PHOTOS} photos first");
            }
            if verbose && let Some(log) = &server.log_excerpt {
              eprintln!("encoder output:\n{log}");
            }
          }
          return Err(e);
        }
      };
      println!(
        "built {} ({} frames, {} bytes)",
        built.artifact.path.display(),
        built.artifact.frame_count,
        built.artifact.size_bytes,
      );
      if let Some(out) = out {
        let size = client.download(&built.url, &out).await?;
        println!("saved {} ({size} bytes)", out.display());
      }
    }
  }
  Ok(())
}
