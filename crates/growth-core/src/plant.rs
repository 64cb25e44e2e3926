//! Plants: the tracked subject that owns a series of photos.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Photos a plant needs before a time-lapse can be assembled.
pub const MIN_TIMELAPSE_PHOTOS: usize = 2;

/// A tracked plant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plant {
  pub plant_id:   Uuid,
  pub name:       String,
  pub species:    Option<String>,
  /// When tracking started; set by the store on creation.
  pub started_at: DateTime<Utc>,
  /// Image shown for the plant in listings.
  pub cover_path: Option<String>,
}

impl Plant {
  /// Whole days elapsed between `started_at` and `now`. Never negative.
  pub fn days_growing(&self, now: DateTime<Utc>) -> i64 {
    (now - self.started_at).num_days().max(0)
  }
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// Input for creating a plant. `started_at` is assigned by the store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewPlant {
  pub name:       String,
  #[serde(default)]
  pub species:    Option<String>,
  #[serde(default)]
  pub cover_path: Option<String>,
}

impl NewPlant {
  pub fn new(name: impl Into<String>) -> Self {
    Self { name: name.into(), ..Default::default() }
  }

  /// Trim every field, turn blank optionals into `None`, and reject a blank
  /// name.
  pub fn normalized(self) -> Result<Self> {
    Ok(Self {
      name:       normalize_name(&self.name)?,
      species:    normalize_optional(self.species),
      cover_path: normalize_optional(self.cover_path),
    })
  }
}

/// Editable fields of an existing plant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlantUpdate {
  pub name:    String,
  #[serde(default)]
  pub species: Option<String>,
}

impl PlantUpdate {
  pub fn normalized(self) -> Result<Self> {
    Ok(Self {
      name:    normalize_name(&self.name)?,
      species: normalize_optional(self.species),
    })
  }
}

fn normalize_name(name: &str) -> Result<String> {
  let trimmed = name.trim();
  if trimmed.is_empty() {
    return Err(Error::BlankName);
  }
  Ok(trimmed.to_owned())
}

fn normalize_optional(value: Option<String>) -> Option<String> {
  value
    .map(|v| v.trim().to_owned())
    .filter(|v| !v.is_empty())
}
