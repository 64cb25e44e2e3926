//! Photo records: one captured image of a plant.
//!
//! Records are immutable once stored. The image bytes live on local storage;
//! the database only keeps a path to them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// A stored photo of a plant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlantPhoto {
  pub photo_id: Uuid,
  pub plant_id: Uuid,
  /// Capture time. Persisted with millisecond precision.
  pub taken_at: DateTime<Utc>,
  /// Location of the image file on local storage.
  pub path:     String,
  pub notes:    Option<String>,
}

/// Input for recording a photo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPhoto {
  pub plant_id: Uuid,
  pub path:     String,
  /// Defaults to the time the store records the photo.
  #[serde(default)]
  pub taken_at: Option<DateTime<Utc>>,
  #[serde(default)]
  pub notes:    Option<String>,
}

impl NewPhoto {
  pub fn new(plant_id: Uuid, path: impl Into<String>) -> Self {
    Self { plant_id, path: path.into(), taken_at: None, notes: None }
  }

  pub fn taken_at(mut self, at: DateTime<Utc>) -> Self {
    self.taken_at = Some(at);
    self
  }

  pub fn normalized(self) -> Result<Self> {
    if self.path.trim().is_empty() {
      return Err(Error::EmptyPhotoPath);
    }
    let Self { plant_id, path, taken_at, notes } = self;
    Ok(Self {
      plant_id,
      path,
      taken_at,
      notes: notes.map(|n| n.trim().to_owned()).filter(|n| !n.is_empty()),
    })
  }
}
