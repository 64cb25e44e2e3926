//! Encoding and decoding helpers between Rust domain types and the plain
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as integer epoch milliseconds. UUIDs are stored as
//! hyphenated lowercase strings.

use chrono::{DateTime, Utc};
use growth_core::{photo::PlantPhoto, plant::Plant};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_millis(dt: DateTime<Utc>) -> i64 { dt.timestamp_millis() }

pub fn decode_millis(ms: i64) -> Result<DateTime<Utc>> {
  DateTime::from_timestamp_millis(ms).ok_or(Error::Timestamp(ms))
}

/// Truncate to the precision the store keeps, so returned records compare
/// equal to what a later read yields.
pub fn truncate_to_millis(dt: DateTime<Utc>) -> Result<DateTime<Utc>> {
  decode_millis(encode_millis(dt))
}

pub fn decode_count(n: i64) -> Result<usize> {
  usize::try_from(n).map_err(|_| Error::Count(n))
}

// ─── Raw rows ─────────────────────────────────────────────────────────────────

/// A `plants` row as read from SQLite.
pub struct RawPlant {
  pub plant_id:   String,
  pub name:       String,
  pub species:    Option<String>,
  pub started_at: i64,
  pub cover_path: Option<String>,
}

impl RawPlant {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      plant_id:   row.get(0)?,
      name:       row.get(1)?,
      species:    row.get(2)?,
      started_at: row.get(3)?,
      cover_path: row.get(4)?,
    })
  }

  pub fn into_plant(self) -> Result<Plant> {
    Ok(Plant {
      plant_id:   decode_uuid(&self.plant_id)?,
      name:       self.name,
      species:    self.species,
      started_at: decode_millis(self.started_at)?,
      cover_path: self.cover_path,
    })
  }
}

/// A `plant_photos` row as read from SQLite.
pub struct RawPhoto {
  pub photo_id:   String,
  pub plant_id:   String,
  pub taken_at:   i64,
  pub photo_path: String,
  pub notes:      Option<String>,
}

impl RawPhoto {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      photo_id:   row.get(0)?,
      plant_id:   row.get(1)?,
      taken_at:   row.get(2)?,
      photo_path: row.get(3)?,
      notes:      row.get(4)?,
    })
  }

  pub fn into_photo(self) -> Result<PlantPhoto> {
    Ok(PlantPhoto {
      photo_id: decode_uuid(&self.photo_id)?,
      plant_id: decode_uuid(&self.plant_id)?,
      taken_at: decode_millis(self.taken_at)?,
      path:     self.photo_path,
      notes:    self.notes,
    })
  }
}
