//! The `PlantStore` trait.
//!
//! Implemented by storage backends (e.g. `growth-store-sqlite`). The API and
//! the time-lapse pipeline depend on this abstraction; the concrete handle is
//! opened by the binary and passed in explicitly.

use std::future::Future;

use uuid::Uuid;

use crate::{
  photo::{NewPhoto, PlantPhoto},
  plant::{NewPlant, Plant, PlantUpdate},
};

/// Abstraction over a plant/photo store backend.
///
/// Photo records are never mutated. They are removed only together with
/// their plant, children first.
pub trait PlantStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Plants ────────────────────────────────────────────────────────────

  /// Validate and persist a new plant. `started_at` is set by the store.
  fn add_plant(
    &self,
    input: NewPlant,
  ) -> impl Future<Output = Result<Plant, Self::Error>> + Send + '_;

  /// Retrieve a plant by UUID. Returns `None` if not found.
  fn get_plant(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Plant>, Self::Error>> + Send + '_;

  /// All plants, oldest first.
  fn list_plants(
    &self,
  ) -> impl Future<Output = Result<Vec<Plant>, Self::Error>> + Send + '_;

  /// Replace the editable fields of a plant and return the updated record.
  fn update_plant(
    &self,
    id: Uuid,
    update: PlantUpdate,
  ) -> impl Future<Output = Result<Plant, Self::Error>> + Send + '_;

  /// Delete a plant and all of its photo records. Returns how many photo
  /// records were removed. Image files on disk are left alone.
  fn delete_plant(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  // ── Photos ────────────────────────────────────────────────────────────

  /// Record a photo for an existing plant.
  fn add_photo(
    &self,
    input: NewPhoto,
  ) -> impl Future<Output = Result<PlantPhoto, Self::Error>> + Send + '_;

  /// Photos of a plant in ascending capture order. Photos captured in the
  /// same millisecond keep their insertion order.
  fn photos_for_plant(
    &self,
    plant_id: Uuid,
  ) -> impl Future<Output = Result<Vec<PlantPhoto>, Self::Error>> + Send + '_;

  fn count_photos(
    &self,
    plant_id: Uuid,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;
}
