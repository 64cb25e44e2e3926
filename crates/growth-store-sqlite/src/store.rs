//! [`SqliteStore`]: the SQLite implementation of [`PlantStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use growth_core::{
  photo::{NewPhoto, PlantPhoto},
  plant::{NewPlant, Plant, PlantUpdate},
  store::PlantStore,
};

use crate::{
  encode::{
    decode_count, encode_millis, encode_uuid, truncate_to_millis, RawPhoto,
    RawPlant,
  },
  schema::SCHEMA,
  Error, Result,
};

const PLANT_COLUMNS: &str = "plant_id, name, species, started_at, cover_path";
const PHOTO_COLUMNS: &str = "photo_id, plant_id, taken_at, photo_path, notes";

// ─── Store ───────────────────────────────────────────────────────────────────

/// A plant store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted. The handle is
/// opened once at startup and closed explicitly with [`SqliteStore::close`].
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    tracing::debug!(path = %path.as_ref().display(), "opening plant store");
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, mostly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Close the underlying connection. Other clones of this handle fail with a
  /// database error afterwards.
  pub async fn close(self) -> Result<()> {
    self.conn.close().await?;
    Ok(())
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn plant_exists(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);
    let exists = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT 1 FROM plants WHERE plant_id = ?1",
              rusqlite::params![id_str],
              |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false),
        )
      })
      .await?;
    Ok(exists)
  }
}

// ─── PlantStore impl ─────────────────────────────────────────────────────────

impl PlantStore for SqliteStore {
  type Error = Error;

  // ── Plants ────────────────────────────────────────────────────────────────

  async fn add_plant(&self, input: NewPlant) -> Result<Plant> {
    let input = input.normalized()?;
    let plant = Plant {
      plant_id:   Uuid::new_v4(),
      name:       input.name,
      species:    input.species,
      started_at: truncate_to_millis(Utc::now())?,
      cover_path: input.cover_path,
    };

    let id_str     = encode_uuid(plant.plant_id);
    let name       = plant.name.clone();
    let species    = plant.species.clone();
    let started_at = encode_millis(plant.started_at);
    let cover_path = plant.cover_path.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO plants (plant_id, name, species, started_at, cover_path)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![id_str, name, species, started_at, cover_path],
        )?;
        Ok(())
      })
      .await?;

    Ok(plant)
  }

  async fn get_plant(&self, id: Uuid) -> Result<Option<Plant>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawPlant> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {PLANT_COLUMNS} FROM plants WHERE plant_id = ?1"),
              rusqlite::params![id_str],
              RawPlant::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawPlant::into_plant).transpose()
  }

  async fn list_plants(&self) -> Result<Vec<Plant>> {
    let raws: Vec<RawPlant> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {PLANT_COLUMNS} FROM plants ORDER BY started_at ASC, name ASC"
        ))?;
        let rows = stmt
          .query_map([], RawPlant::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawPlant::into_plant).collect()
  }

  async fn update_plant(&self, id: Uuid, update: PlantUpdate) -> Result<Plant> {
    let update  = update.normalized()?;
    let id_str  = encode_uuid(id);
    let name    = update.name;
    let species = update.species;

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE plants SET name = ?2, species = ?3 WHERE plant_id = ?1",
          rusqlite::params![id_str, name, species],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(Error::PlantNotFound(id));
    }

    self.get_plant(id).await?.ok_or(Error::PlantNotFound(id))
  }

  async fn delete_plant(&self, id: Uuid) -> Result<usize> {
    let id_str = encode_uuid(id);

    // Children first, then the parent, atomically.
    let (photos_removed, plants_removed) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let photos = tx.execute(
          "DELETE FROM plant_photos WHERE plant_id = ?1",
          rusqlite::params![id_str],
        )?;
        let plants = tx.execute(
          "DELETE FROM plants WHERE plant_id = ?1",
          rusqlite::params![id_str],
        )?;
        tx.commit()?;
        Ok((photos, plants))
      })
      .await?;

    if plants_removed == 0 {
      return Err(Error::PlantNotFound(id));
    }

    tracing::debug!(plant_id = %id, photos_removed, "deleted plant");
    Ok(photos_removed)
  }

  // ── Photos ────────────────────────────────────────────────────────────────

  async fn add_photo(&self, input: NewPhoto) -> Result<PlantPhoto> {
    let input = input.normalized()?;
    if !self.plant_exists(input.plant_id).await? {
      return Err(Error::PlantNotFound(input.plant_id));
    }

    let photo = PlantPhoto {
      photo_id: Uuid::new_v4(),
      plant_id: input.plant_id,
      taken_at: truncate_to_millis(input.taken_at.unwrap_or_else(Utc::now))?,
      path:     input.path,
      notes:    input.notes,
    };

    let photo_id_str = encode_uuid(photo.photo_id);
    let plant_id_str = encode_uuid(photo.plant_id);
    let taken_at     = encode_millis(photo.taken_at);
    let path         = photo.path.clone();
    let notes        = photo.notes.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO plant_photos (photo_id, plant_id, taken_at, photo_path, notes)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![photo_id_str, plant_id_str, taken_at, path, notes],
        )?;
        Ok(())
      })
      .await?;

    Ok(photo)
  }

  async fn photos_for_plant(&self, plant_id: Uuid) -> Result<Vec<PlantPhoto>> {
    let id_str = encode_uuid(plant_id);

    let raws: Vec<RawPhoto> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {PHOTO_COLUMNS} FROM plant_photos
           WHERE plant_id = ?1
           ORDER BY taken_at ASC, rowid ASC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], RawPhoto::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawPhoto::into_photo).collect()
  }

  async fn count_photos(&self, plant_id: Uuid) -> Result<usize> {
    let id_str = encode_uuid(plant_id);

    let n: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*) FROM plant_photos WHERE plant_id = ?1",
          rusqlite::params![id_str],
          |r| r.get(0),
        )?)
      })
      .await?;

    decode_count(n)
  }
}
