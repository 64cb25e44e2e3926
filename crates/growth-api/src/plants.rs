//! Handlers for `/plants` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/plants` | All plants, oldest first |
//! | `POST`   | `/plants` | Body: `{"name":"...","species":"...","cover_path":"..."}` |
//! | `GET`    | `/plants/:id` | [`PlantDetails`]; 404 if not found |
//! | `PUT`    | `/plants/:id` | Body: `{"name":"...","species":"..."}` |
//! | `DELETE` | `/plants/:id` | Removes the plant, its photo records and its time-lapse |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::Utc;
use growth_core::{
  plant::{MIN_TIMELAPSE_PHOTOS, NewPlant, Plant, PlantUpdate},
  store::PlantStore,
};
use growth_timelapse::Encoder;
use serde::Serialize;
use uuid::Uuid;

use crate::{AppState, error::ApiError, require_plant};

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /plants`
pub async fn list<S, E>(
  State(state): State<AppState<S, E>>,
) -> Result<Json<Vec<Plant>>, ApiError>
where
  S: PlantStore,
  E: Encoder,
{
  let plants = state.store.list_plants().await.map_err(ApiError::store)?;
  Ok(Json(plants))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /plants` returns 201 + the stored [`Plant`].
pub async fn create<S, E>(
  State(state): State<AppState<S, E>>,
  Json(body): Json<NewPlant>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PlantStore,
  E: Encoder,
{
  let input = body
    .normalized()
    .map_err(|e| ApiError::BadRequest(e.to_string()))?;
  let plant = state.store.add_plant(input).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(plant)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// A plant with the figures shown on its detail page.
#[derive(Debug, Serialize)]
pub struct PlantDetails {
  #[serde(flatten)]
  pub plant:                 Plant,
  pub photo_count:           usize,
  pub days_growing:          i64,
  /// Enough photos exist to assemble a time-lapse.
  pub timelapse_ready:       bool,
  pub timelapse_in_progress: bool,
}

/// `GET /plants/:id`
pub async fn get_one<S, E>(
  State(state): State<AppState<S, E>>,
  Path(id): Path<Uuid>,
) -> Result<Json<PlantDetails>, ApiError>
where
  S: PlantStore,
  E: Encoder,
{
  let plant = require_plant(&*state.store, id).await?;
  let photo_count = state.store.count_photos(id).await.map_err(ApiError::store)?;

  Ok(Json(PlantDetails {
    days_growing: plant.days_growing(Utc::now()),
    plant,
    photo_count,
    timelapse_ready: photo_count >= MIN_TIMELAPSE_PHOTOS,
    timelapse_in_progress: state.assembler.is_assembling(id),
  }))
}

// ─── Update ───────────────────────────────────────────────────────────────────

/// `PUT /plants/:id`
pub async fn update<S, E>(
  State(state): State<AppState<S, E>>,
  Path(id): Path<Uuid>,
  Json(body): Json<PlantUpdate>,
) -> Result<Json<Plant>, ApiError>
where
  S: PlantStore,
  E: Encoder,
{
  let update = body
    .normalized()
    .map_err(|e| ApiError::BadRequest(e.to_string()))?;
  require_plant(&*state.store, id).await?;
  let plant = state
    .store
    .update_plant(id, update)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(plant))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /plants/:id`
pub async fn delete<S, E>(
  State(state): State<AppState<S, E>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: PlantStore,
  E: Encoder,
{
  // Held until the video is gone so no build can start in between.
  let _lease = state.assembler.leases().try_acquire(id).ok_or_else(|| {
    ApiError::Conflict(format!("a time-lapse for plant {id} is being assembled"))
  })?;
  require_plant(&*state.store, id).await?;
  let photos_removed = state.store.delete_plant(id).await.map_err(ApiError::store)?;

  let artifact = state.config.timelapse_path(id);
  match tokio::fs::remove_file(&artifact).await {
    Ok(()) => {}
    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
    Err(e) => {
      tracing::warn!(path = %artifact.display(), error = %e, "failed to remove time-lapse of deleted plant");
    }
  }

  tracing::info!(plant_id = %id, photos_removed, "plant deleted");
  Ok(StatusCode::NO_CONTENT)
}
