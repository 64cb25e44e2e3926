//! Handlers for `/plants/:id/photos`.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/plants/:id/photos` | Oldest capture first |
//! | `POST` | `/plants/:id/photos` | Body: `{"path":"...","taken_at":"...","notes":"..."}` |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::{DateTime, Utc};
use growth_core::{
  photo::{NewPhoto, PlantPhoto},
  store::PlantStore,
};
use growth_timelapse::Encoder;
use serde::Deserialize;
use uuid::Uuid;

use crate::{AppState, error::ApiError, require_plant};

/// `GET /plants/:id/photos`
pub async fn list<S, E>(
  State(state): State<AppState<S, E>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<PlantPhoto>>, ApiError>
where
  S: PlantStore,
  E: Encoder,
{
  require_plant(&*state.store, id).await?;
  let photos = state
    .store
    .photos_for_plant(id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(photos))
}

/// Body of `POST /plants/:id/photos`.
#[derive(Debug, Deserialize)]
pub struct PhotoBody {
  /// Image already saved on the server's local storage.
  pub path:     String,
  /// Defaults to now.
  #[serde(default)]
  pub taken_at: Option<DateTime<Utc>>,
  #[serde(default)]
  pub notes:    Option<String>,
}

/// `POST /plants/:id/photos` returns 201 + the stored [`PlantPhoto`].
pub async fn create<S, E>(
  State(state): State<AppState<S, E>>,
  Path(id): Path<Uuid>,
  Json(body): Json<PhotoBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PlantStore,
  E: Encoder,
{
  let input = NewPhoto {
    plant_id: id,
    path:     body.path,
    taken_at: body.taken_at,
    notes:    body.notes,
  }
  .normalized()
  .map_err(|e| ApiError::BadRequest(e.to_string()))?;

  require_plant(&*state.store, id).await?;

  match tokio::fs::metadata(&input.path).await {
    Ok(meta) if meta.is_file() => {}
    _ => {
      return Err(ApiError::BadRequest(format!(
        "photo file not found: {}",
        input.path
      )));
    }
  }

  let photo = state.store.add_photo(input).await.map_err(ApiError::store)?;
  tracing::debug!(plant_id = %id, photo_id = %photo.photo_id, "photo recorded");
  Ok((StatusCode::CREATED, Json(photo)))
}
