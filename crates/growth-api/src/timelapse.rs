//! Handlers for building and serving a plant's time-lapse.

use std::io::ErrorKind;

use axum::{
  Json,
  extract::{Path, State},
  http::header,
  response::IntoResponse,
};
use growth_core::store::PlantStore;
use growth_timelapse::{Artifact, AssemblyError, Encoder, FrameSource};
use serde::Serialize;
use uuid::Uuid;

use crate::{AppState, error::ApiError, require_plant};

#[derive(Debug, Serialize)]
pub struct TimelapseResponse {
  pub artifact: Artifact,
  /// Where the video can be downloaded from this server.
  pub url:      String,
}

/// `POST /plants/:id/timelapse`
///
/// Rebuilds the plant's video from all of its photos, replacing any earlier
/// one.
pub async fn create<S, E>(
  State(state): State<AppState<S, E>>,
  Path(id): Path<Uuid>,
) -> Result<Json<TimelapseResponse>, ApiError>
where
  S: PlantStore,
  E: Encoder,
{
  // Claimed before the photos are read so a concurrent delete cannot slip
  // in between.
  let lease = state
    .assembler
    .leases()
    .try_acquire(id)
    .ok_or(AssemblyError::AlreadyRunning(id))?;

  require_plant(&*state.store, id).await?;
  let photos = state
    .store
    .photos_for_plant(id)
    .await
    .map_err(ApiError::store)?;
  let frames: Vec<FrameSource> = photos.iter().map(FrameSource::from).collect();

  let destination = state.config.timelapse_path(id);
  let artifact = state
    .assembler
    .assemble_with_lease(lease, &frames, &destination)
    .await?;

  Ok(Json(TimelapseResponse {
    artifact,
    url: format!("/plants/{id}/timelapse.mp4"),
  }))
}

/// `GET /plants/:id/timelapse.mp4`
pub async fn download<S, E>(
  State(state): State<AppState<S, E>>,
  Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PlantStore,
  E: Encoder,
{
  if state.assembler.is_assembling(id) {
    return Err(ApiError::Conflict(format!(
      "the time-lapse for plant {id} is being rebuilt"
    )));
  }

  let path = state.config.timelapse_path(id);
  match tokio::fs::read(&path).await {
    Ok(bytes) => Ok(([(header::CONTENT_TYPE, "video/mp4")], bytes)),
    Err(e) if e.kind() == ErrorKind::NotFound => {
      Err(ApiError::NotFound(format!("time-lapse for plant {id}")))
    }
    Err(e) => Err(ApiError::Internal(format!("reading {}: {e}", path.display()))),
  }
}
