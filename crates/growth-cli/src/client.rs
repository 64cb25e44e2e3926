//! Async HTTP client wrapping the growth JSON API.

use std::{path::Path, time::Duration};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use growth_core::{
  photo::PlantPhoto,
  plant::{NewPlant, Plant, PlantUpdate},
};
use growth_timelapse::Artifact;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;
use uuid::Uuid;

/// Time-lapse requests run an encoder on the server and may take a while.
const TIMELAPSE_TIMEOUT: Duration = Duration::from_secs(600);

/// Connection settings for the growth API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub base_url: String,
}

/// A non-success response, decoded from the server's JSON error body.
#[derive(Debug, Error)]
#[error("{message} ({status})")]
pub struct ServerError {
  pub status:      StatusCode,
  pub message:     String,
  pub kind:        Option<String>,
  pub log_excerpt: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
  error:       String,
  #[serde(default)]
  kind:        Option<String>,
  #[serde(default)]
  log_excerpt: Option<String>,
}

/// Mirrors the server's plant detail response.
#[derive(Debug, Deserialize)]
pub struct PlantDetails {
  #[serde(flatten)]
  pub plant:                 Plant,
  pub photo_count:           usize,
  pub days_growing:          i64,
  pub timelapse_ready:       bool,
  #[serde(default)]
  pub timelapse_in_progress: bool,
}

#[derive(Debug, Serialize)]
struct PhotoBody<'a> {
  path:     &'a str,
  #[serde(skip_serializing_if = "Option::is_none")]
  taken_at: Option<DateTime<Utc>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  notes:    Option<&'a str>,
}

#[derive(Debug, Deserialize)]
pub struct TimelapseResponse {
  pub artifact: Artifact,
  pub url:      String,
}

/// Async HTTP client for the growth JSON REST API.
///
/// Cheap to clone: the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  config: ApiConfig,
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self> {
    let client = Client::builder()
      .connect_timeout(Duration::from_secs(10))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, config })
  }

  pub fn url(&self, path: &str) -> String {
    format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
  }

  // ── Plants ────────────────────────────────────────────────────────────────

  /// `GET /plants`
  pub async fn list_plants(&self) -> Result<Vec<Plant>> {
    let resp = self
      .client
      .get(self.url("/plants"))
      .send()
      .await
      .context("GET /plants failed")?;
    decode(resp, "plants").await
  }

  /// `POST /plants`
  pub async fn add_plant(&self, input: &NewPlant) -> Result<Plant> {
    let resp = self
      .client
      .post(self.url("/plants"))
      .json(input)
      .send()
      .await
      .context("POST /plants failed")?;
    decode(resp, "plant").await
  }

  /// `GET /plants/:id`
  pub async fn plant(&self, id: Uuid) -> Result<PlantDetails> {
    let resp = self
      .client
      .get(self.url(&format!("/plants/{id}")))
      .send()
      .await
      .with_context(|| format!("GET /plants/{id} failed"))?;
    decode(resp, "plant details").await
  }

  /// `PUT /plants/:id`
  pub async fn update_plant(&self, id: Uuid, update: &PlantUpdate) -> Result<Plant> {
    let resp = self
      .client
      .put(self.url(&format!("/plants/{id}")))
      .json(update)
      .send()
      .await
      .with_context(|| format!("PUT /plants/{id} failed"))?;
    decode(resp, "plant").await
  }

  /// `DELETE /plants/:id`
  pub async fn delete_plant(&self, id: Uuid) -> Result<()> {
    let resp = self
      .client
      .delete(self.url(&format!("/plants/{id}")))
      .send()
      .await
      .with_context(|| format!("DELETE /plants/{id} failed"))?;
    check(resp).await?;
    Ok(())
  }

  // ── Photos ────────────────────────────────────────────────────────────────

  /// `GET /plants/:id/photos`
  pub async fn photos(&self, id: Uuid) -> Result<Vec<PlantPhoto>> {
    let resp = self
      .client
      .get(self.url(&format!("/plants/{id}/photos")))
      .send()
      .await
      .with_context(|| format!("GET /plants/{id}/photos failed"))?;
    decode(resp, "photos").await
  }

  /// `POST /plants/:id/photos`
  pub async fn add_photo(
    &self,
    id: Uuid,
    path: &str,
    taken_at: Option<DateTime<Utc>>,
    notes: Option<&str>,
  ) -> Result<PlantPhoto> {
    let resp = self
      .client
      .post(self.url(&format!("/plants/{id}/photos")))
      .json(&PhotoBody { path, taken_at, notes })
      .send()
      .await
      .with_context(|| format!("POST /plants/{id}/photos failed"))?;
    decode(resp, "photo").await
  }

  // ── Time-lapse ────────────────────────────────────────────────────────────

  /// `POST /plants/:id/timelapse`
  pub async fn build_timelapse(&self, id: Uuid) -> Result<TimelapseResponse> {
    let resp = self
      .client
      .post(self.url(&format!("/plants/{id}/timelapse")))
      .timeout(TIMELAPSE_TIMEOUT)
      .send()
      .await
      .with_context(|| format!("POST /plants/{id}/timelapse failed"))?;
    decode(resp, "time-lapse").await
  }

  /// Download the video at `url` (as returned by the server) to `dest`.
  pub async fn download(&self, url: &str, dest: &Path) -> Result<u64> {
    let resp = self
      .client
      .get(self.url(url))
      .timeout(TIMELAPSE_TIMEOUT)
      .send()
      .await
      .with_context(|| format!("GET {url} failed"))?;
    let bytes = check(resp)
      .await?
      .bytes()
      .await
      .context("reading time-lapse body")?;
    tokio::fs::write(dest, &bytes)
      .await
      .with_context(|| format!("writing {}", dest.display()))?;
    Ok(bytes.len() as u64)
  }
}

/// Turn a non-success response into a [`ServerError`].
async fn check(resp: Response) -> Result<Response> {
  let status = resp.status();
  if status.is_success() {
    return Ok(resp);
  }
  let text = resp.text().await.unwrap_or_default();
  Err(server_error(status, &text).into())
}

fn server_error(status: StatusCode, body: &str) -> ServerError {
  match serde_json::from_str::<ErrorBody>(body) {
    Ok(body) => ServerError {
      status,
      message: body.error,
      kind: body.kind,
      log_excerpt: body.log_excerpt,
    },
    Err(_) => ServerError {
      status,
      message: if body.trim().is_empty() {
        "request failed".to_owned()
      } else {
        body.trim().to_owned()
      },
      kind: None,
      log_excerpt: None,
    },
  }
}

async fn decode<T: DeserializeOwned>(resp: Response, what: &str) -> Result<T> {
  check(resp)
    .await?
    .json()
    .await
    .with_context(|| format!("deserialising {what}"))
}
