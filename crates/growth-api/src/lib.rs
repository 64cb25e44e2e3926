//! JSON REST API for Growth.
//!
//! Exposes an axum [`Router`] backed by any [`PlantStore`] and a time-lapse
//! [`Assembler`]. The binary opens the store and encoder and passes them in;
//! nothing here reaches for global state.

pub mod error;
pub mod photos;
pub mod plants;
pub mod timelapse;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  routing::{get, post},
};
use growth_core::{plant::Plant, store::PlantStore};
use growth_timelapse::{Assembler, Encoder, EncoderSettings};
use serde::Deserialize;
use uuid::Uuid;

pub use error::ApiError;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `GROWTH_*` environment variables (`__` separates nested keys).
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:        String,
  #[serde(default = "default_port")]
  pub port:        u16,
  pub store_path:  PathBuf,
  /// Where finished time-lapse videos are kept.
  pub output_dir:  PathBuf,
  /// Parent of the per-run frame directories. Defaults to the system
  /// temporary directory.
  #[serde(default)]
  pub scratch_dir: Option<PathBuf>,
  #[serde(default)]
  pub encoder:     EncoderSettings,
}

fn default_host() -> String { "127.0.0.1".to_owned() }

fn default_port() -> u16 { 5240 }

impl ServerConfig {
  /// The single cached time-lapse location for a plant.
  pub fn timelapse_path(&self, plant_id: Uuid) -> PathBuf {
    self.output_dir.join(format!("timelapse_{plant_id}.mp4"))
  }

  pub fn scratch_root(&self) -> PathBuf {
    self
      .scratch_dir
      .clone()
      .unwrap_or_else(|| std::env::temp_dir().join("growth"))
  }
}

/// Environment overrides for [`ServerConfig`]: `GROWTH_PORT`,
/// `GROWTH_ENCODER__PROGRAM` and so on.
pub fn env_overrides() -> config::Environment {
  config::Environment::with_prefix("GROWTH")
    .prefix_separator("_")
    .separator("__")
    .try_parsing(true)
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S, E> {
  pub store:     Arc<S>,
  pub assembler: Arc<Assembler<E>>,
  pub config:    Arc<ServerConfig>,
}

impl<S, E> Clone for AppState<S, E> {
  fn clone(&self) -> Self {
    Self {
      store:     Arc::clone(&self.store),
      assembler: Arc::clone(&self.assembler),
      config:    Arc::clone(&self.config),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the API router for `state`.
pub fn router<S, E>(state: AppState<S, E>) -> Router
where
  S: PlantStore + 'static,
  E: Encoder + 'static,
{
  Router::new()
    // Plants
    .route("/plants", get(plants::list::<S, E>).post(plants::create::<S, E>))
    .route(
      "/plants/{id}",
      get(plants::get_one::<S, E>)
        .put(plants::update::<S, E>)
        .delete(plants::delete::<S, E>),
    )
    // Photos
    .route(
      "/plants/{id}/photos",
      get(photos::list::<S, E>).post(photos::create::<S, E>),
    )
    // Time-lapse
    .route("/plants/{id}/timelapse", post(timelapse::create::<S, E>))
    .route("/plants/{id}/timelapse.mp4", get(timelapse::download::<S, E>))
    .with_state(state)
}

/// Fetch a plant or fail with 404.
pub(crate) async fn require_plant<S: PlantStore>(
  store: &S,
  id: Uuid,
) -> Result<Plant, ApiError> {
  store
    .get_plant(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("plant {id}")))
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use std::{future::Future, path::Path};

  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use growth_core::{
    photo::{NewPhoto, PlantPhoto},
    plant::{NewPlant, PlantUpdate},
  };
  use growth_store_sqlite::SqliteStore;
  use growth_timelapse::{EncodeError, EncodeReport, EncodeRequest};
  use serde_json::{Value, json};
  use tempfile::TempDir;
  use tokio::sync::Notify;
  use tower::ServiceExt as _;

  use super::*;

  /// Writes a fixed payload, or fails like a rejected ffmpeg run.
  #[derive(Debug, Clone, Copy)]
  struct StubEncoder {
    fail: bool,
  }

  const VIDEO: &[u8] = b"not really an mp4";

  impl Encoder for StubEncoder {
    async fn encode<'a>(
      &'a self,
      request: EncodeRequest<'a>,
    ) -> Result<EncodeReport, EncodeError> {
      if self.fail {
        return Err(EncodeError::Exit {
          status: "exit status: 1".into(),
          log:    "frame=0\nInvalid data found when processing input".into(),
        });
      }
      tokio::fs::write(request.destination, VIDEO).await.unwrap();
      Ok(EncodeReport { log: format!("encoded {} frames", request.frame_count) })
    }
  }

  struct Harness<S = SqliteStore> {
    tmp:   TempDir,
    state: AppState<S, StubEncoder>,
  }

  async fn harness(fail: bool) -> Harness {
    harness_with(fail, |store| store).await
  }

  async fn harness_with<S>(fail: bool, wrap: impl FnOnce(SqliteStore) -> S) -> Harness<S> {
    let tmp = tempfile::tempdir().unwrap();
    let config = ServerConfig {
      host:        "127.0.0.1".into(),
      port:        5240,
      store_path:  PathBuf::from(":memory:"),
      output_dir:  tmp.path().join("videos"),
      scratch_dir: Some(tmp.path().join("scratch")),
      encoder:     EncoderSettings::default(),
    };
    let store = SqliteStore::open_in_memory().await.unwrap();
    let assembler = Assembler::new(StubEncoder { fail }, config.scratch_root());
    Harness {
      tmp,
      state: AppState {
        store:     Arc::new(wrap(store)),
        assembler: Arc::new(assembler),
        config:    Arc::new(config),
      },
    }
  }

  impl<S: PlantStore + 'static> Harness<S> {
    async fn send(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
      let (status, bytes) = self.send_raw(method, uri, body).await;
      let value = if bytes.is_empty() {
        Value::Null
      } else {
        serde_json::from_slice(&bytes).unwrap()
      };
      (status, value)
    }

    async fn send_raw(
      &self,
      method: &str,
      uri: &str,
      body: Option<Value>,
    ) -> (StatusCode, Vec<u8>) {
      let builder = Request::builder().method(method).uri(uri);
      let req = match body {
        Some(json) => builder
          .header(header::CONTENT_TYPE, "application/json")
          .body(Body::from(json.to_string()))
          .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
      };
      let resp = router(self.state.clone()).oneshot(req).await.unwrap();
      let status = resp.status();
      let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
      (status, bytes.to_vec())
    }

    async fn create_plant(&self, name: &str) -> String {
      let (status, body) = self
        .send("POST", "/plants", Some(json!({ "name": name, "species": "Monstera" })))
        .await;
      assert_eq!(status, StatusCode::CREATED);
      body["plant_id"].as_str().unwrap().to_owned()
    }

    fn photo_file(&self, name: &str) -> String {
      let path = self.tmp.path().join(name);
      std::fs::write(&path, name.as_bytes()).unwrap();
      path.to_string_lossy().into_owned()
    }

    async fn add_photo(&self, plant_id: &str, name: &str, taken_at: &str) {
      let path = self.photo_file(name);
      let (status, _) = self
        .send(
          "POST",
          &format!("/plants/{plant_id}/photos"),
          Some(json!({ "path": path, "taken_at": taken_at })),
        )
        .await;
      assert_eq!(status, StatusCode::CREATED);
    }

    fn video_path(&self, plant_id: &str) -> PathBuf {
      self.state.config.timelapse_path(plant_id.parse().unwrap())
    }
  }

  // ── Plants ──────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn create_then_list_plants() {
    let h = harness(false).await;
    h.create_plant("Fern").await;
    h.create_plant("Basil").await;

    let (status, body) = h.send("GET", "/plants", None).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<_> = body
      .as_array()
      .unwrap()
      .iter()
      .map(|p| p["name"].as_str().unwrap())
      .collect();
    assert_eq!(names, ["Fern", "Basil"]);
  }

  #[tokio::test]
  async fn blank_name_is_rejected() {
    let h = harness(false).await;
    let (status, body) = h.send("POST", "/plants", Some(json!({ "name": "   " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
  }

  #[tokio::test]
  async fn unknown_plant_is_404() {
    let h = harness(false).await;
    let uri = format!("/plants/{}", Uuid::new_v4());
    let (status, _) = h.send("GET", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn details_report_photo_count_and_readiness() {
    let h = harness(false).await;
    let id = h.create_plant("Fern").await;

    let (_, body) = h.send("GET", &format!("/plants/{id}"), None).await;
    assert_eq!(body["name"], "Fern");
    assert_eq!(body["photo_count"], 0);
    assert_eq!(body["days_growing"], 0);
    assert_eq!(body["timelapse_ready"], false);

    h.add_photo(&id, "a.jpg", "2024-01-01T00:00:00Z").await;
    h.add_photo(&id, "b.jpg", "2024-01-02T00:00:00Z").await;

    let (_, body) = h.send("GET", &format!("/plants/{id}"), None).await;
    assert_eq!(body["photo_count"], 2);
    assert_eq!(body["timelapse_ready"], true);
    assert_eq!(body["timelapse_in_progress"], false);
  }

  #[tokio::test]
  async fn update_renames_plant() {
    let h = harness(false).await;
    let id = h.create_plant("Fern").await;

    let (status, body) = h
      .send("PUT", &format!("/plants/{id}"), Some(json!({ "name": "Boston fern" })))
      .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Boston fern");
    assert!(body["species"].is_null());
  }

  #[tokio::test]
  async fn delete_removes_plant_photos_and_video() {
    let h = harness(false).await;
    let id = h.create_plant("Fern").await;
    h.add_photo(&id, "a.jpg", "2024-01-01T00:00:00Z").await;
    h.add_photo(&id, "b.jpg", "2024-01-02T00:00:00Z").await;
    let (status, _) = h.send("POST", &format!("/plants/{id}/timelapse"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(h.video_path(&id).exists());

    let (status, _) = h.send("DELETE", &format!("/plants/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = h.send("GET", &format!("/plants/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(!h.video_path(&id).exists());
    // Image files are not ours to delete.
    assert!(h.tmp.path().join("a.jpg").exists());
  }

  // ── Photos ──────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn photos_are_listed_oldest_first() {
    let h = harness(false).await;
    let id = h.create_plant("Fern").await;
    h.add_photo(&id, "late.jpg", "2024-03-01T00:00:00Z").await;
    h.add_photo(&id, "early.jpg", "2024-01-01T00:00:00Z").await;

    let (status, body) = h.send("GET", &format!("/plants/{id}/photos"), None).await;
    assert_eq!(status, StatusCode::OK);
    let paths: Vec<_> = body
      .as_array()
      .unwrap()
      .iter()
      .map(|p| p["path"].as_str().unwrap().to_owned())
      .collect();
    assert!(paths[0].ends_with("early.jpg"), "{paths:?}");
    assert!(paths[1].ends_with("late.jpg"), "{paths:?}");
  }

  #[tokio::test]
  async fn photo_of_missing_file_is_rejected() {
    let h = harness(false).await;
    let id = h.create_plant("Fern").await;
    let missing = h.tmp.path().join("nope.jpg");

    let (status, body) = h
      .send(
        "POST",
        &format!("/plants/{id}/photos"),
        Some(json!({ "path": missing.to_string_lossy() })),
      )
      .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("nope.jpg"));
  }

  #[tokio::test]
  async fn photo_for_unknown_plant_is_404() {
    let h = harness(false).await;
    let path = h.photo_file("a.jpg");
    let uri = format!("/plants/{}/photos", Uuid::new_v4());
    let (status, _) = h.send("POST", &uri, Some(json!({ "path": path }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  // ── Time-lapse ──────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn timelapse_needs_two_photos() {
    let h = harness(false).await;
    let id = h.create_plant("Fern").await;
    h.add_photo(&id, "a.jpg", "2024-01-01T00:00:00Z").await;

    let (status, body) = h.send("POST", &format!("/plants/{id}/timelapse"), None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "insufficient_frames");
    assert!(!h.video_path(&id).exists());
  }

  #[tokio::test]
  async fn timelapse_is_built_and_served() {
    let h = harness(false).await;
    let id = h.create_plant("Fern").await;
    h.add_photo(&id, "a.jpg", "2024-01-01T00:00:00Z").await;
    h.add_photo(&id, "b.jpg", "2024-01-02T00:00:00Z").await;
    h.add_photo(&id, "c.jpg", "2024-01-03T00:00:00Z").await;

    let (status, body) = h.send("POST", &format!("/plants/{id}/timelapse"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["artifact"]["frame_count"], 3);
    assert_eq!(body["artifact"]["size_bytes"], VIDEO.len());
    assert_eq!(body["url"], format!("/plants/{id}/timelapse.mp4"));

    let (status, bytes) = h
      .send_raw("GET", &format!("/plants/{id}/timelapse.mp4"), None)
      .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bytes, VIDEO);
  }

  #[tokio::test]
  async fn download_without_timelapse_is_404() {
    let h = harness(false).await;
    let id = h.create_plant("Fern").await;
    let (status, _) = h.send("GET", &format!("/plants/{id}/timelapse.mp4"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn encoder_failure_returns_log_excerpt() {
    let h = harness(true).await;
    let id = h.create_plant("Fern").await;
    h.add_photo(&id, "a.jpg", "2024-01-01T00:00:00Z").await;
    h.add_photo(&id, "b.jpg", "2024-01-02T00:00:00Z").await;

    let (status, body) = h.send("POST", &format!("/plants/{id}/timelapse"), None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["kind"], "encoding_failed");
    assert!(
      body["log_excerpt"].as_str().unwrap().contains("Invalid data found"),
      "{body}"
    );
    assert!(!h.video_path(&id).exists());
    assert!(scratch_is_empty(&h.state.config.scratch_root()));
  }

  #[tokio::test]
  async fn timelapse_in_progress_is_409() {
    let h = harness(false).await;
    let id = h.create_plant("Fern").await;
    h.add_photo(&id, "a.jpg", "2024-01-01T00:00:00Z").await;
    h.add_photo(&id, "b.jpg", "2024-01-02T00:00:00Z").await;

    let plant_id: Uuid = id.parse().unwrap();
    let _held = h.state.assembler.leases().try_acquire(plant_id).unwrap();

    let (status, body) = h.send("POST", &format!("/plants/{id}/timelapse"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "already_running");

    let (status, _) = h.send("DELETE", &format!("/plants/{id}"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = h.send("GET", &format!("/plants/{id}/timelapse.mp4"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
  }

  /// Delegates to SQLite but stops in `photos_for_plant` until released.
  struct PausingStore {
    inner:   SqliteStore,
    reached: Arc<Notify>,
    release: Arc<Notify>,
  }

  impl PlantStore for PausingStore {
    type Error = growth_store_sqlite::Error;

    fn add_plant(
      &self,
      input: NewPlant,
    ) -> impl Future<Output = Result<Plant, Self::Error>> + Send + '_ {
      self.inner.add_plant(input)
    }

    fn get_plant(
      &self,
      id: Uuid,
    ) -> impl Future<Output = Result<Option<Plant>, Self::Error>> + Send + '_ {
      self.inner.get_plant(id)
    }

    fn list_plants(&self) -> impl Future<Output = Result<Vec<Plant>, Self::Error>> + Send + '_ {
      self.inner.list_plants()
    }

    fn update_plant(
      &self,
      id: Uuid,
      update: PlantUpdate,
    ) -> impl Future<Output = Result<Plant, Self::Error>> + Send + '_ {
      self.inner.update_plant(id, update)
    }

    fn delete_plant(
      &self,
      id: Uuid,
    ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_ {
      self.inner.delete_plant(id)
    }

    fn add_photo(
      &self,
      input: NewPhoto,
    ) -> impl Future<Output = Result<PlantPhoto, Self::Error>> + Send + '_ {
      self.inner.add_photo(input)
    }

    async fn photos_for_plant(&self, plant_id: Uuid) -> Result<Vec<PlantPhoto>, Self::Error> {
      self.reached.notify_one();
      self.release.notified().await;
      self.inner.photos_for_plant(plant_id).await
    }

    fn count_photos(
      &self,
      plant_id: Uuid,
    ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_ {
      self.inner.count_photos(plant_id)
    }
  }

  #[tokio::test]
  async fn delete_waits_out_a_build_that_is_reading_photos() {
    let reached = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let h = harness_with(false, |inner| PausingStore {
      inner,
      reached: Arc::clone(&reached),
      release: Arc::clone(&release),
    })
    .await;
    let id = h.create_plant("Fern").await;
    h.add_photo(&id, "a.jpg", "2024-01-01T00:00:00Z").await;
    h.add_photo(&id, "b.jpg", "2024-01-02T00:00:00Z").await;

    let build_req = Request::builder()
      .method("POST")
      .uri(format!("/plants/{id}/timelapse"))
      .body(Body::empty())
      .unwrap();
    let build = tokio::spawn(router(h.state.clone()).oneshot(build_req));
    reached.notified().await;

    let (status, _) = h.send("DELETE", &format!("/plants/{id}"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    release.notify_one();
    let resp = build.await.unwrap().unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(h.video_path(&id).exists());

    let (status, _) = h.send("DELETE", &format!("/plants/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(!h.video_path(&id).exists());
    let (status, _) = h.send("GET", &format!("/plants/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  #[test]
  fn env_overrides_read_growth_prefixed_variables() {
    let vars: config::Map<String, String> = [
      ("GROWTH_PORT", "8080"),
      ("GROWTH_STORE_PATH", "/data/growth.db"),
      ("GROWTH_OUTPUT_DIR", "/data/videos"),
      ("GROWTH_ENCODER__PROGRAM", "/opt/ffmpeg/bin/ffmpeg"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_owned(), v.to_owned()))
    .collect();

    let cfg: ServerConfig = config::Config::builder()
      .add_source(env_overrides().source(Some(vars)))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap();

    assert_eq!(cfg.port, 8080);
    assert_eq!(cfg.host, "127.0.0.1");
    assert_eq!(cfg.store_path, PathBuf::from("/data/growth.db"));
    assert_eq!(cfg.output_dir, PathBuf::from("/data/videos"));
    assert_eq!(cfg.encoder.program, PathBuf::from("/opt/ffmpeg/bin/ffmpeg"));
    assert_eq!(cfg.encoder.codec, "libx264");
  }

  fn scratch_is_empty(root: &Path) -> bool {
    match std::fs::read_dir(root) {
      Ok(mut entries) => entries.next().is_none(),
      Err(_) => true,
    }
  }
}
