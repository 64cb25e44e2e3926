//! Frame staging: the scratch directory and the sequentially numbered copies
//! of the source photos inside it.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use growth_core::photo::PlantPhoto;
use tempfile::TempDir;
use uuid::Uuid;

use crate::AssemblyError;

/// One source image and when it was captured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSource {
  pub path:        PathBuf,
  pub captured_at: DateTime<Utc>,
}

impl FrameSource {
  pub fn new(path: impl Into<PathBuf>, captured_at: DateTime<Utc>) -> Self {
    Self { path: path.into(), captured_at }
  }
}

impl From<&PlantPhoto> for FrameSource {
  fn from(photo: &PlantPhoto) -> Self {
    Self::new(&photo.path, photo.taken_at)
  }
}

/// File name of the frame at 1-based `position`.
pub fn frame_file_name(position: usize, extension: &str) -> String {
  format!("{position}.{extension}")
}

/// Sources in ascending capture order. The sort is stable, so an already
/// ordered input comes back unchanged.
pub(crate) fn in_capture_order(sources: &[FrameSource]) -> Vec<&FrameSource> {
  let mut ordered: Vec<&FrameSource> = sources.iter().collect();
  ordered.sort_by_key(|s| s.captured_at);
  ordered
}

/// Copy `frames` into `dir` as `1.<ext>` … `N.<ext>`. The sources are only
/// read.
pub(crate) async fn stage_frames(
  dir: &Path,
  frames: &[&FrameSource],
  extension: &str,
) -> Result<(), AssemblyError> {
  for (index, frame) in frames.iter().enumerate() {
    let target = dir.join(frame_file_name(index + 1, extension));
    tokio::fs::copy(&frame.path, &target)
      .await
      .map_err(|e| {
        AssemblyError::staging(
          format!("copying {} to {}", frame.path.display(), target.display()),
          e,
        )
      })?;
  }
  tracing::debug!(frames = frames.len(), dir = %dir.display(), "staged frames");
  Ok(())
}

// ─── Scratch directory ───────────────────────────────────────────────────────

/// A private directory for one assembly run.
///
/// Dropping it removes the directory, which covers cancellation. Normal exits
/// go through [`ScratchDir::remove`] so failures get logged.
pub(crate) struct ScratchDir {
  dir: TempDir,
}

impl ScratchDir {
  /// Create `timelapse-<plant>-<millis>-<random>` under `root`.
  pub(crate) async fn create(root: &Path, plant_id: Uuid) -> Result<Self, AssemblyError> {
    tokio::fs::create_dir_all(root).await.map_err(|e| {
      AssemblyError::staging(format!("creating scratch root {}", root.display()), e)
    })?;

    let prefix = format!("timelapse-{plant_id}-{}-", Utc::now().timestamp_millis());
    let root_owned = root.to_path_buf();
    let dir = tokio::task::spawn_blocking(move || {
      tempfile::Builder::new().prefix(&prefix).tempdir_in(root_owned)
    })
    .await
    .map_err(std::io::Error::other)
    .and_then(|created| created)
    .map_err(|e| {
      AssemblyError::staging(format!("creating scratch directory in {}", root.display()), e)
    })?;

    Ok(Self { dir })
  }

  pub(crate) fn path(&self) -> &Path { self.dir.path() }

  /// Remove the directory and everything in it. Failures are logged, never
  /// returned.
  pub(crate) async fn remove(self) {
    let path = self.dir.path().to_path_buf();
    let dir = self.dir;
    match tokio::task::spawn_blocking(move || dir.close()).await {
      Ok(Ok(())) => {}
      Ok(Err(e)) => {
        tracing::warn!(dir = %path.display(), error = %e, "failed to remove scratch directory");
      }
      Err(e) => {
        tracing::warn!(dir = %path.display(), error = %e, "scratch cleanup task failed");
      }
    }
  }
}
