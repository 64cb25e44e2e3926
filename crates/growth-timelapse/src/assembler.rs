//! [`Assembler`]: stages, encodes and verifies one plant's time-lapse.

use std::{
  io::ErrorKind,
  path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  AssemblyError, EncodeRequest, Encoder, FrameSource, MIN_TIMELAPSE_PHOTOS,
  PlantLease, PlantLeases,
  error::append_note,
  frames::{ScratchDir, in_capture_order, stage_frames},
};

/// A verified video file produced by [`Assembler::assemble`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
  pub path:        PathBuf,
  /// Always greater than zero.
  pub size_bytes:  u64,
  pub frame_count: usize,
}

/// Builds time-lapse videos from photo sequences.
///
/// Runs for different plants are independent and may overlap. A second run
/// for a plant that is already being assembled is rejected with
/// [`AssemblyError::AlreadyRunning`].
///
/// Dropping the future returned by [`Assembler::assemble`] cancels the run:
/// the scratch directory is removed, a partially written destination is
/// deleted and, with [`FfmpegEncoder`](crate::FfmpegEncoder), the child
/// process is killed.
#[derive(Debug)]
pub struct Assembler<E> {
  encoder:      E,
  scratch_root: PathBuf,
  leases:       PlantLeases,
}

impl<E: Encoder> Assembler<E> {
  /// `scratch_root` is where per-run frame directories are created; it is
  /// created on first use.
  pub fn new(encoder: E, scratch_root: impl Into<PathBuf>) -> Self {
    Self {
      encoder,
      scratch_root: scratch_root.into(),
      leases: PlantLeases::default(),
    }
  }

  pub fn encoder(&self) -> &E { &self.encoder }

  pub fn scratch_root(&self) -> &Path { &self.scratch_root }

  /// The per-plant exclusion shared by all runs of this assembler.
  pub fn leases(&self) -> &PlantLeases { &self.leases }

  /// Whether a run for `plant_id` is currently in flight.
  pub fn is_assembling(&self, plant_id: Uuid) -> bool {
    self.leases.is_held(plant_id)
  }

  /// Produce a time-lapse of `photos` at `destination`.
  ///
  /// Photos are used in ascending capture order. Any file already at
  /// `destination` is removed first; after a failed run nothing is left
  /// there.
  pub async fn assemble(
    &self,
    plant_id: Uuid,
    photos: &[FrameSource],
    destination: &Path,
  ) -> Result<Artifact, AssemblyError> {
    check_frame_count(photos)?;
    let lease = self
      .leases
      .try_acquire(plant_id)
      .ok_or(AssemblyError::AlreadyRunning(plant_id))?;
    self.assemble_with_lease(lease, photos, destination).await
  }

  /// Like [`Assembler::assemble`], for a caller that already claimed the
  /// plant through [`Assembler::leases`], typically before reading the
  /// photos. The lease is released when the run ends.
  pub async fn assemble_with_lease(
    &self,
    lease: PlantLease,
    photos: &[FrameSource],
    destination: &Path,
  ) -> Result<Artifact, AssemblyError> {
    check_frame_count(photos)?;
    let plant_id = lease.plant_id();

    remove_stale_output(destination).await?;
    if let Some(parent) = destination.parent()
      && !parent.as_os_str().is_empty()
    {
      tokio::fs::create_dir_all(parent).await.map_err(|e| {
        AssemblyError::io(format!("creating output directory {}", parent.display()), e)
      })?;
    }

    let mut output = PendingOutput::new(destination);
    let scratch = ScratchDir::create(&self.scratch_root, plant_id).await?;

    let result = self.stage_and_encode(scratch.path(), photos, destination).await;
    scratch.remove().await;

    let artifact = result?;
    output.keep();

    tracing::info!(
      %plant_id,
      path = %artifact.path.display(),
      size_bytes = artifact.size_bytes,
      frames = artifact.frame_count,
      "time-lapse assembled"
    );
    Ok(artifact)
  }

  async fn stage_and_encode(
    &self,
    frames_dir: &Path,
    photos: &[FrameSource],
    destination: &Path,
  ) -> Result<Artifact, AssemblyError> {
    let frames = in_capture_order(photos);
    stage_frames(frames_dir, &frames, self.encoder.frame_extension()).await?;

    let request = EncodeRequest {
      frames_dir,
      frame_count: frames.len(),
      destination,
    };
    let report = match self.encoder.encode(request).await {
      Ok(report) => report,
      Err(e) => {
        let err = AssemblyError::EncodingFailed { log: e.into_log() };
        tracing::warn!(
          destination = %destination.display(),
          log = %err.log_excerpt(20).unwrap_or_default(),
          "encoder failed"
        );
        return Err(err);
      }
    };

    let size_bytes = verify_artifact(destination, report.log).await?;
    Ok(Artifact {
      path: destination.to_path_buf(),
      size_bytes,
      frame_count: frames.len(),
    })
  }
}

fn check_frame_count(photos: &[FrameSource]) -> Result<(), AssemblyError> {
  let available = photos.len();
  if available < MIN_TIMELAPSE_PHOTOS {
    return Err(AssemblyError::InsufficientFrames { available });
  }
  Ok(())
}

/// The exit status alone is not proof of a usable file.
async fn verify_artifact(destination: &Path, log: String) -> Result<u64, AssemblyError> {
  let problem = match tokio::fs::metadata(destination).await {
    Ok(meta) if meta.is_file() && meta.len() > 0 => return Ok(meta.len()),
    Ok(meta) if !meta.is_file() => "is not a regular file".to_owned(),
    Ok(_) => "is empty".to_owned(),
    Err(e) => format!("is missing ({e})"),
  };

  let note = format!(
    "encoder reported success but {} {problem}",
    destination.display()
  );
  tracing::warn!("{note}");
  Err(AssemblyError::EncodingFailed { log: append_note(log, &note) })
}

async fn remove_stale_output(destination: &Path) -> Result<(), AssemblyError> {
  match tokio::fs::remove_file(destination).await {
    Ok(()) => {
      tracing::debug!(path = %destination.display(), "removed stale time-lapse");
      Ok(())
    }
    Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
    Err(e) => Err(AssemblyError::io(
      format!("removing stale output {}", destination.display()),
      e,
    )),
  }
}

/// Deletes the destination on drop unless [`PendingOutput::keep`] was called,
/// so failed or cancelled runs leave no partial file behind.
struct PendingOutput<'a> {
  path: &'a Path,
  kept: bool,
}

impl<'a> PendingOutput<'a> {
  fn new(path: &'a Path) -> Self { Self { path, kept: false } }

  fn keep(&mut self) { self.kept = true; }
}

impl Drop for PendingOutput<'_> {
  fn drop(&mut self) {
    if self.kept {
      return;
    }
    match std::fs::remove_file(self.path) {
      Ok(()) => {
        tracing::debug!(path = %self.path.display(), "removed partial time-lapse");
      }
      Err(e) if e.kind() == ErrorKind::NotFound => {}
      Err(e) => {
        tracing::warn!(path = %self.path.display(), error = %e, "failed to remove partial time-lapse");
      }
    }
  }
}
