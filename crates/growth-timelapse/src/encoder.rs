//! The [`Encoder`] capability and its ffmpeg implementation.

use std::{future::Future, path::Path, process::Stdio};

use tokio::process::Command;

use crate::{EncodeError, EncoderSettings};

/// One encoder invocation over a staged frame directory.
#[derive(Debug, Clone, Copy)]
pub struct EncodeRequest<'a> {
  /// Directory holding `1.<ext>` … `N.<ext>`.
  pub frames_dir:  &'a Path,
  pub frame_count: usize,
  /// Where the video must be written.
  pub destination: &'a Path,
}

/// What a successful encoder run reported.
#[derive(Debug, Clone, Default)]
pub struct EncodeReport {
  /// Combined diagnostic output of the run.
  pub log: String,
}

/// Turns a staged frame directory into a video file.
///
/// Implementations report only how the run ended; the assembler verifies the
/// output file itself.
pub trait Encoder: Send + Sync {
  /// Extension of the frame files the encoder's input pattern expects.
  fn frame_extension(&self) -> &str { "jpg" }

  fn encode<'a>(
    &'a self,
    request: EncodeRequest<'a>,
  ) -> impl Future<Output = Result<EncodeReport, EncodeError>> + Send + 'a;
}

// ─── ffmpeg ──────────────────────────────────────────────────────────────────

/// Runs an external ffmpeg-compatible program.
///
/// The child is killed if the returned future is dropped before it exits.
#[derive(Debug, Clone, Default)]
pub struct FfmpegEncoder {
  settings: EncoderSettings,
}

impl FfmpegEncoder {
  pub fn new(settings: EncoderSettings) -> Self { Self { settings } }

  pub fn settings(&self) -> &EncoderSettings { &self.settings }
}

impl Encoder for FfmpegEncoder {
  fn frame_extension(&self) -> &str { &self.settings.frame_extension }

  async fn encode<'a>(
    &'a self,
    request: EncodeRequest<'a>,
  ) -> Result<EncodeReport, EncodeError> {
    let program = &self.settings.program;
    let args = self
      .settings
      .command_args(request.frames_dir, request.destination);

    tracing::debug!(
      program = %program.display(),
      ?args,
      frames = request.frame_count,
      "running encoder"
    );

    let output = Command::new(program)
      .args(&args)
      .stdin(Stdio::null())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .kill_on_drop(true)
      .output()
      .await
      .map_err(|source| EncodeError::Launch { program: program.clone(), source })?;

    let log = combined_log(&output.stderr, &output.stdout);

    if output.status.success() {
      Ok(EncodeReport { log })
    } else {
      Err(EncodeError::Exit { status: output.status.to_string(), log })
    }
  }
}

/// ffmpeg writes its progress and diagnostics to stderr; stdout follows on
/// its own line when there is any.
fn combined_log(stderr: &[u8], stdout: &[u8]) -> String {
  let mut log = String::from_utf8_lossy(stderr).into_owned();
  let stdout = String::from_utf8_lossy(stdout);
  if !stdout.trim().is_empty() {
    if !log.is_empty() && !log.ends_with('\n') {
      log.push('\n');
    }
    log.push_str(&stdout);
  }
  log
}
