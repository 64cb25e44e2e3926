//! Encoder configuration.

use std::{
  ffi::OsString,
  path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

/// Fixed cadence and output format handed to the encoder.
///
/// The defaults consume 2 photos per second of video and emit 30 fps, so each
/// photo is held for 15 output frames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderSettings {
  /// Encoder executable; looked up on `PATH` when not absolute.
  pub program:          PathBuf,
  /// Source photos consumed per second of video.
  pub input_framerate:  u32,
  pub output_framerate: u32,
  pub codec:            String,
  pub pixel_format:     String,
  /// Value for `-q:v`; lower is better.
  pub quality:          u32,
  /// Extension of the staged frame files, matching the input pattern.
  pub frame_extension:  String,
}

impl Default for EncoderSettings {
  fn default() -> Self {
    Self {
      program:          PathBuf::from("ffmpeg"),
      input_framerate:  2,
      output_framerate: 30,
      codec:            "libx264".to_owned(),
      pixel_format:     "yuv420p".to_owned(),
      quality:          2,
      frame_extension:  "jpg".to_owned(),
    }
  }
}

impl EncoderSettings {
  /// Output frames each source photo stays on screen.
  pub fn frames_per_photo(&self) -> u32 {
    self.output_rate() / self.input_rate()
  }

  // A zero rate is not a valid encoder argument; treat it as 1.
  fn input_rate(&self) -> u32 { self.input_framerate.max(1) }

  fn output_rate(&self) -> u32 { self.output_framerate.max(1) }

  /// The `%d` input pattern inside `frames_dir`.
  pub fn input_pattern(&self, frames_dir: &Path) -> PathBuf {
    frames_dir.join(format!("%d.{}", self.frame_extension))
  }

  /// Full argument list, excluding the program itself.
  pub fn command_args(&self, frames_dir: &Path, destination: &Path) -> Vec<OsString> {
    vec![
      "-y".into(),
      "-framerate".into(),
      self.input_rate().to_string().into(),
      "-i".into(),
      self.input_pattern(frames_dir).into(),
      "-c:v".into(),
      self.codec.clone().into(),
      "-r".into(),
      self.output_rate().to_string().into(),
      "-pix_fmt".into(),
      self.pixel_format.clone().into(),
      "-q:v".into(),
      self.quality.to_string().into(),
      destination.into(),
    ]
  }
}
