//! Error types for `growth-timelapse`.

use std::{io, path::PathBuf};

use thiserror::Error;
use uuid::Uuid;

use crate::MIN_TIMELAPSE_PHOTOS;

/// Why an assembly run produced no artifact.
#[derive(Debug, Error)]
pub enum AssemblyError {
  /// Fewer photos than a time-lapse needs. Nothing was touched on disk.
  #[error("need at least {required} photos for a time-lapse, got {available}", required = MIN_TIMELAPSE_PHOTOS)]
  InsufficientFrames { available: usize },

  /// Another run for the same plant is still in flight.
  #[error("a time-lapse for plant {0} is already being assembled")]
  AlreadyRunning(Uuid),

  #[error("failed to stage frames ({context}): {source}")]
  StagingFailed {
    context: String,
    #[source]
    source:  io::Error,
  },

  /// The encoder failed, could not be launched, or claimed success without
  /// leaving a usable file. `log` is never empty.
  #[error("encoding failed")]
  EncodingFailed { log: String },

  #[error("{context}: {source}")]
  IoFailure {
    context: String,
    #[source]
    source:  io::Error,
  },
}

impl AssemblyError {
  pub(crate) fn staging(context: impl Into<String>, source: io::Error) -> Self {
    Self::StagingFailed { context: context.into(), source }
  }

  pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
    Self::IoFailure { context: context.into(), source }
  }

  /// Stable machine-readable discriminant.
  pub fn kind(&self) -> &'static str {
    match self {
      Self::InsufficientFrames { .. } => "insufficient_frames",
      Self::AlreadyRunning(_) => "already_running",
      Self::StagingFailed { .. } => "staging_failed",
      Self::EncodingFailed { .. } => "encoding_failed",
      Self::IoFailure { .. } => "io_failure",
    }
  }

  /// Short text suitable for end users. The raw encoder log is deliberately
  /// not part of it; see [`AssemblyError::log_excerpt`].
  pub fn user_message(&self) -> &'static str {
    match self {
      Self::InsufficientFrames { .. } => {
        "Not enough photos yet. Take at least two to create a time-lapse."
      }
      Self::AlreadyRunning(_) => "A time-lapse for this plant is already being created.",
      Self::EncodingFailed { .. } => "Encoding the time-lapse failed.",
      Self::StagingFailed { .. } | Self::IoFailure { .. } => {
        "The time-lapse files could not be prepared."
      }
    }
  }

  /// The last `max_lines` lines of the encoder log, for `EncodingFailed` only.
  pub fn log_excerpt(&self, max_lines: usize) -> Option<String> {
    let Self::EncodingFailed { log } = self else {
      return None;
    };
    let lines: Vec<&str> = log.lines().collect();
    let start = lines.len().saturating_sub(max_lines);
    Some(lines[start..].join("\n"))
  }
}

/// Failure reported by an [`Encoder`](crate::Encoder).
#[derive(Debug, Error)]
pub enum EncodeError {
  #[error("failed to launch encoder {program:?}: {source}")]
  Launch {
    program: PathBuf,
    #[source]
    source:  io::Error,
  },

  #[error("encoder exited with {status}")]
  Exit { status: String, log: String },
}

impl EncodeError {
  /// Diagnostic log for this failure, with a closing line that names what
  /// went wrong.
  pub fn into_log(self) -> String {
    let summary = self.to_string();
    match self {
      Self::Launch { .. } => summary,
      Self::Exit { log, .. } => append_note(log, &summary),
    }
  }
}

/// Append `note` as the final line of `log`.
pub(crate) fn append_note(log: String, note: &str) -> String {
  let trimmed = log.trim_end();
  if trimmed.is_empty() {
    note.to_owned()
  } else {
    format!("{trimmed}\n{note}")
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn user_messages_distinguish_failure_classes() {
    let short = AssemblyError::InsufficientFrames { available: 1 };
    let encode = AssemblyError::EncodingFailed { log: "boom".into() };
    let io = AssemblyError::io("removing stale output", io::Error::other("denied"));

    assert_ne!(short.user_message(), encode.user_message());
    assert_ne!(encode.user_message(), io.user_message());
    assert_ne!(short.user_message(), io.user_message());
    assert!(!encode.user_message().contains("boom"));
  }

  #[test]
  fn insufficient_frames_names_the_minimum() {
    let err = AssemblyError::InsufficientFrames { available: 1 };
    assert_eq!(
      err.to_string(),
      "need at least 2 photos for a time-lapse, got 1"
    );
  }

  #[test]
  fn log_excerpt_keeps_the_tail() {
    let err = AssemblyError::EncodingFailed { log: "a\nb\nc\nd".into() };
    assert_eq!(err.log_excerpt(2).as_deref(), Some("c\nd"));
    assert_eq!(err.log_excerpt(10).as_deref(), Some("a\nb\nc\nd"));

    let other = AssemblyError::AlreadyRunning(Uuid::nil());
    assert!(other.log_excerpt(5).is_none());
  }

  #[test]
  fn exit_log_ends_with_status_line() {
    let err = EncodeError::Exit {
      status: "exit status: 1".into(),
      log:    "Invalid data found\n\n".into(),
    };
    assert_eq!(
      err.into_log(),
      "Invalid data found\nencoder exited with exit status: 1"
    );
  }

  #[test]
  fn silent_exit_still_has_a_log() {
    let err = EncodeError::Exit { status: "exit status: 8".into(), log: String::new() };
    assert_eq!(err.into_log(), "encoder exited with exit status: 8");
  }
}
