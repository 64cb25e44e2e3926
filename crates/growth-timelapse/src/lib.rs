//! Time-lapse assembly for the Growth plant tracker.
//!
//! Given the ordered photos of one plant, [`Assembler::assemble`] stages them
//! as a sequentially numbered frame set in a private scratch directory, hands
//! that directory to an [`Encoder`], and verifies the produced video before
//! returning an [`Artifact`].
//!
//! The encoder is a capability trait so tests can substitute an in-process
//! double; [`FfmpegEncoder`] is the production implementation.

// Native `async fn` in traits; see `encoder.rs`.
#![allow(async_fn_in_trait)]

mod assembler;
mod encoder;
mod error;
mod frames;
mod lease;
mod settings;

pub use assembler::{Artifact, Assembler};
pub use encoder::{EncodeReport, EncodeRequest, Encoder, FfmpegEncoder};
pub use error::{AssemblyError, EncodeError};
pub use frames::{FrameSource, frame_file_name};
pub use growth_core::plant::MIN_TIMELAPSE_PHOTOS;
pub use lease::{PlantLease, PlantLeases};
pub use settings::EncoderSettings;
