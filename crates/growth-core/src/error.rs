//! Error types for `growth-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("plant name must not be blank")]
  BlankName,

  #[error("photo path must not be empty")]
  EmptyPhotoPath,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
