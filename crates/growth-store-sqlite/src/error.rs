//! Error type for `growth-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] growth_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("stored timestamp out of range: {0} ms")]
  Timestamp(i64),

  #[error("stored count out of range: {0}")]
  Count(i64),

  #[error("plant not found: {0}")]
  PlantNotFound(uuid::Uuid),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
