//! SQL schema for the Growth SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS plants (
    plant_id    TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    species     TEXT,
    started_at  INTEGER NOT NULL,   -- epoch milliseconds, UTC
    cover_path  TEXT
);

-- Photo records are never updated. There is no ON DELETE CASCADE: the store
-- removes a plant's photos explicitly before removing the plant.
CREATE TABLE IF NOT EXISTS plant_photos (
    photo_id    TEXT PRIMARY KEY,
    plant_id    TEXT NOT NULL REFERENCES plants(plant_id),
    taken_at    INTEGER NOT NULL,   -- epoch milliseconds, UTC
    photo_path  TEXT NOT NULL,
    notes       TEXT
);

CREATE INDEX IF NOT EXISTS photos_plant_taken_idx
    ON plant_photos(plant_id, taken_at);

PRAGMA user_version = 1;
";
