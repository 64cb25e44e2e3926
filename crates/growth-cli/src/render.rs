//! Plain-text rendering of API responses.

use std::fmt::Write as _;

use growth_core::{photo::PlantPhoto, plant::Plant};

use crate::client::PlantDetails;

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

pub fn plant_table(plants: &[Plant]) -> String {
  if plants.is_empty() {
    return "no plants yet\n".to_owned();
  }
  let name_width = plants
    .iter()
    .map(|p| p.name.chars().count())
    .max()
    .unwrap_or(0)
    .max("NAME".len());

  let mut out = format!("{:<36}  {:<name_width$}  {:<16}  SPECIES\n", "ID", "NAME", "STARTED");
  for p in plants {
    let _ = writeln!(
      out,
      "{:<36}  {:<name_width$}  {:<16}  {}",
      p.plant_id,
      p.name,
      p.started_at.format(DATE_FORMAT),
      p.species.as_deref().unwrap_or("-"),
    );
  }
  out
}

pub fn plant_details(details: &PlantDetails) -> String {
  let p = &details.plant;
  let mut out = String::new();
  let _ = writeln!(out, "{}", p.name);
  let _ = writeln!(out, "  id:           {}", p.plant_id);
  let _ = writeln!(out, "  species:      {}", p.species.as_deref().unwrap_or("-"));
  let _ = writeln!(out, "  started:      {}", p.started_at.format(DATE_FORMAT));
  let _ = writeln!(out, "  days growing: {}", details.days_growing);
  let _ = writeln!(out, "  photos:       {}", details.photo_count);
  if let Some(cover) = &p.cover_path {
    let _ = writeln!(out, "  cover:        {cover}");
  }
  let timelapse = if details.timelapse_in_progress {
    "being assembled"
  } else if details.timelapse_ready {
    "ready to build"
  } else {
    "needs more photos"
  };
  let _ = writeln!(out, "  time-lapse:   {timelapse}");
  out
}

pub fn photo_list(photos: &[PlantPhoto]) -> String {
  if photos.is_empty() {
    return "no photos yet\n".to_owned();
  }
  let mut out = String::new();
  for photo in photos {
    let _ = write!(out, "{}  {}", photo.taken_at.format(DATE_FORMAT), photo.path);
    if let Some(notes) = &photo.notes {
      let _ = write!(out, "  # {notes}");
    }
    out.push('\n');
  }
  out
}
