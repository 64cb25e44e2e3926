//! At most one in-flight assembly per plant.

use std::{
  collections::HashSet,
  sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use uuid::Uuid;

/// The set of plants currently being assembled.
///
/// Cloning is cheap and clones share the same set.
#[derive(Debug, Clone, Default)]
pub struct PlantLeases {
  active: Arc<Mutex<HashSet<Uuid>>>,
}

impl PlantLeases {
  /// Claim `plant_id`, or `None` if another holder already has it.
  pub fn try_acquire(&self, plant_id: Uuid) -> Option<PlantLease> {
    if !lock(&self.active).insert(plant_id) {
      return None;
    }
    Some(PlantLease { plant_id, active: Arc::clone(&self.active) })
  }

  pub fn is_held(&self, plant_id: Uuid) -> bool {
    lock(&self.active).contains(&plant_id)
  }
}

/// Exclusive claim on one plant; released on drop.
#[derive(Debug)]
pub struct PlantLease {
  plant_id: Uuid,
  active:   Arc<Mutex<HashSet<Uuid>>>,
}

impl PlantLease {
  pub fn plant_id(&self) -> Uuid { self.plant_id }
}

impl Drop for PlantLease {
  fn drop(&mut self) {
    lock(&self.active).remove(&self.plant_id);
  }
}

// The set stays consistent even if a holder panicked mid-operation.
fn lock(set: &Mutex<HashSet<Uuid>>) -> MutexGuard<'_, HashSet<Uuid>> {
  set.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn second_claim_for_same_plant_is_refused() {
    let leases = PlantLeases::default();
    let id = Uuid::new_v4();

    let first = leases.try_acquire(id).unwrap();
    assert_eq!(first.plant_id(), id);
    assert!(leases.try_acquire(id).is_none());
    assert!(leases.is_held(id));

    drop(first);
    assert!(!leases.is_held(id));
    assert!(leases.try_acquire(id).is_some());
  }

  #[test]
  fn different_plants_are_independent() {
    let leases = PlantLeases::default();
    let _a = leases.try_acquire(Uuid::new_v4()).unwrap();
    let _b = leases.try_acquire(Uuid::new_v4()).unwrap();
  }

  #[test]
  fn clones_share_state() {
    let leases = PlantLeases::default();
    let other = leases.clone();
    let id = Uuid::new_v4();

    let _held = leases.try_acquire(id).unwrap();
    assert!(other.try_acquire(id).is_none());
  }
}
