use std::collections::HashMap;

use crate::{
    types::Timestamp,
    world::car::{Car, CarId},
};

/// Outcome of a timestamp-guarded write.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ApplyOutcome {
    /// Timestamp was strictly newer; the mutation ran and `updated_at` advanced.
    Applied,
    /// Timestamp not newer than the stored one; mutation discarded. Not an error.
    Stale,
    /// No record under this id.
    Unknown,
}

/// Canonical mapping from car id to its replicated record.
///
/// An explicitly owned instance passed to every component, never process-wide
/// state. Removal marks a tombstone so that late-arriving stale references can
/// still be answered consistently.
#[derive(Debug, Default)]
pub struct EntityStore {
    cars: HashMap<CarId, Car>,
}

impl EntityStore {
    pub fn new() -> Self {
        EntityStore {
            cars: HashMap::new(),
        }
    }

    pub fn get(&self, id: &CarId) -> Option<&Car> {
        self.cars.get(id)
    }

    pub fn get_mut(&mut self, id: &CarId) -> Option<&mut Car> {
        self.cars.get_mut(id)
    }

    pub fn contains(&self, id: &CarId) -> bool {
        self.cars.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.cars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cars.is_empty()
    }

    /// Inserts or overwrites a full record, e.g. from a spawn snapshot.
    pub fn insert(&mut self, car: Car) {
        self.cars.insert(car.id().clone(), car);
    }

    /// Returns the record under `id`, synthesizing a placeholder if absent.
    pub fn ensure(&mut self, id: &CarId) -> &mut Car {
        self.cars
            .entry(id.clone())
            .or_insert_with(|| Car::placeholder(id.clone()))
    }

    /// Creates-or-mutates atomically: the patch runs against a synthesized
    /// placeholder when the record does not exist yet.
    pub fn upsert(&mut self, id: &CarId, patch: impl FnOnce(&mut Car)) {
        patch(self.ensure(id));
    }

    /// Applies `mutation` only if `timestamp` is strictly newer than the stored
    /// `updated_at`. All positional/derail-group writes go through here; stale
    /// updates are discarded, not merged.
    pub fn apply_if_newer(
        &mut self,
        id: &CarId,
        timestamp: Timestamp,
        mutation: impl FnOnce(&mut Car),
    ) -> ApplyOutcome {
        let Some(car) = self.cars.get_mut(id) else {
            return ApplyOutcome::Unknown;
        };
        if timestamp <= car.updated_at {
            return ApplyOutcome::Stale;
        }
        mutation(car);
        car.updated_at = timestamp;
        ApplyOutcome::Applied
    }

    /// Tombstones the record. Synthesizes one first if the removal arrived
    /// ahead of any other mention of the id.
    pub fn mark_removed(&mut self, id: &CarId) {
        self.ensure(id).is_removed = true;
    }

    /// Replaces the whole store with a snapshot, e.g. a host sync.
    pub fn replace_all(&mut self, cars: Vec<Car>) {
        self.cars.clear();
        for car in cars {
            self.insert(car);
        }
    }

    /// All records that have not been tombstoned.
    pub fn active(&self) -> impl Iterator<Item = &Car> {
        self.cars.values().filter(|car| !car.is_removed)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Car> {
        self.cars.values()
    }
}
