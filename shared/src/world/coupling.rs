use log::{debug, info};

use crate::world::{
    car::{CarEnd, CarId},
    store::EntityStore,
};

/// Keeps the two endpoint records of a coupling, hose or MU relation mutually
/// consistent. Every write is two-sided; a record that does not exist yet is
/// synthesized so the relation is never half-lost to message reordering.
///
/// Writes a coupling fact on both cars' given ends. `coupled == false` clears
/// both ends.
pub fn set_coupled(
    store: &mut EntityStore,
    car_a: &CarId,
    a_end: CarEnd,
    car_b: &CarId,
    b_end: CarEnd,
    coupled: bool,
) {
    store.upsert(car_a, |car| {
        car.coupler_mut(a_end).coupled_to = coupled.then(|| car_b.clone());
    });
    store.upsert(car_b, |car| {
        car.coupler_mut(b_end).coupled_to = coupled.then(|| car_a.clone());
    });
}

/// Writes a hose connection on both cars' given ends, independently of the
/// coupling link itself.
pub fn set_hose(
    store: &mut EntityStore,
    car_a: &CarId,
    a_end: CarEnd,
    car_b: &CarId,
    b_end: CarEnd,
    connected: bool,
) {
    store.upsert(car_a, |car| {
        car.coupler_mut(a_end).hose_connected_to = connected.then(|| car_b.clone());
    });
    store.upsert(car_b, |car| {
        car.coupler_mut(b_end).hose_connected_to = connected.then(|| car_a.clone());
    });
}

/// The cock is a per-coupler valve; unlike couplings and hoses it has no
/// counterpart record.
pub fn set_cock(store: &mut EntityStore, car: &CarId, end: CarEnd, open: bool) {
    store.upsert(car, |car| {
        car.coupler_mut(end).cock_open = open;
    });
}

/// Writes an MU link on both endpoints. Cars whose kind does not carry MU
/// cabling are left untouched; a placeholder heals on the next full sync.
pub fn set_mu_link(
    store: &mut EntityStore,
    car_a: &CarId,
    a_end: CarEnd,
    car_b: &CarId,
    b_end: CarEnd,
    connected: bool,
) {
    store.upsert(car_a, |car| {
        if car.kind.supports_multiple_unit() {
            car.multiple_unit.set_link(a_end, connected.then(|| car_b.clone()));
        }
    });
    store.upsert(car_b, |car| {
        if car.kind.supports_multiple_unit() {
            car.multiple_unit.set_link(b_end, connected.then(|| car_a.clone()));
        }
    });
}

/// A physical-world call needed to bring a freshly materialized car up to the
/// stored relation state. Executed by the client against its physics boundary.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum ResyncAction {
    Couple {
        end: CarEnd,
        to: CarId,
        to_end: CarEnd,
    },
    ConnectHose {
        end: CarEnd,
        to: CarId,
        to_end: CarEnd,
    },
    OpenCock {
        end: CarEnd,
    },
    LinkMultipleUnit {
        end: CarEnd,
        to: CarId,
        to_end: CarEnd,
    },
}

/// Walks the stored coupling/hose/cock/MU fields of `id` and lists the
/// physical calls needed to reach that state.
///
/// An absent or inconsistent counterpart is logged and skipped, never fatal:
/// partial relation state is "not yet resolved" and re-attempted on the next
/// materialization. The mechanical coupling is attempted whenever the coupling
/// fact is stored, regardless of hose/cock sub-state, since those are secondary
/// attributes of an already-decided coupling.
pub fn resync_plan(store: &EntityStore, id: &CarId) -> Vec<ResyncAction> {
    let mut plan = Vec::new();
    let Some(car) = store.get(id) else {
        return plan;
    };

    for end in [CarEnd::Front, CarEnd::Rear] {
        let coupler = car.coupler(end);

        if let Some(other_id) = &coupler.coupled_to {
            match counterpart_end(store, other_id, id, |c, e| c.coupler(e).coupled_to.as_ref()) {
                Some(to_end) => {
                    let hose_consistent = coupler.hose_connected_to.as_ref() == Some(other_id)
                        && coupler.cock_open;
                    if !hose_consistent {
                        debug!(
                            "{id} {end}: coupled to {other_id} with inconsistent hose/cock state, coupling anyway"
                        );
                    }
                    plan.push(ResyncAction::Couple {
                        end,
                        to: other_id.clone(),
                        to_end,
                    });
                }
                None => info!(
                    "{id} {end}: counterpart coupling record of {other_id} missing or pending, skipping"
                ),
            }
        }

        if coupler.cock_open {
            plan.push(ResyncAction::OpenCock { end });
        }

        if let Some(other_id) = &coupler.hose_connected_to {
            match counterpart_end(store, other_id, id, |c, e| {
                c.coupler(e).hose_connected_to.as_ref()
            }) {
                Some(to_end) => plan.push(ResyncAction::ConnectHose {
                    end,
                    to: other_id.clone(),
                    to_end,
                }),
                None => info!(
                    "{id} {end}: counterpart hose record of {other_id} missing or pending, skipping"
                ),
            }
        }
    }

    if car.kind.supports_multiple_unit() {
        for end in [CarEnd::Front, CarEnd::Rear] {
            if let Some(other_id) = car.multiple_unit.link(end) {
                match counterpart_end(store, other_id, id, |c, e| c.multiple_unit.link(e)) {
                    Some(to_end) => plan.push(ResyncAction::LinkMultipleUnit {
                        end,
                        to: other_id.clone(),
                        to_end,
                    }),
                    None => info!(
                        "{id} {end}: counterpart MU record of {other_id} missing or pending, skipping"
                    ),
                }
            }
        }
    }

    plan
}

/// Finds which end of `other` points back at `id` through the given relation
/// accessor, front end first.
fn counterpart_end<'a>(
    store: &'a EntityStore,
    other: &CarId,
    id: &CarId,
    relation: impl Fn(&'a crate::world::car::Car, CarEnd) -> Option<&'a CarId>,
) -> Option<CarEnd> {
    let other_car = store.get(other)?;
    [CarEnd::Front, CarEnd::Rear]
        .into_iter()
        .find(|end| relation(other_car, *end) == Some(id))
}
