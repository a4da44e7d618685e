use std::collections::HashSet;

use crate::world::{
    car::{CarEnd, CarId},
    controls::{apply_lever, Lever},
    store::EntityStore,
};

/// Applies a control input to a car and, for cascading levers on
/// multiple-unit-capable kinds, to every car transitively reachable over MU
/// links. Returns the ids the input was applied to, in visit order.
///
/// A visited set guards the walk, so a malformed link graph that loops back to
/// an ancestor terminates instead of recursing forever.
pub fn cascade_lever(
    store: &mut EntityStore,
    id: &CarId,
    lever: Lever,
    value: f32,
) -> Vec<CarId> {
    let mut applied = Vec::new();

    let Some(origin) = store.get(id) else {
        return applied;
    };

    if !lever.cascades() || !origin.kind.supports_multiple_unit() {
        if let Some(car) = store.get_mut(id) {
            apply_lever(car, lever, value);
            applied.push(id.clone());
        }
        return applied;
    }

    let mut visited: HashSet<CarId> = HashSet::new();
    let mut frontier = vec![id.clone()];

    while let Some(current) = frontier.pop() {
        if !visited.insert(current.clone()) {
            continue;
        }
        let Some(car) = store.get_mut(&current) else {
            continue;
        };
        apply_lever(car, lever, value);
        applied.push(current.clone());

        for end in [CarEnd::Front, CarEnd::Rear] {
            if let Some(next) = car.multiple_unit.link(end) {
                if !visited.contains(next) {
                    frontier.push(next.clone());
                }
            }
        }
    }

    applied
}
