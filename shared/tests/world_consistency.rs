use railsync_shared::{
    cascade_lever, resync_plan, set_cock, set_coupled, set_hose, set_mu_link, ApplyOutcome, Car,
    CarEnd, CarId, CarKind, EntityStore, Lever, ResyncAction, Vec3,
};

fn id(name: &str) -> CarId {
    CarId::new(name)
}

fn store_with(cars: &[(&str, CarKind)]) -> EntityStore {
    let mut store = EntityStore::new();
    for (name, kind) in cars {
        store.insert(Car::new(id(name), *kind));
    }
    store
}

#[test]
fn newer_timestamp_wins_regardless_of_arrival_order() {
    let mut store = store_with(&[("T1", CarKind::Diesel)]);

    let newer = store.apply_if_newer(&id("T1"), 100, |car| {
        car.position = Vec3::new(0.0, 0.0, 0.0);
    });
    let stale = store.apply_if_newer(&id("T1"), 90, |car| {
        car.position = Vec3::new(5.0, 5.0, 5.0);
    });

    assert_eq!(newer, ApplyOutcome::Applied);
    assert_eq!(stale, ApplyOutcome::Stale);
    let car = store.get(&id("T1")).unwrap();
    assert_eq!(car.position, Vec3::new(0.0, 0.0, 0.0));
    assert_eq!(car.updated_at, 100);
}

#[test]
fn reapplying_the_same_update_changes_nothing() {
    let mut store = store_with(&[("T1", CarKind::Freight)]);

    store.apply_if_newer(&id("T1"), 50, |car| {
        car.position = Vec3::new(1.0, 2.0, 3.0);
    });
    let once = store.get(&id("T1")).unwrap().clone();

    let again = store.apply_if_newer(&id("T1"), 50, |car| {
        car.position = Vec3::new(9.0, 9.0, 9.0);
    });

    assert_eq!(again, ApplyOutcome::Stale);
    assert_eq!(store.get(&id("T1")).unwrap(), &once);
}

#[test]
fn update_for_absent_record_reports_unknown() {
    let mut store = EntityStore::new();
    let outcome = store.apply_if_newer(&id("ghost"), 10, |car| {
        car.position = Vec3::new(1.0, 1.0, 1.0);
    });
    assert_eq!(outcome, ApplyOutcome::Unknown);
    assert!(store.is_empty());
}

#[test]
fn synthesized_placeholder_has_unknown_kind_until_full_sync() {
    let mut store = EntityStore::new();
    store.ensure(&id("early"));
    assert_eq!(store.get(&id("early")).unwrap().kind, CarKind::Unknown);

    // A full-record insert fills the kind in.
    store.insert(Car::new(id("early"), CarKind::Shunter));
    assert_eq!(store.get(&id("early")).unwrap().kind, CarKind::Shunter);
}

#[test]
fn removal_ahead_of_spawn_leaves_a_tombstone() {
    let mut store = EntityStore::new();
    store.mark_removed(&id("gone"));

    assert!(store.get(&id("gone")).unwrap().is_removed);
    assert_eq!(store.active().count(), 0);
}

#[test]
fn coupling_writes_both_ends_and_clears_both_ends() {
    let mut store = store_with(&[("A", CarKind::Freight), ("B", CarKind::Freight)]);

    set_coupled(&mut store, &id("A"), CarEnd::Front, &id("B"), CarEnd::Rear, true);
    assert_eq!(
        store.get(&id("A")).unwrap().coupler(CarEnd::Front).coupled_to,
        Some(id("B"))
    );
    assert_eq!(
        store.get(&id("B")).unwrap().coupler(CarEnd::Rear).coupled_to,
        Some(id("A"))
    );

    set_coupled(&mut store, &id("A"), CarEnd::Front, &id("B"), CarEnd::Rear, false);
    assert_eq!(store.get(&id("A")).unwrap().coupler(CarEnd::Front).coupled_to, None);
    assert_eq!(store.get(&id("B")).unwrap().coupler(CarEnd::Rear).coupled_to, None);
}

#[test]
fn coupling_synthesizes_a_missing_counterpart() {
    let mut store = store_with(&[("A", CarKind::Freight)]);

    set_coupled(&mut store, &id("A"), CarEnd::Rear, &id("B"), CarEnd::Front, true);

    let b = store.get(&id("B")).expect("counterpart synthesized");
    assert_eq!(b.kind, CarKind::Unknown);
    assert_eq!(b.coupler(CarEnd::Front).coupled_to, Some(id("A")));
}

#[test]
fn hose_and_cock_are_independent_of_the_coupling_link() {
    let mut store = store_with(&[("A", CarKind::Freight), ("B", CarKind::Freight)]);

    set_hose(&mut store, &id("A"), CarEnd::Front, &id("B"), CarEnd::Rear, true);
    set_cock(&mut store, &id("A"), CarEnd::Front, true);

    let a = store.get(&id("A")).unwrap();
    assert_eq!(a.coupler(CarEnd::Front).coupled_to, None, "hose does not couple");
    assert_eq!(a.coupler(CarEnd::Front).hose_connected_to, Some(id("B")));
    assert!(a.coupler(CarEnd::Front).cock_open);

    // The cock has no counterpart record.
    assert!(!store.get(&id("B")).unwrap().coupler(CarEnd::Rear).cock_open);
    assert_eq!(
        store.get(&id("B")).unwrap().coupler(CarEnd::Rear).hose_connected_to,
        Some(id("A"))
    );
}

#[test]
fn mu_links_skip_kinds_without_cabling() {
    let mut store = store_with(&[("loco", CarKind::Diesel), ("box", CarKind::Freight)]);

    set_mu_link(&mut store, &id("loco"), CarEnd::Rear, &id("box"), CarEnd::Front, true);

    assert_eq!(
        store.get(&id("loco")).unwrap().multiple_unit.link(CarEnd::Rear),
        Some(&id("box"))
    );
    assert_eq!(
        store.get(&id("box")).unwrap().multiple_unit.link(CarEnd::Front),
        None,
        "freight cars carry no MU cabling"
    );
}

fn mu_chain(store: &mut EntityStore, a: &str, b: &str) {
    set_mu_link(store, &id(a), CarEnd::Rear, &id(b), CarEnd::Front, true);
}

#[test]
fn throttle_cascades_across_a_three_car_chain() {
    let mut store = store_with(&[
        ("A", CarKind::Diesel),
        ("B", CarKind::Diesel),
        ("C", CarKind::Shunter),
    ]);
    mu_chain(&mut store, "A", "B");
    mu_chain(&mut store, "B", "C");

    let applied = cascade_lever(&mut store, &id("A"), Lever::Throttle, 0.75);

    assert_eq!(applied.len(), 3, "each car visited exactly once");
    for name in ["A", "B", "C"] {
        assert_eq!(store.get(&id(name)).unwrap().throttle, 0.75);
    }
}

#[test]
fn cascade_terminates_on_a_cyclic_link_graph() {
    let mut store = store_with(&[
        ("A", CarKind::Diesel),
        ("B", CarKind::Diesel),
        ("C", CarKind::Diesel),
    ]);
    mu_chain(&mut store, "A", "B");
    mu_chain(&mut store, "B", "C");
    // Malformed graph closing the loop back to A.
    mu_chain(&mut store, "C", "A");

    let applied = cascade_lever(&mut store, &id("B"), Lever::Brake, 1.0);

    assert_eq!(applied.len(), 3);
    for name in ["A", "B", "C"] {
        assert_eq!(store.get(&id(name)).unwrap().brake, 1.0);
    }
}

#[test]
fn non_cascading_lever_stays_local() {
    let mut store = store_with(&[("A", CarKind::Shunter), ("B", CarKind::Shunter)]);
    mu_chain(&mut store, "A", "B");

    let applied = cascade_lever(&mut store, &id("A"), Lever::MainFuse, 1.0);

    assert_eq!(applied, vec![id("A")]);
    assert!(store.get(&id("A")).unwrap().shunter.as_ref().unwrap().main_fuse_on);
    assert!(store.get(&id("B")).unwrap().shunter.is_none());
}

#[test]
fn resync_plan_covers_consistent_relations() {
    let mut store = store_with(&[("A", CarKind::Diesel), ("B", CarKind::Diesel)]);
    set_coupled(&mut store, &id("A"), CarEnd::Rear, &id("B"), CarEnd::Front, true);
    set_hose(&mut store, &id("A"), CarEnd::Rear, &id("B"), CarEnd::Front, true);
    set_cock(&mut store, &id("A"), CarEnd::Rear, true);
    set_mu_link(&mut store, &id("A"), CarEnd::Rear, &id("B"), CarEnd::Front, true);

    let plan = resync_plan(&store, &id("A"));

    assert!(plan.contains(&ResyncAction::Couple {
        end: CarEnd::Rear,
        to: id("B"),
        to_end: CarEnd::Front,
    }));
    assert!(plan.contains(&ResyncAction::OpenCock { end: CarEnd::Rear }));
    assert!(plan.contains(&ResyncAction::ConnectHose {
        end: CarEnd::Rear,
        to: id("B"),
        to_end: CarEnd::Front,
    }));
    assert!(plan.contains(&ResyncAction::LinkMultipleUnit {
        end: CarEnd::Rear,
        to: id("B"),
        to_end: CarEnd::Front,
    }));
}

#[test]
fn resync_plan_couples_despite_inconsistent_hose_substate() {
    // Coupled, but no hose and closed cock: still coupled mechanically.
    let mut store = store_with(&[("A", CarKind::Freight), ("B", CarKind::Freight)]);
    set_coupled(&mut store, &id("A"), CarEnd::Front, &id("B"), CarEnd::Rear, true);

    let plan = resync_plan(&store, &id("A"));

    assert_eq!(
        plan,
        vec![ResyncAction::Couple {
            end: CarEnd::Front,
            to: id("B"),
            to_end: CarEnd::Rear,
        }]
    );
}

#[test]
fn resync_plan_skips_relations_with_missing_counterparts() {
    let mut store = store_with(&[("A", CarKind::Freight)]);
    // One-sided fact: B was never synthesized on this replica.
    store.upsert(&id("A"), |car| {
        car.coupler_mut(CarEnd::Front).coupled_to = Some(id("B"));
    });
    assert!(store.get(&id("B")).is_none());

    let plan = resync_plan(&store, &id("A"));
    assert!(plan.is_empty(), "absent counterpart is skipped, not fatal");
}
