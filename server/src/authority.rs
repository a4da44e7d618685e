use std::time::{Duration, Instant};

use log::{debug, trace, warn};

use railsync_shared::{
    AuthorityChange, EntityStore, Message, Reliability, TimeQueue, Transport,
};

use crate::{
    schedule::{Scheduled, ScheduledSend, SendKind},
    users::{half_rtt, UserRegistry},
};

/// Arbitrates which client may mutate each physically-simulated car.
///
/// The committed owner is replaced atomically in the store the moment a
/// transfer is processed; there is never an instant with two recognized
/// owners. Only the *notification* to the requesting client is delayed, to
/// equalize when both sides perceive the change: a low-latency new owner must
/// not start mutating before a high-latency old owner has heard it should
/// stop.
#[derive(Debug, Default)]
pub struct AuthorityManager;

impl AuthorityManager {
    pub fn new() -> Self {
        AuthorityManager
    }

    pub(crate) fn execute_transfer(
        &mut self,
        change: &AuthorityChange,
        store: &mut EntityStore,
        users: &UserRegistry,
        io: &mut dyn Transport,
        scheduler: &mut TimeQueue<Scheduled>,
        now: Instant,
    ) {
        // Commit first: one atomic owner replacement per car. Unknown ids get
        // a placeholder, so a transfer racing ahead of its spawn still lands.
        let mut releasers: Vec<_> = Vec::new();
        for car_id in &change.cars {
            let car = store.ensure(car_id);
            let old_owner = car.authority_owner;
            car.authority_owner = change.new_owner;
            if old_owner != change.new_owner
                && users.contains(old_owner)
                && !releasers.contains(&old_owner)
            {
                releasers.push(old_owner);
            }
        }

        let notice = Message::AuthChange(change.clone());

        // Releasing owners hear it with zero delay. A failed send is logged
        // per target; one closed connection must not starve the rest of the
        // fan-out, and the owner is already committed either way.
        for releaser in &releasers {
            if let Err(err) = io.send(*releaser, &notice, Reliability::Reliable) {
                warn!("failed to notify releaser {releaser}: {err}");
            }
        }

        // The requester's notice is held back by the latency gap to the
        // slowest releasing owner. No releaser (unowned car, or owner already
        // gone) means no window to equalize: deliver immediately.
        if users.contains(change.new_owner) {
            let slowest = releasers
                .iter()
                .map(|c| half_rtt(io, *c))
                .max()
                .unwrap_or(Duration::ZERO);
            let delay = slowest
                .checked_sub(half_rtt(io, change.new_owner))
                .unwrap_or(Duration::ZERO);

            if delay.is_zero() {
                if let Err(err) = io.send(change.new_owner, &notice, Reliability::Reliable) {
                    warn!("failed to notify new owner {}: {err}", change.new_owner);
                }
            } else {
                debug!(
                    "holding authority notice to {} for {:?} ({} car(s))",
                    change.new_owner,
                    delay,
                    change.cars.len()
                );
                scheduler.schedule(
                    now,
                    delay,
                    Scheduled::Send(ScheduledSend {
                        to: change.new_owner,
                        message: notice.clone(),
                        reliability: Reliability::Reliable,
                        kind: SendKind::AuthorityNotice {
                            releasers: releasers.clone(),
                        },
                    }),
                );
            }
        }

        // Everyone else just observes the new owner.
        for bystander in users.iter() {
            if bystander != change.new_owner && !releasers.contains(&bystander) {
                if let Err(err) = io.send(bystander, &notice, Reliability::Reliable) {
                    warn!("failed to notify {bystander}: {err}");
                }
            }
        }

        trace!("> AUTH_CHANGE to {}", change.new_owner);
    }
}
