use std::time::{Duration, Instant};

use railsync_server::{Server, ServerConfig};
use railsync_shared::{
    Car, CarId, CarKind, ClientId, MemoryTransport, Message, TransportEvent,
};

fn connect(server: &mut Server, io: &mut MemoryTransport, now: Instant, n: u64, rtt: Duration) -> ClientId {
    let client = ClientId::new(n);
    io.connect(client, rtt);
    server
        .process(now, TransportEvent::Connected(client), io)
        .unwrap();
    client
}

fn spawn(cars: &[&str]) -> Message {
    Message::EntitiesInit {
        cars: cars
            .iter()
            .map(|name| Car::new(CarId::new(*name), CarKind::Freight))
            .collect(),
    }
}

fn ack() -> Message {
    Message::EntitiesInitFinished
}

fn resumes(io: &MemoryTransport, to: ClientId) -> usize {
    io.sent_to(to)
        .iter()
        .filter(|s| s.message == Message::EntitiesInitFinished)
        .count()
}

fn init_snapshots(io: &MemoryTransport, to: ClientId) -> usize {
    io.sent_to(to)
        .iter()
        .filter(|s| matches!(s.message, Message::EntitiesInit { .. }))
        .count()
}

#[test]
fn barrier_completes_only_after_every_client_acks() {
    let now = Instant::now();
    let mut io = MemoryTransport::new();
    let mut server = Server::new(ServerConfig::default());
    let c1 = connect(&mut server, &mut io, now, 1, Duration::ZERO);
    let c2 = connect(&mut server, &mut io, now, 2, Duration::ZERO);
    let c3 = connect(&mut server, &mut io, now, 3, Duration::ZERO);

    server
        .process(now, TransportEvent::Message { from: c1, message: spawn(&["X"]) }, &mut io)
        .unwrap();

    assert!(server.is_barrier_loading());
    assert_eq!(init_snapshots(&io, c2), 1);
    assert_eq!(init_snapshots(&io, c3), 1);
    assert_eq!(init_snapshots(&io, c1), 0, "introducer already has the cars");

    server
        .process(now, TransportEvent::Message { from: c2, message: ack() }, &mut io)
        .unwrap();
    assert!(server.is_barrier_loading(), "one ack still missing");

    server
        .process(now, TransportEvent::Message { from: c3, message: ack() }, &mut io)
        .unwrap();
    assert!(!server.is_barrier_loading());

    server.advance(now, &mut io);
    for client in [c1, c2, c3] {
        assert_eq!(resumes(&io, client), 1);
    }
    assert!(server.store().contains(&CarId::new("X")));
}

#[test]
fn straggler_disconnect_releases_the_barrier() {
    let now = Instant::now();
    let mut io = MemoryTransport::new();
    let mut server = Server::new(ServerConfig::default());
    let c1 = connect(&mut server, &mut io, now, 1, Duration::ZERO);
    let c2 = connect(&mut server, &mut io, now, 2, Duration::ZERO);
    let c3 = connect(&mut server, &mut io, now, 3, Duration::ZERO);

    server
        .process(now, TransportEvent::Message { from: c1, message: spawn(&["X"]) }, &mut io)
        .unwrap();
    server
        .process(now, TransportEvent::Message { from: c2, message: ack() }, &mut io)
        .unwrap();
    assert!(server.is_barrier_loading());

    io.disconnect(c3);
    server
        .process(now, TransportEvent::Disconnected(c3), &mut io)
        .unwrap();

    assert!(!server.is_barrier_loading(), "absent client cannot block");
    server.advance(now, &mut io);
    assert_eq!(resumes(&io, c1), 1);
    assert_eq!(resumes(&io, c2), 1);
    assert_eq!(resumes(&io, c3), 0);
}

#[test]
fn client_connecting_mid_barrier_is_exempt() {
    let now = Instant::now();
    let mut io = MemoryTransport::new();
    let mut server = Server::new(ServerConfig::default());
    let c1 = connect(&mut server, &mut io, now, 1, Duration::ZERO);
    let c2 = connect(&mut server, &mut io, now, 2, Duration::ZERO);

    server
        .process(now, TransportEvent::Message { from: c1, message: spawn(&["X"]) }, &mut io)
        .unwrap();

    // Joins while loading; picks the cars up in its own full sync instead.
    let c3 = connect(&mut server, &mut io, now, 3, Duration::ZERO);

    server
        .process(now, TransportEvent::Message { from: c2, message: ack() }, &mut io)
        .unwrap();
    assert!(!server.is_barrier_loading(), "late joiner must not block");

    server.advance(now, &mut io);
    assert_eq!(resumes(&io, c3), 1, "resume still reaches the late joiner");
}

#[test]
fn resume_notices_are_sequenced_by_latency_gap() {
    let now = Instant::now();
    let mut io = MemoryTransport::new();
    let mut server = Server::new(ServerConfig::default());
    let c1 = connect(&mut server, &mut io, now, 1, Duration::ZERO);
    let c2 = connect(&mut server, &mut io, now, 2, Duration::from_millis(80));

    server
        .process(now, TransportEvent::Message { from: c1, message: spawn(&["X"]) }, &mut io)
        .unwrap();
    server
        .process(now, TransportEvent::Message { from: c2, message: ack() }, &mut io)
        .unwrap();

    server.advance(now, &mut io);
    assert_eq!(resumes(&io, c1), 1, "lowest half-RTT resumes first");
    assert_eq!(resumes(&io, c2), 0);

    server.advance(now + Duration::from_millis(40), &mut io);
    assert_eq!(resumes(&io, c2), 1, "held back by its gap to the fastest");
}

#[test]
fn second_spawn_queues_until_the_resume_sequence_completes() {
    let now = Instant::now();
    let mut io = MemoryTransport::new();
    let mut server = Server::new(ServerConfig::default());
    let c1 = connect(&mut server, &mut io, now, 1, Duration::ZERO);
    let c2 = connect(&mut server, &mut io, now, 2, Duration::from_millis(40));

    server
        .process(now, TransportEvent::Message { from: c1, message: spawn(&["A"]) }, &mut io)
        .unwrap();
    server
        .process(now, TransportEvent::Message { from: c1, message: spawn(&["B"]) }, &mut io)
        .unwrap();
    assert_eq!(init_snapshots(&io, c2), 1, "second spawn is queued, not sent");

    server
        .process(now, TransportEvent::Message { from: c2, message: ack() }, &mut io)
        .unwrap();
    assert!(!server.is_barrier_loading());

    // The fastest client's resume notice carries the completion hook.
    server.advance(now, &mut io);
    assert!(server.is_barrier_loading(), "queued barrier started");
    assert_eq!(init_snapshots(&io, c2), 2);
}

#[test]
fn fastest_client_disconnect_still_releases_the_queued_barrier() {
    let now = Instant::now();
    let mut io = MemoryTransport::new();
    let mut server = Server::new(ServerConfig::default());
    let c1 = connect(&mut server, &mut io, now, 1, Duration::ZERO);
    let c2 = connect(&mut server, &mut io, now, 2, Duration::from_millis(40));
    let c3 = connect(&mut server, &mut io, now, 3, Duration::from_millis(80));

    server
        .process(now, TransportEvent::Message { from: c2, message: spawn(&["A"]) }, &mut io)
        .unwrap();
    server
        .process(now, TransportEvent::Message { from: c2, message: spawn(&["B"]) }, &mut io)
        .unwrap();
    server
        .process(now, TransportEvent::Message { from: c1, message: ack() }, &mut io)
        .unwrap();
    server
        .process(now, TransportEvent::Message { from: c3, message: ack() }, &mut io)
        .unwrap();
    assert!(!server.is_barrier_loading(), "first barrier satisfied");
    assert_eq!(init_snapshots(&io, c3), 1, "second spawn still queued");

    // c1's resume notice was the carrier of the completion hook; losing the
    // client must not strand the queued spawn.
    io.disconnect(c1);
    server
        .process(now, TransportEvent::Disconnected(c1), &mut io)
        .unwrap();

    assert!(server.is_barrier_loading(), "queued barrier started anyway");
    assert_eq!(init_snapshots(&io, c3), 2);

    server.advance(now + Duration::from_secs(60), &mut io);
    assert_eq!(resumes(&io, c2), 1, "first barrier's resume still delivered");
    assert_eq!(resumes(&io, c3), 1);
}

#[test]
fn configured_timeout_force_completes_a_stalled_barrier() {
    let now = Instant::now();
    let timeout = Duration::from_secs(5);
    let mut io = MemoryTransport::new();
    let mut server = Server::new(ServerConfig {
        barrier_timeout: Some(timeout),
    });
    let c1 = connect(&mut server, &mut io, now, 1, Duration::ZERO);
    let c2 = connect(&mut server, &mut io, now, 2, Duration::ZERO);

    server
        .process(now, TransportEvent::Message { from: c1, message: spawn(&["X"]) }, &mut io)
        .unwrap();
    assert!(server.is_barrier_loading());

    server.advance(now + timeout - Duration::from_millis(1), &mut io);
    assert!(server.is_barrier_loading(), "still within the allowance");

    server.advance(now + timeout, &mut io);
    assert!(!server.is_barrier_loading());
    server.advance(now + timeout, &mut io);
    assert_eq!(resumes(&io, c1), 1);
    assert_eq!(resumes(&io, c2), 1, "straggler is logged, not excluded");
}
