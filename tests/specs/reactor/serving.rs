// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The wiring an embedding server uses: protocol bytes arrive through a
//! file event, mutate the keyspace, and the maintenance cron runs on the
//! same loop.

use ember_core::FakeClock;
use ember_engine::{install_cron, EngineConfig, Object, Server};
use ember_reactor::{file_proc, EventLoop, Mask, ProcessFlags};
use std::io::{Read, Write};
use std::os::fd::AsRawFd;
use std::os::unix::net::UnixStream;
use std::time::Duration;

#[test]
fn file_events_drive_keyspace_writes() {
    let clock = FakeClock::new();
    let mut server = Server::with_clock(EngineConfig::default(), clock.clone()).unwrap();
    let mut el: EventLoop<Server<FakeClock>, FakeClock> =
        EventLoop::with_clock(1024, clock.clone()).unwrap();

    let (mut client, conn) = UnixStream::pair().unwrap();
    conn.set_nonblocking(true).unwrap();
    let fd = conn.as_raw_fd();
    // Tiny SET handler: each received byte becomes a one-byte key.
    el.add_file(
        fd,
        Mask::READABLE,
        file_proc(move |_el, server: &mut Server<FakeClock>, _fd, _mask| {
            let mut buf = [0u8; 64];
            if let Ok(n) = (&conn).read(&mut buf) {
                for byte in &buf[..n] {
                    server.set(vec![*byte], Object::Uint(u64::from(*byte)));
                }
            }
        }),
    )
    .unwrap();

    client.write_all(b"abc").unwrap();
    el.process(&mut server, ProcessFlags::FILE_EVENTS | ProcessFlags::DONT_WAIT);

    assert_eq!(server.db().len(), 3);
    assert_eq!(server.lookup(b"a").as_deref(), Some(&Object::Uint(97)));
    el.remove_file(fd, Mask::READABLE).unwrap();
}

#[test]
fn cron_and_file_events_share_one_loop() {
    let clock = FakeClock::new();
    let mut server = Server::with_clock(EngineConfig::default(), clock.clone()).unwrap();
    let mut el: EventLoop<Server<FakeClock>, FakeClock> =
        EventLoop::with_clock(1024, clock.clone()).unwrap();
    install_cron(&mut el);

    server.set(b"ephemeral".to_vec(), Object::Int(1));
    server.expire_in(b"ephemeral", 150);

    let mut reclaimed = false;
    for _ in 0..50 {
        el.process(&mut server, ProcessFlags::ALL | ProcessFlags::DONT_WAIT);
        clock.advance(Duration::from_millis(100));
        if !server.db().contains(b"ephemeral") {
            reclaimed = true;
            break;
        }
    }
    assert!(reclaimed, "the shared loop never expired the key");
}
