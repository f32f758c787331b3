// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Barrier-ordered dispatch within one tick.

use ember_reactor::{file_proc, EventLoop, Mask, ProcessFlags};
use std::io::Write;
use std::os::fd::AsRawFd;
use std::os::unix::net::UnixStream;

#[derive(Default)]
struct Ctx {
    order: Vec<&'static str>,
}

/// A socket that is simultaneously readable (peer wrote) and writable
/// (send buffer empty).
fn both_ready() -> (UnixStream, UnixStream) {
    let (a, mut b) = UnixStream::pair().unwrap();
    b.write_all(b"!").unwrap();
    (a, b)
}

#[test]
fn barrier_flushes_writes_before_reading_more() {
    let mut el: EventLoop<Ctx> = EventLoop::new(1024).unwrap();
    let (a, _b) = both_ready();
    let fd = a.as_raw_fd();

    el.add_file(
        fd,
        Mask::READABLE,
        file_proc(|_el, ctx: &mut Ctx, _fd, _mask| ctx.order.push("read")),
    )
    .unwrap();
    el.add_file(
        fd,
        Mask::WRITABLE | Mask::BARRIER,
        file_proc(|_el, ctx: &mut Ctx, _fd, _mask| ctx.order.push("write")),
    )
    .unwrap();

    let mut ctx = Ctx::default();
    el.process(&mut ctx, ProcessFlags::FILE_EVENTS | ProcessFlags::DONT_WAIT);
    assert_eq!(ctx.order, ["write", "read"]);
}

#[test]
fn without_barrier_reads_come_first() {
    let mut el: EventLoop<Ctx> = EventLoop::new(1024).unwrap();
    let (a, _b) = both_ready();
    let fd = a.as_raw_fd();

    el.add_file(
        fd,
        Mask::READABLE,
        file_proc(|_el, ctx: &mut Ctx, _fd, _mask| ctx.order.push("read")),
    )
    .unwrap();
    el.add_file(
        fd,
        Mask::WRITABLE,
        file_proc(|_el, ctx: &mut Ctx, _fd, _mask| ctx.order.push("write")),
    )
    .unwrap();

    let mut ctx = Ctx::default();
    el.process(&mut ctx, ProcessFlags::FILE_EVENTS | ProcessFlags::DONT_WAIT);
    assert_eq!(ctx.order, ["read", "write"]);
}
