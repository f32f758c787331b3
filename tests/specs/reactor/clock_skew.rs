// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Timer recovery when the wall clock jumps backwards.

use ember_core::FakeClock;
use ember_reactor::{time_proc, EventLoop, ProcessFlags};
use std::time::Duration;

#[derive(Default)]
struct Ctx {
    fired: usize,
}

#[test]
fn backwards_jump_fires_rather_than_delays() {
    let clock = FakeClock::new();
    let mut el: EventLoop<Ctx, FakeClock> = EventLoop::with_clock(64, clock.clone()).unwrap();
    let mut ctx = Ctx::default();

    // Anchor the loop's notion of "now", then schedule 10s out.
    el.process(&mut ctx, ProcessFlags::TIME_EVENTS | ProcessFlags::DONT_WAIT);
    el.create_time(
        10_000,
        time_proc(|_el, ctx: &mut Ctx, _id| {
            ctx.fired += 1;
            None
        }),
        None,
    );

    // A 30s backwards jump would naively delay the event by 40s. The loop
    // must fire it on the next tick instead.
    clock.rewind(Duration::from_secs(30));
    el.process(&mut ctx, ProcessFlags::TIME_EVENTS | ProcessFlags::DONT_WAIT);
    assert_eq!(ctx.fired, 1);
}

#[test]
fn steady_clock_keeps_the_deadline() {
    let clock = FakeClock::new();
    let mut el: EventLoop<Ctx, FakeClock> = EventLoop::with_clock(64, clock.clone()).unwrap();
    let mut ctx = Ctx::default();

    el.create_time(
        10_000,
        time_proc(|_el, ctx: &mut Ctx, _id| {
            ctx.fired += 1;
            None
        }),
        None,
    );
    el.process(&mut ctx, ProcessFlags::TIME_EVENTS | ProcessFlags::DONT_WAIT);
    assert_eq!(ctx.fired, 0);

    clock.advance(Duration::from_secs(10));
    el.process(&mut ctx, ProcessFlags::TIME_EVENTS | ProcessFlags::DONT_WAIT);
    assert_eq!(ctx.fired, 1);
}
