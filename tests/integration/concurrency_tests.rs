//! Cross-thread consistency of published readings and pulse counts.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use twinfan::sensors::onewire::{fahrenheit_to_raw, raw_to_fahrenheit, Resolution, SimProbeBus};
use twinfan::sensors::tach::PulseCounter;
use twinfan::sensors::temperature::TemperatureAggregator;

#[test]
fn readers_never_see_a_torn_poll_cycle() {
    let set_a: Vec<i16> = [70.0, 85.5, 62.1].iter().map(|f| fahrenheit_to_raw(*f)).collect();
    let set_b: Vec<i16> = [90.0, 60.0, 61.0].iter().map(|f| fahrenheit_to_raw(*f)).collect();

    let bus = SimProbeBus::new();
    for (i, raw) in set_a.iter().enumerate() {
        bus.attach_ds18b20(i as u8 + 1, *raw);
    }
    bus.script(vec![set_a.clone(), set_b.clone()]);

    let mut aggregator = TemperatureAggregator::new(bus, Resolution::Bits12, 4);
    assert_eq!(aggregator.discover(), 3);
    let view = aggregator.view();
    let done = AtomicBool::new(false);

    thread::scope(|s| {
        s.spawn(|| {
            for _ in 0..20_000 {
                aggregator.poll();
            }
            done.store(true, Ordering::Release);
        });

        for _ in 0..2 {
            let view = view.clone();
            let done = &done;
            let (set_a, set_b) = (&set_a, &set_b);
            s.spawn(move || {
                while !done.load(Ordering::Acquire) {
                    let snap = view.snapshot();
                    if snap.cycle() == 0 {
                        continue;
                    }
                    let raw: Vec<i16> = (0..snap.probe_count()).map(|i| snap.raw(i) as i16).collect();
                    assert!(raw == *set_a || raw == *set_b, "mixed cycle: {raw:?}");

                    let hottest = (0..snap.probe_count())
                        .map(|i| snap.fahrenheit(i))
                        .fold(f32::MIN, f32::max);
                    assert_eq!(snap.max_fahrenheit(), hottest);
                }
            });
        }
    });

    let last = view.snapshot();
    assert_eq!(last.cycle(), 20_000);
    assert_eq!(last.max_fahrenheit(), raw_to_fahrenheit(f32::from(set_b[0])));
}

#[test]
fn no_edge_is_lost_between_isr_and_reader() {
    const EDGES: u32 = 200_000;
    let counter = Arc::new(PulseCounter::new());
    let done = AtomicBool::new(false);

    let counted = thread::scope(|s| {
        let isr = Arc::clone(&counter);
        let done = &done;
        s.spawn(move || {
            for _ in 0..EDGES {
                isr.record_edge();
            }
            done.store(true, Ordering::Release);
        });

        let mut total = 0u32;
        let mut now_us = 0u32;
        while !done.load(Ordering::Acquire) {
            now_us = now_us.wrapping_add(1_000);
            total += counter.read_and_reset(now_us).edges;
        }
        total + counter.read_and_reset(now_us.wrapping_add(1_000)).edges
    });

    assert_eq!(counted, EDGES);
}
