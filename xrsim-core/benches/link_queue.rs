use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use xrsim_core::{
    Bandwidth, Channel, ManualScheduler, OutboundLinkQueue, PacketFactory, PacketIdGenerator,
    PolicyConfig, SimChannel, SimTime, SourceConfig, SourceTimer, TrafficClass, TrafficSource,
    source_rng,
};
use std::time::Duration;

const BD_54MBPS: Bandwidth = Bandwidth::new(54_000_000);
const PACKET_SIZE: u64 = 1_542;

fn admit_on_free_channel(c: &mut Criterion) {
    let factory = PacketFactory::new(PacketIdGenerator::new(), TrafficClass::Background);
    let mut channel = SimChannel::new(BD_54MBPS, Duration::ZERO);
    let mut queue = OutboundLinkQueue::new(BD_54MBPS);
    let mut now = SimTime::ZERO;

    c.bench_function("admit_free_channel", |b| {
        b.iter(|| {
            now = channel.finish_time();
            let packet = factory.make(PACKET_SIZE, now);
            black_box(queue.admit(packet, &mut channel, now));
            channel.take_deliveries();
        })
    });
}

fn admit_then_drain(c: &mut Criterion) {
    let factory = PacketFactory::new(PacketIdGenerator::new(), TrafficClass::Xr);
    let mut group = c.benchmark_group("admit_then_drain");

    for depth in [1usize, 16, 256] {
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, &depth| {
            let mut channel = SimChannel::new(BD_54MBPS, Duration::ZERO);
            let mut queue = OutboundLinkQueue::new(BD_54MBPS);

            b.iter(|| {
                // occupy the channel so every admission is deferred
                let start = channel.finish_time();
                channel.transmit(factory.make(PACKET_SIZE, start), start);
                for _ in 0..depth {
                    black_box(queue.admit(factory.make(PACKET_SIZE, start), &mut channel, start));
                }
                while !queue.is_empty() {
                    let now = channel.finish_time();
                    black_box(queue.drain(&mut channel, now));
                }
                channel.take_deliveries();
            })
        });
    }

    group.finish();
}

fn burst_source(c: &mut Criterion) {
    let config = SourceConfig {
        name: "xr".to_owned(),
        class: TrafficClass::Xr,
        policy: PolicyConfig::FrameBurst {
            frame_rate: 60.0,
            data_rate: Bandwidth::new(30_000_000),
        },
        datarate: BD_54MBPS,
        latency: Duration::ZERO,
    };

    c.bench_function("burst_source_one_second", |b| {
        b.iter(|| {
            let mut source =
                TrafficSource::with_sim_channel(&config, PacketIdGenerator::new(), source_rng(0, 0))
                    .expect("valid benchmark configuration");
            let mut scheduler = ManualScheduler::<SourceTimer>::new();
            source.initialize(&mut scheduler);
            while let Some(timer) = scheduler.advance_until(SimTime::from_secs_f64(1.0)) {
                source.handle(timer, &mut scheduler);
            }
            black_box(source.stats())
        })
    });
}

criterion_group!(benches, admit_on_free_channel, admit_then_drain, burst_source);
criterion_main!(benches);
