use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use gsv_core::acquisition::{ChannelBufferSet, ObjectSelector};
use gsv_core::config::constants::protocol::{DATATYP_FLOAT, DATATYP_INT16, DATATYP_INT24};
use gsv_core::hal::frame_decoder::decode_frame;
use gsv_core::hal::mock::MockDevice;
use gsv_core::hal::{ModeFlags, ObjectMap, Sample, ValueErrorFlags};
use gsv_core::processing::dfilter::designer::design;
use gsv_core::processing::dfilter::{
    simulate, Cutoff, FilterShape, FilterSpec, SafetyLimits, SimulationRequest,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

const OBJECT_COUNTS: &[u8] = &[1, 4, 8];
const BUFFER_SIZES: &[usize] = &[1_000, 48_000];

fn benchmark_frame_decoding(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_decoding");
    let mut rng = StdRng::seed_from_u64(42);

    for (name, code) in [("int16", DATATYP_INT16), ("int24", DATATYP_INT24), ("float32", DATATYP_FLOAT)] {
        for &objects in OBJECT_COUNTS {
            let map = ObjectMap::derive(ModeFlags::default(), objects, vec![0.001; objects as usize], code).unwrap();
            let frame = MockDevice::random_frame(&map, 1.0, &mut rng);
            group.throughput(Throughput::Elements(objects as u64));
            group.bench_with_input(
                BenchmarkId::new(name, format!("{}obj", objects)),
                &frame.payload,
                |b, payload| b.iter(|| decode_frame(black_box(payload), &map).unwrap()),
            );
        }
    }
    group.finish();
}

fn benchmark_buffer_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("channel_buffers");

    for &capacity in BUFFER_SIZES {
        for &objects in &[1usize, 8, 16] {
            let frame: Vec<Sample> = (0..objects)
                .map(|object_index| Sample {
                    object_index,
                    value: object_index as f64,
                    error_flags: ValueErrorFlags::NONE,
                })
                .collect();

            group.throughput(Throughput::Elements(1000));
            group.bench_with_input(
                BenchmarkId::new("push", format!("{}obj_{}cap", objects, capacity)),
                &frame,
                |b, frame| {
                    let buffers = ChannelBufferSet::new(objects, capacity).unwrap();
                    b.iter(|| {
                        for _ in 0..1000 {
                            let _ = buffers.push(black_box(frame));
                        }
                    });
                },
            );

            group.bench_with_input(
                BenchmarkId::new("push_read_all", format!("{}obj_{}cap", objects, capacity)),
                &frame,
                |b, frame| {
                    let buffers = ChannelBufferSet::new(objects, capacity).unwrap();
                    b.iter(|| {
                        for _ in 0..100 {
                            let _ = buffers.push(frame);
                        }
                        black_box(buffers.read_many(ObjectSelector::All, 100 * objects).unwrap())
                    });
                },
            );
        }
    }
    group.finish();
}

fn benchmark_filter_design(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter_design");
    let limits = SafetyLimits::default();

    let specs = [
        ("iir_lowpass", FilterSpec::iir(FilterShape::LowPass, Cutoff::Single(0.1))),
        ("iir_bandstop", FilterSpec::iir(FilterShape::BandStop, Cutoff::Band { low: 0.1, high: 0.2 })),
        ("fir_lowpass_14", FilterSpec::fir(FilterShape::LowPass, 14, Cutoff::Single(0.1))),
    ];
    for (name, spec) in specs {
        group.bench_function(name, |b| b.iter(|| design(black_box(&spec), &limits).unwrap()));
    }
    group.finish();
}

fn benchmark_simulation(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulation");
    let spec = FilterSpec::iir(FilterShape::LowPass, Cutoff::Single(0.1));
    let coeffs = design(&spec, &SafetyLimits::default()).unwrap();

    for points in [100usize, 1_000, 10_000] {
        group.throughput(Throughput::Elements(points as u64));
        let frequency = SimulationRequest::frequency_response(0.0, 400.0, 1000.0, points);
        group.bench_with_input(BenchmarkId::new("frequency_response", points), &frequency, |b, request| {
            b.iter(|| simulate(&coeffs, black_box(request)).unwrap())
        });
        let step = SimulationRequest::step_response(0.0, 1.0, points);
        group.bench_with_input(BenchmarkId::new("step_response", points), &step, |b, request| {
            b.iter(|| simulate(&coeffs, black_box(request)).unwrap())
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    benchmark_frame_decoding,
    benchmark_buffer_operations,
    benchmark_filter_design,
    benchmark_simulation
);
criterion_main!(benches);
