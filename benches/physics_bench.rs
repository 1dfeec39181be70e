use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;
use std::sync::Arc;
use strata_physics::{
    collision::{NarrowPhase, Pose},
    core::Aabb,
    utils::ArenaId,
    *,
};

const DT: f32 = 1.0 / 60.0;
const NON_MOVING: ObjectLayer = ObjectLayer(0);
const MOVING: ObjectLayer = ObjectLayer(1);

fn prepare_system(body_count: usize) -> PhysicsSystem {
    let mut bp = BroadPhaseLayerTable::new(2, 2).unwrap();
    bp.map(NON_MOVING, BroadPhaseLayer(0)).unwrap();
    bp.map(MOVING, BroadPhaseLayer(1)).unwrap();
    let mut pairs = ObjectLayerPairFilterTable::new(2).unwrap();
    pairs.enable_collision(MOVING, MOVING).unwrap();
    pairs.enable_collision(MOVING, NON_MOVING).unwrap();
    let combined = ObjectVsBroadPhaseLayerFilterTable::new(&bp, &pairs).unwrap();
    let shapes = Arc::new(ShapeRegistry::new());

    let mut system = PhysicsSystem::new(
        PhysicsSystemConfig::new(PhysicsSystemSettings::default())
            .with_shape_registry(shapes.clone())
            .with_broad_phase_layer_interface(Arc::new(bp))
            .with_object_vs_broad_phase_layer_filter(Arc::new(combined))
            .with_object_layer_pair_filter(Arc::new(pairs)),
    )
    .unwrap();

    let floor = shapes.create_box(Vec3::new(100.0, 1.0, 100.0), 0.05).unwrap();
    let ball = shapes.create_sphere(0.5).unwrap();
    let mut bodies = system.body_interface();
    let settings = BodyCreationSettings::new(
        floor,
        Vec3::new(0.0, -1.0, 0.0),
        Quat::IDENTITY,
        MotionType::Static,
        NON_MOVING,
    );
    bodies
        .create_and_add_body(&settings, Activation::DontActivate)
        .unwrap();
    for i in 0..body_count {
        let position = Vec3::new((i % 16) as f32 * 1.1, 0.5 + (i / 256) as f32 * 1.1, ((i / 16) % 16) as f32 * 1.1);
        let settings = BodyCreationSettings::new(ball, position, Quat::IDENTITY, MotionType::Dynamic, MOVING);
        bodies
            .create_and_add_body(&settings, Activation::Activate)
            .unwrap();
    }
    system.optimize_broad_phase();
    system
}

fn bench_system_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("system_update");
    for &count in &[128usize, 512, 2048] {
        for threads in [1, 4] {
            let jobs = JobSystem::new(JobSystemSettings::new(0, 0, threads)).unwrap();
            group.bench_with_input(
                BenchmarkId::new(format!("threads_{threads}"), count),
                &count,
                |b, &count| {
                    b.iter(|| {
                        let mut system = prepare_system(count);
                        black_box(system.update(black_box(DT), 1, &jobs))
                    })
                },
            );
        }
    }
    group.finish();
}

fn bench_broad_phase(c: &mut Criterion) {
    let mut group = c.benchmark_group("broad_phase");
    let count = 4096u32;
    let bounds: Vec<Aabb> = (0..count)
        .map(|i| {
            let center = Vec3::new((i % 64) as f32 * 1.5, (i / 64) as f32 * 1.5, 0.0);
            Aabb::from_center_extent(center, Vec3::splat(0.5))
        })
        .collect();

    let mut broadphase = BroadPhase::new(2, 0.05);
    for (i, aabb) in bounds.iter().enumerate() {
        broadphase.insert(BodyId::from_parts(i as u32, 0), BroadPhaseLayer((i % 2) as u8), *aabb);
    }

    group.bench_function("optimize", |b| {
        b.iter(|| {
            broadphase.optimize();
        })
    });

    group.bench_function("query_all", |b| {
        b.iter(|| {
            let mut found = 0;
            for aabb in &bounds {
                found += broadphase.query_overlaps(aabb, |_| true).len();
            }
            black_box(found)
        })
    });

    group.finish();
}

fn bench_narrow_phase(c: &mut Criterion) {
    let mut group = c.benchmark_group("narrow_phase");
    let cube = Shape::cuboid(Vec3::splat(0.5));
    let ball = Shape::Sphere { radius: 0.5 };
    let a = BodyId::from_parts(0, 0);
    let b = BodyId::from_parts(1, 0);
    let lower = Pose::new(Vec3::ZERO, Quat::IDENTITY);
    let upper = Pose::new(Vec3::new(0.1, 0.95, 0.0), Quat::from_rotation_y(0.4));

    group.bench_function("box_box", |bench| {
        bench.iter(|| black_box(NarrowPhase::collide(a, &cube, &lower, b, &cube, &upper, 0.02)))
    });
    group.bench_function("box_sphere", |bench| {
        bench.iter(|| black_box(NarrowPhase::collide(a, &cube, &lower, b, &ball, &upper, 0.02)))
    });

    group.finish();
}

criterion_group!(benches, bench_system_update, bench_broad_phase, bench_narrow_phase);
criterion_main!(benches);
