mod common;

use approx::assert_relative_eq;
use common::*;
use strata_physics::*;

#[test]
fn sphere_comes_to_rest_on_floor() {
    let mut scene = scene();
    let jobs = jobs(2);
    scene.add_floor();
    let settings = scene
        .ball_settings(0.5, Vec3::new(0.0, 10.0, 0.0))
        .with_motion_quality(MotionQuality::LinearCast);
    let ball = scene.add(settings, Activation::Activate);

    let mut lowest = f32::MAX;
    for _ in 0..240 {
        let errors = scene.system.update(DT, 1, &jobs);
        assert!(errors.is_empty());
        lowest = lowest.min(scene.position(ball).y);
    }

    let rest = scene.position(ball);
    assert!((rest.y - 0.5).abs() < 0.05, "ball rests at {rest}");
    assert!(lowest > 0.25, "ball sank to {lowest}");
    assert_relative_eq!(rest.x, 0.0, epsilon = 1e-3);
    assert_relative_eq!(rest.z, 0.0, epsilon = 1e-3);
}

#[test]
fn fast_linear_cast_body_does_not_tunnel() {
    let mut scene = scene();
    let jobs = jobs(1);
    let plate_shape = scene.shapes.create_box(Vec3::new(5.0, 0.05, 5.0), 0.05).unwrap();
    let plate = BodyCreationSettings::new(
        plate_shape,
        Vec3::ZERO,
        Quat::IDENTITY,
        MotionType::Static,
        NON_MOVING,
    );
    scene.add(plate, Activation::DontActivate);

    let bullet = scene
        .ball_settings(0.1, Vec3::new(0.0, 2.0, 0.0))
        .with_linear_velocity(Vec3::new(0.0, -200.0, 0.0))
        .with_motion_quality(MotionQuality::LinearCast);
    let swept = scene.add(bullet, Activation::Activate);

    let discrete = scene
        .ball_settings(0.1, Vec3::new(3.0, 2.0, 0.0))
        .with_linear_velocity(Vec3::new(0.0, -200.0, 0.0));
    let tunnelling = scene.add(discrete, Activation::Activate);

    scene.run(&jobs, 30);

    assert!(scene.position(swept).y > 0.0, "linear cast body passed through");
    assert!(scene.position(tunnelling).y < -0.5);
}

#[test]
fn static_bodies_never_move() {
    let mut scene = scene();
    let jobs = jobs(2);
    let floor = scene.add_floor();
    scene.add_ball(0.5, Vec3::new(0.0, 0.6, 0.0));

    let mut bodies = scene.system.body_interface();
    bodies.set_linear_velocity(floor, Vec3::new(5.0, 0.0, 0.0)).unwrap();
    bodies.add_force(floor, Vec3::splat(1000.0)).unwrap();
    bodies.add_impulse(floor, Vec3::splat(1000.0)).unwrap();

    scene.run(&jobs, 60);

    let bodies = scene.system.body_interface();
    assert_eq!(bodies.position(floor).unwrap(), Vec3::new(0.0, -1.0, 0.0));
    assert_eq!(bodies.rotation(floor).unwrap(), Quat::IDENTITY);
    assert_eq!(bodies.linear_velocity(floor).unwrap(), Vec3::ZERO);
    assert!(!bodies.is_active(floor));
}

#[test]
fn dont_activate_bodies_stay_put() {
    let mut scene = scene();
    let jobs = jobs(2);
    let settings = scene
        .ball_settings(0.5, Vec3::new(0.0, 5.0, 0.0))
        .with_linear_velocity(Vec3::new(1.0, 0.0, 0.0));
    let ball = scene.add(settings, Activation::DontActivate);

    scene.run(&jobs, 60);

    let bodies = scene.system.body_interface();
    assert!(bodies.is_added(ball));
    assert!(!bodies.is_active(ball));
    assert_eq!(bodies.position(ball).unwrap(), Vec3::new(0.0, 5.0, 0.0));
}

#[test]
fn resting_body_sleeps_and_impulse_wakes_it() {
    let mut scene = scene();
    let jobs = jobs(2);
    scene.add_floor();
    let ball = scene.add_ball(0.5, Vec3::new(0.0, 0.5, 0.0));

    scene.run(&jobs, 60);
    assert!(!scene.system.body_interface().is_active(ball));
    assert_eq!(scene.system.num_active_bodies(), 0);

    let mut bodies = scene.system.body_interface();
    let mass = bodies.mass(ball).unwrap();
    bodies.add_impulse(ball, Vec3::new(0.0, 2.0 * mass, 0.0)).unwrap();
    assert!(bodies.is_active(ball));
    assert_relative_eq!(bodies.linear_velocity(ball).unwrap().y, 2.0, epsilon = 1e-4);

    scene.system.update(DT, 1, &jobs);
    assert!(scene.position(ball).y > 0.5);
}

#[test]
fn moving_body_wakes_sleeping_body_on_contact() {
    let mut scene = scene();
    let jobs = jobs(2);
    scene.add_floor();
    let sleeper = scene.ball_settings(0.5, Vec3::new(0.0, 0.5, 0.0));
    let sleeper = scene.add(sleeper, Activation::DontActivate);
    let striker = scene
        .ball_settings(0.5, Vec3::new(-3.0, 0.5, 0.0))
        .with_linear_velocity(Vec3::new(5.0, 0.0, 0.0));
    scene.add(striker, Activation::Activate);

    scene.run(&jobs, 60);

    assert!(scene.position(sleeper).x > 0.1, "sleeping body was not pushed");
}

#[test]
fn identical_systems_stay_identical_across_thread_counts() {
    let build = || {
        let mut scene = scene();
        scene.add_floor();
        for i in 0..12 {
            let position = Vec3::new((i % 4) as f32 * 0.9, 1.0 + i as f32 * 1.1, (i / 4) as f32 * 0.3);
            scene.add_ball(0.4, position);
        }
        let cube = scene.shapes.create_box(Vec3::splat(0.5), 0.05).unwrap();
        let settings = BodyCreationSettings::new(
            cube,
            Vec3::new(0.2, 16.0, 0.1),
            Quat::from_rotation_z(0.3),
            MotionType::Dynamic,
            MOVING,
        );
        scene.add(settings, Activation::Activate);
        scene
    };

    let mut single = build();
    let mut parallel = build();
    single.run(&jobs(1), 120);
    parallel.run(&jobs(4), 120);

    let a: Vec<_> = single.system.bodies().arena().iter().map(|(_, b)| (b.position, b.rotation)).collect();
    let b: Vec<_> = parallel.system.bodies().arena().iter().map(|(_, b)| (b.position, b.rotation)).collect();
    assert_eq!(a, b);
}

#[test]
fn forces_last_for_a_single_update() {
    let mut scene = scene();
    let jobs = jobs(1);
    let settings = scene
        .ball_settings(0.5, Vec3::new(0.0, 10.0, 0.0))
        .with_linear_damping(0.0);
    let ball = scene.add(settings, Activation::Activate);

    let mut bodies = scene.system.body_interface();
    let mass = bodies.mass(ball).unwrap();
    bodies.add_force(ball, Vec3::new(0.0, 9.81 * mass, 0.0)).unwrap();
    scene.system.update(DT, 4, &jobs);
    assert_relative_eq!(scene.system.body_interface().linear_velocity(ball).unwrap().y, 0.0, epsilon = 1e-3);

    scene.system.update(DT, 4, &jobs);
    assert_relative_eq!(
        scene.system.body_interface().linear_velocity(ball).unwrap().y,
        -9.81 * DT,
        epsilon = 1e-3
    );
}

#[test]
fn invalid_updates_do_nothing() {
    let mut scene = scene();
    let jobs = jobs(1);
    let ball = scene.add_ball(0.5, Vec3::new(0.0, 3.0, 0.0));

    assert_eq!(scene.system.update(0.0, 1, &jobs), UpdateError::empty());
    assert_eq!(scene.system.update(-1.0, 1, &jobs), UpdateError::empty());
    assert_eq!(scene.system.update(f32::NAN, 1, &jobs), UpdateError::empty());
    assert_eq!(scene.position(ball), Vec3::new(0.0, 3.0, 0.0));
}

#[test]
fn zero_collision_steps_behaves_like_one() {
    let jobs = jobs(1);
    let mut a = scene();
    let mut b = scene();
    let ball_a = a.add_ball(0.5, Vec3::new(0.0, 3.0, 0.0));
    let ball_b = b.add_ball(0.5, Vec3::new(0.0, 3.0, 0.0));
    a.system.update(DT, 0, &jobs);
    b.system.update(DT, 1, &jobs);
    assert_eq!(a.position(ball_a), b.position(ball_b));
    assert!(a.position(ball_a).y < 3.0);
    assert_eq!(a.system.last_step_profile().collision_steps, 1);
}

#[test]
fn gravity_can_be_changed() {
    let mut scene = scene();
    let jobs = jobs(1);
    let ball = scene.add_ball(0.5, Vec3::new(0.0, 3.0, 0.0));
    scene.system.set_gravity(Vec3::new(1.0, 0.0, 0.0));
    assert_eq!(scene.system.gravity(), Vec3::new(1.0, 0.0, 0.0));

    scene.run(&jobs, 30);
    let position = scene.position(ball);
    assert!(position.x > 0.0);
    assert_relative_eq!(position.y, 3.0);
}

#[test]
fn locked_axes_do_not_move() {
    let mut scene = scene();
    let jobs = jobs(1);
    let settings = scene
        .ball_settings(0.5, Vec3::new(0.0, 3.0, 0.0))
        .with_allowed_dofs(AllowedDofs::PLANE_2D)
        .with_linear_velocity(Vec3::new(1.0, 0.0, 4.0));
    let ball = scene.add(settings, Activation::Activate);

    scene.run(&jobs, 30);
    let position = scene.position(ball);
    assert!(position.x > 0.0);
    assert_eq!(position.z, 0.0);
}

#[test]
fn filtered_layers_pass_through_each_other() {
    let config = config_with(PhysicsSystemSettings::default(), false);
    let shapes = config.shape_registry.clone().unwrap();
    let mut scene = Scene {
        system: PhysicsSystem::new(config).unwrap(),
        shapes,
    };
    let jobs = jobs(1);
    scene.add_floor();
    let ball = scene.add_ball(0.5, Vec3::new(0.0, 1.0, 0.0));

    scene.run(&jobs, 60);
    assert!(scene.position(ball).y < -1.0);
}

#[test]
fn step_profile_counts_bodies() {
    let mut scene = scene();
    let jobs = jobs(1);
    scene.add_floor();
    scene.add_ball(0.5, Vec3::new(0.0, 0.5, 0.0));
    scene.system.update(DT, 2, &jobs);

    let profile = scene.system.last_step_profile();
    assert_eq!(profile.collision_steps, 2);
    assert_eq!(profile.body_count, 2);
    assert_eq!(profile.active_body_count, 1);
    assert_eq!(profile.manifold_count, 1);
}
