mod common;

use std::sync::{Arc, Mutex};
use std::thread;

use common::*;
use strata_physics::*;

#[test]
fn test_physics_types_are_sync_and_send() {
    fn assert_sync_send<T: Sync + Send>() {}
    assert_sync_send::<PhysicsSystem>();
    assert_sync_send::<JobSystem>();
    assert_sync_send::<ShapeRegistry>();
}

#[test]
fn test_shared_physics_system_across_threads() {
    let mut scene = scene();
    scene.add_floor();
    let ball = scene.add_ball(0.5, Vec3::new(0.0, 5.0, 0.0));
    let system = Arc::new(Mutex::new(scene.system));
    let jobs = Arc::new(jobs(2));

    let mut handles = vec![];
    for _ in 0..4 {
        let system_clone = Arc::clone(&system);
        let jobs_clone = Arc::clone(&jobs);
        let handle = thread::spawn(move || {
            let mut system = system_clone.lock().unwrap();
            system.update(DT, 1, &jobs_clone)
        });
        handles.push(handle);
    }

    for handle in handles {
        assert!(handle.join().unwrap().is_empty());
    }

    let mut system = system.lock().unwrap();
    assert!(system.body_interface().position(ball).unwrap().y < 5.0);
}

#[test]
fn test_shape_registry_shared_between_systems() {
    let first = scene();
    let shapes = first.shapes.clone();
    let config = config_with(PhysicsSystemSettings::default(), true).with_shape_registry(shapes.clone());
    let second = PhysicsSystem::new(config).unwrap();
    let shape = shapes.create_sphere(0.5).unwrap();

    let handles: Vec<_> = [first.system, second]
        .into_iter()
        .map(|mut system| {
            thread::spawn(move || {
                let settings =
                    BodyCreationSettings::new(shape, Vec3::ZERO, Quat::IDENTITY, MotionType::Dynamic, MOVING);
                let id = system
                    .body_interface()
                    .create_and_add_body(&settings, Activation::Activate)
                    .unwrap();
                system.update(DT, 1, &jobs(1));
                system.body_interface().position(id).unwrap()
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap().y < 0.0);
    }
    assert_eq!(shapes.ref_count(shape), Some(0));
}
