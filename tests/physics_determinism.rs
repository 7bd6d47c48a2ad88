use glam::Vec2;
use physics_sandbox::bodies::{BodyHandle, BodyKind};
use physics_sandbox::scenes::WorldState;

const TEST_DT: f32 = 1.0 / 60.0;
const TEST_STEPS: usize = 240;

#[test]
fn seeded_worlds_evolve_identically() {
    let mut world_a = seeded_world();
    let mut world_b = seeded_world();

    run_fixed_steps(&mut world_a, TEST_STEPS, TEST_DT);
    run_fixed_steps(&mut world_b, TEST_STEPS, TEST_DT);

    for kind in BodyKind::ALL {
        for (handle, _) in world_a.registry(kind).iter() {
            assert_vec2_near(world_a.position(kind, handle), world_b.position(kind, handle), 1e-5);
            assert_vec2_near(world_a.velocity(kind, handle), world_b.velocity(kind, handle), 1e-5);
            assert_eq!(world_a.color(kind, handle), world_b.color(kind, handle));
        }
    }
}

#[test]
fn bodies_come_to_rest_on_the_ground() {
    let mut world = seeded_world();
    run_fixed_steps(&mut world, TEST_STEPS, TEST_DT);
    let ball = world.position(BodyKind::Ball, BodyHandle(0));
    // Ground top surface sits at y = 2.5.
    assert!(ball.y > 2.2 && ball.y < 2.5, "ball should rest on the ground, got {ball:?}");
}

fn seeded_world() -> WorldState {
    let mut world = WorldState::new(Vec2::new(0.0, 10.0), 4, Some(99));
    for kind in BodyKind::ALL {
        world.create(kind);
    }
    world.apply_impulse(BodyKind::Octagon, BodyHandle(0), Vec2::new(0.05, -0.05));
    world
}

fn run_fixed_steps(world: &mut WorldState, steps: usize, dt: f32) {
    for _ in 0..steps {
        world.step(dt);
    }
}

fn assert_vec2_near(a: Vec2, b: Vec2, epsilon: f32) {
    assert!((a - b).length() <= epsilon, "vectors differed: left={a:?}, right={b:?}, epsilon={epsilon}");
}
