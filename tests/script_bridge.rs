use physics_sandbox::bodies::{BodyHandle, BodyKind};
use physics_sandbox::bridge::BridgeError;
use physics_sandbox::render::Color;
use physics_sandbox::scene::{SceneContext, SceneSystem};
use physics_sandbox::scenes::{ConsoleKind, ScriptConsoleScene, WorldScene, WorldSettings};
use physics_sandbox::scripts::{ScriptRuntime, SharedRuntime};
use rhai::{Array, Dynamic};

fn world() -> (SceneContext, WorldScene, SharedRuntime) {
    let mut ctx = SceneContext::new();
    let scene = WorldScene::new(&mut ctx, &WorldSettings { seed: Some(42), ..WorldSettings::default() });
    let runtime = ScriptRuntime::obtain(&mut ctx);
    (ctx, scene, runtime)
}

fn eval(runtime: &SharedRuntime, source: &str) -> Dynamic {
    runtime.borrow_mut().run_source(source).unwrap_or_else(|err| panic!("script failed: {err:#}"))
}

fn floats(value: Dynamic) -> (f64, f64) {
    let array = value.cast::<Array>();
    assert_eq!(array.len(), 2);
    (array[0].as_float().expect("x"), array[1].as_float().expect("y"))
}

#[test]
fn ball_lifecycle_through_script() {
    let (_ctx, scene, runtime) = world();
    let handle = eval(&runtime, "scene_2d::create_ball()");
    assert_eq!(handle.as_int(), Ok(0));

    eval(&runtime, "scene_2d::apply_ball_impulse(0, -0.24, 0.0)");
    let (vx, _) = floats(eval(&runtime, "scene_2d::get_ball_velocity(0)"));
    assert!(vx < 0.0, "impulse to the left should give negative x velocity, got {vx}");

    assert_eq!(eval(&runtime, "scene_2d::destroy_ball(0)").as_bool(), Ok(true));
    assert_eq!(eval(&runtime, "scene_2d::destroy_ball(0)").as_bool(), Ok(false));
    assert_eq!(floats(eval(&runtime, "scene_2d::get_ball_pos(0)")), (0.0, 0.0));
    assert!(scene.state().registry(BodyKind::Ball).is_empty());
}

#[test]
fn handles_are_reused_after_destroy() {
    let (_ctx, _scene, runtime) = world();
    let ids = eval(
        &runtime,
        "let a = scene_2d::create_octagon(); let b = scene_2d::create_octagon(); \
         scene_2d::destroy_octagon(a); let c = scene_2d::create_octagon(); [a, b, c]",
    )
    .cast::<Array>();
    let ids: Vec<i64> = ids.iter().map(|v| v.as_int().expect("int handle")).collect();
    assert_eq!(ids, vec![0, 1, 2]);

    let next = eval(&runtime, "scene_2d::destroy_octagon(0); scene_2d::create_octagon()");
    assert_eq!(next.as_int(), Ok(3), "allocation continues from the counter");
}

#[test]
fn set_position_and_color_round_trip() {
    let (_ctx, scene, runtime) = world();
    eval(&runtime, "let t = scene_2d::create_trapezoid(); scene_2d::set_trapezoid_pos(t, 1.5, 0.25);");
    let (x, y) = floats(eval(&runtime, "scene_2d::get_trapezoid_pos(0)"));
    assert!((x - 1.5).abs() < 1e-5 && (y - 0.25).abs() < 1e-5, "got ({x}, {y})");

    eval(&runtime, "scene_2d::set_trapezoid_color(0, 1, 2, 3)");
    assert_eq!(scene.state().color(BodyKind::Trapezoid, BodyHandle(0)), Some(Color::rgba(1, 2, 3, 255)));
    eval(&runtime, "scene_2d::set_trapezoid_color(0, 255, 0, 128, 7)");
    assert_eq!(scene.state().color(BodyKind::Trapezoid, BodyHandle(0)), Some(Color::rgba(255, 0, 128, 7)));
}

#[test]
fn unknown_handles_are_lenient() {
    let (_ctx, scene, runtime) = world();
    eval(&runtime, "scene_2d::create_ball();");
    let before = scene.state().position(BodyKind::Ball, BodyHandle(0));
    eval(
        &runtime,
        "scene_2d::set_ball_pos(9, 1.0, 1.0); scene_2d::apply_ball_impulse(9, 1.0, 1.0); \
         scene_2d::set_ball_color(9, 0, 0, 0);",
    );
    assert_eq!(floats(eval(&runtime, "scene_2d::get_ball_velocity(9)")), (0.0, 0.0));
    assert_eq!(scene.state().position(BodyKind::Ball, BodyHandle(0)), before);
    assert_eq!(scene.state().registry(BodyKind::Ball).len(), 1);
}

#[test]
fn contract_violations_are_catchable_script_errors() {
    let (_ctx, _scene, runtime) = world();
    let caught = eval(
        &runtime,
        r#"
        let errors = [];
        try { scene_2d::set_ball_pos(0, 1, 2.0); } catch (e) { errors.push(e); }
        try { scene_2d::set_ball_color(0, 256, 0, 0); } catch (e) { errors.push(e); }
        try { scene_2d::get_ball_pos(); } catch (e) { errors.push(e); }
        try { scene_2d::destroy_ball(1.0); } catch (e) { errors.push(e); }
        try { scene_2d::create_ball(1); } catch (e) { errors.push(e); }
        errors
        "#,
    )
    .cast::<Array>();
    assert_eq!(caught.len(), 5);
    let messages: Vec<String> = caught.iter().map(|e| e.to_string()).collect();
    assert!(messages[0].contains("set_ball_pos") && messages[0].contains("float"), "{}", messages[0]);
    assert!(messages[1].contains("0..=255"), "{}", messages[1]);
    assert!(messages[2].contains("got 0 argument"), "{}", messages[2]);
    assert!(messages[3].contains("must be an int"), "{}", messages[3]);
    assert!(messages[4].contains("create_ball"), "{}", messages[4]);
}

#[test]
fn calls_after_world_is_gone_report_unavailable() {
    let (_ctx, scene, runtime) = world();
    let stale = scene.bridge_function("create_ball").expect("create_ball registered");
    eval(&runtime, "scene_2d::create_ball();");
    drop(scene);

    assert!(stale.is_expired());
    let err = stale.call(&[]).expect_err("world is gone");
    assert_eq!(err, BridgeError::Unavailable { name: "create_ball".into(), scene: "2D World" });
    assert_eq!(err.to_string(), "\"create_ball\" is only available in 2D World Scene.");

    for _ in 0..1000 {
        assert!(stale.call(&[Dynamic::from_int(0)]).is_err());
    }
    let message = eval(
        &runtime,
        "let m = \"no error\"; try { scene_2d::get_ball_pos(0); } catch (e) { m = e; } m",
    );
    assert_eq!(message.to_string(), "\"get_ball_pos\" is only available in 2D World Scene.");
}

#[test]
fn console_reports_world_functions_after_world_scene_is_popped() {
    let mut system = SceneSystem::new();
    system.push_scene(ScriptConsoleScene::factory());
    system.push_scene(WorldScene::factory(WorldSettings { seed: Some(7), ..WorldSettings::default() }));
    system.update(1.0 / 60.0);
    assert_eq!(system.len(), 2);

    system.pop_scene();
    system.update(1.0 / 60.0);
    assert!(system.find_scene::<WorldScene>().is_none());

    system.find_scene_mut::<ScriptConsoleScene>().expect("console on stack").submit("scene_2d::create_ball()");
    system.update(1.0 / 60.0);

    let console = system.find_scene::<ScriptConsoleScene>().expect("console on stack");
    let last = console.entries().last().expect("console has entries");
    assert_eq!(last.kind, ConsoleKind::Error);
    assert!(
        last.text.contains("\"create_ball\" is only available in 2D World Scene."),
        "unexpected console error: {}",
        last.text
    );
}
