use cgmath::Point3;
use cubewar::{
    config::EngineConfig,
    engine_state::{
        rendering::{
            recording::{RecordingSubmission, SubmissionCommand},
            TOTAL_TRANSFORM_UNIFORM, VOXEL_PROGRAM, WORLD_TRANSFORM_UNIFORM,
        },
        simulation_clock::ManualPerformanceCounter,
        voxels::block::block_type::BlockType,
        EngineState, FrameOutcome,
    },
};

/// 60 fixed steps per second on a 60 kHz counter: 1000 ticks per step.
const TICKS_PER_STEP: u64 = 1000;

type HeadlessEngine = EngineState<RecordingSubmission, ManualPerformanceCounter>;

/// A 16^3 reference world with the player dropped over the sand, away from the centre block.
fn headless_engine() -> HeadlessEngine {
    let mut config = EngineConfig::default();
    config.world.chunk_edge = 16;
    config.player.spawn = [2.0, 2.0, 12.0];

    EngineState::new(
        config,
        RecordingSubmission::default(),
        ManualPerformanceCounter::new(60 * TICKS_PER_STEP),
    )
    .unwrap()
}

fn run_frames(engine: &mut HeadlessEngine, frames: usize, ticks_per_frame: u64) {
    for _ in 0..frames {
        engine.counter_mut().advance(ticks_per_frame);
        engine.frame();
    }
}

fn command_kind(command: &SubmissionCommand) -> &'static str {
    match command {
        SubmissionCommand::BeginFrame => "begin",
        SubmissionCommand::BindProgram { .. } => "bind",
        SubmissionCommand::SetUniformMat4 { .. } => "uniform",
        SubmissionCommand::CreateVertexBuffer { .. } => "create",
        SubmissionCommand::Upload { .. } => "upload",
        SubmissionCommand::DrawPoints { .. } => "draw",
        SubmissionCommand::FinishFrame => "finish",
        SubmissionCommand::Resize { .. } => "resize",
    }
}

#[test]
fn first_frame_uploads_the_mesh_without_rendering() {
    let mut engine = headless_engine();

    assert_eq!(engine.frame(), FrameOutcome::Skipped);

    let kinds: Vec<_> = engine
        .submission()
        .commands()
        .iter()
        .map(command_kind)
        .collect();
    assert_eq!(kinds, vec!["create", "upload"]);
    assert!(engine.mesher().uploaded_points() > 0);
    assert_eq!(
        engine.physics().body_count(),
        engine.mesher().points().len() + 1
    );
}

#[test]
fn rendered_frames_follow_the_submission_order() {
    let mut engine = headless_engine();
    engine.frame();
    engine.submission_mut().clear_commands();

    engine.counter_mut().advance(TICKS_PER_STEP);
    assert!(matches!(engine.frame(), FrameOutcome::Rendered(_)));

    let commands = engine.submission().commands();
    let kinds: Vec<_> = commands.iter().map(command_kind).collect();
    assert_eq!(
        kinds,
        vec!["begin", "bind", "uniform", "uniform", "draw", "finish"]
    );

    assert_eq!(
        commands[1],
        SubmissionCommand::BindProgram {
            name: VOXEL_PROGRAM.to_string()
        }
    );
    assert!(matches!(
        &commands[2],
        SubmissionCommand::SetUniformMat4 { name, .. } if name == WORLD_TRANSFORM_UNIFORM
    ));
    assert!(matches!(
        &commands[3],
        SubmissionCommand::SetUniformMat4 { name, .. } if name == TOTAL_TRANSFORM_UNIFORM
    ));
    assert_eq!(
        commands[4],
        SubmissionCommand::DrawPoints {
            buffer: engine.mesher().vertex_buffer().unwrap(),
            count: engine.mesher().uploaded_points(),
        }
    );
}

#[test]
fn the_player_falls_and_lands_on_the_sand() {
    let mut engine = headless_engine();
    engine.frame();

    run_frames(&mut engine, 180, TICKS_PER_STEP);
    assert_eq!(engine.clock().current_tick(), 180);

    let body = engine
        .physics()
        .body(engine.rig().player_body())
        .expect("the player body is never removed");
    assert!(body.grounded);

    // Sand tops out at z = 7.5; the capsule's half height is 0.4 + 2.0 / 2.
    let location = engine.rig().player_node().get().absolute_location();
    assert!((location.z - 8.9).abs() < 1e-3);
    assert!((location.x - 2.0).abs() < 1e-4);
    assert!((location.y - 2.0).abs() < 1e-4);

    let target = engine.rig().pov().target;
    assert!((target.z - (8.9 + 0.8)).abs() < 1e-3);
}

#[test]
fn grid_edits_are_remeshed_on_the_next_frame() {
    let mut engine = headless_engine();
    engine.frame();
    run_frames(&mut engine, 2, TICKS_PER_STEP);
    engine.submission_mut().clear_commands();

    let removed = Point3::new(3, 12, 7);
    let exposed = Point3::new(3, 12, 6);
    engine.chunk_mut().set_block(removed, BlockType::NULL);
    run_frames(&mut engine, 1, TICKS_PER_STEP);

    let kinds: Vec<_> = engine
        .submission()
        .commands()
        .iter()
        .map(command_kind)
        .collect();
    assert_eq!(kinds.first(), Some(&"upload"));
    assert_eq!(kinds.iter().filter(|kind| **kind == "create").count(), 0);
    assert!(!engine.chunk().is_dirty());

    let buffer = engine.mesher().vertex_buffer().unwrap();
    let contents = engine.submission().buffer_contents(buffer).unwrap();
    let at = |cell: Point3<usize>| {
        contents.iter().find(|point| {
            point.x == cell.x as f32 && point.y == cell.y as f32 && point.z == cell.z as f32
        })
    };
    assert!(at(removed).is_none());
    let uncovered = at(exposed).expect("the cell below the hole becomes visible");
    assert_eq!(uncovered.mask(), 1 << 5);
}

#[test]
fn digging_clears_the_block_under_the_view_ray() {
    let mut engine = headless_engine();
    engine.frame();
    run_frames(&mut engine, 180, TICKS_PER_STEP);

    let cell = engine
        .dig_targeted_block()
        .expect("the camera looks down at the sand");
    assert_eq!(cell.x, 2);
    assert_eq!(cell.z, 7);
    assert!(cell.y > 2);
    assert_eq!(engine.chunk().block_at(cell), BlockType::NULL);
    assert!(engine.chunk().is_dirty());

    run_frames(&mut engine, 1, TICKS_PER_STEP);
    assert!(!engine.chunk().is_dirty());
    assert!(engine.chunk().body_at(cell).is_none());
}

#[test]
fn long_stalls_are_capped_and_caught_up_later() {
    let mut engine = headless_engine();
    engine.frame();

    engine.counter_mut().advance(25 * TICKS_PER_STEP);
    let FrameOutcome::Rendered(timing) = engine.frame() else {
        panic!("the clock is primed");
    };
    assert_eq!(timing.fixed_steps, 10);
    assert!(timing.saturated);
    assert!(!timing.interpolation_possible);

    run_frames(&mut engine, 2, 0);
    assert_eq!(engine.clock().current_tick(), 25);
    assert!(engine.clock().remainder() < TICKS_PER_STEP);
}
