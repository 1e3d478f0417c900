//! # Engine State Module
//!
//! Owns every simulation subsystem and runs them in a fixed order once per frame.
//!
//! ## Key Components
//!
//! * `EngineState` - The main state container, generic over the render backend and clock source
//! * `camera_state` - The local player body and the orbiting camera that follows it
//! * `physics` - Rigid bodies, fixed-step integration and raycasts
//! * `rendering` - The render submission seam and the face-culling mesher
//! * `scene` - Parent-relative transform nodes with interpolation
//! * `simulation_clock` - The fixed/variable timestep clock
//! * `voxels` - Block types, the voxel grid and its generators
//!
//! ## Frame order
//!
//! Everything runs on the calling thread:
//!
//! 1. Clock tick. Each drained fixed step advances physics and captures the player snapshot.
//! 2. Scene graph update at the clock's interpolation factor.
//! 3. Mesh stage, only when the grid is dirty.
//! 4. Render submission.
//!
//! The priming frame stops after the mesh stage so collision geometry exists before the first
//! fixed step.

use cgmath::{Matrix4, SquareMatrix, Vector3};
use log::info;
use winit::{event::MouseButton, keyboard::KeyCode};

use camera_state::CameraRig;
use physics::PhysicsWorld;
use rendering::{
    meshing::ChunkMesher, RenderSubmission, TOTAL_TRANSFORM_UNIFORM, VOXEL_PROGRAM,
    WORLD_TRANSFORM_UNIFORM,
};
use scene::SceneGraph;
use simulation_clock::{ClockTick, FrameTiming, PerformanceCounter, SimulationClock};
use voxels::{block::block_type::BlockType, chunk::Chunk};

use crate::{application_state::input_state::ProcessedInputState, config::EngineConfig};

pub mod camera_state;
pub mod physics;
pub mod rendering;
pub mod scene;
pub mod simulation_clock;
pub mod voxels;

/// What a call to [`EngineState::frame`] produced.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum FrameOutcome {
    /// The clock was primed; nothing was rendered.
    Skipped,
    /// A frame was submitted.
    Rendered(FrameTiming),
}

/// The main state container for the engine.
///
/// Generic over the render backend and the time source, so the same frame loop drives the
/// wgpu window and headless tests.
///
/// # Examples
///
/// ```
/// use cubewar::config::EngineConfig;
/// use cubewar::engine_state::{
///     rendering::recording::RecordingSubmission,
///     simulation_clock::ManualPerformanceCounter,
///     EngineState, FrameOutcome,
/// };
///
/// let mut config = EngineConfig::default();
/// config.world.chunk_edge = 8;
/// let mut engine = EngineState::new(
///     config,
///     RecordingSubmission::default(),
///     ManualPerformanceCounter::new(1_000_000),
/// )
/// .unwrap();
///
/// assert_eq!(engine.frame(), FrameOutcome::Skipped);
/// ```
pub struct EngineState<R: RenderSubmission, C: PerformanceCounter> {
    config: EngineConfig,
    clock: SimulationClock,
    physics: PhysicsWorld,
    chunk: Chunk,
    mesher: ChunkMesher,
    scene: SceneGraph,
    rig: CameraRig,
    submission: R,
    counter: C,
    player_actions: PlayerAction,
}

impl<R: RenderSubmission, C: PerformanceCounter> EngineState<R, C> {
    /// Creates the world, the physics world and the player rig.
    ///
    /// # Arguments
    /// * `config` - Validated before anything is built
    /// * `submission` - Render backend
    /// * `counter` - Time source of the simulation clock
    ///
    /// # Returns
    /// The engine, or the reason the configuration was rejected
    pub fn new(config: EngineConfig, submission: R, counter: C) -> anyhow::Result<Self> {
        config.validate()?;

        let generator = config
            .generator_kind()?
            .build(config.world.seed, config.fill_block()?);
        let chunk = Chunk::generate(config.world.chunk_edge, generator.as_ref());

        let mut physics = PhysicsWorld::new(Vector3::from(config.simulation.gravity));
        let mut scene = SceneGraph::new();
        let rig = CameraRig::spawn(
            &config.player,
            &config.camera,
            &mut physics,
            &mut scene,
            submission.aspect_ratio(),
        );

        info!(
            "Engine ready: {} chunk of edge {}, {} solid cells",
            config.world.generator,
            chunk.edge(),
            chunk.solid_count()
        );

        Ok(Self {
            clock: SimulationClock::new(
                config.simulation.fixed_steps_per_second,
                config.simulation.max_steps_per_frame,
            ),
            config,
            physics,
            chunk,
            mesher: ChunkMesher::new(),
            scene,
            rig,
            submission,
            counter,
            player_actions: PlayerAction::default(),
        })
    }

    /// Runs one frame.
    pub fn frame(&mut self) -> FrameOutcome {
        self.apply_player_actions();

        let Self {
            clock,
            physics,
            rig,
            counter,
            ..
        } = self;
        let tick = clock.tick(&*counter, |dt| {
            physics.step(dt as f32);
            rig.capture_fixed_step(physics);
        });

        let timing = match tick {
            ClockTick::Primed => {
                self.mesher
                    .remesh(&mut self.chunk, &mut self.physics, &mut self.submission);
                return FrameOutcome::Skipped;
            }
            ClockTick::Stepped(timing) => timing,
        };

        self.scene.update(timing.interpolation as f32);
        self.rig.update_view();

        self.mesher
            .remesh(&mut self.chunk, &mut self.physics, &mut self.submission);

        self.render();
        FrameOutcome::Rendered(timing)
    }

    fn render(&mut self) {
        if !self.submission.begin_frame() {
            return;
        }

        let world_transform = Matrix4::identity();
        self.submission.bind_program(VOXEL_PROGRAM);
        self.submission
            .set_uniform_mat4(WORLD_TRANSFORM_UNIFORM, world_transform);
        self.submission.set_uniform_mat4(
            TOTAL_TRANSFORM_UNIFORM,
            self.rig.view_projection() * world_transform,
        );
        if let Some(buffer) = self.mesher.vertex_buffer() {
            self.submission
                .draw_points(buffer, self.mesher.uploaded_points());
        }
        self.submission.finish_frame();
    }

    /// Resizes the output and the camera projection.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.submission.resize(width, height);
        self.rig.resize(self.submission.aspect_ratio());
    }

    /// Removes the block under the view ray.
    ///
    /// # Returns
    /// The cell that was cleared, if the ray hit one
    pub fn dig_targeted_block(&mut self) -> Option<cgmath::Point3<usize>> {
        let cell = self.rig.targeted_cell(&self.physics, self.chunk.edge())?;
        info!(
            "Digging {:?} block at {:?}",
            self.chunk.block_at(cell),
            cell
        );
        self.chunk.set_block(cell, BlockType::NULL);
        Some(cell)
    }

    /// Adds input commands for the next frame.
    ///
    /// Snapshots taken between two frames are merged, so a press is never lost.
    ///
    /// # Arguments
    /// * `input` - The processed input state to translate into player actions
    pub fn set_input_commands(&mut self, input: ProcessedInputState) {
        self.player_actions
            .merge(PlayerAction::from_processed_input(&input));
    }

    fn apply_player_actions(&mut self) {
        let actions = std::mem::take(&mut self.player_actions);

        if let Some((dx, dy)) = actions.rotate_view {
            self.rig.intake_mouse_motion(dx, dy);
        }
        if actions.dig {
            self.dig_targeted_block();
        }
        if actions.log_stats {
            info!(
                "Tick {}: {} bodies, {} points uploaded, {} scene nodes",
                self.clock.current_tick(),
                self.physics.body_count(),
                self.mesher.uploaded_points(),
                self.scene.len()
            );
        }
    }

    /// Settings the engine was built from.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The simulation clock.
    pub fn clock(&self) -> &SimulationClock {
        &self.clock
    }

    /// The physics world.
    pub fn physics(&self) -> &PhysicsWorld {
        &self.physics
    }

    /// The voxel grid.
    pub fn chunk(&self) -> &Chunk {
        &self.chunk
    }

    /// Mutable access to the voxel grid. Edits are picked up by the next frame's mesh stage.
    pub fn chunk_mut(&mut self) -> &mut Chunk {
        &mut self.chunk
    }

    /// The chunk mesher.
    pub fn mesher(&self) -> &ChunkMesher {
        &self.mesher
    }

    /// The camera rig.
    pub fn rig(&self) -> &CameraRig {
        &self.rig
    }

    /// The render backend.
    pub fn submission(&self) -> &R {
        &self.submission
    }

    /// Mutable access to the render backend.
    pub fn submission_mut(&mut self) -> &mut R {
        &mut self.submission
    }

    /// Mutable access to the time source.
    pub fn counter_mut(&mut self) -> &mut C {
        &mut self.counter
    }
}

/// Player actions derived from one input snapshot.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct PlayerAction {
    /// Orbit rotation from mouse motion
    pub rotate_view: Option<(f64, f64)>,
    /// Remove the targeted block
    pub dig: bool,
    /// Log engine statistics
    pub log_stats: bool,
}

impl PlayerAction {
    /// Translates the processed input state into player actions.
    ///
    /// Digging and statistics only trigger on press, not hold.
    pub fn from_processed_input(input: &ProcessedInputState) -> Self {
        Self {
            rotate_view: input.get_mouse_delta(),
            dig: input
                .get_mouse_button_state(MouseButton::Left)
                .is_just_pressed(),
            log_stats: input.get_key_state(KeyCode::F3).is_just_pressed(),
        }
    }

    /// Combines two action sets; mouse deltas add up.
    pub fn merge(&mut self, other: PlayerAction) {
        self.rotate_view = match (self.rotate_view, other.rotate_view) {
            (Some((x, y)), Some((dx, dy))) => Some((x + dx, y + dy)),
            (current, next) => current.or(next),
        };
        self.dig |= other.dig;
        self.log_stats |= other.log_stats;
    }
}
