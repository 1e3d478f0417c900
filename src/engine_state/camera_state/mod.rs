//! # Camera State Management
//!
//! The camera rig follows the local player.
//!
//! The player is a dynamic capsule in the physics world. After every fixed step its transform
//! is copied into the player scene node as a new snapshot; the camera node hangs below the
//! player node at eye height, so the interpolated scene graph update places the camera
//! between the last two physics states. The eye orbits that point at a fixed distance.
//!
//! ## Core Components
//! - `CameraRig`: player body, scene nodes, orbit angles and projection
//! - `camera::Pov` / `camera::Projection`: the matrix math

use cgmath::{Deg, EuclideanSpace, Matrix4, Point3, Vector3};
use log::{debug, info};

use crate::config::{CameraConfig, PlayerConfig};

use super::{
    physics::{
        convert::{from_physics, quaternion_from_physics, to_physics},
        BodyHandle, PhysicsTransform, PhysicsWorld, RaycastHit, Shape, ACTOR_GROUP, WORLD_GROUP,
    },
    scene::{SceneGraph, SceneNodeHandle},
};

pub mod camera;

use camera::{OrbitAngles, Pov, Projection};

/// Height of the eye above the player's body origin, in world units.
pub const EYE_HEIGHT: f32 = 0.8;

/// How far past the orbit target the block picker reaches.
pub const PICK_REACH: f32 = 32.0;

/// Player body, the nodes that follow it and the eye looking at them.
pub struct CameraRig {
    pov: Pov,
    projection: Projection,
    orbit: OrbitAngles,
    orbit_distance: f32,
    mouse_sensitivity: f32,
    player_body: BodyHandle,
    player_node: SceneNodeHandle,
    camera_node: SceneNodeHandle,
}

impl CameraRig {
    /// Spawns the player capsule and the nodes that track it.
    ///
    /// # Arguments
    /// * `player` - Spawn point and capsule dimensions
    /// * `camera` - Projection and orbit settings
    /// * `physics` - World the capsule is added to
    /// * `scene` - Graph the player and camera nodes are registered in
    /// * `aspect` - Initial surface aspect ratio
    pub fn spawn(
        player: &PlayerConfig,
        camera: &CameraConfig,
        physics: &mut PhysicsWorld,
        scene: &mut SceneGraph,
        aspect: f32,
    ) -> Self {
        let spawn = Vector3::from(player.spawn);
        let player_body = physics.add_dynamic_body(
            Shape::Capsule {
                radius: player.radius,
                height: player.height,
            },
            PhysicsTransform::from_origin(to_physics(spawn)),
            player.mass,
            ACTOR_GROUP,
            WORLD_GROUP,
        );

        let player_node = scene.create_node("player");
        player_node.get_mut().push_location(spawn);

        let camera_node = scene.create_node("camera");
        camera_node
            .get_mut()
            .set_location(Vector3::new(0.0, 0.0, EYE_HEIGHT));
        SceneGraph::set_parent(&camera_node, Some(&player_node));

        info!("Spawned player at {:?}", player.spawn);

        let orbit = OrbitAngles::new(Deg(-90.0), Deg(30.0));
        let target = Point3::from_vec(spawn + Vector3::new(0.0, 0.0, EYE_HEIGHT));
        let eye = target + orbit.offset_direction() * camera.orbit_distance;

        Self {
            pov: Pov::new(eye, target),
            projection: Projection::new(
                aspect,
                Deg(camera.field_of_view_degrees),
                camera.near,
                camera.far,
            ),
            orbit,
            orbit_distance: camera.orbit_distance,
            mouse_sensitivity: camera.mouse_sensitivity,
            player_body,
            player_node,
            camera_node,
        }
    }

    /// Copies the player body's state into the player node as a new snapshot.
    ///
    /// Runs after every fixed physics step.
    pub fn capture_fixed_step(&self, physics: &PhysicsWorld) {
        let Some(transform) = physics.body_transform(self.player_body) else {
            return;
        };
        let mut node = self.player_node.get_mut();
        node.push_location(from_physics(transform.origin));
        node.push_orientation(quaternion_from_physics(transform.rotation));
    }

    /// Turns the orbit by a mouse delta in pixels.
    pub fn intake_mouse_motion(&mut self, dx: f64, dy: f64) {
        self.orbit
            .rotate(dx as f32, dy as f32, self.mouse_sensitivity);
    }

    /// Moves the eye around the camera node's interpolated position.
    ///
    /// Must run after the scene graph update of the frame.
    pub fn update_view(&mut self) {
        let target = Point3::from_vec(self.camera_node.get().absolute_location());
        self.pov.target = target;
        self.pov.eye = target + self.orbit.offset_direction() * self.orbit_distance;
    }

    /// Combined projection and view matrix.
    pub fn view_projection(&self) -> Matrix4<f32> {
        self.projection.calc_matrix() * self.pov.calc_matrix()
    }

    /// Adapts the projection to a new surface aspect ratio.
    pub fn resize(&mut self, aspect: f32) {
        self.projection.set_aspect(aspect);
    }

    /// First voxel body along the view ray.
    pub fn targeted_block(&self, physics: &PhysicsWorld) -> Option<RaycastHit> {
        let from = self.pov.eye.to_vec();
        let to = from + self.pov.direction() * (self.orbit_distance + PICK_REACH);
        physics.raycast_filtered(to_physics(from), to_physics(to), WORLD_GROUP)
    }

    /// Grid cell of the voxel under the view ray, if the ray hits one inside the grid.
    pub fn targeted_cell(&self, physics: &PhysicsWorld, edge: usize) -> Option<Point3<usize>> {
        let hit = self.targeted_block(physics)?;
        // Step half a voxel into the face that was entered to land on the voxel centre side.
        let inside = from_physics(hit.point - hit.normal * 0.5);
        let cell = [inside.x.round(), inside.y.round(), inside.z.round()];
        if cell.iter().any(|&c| c < 0.0 || c >= edge as f32) {
            debug!("Picked point {:?} lies outside the grid", inside);
            return None;
        }
        Some(Point3::new(cell[0] as usize, cell[1] as usize, cell[2] as usize))
    }

    /// Current point of view.
    pub fn pov(&self) -> &Pov {
        &self.pov
    }

    /// Current projection.
    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    /// Current orbit angles.
    pub fn orbit(&self) -> OrbitAngles {
        self.orbit
    }

    /// The player's physics body.
    pub fn player_body(&self) -> BodyHandle {
        self.player_body
    }

    /// Node tracking the player body.
    pub fn player_node(&self) -> &SceneNodeHandle {
        &self.player_node
    }

    /// Node the eye orbits around.
    pub fn camera_node(&self) -> &SceneNodeHandle {
        &self.camera_node
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{InnerSpace, Vector3};

    use crate::config::EngineConfig;
    use crate::engine_state::voxels::{
        block::block_type::BlockType,
        chunk::{generation::GeneratorKind, Chunk},
    };
    use crate::engine_state::rendering::meshing::ChunkMesher;

    fn rig_over_floor(spawn: [f32; 3]) -> (CameraRig, PhysicsWorld, SceneGraph, Chunk) {
        let mut config = EngineConfig::default();
        config.player.spawn = spawn;

        let mut physics = PhysicsWorld::default();
        let mut scene = SceneGraph::new();
        let mut chunk = Chunk::generate(8, GeneratorKind::SOLID.build(0, BlockType::STONE).as_ref());
        let mut mesher = ChunkMesher::new();
        mesher.generate(&chunk);
        mesher.attach_collision_bodies(&mut chunk, &mut physics);

        let rig = CameraRig::spawn(&config.player, &config.camera, &mut physics, &mut scene, 1.0);
        (rig, physics, scene, chunk)
    }

    #[test]
    fn spawn_places_the_nodes_above_the_body() {
        let (mut rig, _physics, mut scene, _chunk) = rig_over_floor([4.0, 4.0, 12.0]);
        scene.update(1.0);
        rig.update_view();

        assert_eq!(
            rig.player_node().get().absolute_location(),
            Vector3::new(4.0, 4.0, 12.0)
        );
        assert_eq!(rig.pov().target, Point3::new(4.0, 4.0, 12.0 + EYE_HEIGHT));
        assert!(((rig.pov().eye - rig.pov().target).magnitude() - 12.0).abs() < 1e-4);
    }

    #[test]
    fn fixed_steps_feed_the_player_snapshots() {
        let (rig, mut physics, _scene, _chunk) = rig_over_floor([4.0, 4.0, 12.0]);
        physics.step(0.1);
        rig.capture_fixed_step(&physics);

        let snapshots = rig
            .player_node()
            .get()
            .location_snapshots()
            .expect("spawn pushed a snapshot");
        assert_eq!(snapshots.previous, Vector3::new(4.0, 4.0, 12.0));
        assert!(snapshots.current.z < 12.0);
        assert_eq!(snapshots.current.x, 4.0);
        assert_eq!(snapshots.current.y, 4.0);
    }

    #[test]
    fn the_view_ray_picks_the_block_under_a_downward_eye() {
        let (mut rig, physics, mut scene, chunk) = rig_over_floor([3.0, 3.0, 12.0]);
        rig.orbit = OrbitAngles::new(Deg(0.0), Deg(89.0));
        scene.update(1.0);
        rig.update_view();

        let cell = rig
            .targeted_cell(&physics, chunk.edge())
            .expect("looking straight down at a solid grid");
        assert_eq!(cell.z, 7);
        assert!((cell.x as i32 - 3).abs() <= 1);
        assert_eq!(cell.y, 3);
    }

    #[test]
    fn mouse_motion_turns_the_orbit() {
        let (mut rig, ..) = rig_over_floor([4.0, 4.0, 12.0]);
        let before = rig.orbit();
        rig.intake_mouse_motion(100.0, 0.0);
        assert!(rig.orbit().yaw != before.yaw);
        assert_eq!(rig.orbit().pitch, before.pitch);
    }
}
