//! # Physics
//!
//! A small rigid-body world in Y-up physics space. Static bodies never move; dynamic bodies
//! fall under gravity and are stopped by static bodies one axis at a time, then pushed out of
//! any static body they still overlap along the axis of least penetration. Rotation is not
//! integrated.
//!
//! Game code lives in Z-up world space; [`convert`] holds the axis remap that every value
//! crossing into or out of this module goes through.
//!
//! ## Collision filtering
//!
//! Two bodies interact only when each one's group is in the other's mask. Voxel geometry
//! is registered in [`WORLD_GROUP`] and actors in [`ACTOR_GROUP`], so raycasts can tell ground
//! from movable entities.

use cgmath::{InnerSpace, Vector3, Zero};
use log::debug;

pub mod body;
pub mod convert;

pub use body::{Aabb, BodyKind, PhysicsTransform, RigidBody, Shape};

/// Collision group of static voxel geometry.
pub const WORLD_GROUP: u32 = 1;
/// Collision group of dynamic actors.
pub const ACTOR_GROUP: u32 = 2;
/// Default gravity in physics space.
pub const DEFAULT_GRAVITY: [f32; 3] = [0.0, -10.0, 0.0];

/// Generational handle to a body in a [`PhysicsWorld`].
///
/// A handle outlives its body safely: once the body is removed, lookups through the old
/// handle return `None` even if the slot is reused.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct BodyHandle {
    index: u32,
    generation: u32,
}

/// Result of a successful raycast.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RaycastHit {
    /// The body that was hit.
    pub body: BodyHandle,
    /// Hit position in physics space.
    pub point: Vector3<f32>,
    /// Outward normal of the face that was entered.
    pub normal: Vector3<f32>,
    /// Position of the hit along the segment, in `[0, 1]`.
    pub fraction: f32,
}

/// Bounds, group and mask of a static body, cached between steps.
#[derive(Copy, Clone)]
struct StaticBounds {
    aabb: Aabb,
    group: u32,
    mask: u32,
}

impl StaticBounds {
    fn accepts(&self, body: &RigidBody) -> bool {
        (body.group & self.mask) != 0 && (self.group & body.mask) != 0
    }
}

struct BodySlot {
    generation: u32,
    body: Option<RigidBody>,
}

/// Container of every body in the simulation.
pub struct PhysicsWorld {
    gravity: Vector3<f32>,
    slots: Vec<BodySlot>,
    free_slots: Vec<u32>,
    body_count: usize,
    /// Rebuilt on the next step after a static body is added or removed.
    static_bounds: Option<Vec<StaticBounds>>,
}

impl PhysicsWorld {
    /// Creates an empty world.
    ///
    /// # Arguments
    /// * `gravity` - Acceleration applied to dynamic bodies, in physics space
    pub fn new(gravity: Vector3<f32>) -> Self {
        Self {
            gravity,
            slots: Vec::new(),
            free_slots: Vec::new(),
            body_count: 0,
            static_bounds: None,
        }
    }

    /// Gravity applied to dynamic bodies.
    pub fn gravity(&self) -> Vector3<f32> {
        self.gravity
    }

    /// Number of live bodies.
    pub fn body_count(&self) -> usize {
        self.body_count
    }

    /// Adds a zero-mass body that never moves.
    pub fn add_static_body(
        &mut self,
        shape: Shape,
        transform: PhysicsTransform,
        group: u32,
        mask: u32,
    ) -> BodyHandle {
        self.insert(RigidBody {
            shape,
            transform,
            linear_velocity: Vector3::zero(),
            mass: 0.0,
            kind: BodyKind::Static,
            group,
            mask,
            grounded: false,
        })
    }

    /// Adds a body integrated by [`PhysicsWorld::step`].
    ///
    /// # Panics
    /// Panics if `mass` is not positive.
    pub fn add_dynamic_body(
        &mut self,
        shape: Shape,
        transform: PhysicsTransform,
        mass: f32,
        group: u32,
        mask: u32,
    ) -> BodyHandle {
        assert!(mass > 0.0, "dynamic bodies need a positive mass");
        self.insert(RigidBody {
            shape,
            transform,
            linear_velocity: Vector3::zero(),
            mass,
            kind: BodyKind::Dynamic,
            group,
            mask,
            grounded: false,
        })
    }

    fn insert(&mut self, body: RigidBody) -> BodyHandle {
        self.body_count += 1;
        if body.kind == BodyKind::Static {
            self.static_bounds = None;
        }
        if let Some(index) = self.free_slots.pop() {
            let slot = &mut self.slots[index as usize];
            slot.body = Some(body);
            return BodyHandle {
                index,
                generation: slot.generation,
            };
        }

        self.slots.push(BodySlot {
            generation: 0,
            body: Some(body),
        });
        BodyHandle {
            index: (self.slots.len() - 1) as u32,
            generation: 0,
        }
    }

    /// Removes a body. Returns the body if the handle was still live.
    pub fn remove_body(&mut self, handle: BodyHandle) -> Option<RigidBody> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        let body = slot.body.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_slots.push(handle.index);
        self.body_count -= 1;
        if body.kind == BodyKind::Static {
            self.static_bounds = None;
        }
        Some(body)
    }

    /// Looks up a live body.
    pub fn body(&self, handle: BodyHandle) -> Option<&RigidBody> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.body.as_ref())
    }

    fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut RigidBody> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.body.as_mut())
    }

    /// Current transform of a live body.
    pub fn body_transform(&self, handle: BodyHandle) -> Option<PhysicsTransform> {
        self.body(handle).map(|body| body.transform)
    }

    /// Current linear velocity of a live body.
    pub fn linear_velocity(&self, handle: BodyHandle) -> Option<Vector3<f32>> {
        self.body(handle).map(|body| body.linear_velocity)
    }

    /// Sets the velocity of a dynamic body. Static bodies ignore this.
    pub fn set_linear_velocity(&mut self, handle: BodyHandle, velocity: Vector3<f32>) {
        if let Some(body) = self.body_mut(handle) {
            if body.kind == BodyKind::Dynamic {
                body.linear_velocity = velocity;
            }
        }
    }

    /// Advances every dynamic body by `dt` seconds.
    ///
    /// Velocity is integrated first (semi-implicit Euler), then the displacement is applied
    /// one axis at a time, gravity's axis first. Whenever a move along an axis ends inside
    /// a static body the body is placed flush against it and that velocity component is
    /// zeroed. A body still overlapping a static body afterwards, for instance one a block
    /// was placed on, is pushed out along the axis of least penetration.
    pub fn step(&mut self, dt: f32) {
        let slots = &self.slots;
        let statics: &[StaticBounds] = self
            .static_bounds
            .get_or_insert_with(|| Self::collect_static_bounds(slots));

        let gravity = self.gravity;
        let gravity_axis = Self::dominant_axis(gravity);
        let axis_order = [gravity_axis, (gravity_axis + 1) % 3, (gravity_axis + 2) % 3];

        for body in self.slots.iter_mut().filter_map(|slot| slot.body.as_mut()) {
            if body.kind != BodyKind::Dynamic {
                continue;
            }

            body.linear_velocity += gravity * dt;
            body.grounded = false;

            for axis in axis_order {
                let displacement = body.linear_velocity[axis] * dt;
                if displacement == 0.0 {
                    continue;
                }
                body.transform.origin[axis] += displacement;

                let half = body.aabb().max[axis] - body.transform.origin[axis];
                for bounds in statics {
                    if !bounds.accepts(body) || !body.aabb().overlaps(&bounds.aabb) {
                        continue;
                    }

                    if displacement > 0.0 {
                        body.transform.origin[axis] = bounds.aabb.min[axis] - half;
                    } else {
                        body.transform.origin[axis] = bounds.aabb.max[axis] + half;
                    }
                    if axis == gravity_axis && displacement * gravity[axis] > 0.0 {
                        body.grounded = true;
                    }
                    body.linear_velocity[axis] = 0.0;
                }
            }

            Self::push_out(body, statics, gravity, gravity_axis);
        }
    }

    fn push_out(
        body: &mut RigidBody,
        statics: &[StaticBounds],
        gravity: Vector3<f32>,
        gravity_axis: usize,
    ) {
        for bounds in statics {
            if !bounds.accepts(body) {
                continue;
            }
            let Some((axis, push)) = body.aabb().penetration(&bounds.aabb) else {
                continue;
            };

            debug!("Pushing an embedded body {:.3} along axis {}", push, axis);
            body.transform.origin[axis] += push;
            if body.linear_velocity[axis] * push < 0.0 {
                body.linear_velocity[axis] = 0.0;
            }
            if axis == gravity_axis && push * gravity[axis] < 0.0 {
                body.grounded = true;
            }
        }
    }

    fn collect_static_bounds(slots: &[BodySlot]) -> Vec<StaticBounds> {
        slots
            .iter()
            .filter_map(|slot| slot.body.as_ref())
            .filter(|body| body.kind == BodyKind::Static)
            .map(|body| StaticBounds {
                aabb: body.aabb(),
                group: body.group,
                mask: body.mask,
            })
            .collect()
    }

    fn dominant_axis(vector: Vector3<f32>) -> usize {
        let abs = Vector3::new(vector.x.abs(), vector.y.abs(), vector.z.abs());
        if abs.x >= abs.y && abs.x >= abs.z {
            0
        } else if abs.y >= abs.z {
            1
        } else {
            2
        }
    }

    /// Finds the first body along the segment `from -> to`.
    pub fn raycast(&self, from: Vector3<f32>, to: Vector3<f32>) -> Option<RaycastHit> {
        self.raycast_filtered(from, to, u32::MAX)
    }

    /// Finds the first body along the segment whose group intersects `mask`.
    pub fn raycast_filtered(
        &self,
        from: Vector3<f32>,
        to: Vector3<f32>,
        mask: u32,
    ) -> Option<RaycastHit> {
        let mut nearest: Option<RaycastHit> = None;

        for (index, slot) in self.slots.iter().enumerate() {
            let Some(body) = &slot.body else {
                continue;
            };
            if body.group & mask == 0 {
                continue;
            }
            let Some((fraction, normal)) = body.aabb().segment_intersection(from, to) else {
                continue;
            };
            if nearest.is_some_and(|hit| hit.fraction <= fraction) {
                continue;
            }
            nearest = Some(RaycastHit {
                body: BodyHandle {
                    index: index as u32,
                    generation: slot.generation,
                },
                point: from + (to - from) * fraction,
                normal,
                fraction,
            });
        }

        if let Some(hit) = &nearest {
            debug!(
                "Raycast hit {:?} at {:?} ({:.3} along a {:.2} long segment)",
                hit.body,
                hit.point,
                hit.fraction,
                (to - from).magnitude()
            );
        }
        nearest
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new(Vector3::from(DEFAULT_GRAVITY))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn floor(world: &mut PhysicsWorld, width: i32) {
        for x in -width..=width {
            for z in -width..=width {
                world.add_static_body(
                    Shape::voxel(),
                    PhysicsTransform::from_origin(Vector3::new(x as f32, 0.0, z as f32)),
                    WORLD_GROUP,
                    ACTOR_GROUP,
                );
            }
        }
    }

    #[test]
    fn dynamic_body_lands_on_static_floor() {
        let mut world = PhysicsWorld::default();
        floor(&mut world, 2);
        let ball = world.add_dynamic_body(
            Shape::Sphere { radius: 0.5 },
            PhysicsTransform::from_origin(Vector3::new(0.2, 4.0, -0.3)),
            1.0,
            ACTOR_GROUP,
            WORLD_GROUP,
        );

        for _ in 0..300 {
            world.step(1.0 / 100.0);
        }

        let transform = world.body_transform(ball).unwrap();
        assert!((transform.origin.y - 1.0).abs() < 1e-4);
        assert!((transform.origin.x - 0.2).abs() < 1e-6);
        assert_eq!(world.linear_velocity(ball).unwrap().y, 0.0);
        assert!(world.body(ball).unwrap().grounded);
    }

    #[test]
    fn masked_out_bodies_do_not_collide() {
        let mut world = PhysicsWorld::default();
        floor(&mut world, 1);
        let ghost = world.add_dynamic_body(
            Shape::voxel(),
            PhysicsTransform::from_origin(Vector3::new(0.0, 2.0, 0.0)),
            1.0,
            ACTOR_GROUP,
            0,
        );

        for _ in 0..100 {
            world.step(1.0 / 60.0);
        }

        assert!(world.body_transform(ghost).unwrap().origin.y < -1.0);
    }

    #[test]
    fn static_bodies_never_move() {
        let mut world = PhysicsWorld::default();
        let wall = world.add_static_body(
            Shape::voxel(),
            PhysicsTransform::from_origin(Vector3::new(3.0, 3.0, 3.0)),
            WORLD_GROUP,
            ACTOR_GROUP,
        );
        world.set_linear_velocity(wall, Vector3::new(1.0, 0.0, 0.0));
        world.step(1.0);
        assert_eq!(
            world.body_transform(wall).unwrap().origin,
            Vector3::new(3.0, 3.0, 3.0)
        );
    }

    #[test]
    fn raycast_reports_the_nearest_body_and_respects_groups() {
        let mut world = PhysicsWorld::default();
        floor(&mut world, 0);
        let actor = world.add_static_body(
            Shape::voxel(),
            PhysicsTransform::from_origin(Vector3::new(0.0, 3.0, 0.0)),
            ACTOR_GROUP,
            WORLD_GROUP,
        );

        let from = Vector3::new(0.0, 10.0, 0.0);
        let to = Vector3::new(0.0, -10.0, 0.0);

        let hit = world.raycast(from, to).unwrap();
        assert_eq!(hit.body, actor);
        assert!((hit.point.y - 3.5).abs() < 1e-5);
        assert_eq!(hit.normal, Vector3::unit_y());

        let ground = world.raycast_filtered(from, to, WORLD_GROUP).unwrap();
        assert!((ground.point.y - 0.5).abs() < 1e-5);

        assert!(world
            .raycast(Vector3::new(5.0, 10.0, 0.0), Vector3::new(5.0, -10.0, 0.0))
            .is_none());
    }

    #[test]
    fn removed_handles_go_stale() {
        let mut world = PhysicsWorld::default();
        let first = world.add_static_body(
            Shape::voxel(),
            PhysicsTransform::from_origin(Vector3::zero()),
            WORLD_GROUP,
            ACTOR_GROUP,
        );
        assert!(world.remove_body(first).is_some());
        assert!(world.remove_body(first).is_none());

        let second = world.add_static_body(
            Shape::voxel(),
            PhysicsTransform::from_origin(Vector3::zero()),
            WORLD_GROUP,
            ACTOR_GROUP,
        );
        assert_ne!(first, second);
        assert!(world.body(first).is_none());
        assert!(world.body(second).is_some());
        assert_eq!(world.body_count(), 1);
    }

    #[test]
    fn embedded_bodies_are_pushed_out_sideways() {
        let mut world = PhysicsWorld::new(Vector3::zero());
        world.add_static_body(
            Shape::voxel(),
            PhysicsTransform::from_origin(Vector3::zero()),
            WORLD_GROUP,
            ACTOR_GROUP,
        );
        let actor = world.add_dynamic_body(
            Shape::voxel(),
            PhysicsTransform::from_origin(Vector3::new(0.9, 0.0, 0.0)),
            1.0,
            ACTOR_GROUP,
            WORLD_GROUP,
        );

        for _ in 0..10 {
            world.step(1.0 / 60.0);
        }

        let origin = world.body_transform(actor).unwrap().origin;
        assert!((origin.x - 1.0).abs() < 1e-5);
        assert_eq!(origin.y, 0.0);
        assert_eq!(origin.z, 0.0);
        assert!(!world.body(actor).unwrap().grounded);
    }

    #[test]
    fn a_block_placed_on_a_resting_body_lifts_it() {
        let mut world = PhysicsWorld::default();
        floor(&mut world, 1);
        let actor = world.add_dynamic_body(
            Shape::voxel(),
            PhysicsTransform::from_origin(Vector3::new(0.0, 1.0, 0.0)),
            1.0,
            ACTOR_GROUP,
            WORLD_GROUP,
        );
        world.step(1.0 / 60.0);

        world.add_static_body(
            Shape::voxel(),
            PhysicsTransform::from_origin(Vector3::new(0.0, 1.0, 0.0)),
            WORLD_GROUP,
            ACTOR_GROUP,
        );
        for _ in 0..5 {
            world.step(1.0 / 60.0);
        }

        let origin = world.body_transform(actor).unwrap().origin;
        assert!((origin.y - 2.0).abs() < 1e-4);
        assert!(world.body(actor).unwrap().grounded);
    }

    #[test]
    fn removed_static_bodies_stop_colliding() {
        let mut world = PhysicsWorld::default();
        let ground = world.add_static_body(
            Shape::voxel(),
            PhysicsTransform::from_origin(Vector3::zero()),
            WORLD_GROUP,
            ACTOR_GROUP,
        );
        let actor = world.add_dynamic_body(
            Shape::voxel(),
            PhysicsTransform::from_origin(Vector3::new(0.0, 1.5, 0.0)),
            1.0,
            ACTOR_GROUP,
            WORLD_GROUP,
        );
        for _ in 0..60 {
            world.step(1.0 / 60.0);
        }
        assert!((world.body_transform(actor).unwrap().origin.y - 1.0).abs() < 1e-4);

        world.remove_body(ground);
        for _ in 0..60 {
            world.step(1.0 / 60.0);
        }
        assert!(world.body_transform(actor).unwrap().origin.y < 0.0);
    }
}
