//! Rigid bodies, their collision shapes and axis-aligned bounds.

use cgmath::{Matrix3, One, Quaternion, Vector3, Zero};

/// Collision shape of a body, centred on the body origin. All extents are in physics space.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Shape {
    /// Box with the given half extents.
    Box {
        /// Half of the box size along each axis.
        half_extents: Vector3<f32>,
    },
    /// Sphere.
    Sphere {
        /// Sphere radius.
        radius: f32,
    },
    /// Capsule along the local Y axis. `height` is the length of the cylindrical part.
    Capsule {
        /// Radius of the caps and cylinder.
        radius: f32,
        /// Length of the cylindrical part.
        height: f32,
    },
}

impl Shape {
    /// Unit voxel: a box with half extent 0.5.
    pub fn voxel() -> Self {
        Shape::Box {
            half_extents: Vector3::new(0.5, 0.5, 0.5),
        }
    }

    /// Half extents of the shape's local bounding box.
    pub fn local_half_extents(&self) -> Vector3<f32> {
        match *self {
            Shape::Box { half_extents } => half_extents,
            Shape::Sphere { radius } => Vector3::new(radius, radius, radius),
            Shape::Capsule { radius, height } => {
                Vector3::new(radius, height * 0.5 + radius, radius)
            }
        }
    }
}

/// Position and rotation of a body in physics space.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PhysicsTransform {
    /// Body origin.
    pub origin: Vector3<f32>,
    /// Body rotation.
    pub rotation: Quaternion<f32>,
}

impl PhysicsTransform {
    /// Transform at `origin` without rotation.
    pub fn from_origin(origin: Vector3<f32>) -> Self {
        Self {
            origin,
            rotation: Quaternion::one(),
        }
    }
}

/// Axis-aligned bounding box.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb {
    /// Minimum corner.
    pub min: Vector3<f32>,
    /// Maximum corner.
    pub max: Vector3<f32>,
}

impl Aabb {
    /// Box around `centre` with the given half extents.
    pub fn from_centre(centre: Vector3<f32>, half_extents: Vector3<f32>) -> Self {
        Self {
            min: centre - half_extents,
            max: centre + half_extents,
        }
    }

    /// Strict overlap test; touching boxes do not overlap.
    pub fn overlaps(&self, other: &Aabb) -> bool {
        (0..3).all(|axis| self.min[axis] < other.max[axis] && other.min[axis] < self.max[axis])
    }

    /// Smallest move that takes `self` out of `other`.
    ///
    /// # Returns
    /// The axis and the signed distance to move `self` along it, or `None` if the boxes do
    /// not overlap
    pub fn penetration(&self, other: &Aabb) -> Option<(usize, f32)> {
        if !self.overlaps(other) {
            return None;
        }

        let mut best: Option<(usize, f32)> = None;
        for axis in 0..3 {
            let depth = self.max[axis].min(other.max[axis]) - self.min[axis].max(other.min[axis]);
            if best.is_some_and(|(_, current)| current.abs() <= depth) {
                continue;
            }
            let own_centre = self.min[axis] + self.max[axis];
            let other_centre = other.min[axis] + other.max[axis];
            let push = if own_centre < other_centre {
                other.min[axis] - self.max[axis]
            } else {
                other.max[axis] - self.min[axis]
            };
            best = Some((axis, push));
        }
        best
    }

    /// Intersection of the segment `from + t * (to - from)`, `t` in `[0, 1]`, with the box.
    ///
    /// # Returns
    /// The entry fraction and the outward normal of the entered face, or `None` if the segment
    /// misses. A segment starting inside the box reports fraction 0 and a zero normal.
    pub fn segment_intersection(
        &self,
        from: Vector3<f32>,
        to: Vector3<f32>,
    ) -> Option<(f32, Vector3<f32>)> {
        let direction = to - from;
        let mut t_enter = 0.0f32;
        let mut t_exit = 1.0f32;
        let mut normal = Vector3::zero();

        for axis in 0..3 {
            if direction[axis].abs() < f32::EPSILON {
                if from[axis] < self.min[axis] || from[axis] > self.max[axis] {
                    return None;
                }
                continue;
            }

            let inverse = 1.0 / direction[axis];
            let mut t_near = (self.min[axis] - from[axis]) * inverse;
            let mut t_far = (self.max[axis] - from[axis]) * inverse;
            let mut sign = -1.0;
            if t_near > t_far {
                std::mem::swap(&mut t_near, &mut t_far);
                sign = 1.0;
            }

            if t_near > t_enter {
                t_enter = t_near;
                normal = Vector3::zero();
                normal[axis] = sign;
            }
            t_exit = t_exit.min(t_far);
            if t_enter > t_exit {
                return None;
            }
        }

        Some((t_enter, normal))
    }
}

/// Whether a body is moved by the simulation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BodyKind {
    /// Zero mass, never moves.
    Static,
    /// Integrated every step.
    Dynamic,
}

/// A body registered with the physics world.
#[derive(Clone, Debug)]
pub struct RigidBody {
    /// Collision shape.
    pub shape: Shape,
    /// Current transform.
    pub transform: PhysicsTransform,
    /// Linear velocity, always zero for static bodies.
    pub linear_velocity: Vector3<f32>,
    /// Mass, zero for static bodies.
    pub mass: f32,
    /// Static or dynamic.
    pub kind: BodyKind,
    /// Groups this body belongs to.
    pub group: u32,
    /// Groups this body collides with.
    pub mask: u32,
    /// Set when the last step stopped the body while it moved against gravity's direction.
    pub grounded: bool,
}

impl RigidBody {
    /// World-aligned bounds of the body's shape at its current transform.
    pub fn aabb(&self) -> Aabb {
        let local = self.shape.local_half_extents();
        let rotation = Matrix3::from(self.transform.rotation);
        let half_extents = Vector3::new(
            rotation.x.x.abs() * local.x + rotation.y.x.abs() * local.y + rotation.z.x.abs() * local.z,
            rotation.x.y.abs() * local.x + rotation.y.y.abs() * local.y + rotation.z.y.abs() * local.z,
            rotation.x.z.abs() * local.x + rotation.y.z.abs() * local.y + rotation.z.z.abs() * local.z,
        );
        Aabb::from_centre(self.transform.origin, half_extents)
    }

    /// Group/mask filter: both bodies must accept each other.
    pub fn collides_with(&self, other: &RigidBody) -> bool {
        (self.group & other.mask) != 0 && (other.group & self.mask) != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{Deg, Rotation3};

    #[test]
    fn capsule_bounds_include_the_caps() {
        let capsule = Shape::Capsule {
            radius: 0.4,
            height: 2.0,
        };
        assert_eq!(capsule.local_half_extents(), Vector3::new(0.4, 1.4, 0.4));
    }

    #[test]
    fn rotated_box_bounds_swap_axes() {
        let body = RigidBody {
            shape: Shape::Box {
                half_extents: Vector3::new(2.0, 0.5, 0.5),
            },
            transform: PhysicsTransform {
                origin: Vector3::zero(),
                rotation: Quaternion::from_angle_y(Deg(90.0)),
            },
            linear_velocity: Vector3::zero(),
            mass: 0.0,
            kind: BodyKind::Static,
            group: 1,
            mask: 2,
            grounded: false,
        };
        let aabb = body.aabb();
        assert!((aabb.max.x - 0.5).abs() < 1e-5);
        assert!((aabb.max.z - 2.0).abs() < 1e-5);
    }

    #[test]
    fn segment_enters_through_the_near_face() {
        let aabb = Aabb::from_centre(Vector3::new(0.0, 0.0, 0.0), Vector3::new(0.5, 0.5, 0.5));
        let (fraction, normal) = aabb
            .segment_intersection(Vector3::new(0.0, 5.5, 0.0), Vector3::new(0.0, -4.5, 0.0))
            .unwrap();
        assert!((fraction - 0.5).abs() < 1e-6);
        assert_eq!(normal, Vector3::unit_y());

        assert!(aabb
            .segment_intersection(Vector3::new(2.0, 5.0, 0.0), Vector3::new(2.0, -5.0, 0.0))
            .is_none());
        assert!(aabb
            .segment_intersection(Vector3::new(0.0, 5.0, 0.0), Vector3::new(0.0, 1.0, 0.0))
            .is_none());
    }

    #[test]
    fn penetration_picks_the_shallowest_axis() {
        let wall = Aabb::from_centre(Vector3::zero(), Vector3::new(0.5, 0.5, 0.5));
        let right = Aabb::from_centre(Vector3::new(0.9, 0.2, 0.0), Vector3::new(0.5, 0.5, 0.5));
        let (axis, push) = right.penetration(&wall).unwrap();
        assert_eq!(axis, 0);
        assert!((push - 0.1).abs() < 1e-6);

        let below = Aabb::from_centre(Vector3::new(0.0, -0.7, 0.1), Vector3::new(0.5, 0.5, 0.5));
        let (axis, push) = below.penetration(&wall).unwrap();
        assert_eq!(axis, 1);
        assert!((push + 0.3).abs() < 1e-6);

        let apart = Aabb::from_centre(Vector3::new(1.0, 0.0, 0.0), Vector3::new(0.5, 0.5, 0.5));
        assert!(apart.penetration(&wall).is_none());
    }
}
