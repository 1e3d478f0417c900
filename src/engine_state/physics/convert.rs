//! Axis remap between world space (Z-up) and physics space (Y-up).
//!
//! `physics = (world.x, world.z, -world.y)`. Every value crossing the boundary goes through
//! these functions; applying the remap backwards inverts the gravity axis.

use cgmath::{Quaternion, Vector3};

/// World-space vector to physics space.
pub fn to_physics(world: Vector3<f32>) -> Vector3<f32> {
    Vector3::new(world.x, world.z, -world.y)
}

/// Physics-space vector to world space.
pub fn from_physics(physics: Vector3<f32>) -> Vector3<f32> {
    Vector3::new(physics.x, -physics.z, physics.y)
}

/// World-space rotation to physics space. The scalar part is unchanged and the vector part
/// follows the same remap as positions.
pub fn quaternion_to_physics(world: Quaternion<f32>) -> Quaternion<f32> {
    Quaternion::from_sv(world.s, to_physics(world.v))
}

/// Physics-space rotation to world space.
pub fn quaternion_from_physics(physics: Quaternion<f32>) -> Quaternion<f32> {
    Quaternion::from_sv(physics.s, from_physics(physics.v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{InnerSpace, Rad, Rotation, Rotation3};

    #[test]
    fn world_up_is_physics_up() {
        assert_eq!(to_physics(Vector3::unit_z()), Vector3::unit_y());
        assert_eq!(from_physics(Vector3::new(0.0, -10.0, 0.0)), Vector3::new(0.0, 0.0, -10.0));
    }

    #[test]
    fn vectors_survive_a_round_trip() {
        let world = Vector3::new(64.0, 12.5, -3.0);
        assert_eq!(from_physics(to_physics(world)), world);
        assert_eq!(to_physics(world), Vector3::new(64.0, -3.0, -12.5));
    }

    #[test]
    fn rotations_commute_with_the_remap() {
        let world_rotation = Quaternion::from_axis_angle(Vector3::unit_z(), Rad(0.7));
        let point = Vector3::new(1.0, 2.0, 3.0);

        let rotated_then_mapped = to_physics(world_rotation.rotate_vector(point));
        let mapped_then_rotated =
            quaternion_to_physics(world_rotation).rotate_vector(to_physics(point));

        assert!((rotated_then_mapped - mapped_then_rotated).magnitude() < 1e-5);
        assert_eq!(
            quaternion_from_physics(quaternion_to_physics(world_rotation)),
            world_rotation
        );
    }
}
