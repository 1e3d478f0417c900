//! Scene nodes: a transform, its cached matrices, and weak links to the rest of the forest.

use cgmath::{
    InnerSpace, Matrix, Matrix3, Matrix4, One, Quaternion, Vector3, VectorSpace, Zero,
};

use crate::core::{StResource, StWeak};

/// Shared handle to a node. Whoever holds one keeps the node alive.
pub type SceneNodeHandle = StResource<SceneNode>;
/// Non-owning link to a node.
pub type WeakSceneNode = StWeak<SceneNode>;

/// The last two fixed-step snapshots of a value.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Interpolated<T> {
    /// Snapshot before the latest fixed step.
    pub previous: T,
    /// Snapshot after the latest fixed step.
    pub current: T,
}

impl<T: Copy> Interpolated<T> {
    /// Both snapshots equal to `value`.
    pub fn settled(value: T) -> Self {
        Self {
            previous: value,
            current: value,
        }
    }

    /// Shifts `current` into `previous` and stores `value` as the new current snapshot.
    pub fn push(&mut self, value: T) {
        self.previous = self.current;
        self.current = value;
    }
}

/// A transform in the scene forest.
///
/// `absolute_transform` is `parent.absolute_transform * local_transform` once the graph has
/// been updated, or `local_transform` for roots. Setters only raise dirty flags; the
/// matrices are recomputed by `SceneGraph::update_all`.
pub struct SceneNode {
    pub(super) name: String,

    pub(super) location: Vector3<f32>,
    pub(super) scale: Vector3<f32>,
    pub(super) orientation: Quaternion<f32>,

    pub(super) local_transform: Matrix4<f32>,
    pub(super) absolute_transform: Matrix4<f32>,

    pub(super) needs_local_update: bool,
    pub(super) needs_global_update: bool,
    pub(super) updated_this_frame: bool,

    pub(super) parent: Option<WeakSceneNode>,
    pub(super) children: Vec<WeakSceneNode>,

    pub(super) location_snapshots: Option<Interpolated<Vector3<f32>>>,
    pub(super) scale_snapshots: Option<Interpolated<Vector3<f32>>>,
    pub(super) orientation_snapshots: Option<Interpolated<Quaternion<f32>>>,

    /// Apply the parent's translation.
    pub inherit_location: bool,
    /// Apply the parent's scale.
    pub inherit_scale: bool,
    /// Apply the parent's rotation.
    pub inherit_orientation: bool,
}

impl SceneNode {
    /// Creates an identity node with no links.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: Vector3::zero(),
            scale: Vector3::new(1.0, 1.0, 1.0),
            orientation: Quaternion::one(),
            local_transform: Matrix4::one(),
            absolute_transform: Matrix4::one(),
            needs_local_update: true,
            needs_global_update: true,
            updated_this_frame: false,
            parent: None,
            children: Vec::new(),
            location_snapshots: None,
            scale_snapshots: None,
            orientation_snapshots: None,
            inherit_location: true,
            inherit_scale: true,
            inherit_orientation: true,
        }
    }

    /// Debug name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Translation relative to the parent.
    pub fn location(&self) -> Vector3<f32> {
        self.location
    }

    /// Per-axis scale relative to the parent.
    pub fn scale(&self) -> Vector3<f32> {
        self.scale
    }

    /// Rotation relative to the parent.
    pub fn orientation(&self) -> Quaternion<f32> {
        self.orientation
    }

    /// Sets the translation and marks the node dirty.
    pub fn set_location(&mut self, location: Vector3<f32>) {
        self.location = location;
        self.needs_local_update = true;
    }

    /// Sets the scale and marks the node dirty.
    pub fn set_scale(&mut self, scale: Vector3<f32>) {
        self.scale = scale;
        self.needs_local_update = true;
    }

    /// Sets the rotation and marks the node dirty.
    pub fn set_orientation(&mut self, orientation: Quaternion<f32>) {
        self.orientation = orientation;
        self.needs_local_update = true;
    }

    /// Cached `T * S * R` of this node.
    pub fn local_transform(&self) -> Matrix4<f32> {
        self.local_transform
    }

    /// Cached transform from node space to world space.
    pub fn absolute_transform(&self) -> Matrix4<f32> {
        self.absolute_transform
    }

    /// World-space position of the node origin.
    pub fn absolute_location(&self) -> Vector3<f32> {
        self.absolute_transform.w.truncate()
    }

    /// Whether the local transform is stale.
    pub fn needs_local_update(&self) -> bool {
        self.needs_local_update
    }

    /// Whether the absolute transform is stale.
    pub fn needs_global_update(&self) -> bool {
        self.needs_global_update
    }

    /// Forces the absolute transform to be recomputed.
    pub fn invalidate_global(&mut self) {
        self.needs_global_update = true;
    }

    /// Whether the last graph update visited this node.
    pub fn updated_this_frame(&self) -> bool {
        self.updated_this_frame
    }

    /// Link to the parent, if one was set and is still alive.
    pub fn parent(&self) -> Option<SceneNodeHandle> {
        self.parent.as_ref().and_then(StWeak::upgrade)
    }

    /// Live children.
    pub fn children(&self) -> Vec<SceneNodeHandle> {
        self.children.iter().filter_map(StWeak::upgrade).collect()
    }

    /// Records a new fixed-step location snapshot.
    pub fn push_location(&mut self, location: Vector3<f32>) {
        match &mut self.location_snapshots {
            Some(snapshots) => snapshots.push(location),
            None => self.location_snapshots = Some(Interpolated::settled(location)),
        }
    }

    /// Records a new fixed-step scale snapshot.
    pub fn push_scale(&mut self, scale: Vector3<f32>) {
        match &mut self.scale_snapshots {
            Some(snapshots) => snapshots.push(scale),
            None => self.scale_snapshots = Some(Interpolated::settled(scale)),
        }
    }

    /// Records a new fixed-step orientation snapshot.
    pub fn push_orientation(&mut self, orientation: Quaternion<f32>) {
        match &mut self.orientation_snapshots {
            Some(snapshots) => snapshots.push(orientation),
            None => self.orientation_snapshots = Some(Interpolated::settled(orientation)),
        }
    }

    /// Location snapshots, if any were pushed.
    pub fn location_snapshots(&self) -> Option<Interpolated<Vector3<f32>>> {
        self.location_snapshots
    }

    /// Blends every snapshot pair at `alpha` and writes the result into the transform.
    ///
    /// The node is only marked dirty when a blended value differs from the current one.
    pub fn apply_interpolation(&mut self, alpha: f32) {
        if let Some(snapshots) = self.location_snapshots {
            let location = snapshots.previous.lerp(snapshots.current, alpha);
            if location != self.location {
                self.set_location(location);
            }
        }
        if let Some(snapshots) = self.scale_snapshots {
            let scale = snapshots.previous.lerp(snapshots.current, alpha);
            if scale != self.scale {
                self.set_scale(scale);
            }
        }
        if let Some(snapshots) = self.orientation_snapshots {
            let orientation = snapshots.previous.slerp(snapshots.current, alpha);
            if orientation != self.orientation {
                self.set_orientation(orientation);
            }
        }
    }

    /// `T * S * R` from the current location, scale and orientation.
    pub(super) fn compose_local(&self) -> Matrix4<f32> {
        Matrix4::from_translation(self.location)
            * Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
            * Matrix4::from(self.orientation)
    }

    /// The part of the parent's absolute transform this node inherits.
    pub(super) fn inherited(&self, parent_absolute: Matrix4<f32>) -> Matrix4<f32> {
        if self.inherit_location && self.inherit_scale && self.inherit_orientation {
            return parent_absolute;
        }

        let (translation, scale, rotation) = decompose(parent_absolute);
        let mut inherited = Matrix4::one();
        if self.inherit_location {
            inherited = inherited * Matrix4::from_translation(translation);
        }
        if self.inherit_scale {
            inherited = inherited * Matrix4::from_nonuniform_scale(scale.x, scale.y, scale.z);
        }
        if self.inherit_orientation {
            inherited = inherited * Matrix4::from(rotation);
        }
        inherited
    }
}

/// Splits an affine `T * S * R` matrix into its parts.
fn decompose(matrix: Matrix4<f32>) -> (Vector3<f32>, Vector3<f32>, Quaternion<f32>) {
    let translation = matrix.w.truncate();
    let linear = Matrix3::from_cols(
        matrix.x.truncate(),
        matrix.y.truncate(),
        matrix.z.truncate(),
    );

    // T * S * R puts the scale on the rows of the linear part.
    let rows = linear.transpose();
    let scale = Vector3::new(rows.x.magnitude(), rows.y.magnitude(), rows.z.magnitude());
    if scale.x == 0.0 || scale.y == 0.0 || scale.z == 0.0 {
        return (translation, scale, Quaternion::one());
    }

    let rotation = Matrix3::from_cols(rows.x / scale.x, rows.y / scale.y, rows.z / scale.z)
        .transpose();
    (translation, scale, Quaternion::from(rotation).normalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{Deg, Rotation3, SquareMatrix};

    fn approx_eq(a: Matrix4<f32>, b: Matrix4<f32>) -> bool {
        let a: &[f32; 16] = a.as_ref();
        let b: &[f32; 16] = b.as_ref();
        a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() < 1e-4)
    }

    #[test]
    fn setters_only_raise_flags() {
        let mut node = SceneNode::new("probe");
        node.needs_local_update = false;
        node.needs_global_update = false;
        node.set_location(Vector3::new(1.0, 2.0, 3.0));
        assert!(node.needs_local_update());
        assert_eq!(node.local_transform(), Matrix4::one());
    }

    #[test]
    fn local_transform_is_translation_scale_rotation() {
        let mut node = SceneNode::new("probe");
        node.set_location(Vector3::new(1.0, 0.0, 0.0));
        node.set_scale(Vector3::new(2.0, 2.0, 2.0));
        node.set_orientation(Quaternion::from_angle_z(Deg(90.0)));

        let expected = Matrix4::from_translation(Vector3::new(1.0, 0.0, 0.0))
            * Matrix4::from_scale(2.0)
            * Matrix4::from_angle_z(Deg(90.0));
        assert!(approx_eq(node.compose_local(), expected));
    }

    #[test]
    fn decompose_recovers_parts() {
        let rotation = Quaternion::from_angle_x(Deg(30.0));
        let matrix = Matrix4::from_translation(Vector3::new(4.0, -2.0, 1.0))
            * Matrix4::from_nonuniform_scale(2.0, 3.0, 4.0)
            * Matrix4::from(rotation);

        let (translation, scale, recovered) = decompose(matrix);
        assert_eq!(translation, Vector3::new(4.0, -2.0, 1.0));
        assert!((scale - Vector3::new(2.0, 3.0, 4.0)).magnitude() < 1e-4);
        assert!(approx_eq(Matrix4::from(recovered), Matrix4::from(rotation)));
        assert!(Matrix4::from(recovered).is_invertible());
    }

    #[test]
    fn interpolation_blends_snapshots() {
        let mut node = SceneNode::new("probe");
        node.push_location(Vector3::new(0.0, 0.0, 0.0));
        node.push_location(Vector3::new(10.0, 0.0, 0.0));
        node.needs_local_update = false;

        node.apply_interpolation(0.25);
        assert_eq!(node.location(), Vector3::new(2.5, 0.0, 0.0));
        assert!(node.needs_local_update());

        node.needs_local_update = false;
        node.apply_interpolation(0.25);
        assert!(!node.needs_local_update());
    }
}
