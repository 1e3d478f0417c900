//! # Scene Graph
//!
//! A forest of transform nodes with parent-relative transforms.
//!
//! Nodes are shared through [`SceneNodeHandle`]s owned by game code (the camera rig, for
//! instance). The graph itself and every parent/child link only hold weak references, so
//! dropping the last strong handle destroys a node. Dead links are skipped during traversal,
//! and a node whose parent died becomes a root on the next update.
//!
//! ## Update order
//!
//! [`SceneGraph::update_all`] visits the registered nodes in any order. Before a node does
//! any work it walks up and finishes its parent, so ancestors are always final before their
//! descendants read them. No lock guard is held across a recursive call.

use cgmath::Vector3;

use crate::core::{StResource, StWeak};

pub mod node;

pub use node::{Interpolated, SceneNode, SceneNodeHandle, WeakSceneNode};

/// Registry of every node that takes part in per-frame updates.
#[derive(Default)]
pub struct SceneGraph {
    nodes: Vec<WeakSceneNode>,
}

impl SceneGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a root node and registers it.
    pub fn create_node(&mut self, name: impl Into<String>) -> SceneNodeHandle {
        let node = StResource::new(SceneNode::new(name));
        self.register(&node);
        node
    }

    /// Adds an existing node to the per-frame updates.
    pub fn register(&mut self, node: &SceneNodeHandle) {
        if !self.nodes.iter().any(|known| known.points_to(node)) {
            self.nodes.push(node.downgrade());
        }
    }

    /// Number of registered nodes that are still alive.
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|node| !node.is_expired()).count()
    }

    /// Whether no registered node is alive.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forgets registry entries whose node was dropped.
    pub fn prune(&mut self) {
        self.nodes.retain(|node| !node.is_expired());
    }

    fn live_nodes(&self) -> Vec<SceneNodeHandle> {
        self.nodes.iter().filter_map(StWeak::upgrade).collect()
    }

    /// Links `child` under `parent`, or detaches it with `None`.
    ///
    /// # Panics
    /// Panics if the link would make `child` its own ancestor.
    pub fn set_parent(child: &SceneNodeHandle, parent: Option<&SceneNodeHandle>) {
        if let Some(parent) = parent {
            let mut ancestor = Some(parent.clone());
            while let Some(node) = ancestor {
                assert!(
                    !node.ptr_eq(child),
                    "parenting '{}' would create a cycle",
                    child.get().name()
                );
                ancestor = node.get().parent();
            }
        }

        let previous = child.get_mut().parent.take();
        if let Some(previous) = previous.and_then(|weak| weak.upgrade()) {
            previous
                .get_mut()
                .children
                .retain(|sibling| !sibling.points_to(child) && !sibling.is_expired());
        }

        if let Some(parent) = parent {
            parent.get_mut().children.push(child.downgrade());
            child.get_mut().parent = Some(parent.downgrade());
        }
        child.get_mut().needs_global_update = true;
    }

    /// Blends every node's snapshots at `alpha`.
    pub fn apply_interpolation(&mut self, alpha: f32) {
        for node in self.live_nodes() {
            node.get_mut().apply_interpolation(alpha);
        }
    }

    /// Recomputes every stale transform exactly once.
    ///
    /// Afterwards no node reachable from the registry has a dirty flag set, including
    /// unregistered nodes linked to a registered one.
    pub fn update_all(&mut self) {
        self.prune();
        let nodes = self.live_nodes();

        let mut roots: Vec<SceneNodeHandle> = Vec::new();
        for node in &nodes {
            let root = Self::root_of(node);
            if !roots.iter().any(|known| known.ptr_eq(&root)) {
                roots.push(root);
            }
        }
        for root in &roots {
            Self::clear_frame_marks(root);
        }

        for node in &nodes {
            Self::update_node(node);
        }
    }

    fn root_of(node: &SceneNodeHandle) -> SceneNodeHandle {
        let mut current = node.clone();
        loop {
            let parent = current.get().parent();
            match parent {
                Some(parent) => current = parent,
                None => return current,
            }
        }
    }

    fn clear_frame_marks(node: &SceneNodeHandle) {
        let children = {
            let mut guard = node.get_mut();
            guard.updated_this_frame = false;
            guard.children()
        };
        for child in &children {
            Self::clear_frame_marks(child);
        }
    }

    /// Interpolation followed by propagation, the per-frame entry point.
    pub fn update(&mut self, alpha: f32) {
        self.apply_interpolation(alpha);
        self.update_all();
    }

    fn update_node(node: &SceneNodeHandle) {
        if node.get().updated_this_frame {
            return;
        }

        let parent = {
            let mut guard = node.get_mut();
            let link = guard.parent.as_ref().map(StWeak::upgrade);
            match link {
                Some(Some(parent)) => Some(parent),
                Some(None) => {
                    guard.parent = None;
                    guard.needs_global_update = true;
                    None
                }
                None => None,
            }
        };

        if let Some(parent) = &parent {
            Self::update_node(parent);
        }
        if node.get().updated_this_frame {
            return;
        }

        let parent_absolute = parent.as_ref().map(|parent| parent.get().absolute_transform);
        let (changed, children) = {
            let mut guard = node.get_mut();
            guard.updated_this_frame = true;
            let mut changed = false;

            if guard.needs_local_update {
                guard.local_transform = guard.compose_local();
                guard.needs_local_update = false;
                guard.needs_global_update = true;
                changed = true;
            }
            if guard.needs_global_update {
                guard.absolute_transform = match parent_absolute {
                    Some(parent_absolute) => guard.inherited(parent_absolute) * guard.local_transform,
                    None => guard.local_transform,
                };
                guard.needs_global_update = false;
                changed = true;
            }

            guard.children.retain(|child| !child.is_expired());
            let children: Vec<SceneNodeHandle> =
                guard.children.iter().filter_map(StWeak::upgrade).collect();
            (changed, children)
        };

        for child in &children {
            if changed {
                child.get_mut().needs_global_update = true;
            }
            Self::update_node(child);
        }
    }
}

/// World-space position of a node after the last update.
pub fn absolute_location(node: &SceneNodeHandle) -> Vector3<f32> {
    node.get().absolute_location()
}
