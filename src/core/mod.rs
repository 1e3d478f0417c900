//! # Core Module
//!
//! Shared ownership primitives used throughout the engine. Everything in the simulation runs
//! on one thread, so the handles here are `Rc` based.
//!
//! ## Key Components
//! - `StResource`: Single-threaded reference-counted resource with interior mutability
//! - `StWeak`: Non-owning observer of an `StResource`, used for scene-graph back links
//!
//! ## Usage
//! ```rust
//! use cubewar::core::StResource;
//!
//! let node = StResource::new(String::from("camera"));
//! let parent_link = node.downgrade();
//! assert_eq!(*parent_link.upgrade().unwrap().get(), "camera");
//! ```

pub mod st_resource;

pub use st_resource::{StResource, StWeak};
