//! Common test infrastructure
//!
//! Tests should only import from this module, not from internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::TestProject;
//!
//! #[test]
//! fn test_scene_delete() {
//!     let project = TestProject::new();
//!     let sample = project.seed_sample();
//!     project.controller.delete(EntityKind::Scene, &sample.scene.id).unwrap();
//! }
//! ```

mod constants;
mod fixtures;

pub use constants::*;
pub use fixtures::{Sample, TestProject};
