//! Processing-module runtime: local module instances, the per-node
//! dispatch seam, and the registry tying them together.

pub mod link;
pub mod module;
pub mod registry;

pub use link::NodeLink;
pub use module::{ProcessingHandler, ProcessingModule, ModuleStatus};
pub use registry::{ModuleRegistry, ModuleStarted};
