//! Viewer relay: registry and per-viewer loop.

pub mod registry;
pub mod viewer;

pub use registry::ViewerRegistry;
pub use viewer::RelayLoop;
