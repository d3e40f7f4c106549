//! Hand-written encode/decode routines for the command set the rest of the
//! workspace needs, grouped the way the object model groups them.
//!
//! This is deliberately not the full ~200-entry Vulkan command table: only
//! the calls the trackers in `venus_registry` and `venus_driver` actually
//! drive are represented. Extending coverage means adding a module-local
//! args/reply pair and a `CommandId`, not touching the codec underneath.

pub mod device;
pub mod instance;
pub mod lifecycle;
pub mod memory_transfer;
pub mod query;
pub mod resource;
pub mod sync;
