#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Package installation for keg
//!
//! [`install_package`] drives a [`keg_types::PackageSpec`] through the five
//! stages and places the executable atomically in its install directory.

#[macro_use]
mod macros;
mod context;
mod pipeline;
mod placement;

pub use context::InstallContext;
pub use pipeline::{inspect, install_package};
pub use placement::{install, InstalledArtifact};

// Re-export EventSender for use by macros and contexts
pub use keg_events::EventSender;
