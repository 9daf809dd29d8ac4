#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Source-to-executable stages for keg
//!
//! Fetching, integrity verification, extraction and the toolchain build all
//! operate inside a per-run [`Scratch`] directory. Extraction only accepts a
//! [`VerifiedSource`], which only [`verify_integrity`] can produce.

mod extract;
mod scratch;
mod source;
mod toolchain;
mod utils;
mod verify;

pub use extract::{extract, SourceTree};
pub use scratch::Scratch;
pub use source::{resolve_source, LocalSource};
pub use toolchain::{build, check_toolchain, Artifact, BuildOptions};
pub use verify::{verify_integrity, VerifiedSource};
