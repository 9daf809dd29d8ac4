#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Network operations for keg
//!
//! This crate handles source downloads over HTTP(S) with retry logic,
//! hashing the bytes as they are written, plus local `file://` sources.

mod client;
mod download;

pub use client::{NetClient, NetConfig};
pub use download::{download_file, DownloadResult};
