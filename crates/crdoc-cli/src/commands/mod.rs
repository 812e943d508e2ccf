//! CLI commands

pub mod crds;
pub mod index;
pub mod show;
pub mod stats;
pub mod tags;
