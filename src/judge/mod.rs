//! Judge adapters.
//!
//! Core runtime stays language-agnostic. Adapters define compile/run commands
//! for each language; the toolchain registry resolves which executables
//! back them on this host.

pub mod adapter;
pub mod languages;
pub mod registry;
pub mod toolchain;
