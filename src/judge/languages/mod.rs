pub mod cpp;
pub mod java;
pub mod python;
