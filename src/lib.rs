// Cairn - operator console for a remote-orchestration backend
// Library exports

pub mod backend;
pub mod bus;
pub mod cli;
pub mod config;
pub mod errors;
