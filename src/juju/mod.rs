// Juju module
//
// - info: Discover the current controller address and model uuid through the juju CLI

pub mod info;

pub use info::{CommandRunner, SystemRunner, info};
