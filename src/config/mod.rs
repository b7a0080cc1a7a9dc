// Configuration module
//
// This module contains all configuration-related functionality split into focused submodules:
// - types: Server parameters fixed at startup
// - environments: Pre-defined controller/service URL presets
// - overrides: User override parsing and ordered layer merging
// - gui_config: The generated GUI configuration file

pub mod environments;
pub mod gui_config;
pub mod overrides;
pub mod types;

pub use types::ServerParams;
