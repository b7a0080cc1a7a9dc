// CLI module
//
// - arguments: Command line flags and their conversion into server parameters

pub mod arguments;

pub use arguments::GuiProxyArguments;
