// CLI module
//
// This module contains command-line interface functionality:
// - arguments: Command-line argument parsing and handling

pub mod arguments;

pub use arguments::DualpxArguments;
