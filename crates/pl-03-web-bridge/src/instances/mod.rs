//! Built-in command instances.

pub mod echo;
pub mod machine;

pub use echo::{EchoFactory, EchoInstance};
pub use machine::{MachineFactory, MachineInstance};
