//! Adapters for the web-command bridge.

pub mod channel;

pub use channel::ChannelSink;
