pub mod artifact;
pub mod config;
pub mod consts;
pub mod diagnostics;
pub mod handler;
pub mod heartbeat;
pub mod id;
pub mod media;
pub mod pipeline;
pub mod runtime;
pub mod shutdown;
pub mod workflow;
