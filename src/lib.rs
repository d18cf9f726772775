//! masplan - multi-agent-system planner: configuration, demo catalog and
//! CLI rendering on top of `masplan-planner`.

pub mod config;
pub mod demo;
pub mod render;
