// src/exec/mod.rs

//! Process execution for graph files.
//!
//! - [`command`] turns a `[task.<name>]` entry into a sync or async node
//!   that runs its shell command, and a whole graph file into a [`Graph`].
//!
//! [`Graph`]: crate::dag::Graph

pub mod command;

pub use command::{graph_from_config, node_kind_for_task};
