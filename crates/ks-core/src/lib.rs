//! ks-core - Core library for Keystone
//!
//! This crate provides the upgrade-file model: line sources, the control-line
//! tokenizer, the structural scan that builds the patch graph, the path
//! resolver, and the command/directive types shared across all Keystone
//! components.

pub mod command;
pub mod error;
pub mod file;
pub mod graph;
pub mod line_source;
pub mod progress;
pub mod resolver;
pub mod token;

pub use command::{Command, CommandKind, Directive};
pub use error::{CoreError, CoreResult};
pub use file::UpgradeFile;
pub use graph::{LineRange, PatchGraph, Segment, SegmentKind};
pub use line_source::{FileLineSource, LineSource, StringLineSource};
pub use progress::{NullProgress, ProgressListener};
pub use resolver::{reachable_versions, resolve, Resolution, TargetSpec};
