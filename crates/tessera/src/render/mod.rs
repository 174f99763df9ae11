//! Block tree interpretation
//!
//! [`render_blocks`] walks a block list, dispatching each node to its
//! builder with a [`RenderContext`] carrying the data published by enclosing
//! `dataFetch` nodes. Mounted renders additionally keep per-node state in a
//! [`MountRegistry`].

pub mod builders;
pub mod context;
pub mod interpreter;
pub mod mount;

pub use context::{RenderContext, RenderServices};
pub use interpreter::{render_block, render_blocks};
pub use mount::{MountRegistry, NodeState};
