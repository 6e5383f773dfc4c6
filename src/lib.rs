//! Interactive polygon editing and tiling engine.
//!
//! The engine modules are pure: they take a value and a proposed edit and
//! return a new value or nothing. [`session`] wires them to a pointer
//! protocol with undo history; the binary wraps that in an egui shell.

pub mod clipping;
pub mod edit_state;
pub mod error;
pub mod geometry;
pub mod history;
pub mod model;
pub mod pattern;
pub mod persist;
pub mod raster;
pub mod session;
pub mod settings;
pub mod surface;

pub use error::{Error, Result};
