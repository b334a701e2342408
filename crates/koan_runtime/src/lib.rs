//! Koan runtime: the object model, the explicit-stack dispatch machine,
//! native primitives, resumable exceptions, and the cooperative
//! green-thread scheduler.
//!
//! The embedding surface is small: build a [`Runtime`], feed it source
//! with [`Runtime::eval_source`], read values back through
//! [`Runtime::display`] and [`Runtime::take_output`].

mod activation;
mod bootstrap;
pub mod core;
mod error;
pub mod object;
mod primitives;
mod process;
mod runtime;

pub use crate::core::Value;
pub use error::{ErrKind, KoanError, RtError};
pub use process::ProcState;
pub use runtime::{RunConfig, Runtime};
