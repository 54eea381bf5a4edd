//! The engine seam.
//!
//! Everything this crate needs from the decoding engine is one call: a command with its
//! parameter block in, a raw status out. [`EntryPointBackend`] forwards that call to a native
//! entry point; [`MemoryBackend`] answers it from registered fixtures.

mod entry_point;
mod memory;
pub mod native;

use std::sync::Arc;

pub use entry_point::EntryPointBackend;
pub use memory::{Fixture, MemoryBackend};

use crate::block::ParamBlock;

/// What a backend allows callers to do concurrently.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// Commands for different sessions may run at the same time. When `false` every command
    /// is serialized through one lock.
    pub reentrant: bool,
}

/// A decoding engine.
pub trait Backend: Send + Sync {
    /// Executes one command. The block's outputs are written in place and the raw status is
    /// returned, zero meaning success.
    fn entry(&self, block: &mut ParamBlock<'_, '_>) -> u32;

    /// What callers may do concurrently. Nothing by default.
    fn capabilities(&self) -> Capabilities {
        Capabilities::default()
    }
}

impl Backend for Box<dyn Backend> {
    fn entry(&self, block: &mut ParamBlock<'_, '_>) -> u32 {
        self.as_ref().entry(block)
    }

    fn capabilities(&self) -> Capabilities {
        self.as_ref().capabilities()
    }
}

impl<T: Backend + ?Sized> Backend for Arc<T> {
    fn entry(&self, block: &mut ParamBlock<'_, '_>) -> u32 {
        self.as_ref().entry(block)
    }

    fn capabilities(&self) -> Capabilities {
        self.as_ref().capabilities()
    }
}
