#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![cfg_attr(test, deny(missing_docs))]

pub mod backend;
pub mod block;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod metadata;
pub mod progress;
pub mod sdk;
pub mod session;

pub use backend::{Backend, Capabilities, EntryPointBackend, Fixture, MemoryBackend};
pub use block::{ParamBlock, Rect, Source};
pub use config::{LibraryConfig, SessionOptions};
pub use dispatch::Dispatcher;
pub use error::{NkflError, NkflResult};
pub use metadata::{ExifRecord, ImageInfo, TagEntry, TagValue};
pub use progress::{Progress, ProgressBridge};
pub use sdk::{ErrorCode, StatusCode, WarningCode};
pub use session::{LibraryHandle, LibraryState, Session};
