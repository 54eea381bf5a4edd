//! The single command seam between the typed API and a backend.

use std::sync::{Mutex, PoisonError};

use tracing::debug;

use crate::backend::Backend;
use crate::block::ParamBlock;
use crate::error::NkflResult;
use crate::progress::ensure_outside_callback;
use crate::sdk::{ErrorCode, StatusCode, WarningCode};

/// Validates parameter blocks, forwards them to a backend and classifies the result.
///
/// Backends that are not reentrant, or any backend when serialization is forced, see one
/// command at a time.
pub struct Dispatcher {
    backend: Box<dyn Backend>,
    lock: Mutex<()>,
    serialize: bool,
}

impl Dispatcher {
    /// Serializes dispatch when `force_serialize` is set or the backend is not reentrant.
    pub fn new(backend: impl Backend + 'static, force_serialize: bool) -> Self {
        let serialize = force_serialize || !backend.capabilities().reentrant;
        Self {
            backend: Box::new(backend),
            lock: Mutex::new(()),
            serialize,
        }
    }

    /// Whether commands are serialized through one lock.
    pub fn is_serialized(&self) -> bool {
        self.serialize
    }

    /// Sends one command and returns its status.
    ///
    /// A block that fails local validation is not sent; the status names the failure instead.
    /// If the block's progress callback asked to stop, a failing status is reported as
    /// [`ErrorCode::Cancel`].
    pub fn dispatch(&self, block: &mut ParamBlock<'_, '_>) -> StatusCode {
        match ensure_outside_callback().and_then(|()| block.validate()) {
            Ok(()) => self.send(block),
            Err(err) => {
                debug!(command = ?block.command(), %err, "rejected before dispatch");
                StatusCode::Error(err.code())
            }
        }
    }

    /// Like [`dispatch`](Self::dispatch), splitting the status into a warning or an error.
    /// Validation failures keep their local description.
    pub fn execute(&self, block: &mut ParamBlock<'_, '_>) -> NkflResult<Option<WarningCode>> {
        ensure_outside_callback()?;
        if let Err(err) = block.validate() {
            debug!(command = ?block.command(), %err, "rejected before dispatch");
            return Err(err);
        }
        self.send(block).into_result()
    }

    fn send(&self, block: &mut ParamBlock<'_, '_>) -> StatusCode {
        let raw = {
            let _guard = self
                .serialize
                .then(|| self.lock.lock().unwrap_or_else(PoisonError::into_inner));
            self.backend.entry(block)
        };

        let mut status = StatusCode::from_raw(raw);
        if block.cancel_requested() && !status.is_success() {
            status = StatusCode::Error(ErrorCode::Cancel);
        }
        debug!(command = ?block.command(), session = ?block.session_id(), raw, ?status, "dispatched");
        status
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("serialize", &self.serialize)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use super::*;
    use crate::backend::{Capabilities, MemoryBackend};
    use crate::block::{ImageDataParam, LibraryParam, Rect, SessionParam};
    use crate::error::NkflError;
    use crate::progress::{Progress, ProgressBridge};
    use crate::sdk::tags::Command;

    fn library() -> LibraryParam {
        LibraryParam {
            version: 0x0100,
            ..Default::default()
        }
    }

    #[test]
    fn test_invalid_block_never_reaches_backend() {
        let backend = Arc::new(MemoryBackend::new());
        let dispatcher = Dispatcher::new(backend.clone(), false);
        let mut param = LibraryParam {
            size: 3,
            ..library()
        };
        let status = dispatcher.dispatch(&mut ParamBlock::OpenLibrary(&mut param));
        assert_eq!(status, StatusCode::Error(ErrorCode::InvalidParameter));
        let err = dispatcher
            .execute(&mut ParamBlock::OpenLibrary(&mut param))
            .unwrap_err();
        assert!(matches!(err, NkflError::InvalidParameter(_)));
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn test_same_state_same_status() {
        let backend = Arc::new(MemoryBackend::new());
        let dispatcher = Dispatcher::new(backend.clone(), false);
        let mut session = SessionParam {
            source: vec![1u8, 2, 3].into(),
            ..Default::default()
        };
        let first = dispatcher.dispatch(&mut ParamBlock::OpenSession(&mut session));
        let second = dispatcher.dispatch(&mut ParamBlock::OpenSession(&mut session));
        assert_eq!(first, StatusCode::Error(ErrorCode::WrongSequence));
        assert_eq!(first, second);
        assert_eq!(backend.calls(), vec![Command::OpenSession; 2]);
    }

    #[test]
    fn test_warning_is_success() {
        let backend = Arc::new(MemoryBackend::new());
        backend.override_status(Command::OpenLibrary, WarningCode::Auto1NotApplicable);
        let dispatcher = Dispatcher::new(backend, false);
        let warning = dispatcher
            .execute(&mut ParamBlock::OpenLibrary(&mut library()))
            .unwrap();
        assert_eq!(warning, Some(WarningCode::Auto1NotApplicable));
    }

    #[test]
    fn test_serialization_follows_capabilities() {
        assert!(Dispatcher::new(MemoryBackend::new(), false).is_serialized());
        let reentrant = MemoryBackend::new().with_capabilities(Capabilities { reentrant: true });
        assert!(!Dispatcher::new(reentrant, false).is_serialized());
        let reentrant = MemoryBackend::new().with_capabilities(Capabilities { reentrant: true });
        assert!(Dispatcher::new(reentrant, true).is_serialized());
    }

    #[test]
    fn test_cancelled_progress_reports_cancel() {
        let backend = Arc::new(MemoryBackend::new());
        // any failure after a cancel request is reported as a cancel
        backend.override_status(Command::GetImageData, ErrorCode::Abort);
        let dispatcher = Dispatcher::new(backend, false);
        let mut buffer = [0u8; 4];
        let mut progress = ProgressBridge::new(|_, _| Progress::Cancel);
        progress.report(0, 1);
        let mut param = ImageDataParam {
            area: Rect {
                left: 0,
                top: 0,
                right: 1,
                bottom: 1,
            },
            buffer: &mut buffer,
            progress,
            ..Default::default()
        };
        let status = dispatcher.dispatch(&mut ParamBlock::GetImageData(&mut param));
        assert_eq!(status, StatusCode::Error(ErrorCode::Cancel));
    }
}
