//! Library and session configuration.

/// Interface version requested when none is configured.
pub const DEFAULT_LIBRARY_VERSION: u32 = 0x0100;

/// Settings sent with the library-open command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryConfig {
    /// Interface version requested from the engine.
    pub version: u32,
    /// Virtual memory reserved by the engine, in bytes. Zero lets the engine decide.
    pub vm_memory_size: u32,
    /// Directory for the engine's swap file. Empty lets the engine decide.
    pub vm_file_info: String,
    /// Directory of the engine's color profiles. Only used on Windows.
    pub default_profile_path: String,
    /// Serialize every command through one lock, even on a reentrant backend.
    pub serialize_dispatch: bool,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            version: DEFAULT_LIBRARY_VERSION,
            vm_memory_size: 0,
            vm_file_info: String::new(),
            default_profile_path: String::new(),
            serialize_dispatch: false,
        }
    }
}

impl LibraryConfig {
    /// Sets the interface version requested on open.
    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Sets the engine's working memory limit. 0 leaves it to the engine.
    pub fn with_vm_memory_size(mut self, bytes: u32) -> Self {
        self.vm_memory_size = bytes;
        self
    }

    /// Sets the directory for the engine's swap file.
    pub fn with_vm_file_info(mut self, dir: impl Into<String>) -> Self {
        self.vm_file_info = dir.into();
        self
    }

    /// Sets the directory the engine loads color profiles from.
    pub fn with_default_profile_path(mut self, dir: impl Into<String>) -> Self {
        self.default_profile_path = dir.into();
        self
    }

    /// Forces one command at a time even on a reentrant backend.
    pub fn with_serialize_dispatch(mut self, serialize: bool) -> Self {
        self.serialize_dispatch = serialize;
        self
    }
}

/// Settings sent with the session-open command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionOptions {
    /// Open for metadata only. Pixel requests are then refused with `NotAllowed`.
    pub image_load_skip: bool,
}

impl SessionOptions {
    /// Opens for metadata only.
    pub fn with_image_load_skip(mut self, skip: bool) -> Self {
        self.image_load_skip = skip;
        self
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_builders() {
        let config = LibraryConfig::default()
            .with_vm_memory_size(64 << 20)
            .with_vm_file_info("/tmp")
            .with_serialize_dispatch(true);
        assert_eq!(config.version, DEFAULT_LIBRARY_VERSION);
        assert_eq!(config.vm_memory_size, 64 << 20);
        assert_eq!(config.vm_file_info, "/tmp");
        assert!(config.serialize_dispatch);
        assert!(SessionOptions::default().with_image_load_skip(true).image_load_skip);
    }
}
