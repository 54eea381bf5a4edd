//! Typed parameter blocks, one per native layout.
//!
//! Every block starts with the byte size of its native layout. It defaults to the size this
//! build expects and is checked before dispatch.

use std::path::{Path, PathBuf};

use bytes::{Bytes, BytesMut};

use crate::backend::native::{self, layout_size, MAX_PATH};
use crate::block::{Rect, RawDevelopmentSetting};
use crate::error::{NkflError, NkflResult};
use crate::progress::ProgressBridge;
use crate::sdk::tags::{
    DevelopColorMode, DevelopWhiteBalance, ImageFormat, PictureControl, PictureControlVersion,
    RawDevelopmentKinds, RenderingIntent, SourceKind, Tag, TagType,
};

macro_rules! param_block {
    {
        $( #[$attr:meta] )*
        pub struct $name:ident $(<$lt:lifetime>)? => $native:ty {
            $( $(#[$field_attr:meta])* pub $field:ident : $ty:ty = $default:expr, )*
        }
    } => {
        $( #[$attr] )*
        pub struct $name $(<$lt>)? {
            /// Byte size of the native layout.
            pub size: u32,
            $( $(#[$field_attr])* pub $field: $ty, )*
        }

        impl $(<$lt>)? $name $(<$lt>)? {
            /// The native layout size on this platform.
            pub const EXPECTED_SIZE: u32 = layout_size::<$native>();

            pub(crate) fn check_size(&self) -> NkflResult<()> {
                if self.size != Self::EXPECTED_SIZE {
                    return Err(NkflError::InvalidParameter(format!(
                        "{} size {} does not match layout size {}",
                        stringify!($name),
                        self.size,
                        Self::EXPECTED_SIZE
                    )));
                }
                Ok(())
            }
        }

        impl $(<$lt>)? Default for $name $(<$lt>)? {
            fn default() -> Self {
                Self {
                    size: Self::EXPECTED_SIZE,
                    $( $field: $default, )*
                }
            }
        }
    };
}

fn check_path(what: &str, text: &str) -> NkflResult<()> {
    if text.len() >= MAX_PATH || text.contains('\0') {
        return Err(NkflError::InvalidParameter(format!(
            "{what} must be shorter than {MAX_PATH} bytes without NUL"
        )));
    }
    Ok(())
}

/// Input of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// A file on disk, opened by the engine.
    File(PathBuf),
    /// An in-memory image file. The bytes stay alive for as long as the session.
    Memory(Bytes),
}

impl Source {
    /// The source-kind flag sent to the engine.
    pub fn kind(&self) -> SourceKind {
        match self {
            #[cfg(windows)]
            Source::File(_) => SourceKind::FileNameUtf8,
            #[cfg(not(windows))]
            Source::File(_) => SourceKind::FileName,
            Source::Memory(_) => SourceKind::Memory,
        }
    }

    fn validate(&self) -> NkflResult<()> {
        match self {
            Source::File(path) if path.as_os_str().is_empty() => {
                Err(NkflError::InvalidParameter("empty source path".into()))
            }
            Source::Memory(bytes) if bytes.is_empty() => {
                Err(NkflError::InvalidParameter("empty source buffer".into()))
            }
            _ => Ok(()),
        }
    }
}

impl From<PathBuf> for Source {
    fn from(value: PathBuf) -> Self {
        Source::File(value)
    }
}

impl From<&Path> for Source {
    fn from(value: &Path) -> Self {
        Source::File(value.to_path_buf())
    }
}

impl From<Bytes> for Source {
    fn from(value: Bytes) -> Self {
        Source::Memory(value)
    }
}

impl From<Vec<u8>> for Source {
    fn from(value: Vec<u8>) -> Self {
        Source::Memory(value.into())
    }
}

param_block! {
/// Library open and close.
#[derive(Debug, Clone)]
pub struct LibraryParam => native::LibraryParam {
    /// Interface version requested by the caller.
    pub version: u32 = 0,
    /// Virtual memory reserved by the engine, in bytes. Zero lets the engine decide.
    pub vm_memory_size: u32 = 0,
    /// Directory for the engine's swap file. Empty lets the engine decide.
    pub vm_file_info: String = String::new(),
    /// Directory of the color profiles. Used on Windows only.
    pub default_profile_path: String = String::new(),
    /// Opaque engine instance, set by the engine on open.
    pub instance: usize = 0,
}
}

impl LibraryParam {
    fn validate(&self) -> NkflResult<()> {
        self.check_size()?;
        if self.version == 0 {
            return Err(NkflError::InvalidParameter("library version is zero".into()));
        }
        check_path("swap-file location", &self.vm_file_info)?;
        check_path("default profile path", &self.default_profile_path)
    }
}

param_block! {
/// Session open and close.
#[derive(Debug, Clone)]
pub struct SessionParam => native::SessionParam {
    /// Set by the engine on open.
    pub session_id: u32 = 0,
    /// File or in-memory image to open.
    pub source: Source = Source::Memory(Bytes::new()),
    /// Open for metadata only, without preparing pixel decode.
    pub image_load_skip: bool = false,
}
}

param_block! {
/// Container format of a session's source.
#[derive(Debug, Clone)]
pub struct FileInfoParam => native::FileInfoParam {
    /// Engine-assigned session id.
    pub session_id: u32 = 0,
    /// Set by the engine.
    pub format: ImageFormat = ImageFormat::None,
}
}

param_block! {
/// Shared by the image, original and thumbnail info commands.
#[derive(Debug, Clone)]
pub struct ImageInfoParam => native::ImageInfoParam {
    /// Engine-assigned session id.
    pub session_id: u32 = 0,
    /// Engine-assigned image id.
    pub image_id: u32 = 0,
    /// Width in pixels.
    pub width: u32 = 0,
    /// Height in pixels.
    pub height: u32 = 0,
    /// Bytes per sample.
    pub byte_depth: u32 = 0,
    /// Raw [`ColorType`](crate::sdk::tags::ColorType) code.
    pub color: u32 = 0,
    /// Raw [`Orientation`](crate::sdk::tags::Orientation) code.
    pub orientation: u32 = 0,
    /// Pixels per inch.
    pub resolution: f64 = 0.0,
}
}

param_block! {
/// Pixel retrieval for the image or a thumbnail.
#[derive(Debug)]
pub struct ImageDataParam<'b> => native::ImageParam {
    /// Engine-assigned session id.
    pub session_id: u32 = 0,
    /// Engine-assigned image id.
    pub image_id: u32 = 0,
    /// Region to deliver.
    pub area: Rect = Rect::default(),
    /// Receives the pixels, row by row.
    pub buffer: &'b mut [u8] = Default::default(),
    /// Reports progress and may cancel.
    pub progress: ProgressBridge<'b> = ProgressBridge::none(),
}
}

impl ImageDataParam<'_> {
    fn validate(&self) -> NkflResult<()> {
        self.check_size()?;
        if self.area.is_empty() {
            return Err(NkflError::InvalidParameter(format!(
                "empty image area {:?}",
                self.area
            )));
        }
        if self.buffer.is_empty() {
            return Err(NkflError::InvalidParameter("empty pixel buffer".into()));
        }
        Ok(())
    }
}

param_block! {
/// Tag id listing. Sent once with `tags: None` to learn the count, then again with room for
/// `count` ids.
#[derive(Debug, Clone)]
pub struct TagInfoParam => native::TagInfoParam {
    /// Engine-assigned session id.
    pub session_id: u32 = 0,
    /// Number of entries, set by the first call.
    pub count: u32 = 0,
    /// Room for `count` ids on the second call.
    pub tags: Option<Vec<Tag>> = None,
}
}

param_block! {
/// One tag. Sent once with `data: None` to learn type and length, then again with a payload
/// buffer for non-inline types.
#[derive(Debug, Clone)]
pub struct TagDataParam => native::TagDataParam {
    /// Engine-assigned session id.
    pub session_id: u32 = 0,
    /// The tag to read.
    pub tag: Tag = Tag::None,
    /// Set by the engine.
    pub tag_type: TagType = TagType::Unknown(0),
    /// Inline value.
    pub value: u64 = 0,
    /// Payload length in bytes.
    pub length: u32 = 0,
    /// Room for `length` payload bytes on the second call.
    pub data: Option<BytesMut> = None,
}
}

param_block! {
/// Dimensions of the shooting-data string table.
#[derive(Debug, Clone)]
pub struct TagStringInfoParam => native::TagStringInfoParam {
    /// Engine-assigned session id.
    pub session_id: u32 = 0,
    /// Number of lines.
    pub lines: u32 = 0,
    /// Cells in the longest line.
    pub columns: u32 = 0,
}
}

param_block! {
/// One cell of the shooting-data string table, fetched in two phases like tag data.
#[derive(Debug, Clone)]
pub struct TagStringParam => native::TagStringParam {
    /// Engine-assigned session id.
    pub session_id: u32 = 0,
    /// Line of the cell.
    pub line: u32 = 0,
    /// Column of the cell.
    pub column: u32 = 0,
    /// Text length in bytes, set by the first call.
    pub string_length: u32 = 0,
    /// Buffer length needed, set by the first call.
    pub layout_length: u32 = 0,
    /// Room for `layout_length` bytes on the second call.
    pub data: Option<BytesMut> = None,
}
}

param_block! {
/// Color temperature bounds of one white-balance preset.
#[derive(Debug, Clone)]
pub struct ColorTempRangeParam => native::ColorTempRangeParam {
    /// Engine-assigned session id.
    pub session_id: u32 = 0,
    /// The preset to query.
    pub white_balance: DevelopWhiteBalance = DevelopWhiteBalance::AsShot,
    /// Default temperature in Kelvin.
    pub default: u32 = 0,
    /// Lowest temperature in Kelvin.
    pub min: u32 = 0,
    /// Highest temperature in Kelvin.
    pub max: u32 = 0,
}
}

param_block! {
/// Raw-development kinds adjustable in a session.
#[derive(Debug, Clone)]
pub struct RawDevelopmentInfoParam => native::RawDevelopmentInfo {
    /// Engine-assigned session id.
    pub session_id: u32 = 0,
    /// Set by the engine.
    pub kinds: RawDevelopmentKinds = RawDevelopmentKinds::default(),
}
}

param_block! {
/// Reads or applies one raw-development setting. For a read, `setting` names the kind and is
/// overwritten with the current value.
#[derive(Debug, Clone)]
pub struct RawDevelopmentParam => native::RawDevelopmentParam {
    /// Engine-assigned session id.
    pub session_id: u32 = 0,
    /// The setting to apply, or the kind to read.
    pub setting: RawDevelopmentSetting = RawDevelopmentSetting::ParameterSet(0),
}
}

param_block! {
/// Output color profile of a session.
#[derive(Debug, Clone)]
pub struct OutputProfileParam => native::OutputProfileParam {
    /// Engine-assigned session id.
    pub session_id: u32 = 0,
    /// Gamut mapping intent.
    pub rendering_intent: RenderingIntent = RenderingIntent::Perceptual,
    /// Path of the ICC profile.
    pub profile: String = String::new(),
}
}

param_block! {
/// Output device profile of a session.
#[derive(Debug, Clone)]
pub struct OutputDeviceProfileParam => native::OutputDeviceProfile {
    /// Engine-assigned session id.
    pub session_id: u32 = 0,
    /// Path of the ICC profile.
    pub profile: String = String::new(),
}
}

param_block! {
/// A single per-session value: edit state, color process or dynamic range.
#[derive(Debug, Clone)]
pub struct SessionValueParam => native::SessionValue {
    /// Engine-assigned session id.
    pub session_id: u32 = 0,
    /// Raw value of the setting.
    pub value: u32 = 0,
}
}

param_block! {
/// Picture Control listing, fetched in two phases like tag ids.
#[derive(Debug, Clone)]
pub struct PictureControlListParam => native::PictureControlList {
    /// Engine-assigned session id.
    pub session_id: u32 = 0,
    /// Number of entries, set by the first call.
    pub count: u32 = 0,
    /// Room for `count` entries on the second call.
    pub items: Option<Vec<PictureControl>> = None,
}
}

param_block! {
/// Picture Control versions of a session.
#[derive(Debug, Clone)]
pub struct PictureControlVersionParam => native::PictureControlVersion {
    /// Engine-assigned session id.
    pub session_id: u32 = 0,
    /// Newest version the engine supports.
    pub latest: PictureControlVersion = PictureControlVersion::None,
    /// Version of the edit stored in the file.
    pub modified: PictureControlVersion = PictureControlVersion::None,
    /// Version recorded by the camera.
    pub recorded: PictureControlVersion = PictureControlVersion::None,
}
}

param_block! {
/// Library-wide develop color mode. Carries no session.
#[derive(Debug, Clone)]
pub struct DevelopColorModeParam => native::DevelopColorMode {
    /// The color mode.
    pub mode: DevelopColorMode = DevelopColorMode::AppliedInCamera,
}
}

// Block-specific checks beyond the size field.

pub(crate) fn validate_session(param: &SessionParam) -> NkflResult<()> {
    param.check_size()?;
    param.source.validate()
}

pub(crate) fn validate_library(param: &LibraryParam) -> NkflResult<()> {
    param.validate()
}

pub(crate) fn validate_image_data(param: &ImageDataParam<'_>) -> NkflResult<()> {
    param.validate()
}

pub(crate) fn validate_tag_info(param: &TagInfoParam) -> NkflResult<()> {
    param.check_size()?;
    match &param.tags {
        Some(tags) if tags.len() != param.count as usize => Err(NkflError::InvalidParameter(
            format!("tag list holds {} ids, count is {}", tags.len(), param.count),
        )),
        _ => Ok(()),
    }
}

pub(crate) fn validate_tag_data(param: &TagDataParam) -> NkflResult<()> {
    param.check_size()?;
    if let Some(data) = &param.data {
        crate::metadata::check_request_buffer(param.tag_type, param.length, data)
            .map_err(NkflError::InvalidParameter)?;
    }
    Ok(())
}

pub(crate) fn validate_tag_string(param: &TagStringParam) -> NkflResult<()> {
    param.check_size()?;
    match &param.data {
        Some(data) if data.len() < param.string_length as usize => {
            Err(NkflError::InvalidParameter(format!(
                "string buffer holds {} bytes, string needs {}",
                data.len(),
                param.string_length
            )))
        }
        _ => Ok(()),
    }
}

pub(crate) fn validate_raw_development(param: &RawDevelopmentParam) -> NkflResult<()> {
    param.check_size()?;
    param.setting.validate()
}

pub(crate) fn validate_output_profile(param: &OutputProfileParam) -> NkflResult<()> {
    param.check_size()?;
    check_path("output profile", &param.profile)
}

pub(crate) fn validate_output_device_profile(param: &OutputDeviceProfileParam) -> NkflResult<()> {
    param.check_size()?;
    check_path("output device profile", &param.profile)
}

pub(crate) fn validate_picture_control_list(param: &PictureControlListParam) -> NkflResult<()> {
    param.check_size()?;
    match &param.items {
        Some(items) if items.len() != param.count as usize => Err(NkflError::InvalidParameter(
            format!(
                "Picture Control list holds {} items, count is {}",
                items.len(),
                param.count
            ),
        )),
        _ => Ok(()),
    }
}
