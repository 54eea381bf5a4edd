//! Native layouts of the engine's parameter blocks and tag payloads.
//!
//! These mirror the C declarations field for field. `c_ulong` is 8 bytes on LP64 targets and 4
//! bytes on Windows, and the layouts follow suit.
#![allow(missing_docs)]

use std::ffi::{c_long, c_ulong, c_void};
use std::mem::size_of;

#[cfg(windows)]
pub const MAX_PATH: usize = 260;
#[cfg(not(windows))]
pub const MAX_PATH: usize = 1024;

/// The engine's single entry point.
pub type EntryProc = unsafe extern "system" fn(command: c_ulong, param: *mut c_void) -> c_ulong;

/// Progress callback handed to the engine with image-data commands.
pub type ProgressProc =
    unsafe extern "system" fn(done: c_ulong, total: c_ulong, param: *mut c_void) -> c_ulong;

/// Byte size of a native layout as the `u32` stored in a block's size field.
pub(crate) const fn layout_size<T>() -> u32 {
    size_of::<T>() as u32
}

/// Layouts for which the all-zero bit pattern is a valid value: integers, floats, `bool`s,
/// nullable pointers, optional function pointers and arrays of those.
pub(crate) trait Plain: Sized {
    fn zeroed() -> Self {
        // SAFETY: implementors only contain fields for which zero is a valid bit pattern.
        unsafe { std::mem::zeroed() }
    }
}

macro_rules! plain {
    ($($name:ident),* $(,)?) => {
        $(impl Plain for $name {})*
    };
}

#[cfg(windows)]
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct NativeRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

#[cfg(not(windows))]
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct NativeRect {
    pub top: i16,
    pub left: i16,
    pub bottom: i16,
    pub right: i16,
}

#[repr(C)]
#[derive(Debug)]
pub struct LibraryParam {
    pub size: c_ulong,
    pub version: c_ulong,
    pub vm_memory_size: c_ulong,
    pub instance: *mut *mut c_void,
    pub vm_file_info: [u8; MAX_PATH],
    #[cfg(windows)]
    pub default_profile_path: [u8; MAX_PATH],
}

#[repr(C)]
#[derive(Debug)]
pub struct SessionParam {
    pub size: c_ulong,
    pub session_id: c_ulong,
    pub source_kind: c_ulong,
    pub file_info: *mut c_void,
    pub file_size: c_ulong,
    pub image_load_skip: bool,
}

#[repr(C)]
#[derive(Debug)]
pub struct FileInfoParam {
    pub size: c_ulong,
    pub session_id: c_ulong,
    pub format: c_ulong,
}

#[repr(C)]
#[derive(Debug)]
pub struct ImageInfoParam {
    pub size: c_ulong,
    pub session_id: c_ulong,
    pub image_id: c_ulong,
    pub width: c_ulong,
    pub height: c_ulong,
    pub byte_depth: c_ulong,
    pub color: c_ulong,
    pub orientation: c_ulong,
    pub resolution: f64,
}

#[repr(C)]
#[derive(Debug)]
pub struct ImageParam {
    pub size: c_ulong,
    pub session_id: c_ulong,
    pub image_id: c_ulong,
    pub area: NativeRect,
    pub data_size: c_ulong,
    pub data: *mut c_void,
    pub progress: Option<ProgressProc>,
    pub progress_param: *mut c_void,
}

#[repr(C)]
#[derive(Debug)]
pub struct TagInfoParam {
    pub size: c_ulong,
    pub session_id: c_ulong,
    pub count: c_ulong,
    pub tag_list: *mut c_ulong,
}

#[repr(C)]
#[derive(Debug)]
pub struct TagDataParam {
    pub size: c_ulong,
    pub session_id: c_ulong,
    pub tag_id: c_ulong,
    pub tag_type: c_ulong,
    pub tag_value: c_ulong,
    pub tag_length: c_ulong,
    pub data: *mut c_void,
}

#[repr(C)]
#[derive(Debug)]
pub struct TagStringInfoParam {
    pub size: c_ulong,
    pub session_id: c_ulong,
    pub lines: c_ulong,
    pub columns: c_ulong,
}

#[repr(C)]
#[derive(Debug)]
pub struct TagStringParam {
    pub size: c_ulong,
    pub session_id: c_ulong,
    pub line: c_ulong,
    pub column: c_ulong,
    pub string_length: c_ulong,
    pub layout_length: c_ulong,
    pub data: *mut c_void,
}

#[repr(C)]
#[derive(Debug)]
pub struct ColorTempRangeParam {
    pub size: c_ulong,
    pub session_id: c_ulong,
    pub white_balance: c_ulong,
    pub default: c_ulong,
    pub min: c_ulong,
    pub max: c_ulong,
}

#[repr(C)]
#[derive(Debug)]
pub struct RawDevelopmentInfo {
    pub size: c_ulong,
    pub session_id: c_ulong,
    pub kinds: c_ulong,
}

#[repr(C)]
#[derive(Debug)]
pub struct RawDevelopmentParam {
    pub size: c_ulong,
    pub session_id: c_ulong,
    pub kind: c_ulong,
    pub data: *mut c_void,
}

/// Sub-parameter carrying one unsigned value (parameter set, quality, noise reduction, color
/// mode, sharpness, tone compensation, saturation, filter effect, Active D-Lighting, skin
/// softening, dehaze).
#[repr(C)]
#[derive(Debug)]
pub struct RawUnsigned {
    pub size: c_ulong,
    pub value: c_ulong,
}

/// Sub-parameter carrying one signed value (hue adjustment).
#[repr(C)]
#[derive(Debug)]
pub struct RawSigned {
    pub size: c_ulong,
    pub value: c_long,
}

/// Sub-parameter carrying one double (exposure compensation, tint).
#[repr(C)]
#[derive(Debug)]
pub struct RawDouble {
    pub size: c_ulong,
    pub value: f64,
}

#[repr(C)]
#[derive(Debug)]
pub struct RawRgb {
    pub r: c_ulong,
    pub g: c_ulong,
    pub b: c_ulong,
}

#[repr(C)]
#[derive(Debug)]
pub struct RawWhiteBalance {
    pub size: c_ulong,
    pub preset: c_ulong,
    pub color_temperature: c_long,
    pub rgb: RawRgb,
}

#[repr(C)]
#[derive(Debug)]
pub struct RawPortraitImpressionBalance {
    pub size: c_ulong,
    pub hue: f64,
    pub brightness: f64,
}

#[repr(C)]
#[derive(Debug)]
pub struct RawPixelShiftNoiseReduction {
    pub size: c_ulong,
    pub resolution_priority: bool,
}

#[repr(C)]
#[derive(Debug)]
pub struct RawFilmGrain {
    pub size: c_ulong,
    pub intensity: c_ulong,
    pub grain_size: c_ulong,
}

#[repr(C)]
#[derive(Debug)]
pub struct FlexibleColorParams {
    pub contrast: f64,
    pub highlight: f64,
    pub shadow: f64,
    pub white_level: f64,
    pub black_level: f64,
    pub saturation: f64,
    pub color_blender: [[f64; 3]; 8],
    pub color_grading: [[f64; 3]; 3],
    pub blending: f64,
    pub balance: f64,
}

#[repr(C)]
#[derive(Debug)]
pub struct RawPictureControl {
    pub size: c_ulong,
    pub picture_control: c_ulong,
    pub apply_quick_adjust: bool,
    pub quick_adjust: f64,
    pub sharpness_auto: bool,
    pub sharpness: f64,
    pub clarity_auto: bool,
    pub clarity: f64,
    pub user_defined_curve: bool,
    pub contrast_auto: bool,
    pub contrast: f64,
    pub brightness: f64,
    pub highlight: f64,
    pub shadow: f64,
    pub saturation_auto: bool,
    pub saturation: f64,
    pub hue: f64,
    pub filter: c_long,
    pub toning: c_ulong,
    pub toning_intensity: f64,
    pub apply_level: f64,
    pub apply_quick_sharp: bool,
    pub quick_sharp_auto: bool,
    pub quick_sharp: f64,
    pub middle_range_sharp: f64,
    pub flexible_color: FlexibleColorParams,
}

#[repr(C)]
#[derive(Debug)]
pub struct OutputDeviceProfile {
    pub size: c_ulong,
    pub session_id: c_ulong,
    pub profile: [u8; MAX_PATH],
}

#[repr(C)]
#[derive(Debug)]
pub struct OutputProfileParam {
    pub size: c_ulong,
    pub session_id: c_ulong,
    pub rendering_intent: c_ulong,
    pub profile: [u8; MAX_PATH],
}

/// Shared by the edit-state, color-process and dynamic-range commands.
#[repr(C)]
#[derive(Debug)]
pub struct SessionValue {
    pub size: c_ulong,
    pub session_id: c_ulong,
    pub value: c_ulong,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct PictureControlListItem {
    pub id: c_ulong,
}

#[repr(C)]
#[derive(Debug)]
pub struct PictureControlList {
    pub size: c_ulong,
    pub session_id: c_ulong,
    pub count: c_ulong,
    pub items: *mut PictureControlListItem,
}

#[repr(C)]
#[derive(Debug)]
pub struct PictureControlVersion {
    pub size: c_ulong,
    pub session_id: c_ulong,
    pub latest: c_ulong,
    pub modified: c_ulong,
    pub recorded: c_ulong,
}

#[repr(C)]
#[derive(Debug)]
pub struct DevelopColorMode {
    pub size: c_ulong,
    pub mode: c_long,
}

// Tag payloads, pointed to by `TagDataParam::data`.

#[repr(C)]
#[derive(Debug)]
pub struct TagBitsPerSample {
    pub size: c_ulong,
    pub bits: [c_ulong; 4],
}

#[repr(C)]
#[derive(Debug)]
pub struct TagDateTime {
    pub size: c_ulong,
    pub year: c_ulong,
    pub month: c_ulong,
    pub day: c_ulong,
    pub hour: c_ulong,
    pub minute: c_ulong,
    pub second: f64,
}

#[repr(C)]
#[derive(Debug)]
pub struct TagLensInfo {
    pub size: c_ulong,
    pub wide_focal_length: c_ulong,
    pub tele_focal_length: c_ulong,
    pub wide_max_aperture: f64,
    pub tele_max_aperture: f64,
}

#[repr(C)]
#[derive(Debug)]
pub struct TagLensType {
    pub cpu: bool,
    pub d_type_active: bool,
    pub d_type: bool,
    pub g_lens: bool,
    pub vibration_reduction: bool,
    pub v_lens: bool,
    pub f_mount_adapter: bool,
    pub reserved: bool,
    pub e_lens: bool,
    pub stm_lens: bool,
}

#[repr(C)]
#[derive(Debug)]
pub struct TagSkinSoftening {
    pub size: c_ulong,
    pub level: c_ulong,
}

#[repr(C)]
#[derive(Debug)]
pub struct TagPortraitImpressionBalance {
    pub size: c_ulong,
    pub hue: c_ulong,
    pub brightness: c_ulong,
}

#[repr(C)]
#[derive(Debug)]
pub struct TagFilmGrain {
    pub size: c_ulong,
    pub intensity: c_ulong,
    pub grain_size: c_ulong,
}

#[repr(C)]
#[derive(Debug)]
pub struct TagGpsPosition {
    pub size: c_ulong,
    pub degrees: f64,
    pub minutes: f64,
    pub seconds: f64,
}

#[repr(C)]
#[derive(Debug)]
pub struct TagGpsTimeStamp {
    pub size: c_ulong,
    pub hours: c_ulong,
    pub minutes: c_ulong,
    pub seconds: c_ulong,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SplinePoint {
    pub x: u8,
    pub y: u8,
}

#[repr(C)]
pub struct TagUserDefinedCurve {
    pub size: c_ulong,
    pub id: [u8; 2],
    pub input_min: u8,
    pub input_max: u8,
    pub output_min: u8,
    pub output_max: u8,
    pub gamma_integer: u8,
    pub gamma_fractional: u8,
    pub spline_point_count: u8,
    pub spline_points: [SplinePoint; 20],
    pub reserved: [u8; 15],
    pub lut: [u8; 2048],
}

#[repr(C)]
#[derive(Debug)]
pub struct TagWhiteBalanceMode {
    pub size: c_ulong,
    pub mode: c_ulong,
    pub color_temperature: c_ulong,
}

#[repr(C)]
#[derive(Debug)]
pub struct TagColorMatrix {
    pub size: c_ulong,
    pub mkr2: f64,
    pub mkb2: f64,
    pub mkr3: f64,
    pub mkb3: f64,
}

plain!(
    NativeRect,
    LibraryParam,
    SessionParam,
    FileInfoParam,
    ImageInfoParam,
    ImageParam,
    TagInfoParam,
    TagDataParam,
    TagStringInfoParam,
    TagStringParam,
    ColorTempRangeParam,
    RawDevelopmentInfo,
    RawDevelopmentParam,
    RawUnsigned,
    RawSigned,
    RawDouble,
    RawWhiteBalance,
    RawPortraitImpressionBalance,
    RawPixelShiftNoiseReduction,
    RawFilmGrain,
    RawPictureControl,
    OutputDeviceProfile,
    OutputProfileParam,
    SessionValue,
    PictureControlList,
    PictureControlVersion,
    DevelopColorMode,
    TagBitsPerSample,
    TagDateTime,
    TagLensInfo,
    TagLensType,
    TagSkinSoftening,
    TagPortraitImpressionBalance,
    TagFilmGrain,
    TagGpsPosition,
    TagGpsTimeStamp,
    TagUserDefinedCurve,
    TagWhiteBalanceMode,
    TagColorMatrix,
);

#[cfg(test)]
mod test {
    use std::mem::size_of;

    use super::*;

    #[cfg(target_pointer_width = "64")]
    #[cfg(not(windows))]
    #[test]
    #[rustfmt::skip]
    fn test_lp64_tag_payload_sizes() {
        assert_eq!(size_of::<TagDateTime>(),                  56);
        assert_eq!(size_of::<TagLensInfo>(),                  40);
        assert_eq!(size_of::<TagLensType>(),                  10);
        assert_eq!(size_of::<TagGpsPosition>(),               32);
        assert_eq!(size_of::<TagGpsTimeStamp>(),              32);
        assert_eq!(size_of::<TagWhiteBalanceMode>(),          24);
        assert_eq!(size_of::<TagColorMatrix>(),               40);
        assert_eq!(size_of::<TagBitsPerSample>(),             40);
        assert_eq!(size_of::<TagSkinSoftening>(),             16);
        assert_eq!(size_of::<TagPortraitImpressionBalance>(), 24);
        assert_eq!(size_of::<TagFilmGrain>(),                 24);
        // 8 + 9 header bytes + 40 points + 15 reserved + 2048 LUT, padded to 8
        assert_eq!(size_of::<TagUserDefinedCurve>(),          2120);
    }

    #[test]
    fn test_zeroed_blocks() {
        let param = TagDataParam::zeroed();
        assert!(param.data.is_null());
        assert_eq!(param.tag_length, 0);
        let image = ImageParam::zeroed();
        assert!(image.progress.is_none());
    }
}
