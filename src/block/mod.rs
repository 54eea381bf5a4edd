//! Parameter blocks and the per-command union dispatched to a backend.
//!
//! Each command accepts exactly one block shape. [`ParamBlock`] pairs them at the type level,
//! so a command can only be sent with the block it expects.

mod params;
mod raw_development;

pub use params::*;
pub use raw_development::{
    FlexibleColor, PictureControlAdjustment, RawDevelopmentSetting, WhiteBalanceAdjustment,
};

use crate::error::NkflResult;
use crate::sdk::tags::Command;

/// A pixel rectangle. `left` and `top` are inclusive, `right` and `bottom` exclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    /// First column.
    pub left: i32,
    /// First row.
    pub top: i32,
    /// Column past the last.
    pub right: i32,
    /// Row past the last.
    pub bottom: i32,
}

impl Rect {
    /// Width in pixels, 0 when inverted.
    pub fn width(&self) -> u32 {
        (self.right as i64 - self.left as i64).max(0) as u32
    }

    /// Height in pixels, 0 when inverted.
    pub fn height(&self) -> u32 {
        (self.bottom as i64 - self.top as i64).max(0) as u32
    }

    /// Whether the rectangle covers no pixel.
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }
}

/// A command together with its parameter block.
///
/// Blocks are borrowed mutably: the backend writes its outputs into them in place.
/// Each variant is named after its [`Command`].
#[derive(Debug)]
#[allow(missing_docs)]
pub enum ParamBlock<'a, 'b> {
    OpenLibrary(&'a mut LibraryParam),
    CloseLibrary(&'a mut LibraryParam),
    OpenSession(&'a mut SessionParam),
    CloseSession(&'a mut SessionParam),
    GetFileInfo(&'a mut FileInfoParam),
    GetImageInfo(&'a mut ImageInfoParam),
    SetImageInfo(&'a mut ImageInfoParam),
    GetOriginalInfo(&'a mut ImageInfoParam),
    GetImageData(&'a mut ImageDataParam<'b>),
    GetThumbnailInfo(&'a mut ImageInfoParam),
    SetThumbnailInfo(&'a mut ImageInfoParam),
    GetThumbnailData(&'a mut ImageDataParam<'b>),
    GetTagInfo(&'a mut TagInfoParam),
    GetTagData(&'a mut TagDataParam),
    GetTagStringInfo(&'a mut TagStringInfoParam),
    GetTagString(&'a mut TagStringParam),
    GetColorTempRange(&'a mut ColorTempRangeParam),
    GetRawDevelopmentInfo(&'a mut RawDevelopmentInfoParam),
    RawDevelopment(&'a mut RawDevelopmentParam),
    GetRawDevelopmentParam(&'a mut RawDevelopmentParam),
    GetOutputProfile(&'a mut OutputProfileParam),
    SetOutputProfile(&'a mut OutputProfileParam),
    GetOutputDeviceProfile(&'a mut OutputDeviceProfileParam),
    SetOutputDeviceProfile(&'a mut OutputDeviceProfileParam),
    GetEditState(&'a mut SessionValueParam),
    GetColorProcess(&'a mut SessionValueParam),
    SetColorProcess(&'a mut SessionValueParam),
    GetDynamicRange(&'a mut SessionValueParam),
    SetDynamicRange(&'a mut SessionValueParam),
    GetPictureControlList(&'a mut PictureControlListParam),
    GetPictureControlVersion(&'a mut PictureControlVersionParam),
    GetDevelopColorMode(&'a mut DevelopColorModeParam),
    SetDevelopColorMode(&'a mut DevelopColorModeParam),
}

impl ParamBlock<'_, '_> {
    /// The command code sent with this block.
    pub fn command(&self) -> Command {
        use ParamBlock::*;
        match self {
            OpenLibrary(_) => Command::OpenLibrary,
            CloseLibrary(_) => Command::CloseLibrary,
            OpenSession(_) => Command::OpenSession,
            CloseSession(_) => Command::CloseSession,
            GetFileInfo(_) => Command::GetFileInfo,
            GetImageInfo(_) => Command::GetImageInfo,
            SetImageInfo(_) => Command::SetImageInfo,
            GetOriginalInfo(_) => Command::GetOriginalInfo,
            GetImageData(_) => Command::GetImageData,
            GetThumbnailInfo(_) => Command::GetThumbnailInfo,
            SetThumbnailInfo(_) => Command::SetThumbnailInfo,
            GetThumbnailData(_) => Command::GetThumbnailData,
            GetTagInfo(_) => Command::GetTagInfo,
            GetTagData(_) => Command::GetTagData,
            GetTagStringInfo(_) => Command::GetTagStringInfo,
            GetTagString(_) => Command::GetTagString,
            GetColorTempRange(_) => Command::GetColorTempRange,
            GetRawDevelopmentInfo(_) => Command::GetRawDevelopmentInfo,
            RawDevelopment(_) => Command::RawDevelopment,
            GetRawDevelopmentParam(_) => Command::GetRawDevelopmentParam,
            GetOutputProfile(_) => Command::GetOutputProfile,
            SetOutputProfile(_) => Command::SetOutputProfile,
            GetOutputDeviceProfile(_) => Command::GetOutputDeviceProfile,
            SetOutputDeviceProfile(_) => Command::SetOutputDeviceProfile,
            GetEditState(_) => Command::GetEditState,
            GetColorProcess(_) => Command::GetColorProcess,
            SetColorProcess(_) => Command::SetColorProcess,
            GetDynamicRange(_) => Command::GetDynamicRange,
            SetDynamicRange(_) => Command::SetDynamicRange,
            GetPictureControlList(_) => Command::GetPictureControlList,
            GetPictureControlVersion(_) => Command::GetPictureControlVersion,
            GetDevelopColorMode(_) => Command::GetDevelopColorMode,
            SetDevelopColorMode(_) => Command::SetDevelopColorMode,
        }
    }

    /// The session the block addresses, `None` for library-level commands.
    pub fn session_id(&self) -> Option<u32> {
        use ParamBlock::*;
        let id = match self {
            OpenLibrary(_) | CloseLibrary(_) | GetDevelopColorMode(_) | SetDevelopColorMode(_) => {
                return None
            }
            OpenSession(p) | CloseSession(p) => p.session_id,
            GetFileInfo(p) => p.session_id,
            GetImageInfo(p) | SetImageInfo(p) | GetOriginalInfo(p) | GetThumbnailInfo(p)
            | SetThumbnailInfo(p) => p.session_id,
            GetImageData(p) | GetThumbnailData(p) => p.session_id,
            GetTagInfo(p) => p.session_id,
            GetTagData(p) => p.session_id,
            GetTagStringInfo(p) => p.session_id,
            GetTagString(p) => p.session_id,
            GetColorTempRange(p) => p.session_id,
            GetRawDevelopmentInfo(p) => p.session_id,
            RawDevelopment(p) | GetRawDevelopmentParam(p) => p.session_id,
            GetOutputProfile(p) | SetOutputProfile(p) => p.session_id,
            GetOutputDeviceProfile(p) | SetOutputDeviceProfile(p) => p.session_id,
            GetEditState(p) | GetColorProcess(p) | SetColorProcess(p) | GetDynamicRange(p)
            | SetDynamicRange(p) => p.session_id,
            GetPictureControlList(p) => p.session_id,
            GetPictureControlVersion(p) => p.session_id,
        };
        Some(id)
    }

    /// Checks the size field and block-specific constraints before dispatch.
    pub fn validate(&self) -> NkflResult<()> {
        use ParamBlock::*;
        match self {
            OpenLibrary(p) | CloseLibrary(p) => validate_library(p),
            OpenSession(p) => validate_session(p),
            CloseSession(p) => p.check_size(),
            GetFileInfo(p) => p.check_size(),
            GetImageInfo(p) | GetOriginalInfo(p) | GetThumbnailInfo(p) => p.check_size(),
            SetImageInfo(p) | SetThumbnailInfo(p) => p.check_size(),
            GetImageData(p) | GetThumbnailData(p) => validate_image_data(p),
            GetTagInfo(p) => validate_tag_info(p),
            GetTagData(p) => validate_tag_data(p),
            GetTagStringInfo(p) => p.check_size(),
            GetTagString(p) => validate_tag_string(p),
            GetColorTempRange(p) => p.check_size(),
            GetRawDevelopmentInfo(p) => p.check_size(),
            RawDevelopment(p) => validate_raw_development(p),
            GetRawDevelopmentParam(p) => p.check_size(),
            GetOutputProfile(p) => p.check_size(),
            SetOutputProfile(p) => validate_output_profile(p),
            GetOutputDeviceProfile(p) => p.check_size(),
            SetOutputDeviceProfile(p) => validate_output_device_profile(p),
            GetEditState(p) | GetColorProcess(p) | SetColorProcess(p) | GetDynamicRange(p)
            | SetDynamicRange(p) => p.check_size(),
            GetPictureControlList(p) => validate_picture_control_list(p),
            GetPictureControlVersion(p) => p.check_size(),
            GetDevelopColorMode(p) | SetDevelopColorMode(p) => p.check_size(),
        }
    }

    /// Whether a progress callback attached to the block asked to stop.
    pub fn cancel_requested(&self) -> bool {
        match self {
            ParamBlock::GetImageData(p) | ParamBlock::GetThumbnailData(p) => {
                p.progress.cancel_requested()
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_rect_dimensions() {
        let rect = Rect {
            left: 10,
            top: 5,
            right: 30,
            bottom: 6,
        };
        assert_eq!((rect.width(), rect.height()), (20, 1));
        assert!(!rect.is_empty());
        let inverted = Rect {
            left: 30,
            right: 10,
            ..rect
        };
        assert_eq!(inverted.width(), 0);
        assert!(inverted.is_empty());
    }

    #[test]
    fn test_block_pairs_with_command() {
        let mut info = ImageInfoParam {
            session_id: 4,
            ..Default::default()
        };
        let block = ParamBlock::GetOriginalInfo(&mut info);
        assert_eq!(block.command(), Command::GetOriginalInfo);
        assert_eq!(block.session_id(), Some(4));
        assert!(block.validate().is_ok());

        let mut mode = DevelopColorModeParam::default();
        let block = ParamBlock::SetDevelopColorMode(&mut mode);
        assert_eq!(block.session_id(), None);
        assert!(!block.cancel_requested());
    }

    #[test]
    fn test_raw_development_bounds_checked_on_set_only() {
        let mut param = RawDevelopmentParam {
            setting: RawDevelopmentSetting::Dehaze(12),
            ..Default::default()
        };
        assert!(ParamBlock::GetRawDevelopmentParam(&mut param).validate().is_ok());
        assert!(ParamBlock::RawDevelopment(&mut param).validate().is_err());
    }
}
