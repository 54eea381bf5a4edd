use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::error::{NkflError, NkflResult};

/// Error statuses returned by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u32)]
pub enum ErrorCode {
    /// Memory could not be allocated.
    OutOfMemory = 0x0001,
    /// A resource could not be acquired.
    OutOfResource = 0x0002,
    /// The function is not supported.
    NotSupported = 0x0003,
    /// A parameter block was rejected.
    InvalidParameter = 0x0004,
    /// The command was issued out of order.
    WrongSequence = 0x0005,
    /// The source could not be found.
    FileNotFound = 0x0006,
    /// The interface version was not accepted.
    VersionMismatch = 0x0007,
    /// Anything not covered by another code, including unknown statuses.
    Unexpected = 0x0008,
    /// Reading the source failed.
    FileIO = 0x0009,
    /// The operation is not allowed.
    NotAllowed = 0x000A,
    /// The requested tag is not present.
    TagNotFound = 0x000B,
    /// An error occurred inside a callback.
    Abort = 0x000C,
    /// The caller asked to stop.
    Cancel = 0x000D,
    /// Tag data is malformed.
    TagRead = 0x000E,
    /// An alias handle was not valid.
    WrongAliasHandle = 0x000F,
    /// The image already has a Picture Control applied.
    PictureControlAppliedImage = 0x0010,
    /// The color mode cannot be applied to this image.
    ColorModeNotSupported = 0x0011,
    /// Raw development is not allowed for this image.
    RawDevelopmentNotAllowed = 0x0012,
    /// The image has no shooting data.
    ShootingDataNotFound = 0x0013,
    /// An optional Picture Control is not installed.
    OptionalPictureControlNotInstalled = 0x0014,
    /// Noise reduction cannot be applied.
    NoiseReductionNotApplicable = 0x0015,
    /// A tag operation failed.
    TagFailed = 0x0016,
    /// An image information block is not valid.
    WrongImageInfo = 0x0017,
}

/// Warning statuses. The operation succeeded but a requested setting was not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u32)]
#[allow(missing_docs)]
pub enum WarningCode {
    OptionalPictureControlNotApplicable = 0x0101,
    EditStateNotExist = 0x0102,
    EditStateNotApplicable = 0x0103,
    LowResolutionNotApplicable = 0x0104,
    D2xModeNotApplicable = 0x0105,
    Auto2NotApplicable = 0x0106,
    ExtraHigh2NotApplicable = 0x0107,
    UnderwaterNotApplicable = 0x0108,
    Auto1NotApplicable = 0x0109,
    FlatNotApplicable = 0x0110,
    Auto0NotApplicable = 0x0111,
    PictureControlAutoNotApplicable = 0x0112,
    NaturalLightAutoNotApplicable = 0x0113,
    CreativePictureControlNotApplicable = 0x0114,
    HlgPictureControlNotApplicable = 0x0115,
}

/// Classified result of one dispatched command.
///
/// Only values listed in [`ErrorCode`] and [`WarningCode`] are recognised. Anything else is
/// [`ErrorCode::Unexpected`]; no range-based guessing is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    /// Success.
    None,
    /// Success, with a setting that could not be applied.
    Warning(WarningCode),
    /// Failure.
    Error(ErrorCode),
}

impl StatusCode {
    /// Classifies a raw status returned by the engine.
    pub fn from_raw(raw: u32) -> Self {
        if raw == 0 {
            return StatusCode::None;
        }
        if let Ok(warning) = WarningCode::try_from(raw) {
            return StatusCode::Warning(warning);
        }
        match ErrorCode::try_from(raw) {
            Ok(error) => StatusCode::Error(error),
            Err(_) => StatusCode::Error(ErrorCode::Unexpected),
        }
    }

    /// The raw value of this status.
    pub fn to_raw(self) -> u32 {
        match self {
            StatusCode::None => 0,
            StatusCode::Warning(warning) => warning.into(),
            StatusCode::Error(error) => error.into(),
        }
    }

    /// `true` for [`StatusCode::None`] and warnings.
    pub fn is_success(self) -> bool {
        !matches!(self, StatusCode::Error(_))
    }

    /// Splits the status into a warning on success or an error.
    pub fn into_result(self) -> NkflResult<Option<WarningCode>> {
        match self {
            StatusCode::None => Ok(None),
            StatusCode::Warning(warning) => Ok(Some(warning)),
            StatusCode::Error(error) => Err(NkflError::Backend(error)),
        }
    }
}

impl From<ErrorCode> for StatusCode {
    fn from(value: ErrorCode) -> Self {
        StatusCode::Error(value)
    }
}

impl From<WarningCode> for StatusCode {
    fn from(value: WarningCode) -> Self {
        StatusCode::Warning(value)
    }
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use super::*;

    #[test]
    #[rustfmt::skip]
    fn test_classification() {
        let cases = [
            (0x0000, StatusCode::None),
            (0x0004, StatusCode::Error(ErrorCode::InvalidParameter)),
            (0x000D, StatusCode::Error(ErrorCode::Cancel)),
            (0x0017, StatusCode::Error(ErrorCode::WrongImageInfo)),
            (0x0101, StatusCode::Warning(WarningCode::OptionalPictureControlNotApplicable)),
            (0x0109, StatusCode::Warning(WarningCode::Auto1NotApplicable)),
            (0x0115, StatusCode::Warning(WarningCode::HlgPictureControlNotApplicable)),
            // gaps and values past either range are not guessed at
            (0x0018, StatusCode::Error(ErrorCode::Unexpected)),
            (0x010A, StatusCode::Error(ErrorCode::Unexpected)),
            (0x0116, StatusCode::Error(ErrorCode::Unexpected)),
            (0x0100, StatusCode::Error(ErrorCode::Unexpected)),
            (u32::MAX, StatusCode::Error(ErrorCode::Unexpected)),
        ];
        for (raw, expected) in cases {
            assert_eq!(StatusCode::from_raw(raw), expected, "raw status {raw:#x}");
        }
    }

    #[test]
    fn test_warning_is_success() {
        let status = StatusCode::from_raw(0x0103);
        assert!(status.is_success());
        assert_eq!(
            status.into_result().unwrap(),
            Some(WarningCode::EditStateNotApplicable)
        );
        let err = StatusCode::from_raw(0x000B).into_result().unwrap_err();
        assert_eq!(err.code(), ErrorCode::TagNotFound);
    }

    proptest! {
        #[test]
        fn prop_classification_is_deterministic(raw in any::<u32>()) {
            prop_assert_eq!(StatusCode::from_raw(raw), StatusCode::from_raw(raw));
        }

        #[test]
        fn prop_known_codes_round_trip(raw in prop_oneof![0u32..=0x17, 0x101u32..=0x115]) {
            let status = StatusCode::from_raw(raw);
            if status != StatusCode::Error(ErrorCode::Unexpected) {
                prop_assert_eq!(status.to_raw(), raw);
            }
        }
    }
}
