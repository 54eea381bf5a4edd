//! Command codes, tag ids and the enumerations that travel inside parameter blocks and tag
//! payloads.
//!
//! Enumerations the engine may extend in newer releases are generated by [`tags!`] and keep
//! unrecognised values in an `Unknown` variant instead of failing.
#![allow(missing_docs)]

use num_enum::{IntoPrimitive, TryFromPrimitive};

macro_rules! tags {
    {
        // Permit arbitrary meta items, which include documentation.
        $( #[$enum_attr:meta] )*
        $vis:vis enum $name:ident $(unknown($unknown_doc:literal))* {
            // Each of the `Name = Val,` permitting documentation.
            $($(#[$ident_attr:meta])* $tag:ident = $val:literal,)*
        }
    } => {
        $( #[$enum_attr] )*
        #[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
        #[non_exhaustive]
        $vis enum $name {
            $($(#[$ident_attr])* $tag,)*
            $(
                #[doc = $unknown_doc]
                Unknown(u32),
            )*
        }

        impl $name {
            /// Every named variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$tag,)*];

            /// Converts a raw value, returning `None` for values without a named variant.
            #[inline(always)]
            pub fn from_u32(val: u32) -> Option<Self> {
                match val {
                    $( $val => Some($name::$tag), )*
                    _ => None,
                }
            }

            $(
            /// Converts a raw value, keeping values without a named variant in `Unknown`.
            #[inline(always)]
            pub fn from_u32_exhaustive(val: u32) -> Self {
                $unknown_doc;
                Self::from_u32(val).unwrap_or($name::Unknown(val))
            }
            )*

            /// The raw value sent to or received from the engine.
            #[inline(always)]
            pub fn to_u32(&self) -> u32 {
                match *self {
                    $( $name::$tag => $val, )*
                    $( $name::Unknown(n) => { $unknown_doc; n }, )*
                }
            }
        }
    };
}

tags! {
/// Command codes accepted by the engine entry point.
pub enum Command {
    OpenLibrary = 0x0001,
    CloseLibrary = 0x0002,
    OpenSession = 0x0003,
    CloseSession = 0x0004,
    GetFileInfo = 0x0005,
    GetOutputProfile = 0x0016,
    GetOutputProfileUtf8 = 0x0017,
    SetOutputProfile = 0x0116,
    SetOutputProfileUtf8 = 0x0117,
    GetImageInfo = 0x0011,
    SetImageInfo = 0x0111,
    GetRawDevelopmentInfo = 0x0010,
    RawDevelopment = 0x0110,
    GetRawDevelopmentParam = 0x0210,
    GetRawDevelopmentRange = 0x0310,
    GetImageData = 0x0012,
    GetThumbnailCount = 0x0025,
    GetThumbnailInfo = 0x0021,
    SetThumbnailInfo = 0x0121,
    GetThumbnailData = 0x0022,
    GetOriginalInfo = 0x0031,
    GetTagInfo = 0x0051,
    GetTagData = 0x0052,
    GetTagStringInfo = 0x0041,
    GetTagString = 0x0042,
    GetColorTempRange = 0x0018,
    GetEditState = 0x0060,
    GetColorProcess = 0x0070,
    SetColorProcess = 0x0170,
    GetPictureControlList = 0x0080,
    GetPictureControlVersion = 0x0090,
    GetDevelopColorMode = 0x0100,
    SetDevelopColorMode = 0x0101,
    GetOutputDeviceProfile = 0x0400,
    SetOutputDeviceProfile = 0x0401,
    GetDynamicRange = 0x0402,
    SetDynamicRange = 0x0403,
}
}

tags! {
/// Type code of a tag entry. It decides how the inline value and the payload are read.
pub enum TagType unknown("A type code without a dedicated decoder") {
    Byte = 0x0001,
    String = 0x0002,
    Long = 0x0004,
    Rational = 0x0005,
    Undefined = 0x0007,
    Double = 0x0008,
    SignedLong = 0x0009,
    SignedRational = 0x000A,
    Boolean = 0x1001,
    DateTime = 0x1002,
    LensInfo = 0x8002,
    UserDefinedCurve = 0x8003,
    GpsPosition = 0x8004,
    GpsTimeStamp = 0x8005,
    LensType = 0x8006,
    ColorMatrix = 0x8009,
    WhiteBalanceMode = 0x800A,
    BitsPerSample = 0x800B,
    SkinSoftening = 0x800C,
    PortraitImpressionBalance = 0x800D,
    FilmGrain = 0x800E,
}
}

impl TagType {
    /// Whether the value lives in the inline field rather than in an out-of-line payload.
    pub fn is_inline(&self) -> bool {
        matches!(
            self,
            TagType::Byte
                | TagType::Long
                | TagType::SignedLong
                | TagType::Double
                | TagType::Boolean
        )
    }
}

tags! {
/// Tag ids. Standard EXIF/TIFF ids sit below 0x10000, GPS ids under 0x03xxxx and vendor ids
/// under 0x08xxxx.
pub enum Tag unknown("A tag id without a named variant") {
    ImageWidth = 0x0100,
    ImageLength = 0x0101,
    BitsPerSample = 0x0102,
    PhotoMetric = 0x0106,
    ImageDescription = 0x010E,
    Make = 0x010F,
    Model = 0x0110,
    XResolution = 0x011A,
    YResolution = 0x011B,
    Software = 0x0131,
    DateTime = 0x0132,
    Artist = 0x013B,
    Copyright = 0x8298,
    ExposureTime = 0x829A,
    FNumber = 0x829D,
    Iptc = 0x83BB,
    IccProfile = 0x8773,
    ExposureProgram = 0x8822,
    ExifVersion = 0x9000,
    ExposureBiasValue = 0x9204,
    MeteringMode = 0x9207,
    Flash = 0x9209,
    FocalLength = 0x920A,
    UserComment = 0x9286,

    GpsLatitudeRef = 0x030001,
    GpsLatitude = 0x030002,
    GpsLongitudeRef = 0x030003,
    GpsLongitude = 0x030004,
    GpsAltitude = 0x030006,
    GpsTimeStamp = 0x030007,
    GpsSatellites = 0x030008,
    GpsMapDatum = 0x030012,

    NkIsoSensitivity = 0x080002,
    NkFileFormat = 0x080004,
    NkWhiteBalance = 0x080005,
    NkEdgeEnhancement = 0x080006,
    NkFocusMode = 0x080007,
    NkFlashSyncMode = 0x080008,
    NkFlashAutoMode = 0x080009,
    NkWhiteBalanceCompensation = 0x08000B,
    NkFlexibleProgram = 0x08000D,
    NkExposureDeviation = 0x08000E,
    NkSensitivityMode = 0x08000F,
    NkActiveDLighting = 0x080022,
    NkPictureControlMode = 0x080023,
    NkSkinSoftening = 0x080057,
    NkToneMode = 0x080059,
    NkPortraitImpressionBalance = 0x08005A,
    NkNoiseReductionMode = 0x080062,
    NkDehaze = 0x080063,
    NkFilmGrain = 0x08006B,
    NkBrightnessContrastCompensation = 0x080080,
    NkGammaTable = 0x080081,
    NkConverterLens = 0x080082,
    NkLensType = 0x080083,
    NkLensInfo = 0x080084,
    NkAfAreaMode = 0x08008A,
    NkAfPreferredArea = 0x08008B,
    NkColorRecurrence = 0x08008D,
    NkColorAdjustment = 0x080092,
    NkChromaAdjustment = 0x080094,
    NkDateTimePrint = 0x08009D,
    NkCpxPictureControl = 0x0800BD,

    None = 0xFFFFFFFF,
}
}

/// Partition of the tag id space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagCategory {
    /// Standard TIFF/EXIF ids.
    Exif,
    /// GPS ids, prefix 0x03.
    Gps,
    /// Nikon vendor ids, prefix 0x08.
    Vendor,
    /// Anything else, including [`Tag::None`].
    Other,
}

impl Tag {
    /// The category this id belongs to, decided by its high-order bits.
    pub fn category(&self) -> TagCategory {
        match self.to_u32() >> 16 {
            0x00 => TagCategory::Exif,
            0x03 => TagCategory::Gps,
            0x08 => TagCategory::Vendor,
            _ => TagCategory::Other,
        }
    }
}

/// How a session's input is handed to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u32)]
pub enum SourceKind {
    FileName = 0x0001,
    FsSpec = 0x0002,
    Memory = 0x0004,
    FileNameUtf8 = 0x0008,
}

tags! {
/// Container format reported by the file-info command.
pub enum ImageFormat unknown("A container format unknown to this crate") {
    None = 0x000000,
    Tiff = 0x000001,
    Jpeg = 0x000020,
    Heif = 0x000030,
    Nef = 0x100000,
    Nrw = 0x200000,
}
}

tags! {
/// Recording format stored in the `NkFileFormat` tag.
pub enum FileFormat unknown("A recording format unknown to this crate") {
    JpegBasic = 0,
    JpegNormal = 1,
    JpegFine = 2,
    TiffYCbCr = 16,
    TiffRgb = 17,
    NefRaw = 32,
    NefRgb = 38,
    NefCompressed = 39,
    Nrw = 64,
    HeifBasic = 65,
    HeifNormal = 66,
    HeifFine = 67,
}
}

/// Pixel layout of decoded image data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u32)]
pub enum ColorType {
    Gray = 0x0002,
    /// Grayscale stored in three planes.
    RgbGray = 0x0003,
    CmykGray = 0x0004,
    Rgb = 0x0020,
    Cmyk = 0x0022,
    Lch = 0x0023,
    Lab = 0x0024,
}

impl ColorType {
    /// Number of samples per pixel in the delivered buffer.
    pub fn channels(&self) -> u32 {
        match self {
            ColorType::Gray => 1,
            ColorType::RgbGray | ColorType::Rgb | ColorType::Lch | ColorType::Lab => 3,
            ColorType::CmykGray | ColorType::Cmyk => 4,
        }
    }
}

/// Rotation and flip to apply for display, named by where the stored top-left lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u32)]
pub enum Orientation {
    Cw0 = 1,
    FlippedCw0 = 2,
    Cw180 = 3,
    FlippedCw180 = 4,
    FlippedCw270 = 5,
    Cw270 = 6,
    FlippedCw90 = 7,
    Cw90 = 8,
}

impl Orientation {
    /// Whether width and height swap when the orientation is applied.
    pub fn swaps_dimensions(&self) -> bool {
        matches!(
            self,
            Orientation::FlippedCw270 | Orientation::Cw270 | Orientation::FlippedCw90 | Orientation::Cw90
        )
    }
}

tags! {
/// White balance recorded by the camera.
pub enum WhiteBalance unknown("A white balance mode unknown to this crate") {
    Auto = 0x00,
    Incandescent = 0x01,
    Fluorescent = 0x02,
    Sunlight = 0x03,
    Flash = 0x04,
    Shade = 0x05,
    Overcast = 0x06,
    Preset = 0x07,
    ColorTemperature = 0x08,
    AppCustom = 0x09,
    Auto2 = 0x0A,
    Underwater = 0x0B,
    Auto1 = 0x0C,
    Auto0 = 0x0D,
    NaturalLightAuto = 0x0E,
    Preset1 = 0x17,
    Preset2 = 0x27,
    Preset3 = 0x37,
    Preset4 = 0x47,
}
}

tags! {
/// White balance presets accepted by development commands.
pub enum DevelopWhiteBalance unknown("A development white balance unknown to this crate") {
    AsShot = 0x0001,
    GrayPoint = 0x0002,
    Auto0 = 0x0003,
    Auto1 = 0x0004,
    Auto2 = 0x0005,
    NaturalLightAuto = 0x0006,
    Incandescent = 0x0100,
    DirectSunlight = 0x0200,
    Shade = 0x0201,
    Cloudy = 0x0202,
    HcFluorescent = 0x0400,
    Flash = 0x0500,
    Underwater = 0x0600,
    Auto = 0x1000,
    Fluorescent = 0x1002,
}
}

tags! {
/// EXIF metering mode.
pub enum MeteringMode unknown("A metering mode unknown to this crate") {
    Undefined = 0,
    Average = 1,
    CenterWeightedAverage = 2,
    Spot = 3,
    MultiSpot = 4,
    Pattern = 5,
    Partial = 6,
}
}

tags! {
/// EXIF exposure program.
pub enum ExposureProgram unknown("An exposure program unknown to this crate") {
    Undefined = 0,
    Manual = 1,
    Program = 2,
    AperturePriority = 3,
    ShutterPriority = 4,
    CreativeProgram = 5,
    ActionProgram = 6,
    Portrait = 7,
    Landscape = 8,
}
}

tags! {
/// Picture Control presets, including creative and optional ones.
pub enum PictureControl unknown("A Picture Control unknown to this crate") {
    AsShot = 0x0001,
    Standard = 0x0002,
    Neutral = 0x0003,
    Vivid = 0x0004,
    Monochrome = 0x0005,
    Flat = 0x0006,
    Auto = 0x0007,
    Dream = 0x0008,
    Morning = 0x0009,
    Pop = 0x000A,
    Sunday = 0x000B,
    Somber = 0x000C,
    Drama = 0x000D,
    Silence = 0x000E,
    Bleach = 0x000F,
    Melancholic = 0x0010,
    Pure = 0x0011,
    Denim = 0x0012,
    Toy = 0x0013,
    Sepia = 0x0014,
    Blue = 0x0015,
    Red = 0x0016,
    Pink = 0x0017,
    Charcoal = 0x0018,
    Graphite = 0x0019,
    Binary = 0x001A,
    Carbon = 0x001B,
    D2xModeI = 0x001C,
    D2xModeII = 0x001D,
    D2xModeIII = 0x001E,
    FlexibleColor = 0x0020,
    Portrait = 0x0486,
    RichTonePortrait = 0x0493,
    Landscape = 0x04C7,
    FlatMonochrome = 0x0654,
    DeepToneMonochrome = 0x0655,
    HlgStandard = 0x1001,
    HlgMonochrome = 0x1002,
    HlgFlat = 0x1003,
}
}

tags! {
/// Active D-Lighting strength.
pub enum ActiveDLighting unknown("An Active D-Lighting level unknown to this crate") {
    AsShot = 1,
    None = 2,
    Low = 3,
    Normal = 4,
    High = 5,
    ExtraHigh = 6,
    ExtraHigh2 = 7,
}
}

tags! {
/// High ISO noise reduction mode.
pub enum NoiseReductionMode unknown("A noise reduction mode unknown to this crate") {
    Undefined = 0,
    TypeA = 1,
    TypeB = 2,
}
}

/// Hemisphere of a GPS coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u32)]
pub enum GpsPositionRef {
    North = 0,
    South = 1,
    East = 2,
    West = 3,
}

tags! {
/// ICC rendering intent of the output profile.
pub enum RenderingIntent unknown("A rendering intent unknown to this crate") {
    Perceptual = 0,
    Relative = 1,
    Absolute = 2,
    Saturation = 3,
}
}

tags! {
/// Whether the file carries edit information and whether it can be applied.
pub enum EditState unknown("An edit state unknown to this crate") {
    None = 0,
    ApplicableEdit = 1,
    InapplicableEdit = 2,
}
}

tags! {
/// Color processing generation used for development.
pub enum ColorProcess unknown("A color process unknown to this crate") {
    Latest = 0,
    AppliedInCamera = 1,
}
}

tags! {
/// Dynamic range of the developed image.
pub enum DynamicRange unknown("A dynamic range unknown to this crate") {
    Sdr = 0,
    Hdr = 1,
}
}

tags! {
/// Library-wide color space used for development.
pub enum DevelopColorMode unknown("A develop color mode unknown to this crate") {
    AppliedInCamera = 0,
    Srgb = 1,
    AdobeRgb = 2,
}
}

tags! {
/// Picture Control system version.
pub enum PictureControlVersion unknown("A Picture Control version unknown to this crate") {
    None = 0x00,
    V0100 = 0x01,
    V0200 = 0x02,
    V0210 = 0x03,
    V0300 = 0x04,
    V0301 = 0x05,
    V0302 = 0x06,
    V0310 = 0x07,
}
}

/// One adjustable raw-development parameter. The values are bit flags so that the
/// development-info command can report several kinds in one mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u32)]
pub enum RawDevelopmentKind {
    ParameterSet = 0x0000_0001,
    Quality = 0x0000_0002,
    ExposureCompensation = 0x0000_0004,
    WhiteBalance = 0x0000_0008,
    Tint = 0x0000_0010,
    NoiseReduction = 0x0000_0020,
    PictureControl = 0x0000_0040,
    ColorMode = 0x0000_0080,
    Sharpness = 0x0000_0100,
    ToneCompensation = 0x0000_0200,
    Saturation = 0x0000_0400,
    HueAdjustment = 0x0000_0800,
    FilterEffect = 0x0000_1000,
    ActiveDLighting = 0x0000_2000,
    SkinSoftening = 0x0000_4000,
    PortraitImpressionBalance = 0x0000_8000,
    PictureControlAsShot = 0x0001_0000,
    PixelShiftNoiseReduction = 0x0002_0000,
    Dehaze = 0x0004_0000,
    FilmGrain = 0x0008_0000,
}

impl RawDevelopmentKind {
    /// Every kind, in flag order.
    pub const ALL: [RawDevelopmentKind; 20] = [
        RawDevelopmentKind::ParameterSet,
        RawDevelopmentKind::Quality,
        RawDevelopmentKind::ExposureCompensation,
        RawDevelopmentKind::WhiteBalance,
        RawDevelopmentKind::Tint,
        RawDevelopmentKind::NoiseReduction,
        RawDevelopmentKind::PictureControl,
        RawDevelopmentKind::ColorMode,
        RawDevelopmentKind::Sharpness,
        RawDevelopmentKind::ToneCompensation,
        RawDevelopmentKind::Saturation,
        RawDevelopmentKind::HueAdjustment,
        RawDevelopmentKind::FilterEffect,
        RawDevelopmentKind::ActiveDLighting,
        RawDevelopmentKind::SkinSoftening,
        RawDevelopmentKind::PortraitImpressionBalance,
        RawDevelopmentKind::PictureControlAsShot,
        RawDevelopmentKind::PixelShiftNoiseReduction,
        RawDevelopmentKind::Dehaze,
        RawDevelopmentKind::FilmGrain,
    ];
}

/// Set of raw-development kinds, as reported by the development-info command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RawDevelopmentKinds(u32);

impl RawDevelopmentKinds {
    /// Wraps a raw mask. Bits without a known kind are kept.
    pub fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// The raw mask.
    pub fn bits(&self) -> u32 {
        self.0
    }

    /// Whether `kind` is in the set.
    pub fn contains(&self, kind: RawDevelopmentKind) -> bool {
        self.0 & u32::from(kind) != 0
    }

    /// Adds `kind` to the set.
    pub fn insert(&mut self, kind: RawDevelopmentKind) {
        self.0 |= u32::from(kind);
    }

    /// The known kinds present in the mask, in flag order.
    pub fn iter(&self) -> impl Iterator<Item = RawDevelopmentKind> + '_ {
        RawDevelopmentKind::ALL
            .into_iter()
            .filter(move |kind| self.contains(*kind))
    }
}

impl FromIterator<RawDevelopmentKind> for RawDevelopmentKinds {
    fn from_iter<I: IntoIterator<Item = RawDevelopmentKind>>(iter: I) -> Self {
        let mut kinds = Self::default();
        for kind in iter {
            kinds.insert(kind);
        }
        kinds
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_unknown_values_round_trip() {
        assert_eq!(Tag::from_u32(0x0801FF), None);
        let tag = Tag::from_u32_exhaustive(0x0801FF);
        assert_eq!(tag, Tag::Unknown(0x0801FF));
        assert_eq!(tag.to_u32(), 0x0801FF);
        assert_eq!(Tag::from_u32_exhaustive(0x080005), Tag::NkWhiteBalance);
        assert_eq!(TagType::from_u32_exhaustive(0x7777), TagType::Unknown(0x7777));
    }

    #[test]
    #[rustfmt::skip]
    fn test_tag_category() {
        let cases = [
            (Tag::Make,              TagCategory::Exif),
            (Tag::FocalLength,       TagCategory::Exif),
            (Tag::GpsLatitude,       TagCategory::Gps),
            (Tag::GpsMapDatum,       TagCategory::Gps),
            (Tag::NkWhiteBalance,    TagCategory::Vendor),
            (Tag::NkCpxPictureControl, TagCategory::Vendor),
            (Tag::None,              TagCategory::Other),
            (Tag::Unknown(0x050001), TagCategory::Other),
        ];
        for (tag, category) in cases {
            assert_eq!(tag.category(), category, "{tag:?}");
        }
    }

    #[test]
    fn test_command_codes_are_distinct() {
        let mut codes: Vec<u32> = Command::ALL.iter().map(|c| c.to_u32()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), Command::ALL.len());
    }

    #[test]
    fn test_raw_development_kinds() {
        let kinds: RawDevelopmentKinds = [RawDevelopmentKind::Tint, RawDevelopmentKind::Dehaze]
            .into_iter()
            .collect();
        assert_eq!(kinds.bits(), 0x0004_0010);
        assert!(kinds.contains(RawDevelopmentKind::Tint));
        assert!(!kinds.contains(RawDevelopmentKind::Quality));
        assert_eq!(
            kinds.iter().collect::<Vec<_>>(),
            vec![RawDevelopmentKind::Tint, RawDevelopmentKind::Dehaze]
        );
    }

    #[test]
    fn test_closed_enums_reject_out_of_range() {
        assert!(Orientation::try_from(0).is_err());
        assert_eq!(Orientation::try_from(6).unwrap(), Orientation::Cw270);
        assert!(ColorType::try_from(0x21).is_err());
        assert_eq!(ColorType::Cmyk.channels(), 4);
    }
}
