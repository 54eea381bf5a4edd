//! Raw-development sub-parameters, one per adjustable kind.

use crate::error::{NkflError, NkflResult};
use crate::sdk::tags::{ActiveDLighting, DevelopWhiteBalance, PictureControl, RawDevelopmentKind};

/// White balance adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WhiteBalanceAdjustment {
    /// White balance preset.
    pub preset: DevelopWhiteBalance,
    /// Kelvin, used by presets that take a temperature.
    pub color_temperature: i32,
    /// Per-channel gains for gray-point balance.
    pub rgb: [u32; 3],
}

impl Default for WhiteBalanceAdjustment {
    fn default() -> Self {
        Self {
            preset: DevelopWhiteBalance::AsShot,
            color_temperature: 0,
            rgb: [0; 3],
        }
    }
}

/// Flexible Color parameters of a Picture Control.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FlexibleColor {
    /// Contrast.
    pub contrast: f64,
    /// Highlight level.
    pub highlight: f64,
    /// Shadow level.
    pub shadow: f64,
    /// White level.
    pub white_level: f64,
    /// Black level.
    pub black_level: f64,
    /// Saturation.
    pub saturation: f64,
    /// Hue, chroma and brightness for each of the eight color blender ranges.
    pub color_blender: [[f64; 3]; 8],
    /// Hue, chroma and brightness for highlights, mid-tones and shadows.
    pub color_grading: [[f64; 3]; 3],
    /// Color grading blending.
    pub blending: f64,
    /// Color grading balance.
    pub balance: f64,
}

/// A full Picture Control adjustment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PictureControlAdjustment {
    /// The Picture Control preset.
    pub picture_control: PictureControl,
    /// Apply `quick_adjust`.
    pub apply_quick_adjust: bool,
    /// Quick adjust strength.
    pub quick_adjust: f64,
    /// Automatic sharpening.
    pub sharpness_auto: bool,
    /// Sharpening.
    pub sharpness: f64,
    /// Automatic clarity.
    pub clarity_auto: bool,
    /// Clarity.
    pub clarity: f64,
    /// Use the image's user-defined curve instead of contrast and brightness.
    pub user_defined_curve: bool,
    /// Automatic contrast.
    pub contrast_auto: bool,
    /// Contrast.
    pub contrast: f64,
    /// Brightness.
    pub brightness: f64,
    /// Highlight level.
    pub highlight: f64,
    /// Shadow level.
    pub shadow: f64,
    /// Automatic saturation.
    pub saturation_auto: bool,
    /// Saturation.
    pub saturation: f64,
    /// Hue.
    pub hue: f64,
    /// Monochrome filter effect.
    pub filter: i32,
    /// Monochrome toning.
    pub toning: u32,
    /// Toning strength.
    pub toning_intensity: f64,
    /// Effect level.
    pub apply_level: f64,
    /// Apply `quick_sharp`.
    pub apply_quick_sharp: bool,
    /// Automatic quick sharp.
    pub quick_sharp_auto: bool,
    /// Quick sharp strength.
    pub quick_sharp: f64,
    /// Mid-range sharpening.
    pub middle_range_sharp: f64,
    /// Flexible Color parameters, used by the Flexible Color preset.
    pub flexible_color: FlexibleColor,
}

impl Default for PictureControlAdjustment {
    fn default() -> Self {
        Self {
            picture_control: PictureControl::AsShot,
            apply_quick_adjust: false,
            quick_adjust: 0.0,
            sharpness_auto: false,
            sharpness: 0.0,
            clarity_auto: false,
            clarity: 0.0,
            user_defined_curve: false,
            contrast_auto: false,
            contrast: 0.0,
            brightness: 0.0,
            highlight: 0.0,
            shadow: 0.0,
            saturation_auto: false,
            saturation: 0.0,
            hue: 0.0,
            filter: 0,
            toning: 0,
            toning_intensity: 0.0,
            apply_level: 0.0,
            apply_quick_sharp: false,
            quick_sharp_auto: false,
            quick_sharp: 0.0,
            middle_range_sharp: 0.0,
            flexible_color: FlexibleColor::default(),
        }
    }
}

/// One raw-development setting. Each variant corresponds to one [`RawDevelopmentKind`].
#[derive(Debug, Clone, PartialEq)]
pub enum RawDevelopmentSetting {
    /// Which stored parameter set to develop with.
    ParameterSet(u32),
    /// Development quality.
    Quality(u32),
    /// EV.
    ExposureCompensation(f64),
    /// White balance.
    WhiteBalance(WhiteBalanceAdjustment),
    /// −12 to 12.
    Tint(f64),
    /// Noise reduction level.
    NoiseReduction(u32),
    /// Picture Control to develop with.
    PictureControl(Box<PictureControlAdjustment>),
    /// Color mode of older cameras.
    ColorMode(u32),
    /// Sharpening of older cameras.
    Sharpness(u32),
    /// Tone compensation of older cameras.
    ToneCompensation(u32),
    /// Saturation of older cameras.
    Saturation(u32),
    /// Hue adjustment of older cameras.
    HueAdjustment(i32),
    /// Monochrome filter effect.
    FilterEffect(u32),
    /// Active D-Lighting level.
    ActiveDLighting(ActiveDLighting),
    /// Skin softening level.
    SkinSoftening(u32),
    /// Both −5 to 5.
    PortraitImpressionBalance {
        /// Hue shift.
        hue: f64,
        /// Brightness shift.
        brightness: f64,
    },
    /// The Picture Control recorded at capture.
    PictureControlAsShot(Box<PictureControlAdjustment>),
    /// Noise reduction for pixel-shift composites.
    PixelShiftNoiseReduction {
        /// Favor resolution over noise.
        resolution_priority: bool,
    },
    /// 0 to 9.
    Dehaze(u32),
    /// Film grain strength and size.
    FilmGrain {
        /// Grain strength.
        intensity: u32,
        /// Grain size.
        size: u32,
    },
}

impl RawDevelopmentSetting {
    /// The kind this setting adjusts.
    pub fn kind(&self) -> RawDevelopmentKind {
        match self {
            Self::ParameterSet(_) => RawDevelopmentKind::ParameterSet,
            Self::Quality(_) => RawDevelopmentKind::Quality,
            Self::ExposureCompensation(_) => RawDevelopmentKind::ExposureCompensation,
            Self::WhiteBalance(_) => RawDevelopmentKind::WhiteBalance,
            Self::Tint(_) => RawDevelopmentKind::Tint,
            Self::NoiseReduction(_) => RawDevelopmentKind::NoiseReduction,
            Self::PictureControl(_) => RawDevelopmentKind::PictureControl,
            Self::ColorMode(_) => RawDevelopmentKind::ColorMode,
            Self::Sharpness(_) => RawDevelopmentKind::Sharpness,
            Self::ToneCompensation(_) => RawDevelopmentKind::ToneCompensation,
            Self::Saturation(_) => RawDevelopmentKind::Saturation,
            Self::HueAdjustment(_) => RawDevelopmentKind::HueAdjustment,
            Self::FilterEffect(_) => RawDevelopmentKind::FilterEffect,
            Self::ActiveDLighting(_) => RawDevelopmentKind::ActiveDLighting,
            Self::SkinSoftening(_) => RawDevelopmentKind::SkinSoftening,
            Self::PortraitImpressionBalance { .. } => RawDevelopmentKind::PortraitImpressionBalance,
            Self::PictureControlAsShot(_) => RawDevelopmentKind::PictureControlAsShot,
            Self::PixelShiftNoiseReduction { .. } => RawDevelopmentKind::PixelShiftNoiseReduction,
            Self::Dehaze(_) => RawDevelopmentKind::Dehaze,
            Self::FilmGrain { .. } => RawDevelopmentKind::FilmGrain,
        }
    }

    /// A zero-valued setting of `kind`, to be filled in by a get request.
    pub fn placeholder(kind: RawDevelopmentKind) -> Self {
        match kind {
            RawDevelopmentKind::ParameterSet => Self::ParameterSet(0),
            RawDevelopmentKind::Quality => Self::Quality(0),
            RawDevelopmentKind::ExposureCompensation => Self::ExposureCompensation(0.0),
            RawDevelopmentKind::WhiteBalance => Self::WhiteBalance(WhiteBalanceAdjustment::default()),
            RawDevelopmentKind::Tint => Self::Tint(0.0),
            RawDevelopmentKind::NoiseReduction => Self::NoiseReduction(0),
            RawDevelopmentKind::PictureControl => Self::PictureControl(Box::default()),
            RawDevelopmentKind::ColorMode => Self::ColorMode(0),
            RawDevelopmentKind::Sharpness => Self::Sharpness(0),
            RawDevelopmentKind::ToneCompensation => Self::ToneCompensation(0),
            RawDevelopmentKind::Saturation => Self::Saturation(0),
            RawDevelopmentKind::HueAdjustment => Self::HueAdjustment(0),
            RawDevelopmentKind::FilterEffect => Self::FilterEffect(0),
            RawDevelopmentKind::ActiveDLighting => {
                Self::ActiveDLighting(ActiveDLighting::AsShot)
            }
            RawDevelopmentKind::SkinSoftening => Self::SkinSoftening(0),
            RawDevelopmentKind::PortraitImpressionBalance => Self::PortraitImpressionBalance {
                hue: 0.0,
                brightness: 0.0,
            },
            RawDevelopmentKind::PictureControlAsShot => Self::PictureControlAsShot(Box::default()),
            RawDevelopmentKind::PixelShiftNoiseReduction => Self::PixelShiftNoiseReduction {
                resolution_priority: false,
            },
            RawDevelopmentKind::Dehaze => Self::Dehaze(0),
            RawDevelopmentKind::FilmGrain => Self::FilmGrain {
                intensity: 0,
                size: 0,
            },
        }
    }

    /// Checks documented value bounds.
    pub fn validate(&self) -> NkflResult<()> {
        match self {
            RawDevelopmentSetting::ExposureCompensation(ev) => check_finite("exposure compensation", *ev),
            RawDevelopmentSetting::Tint(tint) => check_range("tint", *tint, -12.0, 12.0),
            RawDevelopmentSetting::Dehaze(level) if *level > 9 => Err(NkflError::InvalidParameter(
                format!("dehaze {level} outside 0..=9"),
            )),
            RawDevelopmentSetting::PortraitImpressionBalance { hue, brightness } => {
                check_range("portrait impression hue", *hue, -5.0, 5.0)?;
                check_range("portrait impression brightness", *brightness, -5.0, 5.0)
            }
            _ => Ok(()),
        }
    }
}

fn check_finite(name: &str, value: f64) -> NkflResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(NkflError::InvalidParameter(format!("{name} is not finite")))
    }
}

fn check_range(name: &str, value: f64, min: f64, max: f64) -> NkflResult<()> {
    check_finite(name, value)?;
    if value < min || value > max {
        return Err(NkflError::InvalidParameter(format!(
            "{name} {value} outside {min}..={max}"
        )));
    }
    Ok(())
}
