//! Decoded tag values.

use std::fmt;

use bytes::Bytes;

use crate::error::{NkflError, NkflResult};
use crate::sdk::tags::{GpsPositionRef, Tag, TagType, WhiteBalance};

/// Number of entries in a user-defined curve's lookup table.
pub const CURVE_LUT_LEN: usize = 2048;

/// Allowed number of spline points in a user-defined curve.
pub const CURVE_SPLINE_POINTS: std::ops::RangeInclusive<usize> = 2..=20;

/// An unsigned fraction. The raw pair is always kept, even when it has no decimal value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rational {
    /// Numerator.
    pub numerator: u32,
    /// Denominator, possibly zero.
    pub denominator: u32,
}

impl Rational {
    /// The decimal value, or `None` when the denominator is zero.
    pub fn to_f64(&self) -> Option<f64> {
        if self.denominator == 0 {
            None
        } else {
            Some(self.numerator as f64 / self.denominator as f64)
        }
    }
}

/// A signed fraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SignedRational {
    /// Numerator.
    pub numerator: i32,
    /// Denominator, possibly zero.
    pub denominator: i32,
}

impl SignedRational {
    /// The decimal value, or `None` when the denominator is zero.
    pub fn to_f64(&self) -> Option<f64> {
        if self.denominator == 0 {
            None
        } else {
            Some(self.numerator as f64 / self.denominator as f64)
        }
    }
}

/// A calendar date and time with fractional seconds, as recorded by the camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TagDateTime {
    /// Full year, e.g. 2024.
    pub year: u32,
    /// 1 to 12, or 0 when unset.
    pub month: u32,
    /// 1 to 31, or 0 when unset.
    pub day: u32,
    /// 0 to 23.
    pub hour: u32,
    /// 0 to 59.
    pub minute: u32,
    /// Seconds with sub-second precision.
    pub second: f64,
}

impl TagDateTime {
    /// Seconds since 1970-01-01 00:00:00, reading the fields as UTC. Sub-second precision is
    /// kept.
    ///
    /// Returns `None` for a month outside 1..=12 or a day outside 1..=31, which is what cameras
    /// write when their clock was never set.
    pub fn seconds_since_epoch(&self) -> Option<f64> {
        if !(1..=12).contains(&self.month) || !(1..=31).contains(&self.day) {
            return None;
        }
        let days = days_from_civil(self.year as i64, self.month, self.day);
        let whole = days * 86_400 + self.hour as i64 * 3_600 + self.minute as i64 * 60;
        Some(whole as f64 + self.second)
    }
}

// Days between 1970-01-01 and the given proleptic Gregorian date.
fn days_from_civil(year: i64, month: u32, day: u32) -> i64 {
    let year = if month <= 2 { year - 1 } else { year };
    let era = if year >= 0 { year } else { year - 399 } / 400;
    let year_of_era = year - era * 400;
    let month_from_march = (month as i64 + 9) % 12;
    let day_of_year = (153 * month_from_march + 2) / 5 + day as i64 - 1;
    let day_of_era = year_of_era * 365 + year_of_era / 4 - year_of_era / 100 + day_of_year;
    era * 146_097 + day_of_era - 719_468
}

impl fmt::Display for TagDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}:{:02}:{:02} {:02}:{:02}:{:06.3}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

/// Focal length and maximum aperture range of the mounted lens.
///
/// A prime lens has `tele_focal_length == 0`. A zoom with a constant maximum aperture has
/// `tele_max_aperture == 0.0`. Both conventions are kept as delivered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LensInfo {
    /// Shortest focal length in millimetres.
    pub wide_focal_length: u32,
    /// Longest focal length in millimetres, 0 for a prime.
    pub tele_focal_length: u32,
    /// Maximum aperture at the wide end.
    pub wide_max_aperture: f64,
    /// Maximum aperture at the tele end, 0 when constant.
    pub tele_max_aperture: f64,
}

impl LensInfo {
    /// Whether the lens covers more than one focal length.
    pub fn is_zoom(&self) -> bool {
        self.tele_focal_length != 0 && self.tele_focal_length != self.wide_focal_length
    }

    /// Whether the maximum aperture is the same across the zoom range.
    pub fn has_fixed_aperture(&self) -> bool {
        self.tele_max_aperture == 0.0 || self.tele_max_aperture == self.wide_max_aperture
    }

    /// A short description such as `24-70mm f/2.8`, `18-55mm f/3.5-5.6` or `50mm f/1.8`.
    ///
    /// `None` when the wide focal length is unknown.
    pub fn description(&self) -> Option<String> {
        if self.wide_focal_length == 0 {
            return None;
        }
        let wide_aperture = format_aperture(self.wide_max_aperture);
        let text = match (self.is_zoom(), self.has_fixed_aperture()) {
            (false, _) => format!("{}mm f/{wide_aperture}", self.wide_focal_length),
            (true, true) => format!(
                "{}-{}mm f/{wide_aperture}",
                self.wide_focal_length, self.tele_focal_length
            ),
            (true, false) => format!(
                "{}-{}mm f/{wide_aperture}-{}",
                self.wide_focal_length,
                self.tele_focal_length,
                format_aperture(self.tele_max_aperture)
            ),
        };
        Some(text)
    }
}

fn format_aperture(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.1}")
    }
}

/// Facets of the mounted lens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct LensType {
    /// CPU lens.
    pub cpu: bool,
    /// Whether `d_type` carries information.
    pub d_type_active: bool,
    /// D-type lens, meaningful only with `d_type_active`.
    pub d_type: bool,
    /// G-type lens, without an aperture ring.
    pub g_lens: bool,
    /// Vibration reduction.
    pub vibration_reduction: bool,
    /// V lens.
    pub v_lens: bool,
    /// Mounted through an F-mount adapter.
    pub f_mount_adapter: bool,
    /// Electromagnetic aperture.
    pub e_lens: bool,
    /// Stepping motor.
    pub stm_lens: bool,
}

impl LensType {
    /// The D-type facet, or `None` when the camera did not report it.
    pub fn is_d_type(&self) -> Option<bool> {
        self.d_type_active.then_some(self.d_type)
    }
}

/// One GPS coordinate as degrees, minutes and seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpsPosition {
    /// Whole or fractional degrees.
    pub degrees: f64,
    /// Minutes of arc.
    pub minutes: f64,
    /// Seconds of arc.
    pub seconds: f64,
}

impl GpsPosition {
    /// Signed decimal degrees. South and West are negative.
    pub fn to_decimal_degrees(&self, reference: GpsPositionRef) -> f64 {
        let magnitude = self.degrees + self.minutes / 60.0 + self.seconds / 3600.0;
        match reference {
            GpsPositionRef::North | GpsPositionRef::East => magnitude,
            GpsPositionRef::South | GpsPositionRef::West => -magnitude,
        }
    }
}

/// UTC time of the GPS fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GpsTimeStamp {
    /// Hour of the day.
    pub hours: u32,
    /// Minute of the hour.
    pub minutes: u32,
    /// Second of the minute.
    pub seconds: u32,
}

/// One control point of a user-defined curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SplinePoint {
    /// Input level.
    pub x: u8,
    /// Output level.
    pub y: u8,
}

/// A tone curve defined by levels, gamma, spline points and a precomputed lookup table.
#[derive(Debug, Clone, PartialEq)]
pub struct UserDefinedCurve {
    /// Input black point.
    pub input_min: u8,
    /// Input white point.
    pub input_max: u8,
    /// Output black point.
    pub output_min: u8,
    /// Output white point.
    pub output_max: u8,
    /// Integer part of the gamma.
    pub gamma_integer: u8,
    /// Hundredths of the gamma.
    pub gamma_fractional: u8,
    /// Between 2 and 20 points.
    pub points: Vec<SplinePoint>,
    /// Exactly [`CURVE_LUT_LEN`] bytes.
    pub lut: Bytes,
}

impl UserDefinedCurve {
    /// Gamma as a decimal, e.g. integer part 1 and fractional part 0 give `1.0`.
    pub fn gamma(&self) -> f64 {
        self.gamma_integer as f64 + self.gamma_fractional as f64 / 100.0
    }

    pub(crate) fn validate(&self) -> NkflResult<()> {
        if !CURVE_SPLINE_POINTS.contains(&self.points.len()) {
            return Err(NkflError::InvalidParameter(format!(
                "user-defined curve has {} spline points, expected 2 to 20",
                self.points.len()
            )));
        }
        if self.lut.len() != CURVE_LUT_LEN {
            return Err(NkflError::InvalidParameter(format!(
                "user-defined curve lookup table has {} entries, expected {CURVE_LUT_LEN}",
                self.lut.len()
            )));
        }
        Ok(())
    }
}

/// White balance mode with the color temperature recorded alongside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WhiteBalanceSetting {
    /// The white balance mode.
    pub mode: WhiteBalance,
    /// Kelvin, meaningful for the color-temperature mode only.
    pub color_temperature: u32,
}

impl WhiteBalanceSetting {
    /// The color temperature in Kelvin, present only when the mode is
    /// [`WhiteBalance::ColorTemperature`].
    pub fn kelvin(&self) -> Option<u32> {
        (self.mode == WhiteBalance::ColorTemperature).then_some(self.color_temperature)
    }
}

/// Coefficients of the camera's color matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorMatrix {
    /// Red coefficient, second row.
    pub mkr2: f64,
    /// Blue coefficient, second row.
    pub mkb2: f64,
    /// Red coefficient, third row.
    pub mkr3: f64,
    /// Blue coefficient, third row.
    pub mkb3: f64,
}

/// Bits per sample for up to four channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BitsPerSample(pub [u32; 4]);

/// Skin softening strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SkinSoftening {
    /// Strength level.
    pub level: u32,
}

/// Hue and brightness balance of portrait skin tones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PortraitImpressionBalance {
    /// Hue shift.
    pub hue: u32,
    /// Brightness shift.
    pub brightness: u32,
}

/// Film grain effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FilmGrain {
    /// Grain strength.
    pub intensity: u32,
    /// Grain size.
    pub grain_size: u32,
}

/// A decoded tag value. The variant follows the entry's [`TagType`], never the value itself.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum TagValue {
    /// An 8-bit integer.
    Byte(u8),
    /// Text, without the trailing NUL.
    String(String),
    /// A 32-bit unsigned integer.
    Long(u32),
    /// An unsigned fraction.
    Rational(Rational),
    /// A 64-bit float.
    Double(f64),
    /// A 32-bit signed integer.
    SignedLong(i32),
    /// A signed fraction.
    SignedRational(SignedRational),
    /// A flag.
    Boolean(bool),
    /// A recorded date and time.
    DateTime(TagDateTime),
    /// Focal length and aperture range.
    LensInfo(LensInfo),
    /// A tone curve.
    UserDefinedCurve(Box<UserDefinedCurve>),
    /// A latitude or longitude.
    GpsPosition(GpsPosition),
    /// Time of the GPS fix.
    GpsTimeStamp(GpsTimeStamp),
    /// Lens facets.
    LensType(LensType),
    /// Color matrix coefficients.
    ColorMatrix(ColorMatrix),
    /// White balance mode and temperature.
    WhiteBalanceMode(WhiteBalanceSetting),
    /// Per-channel bit depth.
    BitsPerSample(BitsPerSample),
    /// Skin softening strength.
    SkinSoftening(SkinSoftening),
    /// Portrait skin tone balance.
    PortraitImpressionBalance(PortraitImpressionBalance),
    /// Film grain effect.
    FilmGrain(FilmGrain),
    /// A type without a dedicated decoder. The inline value and payload are kept as received.
    Opaque {
        /// The type as received.
        type_code: TagType,
        /// The inline value field.
        value: u64,
        /// The payload.
        data: Bytes,
    },
}

impl TagValue {
    /// The type code this value is encoded with.
    pub fn tag_type(&self) -> TagType {
        match self {
            TagValue::Byte(_) => TagType::Byte,
            TagValue::String(_) => TagType::String,
            TagValue::Long(_) => TagType::Long,
            TagValue::Rational(_) => TagType::Rational,
            TagValue::Double(_) => TagType::Double,
            TagValue::SignedLong(_) => TagType::SignedLong,
            TagValue::SignedRational(_) => TagType::SignedRational,
            TagValue::Boolean(_) => TagType::Boolean,
            TagValue::DateTime(_) => TagType::DateTime,
            TagValue::LensInfo(_) => TagType::LensInfo,
            TagValue::UserDefinedCurve(_) => TagType::UserDefinedCurve,
            TagValue::GpsPosition(_) => TagType::GpsPosition,
            TagValue::GpsTimeStamp(_) => TagType::GpsTimeStamp,
            TagValue::LensType(_) => TagType::LensType,
            TagValue::ColorMatrix(_) => TagType::ColorMatrix,
            TagValue::WhiteBalanceMode(_) => TagType::WhiteBalanceMode,
            TagValue::BitsPerSample(_) => TagType::BitsPerSample,
            TagValue::SkinSoftening(_) => TagType::SkinSoftening,
            TagValue::PortraitImpressionBalance(_) => TagType::PortraitImpressionBalance,
            TagValue::FilmGrain(_) => TagType::FilmGrain,
            TagValue::Opaque { type_code, .. } => *type_code,
        }
    }

    fn shape_error(&self, tag: Tag, expected: &str) -> NkflError {
        NkflError::tag_read(
            tag,
            format!("expected {expected}, found a {:?} value", self.tag_type()),
        )
    }

    /// The value as an integer, for byte and long values.
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            TagValue::Byte(v) => Some(*v as u32),
            TagValue::Long(v) => Some(*v),
            _ => None,
        }
    }

    /// The value as a decimal, for doubles and rationals with a non-zero denominator.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            TagValue::Double(v) => Some(*v),
            TagValue::Rational(v) => v.to_f64(),
            TagValue::SignedRational(v) => v.to_f64(),
            _ => None,
        }
    }

    /// The value as text, for string values.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            TagValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub(crate) fn into_u32(self, tag: Tag) -> NkflResult<u32> {
        self.as_u32().ok_or_else(|| self.shape_error(tag, "an integer"))
    }

    pub(crate) fn into_string(self, tag: Tag) -> NkflResult<String> {
        match self {
            TagValue::String(s) => Ok(s),
            other => Err(other.shape_error(tag, "a string")),
        }
    }

    /// Decimal view of a rational. A zero denominator yields `Ok(None)`.
    pub(crate) fn into_decimal(self, tag: Tag) -> NkflResult<Option<f64>> {
        match self {
            TagValue::Rational(v) => Ok(v.to_f64()),
            TagValue::SignedRational(v) => Ok(v.to_f64()),
            TagValue::Double(v) => Ok(Some(v)),
            other => Err(other.shape_error(tag, "a rational")),
        }
    }

    pub(crate) fn into_date_time(self, tag: Tag) -> NkflResult<TagDateTime> {
        match self {
            TagValue::DateTime(v) => Ok(v),
            other => Err(other.shape_error(tag, "a date/time")),
        }
    }

    pub(crate) fn into_lens_info(self, tag: Tag) -> NkflResult<LensInfo> {
        match self {
            TagValue::LensInfo(v) => Ok(v),
            other => Err(other.shape_error(tag, "lens info")),
        }
    }

    pub(crate) fn into_lens_type(self, tag: Tag) -> NkflResult<LensType> {
        match self {
            TagValue::LensType(v) => Ok(v),
            other => Err(other.shape_error(tag, "a lens type")),
        }
    }

    pub(crate) fn into_gps_position(self, tag: Tag) -> NkflResult<GpsPosition> {
        match self {
            TagValue::GpsPosition(v) => Ok(v),
            other => Err(other.shape_error(tag, "a GPS position")),
        }
    }

    pub(crate) fn into_gps_time_stamp(self, tag: Tag) -> NkflResult<GpsTimeStamp> {
        match self {
            TagValue::GpsTimeStamp(v) => Ok(v),
            other => Err(other.shape_error(tag, "a GPS time stamp")),
        }
    }

    pub(crate) fn into_white_balance(self, tag: Tag) -> NkflResult<WhiteBalanceSetting> {
        match self {
            TagValue::WhiteBalanceMode(v) => Ok(v),
            other => Err(other.shape_error(tag, "a white balance mode")),
        }
    }
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_seconds_since_epoch() {
        let dt = TagDateTime {
            year: 2000,
            month: 1,
            day: 1,
            hour: 0,
            minute: 0,
            second: 0.0,
        };
        assert_eq!(dt.seconds_since_epoch(), Some(946_684_800.0));

        let dt = TagDateTime {
            year: 1970,
            month: 1,
            day: 2,
            hour: 0,
            minute: 0,
            second: 1.25,
        };
        assert_eq!(dt.seconds_since_epoch(), Some(86_401.25));
        assert_eq!(dt.to_string(), "1970:01:02 00:00:01.250");

        let unset = TagDateTime {
            year: 0,
            month: 0,
            day: 0,
            hour: 0,
            minute: 0,
            second: 0.0,
        };
        assert_eq!(unset.seconds_since_epoch(), None);
    }

    #[test]
    fn test_leap_day() {
        let dt = TagDateTime {
            year: 2024,
            month: 3,
            day: 1,
            hour: 0,
            minute: 0,
            second: 0.0,
        };
        let before = TagDateTime { month: 2, day: 28, ..dt };
        let diff = dt.seconds_since_epoch().unwrap() - before.seconds_since_epoch().unwrap();
        assert_eq!(diff, 2.0 * 86_400.0);
    }

    #[test]
    #[rustfmt::skip]
    fn test_lens_description() {
        let lens = |wide, tele, wa, ta| LensInfo {
            wide_focal_length: wide,
            tele_focal_length: tele,
            wide_max_aperture: wa,
            tele_max_aperture: ta,
        };
        let cases = [
            (lens(24, 70, 2.8, 0.0), Some("24-70mm f/2.8")),
            (lens(24, 70, 2.8, 2.8), Some("24-70mm f/2.8")),
            (lens(18, 55, 3.5, 5.6), Some("18-55mm f/3.5-5.6")),
            (lens(50, 0, 1.8, 0.0),  Some("50mm f/1.8")),
            (lens(200, 0, 4.0, 0.0), Some("200mm f/4")),
            (lens(0, 0, 0.0, 0.0),   None),
        ];
        for (info, expected) in cases {
            assert_eq!(info.description().as_deref(), expected, "{info:?}");
        }
    }

    #[test]
    fn test_d_type_needs_active_bit() {
        let lens = LensType {
            d_type: true,
            ..Default::default()
        };
        assert_eq!(lens.is_d_type(), None);
        let lens = LensType {
            d_type_active: true,
            ..lens
        };
        assert_eq!(lens.is_d_type(), Some(true));
    }

    #[test]
    fn test_white_balance_kelvin() {
        let wb = WhiteBalanceSetting {
            mode: WhiteBalance::ColorTemperature,
            color_temperature: 5200,
        };
        assert_eq!(wb.kelvin(), Some(5200));
        let wb = WhiteBalanceSetting {
            mode: WhiteBalance::Auto,
            ..wb
        };
        assert_eq!(wb.kelvin(), None);
    }

    #[test]
    fn test_decimal_degrees() {
        let pos = GpsPosition {
            degrees: 35.0,
            minutes: 30.0,
            seconds: 36.0,
        };
        assert!((pos.to_decimal_degrees(GpsPositionRef::North) - 35.51).abs() < 1e-9);
        assert!((pos.to_decimal_degrees(GpsPositionRef::West) + 35.51).abs() < 1e-9);
    }

    #[test]
    fn test_shape_mismatch_is_tag_read() {
        let err = TagValue::String("200".into())
            .into_u32(Tag::NkIsoSensitivity)
            .unwrap_err();
        assert!(matches!(
            err,
            NkflError::TagRead {
                tag: Tag::NkIsoSensitivity,
                ..
            }
        ));
    }

    proptest! {
        #[test]
        fn prop_zero_denominator_has_no_decimal(numerator in any::<u32>(), signed in any::<i32>()) {
            let r = Rational { numerator, denominator: 0 };
            prop_assert_eq!(r.to_f64(), None);
            prop_assert_eq!(r.numerator, numerator);
            let s = SignedRational { numerator: signed, denominator: 0 };
            prop_assert_eq!(s.to_f64(), None);
        }

        #[test]
        fn prop_epoch_is_monotonic_in_days(day in 1u32..28, second in 0.0f64..60.0) {
            let a = TagDateTime { year: 2023, month: 6, day, hour: 12, minute: 0, second };
            let b = TagDateTime { day: day + 1, ..a };
            let diff = b.seconds_since_epoch().unwrap() - a.seconds_since_epoch().unwrap();
            prop_assert!((diff - 86_400.0).abs() < 1e-6);
        }
    }
}
