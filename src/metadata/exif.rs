use std::collections::HashMap;

use crate::error::{NkflError, NkflResult};
use crate::metadata::image_info::ImageInfo;
use crate::metadata::value::{
    GpsPosition, GpsTimeStamp, LensInfo, LensType, TagDateTime, TagValue,
};
use crate::sdk::tags::{
    ActiveDLighting, ExposureProgram, FileFormat, GpsPositionRef, MeteringMode,
    NoiseReductionMode, Orientation, PictureControl, Tag, WhiteBalance,
};

/// Tags requested for every EXIF record, whether or not the engine lists them.
pub const EXIF_TAGS: &[Tag] = &[
    Tag::Make,
    Tag::Model,
    Tag::ImageDescription,
    Tag::Software,
    Tag::DateTime,
    Tag::Artist,
    Tag::Copyright,
    Tag::ExposureTime,
    Tag::FNumber,
    Tag::ExposureProgram,
    Tag::ExposureBiasValue,
    Tag::MeteringMode,
    Tag::Flash,
    Tag::FocalLength,
    Tag::NkIsoSensitivity,
    Tag::NkFileFormat,
    Tag::NkWhiteBalance,
    Tag::NkPictureControlMode,
    Tag::NkActiveDLighting,
    Tag::NkNoiseReductionMode,
    Tag::NkLensInfo,
    Tag::NkLensType,
    Tag::GpsLatitudeRef,
    Tag::GpsLatitude,
    Tag::GpsLongitudeRef,
    Tag::GpsLongitude,
    Tag::GpsAltitude,
    Tag::GpsTimeStamp,
];

const FLASH_FIRED: u32 = 0x01;
const FLASH_AUTO: u32 = 0x08;
const FLASH_RED_EYE: u32 = 0x40;

/// Shooting metadata of one image, normalized from its tags.
///
/// Every field is optional except those taken from the image info. A missing tag leaves its
/// field empty; a tag of the wrong shape fails the whole build.
#[derive(Debug, Clone, PartialEq)]
pub struct ExifRecord {
    /// Width of the developed image in pixels.
    pub width: u32,
    /// Height of the developed image in pixels.
    pub height: u32,
    /// Orientation of the developed image.
    pub orientation: Orientation,

    /// Camera maker.
    pub make: Option<String>,
    /// Camera model.
    pub model: Option<String>,
    /// Free-form image description.
    pub image_description: Option<String>,
    /// Firmware or software that wrote the file.
    pub software: Option<String>,
    /// Photographer.
    pub artist: Option<String>,
    /// Copyright notice.
    pub copyright: Option<String>,
    /// Capture time.
    pub date_time: Option<TagDateTime>,

    /// Seconds.
    pub exposure_time: Option<f64>,
    /// Aperture as an f-number.
    pub f_number: Option<f64>,
    /// EV, as recorded.
    pub exposure_bias: Option<f64>,
    /// Exposure program.
    pub exposure_program: Option<ExposureProgram>,
    /// Metering mode.
    pub metering_mode: Option<MeteringMode>,
    /// Raw EXIF flash bits.
    pub flash: Option<u32>,
    /// Millimetres.
    pub focal_length: Option<f64>,
    /// ISO sensitivity.
    pub iso: Option<u32>,

    /// Recorded file format.
    pub file_format: Option<FileFormat>,
    /// White balance mode.
    pub white_balance: Option<WhiteBalance>,
    /// Kelvin. Only set when the white balance mode is a color temperature.
    pub color_temperature: Option<u32>,
    /// Picture Control in effect at capture.
    pub picture_control: Option<PictureControl>,
    /// Active D-Lighting level.
    pub active_d_lighting: Option<ActiveDLighting>,
    /// Noise reduction mode.
    pub noise_reduction: Option<NoiseReductionMode>,

    /// Focal length and aperture range of the lens.
    pub lens_info: Option<LensInfo>,
    /// E.g. `24-70mm f/2.8`.
    pub lens: Option<String>,
    /// Lens facets.
    pub lens_type: Option<LensType>,

    /// Hemisphere of `gps_latitude`.
    pub gps_latitude_ref: Option<GpsPositionRef>,
    /// Unsigned latitude.
    pub gps_latitude: Option<GpsPosition>,
    /// Hemisphere of `gps_longitude`.
    pub gps_longitude_ref: Option<GpsPositionRef>,
    /// Unsigned longitude.
    pub gps_longitude: Option<GpsPosition>,
    /// Metres.
    pub gps_altitude: Option<f64>,
    /// UTC time of the GPS fix.
    pub gps_time_stamp: Option<GpsTimeStamp>,

    /// Vendor shooting-data lines, in engine order.
    pub shooting_data: Vec<String>,

    /// Decoded tags without a dedicated field.
    pub other_tags: HashMap<Tag, TagValue>,
}

impl ExifRecord {
    /// Builds the record from the image info and the decoded tags.
    pub fn from_tags(
        image: &ImageInfo,
        mut tag_data: HashMap<Tag, TagValue>,
        shooting_data: Vec<String>,
    ) -> NkflResult<Self> {
        let mut make = None;
        let mut model = None;
        let mut image_description = None;
        let mut software = None;
        let mut artist = None;
        let mut copyright = None;
        let mut date_time = None;
        let mut exposure_time = None;
        let mut f_number = None;
        let mut exposure_bias = None;
        let mut exposure_program = None;
        let mut metering_mode = None;
        let mut flash = None;
        let mut focal_length = None;
        let mut iso = None;
        let mut file_format = None;
        let mut white_balance = None;
        let mut color_temperature = None;
        let mut picture_control = None;
        let mut active_d_lighting = None;
        let mut noise_reduction = None;
        let mut lens_info = None;
        let mut lens_type = None;
        let mut gps_latitude_ref = None;
        let mut gps_latitude = None;
        let mut gps_longitude_ref = None;
        let mut gps_longitude = None;
        let mut gps_altitude = None;
        let mut gps_time_stamp = None;

        let mut other_tags = HashMap::new();

        tag_data.drain().try_for_each(|(tag, value)| {
            match tag {
                Tag::Make => make = Some(value.into_string(tag)?),
                Tag::Model => model = Some(value.into_string(tag)?),
                Tag::ImageDescription => image_description = Some(value.into_string(tag)?),
                Tag::Software => software = Some(value.into_string(tag)?),
                Tag::Artist => artist = Some(value.into_string(tag)?),
                Tag::Copyright => copyright = Some(value.into_string(tag)?),
                Tag::DateTime => date_time = Some(value.into_date_time(tag)?),
                Tag::ExposureTime => exposure_time = value.into_decimal(tag)?,
                Tag::FNumber => f_number = value.into_decimal(tag)?,
                Tag::ExposureBiasValue => exposure_bias = value.into_decimal(tag)?,
                Tag::FocalLength => focal_length = value.into_decimal(tag)?,
                Tag::ExposureProgram => {
                    exposure_program =
                        Some(ExposureProgram::from_u32_exhaustive(value.into_u32(tag)?))
                }
                Tag::MeteringMode => {
                    metering_mode = Some(MeteringMode::from_u32_exhaustive(value.into_u32(tag)?))
                }
                Tag::Flash => flash = Some(value.into_u32(tag)?),
                Tag::NkIsoSensitivity => iso = Some(value.into_u32(tag)?),
                Tag::NkFileFormat => {
                    file_format = Some(FileFormat::from_u32_exhaustive(value.into_u32(tag)?))
                }
                Tag::NkWhiteBalance => {
                    let setting = value.into_white_balance(tag)?;
                    white_balance = Some(setting.mode);
                    color_temperature = setting.kelvin();
                }
                Tag::NkPictureControlMode => {
                    picture_control =
                        Some(PictureControl::from_u32_exhaustive(value.into_u32(tag)?))
                }
                Tag::NkActiveDLighting => {
                    active_d_lighting =
                        Some(ActiveDLighting::from_u32_exhaustive(value.into_u32(tag)?))
                }
                Tag::NkNoiseReductionMode => {
                    noise_reduction =
                        Some(NoiseReductionMode::from_u32_exhaustive(value.into_u32(tag)?))
                }
                Tag::NkLensInfo => lens_info = Some(value.into_lens_info(tag)?),
                Tag::NkLensType => lens_type = Some(value.into_lens_type(tag)?),
                Tag::GpsLatitudeRef => gps_latitude_ref = Some(position_ref(tag, value)?),
                Tag::GpsLatitude => gps_latitude = Some(value.into_gps_position(tag)?),
                Tag::GpsLongitudeRef => gps_longitude_ref = Some(position_ref(tag, value)?),
                Tag::GpsLongitude => gps_longitude = Some(value.into_gps_position(tag)?),
                Tag::GpsAltitude => gps_altitude = value.into_decimal(tag)?,
                Tag::GpsTimeStamp => gps_time_stamp = Some(value.into_gps_time_stamp(tag)?),
                _ => {
                    other_tags.insert(tag, value);
                }
            }
            Ok::<_, NkflError>(())
        })?;

        let lens = lens_info.as_ref().and_then(LensInfo::description);

        Ok(ExifRecord {
            width: image.width,
            height: image.height,
            orientation: image.orientation,
            make,
            model,
            image_description,
            software,
            artist,
            copyright,
            date_time,
            exposure_time,
            f_number,
            exposure_bias,
            exposure_program,
            metering_mode,
            flash,
            focal_length,
            iso,
            file_format,
            white_balance,
            color_temperature,
            picture_control,
            active_d_lighting,
            noise_reduction,
            lens_info,
            lens,
            lens_type,
            gps_latitude_ref,
            gps_latitude,
            gps_longitude_ref,
            gps_longitude,
            gps_altitude,
            gps_time_stamp,
            shooting_data,
            other_tags,
        })
    }

    /// Whether the flash fired.
    pub fn flash_fired(&self) -> Option<bool> {
        self.flash.map(|f| f & FLASH_FIRED != 0)
    }

    /// Whether the flash was in auto mode.
    pub fn flash_auto(&self) -> Option<bool> {
        self.flash.map(|f| f & FLASH_AUTO != 0)
    }

    /// Whether red-eye reduction was on.
    pub fn flash_red_eye(&self) -> Option<bool> {
        self.flash.map(|f| f & FLASH_RED_EYE != 0)
    }

    /// Signed latitude in decimal degrees, when both the position and its reference are known.
    pub fn latitude(&self) -> Option<f64> {
        Some(self.gps_latitude?.to_decimal_degrees(self.gps_latitude_ref?))
    }

    /// Signed longitude in decimal degrees.
    pub fn longitude(&self) -> Option<f64> {
        Some(self.gps_longitude?.to_decimal_degrees(self.gps_longitude_ref?))
    }
}

fn position_ref(tag: Tag, value: TagValue) -> NkflResult<GpsPositionRef> {
    let raw = value.into_u32(tag)?;
    GpsPositionRef::try_from(raw)
        .map_err(|_| NkflError::tag_read(tag, format!("GPS reference {raw} out of range")))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::metadata::value::{Rational, SignedRational, WhiteBalanceSetting};
    use crate::sdk::tags::ColorType;

    fn image() -> ImageInfo {
        ImageInfo {
            image_id: 1,
            width: 8256,
            height: 5504,
            byte_depth: 2,
            color: ColorType::Rgb,
            orientation: Orientation::Cw0,
            resolution: 300.0,
        }
    }

    fn tags() -> HashMap<Tag, TagValue> {
        HashMap::from([
            (Tag::Make, TagValue::String("NIKON CORPORATION".into())),
            (Tag::Model, TagValue::String("NIKON D850".into())),
            (
                Tag::ExposureTime,
                TagValue::Rational(Rational {
                    numerator: 1,
                    denominator: 250,
                }),
            ),
            (
                Tag::FNumber,
                TagValue::Rational(Rational {
                    numerator: 56,
                    denominator: 10,
                }),
            ),
            (
                Tag::ExposureBiasValue,
                TagValue::SignedRational(SignedRational {
                    numerator: -2,
                    denominator: 3,
                }),
            ),
            (Tag::Flash, TagValue::Long(0x19)),
            (Tag::NkIsoSensitivity, TagValue::Long(400)),
            (Tag::MeteringMode, TagValue::Long(5)),
            (Tag::NkFileFormat, TagValue::Long(32)),
            (
                Tag::NkLensInfo,
                TagValue::LensInfo(LensInfo {
                    wide_focal_length: 24,
                    tele_focal_length: 70,
                    wide_max_aperture: 2.8,
                    tele_max_aperture: 0.0,
                }),
            ),
            (Tag::NkToneMode, TagValue::Long(3)),
        ])
    }

    #[test]
    fn test_from_tags() {
        let record = ExifRecord::from_tags(&image(), tags(), vec!["line".into()]).unwrap();
        assert_eq!(record.make.as_deref(), Some("NIKON CORPORATION"));
        assert_eq!(record.exposure_time, Some(1.0 / 250.0));
        assert_eq!(record.f_number, Some(5.6));
        assert_eq!(record.exposure_bias, Some(-2.0 / 3.0));
        assert_eq!(record.iso, Some(400));
        assert_eq!(record.metering_mode, Some(MeteringMode::Pattern));
        assert_eq!(record.file_format, Some(FileFormat::NefRaw));
        assert_eq!(record.lens.as_deref(), Some("24-70mm f/2.8"));
        assert_eq!(record.flash_fired(), Some(true));
        assert_eq!(record.flash_auto(), Some(true));
        assert_eq!(record.flash_red_eye(), Some(false));
        assert_eq!(record.artist, None);
        assert_eq!(record.width, 8256);
        assert_eq!(record.shooting_data, vec!["line".to_string()]);
        assert_eq!(record.other_tags.get(&Tag::NkToneMode), Some(&TagValue::Long(3)));
    }

    #[test]
    fn test_color_temperature_only_for_kelvin_mode() {
        let mut tags = tags();
        tags.insert(
            Tag::NkWhiteBalance,
            TagValue::WhiteBalanceMode(WhiteBalanceSetting {
                mode: WhiteBalance::ColorTemperature,
                color_temperature: 5200,
            }),
        );
        let record = ExifRecord::from_tags(&image(), tags.clone(), vec![]).unwrap();
        assert_eq!(record.color_temperature, Some(5200));

        tags.insert(
            Tag::NkWhiteBalance,
            TagValue::WhiteBalanceMode(WhiteBalanceSetting {
                mode: WhiteBalance::Auto,
                color_temperature: 5200,
            }),
        );
        let record = ExifRecord::from_tags(&image(), tags, vec![]).unwrap();
        assert_eq!(record.white_balance, Some(WhiteBalance::Auto));
        assert_eq!(record.color_temperature, None);
    }

    #[test]
    fn test_zero_denominator_leaves_field_empty() {
        let mut tags = tags();
        tags.insert(
            Tag::FNumber,
            TagValue::Rational(Rational {
                numerator: 0,
                denominator: 0,
            }),
        );
        let record = ExifRecord::from_tags(&image(), tags, vec![]).unwrap();
        assert_eq!(record.f_number, None);
    }

    #[test]
    fn test_wrong_shape_fails_build() {
        let mut tags = tags();
        tags.insert(Tag::NkIsoSensitivity, TagValue::String("400".into()));
        let err = ExifRecord::from_tags(&image(), tags, vec![]).unwrap_err();
        assert!(matches!(
            err,
            NkflError::TagRead {
                tag: Tag::NkIsoSensitivity,
                ..
            }
        ));
    }

    #[test]
    fn test_gps_coordinates() {
        let mut tags = tags();
        let pos = GpsPosition {
            degrees: 48.0,
            minutes: 51.0,
            seconds: 36.0,
        };
        tags.insert(Tag::GpsLatitudeRef, TagValue::Long(0));
        tags.insert(Tag::GpsLatitude, TagValue::GpsPosition(pos));
        tags.insert(Tag::GpsLongitudeRef, TagValue::Long(3));
        tags.insert(Tag::GpsLongitude, TagValue::GpsPosition(pos));
        let record = ExifRecord::from_tags(&image(), tags.clone(), vec![]).unwrap();
        assert!((record.latitude().unwrap() - 48.86).abs() < 1e-9);
        assert!((record.longitude().unwrap() + 48.86).abs() < 1e-9);

        tags.insert(Tag::GpsLatitudeRef, TagValue::Long(9));
        assert!(ExifRecord::from_tags(&image(), tags, vec![]).is_err());
    }
}
