#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use nkfl::metadata::{LensInfo, Rational, TagDateTime, WhiteBalanceSetting};
use nkfl::sdk::tags::{ColorType, FileFormat, ImageFormat, Orientation, Tag, WhiteBalance};
use nkfl::{Fixture, ImageInfo, LibraryConfig, LibraryHandle, MemoryBackend, TagValue};

pub(crate) const NEF_PATH: &str = "DSC_0042.NEF";

pub(crate) fn nef_image() -> ImageInfo {
    ImageInfo {
        image_id: 1,
        width: 64,
        height: 48,
        byte_depth: 2,
        color: ColorType::Rgb,
        orientation: Orientation::Cw0,
        resolution: 300.0,
    }
}

pub(crate) fn thumbnail_image() -> ImageInfo {
    ImageInfo {
        image_id: 2,
        width: 16,
        height: 12,
        byte_depth: 1,
        color: ColorType::Rgb,
        orientation: Orientation::Cw0,
        resolution: 72.0,
    }
}

/// A NEF recorded as uncompressed raw, with a white balance set to `white_balance`.
pub(crate) fn nef_fixture(white_balance: WhiteBalanceSetting) -> Fixture {
    Fixture::new(ImageFormat::Nef, nef_image())
        .with_thumbnail(thumbnail_image(), Vec::new())
        .with_tag(Tag::Make, &TagValue::String("NIKON CORPORATION".into()))
        .and_then(|f| f.with_tag(Tag::Model, &TagValue::String("NIKON Z 8".into())))
        .and_then(|f| {
            f.with_tag(
                Tag::ExposureTime,
                &TagValue::Rational(Rational {
                    numerator: 1,
                    denominator: 125,
                }),
            )
        })
        .and_then(|f| {
            f.with_tag(
                Tag::FNumber,
                &TagValue::Rational(Rational {
                    numerator: 56,
                    denominator: 10,
                }),
            )
        })
        .and_then(|f| f.with_tag(Tag::NkIsoSensitivity, &TagValue::Long(400)))
        .and_then(|f| {
            f.with_tag(
                Tag::NkFileFormat,
                &TagValue::Long(FileFormat::NefRaw.to_u32()),
            )
        })
        .and_then(|f| f.with_tag(Tag::NkWhiteBalance, &TagValue::WhiteBalanceMode(white_balance)))
        .and_then(|f| {
            f.with_tag(
                Tag::NkLensInfo,
                &TagValue::LensInfo(LensInfo {
                    wide_focal_length: 24,
                    tele_focal_length: 120,
                    wide_max_aperture: 4.0,
                    tele_max_aperture: 4.0,
                }),
            )
        })
        .and_then(|f| {
            f.with_tag(
                Tag::DateTime,
                &TagValue::DateTime(TagDateTime {
                    year: 2024,
                    month: 5,
                    day: 17,
                    hour: 9,
                    minute: 41,
                    second: 12.25,
                }),
            )
        })
        .expect("fixture tags encode")
}

pub(crate) fn color_temperature(kelvin: u32) -> WhiteBalanceSetting {
    WhiteBalanceSetting {
        mode: WhiteBalance::ColorTemperature,
        color_temperature: kelvin,
    }
}

pub(crate) fn nef_path() -> PathBuf {
    Path::new(NEF_PATH).to_path_buf()
}

/// An unopened library over a memory backend serving `fixture` at [`NEF_PATH`].
pub(crate) fn library_with(fixture: Fixture) -> (Arc<MemoryBackend>, LibraryHandle) {
    let backend = Arc::new(MemoryBackend::new().with_fixture(nef_path(), fixture));
    let library = LibraryHandle::new(backend.clone(), LibraryConfig::default());
    (backend, library)
}
