use bytes::Bytes;
use nkfl::metadata::WhiteBalanceSetting;
use nkfl::sdk::tags::{Command, FileFormat, Tag, TagType, WhiteBalance};
use nkfl::{ErrorCode, NkflError, SessionOptions, TagEntry, TagValue};

mod util;

fn metadata_only() -> SessionOptions {
    SessionOptions::default().with_image_load_skip(true)
}

#[test]
fn test_color_temperature_white_balance() {
    let (_, library) = util::library_with(util::nef_fixture(util::color_temperature(5200)));
    library.open().unwrap();
    let mut session = library.open_session(util::nef_path(), metadata_only()).unwrap();

    let exif = session.exif().unwrap();
    assert_eq!(exif.white_balance, Some(WhiteBalance::ColorTemperature));
    assert_eq!(exif.color_temperature, Some(5200));

    assert_eq!(exif.width, 64);
    assert_eq!(exif.height, 48);
    assert_eq!(exif.make.as_deref(), Some("NIKON CORPORATION"));
    assert_eq!(exif.model.as_deref(), Some("NIKON Z 8"));
    assert_eq!(exif.exposure_time, Some(1.0 / 125.0));
    assert_eq!(exif.f_number, Some(5.6));
    assert_eq!(exif.iso, Some(400));
    assert_eq!(exif.file_format, Some(FileFormat::NefRaw));
    assert_eq!(exif.lens.as_deref(), Some("24-120mm f/4"));
    let date_time = exif.date_time.unwrap();
    assert_eq!((date_time.year, date_time.month, date_time.day), (2024, 5, 17));
    assert!(exif.shooting_data.is_empty());

    session.close().unwrap();
    library.close().unwrap();
}

#[test]
fn test_auto_white_balance_has_no_temperature() {
    let auto = WhiteBalanceSetting {
        mode: WhiteBalance::Auto,
        color_temperature: 5200,
    };
    let (_, library) = util::library_with(util::nef_fixture(auto));
    library.open().unwrap();
    let mut session = library.open_session(util::nef_path(), metadata_only()).unwrap();

    let exif = session.exif().unwrap();
    assert_eq!(exif.white_balance, Some(WhiteBalance::Auto));
    assert_eq!(exif.color_temperature, None);
}

#[test]
fn test_missing_tags_are_absent() {
    let (_, library) = util::library_with(util::nef_fixture(util::color_temperature(5200)));
    library.open().unwrap();
    let mut session = library.open_session(util::nef_path(), metadata_only()).unwrap();

    let err = session.tag(Tag::Artist).unwrap_err();
    assert_eq!(err.code(), ErrorCode::TagNotFound);

    let exif = session.exif().unwrap();
    assert_eq!(exif.artist, None);
    assert_eq!(exif.copyright, None);
    assert_eq!(exif.gps_latitude, None);
    assert!(exif.make.is_some());
    assert!(exif.iso.is_some());
}

#[test]
fn test_image_info_failure_fails_exif() {
    let (backend, library) = util::library_with(util::nef_fixture(util::color_temperature(5200)));
    library.open().unwrap();
    let mut session = library.open_session(util::nef_path(), metadata_only()).unwrap();

    backend.override_status(Command::GetImageInfo, ErrorCode::WrongImageInfo);
    let err = session.exif().unwrap_err();
    assert!(matches!(err, NkflError::Backend(ErrorCode::WrongImageInfo)));

    backend.clear_override(Command::GetImageInfo);
    assert!(session.exif().is_ok());
}

#[test]
fn test_malformed_tag() {
    let malformed = TagEntry {
        tag: Tag::Copyright,
        tag_type: TagType::String,
        value: 0,
        length: 0,
        data: Bytes::new(),
    };
    let fixture = util::nef_fixture(util::color_temperature(5200)).with_tag_entry(malformed);
    let (_, library) = util::library_with(fixture);
    library.open().unwrap();
    let mut session = library.open_session(util::nef_path(), metadata_only()).unwrap();

    let results = session.tags(&[Tag::Make, Tag::Copyright, Tag::Artist]);
    assert_eq!(results.len(), 3);
    assert!(matches!(
        &results[0],
        (Tag::Make, Ok(TagValue::String(make))) if make == "NIKON CORPORATION"
    ));
    assert!(matches!(
        results[1],
        (Tag::Copyright, Err(NkflError::TagRead { .. }))
    ));
    assert!(matches!(
        results[2],
        (Tag::Artist, Err(NkflError::Backend(ErrorCode::TagNotFound)))
    ));

    let err = session.exif().unwrap_err();
    assert_eq!(err.code(), ErrorCode::TagRead);
}

#[test]
fn test_engine_tag_error_fails_exif() {
    let fixture = util::nef_fixture(util::color_temperature(5200))
        .with_tag_error(Tag::Software, ErrorCode::FileIO);
    let (_, library) = util::library_with(fixture);
    library.open().unwrap();
    let mut session = library.open_session(util::nef_path(), metadata_only()).unwrap();
    assert_eq!(session.exif().unwrap_err().code(), ErrorCode::FileIO);
}

#[test]
fn test_shooting_data_order() {
    let table = vec![
        vec!["Camera".to_string(), "NIKON Z 8".to_string()],
        vec!["Lens".to_string(), "24-120mm f/4".to_string()],
        vec!["Comment".to_string()],
    ];
    let fixture = util::nef_fixture(util::color_temperature(5200)).with_shooting_data(table);
    let (_, library) = util::library_with(fixture);
    library.open().unwrap();
    let mut session = library.open_session(util::nef_path(), metadata_only()).unwrap();

    let expected = vec!["Camera", "NIKON Z 8", "Lens", "24-120mm f/4", "Comment", ""];
    assert_eq!(session.shooting_data().unwrap(), expected);
    assert_eq!(session.exif().unwrap().shooting_data, expected);
}

#[test]
fn test_listed_tags_land_in_other_tags() {
    let fixture = util::nef_fixture(util::color_temperature(5200))
        .with_tag(Tag::NkDehaze, &TagValue::Long(7))
        .unwrap();
    let (_, library) = util::library_with(fixture);
    library.open().unwrap();
    let mut session = library.open_session(util::nef_path(), metadata_only()).unwrap();

    assert!(session.tag_ids().unwrap().contains(&Tag::NkDehaze));
    let exif = session.exif().unwrap();
    assert_eq!(
        exif.other_tags.get(&Tag::NkDehaze),
        Some(&TagValue::Long(7))
    );
}
