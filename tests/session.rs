//! Library and session lifecycle against the in-memory engine.
use nkfl::block::{Rect, RawDevelopmentSetting};
use nkfl::sdk::tags::{
    Command, DevelopColorMode, ImageFormat, PictureControl, RawDevelopmentKind, Tag,
};
use nkfl::session::OutputProfile;
use nkfl::{
    ErrorCode, LibraryState, NkflError, Progress, ProgressBridge, SessionOptions, WarningCode,
};

mod util;

#[test]
fn test_metadata_only_session_never_requests_pixels() {
    let (backend, library) = util::library_with(util::nef_fixture(util::color_temperature(5200)));

    assert_eq!(library.open().unwrap(), None);
    let mut session = library
        .open_session(
            util::nef_path(),
            SessionOptions::default().with_image_load_skip(true),
        )
        .unwrap();
    assert_eq!(session.file_format().unwrap(), ImageFormat::Nef);

    let info = session.image_info().unwrap();
    assert_eq!(info, util::nef_image());

    assert_eq!(session.close().unwrap(), None);
    assert_eq!(library.close().unwrap(), None);
    assert_eq!(library.state(), LibraryState::Uninitialized);

    assert_eq!(
        backend.calls(),
        vec![
            Command::OpenLibrary,
            Command::OpenSession,
            Command::GetFileInfo,
            Command::GetImageInfo,
            Command::CloseSession,
            Command::CloseLibrary,
        ]
    );
}

#[test]
fn test_sequence_violations() {
    let (backend, library) = util::library_with(util::nef_fixture(util::color_temperature(5200)));

    // nothing is open yet
    let err = library
        .open_session(util::nef_path(), SessionOptions::default())
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::WrongSequence);
    assert_eq!(library.close().unwrap_err().code(), ErrorCode::WrongSequence);

    library.open().unwrap();
    let mut session = library
        .open_session(util::nef_path(), SessionOptions::default())
        .unwrap();
    assert_eq!(library.close().unwrap_err().code(), ErrorCode::WrongSequence);

    session.close().unwrap();
    assert_eq!(session.close().unwrap_err().code(), ErrorCode::WrongSequence);
    assert_eq!(session.tag(Tag::Make).unwrap_err().code(), ErrorCode::WrongSequence);

    library.close().unwrap();
    let err = library
        .open_session(util::nef_path(), SessionOptions::default())
        .unwrap_err();
    assert!(matches!(err, NkflError::WrongSequence(_)));

    // local rejections never reach the engine
    assert_eq!(
        backend.calls(),
        vec![
            Command::OpenLibrary,
            Command::OpenSession,
            Command::CloseSession,
            Command::CloseLibrary,
        ]
    );
}

#[test]
fn test_unknown_source_is_file_not_found() {
    let (_, library) = util::library_with(util::nef_fixture(util::color_temperature(5200)));
    library.open().unwrap();
    let err = library
        .open_session(std::path::Path::new("missing.nef"), SessionOptions::default())
        .unwrap_err();
    assert!(matches!(err, NkflError::Backend(ErrorCode::FileNotFound)));
    assert_eq!(library.open_sessions(), 0);
}

#[test]
fn test_close_failure_still_releases_session() {
    let (backend, library) = util::library_with(util::nef_fixture(util::color_temperature(5200)));
    library.open().unwrap();
    let mut session = library
        .open_session(util::nef_path(), SessionOptions::default())
        .unwrap();
    backend.override_status(Command::CloseSession, ErrorCode::FileIO);
    assert_eq!(session.close().unwrap_err().code(), ErrorCode::FileIO);
    assert!(!session.is_open());
    assert_eq!(library.open_sessions(), 0);
    // the engine never saw the close
    assert_eq!(backend.open_sessions(), 1);
}

#[test]
fn test_pixels_and_thumbnails() {
    let (_, library) = util::library_with(util::nef_fixture(util::color_temperature(5200)));
    library.open().unwrap();

    let mut metadata_only = library
        .open_session(
            util::nef_path(),
            SessionOptions::default().with_image_load_skip(true),
        )
        .unwrap();
    let info = metadata_only.image_info().unwrap();
    let err = metadata_only
        .image_data(&info, ProgressBridge::none())
        .unwrap_err();
    assert!(matches!(err, NkflError::NotAllowed(_)));
    let thumbnail = metadata_only.thumbnail_info().unwrap();
    let pixels = metadata_only
        .thumbnail_data(&thumbnail, ProgressBridge::none())
        .unwrap();
    assert_eq!(Some(pixels.len()), thumbnail.buffer_len());
    metadata_only.close().unwrap();

    let mut session = library
        .open_session(util::nef_path(), SessionOptions::default())
        .unwrap();
    let full = session.image_data(&info, ProgressBridge::none()).unwrap();
    assert_eq!(Some(full.len()), info.buffer_len());

    let area = Rect {
        left: 2,
        top: 1,
        right: 4,
        bottom: 3,
    };
    let region = session
        .image_region(&info, area, ProgressBridge::none())
        .unwrap();
    let pixel_len = 3 * 2;
    let row_len = info.row_len().unwrap();
    assert_eq!(region.len(), 2 * 2 * pixel_len);
    // rows of the region match the same rows of the full image
    for (index, row) in (1..3).enumerate() {
        let start = row * row_len + 2 * pixel_len;
        assert_eq!(
            &region[index * 2 * pixel_len..(index + 1) * 2 * pixel_len],
            &full[start..start + 2 * pixel_len]
        );
    }
    session.close().unwrap();
    library.close().unwrap();
}

#[test]
fn test_progress_and_cancel() {
    let (_, library) = util::library_with(util::nef_fixture(util::color_temperature(5200)));
    library.open().unwrap();
    let mut session = library
        .open_session(util::nef_path(), SessionOptions::default())
        .unwrap();
    let info = session.image_info().unwrap();

    let mut reports = Vec::new();
    session
        .image_data(
            &info,
            ProgressBridge::new(|done, total| {
                reports.push((done, total));
                Progress::Continue
            }),
        )
        .unwrap();
    assert_eq!(reports.last(), Some(&(48, 48)));
    assert!(reports.windows(2).all(|w| w[0].0 < w[1].0));

    let err = session
        .image_data(&info, ProgressBridge::new(|_, _| Progress::Cancel))
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::Cancel);
}

#[test]
fn test_progress_callback_cannot_reenter_library() {
    let (_, library) = util::library_with(util::nef_fixture(util::color_temperature(5200)));
    library.open().unwrap();
    let mut session = library
        .open_session(util::nef_path(), SessionOptions::default())
        .unwrap();
    let mut other = library
        .open_session(util::nef_path(), SessionOptions::default())
        .unwrap();
    let info = session.image_info().unwrap();

    let mut inner = Vec::new();
    session
        .image_data(
            &info,
            ProgressBridge::new(|_, _| {
                inner.push(other.tag(Tag::Make).map_err(|err| err.code()));
                Progress::Continue
            }),
        )
        .unwrap();
    assert!(!inner.is_empty());
    assert!(inner.iter().all(|r| *r == Err(ErrorCode::WrongSequence)));

    // outside the callback the other session works as usual
    assert!(other.tag(Tag::Make).is_ok());
    other.close().unwrap();
    session.close().unwrap();
    library.close().unwrap();
}

#[test]
fn test_development_settings() {
    let fixture = util::nef_fixture(util::color_temperature(5200))
        .with_raw_development(RawDevelopmentSetting::ExposureCompensation(0.0))
        .with_raw_development(RawDevelopmentSetting::Dehaze(0))
        .with_picture_controls(vec![PictureControl::Standard, PictureControl::Vivid]);
    let (backend, library) = util::library_with(fixture);
    library.open().unwrap();
    let mut session = library
        .open_session(util::nef_path(), SessionOptions::default())
        .unwrap();

    let kinds = session.raw_development_info().unwrap();
    assert_eq!(
        kinds.iter().collect::<Vec<_>>(),
        vec![
            RawDevelopmentKind::ExposureCompensation,
            RawDevelopmentKind::Dehaze
        ]
    );

    session
        .set_raw_development(RawDevelopmentSetting::ExposureCompensation(-0.7))
        .unwrap();
    assert_eq!(
        session
            .raw_development(RawDevelopmentKind::ExposureCompensation)
            .unwrap(),
        RawDevelopmentSetting::ExposureCompensation(-0.7)
    );

    // out of range settings are refused before dispatch
    let calls = backend.calls().len();
    let err = session
        .set_raw_development(RawDevelopmentSetting::Dehaze(10))
        .unwrap_err();
    assert!(matches!(err, NkflError::InvalidParameter(_)));
    assert_eq!(backend.calls().len(), calls);

    let err = session
        .set_raw_development(RawDevelopmentSetting::Tint(1.0))
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::RawDevelopmentNotAllowed);

    assert_eq!(
        session.picture_controls().unwrap(),
        vec![PictureControl::Standard, PictureControl::Vivid]
    );

    let profile = OutputProfile {
        rendering_intent: nkfl::sdk::tags::RenderingIntent::Relative,
        profile: "/usr/share/color/icc/sRGB.icc".into(),
    };
    session.set_output_profile(&profile).unwrap();
    assert_eq!(session.output_profile().unwrap(), profile);

    backend.override_status(Command::SetColorProcess, WarningCode::EditStateNotApplicable);
    let warning = session
        .set_color_process(nkfl::sdk::tags::ColorProcess::AppliedInCamera)
        .unwrap();
    assert_eq!(warning, Some(WarningCode::EditStateNotApplicable));
    assert_eq!(
        session.color_process().unwrap(),
        nkfl::sdk::tags::ColorProcess::AppliedInCamera
    );

    assert_eq!(
        library.develop_color_mode().unwrap(),
        DevelopColorMode::AppliedInCamera
    );
    library
        .set_develop_color_mode(DevelopColorMode::AdobeRgb)
        .unwrap();
    assert_eq!(
        library.develop_color_mode().unwrap(),
        DevelopColorMode::AdobeRgb
    );

    session.close().unwrap();
    library.close().unwrap();
}

#[test]
fn test_memory_source() {
    let bytes = vec![0x4Du8, 0x4D, 0x00, 0x2A];
    let backend = nkfl::MemoryBackend::new().with_fixture(
        bytes.clone(),
        util::nef_fixture(util::color_temperature(5200)),
    );
    let library = nkfl::LibraryHandle::new(backend, nkfl::LibraryConfig::default());
    library.open().unwrap();
    let mut session = library
        .open_session(bytes, SessionOptions::default())
        .unwrap();
    assert_eq!(session.image_info().unwrap(), util::nef_image());
    session.close().unwrap();
    library.close().unwrap();
}
