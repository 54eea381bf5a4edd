//! Library and session lifecycle, and the typed operations of an open session.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use bytes::BytesMut;
use tracing::span::EnteredSpan;
use tracing::{debug_span, info, warn};

use crate::backend::Backend;
use crate::block::*;
use crate::config::{LibraryConfig, SessionOptions};
use crate::dispatch::Dispatcher;
use crate::error::{NkflError, NkflResult};
use crate::metadata::reader::decode_text;
use crate::metadata::{request_buffer, ExifRecord, ImageInfo, TagEntry, TagValue, EXIF_TAGS};
use crate::progress::{ensure_outside_callback, ProgressBridge};
use crate::sdk::tags::{
    ColorProcess, DevelopColorMode, DevelopWhiteBalance, DynamicRange, EditState, ImageFormat,
    PictureControl, PictureControlVersion, RawDevelopmentKind, RawDevelopmentKinds,
    RenderingIntent, Tag,
};
use crate::sdk::{ErrorCode, WarningCode};

/// Library lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LibraryState {
    /// Not opened yet, or closed.
    Uninitialized,
    /// Open; sessions may be opened.
    Initialized,
}

#[derive(Debug)]
struct Lifecycle {
    state: LibraryState,
    open_sessions: usize,
    instance: usize,
}

#[derive(Debug)]
struct LibraryInner {
    dispatcher: Dispatcher,
    config: LibraryConfig,
    // Session operations hold this for reading; lifecycle transitions hold it for writing.
    lifecycle: RwLock<Lifecycle>,
}

impl LibraryInner {
    fn read(&self) -> RwLockReadGuard<'_, Lifecycle> {
        self.lifecycle.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Lifecycle> {
        self.lifecycle.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn library_param(&self, instance: usize) -> LibraryParam {
        LibraryParam {
            version: self.config.version,
            vm_memory_size: self.config.vm_memory_size,
            vm_file_info: self.config.vm_file_info.clone(),
            default_profile_path: self.config.default_profile_path.clone(),
            instance,
            ..Default::default()
        }
    }

    fn ensure_initialized(lifecycle: &Lifecycle) -> NkflResult<()> {
        if lifecycle.state != LibraryState::Initialized {
            return Err(NkflError::WrongSequence("library is not open".into()));
        }
        Ok(())
    }
}

impl Drop for LibraryInner {
    fn drop(&mut self) {
        let lifecycle = self
            .lifecycle
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        if lifecycle.state != LibraryState::Initialized {
            return;
        }
        let instance = lifecycle.instance;
        let mut param = self.library_param(instance);
        match self
            .dispatcher
            .execute(&mut ParamBlock::CloseLibrary(&mut param))
        {
            Ok(_) => info!("library closed on drop"),
            Err(err) => warn!(%err, "closing library on drop failed"),
        }
    }
}

/// An engine instance.
///
/// The handle is cheap to clone; clones share the same instance. Sessions keep the instance
/// alive, and it is closed when the last handle and session are dropped if `close` was never
/// called.
#[derive(Debug, Clone)]
pub struct LibraryHandle {
    inner: Arc<LibraryInner>,
}

impl LibraryHandle {
    /// Wraps `backend` in an uninitialized library. Nothing is sent until [`open`](Self::open).
    pub fn new(backend: impl Backend + 'static, config: LibraryConfig) -> Self {
        let dispatcher = Dispatcher::new(backend, config.serialize_dispatch);
        Self {
            inner: Arc::new(LibraryInner {
                dispatcher,
                config,
                lifecycle: RwLock::new(Lifecycle {
                    state: LibraryState::Uninitialized,
                    open_sessions: 0,
                    instance: 0,
                }),
            }),
        }
    }

    /// The current lifecycle state.
    pub fn state(&self) -> LibraryState {
        self.inner.read().state
    }

    /// Number of sessions opened through this library and not yet closed.
    pub fn open_sessions(&self) -> usize {
        self.inner.read().open_sessions
    }

    /// The configuration sent on open.
    pub fn config(&self) -> &LibraryConfig {
        &self.inner.config
    }

    /// The dispatcher, for sending parameter blocks directly.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.inner.dispatcher
    }

    /// Opens the engine instance. Opening an open library does nothing.
    pub fn open(&self) -> NkflResult<Option<WarningCode>> {
        ensure_outside_callback()?;
        let mut lifecycle = self.inner.write();
        if lifecycle.state == LibraryState::Initialized {
            return Ok(None);
        }
        let mut param = self.inner.library_param(0);
        let warning = self
            .inner
            .dispatcher
            .execute(&mut ParamBlock::OpenLibrary(&mut param))?;
        lifecycle.state = LibraryState::Initialized;
        lifecycle.instance = param.instance;
        info!(version = param.version, "library opened");
        Ok(warning)
    }

    /// Closes the engine instance. Fails with `WrongSequence` if it is not open or any
    /// session is still open.
    pub fn close(&self) -> NkflResult<Option<WarningCode>> {
        ensure_outside_callback()?;
        let mut lifecycle = self.inner.write();
        LibraryInner::ensure_initialized(&lifecycle)?;
        if lifecycle.open_sessions > 0 {
            return Err(NkflError::WrongSequence(format!(
                "{} session(s) still open",
                lifecycle.open_sessions
            )));
        }
        let mut param = self.inner.library_param(lifecycle.instance);
        let warning = self
            .inner
            .dispatcher
            .execute(&mut ParamBlock::CloseLibrary(&mut param))?;
        lifecycle.state = LibraryState::Uninitialized;
        lifecycle.instance = 0;
        info!("library closed");
        Ok(warning)
    }

    /// Opens a session on a file or an in-memory image.
    pub fn open_session(
        &self,
        source: impl Into<Source>,
        options: SessionOptions,
    ) -> NkflResult<Session> {
        let source = source.into();
        ensure_outside_callback()?;
        let mut lifecycle = self.inner.write();
        LibraryInner::ensure_initialized(&lifecycle)?;
        let mut param = SessionParam {
            source: source.clone(),
            image_load_skip: options.image_load_skip,
            ..Default::default()
        };
        let warning = self
            .inner
            .dispatcher
            .execute(&mut ParamBlock::OpenSession(&mut param))?;
        if let Some(warning) = warning {
            warn!(?warning, "session opened with warning");
        }
        lifecycle.open_sessions += 1;
        info!(
            session = param.session_id,
            image_load_skip = options.image_load_skip,
            "session opened"
        );
        Ok(Session {
            library: self.inner.clone(),
            id: param.session_id,
            source,
            options,
            open: true,
        })
    }

    /// The library-wide develop color mode.
    pub fn develop_color_mode(&self) -> NkflResult<DevelopColorMode> {
        ensure_outside_callback()?;
        let lifecycle = self.inner.read();
        LibraryInner::ensure_initialized(&lifecycle)?;
        let mut param = DevelopColorModeParam::default();
        log_warning(
            self.inner
                .dispatcher
                .execute(&mut ParamBlock::GetDevelopColorMode(&mut param))?,
        );
        Ok(param.mode)
    }

    /// Sets the library-wide develop color mode for every session.
    pub fn set_develop_color_mode(&self, mode: DevelopColorMode) -> NkflResult<Option<WarningCode>> {
        ensure_outside_callback()?;
        let lifecycle = self.inner.read();
        LibraryInner::ensure_initialized(&lifecycle)?;
        let mut param = DevelopColorModeParam {
            mode,
            ..Default::default()
        };
        self.inner
            .dispatcher
            .execute(&mut ParamBlock::SetDevelopColorMode(&mut param))
    }
}

fn log_warning(warning: Option<WarningCode>) {
    if let Some(warning) = warning {
        warn!(?warning, "engine warning");
    }
}

/// Color temperature bounds for one white-balance preset, in Kelvin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorTemperatureRange {
    /// Preset default.
    pub default: u32,
    /// Lowest accepted value.
    pub min: u32,
    /// Highest accepted value.
    pub max: u32,
}

/// Output color profile of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputProfile {
    /// Gamut mapping intent.
    pub rendering_intent: RenderingIntent,
    /// Path of the ICC profile. Empty means the engine default.
    pub profile: String,
}

/// Picture Control versions reported for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PictureControlVersions {
    /// Newest version the engine supports.
    pub latest: PictureControlVersion,
    /// Version of the edit stored in the file.
    pub modified: PictureControlVersion,
    /// Version recorded by the camera.
    pub recorded: PictureControlVersion,
}

/// One open decode context bound to one source.
///
/// Operations take `&mut self`, so a session never has two commands in flight. Using a closed
/// session fails with `WrongSequence` without reaching the engine. A session still open when
/// dropped is closed then.
#[derive(Debug)]
pub struct Session {
    library: Arc<LibraryInner>,
    id: u32,
    source: Source,
    options: SessionOptions,
    open: bool,
}

impl Session {
    /// The engine-assigned session id.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// The source this session was opened on.
    pub fn source(&self) -> &Source {
        &self.source
    }

    /// The options this session was opened with.
    pub fn options(&self) -> SessionOptions {
        self.options
    }

    /// Whether the session can still be used.
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// A handle to the owning library.
    pub fn library(&self) -> LibraryHandle {
        LibraryHandle {
            inner: self.library.clone(),
        }
    }

    fn span(&self) -> EnteredSpan {
        debug_span!("session", id = self.id).entered()
    }

    fn run(&self, block: &mut ParamBlock<'_, '_>) -> NkflResult<Option<WarningCode>> {
        if !self.open {
            return Err(NkflError::WrongSequence(format!(
                "session {} is closed",
                self.id
            )));
        }
        ensure_outside_callback()?;
        let lifecycle = self.library.read();
        LibraryInner::ensure_initialized(&lifecycle)?;
        self.library.dispatcher.execute(block)
    }

    fn get(&self, block: &mut ParamBlock<'_, '_>) -> NkflResult<()> {
        let command = block.command();
        if let Some(warning) = self.run(block)? {
            warn!(?command, ?warning, "engine warning");
        }
        Ok(())
    }

    /// Closes the session. The open-session count drops even when the engine reports an
    /// error, since the session cannot be used afterwards either way.
    pub fn close(&mut self) -> NkflResult<Option<WarningCode>> {
        let _span = self.span();
        if !self.open {
            return Err(NkflError::WrongSequence(format!(
                "session {} is already closed",
                self.id
            )));
        }
        ensure_outside_callback()?;
        let mut lifecycle = self.library.write();
        let mut param = SessionParam {
            session_id: self.id,
            source: self.source.clone(),
            image_load_skip: self.options.image_load_skip,
            ..Default::default()
        };
        let result = self
            .library
            .dispatcher
            .execute(&mut ParamBlock::CloseSession(&mut param));
        self.open = false;
        lifecycle.open_sessions = lifecycle.open_sessions.saturating_sub(1);
        info!(session = self.id, ok = result.is_ok(), "session closed");
        result
    }

    /// Container format of the source.
    pub fn file_format(&mut self) -> NkflResult<ImageFormat> {
        let _span = self.span();
        let mut param = FileInfoParam {
            session_id: self.id,
            ..Default::default()
        };
        self.get(&mut ParamBlock::GetFileInfo(&mut param))?;
        Ok(param.format)
    }

    fn info(&self, read: fn(&mut ImageInfoParam) -> ParamBlock<'_, '_>) -> NkflResult<ImageInfo> {
        let mut param = ImageInfoParam {
            session_id: self.id,
            ..Default::default()
        };
        self.get(&mut read(&mut param))?;
        ImageInfo::try_from(&param)
    }

    /// Information about the developed image.
    pub fn image_info(&mut self) -> NkflResult<ImageInfo> {
        let _span = self.span();
        self.info(|p| ParamBlock::GetImageInfo(p))
    }

    /// Asks the engine to develop at a different size or layout.
    pub fn set_image_info(&mut self, info: &ImageInfo) -> NkflResult<Option<WarningCode>> {
        let _span = self.span();
        let mut param = info.to_param(self.id);
        self.run(&mut ParamBlock::SetImageInfo(&mut param))
    }

    /// Information about the image as recorded by the camera.
    pub fn original_info(&mut self) -> NkflResult<ImageInfo> {
        let _span = self.span();
        self.info(|p| ParamBlock::GetOriginalInfo(p))
    }

    /// Geometry of the embedded thumbnail.
    pub fn thumbnail_info(&mut self) -> NkflResult<ImageInfo> {
        let _span = self.span();
        self.info(|p| ParamBlock::GetThumbnailInfo(p))
    }

    /// Asks the engine to deliver the thumbnail at a different size or layout.
    pub fn set_thumbnail_info(&mut self, info: &ImageInfo) -> NkflResult<Option<WarningCode>> {
        let _span = self.span();
        let mut param = info.to_param(self.id);
        self.run(&mut ParamBlock::SetThumbnailInfo(&mut param))
    }

    fn pixels(
        &self,
        thumbnail: bool,
        info: &ImageInfo,
        area: Rect,
        progress: ProgressBridge<'_>,
    ) -> NkflResult<Vec<u8>> {
        if !thumbnail && self.options.image_load_skip {
            return Err(NkflError::NotAllowed(format!(
                "session {} was opened for metadata only",
                self.id
            )));
        }
        if !info.contains(&area) {
            return Err(NkflError::InvalidParameter(format!(
                "area {area:?} outside {}x{} image",
                info.width, info.height
            )));
        }
        let len = info.region_len(&area).ok_or_else(|| {
            NkflError::InvalidParameter(format!("area {area:?} is too large to buffer"))
        })?;
        let mut buffer = vec![0u8; len];
        {
            let mut param = ImageDataParam {
                session_id: self.id,
                image_id: info.image_id,
                area,
                buffer: &mut buffer,
                progress,
                ..Default::default()
            };
            let mut block = if thumbnail {
                ParamBlock::GetThumbnailData(&mut param)
            } else {
                ParamBlock::GetImageData(&mut param)
            };
            self.get(&mut block)?;
        }
        Ok(buffer)
    }

    /// All pixels of the image described by `info`, row by row.
    pub fn image_data(
        &mut self,
        info: &ImageInfo,
        progress: ProgressBridge<'_>,
    ) -> NkflResult<Vec<u8>> {
        let _span = self.span();
        self.pixels(false, info, info.full_area(), progress)
    }

    /// The pixels inside `area`, which must lie within the image.
    pub fn image_region(
        &mut self,
        info: &ImageInfo,
        area: Rect,
        progress: ProgressBridge<'_>,
    ) -> NkflResult<Vec<u8>> {
        let _span = self.span();
        self.pixels(false, info, area, progress)
    }

    /// Thumbnail pixels. Available in metadata-only sessions too.
    pub fn thumbnail_data(
        &mut self,
        info: &ImageInfo,
        progress: ProgressBridge<'_>,
    ) -> NkflResult<Vec<u8>> {
        let _span = self.span();
        self.pixels(true, info, info.full_area(), progress)
    }

    /// Ids of every tag present in the file.
    pub fn tag_ids(&mut self) -> NkflResult<Vec<Tag>> {
        let _span = self.span();
        let mut param = TagInfoParam {
            session_id: self.id,
            ..Default::default()
        };
        self.get(&mut ParamBlock::GetTagInfo(&mut param))?;
        if param.count == 0 {
            return Ok(Vec::new());
        }
        param.tags = Some(vec![Tag::None; param.count as usize]);
        self.get(&mut ParamBlock::GetTagInfo(&mut param))?;
        Ok(param.tags.unwrap_or_default())
    }

    fn fetch_entry(&self, tag: Tag) -> NkflResult<TagEntry> {
        let mut param = TagDataParam {
            session_id: self.id,
            tag,
            ..Default::default()
        };
        self.get(&mut ParamBlock::GetTagData(&mut param))?;
        if !param.tag_type.is_inline() && param.length > 0 {
            param.data = Some(request_buffer(param.tag_type, param.length));
            self.get(&mut ParamBlock::GetTagData(&mut param))?;
        }
        let data = param
            .data
            .map(|mut data| {
                data.truncate(param.length as usize);
                data.freeze()
            })
            .unwrap_or_default();
        Ok(TagEntry {
            tag,
            tag_type: param.tag_type,
            value: param.value,
            length: param.length,
            data,
        })
    }

    /// The raw entry of one tag, without decoding it.
    pub fn tag_entry(&mut self, tag: Tag) -> NkflResult<TagEntry> {
        let _span = self.span();
        self.fetch_entry(tag)
    }

    /// One decoded tag.
    pub fn tag(&mut self, tag: Tag) -> NkflResult<TagValue> {
        let _span = self.span();
        self.fetch_entry(tag)?.decode()
    }

    /// Several decoded tags. Each tag succeeds or fails on its own.
    pub fn tags(&mut self, tags: &[Tag]) -> Vec<(Tag, NkflResult<TagValue>)> {
        let _span = self.span();
        tags.iter()
            .map(|tag| (*tag, self.fetch_entry(*tag).and_then(|e| e.decode())))
            .collect()
    }

    fn fetch_shooting_data(&self) -> NkflResult<Vec<String>> {
        let mut info = TagStringInfoParam {
            session_id: self.id,
            ..Default::default()
        };
        match self.get(&mut ParamBlock::GetTagStringInfo(&mut info)) {
            Err(err) if err.code() == ErrorCode::ShootingDataNotFound => return Ok(Vec::new()),
            other => other?,
        }
        let mut cells = Vec::new();
        for line in 0..info.lines {
            for column in 0..info.columns {
                let mut param = TagStringParam {
                    session_id: self.id,
                    line,
                    column,
                    ..Default::default()
                };
                self.get(&mut ParamBlock::GetTagString(&mut param))?;
                if param.string_length == 0 {
                    cells.push(String::new());
                    continue;
                }
                param.data = Some(BytesMut::zeroed(param.string_length as usize));
                self.get(&mut ParamBlock::GetTagString(&mut param))?;
                cells.push(param.data.as_deref().map(decode_text).unwrap_or_default());
            }
        }
        Ok(cells)
    }

    /// The vendor shooting-data table, line by line then column by column. A file without
    /// shooting data yields an empty list.
    pub fn shooting_data(&mut self) -> NkflResult<Vec<String>> {
        let _span = self.span();
        self.fetch_shooting_data()
    }

    /// Builds the EXIF record.
    ///
    /// Every well-known EXIF tag and every tag the file lists is requested. Tags the engine
    /// reports as missing are left out; any other failure fails the whole build.
    pub fn exif(&mut self) -> NkflResult<ExifRecord> {
        let _span = self.span();
        let image = self.info(|p| ParamBlock::GetImageInfo(p))?;

        let mut wanted = EXIF_TAGS.to_vec();
        let listed = {
            let mut param = TagInfoParam {
                session_id: self.id,
                ..Default::default()
            };
            self.get(&mut ParamBlock::GetTagInfo(&mut param))?;
            if param.count > 0 {
                param.tags = Some(vec![Tag::None; param.count as usize]);
                self.get(&mut ParamBlock::GetTagInfo(&mut param))?;
            }
            param.tags.unwrap_or_default()
        };
        for tag in listed {
            if !wanted.contains(&tag) {
                wanted.push(tag);
            }
        }

        let mut tag_data = HashMap::with_capacity(wanted.len());
        for tag in wanted {
            match self.fetch_entry(tag) {
                Ok(entry) => {
                    tag_data.insert(tag, entry.decode()?);
                }
                Err(err) if err.code() == ErrorCode::TagNotFound => continue,
                Err(err) => return Err(err),
            }
        }

        let shooting_data = self.fetch_shooting_data()?;
        ExifRecord::from_tags(&image, tag_data, shooting_data)
    }

    /// Color temperature bounds of a white-balance preset.
    pub fn color_temperature_range(
        &mut self,
        white_balance: DevelopWhiteBalance,
    ) -> NkflResult<ColorTemperatureRange> {
        let _span = self.span();
        let mut param = ColorTempRangeParam {
            session_id: self.id,
            white_balance,
            ..Default::default()
        };
        self.get(&mut ParamBlock::GetColorTempRange(&mut param))?;
        Ok(ColorTemperatureRange {
            default: param.default,
            min: param.min,
            max: param.max,
        })
    }

    /// The raw-development kinds that can be adjusted for this image.
    pub fn raw_development_info(&mut self) -> NkflResult<RawDevelopmentKinds> {
        let _span = self.span();
        let mut param = RawDevelopmentInfoParam {
            session_id: self.id,
            ..Default::default()
        };
        self.get(&mut ParamBlock::GetRawDevelopmentInfo(&mut param))?;
        Ok(param.kinds)
    }

    /// The current value of one raw-development setting.
    pub fn raw_development(&mut self, kind: RawDevelopmentKind) -> NkflResult<RawDevelopmentSetting> {
        let _span = self.span();
        let mut param = RawDevelopmentParam {
            session_id: self.id,
            setting: RawDevelopmentSetting::placeholder(kind),
            ..Default::default()
        };
        self.get(&mut ParamBlock::GetRawDevelopmentParam(&mut param))?;
        Ok(param.setting)
    }

    /// Applies a raw-development setting after checking its range.
    pub fn set_raw_development(
        &mut self,
        setting: RawDevelopmentSetting,
    ) -> NkflResult<Option<WarningCode>> {
        let _span = self.span();
        let mut param = RawDevelopmentParam {
            session_id: self.id,
            setting,
            ..Default::default()
        };
        self.run(&mut ParamBlock::RawDevelopment(&mut param))
    }

    /// The output color profile.
    pub fn output_profile(&mut self) -> NkflResult<OutputProfile> {
        let _span = self.span();
        let mut param = OutputProfileParam {
            session_id: self.id,
            ..Default::default()
        };
        self.get(&mut ParamBlock::GetOutputProfile(&mut param))?;
        Ok(OutputProfile {
            rendering_intent: param.rendering_intent,
            profile: param.profile,
        })
    }

    /// Sets the output color profile.
    pub fn set_output_profile(&mut self, profile: &OutputProfile) -> NkflResult<Option<WarningCode>> {
        let _span = self.span();
        let mut param = OutputProfileParam {
            session_id: self.id,
            rendering_intent: profile.rendering_intent,
            profile: profile.profile.clone(),
            ..Default::default()
        };
        self.run(&mut ParamBlock::SetOutputProfile(&mut param))
    }

    /// Path of the output device profile.
    pub fn output_device_profile(&mut self) -> NkflResult<String> {
        let _span = self.span();
        let mut param = OutputDeviceProfileParam {
            session_id: self.id,
            ..Default::default()
        };
        self.get(&mut ParamBlock::GetOutputDeviceProfile(&mut param))?;
        Ok(param.profile)
    }

    /// Sets the output device profile path.
    pub fn set_output_device_profile(&mut self, profile: &str) -> NkflResult<Option<WarningCode>> {
        let _span = self.span();
        let mut param = OutputDeviceProfileParam {
            session_id: self.id,
            profile: profile.to_owned(),
            ..Default::default()
        };
        self.run(&mut ParamBlock::SetOutputDeviceProfile(&mut param))
    }

    fn session_value(&self, read: fn(&mut SessionValueParam) -> ParamBlock<'_, '_>) -> NkflResult<u32> {
        let mut param = SessionValueParam {
            session_id: self.id,
            ..Default::default()
        };
        self.get(&mut read(&mut param))?;
        Ok(param.value)
    }

    fn set_session_value(
        &self,
        write: fn(&mut SessionValueParam) -> ParamBlock<'_, '_>,
        value: u32,
    ) -> NkflResult<Option<WarningCode>> {
        let mut param = SessionValueParam {
            session_id: self.id,
            value,
            ..Default::default()
        };
        self.run(&mut write(&mut param))
    }

    /// Whether the file carries an applicable edit.
    pub fn edit_state(&mut self) -> NkflResult<EditState> {
        let _span = self.span();
        self.session_value(|p| ParamBlock::GetEditState(p))
            .map(EditState::from_u32_exhaustive)
    }

    /// The color process used for development.
    pub fn color_process(&mut self) -> NkflResult<ColorProcess> {
        let _span = self.span();
        self.session_value(|p| ParamBlock::GetColorProcess(p))
            .map(ColorProcess::from_u32_exhaustive)
    }

    /// Sets the color process used for development.
    pub fn set_color_process(&mut self, process: ColorProcess) -> NkflResult<Option<WarningCode>> {
        let _span = self.span();
        self.set_session_value(|p| ParamBlock::SetColorProcess(p), process.to_u32())
    }

    /// The dynamic range used for development.
    pub fn dynamic_range(&mut self) -> NkflResult<DynamicRange> {
        let _span = self.span();
        self.session_value(|p| ParamBlock::GetDynamicRange(p))
            .map(DynamicRange::from_u32_exhaustive)
    }

    /// Sets the dynamic range used for development.
    pub fn set_dynamic_range(&mut self, range: DynamicRange) -> NkflResult<Option<WarningCode>> {
        let _span = self.span();
        self.set_session_value(|p| ParamBlock::SetDynamicRange(p), range.to_u32())
    }

    /// Picture Controls that can be applied to this image.
    pub fn picture_controls(&mut self) -> NkflResult<Vec<PictureControl>> {
        let _span = self.span();
        let mut param = PictureControlListParam {
            session_id: self.id,
            ..Default::default()
        };
        self.get(&mut ParamBlock::GetPictureControlList(&mut param))?;
        if param.count == 0 {
            return Ok(Vec::new());
        }
        param.items = Some(vec![PictureControl::AsShot; param.count as usize]);
        self.get(&mut ParamBlock::GetPictureControlList(&mut param))?;
        Ok(param.items.unwrap_or_default())
    }

    /// Picture Control versions of the engine and the file.
    pub fn picture_control_version(&mut self) -> NkflResult<PictureControlVersions> {
        let _span = self.span();
        let mut param = PictureControlVersionParam {
            session_id: self.id,
            ..Default::default()
        };
        self.get(&mut ParamBlock::GetPictureControlVersion(&mut param))?;
        Ok(PictureControlVersions {
            latest: param.latest,
            modified: param.modified,
            recorded: param.recorded,
        })
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.open {
            if let Err(err) = self.close() {
                warn!(session = self.id, %err, "closing session on drop failed");
            }
        }
    }
}

#[cfg(test)]
mod test {
    use std::path::PathBuf;
    use std::sync::Arc;

    use super::*;
    use crate::backend::{Fixture, MemoryBackend};
    use crate::sdk::tags::{ColorType, Command, Orientation};

    fn image() -> ImageInfo {
        ImageInfo {
            image_id: 1,
            width: 6,
            height: 4,
            byte_depth: 1,
            color: ColorType::Rgb,
            orientation: Orientation::Cw0,
            resolution: 300.0,
        }
    }

    fn library() -> (Arc<MemoryBackend>, LibraryHandle) {
        let backend = Arc::new(
            MemoryBackend::new().with_fixture(
                PathBuf::from("a.nef"),
                Fixture::new(ImageFormat::Nef, image()),
            ),
        );
        let library = LibraryHandle::new(backend.clone(), LibraryConfig::default());
        (backend, library)
    }

    #[test]
    fn test_open_is_idempotent() {
        let (backend, library) = library();
        library.open().unwrap();
        library.open().unwrap();
        assert_eq!(library.state(), LibraryState::Initialized);
        assert_eq!(backend.calls(), vec![Command::OpenLibrary]);
        library.close().unwrap();
        assert_eq!(library.state(), LibraryState::Uninitialized);
    }

    #[test]
    fn test_closed_session_is_rejected_locally() {
        let (backend, library) = library();
        library.open().unwrap();
        let mut session = library
            .open_session(PathBuf::from("a.nef"), SessionOptions::default())
            .unwrap();
        session.close().unwrap();
        let before = backend.calls().len();
        assert_eq!(
            session.image_info().unwrap_err().code(),
            ErrorCode::WrongSequence
        );
        assert_eq!(session.close().unwrap_err().code(), ErrorCode::WrongSequence);
        assert_eq!(backend.calls().len(), before);
    }

    #[test]
    fn test_region_must_lie_inside_image() {
        let (_, library) = library();
        library.open().unwrap();
        let mut session = library
            .open_session(PathBuf::from("a.nef"), SessionOptions::default())
            .unwrap();
        let info = session.image_info().unwrap();
        let area = Rect {
            left: 4,
            top: 0,
            right: 7,
            bottom: 1,
        };
        let err = session
            .image_region(&info, area, ProgressBridge::none())
            .unwrap_err();
        assert!(matches!(err, NkflError::InvalidParameter(_)));

        let area = Rect { right: 6, ..area };
        let pixels = session
            .image_region(&info, area, ProgressBridge::none())
            .unwrap();
        assert_eq!(pixels.len(), 2 * 3);
    }

    #[test]
    fn test_drop_closes_session() {
        let (backend, library) = library();
        library.open().unwrap();
        let session = library
            .open_session(PathBuf::from("a.nef"), SessionOptions::default())
            .unwrap();
        assert_eq!(library.open_sessions(), 1);
        drop(session);
        assert_eq!(library.open_sessions(), 0);
        assert_eq!(backend.open_sessions(), 0);
        library.close().unwrap();
    }
}
