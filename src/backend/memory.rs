use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use tracing::trace;

use crate::backend::{Backend, Capabilities};
use crate::block::{
    ImageDataParam, ImageInfoParam, ParamBlock, RawDevelopmentSetting, Source,
};
use crate::error::NkflResult;
use crate::metadata::{ImageInfo, TagEntry, TagValue};
use crate::progress::Progress;
use crate::sdk::tags::{
    ColorProcess, Command, DevelopColorMode, DynamicRange, EditState, ImageFormat,
    PictureControl, PictureControlVersion, RawDevelopmentKinds, RenderingIntent, Tag,
};
use crate::sdk::{ErrorCode, StatusCode};

/// Highest interface version the in-memory engine accepts.
pub const MEMORY_ENGINE_VERSION: u32 = 0x0100;

/// Everything the in-memory engine knows about one image file.
#[derive(Debug, Clone)]
pub struct Fixture {
    /// Container format reported by the file-info command.
    pub format: ImageFormat,
    /// The developed image.
    pub image: ImageInfo,
    /// The image as recorded, before any edit.
    pub original: ImageInfo,
    /// The embedded thumbnail, if any.
    pub thumbnail: Option<ImageInfo>,
    /// Pixels of the developed image, row-major. Missing bytes read as a fixed pattern.
    pub pixels: Bytes,
    /// Pixels of the thumbnail, row-major.
    pub thumbnail_pixels: Bytes,
    /// Tag entries, in the order the tag listing reports them.
    pub tags: Vec<TagEntry>,
    /// Tags that fail with the given status instead of delivering data.
    pub tag_errors: HashMap<Tag, ErrorCode>,
    /// Shooting-data string table, by line then column. `None` reports no shooting data.
    pub shooting_data: Option<Vec<Vec<String>>>,
    /// Current raw-development settings. Their kinds are the adjustable ones.
    pub raw_development: Vec<RawDevelopmentSetting>,
    /// Default, minimum and maximum color temperature in Kelvin.
    pub color_temperature_range: (u32, u32, u32),
    /// Rendering intent and path of the output profile.
    pub output_profile: (RenderingIntent, String),
    /// Path of the output device profile.
    pub output_device_profile: String,
    /// Reported edit state.
    pub edit_state: EditState,
    /// Current color process.
    pub color_process: ColorProcess,
    /// Current dynamic range.
    pub dynamic_range: DynamicRange,
    /// Picture Controls the listing reports.
    pub picture_controls: Vec<PictureControl>,
    /// Latest, modified and recorded Picture Control versions.
    pub picture_control_versions: [PictureControlVersion; 3],
    /// Progress reports per pixel request.
    pub progress_steps: u32,
}

impl Fixture {
    /// A fixture with no tags, no thumbnail and blank pixels.
    pub fn new(format: ImageFormat, image: ImageInfo) -> Self {
        Self {
            format,
            image,
            original: image,
            thumbnail: None,
            pixels: Bytes::new(),
            thumbnail_pixels: Bytes::new(),
            tags: Vec::new(),
            tag_errors: HashMap::new(),
            shooting_data: None,
            raw_development: Vec::new(),
            color_temperature_range: (5000, 2500, 10000),
            output_profile: (RenderingIntent::Perceptual, String::new()),
            output_device_profile: String::new(),
            edit_state: EditState::None,
            color_process: ColorProcess::Latest,
            dynamic_range: DynamicRange::Sdr,
            picture_controls: Vec::new(),
            picture_control_versions: [PictureControlVersion::None; 3],
            progress_steps: 4,
        }
    }

    /// Sets the original image info.
    pub fn with_original(mut self, original: ImageInfo) -> Self {
        self.original = original;
        self
    }

    /// Adds a thumbnail and its pixels.
    pub fn with_thumbnail(mut self, thumbnail: ImageInfo, pixels: impl Into<Bytes>) -> Self {
        self.thumbnail = Some(thumbnail);
        self.thumbnail_pixels = pixels.into();
        self
    }

    /// Sets the developed image's pixels.
    pub fn with_pixels(mut self, pixels: impl Into<Bytes>) -> Self {
        self.pixels = pixels.into();
        self
    }

    /// Adds a tag, encoded the way the engine delivers it.
    pub fn with_tag(mut self, tag: Tag, value: &TagValue) -> NkflResult<Self> {
        self.tags.push(TagEntry::from_value(tag, value)?);
        Ok(self)
    }

    /// Adds a raw entry, which need not be well formed.
    pub fn with_tag_entry(mut self, entry: TagEntry) -> Self {
        self.tags.push(entry);
        self
    }

    /// Makes reads of `tag` fail with `code`.
    pub fn with_tag_error(mut self, tag: Tag, code: ErrorCode) -> Self {
        self.tag_errors.insert(tag, code);
        self
    }

    /// Sets the shooting-data table.
    pub fn with_shooting_data(mut self, table: Vec<Vec<String>>) -> Self {
        self.shooting_data = Some(table);
        self
    }

    /// Makes `setting` adjustable, replacing any setting of the same kind.
    pub fn with_raw_development(mut self, setting: RawDevelopmentSetting) -> Self {
        self.raw_development.retain(|s| s.kind() != setting.kind());
        self.raw_development.push(setting);
        self
    }

    /// Sets the Picture Control listing.
    pub fn with_picture_controls(mut self, controls: Vec<PictureControl>) -> Self {
        self.picture_controls = controls;
        self
    }

    /// Sets how many progress reports each pixel request makes.
    pub fn with_progress_steps(mut self, steps: u32) -> Self {
        self.progress_steps = steps;
        self
    }
}

#[derive(Debug)]
struct LiveSession {
    fixture: Fixture,
    image_load_skip: bool,
}

#[derive(Debug, Default)]
struct MemoryState {
    fixtures: Vec<(Source, Fixture)>,
    instance: Option<usize>,
    next_instance: usize,
    sessions: HashMap<u32, LiveSession>,
    next_session: u32,
    develop_color_mode: Option<DevelopColorMode>,
    calls: Vec<Command>,
    overrides: HashMap<Command, StatusCode>,
}

/// A deterministic engine serving registered fixtures from memory.
///
/// It enforces the same ordering rules as a real engine, records every command it receives,
/// and can be told to answer a command with a fixed status.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
    capabilities: Capabilities,
}

impl MemoryBackend {
    /// An engine with no fixtures.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `fixture` under a file path or the exact bytes of an in-memory source.
    pub fn with_fixture(self, source: impl Into<Source>, fixture: Fixture) -> Self {
        self.add_fixture(source, fixture);
        self
    }

    /// Registers `fixture` on a shared backend.
    pub fn add_fixture(&self, source: impl Into<Source>, fixture: Fixture) {
        self.lock().fixtures.push((source.into(), fixture));
    }

    /// Sets the capabilities reported to the dispatcher.
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Answers `command` with `status`. An error is returned without executing the command; a
    /// warning is returned after executing it successfully.
    pub fn override_status(&self, command: Command, status: impl Into<StatusCode>) {
        self.lock().overrides.insert(command, status.into());
    }

    /// Removes an override set by [`override_status`](Self::override_status).
    pub fn clear_override(&self, command: Command) {
        self.lock().overrides.remove(&command);
    }

    /// Every command received so far, in order.
    pub fn calls(&self) -> Vec<Command> {
        self.lock().calls.clone()
    }

    /// Sessions currently open in the engine.
    pub fn open_sessions(&self) -> usize {
        self.lock().sessions.len()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // Pixels are copied without holding the state lock so that the progress callback runs
    // unlocked.
    fn read_pixels(&self, thumbnail: bool, param: &mut ImageDataParam<'_>) -> Result<(), ErrorCode> {
        let (info, pixels, steps) = {
            let mut state = self.lock();
            let session = state.session(param.session_id)?;
            if session.image_load_skip && !thumbnail {
                return Err(ErrorCode::NotAllowed);
            }
            let fixture = &session.fixture;
            if thumbnail {
                let info = fixture.thumbnail.ok_or(ErrorCode::NotSupported)?;
                (info, fixture.thumbnail_pixels.clone(), fixture.progress_steps)
            } else {
                (fixture.image, fixture.pixels.clone(), fixture.progress_steps)
            }
        };
        if param.image_id != info.image_id || !info.contains(&param.area) {
            return Err(ErrorCode::InvalidParameter);
        }
        let needed = info.region_len(&param.area).ok_or(ErrorCode::OutOfMemory)?;
        if param.buffer.len() < needed {
            return Err(ErrorCode::InvalidParameter);
        }

        let pixel_len = (info.channels() * info.byte_depth) as usize;
        let row_len = info.row_len().ok_or(ErrorCode::OutOfMemory)?;
        let out_row_len = param.area.width() as usize * pixel_len;
        let total = param.area.height() as u64;
        let every = (total / steps.max(1) as u64).max(1);

        for (index, row) in (param.area.top..param.area.bottom).enumerate() {
            let src = row as usize * row_len + param.area.left as usize * pixel_len;
            let dst = &mut param.buffer[index * out_row_len..(index + 1) * out_row_len];
            for (offset, byte) in dst.iter_mut().enumerate() {
                let at = src + offset;
                *byte = pixels.get(at).copied().unwrap_or((at % 251) as u8);
            }
            let done = index as u64 + 1;
            if steps > 0
                && (done % every == 0 || done == total)
                && param.progress.report(done, total) == Progress::Cancel
            {
                return Err(ErrorCode::Abort);
            }
        }
        Ok(())
    }
}

impl MemoryState {
    fn session(&mut self, id: u32) -> Result<&mut LiveSession, ErrorCode> {
        self.sessions.get_mut(&id).ok_or(ErrorCode::WrongSequence)
    }

    fn library_open(&self) -> Result<(), ErrorCode> {
        self.instance.map(|_| ()).ok_or(ErrorCode::WrongSequence)
    }

    fn handle(&mut self, block: &mut ParamBlock<'_, '_>) -> Result<(), ErrorCode> {
        use ParamBlock::*;
        match block {
            OpenLibrary(p) => {
                if self.instance.is_some() {
                    return Err(ErrorCode::WrongSequence);
                }
                if p.version > MEMORY_ENGINE_VERSION {
                    return Err(ErrorCode::VersionMismatch);
                }
                self.next_instance += 1;
                self.instance = Some(self.next_instance);
                self.develop_color_mode = Some(DevelopColorMode::AppliedInCamera);
                p.instance = self.next_instance;
            }
            CloseLibrary(_) => {
                self.library_open()?;
                if !self.sessions.is_empty() {
                    return Err(ErrorCode::WrongSequence);
                }
                self.instance = None;
            }
            OpenSession(p) => {
                self.library_open()?;
                let fixture = self
                    .fixtures
                    .iter()
                    .find(|(source, _)| *source == p.source)
                    .map(|(_, fixture)| fixture.clone())
                    .ok_or(match p.source {
                        Source::File(_) => ErrorCode::FileNotFound,
                        Source::Memory(_) => ErrorCode::FileIO,
                    })?;
                self.next_session += 1;
                p.session_id = self.next_session;
                self.sessions.insert(
                    p.session_id,
                    LiveSession {
                        fixture,
                        image_load_skip: p.image_load_skip,
                    },
                );
            }
            CloseSession(p) => {
                self.sessions
                    .remove(&p.session_id)
                    .ok_or(ErrorCode::WrongSequence)?;
            }
            GetFileInfo(p) => p.format = self.session(p.session_id)?.fixture.format,
            GetImageInfo(p) => {
                let info = self.session(p.session_id)?.fixture.image;
                fill_info(p, &info);
            }
            SetImageInfo(p) => {
                let info = accept_info(p)?;
                let fixture = &mut self.session(p.session_id)?.fixture;
                if info.image_id != fixture.image.image_id {
                    return Err(ErrorCode::InvalidParameter);
                }
                fixture.image = info;
            }
            GetOriginalInfo(p) => {
                let info = self.session(p.session_id)?.fixture.original;
                fill_info(p, &info);
            }
            GetThumbnailInfo(p) => {
                let info = self.session(p.session_id)?.fixture.thumbnail;
                fill_info(p, &info.ok_or(ErrorCode::NotSupported)?);
            }
            SetThumbnailInfo(p) => {
                let info = accept_info(p)?;
                let fixture = &mut self.session(p.session_id)?.fixture;
                match &mut fixture.thumbnail {
                    Some(thumb) if thumb.image_id == info.image_id => *thumb = info,
                    Some(_) => return Err(ErrorCode::InvalidParameter),
                    None => return Err(ErrorCode::NotSupported),
                }
            }
            GetImageData(_) | GetThumbnailData(_) => {
                // served by `read_pixels`
                return Err(ErrorCode::Unexpected);
            }
            GetTagInfo(p) => {
                let ids: Vec<Tag> = self
                    .session(p.session_id)?
                    .fixture
                    .tags
                    .iter()
                    .map(|e| e.tag)
                    .collect();
                if let Some(list) = &mut p.tags {
                    if list.len() != ids.len() {
                        return Err(ErrorCode::InvalidParameter);
                    }
                    list.copy_from_slice(&ids);
                }
                p.count = ids.len() as u32;
            }
            GetTagData(p) => {
                let fixture = &self.session(p.session_id)?.fixture;
                if let Some(code) = fixture.tag_errors.get(&p.tag) {
                    return Err(*code);
                }
                let entry = fixture
                    .tags
                    .iter()
                    .find(|e| e.tag == p.tag)
                    .ok_or(ErrorCode::TagNotFound)?;
                p.tag_type = entry.tag_type;
                p.value = entry.value;
                p.length = entry.length;
                if let Some(data) = &mut p.data {
                    let len = (entry.length as usize).min(entry.data.len());
                    if data.len() < len {
                        return Err(ErrorCode::InvalidParameter);
                    }
                    data[..len].copy_from_slice(&entry.data[..len]);
                }
            }
            GetTagStringInfo(p) => {
                let table = self
                    .session(p.session_id)?
                    .fixture
                    .shooting_data
                    .as_ref()
                    .ok_or(ErrorCode::ShootingDataNotFound)?;
                p.lines = table.len() as u32;
                p.columns = table.iter().map(Vec::len).max().unwrap_or(0) as u32;
            }
            GetTagString(p) => {
                let table = self
                    .session(p.session_id)?
                    .fixture
                    .shooting_data
                    .as_ref()
                    .ok_or(ErrorCode::ShootingDataNotFound)?;
                let line = table
                    .get(p.line as usize)
                    .ok_or(ErrorCode::InvalidParameter)?;
                let text = line.get(p.column as usize).map(String::as_str).unwrap_or("");
                p.string_length = text.len() as u32 + 1;
                p.layout_length = text.chars().count() as u32;
                if let Some(data) = &mut p.data {
                    if data.len() < text.len() + 1 {
                        return Err(ErrorCode::InvalidParameter);
                    }
                    data[..text.len()].copy_from_slice(text.as_bytes());
                    data[text.len()] = 0;
                }
            }
            GetColorTempRange(p) => {
                let (default, min, max) = self.session(p.session_id)?.fixture.color_temperature_range;
                p.default = default;
                p.min = min;
                p.max = max;
            }
            GetRawDevelopmentInfo(p) => {
                p.kinds = self
                    .session(p.session_id)?
                    .fixture
                    .raw_development
                    .iter()
                    .map(RawDevelopmentSetting::kind)
                    .collect::<RawDevelopmentKinds>();
            }
            GetRawDevelopmentParam(p) => {
                let kind = p.setting.kind();
                p.setting = self
                    .session(p.session_id)?
                    .fixture
                    .raw_development
                    .iter()
                    .find(|s| s.kind() == kind)
                    .cloned()
                    .ok_or(ErrorCode::NotSupported)?;
            }
            RawDevelopment(p) => {
                let kind = p.setting.kind();
                let fixture = &mut self.session(p.session_id)?.fixture;
                let current = fixture
                    .raw_development
                    .iter_mut()
                    .find(|s| s.kind() == kind)
                    .ok_or(ErrorCode::RawDevelopmentNotAllowed)?;
                *current = p.setting.clone();
            }
            GetOutputProfile(p) => {
                let (intent, profile) = self.session(p.session_id)?.fixture.output_profile.clone();
                p.rendering_intent = intent;
                p.profile = profile;
            }
            SetOutputProfile(p) => {
                self.session(p.session_id)?.fixture.output_profile =
                    (p.rendering_intent, p.profile.clone());
            }
            GetOutputDeviceProfile(p) => {
                p.profile = self.session(p.session_id)?.fixture.output_device_profile.clone();
            }
            SetOutputDeviceProfile(p) => {
                self.session(p.session_id)?.fixture.output_device_profile = p.profile.clone();
            }
            GetEditState(p) => p.value = self.session(p.session_id)?.fixture.edit_state.to_u32(),
            GetColorProcess(p) => {
                p.value = self.session(p.session_id)?.fixture.color_process.to_u32()
            }
            SetColorProcess(p) => {
                self.session(p.session_id)?.fixture.color_process =
                    ColorProcess::from_u32(p.value).ok_or(ErrorCode::InvalidParameter)?
            }
            GetDynamicRange(p) => {
                p.value = self.session(p.session_id)?.fixture.dynamic_range.to_u32()
            }
            SetDynamicRange(p) => {
                self.session(p.session_id)?.fixture.dynamic_range =
                    DynamicRange::from_u32(p.value).ok_or(ErrorCode::InvalidParameter)?
            }
            GetPictureControlList(p) => {
                let controls = self.session(p.session_id)?.fixture.picture_controls.clone();
                if let Some(items) = &mut p.items {
                    if items.len() != controls.len() {
                        return Err(ErrorCode::InvalidParameter);
                    }
                    items.copy_from_slice(&controls);
                }
                p.count = controls.len() as u32;
            }
            GetPictureControlVersion(p) => {
                let [latest, modified, recorded] =
                    self.session(p.session_id)?.fixture.picture_control_versions;
                p.latest = latest;
                p.modified = modified;
                p.recorded = recorded;
            }
            GetDevelopColorMode(p) => {
                self.library_open()?;
                p.mode = self
                    .develop_color_mode
                    .unwrap_or(DevelopColorMode::AppliedInCamera);
            }
            SetDevelopColorMode(p) => {
                self.library_open()?;
                if let DevelopColorMode::Unknown(_) = p.mode {
                    return Err(ErrorCode::InvalidParameter);
                }
                self.develop_color_mode = Some(p.mode);
            }
        }
        Ok(())
    }
}

fn fill_info(param: &mut ImageInfoParam, info: &ImageInfo) {
    *param = info.to_param(param.session_id);
}

fn accept_info(param: &ImageInfoParam) -> Result<ImageInfo, ErrorCode> {
    ImageInfo::try_from(param).map_err(|e| e.code())
}

impl Backend for MemoryBackend {
    fn entry(&self, block: &mut ParamBlock<'_, '_>) -> u32 {
        let command = block.command();
        let forced = {
            let mut state = self.lock();
            state.calls.push(command);
            state.overrides.get(&command).copied()
        };
        trace!(?command, ?forced, "memory engine");
        if let Some(StatusCode::Error(code)) = forced {
            return code.into();
        }

        let result = match block {
            ParamBlock::GetImageData(p) => self.read_pixels(false, p),
            ParamBlock::GetThumbnailData(p) => self.read_pixels(true, p),
            other => self.lock().handle(other),
        };
        match (result, forced) {
            (Err(code), _) => code.into(),
            (Ok(()), Some(status)) => status.to_raw(),
            (Ok(()), None) => 0,
        }
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }
}
