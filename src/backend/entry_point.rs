use std::ffi::{c_long, c_ulong, c_void};
use std::mem::size_of;
use std::panic::{self, AssertUnwindSafe};
use std::ptr;

use tracing::trace;

use crate::backend::native::{self, layout_size, EntryProc, NativeRect, Plain, MAX_PATH};
use crate::backend::{Backend, Capabilities};
use crate::block::{
    ImageDataParam, ImageInfoParam, ParamBlock, PictureControlAdjustment, RawDevelopmentSetting,
    Rect, Source,
};
use crate::metadata::reader::{decode_text, encode_fixed_text};
use crate::progress::ProgressBridge;
use crate::sdk::tags::{
    ActiveDLighting, Command, DevelopColorMode, DevelopWhiteBalance, ImageFormat, PictureControl,
    PictureControlVersion, RawDevelopmentKinds, RenderingIntent, Tag, TagType,
};
use crate::sdk::{ErrorCode, StatusCode};

/// Forwards commands to a native engine entry point.
///
/// Each typed block is lowered into its `#[repr(C)]` layout, passed by pointer, and the
/// engine's outputs are copied back once it reports success.
#[derive(Debug, Clone, Copy)]
pub struct EntryPointBackend {
    entry: EntryProc,
    capabilities: Capabilities,
}

impl EntryPointBackend {
    /// Wraps an engine entry point, typically resolved from a shared library.
    ///
    /// # Safety
    ///
    /// `entry` must follow the engine's calling convention and accept the layouts in
    /// [`native`] for every command, for as long as this backend is alive.
    pub unsafe fn new(entry: EntryProc) -> Self {
        Self {
            entry,
            capabilities: Capabilities::default(),
        }
    }

    /// Declares what the engine behind `entry` supports. Defaults to nothing.
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    fn call<T>(&self, command: Command, block: &mut T) -> u32 {
        // SAFETY: `block` is a live native layout matching `command`, and any pointers inside
        // it reference buffers that outlive this call.
        let status = unsafe {
            (self.entry)(
                c_ulong::from(command.to_u32()),
                block as *mut T as *mut c_void,
            )
        };
        trace!(?command, status, "native entry");
        narrow(status)
    }

    fn lower_and_call(&self, block: &mut ParamBlock<'_, '_>) -> Result<u32, ErrorCode> {
        use ParamBlock::*;
        let command = block.command();
        let status = match block {
            OpenLibrary(p) | CloseLibrary(p) => {
                let mut instance = p.instance as *mut c_void;
                let mut n = native::LibraryParam::zeroed();
                n.size = ulong(p.size);
                n.version = ulong(p.version);
                n.vm_memory_size = ulong(p.vm_memory_size);
                n.instance = &mut instance;
                n.vm_file_info = fixed(&p.vm_file_info)?;
                #[cfg(windows)]
                {
                    n.default_profile_path = fixed(&p.default_profile_path)?;
                }
                let status = self.call(command, &mut n);
                if succeeded(status) {
                    p.instance = instance as usize;
                }
                status
            }
            OpenSession(p) | CloseSession(p) => {
                let mut path = Vec::new();
                let mut n = native::SessionParam::zeroed();
                n.size = ulong(p.size);
                n.session_id = ulong(p.session_id);
                n.source_kind = ulong(p.source.kind().into());
                n.image_load_skip = p.image_load_skip;
                match &p.source {
                    Source::File(file) => {
                        let text = file.to_str().ok_or(ErrorCode::InvalidParameter)?;
                        path.extend_from_slice(text.as_bytes());
                        path.push(0);
                        n.file_info = path.as_mut_ptr() as *mut c_void;
                        n.file_size = len_ulong(text.len())?;
                    }
                    // The engine only reads from memory sources.
                    Source::Memory(bytes) => {
                        n.file_info = bytes.as_ptr() as *mut c_void;
                        n.file_size = len_ulong(bytes.len())?;
                    }
                }
                let status = self.call(command, &mut n);
                if succeeded(status) {
                    p.session_id = narrow(n.session_id);
                }
                status
            }
            GetFileInfo(p) => {
                let mut n = native::FileInfoParam::zeroed();
                n.size = ulong(p.size);
                n.session_id = ulong(p.session_id);
                let status = self.call(command, &mut n);
                if succeeded(status) {
                    p.format = ImageFormat::from_u32_exhaustive(narrow(n.format));
                }
                status
            }
            GetImageInfo(p) | SetImageInfo(p) | GetOriginalInfo(p) | GetThumbnailInfo(p)
            | SetThumbnailInfo(p) => {
                let mut n = lower_info(p);
                let status = self.call(command, &mut n);
                if succeeded(status) {
                    raise_info(&n, p);
                }
                status
            }
            GetImageData(p) | GetThumbnailData(p) => self.image_data(command, p)?,
            GetTagInfo(p) => {
                let mut ids: Option<Vec<c_ulong>> = p.tags.as_ref().map(|tags| {
                    tags.iter().map(|tag| ulong(tag.to_u32())).collect()
                });
                let mut n = native::TagInfoParam::zeroed();
                n.size = ulong(p.size);
                n.session_id = ulong(p.session_id);
                n.count = ulong(p.count);
                n.tag_list = ids.as_mut().map_or(ptr::null_mut(), |ids| ids.as_mut_ptr());
                let status = self.call(command, &mut n);
                if succeeded(status) {
                    p.count = narrow(n.count);
                    if let (Some(tags), Some(ids)) = (&mut p.tags, &ids) {
                        for (tag, id) in tags.iter_mut().zip(ids) {
                            *tag = Tag::from_u32_exhaustive(narrow(*id));
                        }
                    }
                }
                status
            }
            GetTagData(p) => {
                let mut n = native::TagDataParam::zeroed();
                n.size = ulong(p.size);
                n.session_id = ulong(p.session_id);
                n.tag_id = ulong(p.tag.to_u32());
                n.tag_type = ulong(p.tag_type.to_u32());
                n.tag_length = ulong(p.length);
                if let Some(data) = &mut p.data {
                    n.data = data.as_mut_ptr() as *mut c_void;
                }
                let status = self.call(command, &mut n);
                if succeeded(status) {
                    p.tag_type = TagType::from_u32_exhaustive(narrow(n.tag_type));
                    // an inline double needs all 64 bits of the value field
                    if p.tag_type == TagType::Double && size_of::<c_ulong>() < size_of::<f64>() {
                        return Err(ErrorCode::TagRead);
                    }
                    p.value = u64::from(n.tag_value);
                    p.length = narrow(n.tag_length);
                }
                status
            }
            GetTagStringInfo(p) => {
                let mut n = native::TagStringInfoParam::zeroed();
                n.size = ulong(p.size);
                n.session_id = ulong(p.session_id);
                let status = self.call(command, &mut n);
                if succeeded(status) {
                    p.lines = narrow(n.lines);
                    p.columns = narrow(n.columns);
                }
                status
            }
            GetTagString(p) => {
                let mut n = native::TagStringParam::zeroed();
                n.size = ulong(p.size);
                n.session_id = ulong(p.session_id);
                n.line = ulong(p.line);
                n.column = ulong(p.column);
                n.string_length = ulong(p.string_length);
                if let Some(data) = &mut p.data {
                    n.data = data.as_mut_ptr() as *mut c_void;
                }
                let status = self.call(command, &mut n);
                if succeeded(status) {
                    p.string_length = narrow(n.string_length);
                    p.layout_length = narrow(n.layout_length);
                }
                status
            }
            GetColorTempRange(p) => {
                let mut n = native::ColorTempRangeParam::zeroed();
                n.size = ulong(p.size);
                n.session_id = ulong(p.session_id);
                n.white_balance = ulong(p.white_balance.to_u32());
                let status = self.call(command, &mut n);
                if succeeded(status) {
                    p.default = narrow(n.default);
                    p.min = narrow(n.min);
                    p.max = narrow(n.max);
                }
                status
            }
            GetRawDevelopmentInfo(p) => {
                let mut n = native::RawDevelopmentInfo::zeroed();
                n.size = ulong(p.size);
                n.session_id = ulong(p.session_id);
                let status = self.call(command, &mut n);
                if succeeded(status) {
                    p.kinds = RawDevelopmentKinds::from_bits(narrow(n.kinds));
                }
                status
            }
            RawDevelopment(p) | GetRawDevelopmentParam(p) => {
                let mut payload = RawPayload::lower(&p.setting);
                let mut n = native::RawDevelopmentParam::zeroed();
                n.size = ulong(p.size);
                n.session_id = ulong(p.session_id);
                n.kind = ulong(p.setting.kind().into());
                n.data = payload.as_mut_ptr();
                let status = self.call(command, &mut n);
                if succeeded(status) && command == Command::GetRawDevelopmentParam {
                    payload.raise(&mut p.setting);
                }
                status
            }
            GetOutputProfile(p) | SetOutputProfile(p) => {
                let mut n = native::OutputProfileParam::zeroed();
                n.size = ulong(p.size);
                n.session_id = ulong(p.session_id);
                n.rendering_intent = ulong(p.rendering_intent.to_u32());
                n.profile = fixed(&p.profile)?;
                let status = self.call(command, &mut n);
                if succeeded(status) && command == Command::GetOutputProfile {
                    p.rendering_intent =
                        RenderingIntent::from_u32_exhaustive(narrow(n.rendering_intent));
                    p.profile = unfixed(&n.profile);
                }
                status
            }
            GetOutputDeviceProfile(p) | SetOutputDeviceProfile(p) => {
                let mut n = native::OutputDeviceProfile::zeroed();
                n.size = ulong(p.size);
                n.session_id = ulong(p.session_id);
                n.profile = fixed(&p.profile)?;
                let status = self.call(command, &mut n);
                if succeeded(status) && command == Command::GetOutputDeviceProfile {
                    p.profile = unfixed(&n.profile);
                }
                status
            }
            GetEditState(p) | GetColorProcess(p) | SetColorProcess(p) | GetDynamicRange(p)
            | SetDynamicRange(p) => {
                let mut n = native::SessionValue::zeroed();
                n.size = ulong(p.size);
                n.session_id = ulong(p.session_id);
                n.value = ulong(p.value);
                let status = self.call(command, &mut n);
                if succeeded(status) {
                    p.value = narrow(n.value);
                }
                status
            }
            GetPictureControlList(p) => {
                let mut items: Option<Vec<native::PictureControlListItem>> =
                    p.items.as_ref().map(|items| {
                        items
                            .iter()
                            .map(|item| native::PictureControlListItem {
                                id: ulong(item.to_u32()),
                            })
                            .collect()
                    });
                let mut n = native::PictureControlList::zeroed();
                n.size = ulong(p.size);
                n.session_id = ulong(p.session_id);
                n.count = ulong(p.count);
                n.items = items.as_mut().map_or(ptr::null_mut(), |items| items.as_mut_ptr());
                let status = self.call(command, &mut n);
                if succeeded(status) {
                    p.count = narrow(n.count);
                    if let (Some(out), Some(items)) = (&mut p.items, &items) {
                        for (control, item) in out.iter_mut().zip(items) {
                            *control = PictureControl::from_u32_exhaustive(narrow(item.id));
                        }
                    }
                }
                status
            }
            GetPictureControlVersion(p) => {
                let mut n = native::PictureControlVersion::zeroed();
                n.size = ulong(p.size);
                n.session_id = ulong(p.session_id);
                let status = self.call(command, &mut n);
                if succeeded(status) {
                    p.latest = PictureControlVersion::from_u32_exhaustive(narrow(n.latest));
                    p.modified = PictureControlVersion::from_u32_exhaustive(narrow(n.modified));
                    p.recorded = PictureControlVersion::from_u32_exhaustive(narrow(n.recorded));
                }
                status
            }
            GetDevelopColorMode(p) | SetDevelopColorMode(p) => {
                let mut n = native::DevelopColorMode::zeroed();
                n.size = ulong(p.size);
                n.mode = p.mode.to_u32() as c_long;
                let status = self.call(command, &mut n);
                if succeeded(status) {
                    p.mode = DevelopColorMode::from_u32_exhaustive(n.mode as u32);
                }
                status
            }
        };
        Ok(status)
    }

    fn image_data(
        &self,
        command: Command,
        param: &mut ImageDataParam<'_>,
    ) -> Result<u32, ErrorCode> {
        let mut n = native::ImageParam::zeroed();
        n.size = ulong(param.size);
        n.session_id = ulong(param.session_id);
        n.image_id = ulong(param.image_id);
        n.area = native_rect(&param.area)?;
        n.data_size = len_ulong(param.buffer.len())?;
        n.data = param.buffer.as_mut_ptr() as *mut c_void;
        if param.progress.is_attached() {
            n.progress = Some(progress_trampoline);
            n.progress_param = &mut param.progress as *mut ProgressBridge<'_> as *mut c_void;
        }
        Ok(self.call(command, &mut n))
    }
}

impl Backend for EntryPointBackend {
    fn entry(&self, block: &mut ParamBlock<'_, '_>) -> u32 {
        self.lower_and_call(block).unwrap_or_else(u32::from)
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }
}

/// Relays the engine's progress reports to the [`ProgressBridge`] in `param`.
///
/// A panicking callback is contained here and reported to the engine as an abort.
unsafe extern "system" fn progress_trampoline(
    done: c_ulong,
    total: c_ulong,
    param: *mut c_void,
) -> c_ulong {
    if param.is_null() {
        return ulong(ErrorCode::Abort.into());
    }
    // SAFETY: `param` is the bridge installed by `image_data`, which stays borrowed for the
    // duration of the engine call that invokes this callback.
    let bridge = unsafe { &mut *(param as *mut ProgressBridge<'_>) };
    let status = panic::catch_unwind(AssertUnwindSafe(|| {
        bridge.report_status(u64::from(done), u64::from(total))
    }));
    ulong(status.unwrap_or(ErrorCode::Abort.into()))
}

fn ulong(value: u32) -> c_ulong {
    c_ulong::from(value)
}

/// Statuses and counts wider than 32 bits are not meaningful and map to `u32::MAX`.
fn narrow(value: c_ulong) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

fn len_ulong(len: usize) -> Result<c_ulong, ErrorCode> {
    c_ulong::try_from(len).map_err(|_| ErrorCode::InvalidParameter)
}

fn succeeded(status: u32) -> bool {
    StatusCode::from_raw(status).is_success()
}

fn fixed(text: &str) -> Result<[u8; MAX_PATH], ErrorCode> {
    encode_fixed_text::<MAX_PATH>(text).ok_or(ErrorCode::InvalidParameter)
}

fn unfixed(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
    decode_text(&bytes[..end])
}

#[cfg(windows)]
fn native_rect(rect: &Rect) -> Result<NativeRect, ErrorCode> {
    Ok(NativeRect {
        left: rect.left,
        top: rect.top,
        right: rect.right,
        bottom: rect.bottom,
    })
}

#[cfg(not(windows))]
fn native_rect(rect: &Rect) -> Result<NativeRect, ErrorCode> {
    let coord = |v: i32| i16::try_from(v).map_err(|_| ErrorCode::InvalidParameter);
    Ok(NativeRect {
        top: coord(rect.top)?,
        left: coord(rect.left)?,
        bottom: coord(rect.bottom)?,
        right: coord(rect.right)?,
    })
}

fn lower_info(param: &ImageInfoParam) -> native::ImageInfoParam {
    native::ImageInfoParam {
        size: ulong(param.size),
        session_id: ulong(param.session_id),
        image_id: ulong(param.image_id),
        width: ulong(param.width),
        height: ulong(param.height),
        byte_depth: ulong(param.byte_depth),
        color: ulong(param.color),
        orientation: ulong(param.orientation),
        resolution: param.resolution,
    }
}

fn raise_info(native: &native::ImageInfoParam, param: &mut ImageInfoParam) {
    param.image_id = narrow(native.image_id);
    param.width = narrow(native.width);
    param.height = narrow(native.height);
    param.byte_depth = narrow(native.byte_depth);
    param.color = narrow(native.color);
    param.orientation = narrow(native.orientation);
    param.resolution = native.resolution;
}

/// The native sub-parameter of one raw-development setting.
enum RawPayload {
    Unsigned(native::RawUnsigned),
    Signed(native::RawSigned),
    Double(native::RawDouble),
    WhiteBalance(native::RawWhiteBalance),
    PictureControl(Box<native::RawPictureControl>),
    PortraitImpressionBalance(native::RawPortraitImpressionBalance),
    PixelShiftNoiseReduction(native::RawPixelShiftNoiseReduction),
    FilmGrain(native::RawFilmGrain),
}

impl RawPayload {
    fn lower(setting: &RawDevelopmentSetting) -> Self {
        use RawDevelopmentSetting as S;
        let unsigned = |value: u32| {
            RawPayload::Unsigned(native::RawUnsigned {
                size: ulong(layout_size::<native::RawUnsigned>()),
                value: ulong(value),
            })
        };
        let double = |value: f64| {
            RawPayload::Double(native::RawDouble {
                size: ulong(layout_size::<native::RawDouble>()),
                value,
            })
        };
        match setting {
            S::ParameterSet(v)
            | S::Quality(v)
            | S::NoiseReduction(v)
            | S::ColorMode(v)
            | S::Sharpness(v)
            | S::ToneCompensation(v)
            | S::Saturation(v)
            | S::FilterEffect(v)
            | S::SkinSoftening(v)
            | S::Dehaze(v) => unsigned(*v),
            S::ActiveDLighting(level) => unsigned(level.to_u32()),
            S::ExposureCompensation(v) | S::Tint(v) => double(*v),
            S::HueAdjustment(v) => RawPayload::Signed(native::RawSigned {
                size: ulong(layout_size::<native::RawSigned>()),
                value: c_long::from(*v),
            }),
            S::WhiteBalance(wb) => RawPayload::WhiteBalance(native::RawWhiteBalance {
                size: ulong(layout_size::<native::RawWhiteBalance>()),
                preset: ulong(wb.preset.to_u32()),
                color_temperature: c_long::from(wb.color_temperature),
                rgb: native::RawRgb {
                    r: ulong(wb.rgb[0]),
                    g: ulong(wb.rgb[1]),
                    b: ulong(wb.rgb[2]),
                },
            }),
            S::PictureControl(pc) | S::PictureControlAsShot(pc) => {
                RawPayload::PictureControl(Box::new(lower_picture_control(pc)))
            }
            S::PortraitImpressionBalance { hue, brightness } => {
                RawPayload::PortraitImpressionBalance(native::RawPortraitImpressionBalance {
                    size: ulong(layout_size::<native::RawPortraitImpressionBalance>()),
                    hue: *hue,
                    brightness: *brightness,
                })
            }
            S::PixelShiftNoiseReduction {
                resolution_priority,
            } => RawPayload::PixelShiftNoiseReduction(native::RawPixelShiftNoiseReduction {
                size: ulong(layout_size::<native::RawPixelShiftNoiseReduction>()),
                resolution_priority: *resolution_priority,
            }),
            S::FilmGrain { intensity, size } => RawPayload::FilmGrain(native::RawFilmGrain {
                size: ulong(layout_size::<native::RawFilmGrain>()),
                intensity: ulong(*intensity),
                grain_size: ulong(*size),
            }),
        }
    }

    fn as_mut_ptr(&mut self) -> *mut c_void {
        match self {
            RawPayload::Unsigned(n) => n as *mut _ as *mut c_void,
            RawPayload::Signed(n) => n as *mut _ as *mut c_void,
            RawPayload::Double(n) => n as *mut _ as *mut c_void,
            RawPayload::WhiteBalance(n) => n as *mut _ as *mut c_void,
            RawPayload::PictureControl(n) => n.as_mut() as *mut _ as *mut c_void,
            RawPayload::PortraitImpressionBalance(n) => n as *mut _ as *mut c_void,
            RawPayload::PixelShiftNoiseReduction(n) => n as *mut _ as *mut c_void,
            RawPayload::FilmGrain(n) => n as *mut _ as *mut c_void,
        }
    }

    /// Writes the engine's values back into `setting`, which was lowered into `self`.
    fn raise(&self, setting: &mut RawDevelopmentSetting) {
        use RawDevelopmentSetting as S;
        match (setting, self) {
            (
                S::ParameterSet(v)
                | S::Quality(v)
                | S::NoiseReduction(v)
                | S::ColorMode(v)
                | S::Sharpness(v)
                | S::ToneCompensation(v)
                | S::Saturation(v)
                | S::FilterEffect(v)
                | S::SkinSoftening(v)
                | S::Dehaze(v),
                RawPayload::Unsigned(n),
            ) => *v = narrow(n.value),
            (S::ActiveDLighting(level), RawPayload::Unsigned(n)) => {
                *level = ActiveDLighting::from_u32_exhaustive(narrow(n.value))
            }
            (S::ExposureCompensation(v) | S::Tint(v), RawPayload::Double(n)) => *v = n.value,
            (S::HueAdjustment(v), RawPayload::Signed(n)) => {
                *v = i32::try_from(n.value).unwrap_or_default()
            }
            (S::WhiteBalance(wb), RawPayload::WhiteBalance(n)) => {
                wb.preset = DevelopWhiteBalance::from_u32_exhaustive(narrow(n.preset));
                wb.color_temperature = i32::try_from(n.color_temperature).unwrap_or_default();
                wb.rgb = [narrow(n.rgb.r), narrow(n.rgb.g), narrow(n.rgb.b)];
            }
            (S::PictureControl(pc) | S::PictureControlAsShot(pc), RawPayload::PictureControl(n)) => {
                **pc = raise_picture_control(n)
            }
            (
                S::PortraitImpressionBalance { hue, brightness },
                RawPayload::PortraitImpressionBalance(n),
            ) => {
                *hue = n.hue;
                *brightness = n.brightness;
            }
            (
                S::PixelShiftNoiseReduction {
                    resolution_priority,
                },
                RawPayload::PixelShiftNoiseReduction(n),
            ) => *resolution_priority = n.resolution_priority,
            (S::FilmGrain { intensity, size }, RawPayload::FilmGrain(n)) => {
                *intensity = narrow(n.intensity);
                *size = narrow(n.grain_size);
            }
            // `lower` pairs every setting with its own payload shape.
            _ => {}
        }
    }
}

fn lower_picture_control(pc: &PictureControlAdjustment) -> native::RawPictureControl {
    let fc = &pc.flexible_color;
    native::RawPictureControl {
        size: ulong(layout_size::<native::RawPictureControl>()),
        picture_control: ulong(pc.picture_control.to_u32()),
        apply_quick_adjust: pc.apply_quick_adjust,
        quick_adjust: pc.quick_adjust,
        sharpness_auto: pc.sharpness_auto,
        sharpness: pc.sharpness,
        clarity_auto: pc.clarity_auto,
        clarity: pc.clarity,
        user_defined_curve: pc.user_defined_curve,
        contrast_auto: pc.contrast_auto,
        contrast: pc.contrast,
        brightness: pc.brightness,
        highlight: pc.highlight,
        shadow: pc.shadow,
        saturation_auto: pc.saturation_auto,
        saturation: pc.saturation,
        hue: pc.hue,
        filter: c_long::from(pc.filter),
        toning: ulong(pc.toning),
        toning_intensity: pc.toning_intensity,
        apply_level: pc.apply_level,
        apply_quick_sharp: pc.apply_quick_sharp,
        quick_sharp_auto: pc.quick_sharp_auto,
        quick_sharp: pc.quick_sharp,
        middle_range_sharp: pc.middle_range_sharp,
        flexible_color: native::FlexibleColorParams {
            contrast: fc.contrast,
            highlight: fc.highlight,
            shadow: fc.shadow,
            white_level: fc.white_level,
            black_level: fc.black_level,
            saturation: fc.saturation,
            color_blender: fc.color_blender,
            color_grading: fc.color_grading,
            blending: fc.blending,
            balance: fc.balance,
        },
    }
}

fn raise_picture_control(n: &native::RawPictureControl) -> PictureControlAdjustment {
    let fc = &n.flexible_color;
    PictureControlAdjustment {
        picture_control: PictureControl::from_u32_exhaustive(narrow(n.picture_control)),
        apply_quick_adjust: n.apply_quick_adjust,
        quick_adjust: n.quick_adjust,
        sharpness_auto: n.sharpness_auto,
        sharpness: n.sharpness,
        clarity_auto: n.clarity_auto,
        clarity: n.clarity,
        user_defined_curve: n.user_defined_curve,
        contrast_auto: n.contrast_auto,
        contrast: n.contrast,
        brightness: n.brightness,
        highlight: n.highlight,
        shadow: n.shadow,
        saturation_auto: n.saturation_auto,
        saturation: n.saturation,
        hue: n.hue,
        filter: i32::try_from(n.filter).unwrap_or_default(),
        toning: narrow(n.toning),
        toning_intensity: n.toning_intensity,
        apply_level: n.apply_level,
        apply_quick_sharp: n.apply_quick_sharp,
        quick_sharp_auto: n.quick_sharp_auto,
        quick_sharp: n.quick_sharp,
        middle_range_sharp: n.middle_range_sharp,
        flexible_color: crate::block::FlexibleColor {
            contrast: fc.contrast,
            highlight: fc.highlight,
            shadow: fc.shadow,
            white_level: fc.white_level,
            black_level: fc.black_level,
            saturation: fc.saturation,
            color_blender: fc.color_blender,
            color_grading: fc.color_grading,
            blending: fc.blending,
            balance: fc.balance,
        },
    }
}
