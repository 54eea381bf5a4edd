use crate::block::{ImageInfoParam, Rect};
use crate::error::{NkflError, NkflResult};
use crate::sdk::tags::{ColorType, Orientation};

/// Geometry and pixel layout of one image in a session: the developed image, the original
/// or a thumbnail.
///
/// This is a snapshot. Changing the session's settings does not update it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageInfo {
    /// Engine-assigned id, passed back when requesting pixels.
    pub image_id: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Bytes per sample.
    pub byte_depth: u32,
    /// Channel layout.
    pub color: ColorType,
    /// How the pixels are to be rotated for display.
    pub orientation: Orientation,
    /// Pixels per inch.
    pub resolution: f64,
}

impl ImageInfo {
    /// Samples per pixel.
    pub fn channels(&self) -> u32 {
        self.color.channels()
    }

    /// Bytes in one row of pixels.
    pub fn row_len(&self) -> Option<usize> {
        (self.width as usize)
            .checked_mul(self.channels() as usize)?
            .checked_mul(self.byte_depth as usize)
    }

    /// Bytes needed for the whole image, `None` on overflow.
    pub fn buffer_len(&self) -> Option<usize> {
        self.row_len()?.checked_mul(self.height as usize)
    }

    /// Bytes needed for `area`, `None` on overflow.
    pub fn region_len(&self, area: &Rect) -> Option<usize> {
        (area.width() as usize)
            .checked_mul(area.height() as usize)?
            .checked_mul(self.channels() as usize)?
            .checked_mul(self.byte_depth as usize)
    }

    /// The rect covering the whole image.
    pub fn full_area(&self) -> Rect {
        Rect {
            left: 0,
            top: 0,
            right: self.width as i32,
            bottom: self.height as i32,
        }
    }

    /// Whether `area` is non-empty and lies inside the image.
    pub fn contains(&self, area: &Rect) -> bool {
        !area.is_empty()
            && area.left >= 0
            && area.top >= 0
            && area.right as i64 <= self.width as i64
            && area.bottom as i64 <= self.height as i64
    }

    /// Width and height after the orientation is applied.
    pub fn display_dimensions(&self) -> (u32, u32) {
        if self.orientation.swaps_dimensions() {
            (self.height, self.width)
        } else {
            (self.width, self.height)
        }
    }

    /// The parameter block for a set-image-info command.
    pub(crate) fn to_param(&self, session_id: u32) -> ImageInfoParam {
        ImageInfoParam {
            session_id,
            image_id: self.image_id,
            width: self.width,
            height: self.height,
            byte_depth: self.byte_depth,
            color: self.color.into(),
            orientation: self.orientation.into(),
            resolution: self.resolution,
            ..Default::default()
        }
    }
}

impl TryFrom<&ImageInfoParam> for ImageInfo {
    type Error = NkflError;

    fn try_from(param: &ImageInfoParam) -> NkflResult<Self> {
        let color = ColorType::try_from(param.color)
            .map_err(|_| NkflError::WrongImageInfo(format!("color type {:#x}", param.color)))?;
        let orientation = Orientation::try_from(param.orientation).map_err(|_| {
            NkflError::WrongImageInfo(format!("orientation {}", param.orientation))
        })?;
        if param.width == 0 || param.height == 0 || param.byte_depth == 0 {
            return Err(NkflError::WrongImageInfo(format!(
                "empty image {}x{} at {} bytes per sample",
                param.width, param.height, param.byte_depth
            )));
        }
        Ok(ImageInfo {
            image_id: param.image_id,
            width: param.width,
            height: param.height,
            byte_depth: param.byte_depth,
            color,
            orientation,
            resolution: param.resolution,
        })
    }
}
