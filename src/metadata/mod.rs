//! Tag decoding and metadata normalization.
//!
//! A [`TagEntry`] is what the tag-data command delivers: a tag id, a type code, an inline value
//! field and an optional payload. [`TagEntry::decode`] turns it into a [`TagValue`], picking the
//! decoder from the type code alone. [`ExifRecord::from_tags`] then folds a batch of decoded
//! values and an [`ImageInfo`] into one record.
//!
//! ```
//! use nkfl::metadata::{TagEntry, TagValue, WhiteBalanceSetting};
//! use nkfl::sdk::tags::{Tag, WhiteBalance};
//!
//! let value = TagValue::WhiteBalanceMode(WhiteBalanceSetting {
//!     mode: WhiteBalance::ColorTemperature,
//!     color_temperature: 5200,
//! });
//! let entry = TagEntry::from_value(Tag::NkWhiteBalance, &value).unwrap();
//! assert_eq!(entry.decode().unwrap(), value);
//! ```

mod entry;
mod exif;
mod image_info;
pub(crate) mod reader;
mod value;

pub(crate) use entry::{check_request_buffer, request_buffer};
pub use entry::TagEntry;
pub use exif::{ExifRecord, EXIF_TAGS};
pub use image_info::ImageInfo;
pub use value::*;
