//! Tag entries as delivered by the tag-data command, and their decoding.

use std::mem::size_of;

use bytes::{BufMut, Bytes, BytesMut};

use crate::backend::native;
use crate::error::{NkflError, NkflResult};
use crate::metadata::reader::{decode_text, PayloadReader, PayloadWriter};
use crate::metadata::value::*;
use crate::sdk::tags::{Tag, TagType, WhiteBalance};

/// The first two bytes of every user-defined curve payload.
pub(crate) const CURVE_SIGNATURE: [u8; 2] = [0x49, 0x5F];

/// Byte length of a rational payload: two 32-bit integers.
pub(crate) const RATIONAL_LEN: usize = 8;

/// One raw tag entry.
///
/// Inline types carry their value in `value` and have no payload. All other types carry
/// `length` bytes of payload in `data`.
#[derive(Debug, Clone, PartialEq)]
pub struct TagEntry {
    /// The tag id.
    pub tag: Tag,
    /// How `value` and `data` are encoded.
    pub tag_type: TagType,
    /// The inline value field.
    pub value: u64,
    /// Declared payload length in bytes.
    pub length: u32,
    /// The payload, empty for inline types.
    pub data: Bytes,
}

/// Size of the native payload layout for struct-shaped types, `None` for the rest.
pub(crate) fn struct_size(tag_type: TagType) -> Option<usize> {
    let size = match tag_type {
        TagType::DateTime => size_of::<native::TagDateTime>(),
        TagType::LensInfo => size_of::<native::TagLensInfo>(),
        TagType::UserDefinedCurve => size_of::<native::TagUserDefinedCurve>(),
        TagType::GpsPosition => size_of::<native::TagGpsPosition>(),
        TagType::GpsTimeStamp => size_of::<native::TagGpsTimeStamp>(),
        TagType::LensType => size_of::<native::TagLensType>(),
        TagType::ColorMatrix => size_of::<native::TagColorMatrix>(),
        TagType::WhiteBalanceMode => size_of::<native::TagWhiteBalanceMode>(),
        TagType::BitsPerSample => size_of::<native::TagBitsPerSample>(),
        TagType::SkinSoftening => size_of::<native::TagSkinSoftening>(),
        TagType::PortraitImpressionBalance => size_of::<native::TagPortraitImpressionBalance>(),
        TagType::FilmGrain => size_of::<native::TagFilmGrain>(),
        _ => return None,
    };
    Some(size)
}

/// Whether the payload layout starts with its own size field.
fn has_size_prefix(tag_type: TagType) -> bool {
    struct_size(tag_type).is_some() && tag_type != TagType::LensType
}

/// Bytes to allocate for the second phase of a tag-data request.
pub(crate) fn payload_capacity(tag_type: TagType, length: u32) -> usize {
    if tag_type.is_inline() {
        return 0;
    }
    struct_size(tag_type).unwrap_or(0).max(length as usize)
}

/// A zeroed payload buffer for the second phase, with the size field filled in for struct
/// layouts that carry one.
pub(crate) fn request_buffer(tag_type: TagType, length: u32) -> BytesMut {
    let capacity = payload_capacity(tag_type, length);
    match struct_size(tag_type) {
        Some(size) if has_size_prefix(tag_type) => {
            BytesMut::from(&PayloadWriter::with_size_prefix(size).finish(capacity)[..])
        }
        _ => BytesMut::zeroed(capacity),
    }
}

/// Checks a caller-supplied payload buffer against the entry it is meant to receive.
pub(crate) fn check_request_buffer(
    tag_type: TagType,
    length: u32,
    data: &[u8],
) -> Result<(), String> {
    if data.len() < length as usize {
        return Err(format!(
            "payload buffer holds {} bytes, tag needs {length}",
            data.len()
        ));
    }
    if let Some(size) = struct_size(tag_type).filter(|_| has_size_prefix(tag_type)) {
        let mut reader = PayloadReader::new(Tag::None, Bytes::copy_from_slice(data));
        let declared = reader
            .read_ulong()
            .map_err(|_| "payload buffer is shorter than its size field".to_string())?;
        if declared as usize != size {
            return Err(format!(
                "payload buffer declares {declared} bytes, {tag_type:?} layout has {size}"
            ));
        }
    }
    Ok(())
}

impl TagEntry {
    /// Decodes the entry according to its type code.
    ///
    /// Malformed entries fail with [`NkflError::TagRead`]. Types without a dedicated decoder
    /// come back as [`TagValue::Opaque`].
    pub fn decode(&self) -> NkflResult<TagValue> {
        let tag = self.tag;
        let value = match self.tag_type {
            TagType::Byte => TagValue::Byte(self.value as u8),
            TagType::Long => TagValue::Long(self.value as u32),
            TagType::SignedLong => TagValue::SignedLong(self.value as u32 as i32),
            TagType::Double => TagValue::Double(f64::from_bits(self.value)),
            TagType::Boolean => TagValue::Boolean(self.value != 0),
            TagType::String => {
                if self.length == 0 {
                    return Err(NkflError::tag_read(tag, "string with zero length"));
                }
                TagValue::String(decode_text(&self.payload()?))
            }
            TagType::Rational => {
                let mut reader = self.rational_reader()?;
                TagValue::Rational(Rational {
                    numerator: reader.read_u32()?,
                    denominator: reader.read_u32()?,
                })
            }
            TagType::SignedRational => {
                let mut reader = self.rational_reader()?;
                TagValue::SignedRational(SignedRational {
                    numerator: reader.read_i32()?,
                    denominator: reader.read_i32()?,
                })
            }
            TagType::DateTime => {
                let mut r = self.struct_reader()?;
                TagValue::DateTime(TagDateTime {
                    year: r.read_ulong()?,
                    month: r.read_ulong()?,
                    day: r.read_ulong()?,
                    hour: r.read_ulong()?,
                    minute: r.read_ulong()?,
                    second: r.read_f64()?,
                })
            }
            TagType::LensInfo => {
                let mut r = self.struct_reader()?;
                TagValue::LensInfo(LensInfo {
                    wide_focal_length: r.read_ulong()?,
                    tele_focal_length: r.read_ulong()?,
                    wide_max_aperture: r.read_f64()?,
                    tele_max_aperture: r.read_f64()?,
                })
            }
            TagType::LensType => {
                let mut r = self.struct_reader()?;
                let cpu = r.read_bool()?;
                let d_type_active = r.read_bool()?;
                let d_type = r.read_bool()?;
                let g_lens = r.read_bool()?;
                let vibration_reduction = r.read_bool()?;
                let v_lens = r.read_bool()?;
                let f_mount_adapter = r.read_bool()?;
                r.skip(1)?;
                TagValue::LensType(LensType {
                    cpu,
                    d_type_active,
                    d_type,
                    g_lens,
                    vibration_reduction,
                    v_lens,
                    f_mount_adapter,
                    e_lens: r.read_bool()?,
                    stm_lens: r.read_bool()?,
                })
            }
            TagType::GpsPosition => {
                let mut r = self.struct_reader()?;
                TagValue::GpsPosition(GpsPosition {
                    degrees: r.read_f64()?,
                    minutes: r.read_f64()?,
                    seconds: r.read_f64()?,
                })
            }
            TagType::GpsTimeStamp => {
                let mut r = self.struct_reader()?;
                TagValue::GpsTimeStamp(GpsTimeStamp {
                    hours: r.read_ulong()?,
                    minutes: r.read_ulong()?,
                    seconds: r.read_ulong()?,
                })
            }
            TagType::UserDefinedCurve => TagValue::UserDefinedCurve(Box::new(self.decode_curve()?)),
            TagType::ColorMatrix => {
                let mut r = self.struct_reader()?;
                TagValue::ColorMatrix(ColorMatrix {
                    mkr2: r.read_f64()?,
                    mkb2: r.read_f64()?,
                    mkr3: r.read_f64()?,
                    mkb3: r.read_f64()?,
                })
            }
            TagType::WhiteBalanceMode => {
                let mut r = self.struct_reader()?;
                TagValue::WhiteBalanceMode(WhiteBalanceSetting {
                    mode: WhiteBalance::from_u32_exhaustive(r.read_ulong()?),
                    color_temperature: r.read_ulong()?,
                })
            }
            TagType::BitsPerSample => {
                let mut r = self.struct_reader()?;
                let mut bits = [0u32; 4];
                for b in bits.iter_mut() {
                    *b = r.read_ulong()?;
                }
                TagValue::BitsPerSample(BitsPerSample(bits))
            }
            TagType::SkinSoftening => {
                let mut r = self.struct_reader()?;
                TagValue::SkinSoftening(SkinSoftening {
                    level: r.read_ulong()?,
                })
            }
            TagType::PortraitImpressionBalance => {
                let mut r = self.struct_reader()?;
                TagValue::PortraitImpressionBalance(PortraitImpressionBalance {
                    hue: r.read_ulong()?,
                    brightness: r.read_ulong()?,
                })
            }
            TagType::FilmGrain => {
                let mut r = self.struct_reader()?;
                TagValue::FilmGrain(FilmGrain {
                    intensity: r.read_ulong()?,
                    grain_size: r.read_ulong()?,
                })
            }
            TagType::Undefined | TagType::Unknown(_) => TagValue::Opaque {
                type_code: self.tag_type,
                value: self.value,
                data: self.data.slice(..self.data.len().min(self.length as usize)),
            },
        };
        Ok(value)
    }

    fn payload(&self) -> NkflResult<Bytes> {
        let length = self.length as usize;
        if self.data.len() < length {
            return Err(NkflError::tag_read(
                self.tag,
                format!(
                    "declared length {length} exceeds the {} payload bytes received",
                    self.data.len()
                ),
            ));
        }
        Ok(self.data.slice(..length))
    }

    fn rational_reader(&self) -> NkflResult<PayloadReader> {
        if self.length as usize != RATIONAL_LEN {
            return Err(NkflError::tag_read(
                self.tag,
                format!("rational with length {}, expected {RATIONAL_LEN}", self.length),
            ));
        }
        Ok(PayloadReader::new(self.tag, self.payload()?))
    }

    fn struct_reader(&self) -> NkflResult<PayloadReader> {
        let expected = struct_size(self.tag_type).unwrap_or(0);
        if self.length as usize != expected {
            return Err(NkflError::tag_read(
                self.tag,
                format!(
                    "{:?} payload with length {}, expected {expected}",
                    self.tag_type, self.length
                ),
            ));
        }
        let mut reader = PayloadReader::new(self.tag, self.payload()?);
        if has_size_prefix(self.tag_type) {
            reader.expect_size_prefix(expected)?;
        }
        Ok(reader)
    }

    fn decode_curve(&self) -> NkflResult<UserDefinedCurve> {
        let mut r = self.struct_reader()?;
        let signature = r.read_array::<2>()?;
        if signature != CURVE_SIGNATURE {
            return Err(NkflError::tag_read(
                self.tag,
                format!("curve signature {signature:02X?} does not match"),
            ));
        }
        let input_min = r.read_u8()?;
        let input_max = r.read_u8()?;
        let output_min = r.read_u8()?;
        let output_max = r.read_u8()?;
        let gamma_integer = r.read_u8()?;
        let gamma_fractional = r.read_u8()?;
        let count = r.read_u8()? as usize;
        if !CURVE_SPLINE_POINTS.contains(&count) {
            return Err(NkflError::tag_read(
                self.tag,
                format!("curve has {count} spline points, expected 2 to 20"),
            ));
        }
        let mut points = Vec::with_capacity(count);
        for index in 0..*CURVE_SPLINE_POINTS.end() {
            let point = SplinePoint {
                x: r.read_u8()?,
                y: r.read_u8()?,
            };
            if index < count {
                points.push(point);
            }
        }
        r.skip(15)?;
        let lut = r.read_bytes(CURVE_LUT_LEN)?;
        Ok(UserDefinedCurve {
            input_min,
            input_max,
            output_min,
            output_max,
            gamma_integer,
            gamma_fractional,
            points,
            lut,
        })
    }

    /// Encodes `value` the way the engine delivers it.
    ///
    /// Fails with [`NkflError::InvalidParameter`] for a user-defined curve whose point count or
    /// lookup table is out of bounds.
    pub fn from_value(tag: Tag, value: &TagValue) -> NkflResult<Self> {
        let tag_type = value.tag_type();
        let mut inline = 0u64;
        let data = match value {
            TagValue::Byte(v) => {
                inline = *v as u64;
                Bytes::new()
            }
            TagValue::Long(v) => {
                inline = *v as u64;
                Bytes::new()
            }
            TagValue::SignedLong(v) => {
                inline = *v as u32 as u64;
                Bytes::new()
            }
            TagValue::Double(v) => {
                inline = v.to_bits();
                Bytes::new()
            }
            TagValue::Boolean(v) => {
                inline = *v as u64;
                Bytes::new()
            }
            TagValue::String(s) => {
                let mut buf = BytesMut::with_capacity(s.len() + 1);
                buf.put_slice(s.as_bytes());
                buf.put_u8(0);
                buf.freeze()
            }
            TagValue::Rational(r) => {
                let mut w = PayloadWriter::new(RATIONAL_LEN);
                w.put_u32(r.numerator);
                w.put_u32(r.denominator);
                w.into_bytes()
            }
            TagValue::SignedRational(r) => {
                let mut w = PayloadWriter::new(RATIONAL_LEN);
                w.put_i32(r.numerator);
                w.put_i32(r.denominator);
                w.into_bytes()
            }
            TagValue::DateTime(dt) => encode_struct(tag_type, |w| {
                w.put_ulong(dt.year);
                w.put_ulong(dt.month);
                w.put_ulong(dt.day);
                w.put_ulong(dt.hour);
                w.put_ulong(dt.minute);
                w.put_f64(dt.second);
            }),
            TagValue::LensInfo(info) => encode_struct(tag_type, |w| {
                w.put_ulong(info.wide_focal_length);
                w.put_ulong(info.tele_focal_length);
                w.put_f64(info.wide_max_aperture);
                w.put_f64(info.tele_max_aperture);
            }),
            TagValue::LensType(lens) => encode_struct(tag_type, |w| {
                for facet in [
                    lens.cpu,
                    lens.d_type_active,
                    lens.d_type,
                    lens.g_lens,
                    lens.vibration_reduction,
                    lens.v_lens,
                    lens.f_mount_adapter,
                    false,
                    lens.e_lens,
                    lens.stm_lens,
                ] {
                    w.put_bool(facet);
                }
            }),
            TagValue::GpsPosition(pos) => encode_struct(tag_type, |w| {
                w.put_f64(pos.degrees);
                w.put_f64(pos.minutes);
                w.put_f64(pos.seconds);
            }),
            TagValue::GpsTimeStamp(ts) => encode_struct(tag_type, |w| {
                w.put_ulong(ts.hours);
                w.put_ulong(ts.minutes);
                w.put_ulong(ts.seconds);
            }),
            TagValue::UserDefinedCurve(curve) => {
                curve.validate()?;
                encode_struct(tag_type, |w| {
                    w.put_slice(&CURVE_SIGNATURE);
                    w.put_u8(curve.input_min);
                    w.put_u8(curve.input_max);
                    w.put_u8(curve.output_min);
                    w.put_u8(curve.output_max);
                    w.put_u8(curve.gamma_integer);
                    w.put_u8(curve.gamma_fractional);
                    w.put_u8(curve.points.len() as u8);
                    for index in 0..*CURVE_SPLINE_POINTS.end() {
                        let point = curve.points.get(index).copied();
                        let point = point.unwrap_or(SplinePoint { x: 0, y: 0 });
                        w.put_u8(point.x);
                        w.put_u8(point.y);
                    }
                    w.put_slice(&[0u8; 15]);
                    w.put_slice(&curve.lut);
                })
            }
            TagValue::ColorMatrix(m) => encode_struct(tag_type, |w| {
                w.put_f64(m.mkr2);
                w.put_f64(m.mkb2);
                w.put_f64(m.mkr3);
                w.put_f64(m.mkb3);
            }),
            TagValue::WhiteBalanceMode(wb) => encode_struct(tag_type, |w| {
                w.put_ulong(wb.mode.to_u32());
                w.put_ulong(wb.color_temperature);
            }),
            TagValue::BitsPerSample(BitsPerSample(bits)) => encode_struct(tag_type, |w| {
                for b in bits {
                    w.put_ulong(*b);
                }
            }),
            TagValue::SkinSoftening(s) => encode_struct(tag_type, |w| w.put_ulong(s.level)),
            TagValue::PortraitImpressionBalance(p) => encode_struct(tag_type, |w| {
                w.put_ulong(p.hue);
                w.put_ulong(p.brightness);
            }),
            TagValue::FilmGrain(g) => encode_struct(tag_type, |w| {
                w.put_ulong(g.intensity);
                w.put_ulong(g.grain_size);
            }),
            TagValue::Opaque { value, data, .. } => {
                inline = *value;
                data.clone()
            }
        };
        Ok(TagEntry {
            tag,
            tag_type,
            value: inline,
            length: data.len() as u32,
            data,
        })
    }
}

fn encode_struct(tag_type: TagType, fields: impl FnOnce(&mut PayloadWriter)) -> Bytes {
    let size = struct_size(tag_type).unwrap_or(0);
    let mut writer = if has_size_prefix(tag_type) {
        PayloadWriter::with_size_prefix(size)
    } else {
        PayloadWriter::new(size)
    };
    fields(&mut writer);
    writer.finish(size)
}

#[cfg(test)]
mod test {
    use std::ffi::c_ulong;

    use proptest::prelude::*;

    use super::*;
    use crate::backend::native::Plain;

    fn entry(tag_type: TagType, value: u64, data: &[u8]) -> TagEntry {
        TagEntry {
            tag: Tag::Make,
            tag_type,
            value,
            length: data.len() as u32,
            data: Bytes::copy_from_slice(data),
        }
    }

    fn round_trip(value: TagValue) -> TagValue {
        TagEntry::from_value(Tag::Make, &value)
            .unwrap()
            .decode()
            .unwrap()
    }

    fn as_bytes<T>(value: &T) -> &[u8] {
        // SAFETY: reading the bytes of a plain repr(C) value, padding included.
        unsafe { std::slice::from_raw_parts(value as *const T as *const u8, size_of::<T>()) }
    }

    fn sample_curve(points: usize) -> UserDefinedCurve {
        UserDefinedCurve {
            input_min: 0,
            input_max: 255,
            output_min: 0,
            output_max: 255,
            gamma_integer: 1,
            gamma_fractional: 0,
            points: (0..points)
                .map(|i| SplinePoint {
                    x: (i * 12) as u8,
                    y: (i * 12) as u8,
                })
                .collect(),
            lut: (0..CURVE_LUT_LEN).map(|i| (i / 8) as u8).collect::<Vec<_>>().into(),
        }
    }

    #[test]
    #[rustfmt::skip]
    fn test_inline_scalars() {
        let cases = [
            (entry(TagType::Byte, 0x1FF, &[]),                   TagValue::Byte(0xFF)),
            (entry(TagType::Long, 200, &[]),                     TagValue::Long(200)),
            (entry(TagType::SignedLong, 0xFFFF_FFFE, &[]),       TagValue::SignedLong(-2)),
            (entry(TagType::Double, 2.5f64.to_bits(), &[]),      TagValue::Double(2.5)),
            (entry(TagType::Boolean, 1, &[]),                    TagValue::Boolean(true)),
            (entry(TagType::Boolean, 0, &[]),                    TagValue::Boolean(false)),
        ];
        for (entry, expected) in cases {
            assert_eq!(entry.decode().unwrap(), expected, "{entry:?}");
        }
    }

    #[test]
    fn test_string_trims_nul() {
        let value = entry(TagType::String, 0, b"NIKON\0").decode().unwrap();
        assert_eq!(value, TagValue::String("NIKON".into()));
    }

    #[test]
    #[rustfmt::skip]
    fn test_malformed_entries() {
        let cases = [
            entry(TagType::String, 0, &[]),
            entry(TagType::Rational, 0, &[1, 0, 0, 0]),
            entry(TagType::Rational, 0, &[0; 12]),
            entry(TagType::SignedRational, 0, &[0; 4]),
            entry(TagType::DateTime, 0, &[0; 8]),
            entry(TagType::LensType, 0, &[0; 4]),
            TagEntry { length: 8, ..entry(TagType::Rational, 0, &[0; 4]) },
        ];
        for entry in cases {
            let err = entry.decode().unwrap_err();
            assert!(matches!(err, NkflError::TagRead { .. }), "{entry:?}");
        }
    }

    #[test]
    fn test_zero_denominator_keeps_raw_pair() {
        let value = entry(TagType::Rational, 0, &[7, 0, 0, 0, 0, 0, 0, 0])
            .decode()
            .unwrap();
        let TagValue::Rational(r) = value else {
            panic!("expected a rational, got {value:?}");
        };
        assert_eq!((r.numerator, r.denominator), (7, 0));
        assert_eq!(r.to_f64(), None);
    }

    #[test]
    fn test_unknown_type_is_opaque() {
        let value = entry(TagType::Unknown(0x7001), 3, &[1, 2, 3]).decode().unwrap();
        assert_eq!(
            value,
            TagValue::Opaque {
                type_code: TagType::Unknown(0x7001),
                value: 3,
                data: Bytes::from_static(&[1, 2, 3]),
            }
        );
        let value = entry(TagType::Undefined, 0, b"0230").decode().unwrap();
        assert_eq!(value.tag_type(), TagType::Undefined);
    }

    #[test]
    fn test_decodes_native_date_time() {
        let mut native = native::TagDateTime::zeroed();
        native.size = size_of::<native::TagDateTime>() as c_ulong;
        native.year = 2021;
        native.month = 11;
        native.day = 3;
        native.hour = 14;
        native.minute = 5;
        native.second = 9.125;
        let value = entry(TagType::DateTime, 0, as_bytes(&native)).decode().unwrap();
        let TagValue::DateTime(dt) = value else {
            panic!("expected a date/time, got {value:?}");
        };
        assert_eq!(dt.to_string(), "2021:11:03 14:05:09.125");
    }

    #[test]
    fn test_decodes_native_lens_info_and_white_balance() {
        let mut lens = native::TagLensInfo::zeroed();
        lens.size = size_of::<native::TagLensInfo>() as c_ulong;
        lens.wide_focal_length = 24;
        lens.tele_focal_length = 70;
        lens.wide_max_aperture = 2.8;
        let value = entry(TagType::LensInfo, 0, as_bytes(&lens)).decode().unwrap();
        assert_eq!(
            value,
            TagValue::LensInfo(LensInfo {
                wide_focal_length: 24,
                tele_focal_length: 70,
                wide_max_aperture: 2.8,
                tele_max_aperture: 0.0,
            })
        );

        let mut wb = native::TagWhiteBalanceMode::zeroed();
        wb.size = size_of::<native::TagWhiteBalanceMode>() as c_ulong;
        wb.mode = 8;
        wb.color_temperature = 5200;
        let value = entry(TagType::WhiteBalanceMode, 0, as_bytes(&wb)).decode().unwrap();
        let TagValue::WhiteBalanceMode(setting) = value else {
            panic!("expected a white balance, got {value:?}");
        };
        assert_eq!(setting.kelvin(), Some(5200));
    }

    #[test]
    fn test_decodes_native_lens_type() {
        let mut lens = native::TagLensType::zeroed();
        lens.cpu = true;
        lens.d_type = true;
        lens.stm_lens = true;
        let value = entry(TagType::LensType, 0, as_bytes(&lens)).decode().unwrap();
        let TagValue::LensType(lens) = value else {
            panic!("expected a lens type, got {value:?}");
        };
        assert!(lens.cpu && lens.stm_lens && !lens.e_lens);
        assert_eq!(lens.is_d_type(), None);
    }

    #[test]
    fn test_size_prefix_is_checked() {
        let mut wb = native::TagWhiteBalanceMode::zeroed();
        wb.size = 4;
        let err = entry(TagType::WhiteBalanceMode, 0, as_bytes(&wb))
            .decode()
            .unwrap_err();
        assert!(matches!(err, NkflError::TagRead { .. }));
    }

    #[test]
    fn test_curve_signature_and_point_bounds() {
        for points in [2, 20] {
            let curve = sample_curve(points);
            let decoded = round_trip(TagValue::UserDefinedCurve(Box::new(curve.clone())));
            assert_eq!(decoded, TagValue::UserDefinedCurve(Box::new(curve)));
        }

        let mut encoded =
            TagEntry::from_value(Tag::NkGammaTable, &TagValue::UserDefinedCurve(Box::new(sample_curve(4))))
                .unwrap();
        let mut raw = encoded.data.to_vec();
        let head = size_of::<c_ulong>();
        raw[head] = 0x00;
        encoded.data = raw.clone().into();
        assert!(matches!(encoded.decode(), Err(NkflError::TagRead { .. })));

        raw[head] = CURVE_SIGNATURE[0];
        raw[head + 8] = 21;
        encoded.data = raw.into();
        assert!(matches!(encoded.decode(), Err(NkflError::TagRead { .. })));

        let err = TagEntry::from_value(
            Tag::NkGammaTable,
            &TagValue::UserDefinedCurve(Box::new(sample_curve(1))),
        )
        .unwrap_err();
        assert!(matches!(err, NkflError::InvalidParameter(_)));
    }

    #[test]
    fn test_request_buffer_carries_size_prefix() {
        let buf = request_buffer(TagType::LensInfo, 0);
        assert_eq!(buf.len(), size_of::<native::TagLensInfo>());
        check_request_buffer(TagType::LensInfo, buf.len() as u32, &buf).unwrap();
        assert!(check_request_buffer(TagType::LensInfo, 0, &[0; 40]).is_err());
        assert!(check_request_buffer(TagType::String, 10, &[0; 4]).is_err());
        assert_eq!(request_buffer(TagType::String, 6).len(), 6);
        assert_eq!(request_buffer(TagType::Long, 0).len(), 0);
    }

    fn arb_scalar() -> impl Strategy<Value = TagValue> {
        prop_oneof![
            any::<u8>().prop_map(TagValue::Byte),
            any::<u32>().prop_map(TagValue::Long),
            any::<i32>().prop_map(TagValue::SignedLong),
            any::<bool>().prop_map(TagValue::Boolean),
            (-1e9f64..1e9).prop_map(TagValue::Double),
            "[a-zA-Z0-9 .]{1,32}".prop_map(TagValue::String),
            (any::<u32>(), any::<u32>()).prop_map(|(numerator, denominator)| {
                TagValue::Rational(Rational { numerator, denominator })
            }),
            (any::<i32>(), any::<i32>()).prop_map(|(numerator, denominator)| {
                TagValue::SignedRational(SignedRational { numerator, denominator })
            }),
        ]
    }

    fn arb_struct() -> impl Strategy<Value = TagValue> {
        prop_oneof![
            (0u32..10_000, 1u32..=12, 1u32..=31, 0u32..24, 0u32..60, 0.0f64..60.0).prop_map(
                |(year, month, day, hour, minute, second)| {
                    TagValue::DateTime(TagDateTime { year, month, day, hour, minute, second })
                }
            ),
            (any::<u32>(), any::<u32>(), 0.0f64..64.0, 0.0f64..64.0).prop_map(
                |(wide_focal_length, tele_focal_length, wide_max_aperture, tele_max_aperture)| {
                    TagValue::LensInfo(LensInfo {
                        wide_focal_length,
                        tele_focal_length,
                        wide_max_aperture,
                        tele_max_aperture,
                    })
                }
            ),
            (0.0f64..180.0, 0.0f64..60.0, 0.0f64..60.0).prop_map(|(degrees, minutes, seconds)| {
                TagValue::GpsPosition(GpsPosition { degrees, minutes, seconds })
            }),
            (0u32..24, 0u32..60, 0u32..60).prop_map(|(hours, minutes, seconds)| {
                TagValue::GpsTimeStamp(GpsTimeStamp { hours, minutes, seconds })
            }),
            (0u32..20, any::<u32>()).prop_map(|(mode, color_temperature)| {
                TagValue::WhiteBalanceMode(WhiteBalanceSetting {
                    mode: WhiteBalance::from_u32_exhaustive(mode),
                    color_temperature,
                })
            }),
            proptest::array::uniform4(any::<u32>())
                .prop_map(|bits| TagValue::BitsPerSample(BitsPerSample(bits))),
            proptest::array::uniform9(any::<bool>()).prop_map(|b| {
                TagValue::LensType(LensType {
                    cpu: b[0],
                    d_type_active: b[1],
                    d_type: b[2],
                    g_lens: b[3],
                    vibration_reduction: b[4],
                    v_lens: b[5],
                    f_mount_adapter: b[6],
                    e_lens: b[7],
                    stm_lens: b[8],
                })
            }),
            (any::<u32>(), any::<u32>()).prop_map(|(intensity, grain_size)| {
                TagValue::FilmGrain(FilmGrain { intensity, grain_size })
            }),
        ]
    }

    proptest! {
        #[test]
        fn prop_scalar_round_trip(value in arb_scalar()) {
            prop_assert_eq!(round_trip(value.clone()), value);
        }

        #[test]
        fn prop_struct_round_trip(value in arb_struct()) {
            let entry = TagEntry::from_value(Tag::NkLensInfo, &value).unwrap();
            prop_assert_eq!(Some(entry.length as usize), struct_size(value.tag_type()));
            prop_assert_eq!(entry.decode().unwrap(), value);
        }
    }
}
