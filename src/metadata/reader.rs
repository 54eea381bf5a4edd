//! Byte-level access to tag payloads.
//!
//! Payload structures use the engine's native C layout: `unsigned long` fields, naturally
//! aligned doubles and one-byte bools, all little-endian. The reader and writer track the
//! running offset so that alignment padding lands where the C compiler puts it.

use std::ffi::c_ulong;
use std::io::Read;
use std::mem::{align_of, size_of};

use byteorder::{LittleEndian, ReadBytesExt};
use bytes::buf::Reader;
use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{NkflError, NkflResult};
use crate::sdk::tags::Tag;

const ULONG_SIZE: usize = size_of::<c_ulong>();
const ULONG_ALIGN: usize = align_of::<c_ulong>();
const DOUBLE_ALIGN: usize = align_of::<f64>();

fn padding(offset: usize, align: usize) -> usize {
    (align - offset % align) % align
}

/// Reads one tag payload. Every failure is reported as [`NkflError::TagRead`] for `tag`.
pub(crate) struct PayloadReader {
    tag: Tag,
    reader: Reader<Bytes>,
    offset: usize,
}

impl PayloadReader {
    pub(crate) fn new(tag: Tag, bytes: Bytes) -> Self {
        Self {
            tag,
            reader: bytes.reader(),
            offset: 0,
        }
    }

    fn truncated(&self, _err: std::io::Error) -> NkflError {
        NkflError::tag_read(
            self.tag,
            format!("payload ends early at byte offset {}", self.offset),
        )
    }

    fn remaining(&self) -> usize {
        self.reader.get_ref().remaining()
    }

    /// Drops `count` bytes.
    pub(crate) fn skip(&mut self, count: usize) -> NkflResult<()> {
        if self.remaining() < count {
            return Err(NkflError::tag_read(
                self.tag,
                format!("payload ends early at byte offset {}", self.offset),
            ));
        }
        self.reader.get_mut().advance(count);
        self.offset += count;
        Ok(())
    }

    fn align(&mut self, align: usize) -> NkflResult<()> {
        self.skip(padding(self.offset, align))
    }

    pub(crate) fn read_u8(&mut self) -> NkflResult<u8> {
        let value = self.reader.read_u8().map_err(|e| self.truncated(e))?;
        self.offset += 1;
        Ok(value)
    }

    pub(crate) fn read_bool(&mut self) -> NkflResult<bool> {
        Ok(self.read_u8()? != 0)
    }

    pub(crate) fn read_u32(&mut self) -> NkflResult<u32> {
        let value = self
            .reader
            .read_u32::<LittleEndian>()
            .map_err(|e| self.truncated(e))?;
        self.offset += 4;
        Ok(value)
    }

    pub(crate) fn read_i32(&mut self) -> NkflResult<i32> {
        let value = self
            .reader
            .read_i32::<LittleEndian>()
            .map_err(|e| self.truncated(e))?;
        self.offset += 4;
        Ok(value)
    }

    /// Reads an aligned `unsigned long`. Values beyond `u32` are rejected.
    pub(crate) fn read_ulong(&mut self) -> NkflResult<u32> {
        self.align(ULONG_ALIGN)?;
        let value = if ULONG_SIZE == 8 {
            self.reader
                .read_u64::<LittleEndian>()
                .map_err(|e| self.truncated(e))?
        } else {
            self.reader
                .read_u32::<LittleEndian>()
                .map_err(|e| self.truncated(e))? as u64
        };
        let at = self.offset;
        self.offset += ULONG_SIZE;
        u32::try_from(value).map_err(|_| {
            NkflError::tag_read(self.tag, format!("value {value} at offset {at} exceeds 32 bits"))
        })
    }

    /// Reads an aligned double.
    pub(crate) fn read_f64(&mut self) -> NkflResult<f64> {
        self.align(DOUBLE_ALIGN)?;
        let value = self
            .reader
            .read_f64::<LittleEndian>()
            .map_err(|e| self.truncated(e))?;
        self.offset += 8;
        Ok(value)
    }

    pub(crate) fn read_array<const N: usize>(&mut self) -> NkflResult<[u8; N]> {
        let mut out = [0u8; N];
        self.reader
            .read_exact(&mut out)
            .map_err(|e| self.truncated(e))?;
        self.offset += N;
        Ok(out)
    }

    /// Takes the next `count` bytes without copying.
    pub(crate) fn read_bytes(&mut self, count: usize) -> NkflResult<Bytes> {
        if self.remaining() < count {
            return Err(NkflError::tag_read(
                self.tag,
                format!(
                    "payload ends early: {count} bytes wanted at offset {}",
                    self.offset
                ),
            ));
        }
        let bytes = self.reader.get_mut().split_to(count);
        self.offset += count;
        Ok(bytes)
    }

    /// Reads the leading size field and checks it against the native layout size.
    pub(crate) fn expect_size_prefix(&mut self, expected: usize) -> NkflResult<()> {
        let declared = self.read_ulong()? as usize;
        if declared != expected {
            return Err(NkflError::tag_read(
                self.tag,
                format!("payload declares {declared} bytes, layout has {expected}"),
            ));
        }
        Ok(())
    }
}

/// Builds a tag payload in native layout.
pub(crate) struct PayloadWriter {
    buf: BytesMut,
}

impl PayloadWriter {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    /// A writer whose first field is the layout size.
    pub(crate) fn with_size_prefix(size: usize) -> Self {
        let mut writer = Self::new(size);
        writer.put_ulong(size as u32);
        writer
    }

    fn pad(&mut self, align: usize) {
        let count = padding(self.buf.len(), align);
        self.buf.put_bytes(0, count);
    }

    pub(crate) fn put_u8(&mut self, value: u8) {
        self.buf.put_u8(value);
    }

    pub(crate) fn put_bool(&mut self, value: bool) {
        self.buf.put_u8(value as u8);
    }

    pub(crate) fn put_u32(&mut self, value: u32) {
        self.buf.put_u32_le(value);
    }

    pub(crate) fn put_i32(&mut self, value: i32) {
        self.buf.put_i32_le(value);
    }

    pub(crate) fn put_ulong(&mut self, value: u32) {
        self.pad(ULONG_ALIGN);
        if ULONG_SIZE == 8 {
            self.buf.put_u64_le(value as u64);
        } else {
            self.buf.put_u32_le(value);
        }
    }

    pub(crate) fn put_f64(&mut self, value: f64) {
        self.pad(DOUBLE_ALIGN);
        self.buf.put_f64_le(value);
    }

    pub(crate) fn put_slice(&mut self, bytes: &[u8]) {
        self.buf.put_slice(bytes);
    }

    /// Pads with zeros up to `size` and returns the payload.
    pub(crate) fn finish(mut self, size: usize) -> Bytes {
        if self.buf.len() < size {
            let count = size - self.buf.len();
            self.buf.put_bytes(0, count);
        }
        self.buf.freeze()
    }

    pub(crate) fn into_bytes(self) -> Bytes {
        self.buf.freeze()
    }
}

/// Interprets engine text: trailing NULs are dropped, UTF-8 is preferred and anything else is
/// read as Latin-1.
pub(crate) fn decode_text(bytes: &[u8]) -> String {
    let end = bytes
        .iter()
        .rposition(|b| *b != 0)
        .map(|pos| pos + 1)
        .unwrap_or(0);
    let text = &bytes[..end];
    match std::str::from_utf8(text) {
        Ok(s) => s.to_owned(),
        Err(_) => text.iter().map(|&b| b as char).collect(),
    }
}

/// Copies `text` into a fixed C character array, NUL-terminated.
pub(crate) fn encode_fixed_text<const N: usize>(text: &str) -> Option<[u8; N]> {
    let bytes = text.as_bytes();
    if bytes.len() >= N || bytes.contains(&0) {
        return None;
    }
    let mut out = [0u8; N];
    out[..bytes.len()].copy_from_slice(bytes);
    Some(out)
}
