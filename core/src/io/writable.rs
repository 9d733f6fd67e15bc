//! Hadoop `WritableUtils` style primitives used by both split files.
//!
//! Integers are zero-compressed: values in `-112..=127` take one byte, larger
//! magnitudes take a marker byte (sign and byte count) followed by the
//! big-endian magnitude bytes. Strings are a VInt byte length followed by
//! UTF-8.

use std::io::{Read, Write};

use byteorder::{ReadBytesExt, WriteBytesExt};

use crate::error::{Error, Result};

pub fn write_vlong<W: Write + ?Sized>(out: &mut W, value: i64) -> std::io::Result<()> {
    if (-112..=127).contains(&value) {
        return out.write_i8(value as i8);
    }

    let (mut magnitude, mut len) = if value < 0 { (!value, -120i32) } else { (value, -112i32) };
    let mut tmp = magnitude;
    while tmp != 0 {
        tmp >>= 8;
        len -= 1;
    }
    out.write_i8(len as i8)?;

    let len = if len < -120 { -(len + 120) } else { -(len + 112) };
    let mut bytes = [0u8; 8];
    for idx in (0..len as usize).rev() {
        bytes[idx] = (magnitude & 0xFF) as u8;
        magnitude >>= 8;
    }
    out.write_all(&bytes[..len as usize])
}

pub fn write_vint<W: Write + ?Sized>(out: &mut W, value: i32) -> std::io::Result<()> {
    write_vlong(out, value as i64)
}

/// Number of bytes `value` takes once VLong encoded.
pub fn vlong_size(value: i64) -> usize {
    if (-112..=127).contains(&value) {
        return 1;
    }
    let magnitude = if value < 0 { !value } else { value };
    let data_bits = 64 - magnitude.leading_zeros() as usize;
    (data_bits + 7) / 8 + 1
}

fn is_negative_marker(first: i8) -> bool {
    first < -120 || (-112..0).contains(&first)
}

fn decode_size(first: i8) -> usize {
    if first >= -112 {
        1
    } else if first < -120 {
        (-119 - first as i32) as usize
    } else {
        (-111 - first as i32) as usize
    }
}

pub fn read_vlong<R: Read + ?Sized>(input: &mut R) -> Result<i64> {
    let first = input.read_i8()?;
    let size = decode_size(first);
    if size == 1 {
        return Ok(first as i64);
    }
    let mut value: i64 = 0;
    for _ in 0..size - 1 {
        value = (value << 8) | input.read_u8()? as i64;
    }
    Ok(if is_negative_marker(first) { !value } else { value })
}

pub fn read_vint<R: Read + ?Sized>(input: &mut R) -> Result<i32> {
    let value = read_vlong(input)?;
    i32::try_from(value).map_err(|_| Error::Format(format!("value {value} does not fit in a vint")))
}

/// Writes `value` the way `Text.writeString` does.
pub fn write_text<W: Write + ?Sized>(out: &mut W, value: &str) -> std::io::Result<()> {
    let bytes = value.as_bytes();
    let len = i32::try_from(bytes.len())
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidInput, "string too long"))?;
    write_vint(out, len)?;
    out.write_all(bytes)
}

pub fn read_text<R: Read + ?Sized>(input: &mut R) -> Result<String> {
    let len = read_vint(input)?;
    if len < 0 {
        return Err(Error::Format(format!("negative string length {len}")));
    }
    let mut buf = vec![0u8; len as usize];
    input.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|e| Error::Format(format!("string is not utf-8: {e}")))
}
