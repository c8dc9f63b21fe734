// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! On-disk snapshot image for the QuickJS backend.
//!
//! Layout (little-endian):
//!
//! ```text
//! magic "SNAPSTRT" | format u16 | flags u16
//! engine version   (u16 len + bytes)
//! capability count u16, each (u16 len + bytes)
//! context count    u16 (always 1)
//! script count     u32, each name (u16 len + bytes) + bytecode (u32 len + bytes)
//! global count     u32, each name (u16 len + bytes) + value (u32 len + bytes)
//! crc32 of everything above
//! ```

use crate::engine::FunctionCodeHandling;
use crate::error::SnapshotFormatError;

pub const MAGIC: &[u8; 8] = b"SNAPSTRT";
pub const FORMAT_VERSION: u16 = 2;

/// Flag bit set when function source and debug info were stripped.
const FLAG_STRIPPED: u16 = 0x0001;

/// Header (magic + format + flags) plus the checksum trailer.
pub const MIN_IMAGE_LEN: usize = MAGIC.len() + 2 + 2 + 4;

/// Only one context per snapshot is supported.
pub const CONTEXT_COUNT: u16 = 1;

/// One compiled top-level script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledScript {
    pub name: String,
    pub bytecode: Vec<u8>,
}

/// A script-defined global and its serialized value, as it was when the
/// environment was captured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedGlobal {
    pub name: String,
    pub value: Vec<u8>,
}

/// Decoded contents of a snapshot blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotImage {
    pub engine_version: String,
    pub function_code: FunctionCodeHandling,
    pub capabilities: Vec<String>,
    pub scripts: Vec<CompiledScript>,
    pub globals: Vec<CapturedGlobal>,
}

impl SnapshotImage {
    pub fn encode(&self) -> Result<Vec<u8>, String> {
        let payload = self.scripts.iter().map(|s| s.bytecode.len() + 8).sum::<usize>()
            + self.globals.iter().map(|g| g.value.len() + 8).sum::<usize>();
        let mut out = Vec::with_capacity(MIN_IMAGE_LEN + payload);

        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        let flags = match self.function_code {
            FunctionCodeHandling::Keep => 0,
            FunctionCodeHandling::Clear => FLAG_STRIPPED,
        };
        out.extend_from_slice(&flags.to_le_bytes());

        put_str16(&mut out, &self.engine_version)?;

        put_count16(&mut out, self.capabilities.len(), "capability count")?;
        for name in &self.capabilities {
            put_str16(&mut out, name)?;
        }

        out.extend_from_slice(&CONTEXT_COUNT.to_le_bytes());

        put_count32(&mut out, self.scripts.len(), "script count")?;
        for script in &self.scripts {
            put_str16(&mut out, &script.name)?;
            put_bytes32(&mut out, &script.bytecode, &script.name)?;
        }

        put_count32(&mut out, self.globals.len(), "global count")?;
        for global in &self.globals {
            put_str16(&mut out, &global.name)?;
            put_bytes32(&mut out, &global.value, &global.name)?;
        }

        let checksum = crc32fast::hash(&out);
        out.extend_from_slice(&checksum.to_le_bytes());
        Ok(out)
    }

    /// Validate and decode. Checks run cheapest first: length, magic,
    /// version, checksum, then structure.
    pub fn decode(bytes: &[u8]) -> Result<Self, SnapshotFormatError> {
        if bytes.is_empty() {
            return Err(SnapshotFormatError::Empty);
        }
        if bytes.len() < MIN_IMAGE_LEN {
            return Err(SnapshotFormatError::TooShort {
                expected: MIN_IMAGE_LEN,
                actual: bytes.len(),
            });
        }
        if &bytes[..MAGIC.len()] != MAGIC {
            return Err(SnapshotFormatError::BadMagic);
        }

        let (body, trailer) = bytes.split_at(bytes.len() - 4);
        let mut reader = Reader::new(&body[MAGIC.len()..]);

        let version = reader.u16()?;
        if version != FORMAT_VERSION {
            return Err(SnapshotFormatError::UnsupportedVersion {
                found: version,
                expected: FORMAT_VERSION,
            });
        }

        let expected = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
        let actual = crc32fast::hash(body);
        if expected != actual {
            return Err(SnapshotFormatError::ChecksumMismatch { expected, actual });
        }

        let flags = reader.u16()?;
        if flags & !FLAG_STRIPPED != 0 {
            return Err(malformed(format!("unknown flags {:#06x}", flags)));
        }
        let function_code = if flags & FLAG_STRIPPED != 0 {
            FunctionCodeHandling::Clear
        } else {
            FunctionCodeHandling::Keep
        };

        let engine_version = reader.str16("engine version")?;

        let capability_count = reader.u16()?;
        let mut capabilities = Vec::with_capacity(capability_count as usize);
        for _ in 0..capability_count {
            capabilities.push(reader.str16("capability name")?);
        }

        let contexts = reader.u16()?;
        if contexts != CONTEXT_COUNT {
            return Err(malformed(format!(
                "expected {} context, found {}",
                CONTEXT_COUNT, contexts
            )));
        }

        let script_count = reader.u32()?;
        let mut scripts = Vec::new();
        for _ in 0..script_count {
            let name = reader.str16("script name")?;
            let len = reader.u32()? as usize;
            let bytecode = reader.take(len)?.to_vec();
            scripts.push(CompiledScript { name, bytecode });
        }

        let global_count = reader.u32()?;
        let mut globals = Vec::new();
        for _ in 0..global_count {
            let name = reader.str16("global name")?;
            let len = reader.u32()? as usize;
            let value = reader.take(len)?.to_vec();
            globals.push(CapturedGlobal { name, value });
        }

        if !reader.is_at_end() {
            return Err(malformed(format!(
                "{} trailing bytes after last global",
                reader.remaining()
            )));
        }

        Ok(Self {
            engine_version,
            function_code,
            capabilities,
            scripts,
            globals,
        })
    }
}

fn put_str16(out: &mut Vec<u8>, value: &str) -> Result<(), String> {
    put_count16(out, value.len(), "string length")?;
    out.extend_from_slice(value.as_bytes());
    Ok(())
}

fn put_count16(out: &mut Vec<u8>, value: usize, what: &str) -> Result<(), String> {
    let value = u16::try_from(value).map_err(|_| format!("{} {} exceeds u16", what, value))?;
    out.extend_from_slice(&value.to_le_bytes());
    Ok(())
}

fn put_count32(out: &mut Vec<u8>, value: usize, what: &str) -> Result<(), String> {
    let value = u32::try_from(value).map_err(|_| format!("{} {} exceeds u32", what, value))?;
    out.extend_from_slice(&value.to_le_bytes());
    Ok(())
}

fn put_bytes32(out: &mut Vec<u8>, bytes: &[u8], owner: &str) -> Result<(), String> {
    let len = u32::try_from(bytes.len()).map_err(|_| format!("'{}' exceeds 4 GiB", owner))?;
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(bytes);
    Ok(())
}

fn malformed(reason: String) -> SnapshotFormatError {
    SnapshotFormatError::Malformed { reason }
}

/// Bounds-checked cursor over the image body.
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn is_at_end(&self) -> bool {
        self.pos == self.buf.len()
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], SnapshotFormatError> {
        if len > self.remaining() {
            return Err(malformed(format!(
                "need {} bytes at offset {}, only {} left",
                len,
                self.pos,
                self.remaining()
            )));
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn u16(&mut self) -> Result<u16, SnapshotFormatError> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32, SnapshotFormatError> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn str16(&mut self, what: &str) -> Result<String, SnapshotFormatError> {
        let len = self.u16()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| malformed(format!("{} is not UTF-8", what)))
    }
}
