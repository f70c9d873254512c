//! JVM class-file decoding: the provider a cache falls back to.
//!
//! Only the structural header is decoded (constant pool, names, member
//! counts); method bodies and attributes are skipped by length.

use anyhow::Result;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::klass::{ClassDefinitionInfo, LoaderKind, ParsedClass};
use crate::provider::KlassProvider;
use crate::symbol::Symbol;

pub const MAGIC: u32 = 0xCAFE_BABE;
pub const MIN_MAJOR_VERSION: u16 = 45;
pub const MAX_MAJOR_VERSION: u16 = 69;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClassFormatError {
    #[error("truncated class file: needed {needed} bytes at offset {offset}")]
    Truncated { offset: usize, needed: usize },
    #[error("bad magic number {0:#010x}")]
    BadMagic(u32),
    #[error("unsupported class file version {major}.{minor}")]
    UnsupportedVersion { major: u16, minor: u16 },
    #[error("unknown constant pool tag {tag} at index {index}")]
    BadConstantTag { index: u16, tag: u8 },
    #[error("constant pool index {0} out of range")]
    BadConstantIndex(u16),
    #[error("constant pool entry {0} is not a class reference")]
    NotAClassEntry(u16),
    #[error("constant pool entry {0} is not valid modified UTF-8")]
    InvalidUtf8(u16),
    #[error("wrong name: expected {expected}, found {found}")]
    NameMismatch { expected: String, found: String },
    #[error("{0} trailing bytes after class attributes")]
    TrailingBytes(usize),
}

/// Decodes class files on every call; wrap it in a
/// [`crate::cache::CachedKlassProvider`] to memoize.
#[derive(Debug, Default)]
pub struct ClassFileParser {
    parses: AtomicU64,
}

impl ClassFileParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of class files decoded so far, successful or not.
    pub fn parse_count(&self) -> u64 {
        self.parses.load(Ordering::Relaxed)
    }
}

impl KlassProvider for ClassFileParser {
    fn parser_klass(
        &self,
        _loader: LoaderKind,
        symbol: Option<&Symbol>,
        bytes: &[u8],
        _info: &ClassDefinitionInfo,
    ) -> Result<Arc<ParsedClass>> {
        self.parses.fetch_add(1, Ordering::Relaxed);
        let parsed = parse_class(bytes)?;
        if let Some(symbol) = symbol
            && symbol.as_str() != parsed.class_name
        {
            return Err(ClassFormatError::NameMismatch {
                expected: symbol.to_string(),
                found: parsed.class_name,
            }
            .into());
        }
        Ok(Arc::new(parsed))
    }
}

pub fn parse_class(bytes: &[u8]) -> Result<ParsedClass, ClassFormatError> {
    let mut r = Reader::new(bytes);

    let magic = r.u32()?;
    if magic != MAGIC {
        return Err(ClassFormatError::BadMagic(magic));
    }
    let minor_version = r.u16()?;
    let major_version = r.u16()?;
    if !(MIN_MAJOR_VERSION..=MAX_MAJOR_VERSION).contains(&major_version) {
        return Err(ClassFormatError::UnsupportedVersion {
            major: major_version,
            minor: minor_version,
        });
    }

    let constant_pool_count = r.u16()?;
    let pool = ConstantPool::read(&mut r, constant_pool_count)?;

    let access_flags = r.u16()?;
    let class_name = pool.class_name(r.u16()?)?;
    let super_index = r.u16()?;
    let super_name = match super_index {
        0 => None,
        idx => Some(pool.class_name(idx)?),
    };

    let interface_count = r.u16()?;
    let mut interfaces = Vec::with_capacity(interface_count as usize);
    for _ in 0..interface_count {
        interfaces.push(pool.class_name(r.u16()?)?);
    }

    let field_count = r.u16()?;
    for _ in 0..field_count {
        skip_member(&mut r)?;
    }
    let method_count = r.u16()?;
    for _ in 0..method_count {
        skip_member(&mut r)?;
    }
    skip_attributes(&mut r)?;

    if r.remaining() > 0 {
        return Err(ClassFormatError::TrailingBytes(r.remaining()));
    }

    Ok(ParsedClass {
        class_name,
        super_name,
        interfaces,
        access_flags,
        major_version,
        minor_version,
        constant_pool_count,
        field_count,
        method_count,
    })
}

fn skip_member(r: &mut Reader<'_>) -> Result<(), ClassFormatError> {
    // access_flags, name_index, descriptor_index
    r.take(6)?;
    skip_attributes(r)
}

fn skip_attributes(r: &mut Reader<'_>) -> Result<(), ClassFormatError> {
    let count = r.u16()?;
    for _ in 0..count {
        r.u16()?;
        let len = r.u32()? as usize;
        r.take(len)?;
    }
    Ok(())
}

enum Constant {
    Utf8(String),
    Class(u16),
    Other,
    // second slot of a long or double, and slot 0
    Unusable,
}

struct ConstantPool {
    entries: Vec<Constant>,
}

impl ConstantPool {
    fn read(r: &mut Reader<'_>, count: u16) -> Result<Self, ClassFormatError> {
        let mut entries = Vec::with_capacity(count as usize);
        entries.push(Constant::Unusable);

        let mut index = 1u16;
        while index < count {
            let tag = r.u8()?;
            let entry = match tag {
                1 => {
                    let len = r.u16()? as usize;
                    let raw = r.take(len)?;
                    let text =
                        decode_modified_utf8(raw).ok_or(ClassFormatError::InvalidUtf8(index))?;
                    Constant::Utf8(text)
                }
                7 => Constant::Class(r.u16()?),
                // String, MethodType, Module, Package
                8 | 16 | 19 | 20 => {
                    r.take(2)?;
                    Constant::Other
                }
                // MethodHandle
                15 => {
                    r.take(3)?;
                    Constant::Other
                }
                // Integer, Float, Fieldref, Methodref, InterfaceMethodref,
                // NameAndType, Dynamic, InvokeDynamic
                3 | 4 | 9 | 10 | 11 | 12 | 17 | 18 => {
                    r.take(4)?;
                    Constant::Other
                }
                // Long, Double
                5 | 6 => {
                    r.take(8)?;
                    entries.push(Constant::Other);
                    entries.push(Constant::Unusable);
                    index = index.saturating_add(2);
                    continue;
                }
                tag => return Err(ClassFormatError::BadConstantTag { index, tag }),
            };
            entries.push(entry);
            index += 1;
        }

        Ok(Self { entries })
    }

    fn get(&self, index: u16) -> Result<&Constant, ClassFormatError> {
        self.entries
            .get(index as usize)
            .ok_or(ClassFormatError::BadConstantIndex(index))
    }

    fn utf8(&self, index: u16) -> Result<&str, ClassFormatError> {
        match self.get(index)? {
            Constant::Utf8(text) => Ok(text),
            _ => Err(ClassFormatError::BadConstantIndex(index)),
        }
    }

    /// Dotted name of the class referenced at `index`.
    fn class_name(&self, index: u16) -> Result<String, ClassFormatError> {
        match self.get(index)? {
            Constant::Class(name_index) => Ok(self.utf8(*name_index)?.replace('/', ".")),
            _ => Err(ClassFormatError::NotAClassEntry(index)),
        }
    }
}

/// Decodes the JVM's modified UTF-8: no raw NUL bytes, NUL as `C0 80`,
/// supplementary characters as surrogate pairs.
fn decode_modified_utf8(raw: &[u8]) -> Option<String> {
    let mut units = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        let b0 = raw[i] as u16;
        match raw[i] {
            0x01..=0x7f => {
                units.push(b0);
                i += 1;
            }
            0xc0..=0xdf => {
                let b1 = continuation(raw.get(i + 1))?;
                units.push(((b0 & 0x1f) << 6) | b1);
                i += 2;
            }
            0xe0..=0xef => {
                let b1 = continuation(raw.get(i + 1))?;
                let b2 = continuation(raw.get(i + 2))?;
                units.push(((b0 & 0x0f) << 12) | (b1 << 6) | b2);
                i += 3;
            }
            _ => return None,
        }
    }
    Some(
        char::decode_utf16(units)
            .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect(),
    )
}

fn continuation(byte: Option<&u8>) -> Option<u16> {
    match byte {
        Some(b) if b & 0xc0 == 0x80 => Some((b & 0x3f) as u16),
        _ => None,
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], ClassFormatError> {
        if self.remaining() < n {
            return Err(ClassFormatError::Truncated {
                offset: self.pos,
                needed: n,
            });
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, ClassFormatError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, ClassFormatError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32, ClassFormatError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }
}
