use crate::jvm::class_file::Serialize;
use crate::jvm::Error;
use bitflags::bitflags;
use byteorder::WriteBytesExt;
use std::io::Result;

bitflags! {
    /// Access flags on classes
    ///
    /// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.1-200-E.1
    pub struct ClassAccessFlags: u16 {
        const PUBLIC = 0x0001;
        const FINAL = 0x0010;
        const SUPER = 0x0020;
        const INTERFACE = 0x0200;
        const ABSTRACT = 0x0400;
        const SYNTHETIC = 0x1000;
        const ANNOTATION = 0x2000;
        const ENUM = 0x4000;
        const MODULE = 0x8000;
    }
}

bitflags! {
    /// Access flags on methods
    ///
    /// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.6-200-A.1
    pub struct MethodAccessFlags: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const SYNCHRONIZED = 0x0020;
        const BRIDGE = 0x0040;
        const VARARGS = 0x0080;
        const NATIVE = 0x0100;
        const ABSTRACT = 0x0400;
        const STRICT = 0x0800;
        const SYNTHETIC = 0x1000;
    }
}

bitflags! {
    /// Access flags on fields
    ///
    /// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.5-200-A.1
    pub struct FieldAccessFlags: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const VOLATILE = 0x0040;
        const TRANSIENT = 0x0080;
        const SYNTHETIC = 0x1000;
        const ENUM = 0x4000;
    }
}

bitflags! {
    /// Access flags on inner classes
    ///
    /// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.7.6-300-D.1-D.1
    pub struct InnerClassAccessFlags: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const INTERFACE = 0x0200;
        const ABSTRACT = 0x0400;
        const SYNTHETIC = 0x1000;
        const ANNOTATION = 0x2000;
        const ENUM = 0x4000;
    }
}

/// Keywords accepted in assembly source for access flags
///
/// The same keyword can mean different bits depending on what it is attached to (`volatile` and
/// `bridge` share `0x0040`), so each flag set only accepts the keywords that make sense for it.
const CLASS_KEYWORDS: &[(&str, u16)] = &[
    ("public", 0x0001),
    ("final", 0x0010),
    ("super", 0x0020),
    ("interface", 0x0200),
    ("abstract", 0x0400),
    ("synthetic", 0x1000),
    ("annotation", 0x2000),
    ("enum", 0x4000),
    ("module", 0x8000),
];

const METHOD_KEYWORDS: &[(&str, u16)] = &[
    ("public", 0x0001),
    ("private", 0x0002),
    ("protected", 0x0004),
    ("static", 0x0008),
    ("final", 0x0010),
    ("synchronized", 0x0020),
    ("bridge", 0x0040),
    ("varargs", 0x0080),
    ("native", 0x0100),
    ("abstract", 0x0400),
    ("strict", 0x0800),
    ("strictfp", 0x0800),
    ("synthetic", 0x1000),
];

const FIELD_KEYWORDS: &[(&str, u16)] = &[
    ("public", 0x0001),
    ("private", 0x0002),
    ("protected", 0x0004),
    ("static", 0x0008),
    ("final", 0x0010),
    ("volatile", 0x0040),
    ("transient", 0x0080),
    ("synthetic", 0x1000),
    ("enum", 0x4000),
];

const INNER_CLASS_KEYWORDS: &[(&str, u16)] = &[
    ("public", 0x0001),
    ("private", 0x0002),
    ("protected", 0x0004),
    ("static", 0x0008),
    ("final", 0x0010),
    ("interface", 0x0200),
    ("abstract", 0x0400),
    ("synthetic", 0x1000),
    ("annotation", 0x2000),
    ("enum", 0x4000),
];

fn keyword_bits<'a>(
    keywords: impl IntoIterator<Item = &'a str>,
    table: &[(&str, u16)],
    kind: &str,
) -> std::result::Result<u16, Error> {
    let mut bits = 0;
    for keyword in keywords {
        match table.iter().find(|(name, _)| *name == keyword) {
            Some((_, bit)) => bits |= bit,
            None => {
                let msg = format!("'{}' is not a valid {} access flag", keyword, kind);
                return Err(Error::structural(msg));
            }
        }
    }
    Ok(bits)
}

impl ClassAccessFlags {
    pub fn from_keywords<'a>(
        keywords: impl IntoIterator<Item = &'a str>,
    ) -> std::result::Result<Self, Error> {
        keyword_bits(keywords, CLASS_KEYWORDS, "class").map(Self::from_bits_truncate)
    }
}

impl MethodAccessFlags {
    pub fn from_keywords<'a>(
        keywords: impl IntoIterator<Item = &'a str>,
    ) -> std::result::Result<Self, Error> {
        keyword_bits(keywords, METHOD_KEYWORDS, "method").map(Self::from_bits_truncate)
    }
}

impl FieldAccessFlags {
    pub fn from_keywords<'a>(
        keywords: impl IntoIterator<Item = &'a str>,
    ) -> std::result::Result<Self, Error> {
        keyword_bits(keywords, FIELD_KEYWORDS, "field").map(Self::from_bits_truncate)
    }
}

impl InnerClassAccessFlags {
    pub fn from_keywords<'a>(
        keywords: impl IntoIterator<Item = &'a str>,
    ) -> std::result::Result<Self, Error> {
        keyword_bits(keywords, INNER_CLASS_KEYWORDS, "inner class").map(Self::from_bits_truncate)
    }
}

impl Serialize for ClassAccessFlags {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        self.bits().serialize(writer)
    }
}

impl Serialize for MethodAccessFlags {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        self.bits().serialize(writer)
    }
}

impl Serialize for FieldAccessFlags {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        self.bits().serialize(writer)
    }
}

impl Serialize for InnerClassAccessFlags {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        self.bits().serialize(writer)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn keywords_map_to_flags() {
        let flags = MethodAccessFlags::from_keywords(["public", "static"]).unwrap();
        assert_eq!(flags, MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC);

        let flags = FieldAccessFlags::from_keywords(["private", "volatile"]).unwrap();
        assert_eq!(flags.bits(), 0x0042);
    }

    #[test]
    fn keyword_for_wrong_kind_is_rejected() {
        assert!(ClassAccessFlags::from_keywords(["volatile"]).is_err());
        assert!(FieldAccessFlags::from_keywords(["synchronized"]).is_err());
    }
}
