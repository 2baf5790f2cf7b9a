use crate::jvm::class_file::{Attribute, AttributeLike, Serialize};
use crate::jvm::Error;
use crate::util::Width;
use byteorder::WriteBytesExt;
use std::collections::HashMap;

/// Class file constants pool builder
///
/// Building the pool happens in two phases:
///
///   1. constants get [`add`](ConstantPool::add)-ed (with all of the constants they depend on) in
///      whatever order the assembler encounters them. Equal constants are only stored once.
///   2. the pool is [`finalize`](ConstantPool::finalize)-d, which assigns every constant its
///      index. Only after this point can [`index_of`](ConstantPool::index_of) be used.
///
/// Indices can't be handed out eagerly because the size of some instructions (`ldc` vs. `ldc_w`)
/// depends on them, and forward references mean the full set of constants is only known once the
/// whole class has been processed.
#[derive(Debug, Default)]
pub struct ConstantPool {
    /// Constants in the order they were registered
    entries: Vec<Constant>,

    /// Position of each constant in `entries`
    positions: HashMap<Constant, usize>,

    /// Once finalized, the pool index of each constant in `entries`
    indices: Option<Vec<ConstantIndex>>,

    /// Once finalized, the next unused index (this is what goes in `constant_pool_count`)
    next_index: u16,
}

impl ConstantPool {
    pub fn new() -> ConstantPool {
        ConstantPool::default()
    }

    /// Register a constant (and, recursively, every constant it references)
    ///
    /// Adding a constant that is already in the pool does nothing.
    pub fn add(&mut self, constant: Constant) -> Result<(), Error> {
        if self.indices.is_some() {
            let msg = format!("cannot add {:?} to a finalized constant pool", constant);
            return Err(Error::internal(msg));
        }
        if self.positions.contains_key(&constant) {
            return Ok(());
        }

        let dependencies = constant.dependencies();
        self.positions.insert(constant.clone(), self.entries.len());
        self.entries.push(constant);
        for dependency in dependencies {
            self.add(dependency)?;
        }
        Ok(())
    }

    /// Assign indices to all registered constants
    ///
    /// Note: the largest valid index is 65535, indexing starts at 1, and some constants take two
    /// spaces.
    pub fn finalize(&mut self) -> Result<(), Error> {
        if self.indices.is_some() {
            return Err(Error::internal("constant pool was already finalized"));
        }

        let mut indices = Vec::with_capacity(self.entries.len());
        let mut next: usize = 1;
        for constant in &self.entries {
            let following = next + constant.width();
            if following > u16::MAX as usize {
                let msg = format!(
                    "constant pool overflow: {:?} would need index {} (at most {} entries allowed)",
                    constant,
                    next,
                    u16::MAX - 1
                );
                return Err(Error::numeric(msg));
            }
            indices.push(ConstantIndex(next as u16));
            next = following;
        }

        log::trace!(
            "Finalized constant pool: {} constants in {} slots",
            self.entries.len(),
            next - 1
        );
        self.indices = Some(indices);
        self.next_index = next as u16;
        Ok(())
    }

    pub fn is_finalized(&self) -> bool {
        self.indices.is_some()
    }

    /// Number of registered constants (not slots!)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Index of a constant in the finalized pool
    pub fn index_of(&self, constant: &Constant) -> Result<ConstantIndex, Error> {
        let indices = self.indices.as_ref().ok_or_else(|| {
            let msg = format!("unresolved pool: index of {:?} requested before finalize", constant);
            Error::internal(msg)
        })?;
        match self.positions.get(constant) {
            Some(position) => Ok(indices[*position]),
            None => {
                let msg = format!("item not registered in constant pool: {:?}", constant);
                Err(Error::internal(msg))
            }
        }
    }

    pub fn utf8_index(&self, utf8: &str) -> Result<ConstantIndex, Error> {
        self.index_of(&Constant::utf8(utf8))
    }

    pub fn class_index(&self, class_name: &str) -> Result<ConstantIndex, Error> {
        self.index_of(&Constant::class(class_name))
    }

    /// Value of `constant_pool_count` (one more than the largest index)
    pub fn count(&self) -> Result<u16, Error> {
        if self.indices.is_none() {
            return Err(Error::internal("unresolved pool: count requested before finalize"));
        }
        Ok(self.next_index)
    }

    /// Resolve all constants into their on-disk form, in index order
    pub fn entries(&self) -> Result<Vec<PoolEntry>, Error> {
        self.entries
            .iter()
            .map(|constant| self.resolve(constant))
            .collect()
    }

    fn resolve(&self, constant: &Constant) -> Result<PoolEntry, Error> {
        let member = |member: &MemberRef| -> Result<(ConstantIndex, ConstantIndex), Error> {
            let class = self.class_index(&member.class)?;
            let name_and_type = self.index_of(&member.name_and_type())?;
            Ok((class, name_and_type))
        };

        Ok(match constant {
            Constant::Utf8(string) => {
                let bytes = encode_modified_utf8(string);
                if bytes.len() > u16::MAX as usize {
                    let msg = format!("UTF8 constant is {} bytes long", bytes.len());
                    return Err(Error::numeric(msg));
                }
                PoolEntry::Utf8(bytes)
            }
            Constant::Integer(integer) => PoolEntry::Integer(*integer),
            Constant::Float(bits) => PoolEntry::Float(*bits),
            Constant::Long(long) => PoolEntry::Long(*long),
            Constant::Double(bits) => PoolEntry::Double(*bits),
            Constant::Class(name) => PoolEntry::Class(self.utf8_index(name)?),
            Constant::String(string) => PoolEntry::String(self.utf8_index(string)?),
            Constant::NameAndType { name, descriptor } => PoolEntry::NameAndType {
                name: self.utf8_index(name)?,
                descriptor: self.utf8_index(descriptor)?,
            },
            Constant::FieldRef(member_ref) => {
                let (class, name_and_type) = member(member_ref)?;
                PoolEntry::FieldRef(class, name_and_type)
            }
            Constant::MethodRef(member_ref) => {
                let (class, name_and_type) = member(member_ref)?;
                PoolEntry::MethodRef(class, name_and_type)
            }
            Constant::InterfaceMethodRef(member_ref) => {
                let (class, name_and_type) = member(member_ref)?;
                PoolEntry::InterfaceMethodRef(class, name_and_type)
            }
        })
    }

    /// Turn an attribute into its raw form
    ///
    /// The attribute name must have been registered (see [`Constant::utf8`]) before finalizing.
    pub fn attribute<A: AttributeLike>(&self, attribute: &A) -> Result<Attribute, Error> {
        let name_index = self.utf8_index(A::NAME)?;
        let info = attribute.to_vec().map_err(Error::IoError)?;
        Attribute::new(name_index, info)
    }
}

/// Constants as they are known to the assembler
///
/// Unlike [`PoolEntry`], constants refer to each other by value, so they can be built up (and
/// compared for deduplication) before any indices are known. Floating point values are stored as
/// their bit patterns, so that `NaN`s and signed zeros get distinct entries.
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.4
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Constant {
    /// Constant string value (encoded as modified UTF-8)
    Utf8(String),

    /// Constant primitive of type `int`
    Integer(i32),

    /// Constant primitive of type `float` (bits)
    Float(u32),

    /// Constant primitive of type `long`
    Long(i64),

    /// Constant primitive of type `double` (bits)
    Double(u64),

    /// Class or an interface (or an array type, using its descriptor)
    Class(String),

    /// Constant object of type `java.lang.String`
    String(String),

    /// Name and a type (eg. for a field or a method)
    NameAndType { name: String, descriptor: String },

    FieldRef(MemberRef),
    MethodRef(MemberRef),
    InterfaceMethodRef(MemberRef),
}

impl Constant {
    pub fn utf8<S: Into<String>>(string: S) -> Constant {
        Constant::Utf8(string.into())
    }

    pub fn class<S: Into<String>>(class_name: S) -> Constant {
        Constant::Class(class_name.into())
    }

    pub fn string<S: Into<String>>(string: S) -> Constant {
        Constant::String(string.into())
    }

    pub fn float(float: f32) -> Constant {
        Constant::Float(float.to_bits())
    }

    pub fn double(double: f64) -> Constant {
        Constant::Double(double.to_bits())
    }

    pub fn name_and_type<S1: Into<String>, S2: Into<String>>(name: S1, descriptor: S2) -> Constant {
        Constant::NameAndType {
            name: name.into(),
            descriptor: descriptor.into(),
        }
    }

    /// Constants which must be in the pool for this one to be resolvable
    pub fn dependencies(&self) -> Vec<Constant> {
        match self {
            Constant::Utf8(_)
            | Constant::Integer(_)
            | Constant::Float(_)
            | Constant::Long(_)
            | Constant::Double(_) => vec![],
            Constant::Class(name) => vec![Constant::utf8(name.as_str())],
            Constant::String(string) => vec![Constant::utf8(string.as_str())],
            Constant::NameAndType { name, descriptor } => vec![
                Constant::utf8(name.as_str()),
                Constant::utf8(descriptor.as_str()),
            ],
            Constant::FieldRef(member)
            | Constant::MethodRef(member)
            | Constant::InterfaceMethodRef(member) => vec![
                Constant::class(member.class.as_str()),
                member.name_and_type(),
            ],
        }
    }

    /// Can this constant be loaded with `ldc`/`ldc_w`?
    pub fn is_loadable(&self) -> bool {
        matches!(
            self,
            Constant::Integer(_) | Constant::Float(_) | Constant::String(_) | Constant::Class(_)
        )
    }
}

/// Almost all constants have width 1, except for `Constant::Long` and `Constant::Double`. Quoting
/// the JVM specification:
///
/// > All 8-byte constants take up two entries in the constant_pool table of the class file. If a
/// > CONSTANT_Long_info or CONSTANT_Double_info structure is the item in the constant_pool table
/// > at index n, then the next usable item in the pool is located at index n+2.
impl Width for Constant {
    fn width(&self) -> usize {
        match self {
            Constant::Long(_) | Constant::Double(_) => 2,
            _ => 1,
        }
    }
}

/// Reference to a field or method of some class
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemberRef {
    pub class: String,
    pub name: String,
    pub descriptor: String,
}

impl MemberRef {
    pub fn new<S1, S2, S3>(class: S1, name: S2, descriptor: S3) -> MemberRef
    where
        S1: Into<String>,
        S2: Into<String>,
        S3: Into<String>,
    {
        MemberRef {
            class: class.into(),
            name: name.into(),
            descriptor: descriptor.into(),
        }
    }

    fn name_and_type(&self) -> Constant {
        Constant::name_and_type(self.name.as_str(), self.descriptor.as_str())
    }
}

/// Constants as in the constant pool
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.4
#[derive(Debug, Clone, PartialEq)]
pub enum PoolEntry {
    /// Already encoded as modified UTF-8
    Utf8(Vec<u8>),
    Integer(i32),
    Float(u32),
    Long(i64),
    Double(u64),
    Class(ConstantIndex),
    String(ConstantIndex),
    NameAndType {
        name: ConstantIndex,
        descriptor: ConstantIndex,
    },
    FieldRef(ConstantIndex, ConstantIndex),
    MethodRef(ConstantIndex, ConstantIndex),
    InterfaceMethodRef(ConstantIndex, ConstantIndex),
}

impl Serialize for PoolEntry {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        match self {
            PoolEntry::Utf8(bytes) => {
                1u8.serialize(writer)?;
                (bytes.len() as u16).serialize(writer)?;
                writer.write_all(bytes)?;
            }
            PoolEntry::Integer(integer) => {
                3u8.serialize(writer)?;
                integer.serialize(writer)?;
            }
            PoolEntry::Float(bits) => {
                4u8.serialize(writer)?;
                bits.serialize(writer)?;
            }
            PoolEntry::Long(long) => {
                5u8.serialize(writer)?;
                long.serialize(writer)?;
            }
            PoolEntry::Double(bits) => {
                6u8.serialize(writer)?;
                bits.serialize(writer)?;
            }
            PoolEntry::Class(name) => {
                7u8.serialize(writer)?;
                name.serialize(writer)?;
            }
            PoolEntry::String(utf8) => {
                8u8.serialize(writer)?;
                utf8.serialize(writer)?;
            }
            PoolEntry::FieldRef(class, name_and_type) => {
                9u8.serialize(writer)?;
                class.serialize(writer)?;
                name_and_type.serialize(writer)?;
            }
            PoolEntry::MethodRef(class, name_and_type) => {
                10u8.serialize(writer)?;
                class.serialize(writer)?;
                name_and_type.serialize(writer)?;
            }
            PoolEntry::InterfaceMethodRef(class, name_and_type) => {
                11u8.serialize(writer)?;
                class.serialize(writer)?;
                name_and_type.serialize(writer)?;
            }
            PoolEntry::NameAndType { name, descriptor } => {
                12u8.serialize(writer)?;
                name.serialize(writer)?;
                descriptor.serialize(writer)?;
            }
        };
        Ok(())
    }
}

/// Index into the constant pool (`0` is used for "absent" in a handful of places)
#[derive(Copy, Clone, Hash, Eq, PartialEq, PartialOrd, Ord, Debug)]
pub struct ConstantIndex(pub u16);

impl ConstantIndex {
    pub const NONE: ConstantIndex = ConstantIndex(0);
}

impl Serialize for ConstantIndex {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.0.serialize(writer)
    }
}

/// Modified UTF-8 format used in class files.
///
/// See [this `DataInput` section for details][0]. Quoting from that section:
///
/// > The differences between this format and the standard UTF-8 format are the following:
/// >
/// >  * The null byte `\u0000` is encoded in 2-byte format rather than 1-byte, so that the encoded
/// >    strings never have embedded nulls.
/// >  * Only the 1-byte, 2-byte, and 3-byte formats are used.
/// >  * Supplementary characters are represented in the form of surrogate pairs.
///
/// [0]: https://docs.oracle.com/en/java/javase/17/docs/api/java.base/java/io/DataInput.html#modified-utf-8
pub fn encode_modified_utf8(string: &str) -> Vec<u8> {
    let mut buffer: Vec<u8> = Vec::with_capacity(string.len());
    let mut units = [0u16; 2];
    for c in string.chars() {
        // Each UTF-16 code unit (so each half of a surrogate pair) is encoded on its own
        for unit in c.encode_utf16(&mut units).iter().map(|u| *u as u32) {
            match unit {
                0x0001..=0x007F => buffer.push(unit as u8),
                0x0000 | 0x0080..=0x07FF => {
                    buffer.push((unit >> 6 & 0x1F) as u8 | 0b1100_0000);
                    buffer.push((unit & 0x3F) as u8 | 0b1000_0000);
                }
                _ => {
                    buffer.push((unit >> 12 & 0x0F) as u8 | 0b1110_0000);
                    buffer.push((unit >> 6 & 0x3F) as u8 | 0b1000_0000);
                    buffer.push((unit & 0x3F) as u8 | 0b1000_0000);
                }
            }
        }
    }
    buffer
}

#[cfg(test)]
mod encode_modified_utf8_tests {
    use super::*;

    #[test]
    fn containing_null_byte() {
        assert_eq!(encode_modified_utf8("a\x00a"), vec![97, 192, 128, 97]);
    }

    #[test]
    fn simple_ascii() {
        assert_eq!(encode_modified_utf8("foo"), vec![102, 111, 111]);
    }

    #[test]
    fn two_and_three_byte_encodings() {
        assert_eq!(encode_modified_utf8("ĄǍ"), vec![196, 132, 199, 141]);
        assert_eq!(
            encode_modified_utf8("ऄअ"),
            vec![224, 164, 132, 224, 164, 133]
        );
    }

    #[test]
    fn supplementary_characters() {
        assert_eq!(
            encode_modified_utf8("\u{10000}\u{10FFFF}"),
            vec![237, 160, 128, 237, 176, 128, 237, 175, 191, 237, 191, 191]
        );
    }
}

#[cfg(test)]
mod pool_tests {
    use super::*;

    fn println() -> Constant {
        Constant::MethodRef(MemberRef::new(
            "java/io/PrintStream",
            "println",
            "(Ljava/lang/String;)V",
        ))
    }

    #[test]
    fn equal_constants_share_a_slot() {
        let mut pool = ConstantPool::new();
        pool.add(Constant::string("hello")).unwrap();
        pool.add(Constant::utf8("hello")).unwrap();
        pool.add(Constant::string("hello")).unwrap();
        assert_eq!(pool.len(), 2);

        pool.finalize().unwrap();
        assert_eq!(pool.index_of(&Constant::string("hello")).unwrap(), ConstantIndex(1));
        assert_eq!(pool.utf8_index("hello").unwrap(), ConstantIndex(2));
        assert_eq!(pool.count().unwrap(), 3);
    }

    #[test]
    fn references_register_dependencies_after_themselves() {
        let mut pool = ConstantPool::new();
        pool.add(println()).unwrap();
        pool.finalize().unwrap();

        assert_eq!(pool.index_of(&println()).unwrap(), ConstantIndex(1));
        assert_eq!(pool.class_index("java/io/PrintStream").unwrap(), ConstantIndex(2));
        assert_eq!(pool.utf8_index("java/io/PrintStream").unwrap(), ConstantIndex(3));
        let nat = Constant::name_and_type("println", "(Ljava/lang/String;)V");
        assert_eq!(pool.index_of(&nat).unwrap(), ConstantIndex(4));
        assert_eq!(pool.count().unwrap(), 7);

        let entries = pool.entries().unwrap();
        assert_eq!(
            entries[0],
            PoolEntry::MethodRef(ConstantIndex(2), ConstantIndex(4))
        );
    }

    #[test]
    fn wide_constants_take_two_slots() {
        let mut pool = ConstantPool::new();
        pool.add(Constant::Long(1)).unwrap();
        pool.add(Constant::Integer(2)).unwrap();
        pool.add(Constant::double(3.0)).unwrap();
        pool.add(Constant::float(4.0)).unwrap();
        pool.finalize().unwrap();

        assert_eq!(pool.index_of(&Constant::Long(1)).unwrap(), ConstantIndex(1));
        assert_eq!(pool.index_of(&Constant::Integer(2)).unwrap(), ConstantIndex(3));
        assert_eq!(pool.index_of(&Constant::double(3.0)).unwrap(), ConstantIndex(4));
        assert_eq!(pool.index_of(&Constant::float(4.0)).unwrap(), ConstantIndex(6));
        assert_eq!(pool.count().unwrap(), 7);
    }

    #[test]
    fn float_identity_is_bitwise() {
        let mut pool = ConstantPool::new();
        pool.add(Constant::float(0.0)).unwrap();
        pool.add(Constant::float(-0.0)).unwrap();
        pool.add(Constant::float(f32::NAN)).unwrap();
        pool.add(Constant::float(f32::NAN)).unwrap();
        assert_eq!(pool.len(), 3);
    }

    #[test]
    fn indices_are_only_available_after_finalize() {
        let mut pool = ConstantPool::new();
        pool.add(Constant::Integer(7)).unwrap();
        let err = pool.index_of(&Constant::Integer(7)).unwrap_err();
        assert!(err.is_internal());
        assert!(err.to_string().contains("unresolved pool"));

        pool.finalize().unwrap();
        let err = pool.index_of(&Constant::Integer(8)).unwrap_err();
        assert!(err.is_internal());
        assert!(err.to_string().contains("not registered"));

        assert!(pool.add(Constant::Integer(8)).unwrap_err().is_internal());
        assert!(pool.finalize().unwrap_err().is_internal());
    }

    #[test]
    fn pool_overflow_is_numeric() {
        let mut pool = ConstantPool::new();
        for i in 0..65534 {
            pool.add(Constant::Integer(i)).unwrap();
        }
        pool.add(Constant::Long(0)).unwrap();
        assert!(pool.finalize().unwrap_err().is_numeric());

        let mut pool = ConstantPool::new();
        for i in 0..65534 {
            pool.add(Constant::Integer(i)).unwrap();
        }
        pool.finalize().unwrap();
        assert_eq!(pool.count().unwrap(), 65535);
    }

    #[test]
    fn entries_serialize_with_tags() {
        let mut pool = ConstantPool::new();
        pool.add(Constant::class("A")).unwrap();
        pool.add(Constant::Integer(-1)).unwrap();
        pool.finalize().unwrap();

        let mut bytes = vec![];
        for entry in pool.entries().unwrap() {
            entry.serialize(&mut bytes).unwrap();
        }
        assert_eq!(
            bytes,
            vec![7, 0, 2, 1, 0, 1, b'A', 3, 0xff, 0xff, 0xff, 0xff]
        );
    }
}
