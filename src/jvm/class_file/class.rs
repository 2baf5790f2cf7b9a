use crate::jvm::class_file::{Attribute, ConstantIndex, Field, Method, PoolEntry, Serialize, Version};
use crate::jvm::{ClassAccessFlags, Error};
use byteorder::WriteBytesExt;
use std::fs;
use std::path::Path;

/// Representation of the [`class` file format of the JVM][0]
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html
#[derive(Debug)]
pub struct ClassFile {
    pub version: Version,

    /// One more than the largest constant index (long and double constants take two indices)
    pub constant_pool_count: u16,
    pub constants: Vec<PoolEntry>,
    pub access_flags: ClassAccessFlags,
    pub this_class: ConstantIndex,

    /// `0` only for `java/lang/Object`
    pub super_class: ConstantIndex,
    pub interfaces: Vec<ConstantIndex>,
    pub fields: Vec<Field>,
    pub methods: Vec<Method>,
    pub attributes: Vec<Attribute>,
}

impl ClassFile {
    /// Magic header bytes that go at the front of the serialized class file
    pub const MAGIC: [u8; 4] = [0xCA, 0xFE, 0xBA, 0xBE];

    /// Serialize the whole class into memory
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        self.to_vec().map_err(Error::IoError)
    }

    /// Save the class file to disk
    ///
    /// The class is serialized fully before the file is created, so a failure never leaves a
    /// truncated class file behind.
    pub fn save_to_path<P: AsRef<Path>>(
        &self,
        path: P,
        create_missing_directories: bool,
    ) -> Result<(), Error> {
        let bytes = self.to_bytes()?;
        let path = path.as_ref();
        if create_missing_directories {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, bytes)?;
        Ok(())
    }
}

impl Serialize for ClassFile {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_all(&ClassFile::MAGIC)?;
        self.version.serialize(writer)?;
        self.constant_pool_count.serialize(writer)?;
        for constant in &self.constants {
            constant.serialize(writer)?;
        }
        self.access_flags.serialize(writer)?;
        self.this_class.serialize(writer)?;
        self.super_class.serialize(writer)?;
        self.interfaces.serialize(writer)?;
        self.fields.serialize(writer)?;
        self.methods.serialize(writer)?;
        self.attributes.serialize(writer)?;
        Ok(())
    }
}
