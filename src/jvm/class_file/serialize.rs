use byteorder::{BigEndian, WriteBytesExt};
use std::io::Result;

/// Utility trait for serializing data inside class files
///
/// Java class files have some peculiarities that make it useful to define an extra trait (instead
/// of just using `serde`):
///
///   - everything is big-endian
///   - tags are always `u8`
///   - when serializing a sequence, the length of the sequence is usually `u16`
///
pub trait Serialize: Sized {
    /// Serialize construct into a binary output stream
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()>;

    /// Serialize into a fresh buffer
    fn to_vec(&self) -> Result<Vec<u8>> {
        let mut buffer = vec![];
        self.serialize(&mut buffer)?;
        Ok(buffer)
    }
}

impl Serialize for u8 {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        writer.write_u8(*self)
    }
}

impl Serialize for i8 {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        writer.write_i8(*self)
    }
}

macro_rules! big_endian_serialize {
    ($($typ:ty => $write:ident),* $(,)?) => {
        $(
            impl Serialize for $typ {
                fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
                    writer.$write::<BigEndian>(*self)
                }
            }
        )*
    };
}

big_endian_serialize! {
    u16 => write_u16,
    u32 => write_u32,
    u64 => write_u64,
    i16 => write_i16,
    i32 => write_i32,
    i64 => write_i64,
}

/// Size in `u16` is the first thing serialized
///
/// Callers are responsible for checking the length fits (see `u16_count`).
impl<A: Serialize> Serialize for Vec<A> {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        (self.len() as u16).serialize(writer)?;
        for elem in self {
            elem.serialize(writer)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn big_endian_numbers() {
        assert_eq!(0x1234u16.to_vec().unwrap(), vec![0x12, 0x34]);
        assert_eq!((-2i32).to_vec().unwrap(), vec![0xff, 0xff, 0xff, 0xfe]);
        assert_eq!(
            0x0102030405060708u64.to_vec().unwrap(),
            vec![1, 2, 3, 4, 5, 6, 7, 8]
        );
    }

    #[test]
    fn vectors_are_length_prefixed() {
        assert_eq!(vec![7u8, 8u8].to_vec().unwrap(), vec![0, 2, 7, 8]);
        assert_eq!(Vec::<u16>::new().to_vec().unwrap(), vec![0, 0]);
    }
}
