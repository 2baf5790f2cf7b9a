use crate::jvm::class_file::Serialize;
use crate::jvm::Error;
use byteorder::WriteBytesExt;
use std::fmt;
use std::io::Result;
use std::str::FromStr;

/// Version of the class file, which is used to verify that the JVM has the
/// necessary features to interpret the class
///
/// Fields are ordered so that the derived `Ord` compares major versions first.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct Version {
    pub major_version: u16,
    pub minor_version: u16,
}

impl Version {
    /// Version emitted by the classic JDK 1.1 compiler (and the assembler default)
    pub const JAVA1_1: Version = Version {
        major_version: 45,
        minor_version: 3,
    };

    /// First version where the verifier requires a `StackMapTable`
    pub const JAVA6: Version = Version {
        major_version: 50,
        minor_version: 0,
    };

    /// JVM class file version corresponding to Java SE 8 (released March 2014)
    pub const JAVA8: Version = Version {
        major_version: 52,
        minor_version: 0,
    };

    pub const fn new(major_version: u16, minor_version: u16) -> Version {
        Version {
            major_version,
            minor_version,
        }
    }

    /// Does this version use the compact `StackMapTable` attribute (instead of `StackMap`)?
    pub fn uses_stack_map_table(&self) -> bool {
        self.major_version >= Version::JAVA6.major_version
    }
}

impl Default for Version {
    fn default() -> Version {
        Version::JAVA1_1
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major_version, self.minor_version)
    }
}

/// Parse versions of the form `major.minor` (or just `major`)
impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Version, Error> {
        let (major, minor) = s.split_once('.').unwrap_or((s, "0"));
        let parse = |part: &str| -> std::result::Result<u16, Error> {
            let value: u64 = part
                .trim()
                .parse()
                .map_err(|_| Error::structural(format!("malformed class file version '{}'", s)))?;
            u16::try_from(value)
                .map_err(|_| Error::numeric(format!("class file version '{}' is too large", s)))
        };
        Ok(Version::new(parse(major)?, parse(minor)?))
    }
}

impl Serialize for Version {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        self.minor_version.serialize(writer)?;
        self.major_version.serialize(writer)?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_versions() {
        assert_eq!("50.0".parse::<Version>().unwrap(), Version::JAVA6);
        assert_eq!("45.3".parse::<Version>().unwrap(), Version::JAVA1_1);
        assert_eq!("52".parse::<Version>().unwrap(), Version::JAVA8);
        assert!("fifty".parse::<Version>().unwrap_err().to_string().contains("malformed"));
        assert!("70000.0".parse::<Version>().unwrap_err().is_numeric());
    }

    #[test]
    fn stack_map_form_depends_on_major() {
        assert!(!Version::JAVA1_1.uses_stack_map_table());
        assert!(!Version::new(49, 0).uses_stack_map_table());
        assert!(Version::JAVA6.uses_stack_map_table());
        assert!(Version::JAVA6 > Version::new(49, 65535));
    }

    #[test]
    fn minor_is_written_first() {
        assert_eq!(Version::JAVA1_1.to_vec().unwrap(), vec![0, 3, 0, 45]);
    }
}
