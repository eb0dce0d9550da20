use super::Error;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::convert::TryFrom;

/// Utility trait for serializing data inside module images
///
/// Module images have some peculiarities that make it useful to define an extra trait (instead of
/// just using `serde`):
///
///   - tags are always `u8`
///   - when serializing a sequence, the length of the sequence is usually `u16`
///   - everything is big-endian
///
pub trait Serialize: Sized {
    /// Serialize construct into a binary output stream
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<(), Error>;
}

/// Inverse of [`Serialize`]
pub trait Deserialize: Sized {
    /// Deserialize construct from a binary input stream
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error>;
}

impl Serialize for u8 {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<(), Error> {
        Ok(writer.write_u8(*self)?)
    }
}

impl Deserialize for u8 {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        Ok(reader.read_u8()?)
    }
}

impl Serialize for u16 {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<(), Error> {
        Ok(writer.write_u16::<BigEndian>(*self)?)
    }
}

impl Deserialize for u16 {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        Ok(reader.read_u16::<BigEndian>()?)
    }
}

impl Serialize for u32 {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<(), Error> {
        Ok(writer.write_u32::<BigEndian>(*self)?)
    }
}

impl Deserialize for u32 {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        Ok(reader.read_u32::<BigEndian>()?)
    }
}

impl Serialize for i32 {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<(), Error> {
        Ok(writer.write_i32::<BigEndian>(*self)?)
    }
}

impl Deserialize for i32 {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        Ok(reader.read_i32::<BigEndian>()?)
    }
}

impl Serialize for bool {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<(), Error> {
        (*self as u8).serialize(writer)
    }
}

impl Deserialize for bool {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        match u8::deserialize(reader)? {
            0 => Ok(false),
            1 => Ok(true),
            tag => Err(Error::UnknownTag { what: "bool", tag }),
        }
    }
}

/// Length in `u16` followed by the UTF-8 bytes
impl Serialize for String {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<(), Error> {
        length_prefix("string", self.len())?.serialize(writer)?;
        writer.write_all(self.as_bytes())?;
        Ok(())
    }
}

impl Deserialize for String {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        let len = u16::deserialize(reader)?;
        let mut bytes = vec![0; len as usize];
        reader.read_exact(&mut bytes)?;
        Ok(String::from_utf8(bytes)?)
    }
}

/// Tag `0` for absent, `1` followed by the value for present
impl<A: Serialize> Serialize for Option<A> {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<(), Error> {
        match self {
            None => 0u8.serialize(writer),
            Some(value) => {
                1u8.serialize(writer)?;
                value.serialize(writer)
            }
        }
    }
}

impl<A: Deserialize> Deserialize for Option<A> {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        match u8::deserialize(reader)? {
            0 => Ok(None),
            1 => Ok(Some(A::deserialize(reader)?)),
            tag => Err(Error::UnknownTag { what: "option", tag }),
        }
    }
}

/// Size in `u16` is the first thing serialized/deserialized
impl<A: Serialize> Serialize for Vec<A> {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<(), Error> {
        length_prefix("sequence", self.len())?.serialize(writer)?;
        for elem in self {
            elem.serialize(writer)?;
        }
        Ok(())
    }
}

impl<A: Deserialize> Deserialize for Vec<A> {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        let len = u16::deserialize(reader)?;
        (0..len).map(|_| A::deserialize(reader)).collect()
    }
}

fn length_prefix(what: &'static str, len: usize) -> Result<u16, Error> {
    u16::try_from(len).map_err(|_| Error::LengthOverflow { what, len })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn strings_are_length_prefixed() {
        let mut bytes = vec![];
        String::from("ctor").serialize(&mut bytes).unwrap();
        assert_eq!(bytes, vec![0, 4, b'c', b't', b'o', b'r']);
        assert_eq!(String::deserialize(&mut &bytes[..]).unwrap(), "ctor");
    }

    #[test]
    fn bad_bool_tag() {
        let bytes = [7u8];
        match bool::deserialize(&mut &bytes[..]) {
            Err(Error::UnknownTag { what: "bool", tag: 7 }) => (),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn truncated_input_is_an_io_error() {
        let bytes = [0u8, 9, b'a'];
        assert!(matches!(
            String::deserialize(&mut &bytes[..]),
            Err(Error::IoError(_))
        ));
    }
}
