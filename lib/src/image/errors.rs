use std::string::FromUtf8Error;

#[derive(Debug)]
pub enum Error {
    IoError(std::io::Error),

    /// File does not start with the module image magic bytes
    BadMagic([u8; 4]),

    UnsupportedFormatVersion(u16),

    UnknownOpcode(u8),

    /// Unknown tag byte for an enumerated value
    UnknownTag {
        what: &'static str,
        tag: u8,
    },

    MalformedUtf8(FromUtf8Error),

    /// Too many elements to fit the length prefix
    LengthOverflow {
        what: &'static str,
        len: usize,
    },

    /// A branch operand does not point at an instruction of the method
    ///
    /// Patching with an out-of-range offset produces modules that fail here when loaded.
    BadBranchTarget {
        method: String,
        target: u32,
        instructions: usize,
    },
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::IoError(err)
    }
}

impl From<FromUtf8Error> for Error {
    fn from(err: FromUtf8Error) -> Error {
        Error::MalformedUtf8(err)
    }
}
