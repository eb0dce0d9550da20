use super::DescriptorError;
use crate::image;

#[derive(Debug)]
pub enum Error {
    /// Reading a patch module or one of its dependencies failed
    Image(image::Error),

    /// Patch metadata on a routine is contradictory or out of range
    InvalidDescriptor {
        routine: String,
        reason: DescriptorError,
    },

    /// A routine that looks like a patch has no patch metadata
    MissingDescriptor(String),

    /// A module the patch module refers to could not be loaded
    UnresolvedDependency {
        name: String,
        error: Box<Error>,
    },
}

impl From<image::Error> for Error {
    fn from(err: image::Error) -> Error {
        Error::Image(err)
    }
}
