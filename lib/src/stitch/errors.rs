use crate::image;
use crate::patch;

#[derive(Debug)]
pub enum Error {
    Image(image::Error),
    Patch(patch::Error),

    /// A patch routine name does not map to any target name
    InvalidDescriptor(String),

    NotFound(NotFound),

    /// The target method cannot be patched at all
    UnsupportedTarget {
        method: String,
        reason: Unsupported,
    },

    /// Argument slot outside `0..=3` requested directly
    InvalidArgumentIndex {
        patch: String,
        index: i32,
    },

    /// Local variable slot that the target method does not declare
    InvalidLocalIndex {
        method: String,
        patch: String,
        local: u16,
        locals: usize,
    },
}

#[derive(Debug)]
pub enum NotFound {
    Type(String),

    /// The type exists but has no matching method (all of its method names are listed)
    Method {
        type_name: String,
        method_name: String,
        candidates: Vec<String>,
    },
}

#[derive(Debug, Eq, PartialEq)]
pub enum Unsupported {
    GenericParameters,
    NoBody,
}

impl Error {
    /// Can stitching carry on with the next patch routine after this?
    ///
    /// Unresolvable targets and unusable names only cost the one patch. Everything else means
    /// the patch module does not match the target and the run is aborted.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::NotFound(_) | Error::InvalidDescriptor(_))
    }
}

impl From<image::Error> for Error {
    fn from(err: image::Error) -> Error {
        Error::Image(err)
    }
}

impl From<patch::Error> for Error {
    fn from(err: patch::Error) -> Error {
        Error::Patch(err)
    }
}

impl From<NotFound> for Error {
    fn from(err: NotFound) -> Error {
        Error::NotFound(err)
    }
}
