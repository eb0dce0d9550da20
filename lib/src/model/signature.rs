use std::fmt;

/// Whether values of a type live inline on the stack or behind a reference
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum TypeKind {
    Value,
    Reference,
}

/// Type as it appears in parameter lists, locals and instruction operands
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct TypeSig {
    /// Fully qualified type name (eg. `System.Int32`)
    pub name: String,

    pub kind: TypeKind,

    /// Managed pointer to the type (`ref`/`out` parameters)
    pub by_ref: bool,
}

impl TypeSig {
    pub fn value(name: impl Into<String>) -> TypeSig {
        TypeSig {
            name: name.into(),
            kind: TypeKind::Value,
            by_ref: false,
        }
    }

    pub fn reference(name: impl Into<String>) -> TypeSig {
        TypeSig {
            name: name.into(),
            kind: TypeKind::Reference,
            by_ref: false,
        }
    }

    /// Root of the reference type hierarchy, used as the element type of boxed argument arrays
    pub fn object() -> TypeSig {
        TypeSig::reference("System.Object")
    }

    pub fn int32() -> TypeSig {
        TypeSig::value("System.Int32")
    }

    pub fn boolean() -> TypeSig {
        TypeSig::value("System.Boolean")
    }

    /// Turn this into a by-reference type
    pub fn by_ref(self) -> TypeSig {
        TypeSig {
            by_ref: true,
            ..self
        }
    }

    /// Type pointed to by a by-reference type (or the type itself)
    pub fn element_type(&self) -> TypeSig {
        TypeSig {
            by_ref: false,
            ..self.clone()
        }
    }

    pub fn is_value_type(&self) -> bool {
        !self.by_ref && self.kind == TypeKind::Value
    }
}

impl fmt::Display for TypeSig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TypeKind::Value => write!(f, "valuetype {}", self.name)?,
            TypeKind::Reference => write!(f, "class {}", self.name)?,
        }
        if self.by_ref {
            f.write_str("&")?;
        }
        Ok(())
    }
}

/// Reference to a method, possibly defined in another module
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct MethodRef {
    /// Name of the module defining the method
    pub scope: String,

    /// Full name of the declaring type (nested types are separated with `/`)
    pub declaring_type: String,

    pub name: String,

    pub parameter_count: u16,

    /// Does the method leave a value on the stack?
    pub has_return: bool,
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}]{}::{}/{}",
            self.scope, self.declaring_type, self.name, self.parameter_count
        )
    }
}
