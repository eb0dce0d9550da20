use super::{Method, MethodRef, TypeFlags};
use std::fmt;

/// Four-part module version stamp
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub struct Version {
    pub major: u16,
    pub minor: u16,
    pub build: u16,
    pub revision: u16,
}

impl Version {
    pub const fn new(major: u16, minor: u16, build: u16, revision: u16) -> Version {
        Version {
            major,
            minor,
            build,
            revision,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major, self.minor, self.build, self.revision
        )
    }
}

/// Type definition, possibly with nested types
#[derive(Clone, Debug)]
pub struct Type {
    /// Namespace (empty for nested types and the global namespace)
    pub namespace: String,

    /// Simple name
    pub name: String,

    pub flags: TypeFlags,

    pub methods: Vec<Method>,

    pub nested_types: Vec<Type>,
}

impl Type {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Type {
        Type {
            namespace: namespace.into(),
            name: name.into(),
            flags: TypeFlags::PUBLIC,
            methods: vec![],
            nested_types: vec![],
        }
    }

    pub fn with_method(mut self, method: Method) -> Type {
        self.methods.push(method);
        self
    }

    pub fn with_nested(mut self, mut nested: Type) -> Type {
        nested.flags |= TypeFlags::NESTED;
        self.nested_types.push(nested);
        self
    }

    /// Name qualified by the namespace
    pub fn qualified_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        }
    }
}

/// Path to a type: index among the top-level types, then indices among nested types
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct TypeId(Vec<usize>);

impl TypeId {
    /// Top-level type at this index
    pub fn top_level(index: usize) -> TypeId {
        TypeId(vec![index])
    }

    /// Type nested at `index` inside this one
    pub fn nested(&self, index: usize) -> TypeId {
        let mut path = self.0.clone();
        path.push(index);
        TypeId(path)
    }

    pub fn is_nested(&self) -> bool {
        self.0.len() > 1
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct MethodId {
    pub ty: TypeId,
    pub index: usize,
}

/// A loaded module: the unit that is read, patched and written back out
#[derive(Clone, Debug)]
pub struct Module {
    pub name: String,

    pub version: Version,

    /// Names of the other modules this one refers to
    pub references: Vec<String>,

    pub types: Vec<Type>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Module {
        Module {
            name: name.into(),
            version: Version::new(1, 0, 0, 0),
            references: vec![],
            types: vec![],
        }
    }

    pub fn with_type(mut self, ty: Type) -> Module {
        self.types.push(ty);
        self
    }

    pub fn get_type(&self, id: &TypeId) -> Option<&Type> {
        let (first, rest) = id.0.split_first()?;
        let mut ty = self.types.get(*first)?;
        for index in rest {
            ty = ty.nested_types.get(*index)?;
        }
        Some(ty)
    }

    pub fn get_type_mut(&mut self, id: &TypeId) -> Option<&mut Type> {
        let (first, rest) = id.0.split_first()?;
        let mut ty = self.types.get_mut(*first)?;
        for index in rest {
            ty = ty.nested_types.get_mut(*index)?;
        }
        Some(ty)
    }

    pub fn method(&self, id: &MethodId) -> Option<&Method> {
        self.get_type(&id.ty)?.methods.get(id.index)
    }

    pub fn method_mut(&mut self, id: &MethodId) -> Option<&mut Method> {
        self.get_type_mut(&id.ty)?.methods.get_mut(id.index)
    }

    /// Top-level type with this simple name
    pub fn top_level_type(&self, name: &str) -> Option<TypeId> {
        self.types
            .iter()
            .position(|ty| ty.name == name)
            .map(TypeId::top_level)
    }

    /// Every type in the module, nested types included, in declaration order with each nested
    /// type following its enclosing type
    pub fn all_types(&self) -> Vec<(TypeId, &Type)> {
        fn visit<'m>(id: TypeId, ty: &'m Type, out: &mut Vec<(TypeId, &'m Type)>) {
            out.push((id.clone(), ty));
            for (index, nested) in ty.nested_types.iter().enumerate() {
                visit(id.nested(index), nested, out);
            }
        }

        let mut out = vec![];
        for (index, ty) in self.types.iter().enumerate() {
            visit(TypeId::top_level(index), ty, &mut out);
        }
        out
    }

    /// Full name of a type (nested types are separated with `/`)
    pub fn type_full_name(&self, id: &TypeId) -> String {
        let mut segments = vec![];
        let mut ty: Option<&Type> = None;
        for index in &id.0 {
            let next = match ty {
                None => self.types.get(*index),
                Some(outer) => outer.nested_types.get(*index),
            };
            match next {
                Some(next) => {
                    segments.push(if ty.is_none() {
                        next.qualified_name()
                    } else {
                        next.name.clone()
                    });
                    ty = Some(next);
                }
                None => break,
            }
        }
        segments.join("/")
    }

    /// Full name of a method, for diagnostics
    pub fn method_full_name(&self, id: &MethodId) -> String {
        match self.method(id) {
            Some(method) => format!("{}::{}", self.type_full_name(&id.ty), method.name),
            None => format!("{}::<missing #{}>", self.type_full_name(&id.ty), id.index),
        }
    }

    /// Make an external method usable as an operand in this module
    ///
    /// The module defining the method is added to the references (once).
    pub fn import_method(&mut self, method: &MethodRef) -> MethodRef {
        if method.scope != self.name && !self.references.contains(&method.scope) {
            log::debug!("Adding reference to module '{}'", method.scope);
            self.references.push(method.scope.clone());
        }
        method.clone()
    }
}
