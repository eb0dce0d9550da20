use super::{Instruction, InstructionStream, MethodFlags, TypeSig};

/// Declared method parameter
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub ty: TypeSig,
}

/// Patch metadata exactly as attached to a routine in a patch module
///
/// Integer fields use `-1` for "unset". This is the raw, unvalidated form: see
/// [`crate::patch::PatchDescriptor`] for the checked representation the stitcher works with.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PatchInfo {
    /// Instruction index to insert the patch at
    pub offset: i32,

    /// Instruction index to continue at after the patch
    pub return_to: i32,

    /// Return from the target method right after the patch
    pub return_after_call: bool,

    /// Return from the target method if the patch returned `null`
    pub return_if_null: bool,

    /// Store the patch result in this local, then load it again
    pub store_result: i32,

    /// Load this local before calling the patch
    pub load_local: i32,

    /// Pass every argument of the target (boxed, in an array)
    pub pass_all_args: bool,

    /// Pass the instance of the target
    pub pass_instance: bool,

    /// Pass one argument slot, or several when bit 8 (`256`) is set
    pub pass_arg_by_index: i32,

    /// Duplicate the top of the stack before the patch
    pub insert_dup: bool,

    /// The patch result decides whether the target returns
    pub decides_return: bool,

    /// Only patch the overload with this many declared parameters
    pub target_arg_count: i32,
}

impl Default for PatchInfo {
    fn default() -> PatchInfo {
        PatchInfo {
            offset: 0,
            return_to: -1,
            return_after_call: false,
            return_if_null: false,
            store_result: -1,
            load_local: -1,
            pass_all_args: false,
            pass_instance: false,
            pass_arg_by_index: -1,
            insert_dup: false,
            decides_return: false,
            target_arg_count: -1,
        }
    }
}

/// In-memory representation of a method
#[derive(Clone, Debug)]
pub struct Method {
    pub name: String,

    pub flags: MethodFlags,

    /// Number of generic type parameters declared on the method
    pub generic_parameters: u16,

    /// `None` for methods that leave nothing on the stack
    pub return_type: Option<TypeSig>,

    pub parameters: Vec<Parameter>,

    pub locals: Vec<TypeSig>,

    /// Instructions (abstract and external methods have none)
    pub body: Option<InstructionStream>,

    /// Present on patch routines
    pub patch_info: Option<PatchInfo>,
}

impl Method {
    /// Create a new method, without a body
    pub fn new(name: impl Into<String>, flags: MethodFlags) -> Method {
        Method {
            name: name.into(),
            flags,
            generic_parameters: 0,
            return_type: None,
            parameters: vec![],
            locals: vec![],
            body: None,
            patch_info: None,
        }
    }

    pub fn with_parameter(mut self, name: impl Into<String>, ty: TypeSig) -> Method {
        self.parameters.push(Parameter {
            name: name.into(),
            ty,
        });
        self
    }

    pub fn with_local(mut self, ty: TypeSig) -> Method {
        self.locals.push(ty);
        self
    }

    pub fn with_return_type(mut self, ty: TypeSig) -> Method {
        self.return_type = Some(ty);
        self
    }

    pub fn with_body(mut self, instructions: Vec<Instruction>) -> Method {
        self.body = Some(instructions.into_iter().collect());
        self
    }

    pub fn with_patch_info(mut self, patch_info: PatchInfo) -> Method {
        self.patch_info = Some(patch_info);
        self
    }

    pub fn is_static(&self) -> bool {
        self.flags.contains(MethodFlags::STATIC)
    }

    pub fn is_public(&self) -> bool {
        self.flags.contains(MethodFlags::PUBLIC)
    }

    pub fn is_family(&self) -> bool {
        self.flags.contains(MethodFlags::FAMILY)
    }

    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }

    pub fn has_generic_parameters(&self) -> bool {
        self.generic_parameters > 0
    }

    /// Number of instructions in the body (zero without a body)
    pub fn instruction_count(&self) -> usize {
        self.body.as_ref().map_or(0, InstructionStream::len)
    }

    /// Number of argument slots, including the instance for non-static methods
    pub fn argument_slots(&self) -> usize {
        self.parameters.len() + if self.is_static() { 0 } else { 1 }
    }
}
