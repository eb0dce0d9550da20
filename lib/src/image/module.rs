use super::{Deserialize, Error, Serialize};
use crate::model::{
    Instruction, InstructionStream, Label, LabelGenerator, Method, MethodFlags, MethodRef, Module,
    Opcode, Operand, OperandKind, Parameter, PatchInfo, Type, TypeFlags, TypeKind, TypeSig,
    Version,
};
use byteorder::{ReadBytesExt, WriteBytesExt};
use std::collections::HashMap;
use std::convert::TryFrom;

/// Magic header bytes that go at the front of a module image
pub const MAGIC: [u8; 4] = *b"STIL";

/// Layout revision of module images
pub const FORMAT_VERSION: u16 = 1;

/// Branch index written for targets which are not in the method
const UNRESOLVED_TARGET: u32 = u32::MAX;

impl Serialize for Module {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<(), Error> {
        writer.write_all(&MAGIC)?;
        FORMAT_VERSION.serialize(writer)?;
        self.name.serialize(writer)?;
        self.version.serialize(writer)?;
        self.references.serialize(writer)?;
        self.types.serialize(writer)?;
        Ok(())
    }
}

impl Deserialize for Module {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        let mut magic = [0; 4];
        reader.read_exact(&mut magic)?;
        if magic != MAGIC {
            return Err(Error::BadMagic(magic));
        }
        let format_version = u16::deserialize(reader)?;
        if format_version != FORMAT_VERSION {
            return Err(Error::UnsupportedFormatVersion(format_version));
        }
        Ok(Module {
            name: String::deserialize(reader)?,
            version: Version::deserialize(reader)?,
            references: Vec::deserialize(reader)?,
            types: Vec::deserialize(reader)?,
        })
    }
}

impl Serialize for Version {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<(), Error> {
        self.major.serialize(writer)?;
        self.minor.serialize(writer)?;
        self.build.serialize(writer)?;
        self.revision.serialize(writer)
    }
}

impl Deserialize for Version {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        Ok(Version {
            major: u16::deserialize(reader)?,
            minor: u16::deserialize(reader)?,
            build: u16::deserialize(reader)?,
            revision: u16::deserialize(reader)?,
        })
    }
}

impl Serialize for Type {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<(), Error> {
        self.namespace.serialize(writer)?;
        self.name.serialize(writer)?;
        self.flags.bits().serialize(writer)?;
        self.methods.serialize(writer)?;
        self.nested_types.serialize(writer)
    }
}

impl Deserialize for Type {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        Ok(Type {
            namespace: String::deserialize(reader)?,
            name: String::deserialize(reader)?,
            flags: TypeFlags::from_bits_truncate(u16::deserialize(reader)?),
            methods: Vec::deserialize(reader)?,
            nested_types: Vec::deserialize(reader)?,
        })
    }
}

impl Serialize for TypeSig {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<(), Error> {
        let tag: u8 = match self.kind {
            TypeKind::Value => 0,
            TypeKind::Reference => 1,
        };
        tag.serialize(writer)?;
        self.by_ref.serialize(writer)?;
        self.name.serialize(writer)
    }
}

impl Deserialize for TypeSig {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        let kind = match u8::deserialize(reader)? {
            0 => TypeKind::Value,
            1 => TypeKind::Reference,
            tag => return Err(Error::UnknownTag { what: "type kind", tag }),
        };
        Ok(TypeSig {
            kind,
            by_ref: bool::deserialize(reader)?,
            name: String::deserialize(reader)?,
        })
    }
}

impl Serialize for MethodRef {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<(), Error> {
        self.scope.serialize(writer)?;
        self.declaring_type.serialize(writer)?;
        self.name.serialize(writer)?;
        self.parameter_count.serialize(writer)?;
        self.has_return.serialize(writer)
    }
}

impl Deserialize for MethodRef {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        Ok(MethodRef {
            scope: String::deserialize(reader)?,
            declaring_type: String::deserialize(reader)?,
            name: String::deserialize(reader)?,
            parameter_count: u16::deserialize(reader)?,
            has_return: bool::deserialize(reader)?,
        })
    }
}

impl Serialize for Parameter {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<(), Error> {
        self.name.serialize(writer)?;
        self.ty.serialize(writer)
    }
}

impl Deserialize for Parameter {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        Ok(Parameter {
            name: String::deserialize(reader)?,
            ty: TypeSig::deserialize(reader)?,
        })
    }
}

impl Serialize for PatchInfo {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<(), Error> {
        self.offset.serialize(writer)?;
        self.return_to.serialize(writer)?;
        self.return_after_call.serialize(writer)?;
        self.return_if_null.serialize(writer)?;
        self.store_result.serialize(writer)?;
        self.load_local.serialize(writer)?;
        self.pass_all_args.serialize(writer)?;
        self.pass_instance.serialize(writer)?;
        self.pass_arg_by_index.serialize(writer)?;
        self.insert_dup.serialize(writer)?;
        self.decides_return.serialize(writer)?;
        self.target_arg_count.serialize(writer)
    }
}

impl Deserialize for PatchInfo {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        Ok(PatchInfo {
            offset: i32::deserialize(reader)?,
            return_to: i32::deserialize(reader)?,
            return_after_call: bool::deserialize(reader)?,
            return_if_null: bool::deserialize(reader)?,
            store_result: i32::deserialize(reader)?,
            load_local: i32::deserialize(reader)?,
            pass_all_args: bool::deserialize(reader)?,
            pass_instance: bool::deserialize(reader)?,
            pass_arg_by_index: i32::deserialize(reader)?,
            insert_dup: bool::deserialize(reader)?,
            decides_return: bool::deserialize(reader)?,
            target_arg_count: i32::deserialize(reader)?,
        })
    }
}

impl Serialize for Method {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<(), Error> {
        self.name.serialize(writer)?;
        self.flags.bits().serialize(writer)?;
        self.generic_parameters.serialize(writer)?;
        self.return_type.serialize(writer)?;
        self.parameters.serialize(writer)?;
        self.locals.serialize(writer)?;
        match &self.body {
            None => 0u8.serialize(writer)?,
            Some(body) => {
                1u8.serialize(writer)?;
                serialize_body(&self.name, body, writer)?;
            }
        }
        self.patch_info.serialize(writer)
    }
}

impl Deserialize for Method {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        let name = String::deserialize(reader)?;
        let flags = MethodFlags::from_bits_truncate(u16::deserialize(reader)?);
        let generic_parameters = u16::deserialize(reader)?;
        let return_type = Option::deserialize(reader)?;
        let parameters = Vec::deserialize(reader)?;
        let locals = Vec::deserialize(reader)?;
        let body = match u8::deserialize(reader)? {
            0 => None,
            1 => Some(deserialize_body(&name, reader)?),
            tag => return Err(Error::UnknownTag { what: "method body", tag }),
        };
        let patch_info = Option::deserialize(reader)?;
        Ok(Method {
            name,
            flags,
            generic_parameters,
            return_type,
            parameters,
            locals,
            body,
            patch_info,
        })
    }
}

/// Instruction count in `u32`, then the instructions with branch targets as indices
fn serialize_body<W: WriteBytesExt>(
    method_name: &str,
    body: &InstructionStream,
    writer: &mut W,
) -> Result<(), Error> {
    let count = u32::try_from(body.len()).map_err(|_| Error::LengthOverflow {
        what: "method body",
        len: body.len(),
    })?;
    count.serialize(writer)?;

    let indices: HashMap<Label, u32> = body
        .iter()
        .enumerate()
        .map(|(index, (label, _))| (label, index as u32))
        .collect();

    for insn in body.instructions() {
        insn.opcode.code().serialize(writer)?;
        match &insn.operand {
            Operand::None => (),
            Operand::Int(value) => value.serialize(writer)?,
            Operand::Local(local) => local.serialize(writer)?,
            Operand::Arg(slot) => slot.serialize(writer)?,
            Operand::Branch(label) => match indices.get(label) {
                Some(index) => index.serialize(writer)?,
                None => {
                    log::warn!(
                        "Branch '{}' in '{}' has no target instruction - the written module will not load",
                        insn,
                        method_name
                    );
                    UNRESOLVED_TARGET.serialize(writer)?;
                }
            },
            Operand::Type(ty) => ty.serialize(writer)?,
            Operand::Method(method) => method.serialize(writer)?,
        }
    }
    Ok(())
}

fn deserialize_body<R: ReadBytesExt>(
    method_name: &str,
    reader: &mut R,
) -> Result<InstructionStream, Error> {
    let count = u32::deserialize(reader)? as usize;

    // Branch targets stay raw indices until every instruction has been read, so that nothing is
    // sized from the untrusted count
    let mut raw = vec![];
    for _ in 0..count {
        let code = u8::deserialize(reader)?;
        let opcode = Opcode::from_code(code).ok_or(Error::UnknownOpcode(code))?;
        let operand = match opcode.operand_kind() {
            OperandKind::None => Ok(Operand::None),
            OperandKind::Int => Ok(Operand::Int(i32::deserialize(reader)?)),
            OperandKind::Local => Ok(Operand::Local(u16::deserialize(reader)?)),
            OperandKind::Arg => Ok(Operand::Arg(u16::deserialize(reader)?)),
            OperandKind::Branch => Err(u32::deserialize(reader)?),
            OperandKind::Type => Ok(Operand::Type(TypeSig::deserialize(reader)?)),
            OperandKind::Method => Ok(Operand::Method(MethodRef::deserialize(reader)?)),
        };
        raw.push((opcode, operand));
    }

    // Streams hand out labels in order, so these are the labels the instructions will get
    let mut label_generator = LabelGenerator::new(Label::START);
    let labels: Vec<Label> = raw.iter().map(|_| label_generator.fresh_label()).collect();

    let mut stream = InstructionStream::new();
    for (opcode, operand) in raw {
        let operand = match operand {
            Ok(operand) => operand,
            Err(target) => match labels.get(target as usize) {
                Some(label) => Operand::Branch(*label),
                None => {
                    return Err(Error::BadBranchTarget {
                        method: method_name.to_owned(),
                        target,
                        instructions: count,
                    })
                }
            },
        };
        stream.push(Instruction::new(opcode, operand));
    }
    Ok(stream)
}

#[cfg(test)]
mod test {
    use super::*;

    fn patched_module() -> Module {
        let mut module = Module::new("Game").with_type(
            Type::new("Game", "Player").with_method(
                Method::new("Damage", MethodFlags::PUBLIC)
                    .with_parameter("amount", TypeSig::int32())
                    .with_parameter("source", TypeSig::object().by_ref())
                    .with_local(TypeSig::boolean())
                    .with_body(vec![
                        Instruction::ldarg(1),
                        Instruction::simple(Opcode::Ret),
                    ]),
            ),
        );
        let body = module.types[0].methods[0].body.as_mut().unwrap();
        let ret = body.label_at(1).unwrap();
        body.insert(0, Instruction::branch(Opcode::BrTrue, ret));
        body.insert(0, Instruction::ldloc(0));
        module
    }

    #[test]
    fn branches_are_written_as_current_indices() {
        let module = patched_module();
        let mut bytes = vec![];
        module.serialize(&mut bytes).unwrap();

        let read = Module::deserialize(&mut &bytes[..]).unwrap();
        let body = read.types[0].methods[0].body.as_ref().unwrap();
        let listing: Vec<String> = body.instructions().map(|insn| insn.to_string()).collect();
        assert_eq!(
            listing,
            vec!["ldloc V_0", "brtrue l3", "ldarg 1", "ret"],
        );
        let target = body.get(1).unwrap().branch_target().unwrap();
        assert_eq!(body.index_of(target), Some(3));
        assert!(read.types[0].methods[0].parameters[1].ty.by_ref);
    }

    #[test]
    fn dangling_branches_fail_to_load() {
        let mut module = patched_module();
        let body = module.types[0].methods[0].body.as_mut().unwrap();
        body.push(Instruction::branch(Opcode::Br, Label::UNRESOLVED));

        let mut bytes = vec![];
        module.serialize(&mut bytes).unwrap();
        match Module::deserialize(&mut &bytes[..]) {
            Err(Error::BadBranchTarget {
                method,
                target,
                instructions,
            }) => {
                assert_eq!(method, "Damage");
                assert_eq!(target, UNRESOLVED_TARGET);
                assert_eq!(instructions, 5);
            }
            other => panic!("unexpected {:?}", other.map(|m| m.name)),
        }
    }

    #[test]
    fn rejects_foreign_files() {
        let bytes = b"MZ\x90\x00rest".to_vec();
        assert!(matches!(
            Module::deserialize(&mut &bytes[..]),
            Err(Error::BadMagic(_))
        ));
    }

    #[test]
    fn oversized_instruction_count_is_an_io_error() {
        let module = Module::new("G").with_type(
            Type::new("", "T").with_method(Method::new("M", MethodFlags::STATIC).with_body(vec![])),
        );
        let mut bytes = vec![];
        module.serialize(&mut bytes).unwrap();

        // Trailing bytes: body count, absent patch info tag, no nested types
        let count_at = bytes.len() - 7;
        assert_eq!(bytes[count_at..count_at + 4], [0, 0, 0, 0]);
        bytes[count_at..count_at + 4].copy_from_slice(&u32::MAX.to_be_bytes());

        assert!(matches!(
            Module::deserialize(&mut &bytes[..]),
            Err(Error::IoError(_))
        ));
    }
}
