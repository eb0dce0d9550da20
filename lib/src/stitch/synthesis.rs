use super::{Error, Unsupported};
use crate::model::{Instruction, InstructionStream, Label, Method, Opcode, TypeSig};
use crate::patch::{ArgPassing, ArgSelection, PatchRoutine, PostCallAction};
use std::convert::TryFrom;

/// Instructions to insert into a target method, in execution order
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StitchPlan {
    /// Index of the instruction the plan goes in front of
    pub offset: usize,

    pub instructions: Vec<Instruction>,
}

impl StitchPlan {
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

/// Build the instructions calling a patch routine from its target method
///
/// In order, the plan:
///
///   1. checks each guard, skipping the rest of the plan if one returns `false`
///   2. duplicates the top of the stack
///   3. pushes the arguments of the patch (selected slots, or everything boxed in an array)
///   4. loads a local
///   5. calls the patch
///   6. stores the result in a local (and loads it back)
///   7. returns or branches, according to the post-call action
///
/// Only the steps the descriptor asks for are emitted. Branch targets are labels of existing
/// instructions of the target, so they stay valid however the plan is inserted.
///
/// An offset past the end of the body is only warned about. Branches to it (or to any other
/// index past the end) are emitted with [`Label::UNRESOLVED`].
pub fn synthesize(
    target: &Method,
    target_name: &str,
    routine: &PatchRoutine,
) -> Result<StitchPlan, Error> {
    if target.has_generic_parameters() {
        return Err(Error::UnsupportedTarget {
            method: target_name.to_owned(),
            reason: Unsupported::GenericParameters,
        });
    }
    let body = target.body.as_ref().ok_or_else(|| Error::UnsupportedTarget {
        method: target_name.to_owned(),
        reason: Unsupported::NoBody,
    })?;

    let offset = routine.descriptor.offset;
    if offset > body.len() {
        log::warn!(
            "Offset {} of '{}' is past the end of '{}' ({} instructions) - expect a broken method",
            offset,
            routine.name(),
            target_name,
            body.len()
        );
    }

    let mut builder = PlanBuilder {
        target,
        target_name,
        body,
        routine,
        instructions: vec![],
    };
    builder.guards();
    if routine.descriptor.insert_duplicate_top {
        builder.push(Instruction::simple(Opcode::Dup));
    }
    builder.arguments()?;
    if let Some(local) = routine.descriptor.load_local_before_call {
        let local = builder.local(local)?;
        builder.push(Instruction::ldloc(local));
    }
    builder.push(Instruction::call(routine.method.clone()));
    if let Some(local) = routine.descriptor.store_result_in_local {
        let local = builder.local(local)?;
        builder.push(Instruction::stloc(local));
        builder.push(Instruction::ldloc(local));
    }
    builder.post_call();

    Ok(StitchPlan {
        offset,
        instructions: builder.instructions,
    })
}

struct PlanBuilder<'a> {
    target: &'a Method,
    target_name: &'a str,
    body: &'a InstructionStream,
    routine: &'a PatchRoutine,
    instructions: Vec<Instruction>,
}

impl<'a> PlanBuilder<'a> {
    fn push(&mut self, insn: Instruction) {
        self.instructions.push(insn);
    }

    /// Label of the instruction currently at `index` in the target
    fn label_at(&self, index: usize) -> Label {
        match self.body.label_at(index) {
            Some(label) => label,
            None => {
                log::warn!(
                    "'{}' branches to index {} of '{}', which does not exist",
                    self.routine.name(),
                    index,
                    self.target_name
                );
                Label::UNRESOLVED
            }
        }
    }

    fn local(&self, local: u16) -> Result<u16, Error> {
        if usize::from(local) < self.target.locals.len() {
            Ok(local)
        } else {
            Err(Error::InvalidLocalIndex {
                method: self.target_name.to_owned(),
                patch: self.routine.name().to_owned(),
                local,
                locals: self.target.locals.len(),
            })
        }
    }

    /// Each guard gets the first zero, one or two argument slots of the target
    fn guards(&mut self) {
        let routine = self.routine;
        if routine.guards.is_empty() {
            return;
        }
        let skip_patch = self.label_at(routine.descriptor.offset);
        for guard in &routine.guards {
            match guard.parameter_count {
                0 => (),
                1 => self.push(Instruction::ldarg(0)),
                2 => {
                    self.push(Instruction::ldarg(0));
                    self.push(Instruction::ldarg(1));
                }
                n => log::warn!(
                    "Guard '{}' takes {} parameters, but guards are only passed up to 2",
                    guard.name,
                    n
                ),
            }
            self.push(Instruction::call(guard.clone()));
            self.push(Instruction::branch(Opcode::BrFalse, skip_patch));
        }
    }

    fn arguments(&mut self) -> Result<(), Error> {
        match self.routine.descriptor.arguments {
            ArgPassing::Nothing => Ok(()),
            ArgPassing::Selected {
                instance,
                selection,
            } => {
                if instance {
                    self.push(Instruction::ldarg(0));
                }
                self.selected_arguments(selection)
            }
            ArgPassing::All => self.boxed_arguments(),
        }
    }

    fn selected_arguments(&mut self, selection: ArgSelection) -> Result<(), Error> {
        match selection {
            ArgSelection::None => (),
            ArgSelection::Mask(mask) => {
                for slot in mask.slots() {
                    self.push(Instruction::ldarg(slot));
                }
            }
            ArgSelection::Direct(index @ 0..=3) => {
                // Range checked by the pattern
                self.push(Instruction::ldarg(index as u16));
            }
            ArgSelection::Direct(index) => {
                return Err(Error::InvalidArgumentIndex {
                    patch: self.routine.name().to_owned(),
                    index,
                })
            }
        }
        Ok(())
    }

    /// Push an `object[]` holding the instance (if any), then every parameter
    ///
    /// Fails if a parameter sits in an argument slot that `ldarg` cannot address.
    fn boxed_arguments(&mut self) -> Result<(), Error> {
        let target = self.target;
        let instance = usize::from(!target.is_static());
        let length = i32::try_from(target.argument_slots()).unwrap_or(i32::MAX);

        let mut insns = vec![
            Instruction::ldc_i4(length),
            Instruction::with_type(Opcode::NewArr, TypeSig::object()),
        ];
        if instance == 1 {
            insns.push(Instruction::simple(Opcode::Dup));
            insns.push(Instruction::ldc_i4(0));
            insns.push(Instruction::ldarg(0));
            insns.push(Instruction::simple(Opcode::StElemRef));
        }
        for (index, parameter) in target.parameters.iter().enumerate() {
            let slot = index + instance;
            let arg = u16::try_from(slot).map_err(|_| Error::InvalidArgumentIndex {
                patch: self.routine.name().to_owned(),
                index: i32::try_from(slot).unwrap_or(i32::MAX),
            })?;
            insns.push(Instruction::simple(Opcode::Dup));
            insns.push(Instruction::ldc_i4(i32::from(arg)));
            insns.push(Instruction::ldarg(arg));
            if parameter.ty.by_ref {
                let element = parameter.ty.element_type();
                insns.push(Instruction::with_type(Opcode::LdObj, element.clone()));
                insns.push(Instruction::with_type(Opcode::Box, element));
            } else if parameter.ty.is_value_type() {
                insns.push(Instruction::with_type(Opcode::Box, parameter.ty.clone()));
            }
            insns.push(Instruction::simple(Opcode::StElemRef));
        }
        self.instructions.extend(insns);
        Ok(())
    }

    fn post_call(&mut self) {
        let offset = self.routine.descriptor.offset;
        match self.routine.descriptor.post_call {
            PostCallAction::FallThrough => (),
            PostCallAction::Return => self.push(Instruction::simple(Opcode::Ret)),
            PostCallAction::ReturnIfNull { return_result } => {
                let continue_at = self.label_at(offset);
                self.push(Instruction::simple(Opcode::Dup));
                self.push(Instruction::simple(Opcode::LdNull));
                self.push(Instruction::simple(Opcode::Ceq));
                self.push(Instruction::branch(Opcode::BrFalse, continue_at));
                if !return_result {
                    self.push(Instruction::simple(Opcode::Pop));
                }
                self.push(Instruction::simple(Opcode::Ret));
            }
            PostCallAction::BranchIfFalseThenReturn(index) => {
                let continue_at = self.label_at(index);
                self.push(Instruction::branch(Opcode::BrFalse, continue_at));
                self.push(Instruction::simple(Opcode::Ret));
            }
            PostCallAction::BranchTo(index) => {
                let continue_at = self.label_at(index);
                self.push(Instruction::branch(Opcode::Br, continue_at));
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::{MethodFlags, MethodRef, Parameter, PatchInfo};
    use crate::patch::PatchDescriptor;

    fn patch_ref(parameter_count: u16) -> MethodRef {
        MethodRef {
            scope: String::from("Patches"),
            declaring_type: String::from("Patches.PlayerPatch"),
            name: String::from("Update"),
            parameter_count,
            has_return: false,
        }
    }

    fn routine(info: PatchInfo) -> PatchRoutine {
        let descriptor = PatchDescriptor::try_from(&info).unwrap();
        PatchRoutine::new("PlayerPatch", patch_ref(0), descriptor)
    }

    /// `Player.Update(int, ref float, string)` with one local
    fn instance_target() -> Method {
        Method::new("Update", MethodFlags::PUBLIC)
            .with_parameter("frame", TypeSig::int32())
            .with_parameter("delta", TypeSig::value("System.Single").by_ref())
            .with_parameter("name", TypeSig::reference("System.String"))
            .with_local(TypeSig::int32())
            .with_body(vec![
                Instruction::ldarg(1),
                Instruction::stloc(0),
                Instruction::ldloc(0),
                Instruction::simple(Opcode::Ret),
            ])
    }

    fn listing(plan: &StitchPlan) -> Vec<String> {
        plan.instructions.iter().map(|i| i.to_string()).collect()
    }

    const CALL: &str = "call [Patches]Patches.PlayerPatch::Update/0";

    #[test]
    fn bare_descriptor_is_just_the_call() {
        let plan = synthesize(&instance_target(), "Player::Update", &routine(PatchInfo::default()))
            .unwrap();
        assert_eq!(plan.offset, 0);
        assert_eq!(listing(&plan), vec![CALL]);
    }

    #[test]
    fn masked_slots_load_in_ascending_order() {
        let plan = synthesize(
            &instance_target(),
            "Player::Update",
            &routine(PatchInfo {
                pass_arg_by_index: 256 | 2 | 1,
                ..PatchInfo::default()
            }),
        )
        .unwrap();
        assert_eq!(listing(&plan), vec!["ldarg 0", "ldarg 1", CALL]);
    }

    #[test]
    fn instance_then_direct_slot() {
        let plan = synthesize(
            &instance_target(),
            "Player::Update",
            &routine(PatchInfo {
                pass_instance: true,
                pass_arg_by_index: 3,
                ..PatchInfo::default()
            }),
        )
        .unwrap();
        assert_eq!(listing(&plan), vec!["ldarg 0", "ldarg 3", CALL]);
    }

    #[test]
    fn direct_slots_past_three_are_rejected() {
        for index in [4, 255, -3] {
            let result = synthesize(
                &instance_target(),
                "Player::Update",
                &routine(PatchInfo {
                    pass_arg_by_index: index,
                    ..PatchInfo::default()
                }),
            );
            match result {
                Err(Error::InvalidArgumentIndex { patch, index: i }) => {
                    assert_eq!(patch, "Update");
                    assert_eq!(i, index);
                }
                other => panic!("unexpected {:?}", other),
            }
        }
    }

    #[test]
    fn all_arguments_are_boxed_into_an_array() {
        let plan = synthesize(
            &instance_target(),
            "Player::Update",
            &routine(PatchInfo {
                pass_all_args: true,
                ..PatchInfo::default()
            }),
        )
        .unwrap();
        assert_eq!(
            listing(&plan),
            vec![
                "ldc.i4 4",
                "newarr class System.Object",
                "dup",
                "ldc.i4 0",
                "ldarg 0",
                "stelem.ref",
                "dup",
                "ldc.i4 1",
                "ldarg 1",
                "box valuetype System.Int32",
                "stelem.ref",
                "dup",
                "ldc.i4 2",
                "ldarg 2",
                "ldobj valuetype System.Single",
                "box valuetype System.Single",
                "stelem.ref",
                "dup",
                "ldc.i4 3",
                "ldarg 3",
                "stelem.ref",
                CALL,
            ]
        );
    }

    #[test]
    fn boxing_reaches_the_last_argument_slot() {
        let all = || {
            routine(PatchInfo {
                pass_all_args: true,
                ..PatchInfo::default()
            })
        };
        let parameter = |i: usize| Parameter {
            name: format!("p{}", i),
            ty: TypeSig::object(),
        };

        // With the instance in slot 0, the last parameter lands in slot 65535
        let mut target = instance_target();
        target.parameters = (0..usize::from(u16::MAX)).map(parameter).collect();
        let plan = synthesize(&target, "Player::Update", &all()).unwrap();
        let tail: Vec<String> = plan.instructions[plan.len() - 4..]
            .iter()
            .map(|i| i.to_string())
            .collect();
        assert_eq!(tail, vec!["ldc.i4 65535", "ldarg 65535", "stelem.ref", CALL]);

        // One more has no slot
        target.parameters.push(parameter(usize::from(u16::MAX)));
        assert!(matches!(
            synthesize(&target, "Player::Update", &all()),
            Err(Error::InvalidArgumentIndex { index: 65536, .. })
        ));
    }

    #[test]
    fn guards_skip_to_the_offset() {
        let guard = |name: &str, parameter_count| MethodRef {
            name: name.to_owned(),
            parameter_count,
            has_return: true,
            ..patch_ref(0)
        };
        let routine = routine(PatchInfo {
            offset: 2,
            ..PatchInfo::default()
        })
        .with_guard(guard("UpdateShouldExecute", 2))
        .with_guard(guard("UpdateShouldExecute2", 0));

        let plan = synthesize(&instance_target(), "Player::Update", &routine).unwrap();
        assert_eq!(
            listing(&plan),
            vec![
                "ldarg 0",
                "ldarg 1",
                "call [Patches]Patches.PlayerPatch::UpdateShouldExecute/2",
                "brfalse l2",
                "call [Patches]Patches.PlayerPatch::UpdateShouldExecute2/0",
                "brfalse l2",
                CALL,
            ]
        );
    }

    #[test]
    fn locals_around_the_call() {
        let plan = synthesize(
            &instance_target(),
            "Player::Update",
            &routine(PatchInfo {
                insert_dup: true,
                load_local: 0,
                store_result: 0,
                ..PatchInfo::default()
            }),
        )
        .unwrap();
        assert_eq!(
            listing(&plan),
            vec!["dup", "ldloc V_0", CALL, "stloc V_0", "ldloc V_0"]
        );

        let result = synthesize(
            &instance_target(),
            "Player::Update",
            &routine(PatchInfo {
                store_result: 1,
                ..PatchInfo::default()
            }),
        );
        assert!(matches!(
            result,
            Err(Error::InvalidLocalIndex {
                local: 1,
                locals: 1,
                ..
            })
        ));
    }

    #[test]
    fn post_call_control_flow() {
        let plan_for = |info: PatchInfo| {
            listing(&synthesize(&instance_target(), "Player::Update", &routine(info)).unwrap())
        };

        assert_eq!(
            plan_for(PatchInfo {
                offset: 1,
                return_if_null: true,
                ..PatchInfo::default()
            }),
            vec![CALL, "dup", "ldnull", "ceq", "brfalse l1", "pop", "ret"]
        );
        assert_eq!(
            plan_for(PatchInfo {
                offset: 1,
                return_if_null: true,
                return_after_call: true,
                ..PatchInfo::default()
            }),
            vec![CALL, "dup", "ldnull", "ceq", "brfalse l1", "ret"]
        );
        assert_eq!(
            plan_for(PatchInfo {
                offset: 1,
                decides_return: true,
                return_to: 3,
                ..PatchInfo::default()
            }),
            vec![CALL, "brfalse l3", "ret"]
        );
        assert_eq!(
            plan_for(PatchInfo {
                decides_return: true,
                ..PatchInfo::default()
            }),
            vec![CALL, "brfalse l0", "ret"]
        );
        assert_eq!(
            plan_for(PatchInfo {
                return_to: 2,
                ..PatchInfo::default()
            }),
            vec![CALL, "br l2"]
        );
    }

    #[test]
    fn offsets_past_the_end_still_synthesize() {
        let plan = synthesize(
            &instance_target(),
            "Player::Update",
            &routine(PatchInfo {
                offset: 9,
                decides_return: true,
                ..PatchInfo::default()
            }),
        )
        .unwrap();
        assert_eq!(plan.offset, 9);
        assert_eq!(
            plan.instructions[1].branch_target(),
            Some(Label::UNRESOLVED)
        );
    }

    #[test]
    fn unsupported_targets() {
        let mut generic = instance_target();
        generic.generic_parameters = 1;
        assert!(matches!(
            synthesize(&generic, "Player::Update", &routine(PatchInfo::default())),
            Err(Error::UnsupportedTarget {
                reason: Unsupported::GenericParameters,
                ..
            })
        ));

        let bodiless = Method::new("Update", MethodFlags::PUBLIC | MethodFlags::ABSTRACT);
        assert!(matches!(
            synthesize(&bodiless, "Player::Update", &routine(PatchInfo::default())),
            Err(Error::UnsupportedTarget {
                reason: Unsupported::NoBody,
                ..
            })
        ));
    }
}
