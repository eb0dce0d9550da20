use std::path::Path;
use stitchil::image;
use stitchil::model::*;
use stitchil::patch::folder_resolver;
use stitchil::stitch::{self, Error, Settings};

/// `Game.Player.Update(int)`: stores its argument in a local and returns
fn target_module() -> Module {
    Module::new("Game").with_type(
        Type::new("Game", "Player").with_method(
            Method::new("Update", MethodFlags::PUBLIC)
                .with_parameter("frame", TypeSig::int32())
                .with_local(TypeSig::int32())
                .with_body(vec![
                    Instruction::ldarg(1),
                    Instruction::stloc(0),
                    Instruction::ldloc(0),
                    Instruction::simple(Opcode::Ret),
                ]),
        ),
    )
}

fn patch_module(info: PatchInfo) -> Module {
    let exposed = |name: &str| Method::new(name, MethodFlags::PUBLIC | MethodFlags::STATIC);
    let mut module = Module::new("Patches").with_type(
        Type::new("Patches", "PlayerPatch")
            .with_method(
                exposed("Update")
                    .with_parameter("self", TypeSig::object())
                    .with_return_type(TypeSig::boolean())
                    .with_patch_info(info)
                    .with_body(vec![
                        Instruction::ldc_i4(1),
                        Instruction::simple(Opcode::Ret),
                    ]),
            )
            .with_method(
                exposed("UpdateShouldExecute")
                    .with_parameter("self", TypeSig::object())
                    .with_return_type(TypeSig::boolean())
                    .with_body(vec![
                        Instruction::ldc_i4(1),
                        Instruction::simple(Opcode::Ret),
                    ]),
            ),
    );
    module.references.push(String::from("UnityEngine"));
    module
}

fn listing(module: &Module) -> Vec<String> {
    module.types[0].methods[0]
        .body
        .as_ref()
        .unwrap()
        .instructions()
        .map(|i| i.to_string())
        .collect()
}

fn write_inputs(dir: &Path, info: PatchInfo) {
    image::write_module(&target_module(), dir.join("Game.dll")).unwrap();
    image::write_module(&patch_module(info), dir.join("Patches.dll")).unwrap();
}

#[test]
fn patched_module_is_written_next_to_the_target() {
    let dir = tempfile::tempdir().unwrap();
    write_inputs(
        dir.path(),
        PatchInfo {
            offset: 1,
            pass_instance: true,
            decides_return: true,
            ..PatchInfo::default()
        },
    );
    let references = dir.path().join("references");
    std::fs::create_dir(&references).unwrap();
    image::write_module(&Module::new("UnityEngine"), references.join("UnityEngine.dll")).unwrap();

    let settings = Settings::new();
    let output = stitch::run_with_resolver(
        &dir.path().join("Game.dll"),
        &dir.path().join("Patches.dll"),
        &settings,
        folder_resolver(references, "dll"),
    )
    .unwrap();
    assert_eq!(output, dir.path().join("Game.out.dll"));

    let patched = image::read_module(&output).unwrap();
    assert_eq!(patched.version.to_string(), "99.99.99.99");
    assert_eq!(patched.references, vec![String::from("Patches")]);
    assert_eq!(
        listing(&patched),
        vec![
            "ldarg 1",
            "ldarg 0",
            "call [Patches]Patches.PlayerPatch::UpdateShouldExecute/1",
            "brfalse l8",
            "ldarg 0",
            "call [Patches]Patches.PlayerPatch::Update/1",
            "brfalse l8",
            "ret",
            "stloc V_0",
            "ldloc V_0",
            "ret",
        ]
    );

    // The input is left alone
    let original = image::read_module(dir.path().join("Game.dll")).unwrap();
    assert_eq!(original.version.to_string(), "1.0.0.0");
    assert_eq!(listing(&original).len(), 4);
}

#[test]
fn missing_dependencies_do_not_stop_stitching() {
    let dir = tempfile::tempdir().unwrap();
    write_inputs(
        dir.path(),
        PatchInfo {
            return_after_call: true,
            ..PatchInfo::default()
        },
    );

    let settings = Settings::new();
    let output = stitch::run_with_resolver(
        &dir.path().join("Game.dll"),
        &dir.path().join("Patches.dll"),
        &settings,
        folder_resolver(dir.path().join("references"), "dll"),
    )
    .unwrap();

    // Original instructions follow the five inserted ones
    let patched = image::read_module(output).unwrap();
    let insns = listing(&patched);
    assert_eq!(
        insns[..6],
        [
            "ldarg 0",
            "call [Patches]Patches.PlayerPatch::UpdateShouldExecute/1",
            "brfalse l5",
            "call [Patches]Patches.PlayerPatch::Update/1",
            "ret",
            "ldarg 1",
        ]
    );
}

#[test]
fn invalid_argument_slot_aborts_without_output() {
    let dir = tempfile::tempdir().unwrap();
    write_inputs(
        dir.path(),
        PatchInfo {
            pass_arg_by_index: 7,
            ..PatchInfo::default()
        },
    );

    let settings = Settings::new();
    let result = stitch::run_with_resolver(
        &dir.path().join("Game.dll"),
        &dir.path().join("Patches.dll"),
        &settings,
        Box::new(|name: &str| {
            Err(stitchil::patch::Error::MissingDescriptor(name.to_owned()))
        }),
    );

    assert!(matches!(
        result,
        Err(Error::InvalidArgumentIndex { index: 7, .. })
    ));
    assert!(!dir.path().join("Game.out.dll").exists());
}

#[test]
fn bodiless_target_aborts_without_output() {
    let dir = tempfile::tempdir().unwrap();
    let mut target = target_module();
    target.types[0].methods[0].body = None;
    image::write_module(&target, dir.path().join("Game.dll")).unwrap();
    image::write_module(
        &patch_module(PatchInfo::default()),
        dir.path().join("Patches.dll"),
    )
    .unwrap();

    let settings = Settings::new();
    let result = stitch::run_with_resolver(
        &dir.path().join("Game.dll"),
        &dir.path().join("Patches.dll"),
        &settings,
        folder_resolver(dir.path().join("references"), "dll"),
    );

    assert!(matches!(
        result,
        Err(Error::UnsupportedTarget {
            reason: stitch::Unsupported::NoBody,
            ..
        })
    ));
    assert!(!dir.path().join("Game.out.dll").exists());
}
