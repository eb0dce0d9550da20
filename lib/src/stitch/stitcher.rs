use super::{resolve, splice, synthesize, Error, NameNormalizer, NotFound, Settings};
use crate::image;
use crate::model::{MethodId, Module};
use crate::patch::{folder_resolver, DependencyResolver, PatchRoutine, PluginLoader};
use std::env;
use std::path::{Path, PathBuf};

/// Applies patch routines to the methods of a module, one after another
///
/// Patches are applied in the order they are given. When several patches target the same
/// method, the later ones see the instructions inserted by the earlier ones (so at the same
/// offset, the last patch applied runs first).
pub struct Stitcher<'m> {
    module: &'m mut Module,
    settings: &'m Settings,
}

/// Outcome of [`Stitcher::stitch_all`]
#[derive(Debug, Default)]
pub struct StitchReport {
    /// Full names of the patched methods, one per applied patch
    pub applied: Vec<String>,

    /// Patch routines that were skipped
    pub skipped: Vec<String>,
}

impl<'m> Stitcher<'m> {
    pub fn new(module: &'m mut Module, settings: &'m Settings) -> Stitcher<'m> {
        Stitcher { module, settings }
    }

    /// Apply every patch routine
    ///
    /// Routines whose target cannot be found (or whose name does not map to a target) are
    /// logged and skipped. Any other error stops stitching altogether.
    pub fn stitch_all(&mut self, routines: &[PatchRoutine]) -> Result<StitchReport, Error> {
        let mut report = StitchReport::default();
        for routine in routines {
            match self.stitch(routine) {
                Ok(id) => report.applied.push(self.module.method_full_name(&id)),
                Err(err) if err.is_recoverable() => {
                    log::warn!(
                        "Skipping '{}.{}': {:?}",
                        routine.owner_name,
                        routine.name(),
                        err
                    );
                    if let Error::NotFound(NotFound::Method { candidates, .. }) = &err {
                        log::info!("Methods found: {}", candidates.join(", "));
                    }
                    report
                        .skipped
                        .push(format!("{}.{}", routine.owner_name, routine.name()));
                }
                Err(err) => return Err(err),
            }
        }
        Ok(report)
    }

    /// Apply one patch routine to the method its name designates
    pub fn stitch(&mut self, routine: &PatchRoutine) -> Result<MethodId, Error> {
        let (type_name, method_name) =
            NameNormalizer::new(self.settings).normalize(&routine.owner_name, routine.name())?;
        self.add_patch_to_type(&type_name, &method_name, routine)
    }

    /// Apply a patch routine to a method, looked up by type and method name
    pub fn add_patch_to_type(
        &mut self,
        type_name: &str,
        method_name: &str,
        routine: &PatchRoutine,
    ) -> Result<MethodId, Error> {
        let id = resolve(
            self.module,
            type_name,
            method_name,
            routine.descriptor.target_arg_count,
        )?;
        self.add_patch(&id, routine)?;
        Ok(id)
    }

    /// Apply a patch routine to a method
    pub fn add_patch(&mut self, id: &MethodId, routine: &PatchRoutine) -> Result<(), Error> {
        let target_name = self.module.method_full_name(id);
        let missing = || NotFound::Method {
            type_name: self.module.type_full_name(&id.ty),
            method_name: target_name.clone(),
            candidates: vec![],
        };
        let target = self.module.method(id).ok_or_else(missing)?;

        let plan = synthesize(target, &target_name, routine)?;
        log::info!(
            "Adding call to '{}' in '{}' at {} ({} instructions)",
            routine.method,
            target_name,
            plan.offset,
            plan.len()
        );

        self.module.import_method(&routine.method);
        for guard in &routine.guards {
            self.module.import_method(guard);
        }

        if let Some(target) = self.module.method_mut(id) {
            splice(target, plan)?;
        }
        Ok(())
    }
}

/// Patch `target` with the routines found in `patch`, then write the result next to `target`
///
/// Modules the patch module refers to are looked up in the references folder next to the
/// executable. Returns the path of the written module.
pub fn run(target: &Path, patch: &Path, settings: &Settings) -> Result<PathBuf, Error> {
    let resolver = folder_resolver(
        references_folder(settings),
        settings.library_extension.clone(),
    );
    run_with_resolver(target, patch, settings, resolver)
}

/// Like [`run`], but with an explicit dependency resolver for the patch module
pub fn run_with_resolver(
    target: &Path,
    patch: &Path,
    settings: &Settings,
    resolver: DependencyResolver,
) -> Result<PathBuf, Error> {
    log::info!("Reading target module {:?}", target);
    let mut module = image::read_module(target)?;

    log::info!("Reading patch module {:?}", patch);
    let patches = PluginLoader::new(settings.clone(), resolver).load(patch)?;

    let report = Stitcher::new(&mut module, settings).stitch_all(&patches.routines)?;
    log::info!(
        "Applied {} patches ({} skipped)",
        report.applied.len(),
        report.skipped.len()
    );

    module.version = settings.output_version;
    let output = output_path(target, settings);
    log::info!("Writing '{}' {} to {:?}", module.name, module.version, output);
    image::write_module(&module, &output)?;
    Ok(output)
}

/// `Game.dll` is written out as `Game.out.dll`
pub fn output_path(target: &Path, settings: &Settings) -> PathBuf {
    let extension = target
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or(&settings.library_extension);
    target.with_extension(format!("{}.{}", settings.output_marker, extension))
}

/// Folder next to the running executable (or the working directory, failing that)
fn references_folder(settings: &Settings) -> PathBuf {
    let base = env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_default();
    base.join(&settings.references_folder)
}
