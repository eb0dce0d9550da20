use super::{ArgPassing, Error, PatchDescriptor, PatchRoutine};
use crate::image;
use crate::model::{Method, MethodRef, Module, Type};
use crate::stitch::Settings;
use std::convert::TryFrom;
use std::fs;
use std::path::{Path, PathBuf};

/// Loads a module that a patch module refers to, given its name
pub type DependencyResolver = Box<dyn Fn(&str) -> Result<Module, Error>>;

/// Resolver reading `<folder>/<name>.<extension>` module images
///
/// The folder is created if it does not exist yet.
pub fn folder_resolver(
    folder: impl Into<PathBuf>,
    extension: impl Into<String>,
) -> DependencyResolver {
    let folder = folder.into();
    let extension = extension.into();
    if !folder.is_dir() {
        if let Err(err) = fs::create_dir_all(&folder) {
            log::warn!("Could not create references folder {:?}: {}", folder, err);
        }
    }
    Box::new(move |name: &str| {
        let path = folder.join(format!("{}.{}", name, extension));
        let module = image::read_module(&path)?;
        log::info!("Loaded referenced module {:?}", path);
        Ok(module)
    })
}

/// Everything loaded from a patch module
pub struct PatchSet {
    pub module: Module,

    /// Modules the patch module refers to which could be loaded
    pub dependencies: Vec<Module>,

    /// Patch routines, in discovery order
    pub routines: Vec<PatchRoutine>,
}

/// Discovers patch routines (and their descriptors and guards) in patch modules
pub struct PluginLoader {
    settings: Settings,
    resolver: DependencyResolver,
}

impl PluginLoader {
    pub fn new(settings: Settings, resolver: DependencyResolver) -> PluginLoader {
        PluginLoader { settings, resolver }
    }

    /// Read a patch module image and discover its routines
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<PatchSet, Error> {
        let module = image::read_module(path.as_ref())?;
        log::info!(
            "Read patch module '{}' ({} top-level types)",
            module.name,
            module.types.len()
        );
        let dependencies = self.resolve_dependencies(&module);
        let routines = self.discover(&module);
        Ok(PatchSet {
            module,
            dependencies,
            routines,
        })
    }

    /// Load the modules referenced by the patch module
    ///
    /// Failures are logged and otherwise ignored: a missing dependency only matters if a patch
    /// routine actually needs it at runtime.
    pub fn resolve_dependencies(&self, module: &Module) -> Vec<Module> {
        let mut dependencies = vec![];
        for name in &module.references {
            match (self.resolver)(name) {
                Ok(dependency) => dependencies.push(dependency),
                Err(error) => {
                    let err = Error::UnresolvedDependency {
                        name: name.clone(),
                        error: Box::new(error),
                    };
                    log::warn!("Could not load a dependency of the patch module: {:?}", err);
                }
            }
        }
        dependencies
    }

    /// Find all patch routines: public static methods with patch metadata on types whose name
    /// carries the patch suffix
    pub fn discover(&self, module: &Module) -> Vec<PatchRoutine> {
        let mut routines = vec![];
        for (id, ty) in module.all_types() {
            if !self.is_patch_type(ty) {
                continue;
            }
            let declaring_type = module.type_full_name(&id);
            for method in ty.methods.iter().filter(|m| is_exposed(m)) {
                if method.patch_info.is_none() && self.settings.is_guard_name(&method.name) {
                    log::trace!("'{}::{}' is a guard", declaring_type, method.name);
                    continue;
                }
                match self.routine(&module.name, &declaring_type, ty, method) {
                    Ok(routine) => routines.push(routine),
                    Err(err) => {
                        log::log!(skip_level(&err), "Skipping patch routine: {:?}", err)
                    }
                }
            }
        }
        log::info!("Number of patch routines found: {}", routines.len());
        routines
    }

    fn is_patch_type(&self, ty: &Type) -> bool {
        let suffix = &self.settings.patch_suffix;
        ty.name.len() > suffix.len() + 1 && ty.name.ends_with(suffix.as_str())
    }

    fn routine(
        &self,
        scope: &str,
        declaring_type: &str,
        ty: &Type,
        method: &Method,
    ) -> Result<PatchRoutine, Error> {
        let full_name = format!("{}::{}", declaring_type, method.name);
        let info = method
            .patch_info
            .as_ref()
            .ok_or_else(|| Error::MissingDescriptor(full_name.clone()))?;
        let descriptor =
            PatchDescriptor::try_from(info).map_err(|reason| Error::InvalidDescriptor {
                routine: full_name.clone(),
                reason,
            })?;

        if descriptor.arguments == ArgPassing::All && method.parameters.is_empty() {
            log::warn!(
                "(!) patch method should take the arguments: {0}() --> {0}(object[] args) - expect errors",
                full_name
            );
        }

        let mut routine = PatchRoutine::new(
            ty.name.clone(),
            method_ref(scope, declaring_type, method),
            descriptor,
        );

        // The second guard only counts alongside the first one
        if let Some(guard) = find_exposed(ty, &self.settings.guard_name(&method.name)) {
            routine = routine.with_guard(method_ref(scope, declaring_type, guard));
            if let Some(guard) = find_exposed(ty, &self.settings.second_guard_name(&method.name))
            {
                routine = routine.with_guard(method_ref(scope, declaring_type, guard));
            }
        }

        Ok(routine)
    }
}

/// Helper methods without patch metadata are only worth a debug line
fn skip_level(err: &Error) -> log::Level {
    match err {
        Error::MissingDescriptor(_) => log::Level::Debug,
        _ => log::Level::Warn,
    }
}

/// Public, static and not `protected`
fn is_exposed(method: &Method) -> bool {
    method.is_public() && method.is_static() && !method.is_family()
}

fn find_exposed<'t>(ty: &'t Type, name: &str) -> Option<&'t Method> {
    ty.methods.iter().find(|m| m.name == name && is_exposed(m))
}

fn method_ref(scope: &str, declaring_type: &str, method: &Method) -> MethodRef {
    MethodRef {
        scope: scope.to_owned(),
        declaring_type: declaring_type.to_owned(),
        name: method.name.clone(),
        parameter_count: u16::try_from(method.parameters.len()).unwrap_or(u16::MAX),
        has_return: method.return_type.is_some(),
    }
}
