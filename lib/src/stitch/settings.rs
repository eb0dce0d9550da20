use crate::model::Version;

/// Naming conventions and output options for stitching
#[derive(Clone, Debug)]
pub struct Settings {
    /// Suffix marking types in the patch module that hold patch routines (eg. `Patch`)
    ///
    /// `PlayerPatch.Update` patches `Player.Update`.
    pub patch_suffix: String,

    /// Stands in for `<` in patch type and method names
    pub less_than_placeholder: String,

    /// Stands in for `>` in patch type and method names
    ///
    /// `<>__AnonType0` is patched by a type named `_LT__GT___AnonType0Patch`.
    pub greater_than_placeholder: String,

    /// Removed from patch method names, so that several routines in one type can patch methods
    /// of the same name (eg. `Update`, `UpdateII`, `UpdateIIII`)
    pub differentiation_marker: String,

    /// Suffix of guard routines deciding whether a patch runs
    pub guard_suffix: String,

    /// Appended to [`Self::guard_suffix`] for the second guard
    pub second_guard_suffix: String,

    /// Patch method names for constructors and type initializers, with the names they map to
    pub constructor_names: Vec<(String, String)>,

    /// Inserted before the extension of the output file (`Game.dll` becomes `Game.out.dll`)
    pub output_marker: String,

    /// Version stamped on the output module
    pub output_version: Version,

    /// Folder (next to the executable) holding modules that patch modules refer to
    pub references_folder: String,

    /// Extension of module files in the references folder
    pub library_extension: String,
}

impl Settings {
    pub fn new() -> Settings {
        Settings {
            patch_suffix: String::from("Patch"),
            less_than_placeholder: String::from("_LT_"),
            greater_than_placeholder: String::from("_GT_"),
            differentiation_marker: String::from("II"),
            guard_suffix: String::from("ShouldExecute"),
            second_guard_suffix: String::from("2"),
            constructor_names: vec![
                (String::from("ctor"), String::from(".ctor")),
                (String::from("cctor"), String::from(".cctor")),
            ],
            output_marker: String::from("out"),
            output_version: Version::new(99, 99, 99, 99),
            references_folder: String::from("references"),
            library_extension: String::from("dll"),
        }
    }

    /// Name of the first guard of a patch routine
    pub fn guard_name(&self, routine_name: &str) -> String {
        format!("{}{}", routine_name, self.guard_suffix)
    }

    /// Name of the second guard of a patch routine
    pub fn second_guard_name(&self, routine_name: &str) -> String {
        format!(
            "{}{}{}",
            routine_name, self.guard_suffix, self.second_guard_suffix
        )
    }

    /// Does this name look like a guard routine?
    pub fn is_guard_name(&self, name: &str) -> bool {
        let name = name.strip_suffix(&self.second_guard_suffix).unwrap_or(name);
        name.len() > self.guard_suffix.len() && name.ends_with(&self.guard_suffix)
    }
}

impl Default for Settings {
    fn default() -> Settings {
        Settings::new()
    }
}
