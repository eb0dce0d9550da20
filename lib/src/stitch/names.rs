use super::{Error, Settings};

/// Maps the names of patch routines to the names of the methods they patch
///
///   * `PlayerPatch` patches type `Player`
///   * `_LT_Start_GT_d__4Patch` patches type `<Start>d__4`
///   * `UpdateII` patches method `Update` (the marker only keeps patch names apart)
///   * `ctor` patches the constructor `.ctor`
pub struct NameNormalizer<'s> {
    settings: &'s Settings,
}

impl<'s> NameNormalizer<'s> {
    pub fn new(settings: &'s Settings) -> NameNormalizer<'s> {
        NameNormalizer { settings }
    }

    /// Target type and method names for a patch routine
    pub fn normalize(&self, raw_type: &str, raw_method: &str) -> Result<(String, String), Error> {
        Ok((
            self.normalize_type_name(raw_type)?,
            self.normalize_method_name(raw_method),
        ))
    }

    /// Strip the patch suffix and restore angle brackets
    pub fn normalize_type_name(&self, raw_type: &str) -> Result<String, Error> {
        let suffix = &self.settings.patch_suffix;
        match raw_type.strip_suffix(suffix.as_str()) {
            Some(stem) if !stem.is_empty() => Ok(self.restore_angle_brackets(stem)),
            _ => Err(Error::InvalidDescriptor(format!(
                "type name '{}' does not extend the suffix '{}'",
                raw_type, suffix
            ))),
        }
    }

    /// Drop the differentiation marker, restore angle brackets and map constructor names
    pub fn normalize_method_name(&self, raw_method: &str) -> String {
        let name = raw_method.replace(self.settings.differentiation_marker.as_str(), "");
        let name = self.restore_angle_brackets(&name);
        for (alias, constructor) in &self.settings.constructor_names {
            if name == *alias {
                return constructor.clone();
            }
        }
        name
    }

    pub fn restore_angle_brackets(&self, name: &str) -> String {
        name.replace(self.settings.less_than_placeholder.as_str(), "<")
            .replace(self.settings.greater_than_placeholder.as_str(), ">")
    }

    /// Inverse of [`Self::restore_angle_brackets`], for naming patch routines
    pub fn escape_angle_brackets(&self, name: &str) -> String {
        name.replace('<', &self.settings.less_than_placeholder)
            .replace('>', &self.settings.greater_than_placeholder)
    }
}
