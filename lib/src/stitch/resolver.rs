use super::{Error, NotFound};
use crate::model::{Method, MethodId, Module, TypeId};

/// Find the method a patch targets
///
/// The type is looked up by simple name among top-level types first, then among all nested
/// types (the first match wins). Methods match by name or by the last `.`-separated segment of
/// their name, so explicit interface implementations (`System.IDisposable.Dispose`) can be
/// targetted as `Dispose`. With `arg_count`, only overloads declaring exactly that many
/// parameters are considered.
pub fn resolve(
    module: &Module,
    type_name: &str,
    method_name: &str,
    arg_count: Option<usize>,
) -> Result<MethodId, Error> {
    let type_id = find_type(module, type_name)
        .ok_or_else(|| NotFound::Type(type_name.to_owned()))?;
    let ty = module
        .get_type(&type_id)
        .ok_or_else(|| NotFound::Type(type_name.to_owned()))?;

    let index = ty
        .methods
        .iter()
        .position(|method| is_candidate(method, method_name, arg_count));

    match index {
        Some(index) => Ok(MethodId { ty: type_id, index }),
        None => Err(Error::NotFound(NotFound::Method {
            type_name: module.type_full_name(&type_id),
            method_name: method_name.to_owned(),
            candidates: ty.methods.iter().map(|m| m.name.clone()).collect(),
        })),
    }
}

fn find_type(module: &Module, type_name: &str) -> Option<TypeId> {
    if let Some(id) = module.top_level_type(type_name) {
        return Some(id);
    }

    log::debug!("Could not find {}. Searching nested types", type_name);
    module
        .all_types()
        .into_iter()
        .find(|(id, ty)| id.is_nested() && ty.name == type_name)
        .map(|(id, _)| id)
}

fn is_candidate(method: &Method, name: &str, arg_count: Option<usize>) -> bool {
    let name_matches =
        method.name == name || method.name.rsplit('.').next() == Some(name);
    let count_matches = arg_count.map_or(true, |count| method.parameters.len() == count);
    name_matches && count_matches
}
