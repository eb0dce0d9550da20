use super::PatchDescriptor;
use crate::model::MethodRef;

/// Routine from a patch module, along with everything needed to stitch it into its target
#[derive(Clone, Debug)]
pub struct PatchRoutine {
    /// Simple name of the declaring type in the patch module (suffix included)
    pub owner_name: String,

    /// The routine itself
    pub method: MethodRef,

    /// Guards deciding at runtime whether the patch runs, in the order they are checked
    ///
    /// At most two: `<name>ShouldExecute`, then `<name>ShouldExecute2`.
    pub guards: Vec<MethodRef>,

    pub descriptor: PatchDescriptor,
}

impl PatchRoutine {
    pub fn new(
        owner_name: impl Into<String>,
        method: MethodRef,
        descriptor: PatchDescriptor,
    ) -> PatchRoutine {
        PatchRoutine {
            owner_name: owner_name.into(),
            method,
            guards: vec![],
            descriptor,
        }
    }

    pub fn with_guard(mut self, guard: MethodRef) -> PatchRoutine {
        self.guards.push(guard);
        self
    }

    /// Name of the routine in the patch module
    pub fn name(&self) -> &str {
        &self.method.name
    }
}
