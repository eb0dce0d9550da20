use crate::model::PatchInfo;
use bitflags::bitflags;
use std::convert::TryFrom;

bitflags! {
    /// Argument slots selected by a mask
    pub struct ArgMask: u8 {
        const SLOT0 = 0b0001;
        const SLOT1 = 0b0010;
        const SLOT2 = 0b0100;
        const SLOT3 = 0b1000;
    }
}

impl ArgMask {
    /// Selected slots, in ascending order
    pub fn slots(self) -> impl Iterator<Item = u16> {
        (0..4u16).filter(move |slot| self.bits() & (1u8 << slot) != 0)
    }
}

/// Which argument slots of the target are passed to the patch
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ArgSelection {
    None,

    /// Exactly one slot (only `0` to `3` are accepted when synthesizing)
    Direct(i32),

    /// Any subset of slots `0` to `3`
    Mask(ArgMask),
}

impl ArgSelection {
    /// Bit marking the raw value as a mask rather than an index
    pub const MASK_TAG: i32 = 256;

    /// Decode the packed form used in patch metadata (`-1` for none)
    pub fn from_raw(raw: i32) -> ArgSelection {
        if raw == -1 {
            ArgSelection::None
        } else if raw >= 0 && raw & Self::MASK_TAG != 0 {
            ArgSelection::Mask(ArgMask::from_bits_truncate((raw & 0xff) as u8))
        } else {
            ArgSelection::Direct(raw)
        }
    }
}

/// How the target's arguments reach the patch
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ArgPassing {
    Nothing,

    /// Optionally the instance, then selected slots
    Selected {
        instance: bool,
        selection: ArgSelection,
    },

    /// Every argument, boxed into one `object[]`
    All,
}

/// What happens after the patch returns
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PostCallAction {
    /// Continue into the original instructions at the offset
    FallThrough,

    /// Return from the target
    Return,

    /// Return from the target if the patch returned `null`
    ///
    /// When `return_result` is set, the `null` itself is returned; otherwise it is popped first.
    ReturnIfNull { return_result: bool },

    /// Continue at the instruction index if the patch returned `false`, otherwise return
    BranchIfFalseThenReturn(usize),

    /// Continue at the instruction index
    BranchTo(usize),
}

/// Checked description of how a patch routine is spliced into its target
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PatchDescriptor {
    /// Instruction index the patch is inserted at
    pub offset: usize,

    pub arguments: ArgPassing,

    /// Duplicate the top of the stack before anything else is pushed
    pub insert_duplicate_top: bool,

    /// Local loaded as a trailing argument to the patch
    pub load_local_before_call: Option<u16>,

    /// Local the patch result is stored into (and then loaded back from)
    pub store_result_in_local: Option<u16>,

    pub post_call: PostCallAction,

    /// Only patch the overload with this many declared parameters
    pub target_arg_count: Option<usize>,
}

impl Default for PatchDescriptor {
    fn default() -> PatchDescriptor {
        PatchDescriptor {
            offset: 0,
            arguments: ArgPassing::Nothing,
            insert_duplicate_top: false,
            load_local_before_call: None,
            store_result_in_local: None,
            post_call: PostCallAction::FallThrough,
            target_arg_count: None,
        }
    }
}

/// Reasons patch metadata is rejected
#[derive(Debug, Eq, PartialEq)]
pub enum DescriptorError {
    NegativeOffset(i32),

    /// An index field is neither `-1` nor a valid index
    BadIndex { field: &'static str, value: i32 },

    /// More than one post-call control flow was requested
    ConflictingControlFlow(Vec<&'static str>),
}

impl TryFrom<&PatchInfo> for PatchDescriptor {
    type Error = DescriptorError;

    fn try_from(info: &PatchInfo) -> Result<PatchDescriptor, DescriptorError> {
        let offset = usize::try_from(info.offset)
            .map_err(|_| DescriptorError::NegativeOffset(info.offset))?;
        let return_to = optional_index("return_to", info.return_to)?;

        let arguments = if info.pass_instance || info.pass_arg_by_index != -1 {
            if info.pass_all_args {
                log::debug!("Selected arguments take priority over passing all arguments");
            }
            ArgPassing::Selected {
                instance: info.pass_instance,
                selection: ArgSelection::from_raw(info.pass_arg_by_index),
            }
        } else if info.pass_all_args {
            ArgPassing::All
        } else {
            ArgPassing::Nothing
        };

        Ok(PatchDescriptor {
            offset,
            arguments,
            insert_duplicate_top: info.insert_dup,
            load_local_before_call: optional_index("load_local", info.load_local)?,
            store_result_in_local: optional_index("store_result", info.store_result)?,
            post_call: post_call_action(info, offset, return_to)?,
            target_arg_count: optional_index("target_arg_count", info.target_arg_count)?
                .map(usize::from),
        })
    }
}

/// Pick the single control flow requested by the flags
///
/// `return_if_null` may be combined with `return_after_call` (the `null` is then returned);
/// `return_to` is the branch target of `decides_return` when both are set. Anything else
/// combined is contradictory.
fn post_call_action(
    info: &PatchInfo,
    offset: usize,
    return_to: Option<u16>,
) -> Result<PostCallAction, DescriptorError> {
    let return_to = return_to.map(usize::from);
    match (
        info.return_if_null,
        info.return_after_call,
        info.decides_return,
        return_to,
    ) {
        (false, false, false, None) => Ok(PostCallAction::FallThrough),
        (false, true, false, None) => Ok(PostCallAction::Return),
        (true, return_result, false, None) => Ok(PostCallAction::ReturnIfNull { return_result }),
        (false, false, true, target) => Ok(PostCallAction::BranchIfFalseThenReturn(
            target.unwrap_or(offset),
        )),
        (false, false, false, Some(target)) => Ok(PostCallAction::BranchTo(target)),
        _ => {
            let mut set = vec![];
            if info.return_if_null {
                set.push("return_if_null");
            }
            if info.return_after_call {
                set.push("return_after_call");
            }
            if info.decides_return {
                set.push("decides_return");
            }
            if return_to.is_some() {
                set.push("return_to");
            }
            Err(DescriptorError::ConflictingControlFlow(set))
        }
    }
}

fn optional_index(field: &'static str, value: i32) -> Result<Option<u16>, DescriptorError> {
    if value == -1 {
        Ok(None)
    } else {
        u16::try_from(value)
            .map(Some)
            .map_err(|_| DescriptorError::BadIndex { field, value })
    }
}
