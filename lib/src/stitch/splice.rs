use super::{Error, StitchPlan, Unsupported};
use crate::model::Method;
use std::ops::Range;

/// Insert a plan into the body of its target
///
/// Every instruction goes in at the same index, last one first: each insertion pushes the
/// previous ones right, so they end up in plan order. Instructions already in the body keep
/// their labels (and so do branches to them). An offset past the end of the body is clamped to
/// the end.
///
/// Returns the indices now occupied by the plan.
pub fn splice(target: &mut Method, plan: StitchPlan) -> Result<Range<usize>, Error> {
    let body = target.body.as_mut().ok_or_else(|| Error::UnsupportedTarget {
        method: target.name.clone(),
        reason: Unsupported::NoBody,
    })?;

    let offset = if plan.offset > body.len() {
        log::warn!(
            "Inserting at the end of '{}' instead of at {}",
            target.name,
            plan.offset
        );
        body.len()
    } else {
        plan.offset
    };

    let inserted = plan.instructions.len();
    for insn in plan.instructions.into_iter().rev() {
        log::trace!("Inserting at {} in '{}': {}", offset, target.name, insn);
        body.insert(offset, insn);
    }
    log::debug!("'{}' after splicing:\n{}", target.name, body);

    Ok(offset..offset + inserted)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::{Instruction, MethodFlags, Opcode};

    fn method(n: usize) -> Method {
        let body = (0..n).map(|i| Instruction::ldc_i4(i as i32)).collect();
        Method::new("Target", MethodFlags::PUBLIC | MethodFlags::STATIC).with_body(body)
    }

    fn plan(offset: usize, k: usize) -> StitchPlan {
        StitchPlan {
            offset,
            instructions: (0..k).map(|i| Instruction::ldarg(i as u16)).collect(),
        }
    }

    #[test]
    fn plan_lands_in_order_at_the_offset() {
        let n = 6;
        for k in [0, 1, 5] {
            for o in [0, n / 2, n] {
                let mut target = method(n);
                let before: Vec<_> = target.body.as_ref().unwrap().iter().map(|(l, _)| l).collect();

                let range = splice(&mut target, plan(o, k)).unwrap();
                assert_eq!(range, o..o + k);

                let body = target.body.as_ref().unwrap();
                assert_eq!(body.len(), n + k);
                for i in 0..n + k {
                    let expected = if i < o {
                        Instruction::ldc_i4(i as i32)
                    } else if i < o + k {
                        Instruction::ldarg((i - o) as u16)
                    } else {
                        Instruction::ldc_i4((i - k) as i32)
                    };
                    assert_eq!(body.get(i), Some(&expected), "k={} o={} i={}", k, o, i);
                }

                // Original instructions keep their identity
                for (i, label) in before.into_iter().enumerate() {
                    let shifted = if i < o { i } else { i + k };
                    assert_eq!(body.index_of(label), Some(shifted));
                }
            }
        }
    }

    #[test]
    fn branches_still_reach_their_target() {
        let mut target = Method::new("Target", MethodFlags::STATIC).with_body(vec![
            Instruction::ldarg(0),
            Instruction::ldarg(0),
            Instruction::simple(Opcode::Ret),
        ]);
        let ret = target.body.as_ref().unwrap().label_at(2).unwrap();
        target.body.as_mut().unwrap().insert(
            1,
            Instruction::branch(Opcode::BrTrue, ret),
        );

        splice(&mut target, plan(1, 3)).unwrap();
        let body = target.body.as_ref().unwrap();
        let branch = body.get(4).unwrap().branch_target().unwrap();
        assert_eq!(body.index_of(branch), Some(6));
        assert_eq!(body.get(6), Some(&Instruction::simple(Opcode::Ret)));
    }

    #[test]
    fn offsets_past_the_end_are_clamped() {
        let mut target = method(2);
        assert_eq!(splice(&mut target, plan(7, 2)).unwrap(), 2..4);
        assert_eq!(
            target.body.as_ref().unwrap().get(3),
            Some(&Instruction::ldarg(1))
        );
    }

    #[test]
    fn bodiless_targets_are_rejected() {
        let mut target = Method::new("Target", MethodFlags::ABSTRACT);
        assert!(matches!(
            splice(&mut target, plan(0, 1)),
            Err(Error::UnsupportedTarget {
                reason: Unsupported::NoBody,
                ..
            })
        ));
    }
}
