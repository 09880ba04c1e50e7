//! Label selector evaluation.
//!
//! A selector is a conjunction of requirements. Keys are looked up
//! case-insensitively; `in` / `not_in` compare values case-insensitively.
//! Anything the engine does not recognize fails closed.

use gateway_core::{
    eq_ignore_case, LabelOperator, LabelRequirement, LabelSelector, Labels, RequirementKind,
    SharedInstance,
};

/// Instances matching `selector`, in pool order
///
/// `None` or an empty selector matches every instance.
#[must_use]
pub fn match_instances(
    instances: &[SharedInstance],
    selector: Option<&LabelSelector>,
) -> Vec<SharedInstance> {
    instances
        .iter()
        .filter(|instance| matches_selector(&instance.labels, selector))
        .cloned()
        .collect()
}

/// Whether a label set satisfies every requirement of `selector`
#[must_use]
pub fn matches_selector(labels: &Labels, selector: Option<&LabelSelector>) -> bool {
    match selector {
        None => true,
        Some(selector) => selector
            .requirements
            .iter()
            .all(|requirement| matches_requirement(labels, requirement)),
    }
}

fn matches_requirement(labels: &Labels, requirement: &LabelRequirement) -> bool {
    if requirement.kind != RequirementKind::Label {
        return false;
    }

    let value = labels.get(&requirement.key);
    let listed = |v: &str| {
        requirement
            .values
            .iter()
            .any(|candidate| eq_ignore_case(candidate, v))
    };

    match requirement.operator {
        LabelOperator::In => value.is_some_and(listed),
        LabelOperator::NotIn => value.map_or(true, |v| !listed(v)),
        LabelOperator::Exists => value.is_some(),
        LabelOperator::DoesNotExist => value.is_none(),
        LabelOperator::Unsupported => false,
    }
}
