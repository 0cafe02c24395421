//! Short string forms of locator steps for assertions.

use ast_locator::locator::{Locator, NodeLocatorStep};

/// `Type^depth` for TAL steps, `#index` for child steps and `name()` for
/// derived-value steps.
pub fn shape(steps: &[NodeLocatorStep]) -> Vec<String> {
    steps
        .iter()
        .map(|step| match step {
            NodeLocatorStep::Tal(tal) => format!("{}^{}", tal.type_name, tal.depth),
            NodeLocatorStep::Child(index) => format!("#{index}"),
            NodeLocatorStep::Nta(call) => format!("{}()", call.name),
        })
        .collect()
}

pub fn locator_shape(locator: &Locator) -> Vec<String> {
    shape(&locator.steps)
}
