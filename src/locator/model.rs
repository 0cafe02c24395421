//! Wire representation of locators
//!
//! The JSON shape is consumed by clients that never link against this crate,
//! so field names and tags here are part of the protocol:
//!
//! ```json
//! { "result": { "type": "Bar", "start": 4099, "end": 4101, "depth": 2 },
//!   "steps": [ { "type": "tal", "value": { "type": "Foo", ... } },
//!              { "type": "child", "value": 1 } ] }
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ast::Span;

fn is_false(value: &bool) -> bool {
    !*value
}

/// A type-at-location fingerprint: "the node of this type nearest this range,
/// `depth` hops below the node the search starts from".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TalStep {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub start: u32,
    pub end: u32,
    pub depth: u32,
    #[serde(default, skip_serializing_if = "is_false")]
    pub external: bool,
}

impl TalStep {
    pub fn span(&self) -> Span {
        Span::new(self.start, self.end)
    }
}

/// A call of a derived-value method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FnStep {
    pub name: String,
    pub args: Vec<PropertyArg>,
}

/// One step from a node towards one of its descendants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum NodeLocatorStep {
    Tal(TalStep),
    Child(usize),
    Nta(FnStep),
}

/// Argument of a derived-value method call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum PropertyArg {
    String(String),
    Integer(i64),
    Bool(bool),
    Collection(Vec<PropertyArg>),
    #[serde(rename = "outputstream")]
    OutputStream(String),
    /// A node-typed argument; `None` for a null node.
    NodeLocator(Option<Locator>),
    Any,
}

/// Path from the tree root to one node, plus a description of that node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Locator {
    pub result: TalStep,
    pub steps: Vec<NodeLocatorStep>,
}

impl Locator {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

impl fmt::Display for TalStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.label {
            Some(label) => write!(f, "{}#{}", self.type_name, label)?,
            None => write!(f, "{}", self.type_name)?,
        }
        write!(f, "@{}^{}", self.span(), self.depth)
    }
}

impl fmt::Display for NodeLocatorStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeLocatorStep::Tal(tal) => write!(f, "tal {tal}"),
            NodeLocatorStep::Child(index) => write!(f, "child {index}"),
            NodeLocatorStep::Nta(step) => write!(f, "nta {}({} args)", step.name, step.args.len()),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} via [", self.result)?;
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{step}")?;
        }
        f.write_str("]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::span::pack;
    use serde_json::json;

    fn tal(type_name: &str, depth: u32) -> TalStep {
        TalStep {
            type_name: type_name.to_string(),
            label: None,
            start: pack(1, 3),
            end: pack(1, 5),
            depth,
            external: false,
        }
    }

    #[test]
    fn test_step_tags() {
        let steps = vec![
            NodeLocatorStep::Tal(tal("Foo", 1)),
            NodeLocatorStep::Child(1),
            NodeLocatorStep::Nta(FnStep { name: "decl".to_string(), args: vec![] }),
        ];
        let value = serde_json::to_value(&steps).unwrap();
        assert_eq!(
            value,
            json!([
                { "type": "tal", "value": { "type": "Foo", "start": 4099, "end": 4101, "depth": 1 } },
                { "type": "child", "value": 1 },
                { "type": "nta", "value": { "name": "decl", "args": [] } }
            ])
        );
    }

    #[test]
    fn test_optional_fields_are_omitted() {
        let mut step = tal("Ident", 2);
        let value = serde_json::to_value(&step).unwrap();
        assert!(value.get("label").is_none());
        assert!(value.get("external").is_none());

        step.label = Some("x".to_string());
        step.external = true;
        let value = serde_json::to_value(&step).unwrap();
        assert_eq!(value["label"], "x");
        assert_eq!(value["external"], true);
    }

    #[test]
    fn test_property_arg_tags() {
        let args = vec![
            PropertyArg::String("s".to_string()),
            PropertyArg::Integer(-3),
            PropertyArg::Bool(true),
            PropertyArg::Collection(vec![PropertyArg::Any]),
            PropertyArg::OutputStream("out".to_string()),
            PropertyArg::NodeLocator(None),
        ];
        let value = serde_json::to_value(&args).unwrap();
        assert_eq!(
            value,
            json!([
                { "type": "string", "value": "s" },
                { "type": "integer", "value": -3 },
                { "type": "bool", "value": true },
                { "type": "collection", "value": [ { "type": "any" } ] },
                { "type": "outputstream", "value": "out" },
                { "type": "nodeLocator", "value": null }
            ])
        );
        let back: Vec<PropertyArg> = serde_json::from_value(value).unwrap();
        assert_eq!(back, args);
    }

    #[test]
    fn test_display() {
        let locator = Locator {
            result: tal("Bar", 2),
            steps: vec![NodeLocatorStep::Tal(tal("Foo", 1)), NodeLocatorStep::Child(0)],
        };
        assert_eq!(locator.to_string(), "Bar@1:3-1:5^2 via [tal Foo@1:3-1:5^1, child 0]");
    }
}
