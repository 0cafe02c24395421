//! In-memory host tree for integration tests.
//!
//! Trees are built either programmatically or from a compact text form:
//!
//! ```text
//! Program@1:1-9:1 {
//!   Foo#first@1:1-1:20 { Bar@1:3-1:5 Bar@1:3-1:5 }
//!   List { Baz@2:1-2:4!visible }
//!   .decl() = Decl { Name@1:3-1:5 }
//!   ~lookup("x", $first, 3) = Binding
//! }
//! ```
//!
//! - `Type#label@l:c-l:c!flag` declares a node; label, span and flags are
//!   optional. Flags are `external`, `hidden` and `visible`.
//! - `{ ... }` holds structural children.
//! - `.name(args) = Node` attaches a node derived from the enclosing node.
//! - `~name(args) = Node` does the same through a childless proxy parent.
//! - Arguments are strings, integers, `true`/`false`, `null`, `any`, `out:name`
//!   for an output stream, `[a, b]` for a collection and `$label` for the node
//!   carrying that label.

use std::fmt;

use anyhow::{Context, Result, anyhow, bail};
use ast_locator::ast::{DerivedOrigin, HostError, HostTree, HostValue};
use ast_locator::Span;
use tracing::trace;

/// Handle of a node in a [`TestTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TestNode(pub usize);

#[derive(Debug, Clone)]
struct NodeData {
    ty: String,
    label: Option<String>,
    span: Option<Span>,
    parent: Option<usize>,
    children: Vec<usize>,
    external: bool,
    visible: Option<bool>,
}

#[derive(Debug, Clone)]
struct DerivedEntry {
    owner: usize,
    name: String,
    args: Vec<HostValue<TestNode>>,
    node: usize,
}

#[derive(Debug, Clone)]
pub struct TestTree {
    nodes: Vec<NodeData>,
    derived: Vec<DerivedEntry>,
    tal_root: Option<String>,
}

impl TestTree {
    pub fn new(ty: &str, span: Option<Span>) -> Self {
        TestTree {
            nodes: vec![NodeData::new(ty, span, None)],
            derived: Vec::new(),
            tal_root: None,
        }
    }

    pub fn parse(text: &str) -> Result<Self> {
        Parser::new(text).parse_tree()
    }

    pub fn root(&self) -> TestNode {
        TestNode(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every node, including derived and proxy nodes.
    pub fn nodes(&self) -> impl Iterator<Item = TestNode> + '_ {
        (0..self.nodes.len()).map(TestNode)
    }

    pub fn add_child(&mut self, parent: TestNode, ty: &str, span: Option<Span>) -> TestNode {
        let id = self.push(ty, span, Some(parent.0));
        self.nodes[parent.0].children.push(id);
        TestNode(id)
    }

    /// Adds the node returned by `owner.name(args)`.
    pub fn add_derived(
        &mut self,
        owner: TestNode,
        name: &str,
        args: Vec<HostValue<TestNode>>,
        ty: &str,
        span: Option<Span>,
    ) -> TestNode {
        let id = self.push(ty, span, Some(owner.0));
        self.derived.push(DerivedEntry { owner: owner.0, name: name.to_string(), args, node: id });
        TestNode(id)
    }

    /// Like [`add_derived`](Self::add_derived), but the value hangs below a
    /// childless proxy node whose parent is `owner`.
    pub fn add_proxied(
        &mut self,
        owner: TestNode,
        name: &str,
        args: Vec<HostValue<TestNode>>,
        ty: &str,
        span: Option<Span>,
    ) -> TestNode {
        let proxy = self.push("Proxy", None, Some(owner.0));
        let value = self.add_derived(owner, name, args, ty, span);
        self.nodes[value.0].parent = Some(proxy);
        value
    }

    pub fn set_label(&mut self, node: TestNode, label: &str) {
        self.nodes[node.0].label = Some(label.to_string());
    }

    pub fn set_external(&mut self, node: TestNode) {
        self.nodes[node.0].external = true;
    }

    pub fn set_visible(&mut self, node: TestNode, visible: bool) {
        self.nodes[node.0].visible = Some(visible);
    }

    pub fn set_span(&mut self, node: TestNode, span: Option<Span>) {
        self.nodes[node.0].span = span;
    }

    pub fn set_tal_root(&mut self, ty: &str) {
        self.tal_root = Some(ty.to_string());
    }

    /// Rewires the parent pointer only; the old parent still lists the node.
    pub fn set_parent(&mut self, node: TestNode, parent: Option<TestNode>) {
        self.nodes[node.0].parent = parent.map(|p| p.0);
    }

    pub fn type_of(&self, node: TestNode) -> &str {
        &self.nodes[node.0].ty
    }

    pub fn span_of(&self, node: TestNode) -> Option<Span> {
        self.nodes[node.0].span
    }

    pub fn is_derived(&self, node: TestNode) -> bool {
        self.derived.iter().any(|d| d.node == node.0)
    }

    /// First node of type `ty` in creation order.
    pub fn find(&self, ty: &str) -> Option<TestNode> {
        self.nodes().find(|n| self.type_of(*n) == ty)
    }

    pub fn find_all(&self, ty: &str) -> Vec<TestNode> {
        self.nodes().filter(|n| self.type_of(*n) == ty).collect()
    }

    pub fn find_label(&self, label: &str) -> Option<TestNode> {
        self.nodes().find(|n| self.nodes[n.0].label.as_deref() == Some(label))
    }

    /// Types from the root down to `node`, e.g. `Program/Foo/Bar`.
    pub fn path_of(&self, node: TestNode) -> String {
        let mut parts = vec![self.type_of(node).to_string()];
        let mut current = node.0;
        let mut guard = 0;
        while let Some(parent) = self.nodes[current].parent {
            parts.push(self.nodes[parent].ty.clone());
            current = parent;
            guard += 1;
            if guard > self.nodes.len() {
                parts.push("...".to_string());
                break;
            }
        }
        parts.reverse();
        parts.join("/")
    }

    fn push(&mut self, ty: &str, span: Option<Span>, parent: Option<usize>) -> usize {
        self.nodes.push(NodeData::new(ty, span, parent));
        self.nodes.len() - 1
    }

    fn get(&self, node: TestNode) -> Result<&NodeData, HostError> {
        self.nodes.get(node.0).ok_or_else(|| HostError::new(format!("no test node {}", node.0)))
    }

    fn describe_into(&self, node: usize, indent: usize, out: &mut String) {
        let data = &self.nodes[node];
        out.push_str(&"  ".repeat(indent));
        out.push_str(&data.ty);
        if let Some(label) = &data.label {
            out.push('#');
            out.push_str(label);
        }
        if let Some(span) = data.span {
            out.push('@');
            out.push_str(&span.to_string());
        }
        out.push('\n');
        for child in &data.children {
            self.describe_into(*child, indent + 1, out);
        }
        for entry in self.derived.iter().filter(|d| d.owner == node) {
            out.push_str(&"  ".repeat(indent + 1));
            out.push('.');
            out.push_str(&entry.name);
            out.push_str(&format!("/{} =\n", entry.args.len()));
            self.describe_into(entry.node, indent + 2, out);
        }
    }
}

impl fmt::Display for TestTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        self.describe_into(0, 0, &mut out);
        f.write_str(&out)
    }
}

impl NodeData {
    fn new(ty: &str, span: Option<Span>, parent: Option<usize>) -> Self {
        NodeData {
            ty: ty.to_string(),
            label: None,
            span,
            parent,
            children: Vec::new(),
            external: false,
            visible: None,
        }
    }
}

impl HostTree for TestTree {
    type Node = TestNode;

    fn num_children(&self, node: &TestNode) -> Result<usize, HostError> {
        Ok(self.get(*node)?.children.len())
    }

    fn child(&self, node: &TestNode, index: usize) -> Result<TestNode, HostError> {
        self.get(*node)?
            .children
            .get(index)
            .map(|c| TestNode(*c))
            .ok_or_else(|| HostError::new(format!("test node {} has no child {}", node.0, index)))
    }

    fn parent(&self, node: &TestNode) -> Result<Option<TestNode>, HostError> {
        Ok(self.get(*node)?.parent.map(TestNode))
    }

    fn type_name<'a>(&'a self, node: &'a TestNode) -> &'a str {
        self.nodes.get(node.0).map_or("<missing>", |n| n.ty.as_str())
    }

    fn packed_span(&self, node: &TestNode) -> Option<(u32, u32)> {
        self.nodes.get(node.0)?.span.map(|s| (s.start, s.end))
    }

    fn label(&self, node: &TestNode) -> Option<String> {
        self.nodes.get(node.0)?.label.clone()
    }

    fn visible_in_node_list(&self, node: &TestNode) -> Option<bool> {
        self.nodes.get(node.0)?.visible
    }

    fn is_external(&self, node: &TestNode) -> bool {
        self.nodes.get(node.0).is_some_and(|n| n.external)
    }

    fn locator_tal_root(&self) -> Option<&str> {
        self.tal_root.as_deref()
    }

    fn derived_origin(
        &self,
        parent: &TestNode,
        child: &TestNode,
    ) -> Result<Option<DerivedOrigin<TestNode>>, HostError> {
        Ok(self
            .derived
            .iter()
            .find(|d| d.owner == parent.0 && d.node == child.0)
            .map(|d| DerivedOrigin::new(d.name.clone(), d.args.clone())))
    }

    fn invoke_derived(
        &self,
        node: &TestNode,
        name: &str,
        args: &[HostValue<TestNode>],
    ) -> Result<Option<TestNode>, HostError> {
        self.get(*node)?;
        let found = self.derived.iter().find(|d| d.owner == node.0 && d.name == name && d.args == args);
        if found.is_none() {
            trace!("{} has no derived attribute `{}` for {:?}", self.type_name(node), name, args);
        }
        Ok(found.map(|d| TestNode(d.node)))
    }
}

/// Argument as written in the text form; `$label` is resolved once the whole
/// tree is known.
#[derive(Debug, Clone)]
enum RawArg {
    Str(String),
    Int(i64),
    Bool(bool),
    Null,
    Any,
    Out(String),
    Ref(String),
    List(Vec<RawArg>),
}

struct Pending {
    entry: usize,
    args: Vec<RawArg>,
}

enum Attach {
    Root,
    Child(usize),
    Derived { owner: usize, name: String, args: Vec<RawArg>, proxied: bool },
}

struct Parser<'a> {
    text: &'a str,
    pos: usize,
    tree: Option<TestTree>,
    pending: Vec<Pending>,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Parser { text, pos: 0, tree: None, pending: Vec::new() }
    }

    fn parse_tree(mut self) -> Result<TestTree> {
        self.node(Attach::Root)?;
        self.skip_ws();
        if self.pos < self.text.len() {
            bail!("unexpected trailing input at {}: {:?}", self.pos, self.rest());
        }
        let mut tree = self.tree.take().ok_or_else(|| anyhow!("empty tree"))?;
        for pending in std::mem::take(&mut self.pending) {
            let args = pending
                .args
                .iter()
                .map(|arg| resolve_arg(&tree, arg))
                .collect::<Result<Vec<_>>>()?;
            tree.derived[pending.entry].args = args;
        }
        trace!("Parsed a test tree of {} nodes", tree.len());
        Ok(tree)
    }

    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() || c == ',' {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, c: char) -> Result<()> {
        self.skip_ws();
        if !self.eat(c) {
            bail!("expected `{}` at {}: {:?}", c, self.pos, self.rest());
        }
        Ok(())
    }

    fn word(&mut self) -> Result<&'a str> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
        if start == self.pos {
            bail!("expected a name at {}: {:?}", start, self.rest());
        }
        Ok(&self.text[start..self.pos])
    }

    fn number(&mut self) -> Result<i64> {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.pos += 1;
        }
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        self.text[start..self.pos]
            .parse()
            .with_context(|| format!("expected a number at {start}"))
    }

    fn position(&mut self) -> Result<(u32, u32)> {
        let line = self.number()?;
        if !self.eat(':') {
            bail!("expected `:` in position at {}", self.pos);
        }
        let column = self.number()?;
        Ok((u32::try_from(line)?, u32::try_from(column)?))
    }

    fn tree_mut(&mut self) -> Result<&mut TestTree> {
        self.tree.as_mut().ok_or_else(|| anyhow!("the root must come first"))
    }

    /// Parses one node declaration, attaches it as described by `attach` and
    /// returns its index.
    fn node(&mut self, attach: Attach) -> Result<usize> {
        self.skip_ws();
        let ty = self.word()?.to_string();
        let mut label = None;
        let mut span = None;
        let mut flags = Vec::new();
        loop {
            if self.eat('#') {
                label = Some(self.word()?.to_string());
            } else if self.eat('@') {
                let (start_line, start_column) = self.position()?;
                if !self.eat('-') {
                    bail!("expected `-` in span at {}", self.pos);
                }
                let (end_line, end_column) = self.position()?;
                span = Some(Span::from_line_columns(start_line, start_column, end_line, end_column));
            } else if self.eat('!') {
                flags.push(self.word()?.to_string());
            } else {
                break;
            }
        }

        let id = self.attach(attach, &ty, span)?;
        self.decorate(id, label, &flags)?;

        self.skip_ws();
        if self.eat('{') {
            loop {
                self.skip_ws();
                match self.peek() {
                    Some('}') => {
                        self.pos += 1;
                        break;
                    }
                    Some(marker @ ('.' | '~')) => {
                        self.pos += 1;
                        let (name, args) = self.call()?;
                        self.node(Attach::Derived { owner: id, name, args, proxied: marker == '~' })?;
                    }
                    Some(_) => {
                        self.node(Attach::Child(id))?;
                    }
                    None => bail!("unclosed `{{` for {}", ty),
                }
            }
        }
        Ok(id)
    }

    fn attach(&mut self, attach: Attach, ty: &str, span: Option<Span>) -> Result<usize> {
        match attach {
            Attach::Root => {
                if self.tree.is_some() {
                    bail!("a tree has exactly one root");
                }
                self.tree = Some(TestTree::new(ty, span));
                Ok(0)
            }
            Attach::Child(parent) => Ok(self.tree_mut()?.add_child(TestNode(parent), ty, span).0),
            Attach::Derived { owner, name, args, proxied } => {
                let tree = self.tree_mut()?;
                let node = if proxied {
                    tree.add_proxied(TestNode(owner), &name, Vec::new(), ty, span)
                } else {
                    tree.add_derived(TestNode(owner), &name, Vec::new(), ty, span)
                };
                let entry = tree.derived.len() - 1;
                self.pending.push(Pending { entry, args });
                Ok(node.0)
            }
        }
    }

    fn decorate(&mut self, id: usize, label: Option<String>, flags: &[String]) -> Result<()> {
        let tree = self.tree_mut()?;
        if let Some(label) = label {
            tree.set_label(TestNode(id), &label);
        }
        for flag in flags {
            match flag.as_str() {
                "external" => tree.set_external(TestNode(id)),
                "hidden" => tree.set_visible(TestNode(id), false),
                "visible" => tree.set_visible(TestNode(id), true),
                other => bail!("unknown flag `!{}`", other),
            }
        }
        Ok(())
    }

    /// `name(args) =`, after the leading `.` or `~`.
    fn call(&mut self) -> Result<(String, Vec<RawArg>)> {
        let name = self.word()?.to_string();
        self.expect('(')?;
        let mut args = Vec::new();
        loop {
            self.skip_ws();
            if self.eat(')') {
                break;
            }
            args.push(self.arg()?);
        }
        self.expect('=')?;
        Ok((name, args))
    }

    fn arg(&mut self) -> Result<RawArg> {
        self.skip_ws();
        match self.peek() {
            Some('"') => {
                self.pos += 1;
                let start = self.pos;
                while self.peek().is_some_and(|c| c != '"') {
                    self.pos += self.peek().map_or(1, char::len_utf8);
                }
                let value = self.text[start..self.pos].to_string();
                if !self.eat('"') {
                    bail!("unterminated string at {}", start);
                }
                Ok(RawArg::Str(value))
            }
            Some('$') => {
                self.pos += 1;
                Ok(RawArg::Ref(self.word()?.to_string()))
            }
            Some('[') => {
                self.pos += 1;
                let mut items = Vec::new();
                loop {
                    self.skip_ws();
                    if self.eat(']') {
                        break;
                    }
                    items.push(self.arg()?);
                }
                Ok(RawArg::List(items))
            }
            Some(c) if c.is_ascii_digit() || c == '-' => Ok(RawArg::Int(self.number()?)),
            Some(_) => {
                let word = self.word()?;
                match word {
                    "true" => Ok(RawArg::Bool(true)),
                    "false" => Ok(RawArg::Bool(false)),
                    "null" => Ok(RawArg::Null),
                    "any" => Ok(RawArg::Any),
                    "out" => {
                        if !self.eat(':') {
                            bail!("expected `out:name` at {}", self.pos);
                        }
                        Ok(RawArg::Out(self.word()?.to_string()))
                    }
                    other => bail!("unknown argument `{}`", other),
                }
            }
            None => bail!("unexpected end of input in argument list"),
        }
    }
}

fn resolve_arg(tree: &TestTree, arg: &RawArg) -> Result<HostValue<TestNode>> {
    Ok(match arg {
        RawArg::Str(s) => HostValue::Str(s.clone()),
        RawArg::Int(i) => HostValue::Int(*i),
        RawArg::Bool(b) => HostValue::Bool(*b),
        RawArg::Null => HostValue::Node(None),
        RawArg::Any => HostValue::Any,
        RawArg::Out(name) => HostValue::OutputStream(name.clone()),
        RawArg::Ref(label) => HostValue::Node(Some(
            tree.find_label(label).with_context(|| format!("no node labelled `{label}`"))?,
        )),
        RawArg::List(items) => {
            HostValue::Collection(items.iter().map(|item| resolve_arg(tree, item)).collect::<Result<_>>()?)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_structure() {
        let tree = TestTree::parse(
            "Program@1:1-9:1 { Foo#first@1:1-1:20 { Bar@1:3-1:5 Bar@1:3-1:5 } List { Baz!visible } }",
        )
        .unwrap();
        assert_eq!(tree.find_all("Bar").len(), 2);
        let foo = tree.find_label("first").unwrap();
        assert_eq!(tree.type_of(foo), "Foo");
        assert_eq!(tree.span_of(foo), Some(Span::from_line_columns(1, 1, 1, 20)));
        let baz = tree.find("Baz").unwrap();
        assert_eq!(tree.path_of(baz), "Program/List/Baz");
        assert_eq!(tree.visible_in_node_list(&baz), Some(true));
    }

    #[test]
    fn test_parse_derived() {
        let tree = TestTree::parse(
            r#"Program { Foo#f { .decl() = Decl { Name } ~lookup("x", $f, [1, out:log], null) = Binding } }"#,
        )
        .unwrap();
        let foo = tree.find("Foo").unwrap();
        let decl = tree.find("Decl").unwrap();
        assert!(tree.is_derived(decl));
        assert_eq!(tree.num_children(&foo).unwrap(), 0);
        assert_eq!(tree.parent(&decl).unwrap(), Some(foo));
        assert_eq!(tree.invoke_derived(&foo, "decl", &[]).unwrap(), Some(decl));

        let binding = tree.find("Binding").unwrap();
        let proxy = tree.parent(&binding).unwrap().unwrap();
        assert_eq!(tree.type_of(proxy), "Proxy");
        assert_eq!(tree.parent(&proxy).unwrap(), Some(foo));
        let origin = tree.derived_origin(&foo, &binding).unwrap().unwrap();
        assert_eq!(
            origin.args,
            vec![
                HostValue::Str("x".to_string()),
                HostValue::Node(Some(foo)),
                HostValue::Collection(vec![HostValue::Int(1), HostValue::OutputStream("log".to_string())]),
                HostValue::Node(None),
            ]
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(TestTree::parse("Program {").is_err());
        assert!(TestTree::parse("Program { Foo!shiny }").is_err());
        assert!(TestTree::parse("Program { .f($nobody) = X }").is_err());
        assert!(TestTree::parse("Program Extra").is_err());
    }

    #[test]
    fn test_unknown_attribute_is_no_value() {
        let tree = TestTree::parse("Program { .decl() = Decl }").unwrap();
        assert_eq!(tree.invoke_derived(&tree.root(), "missing", &[]).unwrap(), None);
        assert_eq!(tree.invoke_derived(&tree.root(), "decl", &[HostValue::Int(1)]).unwrap(), None);
        assert!(tree.invoke_derived(&TestNode(99), "decl", &[]).is_err());
    }
}
