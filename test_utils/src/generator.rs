//! Random host trees for property-based testing.
//!
//! Generated trees keep the one invariant the locator relies on: a child's
//! span lies inside its parent's span whenever both are present. Everything
//! else is fair game, so trees contain
//! - nodes without spans (about one in seven),
//! - twin siblings with identical type and span,
//! - wrapper chains where a child repeats its parent's type and span,
//! - derived nodes, with and without arguments.
//!
//! Generation uses a depth parameter to bound tree size.

use std::fmt;

use ast_locator::Span;
use ast_locator::ast::HostValue;
use ast_locator::ast::span::pack;
use quickcheck::{Arbitrary, Gen};

use crate::tree::{TestNode, TestTree};

const MAX_DEPTH: usize = 5;
const TYPES: &[&str] = &["Block", "Stmt", "Expr", "Call", "Name", "List", "Opt"];

/// Columns per synthetic line; offsets are laid out line by line.
const LINE_WIDTH: u32 = 64;

#[derive(Clone)]
pub struct RandomTree {
    pub tree: TestTree,
}

impl fmt::Debug for RandomTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\n{}", self.tree)
    }
}

impl Arbitrary for RandomTree {
    fn arbitrary(g: &mut Gen) -> Self {
        let width = 4 * LINE_WIDTH;
        let mut tree = TestTree::new("Program", Some(span_of(0, width)));
        let root = tree.root();
        gen_children(g, &mut tree, root, 0, width, g.size().min(MAX_DEPTH));
        RandomTree { tree }
    }
}

fn offset(at: u32) -> u32 {
    pack(1 + at / LINE_WIDTH, 1 + at % LINE_WIDTH)
}

fn span_of(lo: u32, hi: u32) -> Span {
    Span::new(offset(lo), offset(hi))
}

fn chance(g: &mut Gen, percent: u32) -> bool {
    u32::arbitrary(g) % 100 < percent
}

fn pick_type(g: &mut Gen) -> &'static str {
    g.choose(TYPES).copied().unwrap_or("Expr")
}

fn maybe_span(g: &mut Gen, lo: u32, hi: u32) -> Option<Span> {
    if chance(g, 15) { None } else { Some(span_of(lo, hi)) }
}

/// Fills `[lo, hi]` below `parent` with up to three children.
fn gen_children(g: &mut Gen, tree: &mut TestTree, parent: TestNode, lo: u32, hi: u32, depth: usize) {
    if depth == 0 || hi <= lo + 2 {
        return;
    }
    let count = usize::arbitrary(g) % 4;
    if count == 0 {
        return;
    }
    let slot = (hi - lo) / count as u32;
    let mut previous: Option<(&'static str, u32, u32)> = None;

    for i in 0..count {
        let (ty, child_lo, child_hi) = match previous {
            Some(twin) if chance(g, 20) => twin,
            _ => {
                let start = lo + i as u32 * slot;
                let end = start + slot.saturating_sub(1).max(1);
                let shrink = (end - start) / 4;
                (pick_type(g), start + shrink, end - shrink)
            }
        };
        previous = Some((ty, child_lo, child_hi));

        let child = tree.add_child(parent, ty, maybe_span(g, child_lo, child_hi));
        if chance(g, 10) {
            // Wrapper chain
            let inner = tree.add_child(child, ty, tree.span_of(child));
            gen_children(g, tree, inner, child_lo, child_hi, depth - 1);
        } else {
            gen_children(g, tree, child, child_lo, child_hi, depth - 1);
        }
        if chance(g, 10) {
            gen_derived(g, tree, child, child_lo, child_hi, depth - 1);
        }
    }
}

fn gen_derived(g: &mut Gen, tree: &mut TestTree, owner: TestNode, lo: u32, hi: u32, depth: usize) {
    let args = if bool::arbitrary(g) {
        Vec::new()
    } else {
        vec![HostValue::Int(i64::from(u8::arbitrary(g))), HostValue::Node(Some(tree.root()))]
    };
    let name = if args.is_empty() { "attr" } else { "lookup" };
    let value = if chance(g, 30) {
        tree.add_proxied(owner, name, args, pick_type(g), maybe_span(g, lo, hi))
    } else {
        tree.add_derived(owner, name, args, pick_type(g), maybe_span(g, lo, hi))
    };
    gen_children(g, tree, value, lo, hi, depth.min(2));
}
