use ast_locator::locator::{Locator, NodeLocatorStep, PropertyArg};
use ast_locator::{Ast, AstInfo, LocatorError, apply_locator, create_locator};
use indoc::indoc;
use quickcheck::{QuickCheck, TestResult};
use test_utils::{RandomTree, TestTree, locator_shape};
use tracing::debug;

const MIXED: &str = indoc! {r#"
    Program@1:1-6:1 {
      Decl#x@1:1-1:12 { Name@1:5-1:6 Expr@1:9-1:11 }
      Decl@2:1-2:12 { Name@2:5-2:6 Expr@2:9-2:11 { Expr@2:9-2:11 } }
      Stmt@3:1-3:8 { Ref@3:1-3:2 Ref@3:1-3:2 Opt { Ref@3:5-3:6 } }
      Import@4:1-4:9!external
      .decls() = List { Decl@1:1-1:12 }
      ~lookup("x", $x, 3) = Binding@1:1-1:12 { Ref@1:5-1:6 }
    }
"#};

fn assert_round_trips(tree: &TestTree) {
    let mut ast = Ast::new(tree, tree.root(), AstInfo::default());
    for node in tree.nodes() {
        if tree.type_of(node) == "Proxy" {
            continue;
        }
        let id = ast.node(node);
        let locator = create_locator(&mut ast, id)
            .unwrap()
            .unwrap_or_else(|| panic!("no locator for {}", tree.path_of(node)));
        let resolved = apply_locator(&mut ast, &locator)
            .unwrap()
            .unwrap_or_else(|| panic!("{} does not resolve ({})", tree.path_of(node), locator));
        assert_eq!(resolved.node, id, "{} resolved elsewhere via {}", tree.path_of(node), locator);
        assert_eq!(resolved.locator, locator, "Re-encoding {} changed its locator", tree.path_of(node));
    }
}

#[test]
fn test_every_node_of_a_mixed_tree_round_trips() {
    let tree = TestTree::parse(MIXED).unwrap();
    assert_round_trips(&tree);
}

#[test]
fn test_twin_siblings_use_child_indices() {
    let tree = TestTree::parse(MIXED).unwrap();
    let refs = tree.find_all("Ref");
    let mut ast = Ast::new(&tree, tree.root(), AstInfo::default());

    let first = ast.node(refs[0]);
    let second = ast.node(refs[1]);
    let first = create_locator(&mut ast, first).unwrap().unwrap();
    let second = create_locator(&mut ast, second).unwrap().unwrap();
    assert_eq!(locator_shape(&first), vec!["Stmt^1", "#0"]);
    assert_eq!(locator_shape(&second), vec!["Stmt^1", "#1"]);
}

#[test]
fn test_external_node_is_reached_by_index() {
    let tree = TestTree::parse(MIXED).unwrap();
    let import = tree.find("Import").unwrap();
    let mut ast = Ast::new(&tree, tree.root(), AstInfo::default());
    let id = ast.node(import);
    let locator = create_locator(&mut ast, id).unwrap().unwrap();
    assert_eq!(locator_shape(&locator), vec!["#3"]);
    assert!(locator.result.external);
}

#[test]
fn test_proxy_node_itself_is_unlocatable() {
    let tree = TestTree::parse(MIXED).unwrap();
    let proxy = tree.find("Proxy").unwrap();
    let mut ast = Ast::new(&tree, tree.root(), AstInfo::default());
    let id = ast.node(proxy);
    assert_eq!(create_locator(&mut ast, id).unwrap(), None);
}

#[test]
fn test_parameterized_derived_value() {
    let tree = TestTree::parse(indoc! {r#"
        Program@1:1-4:1 {
          Decl#x@1:1-1:10 { Name@1:5-1:6 }
          Use@2:1-2:5 {
            Name@2:1-2:2
            ~lookup("x", $x) = Binding@1:1-1:10 { Target@1:5-1:6 }
          }
        }
    "#})
    .unwrap();
    let target = tree.find("Target").unwrap();
    let mut ast = Ast::new(&tree, tree.root(), AstInfo::default());
    let id = ast.node(target);

    let locator = create_locator(&mut ast, id).unwrap().unwrap();
    assert_eq!(locator_shape(&locator), vec!["Use^1", "lookup()", "Target^1"]);

    let NodeLocatorStep::Nta(call) = &locator.steps[1] else {
        panic!("expected a derived-value step, got {}", locator.steps[1]);
    };
    assert_eq!(call.args.len(), 2);
    assert_eq!(call.args[0], PropertyArg::String("x".to_string()));
    let PropertyArg::NodeLocator(Some(decl)) = &call.args[1] else {
        panic!("expected a node argument");
    };
    assert_eq!(locator_shape(decl), vec!["Decl^1"]);
    assert_eq!(decl.result.type_name, "Decl");

    let resolved = apply_locator(&mut ast, &locator).unwrap().unwrap();
    assert_eq!(resolved.node, id);
}

#[test]
fn test_derived_value_with_wrong_arguments_does_not_resolve() {
    let tree = TestTree::parse(indoc! {r#"
        Program@1:1-2:1 {
          Use@1:1-1:5 { .at(1) = Slot@1:1-1:5 }
        }
    "#})
    .unwrap();
    let slot = tree.find("Slot").unwrap();
    let mut ast = Ast::new(&tree, tree.root(), AstInfo::default());
    let id = ast.node(slot);
    let mut locator = create_locator(&mut ast, id).unwrap().unwrap();
    assert_eq!(locator_shape(&locator), vec!["Use^1", "at()"]);

    let NodeLocatorStep::Nta(call) = &mut locator.steps[1] else {
        panic!("expected a derived-value step");
    };
    call.args[0] = PropertyArg::Integer(2);
    assert_eq!(apply_locator(&mut ast, &locator).unwrap(), None);
}

#[test]
fn test_locators_survive_json() {
    let tree = TestTree::parse(MIXED).unwrap();
    let mut ast = Ast::new(&tree, tree.root(), AstInfo::default());
    for node in tree.nodes().filter(|n| tree.type_of(*n) != "Proxy") {
        let id = ast.node(node);
        let locator = create_locator(&mut ast, id).unwrap().unwrap();
        let json = locator.to_json().unwrap();
        let decoded = Locator::from_json(&json).unwrap();
        assert_eq!(decoded, locator);
        let resolved = apply_locator(&mut ast, &decoded).unwrap().unwrap();
        assert_eq!(resolved.node, id);
    }
}

#[test]
fn test_property_every_node_round_trips() {
    fn prop(random: RandomTree) -> TestResult {
        let tree = &random.tree;
        let mut ast = Ast::new(tree, tree.root(), AstInfo::default());
        for node in tree.nodes() {
            if tree.type_of(node) == "Proxy" {
                continue;
            }
            let id = ast.node(node);
            let locator = match create_locator(&mut ast, id) {
                Ok(Some(locator)) => locator,
                Ok(None) => {
                    debug!("No locator for {}", tree.path_of(node));
                    return TestResult::failed();
                }
                Err(e) => return TestResult::error(e.to_string()),
            };
            match apply_locator(&mut ast, &locator) {
                Ok(Some(resolved)) if resolved.node == id && resolved.locator == locator => {}
                Ok(other) => {
                    debug!("{} via {} resolved to {:?}", tree.path_of(node), locator, other.map(|r| r.node));
                    return TestResult::failed();
                }
                Err(e) => return TestResult::error(e.to_string()),
            }
        }
        TestResult::passed()
    }

    QuickCheck::new()
        .tests(300)
        .max_tests(3000)
        .quickcheck(prop as fn(RandomTree) -> TestResult);
}

#[test]
fn test_parent_cycle_is_an_error() {
    let mut tree = TestTree::parse(MIXED).unwrap();
    let stmt = tree.find("Stmt").unwrap();
    let opt = tree.find("Opt").unwrap();
    tree.set_parent(stmt, Some(opt));

    let mut ast = Ast::new(&tree, tree.root(), AstInfo::default());
    let id = ast.node(opt);
    let err = create_locator(&mut ast, id).unwrap_err();
    assert!(matches!(err, LocatorError::AstLoop { ref type_name } if type_name == "Stmt" || type_name == "Opt"));
}
