//! Structural rewrite of `require.context` call sites.
//!
//! ```js
//! var req = require.context('./modules/', false, /\.js$/);
//! var foo = req('foo.js');
//! ```
//!
//! becomes
//!
//! ```js
//! var req = require.context('./modules/', false, /\.js$/);
//! var foo = (injections['./modules/' + 'foo.js'] || req('foo.js'));
//! ```
//!
//! Text matching cannot tie `req` back to its base path, so this pass parses the
//! source and works on the syntax tree.

use crate::errors::{InjectError, Result};
use crate::replace::SourceReplacer;
use std::ops::Range;
use tracing::debug;
use tree_sitter::{Node, Parser, Tree};

/// A local bound to the result of `require.context(basePath, ...)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextBinding {
    pub name: String,
    pub base_path: String,
    pub range: Range<usize>,
}

/// A call through a [`ContextBinding`]'s name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextCallSite {
    pub range: Range<usize>,
    pub base_path: String,
    pub dynamic_name: String,
    pub call_text: String,
}

impl ContextCallSite {
    /// `(injections[<base> + <name>] || <call>)`
    pub fn replacement(&self) -> String {
        format!(
            "(injections[{} + {}] || {})",
            self.base_path, self.dynamic_name, self.call_text
        )
    }
}

/// Parse `source` as JavaScript, failing on any syntax error.
pub fn parse(source: &str) -> Result<Tree> {
    let mut parser = Parser::new();
    parser.set_language(&tree_sitter_javascript::LANGUAGE.into())?;

    let tree = parser
        .parse(source, None)
        .ok_or(InjectError::Parse { line: 1, column: 1 })?;

    let root = tree.root_node();
    if root.has_error() {
        let position = first_error(root)
            .unwrap_or(root)
            .start_position();
        return Err(InjectError::Parse {
            line: position.row + 1,
            column: position.column + 1,
        });
    }

    Ok(tree)
}

/// Find every `require.context` binding in the tree, in source order.
pub fn find_bindings(tree: &Tree, source: &str) -> Vec<ContextBinding> {
    let src = source.as_bytes();
    let mut bindings = Vec::new();

    walk(tree.root_node(), &mut |node| {
        if node.kind() != "variable_declarator" {
            return;
        }
        let Some(name) = node.child_by_field_name("name") else {
            return;
        };
        if name.kind() != "identifier" {
            return;
        }
        let Some(value) = node.child_by_field_name("value") else {
            return;
        };
        if value.kind() != "call_expression" || !is_require_context(value, src) {
            return;
        }
        let Some(base_path) = first_argument(value) else {
            return;
        };

        bindings.push(ContextBinding {
            name: node_text(name, src).to_string(),
            base_path: node_text(base_path, src).to_string(),
            range: node.byte_range(),
        });
    });

    bindings
}

/// Find every call whose callee is the identifier `binding.name`, in source order.
pub fn find_call_sites(tree: &Tree, source: &str, binding: &ContextBinding) -> Vec<ContextCallSite> {
    let src = source.as_bytes();
    let mut sites = Vec::new();

    walk(tree.root_node(), &mut |node| {
        if node.kind() != "call_expression" {
            return;
        }
        let Some(callee) = node.child_by_field_name("function") else {
            return;
        };
        if callee.kind() != "identifier" || node_text(callee, src) != binding.name {
            return;
        }
        let Some(argument) = first_argument(node) else {
            return;
        };

        sites.push(ContextCallSite {
            range: node.byte_range(),
            base_path: binding.base_path.clone(),
            dynamic_name: node_text(argument, src).to_string(),
            call_text: node_text(node, src).to_string(),
        });
    });

    sites
}

/// Wrap every call made through a `require.context` binding in an injection lookup.
pub fn rewrite_context_calls(source: &str) -> Result<String> {
    let tree = parse(source)?;
    let bindings = find_bindings(&tree, source);
    for binding in &bindings {
        debug!(
            "require.context binding '{}' at {}..{} with base path {}",
            binding.name, binding.range.start, binding.range.end, binding.base_path
        );
    }

    let mut sites: Vec<ContextCallSite> = bindings
        .iter()
        .flat_map(|binding| find_call_sites(&tree, source, binding))
        .collect();
    sites.sort_by_key(|site| site.range.start);

    let mut replacer = SourceReplacer::new(source);
    let mut covered_until = 0;
    for site in &sites {
        if site.range.start < covered_until {
            debug!(
                "Skipping nested require.context call {} at {}..{}",
                site.call_text, site.range.start, site.range.end
            );
            continue;
        }
        replacer.replace_in(site.range.start, site.range.end, &site.replacement())?;
        covered_until = site.range.end;
    }

    Ok(replacer.finish())
}

fn is_require_context(call: Node<'_>, src: &[u8]) -> bool {
    let Some(callee) = call.child_by_field_name("function") else {
        return false;
    };
    if callee.kind() != "member_expression" {
        return false;
    }
    let object = callee.child_by_field_name("object");
    let property = callee.child_by_field_name("property");
    matches!(
        (object, property),
        (Some(object), Some(property))
            if object.kind() == "identifier"
                && node_text(object, src) == "require"
                && node_text(property, src) == "context"
    )
}

fn first_argument(call: Node<'_>) -> Option<Node<'_>> {
    let arguments = call.child_by_field_name("arguments")?;
    if arguments.kind() != "arguments" {
        return None;
    }
    let mut cursor = arguments.walk();
    let first = arguments
        .named_children(&mut cursor)
        .find(|child| !child.is_extra());
    first
}

fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
    children.into_iter().find_map(first_error)
}

/// Pre-order traversal, so nodes are visited in ascending start offset.
fn walk<'t>(root: Node<'t>, visit: &mut impl FnMut(Node<'t>)) {
    let mut cursor = root.walk();
    loop {
        visit(cursor.node());
        if cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return;
            }
        }
    }
}

fn node_text<'a>(node: Node<'_>, src: &'a [u8]) -> &'a str {
    node.utf8_text(src).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn test_rewrites_single_call() {
        let source = "var req = require.context('./modules/', false, '.js'); var m = req('foo.js');";
        let output = rewrite_context_calls(source).unwrap();
        assert_eq!(
            output,
            "var req = require.context('./modules/', false, '.js'); \
             var m = (injections['./modules/' + 'foo.js'] || req('foo.js'));"
        );
    }

    #[test]
    fn test_binding_record() {
        let source = "const req = require.context(BASE + '/x', true);";
        let tree = parse(source).unwrap();
        let bindings = find_bindings(&tree, source);
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].name, "req");
        assert_eq!(bindings[0].base_path, "BASE + '/x'");
        assert_eq!(&source[bindings[0].range.clone()], "req = require.context(BASE + '/x', true)");
    }

    #[test]
    fn test_ignores_other_initializers() {
        let source = indoc! {"
            var a = require('x');
            var b = other.context('./y');
            var c = require.resolve('./z');
            var { d } = require.context('./w');
        "};
        let tree = parse(source).unwrap();
        assert!(find_bindings(&tree, source).is_empty());
    }

    #[test]
    fn test_call_sites_in_source_order() {
        let source = indoc! {"
            var req = require.context('./m/');
            var a = req('a.js');
            function load(name) { return req(name); }
            other('b.js');
        "};
        let tree = parse(source).unwrap();
        let binding = &find_bindings(&tree, source)[0];
        let sites = find_call_sites(&tree, source, binding);
        let names: Vec<_> = sites.iter().map(|s| s.dynamic_name.as_str()).collect();
        assert_eq!(names, vec!["'a.js'", "name"]);
        assert!(sites[0].range.start < sites[1].range.start);
        assert_eq!(sites[1].call_text, "req(name)");
    }

    #[test]
    fn test_binding_without_calls_is_noop() {
        let source = "var req = require.context('./m/');\nmodule.exports = 1;\n";
        assert_eq!(rewrite_context_calls(source).unwrap(), source);
    }

    #[test]
    fn test_multiple_bindings_interleaved() {
        let source = indoc! {"
            var a = require.context('./a/');
            var b = require.context('./b/');
            var x = b('x');
            var y = a('y');
            var z = b('z');
        "};
        let output = rewrite_context_calls(source).unwrap();
        assert!(output.contains("var x = (injections['./b/' + 'x'] || b('x'));"));
        assert!(output.contains("var y = (injections['./a/' + 'y'] || a('y'));"));
        assert!(output.contains("var z = (injections['./b/' + 'z'] || b('z'));"));
    }

    #[test]
    fn test_nested_call_sites_keep_outermost() {
        let source = "var req = require.context('./m/');\nvar v = req(req('inner'));\n";
        let output = rewrite_context_calls(source).unwrap();
        assert_eq!(
            output,
            "var req = require.context('./m/');\n\
             var v = (injections['./m/' + req('inner')] || req(req('inner')));\n"
        );
    }

    #[test]
    fn test_calls_without_arguments_are_untouched() {
        let source = "var req = require.context('./m/');\nreq.keys();\nreq();\n";
        assert_eq!(rewrite_context_calls(source).unwrap(), source);
    }

    #[test]
    fn test_parse_error_reports_position() {
        let err = rewrite_context_calls("var req = require.context('./m/');\nvar = ;\n").unwrap_err();
        match err {
            InjectError::Parse { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other}"),
        }
    }
}
