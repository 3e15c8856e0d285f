//! Text-level injection wrapping and the generated module shell.

use crate::pattern::RequirePattern;

/// Name of the generated function's single parameter
pub const INJECTIONS: &str = "injections";

/// Replace every accepted `require(<arg>)` with `(injections[<arg>] || require(<arg>))`.
///
/// Text outside the matched calls is left byte-for-byte intact.
pub fn wrap_requires(source: &str, pattern: &RequirePattern) -> String {
    let mut output = String::with_capacity(source.len());
    let mut copied = 0;

    for caps in pattern.wrappable_calls(source) {
        let Some(call) = caps.get(0) else {
            continue;
        };
        output.push_str(&source[copied..call.start()]);
        output.push_str(&format!(
            "({}[{}] || {})",
            INJECTIONS,
            &caps[1],
            call.as_str()
        ));
        copied = call.end();
    }

    output.push_str(&source[copied..]);
    output
}

/// Embed wrapped source in the `inject(injections)` function that becomes the module's export.
pub fn render_module(wrapped: &str) -> String {
    [
        "module.exports = function inject(injections) {",
        "var module = {exports: {}};",
        "var exports = module.exports;",
        wrapped,
        "return module.exports;",
        "}",
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterSet;

    fn wrap(source: &str, filters: &FilterSet) -> String {
        let pattern = RequirePattern::build(filters).unwrap();
        wrap_requires(source, &pattern)
    }

    #[test]
    fn test_wraps_every_call_with_empty_filters() {
        let output = wrap("var x = require('x');\nvar y = require(\"y\");", &FilterSet::new());
        assert_eq!(
            output,
            "var x = (injections['x'] || require('x'));\nvar y = (injections[\"y\"] || require(\"y\"));"
        );
    }

    #[test]
    fn test_excluded_calls_stay_plain() {
        let filters: FilterSet = [("a", true)].into_iter().collect();
        let output = wrap("require('a'); require('b');", &filters);
        assert_eq!(output, "require('a'); (injections['b'] || require('b'));");
    }

    #[test]
    fn test_only_included_calls_are_wrapped() {
        let filters: FilterSet = [("a", false)].into_iter().collect();
        let output = wrap("require('a'); require('b');", &filters);
        assert_eq!(output, "(injections['a'] || require('a')); require('b');");
    }

    #[test]
    fn test_calls_nested_in_excluded_call_are_wrapped() {
        let filters: FilterSet = [("a", true)].into_iter().collect();
        let output = wrap("x(require('a' + require('b')));", &filters);
        assert_eq!(output, "x(require('a' + (injections['b'] || require('b'))));");
    }

    #[test]
    fn test_whitespace_is_preserved() {
        let source = "\tvar a =   require('a') ;\r\n\n  // require\n";
        let output = wrap(source, &FilterSet::new());
        assert_eq!(
            output,
            "\tvar a =   (injections['a'] || require('a')) ;\r\n\n  // require\n"
        );
    }

    #[test]
    fn test_render_module_shell() {
        insta::assert_snapshot!(render_module("exports.v = 1;"), @r"
        module.exports = function inject(injections) {
        var module = {exports: {}};
        var exports = module.exports;
        exports.v = 1;
        return module.exports;
        }
        ");
    }
}
