use esmbox_core::{EsmError, EsmResult};
use regex::Regex;

/// How a source file expresses its imports and exports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleFormat {
    CommonJs,
    Esm,
    Json,
}

/// Regex-based static analysis of JavaScript sources
///
/// Callers pass comment-free code (see [`super::minifier::Minifier::strip_comments`]).
pub struct JsParser {
    esm_statement: Regex,
    require_call: Regex,
    from_clause: Regex,
    bare_import: Regex,
    dynamic_import: Regex,
    cjs_export: Regex,
    cjs_define: Regex,
}

fn compile(pattern: &str) -> EsmResult<Regex> {
    Regex::new(pattern).map_err(|e| EsmError::BundleFailed(format!("Invalid regex: {}", e)))
}

impl JsParser {
    pub fn new() -> EsmResult<Self> {
        Ok(Self {
            esm_statement: compile(
                r#"(?m)^[ \t]*(?:import\s*[\w$*{'"]|export\s+(?:default|const|let|var|function|class|async)\b|export\s*[{*])"#,
            )?,
            require_call: compile(r#"\brequire\s*\(\s*['"]([^'"\n]+)['"]\s*\)"#)?,
            from_clause: compile(r#"(?m)^[ \t]*(?:import|export)\b[^;'"]*?\bfrom\s*['"]([^'"\n]+)['"]"#)?,
            bare_import: compile(r#"(?m)^[ \t]*import\s*['"]([^'"\n]+)['"]"#)?,
            dynamic_import: compile(r#"\bimport\s*\(\s*['"]([^'"\n]+)['"]\s*\)"#)?,
            cjs_export: compile(r#"(?m)(?:^|[^.\w$])(?:module\.)?exports\.([A-Za-z_$][\w$]*)\s*="#)?,
            cjs_define: compile(
                r#"Object\.defineProperty\(\s*(?:module\.)?exports\s*,\s*['"]([A-Za-z_$][\w$]*)['"]"#,
            )?,
        })
    }

    /// Decide whether a file is an ES module or CommonJS
    pub fn detect_format(&self, code: &str) -> ModuleFormat {
        if self.esm_statement.is_match(code) {
            ModuleFormat::Esm
        } else {
            ModuleFormat::CommonJs
        }
    }

    /// Every static specifier a file depends on, in order of appearance
    pub fn extract_specifiers(&self, code: &str) -> Vec<String> {
        let mut found: Vec<(usize, String)> = Vec::new();

        for re in [
            &self.require_call,
            &self.from_clause,
            &self.bare_import,
            &self.dynamic_import,
        ] {
            for cap in re.captures_iter(code) {
                if let Some(m) = cap.get(1) {
                    found.push((m.start(), m.as_str().to_string()));
                }
            }
        }

        found.sort_by_key(|(pos, _)| *pos);

        let mut specifiers: Vec<String> = Vec::new();
        for (_, spec) in found {
            if !specifiers.contains(&spec) {
                specifiers.push(spec);
            }
        }
        specifiers
    }

    /// Names a CommonJS module assigns on `exports`
    pub fn commonjs_exports(&self, code: &str) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for re in [&self.cjs_export, &self.cjs_define] {
            for cap in re.captures_iter(code) {
                let name = cap[1].to_string();
                if name != "default" && name != "__esModule" && !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_format() {
        let parser = JsParser::new().unwrap();
        assert_eq!(
            parser.detect_format("import x from './x.js';\nexport default x;"),
            ModuleFormat::Esm
        );
        assert_eq!(parser.detect_format("export { a as b };"), ModuleFormat::Esm);
        assert_eq!(
            parser.detect_format("const x = require('./x');\nmodule.exports = x;"),
            ModuleFormat::CommonJs
        );
        assert_eq!(
            parser.detect_format("const m = import('./lazy.js');"),
            ModuleFormat::CommonJs
        );
    }

    #[test]
    fn test_extract_specifiers_in_source_order() {
        let parser = JsParser::new().unwrap();
        let code = r#"import a from './a.js';
import {
  b,
  c as d
} from "./b.js";
import './side-effect.js';
export * from './star.js';
const e = require('./e');
const lazy = import('./lazy.js');
const again = require('./e');
"#;
        assert_eq!(
            parser.extract_specifiers(code),
            vec![
                "./a.js",
                "./b.js",
                "./side-effect.js",
                "./star.js",
                "./e",
                "./lazy.js"
            ]
        );
    }

    #[test]
    fn test_commonjs_exports() {
        let parser = JsParser::new().unwrap();
        let code = r#"exports.pad = pad;
module.exports.trim = trim;
Object.defineProperty(exports, "__esModule", { value: true });
Object.defineProperty(exports, 'version', { get: function () { return v; } });
other.exports.nope = 1;
exports.default = pad;
"#;
        assert_eq!(parser.commonjs_exports(code), vec!["pad", "trim", "version"]);
    }
}
