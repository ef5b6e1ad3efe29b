use esmbox_core::{EsmError, EsmResult};
use regex::{Captures, Regex};

/// An ES module rewritten to run inside the bundle's module table
#[derive(Debug, Clone, Default)]
pub struct LoweredModule {
    /// Function body, including the export prologue
    pub code: String,
    /// Export names, `default` included when present
    pub exports: Vec<String>,
    /// Specifiers re-exported wholesale with `export * from`
    pub star_sources: Vec<String>,
}

/// Lowers `import`/`export` statements to calls into the bundle runtime
///
/// Imports become `__esmbox_import("spec")`, exports become getters on
/// `__esmbox_exports` defined before the module body runs, so hoisted
/// function exports are visible to circular importers.
pub struct EsmLowering {
    export_from: Regex,
    import_from: Regex,
    import_bare: Regex,
    export_default: Regex,
    export_decl: Regex,
    export_list: Regex,
    dynamic_import: Regex,
    identifier: Regex,
}

fn compile(pattern: &str) -> EsmResult<Regex> {
    Regex::new(pattern).map_err(|e| EsmError::BundleFailed(format!("Invalid regex: {}", e)))
}

struct Lowering {
    getters: Vec<(String, String)>,
    star_sources: Vec<String>,
    has_default: bool,
    counter: usize,
}

impl Lowering {
    fn temp(&mut self, prefix: &str) -> String {
        self.counter += 1;
        format!("__esmbox_{}{}", prefix, self.counter)
    }

    fn export(&mut self, name: &str, getter: String) {
        if name == "default" {
            self.has_default = true;
        }
        if !self.getters.iter().any(|(n, _)| n == name) {
            self.getters.push((name.to_string(), getter));
        }
    }
}

fn quote(spec: &str) -> String {
    serde_json::to_string(spec).unwrap_or_else(|_| format!("\"{}\"", spec))
}

impl EsmLowering {
    pub fn new() -> EsmResult<Self> {
        Ok(Self {
            export_from: compile(
                r#"(?m)^([ \t]*)export\s*(\*\s*as\s+([A-Za-z_$][\w$]*)|\*|\{([^}]*)\})\s*from\s*['"]([^'"\n]+)['"][ \t]*;?"#,
            )?,
            import_from: compile(
                r#"(?m)^([ \t]*)import\s+([\w$*{}\s,]+?)\s*from\s*['"]([^'"\n]+)['"][ \t]*;?"#,
            )?,
            import_bare: compile(r#"(?m)^([ \t]*)import\s*['"]([^'"\n]+)['"][ \t]*;?"#)?,
            export_default: compile(
                r#"(?m)^([ \t]*)export\s+default\s+(?:((?:async\s+)?function\b\s*\*?\s*)([A-Za-z_$][\w$]*)?|(class\b\s*)([A-Za-z_$][\w$]*)?)?"#,
            )?,
            export_decl: compile(
                r#"(?m)^([ \t]*)export\s+(?:((?:async\s+)?function\b\s*\*?\s*([A-Za-z_$][\w$]*))|(class\s+([A-Za-z_$][\w$]*))|((?:const|let|var)\s+))"#,
            )?,
            export_list: compile(r#"(?m)^([ \t]*)export\s*\{([^}]*)\}[ \t]*;?"#)?,
            dynamic_import: compile(r#"\bimport\s*\(\s*(['"][^'"\n]+['"])\s*\)"#)?,
            identifier: compile(r"^[A-Za-z_$][\w$]*$")?,
        })
    }

    /// Rewrite an ES module body
    pub fn lower(&self, code: &str) -> LoweredModule {
        let mut state = Lowering {
            getters: Vec::new(),
            star_sources: Vec::new(),
            has_default: false,
            counter: 0,
        };

        let code = self
            .export_from
            .replace_all(code, |caps: &Captures| self.lower_export_from(caps, &mut state))
            .into_owned();
        let code = self
            .import_from
            .replace_all(&code, |caps: &Captures| self.lower_import(caps, &mut state))
            .into_owned();
        let code = self
            .import_bare
            .replace_all(&code, |caps: &Captures| {
                format!("{}__esmbox_import({});", &caps[1], quote(&caps[2]))
            })
            .into_owned();
        let code = self
            .export_default
            .replace_all(&code, |caps: &Captures| lower_export_default(caps, &mut state))
            .into_owned();
        let code = self.lower_export_decls(&code, &mut state);
        let code = self
            .export_list
            .replace_all(&code, |caps: &Captures| {
                for (local, exported) in parse_specifier_list(&caps[2]) {
                    let getter = format!("() => {}", local);
                    state.export(&exported, getter);
                }
                caps[1].to_string()
            })
            .into_owned();
        let code = self.rewrite_dynamic_imports(&code, "__esmbox_import");

        let mut prologue =
            String::from("Object.defineProperty(__esmbox_exports, \"__esModule\", { value: true });\n");
        if !state.getters.is_empty() {
            let entries: Vec<String> = state
                .getters
                .iter()
                .map(|(name, getter)| format!("{}: {}", quote(name), getter))
                .collect();
            prologue.push_str(&format!(
                "__esmbox_define(__esmbox_exports, {{ {} }});\n",
                entries.join(", ")
            ));
        }

        let mut exports: Vec<String> = state.getters.iter().map(|(n, _)| n.clone()).collect();
        if state.has_default && !exports.iter().any(|n| n == "default") {
            exports.push("default".to_string());
        }

        LoweredModule {
            code: format!("{}{}", prologue, code),
            exports,
            star_sources: state.star_sources,
        }
    }

    /// Turn `import("spec")` into a promise over the module table
    pub fn rewrite_dynamic_imports(&self, code: &str, loader: &str) -> String {
        self.dynamic_import
            .replace_all(code, |caps: &Captures| {
                format!("Promise.resolve().then(() => {}({}))", loader, &caps[1])
            })
            .into_owned()
    }

    fn lower_export_from(&self, caps: &Captures, state: &mut Lowering) -> String {
        let indent = &caps[1];
        let spec = quote(&caps[5]);

        if let Some(ns) = caps.get(3) {
            let temp = state.temp("re");
            state.export(ns.as_str(), format!("() => {}", temp));
            return format!("{}var {} = __esmbox_import({});", indent, temp, spec);
        }

        if let Some(list) = caps.get(4) {
            let temp = state.temp("re");
            for (imported, exported) in parse_specifier_list(list.as_str()) {
                let getter = if imported == "default" {
                    format!("() => __esmbox_default({})", temp)
                } else {
                    format!("() => {}.{}", temp, imported)
                };
                state.export(&exported, getter);
            }
            return format!("{}var {} = __esmbox_import({});", indent, temp, spec);
        }

        state.star_sources.push(caps[5].to_string());
        format!(
            "{}__esmbox_reexport(__esmbox_exports, __esmbox_import({}));",
            indent, spec
        )
    }

    fn lower_import(&self, caps: &Captures, state: &mut Lowering) -> String {
        let indent = &caps[1];
        let clause = caps[2].trim();
        let spec = quote(&caps[3]);
        let temp = state.temp("m");

        let mut lines = vec![format!("{}const {} = __esmbox_import({});", indent, temp, spec)];

        let (default_part, rest) = if clause.starts_with('{') || clause.starts_with('*') {
            (None, clause)
        } else {
            match clause.split_once(',') {
                Some((d, r)) => (Some(d.trim()), r.trim()),
                None => (Some(clause), ""),
            }
        };

        if let Some(name) = default_part.filter(|n| self.identifier.is_match(n)) {
            lines.push(format!("const {} = __esmbox_default({});", name, temp));
        }

        if let Some(ns) = rest.strip_prefix('*') {
            let ns = ns.trim().trim_start_matches("as").trim();
            if self.identifier.is_match(ns) {
                lines.push(format!("const {} = {};", ns, temp));
            }
        } else if rest.starts_with('{') {
            let inner = rest.trim_start_matches('{').trim_end_matches('}');
            for (imported, local) in parse_specifier_list(inner) {
                if imported == "default" {
                    lines.push(format!("const {} = __esmbox_default({});", local, temp));
                } else {
                    lines.push(format!("const {} = {}.{};", local, temp, imported));
                }
            }
        }

        lines.join(" ")
    }

    /// Strip `export` from declarations; a `const`/`let`/`var` list can
    /// bind several names, so its declarators are read from the source
    fn lower_export_decls(&self, code: &str, state: &mut Lowering) -> String {
        let mut out = String::with_capacity(code.len());
        let mut last = 0;

        for caps in self.export_decl.captures_iter(code) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            out.push_str(&code[last..whole.start()]);
            out.push_str(&caps[1]);
            last = whole.end();

            if let (Some(text), Some(name)) = (caps.get(2), caps.get(3)) {
                state.export(name.as_str(), format!("() => {}", name.as_str()));
                out.push_str(text.as_str());
            } else if let (Some(text), Some(name)) = (caps.get(4), caps.get(5)) {
                state.export(name.as_str(), format!("() => {}", name.as_str()));
                out.push_str(text.as_str());
            } else if let Some(keyword) = caps.get(6) {
                for head in declarator_heads(&code[whole.end()..]) {
                    for name in binding_names(&head) {
                        if self.identifier.is_match(&name) {
                            let getter = format!("() => {}", name);
                            state.export(&name, getter);
                        }
                    }
                }
                out.push_str(keyword.as_str());
            } else {
                out.push_str(&whole.as_str()[caps[1].len()..]);
            }
        }

        out.push_str(&code[last..]);
        out
    }
}

/// Binding heads of a declarator list (`a = 1, { b } = o, c`), read up to
/// the `;` or line break that ends the statement
fn declarator_heads(list: &str) -> Vec<String> {
    let mut heads = Vec::new();
    let mut head = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut in_initializer = false;
    let mut previous = ' ';

    for c in list.chars() {
        if let Some(open) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == open {
                quote = None;
            }
            if !in_initializer {
                head.push(c);
            }
            previous = c;
            continue;
        }

        if depth == 0 {
            match c {
                ';' | ')' | ']' | '}' => break,
                // a trailing `,` or `=` carries the statement onto the next line
                '\n' if !matches!(previous, ',' | '=') => break,
                ',' => {
                    heads.push(std::mem::take(&mut head));
                    in_initializer = false;
                    previous = c;
                    continue;
                }
                '=' if !in_initializer => {
                    in_initializer = true;
                    previous = c;
                    continue;
                }
                _ => {}
            }
        }

        match c {
            '\'' | '"' | '`' => quote = Some(c),
            '{' | '[' | '(' => depth += 1,
            '}' | ']' | ')' => depth = depth.saturating_sub(1),
            _ => {}
        }
        if !in_initializer {
            head.push(c);
        }
        if !c.is_whitespace() {
            previous = c;
        }
    }
    heads.push(head);

    heads
        .into_iter()
        .map(|head| head.trim().to_string())
        .filter(|head| !head.is_empty())
        .collect()
}

fn lower_export_default(caps: &Captures, state: &mut Lowering) -> String {
    let indent = &caps[1];

    if let Some(function) = caps.get(2) {
        return match caps.get(3) {
            Some(name) => {
                state.export("default", format!("() => {}", name.as_str()));
                format!("{}{}{}", indent, function.as_str(), name.as_str())
            }
            None => {
                state.has_default = true;
                format!("{}__esmbox_exports.default = {}", indent, function.as_str())
            }
        };
    }

    if let Some(class) = caps.get(4) {
        return match caps.get(5).map(|m| m.as_str()) {
            Some(name) if name != "extends" => {
                state.export("default", format!("() => {}", name));
                format!("{}{}{}", indent, class.as_str(), name)
            }
            other => {
                state.has_default = true;
                format!(
                    "{}__esmbox_exports.default = {}{}",
                    indent,
                    class.as_str(),
                    other.unwrap_or("")
                )
            }
        };
    }

    state.has_default = true;
    format!("{}__esmbox_exports.default = ", indent)
}

/// Parse `a, b as c, default as d` into (source, target) pairs
fn parse_specifier_list(list: &str) -> Vec<(String, String)> {
    list.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            let parts: Vec<&str> = item.split_whitespace().collect();
            match parts.as_slice() {
                [source, "as", target] => (source.to_string(), target.to_string()),
                _ => (item.to_string(), item.to_string()),
            }
        })
        .collect()
}

/// Names bound by a declaration head: `x`, `{ a, b: c, ...d }` or `[e, f = 1]`
fn binding_names(pattern: &str) -> Vec<String> {
    let trimmed = pattern.trim();
    let is_object = trimmed.starts_with('{');
    if !is_object && !trimmed.starts_with('[') {
        return vec![trimmed.to_string()];
    }

    trimmed[1..trimmed.len().saturating_sub(1)]
        .split(',')
        .filter_map(|item| {
            let item = item.trim().trim_start_matches("...");
            let item = item.split('=').next().unwrap_or("").trim();
            let item = if is_object {
                item.rsplit(':').next().unwrap_or("").trim()
            } else {
                item
            };
            (!item.is_empty()).then(|| item.to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lower(code: &str) -> LoweredModule {
        EsmLowering::new().unwrap().lower(code)
    }

    #[test]
    fn test_lower_imports() {
        let out = lower(
            "import pad, { trim as t, default as d } from './pad.js';\nimport * as ns from \"./ns.js\";\nimport './side.js';\n",
        );
        assert!(out.code.contains("const __esmbox_m1 = __esmbox_import(\"./pad.js\");"));
        assert!(out.code.contains("const pad = __esmbox_default(__esmbox_m1);"));
        assert!(out.code.contains("const t = __esmbox_m1.trim;"));
        assert!(out.code.contains("const d = __esmbox_default(__esmbox_m1);"));
        assert!(out.code.contains("const ns = __esmbox_m2;"));
        assert!(out.code.contains("__esmbox_import(\"./side.js\");"));
        assert!(!out.code.contains("import "));
    }

    #[test]
    fn test_lower_exports() {
        let out = lower(
            "export function pad(s) { return s; }\nexport const WIDTH = 4, other = 1;\nexport class Box {}\nconst x = 1;\nexport { x as y };\nexport default pad;\n",
        );
        assert_eq!(out.exports, vec!["pad", "WIDTH", "other", "Box", "y", "default"]);
        assert!(out.code.contains("function pad(s)"));
        assert!(out.code.contains("const WIDTH = 4, other = 1;"));
        assert!(out.code.contains("\"y\": () => x"));
        assert!(out.code.contains("__esmbox_exports.default = pad;"));
        assert!(!out.code.contains("export "));
    }

    #[test]
    fn test_named_default_function_is_hoisted_getter() {
        let out = lower("export default function leftPad(str) { return str; }\n");
        assert!(out.code.contains("\"default\": () => leftPad"));
        assert!(out.code.contains("function leftPad(str)"));
        assert_eq!(out.exports, vec!["default"]);
    }

    #[test]
    fn test_anonymous_default_class_extends() {
        let out = lower("export default class extends Base {}\n");
        assert!(out.code.contains("__esmbox_exports.default = class extends Base {}"));
        assert_eq!(out.exports, vec!["default"]);
    }

    #[test]
    fn test_reexports() {
        let out = lower("export * from './all.js';\nexport { a, default as b } from './some.js';\nexport * as ns from './ns.js';\n");
        assert_eq!(out.star_sources, vec!["./all.js"]);
        assert!(out
            .code
            .contains("__esmbox_reexport(__esmbox_exports, __esmbox_import(\"./all.js\"));"));
        assert!(out.code.contains("\"a\": () => __esmbox_re1.a"));
        assert!(out.code.contains("\"b\": () => __esmbox_default(__esmbox_re1)"));
        assert!(out.code.contains("\"ns\": () => __esmbox_re2"));
    }

    #[test]
    fn test_destructured_export_names() {
        assert_eq!(binding_names("{ a, b: c, ...rest }"), vec!["a", "c", "rest"]);
        assert_eq!(binding_names("[first, second = 2]"), vec!["first", "second"]);
        assert_eq!(binding_names("plain"), vec!["plain"]);
    }

    #[test]
    fn test_every_declarator_is_exported() {
        let out = lower(
            "export { m as n } from './m.js';\nexport const a = 1, b = 2;\nexport let c = fn(1, 2), d = { x: [1, 2] }, e;\nexport const { f, g: h } = obj, [i, j = 1] = arr;\nexport var k = 'x,y', l = `${a},${b}`;\nexport const m =\n  3,\n  o = 4;\n",
        );
        assert_eq!(
            out.exports,
            vec!["n", "a", "b", "c", "d", "e", "f", "h", "i", "j", "k", "l", "m", "o"]
        );
        for name in ["a", "b", "c", "d", "e", "f", "h", "i", "j", "k", "l", "m", "o"] {
            assert!(
                out.code.contains(&format!("\"{}\": () => {}", name, name)),
                "missing getter for {}",
                name
            );
        }
        assert!(out.code.contains("let c = fn(1, 2), d = { x: [1, 2] }, e;"));
        assert!(!out.code.contains("export "));
    }

    #[test]
    fn test_declarator_heads_stop_at_statement_end() {
        assert_eq!(declarator_heads(" a = 1, b = 2;\nconst z = 3;"), vec!["a", "b"]);
        assert_eq!(declarator_heads(" x = (1, 2)\nfoo(3, 4)"), vec!["x"]);
        assert_eq!(
            declarator_heads(" { p, q } = r, s = \"t;u\", v"),
            vec!["{ p, q }", "s", "v"]
        );
    }

    #[test]
    fn test_dynamic_import_rewrite() {
        let lowering = EsmLowering::new().unwrap();
        let out = lowering.rewrite_dynamic_imports("const m = import('./lazy.js');", "require");
        assert_eq!(out, "const m = Promise.resolve().then(() => require('./lazy.js'));");
    }
}
