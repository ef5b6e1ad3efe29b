use crate::bundler::core::{BundleBackend, BundleOptions};
use crate::bundler::minifier::Minifier;
use crate::bundler::parser::{JsParser, ModuleFormat};
use crate::bundler::resolver::{DependencyResolver, ModuleGraph};
use crate::bundler::transform::EsmLowering;
use esmbox_core::{EsmError, EsmResult};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

/// In-process bundler for plain JavaScript packages
///
/// Every module becomes a factory in a module table; the entry module's
/// exports are re-exported as ES exports at the end of the bundle.
/// TypeScript sources are rejected, use the esbuild backend for those.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeBackend;

impl NativeBackend {
    pub fn new() -> Self {
        Self
    }
}

impl BundleBackend for NativeBackend {
    fn name(&self) -> &'static str {
        "native"
    }

    fn bundle(
        &self,
        root: &Path,
        entry: &Path,
        output_file: &Path,
        options: &BundleOptions,
    ) -> EsmResult<()> {
        let resolver = DependencyResolver::new(root)?;
        let graph = resolver.resolve(entry)?;
        tracing::debug!(modules = graph.modules.len(), entry = %graph.entry, "module graph resolved");

        let mut source = generate_bundle(&graph)?;
        if options.minify {
            source = Minifier::new().minify(&source);
            source.push('\n');
        }

        fs::write(output_file, source).map_err(|e| {
            EsmError::BundleFailed(format!("Failed to write {}: {}", output_file.display(), e))
        })?;

        Ok(())
    }
}

const RUNTIME: &str = r#"const __esmbox_modules = {};
const __esmbox_cache = {};
var process = globalThis.process || { env: { NODE_ENV: "production" } };
var global = globalThis;
function __esmbox_load(id) {
  const cached = __esmbox_cache[id];
  if (cached) return cached.exports;
  const [factory, deps] = __esmbox_modules[id];
  const module = { exports: {} };
  __esmbox_cache[id] = module;
  const require = (spec) => {
    const target = deps[spec];
    if (target === undefined) throw new Error("Cannot find module '" + spec + "' from '" + id + "'");
    return __esmbox_load(target);
  };
  factory.call(module.exports, module, module.exports, require);
  return module.exports;
}
function __esmbox_default(m) {
  return m && m.__esModule ? m.default : m;
}
function __esmbox_define(target, getters) {
  for (const key of Object.keys(getters)) {
    Object.defineProperty(target, key, { enumerable: true, get: getters[key] });
  }
}
function __esmbox_reexport(target, source) {
  for (const key of Object.keys(source)) {
    if (key === "default" || key === "__esModule" || key in target) continue;
    Object.defineProperty(target, key, { enumerable: true, get: () => source[key] });
  }
}
"#;

const COMMONJS_PARAMS: &str = "module, exports, require";
const ESM_PARAMS: &str = "__esmbox_module, __esmbox_exports, __esmbox_import";

/// Export surface of one module, as far as static analysis can tell
struct ExportInfo {
    names: Vec<String>,
    star_sources: Vec<String>,
    has_default: bool,
}

/// Render a resolved module graph as a single ES module
pub fn generate_bundle(graph: &ModuleGraph) -> EsmResult<String> {
    let parser = JsParser::new()?;
    let lowering = EsmLowering::new()?;

    let mut bundle = String::from(RUNTIME);
    let mut exports: BTreeMap<&str, ExportInfo> = BTreeMap::new();

    for (id, record) in &graph.modules {
        let (params, body, info) = match record.format {
            ModuleFormat::Json => (
                COMMONJS_PARAMS,
                format!("module.exports = {};", record.code.trim()),
                ExportInfo {
                    names: Vec::new(),
                    star_sources: Vec::new(),
                    has_default: true,
                },
            ),
            ModuleFormat::CommonJs => (
                COMMONJS_PARAMS,
                lowering.rewrite_dynamic_imports(&record.code, "require"),
                ExportInfo {
                    names: parser.commonjs_exports(&record.code),
                    star_sources: Vec::new(),
                    has_default: true,
                },
            ),
            ModuleFormat::Esm => {
                let lowered = lowering.lower(&record.code);
                let has_default = lowered.exports.iter().any(|n| n == "default");
                let names = lowered
                    .exports
                    .into_iter()
                    .filter(|n| n != "default")
                    .collect();
                (
                    ESM_PARAMS,
                    lowered.code,
                    ExportInfo {
                        names,
                        star_sources: lowered.star_sources,
                        has_default,
                    },
                )
            }
        };

        let deps = serde_json::to_string(&record.dependencies)?;
        bundle.push_str(&format!(
            "\n// {}\n__esmbox_modules[{}] = [function ({}) {{\n{}\n}}, {}];\n",
            id,
            serde_json::to_string(id)?,
            params,
            body.trim_end(),
            deps
        ));
        exports.insert(id.as_str(), info);
    }

    let entry = graph.entry.as_str();
    bundle.push_str(&format!(
        "\nconst __esmbox_entry = __esmbox_load({});\n",
        serde_json::to_string(entry)?
    ));

    let entry_info = exports.get(entry).ok_or_else(|| {
        EsmError::BundleFailed(format!("Entry module \"{}\" missing from graph", entry))
    })?;
    if entry_info.has_default {
        bundle.push_str("export default __esmbox_default(__esmbox_entry);\n");
    }

    let mut visited = HashSet::new();
    let names = collect_names(graph, &exports, entry, &mut visited);
    for (i, name) in names.iter().enumerate() {
        bundle.push_str(&format!(
            "const __esmbox_e{i} = __esmbox_entry[{}];\nexport {{ __esmbox_e{i} as {} }};\n",
            serde_json::to_string(name)?,
            name
        ));
    }

    Ok(bundle)
}

/// Named exports of a module, following `export * from` chains
fn collect_names<'a>(
    graph: &'a ModuleGraph,
    exports: &BTreeMap<&str, ExportInfo>,
    id: &'a str,
    visited: &mut HashSet<&'a str>,
) -> Vec<String> {
    if !visited.insert(id) {
        return Vec::new();
    }
    let (Some(info), Some(record)) = (exports.get(id), graph.modules.get(id)) else {
        return Vec::new();
    };

    let mut names: Vec<String> = info
        .names
        .iter()
        .filter(|n| is_export_name(n))
        .cloned()
        .collect();

    for spec in &info.star_sources {
        let Some(target) = record.dependencies.get(spec) else {
            continue;
        };
        for name in collect_names(graph, exports, target, visited) {
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }

    names
}

fn is_export_name(name: &str) -> bool {
    let mut chars = name.chars();
    let starts_ok = chars
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        .unwrap_or(false);
    starts_ok && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}
