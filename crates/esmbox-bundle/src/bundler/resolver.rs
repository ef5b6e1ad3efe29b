use crate::bundler::minifier::Minifier;
use crate::bundler::parser::{JsParser, ModuleFormat};
use esmbox_core::{EsmError, EsmResult};
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

/// Extensions probed (in order) for extensionless specifiers
pub const DEFAULT_EXTENSIONS: &[&str] = &[".js", ".mjs", ".cjs", ".json", ".ts", ".tsx", ".mts", ".cts"];

const TYPESCRIPT_EXTENSIONS: &[&str] = &["ts", "tsx", "mts", "cts"];

/// One file in the module graph
#[derive(Debug, Clone)]
pub struct ModuleRecord {
    /// Path relative to the package root, forward slashes
    pub id: String,
    pub path: PathBuf,
    pub format: ModuleFormat,
    /// Source with comments and any shebang removed
    pub code: String,
    /// Specifier as written -> module id
    pub dependencies: BTreeMap<String, String>,
}

/// Every module reachable from the entry point
#[derive(Debug, Clone)]
pub struct ModuleGraph {
    pub entry: String,
    pub modules: BTreeMap<String, ModuleRecord>,
}

/// Resolves all module dependencies inside one package root
pub struct DependencyResolver {
    root: PathBuf,
    package_name: Option<String>,
    parser: JsParser,
    minifier: Minifier,
}

impl DependencyResolver {
    pub fn new(root: &Path) -> EsmResult<Self> {
        let root = root.canonicalize()?;
        let package_name = read_package_json(&root)
            .and_then(|pkg| pkg.get("name").and_then(|n| n.as_str()).map(str::to_string));

        Ok(Self {
            root,
            package_name,
            parser: JsParser::new()?,
            minifier: Minifier::new(),
        })
    }

    /// Walk the graph from `entry`, failing with every unresolved specifier
    pub fn resolve(&self, entry: &Path) -> EsmResult<ModuleGraph> {
        let entry = entry.canonicalize()?;
        let entry_id = self.module_id(&entry)?;

        let mut modules = BTreeMap::new();
        let mut diagnostics = Vec::new();
        let mut seen: HashSet<PathBuf> = HashSet::new();
        let mut queue = VecDeque::from([entry]);

        while let Some(path) = queue.pop_front() {
            if !seen.insert(path.clone()) {
                continue;
            }
            let id = self.module_id(&path)?;

            if is_typescript(&path) {
                diagnostics.push(format!(
                    "TypeScript module \"{}\" needs transpilation (use the esbuild backend)",
                    id
                ));
                continue;
            }

            let raw = fs::read_to_string(&path).map_err(|e| {
                EsmError::BundleFailed(format!("Failed to read \"{}\": {}", id, e))
            })?;

            let (format, code) = if path.extension().and_then(|e| e.to_str()) == Some("json") {
                (ModuleFormat::Json, raw)
            } else {
                let code = self.minifier.strip_comments(strip_shebang(&raw));
                (self.parser.detect_format(&code), code)
            };

            let mut dependencies = BTreeMap::new();
            if format != ModuleFormat::Json {
                for spec in self.parser.extract_specifiers(&code) {
                    match self.resolve_specifier(&path, &spec) {
                        Some(target) => {
                            dependencies.insert(spec, self.module_id(&target)?);
                            queue.push_back(target);
                        }
                        None => diagnostics.push(format!(
                            "Could not resolve \"{}\" from \"{}\"",
                            spec, id
                        )),
                    }
                }
            }

            tracing::debug!(module = %id, deps = dependencies.len(), "resolved module");
            modules.insert(
                id.clone(),
                ModuleRecord {
                    id,
                    path,
                    format,
                    code,
                    dependencies,
                },
            );
        }

        if !diagnostics.is_empty() {
            return Err(EsmError::BundleFailed(diagnostics.join("\n")));
        }

        Ok(ModuleGraph {
            entry: entry_id,
            modules,
        })
    }

    /// Resolve one specifier as written in `from`
    pub fn resolve_specifier(&self, from: &Path, spec: &str) -> Option<PathBuf> {
        let from_dir = from.parent().unwrap_or(self.root.as_path());

        let resolved = if spec == "." || spec == ".." || spec.starts_with("./") || spec.starts_with("../") {
            resolve_path(&from_dir.join(spec))
        } else if let Some(rooted) = spec.strip_prefix('/') {
            resolve_path(&self.root.join(rooted))
        } else if spec.starts_with("node:") {
            None
        } else {
            self.resolve_bare(from_dir, spec)
        };
        let resolved = resolved?;

        // Anything outside the package root breaks the self-contained bundle
        let canonical = resolved.canonicalize().ok()?;
        canonical.starts_with(&self.root).then_some(canonical)
    }

    /// Bare specifiers: the package itself, or `node_modules` below the root
    fn resolve_bare(&self, from_dir: &Path, spec: &str) -> Option<PathBuf> {
        let (pkg_name, subpath) = parse_bare_specifier(spec);

        if self.package_name.as_deref() == Some(pkg_name) {
            return match subpath {
                Some(sub) => resolve_path(&self.root.join(sub)),
                None => resolve_directory(&self.root),
            };
        }

        let mut current = Some(from_dir);
        while let Some(dir) = current {
            if !dir.starts_with(&self.root) {
                break;
            }
            let candidate = dir.join("node_modules").join(pkg_name);
            if candidate.is_dir() {
                return match subpath {
                    Some(sub) => resolve_path(&candidate.join(sub)),
                    None => resolve_directory(&candidate),
                };
            }
            current = dir.parent();
        }

        None
    }

    fn module_id(&self, path: &Path) -> EsmResult<String> {
        let rel = path.strip_prefix(&self.root).map_err(|_| {
            EsmError::Path(format!(
                "Path {} is not within package root {}",
                path.display(),
                self.root.display()
            ))
        })?;

        Ok(rel.to_string_lossy().replace('\\', "/"))
    }
}

/// Entry a package directory would be imported as (`browser`, `module`, `main`, `index.*`)
pub fn default_entry(package_dir: &Path) -> Option<PathBuf> {
    resolve_directory(package_dir)
}

/// Exact file, then extension probing, then directory resolution
fn resolve_path(base: &Path) -> Option<PathBuf> {
    if base.is_file() {
        return Some(base.to_path_buf());
    }

    if let Some(found) = probe_extensions(base) {
        return Some(found);
    }

    if base.is_dir() {
        return resolve_directory(base);
    }

    None
}

/// Directory: package.json `browser`/`module`/`main`, then `index.*`
fn resolve_directory(dir: &Path) -> Option<PathBuf> {
    if let Some(pkg) = read_package_json(dir) {
        for field in ["browser", "module", "main"] {
            let Some(target) = pkg.get(field).and_then(|v| v.as_str()) else {
                continue;
            };
            let target_path = dir.join(target);
            if target_path.is_file() {
                return Some(target_path);
            }
            if let Some(found) = probe_extensions(&target_path) {
                return Some(found);
            }
            if target_path.is_dir() && !same_dir(&target_path, dir) {
                if let Some(found) = probe_index(&target_path) {
                    return Some(found);
                }
            }
        }
    }

    probe_index(dir)
}

fn probe_extensions(base: &Path) -> Option<PathBuf> {
    for ext in DEFAULT_EXTENSIONS {
        let mut with_ext: OsString = base.as_os_str().to_os_string();
        with_ext.push(ext);
        let candidate = PathBuf::from(with_ext);
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}

fn probe_index(dir: &Path) -> Option<PathBuf> {
    DEFAULT_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("index{}", ext)))
        .find(|index| index.is_file())
}

fn same_dir(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn read_package_json(dir: &Path) -> Option<serde_json::Value> {
    let content = fs::read_to_string(dir.join("package.json")).ok()?;
    serde_json::from_str(&content).ok()
}

fn strip_shebang(source: &str) -> &str {
    if source.starts_with("#!") {
        source.find('\n').map(|i| &source[i..]).unwrap_or("")
    } else {
        source
    }
}

/// True for `.ts`, `.tsx`, `.mts` and `.cts` files
pub fn is_typescript(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| TYPESCRIPT_EXTENSIONS.contains(&e))
        .unwrap_or(false)
}

/// Split a bare specifier into package name and optional subpath
///
/// `lodash/fp` -> (`lodash`, `fp`), `@scope/pkg/sub` -> (`@scope/pkg`, `sub`)
pub fn parse_bare_specifier(spec: &str) -> (&str, Option<&str>) {
    let name_end = if spec.starts_with('@') {
        spec.match_indices('/').nth(1).map(|(i, _)| i)
    } else {
        spec.find('/')
    };

    match name_end {
        Some(i) => (&spec[..i], Some(&spec[i + 1..])),
        None => (spec, None),
    }
}
