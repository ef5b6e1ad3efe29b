use crate::core::{EsmError, EsmResult};
use serde_json::Value;
use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// One way of locating a package's entry file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryRule {
    /// `exports` map: `default`, then `require`
    Exports,
    /// Conventional build output: `dist/index.js`, `dist/index.cjs`
    DistBuild,
    /// `source`, `main`, then bare `index.js`/`index.ts`
    Fields,
}

/// Rules in priority order
pub const ENTRY_RULES: [EntryRule; 3] = [EntryRule::Exports, EntryRule::DistBuild, EntryRule::Fields];

const EXPORT_CONDITIONS: [&str; 2] = ["default", "require"];

impl fmt::Display for EntryRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryRule::Exports => write!(f, "exports"),
            EntryRule::DistBuild => write!(f, "dist"),
            EntryRule::Fields => write!(f, "fields"),
        }
    }
}

impl EntryRule {
    /// Candidate paths (relative to the package root), in the order tried
    pub fn candidates(&self, descriptor: &Value) -> Vec<String> {
        match self {
            EntryRule::Exports => match descriptor.get("exports") {
                Some(exports) => export_paths(root_export(exports)),
                None => Vec::new(),
            },
            EntryRule::DistBuild => vec!["dist/index.js".to_string(), "dist/index.cjs".to_string()],
            EntryRule::Fields => {
                let mut paths: Vec<String> = ["source", "main"]
                    .iter()
                    .filter_map(|field| descriptor.get(field).and_then(Value::as_str))
                    .map(str::to_string)
                    .collect();
                paths.push("index.js".to_string());
                paths.push("index.ts".to_string());
                paths
            }
        }
    }

    /// First candidate that exists as a file under `root`
    pub fn apply(&self, root: &Path, descriptor: &Value) -> Option<PathBuf> {
        self.candidates(descriptor)
            .iter()
            .filter(|candidate| stays_inside(candidate))
            .map(|candidate| root.join(candidate))
            .find(|path| path.is_file())
    }
}

/// `exports["."]` when the map is keyed by subpath, otherwise the map itself
fn root_export(exports: &Value) -> &Value {
    match exports {
        Value::Object(map) if map.keys().any(|k| k.starts_with('.')) => {
            map.get(".").unwrap_or(&Value::Null)
        }
        other => other,
    }
}

fn export_paths(value: &Value) -> Vec<String> {
    match value {
        Value::String(path) => vec![path.clone()],
        Value::Array(items) => items.iter().flat_map(export_paths).collect(),
        Value::Object(map) => EXPORT_CONDITIONS
            .iter()
            .filter_map(|condition| map.get(*condition))
            .flat_map(export_paths)
            .collect(),
        _ => Vec::new(),
    }
}

fn stays_inside(candidate: &str) -> bool {
    Path::new(candidate)
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// What to do when no rule finds an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntryPolicy {
    /// Missing entry is an `EntryNotFound` error
    Strict,
    /// Missing entry is fine (assets-only packages)
    #[default]
    Permissive,
}

/// Outcome of entry resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryResolution {
    pub chosen: Option<PathBuf>,
    pub rule: Option<EntryRule>,
}

/// Read the package descriptor at `root/package.json`
pub fn read_descriptor(root: &Path) -> EsmResult<Value> {
    let content = fs::read_to_string(root.join("package.json"))?;
    Ok(serde_json::from_str(&content)?)
}

/// Run the rules in order, stopping at the first existing file
pub fn resolve_entry(root: &Path, policy: EntryPolicy) -> EsmResult<EntryResolution> {
    let descriptor = read_descriptor(root)?;

    for rule in ENTRY_RULES {
        if let Some(chosen) = rule.apply(root, &descriptor) {
            tracing::debug!(%rule, entry = %chosen.display(), "entry resolved");
            return Ok(EntryResolution {
                chosen: Some(chosen),
                rule: Some(rule),
            });
        }
    }

    match policy {
        EntryPolicy::Strict => Err(EsmError::EntryNotFound(root.to_path_buf())),
        EntryPolicy::Permissive => Ok(EntryResolution {
            chosen: None,
            rule: None,
        }),
    }
}
