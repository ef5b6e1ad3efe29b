pub mod core;
pub mod esbuild;
pub mod minifier;
pub mod native;
pub mod parser;
pub mod resolver;
pub mod transform;

pub use core::{BackendChoice, BundleBackend, BundleOptions, Bundler};
pub use esbuild::EsbuildBackend;
pub use native::NativeBackend;
