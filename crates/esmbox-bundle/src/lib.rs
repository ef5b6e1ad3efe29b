//! Bundle an npm package directory into a single browser-ready ES module

pub mod bundler;

pub use bundler::{BackendChoice, BundleBackend, BundleOptions, Bundler, EsbuildBackend, NativeBackend};
