pub mod client;
pub mod document;

pub use client::RegistryClient;
pub use document::{PackageDocument, ResolvedVersion};
