pub mod assets;
pub mod batch;
pub mod converter;
pub mod entry;
pub mod fetcher;
pub mod request;
pub mod root;
// manifest lives in esmbox-core, re-exported here for callers of the pipeline
pub mod manifest {
    pub use esmbox_core::package::manifest::*;
}

pub use assets::{AssetMode, AssetReport, AssetSelector};
pub use batch::{convert_all, manifest_requests, BatchResult};
pub use converter::{list_outputs, remove_outputs, ConversionOutput, ConvertOptions, PackageConverter};
pub use entry::{resolve_entry, EntryPolicy, EntryResolution, EntryRule};
pub use fetcher::ArchiveFetcher;
pub use manifest::ProjectManifest;
pub use request::PackageRequest;
pub use root::locate_root;
