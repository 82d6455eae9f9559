//! Build-time resource manifest
//!
//! The manifest maps every servable resource path to the fingerprint the
//! build pipeline computed for it. A distinguished CORE subset lists the
//! application shell that must be present before first render.
//!
//! Both are produced outside this crate and loaded once, read-only, from an
//! asset bundle:
//!
//! ```json
//! {
//!   "resources": { "/": "3f2a...", "index.html": "3f2a...", "main.js": "9bc1..." },
//!   "core": ["main.js", "index.html"]
//! }
//! ```

pub mod record;
pub mod registry;

pub use record::{PersistedManifestRecord, MANIFEST_RECORD_KEY};
pub use registry::{CoreSet, ManifestRegistry, ResourceManifest, ROOT_KEY};
