//! Persistence of chunked documents
//!
//! Layout for one document directory with `preserve_structure` enabled:
//!
//! ```text
//! index.json
//! report.json                         # per-phase statistics and warnings
//! chunk_0000.txt                      # root body, if any
//! chapter_1_setup/metadata.json
//! chapter_1_setup/chunk_0000.txt
//! chapter_1_setup/1_1_requirements/chunk_0000.txt
//! ```
//!
//! With `preserve_structure` disabled every file lands in the document
//! directory and the node path is folded into the name
//! (`chapter_1_setup__1_1_requirements__chunk_0000.txt`).

mod manifest;
mod writer;

pub use manifest::{DocumentManifest, ManifestNode, ProcessingReport};
pub use writer::{OutputWriter, WriteReport};
