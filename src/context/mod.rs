//! Workspace context assembly.
//!
//! Produces the deterministic, bounded snapshot of a filesystem tree that is
//! handed to the model as authoritative workspace state: an ordered, filtered
//! file list under caps, an ASCII directory tree, a markdown bundle of file
//! excerpts, and a parallel attachment list.

mod lang;
mod snapshot;
mod tree;
mod walker;

pub use lang::{
    allowed_file, allowed_file_for_lang, detect_prompt_language, ext_for_lang, fence_lang_from_ext,
    mime_for_path,
};
pub use snapshot::{build_snapshot, collect_attachments, human_size, ContextSnapshot};
pub use tree::render_tree;
pub use walker::{collect_entries, is_ignored_dir, FileEntry, SnapshotCaps};
