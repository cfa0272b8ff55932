pub mod board;
pub mod card;
pub mod precompile;
pub mod search;

use anyhow::Context;
use kanban_core::store::ContentStore;
use std::path::Path;

pub(crate) fn open_store(root: &Path) -> anyhow::Result<ContentStore> {
    ContentStore::open(root)
        .with_context(|| format!("failed to load configuration under {}", root.display()))
}
