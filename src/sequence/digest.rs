use std::path::Path;

use xxhash_rust::xxh3::xxh3_64;

use crate::foundation::core::SeqIndex;
use crate::foundation::error::{QuakereelError, QuakereelResult};
use crate::sequence::store::FrameStore;

/// Content fingerprint of a file.
pub fn digest_file(path: &Path) -> QuakereelResult<u64> {
    let bytes = std::fs::read(path).map_err(|e| {
        QuakereelError::sequence(format!("read '{}' for digest: {e}", path.display()))
    })?;
    Ok(xxh3_64(&bytes))
}

/// Fingerprints of the frames `start..end`, in index order.
pub fn digest_frames(store: &FrameStore, start: u64, end: u64) -> QuakereelResult<Vec<u64>> {
    (start..end)
        .map(|i| digest_file(&store.frame_path(SeqIndex(i))))
        .collect()
}
