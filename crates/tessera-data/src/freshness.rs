//! Mtime-based freshness checks for derived files.

use std::path::Path;
use std::time::SystemTime;

/// Modification time of a path, or `None` if it cannot be read.
pub fn get_mtime(path: &Path) -> Option<SystemTime> {
    path.metadata().and_then(|m| m.modified()).ok()
}

/// Check whether `output` is strictly newer than every path in `inputs`.
///
/// Equal timestamps count as stale: on filesystems with coarse mtime
/// resolution a same-tick edit must still trigger a rebuild.
pub fn is_newer_than_all<'a, I>(output: &Path, inputs: I) -> bool
where
    I: IntoIterator<Item = &'a Path>,
{
    let Some(output_time) = get_mtime(output) else {
        return false;
    };

    inputs
        .into_iter()
        .all(|input| get_mtime(input).is_some_and(|t| t < output_time))
}

/// Check if `output` exists and is at least as new as `source`.
pub fn is_output_fresh(output: &Path, source: &Path) -> bool {
    match (get_mtime(output), get_mtime(source)) {
        (Some(out), Some(src)) => out >= src,
        _ => false,
    }
}
