use std::{
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::{debug, warn};

pub mod listing;
pub mod validity;

pub use listing::list_files_in_dir;
pub use validity::{DecodableImage, ImageOracle};

/// Picks the next valid image after `current` in its directory, wrapping around.
///
/// `current` does not have to exist any more; if it is not found the scan
/// starts from the first entry. When nothing else validates the starting
/// entry comes back unchanged. Only an empty directory yields `None`.
pub fn choose_next(current: &Path, oracle: &dyn ImageOracle) -> Option<PathBuf> {
    let files = list_files_in_dir(containing_dir(current));
    if files.is_empty() {
        return None;
    }

    let start = position_of(&files, current).unwrap_or(0);
    let mut idx = start;
    loop {
        idx = (idx + 1) % files.len();
        if idx == start || oracle.is_valid(&files[idx]) {
            break;
        }
    }

    debug!(from = %current.display(), to = %files[idx].display(), "next backdrop");
    Some(files[idx].clone())
}

/// Random backdrop selection that never shows the same image twice in a row.
///
/// Each rotation owns its generator and its "previous" slot, so two rotations
/// over different directories do not influence each other.
#[derive(Debug, Default)]
pub struct RandomRotation {
    rng: Option<StdRng>,
    previous: Option<usize>,
}

impl RandomRotation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a caller-provided generator instead of the clock/pid seed.
    pub fn with_rng(rng: StdRng) -> Self {
        Self {
            rng: Some(rng),
            previous: None,
        }
    }

    pub fn previous_index(&self) -> Option<usize> {
        self.previous
    }

    /// Draws a random valid image from the directory containing `current`.
    ///
    /// A single-entry directory returns that entry without asking the oracle.
    /// Otherwise at most `n` candidates are tried before giving up.
    pub fn choose(&mut self, current: &Path, oracle: &dyn ImageOracle) -> Option<PathBuf> {
        let files = list_files_in_dir(containing_dir(current));
        let n = files.len();
        match n {
            0 => return None,
            1 => return files.into_iter().next(),
            _ => {}
        }

        let previous = self.previous;
        let rng = self.rng.get_or_insert_with(clock_seeded_rng);

        for _ in 0..n {
            let idx = loop {
                let candidate = rng.gen_range(0..n);
                if Some(candidate) != previous {
                    break candidate;
                }
            };

            if oracle.is_valid(&files[idx]) {
                self.previous = Some(idx);
                return Some(files[idx].clone());
            }
        }

        warn!(
            dir = %containing_dir(current).display(),
            "unable to find a good image in the list; giving up"
        );
        None
    }
}

fn clock_seeded_rng() -> StdRng {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    let pid = u64::from(std::process::id());
    StdRng::seed_from_u64(secs ^ (pid + (pid << 15)))
}

fn containing_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    }
}

fn position_of(files: &[PathBuf], current: &Path) -> Option<usize> {
    let name = current.file_name()?;
    files.iter().position(|f| f.file_name() == Some(name))
}
