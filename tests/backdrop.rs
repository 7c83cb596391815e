use std::{fs, path::Path};

use deskmenu::backdrop::{choose_next, DecodableImage, RandomRotation};
use rand::{rngs::StdRng, SeedableRng};
use tempfile::TempDir;

// 1x1 transparent PNG.
const PNG: &[u8] = &[
    0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1f, 0x15, 0xc4,
    0x89, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9c, 0x63, 0x00, 0x01, 0x00, 0x00,
    0x05, 0x00, 0x01, 0x0d, 0x0a, 0x2d, 0xb4, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4e, 0x44, 0xae,
    0x42, 0x60, 0x82,
];

fn wallpapers(dir: &Path) {
    fs::write(dir.join("a.png"), PNG).unwrap();
    fs::write(dir.join("b.txt"), "not an image").unwrap();
    fs::write(dir.join("c.png"), PNG).unwrap();
    fs::write(dir.join("d.jpg"), "truncated").unwrap();
}

#[test]
fn next_skips_files_that_do_not_decode() {
    let tmp = TempDir::new().unwrap();
    wallpapers(tmp.path());

    let next = choose_next(&tmp.path().join("a.png"), &DecodableImage).unwrap();
    assert_eq!(next, tmp.path().join("c.png"));

    // Wraps past the broken tail back to the start.
    let next = choose_next(&next, &DecodableImage).unwrap();
    assert_eq!(next, tmp.path().join("a.png"));
}

#[test]
fn next_starts_over_when_current_vanished() {
    let tmp = TempDir::new().unwrap();
    wallpapers(tmp.path());

    let next = choose_next(&tmp.path().join("gone.png"), &DecodableImage).unwrap();
    assert_eq!(next, tmp.path().join("c.png"));
}

#[test]
fn random_only_returns_decodable_images() {
    let tmp = TempDir::new().unwrap();
    wallpapers(tmp.path());

    let mut rotation = RandomRotation::with_rng(StdRng::seed_from_u64(11));
    let current = tmp.path().join("a.png");
    let mut last = None;
    for _ in 0..20 {
        if let Some(pick) = rotation.choose(&current, &DecodableImage) {
            assert!(pick.extension().is_some_and(|e| e == "png"));
            assert_ne!(Some(&pick), last.as_ref());
            last = Some(pick);
        }
    }
}

#[test]
fn empty_directory_has_no_backdrop() {
    let tmp = TempDir::new().unwrap();
    let current = tmp.path().join("missing.png");
    assert_eq!(choose_next(&current, &DecodableImage), None);
    assert_eq!(RandomRotation::new().choose(&current, &DecodableImage), None);
}
