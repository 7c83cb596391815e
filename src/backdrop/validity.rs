use std::path::Path;

use image::ImageReader;

/// Decides whether a file can be shown as a backdrop.
pub trait ImageOracle {
    fn is_valid(&self, path: &Path) -> bool;
}

impl<F> ImageOracle for F
where
    F: Fn(&Path) -> bool,
{
    fn is_valid(&self, path: &Path) -> bool {
        self(path)
    }
}

/// Accepts any file whose header the `image` decoders understand.
///
/// Only the header is read, the pixels are never decoded.
#[derive(Debug, Default, Clone, Copy)]
pub struct DecodableImage;

impl ImageOracle for DecodableImage {
    fn is_valid(&self, path: &Path) -> bool {
        let Ok(reader) = ImageReader::open(path) else {
            return false;
        };
        let Ok(reader) = reader.with_guessed_format() else {
            return false;
        };
        reader.format().is_some() && reader.into_dimensions().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    // 1x1 transparent PNG.
    const TINY_PNG: &[u8] = &[
        0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44,
        0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1f,
        0x15, 0xc4, 0x89, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9c, 0x63, 0x00,
        0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0d, 0x0a, 0x2d, 0xb4, 0x00, 0x00, 0x00, 0x00, 0x49,
        0x45, 0x4e, 0x44, 0xae, 0x42, 0x60, 0x82,
    ];

    #[test]
    fn png_header_is_valid_even_with_wrong_extension() {
        let tmp = tempfile::TempDir::new().expect("temp dir");
        let path = tmp.path().join("picture.dat");
        fs::write(&path, TINY_PNG).expect("write");
        assert!(DecodableImage.is_valid(&path));
    }

    #[test]
    fn text_and_missing_files_are_invalid() {
        let tmp = tempfile::TempDir::new().expect("temp dir");
        let path = tmp.path().join("notes.txt");
        fs::write(&path, b"not an image").expect("write");
        assert!(!DecodableImage.is_valid(&path));
        assert!(!DecodableImage.is_valid(&tmp.path().join("gone.png")));
        assert!(!DecodableImage.is_valid(tmp.path()));
    }

    #[test]
    fn closures_are_oracles() {
        let only_png = |p: &Path| p.extension().is_some_and(|e| e == "png");
        assert!(only_png.is_valid(Path::new("/x/a.png")));
        assert!(!only_png.is_valid(Path::new("/x/c.txt")));
    }
}
