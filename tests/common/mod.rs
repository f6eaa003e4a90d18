#![allow(dead_code)]

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// A temp directory tree of media fixtures.
pub struct MediaTree {
    pub dir: TempDir,
}

impl MediaTree {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, relative_path: &str, bytes: &[u8]) -> PathBuf {
        let path = self.dir.path().join(relative_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        fs::write(&path, bytes).expect("Failed to write file");
        path
    }

    pub fn png(&self, relative_path: &str) -> PathBuf {
        self.write(relative_path, &png_bytes())
    }

    pub fn truncated_png(&self, relative_path: &str) -> PathBuf {
        self.write(relative_path, &png_bytes()[..20])
    }

    pub fn empty(&self, relative_path: &str) -> PathBuf {
        self.write(relative_path, b"")
    }

    /// Three good PNGs, one truncated PNG, one empty PNG, one non-media file.
    pub fn standard() -> Self {
        let tree = Self::new();
        tree.png("a.png");
        tree.png("shots/b.png");
        tree.png("shots/deep/c.png");
        tree.truncated_png("shots/broken.png");
        tree.empty("empty.png");
        tree.write("README.txt", b"not media");
        tree
    }
}

pub fn png_bytes() -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    image::RgbImage::from_pixel(1, 1, image::Rgb([200, 100, 50]))
        .write_to(&mut buf, image::ImageFormat::Png)
        .expect("Failed to encode PNG");
    buf.into_inner()
}
