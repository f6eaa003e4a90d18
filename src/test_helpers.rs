//! Fixture builders shared by the unit tests.
//!
//! Every helper writes into a caller-owned directory (usually a `TempDir`)
//! and returns the created path.

use std::fs;
use std::path::{Path, PathBuf};

/// The eight-byte PNG file signature.
pub const PNG_SIGNATURE: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Write `bytes` to `dir/name`, creating parent directories.
pub fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, bytes).unwrap();
    path
}

/// Encoded bytes of a well-formed 1×1 PNG.
pub fn png_bytes() -> Vec<u8> {
    let mut buf = std::io::Cursor::new(Vec::new());
    image::RgbImage::from_pixel(1, 1, image::Rgb([10, 20, 30]))
        .write_to(&mut buf, image::ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

/// A decodable 1×1 PNG.
pub fn write_png(dir: &Path, name: &str) -> PathBuf {
    write_file(dir, name, &png_bytes())
}

/// A PNG cut off inside its IHDR chunk.
pub fn write_truncated_png(dir: &Path, name: &str) -> PathBuf {
    let bytes = png_bytes();
    write_file(dir, name, &bytes[..20])
}

/// A zero-byte file.
pub fn write_empty(dir: &Path, name: &str) -> PathBuf {
    write_file(dir, name, b"")
}

/// An executable `/bin/sh` script standing in for an external tool.
#[cfg(unix)]
pub fn fake_tool(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::io::Write;
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    {
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "#!/bin/sh\n{body}").unwrap();
        file.sync_all().unwrap();
    }
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}
