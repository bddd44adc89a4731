use std::path::Path;

use takeout_exif_sync::exif::{ExifBuilder, JpegImage};

/// Complete 1x1 grayscale baseline JPEG with no EXIF data.
pub fn baseline_jpeg() -> Vec<u8> {
    let mut bytes = vec![
        0xFF, 0xD8, // SOI
        0xFF, 0xE0, 0x00, 0x10, // APP0, length 16
        0x4A, 0x46, 0x49, 0x46, 0x00, // "JFIF\0"
        0x01, 0x01, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00,
    ];
    // DQT: table 0, all ones
    bytes.extend_from_slice(&[0xFF, 0xDB, 0x00, 0x43, 0x00]);
    bytes.extend_from_slice(&[0x01; 64]);
    // SOF0: 8-bit, 1x1, one component
    bytes.extend_from_slice(&[
        0xFF, 0xC0, 0x00, 0x0B, 0x08, 0x00, 0x01, 0x00, 0x01, 0x01, 0x01, 0x11, 0x00,
    ]);
    // DHT: DC and AC table 0, a single code for symbol 0
    for class in [0x00, 0x10] {
        bytes.extend_from_slice(&[0xFF, 0xC4, 0x00, 0x14, class, 0x01]);
        bytes.extend_from_slice(&[0x00; 16]);
    }
    // SOS + one-byte scan + EOI
    bytes.extend_from_slice(&[0xFF, 0xDA, 0x00, 0x08, 0x01, 0x01, 0x00, 0x00, 0x3F, 0x00]);
    bytes.extend_from_slice(&[0x3F, 0xFF, 0xD9]);
    bytes
}

pub fn write_plain_jpeg(path: &Path) {
    std::fs::write(path, baseline_jpeg()).unwrap();
}

/// A JPEG whose EXIF holds only an ImageDescription.
pub fn write_jpeg_with_description(path: &Path, description: &str) {
    write_plain_jpeg(path);
    let mut builder = ExifBuilder::empty(path);
    builder.set_description(description).unwrap();
    JpegImage::open(path).unwrap().commit(&builder).unwrap();
}

pub fn write_sidecar(dir: &Path, image_name: &str, body: &str) -> std::path::PathBuf {
    let path = dir.join(format!("{image_name}.json"));
    std::fs::write(&path, body).unwrap();
    path
}
