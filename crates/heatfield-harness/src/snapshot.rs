#![forbid(unsafe_code)]

//! Raster export.

use std::fs;
use std::io;
use std::path::Path;

use heatfield_fx::Raster;

/// Write `raster` as an RGBA PNG.
pub fn write_png(raster: &Raster, path: &Path) -> image::ImageResult<()> {
    let size = raster.size();
    image::save_buffer_with_format(
        path,
        &raster.to_rgba8(),
        size.width,
        size.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
}

/// Binary PPM (`P6`) bytes; alpha is dropped.
pub fn encode_ppm(raster: &Raster) -> Vec<u8> {
    let size = raster.size();
    let header = format!("P6\n{} {}\n255\n", size.width, size.height);
    let mut out = Vec::with_capacity(header.len() + raster.pixels().len() * 3);
    out.extend_from_slice(header.as_bytes());
    for px in raster.pixels() {
        out.extend_from_slice(&[px.r(), px.g(), px.b()]);
    }
    out
}

pub fn write_ppm(raster: &Raster, path: &Path) -> io::Result<()> {
    fs::write(path, encode_ppm(raster))
}

/// File name for frame `index` with the given extension.
pub fn frame_file_name(scenario: &str, index: u64, ext: &str) -> String {
    format!("{scenario}_{index:05}.{ext}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use heatfield_core::{PackedRgba, Size};

    #[test]
    fn ppm_layout() {
        let mut r = Raster::new(Size::new(2, 1), PackedRgba::BLACK);
        r.set(1, 0, PackedRgba::rgb(9, 8, 7));
        let bytes = encode_ppm(&r);
        let header = b"P6\n2 1\n255\n";
        assert_eq!(&bytes[..header.len()], header);
        assert_eq!(&bytes[header.len()..], &[0, 0, 0, 9, 8, 7]);
    }

    #[test]
    fn png_is_written() {
        let dir = std::env::temp_dir().join(format!("heatfield-snap-{}", std::process::id()));
        fs::create_dir_all(&dir).expect("tmp dir");
        let path = dir.join(frame_file_name("walkers", 7, "png"));
        assert!(path.ends_with("walkers_00007.png"));
        let r = Raster::new(Size::new(4, 4), PackedRgba::rgb(200, 10, 10));
        write_png(&r, &path).expect("png");
        let bytes = fs::read(&path).expect("read back");
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
        let _ = fs::remove_dir_all(&dir);
    }
}
