use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GenericImageView, GrayImage, ImageFormat, RgbaImage};
use log::debug;

use crate::errors::{Result, ScanError};

/// Quality used for JPEG output unless configured otherwise
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Represents an input image with its metadata
pub struct InputImage {
    pub image: DynamicImage,
    pub path: PathBuf,
    pub filename: String,
}

/// Output encodings selectable by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Png,
    Jpeg,
    Gif,
    Tiff,
    Bmp,
}

impl OutputFormat {
    /// Match an extension (without the dot), case-insensitive
    pub fn from_extension(ext: &str) -> Result<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Ok(OutputFormat::Png),
            "jpg" | "jpeg" => Ok(OutputFormat::Jpeg),
            "gif" => Ok(OutputFormat::Gif),
            "tif" | "tiff" => Ok(OutputFormat::Tiff),
            "bmp" => Ok(OutputFormat::Bmp),
            _ => Err(ScanError::UnsupportedFormat(ext.to_string())),
        }
    }

    /// Resolve the format for `path`; a path without extension gets `.png` appended
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<(PathBuf, Self)> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if !ext.is_empty() => Ok((path.to_path_buf(), Self::from_extension(ext)?)),
            _ => {
                let mut with_ext = path.as_os_str().to_owned();
                with_ext.push(".png");
                Ok((PathBuf::from(with_ext), OutputFormat::Png))
            }
        }
    }

    fn image_format(self) -> ImageFormat {
        match self {
            OutputFormat::Png => ImageFormat::Png,
            OutputFormat::Jpeg => ImageFormat::Jpeg,
            OutputFormat::Gif => ImageFormat::Gif,
            OutputFormat::Tiff => ImageFormat::Tiff,
            OutputFormat::Bmp => ImageFormat::Bmp,
        }
    }
}

/// Load any image format supported by the `image` crate
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<InputImage> {
    let path = path.as_ref();

    if !path.is_file() {
        return Err(ScanError::InvalidPath(path.to_path_buf()));
    }

    // Get filename without extension
    let filename = path.file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| ScanError::InvalidPath(path.to_path_buf()))?
        .to_string();

    let image = image::open(path)?;
    debug!("Loaded {} ({}x{})", path.display(), image.width(), image.height());

    Ok(InputImage {
        image,
        path: path.to_path_buf(),
        filename,
    })
}

/// Save an RGBA image; JPEG drops alpha and uses `jpeg_quality`
pub fn save_image<P: AsRef<Path>>(
    image: &RgbaImage,
    path: P,
    format: OutputFormat,
    jpeg_quality: u8,
) -> Result<()> {
    write_encoded(&DynamicImage::ImageRgba8(image.clone()), path.as_ref(), format, jpeg_quality)
}

/// Save a single-channel image such as the binary mask
pub fn save_gray_image<P: AsRef<Path>>(
    image: &GrayImage,
    path: P,
    format: OutputFormat,
    jpeg_quality: u8,
) -> Result<()> {
    write_encoded(&DynamicImage::ImageLuma8(image.clone()), path.as_ref(), format, jpeg_quality)
}

/// Encode into a buffered file and flush explicitly so late write errors surface
fn write_encoded(
    image: &DynamicImage,
    path: &Path,
    format: OutputFormat,
    jpeg_quality: u8,
) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);

    match format {
        OutputFormat::Jpeg => {
            let mut encoder = JpegEncoder::new_with_quality(&mut writer, jpeg_quality);
            match image {
                DynamicImage::ImageLuma8(gray) => encoder.encode_image(gray)?,
                other => encoder.encode_image(&other.to_rgb8())?,
            }
        }
        other => image.write_to(&mut writer, other.image_format())?,
    }

    writer.flush()?;
    debug!("Saved {} as {:?}", path.display(), format);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("border_scanner_{}_{}", std::process::id(), name))
    }

    #[test]
    fn format_follows_extension() {
        assert_eq!(OutputFormat::from_extension("PNG").unwrap(), OutputFormat::Png);
        assert_eq!(OutputFormat::from_extension("jpg").unwrap(), OutputFormat::Jpeg);
        assert_eq!(OutputFormat::from_extension("Jpeg").unwrap(), OutputFormat::Jpeg);
        assert_eq!(OutputFormat::from_extension("tif").unwrap(), OutputFormat::Tiff);
        assert_eq!(OutputFormat::from_extension("bmp").unwrap(), OutputFormat::Bmp);
        assert_eq!(OutputFormat::from_extension("gif").unwrap(), OutputFormat::Gif);
        assert!(matches!(
            OutputFormat::from_extension("txt"),
            Err(ScanError::UnsupportedFormat(ext)) if ext == "txt"
        ));
    }

    #[test]
    fn missing_extension_defaults_to_png() {
        let (path, format) = OutputFormat::from_path("out/result").unwrap();
        assert_eq!(path, PathBuf::from("out/result.png"));
        assert_eq!(format, OutputFormat::Png);

        let (path, format) = OutputFormat::from_path("scan.JPG").unwrap();
        assert_eq!(path, PathBuf::from("scan.JPG"));
        assert_eq!(format, OutputFormat::Jpeg);
    }

    #[test]
    fn png_round_trip_through_disk() {
        let path = temp_path("round_trip.png");
        let img = RgbaImage::from_pixel(3, 2, Rgba([255, 0, 0, 255]));
        save_image(&img, &path, OutputFormat::Png, DEFAULT_JPEG_QUALITY).unwrap();

        let loaded = load_image(&path).unwrap();
        assert_eq!(loaded.image.to_rgba8(), img);
        assert!(loaded.filename.ends_with("round_trip"));
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn jpeg_output_is_readable() {
        let path = temp_path("overlay.jpg");
        let img = RgbaImage::from_pixel(8, 8, Rgba([255, 255, 255, 255]));
        save_image(&img, &path, OutputFormat::Jpeg, 90).unwrap();

        let loaded = load_image(&path).unwrap();
        assert_eq!((loaded.image.width(), loaded.image.height()), (8, 8));
        std::fs::remove_file(&path).unwrap();
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn write_errors_on_full_device_are_reported() {
        let img = RgbaImage::from_pixel(8, 8, Rgba([255, 255, 255, 255]));
        for format in [OutputFormat::Png, OutputFormat::Jpeg, OutputFormat::Bmp] {
            let result = save_image(&img, "/dev/full", format, DEFAULT_JPEG_QUALITY);
            assert!(result.is_err(), "{:?} write to a full device reported Ok", format);
        }
        let mask = GrayImage::new(4, 4);
        assert!(save_gray_image(&mask, "/dev/full", OutputFormat::Png, DEFAULT_JPEG_QUALITY).is_err());
    }

    #[test]
    fn gray_image_saves_as_png() {
        let path = temp_path("mask.png");
        let mask = GrayImage::from_fn(3, 3, |x, _| image::Luma([if x == 1 { 0 } else { 255 }]));
        save_gray_image(&mask, &path, OutputFormat::Png, DEFAULT_JPEG_QUALITY).unwrap();

        let loaded = load_image(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded.image.to_luma8(), mask);
    }

    #[test]
    fn loading_missing_file_is_invalid_path() {
        assert!(matches!(
            load_image(temp_path("does_not_exist.png")),
            Err(ScanError::InvalidPath(_))
        ));
    }
}
