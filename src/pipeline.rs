// src/pipeline.rs - Binarize, trace and write the contour overlay for one image

use std::path::{Path, PathBuf};

use image::{DynamicImage, RgbaImage};
use log::{debug, info};

use crate::binarization::{binarize, BinaryMask};
use crate::cancel::CancelToken;
use crate::config::Config;
use crate::errors::Result;
use crate::image_io::{save_gray_image, save_image, OutputFormat};
use crate::invert::invert;
use crate::output::write_contours_csv;
use crate::pixel_source::PixelSource;
use crate::render::{compose_scan_preview, render_contours};
use crate::tracker::{trace_mask, ContourSet};

/// Everything produced for one input image
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub mask: BinaryMask,
    pub contours: ContourSet,
    pub overlay: RgbaImage,
    pub preview: Option<RgbaImage>,
}

/// Run the pixel passes on `image` according to `config`
pub fn process_image(
    image: &DynamicImage,
    config: &Config,
    cancel: &CancelToken,
) -> Result<PipelineOutput> {
    // Step 1: Optional colour inversion
    let mask = if config.invert {
        debug!("Inverting input before binarization");
        let inverted = invert(image, cancel)?;
        binarize(&inverted, cancel)?
    } else {
        binarize(image, cancel)?
    };

    // Step 2: Trace background runs row by row
    let contours = trace_mask(&mask, cancel)?;

    // Step 3: Plot the vertices
    let overlay = render_contours(&contours, mask.bounds());

    let preview = config
        .preview_rows
        .map(|rows| compose_scan_preview(&mask, &overlay, rows));

    Ok(PipelineOutput {
        mask,
        contours,
        overlay,
        preview,
    })
}

/// `<dir>/<stem><suffix>.png` next to `output`
fn sibling_png(output: &Path, suffix: &str) -> PathBuf {
    let stem = output
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("out");
    output.with_file_name(format!("{}{}.png", stem, suffix))
}

/// Write the overlay and any configured extras; returns the overlay path
pub fn save_outputs(output: &PipelineOutput, config: &Config) -> Result<PathBuf> {
    let (overlay_path, format) = OutputFormat::from_path(&config.output_path)?;
    if let Some(parent) = overlay_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    save_image(&output.overlay, &overlay_path, format, config.jpeg_quality)?;
    info!("Wrote contour overlay to {} ({:?})", overlay_path.display(), format);

    if config.save_mask {
        let mask_path = sibling_png(&overlay_path, "_mask");
        save_gray_image(output.mask.as_gray(), &mask_path, OutputFormat::Png, config.jpeg_quality)?;
        info!("Wrote binary mask to {}", mask_path.display());
    }

    if let Some(preview) = &output.preview {
        let preview_path = sibling_png(&overlay_path, "_preview");
        save_image(preview, &preview_path, OutputFormat::Png, config.jpeg_quality)?;
        info!("Wrote scan preview to {}", preview_path.display());
    }

    if let Some(csv_path) = &config.contours_csv {
        write_contours_csv(&output.contours, csv_path)?;
        info!("Wrote {} contours to {}", output.contours.len(), csv_path);
    }

    Ok(overlay_path)
}
