// src/lib.rs - Library interface for the border scanner

pub mod binarization;
pub mod cancel;
pub mod config;
pub mod errors;
pub mod image_io;
pub mod invert;
pub mod output;
pub mod pipeline;
pub mod pixel_source;
pub mod render;
pub mod segmentation;
pub mod tracker;

// Re-export commonly used types and functions
pub use errors::{ScanError, Result};
pub use cancel::CancelToken;
pub use config::{Config, LogMode};
pub use pipeline::{process_image, save_outputs, PipelineOutput};
pub use image_io::{InputImage, OutputFormat, load_image, save_gray_image, save_image};
pub use pixel_source::{Bounds, PixelSource, luma};

// Re-export the pixel passes
pub use binarization::{
    apply_threshold,
    binarize,
    build_histogram,
    otsu_threshold,
    BinaryMask,
    Histogram,
};
pub use segmentation::{find_row_segments, RowSegment};
pub use tracker::{
    trace_mask,
    ActiveSeries,
    Branch,
    ContourId,
    ContourPoint,
    ContourSet,
    ContourTracker,
    Side,
};
pub use render::{compose_scan_preview, render_contours, trace_contours};
pub use invert::invert;
pub use output::write_contours_csv;
