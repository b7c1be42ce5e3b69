use std::fs;
use std::path::Path;
use csv::Writer;

use crate::errors::Result;
use crate::tracker::ContourSet;

/// Write every contour vertex to CSV, one row per point.
///
/// Rows are sorted by contour id so repeated runs produce identical files.
pub fn write_contours_csv<P: AsRef<Path>>(contours: &ContourSet, output_path: P) -> Result<()> {
    let output_path = output_path.as_ref();

    // Create directory if it doesn't exist
    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut writer = Writer::from_path(output_path)?;
    writer.write_record(["Contour_Id", "Point_Index", "X", "Y"])?;

    let mut ordered: Vec<_> = contours.iter().collect();
    ordered.sort_by_key(|(id, _)| *id);

    for (id, points) in ordered {
        for (idx, p) in points.iter().enumerate() {
            writer.write_record(&[
                id.to_string(),
                idx.to_string(),
                p.x.to_string(),
                p.y.to_string(),
            ])?;
        }
    }

    writer.flush()?;
    Ok(())
}
