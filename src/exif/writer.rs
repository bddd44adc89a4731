use std::path::Path;

use super::segment::{JpegImage, ensure_jpeg};
use crate::error::Result;
use crate::geo::GpsWorkingData;
use crate::sidecar::SidecarRecord;

/// Write the sidecar's tracked fields into the image's EXIF, preserving all
/// other EXIF tags and all non-EXIF segments.
///
/// Strategy:
/// 1. Read the entire JPEG with img-parts (preserves all segments)
/// 2. Load the existing EXIF with little_exif and set the tracked tags
/// 3. Swap the APP1 EXIF segment and write the file back in place
///
/// Empty sidecar values (blank description, unset timestamps) are left out so
/// they never erase what the image already has.
pub fn write_record(image_path: &Path, record: &SidecarRecord) -> Result<()> {
    ensure_jpeg(image_path)?;
    let gps = GpsWorkingData::from_record(record)?;

    let image = JpegImage::open(image_path)?;
    let mut builder = image.builder()?;

    if let Some(description) = record.description() {
        builder.set_description(description)?;
        log::debug!("  Description: {description}");
    }
    if let Some(taken) = record.photo_taken_time.timestamp.exif_datetime() {
        builder.set_date_time_original(&taken)?;
        log::debug!("  DateTimeOriginal: {taken}");
    }
    if let Some(created) = record.creation_time.timestamp.exif_datetime() {
        builder.set_date_time_digitized(&created)?;
        log::debug!("  DateTimeDigitized: {created}");
    }
    if let Some(gps) = gps {
        builder.set_gps(&gps.fields)?;
        log::debug!("  GPS: {}, {}", gps.snapshot.latitude, gps.snapshot.longitude);
    }

    image.commit(&builder)
}
