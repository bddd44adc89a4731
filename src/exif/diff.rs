//! Decide whether an image's EXIF already matches its sidecar.

use std::path::Path;

use super::reader::{GpsLookup, gps_lookup};
use super::segment::{ExifBuilder, JpegImage, ensure_jpeg};
use crate::error::{Error, Result};
use crate::geo::{GpsSnapshot, GpsWorkingData};
use crate::sidecar::SidecarRecord;

/// Whether writing `record` into `image_path` would change anything.
///
/// A missing image and an image whose EXIF is absent or unparsable both count
/// as "no difference". A non-JPEG path fails with
/// [`Error::UnsupportedFileType`].
pub fn has_difference(image_path: &Path, record: &SidecarRecord) -> Result<bool> {
    if !image_path.exists() {
        log::info!("File does not exist: {}", image_path.display());
        return Ok(false);
    }
    ensure_jpeg(image_path)?;

    let builder = match JpegImage::open(image_path).and_then(|image| image.builder()) {
        Ok(builder) => builder,
        Err(e @ (Error::Jpeg { .. } | Error::MissingExif { .. } | Error::MalformedExif { .. })) => {
            log::debug!("Treating as unchanged: {e}");
            return Ok(false);
        }
        Err(e) => return Err(e),
    };

    if scalar_difference(&builder, record) {
        return Ok(true);
    }

    let Some(gps) = GpsWorkingData::from_record(record)? else {
        return Ok(false);
    };

    let found = match gps_lookup(&builder.gps_tags()) {
        GpsLookup::Absent => {
            log::debug!("GPS missing in {}", image_path.display());
            return Ok(true);
        }
        GpsLookup::Unparsable(reason) => {
            log::debug!("GPS unparsable in {}: {reason}", image_path.display());
            return Ok(true);
        }
        GpsLookup::Found(position) => position,
    };

    let existing = GpsSnapshot {
        latitude: found.latitude,
        longitude: found.longitude,
        altitude: found.altitude,
        // no capture time in the sidecar means no GPS stamp to compare
        timestamp: gps.snapshot.timestamp.and(builder.gps_timestamp()),
    };
    if existing != gps.snapshot {
        log::debug!("GPS differs: image {existing:?}, sidecar {:?}", gps.snapshot);
        return Ok(true);
    }
    Ok(false)
}

/// Compare the tracked scalar fields that the record actually specifies.
fn scalar_difference(builder: &ExifBuilder, record: &SidecarRecord) -> bool {
    let primary = builder.primary();
    let capture = builder.capture();

    let expected = [
        ("ImageDescription", record.description().map(str::to_string), primary.image_description),
        (
            "DateTimeOriginal",
            record.photo_taken_time.timestamp.exif_datetime(),
            capture.date_time_original,
        ),
        (
            "DateTimeDigitized",
            record.creation_time.timestamp.exif_datetime(),
            capture.date_time_digitized,
        ),
    ];

    for (tag, want, have) in expected {
        let Some(want) = want else { continue };
        if have.as_deref() != Some(want.as_str()) {
            log::debug!("{tag} differs: image {have:?}, sidecar {want:?}");
            return true;
        }
    }
    false
}
