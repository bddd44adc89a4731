//! GPS position lookup from an image's EXIF.

use std::path::Path;

use crate::error::Result;
use crate::exif::segment::{GpsTags, JpegImage};
use crate::geo::{self, Dms, Rational};

/// Position decoded from an image's GPS sub-tree.
#[derive(Debug, Clone, PartialEq)]
pub struct GpsPosition {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
}

/// Outcome of looking up the GPS sub-tree in an image's EXIF.
#[derive(Debug, Clone, PartialEq)]
pub enum GpsLookup {
    /// The EXIF has no GPS coordinates.
    Absent,
    /// GPS tags exist but do not form a position.
    Unparsable(String),
    Found(GpsPosition),
}

/// Parse the EXIF of `path` afresh and read its GPS position.
///
/// A missing or unreadable EXIF segment is an error; only the GPS sub-tree
/// itself is allowed to be missing or broken.
pub fn read_gps_position(path: &Path) -> Result<GpsLookup> {
    let builder = JpegImage::open(path)?.builder()?;
    let lookup = gps_lookup(&builder.gps_tags());
    match &lookup {
        GpsLookup::Absent => log::debug!("No GPS info in {}", path.display()),
        GpsLookup::Unparsable(reason) => {
            log::debug!("Unparsable GPS info in {}: {reason}", path.display())
        }
        GpsLookup::Found(_) => {}
    }
    Ok(lookup)
}

/// Interpret raw GPS tags as a signed position.
///
/// Latitude and longitude need both the triple and the reference letter. A
/// missing altitude reads as sea level.
pub fn gps_lookup(tags: &GpsTags) -> GpsLookup {
    if tags.is_empty() {
        return GpsLookup::Absent;
    }

    let latitude = match coordinate("latitude", &tags.latitude, &tags.latitude_ref, ['N', 'S']) {
        Ok(v) => v,
        Err(reason) => return GpsLookup::Unparsable(reason),
    };
    let longitude = match coordinate("longitude", &tags.longitude, &tags.longitude_ref, ['E', 'W']) {
        Ok(v) => v,
        Err(reason) => return GpsLookup::Unparsable(reason),
    };
    let altitude = geo::signed_altitude(
        tags.altitude.map(Rational::to_f64).unwrap_or(0.0),
        tags.altitude_ref.unwrap_or(0),
    );

    GpsLookup::Found(GpsPosition {
        latitude,
        longitude,
        altitude,
    })
}

fn coordinate(
    axis: &str,
    triple: &Option<Vec<Rational>>,
    reference: &Option<String>,
    letters: [char; 2],
) -> std::result::Result<f64, String> {
    let Some(triple) = triple else {
        return Err(format!("missing {axis}"));
    };
    let [degrees, minutes, seconds] = triple.as_slice() else {
        return Err(format!("{axis} has {} components", triple.len()));
    };
    let reference = reference
        .as_deref()
        .and_then(|r| r.trim().chars().next())
        .filter(|c| letters.contains(c))
        .ok_or_else(|| format!("bad {axis} ref {reference:?}"))?;

    let dms = Dms {
        degrees: *degrees,
        minutes: *minutes,
        seconds: *seconds,
    };
    Ok(geo::signed(dms.to_decimal(), reference))
}
