//! Geographic conversions and the GPS working data derived from a sidecar.
//!
//! EXIF stores coordinates as three unsigned rationals (degrees, minutes,
//! seconds) plus a separate reference letter carrying the hemisphere. This
//! module converts sidecar decimal degrees into that form and builds the
//! [`GpsSnapshot`] used to compare a sidecar against an image's GPS block.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::error::{Error, Result};
use crate::sidecar::SidecarRecord;

/// Denominator used for the seconds component of a DMS triple.
pub const SECONDS_DENOMINATOR: u32 = 100;

/// `GPSVersionID` written alongside every GPS block.
pub const GPS_VERSION_ID: [u8; 4] = [2, 2, 0, 0];

/// EXIF `GPSDateStamp` layout.
pub const GPS_DATE_FORMAT: &str = "%Y:%m:%d";

/// An unsigned EXIF rational.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rational {
    pub numerator: u32,
    pub denominator: u32,
}

impl Rational {
    pub const fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    pub const fn whole(numerator: u32) -> Self {
        Self::new(numerator, 1)
    }

    /// Value as a float. A zero denominator reads as zero.
    pub fn to_f64(self) -> f64 {
        if self.denominator == 0 {
            0.0
        } else {
            self.numerator as f64 / self.denominator as f64
        }
    }
}

/// Degrees/minutes/seconds magnitude of a coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dms {
    pub degrees: Rational,
    pub minutes: Rational,
    pub seconds: Rational,
}

impl Dms {
    pub fn to_decimal(&self) -> f64 {
        self.degrees.to_f64() + self.minutes.to_f64() / 60.0 + self.seconds.to_f64() / 3600.0
    }

    pub fn as_array(&self) -> [Rational; 3] {
        [self.degrees, self.minutes, self.seconds]
    }
}

/// Convert decimal degrees into an EXIF DMS triple.
///
/// Works on the magnitude only; the hemisphere travels in the ref letter.
/// Seconds are rounded to the nearest hundredth and stored over
/// [`SECONDS_DENOMINATOR`]. A rounding carry into the next minute or degree
/// is propagated so seconds stay below 60.
pub fn decimal_to_dms(decimal: f64) -> Dms {
    let magnitude = decimal.abs();

    let mut degrees = magnitude.trunc() as u32;
    let minutes_full = (magnitude - degrees as f64) * 60.0;
    let mut minutes = minutes_full.trunc() as u32;
    let seconds_full = (minutes_full - minutes as f64) * 60.0;
    let mut hundredths = (seconds_full * SECONDS_DENOMINATOR as f64).round() as u32;

    if hundredths >= 60 * SECONDS_DENOMINATOR {
        hundredths -= 60 * SECONDS_DENOMINATOR;
        minutes += 1;
    }
    if minutes >= 60 {
        minutes -= 60;
        degrees += 1;
    }

    Dms {
        degrees: Rational::whole(degrees),
        minutes: Rational::whole(minutes),
        seconds: Rational::new(hundredths, SECONDS_DENOMINATOR),
    }
}

/// Apply a hemisphere reference to a magnitude.
pub fn signed(magnitude: f64, reference: char) -> f64 {
    match reference {
        'S' | 'W' => -magnitude,
        _ => magnitude,
    }
}

/// Apply an `GPSAltitudeRef` to an altitude magnitude (1 = below sea level).
pub fn signed_altitude(magnitude: f64, altitude_ref: u8) -> f64 {
    if altitude_ref == 1 {
        -magnitude
    } else {
        magnitude
    }
}

/// Combine `GPSDateStamp` and `GPSTimeStamp` into a single UTC time.
pub fn gps_timestamp(date_stamp: &str, time_stamp: &[Rational]) -> Option<NaiveDateTime> {
    let date = NaiveDate::parse_from_str(date_stamp.trim_matches('\0').trim(), GPS_DATE_FORMAT).ok()?;
    let [hour, minute, second] = time_stamp else {
        return None;
    };
    let whole = |r: &Rational| (r.denominator != 0).then(|| r.numerator / r.denominator);
    let time = NaiveTime::from_hms_opt(whole(hour)?, whole(minute)?, whole(second)?)?;
    Some(date.and_time(time))
}

/// Whether the record carries any geolocation.
///
/// Uses the same primary/fallback selection as derivation; a geolocation with
/// all three magnitudes exactly zero counts as absent.
pub fn has_geo_payload(record: &SidecarRecord) -> bool {
    !record.geo_source().is_zero()
}

/// The GPS fields as they are written into the GPS sub-tree.
#[derive(Debug, Clone, PartialEq)]
pub struct GpsFields {
    pub version_id: [u8; 4],
    pub latitude_ref: char,
    pub latitude: Dms,
    pub longitude_ref: char,
    pub longitude: Dms,
    pub altitude: Rational,
    pub altitude_ref: u8,
    /// Capture time of day in UTC; `None` when the sidecar has no capture time.
    pub time_stamp: Option<[Rational; 3]>,
    pub date_stamp: Option<String>,
}

/// Comparable view of a GPS block: signed decimal position plus the GPS
/// capture time.
#[derive(Debug, Clone, PartialEq)]
pub struct GpsSnapshot {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    pub timestamp: Option<NaiveDateTime>,
}

impl GpsSnapshot {
    pub fn from_fields(fields: &GpsFields) -> Self {
        Self {
            latitude: signed(fields.latitude.to_decimal(), fields.latitude_ref),
            longitude: signed(fields.longitude.to_decimal(), fields.longitude_ref),
            altitude: signed_altitude(fields.altitude.to_f64(), fields.altitude_ref),
            timestamp: fields
                .date_stamp
                .as_deref()
                .zip(fields.time_stamp)
                .and_then(|(date, time)| gps_timestamp(date, &time)),
        }
    }
}

/// GPS data derived from one sidecar, recomputed for every detection and
/// write.
#[derive(Debug, Clone, PartialEq)]
pub struct GpsWorkingData {
    pub fields: GpsFields,
    pub snapshot: GpsSnapshot,
}

impl GpsWorkingData {
    /// Derive the GPS block for `record`, or `None` when it has no
    /// geolocation.
    ///
    /// Fails if the selected coordinates are not finite or fall outside the
    /// valid latitude/longitude ranges.
    pub fn from_record(record: &SidecarRecord) -> Result<Option<Self>> {
        if !has_geo_payload(record) {
            return Ok(None);
        }
        let geo = record.geo_source();

        check_range("latitude", geo.latitude, 90.0)?;
        check_range("longitude", geo.longitude, 180.0)?;
        check_range("altitude", geo.altitude, u32::MAX as f64)?;

        let taken = record.photo_taken_time.timestamp.instant();
        let fields = GpsFields {
            version_id: GPS_VERSION_ID,
            latitude_ref: if geo.latitude < 0.0 { 'S' } else { 'N' },
            latitude: decimal_to_dms(geo.latitude),
            longitude_ref: if geo.longitude < 0.0 { 'W' } else { 'E' },
            longitude: decimal_to_dms(geo.longitude),
            altitude: Rational::whole(geo.altitude.abs() as u32),
            altitude_ref: if geo.altitude < 0.0 { 1 } else { 0 },
            time_stamp: taken.map(|t| {
                [
                    Rational::whole(t.hour()),
                    Rational::whole(t.minute()),
                    Rational::whole(t.second()),
                ]
            }),
            date_stamp: taken.map(|t| t.format(GPS_DATE_FORMAT).to_string()),
        };
        let snapshot = GpsSnapshot::from_fields(&fields);

        Ok(Some(Self { fields, snapshot }))
    }
}

fn check_range(axis: &'static str, value: f64, limit: f64) -> Result<()> {
    if value.is_finite() && value.abs() <= limit {
        Ok(())
    } else {
        Err(Error::InvalidCoordinate { axis, value })
    }
}
