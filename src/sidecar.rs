use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// EXIF full-timestamp layout (`YYYY:MM:DD HH:MM:SS`).
pub const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// A decoded takeout sidecar, the JSON file exported next to each photo.
///
/// ```json
/// {
///   "title": "20221013_174131.jpg",
///   "description": "",
///   "photoTakenTime": { "timestamp": "1665675691", "formatted": "13 Oct 2022, 15:41:31 UTC" },
///   "geoData": { "latitude": 0.0, "longitude": 0.0, "altitude": 0.0 }
/// }
/// ```
///
/// Every field is optional on input and unknown fields are ignored. The
/// engine only reads a record; nothing mutates it after decoding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SidecarRecord {
    /// File name of the image, relative to the sidecar's directory.
    pub title: String,
    /// Empty means "not specified" and never replaces an existing value.
    pub description: String,
    pub image_views: String,
    pub creation_time: TimeInfo,
    pub photo_taken_time: TimeInfo,
    pub geo_data: GeoData,
    pub geo_data_exif: GeoData,
    pub url: String,
    pub google_photos_origin: PhotosOrigin,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimeInfo {
    pub timestamp: EpochTimestamp,
    pub formatted: String,
}

/// A geolocation as exported by Google Photos. The span fields are carried
/// through but play no part in EXIF derivation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeoData {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    pub latitude_span: f64,
    pub longitude_span: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PhotosOrigin {
    pub mobile_upload: MobileUpload,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MobileUpload {
    pub device_folder: DeviceFolder,
    pub device_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeviceFolder {
    pub local_folder_name: String,
}

impl SidecarRecord {
    /// Decode a sidecar from its JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read and decode a sidecar file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Location of the described image: `title` resolved against `sidecar_dir`.
    pub fn image_path(&self, sidecar_dir: &Path) -> PathBuf {
        sidecar_dir.join(&self.title)
    }

    /// The geolocation used for GPS derivation.
    ///
    /// `geoData` wins unless its longitude is exactly zero, in which case
    /// `geoDataExif` is used instead.
    pub fn geo_source(&self) -> &GeoData {
        if self.geo_data.longitude == 0.0 {
            &self.geo_data_exif
        } else {
            &self.geo_data
        }
    }

    /// The description, or `None` when the sidecar leaves it empty.
    pub fn description(&self) -> Option<&str> {
        if self.description.is_empty() {
            None
        } else {
            Some(&self.description)
        }
    }
}

impl GeoData {
    /// All three magnitudes are exactly zero.
    pub fn is_zero(&self) -> bool {
        self.latitude == 0.0 && self.longitude == 0.0 && self.altitude == 0.0
    }
}

/// An instant decoded from a signed epoch-seconds string.
///
/// An empty, `"null"` or absent value decodes to an unset timestamp rather
/// than failing. `"0"` is a real instant (the Unix epoch), not unset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EpochTimestamp(Option<DateTime<Utc>>);

impl EpochTimestamp {
    pub fn from_seconds(seconds: i64) -> Result<Self> {
        DateTime::from_timestamp(seconds, 0)
            .map(|instant| Self(Some(instant)))
            .ok_or_else(|| Error::InvalidTimestamp {
                value: seconds.to_string(),
                message: "out of range".to_string(),
            })
    }

    /// Parse the textual form found in sidecars.
    pub fn parse(value: &str) -> Result<Self> {
        let value = value.trim().trim_matches('"');
        if value.is_empty() || value == "null" {
            return Ok(Self::default());
        }
        let seconds: i64 = value.parse().map_err(|e: std::num::ParseIntError| {
            Error::InvalidTimestamp {
                value: value.to_string(),
                message: e.to_string(),
            }
        })?;
        Self::from_seconds(seconds)
    }

    pub fn instant(&self) -> Option<DateTime<Utc>> {
        self.0
    }

    pub fn seconds(&self) -> Option<i64> {
        self.0.map(|instant| instant.timestamp())
    }

    /// True when the sidecar gave no usable value.
    pub fn is_unset(&self) -> bool {
        self.0.is_none()
    }

    /// The EXIF full-timestamp string in UTC, `None` when unset.
    pub fn exif_datetime(&self) -> Option<String> {
        self.0
            .map(|instant| instant.format(EXIF_DATETIME_FORMAT).to_string())
    }
}

impl Serialize for EpochTimestamp {
    /// Unset encodes as `""`, which decodes back to unset.
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self.seconds() {
            Some(seconds) => serializer.serialize_str(&seconds.to_string()),
            None => serializer.serialize_str(""),
        }
    }
}

impl<'de> Deserialize<'de> for EpochTimestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct EpochVisitor;

        impl<'de> Visitor<'de> for EpochVisitor {
            type Value = EpochTimestamp;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("epoch seconds as a string or integer")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Self::Value, E> {
                EpochTimestamp::parse(v).map_err(E::custom)
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<Self::Value, E> {
                EpochTimestamp::from_seconds(v).map_err(E::custom)
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Self::Value, E> {
                let seconds = i64::try_from(v).map_err(E::custom)?;
                EpochTimestamp::from_seconds(seconds).map_err(E::custom)
            }

            fn visit_unit<E: de::Error>(self) -> std::result::Result<Self::Value, E> {
                Ok(EpochTimestamp::default())
            }

            fn visit_none<E: de::Error>(self) -> std::result::Result<Self::Value, E> {
                Ok(EpochTimestamp::default())
            }
        }

        deserializer.deserialize_any(EpochVisitor)
    }
}
