//! # takeout-exif-sync
//!
//! Reconcile Google Photos takeout JSON sidecars with the EXIF metadata embedded in
//! the exported JPEGs. Each `<image>.json` sidecar carries the description, capture
//! times and geolocation Google kept for the photo; when the image's own EXIF does
//! not match, the tracked fields are written back into the file in place.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use takeout_exif_sync::config::SyncConfig;
//! use takeout_exif_sync::pipeline::sync_directory;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = SyncConfig::new("Takeout/Google Photos", false);
//!     let summary = sync_directory(&config)?;
//!     println!("{summary}");
//!     Ok(())
//! }
//! ```
//!
//! ## Lower-Level Usage
//!
//! ```rust,no_run
//! use takeout_exif_sync::exif::{has_difference, write_record};
//! use takeout_exif_sync::sidecar::SidecarRecord;
//! use std::path::Path;
//!
//! fn main() -> anyhow::Result<()> {
//!     let sidecar = Path::new("album/IMG_0001.jpg.json");
//!     let record = SidecarRecord::load(sidecar)?;
//!     let image = record.image_path(Path::new("album"));
//!
//!     if has_difference(&image, &record)? {
//!         write_record(&image, &record)?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Tracked Fields
//!
//! | Sidecar | EXIF |
//! |---------|------|
//! | `description` | `ImageDescription` |
//! | `photoTakenTime` | `DateTimeOriginal`, `GPSTimeStamp`, `GPSDateStamp` |
//! | `creationTime` | `DateTimeDigitized` |
//! | `geoData` (or `geoDataExif`) | `GPSLatitude`, `GPSLongitude`, `GPSAltitude` and their refs |
//!
//! Only JPEG images are written.
//!
//! ## Modules
//!
//! - [`sidecar`]: Sidecar record decoding
//! - [`geo`]: Decimal degrees to EXIF rationals, GPS working data
//! - [`exif`]: JPEG/EXIF access, difference detection and writing
//! - [`pipeline`]: Sidecar discovery and the synchronization driver
//! - [`config`]: Run options
//! - [`error`]: Error type

pub mod config;
pub mod error;
pub mod exif;
pub mod geo;
pub mod pipeline;
pub mod sidecar;

pub use error::{Error, Result};
