//! JPEG container access and the editable EXIF builder.
//!
//! img-parts owns the container: it splits the JPEG into segments so the EXIF
//! APP1 payload can be swapped while every other segment is written back
//! untouched. little_exif owns the editable tag tree; its fields are exposed
//! here as typed per-sub-tree accessors instead of name-keyed lookups.

use chrono::NaiveDateTime;
use img_parts::jpeg::{Jpeg, JpegSegment};
use img_parts::{Bytes, ImageEXIF};
use little_exif::exif_tag::ExifTag;
use little_exif::filetype::FileExtension;
use little_exif::metadata::Metadata;
use little_exif::rational::uR64;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::geo::{self, GpsFields, Rational};

// little_exif as_u8_vec(JPEG) returns: [APP1 marker 2B][length 2B][Exif\0\0 6B][TIFF data]
const JPEG_EXIF_OVERHEAD: usize = 10;

const APP0: u8 = 0xE0;
const APP1: u8 = 0xE1;
const EXIF_PREFIX: &[u8] = b"Exif\0\0";

/// Whether the path names a JPEG by extension (case-insensitive).
pub fn is_jpeg(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("jpg") || e.eq_ignore_ascii_case("jpeg"))
}

/// Fail with [`Error::UnsupportedFileType`] unless the path is a JPEG.
pub fn ensure_jpeg(path: &Path) -> Result<()> {
    if is_jpeg(path) {
        Ok(())
    } else {
        Err(Error::unsupported(path))
    }
}

/// A JPEG file split into its segments.
pub struct JpegImage {
    path: PathBuf,
    jpeg: Jpeg,
}

impl JpegImage {
    pub fn open(path: &Path) -> Result<Self> {
        ensure_jpeg(path)?;
        let file_bytes = std::fs::read(path)?;
        let jpeg = Jpeg::from_bytes(Bytes::from(file_bytes)).map_err(|e| Error::Jpeg {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            jpeg,
        })
    }

    /// TIFF payload of the EXIF segment, without the `Exif\0\0` prefix.
    pub fn raw_exif(&self) -> Option<Bytes> {
        self.jpeg.exif()
    }

    pub fn has_exif(&self) -> bool {
        self.raw_exif().is_some_and(|b| !b.is_empty())
    }

    /// Acquire an editable builder over the existing EXIF segment.
    ///
    /// Fails with [`Error::MissingExif`] when the image carries no EXIF and
    /// with [`Error::MalformedExif`] when little_exif cannot parse it.
    pub fn builder(&self) -> Result<ExifBuilder> {
        if !self.has_exif() {
            return Err(Error::MissingExif {
                path: self.path.clone(),
            });
        }
        ExifBuilder::load(&self.path)
    }

    /// Replace the EXIF segment with the builder's contents and rewrite the
    /// file in place. All other segments are written back unchanged.
    ///
    /// An existing EXIF segment is replaced where it stands; a new one goes
    /// right after the leading APP0 segments.
    pub fn commit(mut self, builder: &ExifBuilder) -> Result<()> {
        let tiff = builder.encode()?;
        let mut contents = Vec::with_capacity(EXIF_PREFIX.len() + tiff.len());
        contents.extend_from_slice(EXIF_PREFIX);
        contents.extend_from_slice(&tiff);
        let exif_segment = JpegSegment::new_with_contents(APP1, Bytes::from(contents));

        let segments = self.jpeg.segments_mut();
        match find_exif_segment_pos(segments) {
            Some(pos) => segments[pos] = exif_segment,
            None => {
                let insert_pos = segments.iter().take_while(|s| s.marker() == APP0).count();
                segments.insert(insert_pos, exif_segment);
            }
        }

        let output = self.jpeg.encoder().bytes();
        std::fs::write(&self.path, &output)?;
        log::debug!("Re-encoded {} ({} bytes)", self.path.display(), output.len());
        Ok(())
    }
}

/// Find the position of the EXIF APP1 segment.
fn find_exif_segment_pos(segments: &[JpegSegment]) -> Option<usize> {
    segments
        .iter()
        .position(|s| s.marker() == APP1 && s.contents().starts_with(EXIF_PREFIX))
}

/// Tracked fields of the primary (IFD0) sub-tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrimaryFields {
    pub image_description: Option<String>,
}

/// Tracked fields of the capture-details (Exif IFD) sub-tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaptureFields {
    pub date_time_original: Option<String>,
    pub date_time_digitized: Option<String>,
}

/// GPS sub-tree tags as stored, before any interpretation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GpsTags {
    pub latitude_ref: Option<String>,
    pub latitude: Option<Vec<Rational>>,
    pub longitude_ref: Option<String>,
    pub longitude: Option<Vec<Rational>>,
    pub altitude_ref: Option<u8>,
    pub altitude: Option<Rational>,
}

impl GpsTags {
    /// No coordinate tag at all, i.e. there is no GPS block to speak of.
    pub fn is_empty(&self) -> bool {
        self.latitude_ref.is_none()
            && self.latitude.is_none()
            && self.longitude_ref.is_none()
            && self.longitude.is_none()
    }
}

/// Editable EXIF tree for one image.
pub struct ExifBuilder {
    path: PathBuf,
    metadata: Metadata,
}

impl ExifBuilder {
    /// A builder with no tags, for an image that has no EXIF segment yet.
    pub fn empty(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            metadata: Metadata::new(),
        }
    }

    /// Parse the EXIF of `path` with little_exif.
    ///
    /// little_exif can panic on unusual layouts; that is contained and
    /// reported as [`Error::MalformedExif`].
    pub fn load(path: &Path) -> Result<Self> {
        let path_owned = path.to_path_buf();
        let prev_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(|_| {}));
        let result = std::panic::catch_unwind(move || Metadata::new_from_path(&path_owned));
        std::panic::set_hook(prev_hook);

        match result {
            Ok(Ok(metadata)) => Ok(Self {
                path: path.to_path_buf(),
                metadata,
            }),
            Ok(Err(e)) => Err(Error::MalformedExif {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            Err(_) => Err(Error::MalformedExif {
                path: path.to_path_buf(),
                message: "EXIF parser panicked".to_string(),
            }),
        }
    }

    fn tags(&self) -> impl Iterator<Item = &ExifTag> {
        (&self.metadata).into_iter()
    }

    pub fn primary(&self) -> PrimaryFields {
        let mut fields = PrimaryFields::default();
        for tag in self.tags() {
            if let ExifTag::ImageDescription(s) = tag {
                fields.image_description = Some(trim_padding(s));
            }
        }
        fields
    }

    pub fn capture(&self) -> CaptureFields {
        let mut fields = CaptureFields::default();
        for tag in self.tags() {
            match tag {
                ExifTag::DateTimeOriginal(s) => fields.date_time_original = Some(trim_padding(s)),
                ExifTag::CreateDate(s) => fields.date_time_digitized = Some(trim_padding(s)),
                _ => {}
            }
        }
        fields
    }

    pub fn gps_tags(&self) -> GpsTags {
        let mut gps = GpsTags::default();
        for tag in self.tags() {
            match tag {
                ExifTag::GPSLatitudeRef(s) => gps.latitude_ref = Some(trim_padding(s)),
                ExifTag::GPSLatitude(rats) => {
                    gps.latitude = Some(rats.iter().map(from_ur64).collect())
                }
                ExifTag::GPSLongitudeRef(s) => gps.longitude_ref = Some(trim_padding(s)),
                ExifTag::GPSLongitude(rats) => {
                    gps.longitude = Some(rats.iter().map(from_ur64).collect())
                }
                ExifTag::GPSAltitudeRef(bytes) => gps.altitude_ref = bytes.first().copied(),
                ExifTag::GPSAltitude(rats) => gps.altitude = rats.first().map(from_ur64),
                _ => {}
            }
        }
        gps
    }

    /// GPS capture time from `GPSDateStamp` and `GPSTimeStamp`, if both are
    /// present and well-formed.
    pub fn gps_timestamp(&self) -> Option<NaiveDateTime> {
        let mut date_stamp = None;
        let mut time_stamp = None;
        for tag in self.tags() {
            match tag {
                ExifTag::GPSDateStamp(s) => date_stamp = Some(s.clone()),
                ExifTag::GPSTimeStamp(rats) => {
                    time_stamp = Some(rats.iter().map(from_ur64).collect::<Vec<_>>())
                }
                _ => {}
            }
        }
        geo::gps_timestamp(&date_stamp?, &time_stamp?)
    }

    pub fn set_description(&mut self, description: &str) -> Result<()> {
        self.check_ascii_value("ImageDescription", description)?;
        self.metadata
            .set_tag(ExifTag::ImageDescription(description.to_string()));
        Ok(())
    }

    pub fn set_date_time_original(&mut self, value: &str) -> Result<()> {
        self.check_ascii_value("DateTimeOriginal", value)?;
        self.metadata
            .set_tag(ExifTag::DateTimeOriginal(value.to_string()));
        Ok(())
    }

    pub fn set_date_time_digitized(&mut self, value: &str) -> Result<()> {
        self.check_ascii_value("DateTimeDigitized", value)?;
        self.metadata.set_tag(ExifTag::CreateDate(value.to_string()));
        Ok(())
    }

    /// Write the GPS block. The time and date stamps are only written when
    /// the capture time is known.
    pub fn set_gps(&mut self, gps: &GpsFields) -> Result<()> {
        if let Some(date_stamp) = &gps.date_stamp {
            self.check_ascii_value("GPSDateStamp", date_stamp)?;
        }

        let m = &mut self.metadata;
        m.set_tag(ExifTag::GPSVersionID(gps.version_id.to_vec()));
        m.set_tag(ExifTag::GPSLatitudeRef(gps.latitude_ref.to_string()));
        m.set_tag(ExifTag::GPSLatitude(to_ur64_vec(&gps.latitude.as_array())));
        m.set_tag(ExifTag::GPSLongitudeRef(gps.longitude_ref.to_string()));
        m.set_tag(ExifTag::GPSLongitude(to_ur64_vec(&gps.longitude.as_array())));
        m.set_tag(ExifTag::GPSAltitude(vec![to_ur64(gps.altitude)]));
        m.set_tag(ExifTag::GPSAltitudeRef(vec![gps.altitude_ref]));
        if let Some(time_stamp) = &gps.time_stamp {
            m.set_tag(ExifTag::GPSTimeStamp(to_ur64_vec(time_stamp)));
        }
        if let Some(date_stamp) = &gps.date_stamp {
            m.set_tag(ExifTag::GPSDateStamp(date_stamp.clone()));
        }
        Ok(())
    }

    /// EXIF ASCII values are NUL-terminated, so an embedded NUL cannot be
    /// stored.
    fn check_ascii_value(&self, tag: &str, value: &str) -> Result<()> {
        if value.contains('\0') {
            return Err(self.write_error(format!("{tag} value contains a NUL byte")));
        }
        Ok(())
    }

    fn write_error(&self, message: String) -> Error {
        Error::ExifWrite {
            path: self.path.clone(),
            message,
        }
    }

    /// Serialise the tree to bare TIFF data for the APP1 segment.
    fn encode(&self) -> Result<Vec<u8>> {
        let metadata = &self.metadata;
        let encoded = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            metadata.as_u8_vec(FileExtension::JPEG)
        }));

        let exif_bytes = match encoded {
            Ok(Ok(bytes)) => bytes,
            Ok(Err(e)) => return Err(self.write_error(format!("{e:?}"))),
            Err(_) => return Err(self.write_error("EXIF encoder panicked".to_string())),
        };

        if exif_bytes.len() <= JPEG_EXIF_OVERHEAD {
            return Err(self.write_error("encoded EXIF segment is empty".to_string()));
        }
        Ok(exif_bytes[JPEG_EXIF_OVERHEAD..].to_vec())
    }
}

fn trim_padding(s: &str) -> String {
    s.trim_matches('\0').to_string()
}

fn to_ur64(r: Rational) -> uR64 {
    uR64 {
        nominator: r.numerator,
        denominator: r.denominator,
    }
}

fn to_ur64_vec(rats: &[Rational]) -> Vec<uR64> {
    rats.iter().copied().map(to_ur64).collect()
}

fn from_ur64(r: &uR64) -> Rational {
    Rational::new(r.nominator, r.denominator)
}
