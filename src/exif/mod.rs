pub mod diff;
pub mod reader;
pub mod segment;
pub mod writer;

pub use diff::has_difference;
pub use reader::{GpsLookup, GpsPosition, gps_lookup, read_gps_position};
pub use segment::{
    CaptureFields, ExifBuilder, GpsTags, JpegImage, PrimaryFields, ensure_jpeg, is_jpeg,
};
pub use writer::write_record;
