pub mod exif;
pub mod video;

use std::path::Path;

use chrono::{DateTime, FixedOffset, Utc};
use tracing::{debug, error, info};

use crate::error::Error;
use crate::media::MediaKind;

use self::exif::{parse_exif_date, ExifDate, ExifReadError, ImageMetadataReader};
use self::video::{scan_creation_time, ProbedTime, VideoProber};

/// Best-effort capture time from embedded metadata.
///
/// Every failure mode collapses to `None`: missing segments, reader errors,
/// malformed strings, and zero/placeholder dates alike.
pub struct MetadataExtractor<R, P> {
    reader: R,
    prober: P,
    offset: FixedOffset,
}

impl<R: ImageMetadataReader, P: VideoProber> MetadataExtractor<R, P> {
    pub fn new(reader: R, prober: P, offset: FixedOffset) -> Self {
        Self {
            reader,
            prober,
            offset,
        }
    }

    pub async fn extract(&self, path: &Path, kind: MediaKind) -> Option<DateTime<Utc>> {
        match kind {
            MediaKind::Image => self.extract_image(path).await,
            MediaKind::Video => self.extract_video(path).await,
            MediaKind::Other => {
                info!("{}: not an image or video, no metadata", path.display());
                None
            }
        }
    }

    async fn extract_image(&self, path: &Path) -> Option<DateTime<Utc>> {
        let dates = match self.reader.read_dates(path).await {
            Ok(dates) => dates,
            Err(ExifReadError::NoSegment) => {
                debug!("{}: no Exif segment", path.display());
                return None;
            }
            Err(ExifReadError::Failed(message)) => {
                error!(
                    "{}",
                    Error::ExifRead {
                        path: path.to_path_buf(),
                        message,
                    }
                );
                return None;
            }
        };

        [dates.create_date, dates.date_time_original]
            .into_iter()
            .flatten()
            .find_map(|value| match parse_exif_date(&value, &self.offset) {
                ExifDate::Valid(dt) => Some(dt),
                ExifDate::Placeholder => {
                    debug!("{}: placeholder Exif date {:?}", path.display(), value);
                    None
                }
                ExifDate::Malformed => {
                    error!(
                        "{}",
                        Error::MalformedDate {
                            path: path.to_path_buf(),
                            value,
                        }
                    );
                    None
                }
            })
    }

    async fn extract_video(&self, path: &Path) -> Option<DateTime<Utc>> {
        let text = match self.prober.probe(path).await {
            Ok(text) => text,
            Err(source) => {
                error!(
                    "{}",
                    Error::ProbeSpawn {
                        path: path.to_path_buf(),
                        source,
                    }
                );
                return None;
            }
        };

        match scan_creation_time(&text) {
            ProbedTime::Valid(dt) => Some(dt),
            ProbedTime::Absent => {
                debug!("{}: no creation_time in probe output", path.display());
                None
            }
            ProbedTime::Placeholder => {
                debug!("{}: placeholder creation_time", path.display());
                None
            }
            ProbedTime::Malformed(value) => {
                error!(
                    "{}",
                    Error::MalformedDate {
                        path: path.to_path_buf(),
                        value,
                    }
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::date::exif::ExifDates;
    use chrono::TimeZone;
    use std::io;

    struct FakeReader(fn() -> Result<ExifDates, ExifReadError>);

    impl ImageMetadataReader for FakeReader {
        async fn read_dates(&self, _path: &Path) -> Result<ExifDates, ExifReadError> {
            (self.0)()
        }
    }

    struct FakeProber(&'static str);

    impl VideoProber for FakeProber {
        async fn probe(&self, _path: &Path) -> io::Result<String> {
            Ok(self.0.to_string())
        }
    }

    fn extractor(
        reader: fn() -> Result<ExifDates, ExifReadError>,
        probe_output: &'static str,
    ) -> MetadataExtractor<FakeReader, FakeProber> {
        MetadataExtractor::new(
            FakeReader(reader),
            FakeProber(probe_output),
            FixedOffset::east_opt(9 * 3600).unwrap(),
        )
    }

    fn dates(create: Option<&str>, original: Option<&str>) -> ExifDates {
        ExifDates {
            create_date: create.map(String::from),
            date_time_original: original.map(String::from),
        }
    }

    #[tokio::test]
    async fn test_image_primary_field() {
        let ex = extractor(|| Ok(dates(Some("2022:05:15 10:00:00"), Some("2001:01:01 00:00:00"))), "");
        let got = ex.extract(Path::new("a.jpg"), MediaKind::Image).await;
        assert_eq!(got, Some(Utc.with_ymd_and_hms(2022, 5, 15, 1, 0, 0).unwrap()));
    }

    #[tokio::test]
    async fn test_image_falls_back_to_original() {
        let ex = extractor(|| Ok(dates(Some("garbage"), Some("2022:05:15 10:00:00"))), "");
        let got = ex.extract(Path::new("a.jpg"), MediaKind::Image).await;
        assert_eq!(got, Some(Utc.with_ymd_and_hms(2022, 5, 15, 1, 0, 0).unwrap()));

        let ex = extractor(|| Ok(dates(None, Some("2022:05:15 10:00:00"))), "");
        assert!(ex.extract(Path::new("a.jpg"), MediaKind::Image).await.is_some());
    }

    #[tokio::test]
    async fn test_image_unusable() {
        let ex = extractor(|| Err(ExifReadError::NoSegment), "");
        assert_eq!(ex.extract(Path::new("a.jpg"), MediaKind::Image).await, None);

        let ex = extractor(|| Err(ExifReadError::Failed("truncated".into())), "");
        assert_eq!(ex.extract(Path::new("a.jpg"), MediaKind::Image).await, None);

        let ex = extractor(|| Ok(dates(Some("0000:00:00 00:00:00"), None)), "");
        assert_eq!(ex.extract(Path::new("a.jpg"), MediaKind::Image).await, None);

        let ex = extractor(|| Ok(ExifDates::default()), "");
        assert_eq!(ex.extract(Path::new("a.jpg"), MediaKind::Image).await, None);
    }

    #[tokio::test]
    async fn test_video() {
        let ex = extractor(
            || Err(ExifReadError::NoSegment),
            "    creation_time   : 2022-05-15T01:00:00.000000Z\n",
        );
        let got = ex.extract(Path::new("a.mp4"), MediaKind::Video).await;
        assert_eq!(got, Some(Utc.with_ymd_and_hms(2022, 5, 15, 1, 0, 0).unwrap()));

        let ex = extractor(|| Err(ExifReadError::NoSegment), "Invalid data found\n");
        assert_eq!(ex.extract(Path::new("a.mp4"), MediaKind::Video).await, None);
    }

    #[tokio::test]
    async fn test_other_kind_is_unknown() {
        let ex = extractor(|| Ok(dates(Some("2022:05:15 10:00:00"), None)), "");
        assert_eq!(ex.extract(Path::new("notes.txt"), MediaKind::Other).await, None);
    }
}
