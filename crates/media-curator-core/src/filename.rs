//! Encoding of post metadata into media file names.
//!
//! The scraper names every file `{label}_{likes}_{YYYY-MM-DD}_{id}.{ext}`. Nothing else records
//! a post's engagement or date, so every operation that needs them goes through [`decode`].

use chrono::NaiveDate;
use std::path::Path;

use crate::error::{Error, Result};

const DATE_FORMAT: &str = "%Y-%m-%d";
const FIELD_COUNT: usize = 4;

/// Metadata carried by a media file name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaFields {
    /// Account label (or id) the scraper wrote first
    pub label: String,

    /// Engagement (likes) at scrape time
    pub engagement: u64,

    /// Day the item was posted
    pub post_date: NaiveDate,

    /// Opaque post identifier
    pub unique_id: String,

    /// File extension, case preserved (`jpg` or `png`)
    pub extension: String,
}

/// Decode the metadata from a path's file name
pub fn decode(path: &Path) -> Result<MediaFields> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| Error::format(path, "file name is not valid UTF-8"))?;

    decode_name(name).map_err(|reason| Error::format(path, reason))
}

/// Encode metadata into a file name, engagement written without padding
pub fn encode(fields: &MediaFields) -> String {
    encode_padded(fields, 0)
}

/// Encode metadata into a file name with the engagement zero-padded to `width` digits
pub fn encode_padded(fields: &MediaFields, width: usize) -> String {
    format!(
        "{}_{:0width$}_{}_{}.{}",
        fields.label,
        fields.engagement,
        fields.post_date.format(DATE_FORMAT),
        fields.unique_id,
        fields.extension,
        width = width
    )
}

/// Number of decimal digits needed to print `value`
pub fn digit_width(value: u64) -> usize {
    value.to_string().len()
}

fn decode_name(name: &str) -> std::result::Result<MediaFields, String> {
    let (stem, extension) = name
        .rsplit_once('.')
        .ok_or_else(|| "missing extension".to_string())?;

    if !is_supported_extension(extension) {
        return Err(format!("unsupported extension '{}'", extension));
    }

    let fields: Vec<&str> = stem.split('_').collect();
    if fields.len() != FIELD_COUNT {
        return Err(format!(
            "expected {} underscore-separated fields, found {}",
            FIELD_COUNT,
            fields.len()
        ));
    }

    let (label, likes, date, unique_id) = (fields[0], fields[1], fields[2], fields[3]);

    if label.is_empty() {
        return Err("empty label field".to_string());
    }
    if unique_id.is_empty() {
        return Err("empty id field".to_string());
    }

    let engagement = parse_engagement(likes)?;
    let post_date = parse_date(date)?;

    Ok(MediaFields {
        label: label.to_string(),
        engagement,
        post_date,
        unique_id: unique_id.to_string(),
        extension: extension.to_string(),
    })
}

fn parse_engagement(field: &str) -> std::result::Result<u64, String> {
    // u64::from_str also accepts a leading '+'
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("engagement '{}' is not a decimal integer", field));
    }
    field
        .parse::<u64>()
        .map_err(|e| format!("engagement '{}': {}", field, e))
}

fn parse_date(field: &str) -> std::result::Result<NaiveDate, String> {
    let date = NaiveDate::parse_from_str(field, DATE_FORMAT)
        .map_err(|e| format!("post date '{}': {}", field, e))?;

    // chrono accepts unpadded months and days; the grammar does not
    if date.format(DATE_FORMAT).to_string() != field {
        return Err(format!("post date '{}' is not YYYY-MM-DD", field));
    }
    Ok(date)
}

fn is_supported_extension(ext: &str) -> bool {
    ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("png")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn fields(engagement: u64) -> MediaFields {
        MediaFields {
            label: "natgeo".to_string(),
            engagement,
            post_date: NaiveDate::from_ymd_opt(2021, 1, 2).unwrap(),
            unique_id: "2468013579".to_string(),
            extension: "jpg".to_string(),
        }
    }

    #[test]
    fn test_decode_well_formed_name() {
        let decoded = decode(Path::new("/corpus/natgeo_1520_2021-01-02_2468013579.jpg")).unwrap();
        assert_eq!(decoded, fields(1520));
    }

    #[test]
    fn test_round_trip() {
        for engagement in [0, 7, 1520, u64::MAX] {
            let original = fields(engagement);
            let name = encode(&original);
            assert_eq!(decode(Path::new(&name)).unwrap(), original);
        }
    }

    #[test]
    fn test_padded_names_decode_to_same_fields() {
        let original = fields(42);
        let padded = encode_padded(&original, 5);
        assert_eq!(padded, "natgeo_00042_2021-01-02_2468013579.jpg");
        assert_eq!(decode(Path::new(&padded)).unwrap(), original);
    }

    #[test]
    fn test_extension_case_is_preserved() {
        let decoded = decode(Path::new("a_1_2020-05-06_x.PNG")).unwrap();
        assert_eq!(decoded.extension, "PNG");
        assert_eq!(encode(&decoded), "a_1_2020-05-06_x.PNG");
    }

    #[test]
    fn test_rejects_malformed_names() {
        let bad = [
            "a_1_2021-01-01.jpg",
            "a_1_2021-01-01_x_y.jpg",
            "a_+1_2021-01-01_x.jpg",
            "a_-1_2021-01-01_x.jpg",
            "a__2021-01-01_x.jpg",
            "a_1_2021-1-1_x.jpg",
            "a_1_01-01-2021_x.jpg",
            "a_1_2021-02-30_x.jpg",
            "a_1_2021-01-01_x.gif",
            "a_1_2021-01-01_x",
            "_1_2021-01-01_x.jpg",
            "a_1_2021-01-01_.jpg",
        ];
        for name in bad {
            let err = decode(&PathBuf::from(name)).unwrap_err();
            assert!(
                matches!(err, Error::Format { .. }),
                "{} should be a format error, got {:?}",
                name,
                err
            );
        }
    }

    #[test]
    fn test_digit_width() {
        assert_eq!(digit_width(0), 1);
        assert_eq!(digit_width(9), 1);
        assert_eq!(digit_width(10), 2);
        assert_eq!(digit_width(999), 3);
    }
}
