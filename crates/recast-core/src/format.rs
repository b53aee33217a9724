//! Source and output format model.
//!
//! Maps between MIME types, file extensions and the formats the pipeline
//! can decode from and encode to.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Formats accepted by the decode adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Png,
    Jpeg,
    WebP,
    Gif,
    /// HEIC/HEIF. Recognised, but there is no encoder for it.
    Heic,
}

impl SourceFormat {
    /// Detect the format from the leading bytes of a file.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
            return Some(SourceFormat::Png);
        }
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(SourceFormat::Jpeg);
        }
        if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            return Some(SourceFormat::WebP);
        }
        if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            return Some(SourceFormat::Gif);
        }
        if is_heif_container(bytes) {
            return Some(SourceFormat::Heic);
        }
        None
    }

    /// Parse a MIME type such as `image/jpeg`. Parameters are ignored.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or("").trim();
        match essence.to_ascii_lowercase().as_str() {
            "image/png" => Some(SourceFormat::Png),
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(SourceFormat::Jpeg),
            "image/webp" => Some(SourceFormat::WebP),
            "image/gif" => Some(SourceFormat::Gif),
            "image/heic" | "image/heif" | "image/heic-sequence" | "image/heif-sequence" => {
                Some(SourceFormat::Heic)
            }
            _ => None,
        }
    }

    /// Parse a file extension, with or without the leading dot.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "png" => Some(SourceFormat::Png),
            "jpg" | "jpeg" | "jpe" | "jfif" => Some(SourceFormat::Jpeg),
            "webp" => Some(SourceFormat::WebP),
            "gif" => Some(SourceFormat::Gif),
            "heic" | "heif" => Some(SourceFormat::Heic),
            _ => None,
        }
    }

    /// Derive the format from a file name's extension.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let (_, ext) = name.rsplit_once('.')?;
        Self::from_extension(ext)
    }

    /// The output format with the same container, if the pipeline can encode it.
    pub fn as_output(self) -> Option<OutputFormat> {
        match self {
            SourceFormat::Png => Some(OutputFormat::Png),
            SourceFormat::Jpeg => Some(OutputFormat::Jpeg),
            SourceFormat::WebP => Some(OutputFormat::WebP),
            SourceFormat::Gif | SourceFormat::Heic => None,
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            SourceFormat::Png => "image/png",
            SourceFormat::Jpeg => "image/jpeg",
            SourceFormat::WebP => "image/webp",
            SourceFormat::Gif => "image/gif",
            SourceFormat::Heic => "image/heic",
        }
    }
}

/// ISO-BMFF `ftyp` box carrying a HEIF brand.
///
/// AVIF shares the generic `mif1`/`msf1` brands, so a file that lists
/// `avif` or `avis` anywhere in the box is not HEIC.
fn is_heif_container(bytes: &[u8]) -> bool {
    if bytes.len() < 12 || &bytes[4..8] != b"ftyp" {
        return false;
    }
    let box_len = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
    let end = box_len.clamp(12, bytes.len());
    let compatible = bytes.get(16..end).unwrap_or_default();
    let brands = || std::iter::once(&bytes[8..12]).chain(compatible.chunks_exact(4));

    if brands().any(|b| b == b"avif" || b == b"avis") {
        return false;
    }
    brands().any(|b| {
        matches!(
            b,
            b"heic" | b"heix" | b"hevc" | b"hevx" | b"heim" | b"heis" | b"mif1" | b"msf1"
        )
    })
}

/// Formats the encode adapter can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Png,
    #[default]
    Jpeg,
    WebP,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 3] = [OutputFormat::Png, OutputFormat::Jpeg, OutputFormat::WebP];

    pub fn mime_type(self) -> &'static str {
        match self {
            OutputFormat::Png => "image/png",
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::WebP => "image/webp",
        }
    }

    /// Canonical file extension, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpg",
            OutputFormat::WebP => "webp",
        }
    }

    /// Whether the quality parameter changes the encoded output.
    pub fn is_lossy(self) -> bool {
        matches!(self, OutputFormat::Jpeg | OutputFormat::WebP)
    }

    /// Whether the format can store an alpha channel.
    pub fn supports_alpha(self) -> bool {
        !matches!(self, OutputFormat::Jpeg)
    }

    /// Quality used when the caller does not pass one.
    pub fn default_quality(self) -> f64 {
        match self {
            OutputFormat::Jpeg => 0.92,
            OutputFormat::WebP => 0.8,
            OutputFormat::Png => 1.0,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::WebP => "webp",
        };
        f.write_str(name)
    }
}

/// Error returned when a string names no known output format.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unsupported output format: {0}")]
pub struct UnknownFormat(pub String);

impl FromStr for OutputFormat {
    type Err = UnknownFormat;

    /// Accepts a bare name (`webp`), an extension (`.jpg`) or a MIME type.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed = if s.contains('/') {
            SourceFormat::from_mime(s)
        } else {
            SourceFormat::from_extension(s)
        };
        parsed
            .and_then(SourceFormat::as_output)
            .ok_or_else(|| UnknownFormat(s.to_string()))
    }
}

/// Name for a converted file: the original stem with the new extension.
///
/// `holiday.png` becomes `holiday.webp`; a name with no stem becomes
/// `image.<ext>`.
pub fn output_file_name(original: &str, format: OutputFormat) -> String {
    // Keep only the last path component; uploads sometimes carry a path.
    let base = original.rsplit(['/', '\\']).next().unwrap_or(original);
    let stem = match base.rsplit_once('.') {
        Some((stem, _)) => stem,
        None => base,
    };
    let stem = stem.trim();
    let stem = if stem.is_empty() { "image" } else { stem };
    format!("{}.{}", stem, format.extension())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_signatures() {
        assert_eq!(
            SourceFormat::sniff(b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR"),
            Some(SourceFormat::Png)
        );
        assert_eq!(
            SourceFormat::sniff(&[0xFF, 0xD8, 0xFF, 0xE0]),
            Some(SourceFormat::Jpeg)
        );
        assert_eq!(
            SourceFormat::sniff(b"RIFF\x10\0\0\0WEBPVP8L"),
            Some(SourceFormat::WebP)
        );
        assert_eq!(SourceFormat::sniff(b"GIF89a\x01\0"), Some(SourceFormat::Gif));
        assert_eq!(
            SourceFormat::sniff(b"\0\0\0\x18ftypheic\0\0\0\0"),
            Some(SourceFormat::Heic)
        );
        assert_eq!(
            SourceFormat::sniff(b"\0\0\0\x18ftypmif1\0\0\0\0"),
            Some(SourceFormat::Heic)
        );
    }

    #[test]
    fn test_sniff_unknown() {
        assert_eq!(SourceFormat::sniff(&[]), None);
        assert_eq!(SourceFormat::sniff(b"hello world"), None);
        // MP4 is ISO-BMFF too, but not HEIF
        assert_eq!(SourceFormat::sniff(b"\0\0\0\x18ftypisom\0\0\0\0"), None);
    }

    #[test]
    fn test_sniff_avif_is_not_heic() {
        assert_eq!(
            SourceFormat::sniff(b"\0\0\0\x18ftypmif1\0\0\0\0mif1avif"),
            None
        );
        assert_eq!(
            SourceFormat::sniff(b"\0\0\0\x14ftypavif\0\0\0\0mif1"),
            None
        );
        assert_eq!(
            SourceFormat::sniff(b"\0\0\0\x18ftypmif1\0\0\0\0mif1heic"),
            Some(SourceFormat::Heic)
        );
    }

    #[test]
    fn test_from_mime() {
        assert_eq!(SourceFormat::from_mime("image/jpeg"), Some(SourceFormat::Jpeg));
        assert_eq!(SourceFormat::from_mime("IMAGE/JPG"), Some(SourceFormat::Jpeg));
        assert_eq!(
            SourceFormat::from_mime("image/png; charset=binary"),
            Some(SourceFormat::Png)
        );
        assert_eq!(SourceFormat::from_mime("image/heif"), Some(SourceFormat::Heic));
        assert_eq!(SourceFormat::from_mime("image/svg+xml"), None);
        assert_eq!(SourceFormat::from_mime(""), None);
    }

    #[test]
    fn test_from_file_name() {
        assert_eq!(
            SourceFormat::from_file_name("IMG_0001.HEIC"),
            Some(SourceFormat::Heic)
        );
        assert_eq!(
            SourceFormat::from_file_name("photo.final.jpeg"),
            Some(SourceFormat::Jpeg)
        );
        assert_eq!(SourceFormat::from_file_name("README"), None);
    }

    #[test]
    fn test_as_output() {
        assert_eq!(SourceFormat::Png.as_output(), Some(OutputFormat::Png));
        assert_eq!(SourceFormat::WebP.as_output(), Some(OutputFormat::WebP));
        assert_eq!(SourceFormat::Gif.as_output(), None);
        assert_eq!(SourceFormat::Heic.as_output(), None);
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("webp".parse::<OutputFormat>(), Ok(OutputFormat::WebP));
        assert_eq!(".JPG".parse::<OutputFormat>(), Ok(OutputFormat::Jpeg));
        assert_eq!("image/png".parse::<OutputFormat>(), Ok(OutputFormat::Png));
        assert!("heic".parse::<OutputFormat>().is_err());
        assert!("image/gif".parse::<OutputFormat>().is_err());
        assert!("bmp".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_lossy_formats() {
        assert!(OutputFormat::Jpeg.is_lossy());
        assert!(OutputFormat::WebP.is_lossy());
        assert!(!OutputFormat::Png.is_lossy());
        for format in OutputFormat::ALL {
            assert_eq!(format.is_lossy(), format.default_quality() < 1.0);
        }
    }

    #[test]
    fn test_output_file_name() {
        assert_eq!(output_file_name("holiday.png", OutputFormat::WebP), "holiday.webp");
        assert_eq!(output_file_name("a.b.c.jpeg", OutputFormat::Png), "a.b.c.png");
        assert_eq!(output_file_name("scan", OutputFormat::Jpeg), "scan.jpg");
        assert_eq!(output_file_name("", OutputFormat::Jpeg), "image.jpg");
        assert_eq!(output_file_name(".png", OutputFormat::Jpeg), "image.jpg");
        assert_eq!(
            output_file_name("C:\\Users\\me\\cat.gif", OutputFormat::Png),
            "cat.png"
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(OutputFormat::Jpeg.to_string(), "jpeg");
        assert_eq!(OutputFormat::WebP.to_string(), "webp");
    }
}
