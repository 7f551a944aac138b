//! Media format descriptors as delivered by the platform catalog

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One downloadable stream variant
///
/// Only the fields the URL pipeline reads are typed; everything else the
/// platform sends is kept in `extra` so the descriptor round-trips unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaFormat {
    /// Platform format ID (itag)
    #[serde(default)]
    pub itag: u32,
    /// Direct download URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Encoded cipher carrying `s`, `sp` and the embedded `url`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature_cipher: Option<String>,
    /// Legacy name of `signature_cipher`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cipher: Option<String>,
    /// MIME type with codecs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Bitrate in bits per second
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<u64>,
    /// Quality label (e.g., "720p")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_label: Option<String>,
    /// Remaining platform fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MediaFormat {
    /// Create a format with a direct URL
    pub fn with_url(itag: u32, url: impl Into<String>) -> Self {
        Self {
            itag,
            url: Some(url.into()),
            ..Self::default()
        }
    }

    /// Create a format that only carries a signature cipher
    pub fn with_signature_cipher(itag: u32, cipher: impl Into<String>) -> Self {
        Self {
            itag,
            signature_cipher: Some(cipher.into()),
            ..Self::default()
        }
    }

    /// True when the URL must be recovered from the cipher field
    pub fn is_ciphered(&self) -> bool {
        non_empty(&self.url).is_none()
    }

    /// The URL or cipher the pipeline starts from, in priority order
    ///
    /// Empty strings count as absent.
    pub fn raw_url(&self) -> Option<&str> {
        non_empty(&self.url)
            .or_else(|| non_empty(&self.signature_cipher))
            .or_else(|| non_empty(&self.cipher))
    }

    /// Drop cipher fields once the URL has been resolved
    pub fn clear_cipher(&mut self) {
        self.signature_cipher = None;
        self.cipher = None;
    }

    /// True when a resolved URL exists and no cipher field is left
    pub fn is_resolved(&self) -> bool {
        non_empty(&self.url).is_some()
            && self.signature_cipher.is_none()
            && self.cipher.is_none()
    }
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|value| !value.is_empty())
}

/// Streaming data block of a player response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamingData {
    /// Progressive formats
    #[serde(default)]
    pub formats: Vec<MediaFormat>,
    /// Adaptive (audio-only or video-only) formats
    #[serde(default)]
    pub adaptive_formats: Vec<MediaFormat>,
    /// Remaining platform fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A format catalog: either a bare list or a streaming data object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Catalog {
    List(Vec<MediaFormat>),
    Streaming(StreamingData),
}

impl Catalog {
    /// All formats, progressive first
    pub fn formats(&self) -> Vec<&MediaFormat> {
        match self {
            Catalog::List(formats) => formats.iter().collect(),
            Catalog::Streaming(data) => data
                .formats
                .iter()
                .chain(data.adaptive_formats.iter())
                .collect(),
        }
    }

    /// Mutable access to every format, progressive first
    pub fn formats_mut(&mut self) -> Vec<&mut MediaFormat> {
        match self {
            Catalog::List(formats) => formats.iter_mut().collect(),
            Catalog::Streaming(data) => data
                .formats
                .iter_mut()
                .chain(data.adaptive_formats.iter_mut())
                .collect(),
        }
    }

    /// Number of formats
    pub fn len(&self) -> usize {
        match self {
            Catalog::List(formats) => formats.len(),
            Catalog::Streaming(data) => data.formats.len() + data.adaptive_formats.len(),
        }
    }

    /// Check if the catalog has no formats
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_url_priority() {
        let mut format = MediaFormat::with_url(18, "https://a/v");
        format.signature_cipher = Some("s=1&url=x".to_string());
        assert_eq!(format.raw_url(), Some("https://a/v"));
        assert!(!format.is_ciphered());

        let mut format = MediaFormat::default();
        format.cipher = Some("legacy".to_string());
        assert_eq!(format.raw_url(), Some("legacy"));
        assert!(format.is_ciphered());

        assert_eq!(MediaFormat::default().raw_url(), None);
    }

    #[test]
    fn test_empty_fields_count_as_absent() {
        let mut format = MediaFormat::with_signature_cipher(18, "s=1&url=x");
        format.url = Some(String::new());
        assert!(format.is_ciphered());
        assert_eq!(format.raw_url(), Some("s=1&url=x"));
        assert!(!format.is_resolved());

        let mut format = MediaFormat::with_signature_cipher(18, "");
        format.cipher = Some("legacy".to_string());
        assert_eq!(format.raw_url(), Some("legacy"));

        let format = MediaFormat::with_url(18, "");
        assert_eq!(format.raw_url(), None);
        assert!(!format.is_resolved());
    }

    #[test]
    fn test_deserialize_platform_json() {
        let json = r#"{
            "itag": 251,
            "signatureCipher": "s=AB&sp=sig&url=https%3A%2F%2Fexample%2Fv",
            "mimeType": "audio/webm; codecs=\"opus\"",
            "bitrate": 135000,
            "audioQuality": "AUDIO_QUALITY_MEDIUM"
        }"#;
        let format: MediaFormat = serde_json::from_str(json).unwrap();

        assert_eq!(format.itag, 251);
        assert!(format.url.is_none());
        assert!(format.signature_cipher.is_some());
        assert_eq!(format.bitrate, Some(135000));
        assert_eq!(
            format.extra.get("audioQuality").and_then(|v| v.as_str()),
            Some("AUDIO_QUALITY_MEDIUM")
        );

        let back = serde_json::to_value(&format).unwrap();
        assert_eq!(back["audioQuality"], "AUDIO_QUALITY_MEDIUM");
        assert!(back.get("url").is_none());
    }

    #[test]
    fn test_clear_cipher() {
        let mut format = MediaFormat::with_signature_cipher(22, "s=1&url=x");
        format.cipher = Some("y".to_string());
        format.url = Some("https://a/v".to_string());
        assert!(!format.is_resolved());

        format.clear_cipher();
        assert!(format.is_resolved());
    }

    #[test]
    fn test_catalog_shapes() {
        let list: Catalog = serde_json::from_str(r#"[{"itag": 18, "url": "https://a/v"}]"#).unwrap();
        assert!(matches!(list, Catalog::List(_)));
        assert_eq!(list.len(), 1);

        let streaming: Catalog = serde_json::from_str(
            r#"{"expiresInSeconds": "21540",
                "formats": [{"itag": 18}],
                "adaptiveFormats": [{"itag": 137}, {"itag": 140}]}"#,
        )
        .unwrap();
        assert!(matches!(streaming, Catalog::Streaming(_)));
        let itags: Vec<u32> = streaming.formats().iter().map(|f| f.itag).collect();
        assert_eq!(itags, vec![18, 137, 140]);
    }
}
