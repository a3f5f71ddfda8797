use serde::{Deserialize, Serialize};
use std::fmt;

/// Resolution profiles the backend derives from every upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Resolution {
    #[serde(rename = "1080p")]
    P1080,
    #[serde(rename = "720p")]
    P720,
    #[serde(rename = "480p")]
    P480,
}

impl Resolution {
    pub const ALL: [Resolution; 3] = [Resolution::P1080, Resolution::P720, Resolution::P480];

    /// Key used on the wire and as the output prefix in storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::P1080 => "1080p",
            Resolution::P720 => "720p",
            Resolution::P480 => "480p",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Resolution::P1080 => "1080p Resolution",
            Resolution::P720 => "720p Resolution",
            Resolution::P480 => "480p Resolution",
        }
    }

    /// Bounding box the backend fits the image into, aspect ratio preserved.
    pub fn max_dimensions(&self) -> (u32, u32) {
        match self {
            Resolution::P1080 => (1920, 1080),
            Resolution::P720 => (1280, 720),
            Resolution::P480 => (854, 480),
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Download links for whichever derived variants exist.
///
/// Any subset may be present. An empty set is a valid response and is not
/// distinguishable from "not processed yet".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantSet {
    #[serde(rename = "1080p", default, skip_serializing_if = "Option::is_none")]
    p1080: Option<String>,
    #[serde(rename = "720p", default, skip_serializing_if = "Option::is_none")]
    p720: Option<String>,
    #[serde(rename = "480p", default, skip_serializing_if = "Option::is_none")]
    p480: Option<String>,
}

impl VariantSet {
    pub fn get(&self, resolution: Resolution) -> Option<&str> {
        match resolution {
            Resolution::P1080 => self.p1080.as_deref(),
            Resolution::P720 => self.p720.as_deref(),
            Resolution::P480 => self.p480.as_deref(),
        }
    }

    pub fn insert(&mut self, resolution: Resolution, url: impl Into<String>) {
        let slot = match resolution {
            Resolution::P1080 => &mut self.p1080,
            Resolution::P720 => &mut self.p720,
            Resolution::P480 => &mut self.p480,
        };
        *slot = Some(url.into());
    }

    /// Present variants, highest resolution first.
    pub fn iter(&self) -> impl Iterator<Item = (Resolution, &str)> + '_ {
        Resolution::ALL
            .into_iter()
            .filter_map(move |r| self.get(r).map(|url| (r, url)))
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
