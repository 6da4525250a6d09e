//! OPDS-style catalog documents written by the exporter.
//!
//! Field order in each struct is the order keys appear in the emitted JSON.

use serde::{Deserialize, Serialize};

/// `@type` of every lesson publication.
pub const GAME_SCHEMA_TYPE: &str = "http://schema.org/Game";

/// Media type of a lesson's downloadable bundle.
pub const ARCHIVE_MEDIA_TYPE: &str = "application/zip";

/// Media type of lesson icons.
pub const IMAGE_MEDIA_TYPE: &str = "image/jpeg";

/// Lesson icon height in pixels.
pub const IMAGE_HEIGHT: u32 = 1400;

/// Lesson icon width in pixels.
pub const IMAGE_WIDTH: u32 = 800;

// ---------------------------------------------------------------------------
// Shared pieces
// ---------------------------------------------------------------------------

/// A typed link, e.g. `{"rel": "self", "href": ..., "type": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub rel: String,
    pub href: String,
    #[serde(rename = "type")]
    pub media_type: String,
}

impl Link {
    /// A `rel = "self"` link.
    pub fn self_link(href: impl Into<String>, media_type: impl Into<String>) -> Self {
        Self {
            rel: "self".into(),
            href: href.into(),
            media_type: media_type.into(),
        }
    }
}

/// Metadata block of the index and grade catalogs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogMetadata {
    pub title: String,
}

// ---------------------------------------------------------------------------
// index.json
// ---------------------------------------------------------------------------

/// One grade entry in the index navigation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationEntry {
    /// `{sheet_key}.json`
    pub href: String,
    /// Original sheet name.
    pub title: String,
    #[serde(rename = "type")]
    pub media_type: String,
}

/// Root structure for `index.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    pub metadata: CatalogMetadata,
    pub links: Vec<Link>,
    pub navigation: Vec<NavigationEntry>,
}

// ---------------------------------------------------------------------------
// Publications
// ---------------------------------------------------------------------------

/// An icon attached to a publication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDescriptor {
    pub href: String,
    #[serde(rename = "type")]
    pub media_type: String,
    pub height: u32,
    pub width: u32,
}

impl ImageDescriptor {
    /// The fixed-size JPEG icon used for every lesson.
    pub fn lesson_icon(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            media_type: IMAGE_MEDIA_TYPE.into(),
            height: IMAGE_HEIGHT,
            width: IMAGE_WIDTH,
        }
    }
}

/// Descriptive metadata of a lesson publication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicationMetadata {
    #[serde(rename = "@type")]
    pub schema_type: String,
    pub title: String,
    pub author: String,
    pub identifier: String,
    pub language: String,
    /// ISO-8601 local timestamp.
    pub modified: String,
}

/// A publication as listed inside a grade catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicationSummary {
    pub metadata: PublicationMetadata,
    pub links: Vec<Link>,
    pub images: Vec<ImageDescriptor>,
}

/// A downloadable resource of a lesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub href: String,
    #[serde(rename = "type")]
    pub media_type: String,
}

/// Root structure for `lessons/{lesson_id}.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonManifest {
    pub metadata: PublicationMetadata,
    pub links: Vec<Link>,
    pub images: Vec<ImageDescriptor>,
    pub resources: Vec<Resource>,
}

impl LessonManifest {
    /// Extend a summary with its single archive resource.
    pub fn from_summary(summary: &PublicationSummary, asset: impl Into<String>) -> Self {
        Self {
            metadata: summary.metadata.clone(),
            links: summary.links.clone(),
            images: summary.images.clone(),
            resources: vec![Resource {
                href: asset.into(),
                media_type: ARCHIVE_MEDIA_TYPE.into(),
            }],
        }
    }
}

/// Root structure for `grades/{sheet_key}.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeCatalog {
    pub metadata: CatalogMetadata,
    pub links: Vec<Link>,
    pub publications: Vec<PublicationSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> PublicationSummary {
        PublicationSummary {
            metadata: PublicationMetadata {
                schema_type: GAME_SCHEMA_TYPE.into(),
                title: "Counting to ten".into(),
                author: "Chimple".into(),
                identifier: "http://chimple.cc/opds/id/L1".into(),
                language: "en".into(),
                modified: "2024-03-01T09:30:00".into(),
            },
            links: vec![Link::self_link(
                "http://chimple.cc/opds/L1.json",
                "application/opds-publication+json",
            )],
            images: vec![ImageDescriptor::lesson_icon(
                "http://chimple.cc/opds/images/icons/en0001.jpg",
            )],
        }
    }

    #[test]
    fn metadata_uses_at_type_key_in_order() {
        let json = serde_json::to_string(&summary().metadata).expect("serialize");
        assert!(json.starts_with(r#"{"@type":"http://schema.org/Game","title":"#));
        let author = json.find("\"author\"").unwrap();
        let identifier = json.find("\"identifier\"").unwrap();
        let modified = json.find("\"modified\"").unwrap();
        assert!(author < identifier && identifier < modified);
    }

    #[test]
    fn image_descriptor_shape() {
        let value = serde_json::to_value(ImageDescriptor::lesson_icon("x.jpg")).unwrap();
        assert_eq!(value["type"], "image/jpeg");
        assert_eq!(value["height"], 1400);
        assert_eq!(value["width"], 800);
    }

    #[test]
    fn manifest_duplicates_summary_and_adds_resource() {
        let summary = summary();
        let manifest = LessonManifest::from_summary(&summary, "http://x/a.zip");
        assert_eq!(manifest.metadata, summary.metadata);
        assert_eq!(manifest.images, summary.images);
        assert_eq!(manifest.resources.len(), 1);

        let value = serde_json::to_value(&manifest).unwrap();
        assert_eq!(value["resources"][0]["href"], "http://x/a.zip");
        assert_eq!(value["resources"][0]["type"], "application/zip");
        assert_eq!(value["links"][0]["rel"], "self");
    }

    #[test]
    fn summary_has_no_resources_key() {
        let value = serde_json::to_value(summary()).unwrap();
        assert!(value.get("resources").is_none());
    }
}
