//! Product representations: the raw catalogue payload and its shaped form.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Product record as returned by the commerce product endpoint.
///
/// Only the image data is modelled; every other field is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawProduct {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub image_groups: Vec<RawImageGroup>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawImageGroup {
    #[serde(default)]
    pub view_type: Option<String>,
    #[serde(default)]
    pub variation_attributes: Vec<RawVariationAttribute>,
    #[serde(default)]
    pub images: Vec<RawImage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawVariationAttribute {
    pub id: String,
    #[serde(default)]
    pub values: Vec<RawVariationValue>,
}

/// Variation values arrive either as bare strings or as `{ "value": ... }` objects
/// depending on the catalogue API flavour.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawVariationValue {
    Plain(String),
    Object { value: String },
}

impl RawVariationValue {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Plain(value) | Self::Object { value } => value,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawImage {
    #[serde(alias = "link")]
    pub abs_url: String,
    #[serde(default)]
    pub alt: Option<LocalizedText>,
    #[serde(default)]
    pub title: Option<LocalizedText>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocalizedText {
    #[serde(default)]
    pub default: Option<String>,
}

impl LocalizedText {
    /// Text for the default locale, if the upstream sent one.
    pub fn default_text(&self) -> Option<&str> {
        self.default.as_deref()
    }
}

/// One image of a colour variant, pointing at the public CDN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDescriptor {
    pub url: String,
    pub alt: String,
    pub title: String,
}

/// Colour code → ordered image descriptors, in first-seen upstream order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShapedProduct(IndexMap<String, Vec<ImageDescriptor>>);

impl ShapedProduct {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the images for `color`; a repeated colour keeps its original position.
    pub fn insert(&mut self, color: String, images: Vec<ImageDescriptor>) {
        self.0.insert(color, images);
    }

    pub fn images(&self, color: &str) -> Option<&[ImageDescriptor]> {
        self.0.get(color).map(Vec::as_slice)
    }

    pub fn colors(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
