//! Pure transform from a raw catalogue product to its colour-indexed image map.

use url::Url;

use super::error::DomainError;
use super::product::{ImageDescriptor, LocalizedText, RawImage, RawImageGroup, RawProduct, ShapedProduct};

pub const COLOR_ATTRIBUTE_ID: &str = "color";
pub const DEFAULT_CDN_BASE: &str = "https://www.seedheritage.com";

/// Shape `raw` into colour code → image descriptors, rewriting image URLs onto `cdn_base`.
///
/// Every image group must carry a `color` variation attribute with at least one
/// value; a group without one fails the whole product. When two groups share a
/// colour the later group replaces the earlier one.
pub fn shape(raw: &RawProduct, cdn_base: &str) -> Result<ShapedProduct, DomainError> {
    let mut shaped = ShapedProduct::new();

    for (index, group) in raw.image_groups.iter().enumerate() {
        let color = group_color(group).ok_or_else(|| {
            DomainError::malformed(format!(
                "image group {index} has no `{COLOR_ATTRIBUTE_ID}` variation value"
            ))
        })?;

        let images = group
            .images
            .iter()
            .map(|image| describe_image(image, cdn_base))
            .collect::<Result<Vec<_>, _>>()?;

        shaped.insert(color.to_string(), images);
    }

    Ok(shaped)
}

fn group_color(group: &RawImageGroup) -> Option<&str> {
    group
        .variation_attributes
        .iter()
        .find(|attribute| attribute.id == COLOR_ATTRIBUTE_ID)
        .and_then(|attribute| attribute.values.first())
        .map(|value| value.as_str())
}

fn describe_image(image: &RawImage, cdn_base: &str) -> Result<ImageDescriptor, DomainError> {
    let path = image_path(&image.abs_url)?;
    Ok(ImageDescriptor {
        url: format!("{}{}", cdn_base.trim_end_matches('/'), path),
        alt: localized(image.alt.as_ref()),
        title: localized(image.title.as_ref()),
    })
}

fn localized(text: Option<&LocalizedText>) -> String {
    text.and_then(LocalizedText::default_text)
        .map(str::to_owned)
        .unwrap_or_default()
}

fn image_path(raw_url: &str) -> Result<String, DomainError> {
    match Url::parse(raw_url) {
        Ok(url) if url.cannot_be_a_base() => Err(DomainError::malformed(format!(
            "image url `{raw_url}` has no path"
        ))),
        Ok(url) => Ok(url.path().to_string()),
        // Site-relative links carry the path already.
        Err(url::ParseError::RelativeUrlWithoutBase) if raw_url.starts_with('/') => {
            let end = raw_url.find(['?', '#']).unwrap_or(raw_url.len());
            Ok(raw_url[..end].to_string())
        }
        Err(err) => Err(DomainError::malformed(format!(
            "image url `{raw_url}` could not be parsed: {err}"
        ))),
    }
}
