use agrilink_core::ProductImage;
use serde_json::Value;

use super::fields::{self, Record};

struct RawImage {
    image: ProductImage,
    /// The primary flag as sent, `None` when the response omitted it.
    explicit_primary: Option<bool>,
}

/// Normalizes a raw `images` value. Entries may be objects or bare URL
/// strings; anything else is dropped.
///
/// Exactly one image of a non-empty result is primary. The first explicit
/// `true` wins. Without one, the first image whose flag was not explicitly
/// `false` is primary, falling back to index 0 when every flag is `false`.
pub(crate) fn normalize_images(raw: Option<&Value>) -> Vec<ProductImage> {
    let items = match raw {
        None | Some(Value::Null) => return Vec::new(),
        Some(Value::Array(items)) => items,
        Some(other) => {
            tracing::warn!(value = %other, "ignoring non-array images field");
            return Vec::new();
        }
    };

    let mut raws: Vec<RawImage> = items
        .iter()
        .filter_map(|item| match item {
            Value::Object(record) => Some(image_from_record(record)),
            Value::String(url) => Some(RawImage {
                image: ProductImage {
                    url: url.clone(),
                    ..ProductImage::default()
                },
                explicit_primary: None,
            }),
            other => {
                tracing::warn!(value = %other, "dropping unrecognized image entry");
                None
            }
        })
        .collect();

    for (idx, raw) in raws.iter_mut().enumerate() {
        if raw.image.alt.is_none() {
            raw.image.alt = Some(format!("Product image {}", idx + 1));
        }
    }

    let primary = raws
        .iter()
        .position(|r| r.explicit_primary == Some(true))
        .or_else(|| raws.iter().position(|r| r.explicit_primary.is_none()))
        .unwrap_or(0);

    raws.into_iter()
        .enumerate()
        .map(|(idx, raw)| ProductImage {
            is_primary: idx == primary,
            ..raw.image
        })
        .collect()
}

fn image_from_record(record: &Record) -> RawImage {
    RawImage {
        image: ProductImage {
            url: fields::text(record, &["url", "imageUrl", "src"]).unwrap_or_default(),
            filename: fields::text(record, &["filename", "file_name", "name"]).unwrap_or_default(),
            alt: fields::text(record, &["alt", "altText"]).filter(|alt| !alt.trim().is_empty()),
            is_primary: false,
        },
        explicit_primary: fields::flag(record, &["isPrimary", "is_primary"]),
    }
}
