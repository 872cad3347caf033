//! CDN URLs for image asset references.
//!
//! Asset references look like `image-<hash>-<width>x<height>-<format>` and map
//! to `https://cdn.sanity.io/images/<project>/<dataset>/<hash>-<width>x<height>.<format>`.

use super::Config;
use crate::orders::ImageRef;
use regex::Regex;

const CDN_BASE: &str = "https://cdn.sanity.io/images";

#[derive(Debug, Clone)]
pub struct ImageUrls {
    project_id: String,
    dataset: String,
}

impl ImageUrls {
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            project_id: config.project_id().to_string(),
            dataset: config.dataset().to_string(),
        }
    }

    /// Full size URL, or `None` for images without a well-formed asset reference.
    #[must_use]
    pub fn url_for(&self, image: &ImageRef) -> Option<String> {
        let (hash, dimensions, format) = parse_asset_ref(image.asset_ref()?)?;

        Some(format!(
            "{CDN_BASE}/{}/{}/{hash}-{dimensions}.{format}",
            self.project_id, self.dataset
        ))
    }

    /// URL resized by the CDN to fit `width` x `height`.
    #[must_use]
    pub fn sized(&self, image: &ImageRef, width: u32, height: u32) -> Option<String> {
        self.url_for(image)
            .map(|url| format!("{url}?w={width}&h={height}"))
    }
}

fn parse_asset_ref(reference: &str) -> Option<(&str, &str, &str)> {
    let rest = reference.strip_prefix("image-")?;
    let (rest, format) = rest.rsplit_once('-')?;
    let (hash, dimensions) = rest.rsplit_once('-')?;

    let valid_hash = Regex::new(r"^[A-Za-z0-9]+$").is_ok_and(|re| re.is_match(hash));
    let valid_dimensions = Regex::new(r"^\d+x\d+$").is_ok_and(|re| re.is_match(dimensions));
    let valid_format = Regex::new(r"^[a-z0-9]+$").is_ok_and(|re| re.is_match(format));

    if valid_hash && valid_dimensions && valid_format {
        Some((hash, dimensions, format))
    } else {
        None
    }
}
