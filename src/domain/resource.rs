use std::collections::BTreeSet;

use reqwest::Url;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResourceError {
    #[error("resource id must not be blank")]
    BlankId,

    #[error("resource title must not be blank")]
    BlankTitle,

    #[error("invalid resource url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// A tagged media record pointing at externally hosted content.
///
/// Instances are only obtainable through [`Resource::new`] or
/// [`Resource::create`], so every value in circulation has a non-blank id and
/// title and an absolute url with both scheme and host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resource {
    id: String,
    title: String,
    url: String,
    tags: BTreeSet<String>,
    #[serde(skip)]
    parsed: Url,
}

impl Resource {
    pub fn new<I, T>(
        id: impl Into<String>,
        title: impl Into<String>,
        url: impl Into<String>,
        tags: I,
    ) -> Result<Self, ResourceError>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let id = id.into();
        let title = title.into();
        let url = url.into();

        if id.trim().is_empty() {
            return Err(ResourceError::BlankId);
        }
        if title.trim().is_empty() {
            return Err(ResourceError::BlankTitle);
        }
        let parsed = parse_absolute_url(&url)?;

        Ok(Self {
            id,
            title,
            url,
            tags: tags.into_iter().map(Into::into).collect(),
            parsed,
        })
    }

    /// Build a brand-new resource with a random v4 id.
    pub fn create<I, T>(
        title: impl Into<String>,
        url: impl Into<String>,
        tags: I,
    ) -> Result<Self, ResourceError>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self::new(Uuid::new_v4().to_string(), title, url, tags)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn parsed_url(&self) -> &Url {
        &self.parsed
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    pub fn has_tags(&self) -> bool {
        !self.tags.is_empty()
    }
}

fn parse_absolute_url(raw: &str) -> Result<Url, ResourceError> {
    let invalid = |reason: &str| ResourceError::InvalidUrl {
        url: raw.to_string(),
        reason: reason.to_string(),
    };

    let url = Url::parse(raw).map_err(|e| invalid(&e.to_string()))?;
    if url.scheme().is_empty() {
        return Err(invalid("missing scheme"));
    }
    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(invalid("missing host")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_resource() {
        let resource = Resource::new(
            "r1",
            "Flag of Bhutan",
            "https://i.ibb.co/abc/bhutan.png",
            ["flag", "flag", "asia"],
        )
        .unwrap();

        assert_eq!(resource.id(), "r1");
        assert_eq!(resource.tags().len(), 2);
        assert!(resource.has_tags());
        assert_eq!(resource.parsed_url().host_str(), Some("i.ibb.co"));
    }

    #[test]
    fn test_create_assigns_uuid() {
        let a = Resource::create("Eiffel Tower", "https://example.com/a.jpg", ["tourist"]).unwrap();
        let b = Resource::create("Eiffel Tower", "https://example.com/a.jpg", ["tourist"]).unwrap();

        assert!(Uuid::parse_str(a.id()).is_ok());
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_blank_fields_rejected() {
        assert_eq!(
            Resource::new("  ", "t", "https://example.com", Vec::<String>::new()),
            Err(ResourceError::BlankId)
        );
        assert_eq!(
            Resource::new("id", "\t", "https://example.com", Vec::<String>::new()),
            Err(ResourceError::BlankTitle)
        );
    }

    #[test]
    fn test_url_without_scheme_rejected() {
        let result = Resource::new("id", "t", "example.com/image.png", Vec::<String>::new());
        assert!(matches!(result, Err(ResourceError::InvalidUrl { .. })));
    }

    #[test]
    fn test_url_without_host_rejected() {
        for url in [
            "mailto:someone@example.com",
            "file:///tmp/a.png",
            "data:image/png;base64,AAAA",
        ] {
            let result = Resource::new("id", "t", url, Vec::<String>::new());
            assert!(
                matches!(result, Err(ResourceError::InvalidUrl { .. })),
                "{url} should be rejected"
            );
        }
    }

    #[test]
    fn test_no_tags() {
        let resource = Resource::new("id", "t", "http://host/x", Vec::<String>::new()).unwrap();
        assert!(!resource.has_tags());
    }
}
