use url::Url;

#[derive(thiserror::Error, Debug)]
pub enum EndpointError {
    #[error("Invalid base URL: {0}")]
    InvalidBase(#[from] url::ParseError),

    #[error("Base URL cannot carry a path: {0}")]
    CannotBeABase(String),
}

/// Appends `segments` to the path of `base`, percent-encoding each one so ids
/// containing `/`, `?` or `#` stay inside their segment.
pub fn endpoint(base: &str, segments: &[&str]) -> Result<Url, EndpointError> {
    let mut url = Url::parse(base)?;

    url.path_segments_mut()
        .map_err(|_| EndpointError::CannotBeABase(base.to_string()))?
        .pop_if_empty()
        .extend(segments);

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_appends_to_base_path() {
        let url = endpoint("http://magento.local/api/", &["orders", "o1"]).unwrap();
        assert_eq!(url.as_str(), "http://magento.local/api/orders/o1");
    }

    #[test]
    fn test_encodes_reserved_characters_in_ids() {
        let url = endpoint("http://magento.local/api", &["users", "a/b?c#d"]).unwrap();
        assert_eq!(url.path(), "/api/users/a%2Fb%3Fc%23d");
        assert!(url.query().is_none());
        assert!(url.fragment().is_none());
    }

    #[test]
    fn test_rejects_non_hierarchical_base() {
        assert!(matches!(
            endpoint("mailto:crm@example.com", &["contacts"]),
            Err(EndpointError::CannotBeABase(_))
        ));
    }
}
