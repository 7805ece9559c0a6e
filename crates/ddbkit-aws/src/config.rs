//! Client configuration.

use std::env;

/// Where and how [`AwsStore`](crate::AwsStore) connects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwsStoreConfig {
    /// Endpoint override, e.g. `http://localhost:8000` for DynamoDB Local.
    pub endpoint_url: Option<String>,
    /// AWS region.
    pub region: String,
    /// Use fixed dummy credentials instead of the default provider chain.
    pub static_credentials: bool,
}

impl Default for AwsStoreConfig {
    fn default() -> Self {
        Self {
            endpoint_url: None,
            region: "us-east-1".to_owned(),
            static_credentials: false,
        }
    }
}

impl AwsStoreConfig {
    /// Load configuration from environment variables.
    ///
    /// - `DDBKIT_ENDPOINT_URL`: endpoint override.
    /// - `AWS_REGION`, then `DEFAULT_REGION`: region (default `us-east-1`).
    ///
    /// With an endpoint override and no `AWS_ACCESS_KEY_ID`, dummy
    /// credentials are used so local endpoints work out of the box.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(v) = env::var("DDBKIT_ENDPOINT_URL") {
            if !v.is_empty() {
                config.endpoint_url = Some(v);
            }
        }
        if let Ok(v) = env::var("AWS_REGION").or_else(|_| env::var("DEFAULT_REGION")) {
            config.region = v;
        }
        config.static_credentials =
            config.endpoint_url.is_some() && env::var_os("AWS_ACCESS_KEY_ID").is_none();

        config
    }

    /// Point at a local endpoint with dummy credentials.
    #[must_use]
    pub fn local(endpoint_url: impl Into<String>) -> Self {
        Self {
            endpoint_url: Some(endpoint_url.into()),
            static_credentials: true,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_create_default_config() {
        let config = AwsStoreConfig::default();
        assert_eq!(config.region, "us-east-1");
        assert!(config.endpoint_url.is_none());
        assert!(!config.static_credentials);
    }

    #[test]
    fn test_should_create_local_config() {
        let config = AwsStoreConfig::local("http://localhost:8000");
        assert_eq!(config.endpoint_url.as_deref(), Some("http://localhost:8000"));
        assert!(config.static_credentials);
    }
}
