use std::env;

pub const DEFAULT_DATABASE_NAME: &str = "webapp-db";
pub const DEFAULT_CONTAINER_NAME: &str = "visitor-logs";
pub const DEFAULT_GEO_API_BASE_URL: &str = "http://ip-api.com";

/// Forwarding header injected by the hosting platform, checked before the
/// standard proxy headers. Overridable via `PLATFORM_IP_HEADER`; an empty
/// value disables the platform slot.
pub const DEFAULT_PLATFORM_IP_HEADER: &str = "x-azure-clientip";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub store_endpoint: Option<String>,
    pub store_database_name: String,
    pub store_container_name: String,
    pub store_token: Option<String>,
    pub geo_api_base_url: String,
    pub geo_timeout_secs: u64,
    pub platform_ip_header: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let platform_ip_header = match env::var("PLATFORM_IP_HEADER") {
            Ok(value) if value.trim().is_empty() => None,
            Ok(value) => Some(value.trim().to_lowercase()),
            Err(_) => Some(DEFAULT_PLATFORM_IP_HEADER.to_string()),
        };

        Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .unwrap_or(8000),
            store_endpoint: env::var("STORE_ENDPOINT").ok().filter(|s| !s.is_empty()),
            store_database_name: env::var("STORE_DATABASE_NAME")
                .unwrap_or_else(|_| DEFAULT_DATABASE_NAME.to_string()),
            store_container_name: env::var("STORE_CONTAINER_NAME")
                .unwrap_or_else(|_| DEFAULT_CONTAINER_NAME.to_string()),
            store_token: env::var("STORE_TOKEN").ok().filter(|s| !s.is_empty()),
            geo_api_base_url: env::var("GEO_API_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_GEO_API_BASE_URL.to_string()),
            geo_timeout_secs: env::var("GEO_TIMEOUT_SECS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .unwrap_or(10),
            platform_ip_header,
        }
    }
}
