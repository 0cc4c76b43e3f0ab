use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Geolocation fields for a visitor. Either fully populated from a
/// successful lookup or all-`None`, never partially filled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoInfo {
    pub country: Option<String>,
    #[serde(rename = "countryCode")]
    pub country_code: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub timezone: Option<String>,
}

/// Outcome of a geolocation lookup. Every upstream failure is recovered
/// into `Unavailable` so the pipeline never branches on error causes.
#[derive(Debug, Clone, PartialEq)]
pub enum GeoLookup {
    Located(GeoInfo),
    Unavailable,
}

impl GeoLookup {
    pub fn into_info(self) -> GeoInfo {
        match self {
            Self::Located(info) => info,
            Self::Unavailable => GeoInfo::default(),
        }
    }
}

#[async_trait]
pub trait GeoProvider: Send + Sync {
    async fn lookup(&self, ip: &str) -> GeoLookup;
}

/// Client for the ip-api.com JSON endpoint.
pub struct IpApiClient {
    base_url: String,
    client: reqwest::Client,
}

impl IpApiClient {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[derive(Deserialize)]
struct IpApiResponse {
    status: String,
    message: Option<String>,
    country: Option<String>,
    #[serde(rename = "countryCode")]
    country_code: Option<String>,
    region: Option<String>,
    city: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
    timezone: Option<String>,
}

#[async_trait]
impl GeoProvider for IpApiClient {
    async fn lookup(&self, ip: &str) -> GeoLookup {
        if !has_public_geolocation(ip) {
            debug!("Skipping geolocation for local/private IP {ip}");
            return GeoLookup::Unavailable;
        }

        let url = format!(
            "{}/json/{ip}?fields=status,message,country,countryCode,region,city,lat,lon,timezone",
            self.base_url
        );

        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("Geolocation request for {ip} failed: {e}");
                return GeoLookup::Unavailable;
            }
        };

        if !response.status().is_success() {
            warn!(
                "Geolocation service returned HTTP {} for {ip}",
                response.status()
            );
            return GeoLookup::Unavailable;
        }

        let body = match response.json::<IpApiResponse>().await {
            Ok(body) => body,
            Err(e) => {
                warn!("Malformed geolocation response for {ip}: {e}");
                return GeoLookup::Unavailable;
            }
        };

        if body.status != "success" {
            warn!(
                "Geolocation lookup for {ip} failed: {}",
                body.message.as_deref().unwrap_or("unknown error")
            );
            return GeoLookup::Unavailable;
        }

        GeoLookup::Located(GeoInfo {
            country: body.country,
            country_code: body.country_code,
            city: body.city,
            region: body.region,
            latitude: body.lat,
            longitude: body.lon,
            timezone: body.timezone,
        })
    }
}

/// Whether an IP string can meaningfully be geolocated. Private, loopback,
/// link-local, and unparseable addresses have none. Documentation ranges
/// (e.g. 203.0.113.0/24) count as public; the lookup service itself answers
/// `status: "fail"` for them.
pub fn has_public_geolocation(raw: &str) -> bool {
    let Ok(ip) = raw.parse::<IpAddr>() else {
        return false;
    };

    match ip {
        IpAddr::V4(v4) => {
            !(v4.is_private()
                || v4.is_loopback()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast())
        }
        IpAddr::V6(v6) => {
            // fc00::/7 unique-local, fe80::/10 link-local
            let first = v6.segments()[0];
            let unique_local = (first & 0xfe00) == 0xfc00;
            let link_local = (first & 0xffc0) == 0xfe80;
            !(v6.is_loopback() || v6.is_unspecified() || unique_local || link_local)
        }
    }
}
