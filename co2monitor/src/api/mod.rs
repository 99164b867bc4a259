//! Backend access.
//!
//! - [`MonitorApi`]: the CO2 monitor REST endpoints
//! - [`AirPollutionClient`]: the public air-pollution fallback
//! - [`HttpClient`]: the transport seam both are generic over

mod air_pollution;
mod client;
mod error;
mod http;
mod types;

pub use air_pollution::{AirPollutionClient, AIR_POLLUTION_URL};
pub use client::{MonitorApi, DEFAULT_BASE_URL, MAX_SEARCH_LIMIT, MIN_SEARCH_LIMIT};
pub use error::{DataFetchError, FetchResult};
pub use http::{
    build_url, BoxFuture, HttpClient, HttpError, HttpResponse, ReqwestClient,
    DEFAULT_TIMEOUT_SECS, USER_AGENT,
};

#[cfg(test)]
pub use http::tests::MockHttpClient;
