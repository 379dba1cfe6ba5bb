use std::time::Duration;

use rand::Rng;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use thiserror::Error;

use crate::config::RoutingSettings;
use crate::utils::geo::Coordinate;

/// Full-resolution driving route between two points.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteGeometry {
    pub points: Vec<Coordinate>,
    pub distance_m: f64,
}

#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("routing request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("routing service answered {0}")]
    Status(StatusCode),

    #[error("no route found: {0}")]
    NoRoute(String),

    #[error("invalid routing URL: {0}")]
    Url(String),
}

impl RoutingError {
    /// Transient failures worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            RoutingError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            RoutingError::Status(status) => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            RoutingError::NoRoute(_) | RoutingError::Url(_) => false,
        }
    }
}

/// Source of driving routes.
#[cfg_attr(test, mockall::automock)]
pub trait RouteProvider: Send + Sync {
    async fn fetch_route(
        &self,
        start: Coordinate,
        end: Coordinate,
    ) -> Result<RouteGeometry, RoutingError>;
}

#[derive(Deserialize)]
struct OsrmRouteResponse {
    code: String,
    message: Option<String>,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Deserialize)]
struct OsrmRoute {
    distance: f64,
    geometry: OsrmGeometry,
}

#[derive(Deserialize)]
struct OsrmGeometry {
    coordinates: Vec<[f64; 2]>,
}

/// HTTP client for an OSRM `route` endpoint.
#[derive(Debug, Clone)]
pub struct OsrmClient {
    client: Client,
    base_url: String,
    max_retries: u32,
    backoff_base: Duration,
}

impl OsrmClient {
    pub fn new(settings: &RoutingSettings) -> Result<Self, RoutingError> {
        let client = Client::builder()
            .user_agent("rideshare-backend/0.1")
            .timeout(settings.timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            max_retries: settings.max_retries,
            backoff_base: settings.backoff_base,
        })
    }

    fn route_url(&self, start: Coordinate, end: Coordinate) -> Result<Url, RoutingError> {
        let base = format!(
            "{}/route/v1/driving/{:.6},{:.6};{:.6},{:.6}",
            self.base_url, start.lon, start.lat, end.lon, end.lat
        );
        let mut url = Url::parse(&base).map_err(|e| RoutingError::Url(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("overview", "full")
            .append_pair("geometries", "geojson");
        Ok(url)
    }

    async fn request_route(
        &self,
        start: Coordinate,
        end: Coordinate,
    ) -> Result<RouteGeometry, RoutingError> {
        let url = self.route_url(start, end)?;
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(RoutingError::Status(status));
        }

        // OSRM explains 4xx answers (NoRoute, InvalidQuery) in a JSON body
        let body: OsrmRouteResponse = match response.json().await {
            Ok(body) => body,
            Err(_) if !status.is_success() => return Err(RoutingError::Status(status)),
            Err(e) => return Err(RoutingError::Http(e)),
        };

        parse_route_response(body)
    }
}

impl RouteProvider for OsrmClient {
    #[tracing::instrument(skip(self))]
    async fn fetch_route(
        &self,
        start: Coordinate,
        end: Coordinate,
    ) -> Result<RouteGeometry, RoutingError> {
        let mut attempt = 0;
        loop {
            match self.request_route(start, end).await {
                Ok(geometry) => {
                    tracing::debug!(
                        points = geometry.points.len(),
                        distance_m = geometry.distance_m,
                        attempt,
                        "route fetched"
                    );
                    return Ok(geometry);
                }
                Err(err) if err.is_retryable() && attempt < self.max_retries => {
                    let delay = backoff_delay(self.backoff_base, attempt);
                    tracing::warn!(
                        error = %err,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        "routing request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

fn parse_route_response(body: OsrmRouteResponse) -> Result<RouteGeometry, RoutingError> {
    if body.code != "Ok" {
        return Err(RoutingError::NoRoute(body.message.unwrap_or(body.code)));
    }

    let route = body
        .routes
        .into_iter()
        .next()
        .ok_or_else(|| RoutingError::NoRoute("response contained no routes".to_string()))?;

    if route.geometry.coordinates.is_empty() {
        return Err(RoutingError::NoRoute("route geometry is empty".to_string()));
    }

    // GeoJSON order is [lon, lat]
    let points = route
        .geometry
        .coordinates
        .into_iter()
        .map(|[lon, lat]| Coordinate::new(lat, lon))
        .collect();

    Ok(RouteGeometry {
        points,
        distance_m: route.distance,
    })
}

/// Exponential backoff with up to 50% random jitter.
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let exponential = base.saturating_mul(1u32 << attempt.min(6));
    let max_jitter = (exponential.as_millis() / 2) as u64;
    let jitter = rand::thread_rng().gen_range(0..=max_jitter);
    exponential + Duration::from_millis(jitter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path_regex, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings(base_url: String, max_retries: u32) -> RoutingSettings {
        RoutingSettings {
            base_url,
            timeout: Duration::from_secs(2),
            max_retries,
            backoff_base: Duration::from_millis(1),
        }
    }

    fn berlin() -> (Coordinate, Coordinate) {
        (
            Coordinate::new(52.517037, 13.388860),
            Coordinate::new(52.529407, 13.397634),
        )
    }

    fn route_body() -> serde_json::Value {
        json!({
            "code": "Ok",
            "routes": [{
                "distance": 1886.3,
                "duration": 260.1,
                "geometry": {
                    "type": "LineString",
                    "coordinates": [[13.38886, 52.517037], [13.39, 52.52], [13.397634, 52.529407]]
                }
            }],
            "waypoints": []
        })
    }

    #[tokio::test]
    async fn test_fetch_route_parses_geojson() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/route/v1/driving/13\.388860,52\.517037;13\.397634,52\.529407$"))
            .and(query_param("overview", "full"))
            .and(query_param("geometries", "geojson"))
            .respond_with(ResponseTemplate::new(200).set_body_json(route_body()))
            .expect(1)
            .mount(&server)
            .await;

        let client = OsrmClient::new(&settings(server.uri(), 0)).unwrap();
        let (start, end) = berlin();
        let geometry = client.fetch_route(start, end).await.unwrap();

        assert_eq!(geometry.points.len(), 3);
        assert_eq!(geometry.points[0], Coordinate::new(52.517037, 13.38886));
        assert_eq!(geometry.points[2], Coordinate::new(52.529407, 13.397634));
        assert!((geometry.distance_m - 1886.3).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_no_route_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/route/v1/driving/"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "code": "NoRoute",
                "message": "Impossible route between points"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = OsrmClient::new(&settings(server.uri(), 3)).unwrap();
        let (start, end) = berlin();
        let err = client.fetch_route(start, end).await.unwrap_err();

        assert!(matches!(err, RoutingError::NoRoute(ref msg) if msg.contains("Impossible")));
    }

    #[tokio::test]
    async fn test_empty_routes_is_no_route() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": "Ok",
                "routes": []
            })))
            .mount(&server)
            .await;

        let client = OsrmClient::new(&settings(server.uri(), 0)).unwrap();
        let (start, end) = berlin();
        assert!(matches!(
            client.fetch_route(start, end).await,
            Err(RoutingError::NoRoute(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_geometry_is_no_route() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": "Ok",
                "routes": [{
                    "distance": 0.0,
                    "duration": 0.0,
                    "geometry": { "type": "LineString", "coordinates": [] }
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = OsrmClient::new(&settings(server.uri(), 2)).unwrap();
        let (start, end) = berlin();
        assert!(matches!(
            client.fetch_route(start, end).await,
            Err(RoutingError::NoRoute(ref msg)) if msg.contains("empty")
        ));
    }

    #[tokio::test]
    async fn test_retries_server_errors_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(route_body()))
            .expect(1)
            .mount(&server)
            .await;

        let client = OsrmClient::new(&settings(server.uri(), 2)).unwrap();
        let (start, end) = berlin();
        let geometry = client.fetch_route(start, end).await.unwrap();
        assert_eq!(geometry.points.len(), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_retry_budget() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .expect(2)
            .mount(&server)
            .await;

        let client = OsrmClient::new(&settings(server.uri(), 1)).unwrap();
        let (start, end) = berlin();
        let err = client.fetch_route(start, end).await.unwrap_err();
        assert!(matches!(err, RoutingError::Status(StatusCode::BAD_GATEWAY)));
    }

    #[tokio::test]
    async fn test_slow_service_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(route_body())
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let mut slow = settings(server.uri(), 0);
        slow.timeout = Duration::from_millis(50);
        let client = OsrmClient::new(&slow).unwrap();
        let (start, end) = berlin();
        let err = client.fetch_route(start, end).await.unwrap_err();

        assert!(matches!(err, RoutingError::Http(ref e) if e.is_timeout()));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_backoff_grows_and_stays_bounded() {
        let base = Duration::from_millis(100);
        let first = backoff_delay(base, 0);
        assert!(first >= base && first <= Duration::from_millis(150));

        let third = backoff_delay(base, 2);
        assert!(third >= Duration::from_millis(400) && third <= Duration::from_millis(600));

        let capped = backoff_delay(base, 30);
        assert!(capped <= Duration::from_millis(9_600));
    }
}
