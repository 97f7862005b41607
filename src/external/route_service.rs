use std::time::Duration;

use async_trait::async_trait;

use crate::{
    api::RouteFinder,
    entities::{RouteQuery, RouteResponse},
    error::{configuration_error, upstream_error, Error},
};

/// HTTP client for the route service's `/api/v1/route` endpoint.
#[derive(Clone, Debug)]
pub struct RouteServiceClient {
    client: reqwest::Client,
    url: String,
}

impl RouteServiceClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| configuration_error(format!("failed to build http client: {}", err)))?;

        Ok(Self {
            client,
            url: route_url(base_url),
        })
    }
}

fn route_url(base_url: &str) -> String {
    format!("{}/api/v1/route", base_url.trim_end_matches('/'))
}

#[async_trait]
impl RouteFinder for RouteServiceClient {
    #[tracing::instrument(skip(self))]
    async fn find_route(&self, query: &RouteQuery) -> Result<RouteResponse, Error> {
        let res = self.client.post(&self.url).json(query).send().await?;

        let status = res.status();
        let body = res.bytes().await?;

        if !status.is_success() {
            return Err(upstream_error(format!(
                "route service returned {}: {}",
                status,
                String::from_utf8_lossy(&body)
            )));
        }

        Ok(serde_json::from_slice(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::entities::{Coordinates, Profile, RouteRequest, CODE_NO_ROUTE};
    use crate::error::{MALFORMED_RESPONSE, UPSTREAM};
    use crate::processor::{Processor, RetryPolicy};

    /// Answers every request with the same canned response and counts them.
    async fn serve(status: &'static str, body: &'static str) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = hits.clone();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(respond(socket, status, body));
            }
        });

        (base_url, hits)
    }

    async fn respond(mut socket: TcpStream, status: &str, body: &str) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];

        let header_end = loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };

        let headers = String::from_utf8_lossy(&buf[..header_end]).to_ascii_lowercase();
        let content_length = headers
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|value| value.trim().parse::<usize>().ok())
            .unwrap_or(0);

        while buf.len() < header_end + content_length {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }

        let response = format!(
            "HTTP/1.1 {}\r\n\
             Content-Type: application/json\r\n\
             Content-Length: {}\r\n\
             Connection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
    }

    fn request() -> RouteRequest {
        RouteRequest::new(
            1,
            Coordinates::new(51.5074, -0.1278),
            Coordinates::new(51.5155, -0.1419),
            Profile::Car,
        )
    }

    fn processor(client: RouteServiceClient) -> Processor {
        Processor::new(Arc::new(client), 1, Duration::from_secs(5))
            .with_retry_policy(RetryPolicy::new(3, Duration::from_millis(1)))
    }

    #[test]
    fn route_url_strips_trailing_slash() {
        assert_eq!(
            route_url("http://localhost:8090/"),
            "http://localhost:8090/api/v1/route"
        );
        assert_eq!(
            route_url("http://routes.internal"),
            "http://routes.internal/api/v1/route"
        );
    }

    #[tokio::test]
    async fn malformed_body_is_retried_until_exhausted() {
        let (base_url, hits) = serve("200 OK", "not json").await;
        let client = RouteServiceClient::new(&base_url, Duration::from_secs(5)).unwrap();

        let err = client.find_route(&RouteQuery::from(&request())).await.unwrap_err();
        assert_eq!(err.code, MALFORMED_RESPONSE);
        hits.store(0, Ordering::SeqCst);

        let result = processor(client)
            .process_route(&request(), &CancellationToken::new())
            .await;

        assert!(!result.is_success());
        assert_eq!(result.error.unwrap().code, MALFORMED_RESPONSE);
        assert_eq!(result.attempts, 3);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn server_error_is_retried_until_exhausted() {
        let (base_url, hits) = serve("500 Internal Server Error", r#"{"error":"boom"}"#).await;
        let client = RouteServiceClient::new(&base_url, Duration::from_secs(5)).unwrap();

        let err = client.find_route(&RouteQuery::from(&request())).await.unwrap_err();
        assert_eq!(err.code, UPSTREAM);
        assert!(err.message.contains("500"));
        hits.store(0, Ordering::SeqCst);

        let result = processor(client)
            .process_route(&request(), &CancellationToken::new())
            .await;

        assert_eq!(result.error.unwrap().code, UPSTREAM);
        assert_eq!(result.attempts, 3);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn no_route_code_is_not_retried() {
        let (base_url, hits) = serve("200 OK", r#"{"code":"NoRoute"}"#).await;
        let client = RouteServiceClient::new(&base_url, Duration::from_secs(5)).unwrap();

        let response = client.find_route(&RouteQuery::from(&request())).await.unwrap();
        assert_eq!(response.code, CODE_NO_ROUTE);
        assert!(response.routes.is_empty());
        hits.store(0, Ordering::SeqCst);

        let result = processor(client)
            .process_route(&request(), &CancellationToken::new())
            .await;

        assert!(result.error.unwrap().is_route_not_found());
        assert_eq!(result.attempts, 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
