use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use routegen::api::RouteFinder;
use routegen::config::Config;
use routegen::engine::Engine;
use routegen::entities::{Route, RouteData, RouteMetadata, RouteQuery, RouteResponse, RunSummary};
use routegen::error::Error;
use routegen::external::FileSink;

/// Answers `NoRoute` for every third call, `Ok` otherwise.
struct AlternatingFinder {
    calls: AtomicUsize,
}

#[async_trait]
impl RouteFinder for AlternatingFinder {
    async fn find_route(&self, query: &RouteQuery) -> Result<RouteResponse, Error> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call % 3 == 0 {
            return Ok(RouteResponse::no_route());
        }

        let mut route = Route::new(1000.0 + call as f64, 120.0);
        route.summary = format!("{:?}", query.profile);
        Ok(RouteResponse::ok(route))
    }
}

fn config(directory: &str) -> Config {
    let yaml = format!(
        r#"
route_generator:
  route_count: 12
  method: random
  country: uk
  country_bounds:
    uk: {{ min_lat: 49.9, max_lat: 58.7, min_lng: -8.2, max_lng: 1.8 }}
  profile: random
  random_seed: 1234
  route_service:
    base_url: "http://localhost:8090"
    max_concurrent_requests: 4
  output:
    directory: "{}"
"#,
        directory
    );

    Config::from_yaml_bytes(yaml.as_bytes()).unwrap()
}

#[tokio::test]
async fn random_batch_is_written_to_disk() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("routes");
    let config = config(output.to_str().unwrap());

    let sink = FileSink::create(&config.route_generator.output.directory)
        .await
        .unwrap();
    let finder = Arc::new(AlternatingFinder {
        calls: AtomicUsize::new(0),
    });
    let engine = Engine::new(config, finder.clone(), Arc::new(sink));

    let report = engine.run(&CancellationToken::new()).await.unwrap();

    assert_eq!(finder.calls.load(Ordering::SeqCst), 12);
    assert_eq!(report.summary.total_routes, 12);
    assert_eq!(report.summary.successful_routes, 8);
    assert_eq!(report.summary.failed_routes, 4);
    assert_eq!(report.summary.country.as_deref(), Some("uk"));

    let index: Vec<RouteMetadata> =
        serde_json::from_slice(&std::fs::read(output.join("metadata.json")).unwrap()).unwrap();
    let ids: Vec<u64> = index.iter().map(|m| m.id).collect();
    assert_eq!(ids, (1..=12).collect::<Vec<_>>());

    for metadata in &index {
        let path = output.join(format!("route_{:06}.json", metadata.id));
        let data: RouteData = serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap();

        assert_eq!(data.metadata.success, metadata.success);
        assert_eq!(data.route.is_some(), metadata.success);
        if !metadata.success {
            assert_eq!(metadata.error_message.as_deref(), Some("no route found"));
        }
    }

    let summary: RunSummary =
        serde_json::from_slice(&std::fs::read(output.join("summary.json")).unwrap()).unwrap();
    assert!((summary.success_rate - 800.0 / 12.0).abs() < 1e-9);
}

#[tokio::test]
async fn same_seed_reproduces_the_batch() {
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();

    let mut indexes = vec![];
    for dir in [&first, &second] {
        let config = config(dir.path().to_str().unwrap());
        let sink = FileSink::create(dir.path()).await.unwrap();
        let finder = Arc::new(AlternatingFinder {
            calls: AtomicUsize::new(0),
        });

        Engine::new(config, finder, Arc::new(sink))
            .run(&CancellationToken::new())
            .await
            .unwrap();

        let index: Vec<RouteMetadata> =
            serde_json::from_slice(&std::fs::read(dir.path().join("metadata.json")).unwrap())
                .unwrap();
        indexes.push(
            index
                .into_iter()
                .map(|m| (m.id, m.start_lat, m.start_lng, m.end_lat, m.end_lng, m.profile))
                .collect::<Vec<_>>(),
        );
    }

    assert_eq!(indexes[0], indexes[1]);
}
