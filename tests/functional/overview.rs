use crate::functional::{TestCluster, TestResources};
use clap::Parser;
use constellation::config::Config;
use constellation::server::ConstellationServer;
use serde_json::Value;
use tokio::time::{Duration, sleep};

/// Exercises `KubeQueryer` + `Engine` together against a real (containerized)
/// cluster for the service → pod scenario: a service selecting one pod,
/// reached through `/overview`.
#[cfg(feature = "functional-tests")]
#[tokio::test]
async fn test_service_to_pod_overview() -> Result<(), Box<dyn std::error::Error>> {
    let cluster = TestCluster::new().await?;
    let resources = TestResources::new(cluster.client.clone(), "test-ns");

    resources.create_namespace().await?;

    let mut config = Config::try_parse_from(["constellation"])?;
    config.bind_addr = "127.0.0.1:0".to_string();
    config.default_namespace = "test-ns".to_string();

    let server = ConstellationServer::new_with_client(&config, cluster.client.clone()).await?;
    let server_url = format!("http://{}", server.addr);
    let _server_handle = tokio::spawn(async move { server.serve().await });

    resources.create_test_service("test-service", "test-app").await?;
    resources.create_test_deployment("test-app", 1).await?;
    resources.wait_for_pods_ready("app=test-app", 1).await?;

    sleep(Duration::from_secs(2)).await;

    let response = reqwest::get(format!(
        "{server_url}/overview?kind=Service&name=test-service&namespace=test-ns"
    ))
    .await?;
    assert!(response.status().is_success());
    let graph: Value = response.json().await?;

    let nodes = graph["nodes"].as_array().unwrap();
    let service_node = nodes
        .iter()
        .find(|n| n["kind"]["kind"].as_str() == Some("Service"))
        .expect("service node present");
    assert_eq!(service_node["name"].as_str(), Some("test-service"));

    let pod_node = nodes
        .iter()
        .find(|n| n["kind"]["kind"].as_str() == Some("Pod"))
        .expect("pod node present");

    let edges = graph["edges"].as_array().unwrap();
    assert!(
        edges
            .iter()
            .any(|e| e["parent_uid"] == service_node["uid"] && e["child_uid"] == pod_node["uid"]),
        "expected an edge from the service to the pod it selects"
    );

    resources.cleanup().await?;
    cluster.cleanup().await?;
    Ok(())
}
