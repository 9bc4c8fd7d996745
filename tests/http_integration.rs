//! Integration tests for the Dataflow job resource using wiremock
//!
//! These tests run the adapter over the real HTTP client against a mocked
//! Dataflow endpoint, checking request shapes and response handling.

use dfjob::gcp::auth::GcpCredentials;
use dfjob::gcp::client::GcpClient;
use dfjob::gcp::dataflow::DataflowApi;
use dfjob::gcp::http::{is_not_found, ApiError};
use dfjob::resource::{JobConfig, JobResourceAdapter, ProviderContext, ReadOutcome, ResourceRecord};
use serde_json::json;
use wiremock::matchers::{bearer_token, body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TEMPLATES_PATH: &str = "/v1b3/projects/test-project/templates";
const JOB_PATH: &str = "/v1b3/projects/test-project/jobs/2024-job-1";

fn client_for(server: &MockServer) -> GcpClient {
    GcpClient::with_credentials(
        GcpCredentials::from_static_token("test-token"),
        Some(&server.uri()),
    )
    .expect("client should build")
}

fn ctx() -> ProviderContext {
    ProviderContext::new(Some("test-project".to_string()))
}

fn declaration(on_delete: &str) -> JobConfig {
    JobConfig::from_yaml(&format!(
        r#"
name: wordcount
template_gcs_path: gs://dataflow-templates/latest/Word_Count
environment:
  temp_location: gs://test-bucket/tmp
  zone: us-central1-f
  max_workers: 4
parameters:
  inputFile: gs://dataflow-samples/shakespeare/kinglear.txt
  output: gs://test-bucket/out
on_delete: {}
"#,
        on_delete
    ))
    .expect("declaration should parse")
}

fn tracked(on_delete: &str) -> ResourceRecord {
    ResourceRecord {
        id: Some("2024-job-1".to_string()),
        config: Some(declaration(on_delete)),
        project: Some("test-project".to_string()),
        ..Default::default()
    }
}

mod create_tests {
    use super::*;

    /// Create posts the template request and re-reads the job
    #[tokio::test]
    async fn test_create_launches_template_and_reads_state() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(TEMPLATES_PATH))
            .and(bearer_token("test-token"))
            .and(body_json(json!({
                "jobName": "wordcount",
                "gcsPath": "gs://dataflow-templates/latest/Word_Count",
                "parameters": {
                    "inputFile": "gs://dataflow-samples/shakespeare/kinglear.txt",
                    "output": "gs://test-bucket/out"
                },
                "environment": {
                    "tempLocation": "gs://test-bucket/tmp",
                    "zone": "us-central1-f",
                    "maxWorkers": 4
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "2024-job-1",
                "projectId": "test-project",
                "name": "wordcount",
                "currentState": "JOB_STATE_PENDING"
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path(JOB_PATH))
            .and(bearer_token("test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "2024-job-1",
                "currentState": "JOB_STATE_RUNNING"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let adapter = JobResourceAdapter::new(client_for(&server));
        let mut record = ResourceRecord::default();

        adapter
            .create(&declaration("drain"), &mut record, &ctx())
            .await
            .expect("create should succeed");

        assert_eq!(record.id.as_deref(), Some("2024-job-1"));
        assert_eq!(record.state.as_deref(), Some("JOB_STATE_RUNNING"));
    }

    /// A requested state this crate does not model must not lose the new job
    #[tokio::test]
    async fn test_create_tolerates_unknown_requested_state() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(TEMPLATES_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "2024-job-1",
                "currentState": "JOB_STATE_PENDING",
                "requestedState": "JOB_STATE_PAUSING"
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path(JOB_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "2024-job-1",
                "currentState": "JOB_STATE_PAUSED",
                "requestedState": "JOB_STATE_PAUSED"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let adapter = JobResourceAdapter::new(client_for(&server));
        let mut record = ResourceRecord::default();

        adapter
            .create(&declaration("drain"), &mut record, &ctx())
            .await
            .expect("create should succeed");

        assert_eq!(record.id.as_deref(), Some("2024-job-1"));
        assert_eq!(record.state.as_deref(), Some("JOB_STATE_PAUSED"));
    }

    /// Create failures surface the API error and leave nothing tracked
    #[tokio::test]
    async fn test_create_conflict_is_surfaced() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(TEMPLATES_PATH))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({
                "error": {
                    "code": 409,
                    "message": "There is already an active job named wordcount",
                    "status": "ALREADY_EXISTS"
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let adapter = JobResourceAdapter::new(client_for(&server));
        let mut record = ResourceRecord::default();

        let err = adapter
            .create(&declaration("drain"), &mut record, &ctx())
            .await
            .expect_err("create should fail");

        let api = err.downcast_ref::<ApiError>().expect("should be an API error");
        assert_eq!(api.status.as_u16(), 409);
        assert_eq!(api.message, "There is already an active job named wordcount");
        assert!(!record.is_tracked());
    }
}

mod read_tests {
    use super::*;

    #[tokio::test]
    async fn test_read_mirrors_current_state() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(JOB_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "2024-job-1",
                "currentState": "JOB_STATE_DRAINED",
                "currentStateTime": "2024-05-01T10:00:00Z"
            })))
            .mount(&server)
            .await;

        let adapter = JobResourceAdapter::new(client_for(&server));
        let mut record = tracked("drain");

        let outcome = adapter.read(&mut record, &ctx()).await.expect("read should succeed");
        assert_eq!(outcome, ReadOutcome::Present);
        assert_eq!(record.state.as_deref(), Some("JOB_STATE_DRAINED"));
    }

    /// A 404 means the job was removed outside our control
    #[tokio::test]
    async fn test_read_404_removes_record() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(JOB_PATH))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": {
                    "code": 404,
                    "message": "(9f2e): Information about job 2024-job-1 could not be found",
                    "status": "NOT_FOUND"
                }
            })))
            .mount(&server)
            .await;

        let adapter = JobResourceAdapter::new(client_for(&server));
        let mut record = tracked("drain");

        let outcome = adapter.read(&mut record, &ctx()).await.expect("404 is not an error");
        assert_eq!(outcome, ReadOutcome::Removed);
        assert!(!record.is_tracked());
    }

    #[tokio::test]
    async fn test_read_403_is_an_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(JOB_PATH))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "error": {"code": 403, "message": "Permission denied"}
            })))
            .mount(&server)
            .await;

        let adapter = JobResourceAdapter::new(client_for(&server));
        let mut record = tracked("drain");

        let err = adapter
            .read(&mut record, &ctx())
            .await
            .expect_err("403 should fail the read");
        assert!(!is_not_found(&err));
        assert_eq!(record.id.as_deref(), Some("2024-job-1"));
    }
}

mod delete_tests {
    use super::*;

    async fn expect_requested_state(server: &MockServer, state: &str) {
        Mock::given(method("PUT"))
            .and(path(JOB_PATH))
            .and(bearer_token("test-token"))
            .and(body_json(json!({ "requestedState": state })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "2024-job-1",
                "currentState": "JOB_STATE_RUNNING",
                "requestedState": state
            })))
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_delete_drain() {
        let server = MockServer::start().await;
        expect_requested_state(&server, "JOB_STATE_DRAINING").await;

        let adapter = JobResourceAdapter::new(client_for(&server));
        adapter
            .delete(&tracked("drain"), &ctx())
            .await
            .expect("drain should succeed");
    }

    #[tokio::test]
    async fn test_delete_cancel() {
        let server = MockServer::start().await;
        expect_requested_state(&server, "JOB_STATE_CANCELLED").await;

        let adapter = JobResourceAdapter::new(client_for(&server));
        adapter
            .delete(&tracked("cancel"), &ctx())
            .await
            .expect("cancel should succeed");
    }

    /// An invalid policy never reaches the network
    #[tokio::test]
    async fn test_invalid_policy_sends_nothing() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let adapter = JobResourceAdapter::new(client_for(&server));
        let err = adapter
            .delete_with_policy("test-project", "2024-job-1", "pause")
            .await
            .expect_err("pause is not a policy");
        assert_eq!(err.to_string(), "invalid `on_delete` policy: pause");
    }

    /// An empty update response is tolerated
    #[tokio::test]
    async fn test_update_with_empty_body() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path(JOB_PATH))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let job = client
            .update_job(
                "test-project",
                "2024-job-1",
                &dfjob::gcp::dataflow::Job::default(),
            )
            .await
            .expect("empty body should parse");
        assert_eq!(job, dfjob::gcp::dataflow::Job::default());
    }
}
