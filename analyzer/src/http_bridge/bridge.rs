use crate::http_bridge::form::UploadForm;
use crate::http_bridge::model::{ErrorDetail, RootMessage, StatusModel};
use crate::workflow::runner::Runner;
use anyhow::Context;
use log::{error, info, warn};
use serde::Serialize;
use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;
use tdrcore::prelude::{AnalysisError, AnalysisResult};
use tdrcore::telemetry::MetricsRecorder;
use tdrcore::{AnalysisReport, WaveformInspection};
use warp::http::StatusCode;
use warp::multipart::FormData;
use warp::reply::{Json, WithStatus};
use warp::{Filter, Rejection, Reply};

#[derive(Clone)]
struct BridgeState {
    runner: Arc<Runner>,
    metrics: Arc<MetricsRecorder>,
}

impl BridgeState {
    /// Map an analysis result to a JSON reply and count the outcome.
    fn respond<T: Serialize>(&self, route: &str, result: AnalysisResult<T>) -> WithStatus<Json> {
        match result {
            Ok(body) => {
                self.metrics.record_processed();
                info!("[bridge] {} succeeded", route);
                warp::reply::with_status(warp::reply::json(&body), StatusCode::OK)
            }
            Err(err) => {
                self.metrics.record_error(&err);
                if err.is_client_error() {
                    warn!("[bridge] {} rejected: {}", route, err);
                    warp::reply::with_status(
                        warp::reply::json(&ErrorDetail::new(err.to_string())),
                        StatusCode::BAD_REQUEST,
                    )
                } else {
                    error!("[bridge] {} failed: {}", route, err);
                    warp::reply::with_status(
                        warp::reply::json(&ErrorDetail::new("Processing error")),
                        StatusCode::INTERNAL_SERVER_ERROR,
                    )
                }
            }
        }
    }
}

/// Run blocking analysis work off the reactor.
async fn offload<T, F>(work: F) -> AnalysisResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> AnalysisResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|err| AnalysisError::Internal(format!("analysis task aborted: {}", err)))?
}

async fn run_analysis(form: FormData, runner: Arc<Runner>) -> AnalysisResult<AnalysisReport> {
    let mut upload = UploadForm::read(form).await?;
    let file = upload.take_file()?;
    let cable_length = upload.required_number("cable_length")?;
    let z0_expected = upload.number("z0_expected")?;
    offload(move || {
        runner
            .analyze(&file.filename, &file.bytes, cable_length, z0_expected)
            .map(|run| run.report)
    })
    .await
}

async fn run_inspection(form: FormData, runner: Arc<Runner>) -> AnalysisResult<WaveformInspection> {
    let file = UploadForm::read(form).await?.take_file()?;
    offload(move || runner.inspect(&file.bytes)).await
}

async fn analyze_tdr(form: FormData, state: BridgeState) -> Result<WithStatus<Json>, Rejection> {
    let result = run_analysis(form, state.runner.clone()).await;
    Ok(state.respond("/analyze-tdr", result))
}

async fn upload_csv(form: FormData, state: BridgeState) -> Result<WithStatus<Json>, Rejection> {
    let result = run_inspection(form, state.runner.clone()).await;
    Ok(state.respond("/upload-csv", result))
}

async fn handle_rejection(err: Rejection) -> Result<WithStatus<Json>, Infallible> {
    let (status, detail) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not Found".to_string())
    } else if let Some(too_large) = err.find::<warp::reject::PayloadTooLarge>() {
        (StatusCode::PAYLOAD_TOO_LARGE, too_large.to_string())
    } else if let Some(media) = err.find::<warp::reject::UnsupportedMediaType>() {
        (StatusCode::UNSUPPORTED_MEDIA_TYPE, media.to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            "Method Not Allowed".to_string(),
        )
    } else {
        warn!("[bridge] unhandled rejection: {:?}", err);
        (StatusCode::BAD_REQUEST, "Invalid request".to_string())
    };
    Ok(warp::reply::with_status(
        warp::reply::json(&ErrorDetail::new(detail)),
        status,
    ))
}

/// HTTP front end for the analysis workflow.
pub struct HttpBridge {
    state: BridgeState,
}

impl HttpBridge {
    pub fn new(runner: Arc<Runner>) -> Self {
        Self {
            state: BridgeState {
                runner,
                metrics: Arc::new(MetricsRecorder::new()),
            },
        }
    }

    #[cfg(test)]
    pub fn metrics(&self) -> Arc<MetricsRecorder> {
        self.state.metrics.clone()
    }

    pub fn routes(&self) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
        let config = self.state.runner.config().clone();
        let state = self.state.clone();
        let state_filter = warp::any().map(move || state.clone());
        let upload = warp::multipart::form().max_length(config.max_upload_bytes);

        let analyze_route = warp::path("analyze-tdr")
            .and(warp::path::end())
            .and(warp::post())
            .and(upload.clone())
            .and(state_filter.clone())
            .and_then(analyze_tdr);

        let upload_route = warp::path("upload-csv")
            .and(warp::path::end())
            .and(warp::post())
            .and(upload)
            .and(state_filter.clone())
            .and_then(upload_csv);

        let status_route = warp::path("status")
            .and(warp::path::end())
            .and(warp::get())
            .and(state_filter)
            .map(|state: BridgeState| {
                warp::reply::json(&StatusModel::new(state.metrics.snapshot()))
            });

        let root_route = warp::path::end().and(warp::get()).map(|| {
            warp::reply::json(&RootMessage {
                message: "TDR analysis service".to_string(),
            })
        });

        let cors = warp::cors()
            .allow_origins(config.allowed_origins.iter().map(String::as_str))
            .allow_methods(vec!["GET", "POST", "OPTIONS"])
            .allow_headers(vec!["content-type", "accept", "authorization"])
            .allow_credentials(true);

        analyze_route
            .or(upload_route)
            .or(status_route)
            .or(root_route)
            .recover(handle_rejection)
            .with(cors)
    }

    /// Serve until `shutdown` resolves.
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let bind = self.state.runner.config().bind;
        let (addr, server) = warp::serve(self.routes())
            .try_bind_with_graceful_shutdown(bind, shutdown)
            .with_context(|| format!("binding HTTP bridge to {}", bind))?;
        info!("[bridge] listening on http://{}", addr);
        server.await;
        info!("[bridge] stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::profile::{build_capture_csv, GeneratorConfig};
    use crate::workflow::config::AnalyzerConfig;
    use serde_json::Value;

    const BOUNDARY: &str = "tdr-test-boundary";

    fn bridge() -> HttpBridge {
        HttpBridge::new(Arc::new(Runner::new(AnalyzerConfig::default())))
    }

    fn multipart(file: Option<(&str, &str)>, fields: &[(&str, &str)]) -> Vec<u8> {
        let mut body = String::new();
        if let Some((filename, content)) = file {
            body.push_str(&format!(
                "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: text/csv\r\n\r\n{}\r\n",
                BOUNDARY, filename, content
            ));
        }
        for (name, value) in fields {
            body.push_str(&format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            ));
        }
        body.push_str(&format!("--{}--\r\n", BOUNDARY));
        body.into_bytes()
    }

    async fn post(bridge: &HttpBridge, path: &str, body: Vec<u8>) -> (StatusCode, Value) {
        let response = warp::test::request()
            .method("POST")
            .path(path)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(body)
            .reply(&bridge.routes())
            .await;
        let json = serde_json::from_slice(response.body()).unwrap();
        (response.status(), json)
    }

    fn capture() -> String {
        build_capture_csv(&GeneratorConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn analyze_returns_report() {
        let bridge = bridge();
        let capture = capture();
        let body = multipart(
            Some(("capture.csv", &capture)),
            &[("cable_length", "30"), ("z0_expected", "75")],
        );
        let (status, json) = post(&bridge, "/analyze-tdr", body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["Z0"], 75.0);
        assert_eq!(json["length_meters"], 30.0);
        assert!(json["tdr_plot_base64"].as_str().unwrap().starts_with("iVBOR"));
        assert_eq!(json["waveform"].as_array().unwrap().len(), 1000);
        assert_eq!(bridge.metrics().snapshot().processed, 1);
    }

    #[tokio::test]
    async fn wrong_extension_is_a_client_error() {
        let bridge = bridge();
        let capture = capture();
        let body = multipart(Some(("capture.txt", &capture)), &[("cable_length", "30")]);
        let (status, json) = post(&bridge, "/analyze-tdr", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["detail"].as_str().unwrap().contains("invalid file type"));
        assert_eq!(bridge.metrics().snapshot().rejected, 1);
    }

    #[tokio::test]
    async fn missing_cable_length_is_rejected() {
        let bridge = bridge();
        let capture = capture();
        let body = multipart(Some(("capture.csv", &capture)), &[]);
        let (status, json) = post(&bridge, "/analyze-tdr", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["detail"].as_str().unwrap().contains("cable_length"));
    }

    #[tokio::test]
    async fn flat_capture_reports_no_pulse() {
        let bridge = bridge();
        let mut lines = vec![String::new(); 11];
        lines.extend((0..100).map(|i| format!("{},0", i)));
        let body = multipart(
            Some(("flat.csv", &lines.join("\n"))),
            &[("cable_length", "10")],
        );
        let (status, json) = post(&bridge, "/analyze-tdr", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["detail"], "no incident pulse detected");
    }

    #[tokio::test]
    async fn upload_returns_inspection() {
        let bridge = bridge();
        let capture = capture();
        let body = multipart(Some(("capture.csv", &capture)), &[]);
        let (status, json) = post(&bridge, "/upload-csv", body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["magnitude"].as_array().unwrap().len(), 1000);
        assert_eq!(json["config"]["sample_interval"], 1e-9);
    }

    #[tokio::test]
    async fn upload_without_file_names_the_missing_field() {
        let bridge = bridge();
        let body = multipart(None, &[("cable_length", "30")]);
        let (status, json) = post(&bridge, "/upload-csv", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            json["detail"],
            "malformed input: form field 'file' is required"
        );
    }

    #[tokio::test]
    async fn status_and_root_respond() {
        let bridge = bridge();
        let routes = bridge.routes();

        let status = warp::test::request().path("/status").reply(&routes).await;
        assert_eq!(status.status(), StatusCode::OK);
        let json: Value = serde_json::from_slice(status.body()).unwrap();
        assert_eq!(json["analyses"]["processed"], 0);

        let root = warp::test::request().path("/").reply(&routes).await;
        let message: RootMessage = serde_json::from_slice(root.body()).unwrap();
        assert!(!message.message.is_empty());
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let bridge = bridge();
        let response = warp::test::request()
            .path("/missing")
            .reply(&bridge.routes())
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
