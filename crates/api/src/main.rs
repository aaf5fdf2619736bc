use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use sqlx::PgPool;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stocksource_core::domain::prediction::{PerformancePoint, PerformanceSeries, PredictionRecord};
use stocksource_core::report::{self, ReportFormat, ReportOptions, MAX_RECORD_LIMIT};
use stocksource_core::source::{DataSource, PerformanceSource};
use stocksource_core::storage::PgStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = stocksource_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let pool: Option<PgPool> = match settings.require_database_url() {
        Ok(db_url) => match sqlx::postgres::PgPoolOptions::new()
            .max_connections(5)
            .connect(db_url)
            .await
        {
            Ok(pool) => match stocksource_core::storage::migrate(&pool).await {
                Ok(()) => Some(pool),
                Err(e) => {
                    sentry_anyhow::capture_anyhow(&e);
                    tracing::error!(error = %e, "db migrations failed; starting API in degraded mode");
                    None
                }
            },
            Err(e) => {
                let err = anyhow::Error::new(e);
                sentry_anyhow::capture_anyhow(&err);
                tracing::error!(error = %err, "db connect failed; starting API in degraded mode");
                None
            }
        },
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "DATABASE_URL missing; starting API in degraded mode");
            None
        }
    };

    let backends = pool.map(|pool| {
        let store = Arc::new(PgStore::new(pool));
        Backends {
            predictions: store.clone(),
            performance: store,
        }
    });

    let state = AppState {
        backends,
        report_limit: settings.report_record_limit,
        brand: settings.report_brand.clone(),
        ornament_seed: settings.report_ornament_seed,
    };

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn app(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/stocks", get(get_stocks))
        .route("/api/history", get(get_history))
        .route("/api/market-performance", get(get_market_performance))
        .route("/download/pdf", get(download_pdf))
        .route("/download/excel", get(download_excel))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Clone)]
struct Backends {
    predictions: Arc<dyn DataSource>,
    performance: Arc<dyn PerformanceSource>,
}

#[derive(Clone)]
struct AppState {
    /// None when the database was unreachable at startup.
    backends: Option<Backends>,
    report_limit: u32,
    brand: String,
    ornament_seed: Option<u64>,
}

impl AppState {
    fn backends(&self) -> Result<&Backends, StatusCode> {
        self.backends.as_ref().ok_or(StatusCode::SERVICE_UNAVAILABLE)
    }

    fn resolve_limit(&self, params: &LimitParams) -> Result<u32, StatusCode> {
        match params.limit {
            None => Ok(self.report_limit),
            Some(n) if (1..=MAX_RECORD_LIMIT).contains(&n) => Ok(n),
            Some(_) => Err(StatusCode::BAD_REQUEST),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct LimitParams {
    limit: Option<u32>,
}

async fn get_stocks(
    State(state): State<AppState>,
    Query(params): Query<LimitParams>,
) -> Result<Json<Vec<PredictionRecord>>, StatusCode> {
    let backends = state.backends()?;
    let limit = state.resolve_limit(&params)?;

    let stocks = backends
        .predictions
        .fetch_predictions(limit)
        .await
        .map_err(|e| internal_error(anyhow::Error::new(e)))?;

    tracing::debug!(count = stocks.len(), "returning predictions");
    Ok(Json(stocks))
}

async fn get_history(State(state): State<AppState>) -> Result<Json<Vec<PerformancePoint>>, StatusCode> {
    fetch_series(&state, PerformanceSeries::History).await
}

async fn get_market_performance(
    State(state): State<AppState>,
) -> Result<Json<Vec<PerformancePoint>>, StatusCode> {
    fetch_series(&state, PerformanceSeries::Market).await
}

async fn fetch_series(
    state: &AppState,
    series: PerformanceSeries,
) -> Result<Json<Vec<PerformancePoint>>, StatusCode> {
    let backends = state.backends()?;

    let points = backends
        .performance
        .fetch_performance(series)
        .await
        .map_err(|e| internal_error(anyhow::Error::new(e)))?;

    if points.is_empty() {
        tracing::warn!(?series, "no performance data stored");
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(Json(points))
}

async fn download_pdf(
    State(state): State<AppState>,
    Query(params): Query<LimitParams>,
) -> Result<Response, StatusCode> {
    download(&state, &params, ReportFormat::Pdf).await
}

async fn download_excel(
    State(state): State<AppState>,
    Query(params): Query<LimitParams>,
) -> Result<Response, StatusCode> {
    download(&state, &params, ReportFormat::Xlsx).await
}

async fn download(state: &AppState, params: &LimitParams, format: ReportFormat) -> Result<Response, StatusCode> {
    let backends = state.backends()?;
    let limit = state.resolve_limit(params)?;

    let options = ReportOptions {
        limit,
        generated_at: chrono::Utc::now(),
        brand: state.brand.clone(),
        ornament_seed: state.ornament_seed,
    };

    // The artifact is complete before the status line goes out.
    let bytes = report::generate(backends.predictions.as_ref(), format, &options)
        .await
        .map_err(|e| internal_error(anyhow::Error::new(e)))?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, format.content_disposition()),
        ],
        bytes,
    )
        .into_response())
}

fn internal_error(err: anyhow::Error) -> StatusCode {
    sentry_anyhow::capture_anyhow(&err);
    tracing::error!(error = %err, "request failed");
    StatusCode::INTERNAL_SERVER_ERROR
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &stocksource_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use chrono::NaiveDate;
    use stocksource_core::source::StaticDataSource;
    use tower::ServiceExt;

    fn state_with(source: StaticDataSource) -> AppState {
        let source = Arc::new(source);
        AppState {
            backends: Some(Backends {
                predictions: source.clone(),
                performance: source,
            }),
            report_limit: 20,
            brand: "Stock Source".to_string(),
            ornament_seed: Some(5),
        }
    }

    fn sample_source() -> StaticDataSource {
        let records = (0..25)
            .map(|i| PredictionRecord::new(format!("T{i:02}"), 100.0 + i as f64, 0.01))
            .collect();
        StaticDataSource::new(records).with_performance(
            PerformanceSeries::History,
            vec![PerformancePoint {
                date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                percent_return: 2.5,
            }],
        )
    }

    async fn get(state: AppState, uri: &str) -> Response {
        app(state)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn body_bytes(res: Response) -> Vec<u8> {
        axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    #[tokio::test]
    async fn pdf_download_sets_attachment_headers() {
        let res = get(state_with(sample_source()), "/download/pdf").await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()[header::CONTENT_TYPE], "application/pdf");
        assert_eq!(
            res.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"stocks.pdf\""
        );
        let body = body_bytes(res).await;
        assert!(body.starts_with(b"%PDF-"));
    }

    #[tokio::test]
    async fn excel_download_is_a_zip_container() {
        let res = get(state_with(sample_source()), "/download/excel").await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            res.headers()[header::CONTENT_TYPE],
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        );
        let body = body_bytes(res).await;
        assert!(body.starts_with(b"PK"));
    }

    #[tokio::test]
    async fn render_failure_is_a_clean_500() {
        let source = StaticDataSource::new(vec![PredictionRecord::new("", 1.0, 0.0)]);
        let res = get(state_with(source), "/download/pdf").await;
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(res.headers().get(header::CONTENT_DISPOSITION).is_none());

        let res = get(state_with(StaticDataSource::unavailable("down")), "/download/excel").await;
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn stocks_default_to_configured_limit() {
        let res = get(state_with(sample_source()), "/api/stocks").await;
        assert_eq!(res.status(), StatusCode::OK);
        let stocks: Vec<serde_json::Value> = serde_json::from_slice(&body_bytes(res).await).unwrap();
        assert_eq!(stocks.len(), 20);
        assert_eq!(stocks[0]["Ticker"], "T00");

        let res = get(state_with(sample_source()), "/api/stocks?limit=3").await;
        let stocks: Vec<serde_json::Value> = serde_json::from_slice(&body_bytes(res).await).unwrap();
        assert_eq!(stocks.len(), 3);
    }

    #[tokio::test]
    async fn out_of_range_limit_is_rejected() {
        for uri in ["/api/stocks?limit=0", "/download/pdf?limit=500"] {
            let res = get(state_with(sample_source()), uri).await;
            assert_eq!(res.status(), StatusCode::BAD_REQUEST, "{uri}");
        }
    }

    #[tokio::test]
    async fn performance_endpoints() {
        let res = get(state_with(sample_source()), "/api/history").await;
        assert_eq!(res.status(), StatusCode::OK);
        let points: Vec<serde_json::Value> = serde_json::from_slice(&body_bytes(res).await).unwrap();
        assert_eq!(points[0]["percentReturn"], 2.5);
        assert_eq!(points[0]["date"], "2024-01-01");

        let res = get(state_with(sample_source()), "/api/market-performance").await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn degraded_mode_is_unavailable() {
        let state = AppState {
            backends: None,
            report_limit: 20,
            brand: "Stock Source".to_string(),
            ornament_seed: None,
        };
        let res = get(state, "/download/pdf").await;
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
