use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use bloom_db::DbPool;
use chrono::Utc;
use serde::Serialize;
use tracing::{error, info};

use crate::scheduler::MaintenanceStatus;

#[derive(Clone)]
pub struct HealthState {
    db_pool: DbPool,
    maintenance: MaintenanceStatus,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub database: HealthCheck,
    pub maintenance: HealthCheck,
    pub checked_at: String,
}

pub fn router(db_pool: DbPool, maintenance: MaintenanceStatus) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { db_pool, maintenance })
}

pub async fn spawn(
    bind_address: &str,
    port: u16,
    db_pool: DbPool,
    maintenance: MaintenanceStatus,
) -> std::io::Result<()> {
    let address = format!("{bind_address}:{port}");
    let listener = tokio::net::TcpListener::bind(&address).await?;

    info!(
        event_name = "system.health.start",
        correlation_id = "bootstrap",
        bind_address = %address,
        "health endpoint started"
    );

    tokio::spawn(async move {
        if let Err(error) = axum::serve(listener, router(db_pool, maintenance)).await {
            error!(
                event_name = "system.health.error",
                correlation_id = "bootstrap",
                error = %error,
                "health endpoint server terminated unexpectedly"
            );
        }
    });

    Ok(())
}

/// Readiness follows the database only; maintenance is reported for
/// operators but never fails the probe.
pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let database = database_check(&state.db_pool).await;
    let maintenance = maintenance_check(&state.maintenance).await;
    let ready = database.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "bloom-server runtime initialized".to_string(),
        },
        database,
        maintenance,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn database_check(pool: &DbPool) -> HealthCheck {
    match sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(pool).await {
        Ok(_) => HealthCheck { status: "ready", detail: "database query succeeded".to_string() },
        Err(error) => {
            HealthCheck { status: "degraded", detail: format!("database query failed: {error}") }
        }
    }
}

async fn maintenance_check(status: &MaintenanceStatus) -> HealthCheck {
    if !status.is_enabled() {
        return HealthCheck { status: "disabled", detail: "maintenance jobs are disabled".into() };
    }

    match status.last_cycle().await {
        None => HealthCheck { status: "pending", detail: "no maintenance cycle yet".to_string() },
        Some(cycle) if cycle.is_clean() => HealthCheck {
            status: "ready",
            detail: format!("last cycle finished at {}", cycle.finished_at.to_rfc3339()),
        },
        Some(cycle) => HealthCheck {
            status: "degraded",
            detail: format!("last cycle failed jobs: {}", cycle.failed_jobs.join(", ")),
        },
    }
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use axum::{extract::State, http::StatusCode, Json};
    use bloom_db::connect_with_settings;
    use chrono::Utc;
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::health::{health, router, HealthState};
    use crate::scheduler::{CycleReport, MaintenanceStatus};

    #[tokio::test]
    async fn health_returns_ready_when_database_is_reachable() {
        let pool =
            connect_with_settings("sqlite::memory:", 1, 5).await.expect("pool should connect");

        let (status, Json(payload)) = health(State(HealthState {
            db_pool: pool.clone(),
            maintenance: MaintenanceStatus::new(false),
        }))
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "ready");
        assert_eq!(payload.database.status, "ready");
        assert_eq!(payload.maintenance.status, "disabled");

        pool.close().await;
    }

    #[tokio::test]
    async fn health_returns_service_unavailable_when_database_is_unavailable() {
        let pool =
            connect_with_settings("sqlite::memory:", 1, 5).await.expect("pool should connect");
        pool.close().await;

        let (status, Json(payload)) = health(State(HealthState {
            db_pool: pool,
            maintenance: MaintenanceStatus::new(true),
        }))
        .await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload.status, "degraded");
        assert_eq!(payload.database.status, "degraded");
        assert_eq!(payload.maintenance.status, "pending");
    }

    #[tokio::test]
    async fn failed_maintenance_jobs_are_reported_without_failing_readiness() {
        let pool =
            connect_with_settings("sqlite::memory:", 1, 5).await.expect("pool should connect");
        let maintenance = MaintenanceStatus::new(true);
        maintenance
            .record(CycleReport {
                started_at: Utc::now(),
                finished_at: Utc::now(),
                similarity_pairs: Some(4),
                trending_rows: None,
                preferences_updated: Some(0),
                failed_jobs: vec!["trending"],
            })
            .await;

        let response = router(pool.clone(), maintenance)
            .oneshot(Request::builder().uri("/health").body(Body::empty()).expect("request"))
            .await
            .expect("router should respond");
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let payload: Value = serde_json::from_slice(&body).expect("json body");
        assert_eq!(payload["maintenance"]["status"], "degraded");
        assert_eq!(payload["maintenance"]["detail"], "last cycle failed jobs: trending");

        pool.close().await;
    }
}
