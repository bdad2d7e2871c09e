use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use dex_router::core::errors::RouterError;
use dex_router::core::indexer::pair::PairSnapshot;
use dex_router::core::reserves::ReserveReport;
use dex_router::orchestrator::{
    get_aggregator_quote, index_and_save_pair_data, index_and_save_reserve_data,
};
use dex_router::types::{DexConfig, QuoteRequest, QuoteResponse, QuoteStatus, ResponsePool, ResponseRoute};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

// Hold configuration
#[derive(Clone)]
struct DexConfigState {
    config: Arc<DexConfig>,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        get_quotes,
        update_pair_data,
        update_reserve_data
    ),
    components(
        schemas(QuoteRequest, QuoteResponse, QuoteStatus, ResponseRoute, ResponsePool, ErrorBody)
    ),
    tags(
        (name = "quotes", description = "Split-route quotes for a token pair"),
        (name = "indexing", description = "Refresh indexed pair and reserve data")
    )
)]
struct ApiDoc;

#[derive(Serialize, ToSchema)]
struct ErrorBody {
    error: String,
}

struct ApiError(anyhow::Error);

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.downcast_ref::<RouterError>().is_some() {
            StatusCode::BAD_REQUEST
        } else {
            tracing::error!("Request failed: {:#}", self.0);
            StatusCode::INTERNAL_SERVER_ERROR
        };
        let body = ErrorBody {
            error: format!("{:#}", self.0),
        };
        (status, Json(body)).into_response()
    }
}

#[utoipa::path(
    get,
    path = "/quotes",
    params(QuoteRequest),
    responses(
        (status = 200, description = "Trade quote", body = QuoteResponse),
        (status = 400, description = "Malformed request", body = ErrorBody),
        (status = 500, description = "Indexed data or node unavailable", body = ErrorBody)
    ),
    tag = "quotes"
)]
async fn get_quotes(
    State(state): State<DexConfigState>,
    Query(params): Query<QuoteRequest>,
) -> Result<Json<QuoteResponse>, ApiError> {
    let response = get_aggregator_quote(state.config.as_ref(), params).await?;
    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/update_pair_data",
    responses(
        (status = 200, description = "Pair data indexed"),
        (status = 500, description = "Indexing failed", body = ErrorBody)
    ),
    tag = "indexing"
)]
async fn update_pair_data(
    State(state): State<DexConfigState>,
) -> Result<Json<PairSnapshot>, ApiError> {
    Ok(Json(index_and_save_pair_data(state.config.as_ref()).await?))
}

#[utoipa::path(
    post,
    path = "/update_reserve_data",
    responses(
        (status = 200, description = "Reserve data indexed"),
        (status = 500, description = "Indexing failed", body = ErrorBody)
    ),
    tag = "indexing"
)]
async fn update_reserve_data(
    State(state): State<DexConfigState>,
) -> Result<Json<ReserveReport>, ApiError> {
    Ok(Json(index_and_save_reserve_data(state.config.as_ref()).await?))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let openapi = ApiDoc::openapi();
    let config_path = PathBuf::from("dex_config.toml");
    let config = DexConfig::load_from(config_path)?;
    let bind_address = config.bind_address.clone();

    let config_state = DexConfigState {
        config: Arc::new(config),
    };
    let app = Router::new()
        .route("/quotes", get(get_quotes))
        .route("/update_pair_data", post(update_pair_data))
        .route("/update_reserve_data", post(update_reserve_data))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi))
        .with_state(config_state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server running on http://{}", bind_address);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", bind_address);
    axum::serve(listener, app).await?;
    Ok(())
}
