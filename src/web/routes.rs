use std::sync::Arc;

use ethers::types::{Address, U256};
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{get, post, routes, Build, Rocket, State};

use crate::bootstrap::AppState;
use crate::chain::abi::{FunctionEntry, READ_CATALOGUE, WRITE_CATALOGUE};
use crate::engine::service::{
    analyze_position, plan_collect_intent, plan_farming_intent, plan_rebalance_intent, plan_swap_intent,
    OwnerPlanReport, PositionAnalysis, RebalanceIntent, RebalanceReport, SwapIntent, SwapPlanReport,
};
use crate::error::{PlannerError, PlannerResult};
use crate::math::fixed_point::to_units;
use crate::math::range::suggest_range;
use crate::math::rebalance::evaluate;
use crate::math::tick_math::price_from_tick;
use crate::models::parse_address;
use crate::web::dto::{
    CatalogueEntry, CatalogueResponse, CollectRequest, ErrorResponse, EvaluateRequest, EvaluateResponse,
    FarmingRequest, PositionQuery, RebalanceRequest, SwapRequest,
};

pub type ApiResult<T> = Result<Json<T>, (Status, Json<ErrorResponse>)>;

pub fn status_for(error: &PlannerError) -> Status {
    if error.is_input_error() {
        return Status::BadRequest;
    }
    match error {
        PlannerError::SimulationRevert { .. }
        | PlannerError::ChainIdMismatch { .. }
        | PlannerError::MissingConfiguration { .. } => Status::UnprocessableEntity,
        _ => Status::BadGateway,
    }
}

fn reject(endpoint: &str, error: PlannerError) -> (Status, Json<ErrorResponse>) {
    let status = status_for(&error);
    log::error!("{} failed ({}): {}", endpoint, status.code, error);
    (
        status,
        Json(ErrorResponse {
            timestamp_utc: chrono::Utc::now().to_rfc3339(),
            kind: error.kind(),
            message: error.to_string(),
        }),
    )
}

fn respond<T>(endpoint: &str, result: PlannerResult<T>) -> ApiResult<T> {
    result.map(Json).map_err(|e| reject(endpoint, e))
}

fn parse_token_id(operation: &'static str, input: &str) -> PlannerResult<U256> {
    to_units(input, 0)?.to_u256(operation, "tokenId")
}

fn parse_optional_address(input: Option<&str>) -> PlannerResult<Option<Address>> {
    input.map(parse_address).transpose()
}

#[get("/health")]
pub fn health() -> &'static str {
    "OK"
}

#[get("/api/v1/catalogue")]
pub fn catalogue(app_state: &State<Arc<AppState>>) -> Json<CatalogueResponse> {
    let entry = |kind: &'static str| move |f: &'static FunctionEntry| CatalogueEntry {
        function: f,
        kind,
        calldata_len: f.calldata_len(),
    };
    Json(CatalogueResponse {
        chain_id: app_state.deployment.chain_id,
        functions: WRITE_CATALOGUE
            .iter()
            .map(entry("write"))
            .chain(READ_CATALOGUE.iter().map(entry("read")))
            .collect(),
    })
}

#[get("/api/v1/positions/<token_id>?<query..>")]
pub async fn position(
    token_id: &str,
    query: PositionQuery,
    app_state: &State<Arc<AppState>>,
) -> ApiResult<PositionAnalysis> {
    let result = async {
        let token_id = parse_token_id("positions", token_id)?;
        analyze_position(
            app_state.reader.as_ref(),
            &app_state.deployment,
            &app_state.context,
            token_id,
            &query.overrides(),
            query.width_bump_ticks.unwrap_or(0),
        )
        .await
    }
    .await;
    respond("position analysis", result)
}

#[post("/api/v1/evaluate", format = "json", data = "<request>")]
pub fn evaluate_window(request: Json<EvaluateRequest>, app_state: &State<Arc<AppState>>) -> ApiResult<EvaluateResponse> {
    let result = (|| -> PlannerResult<EvaluateResponse> {
        let policy = app_state.context.policy(&request.policy)?;
        let evaluation = evaluate(request.current_tick, request.tick_lower, request.tick_upper, policy.edge_bps)?;
        let suggested_range = match request.tick_spacing {
            Some(spacing) if evaluation.should_rebalance => Some(suggest_range(
                request.current_tick,
                request.tick_lower,
                request.tick_upper,
                spacing,
                request.width_bump_ticks,
            )?),
            _ => None,
        };
        let price = match (request.decimals0, request.decimals1) {
            (Some(d0), Some(d1)) => Some(price_from_tick(request.current_tick, d0, d1)?.to_decimal_string(18)),
            _ => None,
        };
        Ok(EvaluateResponse {
            timestamp_utc: chrono::Utc::now().to_rfc3339(),
            edge_bps: policy.edge_bps,
            evaluation,
            suggested_range,
            price,
        })
    })();
    respond("evaluate", result)
}

#[post("/api/v1/plan/swap", format = "json", data = "<request>")]
pub async fn plan_swap(request: Json<SwapRequest>, app_state: &State<Arc<AppState>>) -> ApiResult<SwapPlanReport> {
    let result = async {
        let limit_sqrt_price = match request.limit_sqrt_price.as_deref() {
            Some(raw) => to_units(raw, 0)?.to_u256("exactInputSingle", "limitSqrtPrice")?,
            None => U256::zero(),
        };
        let intent = SwapIntent {
            token_in: parse_address(&request.token_in)?,
            token_out: parse_address(&request.token_out)?,
            deployer: parse_optional_address(request.deployer.as_deref())?.unwrap_or_else(Address::zero),
            account: parse_address(&request.account)?,
            amount_in: request.amount_in.clone(),
            limit_sqrt_price,
            policy: request.policy,
            estimate_gas: request.estimate_gas,
        };
        plan_swap_intent(app_state.reader.as_ref(), &app_state.deployment, &app_state.context, &intent).await
    }
    .await;
    respond("swap plan", result)
}

#[post("/api/v1/plan/rebalance", format = "json", data = "<request>")]
pub async fn plan_rebalance(
    request: Json<RebalanceRequest>,
    app_state: &State<Arc<AppState>>,
) -> ApiResult<RebalanceReport> {
    let result = async {
        let intent = RebalanceIntent {
            token_id: parse_token_id("positions", &request.token_id)?,
            width_bump_ticks: request.width_bump_ticks,
            force: request.force,
            policy: request.policy,
            estimate_gas: request.estimate_gas,
        };
        plan_rebalance_intent(app_state.reader.as_ref(), &app_state.deployment, &app_state.context, &intent).await
    }
    .await;
    respond("rebalance plan", result)
}

#[post("/api/v1/plan/collect", format = "json", data = "<request>")]
pub async fn plan_collect(
    request: Json<CollectRequest>,
    app_state: &State<Arc<AppState>>,
) -> ApiResult<OwnerPlanReport> {
    let result = async {
        let token_id = parse_token_id("collect", &request.token_id)?;
        let recipient = parse_optional_address(request.recipient.as_deref())?;
        plan_collect_intent(app_state.reader.as_ref(), &app_state.deployment, token_id, recipient, request.estimate_gas)
            .await
    }
    .await;
    respond("collect plan", result)
}

#[post("/api/v1/plan/farming", format = "json", data = "<request>")]
pub async fn plan_farming(
    request: Json<FarmingRequest>,
    app_state: &State<Arc<AppState>>,
) -> ApiResult<OwnerPlanReport> {
    let result = async {
        let token_id = parse_token_id("farming", &request.token_id)?;
        let recipient = parse_optional_address(request.recipient.as_deref())?;
        plan_farming_intent(
            app_state.reader.as_ref(),
            &app_state.deployment,
            request.action,
            token_id,
            recipient,
            request.estimate_gas,
        )
        .await
    }
    .await;
    respond("farming plan", result)
}

/// Rocket instance with every route mounted over `app_state`.
pub fn build(app_state: Arc<AppState>, figment: rocket::figment::Figment) -> Rocket<Build> {
    rocket::custom(figment).manage(app_state).mount(
        "/",
        routes![
            health,
            catalogue,
            position,
            evaluate_window,
            plan_swap,
            plan_rebalance,
            plan_collect,
            plan_farming
        ],
    )
}
