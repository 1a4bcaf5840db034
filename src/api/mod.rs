pub mod format;
pub mod templates;

use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::core::{
    AllocationEntry, AssetEntry, ContributionSchedule, PlanInputs, PlanReport, ValidationConfig,
    run_plan,
};
use format::{Currency, format_amount, format_rate};
use templates::{
    AccumulationTemplate, RetirementTemplate, accumulation_template, accumulation_templates,
    retirement_template, retirement_templates,
};

const MAX_PHASE_YEARS: u32 = 100;

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PlanPayload {
    accumulation_template: Option<String>,
    accumulation: Option<Vec<AssetEntry>>,
    annual_contribution: Option<Decimal>,
    years_to_retirement: Option<u32>,

    retirement_template: Option<String>,
    retirement: Option<Vec<AllocationEntry>>,
    retirement_years: Option<u32>,
    withdrawal_rates: Option<Vec<Decimal>>,

    currency: Option<Currency>,
    allocation_epsilon: Option<Decimal>,
    allow_negative_rates: Option<bool>,
}

/// Scalar-only form of [`PlanPayload`] for query strings.
/// `withdrawalRates` is a comma-separated list of percents.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PlanQuery {
    accumulation_template: Option<String>,
    annual_contribution: Option<Decimal>,
    years_to_retirement: Option<u32>,
    retirement_template: Option<String>,
    retirement_years: Option<u32>,
    withdrawal_rates: Option<String>,
    currency: Option<Currency>,
    allocation_epsilon: Option<Decimal>,
    allow_negative_rates: Option<bool>,
}

/// A complete plan request. Rates are fractions except `withdrawal_rates_pct`,
/// which holds percents as entered (4 means 4%).
#[derive(Debug, Clone)]
struct PlanRequest {
    accumulation: Vec<AssetEntry>,
    annual_contribution: Decimal,
    years_to_retirement: u32,
    retirement: Vec<AllocationEntry>,
    retirement_years: u32,
    withdrawal_rates_pct: Vec<Decimal>,
    currency: Currency,
    allocation_epsilon: Decimal,
    allow_negative_rates: bool,
}

#[derive(Debug)]
struct ApiRequest {
    inputs: PlanInputs,
    currency: Currency,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MilestoneRow {
    milestone: String,
    total_value: String,
    growth: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScenarioRow {
    withdrawal_rate: String,
    annual_income: String,
    monthly_income: String,
    final_portfolio_value: String,
    sustainable: bool,
    blended_rate: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DisplaySummary {
    total_current_value: String,
    annual_contributions: String,
    weighted_growth_rate: Option<String>,
    projected_retirement_value: String,
    retirement_growth_rate: String,
    milestones: Vec<MilestoneRow>,
    scenarios: Vec<ScenarioRow>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlanResponse {
    currency: Currency,
    #[serde(flatten)]
    report: PlanReport,
    display: DisplaySummary,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TemplatesResponse {
    accumulation: Vec<AccumulationTemplate>,
    retirement: Vec<RetirementTemplate>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn default_plan_request() -> PlanRequest {
    PlanRequest {
        accumulation: vec![AssetEntry::new(
            "Primary Portfolio",
            Decimal::from(50_000),
            Decimal::new(7, 2),
        )],
        annual_contribution: Decimal::from(10_000),
        years_to_retirement: 15,
        retirement: vec![
            AllocationEntry::new("Conservative Bonds", Decimal::from(60), Decimal::new(3, 2)),
            AllocationEntry::new("Dividend Stocks", Decimal::from(40), Decimal::new(6, 2)),
        ],
        retirement_years: 30,
        withdrawal_rates_pct: vec![Decimal::from(3), Decimal::from(4), Decimal::from(5)],
        currency: Currency::Gbp,
        allocation_epsilon: ValidationConfig::default().epsilon,
        allow_negative_rates: false,
    }
}

fn build_plan_inputs(request: PlanRequest) -> Result<PlanInputs, String> {
    if request.years_to_retirement > MAX_PHASE_YEARS {
        return Err(format!("yearsToRetirement must be <= {MAX_PHASE_YEARS}"));
    }

    if request.retirement_years > MAX_PHASE_YEARS {
        return Err(format!("retirementYears must be <= {MAX_PHASE_YEARS}"));
    }

    if request.accumulation.is_empty() {
        return Err("accumulation needs at least one entry".to_string());
    }

    if request.retirement.is_empty() {
        return Err("retirement needs at least one entry".to_string());
    }

    if request.accumulation.iter().any(|e| e.label.trim().is_empty())
        || request.retirement.iter().any(|e| e.label.trim().is_empty())
    {
        return Err("every entry needs a non-blank label".to_string());
    }

    if request.annual_contribution < Decimal::ZERO {
        return Err("annualContribution must be >= 0".to_string());
    }

    if request.withdrawal_rates_pct.is_empty() {
        return Err("withdrawalRates needs at least one rate".to_string());
    }

    for rate in &request.withdrawal_rates_pct {
        if *rate <= Decimal::ZERO || *rate >= Decimal::ONE_HUNDRED {
            return Err(format!(
                "withdrawalRates must be between 0 and 100 (exclusive), got {rate}"
            ));
        }
    }

    if request.allocation_epsilon < Decimal::ZERO {
        return Err("allocationEpsilon must be >= 0".to_string());
    }

    Ok(PlanInputs {
        accumulation: request.accumulation,
        contribution: ContributionSchedule {
            annual_amount: request.annual_contribution,
        },
        years_to_retirement: request.years_to_retirement,
        retirement: request.retirement,
        retirement_years: request.retirement_years,
        withdrawal_rates: request
            .withdrawal_rates_pct
            .iter()
            .map(|pct| *pct / Decimal::ONE_HUNDRED)
            .collect(),
        validation: ValidationConfig {
            epsilon: request.allocation_epsilon,
            allow_negative_rates: request.allow_negative_rates,
        },
    })
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/templates", get(templates_handler))
        .route("/api/plan", get(plan_get_handler).post(plan_post_handler))
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "retirement projection API listening");
    info!("local access: http://127.0.0.1:{port}/api/plan");

    axum::serve(listener, app).await
}

/// Runs a plan from a JSON payload and renders the response as pretty JSON.
/// Blank input runs the default plan. A `currency` given here wins over the
/// payload's.
pub fn render_plan_json(json: &str, currency: Option<Currency>) -> Result<String, String> {
    let request = if json.trim().is_empty() {
        api_request_from_payload(PlanPayload::default())?
    } else {
        api_request_from_json(json)?
    };
    let report = run_plan(&request.inputs).map_err(|e| e.to_string())?;
    let response = build_plan_response(currency.unwrap_or(request.currency), report);
    serde_json::to_string_pretty(&response).map_err(|e| format!("failed to encode response: {e}"))
}

async fn health_handler() -> Response {
    json_response(StatusCode::OK, serde_json::json!({ "status": "ok" }))
}

async fn templates_handler() -> Response {
    json_response(
        StatusCode::OK,
        TemplatesResponse {
            accumulation: accumulation_templates(),
            retirement: retirement_templates(),
        },
    )
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn plan_get_handler(Query(query): Query<PlanQuery>) -> Response {
    match payload_from_query(query) {
        Ok(payload) => plan_handler_impl(payload).await,
        Err(msg) => error_response(StatusCode::BAD_REQUEST, &msg),
    }
}

async fn plan_post_handler(Json(payload): Json<PlanPayload>) -> Response {
    plan_handler_impl(payload).await
}

async fn plan_handler_impl(payload: PlanPayload) -> Response {
    let request = match api_request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => {
            warn!(error = %msg, "rejected plan request");
            return error_response(StatusCode::BAD_REQUEST, &msg);
        }
    };

    match run_plan(&request.inputs) {
        Ok(report) => json_response(
            StatusCode::OK,
            build_plan_response(request.currency, report),
        ),
        Err(e) => {
            warn!(error = %e, "plan failed validation");
            error_response(StatusCode::BAD_REQUEST, &e.to_string())
        }
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

fn api_request_from_json(json: &str) -> Result<ApiRequest, String> {
    let payload = serde_json::from_str::<PlanPayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    api_request_from_payload(payload)
}

fn payload_from_query(query: PlanQuery) -> Result<PlanPayload, String> {
    let withdrawal_rates = match query.withdrawal_rates {
        Some(raw) => Some(
            raw.split(',')
                .map(|part| {
                    let part = part.trim().trim_end_matches('%');
                    part.parse::<Decimal>()
                        .map_err(|_| format!("withdrawalRates: '{part}' is not a number"))
                })
                .collect::<Result<Vec<_>, _>>()?,
        ),
        None => None,
    };

    Ok(PlanPayload {
        accumulation_template: query.accumulation_template,
        accumulation: None,
        annual_contribution: query.annual_contribution,
        years_to_retirement: query.years_to_retirement,
        retirement_template: query.retirement_template,
        retirement: None,
        retirement_years: query.retirement_years,
        withdrawal_rates,
        currency: query.currency,
        allocation_epsilon: query.allocation_epsilon,
        allow_negative_rates: query.allow_negative_rates,
    })
}

fn api_request_from_payload(payload: PlanPayload) -> Result<ApiRequest, String> {
    let mut request = default_plan_request();

    if let Some(name) = payload.accumulation_template {
        let preset = accumulation_template(&name)
            .ok_or_else(|| format!("unknown accumulation template '{name}'"))?;
        request.accumulation = preset.entries;
        request.annual_contribution = preset.contribution.annual_amount;
    }
    if let Some(v) = payload.accumulation {
        request.accumulation = v;
    }
    if let Some(v) = payload.annual_contribution {
        request.annual_contribution = v;
    }
    if let Some(v) = payload.years_to_retirement {
        request.years_to_retirement = v;
    }

    if let Some(name) = payload.retirement_template {
        let preset = retirement_template(&name)
            .ok_or_else(|| format!("unknown retirement template '{name}'"))?;
        request.retirement = preset.entries;
    }
    if let Some(v) = payload.retirement {
        request.retirement = v;
    }
    if let Some(v) = payload.retirement_years {
        request.retirement_years = v;
    }
    if let Some(v) = payload.withdrawal_rates {
        request.withdrawal_rates_pct = v;
    }

    if let Some(v) = payload.currency {
        request.currency = v;
    }
    if let Some(v) = payload.allocation_epsilon {
        request.allocation_epsilon = v;
    }
    if let Some(v) = payload.allow_negative_rates {
        request.allow_negative_rates = v;
    }

    let currency = request.currency;
    let inputs = build_plan_inputs(request)?;
    Ok(ApiRequest { inputs, currency })
}

fn build_plan_response(currency: Currency, report: PlanReport) -> PlanResponse {
    let money = |amount: Decimal| format_amount(currency, amount);
    let retirement_rate = format_rate(report.retirement_rate);

    let display = DisplaySummary {
        total_current_value: money(report.starting_total),
        annual_contributions: money(report.annual_contribution),
        weighted_growth_rate: report.accumulation_rate.map(format_rate),
        projected_retirement_value: money(report.retirement_balance),
        retirement_growth_rate: retirement_rate.clone(),
        milestones: report
            .milestones
            .iter()
            .map(|m| MilestoneRow {
                milestone: format!("Year {}", m.year),
                total_value: money(m.total),
                growth: money(m.growth),
            })
            .collect(),
        scenarios: report
            .scenarios
            .iter()
            .map(|s| ScenarioRow {
                withdrawal_rate: format_rate(s.outcome.withdrawal_rate),
                annual_income: money(s.outcome.annual_withdrawal),
                monthly_income: money(s.monthly_withdrawal),
                final_portfolio_value: money(s.outcome.verdict.ending_balance),
                sustainable: s.sustainable,
                blended_rate: retirement_rate.clone(),
            })
            .collect(),
    };

    PlanResponse {
        currency,
        report,
        display,
    }
}
