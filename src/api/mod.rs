use axum::{
    Router,
    extract::{
        Json, Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::{Args, ValueEnum};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::core::{
    Allocation, BudgetInput, CategorySplit, CompoundingFrequency, InvestmentProjection,
    MAX_PROJECTION_YEARS, MAX_TRAJECTORY_MONTHS, SavingsPlan, SavingsSolution, allocate, project,
    solve,
};

const DEFAULT_INCOME: f64 = 4800.0;
const DEFAULT_SPLIT_PCT: CategorySplit = CategorySplit {
    needs: 50.0,
    wants: 30.0,
    savings: 20.0,
};

const DEFAULT_GOAL_START: f64 = 5000.0;
const DEFAULT_GOAL_MONTHLY: f64 = 500.0;
const DEFAULT_GOAL_TARGET: f64 = 20_000.0;
const DEFAULT_GOAL_RATE_PCT: f64 = 3.0;

const DEFAULT_INVEST_START: f64 = 20_000.0;
const DEFAULT_INVEST_MONTHLY: f64 = 1000.0;
const DEFAULT_INVEST_YEARS: u32 = 10;
const DEFAULT_INVEST_RATE_PCT: f64 = 7.0;

const MAX_RATE_PCT: f64 = 100.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    #[error("{0} must be a finite number")]
    NotFinite(&'static str),
    #[error("{0} must be >= 0")]
    Negative(&'static str),
    #[error("{field} must be between {min} and {max}")]
    OutOfRange {
        field: &'static str,
        min: f64,
        max: f64,
    },
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ApiFrequency {
    #[serde(alias = "annually", alias = "yearly")]
    #[value(alias = "annually")]
    Annual,
    Quarterly,
    Monthly,
}

impl From<ApiFrequency> for CompoundingFrequency {
    fn from(value: ApiFrequency) -> Self {
        match value {
            ApiFrequency::Annual => CompoundingFrequency::Annual,
            ApiFrequency::Quarterly => CompoundingFrequency::Quarterly,
            ApiFrequency::Monthly => CompoundingFrequency::Monthly,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ApiBudgetMode {
    #[serde(alias = "percentage", alias = "percent")]
    #[value(alias = "percent")]
    Percentages,
    #[serde(alias = "absolute", alias = "amount")]
    #[value(alias = "absolute")]
    Amounts,
}

#[derive(Debug, Default, Deserialize, Args)]
#[serde(default, rename_all = "camelCase")]
pub struct BudgetPayload {
    /// Monthly take-home income
    #[arg(long)]
    income: Option<f64>,
    /// Whether categories are given as percentages or amounts
    #[arg(long, value_enum)]
    mode: Option<ApiBudgetMode>,
    #[arg(long)]
    needs_pct: Option<f64>,
    #[arg(long)]
    wants_pct: Option<f64>,
    #[arg(long)]
    savings_pct: Option<f64>,
    #[arg(long)]
    needs_amount: Option<f64>,
    #[arg(long)]
    wants_amount: Option<f64>,
    #[arg(long)]
    savings_amount: Option<f64>,
}

#[derive(Debug, Default, Deserialize, Args)]
#[serde(default, rename_all = "camelCase")]
pub struct SavingsGoalPayload {
    #[arg(long)]
    start: Option<f64>,
    #[arg(long)]
    monthly: Option<f64>,
    #[arg(long)]
    target: Option<f64>,
    /// Plan length in months, 0 if unknown
    #[arg(long)]
    duration_months: Option<u32>,
    /// Annual interest rate in percent, e.g. 3
    #[arg(long)]
    annual_rate: Option<f64>,
    #[arg(long, value_enum)]
    frequency: Option<ApiFrequency>,
}

#[derive(Debug, Default, Deserialize, Args)]
#[serde(default, rename_all = "camelCase")]
pub struct InvestmentPayload {
    #[arg(long)]
    start: Option<f64>,
    #[arg(long)]
    monthly_contribution: Option<f64>,
    #[arg(long)]
    years: Option<u32>,
    /// Annual return rate in percent, e.g. 7
    #[arg(long)]
    annual_rate: Option<f64>,
    #[arg(long, value_enum)]
    frequency: Option<ApiFrequency>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BudgetRequest {
    pub income: f64,
    pub input: BudgetInput,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SavingsGoalRequest {
    pub plan: SavingsPlan,
    pub annual_rate: f64,
    pub frequency: CompoundingFrequency,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InvestmentRequest {
    pub start: f64,
    pub monthly_contribution: f64,
    pub years: u32,
    pub annual_rate: f64,
    pub frequency: CompoundingFrequency,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetResponse {
    #[serde(flatten)]
    pub allocation: Allocation,
    pub total_allocated: f64,
    pub total_percent: f64,
    pub has_warning: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavingsGoalResponse {
    #[serde(flatten)]
    pub solution: SavingsSolution,
    pub annual_rate: f64,
    pub frequency: CompoundingFrequency,
    pub duration_years: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestmentResponse {
    #[serde(flatten)]
    pub projection: InvestmentProjection,
    pub annual_rate: f64,
    pub frequency: CompoundingFrequency,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn finite(field: &'static str, value: f64) -> Result<f64, InputError> {
    if !value.is_finite() {
        return Err(InputError::NotFinite(field));
    }
    Ok(value)
}

fn non_negative(field: &'static str, value: f64) -> Result<f64, InputError> {
    if finite(field, value)? < 0.0 {
        return Err(InputError::Negative(field));
    }
    Ok(value)
}

fn within(field: &'static str, value: f64, min: f64, max: f64) -> Result<f64, InputError> {
    if !(min..=max).contains(&finite(field, value)?) {
        return Err(InputError::OutOfRange { field, min, max });
    }
    Ok(value)
}

pub fn build_budget_request(payload: BudgetPayload) -> Result<BudgetRequest, InputError> {
    let income = non_negative("income", payload.income.unwrap_or(DEFAULT_INCOME))?;

    let input = match payload.mode.unwrap_or(ApiBudgetMode::Percentages) {
        ApiBudgetMode::Percentages => BudgetInput::Percentages(CategorySplit {
            needs: within(
                "needsPct",
                payload.needs_pct.unwrap_or(DEFAULT_SPLIT_PCT.needs),
                0.0,
                100.0,
            )?,
            wants: within(
                "wantsPct",
                payload.wants_pct.unwrap_or(DEFAULT_SPLIT_PCT.wants),
                0.0,
                100.0,
            )?,
            savings: within(
                "savingsPct",
                payload.savings_pct.unwrap_or(DEFAULT_SPLIT_PCT.savings),
                0.0,
                100.0,
            )?,
        }),
        ApiBudgetMode::Amounts => {
            let recommended = CategorySplit::recommended(income);
            BudgetInput::Amounts(CategorySplit {
                needs: non_negative(
                    "needsAmount",
                    payload.needs_amount.unwrap_or(recommended.needs),
                )?,
                wants: non_negative(
                    "wantsAmount",
                    payload.wants_amount.unwrap_or(recommended.wants),
                )?,
                savings: non_negative(
                    "savingsAmount",
                    payload.savings_amount.unwrap_or(recommended.savings),
                )?,
            })
        }
    };

    Ok(BudgetRequest { income, input })
}

pub fn build_savings_goal_request(
    payload: SavingsGoalPayload,
) -> Result<SavingsGoalRequest, InputError> {
    let duration_months = payload.duration_months.unwrap_or(0);
    if duration_months > MAX_TRAJECTORY_MONTHS {
        return Err(InputError::OutOfRange {
            field: "durationMonths",
            min: 0.0,
            max: f64::from(MAX_TRAJECTORY_MONTHS),
        });
    }

    Ok(SavingsGoalRequest {
        plan: SavingsPlan {
            start: non_negative("start", payload.start.unwrap_or(DEFAULT_GOAL_START))?,
            monthly: non_negative("monthly", payload.monthly.unwrap_or(DEFAULT_GOAL_MONTHLY))?,
            duration_months,
            target: non_negative("target", payload.target.unwrap_or(DEFAULT_GOAL_TARGET))?,
        },
        annual_rate: within(
            "annualRate",
            payload.annual_rate.unwrap_or(DEFAULT_GOAL_RATE_PCT),
            0.0,
            MAX_RATE_PCT,
        )? / 100.0,
        frequency: payload.frequency.unwrap_or(ApiFrequency::Monthly).into(),
    })
}

pub fn build_investment_request(
    payload: InvestmentPayload,
) -> Result<InvestmentRequest, InputError> {
    let years = payload.years.unwrap_or(DEFAULT_INVEST_YEARS);
    if !(1..=MAX_PROJECTION_YEARS).contains(&years) {
        return Err(InputError::OutOfRange {
            field: "years",
            min: 1.0,
            max: f64::from(MAX_PROJECTION_YEARS),
        });
    }

    Ok(InvestmentRequest {
        start: non_negative("start", payload.start.unwrap_or(DEFAULT_INVEST_START))?,
        monthly_contribution: non_negative(
            "monthlyContribution",
            payload
                .monthly_contribution
                .unwrap_or(DEFAULT_INVEST_MONTHLY),
        )?,
        years,
        annual_rate: within(
            "annualRate",
            payload.annual_rate.unwrap_or(DEFAULT_INVEST_RATE_PCT),
            0.0,
            MAX_RATE_PCT,
        )? / 100.0,
        frequency: payload.frequency.unwrap_or(ApiFrequency::Annual).into(),
    })
}

pub fn budget_response(payload: BudgetPayload) -> Result<BudgetResponse, InputError> {
    let request = build_budget_request(payload)?;
    let allocation = allocate(request.income, &request.input);
    Ok(BudgetResponse {
        total_allocated: allocation.total_allocated(),
        total_percent: allocation.total_percent(),
        has_warning: allocation.diagnostic.is_warning(),
        allocation,
    })
}

pub fn savings_goal_response(
    payload: SavingsGoalPayload,
) -> Result<SavingsGoalResponse, InputError> {
    let request = build_savings_goal_request(payload)?;
    let solution = solve(&request.plan, request.annual_rate, request.frequency);
    Ok(SavingsGoalResponse {
        duration_years: solution.plan.duration.years(),
        annual_rate: request.annual_rate,
        frequency: request.frequency,
        solution,
    })
}

pub fn investment_response(
    payload: InvestmentPayload,
) -> Result<InvestmentResponse, InputError> {
    let request = build_investment_request(payload)?;
    let projection = project(
        request.start,
        request.monthly_contribution,
        request.years,
        request.annual_rate,
        request.frequency,
    );
    Ok(InvestmentResponse {
        projection,
        annual_rate: request.annual_rate,
        frequency: request.frequency,
    })
}

pub fn router() -> Router {
    Router::new()
        .route("/api/health", get(health_handler))
        .route(
            "/api/budget",
            get(budget_get_handler).post(budget_post_handler),
        )
        .route(
            "/api/savings-goal",
            get(savings_goal_get_handler).post(savings_goal_post_handler),
        )
        .route(
            "/api/investment",
            get(investment_get_handler).post(investment_post_handler),
        )
        .fallback(not_found_handler)
}

pub async fn run_http_server(addr: SocketAddr) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "planner HTTP API listening");

    axum::serve(listener, router()).await
}

async fn health_handler() -> Response {
    json_response(StatusCode::OK, serde_json::json!({ "status": "ok" }))
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn budget_get_handler(payload: Result<Query<BudgetPayload>, QueryRejection>) -> Response {
    respond(query_payload(payload).and_then(budget_response))
}

async fn budget_post_handler(payload: Result<Json<BudgetPayload>, JsonRejection>) -> Response {
    respond(json_payload(payload).and_then(budget_response))
}

async fn savings_goal_get_handler(
    payload: Result<Query<SavingsGoalPayload>, QueryRejection>,
) -> Response {
    respond(query_payload(payload).and_then(savings_goal_response))
}

async fn savings_goal_post_handler(
    payload: Result<Json<SavingsGoalPayload>, JsonRejection>,
) -> Response {
    respond(json_payload(payload).and_then(savings_goal_response))
}

async fn investment_get_handler(
    payload: Result<Query<InvestmentPayload>, QueryRejection>,
) -> Response {
    respond(query_payload(payload).and_then(investment_response))
}

async fn investment_post_handler(
    payload: Result<Json<InvestmentPayload>, JsonRejection>,
) -> Response {
    respond(json_payload(payload).and_then(investment_response))
}

fn query_payload<T>(payload: Result<Query<T>, QueryRejection>) -> Result<T, InputError> {
    payload
        .map(|Query(inner)| inner)
        .map_err(|rejection| InputError::InvalidPayload(rejection.body_text()))
}

fn json_payload<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, InputError> {
    payload
        .map(|Json(inner)| inner)
        .map_err(|rejection| InputError::InvalidPayload(rejection.body_text()))
}

fn respond<T: Serialize>(result: Result<T, InputError>) -> Response {
    match result {
        Ok(body) => {
            debug!("request served");
            json_response(StatusCode::OK, body)
        }
        Err(err) => {
            warn!(error = %err, "rejected request");
            error_response(StatusCode::BAD_REQUEST, &err.to_string())
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

#[cfg(test)]
fn payload_from_json<T: serde::de::DeserializeOwned>(json: &str) -> Result<T, InputError> {
    serde_json::from_str::<T>(json).map_err(|e| InputError::InvalidPayload(e.to_string()))
}
