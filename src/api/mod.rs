mod display;

use axum::{
    Router,
    extract::{Json, Query, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::info;

use crate::core::{
    CalculatorConfig, Catalog, DerivedBreakdown, DerivedStateController, LoanParameters, Listing,
    TaxSource, Unit, coerce_str, coerce_value, effective_tax_rate, normalize_unit,
    unit_from_query,
};

pub use display::{ChartSegment, DisplaySummary, chart_segments, format_dollars, render_text};

const INDEX_HTML: &str = include_str!("../../web/index.html");
const STYLES_CSS: &str = include_str!("../../web/styles.css");
const APP_JS: &str = include_str!("../../web/app.js");

#[derive(Parser, Debug)]
#[command(
    name = "mortgage",
    about = "Monthly mortgage payment estimator for priced homes"
)]
pub struct Cli {
    #[command(flatten)]
    config: ConfigArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug, Clone)]
struct ConfigArgs {
    #[arg(
        long,
        global = true,
        default_value_t = 1.25,
        help = "Property tax rate in percent for units without their own rate"
    )]
    fallback_tax_rate: f64,
    #[arg(long, global = true, default_value_t = 20.0, help = "Down payment in percent")]
    down_payment_percent: f64,
    #[arg(
        long,
        global = true,
        default_value_t = 7.5,
        help = "Annual interest rate in percent"
    )]
    interest_rate: f64,
    #[arg(long, global = true, default_value_t = 30, help = "Loan term in years")]
    loan_term: u32,
    #[arg(long, global = true, default_value_t = 1200.0, help = "Yearly home insurance")]
    insurance_yearly: f64,
    #[arg(
        long,
        global = true,
        default_value_t = 700_000.0,
        help = "Price of the home selected at start-up; 0 starts with no home"
    )]
    initial_price: f64,
    #[arg(long, global = true, help = "JSON unit catalog replacing the built-in one")]
    catalog: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the calculator page and JSON API.
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
    /// List the units in the catalog.
    Units,
    /// Print the payment breakdown for one home.
    Quote(QuoteArgs),
}

#[derive(Args, Debug, Default)]
struct QuoteArgs {
    #[arg(long, help = "Home price; takes precedence over --catalog-unit")]
    price: Option<String>,
    #[arg(long)]
    unit_id: Option<String>,
    #[arg(long)]
    plan: Option<String>,
    #[arg(
        long,
        help = "Property tax rate in percent, e.g. 0.78; describes the --price home, otherwise overrides the selected home's rate"
    )]
    tax_rate: Option<f64>,
    #[arg(long, help = "Explicit yearly property tax, overriding any rate")]
    tax_yearly: Option<f64>,
    #[arg(long, help = "Pick the home from the catalog by unit id")]
    catalog_unit: Option<String>,
    #[arg(long, help = "Print a text summary instead of JSON")]
    text: bool,
}

#[derive(Debug, Error)]
enum QuoteError {
    #[error("unknown catalog unit {0:?}")]
    UnknownUnit(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ParameterEdit {
    DownPaymentPercent(f64),
    InterestRate(f64),
    LoanTerm(f64),
    InsuranceYearly(f64),
}

#[derive(Debug, Default)]
struct QuoteRequest {
    catalog_unit: Option<String>,
    unit: Option<Unit>,
    tax_source: Option<TaxSource>,
    edits: Vec<ParameterEdit>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct QuotePayload {
    catalog_unit: Option<String>,
    price: Option<Value>,
    #[serde(alias = "unit_id")]
    unit_id: Option<Value>,
    plan: Option<Value>,
    unit: Option<Value>,
    tax_rate: Option<Value>,
    tax_yearly: Option<Value>,
    down_payment_percent: Option<Value>,
    interest_rate: Option<Value>,
    loan_term: Option<Value>,
    insurance_yearly: Option<Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QuoteResponse {
    unit: Option<Unit>,
    unit_label: String,
    tax_rate: f64,
    yearly_property_tax: f64,
    parameters: LoanParameters,
    breakdown: DerivedBreakdown,
    display: DisplaySummary,
    chart: Vec<ChartSegment>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

struct ServerState {
    config: CalculatorConfig,
    catalog: Catalog,
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = build_config(&cli.config).map_err(anyhow::Error::msg)?;
    let catalog = match &cli.config.catalog {
        Some(path) => Catalog::load(path)?,
        None => Catalog::builtin()?,
    };

    match cli.command {
        Command::Serve { port } => run_http_server(port, config, catalog).await?,
        Command::Units => println!("{}", serde_json::to_string_pretty(catalog.listings())?),
        Command::Quote(args) => {
            let text = args.text;
            let response = quote(&config, &catalog, quote_request_from_args(args))?;
            if text {
                print!("{}", render_text(&response.unit_label, &response.breakdown));
            } else {
                println!("{}", serde_json::to_string_pretty(&response)?);
            }
        }
    }
    Ok(())
}

fn build_config(args: &ConfigArgs) -> Result<CalculatorConfig, String> {
    if !args.fallback_tax_rate.is_finite() || args.fallback_tax_rate < 0.0 {
        return Err("--fallback-tax-rate must be a non-negative number".to_string());
    }

    if args.loan_term == 0 {
        return Err("--loan-term must be > 0".to_string());
    }

    if !args.initial_price.is_finite() || args.initial_price < 0.0 {
        return Err("--initial-price must be >= 0".to_string());
    }

    let initial_unit = (args.initial_price > 0.0).then(|| Unit::priced(args.initial_price));

    Ok(CalculatorConfig {
        fallback_tax_rate: args.fallback_tax_rate / 100.0,
        defaults: LoanParameters {
            down_payment_percent: args.down_payment_percent,
            interest_rate_percent: args.interest_rate,
            loan_term_years: f64::from(args.loan_term),
            insurance_yearly: args.insurance_yearly,
        },
        initial_unit,
    })
}

fn quote(
    config: &CalculatorConfig,
    catalog: &Catalog,
    request: QuoteRequest,
) -> Result<QuoteResponse, QuoteError> {
    let mut controller = DerivedStateController::new(config.clone());

    if let Some(unit_id) = request.catalog_unit {
        let listing = catalog
            .find(&unit_id)
            .ok_or(QuoteError::UnknownUnit(unit_id))?;
        controller.select_unit(listing.to_unit());
    }
    if let Some(unit) = request.unit {
        controller.select_unit(unit);
    }
    if let Some(source) = request.tax_source {
        controller.set_tax_source(source);
    }
    for edit in request.edits {
        match edit {
            ParameterEdit::DownPaymentPercent(v) => controller.set_down_payment_percent(v),
            ParameterEdit::InterestRate(v) => controller.set_interest_rate(v),
            ParameterEdit::LoanTerm(v) => controller.set_loan_term(v),
            ParameterEdit::InsuranceYearly(v) => controller.set_insurance_yearly(v),
        }
    }

    Ok(build_quote_response(&controller))
}

fn build_quote_response(controller: &DerivedStateController) -> QuoteResponse {
    let unit = controller.selected_unit().cloned();
    let tax_rate = match (controller.tax_source(), unit.as_ref()) {
        (TaxSource::Rate(rate), _) => rate,
        (TaxSource::YearlyAmount(amount), Some(unit)) => amount / unit.price,
        (_, Some(unit)) => effective_tax_rate(unit, controller.fallback_tax_rate()),
        (_, None) => controller.fallback_tax_rate(),
    };
    let breakdown = controller.current_breakdown();
    QuoteResponse {
        unit_label: unit.as_ref().map(Unit::label).unwrap_or_default(),
        unit,
        tax_rate,
        yearly_property_tax: controller.yearly_property_tax(),
        parameters: controller.parameters(),
        breakdown,
        display: display::summarize(&breakdown),
        chart: chart_segments(&breakdown),
    }
}

/// `taxYearly` wins over `taxRate`. A `taxRate` sent with a price describes that
/// home, so it only overrides the tax source when the request carries no price.
fn tax_source_from(
    price_given: bool,
    tax_yearly: Option<f64>,
    tax_rate: Option<f64>,
) -> Option<TaxSource> {
    match (tax_yearly, tax_rate) {
        (Some(amount), _) => Some(TaxSource::YearlyAmount(amount)),
        (None, Some(rate)) if !price_given => Some(TaxSource::Rate(rate)),
        _ => None,
    }
}

fn quote_request_from_args(args: QuoteArgs) -> QuoteRequest {
    let price_given = args.price.as_deref().is_some_and(|p| !p.is_empty());
    let tax_rate = args.tax_rate.map(|percent| percent / 100.0);
    let query: HashMap<String, String> = [
        ("price", args.price),
        ("unit_id", args.unit_id),
        ("plan", args.plan),
    ]
    .into_iter()
    .filter_map(|(key, value)| value.map(|v| (key.to_string(), v)))
    .collect();

    let unit = unit_from_query(&query).map(|unit| Unit {
        tax_rate: tax_rate.filter(|rate| rate.is_finite()),
        ..unit
    });
    QuoteRequest {
        catalog_unit: args.catalog_unit,
        unit,
        tax_source: tax_source_from(price_given, args.tax_yearly, tax_rate),
        edits: Vec::new(),
    }
}

fn quote_request_from_query(query: &HashMap<String, String>) -> QuoteRequest {
    let number = |key: &str| query.get(key).map(|raw| coerce_str(raw));
    let price_given = query.get("price").is_some_and(|p| !p.is_empty());
    QuoteRequest {
        catalog_unit: query
            .get("catalogUnit")
            .filter(|id| !id.is_empty())
            .cloned(),
        unit: unit_from_query(query),
        tax_source: tax_source_from(price_given, number("taxYearly"), number("taxRate")),
        edits: parameter_edits(
            number("downPaymentPercent"),
            number("interestRate"),
            number("loanTerm"),
            number("insuranceYearly"),
        ),
    }
}

fn quote_request_from_payload(payload: QuotePayload) -> QuoteRequest {
    let number = |value: &Option<Value>| value.as_ref().map(coerce_value);
    let price = payload
        .price
        .as_ref()
        .filter(|price| !price.is_null() && price.as_str() != Some(""));

    // A top-level price describes the home inline and takes precedence over `unit`.
    let unit = match price {
        Some(price) => {
            let mut fields = serde_json::Map::new();
            fields.insert("price".to_string(), price.clone());
            for (key, value) in [
                ("unitId", &payload.unit_id),
                ("plan", &payload.plan),
                ("taxRate", &payload.tax_rate),
            ] {
                if let Some(value) = value {
                    fields.insert(key.to_string(), value.clone());
                }
            }
            normalize_unit(&Value::Object(fields))
        }
        None => payload.unit.as_ref().and_then(normalize_unit),
    };
    QuoteRequest {
        catalog_unit: payload.catalog_unit.filter(|id| !id.is_empty()),
        unit,
        tax_source: tax_source_from(
            price.is_some(),
            number(&payload.tax_yearly),
            number(&payload.tax_rate),
        ),
        edits: parameter_edits(
            number(&payload.down_payment_percent),
            number(&payload.interest_rate),
            number(&payload.loan_term),
            number(&payload.insurance_yearly),
        ),
    }
}

fn parameter_edits(
    down_payment_percent: Option<f64>,
    interest_rate: Option<f64>,
    loan_term: Option<f64>,
    insurance_yearly: Option<f64>,
) -> Vec<ParameterEdit> {
    [
        down_payment_percent.map(ParameterEdit::DownPaymentPercent),
        interest_rate.map(ParameterEdit::InterestRate),
        loan_term.map(ParameterEdit::LoanTerm),
        insurance_yearly.map(ParameterEdit::InsuranceYearly),
    ]
    .into_iter()
    .flatten()
    .collect()
}

pub async fn run_http_server(
    port: u16,
    config: CalculatorConfig,
    catalog: Catalog,
) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let state = Arc::new(ServerState { config, catalog });
    let app = Router::new()
        .route("/", get(index_handler))
        .route("/index.html", get(index_handler))
        .route("/styles.css", get(styles_handler))
        .route("/app.js", get(app_js_handler))
        .route("/api/units", get(units_handler))
        .route("/api/quote", get(quote_get_handler).post(quote_post_handler))
        .fallback(not_found_handler)
        .with_state(state);

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "mortgage calculator listening");
    info!("local access: http://127.0.0.1:{port}/");

    axum::serve(listener, app).await
}

async fn index_handler() -> impl IntoResponse {
    with_cache_control(Html(INDEX_HTML))
}

async fn styles_handler() -> impl IntoResponse {
    with_cache_control((
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        STYLES_CSS,
    ))
}

async fn app_js_handler() -> impl IntoResponse {
    with_cache_control((
        [(
            header::CONTENT_TYPE,
            "application/javascript; charset=utf-8",
        )],
        APP_JS,
    ))
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn units_handler(State(state): State<Arc<ServerState>>) -> Response {
    json_response::<&[Listing]>(StatusCode::OK, state.catalog.listings())
}

async fn quote_get_handler(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    quote_handler_impl(&state, quote_request_from_query(&query))
}

async fn quote_post_handler(
    State(state): State<Arc<ServerState>>,
    Json(payload): Json<QuotePayload>,
) -> Response {
    quote_handler_impl(&state, quote_request_from_payload(payload))
}

fn quote_handler_impl(state: &ServerState, request: QuoteRequest) -> Response {
    match quote(&state.config, &state.catalog, request) {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(err) => error_response(StatusCode::NOT_FOUND, &err.to_string()),
    }
}

fn with_cache_control<R: IntoResponse>(response: R) -> Response {
    let mut response = response.into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    with_cache_control((status, Json(body)))
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}
