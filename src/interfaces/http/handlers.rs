use crate::app::ServiceContext;
use crate::domain::payment::Outcome;
use crate::error::{PaymentError, Result};
use axum::Json;
use axum::body::Bytes;
use axum::extract::{ConnectInfo, Form, FromRequest, Path, Query, Request, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, warn};

type Ctx = State<Arc<ServiceContext>>;

impl IntoResponse for PaymentError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            Self::InvalidAmount(_) => "InvalidAmount".to_string(),
            Self::ClientInput(message) => message.clone(),
            Self::FormTooLarge { .. } => "Form too large".to_string(),
            Self::Config(_) | Self::Io(_) | Self::InternalError(_) => {
                error!(error = %self, "request failed");
                "Internal error".to_string()
            }
            other => other.to_string(),
        };
        (status, body).into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PaymentParams {
    pub id: Option<String>,
    pub amount: Option<String>,
    /// Submitter the payment rate limit is charged to.
    #[serde(alias = "userId")]
    pub user_id: Option<String>,
}

impl PaymentParams {
    fn or(self, other: Self) -> Self {
        Self {
            id: self.id.or(other.id),
            amount: self.amount.or(other.amount),
            user_id: self.user_id.or(other.user_id),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonPaymentParams {
    id: Option<String>,
    #[serde(alias = "user_id")]
    user_id: Option<String>,
    amount: Option<serde_json::Value>,
}

impl From<JsonPaymentParams> for PaymentParams {
    fn from(body: JsonPaymentParams) -> Self {
        let amount = body.amount.and_then(|amount| match amount {
            serde_json::Value::Null => None,
            serde_json::Value::String(text) => Some(text),
            other => Some(other.to_string()),
        });
        Self {
            id: body.id,
            amount,
            user_id: body.user_id,
        }
    }
}

/// Payment fields carried in the request body, either `application/json` or
/// urlencoded. Any other body contributes nothing.
#[derive(Debug, Default)]
pub struct PaymentBody(pub PaymentParams);

#[axum::async_trait]
impl<S> FromRequest<S> for PaymentBody
where
    S: Send + Sync,
{
    type Rejection = PaymentError;

    async fn from_request(req: Request, state: &S) -> Result<Self> {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("application/json") {
            let Json(body) = Json::<JsonPaymentParams>::from_request(req, state)
                .await
                .map_err(|e| {
                    warn!(error = %e, "rejected payment body");
                    PaymentError::ClientInput("Invalid Request".to_string())
                })?;
            Ok(Self(body.into()))
        } else if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(params) = Form::<PaymentParams>::from_request(req, state)
                .await
                .map_err(|e| {
                    warn!(error = %e, "rejected payment body");
                    PaymentError::ClientInput("Invalid Request".to_string())
                })?;
            Ok(Self(params))
        } else {
            Ok(Self::default())
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UserParams {
    pub id: Option<String>,
}

/// Finest scale a `Decimal` can hold.
const MAX_SCALE: i64 = 28;

/// Parses a boundary amount. Unparsable text is a client error; a number that
/// parses but is not finite or not representable is an invalid amount.
pub fn parse_amount(raw: &str) -> Result<Decimal> {
    let raw = raw.trim();
    if raw.contains('_') {
        return Err(PaymentError::ClientInput(format!(
            "amount must be a number, got {raw:?}"
        )));
    }
    if significant_scale(raw).is_some_and(|scale| scale > MAX_SCALE) {
        return Err(PaymentError::InvalidAmount(format!(
            "amount has more than {MAX_SCALE} decimal places: {raw}"
        )));
    }
    if let Ok(value) = Decimal::from_str(raw).or_else(|_| Decimal::from_scientific(raw)) {
        return Ok(value);
    }
    match raw.parse::<f64>() {
        Ok(value) if !value.is_finite() => Err(PaymentError::InvalidAmount(format!(
            "amount must be finite, got {raw}"
        ))),
        Ok(_) => Err(PaymentError::InvalidAmount(format!(
            "amount out of range: {raw}"
        ))),
        Err(_) => Err(PaymentError::ClientInput(format!(
            "amount must be a number, got {raw:?}"
        ))),
    }
}

/// Decimal places needed to hold `raw` exactly, ignoring trailing zeros.
/// `None` when `raw` is not a plain or scientific decimal literal.
fn significant_scale(raw: &str) -> Option<i64> {
    let (mantissa, exponent) = match raw.find(['e', 'E']) {
        Some(at) => (&raw[..at], raw[at + 1..].parse::<i64>().ok()?),
        None => (raw, 0),
    };
    let mantissa = mantissa.strip_prefix(['+', '-']).unwrap_or(mantissa);
    let (whole, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    if !whole.bytes().chain(fraction.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }
    let digits = fraction.trim_end_matches('0').len() as i64;
    Some(digits.saturating_sub(exponent))
}

fn outcome_status(outcome: Outcome) -> StatusCode {
    match outcome {
        Outcome::Success => StatusCode::OK,
        Outcome::Duplicate => StatusCode::CONFLICT,
        Outcome::Failed => StatusCode::PAYMENT_REQUIRED,
    }
}

pub async fn health() -> &'static str {
    "OK"
}

fn peer_key(peer: Option<ConnectInfo<SocketAddr>>) -> String {
    peer.map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// `POST /payment` with `id` and `amount` in a JSON or urlencoded body, or the
/// query string. Body fields take precedence.
///
/// Each submitter (`userId`, or the peer address without one) draws from its
/// own token bucket before the engine sees the payment.
pub async fn submit_payment(
    State(ctx): Ctx,
    peer: Option<ConnectInfo<SocketAddr>>,
    Query(query): Query<PaymentParams>,
    PaymentBody(body): PaymentBody,
) -> Result<(StatusCode, &'static str)> {
    let params = body.or(query);
    let (Some(id), Some(amount)) = (params.id, params.amount) else {
        return Err(PaymentError::ClientInput("Missing parameters".to_string()));
    };

    let submitter = params
        .user_id
        .filter(|user| !user.is_empty())
        .unwrap_or_else(|| peer_key(peer));
    if !ctx.payment_limiter.allow(&submitter).await {
        warn!(%submitter, payment_id = %id, "payment rate limited");
        return Err(PaymentError::RateLimited);
    }

    let amount = parse_amount(&amount)?;
    let outcome = ctx.engine.process_payment(&id, amount).await?;
    Ok((outcome_status(outcome), outcome.as_str()))
}

/// `GET /payment/:id` returns the ledger record.
pub async fn payment_status(State(ctx): Ctx, Path(id): Path<String>) -> Result<Response> {
    match ctx.engine.payment(&id).await? {
        Some(record) => Ok(Json(record).into_response()),
        None => Err(PaymentError::NotFound(id)),
    }
}

pub async fn get_user(
    State(ctx): Ctx,
    peer: Option<ConnectInfo<SocketAddr>>,
    Query(params): Query<UserParams>,
) -> Result<Response> {
    let client = peer_key(peer);
    if !ctx.user_limiter.allow(&client).await {
        warn!(%client, "user lookup rate limited");
        return Ok((StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded").into_response());
    }

    let Some(id) = params.id.filter(|id| !id.is_empty()) else {
        return Err(PaymentError::ClientInput("Missing id parameter".to_string()));
    };

    let user = ctx.users.get_user(&id).await?;
    Ok(([(header::CONTENT_TYPE, "application/json")], user).into_response())
}

pub async fn submit_application(State(ctx): Ctx, body: Bytes) -> Result<&'static str> {
    ctx.forms.submit(&body)
}

pub async fn echo(body: Bytes) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/json")], body)
}
