use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::domain::Transaction;
use crate::error::AppError;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateTransactionInput {
    pub amount_btc: f64,
    pub price_per_btc: i64,
    pub transaction_type: i8,
    #[serde(default)]
    pub note: String,
}

/// Partial update: absent fields keep their stored values.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateTransactionInput {
    pub amount_btc: Option<f64>,
    pub price_per_btc: Option<i64>,
    pub transaction_type: Option<i8>,
    pub note: Option<String>,
    /// Version the client last saw; defaults to the one just read.
    pub version: Option<i32>,
}

impl UpdateTransactionInput {
    fn apply(self, tx: &mut Transaction) {
        if let Some(amount_btc) = self.amount_btc {
            tx.amount_btc = amount_btc;
        }
        if let Some(price_per_btc) = self.price_per_btc {
            tx.price_per_btc = price_per_btc;
        }
        if let Some(transaction_type) = self.transaction_type {
            tx.transaction_type = transaction_type;
        }
        if let Some(note) = self.note {
            tx.note = note;
        }
        if let Some(version) = self.version {
            tx.version = version;
        }
    }
}

/// Parses the `:id` segment. Anything that is not a positive integer is
/// reported as not found and never reaches the store.
fn read_id_param(raw: &str) -> Result<i64, AppError> {
    match raw.parse::<i64>() {
        Ok(id) if id >= 1 => Ok(id),
        _ => Err(AppError::NotFound),
    }
}

fn read_json<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(input)| input)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}

pub async fn list_transactions(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let transactions = state.transactions.get_all().await?;
    Ok(Json(json!({ "transactions": transactions })))
}

pub async fn create_transaction(
    State(state): State<AppState>,
    payload: Result<Json<CreateTransactionInput>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let input = read_json(payload)?;

    let mut tx = Transaction::new(
        input.amount_btc,
        input.price_per_btc,
        input.transaction_type,
        input.note,
    );
    state.transactions.insert(&mut tx).await?;

    tracing::info!(transaction_id = tx.id, "transaction recorded");

    let location = format!("/transactions/{}", tx.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(json!({ "transaction": tx })),
    ))
}

pub async fn get_transaction(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = read_id_param(&raw_id)?;
    let tx = state.transactions.get(id).await?;
    Ok(Json(json!({ "transaction": tx })))
}

pub async fn update_transaction(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    payload: Result<Json<UpdateTransactionInput>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let id = read_id_param(&raw_id)?;
    let input = read_json(payload)?;

    let mut tx = state.transactions.get(id).await?;
    input.apply(&mut tx);
    state.transactions.update(&mut tx).await?;

    Ok(Json(json!({ "transaction": tx })))
}

pub async fn delete_transaction(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = read_id_param(&raw_id)?;
    state.transactions.delete(id).await?;

    tracing::info!(transaction_id = id, "transaction deleted");
    Ok(Json(json!({ "message": "transaction successfully deleted" })))
}
