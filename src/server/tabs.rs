//! Tab API endpoints

use std::collections::BTreeMap;

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::application::TabView;
use crate::domain::{Cents, LedgerError, ParticipantId};
use crate::storage::{TabId, TabRepository, TransactionSnapshot};

use super::{ServerError, ServerState};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTab {
    pub name: String,
    #[serde(default)]
    pub users: Vec<ParticipantId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabCreated {
    pub id: TabId,
}

/// Body of an arbitrary split. `amount` is kept as raw JSON so that a
/// non-numeric amount is reported as an invalid amount.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTransaction {
    pub paid_by: ParticipantId,
    #[serde(default)]
    pub amount: Value,
    #[serde(default)]
    pub owed_by: BTreeMap<ParticipantId, Cents>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSplit {
    pub paid_by: ParticipantId,
    #[serde(default)]
    pub amount: Value,
    #[serde(default)]
    pub users: Vec<ParticipantId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewParticipant {
    pub id: ParticipantId,
}

/// Accept only JSON integers as amounts.
fn parse_amount(value: &Value) -> Result<Cents, LedgerError> {
    value.as_i64().ok_or_else(|| {
        LedgerError::InvalidAmount(format!("{} is not a whole number of cents", value))
    })
}

/// Handle requests for creating a new tab
pub async fn new_tab<R: TabRepository>(
    State(state): State<ServerState<R>>,
    payload: Result<Json<NewTab>, JsonRejection>,
) -> Result<(StatusCode, Json<TabCreated>), ServerError> {
    let Json(payload) = payload?;
    let id = state.service.new_tab(payload.name, payload.users).await?;

    Ok((StatusCode::CREATED, Json(TabCreated { id })))
}

/// Handle requests for a tab's balances
pub async fn get<R: TabRepository>(
    State(state): State<ServerState<R>>,
    Path(id): Path<TabId>,
) -> Result<Json<TabView>, ServerError> {
    Ok(Json(state.service.get_tab(&id).await?))
}

pub async fn delete<R: TabRepository>(
    State(state): State<ServerState<R>>,
    Path(id): Path<TabId>,
) -> Result<StatusCode, ServerError> {
    state.service.delete_tab(&id).await?;
    Ok(StatusCode::OK)
}

/// Handle requests for recording an arbitrary split
pub async fn transaction_new<R: TabRepository>(
    State(state): State<ServerState<R>>,
    Path(id): Path<TabId>,
    payload: Result<Json<NewTransaction>, JsonRejection>,
) -> Result<StatusCode, ServerError> {
    let Json(payload) = payload?;
    let amount = parse_amount(&payload.amount)?;

    state
        .service
        .add_transaction(&id, payload.paid_by, amount, payload.owed_by)
        .await?;

    Ok(StatusCode::OK)
}

/// Handle requests for recording an equal split
pub async fn split_new<R: TabRepository>(
    State(state): State<ServerState<R>>,
    Path(id): Path<TabId>,
    payload: Result<Json<NewSplit>, JsonRejection>,
) -> Result<Json<TransactionSnapshot>, ServerError> {
    let Json(payload) = payload?;
    let amount = parse_amount(&payload.amount)?;

    let recorded = state
        .service
        .add_equal_split(&id, &payload.paid_by, amount, &payload.users)
        .await?;

    Ok(Json(recorded))
}

pub async fn transactions<R: TabRepository>(
    State(state): State<ServerState<R>>,
    Path(id): Path<TabId>,
) -> Result<Json<Vec<TransactionSnapshot>>, ServerError> {
    Ok(Json(state.service.list_transactions(&id).await?))
}

/// Handle requests for adding a participant
pub async fn participant_new<R: TabRepository>(
    State(state): State<ServerState<R>>,
    Path(id): Path<TabId>,
    payload: Result<Json<NewParticipant>, JsonRejection>,
) -> Result<StatusCode, ServerError> {
    let Json(payload) = payload?;
    state.service.add_participant(&id, payload.id).await?;
    Ok(StatusCode::OK)
}
