use super::{
    params::{PageParams, SignalParams},
    SharedStore,
};
use crate::{
    store::{Bounds, Page, PageRequest},
    CellTower, Error, Result, TowerAttributes,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

/// A list of towers. Empty lists are answered with 204 and no body.
pub struct Listing(pub Vec<CellTower>);

impl IntoResponse for Listing {
    fn into_response(self) -> Response {
        if self.0.is_empty() {
            StatusCode::NO_CONTENT.into_response()
        } else {
            Json(self.0).into_response()
        }
    }
}

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn create(
    State(store): State<SharedStore>,
    Json(attributes): Json<TowerAttributes>,
) -> Result<(StatusCode, Json<CellTower>)> {
    let tower = store.insert(attributes).await?;
    tracing::debug!(id = tower.id, "created tower");
    Ok((StatusCode::CREATED, Json(tower)))
}

pub async fn create_batch(
    State(store): State<SharedStore>,
    Json(towers): Json<Vec<TowerAttributes>>,
) -> Result<(StatusCode, Json<Vec<CellTower>>)> {
    let towers = store.insert_many(towers).await?;
    tracing::debug!(count = towers.len(), "created towers");
    Ok((StatusCode::CREATED, Json(towers)))
}

pub async fn list(State(store): State<SharedStore>) -> Result<Listing> {
    store.find_all().await.map(Listing)
}

pub async fn list_paged(
    State(store): State<SharedStore>,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<CellTower>>> {
    let request = PageRequest::try_from(params)?;
    store.find_page(None, &request).await.map(Json)
}

pub async fn count(State(store): State<SharedStore>) -> Result<Json<u64>> {
    store.count().await.map(Json)
}

pub async fn get_tower(
    State(store): State<SharedStore>,
    Path(id): Path<i64>,
) -> Result<Json<CellTower>> {
    store
        .find_by_id(id)
        .await?
        .map(Json)
        .ok_or(Error::NotFound(id))
}

/// The first tower carrying `cell`, answered as a one element list.
pub async fn get_by_cell(
    State(store): State<SharedStore>,
    Path(cell): Path<i32>,
) -> Result<Json<Vec<CellTower>>> {
    store
        .find_by_cell(cell)
        .await?
        .map(|tower| Json(vec![tower]))
        .ok_or(Error::CellNotFound(cell))
}

pub async fn replace(
    State(store): State<SharedStore>,
    Path(id): Path<i64>,
    Json(attributes): Json<TowerAttributes>,
) -> Result<Json<CellTower>> {
    store.replace(id, attributes).await.map(Json)
}

pub async fn patch(
    State(store): State<SharedStore>,
    Path(id): Path<i64>,
    Json(patch): Json<TowerAttributes>,
) -> Result<Json<CellTower>> {
    store.patch(id, patch).await.map(Json)
}

pub async fn delete(State(store): State<SharedStore>, Path(id): Path<i64>) -> Result<StatusCode> {
    store.delete(id).await?;
    tracing::debug!(id, "deleted tower");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_all(State(store): State<SharedStore>) -> Result<StatusCode> {
    store.delete_all().await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn by_radio(
    State(store): State<SharedStore>,
    Path(radio): Path<String>,
) -> Result<Listing> {
    store.find_by_radio(&radio).await.map(Listing)
}

pub async fn by_radio_paged(
    State(store): State<SharedStore>,
    Path(radio): Path<String>,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<CellTower>>> {
    let request = PageRequest::try_from(params)?;
    store.find_by_radio_page(&radio, &request).await.map(Json)
}

pub async fn count_by_radio(
    State(store): State<SharedStore>,
    Path(radio): Path<String>,
) -> Result<Json<u64>> {
    store.count_by_radio(&radio).await.map(Json)
}

pub async fn by_mcc(State(store): State<SharedStore>, Path(mcc): Path<i32>) -> Result<Listing> {
    store.find_by_mcc(mcc).await.map(Listing)
}

pub async fn by_mcc_paged(
    State(store): State<SharedStore>,
    Path(mcc): Path<i32>,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<CellTower>>> {
    let request = PageRequest::try_from(params)?;
    store.find_by_mcc_page(mcc, &request).await.map(Json)
}

pub async fn by_radio_and_mcc(
    State(store): State<SharedStore>,
    Path((radio, mcc)): Path<(String, i32)>,
) -> Result<Listing> {
    store.find_by_radio_and_mcc(&radio, mcc).await.map(Listing)
}

pub async fn by_net(State(store): State<SharedStore>, Path(net): Path<i32>) -> Result<Listing> {
    store.find_by_net(net).await.map(Listing)
}

pub async fn by_area(State(store): State<SharedStore>, Path(area): Path<i32>) -> Result<Listing> {
    store.find_by_area(area).await.map(Listing)
}

pub async fn by_changeable(
    State(store): State<SharedStore>,
    Path(flag): Path<i32>,
) -> Result<Listing> {
    store.find_by_changeable(flag).await.map(Listing)
}

pub async fn within_bounds(
    State(store): State<SharedStore>,
    Query(bounds): Query<Bounds>,
) -> Result<Listing> {
    store.find_within_bounds(bounds).await.map(Listing)
}

pub async fn by_min_samples(
    State(store): State<SharedStore>,
    Path(min_samples): Path<i32>,
) -> Result<Listing> {
    store
        .find_by_samples_greater_than(min_samples)
        .await
        .map(Listing)
}

pub async fn by_signal(
    State(store): State<SharedStore>,
    Query(range): Query<SignalParams>,
) -> Result<Listing> {
    store
        .find_by_signal_between(range.min_signal, range.max_signal)
        .await
        .map(Listing)
}
