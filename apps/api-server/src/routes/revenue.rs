//! Revenue report endpoints.
//!
//! Dates are `YYYY-MM-DD` (local midnight in `REVENUE_TZ`); `from`/`to`
//! also accept RFC 3339 instants. Intervals are half-open `[from, to)`.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};

use dinein_core::revenue::{
    DailyRevenue, HourlyRevenue, ItemSales, MethodRevenue, MonthlyRevenue, RevenueStats,
};
use dinein_db::Store;

use crate::error::ApiResult;
use crate::routes::dto::{DateQuery, MonthQuery, RangeQuery};
use crate::state::AppState;

pub fn router<S: Store>() -> Router<AppState<S>> {
    Router::new()
        .route("/revenue/daily", get(daily::<S>))
        .route("/revenue/daily/range", get(daily_range::<S>))
        .route("/revenue/monthly", get(monthly::<S>))
        .route("/revenue/monthly/range", get(monthly_range::<S>))
        .route("/revenue/hourly", get(hourly::<S>))
        .route("/revenue/by-method", get(by_method::<S>))
        .route("/revenue/top-items", get(top_items::<S>))
        .route("/revenue/stats", get(stats::<S>))
}

async fn daily<S: Store>(
    State(state): State<AppState<S>>,
    query: Result<Query<DateQuery>, QueryRejection>,
) -> ApiResult<Json<DailyRevenue>> {
    let Query(q) = query?;
    Ok(Json(state.engine.revenue().daily(q.date()?).await?))
}

async fn daily_range<S: Store>(
    State(state): State<AppState<S>>,
    query: Result<Query<RangeQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<DailyRevenue>>> {
    let Query(q) = query?;
    let (from, to) = q.bounds()?;
    Ok(Json(state.engine.revenue().daily_range(from, to).await?))
}

async fn monthly<S: Store>(
    State(state): State<AppState<S>>,
    query: Result<Query<MonthQuery>, QueryRejection>,
) -> ApiResult<Json<MonthlyRevenue>> {
    let Query(q) = query?;
    let (year, month) = q.year_month()?;
    Ok(Json(state.engine.revenue().monthly(year, month).await?))
}

async fn monthly_range<S: Store>(
    State(state): State<AppState<S>>,
    query: Result<Query<RangeQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<MonthlyRevenue>>> {
    let Query(q) = query?;
    let (from, to) = q.bounds()?;
    Ok(Json(state.engine.revenue().monthly_range(from, to).await?))
}

async fn hourly<S: Store>(
    State(state): State<AppState<S>>,
    query: Result<Query<DateQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<HourlyRevenue>>> {
    let Query(q) = query?;
    Ok(Json(state.engine.revenue().hourly(q.date()?).await?))
}

async fn by_method<S: Store>(
    State(state): State<AppState<S>>,
    query: Result<Query<RangeQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<MethodRevenue>>> {
    let Query(q) = query?;
    let (from, to) = q.bounds()?;
    Ok(Json(state.engine.revenue().by_method(from, to).await?))
}

async fn top_items<S: Store>(
    State(state): State<AppState<S>>,
    query: Result<Query<RangeQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<ItemSales>>> {
    let Query(q) = query?;
    let (from, to) = q.bounds()?;
    Ok(Json(state.engine.revenue().top_items(from, to, q.limit).await?))
}

async fn stats<S: Store>(
    State(state): State<AppState<S>>,
    query: Result<Query<RangeQuery>, QueryRejection>,
) -> ApiResult<Json<RevenueStats>> {
    let Query(q) = query?;
    let (from, to) = q.bounds()?;
    Ok(Json(state.engine.revenue().stats(from, to).await?))
}
