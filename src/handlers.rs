use crate::errors::{AppError, AppResult, HttpError};
use crate::models::{
    CompanyContext, Credentials, MainContext, StockContext, StockPath, StockQuery, VerifyQuery,
};
use crate::session;
use crate::state::AppState;
use crate::ui::{render_company, render_main, render_resend, render_stock, render_verify};
use axum::{
    async_trait,
    extract::{FromRequest, Path, Query, Request, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse},
    Form, Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde_json::{Map, Value};
use std::collections::HashMap;

pub async fn verify(
    State(state): State<AppState>,
    Query(query): Query<VerifyQuery>,
    jar: CookieJar,
) -> AppResult<(CookieJar, Html<String>)> {
    let token = query
        .token
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::unauthorized("verification token missing"))?;

    state.facade.check_token(&token).await?;

    Ok((session::with_token(jar, token), Html(render_verify())))
}

pub async fn auth(
    State(state): State<AppState>,
    jar: CookieJar,
    credentials: Credentials,
) -> AppResult<CookieJar> {
    let token = state.facade.auth(&credentials).await?;
    Ok(session::with_token(jar, token))
}

pub async fn logout(jar: CookieJar) -> impl IntoResponse {
    (
        StatusCode::FOUND,
        session::without_token(jar),
        [(header::LOCATION, "/main")],
    )
}

pub async fn company(State(state): State<AppState>, jar: CookieJar) -> AppResult<Html<String>> {
    let token = session::require_token(&jar)?;
    let facade = &state.facade;

    let company = facade.check_token(&token).await?;
    let stocks = facade.get_stocks(&token).await?;
    let stats = facade.get_count_stocks_per_date(&token).await?;
    let users = facade.get_number_of_subscriptions(&token).await?;
    let categories = facade.get_categories().await?;

    Ok(Html(render_company(&CompanyContext {
        company: company.data,
        stocks: stocks.data,
        stats: stats.data,
        users: users.data,
        categories: categories.data,
    })))
}

pub async fn stock_info(
    State(state): State<AppState>,
    Path(StockPath { id }): Path<StockPath>,
    jar: CookieJar,
) -> AppResult<Html<String>> {
    let query = StockQuery {
        id,
        token: session::require_token(&jar)?,
    };
    let facade = &state.facade;

    let stock = facade.get_stock_info(&query).await?;
    let stats = facade.get_stats_for_stock(&query).await?;
    let categories = facade.get_categories().await?;

    Ok(Html(render_stock(&StockContext {
        stock: stock.data,
        stats: stats.data,
        categories: categories.data,
    })))
}

pub async fn resend(Path(id): Path<String>) -> Html<String> {
    Html(render_resend(&id))
}

pub async fn index(State(state): State<AppState>) -> AppResult<Html<String>> {
    let categories = state.facade.get_categories().await?;
    Ok(Html(render_main(&MainContext {
        categories: categories.data,
    })))
}

/// Accepts the login form either as JSON or urlencoded.
#[async_trait]
impl<S> FromRequest<S> for Credentials
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("application/json"));

        if is_json {
            let Json(fields) = Json::<Map<String, Value>>::from_request(req, state)
                .await
                .map_err(|rejection| HttpError::with_message(rejection.status(), rejection.body_text()))?;
            return Ok(Credentials(fields));
        }

        let Form(fields) = Form::<HashMap<String, String>>::from_request(req, state)
            .await
            .map_err(|rejection| HttpError::with_message(rejection.status(), rejection.body_text()))?;
        Ok(Credentials(
            fields
                .into_iter()
                .map(|(name, value)| (name, Value::String(value)))
                .collect(),
        ))
    }
}
