use crate::models::{Credentials, Envelope, StockForm, StockQuery};
use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client, RequestBuilder,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FacadeError {
    /// The façade answered and refused the call.
    #[error("facade rejected the call with status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("facade unreachable: {0}")]
    Transport(String),

    #[error("malformed facade reply: {0}")]
    Decode(String),
}

pub type FacadeResult<T> = Result<T, FacadeError>;

#[async_trait]
pub trait Facade: Send + Sync {
    async fn check_token(&self, token: &str) -> FacadeResult<Envelope>;

    /// Returns the session token issued for `credentials`.
    async fn auth(&self, credentials: &Credentials) -> FacadeResult<String>;

    async fn get_stocks(&self, token: &str) -> FacadeResult<Envelope>;

    async fn get_stock_info(&self, query: &StockQuery) -> FacadeResult<Envelope>;

    async fn get_categories(&self) -> FacadeResult<Envelope>;

    async fn get_count_stocks_per_date(&self, token: &str) -> FacadeResult<Envelope>;

    async fn get_number_of_subscriptions(&self, token: &str) -> FacadeResult<Envelope>;

    async fn get_stats_for_stock(&self, query: &StockQuery) -> FacadeResult<Envelope>;

    async fn create_stock(&self, token: &str, form: &StockForm) -> FacadeResult<Envelope>;

    async fn edit_stock(&self, token: &str, id: &str, form: &StockForm)
    -> FacadeResult<Envelope>;

    async fn remove_stock(&self, token: &str, id: &str) -> FacadeResult<Envelope>;
}

/// Operation names, appended to the façade base URL.
pub(crate) mod ops {
    pub const CHECK_TOKEN: &str = "checkToken";
    pub const AUTH: &str = "auth";
    pub const GET_STOCKS: &str = "getStocks";
    pub const GET_STOCK_INFO: &str = "getStockInfo";
    pub const GET_CATEGORIES: &str = "getCategories";
    pub const GET_COUNT_STOCKS_PER_DATE: &str = "getCountStocksPerDate";
    pub const GET_NUMBER_OF_SUBSCRIPTIONS: &str = "getNumberOfSubscriptions";
    pub const GET_STATS_FOR_STOCK: &str = "getStatsForStock";
    pub const CREATE_STOCK: &str = "createStock";
    pub const EDIT_STOCK: &str = "editStock";
    pub const REMOVE_STOCK: &str = "removeStock";
}

/// HTTP implementation talking JSON (and multipart for stock forms).
#[derive(Debug, Clone)]
pub struct HttpFacade {
    client: Client,
    base_url: String,
}

impl HttpFacade {
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> FacadeResult<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|err| FacadeError::Transport(err.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, op: &str) -> String {
        format!("{}/{op}", self.base_url)
    }

    async fn post_json<B>(&self, op: &str, body: &B) -> FacadeResult<Envelope>
    where
        B: Serialize + ?Sized,
    {
        self.send(self.client.post(self.url(op)).json(body)).await
    }

    async fn post_form(&self, op: &str, form: Form) -> FacadeResult<Envelope> {
        self.send(self.client.post(self.url(op)).multipart(form)).await
    }

    async fn send(&self, request: RequestBuilder) -> FacadeResult<Envelope> {
        let response = request
            .send()
            .await
            .map_err(|err| FacadeError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FacadeError::Rejected {
                status: status.as_u16(),
                message: rejection_message(&body, status.canonical_reason()),
            });
        }

        response
            .json::<Envelope>()
            .await
            .map_err(|err| FacadeError::Decode(err.to_string()))
    }
}

#[async_trait]
impl Facade for HttpFacade {
    async fn check_token(&self, token: &str) -> FacadeResult<Envelope> {
        self.post_json(ops::CHECK_TOKEN, &json!({ "token": token }))
            .await
    }

    async fn auth(&self, credentials: &Credentials) -> FacadeResult<String> {
        let envelope = self.post_json(ops::AUTH, credentials).await?;
        match envelope.data {
            Value::String(token) => Ok(token),
            other => Err(FacadeError::Decode(format!(
                "expected a token string, got {other}"
            ))),
        }
    }

    async fn get_stocks(&self, token: &str) -> FacadeResult<Envelope> {
        self.post_json(ops::GET_STOCKS, &json!({ "token": token }))
            .await
    }

    async fn get_stock_info(&self, query: &StockQuery) -> FacadeResult<Envelope> {
        self.post_json(ops::GET_STOCK_INFO, query).await
    }

    async fn get_categories(&self) -> FacadeResult<Envelope> {
        self.post_json(ops::GET_CATEGORIES, &json!({})).await
    }

    async fn get_count_stocks_per_date(&self, token: &str) -> FacadeResult<Envelope> {
        self.post_json(ops::GET_COUNT_STOCKS_PER_DATE, &json!({ "token": token }))
            .await
    }

    async fn get_number_of_subscriptions(&self, token: &str) -> FacadeResult<Envelope> {
        self.post_json(ops::GET_NUMBER_OF_SUBSCRIPTIONS, &json!({ "token": token }))
            .await
    }

    async fn get_stats_for_stock(&self, query: &StockQuery) -> FacadeResult<Envelope> {
        self.post_json(ops::GET_STATS_FOR_STOCK, query).await
    }

    async fn create_stock(&self, token: &str, form: &StockForm) -> FacadeResult<Envelope> {
        let body = multipart(form, token, None)?;
        self.post_form(ops::CREATE_STOCK, body).await
    }

    async fn edit_stock(
        &self,
        token: &str,
        id: &str,
        form: &StockForm,
    ) -> FacadeResult<Envelope> {
        let body = multipart(form, token, Some(id))?;
        self.post_form(ops::EDIT_STOCK, body).await
    }

    async fn remove_stock(&self, token: &str, id: &str) -> FacadeResult<Envelope> {
        self.post_json(ops::REMOVE_STOCK, &json!({ "token": token, "id": id }))
            .await
    }
}

fn multipart(form: &StockForm, token: &str, id: Option<&str>) -> FacadeResult<Form> {
    let mut body = Form::new();
    for (name, value) in &form.fields {
        body = body.text(name.clone(), value.clone());
    }
    if let Some(logo) = &form.logo {
        let part = Part::bytes(logo.bytes.clone())
            .file_name(logo.file_name.clone())
            .mime_str(&logo.content_type)
            .map_err(|err| FacadeError::Transport(err.to_string()))?;
        body = body.part("logo", part);
    }
    body = body.text("token", token.to_string());
    if let Some(id) = id {
        body = body.text("id", id.to_string());
    }
    Ok(body)
}

fn rejection_message(body: &str, reason: Option<&str>) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        for key in ["message", "error"] {
            if let Some(message) = value.get(key).and_then(Value::as_str) {
                return message.to_string();
            }
        }
    }

    let body = body.trim();
    if !body.is_empty() {
        return body.to_string();
    }
    reason.unwrap_or("facade error").to_string()
}
