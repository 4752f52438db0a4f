use crate::models::{id_string, CompanyContext, MainContext, StockContext};
use axum::http::StatusCode;
use serde::Serialize;
use serde_json::Value;

pub fn render_main(context: &MainContext) -> String {
    let body = MAIN_BODY.replace("{{CATEGORIES}}", &category_list(&context.categories));
    page("Stocks", &body, Some(context))
}

pub fn render_verify() -> String {
    page("Account confirmed", VERIFY_BODY, None::<&()>)
}

pub fn render_company(context: &CompanyContext) -> String {
    let body = COMPANY_BODY
        .replace("{{COMPANY}}", &escape(&display_name(&context.company)))
        .replace("{{USERS}}", &escape(&scalar(&context.users)))
        .replace("{{STOCKS}}", &stock_list(&context.stocks))
        .replace("{{CATEGORIES}}", &category_list(&context.categories));
    page("Company", &body, Some(context))
}

pub fn render_stock(context: &StockContext) -> String {
    let id = context.stock.get("id").and_then(id_string).unwrap_or_default();
    let body = STOCK_BODY
        .replace("{{ID}}", &escape(&id))
        .replace("{{TITLE}}", &escape(&display_name(&context.stock)))
        .replace("{{STATS}}", &escape(&pretty(&context.stats)))
        .replace("{{CATEGORIES}}", &category_list(&context.categories));
    page("Stock", &body, Some(context))
}

pub fn render_resend(id: &str) -> String {
    let body = RESEND_BODY.replace("{{ID}}", &escape(id));
    page("Resend confirmation", &body, None::<&()>)
}

pub fn render_error(status: StatusCode, message: &str) -> String {
    let body = ERROR_BODY
        .replace("{{STATUS}}", status.as_str())
        .replace("{{MESSAGE}}", &escape(message));
    page("Error", &body, None::<&()>)
}

pub fn render_diagnostic(message: &str, detail: &str) -> String {
    let body = DIAGNOSTIC_BODY
        .replace("{{MESSAGE}}", &escape(message))
        .replace("{{DETAIL}}", &escape(detail));
    page("Internal error", &body, None::<&()>)
}

fn page<C: Serialize>(title: &str, body: &str, context: Option<&C>) -> String {
    let context = context
        .and_then(|context| serde_json::to_string(context).ok())
        .map(|json| format!(
            r#"<script type="application/json" id="context">{}</script>"#,
            json.replace("</", "<\\/")
        ))
        .unwrap_or_default();

    LAYOUT_HTML
        .replace("{{TITLE}}", &escape(title))
        .replace("{{BODY}}", body)
        .replace("{{CONTEXT}}", &context)
}

fn category_list(categories: &Value) -> String {
    let Some(items) = categories.as_array() else {
        return String::new();
    };
    items
        .iter()
        .map(|category| format!("<li>{}</li>", escape(&display_name(category))))
        .collect()
}

/// Each stock carries its fields as `data-` attributes for the edit form.
fn stock_list(stocks: &Value) -> String {
    let Some(items) = stocks.as_array() else {
        return String::new();
    };
    items
        .iter()
        .map(|stock| {
            let id = stock.get("id").and_then(id_string).unwrap_or_default();
            let attributes: String = stock
                .as_object()
                .into_iter()
                .flatten()
                .filter(|(name, _)| name.as_str() != "id")
                .map(|(name, value)| format!(r#" data-{}="{}""#, escape(name), escape(&scalar(value))))
                .collect();
            format!(
                r#"<li class="stock {id}"{attributes}><a href="/stockinfo/{id}">{title}</a></li>"#,
                id = escape(&id),
                title = escape(&display_name(stock)),
            )
        })
        .collect()
}

fn display_name(value: &Value) -> String {
    ["name", "title"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .map(str::to_string)
        .unwrap_or_else(|| scalar(value))
}

fn scalar(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

const MAIN_BODY: &str = r#"<header>
      <h1>Stocks</h1>
      <p class="subtitle">Current offers from companies near you.</p>
    </header>
    <section class="panel">
      <h2>Categories</h2>
      <ul class="categories">{{CATEGORIES}}</ul>
    </section>"#;

const VERIFY_BODY: &str = r#"<header>
      <h1>Account confirmed</h1>
      <p class="subtitle">You are signed in. Continue to your <a href="/company">company dashboard</a>.</p>
    </header>"#;

const COMPANY_BODY: &str = r#"<header>
      <h1>{{COMPANY}}</h1>
      <p class="subtitle">Subscribers: <span id="users">{{USERS}}</span></p>
      <a class="logout" href="/logout">Log out</a>
    </header>
    <section class="panel" ng-controller="Stock">
      <h2>Stocks</h2>
      <ul class="stocks">{{STOCKS}}</ul>
    </section>
    <section class="panel">
      <h2>Categories</h2>
      <ul class="categories">{{CATEGORIES}}</ul>
    </section>"#;

const STOCK_BODY: &str = r#"<header>
      <h1>{{TITLE}}</h1>
      <p class="subtitle">Stock <span id="stock-id">{{ID}}</span></p>
    </header>
    <section class="panel">
      <h2>Statistics</h2>
      <pre class="stats">{{STATS}}</pre>
    </section>
    <section class="panel">
      <h2>Categories</h2>
      <ul class="categories">{{CATEGORIES}}</ul>
    </section>"#;

const RESEND_BODY: &str = r#"<header>
      <h1>Check your inbox</h1>
      <p class="subtitle">We sent a new confirmation link for account <span id="account">{{ID}}</span>.</p>
    </header>"#;

const ERROR_BODY: &str = r#"<header>
      <h1 class="status">{{STATUS}}</h1>
      <p class="subtitle">{{MESSAGE}}</p>
    </header>"#;

const DIAGNOSTIC_BODY: &str = r#"<header>
      <h1>{{MESSAGE}}</h1>
    </header>
    <pre class="diagnostic">{{DETAIL}}</pre>"#;

const LAYOUT_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>{{TITLE}}</title>
  <link rel="stylesheet" href="/css/main.css" />
  <style>
    :root {
      --bg-1: #f8f3e6;
      --ink: #2b2a28;
      --accent: #ff6b4a;
      --accent-2: #2f4858;
      --card: rgba(255, 255, 255, 0.86);
    }

    body {
      margin: 0;
      min-height: 100vh;
      background: var(--bg-1);
      color: var(--ink);
      font-family: "Space Grotesk", "Trebuchet MS", sans-serif;
      display: grid;
      place-items: center;
      padding: 32px 18px 48px;
    }

    .app {
      width: min(860px, 100%);
      background: var(--card);
      border-radius: 28px;
      padding: 36px;
      display: grid;
      gap: 28px;
    }

    .status {
      color: var(--accent);
    }

    .diagnostic {
      white-space: pre-wrap;
      color: var(--accent-2);
    }
  </style>
</head>
<body ng-app="app">
  <main class="app">
    {{BODY}}
  </main>
  {{CONTEXT}}
  <script src="/js/controllers/company.js"></script>
</body>
</html>
"#;
