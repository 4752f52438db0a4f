use crate::facade::Facade;
use crate::models::{id_string, FieldValue, StockForm, StockRecord};
use chrono::NaiveDate;
use serde_json::Value;
use std::cmp::Ordering;
use tracing::warn;

pub const DEFAULT_SORT_FIELD: &str = "startDate";
pub const REMOVE_PROMPT: &str = "Do you really want to delete this stock?";

const DATE_FIELDS: [&str; 2] = ["startDate", "endDate"];
const FORM_DATE_FORMAT: &str = "%m/%d/%Y";
const STORED_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardMessages {
    pub wrong_add: String,
    pub wrong_edit: String,
    pub success_remove: String,
    pub wrong_remove: String,
}

impl Default for BoardMessages {
    fn default() -> Self {
        Self {
            wrong_add: "Could not add the stock".into(),
            wrong_edit: "Could not save the stock".into(),
            success_remove: "Stock deleted".into(),
            wrong_remove: "Could not delete the stock".into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    fn success(message: &str) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.to_string(),
        }
    }

    fn error(message: &str) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.to_string(),
        }
    }
}

/// What the page should do after a board operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outcome {
    pub close_dialog: bool,
    pub notice: Option<Notice>,
}

impl Outcome {
    fn closed() -> Self {
        Self {
            close_dialog: true,
            notice: None,
        }
    }

    fn notify(notice: Notice) -> Self {
        Self {
            close_dialog: false,
            notice: Some(notice),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortState {
    pub field: String,
    pub reverse: bool,
}

impl Default for SortState {
    fn default() -> Self {
        Self {
            field: DEFAULT_SORT_FIELD.to_string(),
            reverse: true,
        }
    }
}

impl SortState {
    /// Same field flips the direction; a new field starts descending.
    pub fn toggle(&mut self, name: &str) {
        if self.field == name {
            self.reverse = !self.reverse;
        } else {
            self.field = name.to_string();
            self.reverse = true;
        }
    }

    pub fn is_down(&self, name: &str) -> bool {
        self.field == name && self.reverse
    }

    pub fn is_up(&self, name: &str) -> bool {
        self.field == name && !self.reverse
    }
}

/// Local copy of a company's stocks. Successful edits are applied here and the
/// façade is never re-read, so changes made elsewhere show up only on rebuild.
#[derive(Debug, Clone)]
pub struct StockBoard {
    token: String,
    stocks: Vec<StockRecord>,
    sort: SortState,
    messages: BoardMessages,
}

impl StockBoard {
    pub fn new(token: impl Into<String>, stocks: Vec<StockRecord>) -> Self {
        Self {
            token: token.into(),
            stocks,
            sort: SortState::default(),
            messages: BoardMessages::default(),
        }
    }

    /// Builds a board from the `data` array of a `getStocks` reply.
    pub fn from_stocks(token: impl Into<String>, data: &Value) -> Result<Self, serde_json::Error> {
        let stocks = serde_json::from_value(data.clone())?;
        Ok(Self::new(token, stocks))
    }

    pub fn with_messages(mut self, messages: BoardMessages) -> Self {
        self.messages = messages;
        self
    }

    pub fn stocks(&self) -> &[StockRecord] {
        &self.stocks
    }

    pub fn sort_state(&self) -> &SortState {
        &self.sort
    }

    pub async fn add(&mut self, facade: &dyn Facade, form: &StockForm) -> Outcome {
        let reply = match facade.create_stock(&self.token, form).await {
            Ok(reply) => reply,
            Err(err) => {
                warn!(error = %err, "stock create failed");
                return Outcome::notify(Notice::error(&self.messages.wrong_add));
            }
        };

        if reply.kind != "stock" {
            return Outcome::default();
        }

        let mut record = StockRecord::default();
        for (name, value) in &form.fields {
            record.set_field(name, form_value(name, value));
        }
        record.id = reply.data.get("id").and_then(id_string).unwrap_or_default();
        record.logo = reply
            .data
            .get("logo")
            .and_then(Value::as_str)
            .map(str::to_string);

        self.stocks.insert(0, record);
        Outcome::closed()
    }

    /// Values for the edit dialog, one per requested field the stock has.
    pub fn edit_form(&self, id: &str, names: &[&str]) -> Option<Vec<(String, String)>> {
        let record = self.stocks.iter().find(|stock| stock.id == id)?;
        let fields = names
            .iter()
            .filter_map(|name| {
                let value = match record.field(name).filter(|value| !value.is_empty())? {
                    FieldValue::Text(text) if DATE_FIELDS.contains(name) => {
                        edit_date_value(text).unwrap_or_else(|| text.to_string())
                    }
                    value => value.to_string(),
                };
                Some((name.to_string(), value))
            })
            .collect();
        Some(fields)
    }

    pub async fn update(&mut self, facade: &dyn Facade, id: &str, form: &StockForm) -> Outcome {
        let reply = match facade.edit_stock(&self.token, id, form).await {
            Ok(reply) => reply,
            Err(err) => {
                warn!(error = %err, stock = id, "stock update failed");
                return Outcome::notify(Notice::error(&self.messages.wrong_edit));
            }
        };

        if let Some(record) = self.stocks.iter_mut().find(|stock| stock.id == id) {
            for (name, value) in &form.fields {
                record.set_field(name, form_value(name, value));
            }
            if let Some(logo) = reply.data.as_str() {
                record.logo = Some(logo.to_string());
            }
        }
        Outcome::closed()
    }

    /// `confirmed` is the user's answer to [`REMOVE_PROMPT`].
    pub async fn remove(&mut self, facade: &dyn Facade, id: &str, confirmed: bool) -> Outcome {
        if !confirmed {
            return Outcome::default();
        }

        match facade.remove_stock(&self.token, id).await {
            Ok(_) => {
                self.stocks.retain(|stock| stock.id != id);
                Outcome::notify(Notice::success(&self.messages.success_remove))
            }
            Err(err) => {
                warn!(error = %err, stock = id, "stock delete failed");
                Outcome::notify(Notice::error(&self.messages.wrong_remove))
            }
        }
    }

    pub fn sort(&mut self, name: &str) {
        self.sort.toggle(name);
    }

    pub fn is_down(&self, name: &str) -> bool {
        self.sort.is_down(name)
    }

    pub fn is_up(&self, name: &str) -> bool {
        self.sort.is_up(name)
    }

    /// Stocks in display order; numbers compare by value and records missing
    /// the field sort last.
    pub fn ordered(&self) -> Vec<&StockRecord> {
        let field = self.sort.field.as_str();
        let mut ordered: Vec<&StockRecord> = self.stocks.iter().collect();
        ordered.sort_by(|a, b| match (a.field(field), b.field(field)) {
            (Some(a), Some(b)) if self.sort.reverse => b.compare(&a),
            (Some(a), Some(b)) => a.compare(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });
        ordered
    }
}

/// `"2016-05-12T00:00:00.000Z"` (quotes optional) to `05/12/2016`.
pub fn edit_date_value(raw: &str) -> Option<String> {
    let raw = raw.trim().trim_start_matches('"');
    let date = NaiveDate::parse_from_str(raw.get(..10)?, STORED_DATE_FORMAT).ok()?;
    Some(date.format(FORM_DATE_FORMAT).to_string())
}

fn form_value(name: &str, value: &str) -> String {
    if !DATE_FIELDS.contains(&name) {
        return value.to_string();
    }
    NaiveDate::parse_from_str(value.trim(), FORM_DATE_FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(value.trim(), STORED_DATE_FORMAT))
        .map(|date| date.format(STORED_DATE_FORMAT).to_string())
        .unwrap_or_else(|_| value.to_string())
}
