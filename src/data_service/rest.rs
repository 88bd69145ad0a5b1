//! PostgREST client for the hosted database
//!
//! - RPC: `POST {url}/rest/v1/rpc/{function}`
//! - Read: `GET {url}/rest/v1/{table}?select=*&{column}=eq.{value}`
//! - Update: `PATCH {url}/rest/v1/{table}?{filters}`

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::Value;

use crate::config::DataServiceConfig;
use crate::models::Record;

use super::errors::{DataResult, DataServiceError};
use super::{DataFuture, DataService, Filter, Table, ADD_PRESCRIPTION_FN, LIST_PRESCRIPTION_IDS_FN};

/// Error descriptor returned by PostgREST
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    details: Option<String>,
}

/// Data service backed by a PostgREST endpoint
pub struct RestDataService {
    client: Client,
    base_url: String,
}

impl RestDataService {
    pub fn new(base_url: &str, api_key: &str) -> DataResult<Self> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(api_key)
            .map_err(|e| DataServiceError::Config(format!("invalid api key: {}", e)))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", api_key))
            .map_err(|e| DataServiceError::Config(format!("invalid api key: {}", e)))?;
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| DataServiceError::Config(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &DataServiceConfig) -> DataResult<Self> {
        Self::new(&config.url, &config.api_key)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, self.endpoint(path))
    }

    async fn rpc(&self, function: &str, args: &Record) -> DataResult<Value> {
        let builder = self
            .request(Method::POST, &format!("rpc/{}", function))
            .json(args);
        send(builder).await
    }
}

/// Send a request and decode the JSON answer. An empty body decodes to `null`.
async fn send(builder: RequestBuilder) -> DataResult<Value> {
    let response = builder
        .send()
        .await
        .map_err(|e| DataServiceError::Transport(e.to_string()))?;

    let status = response.status();
    let bytes = response
        .bytes()
        .await
        .map_err(|e| DataServiceError::Transport(e.to_string()))?;

    if !status.is_success() {
        return Err(error_from_body(status, &bytes));
    }

    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }

    serde_json::from_slice(&bytes).map_err(|e| DataServiceError::Decode(e.to_string()))
}

fn error_from_body(status: StatusCode, bytes: &[u8]) -> DataServiceError {
    let body: ErrorBody = serde_json::from_slice(bytes).unwrap_or_default();
    let message = body
        .message
        .or(body.details)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
    DataServiceError::api(status.as_u16(), body.code, message)
}

fn into_rows(table: Table, value: Value) -> DataResult<Vec<Record>> {
    let rows = match value {
        Value::Array(rows) => rows,
        Value::Null => Vec::new(),
        other => {
            return Err(DataServiceError::Decode(format!(
                "expected rows from '{}', got {}",
                table, other
            )))
        }
    };

    rows.into_iter()
        .map(|row| match row {
            Value::Object(record) => Ok(record),
            other => Err(DataServiceError::Decode(format!(
                "expected an object row from '{}', got {}",
                table, other
            ))),
        })
        .collect()
}

impl DataService for RestDataService {
    fn list_prescription_ids<'a>(&'a self, patient_id: &'a str) -> DataFuture<'a, Vec<Value>> {
        Box::pin(async move {
            let mut args = Record::new();
            args.insert("p_id".to_string(), Value::String(patient_id.to_string()));

            Ok(match self.rpc(LIST_PRESCRIPTION_IDS_FN, &args).await? {
                Value::Array(ids) => ids,
                Value::Null => Vec::new(),
                single => vec![single],
            })
        })
    }

    fn read_one<'a>(&'a self, table: Table, filter: &'a Filter) -> DataFuture<'a, Option<Record>> {
        Box::pin(async move {
            let (column, condition) = filter.to_query_pair();
            let builder = self.request(Method::GET, table.as_str()).query(&[
                ("select", "*"),
                (column.as_str(), condition.as_str()),
                ("limit", "2"),
            ]);

            let mut rows = into_rows(table, send(builder).await?)?;
            match rows.len() {
                0 => Ok(None),
                1 => Ok(rows.pop()),
                n => Err(DataServiceError::api(
                    StatusCode::NOT_ACCEPTABLE.as_u16(),
                    Some("PGRST116".to_string()),
                    format!("expected a single row from '{}', found {}", table, n),
                )),
            }
        })
    }

    fn update_where<'a>(
        &'a self,
        table: Table,
        filters: &'a [Filter],
        fields: &'a Record,
    ) -> DataFuture<'a, u64> {
        Box::pin(async move {
            let query: Vec<(String, String)> = filters.iter().map(Filter::to_query_pair).collect();
            let builder = self
                .request(Method::PATCH, table.as_str())
                .header("Prefer", "return=representation")
                .query(&query)
                .json(fields);

            let rows = into_rows(table, send(builder).await?)?;
            Ok(rows.len() as u64)
        })
    }

    fn add_prescription<'a>(&'a self, params: &'a Record) -> DataFuture<'a, Value> {
        Box::pin(async move { self.rpc(ADD_PRESCRIPTION_FN, params).await })
    }
}
