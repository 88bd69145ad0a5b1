//! Shared handler state

use std::future::Future;
use std::sync::Arc;

use crate::data_service::{DataResult, DataService};
use crate::observability::{Logger, MetricsRegistry};

/// State shared by every route
#[derive(Clone)]
pub struct AppState {
    pub data: Arc<dyn DataService>,
    pub metrics: Arc<MetricsRegistry>,
    pub max_append_attempts: u32,
    pub version_column: String,
}

impl AppState {
    pub fn new(data: Arc<dyn DataService>) -> Self {
        Self {
            data,
            metrics: Arc::new(MetricsRegistry::new()),
            max_append_attempts: 3,
            version_column: "updated_at".to_string(),
        }
    }

    pub fn with_max_append_attempts(mut self, attempts: u32) -> Self {
        self.max_append_attempts = attempts.max(1);
        self
    }

    pub fn with_version_column(mut self, column: impl Into<String>) -> Self {
        self.version_column = column.into();
        self
    }

    /// Await a data service call, counting it and logging failures
    pub async fn call<T, F>(&self, operation: &str, call: F) -> DataResult<T>
    where
        F: Future<Output = DataResult<T>>,
    {
        self.metrics.increment_data_service_calls();
        let result = call.await;
        if let Err(err) = &result {
            self.metrics.increment_data_service_errors();
            Logger::error(
                "DATA_SERVICE_ERROR",
                &[("operation", operation), ("error", err.to_string().as_str())],
            );
        }
        result
    }
}
