//! Sequential batch orchestration
//!
//! Runs the executor once per parameter set, strictly in input order,
//! with one request in flight at a time. Per-item parameters are merged
//! as `alias-defaults < item < CLI-overrides`. In normal mode every item
//! is attempted and failures are reported inline; in fail-fast mode the
//! loop stops right after the first failing item. Fail-fast is evaluated
//! only *between* items: the in-flight request always runs to
//! completion.

use serde_json::{Map, Value};

use crate::config::{EndpointDescriptor, ParamHints, ServiceConfig};
use crate::executor::{ApiResult, RequestExecutor};
use crate::params::merge_layers;
use crate::Error;

#[derive(Debug, Clone, Copy, Default)]
pub struct BatchOptions {
    /// Halt after the first failing item. The result list then contains
    /// exactly the attempted items (failing one included) and no
    /// placeholder entries for the remainder.
    pub fail_fast: bool,
}

/// Index-correlated outcome of a batch run: `results[i]` corresponds to
/// `items[i]` for every item actually attempted.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub results: Vec<ApiResult>,
    /// False if any attempted item failed.
    pub success: bool,
}

impl BatchReport {
    pub fn attempted(&self) -> usize {
        self.results.len()
    }

    pub fn failure_count(&self) -> usize {
        self.results.iter().filter(|r| !r.success).count()
    }
}

pub struct BatchOrchestrator<'a> {
    executor: &'a RequestExecutor,
}

impl<'a> BatchOrchestrator<'a> {
    pub fn new(executor: &'a RequestExecutor) -> Self {
        Self { executor }
    }

    /// Run the endpoint once per item, sequentially and in input order.
    /// Items that are not JSON objects fail with `param_invalid` without
    /// reaching the executor; under fail-fast that still halts the run.
    pub async fn execute_batch(
        &self,
        service: &ServiceConfig,
        endpoint: &EndpointDescriptor,
        alias_defaults: &Map<String, Value>,
        items: &[Value],
        cli_overrides: &Map<String, Value>,
        hints: &ParamHints,
        options: BatchOptions,
    ) -> BatchReport {
        let mut results = Vec::with_capacity(items.len());
        let mut success = true;

        for (index, item) in items.iter().enumerate() {
            let mut result = match item.as_object() {
                Some(item_params) => {
                    let raw = merge_layers(&[alias_defaults, item_params, cli_overrides]);
                    self.executor.execute(service, endpoint, &raw, hints).await
                }
                None => ApiResult::failure(&Error::ParamInvalid(format!(
                    "batch item {index} is not an object"
                ))),
            };
            result.metadata.index = Some(index);

            let failed = !result.success;
            results.push(result);
            if failed {
                success = false;
                if options.fail_fast {
                    break;
                }
            }
        }

        BatchReport { results, success }
    }
}
