//! The pipeline orchestrator.
//!
//! This module provides the `Pipeline` struct and its builder. A run resets
//! the processed zone, walks the registry in order and isolates every
//! dataset-scoped failure so one bad source never aborts the pass.

use crate::catalog::DatasetCollection;
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::paths::{DataLayout, Zone};
use crate::pipeline::executor::DatasetExecutor;
use crate::pipeline::report::{DatasetOutcome, PipelineReport};
use crate::registry::SourceRegistry;
use crate::storage::{self, Manifest};
use chrono::Utc;
use std::time::Instant;
use tracing::{error, info};

/// The ingest pipeline.
///
/// # Example
///
/// ```rust,ignore
/// use geopulse_data::{Pipeline, PipelineConfig, SourceRegistry};
///
/// let report = Pipeline::builder()
///     .config(PipelineConfig::builder().data_root("data").build()?)
///     .registry(SourceRegistry::builtin())
///     .build()?
///     .run()?;
///
/// for outcome in report.failed() {
///     eprintln!("skipped {}", outcome.name);
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    registry: SourceRegistry,
    layout: DataLayout,
    executor: DatasetExecutor,
}

impl Pipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    pub fn layout(&self) -> &DataLayout {
        &self.layout
    }

    /// Rebuild the processed zone from the raw zone.
    ///
    /// # Errors
    ///
    /// Only zone-level failures (reset, manifest write) are returned.
    /// Per-dataset failures are logged and recorded in the report.
    pub fn run(&self) -> Result<PipelineReport> {
        self.run_collect().map(|(report, _)| report)
    }

    /// Like [`Pipeline::run`], also returning the tables that were persisted.
    pub fn run_collect(&self) -> Result<(PipelineReport, DatasetCollection)> {
        let start_time = Instant::now();
        let started_at = Utc::now();
        info!("===== Starting data pipeline =====");

        let processed_dir = self.layout.zone_dir(Zone::Processed);
        storage::reset_zone(&processed_dir)?;

        let mut manifest = Manifest::default();
        let mut collection = DatasetCollection::new();
        let mut outcomes = Vec::with_capacity(self.registry.len());

        for source in self.registry.iter() {
            match self.executor.process(source) {
                Ok(persisted) => {
                    outcomes.push(DatasetOutcome::succeeded(
                        &source.name,
                        source.provider,
                        persisted.path,
                        persisted.table.shape(),
                    ));
                    manifest
                        .datasets
                        .insert(source.name.clone(), persisted.entry);
                    collection.insert(source.name.clone(), persisted.table);
                }
                Err(e) if e.is_dataset_scoped() => {
                    error!(
                        "An error occurred while processing dataset '{}': {}. Skipping.",
                        source.name, e
                    );
                    outcomes.push(DatasetOutcome::failed(&source.name, source.provider, &e));
                }
                Err(e) => {
                    error!("Aborting pipeline on dataset '{}': {}", source.name, e);
                    return Err(e);
                }
            }
        }

        manifest.write(&processed_dir)?;

        let report = PipelineReport {
            started_at,
            duration_ms: start_time.elapsed().as_millis() as u64,
            outcomes,
        };

        info!(
            "===== Data pipeline finished: {} succeeded, {} failed =====",
            report.succeeded().count(),
            report.failed().count()
        );

        Ok((report, collection))
    }
}

/// Builder for [`Pipeline`].
#[derive(Debug, Default)]
pub struct PipelineBuilder {
    config: Option<PipelineConfig>,
    registry: Option<SourceRegistry>,
}

impl PipelineBuilder {
    /// Set the configuration. Defaults to [`PipelineConfig::from_env`].
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the registry. Defaults to [`SourceRegistry::builtin`].
    pub fn registry(mut self, registry: SourceRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn build(self) -> Result<Pipeline> {
        let config = self.config.unwrap_or_else(PipelineConfig::from_env);
        config.validate()?;

        let registry = self.registry.unwrap_or_default();
        let layout = DataLayout::new(&config.data_root);
        let executor = DatasetExecutor::new(layout.clone(), config.storage_format);

        Ok(Pipeline {
            config,
            registry,
            layout,
            executor,
        })
    }
}

/// Run the built-in registry with `config`.
pub fn run_pipeline(config: PipelineConfig) -> Result<PipelineReport> {
    Pipeline::builder().config(config).build()?.run()
}
