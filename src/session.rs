//! Demo session
//!
//! Drives one demo end to end: begin a new token (clearing the previous
//! demo), probe the tables, build and run the SQL, shape the rows, and apply
//! the result only if no newer demo has started meanwhile. The state lock is
//! never held while a query is running.

use crate::catalog::{self, Demo, MapSource, TableResolution};
use crate::config::AppConfig;
use crate::engine::{QueryEngine, Row};
use crate::errors::SessionResult;
use crate::executor::{self, QueryExecutor};
use crate::map::MapRenderer;
use crate::output::{PaneContent, ResultPanes, CUSTOM_PANE};
use crate::registry::{DemoToken, LayerRegistry};
use crate::toggle::{Dataset, ToggleManager, ToggleOutcome};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

struct SessionState<M: MapRenderer> {
    registry: LayerRegistry<M>,
    toggles: ToggleManager,
    panes: ResultPanes,
}

/// Outcome of one demo invocation
#[derive(Debug, Clone, PartialEq)]
pub struct DemoReport {
    pub demo: Demo,
    pub token: DemoToken,
    /// False when a newer demo started before this one finished
    pub applied: bool,
    pub content: PaneContent,
}

pub struct DemoSession<E: QueryEngine + ?Sized, M: MapRenderer> {
    executor: QueryExecutor<E>,
    config: AppConfig,
    state: Mutex<SessionState<M>>,
}

impl<E: QueryEngine + ?Sized, M: MapRenderer> DemoSession<E, M> {
    pub fn new(engine: Arc<E>, map: M, config: AppConfig) -> Self {
        Self {
            executor: QueryExecutor::new(engine),
            config,
            state: Mutex::new(SessionState {
                registry: LayerRegistry::new(map),
                toggles: ToggleManager::new(),
                panes: ResultPanes::new(),
            }),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn executor(&self) -> &QueryExecutor<E> {
        &self.executor
    }

    /// Probe the engine for enriched tables. A failed probe falls back to
    /// the seeded tables.
    async fn probe(&self) -> TableResolution {
        match self.config.tables.probe(self.executor.engine().as_ref()).await {
            Ok(tables) => tables,
            Err(e) => {
                warn!("Table probe failed, using fallback tables: {}", e);
                TableResolution::new(self.config.tables.clone(), HashSet::new())
            }
        }
    }

    async fn map_rows(&self, demo: Demo, sql: &str) -> Vec<Row> {
        match self.executor.run(sql).await {
            Ok(result) => result.rows,
            Err(e) => {
                warn!("Map query of {} failed: {}", demo, e);
                Vec::new()
            }
        }
    }

    pub async fn run_demo(&self, demo: Demo) -> SessionResult<DemoReport> {
        let pane = demo.pane();
        let token = {
            let mut state = self.state.lock().await;
            let token = state.registry.begin_demo()?;
            state.panes.reset(&pane);
            token
        };
        info!("Running demo {} ({})", demo, demo.title());

        let tables = self.probe().await;
        let query = catalog::build(demo, &self.config.demos, &tables);

        let display = self.executor.run(&query.display_sql).await;
        let content = match &display {
            Ok(result) => executor::render(result),
            Err(e) => PaneContent::Error(e.to_string()),
        };
        let rows = match (&query.map, display) {
            (MapSource::None, _) | (MapSource::Display, Err(_)) => Vec::new(),
            (MapSource::Display, Ok(result)) => result.rows,
            (MapSource::Query(sql), _) => self.map_rows(demo, sql).await,
        };
        let visual = catalog::shape(demo, &self.config.demos, &rows);

        let mut state = self.state.lock().await;
        if !state.registry.is_current(token) {
            debug!("Demo {} superseded, discarding its results", demo);
            return Ok(DemoReport {
                demo,
                token,
                applied: false,
                content,
            });
        }
        state.panes.show_sql(&pane, &query.display_sql);
        state.panes.set_content(&pane, content.clone());
        let applied = state.registry.apply(token, visual)?;

        Ok(DemoReport {
            demo,
            token,
            applied,
            content,
        })
    }

    /// Run a demo by its id, e.g. `hex-grid`
    pub async fn run_named(&self, name: &str) -> SessionResult<DemoReport> {
        let demo = Demo::parse(name)?;
        self.run_demo(demo).await
    }

    /// Every demo in catalog order
    pub async fn run_all(&self) -> SessionResult<Vec<DemoReport>> {
        let mut reports = Vec::new();
        for demo in Demo::all() {
            reports.push(self.run_demo(demo).await?);
        }
        Ok(reports)
    }

    /// Free-form SQL into the `custom` pane
    pub async fn run_custom(&self, sql: &str) -> PaneContent {
        let content = self.executor.execute_and_show(sql).await;
        let mut state = self.state.lock().await;
        state.panes.show_sql(CUSTOM_PANE, sql);
        state.panes.set_content(CUSTOM_PANE, content.clone());
        content
    }

    /// Flip a dataset overlay. Unknown names fail loudly.
    pub async fn toggle(&self, name: &str) -> SessionResult<ToggleOutcome> {
        let dataset = Dataset::parse(name)?;
        {
            let mut guard = self.state.lock().await;
            let state = &mut *guard;
            if state.toggles.is_loaded(dataset) {
                return Ok(state.toggles.unload(dataset, &mut state.registry)?);
            }
        }

        let tables = self.probe().await;
        let sql = ToggleManager::lookup_sql(dataset, &tables)?;
        let rows = match self.executor.run(&sql).await {
            Ok(result) => result.rows,
            Err(e) => {
                warn!("Could not load {}: {}", dataset, e);
                return Ok(ToggleOutcome::Failed {
                    dataset,
                    message: e.to_string(),
                });
            }
        };

        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        Ok(state.toggles.load(dataset, &rows, &mut state.registry)?)
    }

    /// Unload every dataset overlay
    pub async fn clear_overlays(&self) -> SessionResult<Vec<Dataset>> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        Ok(state.toggles.clear_all(&mut state.registry)?)
    }

    /// Remove the current demo's layers and markers
    pub async fn clear_demo_layers(&self) -> SessionResult<()> {
        self.state.lock().await.registry.clear_demo_layers()?;
        Ok(())
    }

    pub async fn panes(&self) -> ResultPanes {
        self.state.lock().await.panes.clone()
    }

    pub async fn loaded_datasets(&self) -> Vec<Dataset> {
        self.state.lock().await.toggles.loaded()
    }

    pub async fn current_token(&self) -> DemoToken {
        self.state.lock().await.registry.current_token()
    }

    /// Inspect the map under the state lock
    pub async fn with_map<R>(&self, f: impl FnOnce(&M) -> R) -> R {
        let state = self.state.lock().await;
        f(state.registry.map())
    }
}
