use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;

use crate::adapters::{ChzzkApiAdapter, FfmpegExecAdapter, FsLocalAdapter, LogSession, TracingLogAdapter};
use crate::app::clip_interactor::{ClipInteractor, ClipSettings};
use crate::config_initialization::AppConfig;
use crate::ports::{ExecutePort, FsPort, LogPort, ResolvePort};

pub trait AppContainer: Send + Sync {
    fn clip_interactor(&self) -> Arc<ClipInteractor>;
}

pub struct DefaultAppContainer {
    clip_interactor: Arc<ClipInteractor>,
}

impl DefaultAppContainer {
    /// Wire the production adapters; request records go to `session` when given
    pub fn new(config: &AppConfig, session: Option<&LogSession>, time_limit: Option<Duration>) -> Result<Self> {
        let resolve_port = Arc::new(
            ChzzkApiAdapter::new(config.http.clone()).context("Failed to build HTTP client")?,
        );
        let execute_port = Arc::new(FfmpegExecAdapter::new(config.engine.clone()));
        let fs_port = Arc::new(FsLocalAdapter::new());
        let log_port = Arc::new(match session {
            Some(session) => TracingLogAdapter::new(session),
            None => TracingLogAdapter::detached(),
        });

        let settings = ClipSettings {
            cut_mode: config.engine.cut_mode,
            coarse_margin_secs: config.engine.coarse_margin_secs,
            time_limit,
        };

        let clip_interactor = Arc::new(ClipInteractor::new(
            resolve_port as Arc<dyn ResolvePort>,
            execute_port as Arc<dyn ExecutePort>,
            fs_port as Arc<dyn FsPort>,
            log_port as Arc<dyn LogPort>,
            settings,
        ));

        Ok(Self { clip_interactor })
    }
}

impl AppContainer for DefaultAppContainer {
    fn clip_interactor(&self) -> Arc<ClipInteractor> {
        Arc::clone(&self.clip_interactor)
    }
}
