pub mod courses;
pub mod init;
pub mod prompt;
pub mod records;
pub mod run;
pub mod validate;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use labreview_core::catalog::Catalog;
use labreview_core::model::Course;
use labreview_core::traits::ReviewStore;
use labreview_store::{create_store, load_config_from, LabreviewConfig};

/// Configuration, catalog and store shared by most commands.
pub struct Workspace {
    pub config: LabreviewConfig,
    pub catalog: Catalog,
    pub store: Arc<dyn ReviewStore>,
}

impl Workspace {
    pub fn load(config_path: Option<PathBuf>) -> Result<Self> {
        let config = load_config_from(config_path.as_deref())?;
        let catalog = config.load_catalog()?;
        let store = create_store(&config.store);
        tracing::debug!("using {} store", store.name());
        Ok(Self {
            config,
            catalog,
            store,
        })
    }

    pub fn course(&self, id: &str) -> Result<&Course> {
        self.catalog.course(id).ok_or_else(|| {
            anyhow::anyhow!("unknown course '{id}'. Run `labreview courses` to list courses.")
        })
    }
}
