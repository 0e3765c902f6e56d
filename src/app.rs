use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::catalog;
use crate::config;
use crate::data::{CatalogService, MockCatalogService, PokeApiCatalogService};
use crate::loader::Loader;
use crate::logging;
use crate::theme::Theme;
use crate::ui;

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub config_file: Option<PathBuf>,
    pub demo: bool,
}

pub fn run(options: RunOptions) -> Result<()> {
    let cfg = config::load(config::LoadOptions {
        config_file: options.config_file.clone(),
        env_prefix: None,
    })
    .context("load config")?;

    if let Err(err) = logging::init(&cfg.logging) {
        eprintln!("warning: logging disabled: {err:#}");
    }

    let (service, status): (Arc<dyn CatalogService>, String) = if options.demo {
        tracing::info!("using the built-in demo catalog");
        (
            Arc::new(MockCatalogService::default()),
            "Demo catalog loaded. Press m for types, / to search, q to quit.".to_string(),
        )
    } else {
        let user_agent = if !cfg.api.user_agent.trim().is_empty() {
            cfg.api.user_agent.clone()
        } else {
            format!("dex-tui/{}", crate::VERSION)
        };
        let client = catalog::Client::new(catalog::ClientConfig {
            user_agent,
            base_url: cfg.api.base_url.clone(),
            timeout: Some(cfg.api.timeout),
            http_client: None,
        })
        .context("initialize catalog client")?;
        tracing::info!(base_url = client.base_url(), "catalog client ready");
        (
            Arc::new(PokeApiCatalogService::new(Arc::new(client))),
            "Browsing the catalog. Press m for types, / to search, q to quit.".to_string(),
        )
    };

    let loader = Loader::new(service, cfg.catalog.loader_settings());
    let ui_options = ui::Options {
        loader,
        categories: cfg.catalog.categories.clone(),
        fetch_categories: cfg.catalog.fetch_categories && !options.demo,
        theme: Theme::from_name(&cfg.ui.theme),
        status_message: status,
    };

    let mut model = ui::Model::new(ui_options);
    model.run()?;
    tracing::info!("dex-tui exiting");

    Ok(())
}

pub fn friendly_config_path() -> String {
    let Some(path) = config::default_path() else {
        return "~/.config/dex-tui/config.yaml".to_string();
    };
    if let Some(home) = dirs::home_dir() {
        if let Ok(stripped) = path.strip_prefix(&home) {
            let mut display = String::from("~");
            if !stripped.as_os_str().is_empty() {
                display.push_str(&format!("/{}", stripped.display()));
            }
            return display;
        }
    }
    path.display().to_string()
}
