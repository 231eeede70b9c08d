use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::config;
use crate::data::Services;
use crate::placeholder;
use crate::ui;

pub fn run() -> Result<()> {
    let cfg = config::load(config::LoadOptions::default()).context("load config")?;
    let _theme = &cfg.ui.theme;

    let user_agent = if cfg.api.user_agent.trim().is_empty() {
        format!("staffboard/{}", crate::VERSION)
    } else {
        cfg.api.user_agent.clone()
    };

    let (services, status_message) = match placeholder::Client::new(placeholder::ClientConfig {
        base_url: cfg.api.base_url.clone(),
        user_agent,
        timeout: Some(Duration::from_secs(cfg.api.timeout_secs.max(1))),
        http_client: None,
    }) {
        Ok(client) => (
            Services::placeholder(Arc::new(client)),
            "Pick an employee and press Enter to view their posts.".to_string(),
        ),
        Err(err) => (
            Services::mock(),
            format!("Showing offline sample data ({err})."),
        ),
    };

    let mut model = ui::Model::new(ui::Options {
        status_message,
        services,
    });
    model.run()
}
