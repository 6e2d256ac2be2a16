//! HTTP exporter
//!
//! POSTs each record as a JSON body. Runs on the exporter's worker thread,
//! so a slow or unreachable endpoint only delays this exporter's queue.

use eyre::{Context, Result};
use indexmap::IndexMap;
use std::time::Duration;
use ureq::Agent;
use url::Url;

use super::Exporter;
use crate::config::ExporterArgs;
use crate::event::EventRecord;

const DEFAULT_TIMEOUT_MS: u64 = 5_000;

pub struct HttpExporter {
    agent: Agent,
    endpoint: Url,
    headers: IndexMap<String, String>,
}

impl HttpExporter {
    pub fn from_args(args: &ExporterArgs) -> Result<Self> {
        let url = args
            .url
            .as_deref()
            .ok_or_else(|| eyre::eyre!("HTTP exporter requires args.url"))?;
        let endpoint = parse_endpoint(url)?;
        let timeout = Duration::from_millis(args.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS));

        let agent_config = Agent::config_builder().timeout_global(Some(timeout)).build();

        Ok(Self {
            agent: Agent::new_with_config(agent_config),
            endpoint,
            headers: args.headers.clone(),
        })
    }
}

fn parse_endpoint(url: &str) -> Result<Url> {
    let endpoint = Url::parse(url).context(format!("Invalid exporter URL: {}", url))?;
    match endpoint.scheme() {
        "http" | "https" => Ok(endpoint),
        other => eyre::bail!("Unsupported URL scheme for HTTP exporter: {}", other),
    }
}

impl Exporter for HttpExporter {
    fn send(&mut self, record: &EventRecord) -> Result<()> {
        let body = record.to_json_line().context("Failed to serialize record")?;

        let mut request = self
            .agent
            .post(self.endpoint.as_str())
            .header("Content-Type", "application/json");
        for (name, value) in &self.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        request
            .send(body.as_bytes())
            .context(format!("HTTP request to {} failed", self.endpoint))?;
        Ok(())
    }
}
