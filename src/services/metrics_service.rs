use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use statsd::Client;

pub type Tags = HashMap<String, String>;

/// Build a tag map from string pairs.
pub fn tags(pairs: &[(&str, &str)]) -> Tags {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[derive(Clone)]
pub struct MetricsService {
    client: Arc<Client>,
}

impl MetricsService {
    pub fn new(host: &str, port: u16, prefix: &str) -> anyhow::Result<Self> {
        let client = Client::new(format!("{}:{}", host, port), prefix)
            .map_err(|e| anyhow::anyhow!("Failed to create statsd client: {:?}", e))?;
        Ok(Self {
            client: Arc::new(client),
        })
    }

    pub fn increment(&self, metric: &str, tags: Option<Tags>) {
        self.client.incr(&tagged_name(metric, tags));
    }

    pub fn gauge(&self, metric: &str, value: f64, tags: Option<Tags>) {
        self.client.gauge(&tagged_name(metric, tags), value);
    }

    pub fn timing(&self, metric: &str, duration: Duration, tags: Option<Tags>) {
        self.client
            .timer(&tagged_name(metric, tags), duration.as_millis() as f64);
    }
}

/// `metric#k1=v1,k2=v2`, keys sorted so the same tags always yield one series.
fn tagged_name(metric: &str, tags: Option<Tags>) -> String {
    match tags {
        Some(tags) if !tags.is_empty() => {
            let mut pairs: Vec<String> = tags.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
            pairs.sort();
            format!("{}#{}", metric, pairs.join(","))
        }
        _ => metric.to_string(),
    }
}
