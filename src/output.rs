//! Rendering of the pod list for standard output

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use comfy_table::{Table, presets::NOTHING};
use k8s_openapi::api::core::v1::Pod;
use kube::api::ObjectList;

use kct_k8s::pod_info;
use kct_types::{OutputFormat, PodInfo};

const HEADERS: [&str; 5] = ["NAME", "READY", "STATUS", "RESTARTS", "AGE"];
const WIDE_HEADERS: [&str; 2] = ["IP", "NODE"];

/// Spaces between table columns
const COLUMN_GAP: u16 = 3;

/// Render the list as returned by the API server
///
/// `json` and `yaml` print the list unmodified; `table` and `wide` print one
/// summary row per pod.
pub fn render(
    pods: &ObjectList<Pod>,
    format: OutputFormat,
    namespace: &str,
    now: DateTime<Utc>,
) -> Result<String> {
    match format {
        OutputFormat::Json => {
            let mut json = serde_json::to_string_pretty(pods).context("Failed to encode pods")?;
            json.push('\n');
            Ok(json)
        }
        OutputFormat::Yaml => serde_yaml::to_string(pods).context("Failed to encode pods"),
        OutputFormat::Table | OutputFormat::Wide => {
            let rows: Vec<PodInfo> = pods.items.iter().map(pod_info).collect();
            let wide = format == OutputFormat::Wide;
            Ok(render_table(&rows, wide, namespace, now))
        }
    }
}

fn render_table(pods: &[PodInfo], wide: bool, namespace: &str, now: DateTime<Utc>) -> String {
    if pods.is_empty() {
        return format!("No resources found in {} namespace.\n", namespace);
    }

    let mut table = Table::new();
    table.load_preset(NOTHING);

    let mut header: Vec<&str> = HEADERS.to_vec();
    if wide {
        header.extend(WIDE_HEADERS);
    }
    table.set_header(header);

    for pod in pods {
        let mut row = vec![
            pod.name.clone(),
            pod.ready_status(),
            pod.status.to_string(),
            pod.restarts().to_string(),
            pod.created
                .map(|created| format_age(now - created))
                .unwrap_or_else(|| "<unknown>".to_string()),
        ];
        if wide {
            row.push(pod.pod_ip.clone().unwrap_or_else(|| "<none>".to_string()));
            row.push(pod.node_name.clone().unwrap_or_else(|| "<none>".to_string()));
        }
        table.add_row(row);
    }

    for column in table.column_iter_mut() {
        column.set_padding((0, COLUMN_GAP));
    }

    // The last column keeps its padding; strip it along with blank separator lines
    let mut out = String::new();
    for line in table.lines() {
        let line = line.trim_end();
        if !line.is_empty() {
            out.push_str(line);
            out.push('\n');
        }
    }
    out
}

/// Format an age the way kubectl's short form does: 42s, 7m, 3h, 12d
fn format_age(age: chrono::Duration) -> String {
    let secs = age.num_seconds().max(0);
    match secs {
        s if s < 60 => format!("{}s", s),
        s if s < 3600 => format!("{}m", s / 60),
        s if s < 86_400 => format!("{}h", s / 3600),
        s => format!("{}d", s / 86_400),
    }
}
