//! Parses the usage blob a worker submits alongside its result (spec §4.4).
//!
//! The blob is either a JSON array of per-second samples or a plain-text
//! key-value report. The JSON form is attempted first; a parse failure falls
//! back to line-wise regex extraction; total failure yields zeroes with the
//! raw bytes preserved so the audit sink can still archive them.

use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Default, serde::Serialize)]
pub struct UsageRecord {
    pub cpu_percent: f64,
    pub memory_mb: f64,
    pub execution_time_secs: u64,
    pub raw: Vec<u8>,
}

#[derive(Debug, Deserialize)]
struct Sample {
    cpu_percent: f64,
    #[serde(rename = "mem_usage_MB")]
    mem_usage_mb: f64,
}

pub fn parse_usage(blob: &[u8]) -> UsageRecord {
    if let Some(record) = parse_json_samples(blob) {
        return record;
    }
    parse_text_report(blob)
}

fn parse_json_samples(blob: &[u8]) -> Option<UsageRecord> {
    let samples: Vec<Sample> = serde_json::from_slice(blob).ok()?;

    if samples.is_empty() {
        return Some(UsageRecord {
            raw: blob.to_vec(),
            ..Default::default()
        });
    }

    let n = samples.len() as f64;
    let cpu_percent = samples.iter().map(|s| s.cpu_percent).sum::<f64>() / n;
    let memory_mb = samples.iter().map(|s| s.mem_usage_mb).sum::<f64>() / n;

    Some(UsageRecord {
        cpu_percent,
        memory_mb,
        execution_time_secs: samples.len() as u64,
        raw: blob.to_vec(),
    })
}

fn cpu_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)CPU Usage:\s*([\d.]+)\s*%").unwrap())
}

fn mem_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)Memory Usage:\s*([\d.]+)\s*MB").unwrap())
}

fn time_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)Execution Time:\s*([\d.]+)\s*seconds").unwrap())
}

fn parse_text_report(blob: &[u8]) -> UsageRecord {
    let text = String::from_utf8_lossy(blob);

    let cpu_percent = cpu_re()
        .captures(&text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0.0);
    let memory_mb = mem_re()
        .captures(&text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0.0);
    let execution_time_secs = time_re()
        .captures(&text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .map(|secs| secs as u64)
        .unwrap_or(0);

    UsageRecord {
        cpu_percent,
        memory_mb,
        execution_time_secs,
        raw: blob.to_vec(),
    }
}
