//! Prometheus text exposition format.
//!
//! Renders metric families into the Prometheus text format (0.0.4) for
//! scraping by a Prometheus server or compatible agent.

use crate::family::MetricFamily;

/// Content type of [`render_prometheus`] output.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Render metric families into Prometheus text format.
///
/// Families sharing a name (one per deployment) are merged under a single
/// `# HELP`/`# TYPE` header, positioned where the name first appears.
pub fn render_prometheus(families: &[MetricFamily]) -> String {
    let mut order: Vec<&MetricFamily> = Vec::new();
    for family in families {
        if !order.iter().any(|f| f.name == family.name) {
            order.push(family);
        }
    }

    let mut out = String::new();
    for head in order {
        out.push_str(&format!("# HELP {} {}\n", head.name, escape_help(&head.help)));
        out.push_str(&format!("# TYPE {} gauge\n", head.name));
        for family in families.iter().filter(|f| f.name == head.name) {
            for sample in &family.samples {
                out.push_str(&head.name);
                if !family.labels.is_empty() {
                    let pairs: Vec<String> = family
                        .labels
                        .iter()
                        .zip(&sample.labels)
                        .map(|(name, value)| format!("{name}=\"{}\"", escape_label(value)))
                        .collect();
                    out.push_str(&format!("{{{}}}", pairs.join(",")));
                }
                out.push_str(&format!(" {}\n", format_value(sample.value)));
            }
        }
    }
    out
}

fn escape_label(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out
}

fn escape_help(help: &str) -> String {
    help.replace('\\', "\\\\").replace('\n', "\\n")
}

fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value > 0.0 { "+Inf" } else { "-Inf" }.to_string()
    } else if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}
