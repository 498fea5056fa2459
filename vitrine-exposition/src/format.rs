use prometheus::proto::{Metric, MetricFamily, MetricType};
use prometheus::{Encoder, ProtobufEncoder, TextEncoder};
use std::fmt::Write as _;
use std::io::Write;

/// Wire formats the endpoint can serve.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ExpositionFormat {
    /// `text/plain; version=0.0.4`
    #[default]
    Text,
    /// Length-delimited `io.prometheus.client.MetricFamily` messages.
    ProtobufDelimited,
}

impl ExpositionFormat {
    /// Value for the `Content-Type` response header.
    pub fn content_type(&self) -> &'static str {
        match self {
            ExpositionFormat::Text => prometheus::TEXT_FORMAT,
            ExpositionFormat::ProtobufDelimited => prometheus::PROTOBUF_FORMAT,
        }
    }

    /// Encode a single family. Families without a name or without metrics are
    /// rejected before anything is written.
    pub fn encode<W: Write>(&self, writer: &mut W, family: &MetricFamily) -> prometheus::Result<()> {
        match self {
            // TextEncoder has no untyped rendering.
            ExpositionFormat::Text if family.get_field_type() == MetricType::UNTYPED => {
                encode_untyped_text(writer, family)
            }
            ExpositionFormat::Text => {
                TextEncoder::new().encode(std::slice::from_ref(family), writer)
            }
            ExpositionFormat::ProtobufDelimited => {
                ProtobufEncoder::new().encode(std::slice::from_ref(family), writer)
            }
        }
    }
}

/// Text rendering of an untyped family: `# HELP`, `# TYPE <name> untyped`,
/// then one sample per metric. Built in full before it reaches `writer`.
fn encode_untyped_text<W: Write>(writer: &mut W, family: &MetricFamily) -> prometheus::Result<()> {
    let name = family.get_name();
    if name.is_empty() {
        return Err(prometheus::Error::Msg("MetricFamily has no name".to_owned()));
    }
    if family.get_metric().is_empty() {
        return Err(prometheus::Error::Msg(format!(
            "MetricFamily {name} has no metrics"
        )));
    }

    let mut text = String::new();
    let help = family.get_help();
    if !help.is_empty() {
        let _ = writeln!(text, "# HELP {name} {}", escape_help(help));
    }
    let _ = writeln!(text, "# TYPE {name} untyped");
    for metric in family.get_metric() {
        write_untyped_sample(&mut text, name, metric);
    }

    writer.write_all(text.as_bytes())?;
    Ok(())
}

fn write_untyped_sample(text: &mut String, name: &str, metric: &Metric) {
    text.push_str(name);
    let labels = metric.get_label();
    if !labels.is_empty() {
        text.push('{');
        for (i, pair) in labels.iter().enumerate() {
            if i > 0 {
                text.push(',');
            }
            let _ = write!(text, "{}=\"{}\"", pair.get_name(), escape_label_value(pair.get_value()));
        }
        text.push('}');
    }
    text.push(' ');
    text.push_str(&format_sample_value(metric.get_untyped().get_value()));
    let timestamp = metric.get_timestamp_ms();
    if timestamp != 0 {
        let _ = write!(text, " {timestamp}");
    }
    text.push('\n');
}

fn format_sample_value(value: f64) -> String {
    if value == f64::INFINITY {
        "+Inf".to_owned()
    } else if value == f64::NEG_INFINITY {
        "-Inf".to_owned()
    } else if value.is_nan() {
        "NaN".to_owned()
    } else {
        value.to_string()
    }
}

fn escape_help(help: &str) -> String {
    help.replace('\\', "\\\\").replace('\n', "\\n")
}

fn escape_label_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}
