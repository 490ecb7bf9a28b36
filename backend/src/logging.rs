//! Console output for the checkout backend.
//!
//! Every event becomes one `[timestamp] LEVEL target - message key=value`
//! line, so PIX ids and session ids recorded as fields stay greppable.

use std::fmt::Write as _;

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{layer::Context, EnvFilter, Layer, Registry};

const DEFAULT_FILTER: &str = "warn,checkout_backend=info,tower_http=info";
const QUIET_TARGETS: [&str; 2] = ["hyper", "reqwest"];

#[derive(Default)]
struct EventFields {
    message: String,
    fields: Vec<(&'static str, String)>,
}

impl Visit for EventFields {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else {
            self.fields.push((field.name(), format!("{:?}", value)));
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.push((field.name(), value.to_string()));
        }
    }
}

fn format_line(timestamp: &str, level: &Level, target: &str, event: &EventFields) -> String {
    let mut line = format!("[{}] {:<5} {} - {}", timestamp, level.as_str(), target, event.message);
    for (name, value) in &event.fields {
        let _ = write!(line, " {}={}", name, value);
    }
    line
}

struct ConsoleLayer;

impl<S: Subscriber> Layer<S> for ConsoleLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if QUIET_TARGETS.iter().any(|quiet| metadata.target().starts_with(quiet)) {
            return;
        }

        let mut fields = EventFields::default();
        event.record(&mut fields);
        if fields.message.is_empty() && fields.fields.is_empty() {
            return;
        }

        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f").to_string();
        let line = format_line(&timestamp, metadata.level(), metadata.target(), &fields);
        if *metadata.level() <= Level::WARN {
            eprintln!("{}", line);
        } else {
            println!("{}", line);
        }
    }
}

pub fn setup() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let subscriber = Registry::default()
        .with(env_filter)
        .with(ConsoleLayer);

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set subscriber");
}
