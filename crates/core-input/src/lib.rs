//! Command input: line grammar plus the reader that feeds the event loop.

mod parse;
pub use parse::{HELP_TEXT, ParseError, parse_command};

use core_events::{
    AsyncEventSource, CHANNEL_SEND_FAILURES, COMMANDS_REJECTED, COMMANDS_TOTAL, Event, InputEvent,
};
use std::io::BufRead;
use std::sync::atomic::Ordering;
use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ExitReason {
    ChannelClosed,
    StreamEnded,
    StreamError,
}

impl ExitReason {
    fn as_str(&self) -> &'static str {
        match self {
            ExitReason::ChannelClosed => "channel_closed",
            ExitReason::StreamEnded => "stream_ended",
            ExitReason::StreamError => "stream_error",
        }
    }
}

#[inline]
fn log_rejected_line(line: &str, err: &ParseError) {
    // Length and error kind only; the line may contain document text or a question.
    debug!(
        target: "input.parse",
        line_len = line.len(),
        error_kind = err.kind(),
        "line_rejected"
    );
}

/// Reads newline-terminated commands from a blocking reader (stdin in the
/// binary) on the blocking pool and forwards them with `blocking_send`.
///
/// The read cannot be cancelled; at shutdown the runtime is torn down with a
/// timeout instead of joining this task.
pub struct LineCommandSource<R> {
    reader: R,
}

impl LineCommandSource<std::io::BufReader<std::io::Stdin>> {
    pub fn stdin() -> Self {
        Self::new(std::io::BufReader::new(std::io::stdin()))
    }
}

impl<R> LineCommandSource<R>
where
    R: BufRead + Send + 'static,
{
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R> AsyncEventSource for LineCommandSource<R>
where
    R: BufRead + Send + 'static,
{
    fn name(&self) -> &'static str {
        "line_commands"
    }

    fn spawn(self: Box<Self>, tx: Sender<Event>) -> JoinHandle<()> {
        let reader = self.reader;
        tokio::task::spawn_blocking(move || {
            let span = tracing::debug_span!(target: "input.thread", "line_reader");
            let _enter = span.enter();
            info!(target: "input.thread", "line_reader_started");
            let reason = read_lines(reader, &tx);
            info!(target: "input.thread", reason = reason.as_str(), "line_reader_stopped");
        })
    }
}

fn read_lines<R: BufRead>(mut reader: R, tx: &Sender<Event>) -> ExitReason {
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line) {
            Ok(0) => {
                let _ = send(tx, Event::Input(InputEvent::Closed));
                return ExitReason::StreamEnded;
            }
            Ok(_) => {
                let event = match parse_command(&line) {
                    Ok(None) => continue,
                    Ok(Some(cmd)) => {
                        COMMANDS_TOTAL.fetch_add(1, Ordering::Relaxed);
                        trace!(target: "input.parse", command = cmd.name(), "command_parsed");
                        InputEvent::Command(cmd)
                    }
                    Err(err) => {
                        COMMANDS_REJECTED.fetch_add(1, Ordering::Relaxed);
                        log_rejected_line(&line, &err);
                        InputEvent::Rejected {
                            message: err.to_string(),
                        }
                    }
                };
                if !send(tx, Event::Input(event)) {
                    return ExitReason::ChannelClosed;
                }
            }
            Err(e) => {
                warn!(target: "input.thread", error_kind = ?e.kind(), "line_reader_error");
                let _ = send(tx, Event::Input(InputEvent::Closed));
                return ExitReason::StreamError;
            }
        }
    }
}

fn send(tx: &Sender<Event>, event: Event) -> bool {
    if tx.blocking_send(event).is_err() {
        CHANNEL_SEND_FAILURES.fetch_add(1, Ordering::Relaxed);
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;
    use std::sync::{Arc, Mutex};
    use tracing::Subscriber;
    use tracing::dispatcher::Dispatch;
    use tracing::field::{Field, Visit};
    use tracing_subscriber::layer::Context;
    use tracing_subscriber::layer::Layer;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::registry::Registry;

    #[derive(Clone, Default)]
    struct Capture {
        events: Arc<Mutex<Vec<CapturedEvent>>>,
    }

    #[derive(Clone, Debug)]
    struct CapturedEvent {
        target: String,
        fields: Vec<(String, String)>,
    }

    #[derive(Default)]
    struct FieldCollector {
        fields: Vec<(String, String)>,
    }

    impl Visit for FieldCollector {
        fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
            self.fields
                .push((field.name().to_string(), format!("{:?}", value)));
        }
    }

    impl<S> Layer<S> for Capture
    where
        S: Subscriber,
    {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            let mut collector = FieldCollector::default();
            event.record(&mut collector);
            let meta = event.metadata();
            self.events.lock().unwrap().push(CapturedEvent {
                target: meta.target().to_string(),
                fields: collector.fields,
            });
        }
    }

    #[test]
    fn rejected_line_log_redacts_content() {
        let capture = Capture::default();
        let events = capture.events.clone();
        let subscriber = Registry::default().with(capture);
        let dispatch = Dispatch::new(subscriber);

        let lines = [
            "frobnicate my secret document",
            "pos 1 secret",
            "delete 1 2 secret",
            "pos secret",
            "bias secret",
        ];
        tracing::dispatcher::with_default(&dispatch, || {
            for line in lines {
                let err = parse_command(line).unwrap_err();
                super::log_rejected_line(line, &err);
            }
        });

        let events = events.lock().unwrap();
        let rejected: Vec<_> = events
            .iter()
            .filter(|e| e.target == "input.parse")
            .collect();
        assert_eq!(rejected.len(), lines.len());
        for event in rejected {
            assert!(
                event.fields.iter().any(|(name, _)| name == "line_len"),
                "line_len field missing from event"
            );
            assert!(
                event.fields.iter().any(|(name, _)| name == "error_kind"),
                "error_kind field missing from event"
            );
            for (_, value) in &event.fields {
                assert!(
                    !value.contains("secret"),
                    "event leaked raw line content: {value}"
                );
            }
        }
        assert!(events.iter().any(|e| e
            .fields
            .iter()
            .any(|(name, value)| name == "error_kind" && value.contains("trailing"))));
    }
}
