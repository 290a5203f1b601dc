//! Event loop: owns the session, applies commands and routes AI replies.

use anyhow::Result;
use core_events::{
    CHANNEL_SEND_FAILURES, COMMANDS_REJECTED, COMMANDS_TOTAL, Command, EXPLAIN_REQUESTS,
    EXPLAIN_STALE_REPLIES, Event, ExplanationKind, ExplanationReply, InputEvent,
};
use core_explain::Explainer;
use core_input::HELP_TEXT;
use core_render::{RenderOptions, render_view};
use core_session::Session;
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

pub(crate) struct RuntimeContext {
    pub session: Session,
    pub explainer: Arc<Explainer>,
    pub render: RenderOptions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoopControl {
    Continue,
    Break { reason: ShutdownReason },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ShutdownReason {
    CommandQuit,
    InputClosed,
    ShutdownEvent,
    ChannelClosed,
}

impl ShutdownReason {
    fn as_str(&self) -> &'static str {
        match self {
            ShutdownReason::CommandQuit => "command_quit",
            ShutdownReason::InputClosed => "input_closed",
            ShutdownReason::ShutdownEvent => "shutdown_event",
            ShutdownReason::ChannelClosed => "channel_closed",
        }
    }
}

fn log_shutdown_stage(reason: ShutdownReason, stage: &'static str) {
    info!(
        target: "runtime.shutdown",
        reason = reason.as_str(),
        stage = stage,
        "shutdown_stage"
    );
}

fn send_reply(tx: &mpsc::Sender<Event>, reply: ExplanationReply) {
    let ticket = reply.ticket;
    if tx.blocking_send(Event::Explanation(reply)).is_err() {
        CHANNEL_SEND_FAILURES.fetch_add(1, Ordering::Relaxed);
        debug!(target: "runtime.explain", ticket, "reply_after_shutdown");
    }
}

pub(crate) struct StepmapRuntime {
    session: Session,
    explainer: Arc<Explainer>,
    render: RenderOptions,
    out: Box<dyn Write + Send>,
    rx: mpsc::Receiver<Event>,
    tx: Option<mpsc::Sender<Event>>,
    source_handles: Vec<JoinHandle<()>>,
    next_ticket: u64,
    // Tickets whose replies are still wanted, one per kind.
    pending_mapping: Option<u64>,
    pending_question: Option<u64>,
}

impl StepmapRuntime {
    pub(crate) fn new(
        context: RuntimeContext,
        tx: mpsc::Sender<Event>,
        rx: mpsc::Receiver<Event>,
        source_handles: Vec<JoinHandle<()>>,
        out: Box<dyn Write + Send>,
    ) -> Self {
        let RuntimeContext {
            session,
            explainer,
            render,
        } = context;
        Self {
            session,
            explainer,
            render,
            out,
            rx,
            tx: Some(tx),
            source_handles,
            next_ticket: 0,
            pending_mapping: None,
            pending_question: None,
        }
    }

    pub(crate) async fn run(&mut self) -> Result<()> {
        self.perform_initial_render();

        let loop_span = tracing::debug_span!(target: "runtime", "event_loop");
        let _enter_loop = loop_span.enter();

        let mut shutdown_reason = ShutdownReason::ChannelClosed;
        while let Some(event) = self.next_event().await {
            if let LoopControl::Break { reason } = self.handle_event(event) {
                shutdown_reason = reason;
                break;
            }
        }

        self.rx.close();
        self.finalize_shutdown(shutdown_reason).await;
        Ok(())
    }

    async fn next_event(&mut self) -> Option<Event> {
        self.rx.recv().await
    }

    async fn finalize_shutdown(&mut self, reason: ShutdownReason) {
        log_shutdown_stage(reason, "begin");
        if let Some(tx) = self.tx.take() {
            trace!(
                target: "runtime.shutdown",
                reason = reason.as_str(),
                "dropping_runtime_sender"
            );
            drop(tx);
        }

        while let Some(handle) = self.source_handles.pop() {
            match tokio::time::timeout(Duration::from_millis(200), handle).await {
                Ok(Ok(_)) => trace!(
                    target: "runtime.shutdown",
                    reason = reason.as_str(),
                    "event_source_task_stopped"
                ),
                Ok(Err(err)) if err.is_cancelled() => trace!(
                    target: "runtime.shutdown",
                    reason = reason.as_str(),
                    "event_source_task_cancelled"
                ),
                Ok(Err(err)) => error!(
                    target: "runtime.shutdown",
                    reason = reason.as_str(),
                    ?err,
                    "event_source_task_error"
                ),
                // A reader parked in a blocking stdin read; the runtime
                // shutdown timeout reclaims it.
                Err(_) => debug!(
                    target: "runtime.shutdown",
                    reason = reason.as_str(),
                    "event_source_task_timeout"
                ),
            }
        }

        info!(
            target: "runtime.shutdown",
            commands = COMMANDS_TOTAL.load(Ordering::Relaxed),
            rejected = COMMANDS_REJECTED.load(Ordering::Relaxed),
            explain_requests = EXPLAIN_REQUESTS.load(Ordering::Relaxed),
            stale_replies = EXPLAIN_STALE_REPLIES.load(Ordering::Relaxed),
            send_failures = CHANNEL_SEND_FAILURES.load(Ordering::Relaxed),
            "session_telemetry"
        );
        log_shutdown_stage(reason, "complete");
    }

    fn perform_initial_render(&mut self) {
        self.show();
        self.say("Type `help` for commands.");
    }

    pub(crate) fn handle_event(&mut self, event: Event) -> LoopControl {
        match event {
            Event::Input(InputEvent::Command(cmd)) => self.handle_command(cmd),
            Event::Input(InputEvent::Rejected { message }) => {
                self.say(&message);
                LoopControl::Continue
            }
            Event::Input(InputEvent::Closed) => LoopControl::Break {
                reason: ShutdownReason::InputClosed,
            },
            Event::Explanation(reply) => {
                self.handle_explanation(reply);
                LoopControl::Continue
            }
            Event::Shutdown => LoopControl::Break {
                reason: ShutdownReason::ShutdownEvent,
            },
        }
    }

    fn handle_command(&mut self, cmd: Command) -> LoopControl {
        trace!(target: "runtime", command = cmd.name(), "command_dispatch");
        match cmd {
            Command::SetDocument(text) => self.mutate(|s| s.set_document(&text)),
            Command::SetTracked(pos) => self.mutate(|s| s.set_tracked(pos)),
            Command::Track { label, pos } => {
                let id = self.mutate(|s| s.add_tracked(&label, pos));
                self.say(&format!("Tracking `{label}` as #{id}."));
            }
            Command::Untrack(id) => {
                if self.session.remove_tracked(id) {
                    self.invalidate_mapping();
                } else {
                    self.say(&format!("No removable tracked position #{id}."));
                }
            }
            Command::Insert { from, text } => self.mutate(|s| {
                s.batch(|s| {
                    if !s.step().is_insert() {
                        s.select_insert();
                    }
                    if let Some(from) = from {
                        s.set_from(from);
                    }
                    if let Some(text) = &text {
                        s.set_insert_text(text);
                    }
                })
            }),
            Command::Delete { from, to } => self.mutate(|s| {
                s.batch(|s| {
                    if s.step().is_insert() {
                        s.select_delete();
                    }
                    if let Some(from) = from {
                        s.set_from(from);
                    }
                    if let Some(to) = to {
                        s.set_to(to);
                    }
                })
            }),
            Command::SetFrom(from) => self.mutate(|s| s.set_from(from)),
            Command::SetTo(to) => {
                if self.session.set_to(to) {
                    self.invalidate_mapping();
                } else {
                    self.say("`to` only applies to a delete step.");
                }
            }
            Command::SetText(text) => {
                if self.session.set_insert_text(&text) {
                    self.invalidate_mapping();
                } else {
                    self.say("`text` only applies to an insert step.");
                }
            }
            Command::SetBias(bias) => self.mutate(|s| s.set_bias(bias)),
            Command::Show => self.show(),
            Command::Explain => self.request_mapping_explanation(),
            Command::Ask(question) => self.request_answer(question),
            Command::Help => self.say(HELP_TEXT),
            Command::Quit => {
                return LoopControl::Break {
                    reason: ShutdownReason::CommandQuit,
                };
            }
        }
        LoopControl::Continue
    }

    /// Apply a session update; an explanation in flight now describes a
    /// state that no longer exists.
    fn mutate<T>(&mut self, f: impl FnOnce(&mut Session) -> T) -> T {
        let out = f(&mut self.session);
        self.invalidate_mapping();
        out
    }

    fn invalidate_mapping(&mut self) {
        if let Some(ticket) = self.pending_mapping.take() {
            debug!(target: "runtime.explain", ticket, "mapping_explanation_invalidated");
        }
    }

    fn issue_ticket(&mut self) -> u64 {
        self.next_ticket += 1;
        EXPLAIN_REQUESTS.fetch_add(1, Ordering::Relaxed);
        self.next_ticket
    }

    fn request_mapping_explanation(&mut self) {
        let Some(tx) = self.tx.clone() else {
            return;
        };
        let ticket = self.issue_ticket();
        self.pending_mapping = Some(ticket);

        let view = self.session.view();
        let doc = view.doc_before.clone();
        let step = view.step.clone();
        let result = view.primary.result;
        info!(
            target: "runtime.explain",
            ticket,
            kind = ExplanationKind::Mapping.as_str(),
            doc_len = doc.chars().count(),
            "explanation_requested"
        );
        let explainer = Arc::clone(&self.explainer);
        tokio::task::spawn_blocking(move || {
            let text = explainer.explain_mapping(&doc, &step, result.old_pos, &result);
            send_reply(
                &tx,
                ExplanationReply {
                    ticket,
                    kind: ExplanationKind::Mapping,
                    text,
                },
            );
        });
        self.say("Asking the AI tutor...");
    }

    fn request_answer(&mut self, question: String) {
        let Some(tx) = self.tx.clone() else {
            return;
        };
        let ticket = self.issue_ticket();
        self.pending_question = Some(ticket);
        info!(
            target: "runtime.explain",
            ticket,
            kind = ExplanationKind::Question.as_str(),
            question_len = question.len(),
            "explanation_requested"
        );
        let explainer = Arc::clone(&self.explainer);
        tokio::task::spawn_blocking(move || {
            let text = explainer.ask_question(&question);
            send_reply(
                &tx,
                ExplanationReply {
                    ticket,
                    kind: ExplanationKind::Question,
                    text,
                },
            );
        });
        self.say("Asking the AI tutor...");
    }

    fn handle_explanation(&mut self, reply: ExplanationReply) {
        let pending = match reply.kind {
            ExplanationKind::Mapping => &mut self.pending_mapping,
            ExplanationKind::Question => &mut self.pending_question,
        };
        if *pending != Some(reply.ticket) {
            EXPLAIN_STALE_REPLIES.fetch_add(1, Ordering::Relaxed);
            debug!(
                target: "runtime.explain",
                ticket = reply.ticket,
                kind = reply.kind.as_str(),
                "stale_reply_discarded"
            );
            return;
        }
        *pending = None;
        info!(
            target: "runtime.explain",
            ticket = reply.ticket,
            kind = reply.kind.as_str(),
            reply_len = reply.text.len(),
            "explanation_received"
        );
        let heading = match reply.kind {
            ExplanationKind::Mapping => "AI tutor",
            ExplanationKind::Question => "AI tutor answers",
        };
        self.say(&format!("-- {heading} --\n{}", reply.text));
    }

    fn show(&mut self) {
        let frame = render_view(self.session.view(), &self.render);
        self.say(&frame);
    }

    fn say(&mut self, message: &str) {
        if let Err(e) = writeln!(self.out, "{message}").and_then(|_| self.out.flush()) {
            warn!(target: "runtime", error = %e, "output_write_failed");
        }
    }
}
