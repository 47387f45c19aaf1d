//! Host message bridge
//!
//! Posts `Ready!` on start, then serves inbound commands until the host
//! channel closes. A compile runs without interruption up to its first
//! suspension (the bundle availability poll), and only then does the bridge
//! take the next message. A compile arriving during that window sees the
//! load in flight and is dropped.

use crate::compile::{CompileDisposition, CompileOrchestrator};
use crate::history::{History, HistoryInterceptor, NavigationEvent, NavigationEvents};
use crate::host::Outbound;
use crate::protocol::{InboundMessage, OutboundMessage};
use futures_util::future::LocalBoxFuture;
use futures_util::stream::FuturesUnordered;
use futures_util::{FutureExt, StreamExt};
use sandbox_config::Phase;
use std::sync::Arc;
use std::task::Poll;
use tokio::sync::mpsc;
use tracing::{debug, trace};

const LOG_TARGET: &str = Phase::Bridge.target();

pub struct MessageBridge {
    orchestrator: CompileOrchestrator,
    history: Arc<HistoryInterceptor>,
    navigation: NavigationEvents,
    outbound: Outbound,
}

impl std::fmt::Debug for MessageBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageBridge")
            .field("orchestrator", &self.orchestrator)
            .field("history", &self.history)
            .field("outbound", &self.outbound)
            .finish_non_exhaustive()
    }
}

impl MessageBridge {
    pub fn new(
        orchestrator: CompileOrchestrator,
        history: Arc<HistoryInterceptor>,
        navigation: NavigationEvents,
        outbound: Outbound,
    ) -> Self {
        Self {
            orchestrator,
            history,
            navigation,
            outbound,
        }
    }

    /// Serve `inbound` until it closes
    ///
    /// Compiles still waiting on a bundle and queued navigations are
    /// delivered before this returns.
    pub async fn run(self, mut inbound: mpsc::Receiver<InboundMessage>) {
        let Self {
            orchestrator,
            history,
            mut navigation,
            outbound,
        } = self;

        outbound.send(OutboundMessage::Ready);
        debug!(target: LOG_TARGET, origin = outbound.origin(), "sandbox ready");

        let mut in_flight: FuturesUnordered<LocalBoxFuture<'_, CompileDisposition>> =
            FuturesUnordered::new();

        loop {
            tokio::select! {
                biased;

                Some(disposition) = in_flight.next(), if !in_flight.is_empty() => {
                    deliver(&outbound, disposition);
                }
                Some(event) = navigation.recv() => {
                    report_location(&outbound, history.as_ref(), &event);
                }
                message = inbound.recv() => {
                    let Some(message) = message else { break };
                    debug!(target: LOG_TARGET, kind = message.kind(), "inbound message");
                    match message {
                        InboundMessage::Compile(request) => {
                            let mut compile = orchestrator.handle_compile(*request).boxed_local();
                            match futures_util::poll!(&mut compile) {
                                Poll::Ready(disposition) => deliver(&outbound, disposition),
                                Poll::Pending => in_flight.push(compile),
                            }
                        }
                        InboundMessage::UrlBack => {
                            history.back();
                        }
                        InboundMessage::UrlForward => {
                            history.forward();
                        }
                    }
                }
            }
        }

        while let Some(disposition) = in_flight.next().await {
            deliver(&outbound, disposition);
        }
        while let Ok(event) = navigation.try_recv() {
            report_location(&outbound, history.as_ref(), &event);
        }
        debug!(target: LOG_TARGET, "host channel closed");
    }
}

fn deliver(outbound: &Outbound, disposition: CompileDisposition) {
    match disposition.into_message() {
        Some(message) => {
            trace!(target: LOG_TARGET, kind = message.kind(), "outbound message");
            outbound.send(message);
        }
        None => trace!(target: LOG_TARGET, "compile dropped"),
    }
}

fn report_location(outbound: &Outbound, history: &dyn History, event: &NavigationEvent) {
    let url = history.location().path_and_query();
    trace!(target: LOG_TARGET, kind = ?event.kind, %url, "url changed");
    outbound.send(OutboundMessage::UrlChange { url });
}
