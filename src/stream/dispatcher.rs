/// Callback dispatch and the per-stream state machine.
///
/// One streaming call owns one [`Dispatcher`]; it guarantees that exactly one
/// terminal callback (`on_done` or `on_error`) fires, and that nothing fires
/// after either.
use crate::error::ChatError;

use super::StreamEvent;

/// Callback bundle supplied by the caller.
///
/// The core never touches presentation state; all state mutation happens in
/// the handler, driven by these three calls.
pub trait StreamHandler {
    /// An incremental content fragment arrived, in strict arrival order.
    fn on_chunk(&mut self, text: &str);
    /// The stream ended naturally. Fires at most once, never after `on_error`.
    fn on_done(&mut self);
    /// The stream failed. Fires at most once, never after `on_done`.
    fn on_error(&mut self, error: &ChatError);
}

/// Lifecycle of one streaming call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamPhase {
    /// Awaiting response headers; no callback has fired.
    Opening,
    /// Pulling and parsing lines; any number of `on_chunk` calls.
    Streaming,
    /// Terminal: `on_done` fired.
    Done,
    /// Terminal: `on_error` fired.
    Errored,
}

impl StreamPhase {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, StreamPhase::Done | StreamPhase::Errored)
    }
}

/// Drives a [`StreamHandler`] from classified stream events.
pub struct Dispatcher<'a, H: StreamHandler> {
    handler: &'a mut H,
    phase: StreamPhase,
}

impl<'a, H: StreamHandler> Dispatcher<'a, H> {
    pub fn new(handler: &'a mut H) -> Self {
        Self {
            handler,
            phase: StreamPhase::Opening,
        }
    }

    #[must_use]
    pub fn phase(&self) -> StreamPhase {
        self.phase
    }

    /// Mark the response headers as accepted; chunk dispatch may begin.
    pub fn opened(&mut self) {
        if self.phase == StreamPhase::Opening {
            self.phase = StreamPhase::Streaming;
        }
    }

    /// Dispatch one classified event.
    ///
    /// Terminator frames are inert. Content events invoke `on_chunk`. An
    /// error event is returned as a fatal [`ChatError::Upstream`] for the
    /// caller to route through [`Dispatcher::fail`]; no further events may be
    /// dispatched after that.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Upstream`] for an error-classified frame.
    pub fn dispatch(&mut self, event: StreamEvent) -> Result<(), ChatError> {
        debug_assert_eq!(self.phase, StreamPhase::Streaming);
        match event {
            StreamEvent::Terminator => Ok(()),
            StreamEvent::Delta(text) | StreamEvent::Text(text) => {
                self.handler.on_chunk(&text);
                Ok(())
            }
            StreamEvent::Error(payload) => Err(ChatError::Upstream { payload }),
        }
    }

    /// Natural end of stream: fire `on_done` unless already terminal.
    pub fn finish(&mut self) {
        if self.phase.is_terminal() {
            return;
        }
        self.phase = StreamPhase::Done;
        self.handler.on_done();
    }

    /// Fatal failure: fire `on_error` unless already terminal.
    pub fn fail(&mut self, error: &ChatError) {
        if self.phase.is_terminal() {
            tracing::debug!(error = %error, "suppressing error after terminal callback");
            return;
        }
        self.phase = StreamPhase::Errored;
        self.handler.on_error(error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Default)]
    struct Recording {
        chunks: Vec<String>,
        done: u32,
        errors: Vec<String>,
    }

    impl StreamHandler for Recording {
        fn on_chunk(&mut self, text: &str) {
            self.chunks.push(text.to_string());
        }
        fn on_done(&mut self) {
            self.done += 1;
        }
        fn on_error(&mut self, error: &ChatError) {
            self.errors.push(error.to_string());
        }
    }

    #[test]
    fn chunks_dispatch_in_order_then_done_once() {
        let mut handler = Recording::default();
        let mut dispatcher = Dispatcher::new(&mut handler);
        dispatcher.opened();
        dispatcher.dispatch(StreamEvent::Delta("a".into())).unwrap();
        dispatcher.dispatch(StreamEvent::Text("b".into())).unwrap();
        dispatcher.dispatch(StreamEvent::Terminator).unwrap();
        dispatcher.dispatch(StreamEvent::Delta("c".into())).unwrap();
        dispatcher.finish();
        dispatcher.finish();
        assert_eq!(handler.chunks, vec!["a", "b", "c"]);
        assert_eq!(handler.done, 1);
        assert!(handler.errors.is_empty());
    }

    #[test]
    fn error_event_is_fatal_and_excludes_done() {
        let mut handler = Recording::default();
        let mut dispatcher = Dispatcher::new(&mut handler);
        dispatcher.opened();
        let err = dispatcher
            .dispatch(StreamEvent::Error(json!({"message": "rate limited"})))
            .unwrap_err();
        dispatcher.fail(&err);
        assert_eq!(dispatcher.phase(), StreamPhase::Errored);
        dispatcher.finish();
        assert_eq!(handler.errors, vec!["rate limited"]);
        assert_eq!(handler.done, 0);
    }

    #[test]
    fn fail_after_done_is_suppressed() {
        let mut handler = Recording::default();
        let mut dispatcher = Dispatcher::new(&mut handler);
        dispatcher.opened();
        dispatcher.finish();
        dispatcher.fail(&ChatError::Transport("late".into()));
        assert_eq!(handler.done, 1);
        assert!(handler.errors.is_empty());
    }

    #[test]
    fn fail_from_opening_phase() {
        let mut handler = Recording::default();
        let mut dispatcher = Dispatcher::new(&mut handler);
        dispatcher.fail(&ChatError::Server {
            status: 500,
            body: "overloaded".into(),
        });
        assert_eq!(dispatcher.phase(), StreamPhase::Errored);
        assert_eq!(handler.errors, vec!["Server Error: 500 overloaded"]);
    }
}
