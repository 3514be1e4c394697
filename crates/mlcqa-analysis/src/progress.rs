//! Progress reporting
//!
//! The pipeline reports human-readable status lines through a [`ProgressSink`].
//! Messages are delivered synchronously, in pipeline order, from whichever thread
//! runs the pipeline.

/// Receiver of progress and diagnostic messages.
pub trait ProgressSink {
    fn report(&mut self, message: &str);
}

/// Discards every message.
impl ProgressSink for () {
    fn report(&mut self, _message: &str) {}
}

/// Collects messages, mostly useful for inspecting diagnostics after a run.
impl ProgressSink for Vec<String> {
    fn report(&mut self, message: &str) {
        self.push(message.to_owned());
    }
}

impl<F> ProgressSink for F
where
    F: FnMut(&str),
{
    fn report(&mut self, message: &str) {
        self(message);
    }
}
