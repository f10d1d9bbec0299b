//! Progress counter for the CLI, shown on stderr while outcomes stream to stdout.

use kdam::{Animation, Bar, BarExt};
use std::io;

use crate::Outcome;
use crate::report::OutcomeSink;

/// Create a counter for unknown total (shows count without percentage)
pub fn create_counter(desc: &'static str) -> Bar {
    kdam::tqdm!(
        total = 0,
        desc = desc,
        animation = Animation::Classic,
        position = 0,
        unit = " files"
    )
}

/// Wraps a sink and ticks a counter for every outcome it forwards.
pub struct ProgressSink<S: OutcomeSink> {
    inner: S,
    bar: Bar,
}

impl<S: OutcomeSink> ProgressSink<S> {
    pub fn new(inner: S, desc: &'static str) -> Self {
        let mut bar = create_counter(desc);
        let _ = bar.refresh();
        Self { inner, bar }
    }
}

impl<S: OutcomeSink> OutcomeSink for ProgressSink<S> {
    fn accept(&mut self, outcome: Outcome) -> io::Result<()> {
        let _ = self.bar.update(1);
        self.inner.accept(outcome)
    }

    fn finish(&mut self) -> io::Result<()> {
        let _ = self.bar.refresh();
        eprintln!();
        self.inner.finish()
    }
}
