//! Result sinks: the single consuming point for outcomes.

pub mod sink;

pub use sink::{CollectSink, JsonSink, OutcomeSink, SortedSink, TextSink, render_text};
