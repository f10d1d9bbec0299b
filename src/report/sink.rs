//! Outcome rendering. Sinks run on the fan-in thread only, so they need no locking.

use std::io::{self, Write};

use crate::Outcome;

/// Consumes each outcome exactly once, in whatever order the pool delivers them.
pub trait OutcomeSink {
    fn accept(&mut self, outcome: Outcome) -> io::Result<()>;

    /// Called once after the pool has drained.
    fn finish(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<S: OutcomeSink + ?Sized> OutcomeSink for Box<S> {
    fn accept(&mut self, outcome: Outcome) -> io::Result<()> {
        (**self).accept(outcome)
    }

    fn finish(&mut self) -> io::Result<()> {
        (**self).finish()
    }
}

/// `<path> :: <digest>` for success, `<path>: <message>` for failure.
pub fn render_text(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Success { path, digest } => format!("{} :: {}", path.display(), digest),
        Outcome::Failure { path, message, .. } => format!("{}: {}", path.display(), message),
    }
}

/// Plain-text sink: successes to `out`, failures to `err`.
pub struct TextSink<W: Write, E: Write> {
    out: W,
    err: E,
}

impl<W: Write, E: Write> TextSink<W, E> {
    pub fn new(out: W, err: E) -> Self {
        Self { out, err }
    }

    pub fn into_inner(self) -> (W, E) {
        (self.out, self.err)
    }
}

impl TextSink<io::Stdout, io::Stderr> {
    pub fn stdio() -> Self {
        Self::new(io::stdout(), io::stderr())
    }
}

impl<W: Write, E: Write> OutcomeSink for TextSink<W, E> {
    fn accept(&mut self, outcome: Outcome) -> io::Result<()> {
        let line = render_text(&outcome);
        if outcome.is_success() {
            writeln!(self.out, "{line}")
        } else {
            writeln!(self.err, "{line}")
        }
    }

    fn finish(&mut self) -> io::Result<()> {
        self.out.flush()?;
        self.err.flush()
    }
}

/// One JSON object per line, successes and failures on the same stream.
pub struct JsonSink<W: Write> {
    out: W,
}

impl<W: Write> JsonSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> OutcomeSink for JsonSink<W> {
    fn accept(&mut self, outcome: Outcome) -> io::Result<()> {
        serde_json::to_writer(&mut self.out, &outcome)?;
        self.out.write_all(b"\n")
    }

    fn finish(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

/// Buffers every outcome in memory.
#[derive(Debug, Default)]
pub struct CollectSink {
    pub outcomes: Vec<Outcome>,
}

impl CollectSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Outcomes ordered by path.
    pub fn sorted(mut self) -> Vec<Outcome> {
        self.outcomes.sort_by(|a, b| a.path().cmp(b.path()));
        self.outcomes
    }

    pub fn successes(&self) -> impl Iterator<Item = &Outcome> {
        self.outcomes.iter().filter(|o| o.is_success())
    }

    pub fn failures(&self) -> impl Iterator<Item = &Outcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }
}

impl OutcomeSink for CollectSink {
    fn accept(&mut self, outcome: Outcome) -> io::Result<()> {
        self.outcomes.push(outcome);
        Ok(())
    }
}

/// Holds outcomes until the pool drains, then forwards them to `inner` sorted by path.
pub struct SortedSink<S: OutcomeSink> {
    inner: S,
    buffer: Vec<Outcome>,
}

impl<S: OutcomeSink> SortedSink<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            buffer: Vec::new(),
        }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: OutcomeSink> OutcomeSink for SortedSink<S> {
    fn accept(&mut self, outcome: Outcome) -> io::Result<()> {
        self.buffer.push(outcome);
        Ok(())
    }

    fn finish(&mut self) -> io::Result<()> {
        let mut buffer = std::mem::take(&mut self.buffer);
        buffer.sort_by(|a, b| a.path().cmp(b.path()));
        for outcome in buffer {
            self.inner.accept(outcome)?;
        }
        self.inner.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FailureKind;

    fn ok(path: &str, digest: &str) -> Outcome {
        Outcome::Success {
            path: path.into(),
            digest: digest.into(),
        }
    }

    #[test]
    fn text_sink_splits_streams() {
        let mut sink = TextSink::new(Vec::new(), Vec::new());
        sink.accept(ok("dir/a.txt", "5d41402abc4b2a76b9719d911017c592"))
            .unwrap();
        sink.accept(Outcome::failure(
            "dir/locked.txt".into(),
            FailureKind::Read,
            "Permission denied (os error 13)",
        ))
        .unwrap();
        sink.finish().unwrap();
        let (out, err) = sink.into_inner();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "dir/a.txt :: 5d41402abc4b2a76b9719d911017c592\n"
        );
        assert_eq!(
            String::from_utf8(err).unwrap(),
            "dir/locked.txt: Permission denied (os error 13)\n"
        );
    }

    #[test]
    fn json_sink_writes_one_object_per_line() {
        let mut sink = JsonSink::new(Vec::new());
        sink.accept(ok("a", "00")).unwrap();
        sink.accept(Outcome::failure("b".into(), FailureKind::Timeout, "timed out"))
            .unwrap();
        let text = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["status"], "success");
        assert_eq!(lines[0]["digest"], "00");
        assert_eq!(lines[1]["status"], "failure");
        assert_eq!(lines[1]["kind"], "timeout");
    }

    #[test]
    fn sorted_sink_forwards_in_path_order_on_finish() {
        let mut sink = SortedSink::new(CollectSink::new());
        sink.accept(ok("c", "3")).unwrap();
        sink.accept(ok("a", "1")).unwrap();
        sink.accept(ok("b", "2")).unwrap();
        assert!(sink.inner.outcomes.is_empty());
        sink.finish().unwrap();
        let digests: Vec<_> = sink
            .into_inner()
            .outcomes
            .into_iter()
            .map(|o| match o {
                Outcome::Success { digest, .. } => digest,
                Outcome::Failure { message, .. } => message,
            })
            .collect();
        assert_eq!(digests, vec!["1", "2", "3"]);
    }

    #[test]
    fn collect_sink_partitions() {
        let mut sink = CollectSink::new();
        sink.accept(ok("a", "1")).unwrap();
        sink.accept(Outcome::failure("b".into(), FailureKind::Read, "x"))
            .unwrap();
        assert_eq!(sink.successes().count(), 1);
        assert_eq!(sink.failures().count(), 1);
    }
}
