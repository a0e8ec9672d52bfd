use scoped_eval::ScopedEval;
use std::io;
use std::sync::Arc;
use std::sync::Mutex;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::MakeWriter;

#[derive(Clone, Default)]
struct SharedWriter {
  buffer: Arc<Mutex<Vec<u8>>>,
}

impl SharedWriter {
  fn contents(&self) -> String {
    String::from_utf8(self.buffer.lock().unwrap().clone()).unwrap()
  }
}

struct SharedWriterGuard<'a> {
  buffer: &'a Arc<Mutex<Vec<u8>>>,
}

impl<'a> io::Write for SharedWriterGuard<'a> {
  fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
    self.buffer.lock().unwrap().extend_from_slice(buf);
    Ok(buf.len())
  }

  fn flush(&mut self) -> io::Result<()> {
    Ok(())
  }
}

impl<'a> MakeWriter<'a> for SharedWriter {
  type Writer = SharedWriterGuard<'a>;

  fn make_writer(&'a self) -> Self::Writer {
    SharedWriterGuard {
      buffer: &self.buffer,
    }
  }
}

#[test]
fn tracing_emits_stage_spans() {
  let writer = SharedWriter::default();
  let subscriber = tracing_subscriber::fmt()
    .with_span_events(FmtSpan::CLOSE)
    .with_max_level(tracing::Level::DEBUG)
    .with_ansi(false)
    .with_writer(writer.clone())
    .finish();
  let _guard = tracing::subscriber::set_default(subscriber);

  let mut se = ScopedEval::new();
  se.build("a + b", None).unwrap();
  se.build("a + b", None).unwrap();

  drop(_guard);
  let output = writer.contents();
  for expected in [
    "scoped_eval.preprocess",
    "scoped_eval.build",
    "duration_ms",
    "param=",
    "references=2",
    "compiled program cache miss",
    "compiled program cache hit",
  ] {
    assert!(
      output.contains(expected),
      "expected {expected} in tracing output, got: {output}"
    );
  }
}
