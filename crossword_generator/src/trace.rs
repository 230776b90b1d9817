//! Diagnostic trace log: one human-readable key/value block per simulation event.
use std::collections::BTreeMap;
use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use serde_json::Value;

use crate::error::Result;

/// Renders a payload value in the block layout
///
/// Floats get six decimals, strings print bare, arrays print as `[a, b]` and objects as
/// `{k=v, ...}` in key order.
struct BlockValue<'a>(&'a Value);

impl fmt::Display for BlockValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.0 {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => match n.as_f64() {
                Some(x) if n.is_f64() => write!(f, "{:.6}", x),
                _ => write!(f, "{}", n),
            },
            Value::String(s) => write!(f, "{}", s),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", BlockValue(item))?;
                }
                write!(f, "]")
            },
            Value::Object(entries) => {
                write!(f, "{{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}={}", key, BlockValue(value))?;
                }
                write!(f, "}}")
            }
        }
    }
}

/// One trace event
#[derive(Clone, Debug, PartialEq)]
pub struct TraceRecord {
    event: &'static str,
    run: Option<usize>,
    attempt: Option<usize>,
    step: Option<(usize, &'static str)>,
    fields: BTreeMap<String, Value>,
}
impl TraceRecord {
    pub fn new(event: &'static str) -> TraceRecord {
        TraceRecord { event, run: None, attempt: None, step: None, fields: BTreeMap::new() }
    }

    pub fn run(mut self, run: usize) -> TraceRecord {
        self.run = Some(run);
        self
    }

    pub fn attempt(mut self, attempt: usize) -> TraceRecord {
        self.attempt = Some(attempt);
        self
    }

    pub fn step(mut self, index: usize, name: &'static str) -> TraceRecord {
        self.step = Some((index, name));
        self
    }

    pub fn with<V: Serialize>(mut self, key: &str, value: V) -> TraceRecord {
        self.insert(key, value);
        self
    }

    /// Sets a field, replacing any earlier value
    ///
    /// Values serde_json cannot represent (non-finite floats) are stored as `null`.
    pub fn insert<V: Serialize>(&mut self, key: &str, value: V) {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.fields.insert(key.to_string(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }
}

impl fmt::Display for TraceRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "event={}", self.event)?;
        if let Some(run) = self.run {
            write!(f, " | run={}", run)?;
        }
        if let Some(attempt) = self.attempt {
            write!(f, " | attempt={}", attempt)?;
        }
        if let Some((index, name)) = self.step {
            write!(f, " | step={} | step_name={}", index, name)?;
        }
        writeln!(f)?;
        for (key, value) in self.fields.iter() {
            writeln!(f, "  {}: {}", key, BlockValue(value))?;
        }
        writeln!(f)
    }
}

/// Sequential writer of trace records; a disabled sink drops everything
pub struct TraceSink {
    writer: Option<Box<dyn Write>>,
}
impl TraceSink {
    pub fn disabled() -> TraceSink {
        TraceSink { writer: None }
    }

    pub fn to_writer<W: Write + 'static>(writer: W) -> TraceSink {
        TraceSink { writer: Some(Box::new(writer)) }
    }

    /// Creates (truncating) the trace file at `path`, creating parent directories as needed
    pub fn create(path: &Path) -> Result<TraceSink> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(TraceSink::to_writer(BufWriter::new(File::create(path)?)))
    }

    pub fn is_enabled(&self) -> bool {
        self.writer.is_some()
    }

    pub fn emit(&mut self, record: &TraceRecord) -> Result<()> {
        if let Some(writer) = self.writer.as_mut() {
            write!(writer, "{}", record)?;
        }
        Ok(())
    }

    /// Builds and writes a record only when the sink is enabled
    pub fn emit_with<F: FnOnce() -> TraceRecord>(&mut self, build: F) -> Result<()> {
        if self.writer.is_none() {
            return Ok(());
        }
        let record = build();
        self.emit(&record)
    }

    pub fn flush(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.as_mut() {
            writer.flush()?;
        }
        Ok(())
    }
}

impl fmt::Debug for TraceSink {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("TraceSink").field("enabled", &self.is_enabled()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct SharedBuffer(Rc<RefCell<Vec<u8>>>);
    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn values_render() {
        let mut map = BTreeMap::new();
        map.insert('B', 2usize);
        map.insert('A', 1usize);
        let record = TraceRecord::new("values")
            .with("absent", None::<f64>)
            .with("empty", Vec::<usize>::new())
            .with("flag", true)
            .with("letters", map)
            .with("ratio", 0.1)
            .with("whole", 2.0)
            .with("words", vec!["CANE", "ACRE"]);
        assert_eq!(
            record.to_string(),
            "event=values\n  absent: null\n  empty: []\n  flag: true\n  letters: {A=1, B=2}\n  \
             ratio: 0.100000\n  whole: 2.000000\n  words: [CANE, ACRE]\n\n"
        );
        assert_eq!(TraceRecord::new("nan").with("x", f64::NAN).get("x"), Some(&Value::Null));
    }

    #[test]
    fn record_block_layout() {
        let record = TraceRecord::new("attempt_step")
            .run(3)
            .attempt(7)
            .step(2, "build_seed")
            .with("seed", "CRANE")
            .with("length", 5usize);
        assert_eq!(
            record.to_string(),
            "event=attempt_step | run=3 | attempt=7 | step=2 | step_name=build_seed\n  length: 5\n  seed: CRANE\n\n"
        );
        assert_eq!(TraceRecord::new("run_end").run(1).to_string(), "event=run_end | run=1\n\n");
    }

    #[test]
    fn disabled_sink_skips_building() {
        let mut sink = TraceSink::disabled();
        let mut built = false;
        sink.emit_with(|| {
            built = true;
            TraceRecord::new("never")
        })
        .unwrap();
        assert!(!built);
    }

    #[test]
    fn sink_writes_records_in_order() {
        let buffer = SharedBuffer::default();
        let mut sink = TraceSink::to_writer(buffer.clone());
        sink.emit(&TraceRecord::new("run_start").run(1)).unwrap();
        sink.emit(&TraceRecord::new("run_end").run(1).with("status", "success")).unwrap();
        sink.flush().unwrap();
        let text = String::from_utf8(buffer.0.borrow().clone()).unwrap();
        assert_eq!(text, "event=run_start | run=1\n\nevent=run_end | run=1\n  status: success\n\n");
    }
}
