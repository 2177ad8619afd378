use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

/// JSON-lines diagnostics for one stamping run. Cloned handles share one
/// buffered writer; worker threads log through the same mutex.
pub(crate) struct RunLog {
    inner: Mutex<RunLogState>,
}

struct RunLogState {
    writer: BufWriter<File>,
    counters: HashMap<String, u64>,
}

impl RunLog {
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            inner: Mutex::new(RunLogState {
                writer: BufWriter::new(file),
                counters: HashMap::new(),
            }),
        })
    }

    /// One pipeline stage finished: rasterize, composite, archive, assemble.
    pub fn log_stage(&self, stage: &str, pages: usize, ms: f64) {
        self.write_line(&format!(
            "{{\"type\":\"stamp.stage\",\"stage\":\"{}\",\"pages\":{},\"ms\":{:.3}}}",
            json_escape(stage),
            pages,
            ms
        ));
    }

    /// One page finished compositing and encoding.
    pub fn log_page(&self, page_no: usize, instructions: usize, ms: f64) {
        self.write_line(&format!(
            "{{\"type\":\"stamp.page\",\"page\":{},\"instructions\":{},\"ms\":{:.3}}}",
            page_no, instructions, ms
        ));
    }

    pub fn increment(&self, key: &str, amount: u64) {
        if let Ok(mut state) = self.inner.lock() {
            let entry = state.counters.entry(key.to_string()).or_insert(0);
            *entry = entry.saturating_add(amount);
        }
    }

    /// Emit the drained counter summary and flush. Called once per run.
    pub fn finish(&self, pages: usize, overlays: usize) {
        if let Ok(mut state) = self.inner.lock() {
            let mut counters: Vec<(String, u64)> = state.counters.drain().collect();
            counters.sort_by(|a, b| a.0.cmp(&b.0));
            let mut counts_json = String::from("{");
            for (idx, (key, value)) in counters.iter().enumerate() {
                if idx > 0 {
                    counts_json.push(',');
                }
                counts_json.push_str(&format!("\"{}\":{}", json_escape(key), value));
            }
            counts_json.push('}');
            let json = format!(
                "{{\"type\":\"stamp.summary\",\"pages\":{},\"overlays\":{},\"counts\":{}}}",
                pages, overlays, counts_json
            );
            let _ = writeln!(state.writer, "{json}");
            let _ = state.writer.flush();
        }
    }

    fn write_line(&self, json: &str) {
        if let Ok(mut state) = self.inner.lock() {
            let _ = writeln!(state.writer, "{json}");
        }
    }
}

pub(crate) fn json_escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 8);
    for ch in raw.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out
}
