/// Bounded output collection
///
/// Streams are drained to EOF so a chatty child never blocks on a full pipe,
/// but only the first `limit` bytes are kept.
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

/// Bytes collected from one stream
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedStream {
    /// Kept bytes, at most the collector limit
    pub data: Vec<u8>,
    /// Everything the stream produced, kept or not
    pub total_bytes: u64,
    pub truncated: bool,
}

impl CapturedStream {
    /// Lossy UTF-8 text, never longer in bytes than `data`.
    ///
    /// Replacement characters are wider than the bytes they stand for, and a
    /// cut inside a multi-byte character leaves a dangling one, so the decoded
    /// text is shortened back to a char boundary within `data.len()`.
    pub fn text(&self) -> String {
        let mut text = String::from_utf8_lossy(&self.data).into_owned();
        let budget = self.data.len();
        if text.len() > budget {
            let mut end = budget;
            while !text.is_char_boundary(end) {
                end -= 1;
            }
            text.truncate(end);
        }
        text
    }
}

/// Background reader for a child's pipe
pub struct StreamCollector {
    captured: Arc<Mutex<CapturedStream>>,
    done: Receiver<()>,
}

impl StreamCollector {
    pub fn spawn<R: Read + Send + 'static>(stream: R, limit: usize) -> Self {
        let captured = Arc::new(Mutex::new(CapturedStream::default()));
        let (tx, done) = bounded(1);
        let shared = Arc::clone(&captured);
        thread::spawn(move || {
            collect_stream(stream, limit, &shared);
            let _ = tx.send(());
        });
        Self { captured, done }
    }

    /// Wait for EOF. A grandchild that escaped the process group can hold the
    /// pipe open forever, so give up after `grace`, keep what was read so far
    /// and report truncation.
    pub fn finish(self, grace: Duration) -> CapturedStream {
        let reached_eof = match self.done.recv_timeout(grace) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => true,
            Err(RecvTimeoutError::Timeout) => {
                log::warn!("stream collector did not reach EOF within {:?}", grace);
                false
            }
        };

        let mut captured = self
            .captured
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if !reached_eof {
            captured.truncated = true;
        }
        captured
    }
}

/// Drain `stream` into `sink`, keeping at most `limit` bytes.
fn collect_stream<R: Read>(stream: R, limit: usize, sink: &Mutex<CapturedStream>) {
    let mut reader = BufReader::new(stream);
    let mut chunk = [0u8; 4096];

    loop {
        match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                let mut captured = sink.lock().unwrap_or_else(PoisonError::into_inner);
                captured.total_bytes += n as u64;
                let room = limit.saturating_sub(captured.data.len());
                if room < n {
                    captured.truncated = true;
                }
                captured.data.extend_from_slice(&chunk[..n.min(room)]);
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(_) => break,
        }
    }
}

/// Read at most `cap` bytes of a file, reporting its full length.
pub fn read_capped(path: &Path, cap: u64) -> std::io::Result<CapturedStream> {
    let file = File::open(path)?;
    let total_bytes = file.metadata()?.len();
    let mut data = Vec::with_capacity(total_bytes.min(cap) as usize);
    file.take(cap).read_to_end(&mut data)?;

    Ok(CapturedStream {
        truncated: total_bytes > cap,
        data,
        total_bytes,
    })
}
