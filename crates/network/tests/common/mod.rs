// crates/network/tests/common/mod.rs
//! Scripted transport shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use sublink_network::{HttpResponse, HttpTransport, NetworkError, NetworkResult};
use tokio::time::Instant;

/// What the transport does for one request
#[derive(Debug, Clone)]
pub enum Reply {
    Status(u16, Bytes),
    Error(String),
    /// Never answers
    Hang,
}

impl Reply {
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Reply::Status(200, body.into())
    }

    pub fn status(code: u16) -> Self {
        Reply::Status(code, Bytes::new())
    }
}

struct Rule {
    pattern: String,
    delay: Duration,
    replies: Vec<Reply>,
    served: usize,
}

/// Answers requests from a script.
///
/// A request is matched against the first rule whose pattern occurs in the
/// URL. Each rule plays its replies in order and repeats the last one.
#[derive(Default)]
pub struct ScriptedTransport {
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<(String, Instant)>>,
    running: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, pattern: &str, replies: Vec<Reply>) -> Self {
        self.on_after(pattern, Duration::ZERO, replies)
    }

    pub fn on_after(self, pattern: &str, delay: Duration, replies: Vec<Reply>) -> Self {
        self.rules.lock().expect("rules lock").push(Rule {
            pattern: pattern.to_string(),
            delay,
            replies,
            served: 0,
        });
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .expect("calls lock")
            .iter()
            .map(|(url, _)| url.clone())
            .collect()
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.calls
            .lock()
            .expect("calls lock")
            .iter()
            .map(|(_, at)| *at)
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("calls lock").len()
    }

    pub fn calls_matching(&self, pattern: &str) -> usize {
        self.calls().iter().filter(|url| url.contains(pattern)).count()
    }

    /// Most requests that were in progress at the same time
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn next_reply(&self, url: &str) -> (Duration, Reply) {
        let mut rules = self.rules.lock().expect("rules lock");
        match rules.iter_mut().find(|rule| url.contains(&rule.pattern)) {
            Some(rule) => {
                let index = rule.served.min(rule.replies.len().saturating_sub(1));
                rule.served += 1;
                let reply = rule
                    .replies
                    .get(index)
                    .cloned()
                    .unwrap_or_else(|| Reply::Error("empty script".to_string()));
                (rule.delay, reply)
            }
            None => (Duration::ZERO, Reply::Error(format!("no script for {}", url))),
        }
    }
}

struct RunningGuard<'a>(&'a AtomicUsize);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn get(&self, url: &str) -> NetworkResult<HttpResponse> {
        self.calls
            .lock()
            .expect("calls lock")
            .push((url.to_string(), Instant::now()));
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let _guard = RunningGuard(&self.running);

        let (delay, reply) = self.next_reply(url);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        match reply {
            Reply::Status(code, body) => Ok(HttpResponse::new(code, body)),
            Reply::Error(message) => Err(NetworkError::Transport(message)),
            Reply::Hang => std::future::pending().await,
        }
    }
}

/// A small, valid PNG
pub fn png_bytes(shade: u8) -> Bytes {
    let image = image::RgbImage::from_pixel(4, 4, image::Rgb([shade, shade, shade]));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgb8(image)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .expect("encode png");
    Bytes::from(buf)
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
