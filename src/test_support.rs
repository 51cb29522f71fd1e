use std::sync::{Arc, Mutex};

use mockall::mock;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use crate::api::{LyricResponse, MetadataClient, QualityTier, Track, TrackKey, UrlResponse};
use crate::downloader::{Progress, ProgressSink};
use crate::errors::Result;

mock! {
    pub Client {}

    #[async_trait::async_trait]
    impl MetadataClient for Client {
        async fn search(&self, source: &str, keyword: &str, count: u32, page: u32) -> Result<Vec<Track>>;
        async fn resolve_url(&self, source: &str, id: &str, quality: QualityTier) -> Result<UrlResponse>;
        async fn resolve_cover(&self, source: &str, cover_id: &str, size: u32) -> Result<UrlResponse>;
        async fn resolve_lyrics(&self, source: &str, lyric_id: &str) -> Result<LyricResponse>;
    }
}

pub fn sample_track(id: &str, title: &str, artists: &[&str]) -> Track {
    Track {
        id: id.to_string(),
        title: title.to_string(),
        artists: artists.iter().map(|a| a.to_string()).collect(),
        album: "Album".to_string(),
        pic_id: None,
        lyric_id: None,
        source: "netease".to_string(),
    }
}

/// MPEG-1 Layer III frames (128 kbps, 44.1 kHz, stereo) with silent payloads.
pub fn mpeg_frames(count: usize) -> Vec<u8> {
    const FRAME_LEN: usize = 417;
    let mut out = Vec::with_capacity(FRAME_LEN * count);
    for i in 0..count {
        let mut frame = vec![0u8; FRAME_LEN];
        frame[..4].copy_from_slice(&[0xFF, 0xFB, 0x90, 0x00]);
        // vary the tail so payload comparisons are meaningful
        frame[FRAME_LEN - 1] = (i % 251) as u8;
        out.extend_from_slice(&frame);
    }
    out
}

#[derive(Default)]
pub struct RecordingSink {
    pub events: Mutex<Vec<(TrackKey, Progress)>>,
    pub batches: Mutex<Vec<(usize, usize)>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<(TrackKey, Progress)> {
        self.events.lock().unwrap().clone()
    }

    pub fn batches(&self) -> Vec<(usize, usize)> {
        self.batches.lock().unwrap().clone()
    }
}

impl ProgressSink for RecordingSink {
    fn track_progress(&self, key: &TrackKey, progress: &Progress) {
        self.events.lock().unwrap().push((key.clone(), progress.clone()));
    }

    fn batch_progress(&self, done: usize, total: usize) {
        self.batches.lock().unwrap().push((done, total));
    }
}

#[derive(Clone)]
pub struct Route {
    pub path: &'static str,
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
    /// Advertised length; `None` omits the header and closes after the body.
    pub content_length: Option<usize>,
}

impl Route {
    pub fn ok(path: &'static str, content_type: &'static str, body: Vec<u8>) -> Self {
        let len = body.len();
        Self {
            path,
            status: 200,
            content_type,
            body,
            content_length: Some(len),
        }
    }
}

/// Serves canned responses on a loopback port. Returns the base URL and the
/// request targets seen so far.
pub async fn serve(routes: Vec<Route>) -> (String, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = seen.clone();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let routes = routes.clone();
            let log = log.clone();
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                let head = String::from_utf8_lossy(&request).to_string();
                let target = head.split_whitespace().nth(1).unwrap_or("/").to_string();
                log.lock().unwrap().push(target.clone());
                let path = target.split('?').next().unwrap_or("/");

                let route = routes.iter().find(|r| r.path == path).cloned().unwrap_or(Route {
                    path: "",
                    status: 404,
                    content_type: "text/plain",
                    body: b"not found".to_vec(),
                    content_length: Some(9),
                });

                let mut response = format!(
                    "HTTP/1.1 {} X\r\nContent-Type: {}\r\nConnection: close\r\n",
                    route.status, route.content_type
                );
                if let Some(len) = route.content_length {
                    response.push_str(&format!("Content-Length: {}\r\n", len));
                }
                response.push_str("\r\n");
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.write_all(&route.body).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (format!("http://{}", addr), seen)
}
