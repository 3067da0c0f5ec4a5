//! Local stand-ins for the upstream search and profile services.

#![allow(clippy::unwrap_used, dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use scout_core::config::UpstreamConfig;
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// How a canned search reply ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ending {
    /// Terminating zero-length chunk.
    Clean,
    /// Connection dropped without the terminating chunk.
    Abort,
    /// Connection held open without the terminating chunk.
    Stall,
}

/// Raw HTTP/1.1 search upstream. Each entry of `chunks` goes out as its own
/// chunked-encoding frame, flushed separately. Request bodies are recorded.
pub struct SearchUpstream {
    pub base_url: String,
    pub requests: Arc<Mutex<Vec<String>>>,
}

pub async fn spawn_search_upstream(
    status: &'static str,
    chunks: &[&[u8]],
    ending: Ending,
) -> SearchUpstream {
    let chunks: Vec<Vec<u8>> = chunks.iter().map(|c| c.to_vec()).collect();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&requests);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let chunks = chunks.clone();
            let recorded = Arc::clone(&recorded);
            tokio::spawn(async move {
                let body = read_request(&mut socket).await;
                recorded.lock().unwrap().push(body);

                let head = format!(
                    "HTTP/1.1 {status}\r\ncontent-type: application/x-ndjson\r\n\
                     transfer-encoding: chunked\r\nconnection: close\r\n\r\n"
                );
                if socket.write_all(head.as_bytes()).await.is_err() {
                    return;
                }
                for chunk in chunks {
                    let frame_head = format!("{:x}\r\n", chunk.len());
                    let _ = socket.write_all(frame_head.as_bytes()).await;
                    let _ = socket.write_all(&chunk).await;
                    let _ = socket.write_all(b"\r\n").await;
                    let _ = socket.flush().await;
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
                match ending {
                    Ending::Clean => {
                        let _ = socket.write_all(b"0\r\n\r\n").await;
                        let _ = socket.flush().await;
                    }
                    Ending::Abort => {}
                    Ending::Stall => tokio::time::sleep(Duration::from_secs(30)).await,
                }
            });
        }
    });

    SearchUpstream {
        base_url: format!("http://{addr}"),
        requests,
    }
}

/// Upstream that accepts connections and never answers.
pub async fn spawn_silent_upstream() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    format!("http://{addr}")
}

/// A local address with nothing listening on it.
pub async fn closed_upstream() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

/// Profile upstream keyed by identifier:
/// `ada` found, `ghost` 020000, `broken` other code, `garbage` non-JSON,
/// `flaky` 502, anything else 404.
pub async fn spawn_profile_upstream() -> String {
    async fn bio(Path(id): Path<String>) -> Response {
        match id.as_str() {
            "ada" => Json(json!({
                "person": {"name": "Ada Lovelace", "publicId": "ada"},
                "strengths": [{"name": "mathematics"}]
            }))
            .into_response(),
            "ghost" => Json(json!({
                "errors": [{"code": "020000", "message": "Bio not found"}]
            }))
            .into_response(),
            "broken" => Json(json!({
                "errors": [{"code": "011002", "message": "Genome unavailable"}]
            }))
            .into_response(),
            "garbage" => (StatusCode::OK, "<html>oops</html>").into_response(),
            "flaky" => (StatusCode::BAD_GATEWAY, "upstream hiccup").into_response(),
            _ => StatusCode::NOT_FOUND.into_response(),
        }
    }

    let app = Router::new().route("/bios/{id}", get(bio));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

pub fn upstream_config(search_base: &str, profile_base: &str) -> UpstreamConfig {
    UpstreamConfig {
        search_url: format!("{search_base}/api/entities/_searchStream"),
        profile_base_url: format!("{profile_base}/bios"),
        search_timeout_secs: 5,
        profile_timeout_secs: 5,
        min_query_chars: 2,
    }
}

/// Read one request and return its body.
async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut tmp = [0u8; 1024];
    loop {
        let Ok(n) = socket.read(&mut tmp).await else {
            return String::new();
        };
        if n == 0 {
            return String::new();
        }
        buf.extend_from_slice(&tmp[..n]);
        let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
            continue;
        };
        let head = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
        let len = head
            .lines()
            .find_map(|l| l.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(0);
        while buf.len() < end + 4 + len {
            match socket.read(&mut tmp).await {
                Ok(0) | Err(_) => break,
                Ok(n) => buf.extend_from_slice(&tmp[..n]),
            }
        }
        return String::from_utf8_lossy(&buf[end + 4..]).into_owned();
    }
}
