use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::models::NewVisitor;
use crate::repositories::VisitStore;

const UNKNOWN_IP: &str = "unknown";

/// 访问记录队列：请求路径只做 try_send，落库由后台 worker 完成
#[derive(Clone)]
pub struct VisitRecorder {
    tx: mpsc::Sender<NewVisitor>,
}

impl VisitRecorder {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<NewVisitor>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    pub fn spawn(store: Arc<dyn VisitStore>, capacity: usize) -> (Self, JoinHandle<()>) {
        let (recorder, rx) = Self::channel(capacity);
        (recorder, spawn_worker(store, rx))
    }

    /// Returns false when the visit was dropped.
    pub fn record(&self, visit: NewVisitor) -> bool {
        match self.tx.try_send(visit) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(visit)) => {
                tracing::debug!("visit queue full, dropping visit to {}", visit.endpoint);
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!("visit worker stopped, dropping visit");
                false
            }
        }
    }
}

pub fn spawn_worker(store: Arc<dyn VisitStore>, mut rx: mpsc::Receiver<NewVisitor>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(visit) = rx.recv().await {
            if let Err(e) = store.record_visit(visit).await {
                tracing::error!("记录访问失败: {}", e);
            }
        }
        tracing::debug!("visit worker exiting");
    })
}

fn client_ip(request: &Request, peer: Option<SocketAddr>) -> String {
    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_string)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| UNKNOWN_IP.to_string())
}

pub async fn track_visit(
    State(recorder): State<VisitRecorder>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Response {
    let visit = NewVisitor {
        ip_address: client_ip(&request, connect_info.map(|ConnectInfo(addr)| addr)),
        endpoint: request.uri().path().to_string(),
        visited_at: Utc::now(),
    };
    recorder.record(visit);
    next.run(request).await
}
