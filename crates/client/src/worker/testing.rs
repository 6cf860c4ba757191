//! In-process network double for worker tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use aerofisc_core::{AppConfig, Error, Request, Response, ResponseType};
use async_trait::async_trait;
use tokio::sync::watch;

use super::WorkerConfig;
use crate::fetch::Fetcher;

pub(crate) const ORIGIN: &str = "https://app.test";

pub(crate) fn absolute(target: &str) -> String {
    if target.contains("://") { target.to_string() } else { format!("{ORIGIN}{target}") }
}

pub(crate) fn get(target: &str) -> Request {
    Request::get(url::Url::parse(&absolute(target)).unwrap())
}

pub(crate) fn worker_config() -> WorkerConfig {
    WorkerConfig::from_app(&AppConfig { origin: ORIGIN.into(), ..Default::default() }).unwrap()
}

enum Script {
    Respond(Response),
    Fail(String),
}

/// Answers from a script keyed by absolute URL; unknown URLs get a 404.
pub(crate) struct ScriptedFetcher {
    scripts: Mutex<HashMap<String, Script>>,
    calls: Mutex<Vec<String>>,
    offline: AtomicBool,
    gate: watch::Sender<bool>,
}

impl ScriptedFetcher {
    pub(crate) fn new() -> Self {
        let (gate, _) = watch::channel(true);
        Self { scripts: Mutex::new(HashMap::new()), calls: Mutex::new(Vec::new()), offline: AtomicBool::new(false), gate }
    }

    pub(crate) fn respond(&self, target: &str, status: u16, body: &'static str) {
        let url = absolute(target);
        let response = Response::new(status, ResponseType::Basic, url.clone(), body);
        self.respond_with(&url, response);
    }

    pub(crate) fn respond_with(&self, target: &str, response: Response) {
        self.scripts
            .lock()
            .unwrap()
            .insert(absolute(target), Script::Respond(response));
    }

    pub(crate) fn fail(&self, target: &str) {
        self.scripts
            .lock()
            .unwrap()
            .insert(absolute(target), Script::Fail("connection refused".into()));
    }

    /// Every request fails until [`ScriptedFetcher::online`].
    pub(crate) fn offline(&self) {
        self.offline.store(true, Ordering::SeqCst);
    }

    pub(crate) fn online(&self) {
        self.offline.store(false, Ordering::SeqCst);
    }

    /// Park every fetch until [`ScriptedFetcher::release`].
    pub(crate) fn hold(&self) {
        self.gate.send_replace(false);
    }

    pub(crate) fn release(&self) {
        self.gate.send_replace(true);
    }

    pub(crate) fn calls(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|u| *u == url).count()
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let url = request.url.to_string();
        self.calls.lock().unwrap().push(url.clone());

        let mut gate = self.gate.subscribe();
        let _ = gate.wait_for(|open| *open).await;

        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Network(format!("{url}: offline")));
        }

        match self.scripts.lock().unwrap().get(&url) {
            Some(Script::Respond(response)) => Ok(response.duplicate()),
            Some(Script::Fail(reason)) => Err(Error::Network(format!("{url}: {reason}"))),
            None => Ok(Response::new(404, ResponseType::Basic, url, "not found")),
        }
    }
}
