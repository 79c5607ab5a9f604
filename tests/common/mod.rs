//! Shared fixtures for transform queue integration tests
//!
//! `PlanetStore` is a scripted target: each path can be told to apply, reject,
//! wait on a oneshot trigger, or panic. It records every call and the highest number
//! of operations that were ever in flight at once.

#![allow(dead_code)]

use serde_json::Value;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use transform_queue::{
    PatchOp, PatchOperation, QueueConfig, TransformQueue, Transformable, Transformation,
    DID_COMPLETE, DID_FAIL, DID_TRANSFORM,
};

pub const WAIT: Duration = Duration::from_secs(2);

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn mercury() -> PatchOperation {
    PatchOperation::add(["planets", "123"], Value::from("Mercury"))
}

pub fn venus() -> PatchOperation {
    PatchOperation::add(["planets", "234"], Value::from("Venus"))
}

pub fn earth() -> PatchOperation {
    PatchOperation::add(["planets", "345"], Value::from("Earth"))
}

pub enum Script {
    Apply,
    Reject(String),
    Wait(oneshot::Receiver<Result<(), String>>),
    Panic,
    PanicPending,
}

type Planets = Arc<Mutex<BTreeMap<String, Value>>>;

#[derive(Default)]
pub struct PlanetStore {
    planets: Planets,
    calls: Mutex<Vec<PatchOperation>>,
    scripts: Mutex<HashMap<String, VecDeque<Script>>>,
    active: Arc<AtomicUsize>,
    max_active: Arc<AtomicUsize>,
}

impl PlanetStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue a scripted response for the next call on `op`'s path.
    /// Paths without a script apply immediately.
    pub fn script(&self, op: &PatchOperation, script: Script) {
        self.scripts
            .lock()
            .unwrap()
            .entry(op.path_string())
            .or_default()
            .push_back(script);
    }

    /// Make the next call on `op`'s path pending until the returned sender fires.
    pub fn gate(&self, op: &PatchOperation) -> oneshot::Sender<Result<(), String>> {
        let (sender, receiver) = oneshot::channel();
        self.script(op, Script::Wait(receiver));
        sender
    }

    pub fn calls(&self) -> Vec<PatchOperation> {
        self.calls.lock().unwrap().clone()
    }

    pub fn planets(&self) -> BTreeMap<String, Value> {
        self.planets.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    fn apply(planets: &Planets, op: &PatchOperation) {
        let mut planets = planets.lock().unwrap();
        match op.op {
            PatchOp::Add | PatchOp::Replace => {
                planets.insert(op.path_string(), op.value.clone());
            }
            PatchOp::Remove => {
                planets.remove(&op.path_string());
            }
        }
    }
}

impl Transformable for PlanetStore {
    type Operation = PatchOperation;
    type Output = ();
    type Error = String;

    fn transform(&self, op: &PatchOperation) -> Transformation<(), String> {
        self.calls.lock().unwrap().push(op.clone());
        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now_active, Ordering::SeqCst);

        let script = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&op.path_string())
            .and_then(VecDeque::pop_front)
            .unwrap_or(Script::Apply);

        match script {
            Script::Apply => {
                Self::apply(&self.planets, op);
                self.active.fetch_sub(1, Ordering::SeqCst);
                Transformation::ok(())
            }
            Script::Reject(reason) => {
                self.active.fetch_sub(1, Ordering::SeqCst);
                Transformation::err(reason)
            }
            Script::Wait(receiver) => {
                let planets = Arc::clone(&self.planets);
                let active = Arc::clone(&self.active);
                let op = op.clone();
                Transformation::pending(async move {
                    let outcome = receiver
                        .await
                        .unwrap_or_else(|_| Err("trigger dropped".to_string()));
                    if outcome.is_ok() {
                        Self::apply(&planets, &op);
                    }
                    active.fetch_sub(1, Ordering::SeqCst);
                    outcome
                })
            }
            Script::Panic => {
                self.active.fetch_sub(1, Ordering::SeqCst);
                panic!("store crashed applying {}", op.path_string());
            }
            Script::PanicPending => {
                let active = Arc::clone(&self.active);
                let path = op.path_string();
                Transformation::pending(async move {
                    active.fetch_sub(1, Ordering::SeqCst);
                    crash(&path)
                })
            }
        }
    }
}

fn crash(path: &str) -> Result<(), String> {
    panic!("store crashed applying {}", path)
}

pub fn queue(store: &Arc<PlanetStore>) -> TransformQueue<PlanetStore> {
    TransformQueue::new(Arc::clone(store))
}

pub fn manual_queue(store: &Arc<PlanetStore>) -> TransformQueue<PlanetStore> {
    TransformQueue::with_config(
        Arc::clone(store),
        QueueConfig::default()
            .with_name("manual")
            .with_auto_process(false),
    )
}

/// Record every lifecycle event as a string, e.g. `didTransform:planets/123`.
pub fn record_events(queue: &TransformQueue<PlanetStore>) -> Arc<Mutex<Vec<String>>> {
    let log = Arc::new(Mutex::new(Vec::new()));
    for name in [DID_TRANSFORM, DID_COMPLETE, DID_FAIL] {
        let log = Arc::clone(&log);
        queue.on(name, move |event| {
            let entry = match (event.operation(), event.error()) {
                (Some(op), Some(error)) => format!("{}:{}:{}", name, op.path_string(), error),
                (Some(op), None) => format!("{}:{}", name, op.path_string()),
                _ => name.to_string(),
            };
            log.lock().unwrap().push(entry);
        });
    }
    log
}
