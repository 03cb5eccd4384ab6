//! Testing utilities for the Structure Forge workspace
//!
//! Recording and scripted stand-ins for the world sink and the generation
//! backend, plus blueprint fixtures.

#![allow(missing_docs)]

use async_trait::async_trait;
use forge_blueprint::{CommandRecord, PlacementMode, Vec3};
use forge_core::{ForgeConfig, GenerationBackend, GenerationError, SinkError, WorldSink};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Sink that accepts everything and remembers what it saw
#[derive(Debug, Default)]
pub struct RecordingSink {
    commands: Mutex<Vec<CommandRecord>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> Vec<CommandRecord> {
        self.commands.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.commands.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.lock().is_empty()
    }
}

#[async_trait]
impl WorldSink for RecordingSink {
    async fn submit(&self, command: &CommandRecord) -> Result<(), SinkError> {
        self.commands.lock().push(command.clone());
        Ok(())
    }
}

/// Sink that rejects `failing` out of every `period` submissions, in
/// submission order
#[derive(Debug)]
pub struct PatternSink {
    failing: usize,
    period: usize,
    submitted: AtomicUsize,
}

impl PatternSink {
    pub fn new(failing: usize, period: usize) -> Self {
        Self {
            failing,
            period: period.max(1),
            submitted: AtomicUsize::new(0),
        }
    }

    pub fn always_failing() -> Self {
        Self::new(1, 1)
    }

    pub fn submitted(&self) -> usize {
        self.submitted.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WorldSink for PatternSink {
    async fn submit(&self, command: &CommandRecord) -> Result<(), SinkError> {
        let n = self.submitted.fetch_add(1, Ordering::SeqCst);
        if n % self.period < self.failing {
            Err(SinkError::Rejected(format!("refused {command}")))
        } else {
            Ok(())
        }
    }
}

/// Backend answering from a queue of canned responses
///
/// When the queue is empty the fallback text (if any) is returned. With a
/// hold installed every call signals `entered` and then waits for the hold
/// to be released before answering.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    responses: Mutex<VecDeque<Result<String, GenerationError>>>,
    fallback: Option<String>,
    calls: Mutex<Vec<(String, String)>>,
    entered: Arc<Notify>,
    hold: Option<Arc<Notify>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every call with `text`
    pub fn always(text: impl Into<String>) -> Self {
        Self {
            fallback: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn push_response(&self, text: impl Into<String>) {
        self.responses.lock().push_back(Ok(text.into()));
    }

    pub fn push_error(&self, error: GenerationError) {
        self.responses.lock().push_back(Err(error));
    }

    /// Block each call until `hold` is notified
    pub fn with_hold(mut self, hold: Arc<Notify>) -> Self {
        self.hold = Some(hold);
        self
    }

    /// Notified once per call, as soon as the call starts
    pub fn entered(&self) -> Arc<Notify> {
        Arc::clone(&self.entered)
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// `(prompt, model)` of every call so far
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    async fn generate(&self, prompt: &str, model: &str) -> Result<String, GenerationError> {
        self.calls.lock().push((prompt.to_string(), model.to_string()));
        self.entered.notify_one();

        if let Some(hold) = &self.hold {
            hold.notified().await;
        }

        let next = self.responses.lock().pop_front();
        match next {
            Some(result) => result,
            None => self
                .fallback
                .clone()
                .ok_or_else(|| GenerationError::Unreachable("no scripted response left".to_string())),
        }
    }
}

/// Config with no pacing delay, for fast executor runs
pub fn fast_config() -> ForgeConfig {
    let mut config = ForgeConfig::new();
    config.execution.inter_batch_delay_ms = 0;
    config
}

/// `n` single-cell commands along the X axis
pub fn point_commands(n: usize) -> Vec<CommandRecord> {
    (0..n)
        .map(|i| {
            let x = i32::try_from(i).unwrap_or(i32::MAX);
            CommandRecord::cell(Vec3::new(x, 64, 0), "minecraft:stone", PlacementMode::Point)
        })
        .collect()
}

/// Wrap `blocks` in a zero-origin blueprint document
pub fn blueprint_doc(blocks: Value) -> Value {
    json!({
        "structure": {
            "position": { "x": 0, "y": 0, "z": 0 },
            "blocks": blocks
        }
    })
}

/// Small cottage: floor, hollow walls, a door gap
pub fn cottage_blueprint() -> Value {
    blueprint_doc(json!([
        {
            "position": { "x": 0, "y": 0, "z": 0 },
            "placement_mode": "fill",
            "fill_dimensions": { "length": 5, "width": 5, "height": 1 },
            "block": { "id": "oak_planks" },
            "comment": "floor"
        },
        {
            "position": { "x": 0, "y": 1, "z": 0 },
            "placement_mode": "hollow_box",
            "fill_dimensions": { "length": 5, "width": 5, "height": 3 },
            "block": { "id": "cobblestone" },
            "comment": "walls"
        },
        {
            "position": { "x": 2, "y": 1, "z": 0 },
            "block": { "id": "air" },
            "comment": "door"
        }
    ]))
}

/// Backend-style response text: description line plus fenced JSON
pub fn response_text(description: &str, document: &Value) -> String {
    format!("{description}\n```json\n{document:#}\n```\n")
}

/// Response for [`cottage_blueprint`]
pub fn cottage_response() -> String {
    response_text("Cozy cobblestone cottage", &cottage_blueprint())
}

/// Response whose blueprint has a fill without dimensions
pub fn invalid_response() -> String {
    response_text(
        "Broken tower",
        &blueprint_doc(json!([
            { "position": { "x": 0, "y": 0, "z": 0 }, "placement_mode": "fill", "block": { "id": "stone" } }
        ])),
    )
}
