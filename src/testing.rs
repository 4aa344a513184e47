//! Test doubles for the model service and the geospatial backend.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::geo::{BackendError, Expr, GeoBackend, RasterResult, Region};
use crate::llm::{ChatRequest, CompletionService, LlmError};

/// A configured model reply.
pub enum Scripted {
    Reply(String),
    Unavailable,
}

/// Model double that replays scripted responses in order.
///
/// Once the script runs out it keeps answering with a final answer, so a loop
/// bug shows up as a failed assertion rather than a hang.
pub struct ScriptedModel {
    script: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<ChatRequest>>,
    delay: Duration,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
        }
    }

    pub fn with_response(self, content: &str) -> Self {
        self.script
            .lock()
            .unwrap()
            .push_back(Scripted::Reply(content.to_string()));
        self
    }

    pub fn with_unavailable(self) -> Self {
        self.script.lock().unwrap().push_back(Scripted::Unavailable);
        self
    }

    /// Simulated latency per request.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl CompletionService for ScriptedModel {
    async fn complete(&self, request: ChatRequest) -> Result<String, LlmError> {
        self.requests.lock().unwrap().push(request);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Scripted::Reply(content)) => Ok(content),
            Some(Scripted::Unavailable) => Err(LlmError::Status {
                status: 503,
                body: "service unavailable".to_string(),
            }),
            None => Ok("Final Answer: script exhausted".to_string()),
        }
    }
}

/// Model double that answers from the question it is given.
///
/// Replies depend only on the request, so overlapping routing calls sharing
/// one instance each get a consistent conversation.
pub struct KeywordModel {
    rules: Vec<(String, String)>,
    questions: Mutex<Vec<String>>,
    delay: Duration,
}

impl KeywordModel {
    pub fn new(delay: Duration) -> Self {
        Self {
            rules: Vec::new(),
            questions: Mutex::new(Vec::new()),
            delay,
        }
    }

    /// Pick `tool` for questions containing `keyword`.
    pub fn with_rule(mut self, keyword: &str, tool: &str) -> Self {
        self.rules.push((keyword.to_string(), tool.to_string()));
        self
    }

    /// First line of every request, in arrival order.
    pub fn questions(&self) -> Vec<String> {
        self.questions.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl CompletionService for KeywordModel {
    async fn complete(&self, request: ChatRequest) -> Result<String, LlmError> {
        let question = request.user_prompt.lines().next().unwrap_or_default().to_string();
        self.questions.lock().unwrap().push(question.clone());
        tokio::time::sleep(self.delay).await;

        if request.user_prompt.contains("\nObservation:") {
            return Ok(format!(
                " I now know the final answer\nFinal Answer: answered {}",
                question
            ));
        }
        let reply = self
            .rules
            .iter()
            .find(|(keyword, _)| question.contains(keyword.as_str()))
            .map(|(keyword, tool)| {
                format!(" Matched {}.\nAction: {}\nAction Input: {}", keyword, tool, keyword)
            })
            .unwrap_or_else(|| "no idea".to_string());
        Ok(reply)
    }
}

/// Backend double that hands out sequential handles.
pub struct StubBackend {
    evaluations: Mutex<Vec<Expr>>,
    counter: AtomicUsize,
    pixel_count: u64,
    unavailable: bool,
    delay: Duration,
}

impl StubBackend {
    pub fn new() -> Self {
        Self {
            evaluations: Mutex::new(Vec::new()),
            counter: AtomicUsize::new(0),
            pixel_count: 1_024,
            unavailable: false,
            delay: Duration::ZERO,
        }
    }

    /// Every call fails with a 503.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::new()
        }
    }

    pub fn with_pixel_count(mut self, count: u64) -> Self {
        self.pixel_count = count;
        self
    }

    /// Simulated latency per evaluation.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn evaluation_count(&self) -> usize {
        self.evaluations.lock().unwrap().len()
    }

    pub fn evaluations(&self) -> Vec<Expr> {
        self.evaluations.lock().unwrap().clone()
    }

    fn check(&self) -> Result<(), BackendError> {
        if self.unavailable {
            return Err(BackendError::Status {
                status: 503,
                body: "backend offline".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl GeoBackend for StubBackend {
    async fn evaluate(&self, expr: &Expr, region: &Region) -> Result<RasterResult, BackendError> {
        self.check()?;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.evaluations.lock().unwrap().push(expr.clone());
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        Ok(RasterResult {
            handle: format!("raster-{}", n),
            expression: expr.clone(),
            region: region.clone(),
        })
    }

    async fn count_pixels(&self, _layer: &RasterResult, _scale_m: u32) -> Result<u64, BackendError> {
        self.check()?;
        Ok(self.pixel_count)
    }
}
