//! Integration tests for the fallback chain, driven by a scripted in-memory
//! model client. No network access.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use studylm::{
    CandidateError, ChatReply, ChatRequest, ClientError, ContentGenerator, DiagramType,
    GenerationConfig, GenerationProgressCallback, ModelClient, StudyError,
};

// ── Test helpers ─────────────────────────────────────────────────────────────

/// One scripted answer per call, in order.
enum Step {
    Reply(String),
    Fail(ClientError),
}

impl Step {
    fn reply(text: impl Into<String>) -> Self {
        Step::Reply(text.into())
    }
}

struct ScriptedClient {
    script: Mutex<VecDeque<Step>>,
    calls: Mutex<Vec<ChatRequest>>,
}

impl ScriptedClient {
    fn new(steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(steps.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn called_models(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.model.clone())
            .collect()
    }
}

#[async_trait]
impl ModelClient for ScriptedClient {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply, ClientError> {
        self.calls.lock().unwrap().push(request.clone());
        match self.script.lock().unwrap().pop_front() {
            Some(Step::Reply(text)) => Ok(ChatReply {
                content: text,
                prompt_tokens: 100,
                completion_tokens: 50,
            }),
            Some(Step::Fail(e)) => Err(e),
            None => panic!("model called more often than scripted"),
        }
    }
}

fn generator(client: Arc<ScriptedClient>, models: &[&str]) -> ContentGenerator {
    let config = GenerationConfig::builder()
        .models(models.iter().copied())
        .client(client)
        .build()
        .unwrap();
    ContentGenerator::new(config).unwrap()
}

const NEWTON: &str = r#"{"topic":"Newton's Laws of Motion","explanation":"Three laws describe how forces change motion.","resources":{"youtube":{"title":"Crash Course Physics","url":"https://youtube.com/watch?v=kKKM8Y-u7ds"},"website":{"title":"Khan Academy","url":"https://www.khanacademy.org/science/physics"},"article":{"title":"Britannica","url":"https://www.britannica.com/science/Newtons-laws-of-motion"}},"diagram":{"type":"Flowchart","steps":["Object at rest","Force applied","Acceleration = F/m","Equal and opposite reaction"]}}"#;

// ── Chain behaviour ──────────────────────────────────────────────────────────

#[tokio::test]
async fn first_valid_candidate_stops_the_chain() {
    let client = ScriptedClient::new(vec![Step::reply(NEWTON)]);
    let gen = generator(client.clone(), &["a", "b", "c"]);

    let out = gen
        .generate_detailed("Newton's laws", DiagramType::Flowchart)
        .await
        .unwrap();

    assert_eq!(out.model, "a");
    assert_eq!(client.called_models(), vec!["a"]);
    assert_eq!(out.attempts.len(), 1);
    assert!(out.attempts[0].error.is_none());
    assert_eq!(out.input_tokens, 100);
    assert_eq!(out.output_tokens, 50);
}

#[tokio::test]
async fn service_error_falls_through_to_next_model() {
    let client = ScriptedClient::new(vec![
        Step::Fail(ClientError::RateLimited {
            retry_after_secs: Some(3),
        }),
        Step::reply(r#"{"topic":"B"}"#),
    ]);
    let gen = generator(client.clone(), &["a", "b", "c"]);

    let out = gen.generate_detailed("x", DiagramType::None).await.unwrap();

    assert_eq!(out.model, "b");
    assert_eq!(out.content.topic, "B");
    assert_eq!(client.called_models(), vec!["a", "b"]);
    assert!(matches!(
        out.attempts[0].error,
        Some(CandidateError::ServiceCallFailed { ref model, .. }) if model == "a"
    ));
}

#[tokio::test]
async fn exhaustion_reports_the_last_error() {
    let client = ScriptedClient::new(vec![
        Step::Fail(ClientError::Timeout { secs: 60 }),
        Step::reply("I cannot answer that."),
        Step::Fail(ClientError::Status {
            status: 503,
            body: "over capacity".into(),
        }),
    ]);
    let gen = generator(client.clone(), &["a", "b", "c"]);

    let err = gen.generate("x", DiagramType::None).await.unwrap_err();

    assert_eq!(client.called_models(), vec!["a", "b", "c"]);
    match err {
        StudyError::AllCandidatesExhausted {
            attempts,
            last_error,
        } => {
            assert_eq!(attempts, 3);
            assert_eq!(last_error.model(), "c");
            assert!(matches!(last_error, CandidateError::ServiceCallFailed { .. }));
            assert!(last_error.to_string().contains("503"));
        }
        other => panic!("expected AllCandidatesExhausted, got {other:?}"),
    }
}

#[tokio::test]
async fn exhaustion_by_unparseable_answers() {
    let client = ScriptedClient::new(vec![Step::reply("no json"), Step::reply("still none")]);
    let gen = generator(client, &["a", "b"]);

    let err = gen.generate("x", DiagramType::None).await.unwrap_err();
    match err {
        StudyError::AllCandidatesExhausted { last_error, .. } => {
            assert!(matches!(
                last_error,
                CandidateError::UnparseableResponse { ref model, .. } if model == "b"
            ));
        }
        other => panic!("unexpected {other:?}"),
    }
}

// ── Extraction ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn prose_around_the_object_is_ignored() {
    let wrapped = format!("Sure! Here you go:\n{NEWTON}\nHope this helps.");
    let bare = ScriptedClient::new(vec![Step::reply(NEWTON)]);
    let noisy = ScriptedClient::new(vec![Step::reply(wrapped)]);

    let a = generator(bare, &["m"])
        .generate("x", DiagramType::Flowchart)
        .await
        .unwrap();
    let b = generator(noisy, &["m"])
        .generate("x", DiagramType::Flowchart)
        .await
        .unwrap();
    assert_eq!(a, b);
}

#[tokio::test]
async fn fenced_answer_is_accepted() {
    let client = ScriptedClient::new(vec![Step::reply(
        "```json\n{\"topic\": \"Cells\", \"explanation\": \"Units of life.\"}\n```",
    )]);
    let content = generator(client, &["m"])
        .generate("cells", DiagramType::None)
        .await
        .unwrap();
    assert_eq!(content.topic, "Cells");
    assert_eq!(content.explanation, "Units of life.");
}

#[tokio::test]
async fn braceless_answer_is_a_candidate_failure_not_an_abort() {
    let client = ScriptedClient::new(vec![
        Step::reply("Photosynthesis converts light into chemical energy."),
        Step::reply(r#"{"topic":"Photosynthesis"}"#),
    ]);
    let out = generator(client, &["a", "b"])
        .generate_detailed("photosynthesis", DiagramType::None)
        .await
        .unwrap();
    assert_eq!(out.model, "b");
    assert!(matches!(
        out.attempts[0].error,
        Some(CandidateError::UnparseableResponse { .. })
    ));
}

// ── Scenarios ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn newtons_laws_flowchart() {
    let client = ScriptedClient::new(vec![Step::reply(NEWTON)]);
    let content = generator(client.clone(), &["llama-3.3-70b-specdec"])
        .generate("Newton's laws", DiagramType::Flowchart)
        .await
        .unwrap();

    let expected: serde_json::Value = serde_json::from_str(NEWTON).unwrap();
    assert_eq!(serde_json::to_value(&content).unwrap(), expected);
    assert_eq!(content.diagram.kind, DiagramType::Flowchart);

    let calls = client.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].messages.len(), 1);
    let prompt = &calls[0].messages[0].content;
    assert!(prompt.contains("Newton's laws"));
    assert!(prompt.contains("Flowchart"));
    assert!((calls[0].temperature - 0.6).abs() < f32::EPSILON);
}

#[tokio::test]
async fn timeout_then_prose_then_valid_json() {
    let client = ScriptedClient::new(vec![
        Step::Fail(ClientError::Timeout { secs: 60 }),
        Step::reply("Here is an explanation without any structure."),
        Step::reply(r#"{"topic":"Entropy","explanation":"Disorder grows."}"#),
    ]);
    let out = generator(client, &["m1", "m2", "m3", "m4"])
        .generate_detailed("entropy", DiagramType::None)
        .await
        .unwrap();

    assert_eq!(out.model, "m3");
    assert_eq!(out.content.topic, "Entropy");
    assert_eq!(out.attempts.len(), 3);
    assert!(out.attempts[..2].iter().all(|a| a.error.is_some()));
}

#[tokio::test]
async fn diagram_type_follows_the_request_not_the_model() {
    let client = ScriptedClient::new(vec![Step::reply(
        r#"{"topic":"Taxonomy","diagram":{"type":"Flowchart","steps":["Kingdom","Phylum"," "]}}"#,
    )]);
    let content = generator(client, &["m"])
        .generate("taxonomy", DiagramType::TreeDiagram)
        .await
        .unwrap();
    assert_eq!(content.diagram.kind, DiagramType::TreeDiagram);
    assert_eq!(content.diagram.steps, vec!["Kingdom", "Phylum"]);
}

#[tokio::test]
async fn require_topic_rejects_topicless_objects() {
    let client = ScriptedClient::new(vec![
        Step::reply(r#"{"explanation":"no topic here"}"#),
        Step::reply(r#"{"topic":"Second"}"#),
    ]);
    let config = GenerationConfig::builder()
        .models(["a", "b"])
        .client(client)
        .require_topic(true)
        .build()
        .unwrap();
    let out = ContentGenerator::new(config)
        .unwrap()
        .generate_detailed("x", DiagramType::None)
        .await
        .unwrap();
    assert_eq!(out.model, "b");
}

#[tokio::test]
async fn topicless_objects_pass_by_default() {
    let client = ScriptedClient::new(vec![Step::reply(r#"{"explanation":"loose"}"#)]);
    let content = generator(client, &["a"])
        .generate("x", DiagramType::None)
        .await
        .unwrap();
    assert_eq!(content.topic, "");
    assert_eq!(content.explanation, "loose");
}

// ── Progress events ──────────────────────────────────────────────────────────

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl GenerationProgressCallback for Recorder {
    fn on_generation_start(&self, total: usize) {
        self.events.lock().unwrap().push(format!("start {total}"));
    }
    fn on_candidate_start(&self, model: &str, index: usize) {
        self.events.lock().unwrap().push(format!("try {model}#{index}"));
    }
    fn on_candidate_failed(&self, model: &str, _index: usize, _error: &str) {
        self.events.lock().unwrap().push(format!("fail {model}"));
    }
    fn on_generation_complete(&self, model: Option<&str>, attempts: usize) {
        self.events
            .lock()
            .unwrap()
            .push(format!("done {} {attempts}", model.unwrap_or("none")));
    }
}

#[tokio::test]
async fn progress_events_follow_chain_order() {
    let client = ScriptedClient::new(vec![
        Step::Fail(ClientError::Http("connection reset".into())),
        Step::reply(r#"{"topic":"T"}"#),
    ]);
    let recorder = Arc::new(Recorder::default());
    let config = GenerationConfig::builder()
        .models(["a", "b", "c"])
        .client(client)
        .progress_callback(recorder.clone())
        .build()
        .unwrap();

    ContentGenerator::new(config)
        .unwrap()
        .generate("x", DiagramType::None)
        .await
        .unwrap();

    assert_eq!(
        *recorder.events.lock().unwrap(),
        vec!["start 3", "try a#0", "fail a", "try b#1", "done b 2"]
    );
}

#[tokio::test]
async fn progress_reports_exhaustion() {
    let client = ScriptedClient::new(vec![Step::reply("nope")]);
    let recorder = Arc::new(Recorder::default());
    let config = GenerationConfig::builder()
        .models(["only"])
        .client(client)
        .progress_callback(recorder.clone())
        .build()
        .unwrap();

    let _ = ContentGenerator::new(config)
        .unwrap()
        .generate("x", DiagramType::None)
        .await;

    assert_eq!(
        recorder.events.lock().unwrap().last().map(String::as_str),
        Some("done none 1")
    );
}

// ── Sync wrapper ─────────────────────────────────────────────────────────────

#[test]
fn generate_sync_runs_outside_a_runtime() {
    let client = ScriptedClient::new(vec![Step::reply(r#"{"topic":"Sync"}"#)]);
    let content = generator(client, &["m"])
        .generate_sync("x", DiagramType::None)
        .unwrap();
    assert_eq!(content.topic, "Sync");
}
