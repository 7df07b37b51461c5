use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use privacy_mail_submit::services::{
    DiagnosticSink, Endpoints, ExtractStrategy, FormPayload, ResponseArrayExtractor,
    SubmissionCoordinator, Transport, TransportError, TransportResponse,
};
use privacy_mail_submit::workflow::{ActionLabel, Command, CommandOutcome, Workflow};
use privacy_mail_submit::{SendSelectedPolicy, Stage, UploadContext, ValidationError, WorkflowState};
use serde_json::{json, Value};
use tokio::sync::Notify;
use tokio_test::{assert_err, assert_ok};

/// 预设的一次回复
enum Reply {
    Status(u16, String),
    /// 等待 gate 放行后再回复
    Gated(u16, String),
    Fail(String),
}

/// 记录所有请求、按顺序回复的传输
#[derive(Default)]
struct RecordingTransport {
    replies: Mutex<VecDeque<Reply>>,
    calls: Mutex<Vec<(String, FormPayload)>>,
    gate: Arc<Notify>,
}

impl RecordingTransport {
    fn push(&self, reply: Reply) {
        self.replies.lock().unwrap().push_back(reply);
    }

    fn calls(&self) -> Vec<(String, FormPayload)> {
        self.calls.lock().unwrap().clone()
    }
}

impl Transport for RecordingTransport {
    async fn post_form(
        &self,
        url: &str,
        form: FormPayload,
    ) -> Result<TransportResponse, TransportError> {
        self.calls.lock().unwrap().push((url.to_string(), form));
        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            Some(Reply::Status(status, body)) => Ok(TransportResponse { status, body }),
            Some(Reply::Gated(status, body)) => {
                self.gate.notified().await;
                Ok(TransportResponse { status, body })
            }
            Some(Reply::Fail(msg)) => Err(msg.into()),
            None => Err("no reply scripted".into()),
        }
    }
}

const THREE_FIELDS: &str = r#"분석 결과: [["이름","홍길동",225,266],["주민등록번호","000101-1234567",225,300],["전화번호","010-1234-5678",225,330]] 끝"#;

fn workflow(policy: SendSelectedPolicy) -> Workflow<RecordingTransport> {
    let coordinator = SubmissionCoordinator::new(
        RecordingTransport::default(),
        Endpoints {
            analyze: "http://hooks/analyze".to_string(),
            send: "http://hooks/send".to_string(),
            select: "http://hooks/choice".to_string(),
        },
        Arc::new(DiagnosticSink::default()),
    );
    Workflow::new(
        coordinator,
        ResponseArrayExtractor::new(ExtractStrategy::Auto),
        policy,
    )
}

fn upload() -> UploadContext {
    UploadContext::new("tests.pdf", b"%PDF-1.7".to_vec())
        .with_title("개인정보 확인")
        .with_recipient("hong@example.com")
        .with_body("확인 부탁드립니다")
}

fn transport(wf: &Workflow<RecordingTransport>) -> &RecordingTransport {
    wf.coordinator().transport()
}

fn sent_fields(form: &FormPayload, name: &str) -> Value {
    serde_json::from_str(form.text_value(name).expect("字段缺失")).unwrap()
}

/// 选择文件并完成一次检查，检测到三个字段
async fn reviewing_with_three(policy: SendSelectedPolicy) -> Workflow<RecordingTransport> {
    let wf = workflow(policy);
    wf.dispatch(Command::SelectFile(upload())).await.unwrap();
    transport(&wf).push(Reply::Status(200, THREE_FIELDS.to_string()));
    let outcome = wf.submit(Stage::Analyze).await.unwrap();
    assert_eq!(outcome, CommandOutcome::FieldsDetected { count: 3 });
    assert_eq!(wf.state(), WorkflowState::Reviewing);
    wf
}

#[tokio::test]
async fn test_analyze_without_file_is_rejected_locally() {
    let wf = workflow(SendSelectedPolicy::Repeatable);
    let err = assert_err!(wf.submit(Stage::Analyze).await);

    assert_eq!(err, ValidationError::MissingFile);
    assert!(transport(&wf).calls().is_empty());
    assert_eq!(wf.state(), WorkflowState::Idle);
}

#[tokio::test]
async fn test_analyze_populates_store_all_selected() {
    let wf = reviewing_with_three(SendSelectedPolicy::Repeatable).await;

    let views = wf.views();
    assert_eq!(views.len(), 3);
    assert!(views.iter().all(|v| v.selected));
    assert_eq!(views[1].type_label, "주민등록번호");

    let calls = transport(&wf).calls();
    assert_eq!(calls[0].0, "http://hooks/analyze");
    assert_eq!(calls[0].1.text_value("uploadedBaseName"), Some("tests"));
    assert!(wf.action(Stage::SendAll).enabled);
    assert!(wf.action(Stage::SendSelected).enabled);
}

#[tokio::test]
async fn test_deselected_record_is_not_sent() {
    let wf = reviewing_with_three(SendSelectedPolicy::Repeatable).await;
    assert_ok!(wf.dispatch(Command::Toggle { index: 1, selected: false }).await);

    transport(&wf).push(Reply::Status(200, "queued".to_string()));
    let outcome = wf.submit(Stage::SendAll).await.unwrap();
    assert_eq!(
        outcome,
        CommandOutcome::Sent {
            stage: Stage::SendAll,
            status: 200
        }
    );

    let calls = transport(&wf).calls();
    let (url, form) = &calls[1];
    assert_eq!(url, "http://hooks/send");
    assert_eq!(form.text_value("action"), Some("submit"));
    assert_eq!(form.text_value("recipient"), Some("hong@example.com"));
    assert_eq!(
        sent_fields(form, "requiredFields"),
        json!([
            {"type": "이름", "value": "홍길동", "x": 225, "y": 266},
            {"type": "전화번호", "value": "010-1234-5678", "x": 225, "y": 330}
        ])
    );
    assert!(!form.text_value("requiredFields").unwrap().contains("selected"));
}

#[tokio::test]
async fn test_send_all_success_disables_until_new_file() {
    let wf = reviewing_with_three(SendSelectedPolicy::Repeatable).await;
    transport(&wf).push(Reply::Status(200, String::new()));
    wf.submit(Stage::SendAll).await.unwrap();

    let action = wf.action(Stage::SendAll);
    assert!(!action.enabled);
    assert_eq!(action.label, ActionLabel::Completed);
    assert_eq!(
        wf.submit(Stage::SendAll).await,
        Err(ValidationError::AlreadyCompleted {
            stage: Stage::SendAll
        })
    );

    wf.dispatch(Command::SelectFile(upload())).await.unwrap();
    assert_eq!(wf.state(), WorkflowState::Idle);
    assert!(wf.views().is_empty());
    assert_eq!(wf.action(Stage::SendAll).label, ActionLabel::Ready);
}

#[tokio::test]
async fn test_send_selected_with_empty_selection_makes_no_call() {
    let wf = reviewing_with_three(SendSelectedPolicy::Repeatable).await;
    wf.dispatch(Command::ClearAll).await.unwrap();
    let calls_before = transport(&wf).calls().len();

    assert_eq!(
        wf.submit(Stage::SendSelected).await,
        Err(ValidationError::NoSelection)
    );
    assert_eq!(transport(&wf).calls().len(), calls_before);
    assert_eq!(wf.state(), WorkflowState::Reviewing);
    assert_eq!(wf.action(Stage::SendSelected).label, ActionLabel::Ready);
}

#[tokio::test]
async fn test_send_all_with_invalid_recipient_makes_no_call() {
    let wf = reviewing_with_three(SendSelectedPolicy::Repeatable).await;
    wf.dispatch(Command::UpdateMetadata {
        title: "제목".to_string(),
        recipient: "not-an-address".to_string(),
        body: String::new(),
    })
    .await
    .unwrap();

    let err = wf.submit(Stage::SendAll).await.unwrap_err();
    assert!(matches!(err, ValidationError::InvalidRecipient { .. }));
    assert_eq!(transport(&wf).calls().len(), 1);
    assert!(wf.action(Stage::SendAll).enabled);
}

#[tokio::test]
async fn test_send_selected_goes_to_marking_endpoint() {
    let wf = reviewing_with_three(SendSelectedPolicy::Repeatable).await;
    wf.dispatch(Command::Toggle { index: 0, selected: false }).await.unwrap();

    transport(&wf).push(Reply::Status(200, String::new()));
    wf.submit(Stage::SendSelected).await.unwrap();

    let calls = transport(&wf).calls();
    let (url, form) = &calls[1];
    assert_eq!(url, "http://hooks/choice");
    assert_eq!(form.text_value("fileName"), Some("tests.pdf"));
    assert_eq!(sent_fields(form, "selectedFields").as_array().unwrap().len(), 2);

    let action = wf.action(Stage::SendSelected);
    assert!(action.enabled);
    assert_eq!(action.label, ActionLabel::Completed);
}

#[tokio::test]
async fn test_send_selected_once_policy() {
    let wf = reviewing_with_three(SendSelectedPolicy::Once).await;
    transport(&wf).push(Reply::Status(200, String::new()));
    wf.submit(Stage::SendSelected).await.unwrap();

    assert!(!wf.action(Stage::SendSelected).enabled);
    assert!(matches!(
        wf.submit(Stage::SendSelected).await,
        Err(ValidationError::AlreadyCompleted { .. })
    ));
}

#[tokio::test]
async fn test_analyze_transport_failure_keeps_previous_state() {
    let wf = reviewing_with_three(SendSelectedPolicy::Repeatable).await;
    wf.dispatch(Command::Toggle { index: 2, selected: false }).await.unwrap();
    let before = wf.context().store.records().to_vec();
    let generation = wf.context().store.generation();

    transport(&wf).push(Reply::Fail("connection refused".to_string()));
    let outcome = wf.submit(Stage::Analyze).await.unwrap();

    assert!(matches!(
        outcome,
        CommandOutcome::StageFailed {
            stage: Stage::Analyze,
            status: 0,
            ..
        }
    ));
    assert_eq!(wf.state(), WorkflowState::Reviewing);
    assert!(wf.action(Stage::Analyze).enabled);
    assert_eq!(wf.context().store.records(), before.as_slice());
    assert_eq!(wf.context().store.generation(), generation);
}

#[tokio::test]
async fn test_analyze_failure_from_idle_returns_to_idle() {
    let wf = workflow(SendSelectedPolicy::Repeatable);
    wf.dispatch(Command::SelectFile(upload())).await.unwrap();
    transport(&wf).push(Reply::Status(502, "bad gateway".to_string()));

    let outcome = wf.submit(Stage::Analyze).await.unwrap();
    assert_eq!(
        outcome,
        CommandOutcome::StageFailed {
            stage: Stage::Analyze,
            status: 502,
            body: "bad gateway".to_string()
        }
    );
    assert_eq!(wf.state(), WorkflowState::Idle);
    assert!(wf.context().upload.is_some());
    assert!(wf.action(Stage::Analyze).enabled);

    let diag = wf
        .coordinator()
        .diagnostics()
        .last_for(Stage::Analyze)
        .unwrap();
    assert_eq!(diag.status, 502);
    assert_eq!(diag.detail, "bad gateway");
}

#[tokio::test]
async fn test_unparsable_analyze_reply_means_zero_fields() {
    let wf = workflow(SendSelectedPolicy::Repeatable);
    wf.dispatch(Command::SelectFile(upload())).await.unwrap();
    transport(&wf).push(Reply::Status(200, "Workflow was started".to_string()));

    assert_eq!(
        wf.submit(Stage::Analyze).await.unwrap(),
        CommandOutcome::NoFieldsDetected
    );
    assert_eq!(wf.state(), WorkflowState::Reviewing);
    assert!(wf.views().is_empty());
    assert_eq!(
        wf.submit(Stage::SendSelected).await,
        Err(ValidationError::NoSelection)
    );
}

#[tokio::test]
async fn test_reanalyze_replaces_store_wholesale() {
    let wf = reviewing_with_three(SendSelectedPolicy::Repeatable).await;
    wf.dispatch(Command::Toggle { index: 0, selected: false }).await.unwrap();
    let generation = wf.context().store.generation();

    transport(&wf).push(Reply::Status(
        200,
        r#"[{"type":"email","value":"a@b.kr"}]"#.to_string(),
    ));
    assert_eq!(
        wf.submit(Stage::Analyze).await.unwrap(),
        CommandOutcome::FieldsDetected { count: 1 }
    );

    let views = wf.views();
    assert_eq!(views.len(), 1);
    assert!(views[0].selected);
    assert_eq!(wf.context().store.generation(), generation + 1);
}

#[tokio::test]
async fn test_toggles_during_flight_apply_to_next_submission() {
    let wf = reviewing_with_three(SendSelectedPolicy::Repeatable).await;
    let t = transport(&wf);
    t.push(Reply::Gated(200, String::new()));
    t.push(Reply::Status(200, String::new()));

    let (in_flight, ()) = tokio::join!(wf.submit(Stage::SendAll), async {
        assert_eq!(wf.state(), WorkflowState::SendingAll);
        assert_eq!(wf.action(Stage::SendAll).label, ActionLabel::InProgress);
        assert_eq!(
            wf.submit(Stage::SendAll).await,
            Err(ValidationError::AlreadyInFlight {
                stage: Stage::SendAll
            })
        );
        assert!(matches!(
            wf.submit(Stage::Analyze).await,
            Err(ValidationError::ActionUnavailable { .. })
        ));

        let toggled = wf
            .dispatch(Command::Toggle { index: 0, selected: false })
            .await
            .unwrap();
        assert_eq!(toggled, CommandOutcome::Toggled { applied: true });
        t.gate.notify_one();
    });
    assert!(matches!(in_flight, Ok(CommandOutcome::Sent { .. })));

    wf.submit(Stage::SendSelected).await.unwrap();

    let calls = t.calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(sent_fields(&calls[1].1, "requiredFields").as_array().unwrap().len(), 3);
    assert_eq!(sent_fields(&calls[2].1, "selectedFields").as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_result_for_replaced_file_is_discarded() {
    let wf = reviewing_with_three(SendSelectedPolicy::Repeatable).await;
    let t = transport(&wf);
    t.push(Reply::Gated(200, String::new()));

    let (outcome, ()) = tokio::join!(wf.submit(Stage::SendAll), async {
        wf.dispatch(Command::SelectFile(UploadContext::new("other.pdf", vec![9])))
            .await
            .unwrap();
        t.gate.notify_one();
    });

    assert_eq!(
        outcome,
        Ok(CommandOutcome::Discarded {
            stage: Stage::SendAll
        })
    );
    assert_eq!(wf.state(), WorkflowState::Idle);
    assert_eq!(wf.action(Stage::SendAll).label, ActionLabel::Ready);
    assert_eq!(
        wf.context().upload.map(|u| u.file_name),
        Some("other.pdf".to_string())
    );
}

#[tokio::test]
async fn test_out_of_range_toggle_leaves_store_unchanged() {
    let wf = reviewing_with_three(SendSelectedPolicy::Repeatable).await;
    let before = wf.views();

    let outcome = wf
        .dispatch(Command::Toggle { index: 7, selected: false })
        .await
        .unwrap();
    assert_eq!(outcome, CommandOutcome::Toggled { applied: false });
    assert_eq!(wf.views(), before);
}

#[tokio::test]
async fn test_select_all_after_clear() {
    let wf = reviewing_with_three(SendSelectedPolicy::Repeatable).await;
    assert_eq!(
        wf.dispatch(Command::ClearAll).await.unwrap(),
        CommandOutcome::SelectionChanged { selected: 0 }
    );
    assert_eq!(
        wf.dispatch(Command::SelectAll).await.unwrap(),
        CommandOutcome::SelectionChanged { selected: 3 }
    );
}
