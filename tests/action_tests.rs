use browser_refs::testing::{FakeBrowser, FakeNode};
use browser_refs::{
    ActionRequest, ActionTarget, BrowserAgentError, BrowserSession, Config, ErrorKind,
    Interaction, SnapshotOptions,
};
use std::path::PathBuf;
use std::sync::Arc;

fn fast_config() -> Config {
    let mut config = Config::default();
    config.interaction.retry_backoff_ms = 1;
    config
}

async fn observed_session(nodes: Vec<FakeNode>) -> BrowserSession<FakeBrowser> {
    let browser = FakeBrowser::with_page("https://form.test/", "Form", nodes);
    let mut session = BrowserSession::new(browser, fast_config()).await.unwrap();
    session.observe(&SnapshotOptions::default()).await.unwrap();
    session
}

fn detached(n: u32) -> BrowserAgentError {
    BrowserAgentError::ElementDetached(format!("Element is detached from the DOM ({})", n))
}

#[tokio::test]
async fn click_returns_outcome_with_fresh_snapshot() {
    let mut session = observed_session(vec![FakeNode::button("#go", "Go")]).await;

    let outcome = session
        .click(ActionTarget::by_ref("r1"))
        .await
        .unwrap();
    assert_eq!(outcome.action, "click");
    assert_eq!(outcome.message, "Clicked");
    assert_eq!(outcome.target, ActionTarget::by_ref("r1"));
    assert_eq!(outcome.snapshot.element_count(), 1);

    let clicks = session.browser().clicks();
    assert_eq!(clicks.len(), 1);
    assert!(!clicks[0].forced);
}

#[tokio::test]
async fn blocked_click_falls_back_to_forced_click() {
    let mut session = observed_session(vec![FakeNode::button("#go", "Go").disabled()]).await;

    let outcome = session
        .click(ActionTarget::by_ref("r1"))
        .await
        .unwrap();
    assert_eq!(outcome.message, "Clicked (forced)");

    let clicks = session.browser().clicks();
    assert_eq!(clicks.len(), 1);
    assert!(clicks[0].forced);
    assert_eq!(session.browser().calls("click"), 2);
}

#[tokio::test]
async fn transient_click_failure_is_retried_once() {
    let mut session = observed_session(vec![FakeNode::button("#go", "Go")]).await;
    session.browser().fail_next("click", detached(1));
    session.browser().fail_next("click", detached(2));

    session
        .click(ActionTarget::by_ref("r1"))
        .await
        .unwrap();
    // checked + forced on the first attempt, checked on the retry
    assert_eq!(session.browser().calls("click"), 3);
    assert_eq!(session.browser().clicks().len(), 1);
}

#[tokio::test]
async fn exhausted_retries_surface_the_last_error_verbatim() {
    let mut session = observed_session(vec![FakeNode::button("#go", "Go")]).await;
    for n in 1..=4 {
        session.browser().fail_next("click", detached(n));
    }

    let err = session
        .click(ActionTarget::by_ref("r1"))
        .await
        .unwrap_err();
    assert!(matches!(err, BrowserAgentError::ElementDetached(_)));
    assert_eq!(err.to_string(), "Element is detached from the DOM (4)");
    assert_eq!(session.browser().calls("click"), 4);
}

#[tokio::test]
async fn non_transient_failure_is_not_retried() {
    let mut session = observed_session(vec![FakeNode::button("#go", "Go")]).await;

    let err = session
        .fill(ActionTarget::by_ref("r1"), "text")
        .await
        .unwrap_err();
    assert!(matches!(err, BrowserAgentError::InteractionFailed(_)));
    assert_eq!(session.browser().calls("fill"), 1);
    assert_eq!(session.browser().calls("type_text"), 1);
}

#[tokio::test]
async fn fill_replaces_and_type_appends() {
    let mut session = observed_session(vec![FakeNode::textbox("#q", "Search").with_value("old")])
        .await;

    session
        .fill(ActionTarget::by_selector("#q"), "rust")
        .await
        .unwrap();
    assert_eq!(session.browser().value_of("#q").as_deref(), Some("rust"));

    let outcome = session
        .type_text(ActionTarget::by_ref("r1"), " lang")
        .await
        .unwrap();
    assert_eq!(outcome.snapshot.refs[0].value.as_deref(), Some("rust lang"));
}

#[tokio::test]
async fn fill_falls_back_to_typing_when_rejected() {
    let mut session = observed_session(vec![FakeNode::textbox("#q", "Search")]).await;
    session.browser().fail_next(
        "fill",
        BrowserAgentError::InteractionFailed("Element is not editable".into()),
    );

    let outcome = session
        .fill(ActionTarget::by_ref("r1"), "abc")
        .await
        .unwrap();
    assert_eq!(outcome.message, "Typed 3 characters");
    assert_eq!(session.browser().value_of("#q").as_deref(), Some("abc"));
}

#[tokio::test]
async fn select_option_reports_the_selection() {
    let mut session = observed_session(vec![FakeNode::new("select", "combobox")
        .named("Size")
        .with_value("S")
        .with_options(&["S", "M", "L"])
        .with_selector("#size")])
    .await;

    let outcome = session
        .act(&ActionRequest::new(
            ActionTarget::by_ref("r1"),
            Interaction::SelectOption {
                values: vec!["M".into()],
            },
        ))
        .await
        .unwrap();
    assert_eq!(outcome.message, "Selected M");
    assert_eq!(outcome.snapshot.refs[0].value.as_deref(), Some("M"));

    let err = session
        .act(&ActionRequest::new(
            ActionTarget::by_ref("r1"),
            Interaction::SelectOption {
                values: vec!["XL".into()],
            },
        ))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("No option matched XL"));
}

#[tokio::test]
async fn unmatched_option_is_not_retried_whatever_its_text() {
    let mut session = observed_session(vec![FakeNode::new("select", "combobox")
        .named("Speed")
        .with_value("Fast")
        .with_options(&["Fast", "Slow"])
        .with_selector("#speed")])
    .await;

    let err = session
        .act(&ActionRequest::new(
            ActionTarget::by_ref("r1"),
            Interaction::SelectOption {
                values: vec!["Timeout".into()],
            },
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, BrowserAgentError::InvalidArgument(_)));
    assert_eq!(err.kind(), ErrorKind::NonTransient);
    assert_eq!(session.browser().calls("select_option"), 1);
}

#[tokio::test]
async fn missing_file_named_like_a_driver_error_is_not_retried() {
    let mut session = observed_session(vec![FakeNode::new("input", "button")
        .named("Upload")
        .with_type("file")
        .with_selector("#file")])
    .await;

    let err = session
        .act(&ActionRequest::new(
            ActionTarget::by_ref("r1"),
            Interaction::SetInputFiles {
                paths: vec![PathBuf::from("/tmp/no/detached-report.pdf")],
            },
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, BrowserAgentError::InvalidArgument(_)));
    assert!(!err.is_transient());
    assert_eq!(session.browser().calls("set_input_files"), 0);
}

#[tokio::test]
async fn press_key_without_target_goes_to_the_page() {
    let mut session = observed_session(vec![FakeNode::textbox("#q", "Search")]).await;

    let outcome = session.press_key("Enter").await.unwrap();
    assert_eq!(outcome.message, "Pressed Enter");
    assert_eq!(session.browser().pressed_keys(), vec!["Enter".to_string()]);
}

#[tokio::test]
async fn set_input_files_checks_the_paths() {
    let mut session = observed_session(vec![FakeNode::new("input", "button")
        .named("Upload")
        .with_type("file")
        .with_selector("#file")])
    .await;

    let missing = ActionRequest::new(
        ActionTarget::by_ref("r1"),
        Interaction::SetInputFiles {
            paths: vec![PathBuf::from("/definitely/not/here.txt")],
        },
    );
    let err = session.act(&missing).await.unwrap_err();
    assert!(err.to_string().contains("File not found"));
    assert_eq!(session.browser().calls("set_input_files"), 0);

    let manifest = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("Cargo.toml");
    let present = ActionRequest::new(
        ActionTarget::by_ref("r1"),
        Interaction::SetInputFiles {
            paths: vec![manifest],
        },
    );
    let outcome = session.act(&present).await.unwrap();
    assert_eq!(outcome.message, "Set 1 file(s)");
}

#[tokio::test]
async fn json_requests_drive_the_session() {
    let mut session = observed_session(vec![
        FakeNode::textbox("#u", "Username"),
        FakeNode::button("#login", "Log in"),
    ])
    .await;

    let request: ActionRequest =
        serde_json::from_str(r#"{"action":"fill","ref":"r1","value":"bob"}"#).unwrap();
    session.act(&request).await.unwrap();

    let request: ActionRequest =
        serde_json::from_str(r##"{"action":"hover","selector":"#login"}"##).unwrap();
    let outcome = session.act(&request).await.unwrap();
    assert_eq!(outcome.action, "hover");
    assert_eq!(outcome.snapshot.refs[0].value.as_deref(), Some("bob"));

    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(json["target"]["selector"], "#login");
    assert!(json["executionTimeMs"].is_u64());
}

#[tokio::test]
async fn unsettled_page_does_not_fail_the_action() {
    let mut config = fast_config();
    config.interaction.settle_timeout_ms = 50;
    let browser = FakeBrowser::with_page(
        "https://form.test/",
        "Form",
        vec![FakeNode::button("#go", "Go")],
    );
    browser.set_settled(false);
    let mut session = BrowserSession::new(browser, config).await.unwrap();
    session.observe(&SnapshotOptions::default()).await.unwrap();

    let outcome = session.click(ActionTarget::by_ref("r1")).await.unwrap();
    assert_eq!(outcome.message, "Clicked");
    assert_eq!(outcome.snapshot.element_count(), 1);
}

#[tokio::test]
async fn shared_sessions_serialize_actions() {
    let session = observed_session(vec![FakeNode::textbox("#q", "Search")])
        .await
        .shared();

    let mut tasks = Vec::new();
    for word in ["a", "b", "c"] {
        let session = Arc::clone(&session);
        tasks.push(tokio::spawn(async move {
            let mut guard = session.lock().await;
            guard
                .type_text(ActionTarget::by_selector("#q"), word)
                .await
                .map(|_| ())
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let guard = session.lock().await;
    let value = guard.browser().value_of("#q").unwrap();
    assert_eq!(value.len(), 3);
    assert_eq!(guard.browser().calls("type_text"), 3);
}
