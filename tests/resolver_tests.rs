use browser_refs::testing::{FakeBrowser, FakeNode};
use browser_refs::{
    ActionRequest, ActionTarget, BrowserAgentError, BrowserSession, Config, ErrorKind,
    SnapshotOptions,
};

async fn observed_session(nodes: Vec<FakeNode>) -> BrowserSession<FakeBrowser> {
    let browser = FakeBrowser::with_page("https://app.test/", "App", nodes);
    let mut session = BrowserSession::new(browser, Config::default()).await.unwrap();
    session.observe(&SnapshotOptions::default()).await.unwrap();
    session
}

fn two_buttons() -> Vec<FakeNode> {
    vec![
        FakeNode::button("#save", "Save"),
        FakeNode::button("#cancel", "Cancel"),
    ]
}

#[tokio::test]
async fn known_ref_resolves_to_its_element() {
    let session = observed_session(two_buttons()).await;

    let handle = session
        .resolve_element(&ActionTarget::by_ref("r2"), "click")
        .await
        .unwrap();
    let by_selector = session
        .resolve_element(&ActionTarget::by_selector("#cancel"), "click")
        .await
        .unwrap();
    assert_eq!(handle, by_selector);
}

#[tokio::test]
async fn unknown_ref_lists_the_valid_ones() {
    let session = observed_session(two_buttons()).await;

    let err = session
        .resolve_element(&ActionTarget::by_ref("r9"), "click")
        .await
        .unwrap_err();
    match &err {
        BrowserAgentError::RefNotFound {
            action,
            ref_id,
            available,
            total,
        } => {
            assert_eq!(action, "click");
            assert_eq!(ref_id, "r9");
            assert_eq!(available, &vec!["r1".to_string(), "r2".to_string()]);
            assert_eq!(*total, 2);
        }
        other => panic!("expected RefNotFound, got {:?}", other),
    }
    assert!(err.to_string().contains("r1, r2"));
    assert_eq!(err.kind(), ErrorKind::Unresolvable);
}

#[tokio::test]
async fn removed_element_is_stale_not_missing() {
    let session = observed_session(two_buttons()).await;
    assert!(session.browser().remove("#save"));

    let err = session
        .resolve_element(&ActionTarget::by_ref("r1"), "click")
        .await
        .unwrap_err();
    assert!(matches!(err, BrowserAgentError::StaleRef { .. }));
    assert_eq!(err.kind(), ErrorKind::Stale);
    assert!(!err.is_transient());

    let err = session
        .resolve_element(&ActionTarget::by_ref("r7"), "click")
        .await
        .unwrap_err();
    assert!(matches!(err, BrowserAgentError::RefNotFound { .. }));
}

#[tokio::test]
async fn rerendered_element_is_stale_even_with_the_same_marker() {
    let session = observed_session(two_buttons()).await;
    assert!(session.browser().rerender("#save"));
    assert_eq!(session.browser().marker_of("#save").as_deref(), Some("r1"));

    let err = session
        .resolve_element(&ActionTarget::by_ref("r1"), "click")
        .await
        .unwrap_err();
    assert!(matches!(err, BrowserAgentError::StaleRef { .. }));
}

#[tokio::test]
async fn script_shaped_selector_is_rejected_before_any_query() {
    let session = observed_session(two_buttons()).await;
    let queries_before = session.browser().calls("query");

    let err = session
        .resolve_element(&ActionTarget::by_selector("<script>x</script>"), "click")
        .await
        .unwrap_err();
    assert!(matches!(err, BrowserAgentError::InvalidSelector { .. }));
    assert_eq!(session.browser().calls("query"), queries_before);
}

#[tokio::test]
async fn selector_without_match_is_unresolvable() {
    let session = observed_session(two_buttons()).await;

    let err = session
        .resolve_element(&ActionTarget::by_selector("#delete"), "click")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        BrowserAgentError::SelectorNotFound { ref selector, .. } if selector == "#delete"
    ));
}

#[tokio::test]
async fn empty_target_is_rejected() {
    let session = observed_session(two_buttons()).await;

    let target = ActionTarget {
        ref_id: Some("".into()),
        selector: Some("  ".into()),
    };
    let err = session.resolve_element(&target, "hover").await.unwrap_err();
    assert!(matches!(err, BrowserAgentError::MissingTarget { ref action } if action == "hover"));
}

#[tokio::test]
async fn ref_wins_over_selector() {
    let session = observed_session(two_buttons()).await;

    let target = ActionTarget {
        ref_id: Some("r1".into()),
        selector: Some("#cancel".into()),
    };
    let handle = session.resolve_element(&target, "click").await.unwrap();
    let save = session
        .resolve_element(&ActionTarget::by_selector("#save"), "click")
        .await
        .unwrap();
    assert_eq!(handle, save);
}

#[tokio::test]
async fn resolution_failures_are_never_retried() {
    let mut session = observed_session(two_buttons()).await;

    let err = session
        .act(&ActionRequest::click(ActionTarget::by_ref("r5")))
        .await
        .unwrap_err();
    assert!(matches!(err, BrowserAgentError::RefNotFound { .. }));
    assert_eq!(session.browser().calls("click"), 0);
}

#[tokio::test]
async fn refs_from_before_an_action_do_not_survive_it() {
    let mut session = observed_session(two_buttons()).await;
    assert!(session.ref_table().contains("r2"));
    session.browser().remove("#cancel");

    let outcome = session
        .act(&ActionRequest::click(ActionTarget::by_ref("r1")))
        .await
        .unwrap();
    assert_eq!(outcome.snapshot.element_count(), 1);
    assert!(!session.ref_table().contains("r2"));

    let err = session
        .resolve_element(&ActionTarget::by_ref("r2"), "click")
        .await
        .unwrap_err();
    assert!(matches!(err, BrowserAgentError::RefNotFound { .. }));
}

#[tokio::test]
async fn navigation_invalidates_every_ref() {
    let browser = FakeBrowser::with_page("https://app.test/", "App", two_buttons());
    browser.route(
        "https://app.test/next",
        "Next",
        vec![FakeNode::new("h1", "heading").named("Welcome")],
    );
    let mut session = BrowserSession::new(browser, Config::default()).await.unwrap();
    session.observe(&SnapshotOptions::default()).await.unwrap();

    let snapshot = session.navigate("https://app.test/next").await.unwrap();
    assert_eq!(snapshot.title, "Next");
    assert_eq!(snapshot.element_count(), 1);
    assert_eq!(snapshot.refs[0].role, "heading");

    let err = session
        .resolve_element(&ActionTarget::by_ref("r2"), "click")
        .await
        .unwrap_err();
    assert!(matches!(err, BrowserAgentError::RefNotFound { .. }));
}

#[tokio::test]
async fn invalid_url_never_reaches_the_browser() {
    let mut session = observed_session(two_buttons()).await;

    let err = session.navigate("not a url").await.unwrap_err();
    assert!(matches!(err, BrowserAgentError::InvalidUrl { .. }));
    assert_eq!(session.browser().calls("navigate"), 0);
    assert!(session.ref_table().contains("r1"));
}
