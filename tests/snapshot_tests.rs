use browser_refs::testing::{FakeBrowser, FakeNode};
use browser_refs::{
    BrowserAgentError, BrowserSession, Config, ErrorKind, SnapshotOptions, Verbosity,
};

async fn session_on(nodes: Vec<FakeNode>) -> BrowserSession<FakeBrowser> {
    let browser = FakeBrowser::with_page("https://shop.test/", "Shop", nodes);
    BrowserSession::new(browser, Config::default()).await.unwrap()
}

fn login_form() -> Vec<FakeNode> {
    vec![
        FakeNode::textbox("#u", "Username"),
        FakeNode::button("button", "Submit").disabled(),
    ]
}

#[tokio::test]
async fn refs_are_sequential_and_skip_dropped_elements() {
    let mut session = session_on(vec![
        FakeNode::new("h1", "heading").named("Checkout"),
        FakeNode::button("#hidden", "Ghost").hidden(),
        FakeNode::new("div", ""),
        FakeNode::new("span", "button"),
        FakeNode::textbox("#email", "Email"),
        FakeNode::button("#pay", "Pay now"),
    ])
    .await;

    let snapshot = session.observe(&SnapshotOptions::default()).await.unwrap();
    let refs: Vec<&str> = snapshot.refs.iter().map(|e| e.ref_id.as_str()).collect();
    assert_eq!(refs, vec!["r1", "r2", "r3"]);
    assert_eq!(snapshot.refs[0].role, "heading");
    assert_eq!(snapshot.refs[2].name, "Pay now");
    assert_eq!(session.ref_table().len(), 3);
}

#[tokio::test]
async fn unchanged_page_gives_identical_snapshots() {
    let mut session = session_on(login_form()).await;

    let first = session.observe(&SnapshotOptions::default()).await.unwrap();
    let second = session.observe(&SnapshotOptions::default()).await.unwrap();
    assert_eq!(first.refs, second.refs);
}

#[tokio::test]
async fn login_scenario_reports_disabled_button_and_typed_value() {
    let mut session = session_on(login_form()).await;

    let snapshot = session.observe(&SnapshotOptions::default()).await.unwrap();
    assert_eq!(snapshot.element_count(), 2);

    let username = snapshot.find("r1").unwrap();
    assert_eq!(username.role, "textbox");
    assert_eq!(username.name, "Username");
    let submit = snapshot.find("r2").unwrap();
    assert_eq!(submit.role, "button");
    assert_eq!(submit.disabled, Some(true));

    let outcome = session
        .type_text(browser_refs::ActionTarget::by_ref("r1"), "alice")
        .await
        .unwrap();
    let username = outcome.snapshot.find("r1").unwrap();
    assert_eq!(username.value.as_deref(), Some("alice"));
}

#[tokio::test]
async fn max_refs_stops_after_the_cap() {
    let nodes = (1..=5)
        .map(|i| FakeNode::button(&format!("#b{}", i), &format!("Button {}", i)))
        .collect();
    let mut session = session_on(nodes).await;

    let snapshot = session
        .observe(&SnapshotOptions::default().with_max_refs(1))
        .await
        .unwrap();
    assert_eq!(snapshot.element_count(), 1);
    assert_eq!(snapshot.refs[0].ref_id, "r1");
    assert_eq!(snapshot.refs[0].name, "Button 1");
    assert_eq!(session.browser().marker_of("#b2"), None);
}

#[tokio::test]
async fn passwords_are_masked_only_when_filled() {
    let mut session = session_on(vec![
        FakeNode::textbox("#pw", "Password")
            .with_type("password")
            .with_value("hunter2"),
        FakeNode::textbox("#pw2", "Confirm").with_type("password"),
    ])
    .await;

    let snapshot = session.observe(&SnapshotOptions::default()).await.unwrap();
    assert_eq!(snapshot.refs[0].value.as_deref(), Some("••••••••"));
    assert_eq!(snapshot.refs[1].value.as_deref(), Some(""));
    assert!(!snapshot.to_text().contains("hunter2"));
}

#[tokio::test]
async fn long_names_are_truncated() {
    let long = "x".repeat(300);
    let mut session = session_on(vec![FakeNode::new("a", "link").named(&long)]).await;

    let snapshot = session.observe(&SnapshotOptions::default()).await.unwrap();
    assert_eq!(snapshot.refs[0].name.chars().count(), 100);
}

#[tokio::test]
async fn verbosity_controls_detail() {
    let mut session = session_on(vec![FakeNode::new("select", "combobox")
        .named("Size")
        .with_value("M")
        .with_options(&["S", "M", "L"])
        .described("Pick a size")
        .with_selector("#size")])
    .await;

    let minimal = session
        .observe(&SnapshotOptions::default().with_verbosity(Verbosity::Minimal))
        .await
        .unwrap();
    assert_eq!(minimal.refs[0].value, None);
    assert_eq!(minimal.refs[0].options, None);

    let normal = session.observe(&SnapshotOptions::default()).await.unwrap();
    assert_eq!(normal.refs[0].value.as_deref(), Some("M"));
    assert_eq!(normal.refs[0].description, None);

    let detailed = session
        .observe(&SnapshotOptions::default().with_verbosity(Verbosity::Detailed))
        .await
        .unwrap();
    assert_eq!(detailed.refs[0].description.as_deref(), Some("Pick a size"));
}

#[tokio::test]
async fn scope_limits_classification_to_a_subtree() {
    let mut session = session_on(vec![
        FakeNode::new("a", "link").named("Home"),
        FakeNode::textbox("#q", "Search").within("#search"),
        FakeNode::button("#go", "Go").within("#search"),
    ])
    .await;

    let snapshot = session
        .observe(&SnapshotOptions::default().with_scope("#search"))
        .await
        .unwrap();
    let names: Vec<&str> = snapshot.refs.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["Search", "Go"]);
    assert_eq!(snapshot.refs[0].ref_id, "r1");
}

#[tokio::test]
async fn missing_scope_is_unresolvable() {
    let mut session = session_on(login_form()).await;

    let err = session
        .observe(&SnapshotOptions::default().with_scope("#nowhere"))
        .await
        .unwrap_err();
    assert!(matches!(err, BrowserAgentError::SelectorNotFound { .. }));
    assert_eq!(err.kind(), ErrorKind::Unresolvable);
}

#[tokio::test]
async fn unsafe_scope_is_rejected_before_the_page_is_touched() {
    let mut session = session_on(login_form()).await;

    let err = session
        .observe(&SnapshotOptions::default().with_scope("<script>x</script>"))
        .await
        .unwrap_err();
    assert!(matches!(err, BrowserAgentError::InvalidSelector { .. }));
    assert_eq!(session.browser().calls("evaluate"), 0);
}

#[tokio::test]
async fn markers_from_an_earlier_pass_are_cleared() {
    let mut session = session_on(vec![
        FakeNode::button("#a", "A"),
        FakeNode::button("#b", "B"),
    ])
    .await;
    session.observe(&SnapshotOptions::default()).await.unwrap();
    assert_eq!(session.browser().marker_of("#b").as_deref(), Some("r2"));

    session
        .observe(&SnapshotOptions::default().with_max_refs(1))
        .await
        .unwrap();
    assert_eq!(session.browser().marker_of("#a").as_deref(), Some("r1"));
    assert_eq!(session.browser().marker_of("#b"), None);
}

#[tokio::test]
async fn bind_misses_do_not_fail_the_snapshot() {
    let mut session = session_on(login_form()).await;
    session.browser().fail_next(
        "query",
        BrowserAgentError::Timeout("Timeout 2000ms exceeded while querying selector".into()),
    );

    let snapshot = session.observe(&SnapshotOptions::default()).await.unwrap();
    assert_eq!(snapshot.element_count(), 2);
    assert_eq!(session.ref_table().len(), 1);
    assert!(!session.ref_table().contains("r1"));
    assert!(session.ref_table().contains("r2"));
}

#[tokio::test]
async fn missing_title_falls_back_to_empty() {
    let mut session = session_on(login_form()).await;
    session
        .browser()
        .fail_next("get_title", BrowserAgentError::TargetClosed("Target closed".into()));

    let snapshot = session.observe(&SnapshotOptions::default()).await.unwrap();
    assert_eq!(snapshot.title, "");
    assert_eq!(snapshot.url, "https://shop.test/");
}

#[tokio::test]
async fn classification_failure_propagates() {
    let mut session = session_on(login_form()).await;
    session.browser().fail_next(
        "evaluate",
        BrowserAgentError::ContextDestroyed("Execution context was destroyed".into()),
    );

    let err = session
        .observe(&SnapshotOptions::default())
        .await
        .unwrap_err();
    assert!(err.is_transient());
}

#[tokio::test]
async fn snapshot_serializes_refs_under_ref_key() {
    let mut session = session_on(login_form()).await;
    let snapshot = session.observe(&SnapshotOptions::default()).await.unwrap();

    let json = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(json["refs"][0]["ref"], "r1");
    assert_eq!(json["refs"][1]["disabled"], true);
    assert!(json.get("captured_at").is_none());
}

#[tokio::test]
async fn lookups_by_role_and_name() {
    let mut session = session_on(vec![
        FakeNode::textbox("#q", "Search products"),
        FakeNode::button("#go", "Search"),
        FakeNode::button("#reset", "Reset"),
    ])
    .await;
    let snapshot = session.observe(&SnapshotOptions::default()).await.unwrap();

    let buttons: Vec<&str> = snapshot
        .find_by_role("button")
        .iter()
        .map(|e| e.ref_id.as_str())
        .collect();
    assert_eq!(buttons, vec!["r2", "r3"]);

    let search: Vec<&str> = snapshot
        .find_by_name("SEARCH")
        .iter()
        .map(|e| e.ref_id.as_str())
        .collect();
    assert_eq!(search, vec!["r1", "r2"]);
    assert!(snapshot.find_by_role("link").is_empty());
}
