//! Session + summarizer flows against in-memory pages and a fake provider.

mod common;

use common::{gemini, init_tracing, FakeClient, FakeOcr, FakePdf};
use pdfsum::{
    CombineStrategy, Completion, Phase, ProviderError, Session, Summarizer, SummarizeError,
    SummaryConfig, SummaryProgressCallback,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

fn per_page() -> SummaryConfig {
    SummaryConfig::builder()
        .strategy(CombineStrategy::PerPage)
        .build()
        .unwrap()
}

#[tokio::test]
async fn joint_prompt_lists_selected_pages_and_cleans_output() {
    init_tracing();
    let client = FakeClient::replying("**Paragraf 1:** Hi there");
    let summarizer = Summarizer::new(
        client.clone(),
        Arc::new(FakeOcr::default()),
        SummaryConfig::default(),
    );

    let mut session = Session::new();
    let id = session.load(FakePdf::new(&["Hello", "Middle", "World"]).into_document("a.pdf"));
    session.toggle(1).unwrap();
    session.toggle(3).unwrap();

    let request = session.begin_request(summarizer.config()).unwrap();
    assert!(matches!(session.phase(), Phase::Summarizing));

    let result = summarizer.run(&request, &gemini("key")).await;
    assert_eq!(session.complete(id, result), Completion::Applied);

    assert_eq!(
        client.prompts(),
        vec!["Please summarize the following text. \n\nText to summarize: Page 1: Hello\n\nPage 3: World"]
    );
    let summary = session.summary().expect("summary applied");
    assert_eq!(summary.text, "Hi there");
    assert_eq!(summary.pages, vec![1, 3]);
    assert!(summary.failures.is_empty());
    assert_eq!(summary.document_id, id);
}

#[tokio::test]
async fn instructions_and_cross_page_preamble() {
    let client = FakeClient::replying("ok");
    let config = SummaryConfig::builder()
        .instructions("Use bullet points")
        .cross_page_context(true)
        .build()
        .unwrap();
    let summarizer = Summarizer::new(client.clone(), Arc::new(FakeOcr::default()), config);

    let mut session = Session::new();
    session.load(FakePdf::new(&["A", "B"]).into_document("b.pdf"));
    session.select_all().unwrap();
    let request = session.begin_request(summarizer.config()).unwrap();
    assert_ok!(summarizer.run(&request, &gemini("key")).await);

    assert_eq!(
        client.prompts(),
        vec![
            "The following text spans 2 pages; keep the summary coherent across pages. \
Please summarize the following text. Additional instructions: Use bullet points\n\n\
Text to summarize: Page 1: A\n\nPage 2: B"
        ]
    );
}

#[tokio::test]
async fn missing_api_key_makes_no_call() {
    let client = FakeClient::replying("unused");
    let summarizer = Summarizer::new(
        client.clone(),
        Arc::new(FakeOcr::default()),
        SummaryConfig::default(),
    );

    let mut session = Session::new();
    session.load(FakePdf::new(&["Hello"]).into_document("c.pdf"));
    session.toggle(1).unwrap();
    let request = session.begin_request(summarizer.config()).unwrap();

    let err = assert_err!(summarizer.run(&request, &gemini("   ")).await);
    assert!(matches!(err, SummarizeError::MissingApiKey { .. }));
    assert!(err.user_message().contains("gemini"));
    assert!(client.prompts().is_empty());
}

#[tokio::test]
async fn empty_selection_never_reaches_provider() {
    let mut session = Session::new();
    session.load(FakePdf::new(&["Hello", "World"]).into_document("d.pdf"));

    let err = assert_err!(session.begin_request(&SummaryConfig::default()));
    assert!(matches!(err, SummarizeError::NoPagesSelected));
    assert!(matches!(session.phase(), Phase::DocumentLoaded));
}

#[tokio::test]
async fn blank_text_layer_goes_through_ocr() {
    let client = FakeClient::replying("Summary");
    let ocr = Arc::new(FakeOcr::with(2, "scanned words"));
    let summarizer = Summarizer::new(client.clone(), ocr.clone(), SummaryConfig::default());

    let mut session = Session::new();
    session.load(FakePdf::new(&["typed", "   "]).into_document("e.pdf"));
    session.select_all().unwrap();
    let request = session.begin_request(summarizer.config()).unwrap();
    let summary = summarizer.run(&request, &gemini("key")).await.unwrap();

    // Rendered at the default 2x scale.
    assert_eq!(ocr.calls(), vec![(2, 20)]);
    assert_eq!(summary.ocr_pages, vec![2]);
    assert!(client.prompts()[0].ends_with("Page 1: typed\n\nPage 2: scanned words"));
}

#[tokio::test]
async fn joint_skips_unreadable_pages() {
    let client = FakeClient::replying("Summary");
    let summarizer = Summarizer::new(
        client.clone(),
        Arc::new(FakeOcr::default()),
        SummaryConfig::default(),
    );

    let mut session = Session::new();
    session.load(
        FakePdf::new(&["one", "", "three"])
            .unrenderable(2)
            .into_document("f.pdf"),
    );
    session.select_all().unwrap();
    let request = session.begin_request(summarizer.config()).unwrap();
    let summary = summarizer.run(&request, &gemini("key")).await.unwrap();

    assert_eq!(summary.pages, vec![1, 3]);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].page(), 2);
    assert!(summary.is_partial());
    assert!(!client.prompts()[0].contains("Page 2:"));
}

#[tokio::test]
async fn every_page_failing_is_an_error() {
    let client = FakeClient::replying("unused");
    let summarizer = Summarizer::new(
        client.clone(),
        Arc::new(FakeOcr::default()),
        SummaryConfig::default(),
    );

    let mut session = Session::new();
    session.load(FakePdf::new(&["", ""]).unrenderable(1).into_document("g.pdf"));
    session.select_all().unwrap();
    let request = session.begin_request(summarizer.config()).unwrap();

    match summarizer.run(&request, &gemini("key")).await {
        Err(SummarizeError::AllPagesFailed { total, .. }) => assert_eq!(total, 2),
        other => panic!("expected AllPagesFailed, got {other:?}"),
    }
    assert!(client.prompts().is_empty());
}

#[tokio::test]
async fn per_page_sections_in_order() {
    let client = FakeClient::with(|prompt| {
        let text = prompt.rsplit("Text to summarize: ").next().unwrap_or("");
        Ok(format!("Summary of {text}"))
    });
    let summarizer = Summarizer::new(client.clone(), Arc::new(FakeOcr::default()), per_page());

    let mut session = Session::new();
    session.load(FakePdf::new(&["alpha", "beta", "gamma"]).into_document("h.pdf"));
    session.toggle(3).unwrap();
    session.toggle(1).unwrap();
    session.set_title(1, "Intro").unwrap();
    let request = session.begin_request(summarizer.config()).unwrap();
    let summary = summarizer.run(&request, &gemini("key")).await.unwrap();

    assert_eq!(
        summary.text,
        "## Intro\n\nSummary of alpha\n\n---\n\n## Page 3\n\nSummary of gamma"
    );
    assert_eq!(summary.sections.len(), 2);
    let prompts = client.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[0].ends_with("Text to summarize: alpha"));
    assert!(prompts[1].ends_with("Text to summarize: gamma"));
}

#[tokio::test]
async fn per_page_annotates_failed_page() {
    init_tracing();
    let client = FakeClient::with(|prompt| {
        if prompt.contains("beta") {
            Err(ProviderError::Unknown {
                provider: "gemini".into(),
                status: Some(500),
                message: "model overloaded".into(),
            })
        } else {
            Ok("fine".into())
        }
    });
    let summarizer = Summarizer::new(client.clone(), Arc::new(FakeOcr::default()), per_page());

    let mut session = Session::new();
    session.load(
        FakePdf::new(&["alpha", "beta", ""])
            .unrenderable(3)
            .into_document("i.pdf"),
    );
    session.select_all().unwrap();
    let request = session.begin_request(summarizer.config()).unwrap();
    let summary = summarizer.run(&request, &gemini("key")).await.unwrap();

    assert_eq!(summary.pages, vec![1]);
    assert_eq!(summary.failures.len(), 2);
    assert!(!summary.sections[0].failed);
    assert!(summary.sections[1].failed);
    assert!(summary.sections[1].body.contains("model overloaded"));
    assert!(summary.sections[2].failed);
    assert!(summary.text.contains("## Page 2\n\n*Summary unavailable"));
}

#[tokio::test]
async fn per_page_stops_on_rate_limit() {
    let client = FakeClient::with(|_| {
        Err(ProviderError::RateLimited {
            provider: "gemini".into(),
            retry_after_secs: None,
        })
    });
    let summarizer = Summarizer::new(client.clone(), Arc::new(FakeOcr::default()), per_page());

    let mut session = Session::new();
    let id = session.load(FakePdf::new(&["a", "b", "c"]).into_document("j.pdf"));
    session.select_all().unwrap();
    let request = session.begin_request(summarizer.config()).unwrap();
    let result = summarizer.run(&request, &gemini("key")).await;

    assert!(matches!(
        result,
        Err(SummarizeError::Provider(ProviderError::RateLimited { .. }))
    ));
    assert_eq!(client.prompts().len(), 1);

    session.complete(id, result);
    let message = session.last_error().expect("failure applied");
    assert!(message.contains("quota exceeded"), "got: {message}");
}

#[tokio::test]
async fn result_for_replaced_document_is_discarded() {
    init_tracing();
    let client = FakeClient::replying("old summary");
    let summarizer = Summarizer::new(
        client.clone(),
        Arc::new(FakeOcr::default()),
        SummaryConfig::default(),
    );

    let mut session = Session::new();
    let first = session.load(FakePdf::new(&["one"]).into_document("first.pdf"));
    session.toggle(1).unwrap();
    let request = session.begin_request(summarizer.config()).unwrap();

    session.load(FakePdf::new(&["x", "y"]).into_document("second.pdf"));
    let result = summarizer.run(&request, &gemini("key")).await;

    assert_eq!(session.complete(first, result), Completion::Stale);
    assert!(session.summary().is_none());
    assert!(matches!(session.phase(), Phase::DocumentLoaded));
    assert_eq!(session.document().map(|d| d.file_name()), Some("second.pdf"));
}

#[tokio::test]
async fn background_run_goes_stale_when_document_is_replaced() {
    init_tracing();
    let summarizer = Arc::new(Summarizer::new(
        FakeClient::slow(Duration::from_millis(50)),
        Arc::new(FakeOcr::default()),
        SummaryConfig::default(),
    ));

    let mut session = Session::new();
    let first = session.load(FakePdf::new(&["one"]).into_document("first.pdf"));
    session.toggle(1).unwrap();
    let request = session.begin_request(summarizer.config()).unwrap();
    let handle = summarizer.spawn(request, gemini("key"));

    // The session stays usable while the task runs.
    assert!(matches!(
        session.begin_request(summarizer.config()),
        Err(SummarizeError::RequestInFlight)
    ));
    let second = session.load(FakePdf::new(&["two"]).into_document("second.pdf"));
    session.toggle(1).unwrap();
    assert!(!handle.is_finished());

    let result = handle.await.unwrap();
    assert!(result.is_ok());
    assert_eq!(session.complete(first, result), Completion::Stale);
    assert!(matches!(session.phase(), Phase::DocumentLoaded));
    assert_eq!(session.document_id(), Some(second));
    assert_eq!(session.selected_pages(), vec![1]);
}

#[tokio::test]
async fn background_run_applies_to_current_document() {
    let summarizer = Arc::new(Summarizer::new(
        FakeClient::replying("Done"),
        Arc::new(FakeOcr::default()),
        SummaryConfig::default(),
    ));

    let mut session = Session::new();
    let id = session.load(FakePdf::new(&["text"]).into_document("a.pdf"));
    session.toggle(1).unwrap();
    let request = session.begin_request(summarizer.config()).unwrap();

    let result = summarizer.spawn(request, gemini("key")).await.unwrap();
    assert_eq!(session.complete(id, result), Completion::Applied);
    assert_eq!(session.summary().map(|s| s.text.as_str()), Some("Done"));
}

#[tokio::test]
async fn timeout_is_a_network_error() {
    let client = FakeClient::slow(Duration::from_secs(30));
    let config = SummaryConfig::builder()
        .request_timeout_secs(1)
        .build()
        .unwrap();
    let summarizer = Summarizer::new(client, Arc::new(FakeOcr::default()), config);

    let mut session = Session::new();
    session.load(FakePdf::new(&["slow"]).into_document("k.pdf"));
    session.toggle(1).unwrap();
    let request = session.begin_request(summarizer.config()).unwrap();

    match summarizer.run(&request, &gemini("key")).await {
        Err(SummarizeError::Provider(ProviderError::Network { detail, .. })) => {
            assert!(detail.contains("timed out"))
        }
        other => panic!("expected timeout, got {other:?}"),
    }
}

#[derive(Default)]
struct Events(Mutex<Vec<String>>);

impl SummaryProgressCallback for Events {
    fn on_request_start(&self, total: usize) {
        self.0.lock().unwrap().push(format!("start {total}"));
    }
    fn on_page_extracted(&self, page: usize, _total: usize, _chars: usize, used_ocr: bool) {
        self.0
            .lock()
            .unwrap()
            .push(format!("page {page} ocr={used_ocr}"));
    }
    fn on_summary_call(&self, pages: &[usize]) {
        self.0.lock().unwrap().push(format!("call {pages:?}"));
    }
    fn on_request_complete(&self, total: usize, ok: usize) {
        self.0.lock().unwrap().push(format!("done {ok}/{total}"));
    }
}

#[tokio::test]
async fn progress_events_follow_the_run() {
    let events = Arc::new(Events::default());
    let config = SummaryConfig::builder()
        .strategy(CombineStrategy::PerPage)
        .progress_callback(events.clone())
        .build()
        .unwrap();
    let summarizer = Summarizer::new(
        FakeClient::replying("s"),
        Arc::new(FakeOcr::with(2, "ocr text")),
        config,
    );

    let mut session = Session::new();
    session.load(FakePdf::new(&["text", ""]).into_document("l.pdf"));
    session.select_all().unwrap();
    let request = session.begin_request(summarizer.config()).unwrap();
    assert_ok!(summarizer.run(&request, &gemini("key")).await);

    assert_eq!(
        *events.0.lock().unwrap(),
        vec![
            "start 2",
            "page 1 ocr=false",
            "call [1]",
            "page 2 ocr=true",
            "call [2]",
            "done 2/2"
        ]
    );
}

#[tokio::test]
async fn written_summary_lands_atomically() {
    let summarizer = Summarizer::new(
        FakeClient::replying("Short summary"),
        Arc::new(FakeOcr::default()),
        SummaryConfig::default(),
    );
    let mut session = Session::new();
    session.load(FakePdf::new(&["Hello"]).into_document("a.pdf"));
    session.toggle(1).unwrap();
    let request = session.begin_request(summarizer.config()).unwrap();
    let summary = assert_ok!(summarizer.run(&request, &gemini("key")).await);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out").join("summary.md");
    assert_ok!(pdfsum::write_summary(&path, &summary).await);

    assert_eq!(std::fs::read_to_string(&path).unwrap(), "Short summary\n");
    assert!(!path.with_extension("md.tmp").exists());
}
