use crate::browser::ref_table::{bind_refs, RefTable};
use crate::core::config::SnapshotConfig;
use crate::core::BrowserTrait;
use crate::dom::{classify_page, ClassifyRequest, Snapshot};
use crate::errors::Result;
use crate::types::SnapshotOptions;
use tracing::{debug, info};

/// A snapshot together with the ref table that resolves its refs.
#[derive(Debug)]
pub struct CapturedSnapshot<E> {
    pub snapshot: Snapshot,
    pub ref_table: RefTable<E>,
}

/// Classify → stamp → bind → assemble.
pub async fn take_snapshot<B: BrowserTrait>(
    browser: &B,
    tab: &B::TabHandle,
    config: &SnapshotConfig,
    options: &SnapshotOptions,
) -> Result<CapturedSnapshot<B::ElementHandle>> {
    let request = ClassifyRequest::new(config, options)?;
    let candidates = classify_page(browser, tab, &request, config.classify_timeout()).await?;

    let ref_table = bind_refs(
        browser,
        tab,
        &candidates,
        &config.marker_attribute,
        config.bind_timeout(),
    )
    .await;

    let url = browser.get_url(tab).await?;
    let title = match browser.get_title(tab).await {
        Ok(title) => title,
        Err(e) => {
            debug!(error = %e, "title unavailable, using empty title");
            String::new()
        }
    };

    let verbosity = options.verbosity.unwrap_or(config.default_verbosity);
    let snapshot = Snapshot::assemble(url, title, &candidates, verbosity);

    info!(
        url = %snapshot.url,
        refs = snapshot.element_count(),
        bound = ref_table.len(),
        "captured snapshot"
    );

    Ok(CapturedSnapshot {
        snapshot,
        ref_table,
    })
}
