use crate::catalog::SUBMIT_PROBES;
use crate::page::PageTarget;
use crate::probe;

/// Clicks the first submit control found by the submit probe table.
///
/// `false` when nothing matched or every candidate refused the click; there is
/// no retry and no error past this point.
pub async fn trigger<P: PageTarget>(page: &P) -> bool {
    match probe::click_first(page, SUBMIT_PROBES).await {
        Ok(Some(hit)) => {
            tracing::info!(
                target: "forms.submit",
                probe = %hit.probe,
                selector = %hit.selector,
                scope = ?hit.scope,
                "submit clicked"
            );
            true
        }
        Ok(None) => {
            tracing::warn!(target: "forms.submit", "no submit control found");
            false
        }
        Err(e) => {
            tracing::warn!(target: "forms.submit", error = %e, "submit probing failed");
            false
        }
    }
}
