use url::form_urlencoded;

use crate::api::{ApiClient, RequestError};
use crate::logging::{log, obj, v_str, Domain, Level};
use crate::page::{PageHandle, ERROR_MESSAGE, LOADER};
use crate::render::html_escape;

const UPLOAD_FAILED: &str = "Upload failed";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// Results page for the new session.
    Redirect { session_id: String, location: String },
    Failed(String),
}

/// `/results?session_id=<id>`
pub fn results_location(session_id: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("session_id", session_id)
        .finish();
    format!("/results?{query}")
}

/// Upload page: one multipart request, loader while it runs, error text
/// on failure, navigation to the results page on success.
pub struct UploadFlow {
    client: ApiClient,
    page: PageHandle,
}

impl UploadFlow {
    pub fn new(client: ApiClient, page: PageHandle) -> Self {
        Self { client, page }
    }

    pub async fn upload(&self, file_name: &str, file_bytes: Vec<u8>, session_name: &str) -> UploadOutcome {
        self.page.set_visible(LOADER, true);
        self.page.set_visible(ERROR_MESSAGE, false);

        let outcome = match self.client.upload(file_name, file_bytes, session_name).await {
            Ok(receipt) => {
                let location = results_location(&receipt.session_id);
                self.page.navigate(&location);
                log(
                    Level::Info,
                    Domain::Upload,
                    "uploaded",
                    obj(&[
                        ("session_id", v_str(&receipt.session_id)),
                        ("file", v_str(file_name)),
                    ]),
                );
                UploadOutcome::Redirect {
                    session_id: receipt.session_id,
                    location,
                }
            }
            Err(err) => {
                let message = failure_message(&err);
                log(
                    Level::Warn,
                    Domain::Upload,
                    "upload_failed",
                    obj(&[("file", v_str(file_name)), ("msg", v_str(&message))]),
                );
                self.page.set_html(ERROR_MESSAGE, html_escape(&message));
                self.page.set_visible(ERROR_MESSAGE, true);
                UploadOutcome::Failed(message)
            }
        };

        self.page.set_visible(LOADER, false);
        outcome
    }
}

/// Server `detail` for rejected uploads, a fixed message for other
/// status failures, and the error itself for transport and parse errors.
fn failure_message(err: &RequestError) -> String {
    match err {
        RequestError::Status { detail, .. } => {
            detail.clone().unwrap_or_else(|| UPLOAD_FAILED.to_string())
        }
        other => other.to_string(),
    }
}
