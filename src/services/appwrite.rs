use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

use super::{Notifier, NotifyError};

/// Notifier that writes notification documents into an Appwrite collection.
///
/// The surrounding application's notification feature reads the same
/// collection and handles delivery; this client only creates the document.
pub struct AppwriteNotifier {
    base_url: String,
    api_key: String,
    project_id: String,
    database_id: String,
    collection_id: String,
    client: Client,
}

impl AppwriteNotifier {
    /// Create a new Appwrite notifier
    pub fn new(
        base_url: String,
        api_key: String,
        project_id: String,
        database_id: String,
        collection_id: String,
    ) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            base_url,
            api_key,
            project_id,
            database_id,
            collection_id,
            client,
        })
    }

    fn documents_url(&self) -> String {
        format!(
            "{}/databases/{}/collections/{}/documents",
            self.base_url.trim_end_matches('/'),
            self.database_id,
            self.collection_id
        )
    }

    fn document_payload(recipient_id: &str, message: &str, link: &str) -> Value {
        json!({
            "documentId": uuid::Uuid::new_v4().to_string(),
            "data": {
                "recipientId": recipient_id,
                "message": message,
                "link": link,
                "read": false,
                "createdAt": chrono::Utc::now().to_rfc3339(),
            }
        })
    }
}

#[async_trait]
impl Notifier for AppwriteNotifier {
    async fn notify(&self, recipient_id: &str, message: &str, link: &str) -> Result<(), NotifyError> {
        let payload = Self::document_payload(recipient_id, message, link);

        let response = self
            .client
            .post(self.documents_url())
            .header("X-Appwrite-Key", &self.api_key)
            .header("X-Appwrite-Project", &self.project_id)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_else(|_| "Unable to read body".to_string());
            tracing::error!("Failed to create notification for {}: {} - {}", recipient_id, status, body);
            return Err(NotifyError::ApiError(format!(
                "Failed to create notification: {}",
                status
            )));
        }

        tracing::debug!("Created notification for {}", recipient_id);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notifier(base_url: String) -> AppwriteNotifier {
        AppwriteNotifier::new(
            base_url,
            "test_key".to_string(),
            "test_project".to_string(),
            "test_db".to_string(),
            "notifications".to_string(),
        )
        .unwrap()
    }

    #[test]
    fn test_documents_url_trims_trailing_slash() {
        let client = notifier("https://appwrite.test/v1/".to_string());

        assert_eq!(
            client.documents_url(),
            "https://appwrite.test/v1/databases/test_db/collections/notifications/documents"
        );
    }

    #[test]
    fn test_document_payload_shape() {
        let payload = AppwriteNotifier::document_payload("C1", "You are invited", "/requests/R1");

        assert!(payload["documentId"].is_string());
        assert_eq!(payload["data"]["recipientId"], "C1");
        assert_eq!(payload["data"]["link"], "/requests/R1");
        assert_eq!(payload["data"]["read"], false);
    }

    #[tokio::test]
    async fn test_notify_posts_document() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/databases/test_db/collections/notifications/documents")
            .match_header("X-Appwrite-Key", "test_key")
            .match_header("X-Appwrite-Project", "test_project")
            .match_body(mockito::Matcher::PartialJson(json!({
                "data": { "recipientId": "C1", "link": "/requests/R1" }
            })))
            .with_status(201)
            .with_body("{}")
            .create_async()
            .await;

        let client = notifier(server.url());
        client.notify("C1", "You are invited", "/requests/R1").await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_notify_reports_api_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/databases/test_db/collections/notifications/documents")
            .with_status(401)
            .create_async()
            .await;

        let client = notifier(server.url());
        let err = client.notify("C1", "You are invited", "/requests/R1").await.unwrap_err();

        assert!(matches!(err, NotifyError::ApiError(_)));
    }
}
