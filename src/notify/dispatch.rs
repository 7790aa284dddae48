use std::time::Duration;

use serde::Serialize;
use tracing::{error, info};

use super::compose::Notification;
use super::{Delivery, Notifier};
use crate::error::DispatchError;

const NOTIFY_PATH: &str = "/api/services/notify";

/// Where and how to deliver notifications.
///
/// Delivery is enabled only when both `base_url` and `token` are set.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    pub base_url: Option<String>,
    pub token: Option<String>,
    pub service: String,
    pub title: String,
    /// Opened when the notification is tapped.
    pub click_url: String,
    pub timeout: Duration,
}

impl DispatchConfig {
    fn target(&self) -> Option<(String, &str)> {
        let base = self.base_url.as_deref().filter(|s| !s.trim().is_empty())?;
        let token = self.token.as_deref().filter(|s| !s.trim().is_empty())?;
        let endpoint = format!("{}{}/{}", base.trim_end_matches('/'), NOTIFY_PATH, self.service);
        Some((endpoint, token))
    }
}

#[derive(Debug, Serialize)]
struct Payload<'a> {
    message: &'a str,
    title: &'a str,
    data: PayloadData<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PayloadData<'a> {
    url: &'a str,
    click_action: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<&'a str>,
}

/// Posts notifications to a Home Assistant notify service.
pub struct Dispatcher {
    client: reqwest::Client,
    config: DispatchConfig,
}

impl Dispatcher {
    pub fn new(config: DispatchConfig) -> Result<Self, DispatchError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    pub fn is_configured(&self) -> bool {
        self.config.target().is_some()
    }

    /// Deliver one notification. Missing configuration is a logged no-op,
    /// not an error. Non-2xx responses are returned as `DispatchError::Status`.
    pub async fn dispatch(
        &self,
        message: &str,
        image_url: Option<&str>,
    ) -> Result<Delivery, DispatchError> {
        let Some((endpoint, token)) = self.config.target() else {
            info!("notification endpoint or token not configured, skipping notification");
            info!(title = %self.config.title, "notification would have been sent");
            info!("message: {}", message);
            if let Some(image) = image_url {
                info!("image: {}", image);
            }
            return Ok(Delivery::Degraded);
        };

        let payload = Payload {
            message,
            title: &self.config.title,
            data: PayloadData {
                url: &self.config.click_url,
                click_action: &self.config.click_url,
                image: image_url,
            },
        };

        let response = self
            .client
            .post(&endpoint)
            .bearer_auth(token)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), body = %body, "notification endpoint rejected request");
            return Err(DispatchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        info!("notification sent");
        Ok(Delivery::Delivered)
    }
}

impl Notifier for Dispatcher {
    async fn notify(&self, notification: &Notification) -> Result<Delivery, DispatchError> {
        self.dispatch(&notification.message, notification.image_url.as_deref())
            .await
    }
}
