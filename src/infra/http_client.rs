use crate::app::ports::{HttpClientPort, HttpGetResult};
use crate::common::error::Result;
use crate::config::HttpConfig;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

pub struct ReqwestHttp {
    client: reqwest::Client,
}

impl ReqwestHttp {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpClientPort for ReqwestHttp {
    async fn get(&self, url: &str) -> Result<HttpGetResult> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status().as_u16();
        let final_url = resp.url().to_string();
        let bytes = resp.bytes().await?.to_vec();
        debug!("GET {} -> {} ({} bytes)", url, status, bytes.len());
        Ok(HttpGetResult { url: final_url, status, bytes })
    }
}
