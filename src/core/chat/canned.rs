//! Canned fallback generator.
//!
//! Selected when no serving endpoint or token is configured. Matches
//! product keywords against bundled stock replies and templates a default
//! answer otherwise, so the pipeline runs end to end without credentials.

use async_trait::async_trait;
use tracing::debug;

use super::base::{GenerateResult, ReplyGenerator, Turn};
use crate::core::emotion::Emotion;

/// Stock replies keyed by product keyword, checked in order
const STOCK_REPLIES: &[(&str, &str)] = &[
    (
        "databricks",
        "Databricks is a unified analytics platform that combines data engineering, \
         data science, and business analytics. It provides collaborative notebooks, \
         automated cluster management, and integrations with popular ML frameworks.",
    ),
    (
        "spark",
        "Apache Spark is the core compute engine in Databricks. It provides distributed \
         processing for big data workloads, supporting batch and streaming data \
         processing, machine learning, and SQL analytics.",
    ),
    (
        "delta",
        "Delta Lake is an open-source storage layer that brings ACID transactions to \
         Apache Spark and big data workloads. It provides features like time travel, \
         schema enforcement, and unified batch/streaming processing.",
    ),
];

/// Keyword-matched stock-reply generator
#[derive(Debug, Default, Clone)]
pub struct CannedChat;

impl CannedChat {
    pub fn new() -> Self {
        CannedChat
    }

    fn reply_for(input: &str) -> String {
        let lower = input.to_lowercase();
        for (keyword, reply) in STOCK_REPLIES {
            if lower.contains(keyword) {
                return (*reply).to_string();
            }
        }
        format!(
            "I understand you're asking about '{input}'. As your Databricks assistant, \
             I'm here to help! In production mode, I'll provide detailed answers about \
             Databricks features, best practices, and technical guidance."
        )
    }
}

#[async_trait]
impl ReplyGenerator for CannedChat {
    async fn generate(
        &self,
        input: &str,
        _emotion: Emotion,
        _history: &[Turn],
    ) -> GenerateResult<String> {
        let reply = Self::reply_for(input);
        debug!(chars = reply.len(), "served canned reply");
        Ok(reply)
    }

    fn name(&self) -> &'static str {
        "canned"
    }
}
