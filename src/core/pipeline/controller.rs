//! The response orchestrator: one request in, an ordered event stream out.
//!
//! For each request, emotion classification runs concurrently with cache
//! resolution. A cache hit replays the stored bundle; a miss runs the
//! sequential generate → synthesize → extract chain inside the cache's
//! single-flight computation, streaming each artifact as it lands. Hits
//! and joiners replay the finished bundle with `cached: true`.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use super::error::{PipelineError, Stage};
use super::run::PipelineRun;
use super::types::{QueryReply, ReplyBundle, Request, StageTimeouts};
use crate::core::cache::{CacheOutcome, ResultCache};
use crate::core::chat::{SharedGenerator, Turn};
use crate::core::emotion::{Classification, SharedClassifier};
use crate::core::speech::SharedSynthesizer;
use crate::core::viseme::{SharedExtractor, timeline_duration_ms};
use crate::protocol::ServerMessage;

/// Cache specialization for completed reply bundles
pub type ReplyCache = ResultCache<ReplyBundle, PipelineError>;

/// Classification resolved once, shared between the emotion event and the
/// generation chain
type SharedClassification = Shared<BoxFuture<'static, Classification>>;

/// The four upstream capabilities the pipeline coordinates.
#[derive(Clone)]
pub struct Adapters {
    pub classifier: SharedClassifier,
    pub generator: SharedGenerator,
    pub synthesizer: SharedSynthesizer,
    pub extractor: SharedExtractor,
}

/// Drives the per-request task graph over the adapters and the cache.
pub struct Orchestrator {
    adapters: Adapters,
    cache: Option<ReplyCache>,
    cache_ttl: Duration,
    timeouts: StageTimeouts,
}

impl Orchestrator {
    pub fn new(
        adapters: Adapters,
        cache: Option<ReplyCache>,
        cache_ttl: Duration,
        timeouts: StageTimeouts,
    ) -> Self {
        Orchestrator {
            adapters,
            cache,
            cache_ttl,
            timeouts,
        }
    }

    /// Runs one request for a connected session, emitting its event stream
    /// through `run`.
    ///
    /// Event order per request: `emotion_detected`, `response_text`,
    /// `lip_sync_data`, `audio_data`, `response_complete`; an `error`
    /// event replaces everything after the failure point. A cancelled or
    /// superseded run emits nothing further, and only a still-current run
    /// records its turn in the conversation log.
    pub async fn stream(&self, request: Request, run: PipelineRun) {
        let history = run.session().prompt_turns();
        let classification = self.classification_future(request.text.clone());
        let (emotion_sent_tx, emotion_sent_rx) = oneshot::channel();

        // The emotion event always precedes the reply text. A computing
        // leader waits on this gate before its first emission; replayed
        // artifacts are ordered by awaiting the resolved bundle below.
        let emit_emotion = {
            let classification = classification.clone();
            let run = run.clone();
            async move {
                let reading = classification.await;
                run.emit(ServerMessage::EmotionDetected {
                    emotion: reading.emotion,
                    confidence: reading.confidence,
                })
                .await;
                let _ = emotion_sent_tx.send(());
                reading
            }
        };

        let resolve = self.resolve_bundle(
            &request,
            classification,
            history,
            Some((run.clone(), emotion_sent_rx)),
        );
        let (reading, resolved) = tokio::join!(emit_emotion, resolve);

        match resolved {
            Ok((bundle, outcome)) => {
                if outcome.was_cached() {
                    run.emit(ServerMessage::ResponseText {
                        text: bundle.text.clone(),
                        cached: true,
                    })
                    .await;
                    run.emit(ServerMessage::LipSyncData {
                        visemes: bundle.visemes.clone(),
                        duration_ms: bundle.duration_ms,
                    })
                    .await;
                    run.emit(ServerMessage::audio_data(&bundle.audio, bundle.encoding))
                        .await;
                }
                run.emit(ServerMessage::ResponseComplete).await;

                if run.retire() {
                    run.session()
                        .record_turn(&request.text, &bundle.text, reading.emotion);
                    debug!(
                        request = %request.id,
                        session = %request.session_id,
                        cached = outcome.was_cached(),
                        elapsed_ms = request.received_at.elapsed().as_millis() as u64,
                        "request completed"
                    );
                } else {
                    debug!(
                        request = %request.id,
                        "request finished after supersession, reply discarded"
                    );
                }
            }
            Err(error) => {
                warn!(
                    request = %request.id,
                    stage = error.stage(),
                    error = %error,
                    "pipeline failed"
                );
                run.emit(ServerMessage::Error {
                    message: error.to_string(),
                    stage: error.stage().to_string(),
                })
                .await;
                run.retire();
            }
        }
    }

    /// Answers a one-shot query over the same task graph, without an event
    /// stream and without touching any conversation state.
    pub async fn respond(
        &self,
        request: &Request,
        history: &[Turn],
    ) -> Result<QueryReply, PipelineError> {
        let classification = self.classification_future(request.text.clone());
        let resolve =
            self.resolve_bundle(request, classification.clone(), history.to_vec(), None);
        let (reading, resolved) = tokio::join!(classification, resolve);
        let (bundle, outcome) = resolved?;
        Ok(QueryReply {
            bundle,
            classification: reading,
            cached: outcome.was_cached(),
        })
    }

    /// Resolves the reply bundle through the cache when enabled, or by
    /// running the chain directly when not.
    async fn resolve_bundle(
        &self,
        request: &Request,
        classification: SharedClassification,
        history: Vec<Turn>,
        streaming: Option<(PipelineRun, oneshot::Receiver<()>)>,
    ) -> Result<(Arc<ReplyBundle>, CacheOutcome), PipelineError> {
        let compute = self.compute_chain(request.text.clone(), classification, history, streaming);
        match &self.cache {
            Some(cache) => {
                cache
                    .get_or_compute(&request.normalized, self.cache_ttl, compute)
                    .await
            }
            None => compute
                .await
                .map(|bundle| (Arc::new(bundle), CacheOutcome::Computed)),
        }
    }

    /// Classification with the neutral fallback folded in: never fails,
    /// shared between the emotion event and the generation prompt.
    fn classification_future(&self, text: String) -> SharedClassification {
        let classifier = Arc::clone(&self.adapters.classifier);
        let limit = self.timeouts.classification;
        async move {
            match tokio::time::timeout(limit, classifier.classify(&text)).await {
                Ok(Ok(reading)) => reading,
                Ok(Err(error)) => {
                    warn!(error = %error, "classification failed, using neutral reading");
                    Classification::neutral_fallback()
                }
                Err(_) => {
                    warn!(
                        timeout_ms = limit.as_millis() as u64,
                        "classification timed out, using neutral reading"
                    );
                    Classification::neutral_fallback()
                }
            }
        }
        .boxed()
        .shared()
    }

    /// The sequential generate → synthesize → extract chain.
    ///
    /// Built from owned handles so the cache can run it detached from the
    /// requesting task. When `streaming` is present the chain emits each
    /// artifact as it lands, holding the reply text until the emotion
    /// event has gone out.
    fn compute_chain(
        &self,
        text: String,
        classification: SharedClassification,
        history: Vec<Turn>,
        streaming: Option<(PipelineRun, oneshot::Receiver<()>)>,
    ) -> impl Future<Output = Result<ReplyBundle, PipelineError>> + Send + 'static {
        let generator = Arc::clone(&self.adapters.generator);
        let synthesizer = Arc::clone(&self.adapters.synthesizer);
        let extractor = Arc::clone(&self.adapters.extractor);
        let timeouts = self.timeouts;

        async move {
            let reading = classification.await;
            let reply = stage_timeout(
                timeouts.generation,
                Stage::Generation,
                generator.generate(&text, reading.emotion, &history),
            )
            .await?;
            debug!(chars = reply.len(), "reply generated");

            let streaming = match streaming {
                Some((run, emotion_sent)) => {
                    // a dropped gate means the requester is gone and the
                    // emission would be suppressed anyway
                    let _ = emotion_sent.await;
                    run.emit(ServerMessage::ResponseText {
                        text: reply.clone(),
                        cached: false,
                    })
                    .await;
                    Some(run)
                }
                None => None,
            };

            let synthesis = stage_timeout(
                timeouts.synthesis,
                Stage::Synthesis,
                synthesizer.synthesize(&reply),
            )
            .await?;
            debug!(
                bytes = synthesis.audio.len(),
                encoding = %synthesis.encoding,
                "speech synthesized"
            );

            let visemes = stage_timeout(
                timeouts.extraction,
                Stage::Extraction,
                extractor.extract(&reply, &synthesis.audio),
            )
            .await?;
            let duration_ms = timeline_duration_ms(&visemes);
            debug!(frames = visemes.len(), duration_ms, "viseme timeline extracted");

            let bundle = ReplyBundle {
                text: reply,
                emotion: reading.emotion,
                audio: synthesis.audio,
                encoding: synthesis.encoding,
                visemes,
                duration_ms,
            };

            if let Some(run) = &streaming {
                run.emit(ServerMessage::LipSyncData {
                    visemes: bundle.visemes.clone(),
                    duration_ms: bundle.duration_ms,
                })
                .await;
                run.emit(ServerMessage::audio_data(&bundle.audio, bundle.encoding))
                    .await;
            }

            Ok(bundle)
        }
    }
}

/// Applies a stage budget. An elapsed budget fails the request like an
/// adapter error from that stage.
async fn stage_timeout<T, E>(
    limit: Duration,
    stage: Stage,
    operation: impl Future<Output = Result<T, E>>,
) -> Result<T, PipelineError>
where
    PipelineError: From<E>,
{
    match tokio::time::timeout(limit, operation).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(error)) => Err(PipelineError::from(error)),
        Err(_) => Err(PipelineError::StageTimeout {
            stage,
            timeout: limit,
        }),
    }
}
