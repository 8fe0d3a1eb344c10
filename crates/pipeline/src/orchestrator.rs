//! Runs one invocation event through the whole pipeline.

use std::sync::Arc;

use facecast_core::job::placeholder_job_id;
use facecast_core::{DeliveryTarget, InvocationEvent, Job, JobRequest, JobResult, PipelineConfig};
use facecast_engine::GenerationEngine;
use serde_json::Value;
use tracing::Instrument;

use crate::acquire::AssetAcquirer;
use crate::assets::{AssetKind, JobAssets};
use crate::delivery::ResultNotifier;
use crate::error::{JobError, SetupError};
use crate::gate;
use crate::generate::{self, Artifact};
use crate::stage::{JobStage, StageTracker};

/// The only entry point the host surface calls.
///
/// Every invocation produces a [`JobResult`]; stage errors never reach the
/// caller. Temporary files are reaped after delivery on every path.
pub struct Orchestrator {
    config: PipelineConfig,
    engine: Arc<dyn GenerationEngine>,
    acquirer: AssetAcquirer,
    notifier: ResultNotifier,
}

struct Completion {
    artifact: Artifact,
    face_detected: bool,
}

impl Orchestrator {
    pub fn new(
        config: PipelineConfig,
        engine: Arc<dyn GenerationEngine>,
    ) -> Result<Self, SetupError> {
        Ok(Self {
            acquirer: AssetAcquirer::new(&config)?,
            notifier: ResultNotifier::new(&config)?,
            config,
            engine,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run a raw JSON event.
    pub async fn handle(&self, event: Value) -> JobResult {
        match InvocationEvent::from_value(event) {
            Ok(event) => self.run(&event).await,
            Err(e) => {
                tracing::error!(error = %e, "Rejected invocation event");
                JobResult::failed(JobError::from(e))
            }
        }
    }

    /// Run one parsed event to completion.
    pub async fn run(&self, event: &InvocationEvent) -> JobResult {
        let request = JobRequest::from_event(event);
        let job_id = match &request {
            Ok(request) => request.resolve_job_id(event.id.as_deref()),
            Err(_) => fallback_job_id(event),
        };

        let span = tracing::info_span!("job", job_id = %job_id);
        self.run_job(job_id, event, request).instrument(span).await
    }

    async fn run_job(
        &self,
        job_id: String,
        event: &InvocationEvent,
        request: Result<JobRequest, facecast_core::InputError>,
    ) -> JobResult {
        let (job, target) = match request {
            Ok(request) => {
                let target = request.delivery_target(&job_id);
                let job = Job::from_request(job_id, &request, self.config.inference_steps);
                (job, target)
            }
            Err(e) => {
                let target = event
                    .input
                    .as_ref()
                    .and_then(|input| DeliveryTarget::from_raw_input(input, &job_id));
                (Err(e), target)
            }
        };

        let job = match job {
            Ok(job) => job,
            Err(e) => {
                return self
                    .report_failure(&JobError::from(e), JobStage::Received, target.as_ref())
                    .await;
            }
        };

        tracing::info!(
            input = job.input.kind(),
            crop = job.params.crop,
            dynamic_scale = job.params.dynamic_scale,
            webhook = job.delivery.is_some(),
            "Job received",
        );

        let mut assets = JobAssets::default();
        let mut stages = StageTracker::new();

        let result = match self.execute(&job, &mut assets, &mut stages).await {
            Ok(completion) => {
                let result = JobResult::completed(
                    &completion.artifact.path,
                    completion.artifact.size,
                    completion.face_detected,
                );
                stages.enter(JobStage::Delivering);
                if let Some(target) = &job.delivery {
                    self.notifier
                        .notify_completed(target, &result, &completion.artifact)
                        .await;
                }
                stages.enter(JobStage::Done);
                result
            }
            Err(e) => {
                let failed_in = stages.fail();
                self.report_failure(&e, failed_in, job.delivery.as_ref())
                    .await
            }
        };

        let removed = assets.reap().await;
        tracing::debug!(removed, "Temporary files reaped");
        tracing::info!(status = result.status(), "Job finished");
        result
    }

    async fn execute(
        &self,
        job: &Job,
        assets: &mut JobAssets,
        stages: &mut StageTracker,
    ) -> Result<Completion, JobError> {
        let engine = self.engine.as_ref();

        stages.enter(JobStage::Acquiring);
        self.acquirer.acquire(&job.input, assets).await?;

        stages.enter(JobStage::Gating);
        let image = assets
            .current_image()
            .ok_or(JobError::AssetMissing(AssetKind::Image))?
            .path()
            .to_path_buf();
        let info = gate::detect_faces(engine, &image).await?;

        if job.params.crop {
            stages.enter(JobStage::Transforming);
            gate::crop_to_face(engine, assets, &info).await?;
        }

        stages.enter(JobStage::Generating);
        let image = assets
            .current_image()
            .ok_or(JobError::AssetMissing(AssetKind::Image))?;
        let audio = assets
            .audio()
            .ok_or(JobError::AssetMissing(AssetKind::Audio))?;
        let output = generate::output_path(&self.config.output_dir, &job.file_stem());
        let artifact =
            generate::generate(engine, image.path(), audio.path(), &output, &job.params).await?;

        Ok(Completion {
            artifact,
            face_detected: info.has_face(),
        })
    }

    async fn report_failure(
        &self,
        error: &JobError,
        stage: JobStage,
        target: Option<&DeliveryTarget>,
    ) -> JobResult {
        tracing::error!(
            stage = %stage,
            category = error.category().as_str(),
            error = %error,
            "Job failed",
        );
        let result = JobResult::failed(error);
        if let Some(target) = target {
            self.notifier.notify_failed(target, &result).await;
        }
        result
    }
}

/// Job id for an event whose `input` could not be parsed.
fn fallback_job_id(event: &InvocationEvent) -> String {
    let caller = event
        .input
        .as_ref()
        .and_then(|input| input.get("job_id"))
        .and_then(Value::as_str);
    caller
        .into_iter()
        .chain(event.id.as_deref())
        .map(str::trim)
        .find(|id| !id.is_empty())
        .map(str::to_string)
        .unwrap_or_else(placeholder_job_id)
}
