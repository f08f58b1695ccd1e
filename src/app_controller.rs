use anyhow::{Context, Result, anyhow};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::app_config::{Config, PostEditConfig, TranslationProvider};
use crate::file_utils::FileManager;
use crate::language_utils::get_language_name;
use crate::providers::TextGenerator;
use crate::providers::ollama::Ollama;
use crate::providers::openai::OpenAI;
use crate::translation::models::HttpModelLoader;
use crate::translation::mt::MtTranslator;
use crate::translation::pipeline::{
    PipelineOptions, PipelinePhase, PipelineProgress, PipelineStats, TranslationPipeline, TranslationRequest,
};
use crate::translation::postedit::{PostEditSettings, PostEditor};
use crate::translation::registry::{ModelRegistry, TranslationStrategy};
use crate::translation::segmenter::MarkdownSegmenter;

// @module: Application controller for document translation

/// What to do for one input file
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub input: PathBuf,
    /// Defaults to `<stem>.<target>.<ext>` next to the input; `-` writes to stdout
    pub output: Option<PathBuf>,
    pub glossary: Option<PathBuf>,
    /// Write `<output>.debug.json`
    pub debug: bool,
    /// Load the models and stop
    pub prefetch_only: bool,
}

/// Outcome of a finished run
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// `None` for a prefetch-only run or stdout output
    pub output_path: Option<PathBuf>,
    pub report_path: Option<PathBuf>,
    pub strategy: TranslationStrategy,
    pub stats: PipelineStats,
    pub duration: Duration,
}

/// Main application controller for markdown translation
pub struct Controller {
    // @field: App configuration
    config: Config,
}

impl Controller {
    /// Create a new controller for test purposes with default configuration
    pub fn new_for_test() -> Result<Self> {
        Self::with_config(Config::default())
    }

    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate().context("Configuration validation failed")?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Build the LLM client for the configured post-edit provider.
    ///
    /// Provider-level retries are limited to one, the post-editor owns the attempt budget.
    pub fn build_generator(config: &PostEditConfig) -> Arc<dyn TextGenerator> {
        let timeout = Duration::from_secs(config.timeout_secs);
        match config.provider {
            TranslationProvider::Ollama => Arc::new(Ollama::new_with_config(
                config.get_endpoint(),
                config.get_model(),
                1,
                config.retry_backoff_ms,
                timeout,
            )),
            TranslationProvider::OpenAI | TranslationProvider::LMStudio => Arc::new(OpenAI::new_with_config(
                config.get_endpoint(),
                config.api_key.clone(),
                config.get_model(),
                1,
                config.retry_backoff_ms,
                timeout,
            )),
        }
    }

    /// Wire segmenter, registry, MT backend and post-editor from the configuration
    pub fn build_pipeline(&self) -> Result<TranslationPipeline> {
        let segmenter = MarkdownSegmenter::with_protected_patterns(&self.config.translation.protected_patterns)
            .context("Invalid protected pattern")?;
        let registry = ModelRegistry::new().with_fallback_model(self.config.mt.fallback_model.clone());
        let loader = HttpModelLoader::new(
            self.config.mt.endpoint.clone(),
            self.config.mt.device.clone(),
            Duration::from_secs(self.config.mt.timeout_secs),
        )
        .context("Failed to create the MT backend client")?;

        let mut pipeline = TranslationPipeline::new(segmenter, registry, MtTranslator::new(Arc::new(loader)));
        if self.config.postedit.enabled {
            let settings = PostEditSettings::from_config(&self.config.postedit, &self.config.translation.tone);
            let posteditor = PostEditor::new(Self::build_generator(&self.config.postedit), settings);
            pipeline = pipeline.with_posteditor(posteditor);
        }
        Ok(pipeline)
    }

    /// Pipeline options derived from the configuration
    pub fn pipeline_options(&self, debug: bool) -> PipelineOptions {
        let translation = &self.config.translation;
        let postedit = &self.config.postedit;
        PipelineOptions {
            allow_pivot: translation.allow_pivot,
            postedit: postedit.enabled,
            sampling: PostEditSettings::from_config(postedit, &translation.tone).sampling,
            debug,
            max_concurrent_segments: translation.max_concurrent_segments,
            translate_link_labels: translation.translate_link_labels,
        }
    }

    /// Run the main workflow for one input file
    pub async fn run(&self, options: RunOptions, cancel: CancellationToken) -> Result<RunSummary> {
        let pipeline = self.build_pipeline()?;
        self.run_with_pipeline(&pipeline, options, cancel).await
    }

    /// Run the workflow with an already built pipeline
    pub async fn run_with_pipeline(
        &self,
        pipeline: &TranslationPipeline,
        options: RunOptions,
        cancel: CancellationToken,
    ) -> Result<RunSummary> {
        let start_time = Instant::now();
        let source = &self.config.source_language;
        let target = &self.config.target_language;
        let mut pipeline_options = self.pipeline_options(options.debug);

        if options.prefetch_only {
            let strategy = pipeline
                .prefetch(source, target, pipeline_options.allow_pivot)
                .await
                .context("Model prefetch failed")?;
            let (hits, misses, _) = pipeline.translator().cache().stats();
            info!("Models ready for {} -> {}: {} ({} loaded, {} cached)", source, target, strategy, misses, hits);
            return Ok(RunSummary {
                output_path: None,
                report_path: None,
                strategy,
                stats: PipelineStats::default(),
                duration: start_time.elapsed(),
            });
        }

        if !FileManager::file_exists(&options.input) {
            return Err(anyhow!("Input file does not exist: {:?}", options.input));
        }
        let text = FileManager::read_to_string(&options.input)?;
        let glossary = match &options.glossary {
            Some(path) => {
                let glossary = FileManager::load_glossary(path)?;
                info!("Loaded {} glossary entries from {:?}", glossary.len(), path);
                Some(glossary)
            }
            None => None,
        };
        let default_output = FileManager::generate_output_path(&options.input, target);
        let output_path = match &options.output {
            Some(path) if FileManager::is_stdout(path) => None,
            Some(path) => Some(path.clone()),
            None => Some(default_output.clone()),
        };

        // Unsupported pairs fail here, before any model call
        let (pair, strategy) = pipeline.resolve(source, target, pipeline_options.allow_pivot)?;
        info!(
            "mdtrans: {} -> {} ({}) using {}",
            language_name(pair.source.as_str()),
            language_name(pair.target.as_str()),
            pair,
            strategy
        );

        if let Err(e) = pipeline.translator().prefetch(&strategy).await {
            warn!("Model prefetch failed, segments will fall back: {}", e);
        }

        if pipeline_options.postedit {
            match pipeline.posteditor() {
                Some(posteditor) => {
                    if let Err(e) = posteditor.check_connection().await {
                        warn!("{} unreachable, skipping post-edit: {}", posteditor.generator_name(), e);
                        pipeline_options.postedit = false;
                    } else {
                        info!("Post-editing with {}", posteditor.generator_name());
                    }
                }
                None => pipeline_options.postedit = false,
            }
        }

        let mut request = TranslationRequest::new(source.clone(), target.clone(), text).with_options(pipeline_options);
        request.glossary = glossary;

        let progress_bar = ProgressBar::new(0);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} segments ({percent}%) {msg}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(style.progress_chars("█▓▒░"));

        let pb = progress_bar.clone();
        let on_progress = move |progress: PipelineProgress| {
            if matches!(progress.phase, PipelinePhase::Translating | PipelinePhase::PostEditing) {
                pb.set_length(progress.total as u64);
                pb.set_position(progress.completed as u64);
                pb.set_message(progress.phase.to_string());
            }
        };

        let result = pipeline
            .translate_with_progress(&request, &cancel, Some(&on_progress))
            .await;
        progress_bar.finish_and_clear();
        let output = result?;

        match &output_path {
            Some(path) => {
                FileManager::write_atomic(path, &output.text)?;
                info!("Success: {}", path.display());
            }
            None => FileManager::write_stdout(&output.text)?,
        }

        let report_path = match &output.report {
            Some(report) => {
                // With stdout output the report goes where the file would have been
                let path = FileManager::debug_report_path(output_path.as_ref().unwrap_or(&default_output));
                let json = report.to_json_pretty().context("Failed to serialize debug report")?;
                FileManager::write_atomic(&path, &json)?;
                debug!("Debug report written to {}", path.display());
                for snapshot in report.flagged_segments() {
                    debug!("Segment {} flagged: {:?}", snapshot.id, snapshot.issues);
                }
                Some(path)
            }
            None => None,
        };

        let stats = output.stats();
        if stats.flagged > 0 {
            warn!("{} segment(s) flagged, see the debug report for details", stats.flagged);
        }
        let duration = start_time.elapsed();
        info!("Done in {}: {}", Self::format_duration(duration), stats.summary());

        Ok(RunSummary {
            output_path,
            report_path,
            strategy: output.strategy,
            stats,
            duration,
        })
    }

    // Format duration in a human-readable format
    fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}

/// English name of a validated code, or the code itself
fn language_name(code: &str) -> String {
    get_language_name(code).unwrap_or_else(|_| code.to_string())
}
