//! Copy engine implementation

use crate::destination::{multiple_into_missing, DestinationResolver};
use crate::error::CopyError;
use crate::pattern::{PatternResolver, ResolvedSource};
use crate::retry::{TransferOutcome, TransferRetryPolicy};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, error, info, info_span, warn, Instrument};
use vocp_config::RetryConfig;
use vocp_storage::Storage;
use vocp_types::paths;
use vocp_types::{
    AccessMode, CopyOptions, CopyResult, DenyOverwrite, Error, OverwritePrompt, Result,
};

type CopyFuture<'a> = Pin<Box<dyn Future<Output = std::result::Result<(), CopyError>> + Send + 'a>>;

/// Make a local path absolute and lexically normal, without touching the
/// filesystem
pub fn absolute_local(path: &str) -> Result<String> {
    let absolute = std::path::absolute(path).map_err(|e| Error::from_io(&e, path))?;
    Ok(paths::normalize(&absolute.to_string_lossy()))
}

/// Recursive copier between the local filesystem and the node store
pub struct CopyEngine {
    storage: Storage,
    options: CopyOptions,
    retry: TransferRetryPolicy,
    prompt: Arc<dyn OverwritePrompt>,
}

impl std::fmt::Debug for CopyEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CopyEngine")
            .field("storage", &self.storage)
            .field("options", &self.options)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl CopyEngine {
    /// Engine with default retry settings that refuses overwrites when asked
    pub fn new(storage: Storage, options: CopyOptions) -> Self {
        EngineBuilder::new(storage).with_options(options).build()
    }

    /// Options of this engine
    pub fn options(&self) -> &CopyOptions {
        &self.options
    }

    /// Copy every source pattern to `destination`.
    ///
    /// Non-fatal failures are summed into [`CopyResult::exit_code`]; the first
    /// fatal one ends the run.
    pub async fn copy(
        &self,
        sources: &[String],
        destination: &str,
    ) -> std::result::Result<CopyResult, CopyError> {
        let mut result = CopyResult::new();
        let span = info_span!("copy", run = %result.run_id);

        self.run(sources, destination, &mut result)
            .instrument(span)
            .await?;

        info!(
            "Copy finished: {} files, {} directories, {} skipped, exit code {}",
            result.stats.files_copied,
            result.stats.directories_created,
            result.stats.files_skipped,
            result.exit_code
        );
        Ok(result)
    }

    async fn run(
        &self,
        sources: &[String],
        destination: &str,
        result: &mut CopyResult,
    ) -> std::result::Result<(), CopyError> {
        let destination = if self.storage.is_remote(destination) {
            destination.to_string()
        } else {
            absolute_local(destination).map_err(|e| CopyError::new(e, destination))?
        };

        if sources.len() > 1
            && !self
                .storage
                .adapter(&destination)
                .can_access(&destination, AccessMode::Exists)
                .await
        {
            return Err(CopyError::new(
                multiple_into_missing(&destination),
                destination,
            ));
        }

        let patterns = PatternResolver::new(&self.storage);
        let destinations = DestinationResolver::new(&self.storage, sources.len());

        for pattern in sources {
            if self.options.headers_only && !self.storage.is_remote(pattern) {
                error!("{}: head only works for remote sources", pattern);
                continue;
            }

            let resolved = patterns
                .resolve(pattern)
                .await
                .map_err(|e| CopyError::new(e, &destination).with_source(pattern))?;
            if resolved.is_empty() {
                debug!("{} matched nothing", pattern);
            }

            for source in resolved {
                let label = source.to_string();
                match self
                    .copy_source(source, &destination, &destinations, result)
                    .await
                {
                    Err(e) if e.error.is_skippable() => {
                        warn!("{}: Skipping", e);
                        result.record_failed_skip(e.error.errno());
                    }
                    Err(mut e) => {
                        if e.source_path.is_none() {
                            e.source_path = Some(label);
                        }
                        return Err(e);
                    }
                    Ok(()) => {}
                }
            }
        }
        Ok(())
    }

    /// Top-level checks for one expanded source, then the recursive copy
    async fn copy_source(
        &self,
        mut source: ResolvedSource,
        destination: &str,
        destinations: &DestinationResolver<'_>,
        result: &mut CopyResult,
    ) -> std::result::Result<(), CopyError> {
        let fail = |error: Error| CopyError::new(error, destination);

        if !self.storage.is_remote(&source.path) {
            source.path = absolute_local(&source.path).map_err(fail)?;
        }

        let adapter = self.storage.adapter(&source.path);
        if !adapter.can_access(&source.path, AccessMode::Read).await {
            return Err(fail(Error::usage(format!(
                "Can't access source: {}",
                source
            ))));
        }

        if !self.options.follow_symlinks && self.is_symlink(&source.path).await.map_err(fail)? {
            info!("{}: Skipping (symbolic link)", source);
            result.stats.symlinks_skipped += 1;
            return Ok(());
        }

        if self.storage.is_remote(&source.path) && self.storage.is_remote(destination) {
            let from = paths::scheme(&source.path);
            let to = paths::scheme(destination);
            if from != to {
                return Err(fail(Error::CrossService {
                    from: source.to_string(),
                    to: destination.to_string(),
                }));
            }
        }

        let target = destinations.resolve(&source, destination).await.map_err(fail)?;
        self.copy_item(&source, &target, result).await
    }

    async fn is_symlink(&self, path: &str) -> Result<bool> {
        match self.storage.adapter(path).is_symlink(path).await {
            Err(Error::NotFound { .. }) => Ok(false),
            other => other,
        }
    }

    fn is_filtered_out(&self, destination: &str) -> bool {
        let matches_any =
            |patterns: &[String]| patterns.iter().any(|p| destination.contains(p.as_str()));

        if let Some(include) = &self.options.include_patterns {
            return !matches_any(include.as_slice());
        }
        self.options
            .exclude_patterns
            .as_deref()
            .is_some_and(matches_any)
    }

    /// Copy one item, recursing into directories. Invalid local paths are
    /// skipped here; anything else escaping this level is fatal.
    fn copy_item<'a>(
        &'a self,
        source: &'a ResolvedSource,
        destination: &'a str,
        result: &'a mut CopyResult,
    ) -> CopyFuture<'a> {
        Box::pin(async move {
            match self.copy_item_inner(source, destination, result).await {
                Err(e) if e.error.is_skippable() => {
                    warn!("{}: Skipping", e);
                    result.record_failed_skip(e.error.errno());
                    Ok(())
                }
                other => other,
            }
        })
    }

    async fn copy_item_inner(
        &self,
        source: &ResolvedSource,
        destination: &str,
        result: &mut CopyResult,
    ) -> std::result::Result<(), CopyError> {
        let fail = |error: Error| CopyError::new(error, destination).with_source(source.to_string());

        if !self.options.follow_symlinks && self.is_symlink(&source.path).await.map_err(fail)? {
            info!("{}: Skipping (symbolic link)", source);
            result.stats.symlinks_skipped += 1;
            return Ok(());
        }

        let source_adapter = self.storage.adapter(&source.path);
        if source_adapter.is_directory(&source.path).await.map_err(fail)? {
            let destination_adapter = self.storage.adapter(destination);
            if !destination_adapter
                .is_directory(destination)
                .await
                .map_err(fail)?
            {
                destination_adapter
                    .create_directory(destination)
                    .await
                    .map_err(fail)?;
                result.stats.directories_created += 1;
            }

            let children = source_adapter
                .list_children(&source.path)
                .await
                .map_err(fail)?;
            for child in children {
                let name = match child {
                    Ok(name) => name,
                    Err(e) if e.is_skippable() => {
                        warn!("{}: Skipping", e);
                        result.record_failed_skip(e.errno());
                        continue;
                    }
                    Err(e) => return Err(fail(e)),
                };
                debug!("{} -> {}", name, source.path);
                let child = ResolvedSource::plain(paths::join(&source.path, &name));
                let child_destination = paths::join(destination, &name);
                self.copy_item(&child, &child_destination, result).await?;
            }
            return Ok(());
        }

        if self.is_filtered_out(destination) {
            info!("{}: Skipping (filtered)", destination);
            result.stats.files_skipped += 1;
            return Ok(());
        }

        if self.options.interactive_overwrite
            && self
                .storage
                .adapter(destination)
                .can_access(destination, AccessMode::Exists)
                .await
            && !self.prompt.confirm_overwrite(destination).map_err(fail)?
        {
            return Err(fail(Error::OverwriteDeclined {
                path: destination.to_string(),
            }));
        }

        let transfer_source = source.transfer_path();
        let transfer_source = transfer_source.as_str();
        info!("{} -> {}", transfer_source, destination);
        let adapter = self.storage.transfer_adapter(transfer_source, destination);
        let headers_only = self.options.headers_only;

        let outcome = self
            .retry
            .run(result, || {
                adapter.transfer(transfer_source, destination, headers_only)
            })
            .await
            .map_err(fail)?;
        if outcome == TransferOutcome::Transferred {
            result.stats.files_copied += 1;
        }
        Ok(())
    }
}

/// Builder for [`CopyEngine`]
pub struct EngineBuilder {
    storage: Storage,
    options: CopyOptions,
    retry_config: RetryConfig,
    prompt: Arc<dyn OverwritePrompt>,
}

impl EngineBuilder {
    /// Start from storage, default options and default retry settings
    pub fn new(storage: Storage) -> Self {
        Self {
            storage,
            options: CopyOptions::default(),
            retry_config: RetryConfig::default(),
            prompt: Arc::new(DenyOverwrite),
        }
    }

    /// Set the copy options
    pub fn with_options(mut self, options: CopyOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the retry budget
    pub fn with_retry_config(mut self, config: RetryConfig) -> Self {
        self.retry_config = config;
        self
    }

    /// Set the prompt consulted before overwrites
    pub fn with_prompt(mut self, prompt: Arc<dyn OverwritePrompt>) -> Self {
        self.prompt = prompt;
        self
    }

    /// Build the copy engine
    pub fn build(self) -> CopyEngine {
        let retry = TransferRetryPolicy::from_config(&self.retry_config, self.options.ignore_errors);
        CopyEngine {
            storage: self.storage,
            options: self.options,
            retry,
            prompt: self.prompt,
        }
    }
}
