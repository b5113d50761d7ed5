//! Provider settings shared by the `eta` and `search` commands.

use std::sync::Arc;
use std::time::Duration;

use reserve_core::{
    BreakerRegistry, EtaPipeline, Language, PipelineConfig, PlaceProvider, RouteProvider,
    TrafficProvider,
};
use reserve_data::routing::{
    DEFAULT_PRIMARY_BASE_URL, DEFAULT_SECONDARY_BASE_URL, PrimaryClient, PrimaryClientConfig,
    SecondaryClient, SecondaryClientConfig,
};

use crate::{ARG_LANGUAGE, ARG_TIMEOUT_SECS, CliError};

const DEFAULT_TIMEOUT_SECS: u64 = 4;

/// Anything that can serve as the primary service: routes, traffic and places.
pub(crate) trait PrimaryService: RouteProvider + TrafficProvider + PlaceProvider {}

impl<T: RouteProvider + TrafficProvider + PlaceProvider> PrimaryService for T {}

/// Anything that can serve as the secondary service.
pub(crate) trait SecondaryService: RouteProvider + PlaceProvider {}

impl<T: RouteProvider + PlaceProvider> SecondaryService for T {}

pub(crate) type DynPipeline = EtaPipeline<Box<dyn PrimaryService>, Box<dyn SecondaryService>>;

/// Resolved provider configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ProviderSettings {
    pub(crate) gomap_guid: Option<String>,
    pub(crate) primary_url: String,
    pub(crate) secondary_url: String,
    pub(crate) search_url: Option<String>,
    pub(crate) timeout: Duration,
    pub(crate) language: Language,
}

impl ProviderSettings {
    /// Apply defaults to the optional provider flags.
    pub(crate) fn resolve(
        gomap_guid: Option<String>,
        primary_url: Option<String>,
        secondary_url: Option<String>,
        search_url: Option<String>,
        timeout_secs: Option<u64>,
        language: Option<&str>,
    ) -> Result<Self, CliError> {
        let timeout_secs = timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(CliError::InvalidArgument {
                field: ARG_TIMEOUT_SECS,
                reason: "must be at least one second".to_owned(),
            });
        }
        Ok(Self {
            gomap_guid: gomap_guid.filter(|guid| !guid.trim().is_empty()),
            primary_url: primary_url.unwrap_or_else(|| DEFAULT_PRIMARY_BASE_URL.to_owned()),
            secondary_url: secondary_url.unwrap_or_else(|| DEFAULT_SECONDARY_BASE_URL.to_owned()),
            search_url: search_url.filter(|url| !url.trim().is_empty()),
            timeout: Duration::from_secs(timeout_secs),
            language: parse_language(language)?,
        })
    }
}

pub(crate) fn parse_language(code: Option<&str>) -> Result<Language, CliError> {
    code.map_or(Ok(Language::default()), |value| {
        value.parse().map_err(|reason| CliError::InvalidArgument {
            field: ARG_LANGUAGE,
            reason,
        })
    })
}

/// Builds the pipeline for the current invocation.
pub(crate) trait PipelineBuilder {
    fn build(&self, settings: &ProviderSettings) -> Result<DynPipeline, CliError>;
}

/// Wires the HTTP clients with a shared breaker registry.
pub(crate) struct HttpPipelineBuilder;

impl PipelineBuilder for HttpPipelineBuilder {
    fn build(&self, settings: &ProviderSettings) -> Result<DynPipeline, CliError> {
        let breakers = Arc::new(BreakerRegistry::default());

        let mut primary_config = PrimaryClientConfig::new(settings.primary_url.clone())
            .with_default_language(settings.language)
            .with_timeout(settings.timeout);
        if let Some(guid) = &settings.gomap_guid {
            primary_config = primary_config.with_guid(guid.clone());
        }
        let primary = PrimaryClient::new(primary_config, Arc::clone(&breakers)).map_err(
            |source| CliError::BuildProvider {
                provider: "primary",
                base_url: settings.primary_url.clone(),
                source,
            },
        )?;

        let mut secondary_config = SecondaryClientConfig::new(settings.secondary_url.clone())
            .with_default_language(settings.language)
            .with_timeout(settings.timeout);
        if let Some(url) = &settings.search_url {
            secondary_config = secondary_config.with_search_url(url.clone());
        }
        let secondary = SecondaryClient::new(secondary_config, breakers).map_err(|source| {
            CliError::BuildProvider {
                provider: "secondary",
                base_url: settings.secondary_url.clone(),
                source,
            }
        })?;

        Ok(EtaPipeline::new(
            Box::new(primary),
            Box::new(secondary),
            PipelineConfig::default(),
        ))
    }
}
