pub mod config;
pub mod discern;
pub mod metadata;
pub mod output;
pub mod runner;
pub mod source;
pub mod task;
pub mod testing;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, ConfigPaths,
    MediaType, NamingRule, TaskContext,
};
pub use discern::{discern, match_rule, CandidateOrigin, CompiledRule, ParsedIdentity};
pub use metadata::{
    create_provider, EnrichmentRecord, MetadataError, MetadataProvider, MetadataQuery,
};
pub use output::{create_output, AuditRecord, OutputError, OutputWriter, WriteOutcome};
pub use runner::{RunSummary, Runner};
pub use source::{collect_files, create_source, FileDescriptor, FilePage, Source, SourceError};
pub use task::{FileOutcome, PipelineError, SkipReason, TaskProcessor, TaskSummary};
