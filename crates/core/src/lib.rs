pub mod browser;
pub mod classify;
pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod llm;
pub mod normalize;
pub mod pipeline;
pub mod prompts;
pub mod record;

pub use browser::{BrowserAcquirer, BrowserLauncher, BrowserSession};
#[cfg(feature = "browser")]
pub use browser::{ChromiumLauncher, ChromiumSession};
pub use classify::is_markup;
pub use config::{AcquireStrategy, PipelineConfig, PipelineConfigBuilder};
pub use error::{ErrorKind, JoblensError, Result};
pub use extract::StructuredExtractor;
pub use fetch::{Acquirer, AcquisitionResult, FetchConfig, HttpAcquirer, acquirer_for};
pub use llm::{ModelConfig, ModelError, OpenAiModel, OutputSchema, StructuredModel};
pub use normalize::{ConversionError, Converter, NormalizeConfig, Normalizer};
pub use pipeline::{Pipeline, Stage, prepare, validate_url};
pub use record::{Employment, EmploymentType, ImportantInfo, JobRecord, Location, Metadata, RemoteStatus, SalaryRange};
