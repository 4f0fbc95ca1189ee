// Service layer exports

pub mod analysis;
pub mod consistency;
pub mod narrative;
pub mod providers;
pub mod quick_scan;
pub mod rate_limit;
pub mod scoring;
pub mod store;

pub use analysis::{ScanError, ScanService};
pub use narrative::{GeminiGenerator, NarrativeContext, NarrativeGenerator};
pub use quick_scan::{QuickScanOutcome, QuickScanService};
pub use rate_limit::{
    MemoryRateLimiter, RateLimitConfig, RateLimitError, RateLimitResult, RateLimiter,
    RedisRateLimiter,
};
pub use store::{
    IntelStore, MemoryIntelStore, MemoryReportStore, MemoryResultStore, RedisIntelStore,
    RedisReportStore, RedisResultStore, ReportStore, ResultStore, StoreError,
};
