//! Structured event and error taxonomy shared by every crate in the platform.
//!
//! Every fallible operation returns a [`Result`], whose error carries an
//! [`EventType`] (what happened, for logging/telemetry), a [`Kind`] (how a
//! caller should react: retry, surface, ignore) and a call-site chain built
//! with [`AddContext::caused_by`]. This mirrors the error/event split used
//! throughout the reference mail server this plane was extracted from: a
//! typed, classifiable error that is also a loggable event, never a bare
//! `anyhow`-style string.

use std::{borrow::Cow, fmt};

pub mod log;

pub use log::{set_level, Level};

/// How a caller (or the LLM router) should react to an error.
///
/// This is the §7 Error Handling Design taxonomy: each variant maps to an
/// HTTP status in the `api` crate and to a retry decision in `llm-router`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum Kind {
    /// Bad input. Never retried. HTTP 400.
    Validation,
    /// Absent resource. Never retried. HTTP 404.
    NotFound,
    /// Job in the wrong state, or a duplicate-registration race. HTTP 409.
    Conflict,
    /// Hard quota limit breached. Retryable only after the caller shrinks the payload. HTTP 429.
    QuotaExceeded,
    /// Router exhausted the fallback chain. Retryable by the caller. HTTP 503.
    ProviderUnavailable,
    /// Provider-side transient failure (`rate_limited`/`timeout`/5xx). Retried
    /// internally by the router; only surfaced once attempts are exhausted.
    Retryable,
    /// Provider-side terminal failure (auth/invalid_request/unsupported). Surfaced immediately.
    Fatal,
    /// The caller's cancellation context fired. Not an error worth logging as one.
    Cancelled,
    /// Non-error: an active legal hold suppressed a retention/deletion action.
    /// Recorded in the audit trail, never propagated as a failure.
    LegalHoldSkip,
    /// Anything else gone wrong inside the server itself. HTTP 500.
    Internal,
}

impl Kind {
    /// Whether an internal retry loop (router backoff, job step) may retry
    /// without the caller having changed anything about the request.
    pub fn is_retryable(self) -> bool {
        matches!(self, Kind::Retryable | Kind::QuotaExceeded)
    }

    /// The default HTTP status associated with this error kind.
    pub fn http_status(self) -> u16 {
        match self {
            Kind::Validation => 400,
            Kind::NotFound => 404,
            Kind::Conflict => 409,
            Kind::QuotaExceeded => 429,
            Kind::ProviderUnavailable => 503,
            Kind::Retryable => 503,
            Kind::Fatal => 400,
            Kind::Cancelled => 499,
            Kind::LegalHoldSkip => 200,
            Kind::Internal => 500,
        }
    }
}

/// What happened, for logging and telemetry grouping. Each component owns a
/// sub-enum rather than one flat list, the way the teacher groups
/// `trc::ResourceEvent`, `trc::ManageEvent`, `trc::ServerEvent`, etc. under a
/// single `trc::EventType`.
#[derive(Debug, Clone, serde::Serialize)]
pub enum EventType {
    Resource(ResourceEvent),
    Storage(StorageEvent),
    Dedup(DedupEvent),
    Quota(QuotaEvent),
    Retention(RetentionEvent),
    Job(JobEvent),
    Provider(ProviderEvent),
    Server(ServerEvent),
}

#[derive(Debug, Clone, Copy, serde::Serialize)]
pub enum ResourceEvent {
    NotFound,
    BadParameters,
    AlreadyExists,
}

#[derive(Debug, Clone, Copy, serde::Serialize)]
pub enum StorageEvent {
    BackendError,
    KeyCollision,
    PresignExpired,
}

#[derive(Debug, Clone, Copy, serde::Serialize)]
pub enum DedupEvent {
    RegisterRace,
    RefcountUnderflow,
    QuarantineActive,
}

#[derive(Debug, Clone, Copy, serde::Serialize)]
pub enum QuotaEvent {
    HardLimitExceeded,
    SoftLimitExceeded,
    ReconcileDrift,
}

#[derive(Debug, Clone, Copy, serde::Serialize)]
pub enum RetentionEvent {
    LegalHoldActive,
    PolicyConflict,
}

#[derive(Debug, Clone, Copy, serde::Serialize)]
pub enum JobEvent {
    InvalidTransition,
    LeaseStolen,
    ApprovalRequired,
}

#[derive(Debug, Clone, Copy, serde::Serialize)]
pub enum ProviderEvent {
    RateLimited,
    ContextLengthExceeded,
    InvalidRequest,
    AuthenticationError,
    ServerError,
    Timeout,
    ServiceUnavailable,
    Unsupported,
    HealthFlip,
}

#[derive(Debug, Clone, Copy, serde::Serialize)]
pub enum ServerEvent {
    StartupError,
    ThreadError,
}

/// A call-site frame recorded by [`AddContext::caused_by`].
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct Location {
    pub file: &'static str,
    pub line: u32,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// Returns the call site. Use as `trc::location!()`.
#[macro_export]
macro_rules! location {
    () => {
        $crate::Location {
            file: file!(),
            line: line!(),
        }
    };
}

/// The platform's single error type. Carries enough structure that the `api`
/// crate never has to `match` on a `String` to pick an HTTP status.
#[derive(Debug, Clone)]
pub struct Error {
    pub kind: Kind,
    pub event: EventType,
    pub message: Cow<'static, str>,
    pub details: Option<String>,
    /// HTTP status code from the provider, when this wraps a provider error.
    pub status_code: Option<u16>,
    pub trace: Vec<Location>,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn new(kind: Kind, event: EventType, message: impl Into<Cow<'static, str>>) -> Self {
        Error {
            kind,
            event,
            message: message.into(),
            details: None,
            status_code: None,
            trace: Vec::new(),
        }
    }

    pub fn details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status_code = Some(status);
        self
    }

    pub fn retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    pub fn http_status(&self) -> u16 {
        self.status_code.unwrap_or_else(|| self.kind.http_status())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(details) = &self.details {
            write!(f, ": {details}")?;
        }
        for frame in &self.trace {
            write!(f, "\n  at {frame}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {}

/// Attaches call-site context to a fallible value without discarding the
/// original error, mirroring the teacher's `trc::AddContext` extension trait.
pub trait AddContext<T> {
    fn caused_by(self, location: Location) -> Result<T>;
}

impl<T> AddContext<T> for Result<T> {
    fn caused_by(self, location: Location) -> Result<T> {
        self.map_err(|mut err| {
            err.trace.push(location);
            err
        })
    }
}

impl AddContext<()> for Error {
    fn caused_by(mut self, location: Location) -> Result<()> {
        self.trace.push(location);
        Err(self)
    }
}

/// Convenience constructors grouped by component, so call sites read as
/// `trc::Error::quota(QuotaEvent::HardLimitExceeded, "mailbox over hard limit")`.
impl Error {
    pub fn resource(event: ResourceEvent, message: impl Into<Cow<'static, str>>) -> Self {
        let kind = match event {
            ResourceEvent::NotFound => Kind::NotFound,
            ResourceEvent::BadParameters => Kind::Validation,
            ResourceEvent::AlreadyExists => Kind::Conflict,
        };
        Error::new(kind, EventType::Resource(event), message)
    }

    pub fn storage(event: StorageEvent, message: impl Into<Cow<'static, str>>) -> Self {
        Error::new(Kind::Internal, EventType::Storage(event), message)
    }

    pub fn dedup(event: DedupEvent, message: impl Into<Cow<'static, str>>) -> Self {
        let kind = match event {
            DedupEvent::RegisterRace => Kind::Conflict,
            DedupEvent::RefcountUnderflow => Kind::Internal,
            DedupEvent::QuarantineActive => Kind::Conflict,
        };
        Error::new(kind, EventType::Dedup(event), message)
    }

    pub fn quota(event: QuotaEvent, message: impl Into<Cow<'static, str>>) -> Self {
        let kind = match event {
            QuotaEvent::HardLimitExceeded => Kind::QuotaExceeded,
            QuotaEvent::SoftLimitExceeded => Kind::Internal,
            QuotaEvent::ReconcileDrift => Kind::Internal,
        };
        Error::new(kind, EventType::Quota(event), message)
    }

    pub fn retention(event: RetentionEvent, message: impl Into<Cow<'static, str>>) -> Self {
        let kind = match event {
            RetentionEvent::LegalHoldActive => Kind::LegalHoldSkip,
            RetentionEvent::PolicyConflict => Kind::Internal,
        };
        Error::new(kind, EventType::Retention(event), message)
    }

    pub fn job(event: JobEvent, message: impl Into<Cow<'static, str>>) -> Self {
        let kind = match event {
            JobEvent::InvalidTransition => Kind::Conflict,
            JobEvent::LeaseStolen => Kind::Conflict,
            JobEvent::ApprovalRequired => Kind::Conflict,
        };
        Error::new(kind, EventType::Job(event), message)
    }

    pub fn provider(event: ProviderEvent, message: impl Into<Cow<'static, str>>) -> Self {
        let kind = match event {
            ProviderEvent::RateLimited
            | ProviderEvent::Timeout
            | ProviderEvent::ServerError
            | ProviderEvent::ServiceUnavailable => Kind::Retryable,
            ProviderEvent::ContextLengthExceeded
            | ProviderEvent::InvalidRequest
            | ProviderEvent::AuthenticationError
            | ProviderEvent::Unsupported => Kind::Fatal,
            ProviderEvent::HealthFlip => Kind::Internal,
        };
        Error::new(kind, EventType::Provider(event), message)
    }

    pub fn server(event: ServerEvent, message: impl Into<Cow<'static, str>>) -> Self {
        Error::new(Kind::Internal, EventType::Server(event), message)
    }

    pub fn cancelled() -> Self {
        Error::new(
            Kind::Cancelled,
            EventType::Server(ServerEvent::ThreadError),
            "operation cancelled",
        )
    }
}
