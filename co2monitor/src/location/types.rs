//! Location acquisition vocabulary.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::model::Coordinates;

/// Maximum attempts per detection sequence.
pub const MAX_ATTEMPTS: u32 = 3;

/// Delay before an automatic retry.
pub const RETRY_DELAY: Duration = Duration::from_secs(2);

/// Platform timeout for the first attempt.
pub const FIRST_ATTEMPT_TIMEOUT_MS: u64 = 20_000;

/// Platform timeout for every later attempt.
pub const RETRY_ATTEMPT_TIMEOUT_MS: u64 = 30_000;

/// Cached fixes up to this age are acceptable when caching is allowed.
pub const CACHED_FIX_MAX_AGE_MS: u64 = 60_000;

/// Accuracy requested from the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccuracyMode {
    High,
    Standard,
}

/// Parameters of one platform position request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeoAttempt {
    /// 1-based attempt number within the sequence.
    pub number: u32,
    pub accuracy: AccuracyMode,
    pub timeout_ms: u64,
    pub allow_cache: bool,
}

impl GeoAttempt {
    /// Parameters for attempt `number` (1-based).
    ///
    /// The first attempt asks for high accuracy with a short timeout and
    /// accepts a cached fix; later attempts trade accuracy for a longer
    /// timeout and always ask for a fresh fix.
    pub fn nth(number: u32) -> Self {
        let first = number <= 1;
        Self {
            number,
            accuracy: if first {
                AccuracyMode::High
            } else {
                AccuracyMode::Standard
            },
            timeout_ms: if first {
                FIRST_ATTEMPT_TIMEOUT_MS
            } else {
                RETRY_ATTEMPT_TIMEOUT_MS
            },
            allow_cache: first,
        }
    }

    pub fn high_accuracy(&self) -> bool {
        self.accuracy == AccuracyMode::High
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Maximum age of a cached fix the platform may return.
    pub fn maximum_age_ms(&self) -> u64 {
        if self.allow_cache {
            CACHED_FIX_MAX_AGE_MS
        } else {
            0
        }
    }
}

/// Failure reported by the platform for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PositionError {
    PermissionDenied,
    PositionUnavailable,
    Timeout,
}

impl PositionError {
    /// Whether another attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, PositionError::PermissionDenied)
    }

    pub fn outcome(&self) -> GeoOutcome {
        match self {
            PositionError::PermissionDenied => GeoOutcome::Denied,
            PositionError::PositionUnavailable => GeoOutcome::Unavailable,
            PositionError::Timeout => GeoOutcome::TimedOut,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            PositionError::PermissionDenied => "Permisos de ubicación denegados",
            PositionError::PositionUnavailable => "Ubicación no disponible",
            PositionError::Timeout => "Tiempo de espera agotado",
        }
    }
}

impl fmt::Display for PositionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for PositionError {}

/// Result of one platform position request.
pub type PositionResult = Result<Coordinates, PositionError>;

/// Answer of the optional permission query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PermissionState {
    Granted,
    Denied,
    Prompt,
}

impl PermissionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionState::Granted => "granted",
            PermissionState::Denied => "denied",
            PermissionState::Prompt => "prompt",
        }
    }
}

impl FromStr for PermissionState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "granted" => Ok(PermissionState::Granted),
            "denied" => Ok(PermissionState::Denied),
            "prompt" => Ok(PermissionState::Prompt),
            other => Err(format!(
                "unknown permission state '{}' (expected granted, denied or prompt)",
                other
            )),
        }
    }
}

/// Outcome of a detection request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GeoOutcome {
    Success(Coordinates),
    Denied,
    /// Location capability missing, or a single attempt found no fix.
    Unavailable,
    /// A single attempt timed out.
    TimedOut,
    /// Every allowed attempt failed.
    Exhausted,
    /// A newer detection replaced this one before it finished.
    Superseded,
}

impl GeoOutcome {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            GeoOutcome::Success(_) | GeoOutcome::Denied | GeoOutcome::Exhausted
        )
    }

    pub fn location(&self) -> Option<Coordinates> {
        match self {
            GeoOutcome::Success(at) => Some(*at),
            _ => None,
        }
    }
}

/// Informational panel content produced while detecting.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationNotice {
    /// The platform has no location capability.
    Unsupported,
    /// Automatic detection is disabled on this platform.
    AutoDetectDisabled,
    /// A request is in flight.
    Detecting { attempt: u32, max: u32 },
    /// The first attempt failed and an automatic retry is scheduled.
    Retrying { failure: PositionError, remaining: u32 },
    /// Permission was denied.
    Denied,
    /// Every attempt failed. `constrained` selects platform-specific advice.
    Exhausted { constrained: bool },
    /// A position was obtained.
    Located(Coordinates),
}

impl LocationNotice {
    pub fn message(&self) -> String {
        match self {
            LocationNotice::Unsupported => {
                "Geolocalización no soportada: selecciona una ciudad manualmente".to_string()
            }
            LocationNotice::AutoDetectDisabled => {
                "La detección automática de ubicación está deshabilitada en este sistema. \
                 Usa 'locate' o selecciona una ciudad manualmente"
                    .to_string()
            }
            LocationNotice::Detecting { attempt, max } => {
                format!("Detectando ubicación (intento {}/{})...", attempt, max)
            }
            LocationNotice::Retrying { failure, remaining } => format!(
                "{}. Reintentando automáticamente ({} intentos restantes)",
                failure, remaining
            ),
            LocationNotice::Denied => "Permisos de ubicación denegados. Para obtener datos \
                                       locales, permite el acceso a tu ubicación"
                .to_string(),
            LocationNotice::Exhausted { constrained: false } => {
                "No se pudo detectar tu ubicación: se agotaron los intentos de detección \
                 automática. Verifica los permisos de ubicación y reinicia la detección"
                    .to_string()
            }
            LocationNotice::Exhausted { constrained: true } => {
                "La detección de ubicación puede fallar por limitaciones del sistema. \
                 Reinicia la detección o selecciona una ciudad manualmente"
                    .to_string()
            }
            LocationNotice::Located(at) => format!("Ubicación detectada: {}", at),
        }
    }
}

impl fmt::Display for LocationNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}
