use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwarmError {
    InvalidConfig { reason: String },
    InvalidToken { reason: String },
    BuildClient { message: String },
    ReadConfigFile { path: String, message: String },
    ParseConfigFile { path: String, message: String },
    AlreadyRunning,
    NotRunning,
    ThreadSpawnFailed { reason: String },
    ThreadJoinFailed,
}

impl fmt::Display for SwarmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwarmError::InvalidConfig { reason } => write!(f, "invalid config: {}", reason),
            SwarmError::InvalidToken { reason } => write!(f, "invalid access token: {}", reason),
            SwarmError::BuildClient { message } => write!(f, "client build failed: {}", message),
            SwarmError::ReadConfigFile { path, message } => {
                write!(f, "read config file failed ({}): {}", path, message)
            }
            SwarmError::ParseConfigFile { path, message } => {
                write!(f, "parse config file failed ({}): {}", path, message)
            }
            SwarmError::AlreadyRunning => write!(f, "coordinator already running"),
            SwarmError::NotRunning => write!(f, "coordinator not running"),
            SwarmError::ThreadSpawnFailed { reason } => {
                write!(f, "failed to spawn thread: {}", reason)
            }
            SwarmError::ThreadJoinFailed => write!(f, "failed to join thread"),
        }
    }
}

impl std::error::Error for SwarmError {}
