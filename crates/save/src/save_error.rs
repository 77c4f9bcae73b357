// ---------------------------------------------------------------------------
// SaveError: error type for every save/load path
// ---------------------------------------------------------------------------

use std::fmt;

use simulation::config::ConfigError;
use simulation::DecodeError;

/// Errors that can occur during save/load operations.
///
/// A load that fails never touches a running city: every loader builds a
/// fresh `City` and only hands it back once it is complete.
#[derive(Debug)]
pub enum SaveError {
    /// I/O error (file not found, permission denied, short read, etc.)
    Io(std::io::Error),
    /// The snapshot container did not decode.
    Decode(String),
    /// One registered resource did not decode.
    Section(DecodeError),
    /// The bytes are not a city snapshot, or fail their checksum.
    Corrupt(String),
    /// Snapshot header version is newer than this build supports.
    VersionMismatch { expected_max: u32, found: u32 },
    /// The stored map size is not one a city can be built with.
    Config(ConfigError),
}

impl fmt::Display for SaveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaveError::Io(e) => write!(f, "I/O error: {e}"),
            SaveError::Decode(msg) => write!(f, "Decoding error: {msg}"),
            SaveError::Section(e) => write!(f, "Decoding error: {e}"),
            SaveError::Corrupt(msg) => write!(f, "Corrupt save: {msg}"),
            SaveError::VersionMismatch {
                expected_max,
                found,
            } => write!(
                f,
                "Version mismatch: save is v{found}, but this build only supports up to v{expected_max}"
            ),
            SaveError::Config(e) => write!(f, "Unusable city settings: {e}"),
        }
    }
}

impl std::error::Error for SaveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SaveError::Io(e) => Some(e),
            SaveError::Section(e) => Some(e),
            SaveError::Config(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SaveError {
    fn from(e: std::io::Error) -> Self {
        SaveError::Io(e)
    }
}

impl From<bitcode::Error> for SaveError {
    fn from(e: bitcode::Error) -> Self {
        SaveError::Decode(e.to_string())
    }
}

impl From<DecodeError> for SaveError {
    fn from(e: DecodeError) -> Self {
        SaveError::Section(e)
    }
}

impl From<ConfigError> for SaveError {
    fn from(e: ConfigError) -> Self {
        SaveError::Config(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_error_display_io() {
        let err = SaveError::Io(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "short file",
        ));
        let msg = format!("{err}");
        assert!(msg.contains("I/O error"), "got: {msg}");
        assert!(msg.contains("short file"), "got: {msg}");
    }

    #[test]
    fn test_save_error_display_corrupt() {
        let err = SaveError::Corrupt("checksum mismatch".to_string());
        let msg = format!("{err}");
        assert!(msg.contains("Corrupt save"), "got: {msg}");
        assert!(msg.contains("checksum mismatch"), "got: {msg}");
    }

    #[test]
    fn test_save_error_display_version_mismatch() {
        let err = SaveError::VersionMismatch {
            expected_max: 1,
            found: 99,
        };
        let msg = format!("{err}");
        assert!(msg.contains("v99"), "got: {msg}");
        assert!(msg.contains("v1"), "got: {msg}");
    }

    #[test]
    fn test_save_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let save_err: SaveError = io_err.into();
        assert!(matches!(save_err, SaveError::Io(_)));
        assert!(std::error::Error::source(&save_err).is_some());
    }

    #[test]
    fn test_save_error_from_bad_bitcode() {
        let bad: Result<u32, _> = bitcode::decode(&[0xFF]);
        let save_err: SaveError = bad.unwrap_err().into();
        assert!(matches!(save_err, SaveError::Decode(_)));
    }
}
