//! Integration tests for error types

#[cfg(test)]
mod tests {
    use wsb_errors::*;

    #[test]
    fn test_error_conversion() {
        let err: Error = BuildError::BuildOutputTimeout {
            module: "/ws/lib/".into(),
            path: "/ws/lib/dist".into(),
            waited_ms: 1000,
        }
        .into();
        assert!(matches!(err, Error::Build(_)));
        assert_eq!(err.user_code(), Some("build.output_timeout"));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_sync_error_keeps_direction() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = SyncError::copy(
            &io_err,
            std::path::Path::new("/ws/lib/dist"),
            std::path::Path::new("/ws/app/node_modules/lib/dist"),
        );
        assert_eq!(
            err.to_string(),
            "copy failed: /ws/lib/dist -> /ws/app/node_modules/lib/dist: denied"
        );
        assert!(err.is_retryable());
    }

    #[test]
    fn test_error_clone() {
        let err = ScanError::ManifestInvalid {
            path: "/ws/app/package.json".into(),
            message: "expected value".into(),
        };
        let cloned = err.clone();
        assert_eq!(err.to_string(), cloned.to_string());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = io_err.into();
        assert!(matches!(
            err,
            Error::Io {
                kind: std::io::ErrorKind::NotFound,
                ..
            }
        ));
        assert_eq!(err.user_code(), Some("error.io"));
    }
}
