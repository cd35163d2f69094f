use shardlink::errors::{INTERNAL_ERROR_MESSAGE, Result, ShardlinkError};
use shardlink::resolution::{DecodeError, codec};
use std::error::Error;

#[cfg(test)]
mod error_creation_tests {
    use super::*;

    #[test]
    fn test_invalid_argument_error() {
        let error = ShardlinkError::invalid_argument("bad destination");

        assert!(matches!(error, ShardlinkError::InvalidArgument(_)));
        assert_eq!(error.code(), "E001");
        assert!(error.to_string().contains("Invalid Argument"));
        assert!(error.to_string().contains("bad destination"));
    }

    #[test]
    fn test_already_exists_error() {
        let error = ShardlinkError::already_exists("code 'abc' taken");

        assert!(matches!(error, ShardlinkError::AlreadyExists(_)));
        assert_eq!(error.code(), "E002");
        assert_eq!(error.message(), "code 'abc' taken");
    }

    #[test]
    fn test_not_found_error() {
        let error = ShardlinkError::not_found("link 'x' not found");

        assert!(matches!(error, ShardlinkError::NotFound(_)));
        assert_eq!(error.code(), "E003");
        assert_eq!(error.error_type(), "Resource Not Found");
    }

    #[test]
    fn test_internal_error() {
        let error = ShardlinkError::internal("redis: broken pipe");

        assert!(error.is_internal());
        assert_eq!(error.code(), "E004");
        assert!(error.source().is_none());
    }
}

#[cfg(test)]
mod boundary_tests {
    use super::*;

    #[test]
    fn test_public_hides_internal_details() {
        let error = ShardlinkError::internal("database: UNIQUE constraint failed: links.id");
        let public = error.public();

        assert!(public.is_internal());
        assert_eq!(public.message(), INTERNAL_ERROR_MESSAGE);
        assert!(!public.to_string().contains("links.id"));
    }

    #[test]
    fn test_public_passes_caller_errors_through() {
        for error in [
            ShardlinkError::invalid_argument("note too long"),
            ShardlinkError::already_exists("taken"),
            ShardlinkError::not_found("missing"),
        ] {
            assert_eq!(error.public(), error);
        }
    }

    #[test]
    fn test_format_colored_contains_code_and_message() {
        let error = ShardlinkError::not_found("link 'x' not found");
        let colored = error.format_colored();
        assert!(colored.contains("E003"));
        assert!(colored.contains("link 'x' not found"));
    }
}

#[cfg(test)]
mod conversion_tests {
    use super::*;

    #[test]
    fn test_from_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let error: ShardlinkError = io.into();
        assert!(error.is_internal());
        assert!(error.message().contains("denied"));
    }

    #[test]
    fn test_from_serde_json_error() {
        let json = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let error: ShardlinkError = json.into();
        assert!(error.is_internal());
        assert!(error.message().starts_with("serialization"));
    }

    #[test]
    fn test_from_db_error() {
        let db = sea_orm::DbErr::Custom("boom".to_string());
        let error: ShardlinkError = db.into();
        assert!(error.is_internal());
    }

    #[test]
    fn test_decode_error_is_internal() {
        let decode = codec::decode(&[]).unwrap_err();
        assert_eq!(decode, DecodeError::Empty);

        let error: ShardlinkError = decode.into();
        assert!(error.is_internal());
    }

    #[test]
    fn test_question_mark_propagation() {
        fn parse(raw: &str) -> Result<serde_json::Value> {
            Ok(serde_json::from_str(raw)?)
        }
        assert!(parse("[1, 2]").is_ok());
        assert!(parse("[1,").unwrap_err().is_internal());
    }
}
