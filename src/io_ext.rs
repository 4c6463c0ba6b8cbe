use std::io::{ErrorKind, Result};

/// Extension trait for `io::Result` to provide `ok_if_missing`
pub trait IoResultExt<T> {
    fn ok_if_missing(self) -> Result<Option<T>>;
}

impl<T> IoResultExt<T> for Result<T> {
    /// Returns `Ok(None)` if the contained `Err` is `NotFound`, leaving other errors untouched.
    fn ok_if_missing(self) -> Result<Option<T>> {
        match self {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Error;

    #[test]
    fn test_missing() {
        let result: Result<u8> = Err(Error::from(ErrorKind::NotFound));
        assert_eq!(result.ok_if_missing().unwrap(), None);
    }

    #[test]
    fn test_other_error() {
        let result: Result<u8> = Err(Error::from(ErrorKind::PermissionDenied));
        assert_eq!(
            result.ok_if_missing().unwrap_err().kind(),
            ErrorKind::PermissionDenied
        );
    }

    #[test]
    fn test_ok() {
        assert_eq!(Ok(3).ok_if_missing().unwrap(), Some(3));
    }
}
