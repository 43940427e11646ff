use thiserror::Error;
use tonic::Status;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Kube(#[from] kube::Error),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Internal(String),
}

impl From<AppError> for Status {
    fn from(err: AppError) -> Self {
        let message = err.to_string();
        match err {
            AppError::NotFound(_) => Status::not_found(message),
            AppError::Conflict(_) => Status::already_exists(message),
            AppError::InvalidInput(_) => Status::invalid_argument(message),
            _ => Status::internal(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tonic::Code;

    #[test]
    fn status_carries_raw_message() {
        let status = Status::from(AppError::Conflict("Pod svc-a already exists".to_string()));
        assert_eq!(status.code(), Code::AlreadyExists);
        assert_eq!(status.message(), "Pod svc-a already exists");
    }

    #[test]
    fn remote_errors_map_to_internal() {
        let status = Status::from(AppError::Database(sqlx::Error::RowNotFound));
        assert_eq!(status.code(), Code::Internal);
        assert_eq!(status.message(), sqlx::Error::RowNotFound.to_string());
    }

    #[test]
    fn not_found_and_invalid_input_keep_their_codes() {
        assert_eq!(
            Status::from(AppError::NotFound("pod 3 not found".to_string())).code(),
            Code::NotFound
        );
        assert_eq!(
            Status::from(AppError::InvalidInput("pod name is required".to_string())).code(),
            Code::InvalidArgument
        );
    }
}
