use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use split_engine::{ExpenseApiError, GroupApiError, SettlementApiError, UserApiError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Auth token signature invalid or not provided")]
    CouldNotDeserializeAuthToken,
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("The request conflicts with the current state. {0}")]
    Conflict(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::CouldNotDeserializeAuthToken => StatusCode::UNAUTHORIZED,
            Self::AuthenticationError(e) => match e {
                AuthError::ValidationError(_) => StatusCode::UNAUTHORIZED,
                AuthError::TokenExpired => StatusCode::UNAUTHORIZED,
                AuthError::PoorlyFormattedToken(_) => StatusCode::BAD_REQUEST,
            },
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("Access token signature is invalid. {0}")]
    ValidationError(String),
    #[error("Access token has expired.")]
    TokenExpired,
    #[error("Access token is not in the correct format. {0}")]
    PoorlyFormattedToken(String),
}

impl From<GroupApiError> for ServerError {
    fn from(e: GroupApiError) -> Self {
        match e {
            GroupApiError::Validation(v) => Self::InvalidRequestBody(v.to_string()),
            GroupApiError::GroupNotFound(_) | GroupApiError::UserNotFound(_) => Self::NoRecordFound(e.to_string()),
            GroupApiError::AlreadyMember => Self::Conflict(e.to_string()),
            GroupApiError::AccessDenied(_) => Self::InsufficientPermissions(e.to_string()),
            GroupApiError::StorageError(s) => Self::BackendError(s),
        }
    }
}

impl From<ExpenseApiError> for ServerError {
    fn from(e: ExpenseApiError) -> Self {
        match e {
            ExpenseApiError::Validation(v) => Self::InvalidRequestBody(v.to_string()),
            ExpenseApiError::ExpenseNotFound(_) | ExpenseApiError::SplitNotFound(_) => {
                Self::NoRecordFound(e.to_string())
            },
            ExpenseApiError::Settlement(_) => Self::BackendError(e.to_string()),
            ExpenseApiError::StorageError(s) => Self::BackendError(s),
        }
    }
}

impl From<SettlementApiError> for ServerError {
    fn from(e: SettlementApiError) -> Self {
        match e {
            SettlementApiError::Validation(v) => Self::InvalidRequestBody(v.to_string()),
            SettlementApiError::SettlementNotFound(_) => Self::NoRecordFound(e.to_string()),
            SettlementApiError::NotAParticipant | SettlementApiError::NotYourDebt => {
                Self::InsufficientPermissions(e.to_string())
            },
            SettlementApiError::AlreadyPaid => Self::Conflict(e.to_string()),
            SettlementApiError::StorageError(s) => Self::BackendError(s),
        }
    }
}

impl From<UserApiError> for ServerError {
    fn from(e: UserApiError) -> Self {
        match e {
            UserApiError::Validation(v) => Self::InvalidRequestBody(v.to_string()),
            UserApiError::SearchTermTooShort(_) => Self::InvalidRequestBody(e.to_string()),
            UserApiError::StorageError(s) => Self::BackendError(s),
        }
    }
}
