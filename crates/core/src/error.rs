use lab_types::QuantityError;

#[derive(Debug, thiserror::Error)]
pub enum PortalError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid quantity: {0}")]
    InvalidQuantity(#[from] QuantityError),
    #[error("invalid amount {0}: amounts must be finite and non-negative")]
    InvalidAmount(f64),
    #[error("cart group contains no items")]
    EmptyCartGroup,
    #[error("invalid quotation number: {0}")]
    InvalidQuotationNumber(String),
    #[error("catalog error: {0}")]
    Catalog(#[from] catalog::CatalogError),
    #[error("failed to create upload directory: {0}")]
    UploadDirCreation(std::io::Error),
    #[error("failed to read order data: {0}")]
    Deserialization(serde_json::Error),
}

pub type PortalResult<T> = std::result::Result<T, PortalError>;
