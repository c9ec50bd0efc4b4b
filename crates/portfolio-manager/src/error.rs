use rust_decimal::Decimal;
use thiserror::Error;

/// Ledger errors. Display strings are shown to the end user as-is.
#[derive(Error, Debug)]
pub enum PortfolioError {
    #[error("Quantite invalide: doit etre superieure a 0")]
    InvalidQuantity,

    #[error("Prix invalide: {0} TND")]
    InvalidPrice(Decimal),

    #[error("Fonds insuffisants. Requis: {required:.2} TND, Disponible: {available:.2} TND")]
    InsufficientFunds { required: Decimal, available: Decimal },

    #[error("Vous ne possedez pas {0}")]
    PositionNotFound(String),

    #[error("Quantite insuffisante. Disponible: {available}, Demande: {requested}")]
    InsufficientShares { available: u64, requested: u64 },

    #[error("Portefeuille introuvable: {0}")]
    PortfolioNotFound(String),

    #[error("Le portefeuille {0} existe deja")]
    AlreadyExists(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl PortfolioError {
    /// True for errors caused by the order itself rather than storage.
    pub fn is_rejection(&self) -> bool {
        !matches!(self, Self::Io(_) | Self::Json(_) | Self::Csv(_))
    }
}
