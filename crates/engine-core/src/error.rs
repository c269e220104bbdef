use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MappingError {
    /// The mapping keeps none of the record's columns.
    #[error("No column of `{source_table}` maps onto `{target_table}`")]
    NoColumns {
        source_table: String,
        target_table: String,
    },
}
