use model::core::data_type::InferredColumnType;

/// Keyword rules, first match wins. Matching is on the lower-cased target name.
const RULES: &[(&[&str], InferredColumnType)] = &[
    (
        &["date", "timestamp", "echeance", "periode"],
        InferredColumnType::Timestamp,
    ),
    (
        &[
            "montant", "taux", "prix", "cout", "solde", "amount", "loy", "charges", "caf", "tva",
        ],
        InferredColumnType::AMOUNT,
    ),
    (
        &["statut", "status", "type", "mode", "orig", "code"],
        InferredColumnType::varchar(100),
    ),
    (&["email"], InferredColumnType::varchar(255)),
    (&["telephone", "phone"], InferredColumnType::varchar(50)),
    (
        &[
            "commentaire",
            "description",
            "libelle",
            "message",
            "details",
            "notes",
        ],
        InferredColumnType::Text,
    ),
];

const FALLBACK: InferredColumnType = InferredColumnType::varchar(255);

/// Column type for a table the pipeline creates, guessed from the column name.
pub fn infer_column_type(column: &str) -> InferredColumnType {
    let name = column.to_lowercase();

    if name == "id" || name == "p_id" || name.ends_with("_id") {
        return InferredColumnType::Integer;
    }

    RULES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| name.contains(k)))
        .map(|(_, ty)| *ty)
        .unwrap_or(FALLBACK)
}
