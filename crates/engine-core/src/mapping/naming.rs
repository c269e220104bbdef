/// Normalizes a legacy identifier into a target identifier: trimmed,
/// lower-cased, spaces and hyphens turned into underscores, diacritics folded.
pub fn normalize_identifier(name: &str) -> String {
    let trimmed = name.trim().trim_matches(|c| c == '`' || c == '"' || c == '\'');
    let mut out = String::with_capacity(trimmed.len());
    for c in trimmed.chars().flat_map(char::to_lowercase) {
        match c {
            ' ' | '-' => out.push('_'),
            _ => match fold(c) {
                Some(folded) => out.push_str(folded),
                None => out.push(c),
            },
        }
    }
    out
}

/// Target table for a source table nothing else claims.
pub fn synthesized_table_name(source_table: &str) -> String {
    format!("legacy_{}", normalize_identifier(source_table))
}

fn fold(c: char) -> Option<&'static str> {
    let folded = match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => "a",
        'æ' => "ae",
        'ç' => "c",
        'è' | 'é' | 'ê' | 'ë' => "e",
        'ì' | 'í' | 'î' | 'ï' => "i",
        'ñ' => "n",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' => "o",
        'œ' => "oe",
        'ù' | 'ú' | 'û' | 'ü' => "u",
        'ý' | 'ÿ' => "y",
        'ß' => "ss",
        _ => return None,
    };
    Some(folded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_identifier() {
        assert_eq!(normalize_identifier("Date Entrée"), "date_entree");
        assert_eq!(normalize_identifier("montant-dû"), "montant_du");
        assert_eq!(normalize_identifier(" `Échéance` "), "echeance");
        assert_eq!(normalize_identifier("cœur"), "coeur");
        assert_eq!(normalize_identifier("locataire_id"), "locataire_id");
    }

    #[test]
    fn test_synthesized_table_name() {
        assert_eq!(synthesized_table_name("Compteur Eau"), "legacy_compteur_eau");
        assert_eq!(synthesized_table_name("relevé"), "legacy_releve");
    }
}
