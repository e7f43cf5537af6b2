use super::domain::{FieldDescriptor, FieldId, RuleKind};

/// Ids of the fields whose label carries one of the kind's keywords, in schema order.
pub fn discover(kind: RuleKind, fields: &[FieldDescriptor]) -> Vec<FieldId> {
    let keywords = kind.keywords();
    fields
        .iter()
        .filter(|field| label_matches(&field.name, keywords))
        .map(|field| field.id)
        .collect()
}

fn label_matches(label: &str, keywords: &[&str]) -> bool {
    let label = label.trim().to_lowercase();
    if label.is_empty() {
        return false;
    }
    keywords.iter().any(|keyword| label.contains(keyword))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(id: u64, name: &str) -> FieldDescriptor {
        FieldDescriptor {
            id: FieldId(id),
            name: name.to_string(),
            field_type: "text".to_string(),
        }
    }

    #[test]
    fn finds_zip_fields_by_any_keyword_in_order() {
        let fields = vec![
            field(3, "Name"),
            field(7, "Billing ZIP"),
            field(9, "Postal code"),
            field(11, "Post Code"),
            field(12, "UK postcode"),
            field(14, "Email"),
        ];

        let found = discover(RuleKind::Zip, &fields);
        assert_eq!(found, vec![FieldId(7), FieldId(9), FieldId(11), FieldId(12)]);
    }

    #[test]
    fn finds_state_and_province_fields() {
        let fields = vec![
            field(1, "  State / Region "),
            field(2, "Province"),
            field(3, "City"),
        ];

        assert_eq!(
            discover(RuleKind::State, &fields),
            vec![FieldId(1), FieldId(2)]
        );
    }

    #[test]
    fn kinds_are_evaluated_independently() {
        let fields = vec![field(5, "State ZIP combo")];
        assert_eq!(discover(RuleKind::Zip, &fields), vec![FieldId(5)]);
        assert_eq!(discover(RuleKind::State, &fields), vec![FieldId(5)]);
    }

    #[test]
    fn blank_labels_and_empty_schemas_match_nothing() {
        assert!(discover(RuleKind::Zip, &[]).is_empty());
        assert!(discover(RuleKind::Zip, &[field(1, "   ")]).is_empty());
        assert!(discover(RuleKind::State, &[field(2, "Phone")]).is_empty());
    }
}
