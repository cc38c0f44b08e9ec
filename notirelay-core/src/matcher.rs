use crate::condition::{evaluate, evaluate_absent, Condition};
use crate::property::{decode, PageProperties};
use crate::schema::DatabaseSchema;
use crate::template::Template;
use tracing::{debug, warn};

/// Keeps the templates whose conditions all hold for the page, in their original order.
pub fn find_matching_templates<'a>(
    properties: &PageProperties,
    templates: &'a [Template],
    schema: &DatabaseSchema,
) -> Vec<&'a Template> {
    templates
        .iter()
        .filter(|template| {
            let matched = template
                .conditions
                .iter()
                .all(|condition| condition_holds(properties, template, condition, schema));
            debug!(template.id = %template.id, matched, "Evaluated template conditions");
            matched
        })
        .collect()
}

fn condition_holds(
    properties: &PageProperties,
    template: &Template,
    condition: &Condition,
    schema: &DatabaseSchema,
) -> bool {
    // Conditions on properties the database no longer has are skipped.
    let Some(property) = schema.resolve(&condition.property) else {
        warn!(
            template.id = %template.id,
            condition.property = %condition.property,
            "Condition property not found in database schema, skipping condition"
        );
        return true;
    };

    let Some(raw) = properties.get(&property.name) else {
        debug!(
            template.id = %template.id,
            property.name = %property.name,
            "Property missing from page"
        );
        return evaluate_absent(condition.operator, &condition.value);
    };

    match decode(raw, property) {
        Ok(value) => evaluate(&value, condition.operator, &condition.value),
        Err(undecodable) => {
            warn!(
                template.id = %template.id,
                property.name = %property.name,
                property.kind = %undecodable.kind,
                "Property kind cannot be used in conditions"
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::Operator;
    use crate::schema::tests::tasks_database;
    use crate::schema::RawDatabase;
    use chrono::Utc;
    use serde_json::{json, Value};
    use uuid::Uuid;

    fn schema() -> DatabaseSchema {
        serde_json::from_value::<RawDatabase>(tasks_database())
            .unwrap()
            .into()
    }

    fn template(conditions: Vec<Condition>) -> Template {
        Template {
            id: Uuid::now_v7(),
            name: "t".to_string(),
            database_id: "db-1".to_string(),
            body: String::new(),
            conditions,
            destination_id: Uuid::now_v7(),
            owner_id: Uuid::now_v7(),
            credential_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn condition(property: &str, operator: Operator, value: Value) -> Condition {
        Condition {
            property: property.to_string(),
            operator,
            value,
        }
    }

    fn page(status: &str) -> PageProperties {
        json!({
            "Status": { "id": "st%3A", "type": "status", "status": { "name": status } },
            "Tags": { "multi_select": [{ "name": "urgent" }] },
            "Score": { "number": 7 }
        })
        .as_object()
        .unwrap()
        .clone()
    }

    #[test]
    fn test_status_equals_done() {
        let templates = vec![template(vec![condition("Status", Operator::Eq, json!("Done"))])];

        assert_eq!(find_matching_templates(&page("Done"), &templates, &schema()).len(), 1);
        assert!(find_matching_templates(&page("Doing"), &templates, &schema()).is_empty());
    }

    #[test]
    fn test_condition_by_property_id() {
        let templates = vec![template(vec![condition("st%3A", Operator::Eq, json!("Done"))])];
        assert_eq!(find_matching_templates(&page("Done"), &templates, &schema()).len(), 1);
    }

    #[test]
    fn test_no_conditions_always_match() {
        let templates = vec![template(vec![])];
        let empty = PageProperties::new();

        assert_eq!(find_matching_templates(&empty, &templates, &schema()).len(), 1);
        assert_eq!(find_matching_templates(&page("Doing"), &templates, &schema()).len(), 1);
    }

    #[test]
    fn test_unknown_property_is_vacuous() {
        let templates = vec![template(vec![
            condition("Deleted Column", Operator::Eq, json!("anything")),
            condition("Status", Operator::Eq, json!("Done")),
        ])];

        assert_eq!(find_matching_templates(&page("Done"), &templates, &schema()).len(), 1);
        assert!(find_matching_templates(&page("Doing"), &templates, &schema()).is_empty());
    }

    #[test]
    fn test_all_conditions_must_hold() {
        let templates = vec![template(vec![
            condition("Status", Operator::Eq, json!("Done")),
            condition("Tags", Operator::Eq, json!("urgent")),
            condition("Score", Operator::Gt, json!(10)),
        ])];
        assert!(find_matching_templates(&page("Done"), &templates, &schema()).is_empty());
    }

    #[test]
    fn test_preserves_order() {
        let first = template(vec![condition("Score", Operator::Gt, json!(1))]);
        let skipped = template(vec![condition("Score", Operator::Lt, json!(1))]);
        let last = template(vec![]);
        let templates = vec![first.clone(), skipped, last.clone()];

        let matched = find_matching_templates(&page("Done"), &templates, &schema());
        let ids: Vec<Uuid> = matched.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![first.id, last.id]);
    }

    #[test]
    fn test_absent_page_property() {
        let templates = vec![
            template(vec![condition("Due Date", Operator::IsEmpty, Value::Null)]),
            template(vec![condition("Due Date", Operator::IsNotEmpty, Value::Null)]),
            template(vec![condition("Due Date", Operator::Ne, json!(""))]),
            template(vec![condition("Due Date", Operator::Ne, json!("2024-01-01"))]),
        ];

        let matched = find_matching_templates(&page("Done"), &templates, &schema());
        let ids: Vec<Uuid> = matched.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![templates[0].id, templates[2].id]);
    }

    #[test]
    fn test_unsupported_kind_fails_condition() {
        let mut properties = page("Done");
        properties.insert("Total".to_string(), json!({ "formula": { "number": 1 } }));
        let templates = vec![template(vec![condition("Total", Operator::IsNotEmpty, Value::Null)])];

        assert!(find_matching_templates(&properties, &templates, &schema()).is_empty());
    }
}
