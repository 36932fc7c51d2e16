use crate::domain::model::{CanonicalRecord, FieldValue};
use serde_json::Value;

/// Maps one raw `enheter` entry onto the general field catalog.
///
/// Pure: the same entity always yields the same record.
pub fn extract_record(entity: &Value) -> CanonicalRecord {
    let mut record = CanonicalRecord::new();

    record.insert("name", text_field(entity, "navn"));
    record.insert("orgnr", text_field(entity, "organisasjonsnummer"));
    record.insert("incorporation_date", text_field(entity, "stiftelsesdato"));
    record.insert(
        "registration_date",
        text_field(entity, "registreringsdatoEnhetsregisteret"),
    );

    let email = match entity.get("epostadresse").and_then(Value::as_str) {
        Some(email) => email.to_lowercase(),
        None => String::new(),
    };
    record.insert("email", FieldValue::Text(email));

    record.insert("phone", text_field(entity, "telefon"));
    record.insert("mobile", text_field(entity, "mobil"));
    record.insert("website", text_field(entity, "hjemmeside"));

    let address = BusinessAddress::from_entity(entity);
    record.insert("address", FieldValue::Text(address.full));
    record.insert("street", FieldValue::Text(address.street));
    record.insert("zipcode", FieldValue::Text(address.zipcode));
    record.insert("municipality", FieldValue::Text(address.municipality));

    record.insert(
        "in_liquidation",
        FieldValue::Bool(is_truthy(entity.get("underAvvikling"))),
    );

    // 員工數原樣保留，不做解析
    let employees = entity
        .get("antallAnsatte")
        .map(FieldValue::from_json)
        .unwrap_or(FieldValue::Empty);
    record.insert("employees", employees);

    record
}

/// Missing, null and non-string values all become an empty string.
fn text_field(entity: &Value, key: &str) -> FieldValue {
    match entity.get(key) {
        Some(Value::String(s)) => FieldValue::text(s.as_str()),
        Some(Value::Number(n)) => FieldValue::Text(n.to_string()),
        _ => FieldValue::text(""),
    }
}

fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map(|n| n != 0.0).unwrap_or(false),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
    }
}

#[derive(Debug, Default, PartialEq)]
struct BusinessAddress {
    full: String,
    street: String,
    zipcode: String,
    municipality: String,
}

impl BusinessAddress {
    /// Without street lines every address part stays an empty string; a
    /// lone postal code or municipality is not enough to call it an address.
    fn from_entity(entity: &Value) -> Self {
        let Some(address) = entity.get("forretningsadresse").filter(|a| a.is_object()) else {
            return Self::default();
        };

        let lines: Vec<&str> = address
            .get("adresse")
            .and_then(Value::as_array)
            .map(|lines| {
                lines
                    .iter()
                    .filter_map(Value::as_str)
                    .filter(|line| !line.trim().is_empty())
                    .collect()
            })
            .unwrap_or_default();

        if lines.is_empty() {
            return Self::default();
        }

        let zipcode = address.get("postnummer").and_then(Value::as_str).unwrap_or("");
        let locality = address.get("poststed").and_then(Value::as_str).unwrap_or("");
        let municipality = address.get("kommune").and_then(Value::as_str).unwrap_or("");

        let street = lines.join(", ");
        let full = if !zipcode.is_empty() && !locality.is_empty() {
            format!("{}, {} {}", street, zipcode, locality)
        } else {
            street.clone()
        };

        Self {
            full,
            street,
            zipcode: zipcode.to_string(),
            municipality: municipality.to_string(),
        }
    }
}
