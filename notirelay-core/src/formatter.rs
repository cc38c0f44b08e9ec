use crate::property::{PageProperties, RawProperty};
use crate::schema::{DatabaseSchema, PropertySchema};
use chrono::{Local, NaiveDateTime};
use serde_json::Value;
use std::collections::HashMap;

pub const NOW_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

const PAGE_URL_TOKEN: &str = "_pageUrl";
const DATABASE_TITLE_TOKEN: &str = "_databaseTitle";
const NOW_TOKEN: &str = "_now";

/// Fills the placeholders of a template body with values from the page.
///
/// Placeholders are literal `{Property Name}` strings; unknown ones are left as-is.
pub fn render(
    body: &str,
    properties: &PageProperties,
    schema: &DatabaseSchema,
    page_url: Option<&str>,
) -> String {
    render_at(body, properties, schema, page_url, Local::now().naive_local())
}

/// Single pass over `body`: substituted values are never scanned for placeholders.
pub fn render_at(
    body: &str,
    properties: &PageProperties,
    schema: &DatabaseSchema,
    page_url: Option<&str>,
    now: NaiveDateTime,
) -> String {
    let by_name: HashMap<&str, &PropertySchema> = schema
        .properties
        .values()
        .map(|property| (property.name.as_str(), property))
        .collect();

    let substitute = |token: &str| -> Option<String> {
        match token {
            PAGE_URL_TOKEN => page_url.map(str::to_owned),
            DATABASE_TITLE_TOKEN => Some(schema.title.clone()),
            NOW_TOKEN => Some(now.format(NOW_FORMAT).to_string()),
            name => {
                let property = by_name.get(name)?;
                let rendered = match properties.get(&property.name) {
                    None | Some(Value::Null) => String::new(),
                    Some(raw) => RawProperty::parse(&property.kind, raw).display(),
                };
                Some(rendered)
            }
        }
    };

    let mut message = String::with_capacity(body.len());
    let mut rest = body;
    while let Some(open) = rest.find('{') {
        message.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            rest = &rest[open..];
            break;
        };
        let token = &after[..close];

        // `{a {b}`: the outer brace is text, scanning resumes at the inner one.
        if let Some(nested) = token.find('{') {
            message.push_str(&rest[open..open + 1 + nested]);
            rest = &after[nested..];
            continue;
        }

        match substitute(token) {
            Some(value) => message.push_str(&value),
            None => message.push_str(&rest[open..open + close + 2]),
        }
        rest = &after[close + 1..];
    }
    message.push_str(rest);

    message
}
