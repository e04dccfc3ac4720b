// Output - Render responses as JSON and split command lines

use crate::commands::CommandError;
use ciborium::value::Value as Cbor;
use serde::Serialize;
use serde_json::{Map, Number, Value as Json};

fn cbor_to_json(value: Cbor) -> Json {
    match value {
        Cbor::Null => Json::Null,
        Cbor::Bool(b) => Json::Bool(b),
        Cbor::Integer(i) => {
            let i = i128::from(i);
            if let Ok(v) = i64::try_from(i) {
                Json::Number(v.into())
            } else if let Ok(v) = u64::try_from(i) {
                Json::Number(v.into())
            } else {
                Json::String(i.to_string())
            }
        }
        Cbor::Float(f) => Number::from_f64(f).map(Json::Number).unwrap_or(Json::Null),
        Cbor::Text(s) => Json::String(s),
        Cbor::Bytes(b) => Json::String(hex::encode(b)),
        Cbor::Array(items) => Json::Array(items.into_iter().map(cbor_to_json).collect()),
        Cbor::Map(entries) => {
            let mut map = Map::new();
            for (k, v) in entries {
                let key = match k {
                    Cbor::Text(s) => s,
                    other => match cbor_to_json(other) {
                        Json::String(s) => s,
                        json => json.to_string(),
                    },
                };
                map.insert(key, cbor_to_json(v));
            }
            Json::Object(map)
        }
        Cbor::Tag(_, inner) => cbor_to_json(*inner),
        _ => Json::Null,
    }
}

/// Render a response as JSON, byte strings as hex
pub fn render_json<T: Serialize + ?Sized>(value: &T) -> Result<Json, CommandError> {
    let cbor = Cbor::serialized(value).map_err(|e| CommandError::Io(e.to_string()))?;
    Ok(cbor_to_json(cbor))
}

/// Print a response to stdout as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CommandError> {
    let json = render_json(value)?;
    let text = serde_json::to_string_pretty(&json).map_err(|e| CommandError::Io(e.to_string()))?;
    println!("{}", text);
    Ok(())
}

/// Split a command line into words, honoring single and double quotes
/// and backslash escapes
pub fn split_words(line: &str) -> Result<Vec<String>, CommandError> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some('"'), '\\') | (None, '\\') => match chars.next() {
                Some(escaped) => {
                    current.push(escaped);
                    in_word = true;
                }
                None => return Err(CommandError::Usage("Trailing backslash".to_string())),
            },
            (Some(_), c) => current.push(c),
            (None, '\'' | '"') => {
                quote = Some(c);
                in_word = true;
            }
            (None, c) if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            (None, c) => {
                current.push(c);
                in_word = true;
            }
        }
    }

    if quote.is_some() {
        return Err(CommandError::Usage("Unterminated quote".to_string()));
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}
