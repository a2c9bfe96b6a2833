use anyhow::{Context, Result, anyhow, bail};
use serde_json::{Deserializer, Value as JsonValue};
use taskstore_core::types::{parse_record, record_to_json};
use taskstore_core::{Filter, Record, TaskStore};

#[derive(Debug, PartialEq)]
pub enum Command {
    Add { msg_id: String, fields: JsonValue },
    Get { msg_id: String },
    Update { msg_id: String, fields: JsonValue },
    Drop { msg_id: String },
    DropMatching { filter: JsonValue },
    Find { filter: JsonValue, keys: Vec<String> },
    Count { filter: JsonValue },
    History,
    Flush,
    Table,
}

pub const HELP: &str = "Commands:
  add <msg_id> <json>            -> insert a record
  get <msg_id>                   -> show one record
  update <msg_id> <json>         -> rewrite the given fields
  drop <msg_id>                  -> delete a record
  drop-matching <filter>         -> delete records matching a filter
  find <filter> [field ...]      -> list matching records (optionally projected)
  count <filter>                 -> count matching records
  history                        -> msg_ids by submission time
  flush                          -> commit pending writes now
  table                          -> show the bound table
  exit|quit                      -> flush, close and quit
Filters are JSON, e.g.
  {\"queue\": \"default\", \"submitted\": {\"$gt\": \"2024-01-01T00:00:00Z\"}}";

pub fn parse(input: &str) -> Result<Command> {
    let (keyword, rest) = match input.split_once(char::is_whitespace) {
        Some((k, r)) => (k, r.trim()),
        None => (input, ""),
    };

    match keyword.to_lowercase().as_str() {
        "add" | "update" => {
            let (msg_id, json) = split_id(rest, keyword)?;
            let (fields, tail) = leading_json(json)?;
            expect_empty(tail)?;
            Ok(if keyword.eq_ignore_ascii_case("add") {
                Command::Add { msg_id, fields }
            } else {
                Command::Update { msg_id, fields }
            })
        }
        "get" => Ok(Command::Get {
            msg_id: single_id(rest, "get")?,
        }),
        "drop" => Ok(Command::Drop {
            msg_id: single_id(rest, "drop")?,
        }),
        "drop-matching" => {
            let (filter, tail) = leading_json(rest)?;
            expect_empty(tail)?;
            Ok(Command::DropMatching { filter })
        }
        "find" => {
            let (filter, tail) = leading_json(rest)?;
            let keys = tail.split_whitespace().map(str::to_string).collect();
            Ok(Command::Find { filter, keys })
        }
        "count" => {
            let (filter, tail) = leading_json(rest)?;
            expect_empty(tail)?;
            Ok(Command::Count { filter })
        }
        "history" => Ok(Command::History),
        "flush" => Ok(Command::Flush),
        "table" => Ok(Command::Table),
        _ => bail!("Unknown command '{keyword}'. Type 'help' for a list."),
    }
}

pub fn execute(cmd: Command, store: &mut TaskStore) -> Result<String> {
    match cmd {
        Command::Add { msg_id, fields } => {
            store.add_record(&msg_id, record_arg(&fields)?)?;
            Ok(format!("added {msg_id}"))
        }
        Command::Get { msg_id } => render(&store.get_record(&msg_id)?),
        Command::Update { msg_id, fields } => {
            store.update_record(&msg_id, record_arg(&fields)?)?;
            Ok(format!("updated {msg_id}"))
        }
        Command::Drop { msg_id } => {
            store.drop_record(&msg_id)?;
            Ok(format!("dropped {msg_id}"))
        }
        Command::DropMatching { filter } => {
            let removed = store.drop_matching(&Filter::from_json(&filter)?)?;
            Ok(format!("dropped {removed} record(s)"))
        }
        Command::Find { filter, keys } => {
            let filter = Filter::from_json(&filter)?;
            let keys: Vec<&str> = keys.iter().map(String::as_str).collect();
            let projection = (!keys.is_empty()).then_some(keys.as_slice());
            let records = store.find_records(&filter, projection)?;
            let rendered = records
                .iter()
                .map(render)
                .collect::<Result<Vec<_>>>()?;
            Ok(if rendered.is_empty() {
                "no matching records".to_string()
            } else {
                rendered.join("\n")
            })
        }
        Command::Count { filter } => Ok(store.count(&Filter::from_json(&filter)?)?.to_string()),
        Command::History => Ok(store.history()?.join("\n")),
        Command::Flush => {
            store.flush()?;
            Ok("flushed".to_string())
        }
        Command::Table => Ok(store.table().to_string()),
    }
}

fn record_arg(json: &JsonValue) -> Result<Record> {
    parse_record(json).map_err(|e| anyhow!(e))
}

fn render(rec: &Record) -> Result<String> {
    let json = record_to_json(rec).map_err(|e| anyhow!(e))?;
    serde_json::to_string_pretty(&json).context("Failed to render record")
}

fn split_id<'a>(rest: &'a str, keyword: &str) -> Result<(String, &'a str)> {
    let (msg_id, tail) = rest
        .split_once(char::is_whitespace)
        .ok_or_else(|| anyhow!("Usage: {keyword} <msg_id> <json>"))?;
    Ok((msg_id.to_string(), tail.trim()))
}

fn single_id(rest: &str, keyword: &str) -> Result<String> {
    let mut parts = rest.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some(id), None) => Ok(id.to_string()),
        _ => bail!("Usage: {keyword} <msg_id>"),
    }
}

/// Reads one JSON value off the front of `input` and returns the remainder.
fn leading_json(input: &str) -> Result<(JsonValue, &str)> {
    let mut stream = Deserializer::from_str(input).into_iter::<JsonValue>();
    let value = stream
        .next()
        .ok_or_else(|| anyhow!("Expected a JSON argument"))?
        .context("Malformed JSON argument")?;
    let tail = input[stream.byte_offset()..].trim();
    Ok((value, tail))
}

fn expect_empty(tail: &str) -> Result<()> {
    if !tail.is_empty() {
        bail!("Unexpected trailing input '{tail}'");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_find_with_projection() {
        let cmd = parse(r#"find {"queue": {"$in": ["a", "b"]}} stdout stderr"#).unwrap();
        assert_eq!(
            cmd,
            Command::Find {
                filter: json!({"queue": {"$in": ["a", "b"]}}),
                keys: vec!["stdout".to_string(), "stderr".to_string()],
            }
        );
    }

    #[test]
    fn parses_add_with_spaced_json() {
        let cmd = parse(r#"add m1 { "queue": "default" }"#).unwrap();
        assert_eq!(
            cmd,
            Command::Add {
                msg_id: "m1".to_string(),
                fields: json!({"queue": "default"}),
            }
        );
    }

    #[test]
    fn rejects_trailing_input_and_unknown_commands() {
        assert!(parse(r#"count {} extra"#).is_err());
        assert!(parse("get").is_err());
        assert!(parse("get a b").is_err());
        assert!(parse("select tasks").is_err());
    }
}
