//! Result extraction from response bodies.
//!
//! Every extractor is total: a missing or mistyped link anywhere on the path
//! yields `None`, and the client turns that into one `UnexpectedFormat`.

use serde_json::Value;

/// `output.choices[0].message.content[0].image` from a generation response.
pub fn extract_image_url(body: &Value) -> Option<&str> {
    body.pointer("/output/choices/0/message/content/0/image")
        .and_then(Value::as_str)
}

/// `choices[0].message.content` from a chat completion.
///
/// Content is either a plain string or a list of `{ "text": ... }` parts,
/// which are joined in order.
pub fn extract_description(body: &Value) -> Option<String> {
    match body.pointer("/choices/0/message/content")? {
        Value::String(text) => Some(text.clone()),
        Value::Array(parts) => {
            let texts: Vec<&str> = parts
                .iter()
                .filter_map(|part| part.get("text").and_then(Value::as_str))
                .collect();
            if texts.is_empty() {
                None
            } else {
                Some(texts.concat())
            }
        }
        _ => None,
    }
}

/// Concatenate `choices[0].delta.content` across a server-sent event stream.
///
/// Reading stops at `data: [DONE]`. Lines that are not `data:` events or do
/// not parse are skipped. An empty result is `None`.
pub fn collect_stream_description(stream: &str) -> Option<String> {
    let mut text = String::new();

    for line in stream.lines() {
        let Some(data) = line.trim().strip_prefix("data:") else {
            continue;
        };
        let data = data.trim();
        if data == "[DONE]" {
            break;
        }

        match serde_json::from_str::<Value>(data) {
            Ok(event) => {
                if let Some(chunk) = event.pointer("/choices/0/delta/content").and_then(Value::as_str) {
                    text.push_str(chunk);
                }
            }
            Err(e) => log::debug!("Skipping unparseable stream event: {}", e),
        }
    }

    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}
